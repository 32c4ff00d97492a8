//! Dexcom Share regions.

use std::fmt;
use std::str::FromStr;

/// Application id shared by the US and outside-US Share servers.
const APPLICATION_ID: &str = "d89443d2-327c-4a6f-89e5-496bbb0317db";

/// Application id used by the Japanese Share server.
const APPLICATION_ID_JP: &str = "d8665ade-9673-4e27-9ff6-92db4ce13d13";

/// Which Share server a patient's account lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    Us,
    /// Outside the US (default for the deployments this serves).
    #[default]
    Ous,
    Jp,
}

impl Region {
    pub fn base_url(self) -> &'static str {
        match self {
            Region::Us => "https://share2.dexcom.com/ShareWebServices/Services",
            Region::Ous => "https://shareous1.dexcom.com/ShareWebServices/Services",
            Region::Jp => "https://share.dexcom.jp/ShareWebServices/Services",
        }
    }

    pub fn application_id(self) -> &'static str {
        match self {
            Region::Us | Region::Ous => APPLICATION_ID,
            Region::Jp => APPLICATION_ID_JP,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Ous => "ous",
            Region::Jp => "jp",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Region::Us),
            "ous" => Ok(Region::Ous),
            "jp" => Ok(Region::Jp),
            other => Err(format!("unknown Dexcom region '{other}' (expected us, ous or jp)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("OUS".parse::<Region>().unwrap(), Region::Ous);
        assert_eq!(" us ".parse::<Region>().unwrap(), Region::Us);
        assert_eq!("jp".parse::<Region>().unwrap(), Region::Jp);
        assert!("eu".parse::<Region>().is_err());
    }

    #[test]
    fn japan_uses_its_own_application_id() {
        assert_ne!(Region::Jp.application_id(), Region::Us.application_id());
        assert_eq!(Region::Us.application_id(), Region::Ous.application_id());
    }
}
