//! In-memory collaborators for monitor tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use glucowatch_core::alert::AlertDecision;
use glucowatch_core::error::{PersistenceError, ProviderError};
use glucowatch_core::fallback::FallbackGenerator;
use glucowatch_core::glucose::{
    GlucoseReading, MeasuredAt, NewGlucoseReading, ProviderReading, Trend,
};
use glucowatch_core::patient::{MonitoredPatient, ProviderCredentials};
use glucowatch_core::store::{PatientStore, ReadingSource, ReadingStore};
use glucowatch_core::thresholds::ClinicalThresholds;
use glucowatch_core::types::{PatientId, Timestamp};
use glucowatch_events::{AlertDispatcher, AlertSink, DeliveryError};
use glucowatch_worker::{MonitorService, MonitorSettings};

/// Value every synthetic reading carries; inside the default range.
pub const FALLBACK_VALUE: i32 = 120;

/// Ordered record of storage and dispatch calls across all fakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Saved(PatientId),
    Dispatched(PatientId),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn patient(username: &str, thresholds: Option<(i32, i32)>) -> MonitoredPatient {
    MonitoredPatient {
        id: PatientId::new_v4(),
        credentials: ProviderCredentials::new(username, "secret"),
        thresholds: thresholds.map(|(low, high)| ClinicalThresholds::new(low, high).unwrap()),
    }
}

pub fn reading(value: i32, minutes_ago: i64) -> ProviderReading {
    ProviderReading {
        value,
        trend: Trend::Flat,
        measured_at: MeasuredAt::from(Utc::now() - chrono::Duration::minutes(minutes_ago)),
    }
}

// ---------------------------------------------------------------------------
// Patient store
// ---------------------------------------------------------------------------

pub struct FakePatients {
    pub patients: Vec<MonitoredPatient>,
    pub fail: bool,
}

#[async_trait]
impl PatientStore for FakePatients {
    async fn list_eligible_patients(&self) -> Result<Vec<MonitoredPatient>, PersistenceError> {
        if self.fail {
            return Err(PersistenceError::new("connection refused"));
        }
        Ok(self.patients.clone())
    }
}

// ---------------------------------------------------------------------------
// Reading store
// ---------------------------------------------------------------------------

pub struct FakeReadings {
    pub events: EventLog,
    pub saved: Mutex<Vec<GlucoseReading>>,
    pub fail_for: HashSet<PatientId>,
    next_id: AtomicI64,
}

impl FakeReadings {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            saved: Mutex::new(Vec::new()),
            fail_for: HashSet::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn saved(&self) -> Vec<GlucoseReading> {
        self.saved.lock().unwrap().clone()
    }

    pub fn saved_for(&self, patient_id: PatientId) -> Vec<GlucoseReading> {
        self.saved()
            .into_iter()
            .filter(|r| r.patient_id == patient_id)
            .collect()
    }
}

#[async_trait]
impl ReadingStore for FakeReadings {
    async fn save_reading(
        &self,
        reading: &NewGlucoseReading,
    ) -> Result<GlucoseReading, PersistenceError> {
        // Yield so concurrent patients interleave.
        tokio::task::yield_now().await;

        if self.fail_for.contains(&reading.patient_id) {
            return Err(PersistenceError::new("disk full"));
        }

        let saved = GlucoseReading {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            patient_id: reading.patient_id,
            value: reading.value,
            trend: reading.trend,
            source: reading.source,
            measured_at: reading.measured_at,
            recorded_at: Utc::now(),
        };
        self.saved.lock().unwrap().push(saved.clone());
        self.events.lock().unwrap().push(Event::Saved(reading.patient_id));
        Ok(saved)
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Script {
    Reading(ProviderReading),
    Empty,
    Fail(ProviderError),
}

/// Answers per account name; unknown accounts get no data.
#[derive(Default)]
pub struct FakeSource {
    pub scripts: HashMap<String, Script>,
}

impl FakeSource {
    pub fn with(mut self, username: &str, script: Script) -> Self {
        self.scripts.insert(username.to_string(), script);
        self
    }
}

#[async_trait]
impl ReadingSource for FakeSource {
    async fn fetch_current_reading(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Option<ProviderReading>, ProviderError> {
        match self.scripts.get(&credentials.username) {
            Some(Script::Reading(r)) => Ok(Some(r.clone())),
            Some(Script::Fail(e)) => Err(e.clone()),
            Some(Script::Empty) | None => Ok(None),
        }
    }
}

pub struct FixedFallback;

impl FallbackGenerator for FixedFallback {
    fn generate(&self, _patient_id: PatientId, now: Timestamp) -> ProviderReading {
        ProviderReading {
            value: FALLBACK_VALUE,
            trend: Trend::Flat,
            measured_at: MeasuredAt::from(now),
        }
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

pub struct RecordingSink {
    pub events: EventLog,
    pub sent: Mutex<Vec<AlertDecision>>,
    pub fail: bool,
    /// Sends to reject before behaving normally.
    pub fail_first: AtomicUsize,
}

impl RecordingSink {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            sent: Mutex::new(Vec::new()),
            fail: false,
            fail_first: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<AlertDecision> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn send(&self, alert: &AlertDecision) -> Result<(), DeliveryError> {
        self.events.lock().unwrap().push(Event::Dispatched(alert.patient_id));
        let failing_first = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.fail || failing_first {
            return Err(DeliveryError::HttpStatus(503));
        }
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub events: EventLog,
    pub readings: Arc<FakeReadings>,
    pub sink: Arc<RecordingSink>,
    pub service: MonitorService,
}

pub struct HarnessBuilder {
    pub patients: Vec<MonitoredPatient>,
    pub patients_fail: bool,
    pub source: FakeSource,
    pub fail_persist_for: HashSet<PatientId>,
    pub sink_fails: bool,
    pub sink_fails_first: usize,
    pub settings: MonitorSettings,
}

impl HarnessBuilder {
    pub fn new(patients: Vec<MonitoredPatient>, source: FakeSource) -> Self {
        Self {
            patients,
            patients_fail: false,
            source,
            fail_persist_for: HashSet::new(),
            sink_fails: false,
            sink_fails_first: 0,
            settings: MonitorSettings::default(),
        }
    }

    pub fn build(self) -> Harness {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));

        let mut readings = FakeReadings::new(Arc::clone(&events));
        readings.fail_for = self.fail_persist_for;
        let readings = Arc::new(readings);

        let mut sink = RecordingSink::new(Arc::clone(&events));
        sink.fail = self.sink_fails;
        sink.fail_first = AtomicUsize::new(self.sink_fails_first);
        let sink = Arc::new(sink);

        let service = MonitorService::new(
            Arc::new(FakePatients {
                patients: self.patients,
                fail: self.patients_fail,
            }),
            readings.clone(),
            Arc::new(self.source),
            Arc::new(FixedFallback),
            AlertDispatcher::new(sink.clone()),
            self.settings,
        );

        Harness {
            events,
            readings,
            sink,
            service,
        }
    }
}
