//! Handlers for per-patient endpoints: provider-credential linking and
//! recent glucose readings.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use glucowatch_core::error::CoreError;
use glucowatch_core::glucose::GlucoseReading;
use glucowatch_core::patient::ProviderCredentials;
use glucowatch_core::types::PatientId;
use glucowatch_db::repositories::{GlucoseReadingRepo, PatientRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Readings returned when no `limit` is given.
pub const DEFAULT_READINGS_LIMIT: i64 = 50;

/// Upper bound on `limit`.
pub const MAX_READINGS_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for linking provider credentials.
#[derive(Debug, Deserialize)]
pub struct LinkCredentialsRequest {
    pub username: String,
    pub password: String,
}

impl LinkCredentialsRequest {
    /// Both fields must be non-blank.
    pub fn into_credentials(self) -> AppResult<ProviderCredentials> {
        ProviderCredentials::from_parts(Some(self.username), Some(self.password)).ok_or_else(
            || {
                AppError::Core(CoreError::Validation(
                    "username and password are required".to_string(),
                ))
            },
        )
    }
}

/// Query parameters for the readings endpoint.
#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    pub limit: Option<i64>,
}

impl ReadingsQuery {
    pub fn resolve_limit(&self) -> AppResult<i64> {
        let limit = self.limit.unwrap_or(DEFAULT_READINGS_LIMIT);
        if !(1..=MAX_READINGS_LIMIT).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {MAX_READINGS_LIMIT}"
            )));
        }
        Ok(limit)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/patients/{id}/provider-credentials
///
/// Verify the login with the provider, then store it. A patient can be
/// linked only once.
pub async fn link_provider_credentials(
    State(state): State<AppState>,
    Path(patient_id): Path<PatientId>,
    Json(input): Json<LinkCredentialsRequest>,
) -> AppResult<StatusCode> {
    let credentials = input.into_credentials()?;

    let patient = PatientRepo::find_by_id(&state.pool, patient_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Patient",
            id: patient_id.to_string(),
        })?;

    if patient.has_provider_credentials() {
        return Err(already_linked());
    }

    state.verifier.verify_credentials(&credentials).await?;

    let linked = PatientRepo::link_provider_credentials(
        &state.pool,
        patient_id,
        &credentials.username,
        &credentials.password,
    )
    .await?;
    if !linked {
        // Another request linked credentials after our check.
        return Err(already_linked());
    }

    tracing::info!(patient_id = %patient_id, "Linked provider credentials");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/patients/{id}/readings?limit=N
///
/// Most recent readings, newest first.
pub async fn list_readings(
    State(state): State<AppState>,
    Path(patient_id): Path<PatientId>,
    Query(query): Query<ReadingsQuery>,
) -> AppResult<Json<DataResponse<Vec<GlucoseReading>>>> {
    let limit = query.resolve_limit()?;

    if PatientRepo::find_by_id(&state.pool, patient_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Patient",
            id: patient_id.to_string(),
        }));
    }

    let rows = GlucoseReadingRepo::list_recent(&state.pool, patient_id, limit).await?;
    let readings = rows
        .into_iter()
        .map(GlucoseReading::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(Json(DataResponse { data: readings }))
}

fn already_linked() -> AppError {
    AppError::Core(CoreError::Conflict(
        "Provider credentials are already linked for this patient".to_string(),
    ))
}
