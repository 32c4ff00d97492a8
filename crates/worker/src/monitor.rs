//! Monitor orchestrator: one poll/persist/evaluate/dispatch cycle.
//!
//! A run loads the eligible patients, processes each one independently
//! (fetch or fall back, persist, evaluate), and only after every patient's
//! reading has been committed dispatches the collected alert decisions.
//! Failures are contained per patient and per decision; `run_once` never
//! returns an error.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use glucowatch_core::alert::AlertDecision;
use glucowatch_core::error::ProviderError;
use glucowatch_core::evaluation::{evaluate, AlertCooldownTracker, Evaluation, FreshnessPolicy};
use glucowatch_core::fallback::FallbackGenerator;
use glucowatch_core::glucose::{
    MeasuredAt, NewGlucoseReading, ProviderReading, ReadingSource as Source,
};
use glucowatch_core::patient::MonitoredPatient;
use glucowatch_core::store::{PatientStore, ReadingSource, ReadingStore};
use glucowatch_core::thresholds::ClinicalThresholds;
use glucowatch_events::AlertDispatcher;
use tokio_util::sync::CancellationToken;

/// Tunables for a [`MonitorService`].
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    /// Applied to patients without their own thresholds.
    pub default_thresholds: ClinicalThresholds,
    pub freshness: FreshnessPolicy,
    /// Patients processed at once; `1` is strictly sequential.
    pub concurrency: usize,
    /// Minimum gap between repeated alerts of one kind for one patient.
    pub repeat_cooldown: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            default_thresholds: ClinicalThresholds::default(),
            freshness: FreshnessPolicy::default(),
            concurrency: 4,
            repeat_cooldown: Duration::ZERO,
        }
    }
}

/// Counts describing one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub patients: usize,
    pub provider_readings: usize,
    pub synthetic_readings: usize,
    pub persistence_failures: usize,
    pub alerts_decided: usize,
    pub stale_skipped: usize,
    /// Decisions withheld by the repeat cooldown.
    pub suppressed: usize,
    pub alerts_delivered: usize,
    pub dispatch_failures: usize,
    /// Patients never started because the run was cancelled.
    pub cancelled: usize,
}

/// What happened to one patient during a run.
#[derive(Debug)]
enum PatientOutcome {
    Cancelled,
    PersistFailed { source: Source },
    Evaluated { source: Source, result: Evaluated },
}

#[derive(Debug)]
enum Evaluated {
    InRange,
    Stale,
    Suppressed,
    Alert(AlertDecision),
}

/// Coordinates collaborators for each run.
///
/// All collaborators are injected; the service holds no process-wide state
/// beyond the repeat-alert cooldown, which must outlive individual runs.
pub struct MonitorService {
    patients: Arc<dyn PatientStore>,
    readings: Arc<dyn ReadingStore>,
    source: Arc<dyn ReadingSource>,
    fallback: Arc<dyn FallbackGenerator>,
    dispatcher: AlertDispatcher,
    settings: MonitorSettings,
    cooldown: Mutex<AlertCooldownTracker>,
}

impl MonitorService {
    pub fn new(
        patients: Arc<dyn PatientStore>,
        readings: Arc<dyn ReadingStore>,
        source: Arc<dyn ReadingSource>,
        fallback: Arc<dyn FallbackGenerator>,
        dispatcher: AlertDispatcher,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            patients,
            readings,
            source,
            fallback,
            dispatcher,
            cooldown: Mutex::new(AlertCooldownTracker::new(settings.repeat_cooldown)),
            settings,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Execute one full run.
    ///
    /// Cancellation stops new patients from starting; patients already in
    /// flight finish their external calls. Decisions collected before the
    /// cancellation are still dispatched.
    pub async fn run_once(&self, cancel: &CancellationToken) -> RunSummary {
        let mut summary = RunSummary::default();

        let patients = match self.patients.list_eligible_patients().await {
            Ok(patients) => patients,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load eligible patients, skipping run");
                return summary;
            }
        };
        summary.patients = patients.len();
        tracing::info!(patients = patients.len(), "Monitor run started");

        let outcomes: Vec<PatientOutcome> = stream::iter(patients)
            .map(|patient| self.process_patient(patient, cancel))
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        // Every save_reading call has returned at this point.
        let mut batch = Vec::new();
        for outcome in outcomes {
            match outcome {
                PatientOutcome::Cancelled => summary.cancelled += 1,
                PatientOutcome::PersistFailed { source } => {
                    summary.count_source(source);
                    summary.persistence_failures += 1;
                }
                PatientOutcome::Evaluated { source, result } => {
                    summary.count_source(source);
                    match result {
                        Evaluated::InRange => {}
                        Evaluated::Stale => summary.stale_skipped += 1,
                        Evaluated::Suppressed => summary.suppressed += 1,
                        Evaluated::Alert(decision) => batch.push(decision),
                    }
                }
            }
        }
        summary.alerts_decided = batch.len();

        for decision in &batch {
            let outcome = self.dispatcher.dispatch(decision).await;
            if outcome.delivered {
                self.cooldown_tracker().record_delivered(decision);
                summary.alerts_delivered += 1;
            } else {
                summary.dispatch_failures += 1;
            }
        }

        tracing::info!(
            patients = summary.patients,
            provider = summary.provider_readings,
            synthetic = summary.synthetic_readings,
            persistence_failures = summary.persistence_failures,
            alerts = summary.alerts_decided,
            delivered = summary.alerts_delivered,
            dispatch_failures = summary.dispatch_failures,
            cancelled = summary.cancelled,
            "Monitor run finished"
        );
        summary
    }

    async fn process_patient(
        &self,
        patient: MonitoredPatient,
        cancel: &CancellationToken,
    ) -> PatientOutcome {
        if cancel.is_cancelled() {
            return PatientOutcome::Cancelled;
        }

        let (reading, source) = self.acquire_reading(&patient).await;
        let new_reading = NewGlucoseReading::from_provider_reading(
            patient.id,
            &reading,
            source,
            self.settings.freshness.reference_offset,
        );

        if let Err(e) = self.readings.save_reading(&new_reading).await {
            tracing::error!(
                patient_id = %patient.id,
                source = %source,
                error = %e,
                "Failed to persist glucose reading, skipping evaluation"
            );
            return PatientOutcome::PersistFailed { source };
        }

        let now = Utc::now();
        let thresholds =
            ClinicalThresholds::resolve(patient.thresholds, self.settings.default_thresholds);
        let result = self.evaluate(&patient, reading.value, thresholds, reading.measured_at, now);
        PatientOutcome::Evaluated { source, result }
    }

    /// Fetch from the provider, substituting a synthetic reading when it
    /// has nothing or fails.
    async fn acquire_reading(
        &self,
        patient: &MonitoredPatient,
    ) -> (ProviderReading, Source) {
        let reason = match self.source.fetch_current_reading(&patient.credentials).await {
            Ok(Some(reading)) => return (reading, Source::Provider),
            Ok(None) => "no data".to_string(),
            Err(ProviderError::Auth(msg)) => {
                tracing::error!(patient_id = %patient.id, error = %msg, "Provider rejected credentials");
                format!("authentication failed: {msg}")
            }
            Err(ProviderError::Unavailable(msg)) => format!("provider unavailable: {msg}"),
        };

        let reading = self.fallback.generate(patient.id, Utc::now());
        tracing::warn!(
            patient_id = %patient.id,
            reason = %reason,
            value = reading.value,
            "Using synthetic fallback reading"
        );
        (reading, Source::Synthetic)
    }

    fn evaluate(
        &self,
        patient: &MonitoredPatient,
        value: i32,
        thresholds: ClinicalThresholds,
        measured_at: MeasuredAt,
        now: chrono::DateTime<Utc>,
    ) -> Evaluated {
        match evaluate(patient.id, value, thresholds, measured_at, now, &self.settings.freshness) {
            Evaluation::InRange => {
                self.cooldown_tracker().clear_patient(patient.id);
                Evaluated::InRange
            }
            Evaluation::Stale { kind, age } => {
                tracing::info!(
                    patient_id = %patient.id,
                    kind = %kind,
                    value,
                    age_secs = age.num_seconds(),
                    window_secs = self.settings.freshness.window.as_secs(),
                    "Skipping alert for stale reading"
                );
                Evaluated::Stale
            }
            Evaluation::Alert(decision) => {
                if self.cooldown_tracker().is_suppressed(&decision) {
                    tracing::debug!(
                        patient_id = %patient.id,
                        kind = %decision.kind,
                        "Alert suppressed by repeat cooldown"
                    );
                    Evaluated::Suppressed
                } else {
                    Evaluated::Alert(decision)
                }
            }
        }
    }

    fn cooldown_tracker(&self) -> std::sync::MutexGuard<'_, AlertCooldownTracker> {
        // The tracker holds plain data; a poisoned lock is still consistent.
        self.cooldown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RunSummary {
    fn count_source(&mut self, source: Source) {
        match source {
            Source::Provider => self.provider_readings += 1,
            Source::Synthetic => self.synthetic_readings += 1,
        }
    }
}
