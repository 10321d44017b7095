//! # Migration pipeline
//!
//! Four stages move data from the source EHR server to the destination Primary Care
//! server. They are invoked one at a time and never chain automatically:
//!
//! 1. [`MigrationPipeline::migrate_patient`] copies demographics and saves the id the
//!    destination assigns.
//! 2. [`MigrationPipeline::migrate_condition`] reads the patient's conditions, swaps the
//!    diagnosis code for its SNOMED parent or child, and posts the result.
//! 3. [`MigrationPipeline::create_observation`] posts a canned blood-pressure panel.
//! 4. [`MigrationPipeline::create_procedure`] posts a canned appendectomy.
//!
//! Stages 2 to 4 need a destination patient id, taken from the caller or from the
//! relay file written by stage 1. None of the stages is idempotent.

mod outcome;

pub use outcome::{Stage, StageOutcome};

use crate::config::BridgeConfig;
use crate::credentials::AccessToken;
use crate::relay::{DestinationPatientRef, PatientRefRelay};
use crate::servers::{DestinationServer, SourceServer};
use crate::terminology::{Direction, TerminologyClient};
use crate::transport::HttpTransport;
use crate::{BridgeError, BridgeResult};
use chrono::NaiveDate;
use fhir::patient::IDENTIFIER_VALUE_RANGE;
use fhir::{
    Condition, ConditionRecord, Observation, Patient, PatientRecord, Procedure, SearchBundle,
};
use rand::Rng;
use std::sync::Arc;

/// Picks the single source entry a stage migrates.
///
/// The source server's default ordering is undocumented, so the chosen entry is simply
/// the first one returned and carries no clinical ranking.
pub struct FirstEntryPolicy;

impl FirstEntryPolicy {
    pub fn select(bundle: &SearchBundle) -> Option<&serde_json::Value> {
        bundle.first_resource()
    }
}

fn utc_today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Runs migration stages against the configured servers.
pub struct MigrationPipeline {
    source: SourceServer,
    destination: DestinationServer,
    terminology: TerminologyClient,
    relay: PatientRefRelay,
    today: fn() -> NaiveDate,
}

impl MigrationPipeline {
    pub fn new(
        cfg: &BridgeConfig,
        token: Option<AccessToken>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            source: SourceServer::new(cfg.source_base_url(), token, transport.clone()),
            destination: DestinationServer::new(cfg.destination_base_url(), transport.clone()),
            terminology: TerminologyClient::new(cfg.terminology_base_url(), transport),
            relay: PatientRefRelay::from_config(cfg),
            today: utc_today,
        }
    }

    /// Replace the clock used for identifier periods and onset dates.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn relay(&self) -> &PatientRefRelay {
        &self.relay
    }

    /// Copy a source Patient to the destination and record the new id.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::RemoteRequestFailed`] if either server rejects a request
    /// - [`BridgeError::MissingField`] if the source has no name or address
    /// - [`BridgeError::StorageIo`] if the relay file cannot be written
    ///
    /// Nothing is persisted unless the destination accepted the Patient.
    pub fn migrate_patient(&self, source_patient_id: &str) -> BridgeResult<StageOutcome> {
        let stage = Stage::Patient;
        tracing::info!("{stage}: reading source Patient/{source_patient_id}");

        let response = self.source.read(&format!("Patient/{source_patient_id}"), &[])?;
        let source = Patient::parse_source(&response.body)?;

        let identifier_value = rand::thread_rng().gen_range(IDENTIFIER_VALUE_RANGE);
        let record = PatientRecord::from_source(source, identifier_value, (self.today)())?;
        let payload = Patient::render(&record)?;

        let created = self.destination.create("Patient", payload)?;
        let id = created
            .id
            .as_deref()
            .ok_or_else(|| BridgeError::MissingField("id in destination Patient response".into()))?;
        self.relay.save(&DestinationPatientRef::new(id)?)?;

        tracing::info!("{stage}: created Patient/{id} (identifier {identifier_value})");
        Ok(StageOutcome::Created {
            stage,
            resource_type: created.resource_type,
            id: created.id,
            body: created.body,
        })
    }

    /// Migrate the patient's first condition as its SNOMED parent or child concept.
    ///
    /// The destination patient id is resolved before any request is made.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::PrerequisiteMissing`] without an explicit ref or relay file
    /// - [`BridgeError::MissingField`] if the condition lacks a code or verification status
    /// - [`BridgeError::NoMatchingData`] if the concept has no neighbour in `direction`
    /// - [`BridgeError::RemoteRequestFailed`] if a server rejects a request
    pub fn migrate_condition(
        &self,
        source_patient_id: &str,
        direction: Direction,
        patient_ref: Option<DestinationPatientRef>,
    ) -> BridgeResult<StageOutcome> {
        let stage = Stage::Condition(direction);
        let patient_ref = self.relay.resolve(patient_ref)?;

        let bundle = self
            .source
            .search("Condition", &[("patient", source_patient_id)])?;
        let Some(resource) = FirstEntryPolicy::select(&bundle) else {
            tracing::info!("{stage}: no conditions for source patient {source_patient_id}");
            return Ok(StageOutcome::NoResults { stage });
        };
        if bundle.entry.len() > 1 {
            tracing::info!(
                "{stage}: {} conditions returned, migrating the first",
                bundle.entry.len()
            );
        }

        let source = Condition::parse_source(resource.clone())?;
        let concept = self
            .terminology
            .neighbour(&source.snomed_code, direction)?
            .ok_or_else(|| {
                BridgeError::NoMatchingData(format!(
                    "no {direction} concept for SNOMED {}",
                    source.snomed_code
                ))
            })?;
        tracing::info!(
            "{stage}: {} -> {} ({})",
            source.snomed_code,
            concept.concept_id,
            concept.preferred_term
        );

        let record = ConditionRecord {
            concept_id: concept.concept_id,
            preferred_term: concept.preferred_term,
            verification_status: source.verification_status,
            patient_ref: patient_ref.as_str().to_owned(),
            onset: (self.today)(),
        };
        self.post(stage, "Condition", Condition::render(&record)?)
    }

    /// Post the canned blood-pressure Observation for the patient.
    pub fn create_observation(
        &self,
        patient_ref: Option<DestinationPatientRef>,
    ) -> BridgeResult<StageOutcome> {
        let patient_ref = self.relay.resolve(patient_ref)?;
        let payload = Observation::blood_pressure_panel(patient_ref.as_str())?;
        self.post(Stage::Observation, "Observation", payload)
    }

    /// Post the canned appendectomy Procedure for the patient.
    pub fn create_procedure(
        &self,
        patient_ref: Option<DestinationPatientRef>,
    ) -> BridgeResult<StageOutcome> {
        let patient_ref = self.relay.resolve(patient_ref)?;
        let payload = Procedure::appendectomy(patient_ref.as_str())?;
        self.post(Stage::Procedure, "Procedure", payload)
    }

    fn post(
        &self,
        stage: Stage,
        resource_type: &str,
        payload: serde_json::Value,
    ) -> BridgeResult<StageOutcome> {
        let created = self.destination.create(resource_type, payload)?;
        tracing::info!(
            "{stage}: created {}/{}",
            created.resource_type,
            created.id.as_deref().unwrap_or("<no id>")
        );
        Ok(StageOutcome::Created {
            stage,
            resource_type: created.resource_type,
            id: created.id,
            body: created.body,
        })
    }
}
