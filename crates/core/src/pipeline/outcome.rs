use crate::terminology::Direction;
use std::fmt;

/// The independently invocable migration stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Patient,
    Condition(Direction),
    Observation,
    Procedure,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Patient => f.write_str("migrate-patient"),
            Stage::Condition(direction) => write!(f, "migrate-condition ({direction})"),
            Stage::Observation => f.write_str("create-observation"),
            Stage::Procedure => f.write_str("create-procedure"),
        }
    }
}

/// Result of running a stage.
#[derive(Clone, Debug, PartialEq)]
pub enum StageOutcome {
    /// The destination accepted a new resource.
    Created {
        stage: Stage,
        resource_type: String,
        id: Option<String>,
        body: serde_json::Value,
    },
    /// The source returned nothing to migrate; no request was sent to the destination.
    NoResults { stage: Stage },
}

impl StageOutcome {
    pub fn stage(&self) -> Stage {
        match self {
            StageOutcome::Created { stage, .. } | StageOutcome::NoResults { stage } => *stage,
        }
    }

    pub fn created_id(&self) -> Option<&str> {
        match self {
            StageOutcome::Created { id, .. } => id.as_deref(),
            StageOutcome::NoResults { .. } => None,
        }
    }

    /// One-line report for the operator.
    pub fn summary(&self) -> String {
        match self {
            StageOutcome::Created {
                stage,
                resource_type,
                id,
                ..
            } => format!(
                "{stage}: created {resource_type}/{}",
                id.as_deref().unwrap_or("<no id>")
            ),
            StageOutcome::NoResults { stage } => format!("{stage}: no results, nothing created"),
        }
    }
}
