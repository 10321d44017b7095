//! SNOMED CT Expression Constraint Language strings.

use crate::{BridgeError, BridgeResult};
use std::fmt;
use std::str::FromStr;

/// Which neighbour of a concept to look up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Direct parents (`>!`). Called "parent" on the command line.
    Ancestor,
    /// Direct children (`<!`). Called "child" on the command line.
    Descendant,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Ancestor => "parent",
            Direction::Descendant => "child",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" | "ancestor" => Ok(Direction::Ancestor),
            "child" | "descendant" => Ok(Direction::Descendant),
            other => Err(BridgeError::InvalidInput(format!(
                "unknown direction '{other}', expected 'parent' or 'child'"
            ))),
        }
    }
}

/// An ECL expression, trimmed of surrounding whitespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ecl(String);

impl Ecl {
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidInput`] if the expression is blank.
    pub fn new(expression: impl AsRef<str>) -> BridgeResult<Self> {
        let trimmed = expression.as_ref().trim();
        if trimmed.is_empty() {
            return Err(BridgeError::InvalidInput(
                "ECL constraint cannot be empty".into(),
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Constraint selecting the direct parents or children of `concept_id`.
///
/// The id is embedded as given.
pub fn build_constraint(concept_id: &str, direction: Direction) -> Ecl {
    let expression = match direction {
        Direction::Ancestor => format!(">! {concept_id} | Parent |"),
        Direction::Descendant => format!("<! {concept_id} | Child |"),
    };
    Ecl(expression)
}
