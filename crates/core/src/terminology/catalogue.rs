//! Named ECL constraints for exploring the terminology server by hand.

use super::ecl::Ecl;
use crate::{BridgeError, BridgeResult};

/// A stored constraint, addressed by its 1-based number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NamedConstraint {
    pub number: u8,
    pub description: &'static str,
    expression: &'static str,
}

impl NamedConstraint {
    pub fn ecl(&self) -> BridgeResult<Ecl> {
        Ecl::new(self.expression)
    }
}

pub const CATALOGUE: [NamedConstraint; 7] = [
    NamedConstraint {
        number: 1,
        description: "Clinical findings with caries morphology on a tooth part",
        expression: "
            < 404684003 | Clinical finding (finding) | :
            {
                116676008 |Associated Morphology| = << 65413006 |Caries|
                AND
                363698007 |Finding site| = << 410613002 |Tooth part|
            }
        ",
    },
    NamedConstraint {
        number: 2,
        description: "Clinical findings with caries morphology not on a tooth part",
        expression: "
            < 404684003 | Clinical finding (finding) | :
            {
                116676008 |Associated Morphology| = << 65413006 |Caries|
                AND
                363698007 |Finding site| != << 410613002 |Tooth part|
            }
        ",
    },
    NamedConstraint {
        number: 3,
        description: "Diseases with caries morphology",
        expression: "
            < 64572001 | Disease | :
            116676008 |Associated Morphology| = << 65413006 |Caries|
        ",
    },
    NamedConstraint {
        number: 4,
        description: "Disorders of mouth with caries morphology",
        expression: "
            < 118938008 |Disorder of mouth (disorder) | :
            116676008 |Associated Morphology| = << 65413006 |Caries|
        ",
    },
    NamedConstraint {
        number: 5,
        description: "Direct children of 74400008",
        expression: "<! 74400008 | Appendicitis |",
    },
    NamedConstraint {
        number: 6,
        description: "Descendants of Caries (morphologic abnormality)",
        expression: "< 65413006 | Caries |",
    },
    NamedConstraint {
        number: 7,
        description: "Diseases whose morphology descends from Caries",
        expression: "
            < 64572001 | Disease | :
            116676008 | Associated Morphology | = << 65413006 | Caries (morphological abnormality) |
        ",
    },
];

/// Look up a catalogue entry by number.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidInput`] for a number outside `1..=7`.
pub fn named(number: u8) -> BridgeResult<&'static NamedConstraint> {
    CATALOGUE
        .iter()
        .find(|c| c.number == number)
        .ok_or_else(|| {
            BridgeError::InvalidInput(format!(
                "no catalogue constraint {number}; choose 1 to {}",
                CATALOGUE.len()
            ))
        })
}
