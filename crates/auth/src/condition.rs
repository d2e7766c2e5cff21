//! Attribute conditions attached to permission rules.
//!
//! Conditions are a closed, serializable set of predicates over the acting
//! user and the optional subject record. They are side-effect free and never
//! fail: missing subject data resolves to a fixed default per variant.

use serde::{Deserialize, Serialize};

use sitesafe_core::PermitType;

use crate::subject::SubjectData;
use crate::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// The acting user is the recorded owner of the subject.
    ///
    /// Without subject data (listing context) this passes; with subject data
    /// it is strict, and a subject with no owner field fails.
    IsOwner,

    /// The subject is a permit of one of the given types.
    ///
    /// Without subject data, or without a permit type on it, this fails.
    PermitTypeIn { types: Vec<PermitType> },

    Not { condition: Box<Condition> },

    /// Every inner condition holds. An empty list holds.
    All { conditions: Vec<Condition> },
}

impl Condition {
    /// Subject is an inherently high-risk permit type.
    pub fn high_risk_permit() -> Self {
        Condition::PermitTypeIn {
            types: PermitType::HIGH_RISK.to_vec(),
        }
    }

    pub fn negate(self) -> Self {
        Condition::Not {
            condition: Box::new(self),
        }
    }

    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::All {
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn evaluate(&self, user: &User, subject: Option<&SubjectData>) -> bool {
        match self {
            Condition::IsOwner => match subject {
                None => true,
                Some(s) => s.is_owned_by(user.id),
            },
            Condition::PermitTypeIn { types } => subject
                .and_then(|s| s.permit_type)
                .is_some_and(|t| types.contains(&t)),
            Condition::Not { condition } => !condition.evaluate(user, subject),
            Condition::All { conditions } => {
                conditions.iter().all(|c| c.evaluate(user, subject))
            }
        }
    }
}
