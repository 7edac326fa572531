use crate::constants::designations;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Abstract role tag a user is inferred to hold from their organizational
/// designation text.
///
/// Every user is unconditionally granted [`Actor::Requestor`]; the other
/// tags come from case-insensitive keyword containment over designation
/// names (see [`crate::constants::designations`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// Baseline tag held by every user.
    Requestor,
    /// Titles containing "manager", "director", or "head".
    Approver,
    /// Titles containing "analyst" or "reviewer".
    Analyzer,
    /// Titles containing "engineer", "developer", or "implementor".
    Implementor,
}

impl Actor {
    /// Infer the actor tags a single designation grants. A title may grant
    /// several tags ("Engineering Manager" grants Approver and
    /// Implementor). Never includes the baseline Requestor.
    pub fn from_designation(designation: &str) -> Vec<Actor> {
        let lowered = designation.to_lowercase();
        let mut actors = Vec::new();

        if designations::APPROVER_KEYWORDS
            .iter()
            .any(|kw| lowered.contains(kw))
        {
            actors.push(Actor::Approver);
        }
        if designations::ANALYZER_KEYWORDS
            .iter()
            .any(|kw| lowered.contains(kw))
        {
            actors.push(Actor::Analyzer);
        }
        if designations::IMPLEMENTOR_KEYWORDS
            .iter()
            .any(|kw| lowered.contains(kw))
        {
            actors.push(Actor::Implementor);
        }

        actors
    }

    /// Check if this tag outranks the baseline Requestor grant.
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Self::Requestor)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requestor => write!(f, "requestor"),
            Self::Approver => write!(f, "approver"),
            Self::Analyzer => write!(f, "analyzer"),
            Self::Implementor => write!(f, "implementor"),
        }
    }
}

impl std::str::FromStr for Actor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requestor" => Ok(Self::Requestor),
            "approver" => Ok(Self::Approver),
            "analyzer" => Ok(Self::Analyzer),
            "implementor" => Ok(Self::Implementor),
            _ => Err(format!("Invalid actor tag: {s}")),
        }
    }
}
