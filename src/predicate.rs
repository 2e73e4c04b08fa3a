use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Claimant release predicate as Horizon serializes it. A node carries at
/// most one of these fields; `abs_before` (ISO string) and
/// `abs_before_epoch` (unix-seconds string) may appear together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimPredicate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unconditional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<ClaimPredicate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<ClaimPredicate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<ClaimPredicate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_before_epoch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_before: Option<String>,
}

impl ClaimPredicate {
    /// The absolute timestamp carried directly on this node, if any.
    /// Prefers the epoch form; falls back to parsing the ISO string.
    fn absolute_timestamp(&self) -> Option<u64> {
        if let Some(epoch) = &self.abs_before_epoch {
            if let Ok(ts) = epoch.parse::<u64>() {
                return Some(ts);
            }
        }
        if let Some(iso) = &self.abs_before {
            if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
                return Some(dt.timestamp().max(0) as u64);
            }
        }
        None
    }
}

/// Walk a predicate tree depth-first and return the first resolvable
/// unlock timestamp: the inner bound of a `not(abs_before)` node or a bare
/// `abs_before`. `and`/`or` children are explored left-to-right; the first
/// child yielding a result wins. Returns `None` when no such node exists.
pub fn extract_unlock_time(predicate: &ClaimPredicate) -> Option<u64> {
    if let Some(not) = &predicate.not {
        if let Some(ts) = not.absolute_timestamp() {
            return Some(ts);
        }
    }

    if let Some(ts) = predicate.absolute_timestamp() {
        return Some(ts);
    }

    if let Some(children) = &predicate.and {
        for child in children {
            if let Some(ts) = extract_unlock_time(child) {
                return Some(ts);
            }
        }
    }

    if let Some(children) = &predicate.or {
        for child in children {
            if let Some(ts) = extract_unlock_time(child) {
                return Some(ts);
            }
        }
    }

    None
}
