//! SLA policy for autonomous tasks.
//!
//! Not named by the protocol data model directly, but referenced by
//! `validateAutonomousTaskRequest`'s `slaPolicy ∈ {lite, standard, strict}`
//! check. Each variant carries the defaults the Supervisor falls back to
//! when the heuristic policy (not the LLM router) builds a pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::PipelinePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaPolicy {
    Lite,
    Standard,
    Strict,
}

impl std::str::FromStr for SlaPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lite" => Ok(Self::Lite),
            "standard" => Ok(Self::Standard),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown sla policy: {other}")),
        }
    }
}

impl SlaPolicy {
    /// Default max retries for a protocol/pipeline run under this SLA.
    pub fn max_retries(self) -> u32 {
        match self {
            Self::Lite => 1,
            Self::Standard => 3,
            Self::Strict => 5,
        }
    }

    /// Default overall pipeline timeout under this SLA.
    pub fn timeout(self) -> Duration {
        match self {
            Self::Lite => Duration::from_secs(10 * 60),
            Self::Standard => Duration::from_secs(30 * 60),
            Self::Strict => Duration::from_secs(60 * 60),
        }
    }

    /// Build a heuristic `PipelinePolicy` from this SLA tier. Used by the
    /// Supervisor when the LLM router is unavailable or fails.
    pub fn heuristic_policy(self) -> PipelinePolicy {
        let mut policy = PipelinePolicy::default();
        policy.max_retries = self.max_retries();
        policy.timeout = self.timeout();
        policy.fail_fast = matches!(self, Self::Strict);
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tiers() {
        assert_eq!("lite".parse::<SlaPolicy>().unwrap(), SlaPolicy::Lite);
        assert_eq!("standard".parse::<SlaPolicy>().unwrap(), SlaPolicy::Standard);
        assert_eq!("strict".parse::<SlaPolicy>().unwrap(), SlaPolicy::Strict);
        assert!("bogus".parse::<SlaPolicy>().is_err());
    }

    #[test]
    fn strict_is_fail_fast() {
        assert!(SlaPolicy::Strict.heuristic_policy().fail_fast);
        assert!(!SlaPolicy::Lite.heuristic_policy().fail_fast);
    }
}
