//! Ingestion event state machine.
//!
//! # State Transition Diagram
//!
//! ```text
//! Start ── bootstrap ──→ Bootstrapped ── provision ──→ Provisioned ── write ──→ Written (terminal)
//!   │                        │                             │
//!   └────────────────────────┴─────────────────────────────┴──→ Failed (terminal)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where one ingestion event currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionPhase {
    Start,
    Bootstrapped,
    Provisioned,
    Written,
    Failed,
}

impl IngestionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionPhase::Start => "start",
            IngestionPhase::Bootstrapped => "bootstrapped",
            IngestionPhase::Provisioned => "provisioned",
            IngestionPhase::Written => "written",
            IngestionPhase::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestionPhase::Written | IngestionPhase::Failed)
    }

    pub fn can_advance_to(&self, next: IngestionPhase) -> bool {
        use IngestionPhase::*;
        match (self, next) {
            (Start, Bootstrapped) | (Bootstrapped, Provisioned) | (Provisioned, Written) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Move to `next`, rejecting any transition the diagram does not allow.
    pub fn advance(self, next: IngestionPhase) -> Result<IngestionPhase, PhaseTransitionError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(PhaseTransitionError { from: self, to: next })
        }
    }
}

impl fmt::Display for IngestionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a transition outside the state diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransitionError {
    pub from: IngestionPhase,
    pub to: IngestionPhase,
}

impl fmt::Display for PhaseTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid ingestion transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for PhaseTransitionError {}

/// The step an ingestion failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStep {
    Validate,
    Bootstrap,
    Provision,
    Write,
}

impl IngestionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionStep::Validate => "validate",
            IngestionStep::Bootstrap => "bootstrap",
            IngestionStep::Provision => "provision",
            IngestionStep::Write => "write",
        }
    }
}

impl fmt::Display for IngestionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
