//! Scoring agent trait and common types.

use async_trait::async_trait;

use credo_core::{AgentKind, AgentReport, Case};
use thiserror::Error;

use crate::providers::ProviderError;

/// Errors from scoring agents.
///
/// These never escape the runner: every fault is converted into a tagged
/// `AgentStatus::Error` on the session.
#[derive(Error, Debug)]
pub enum AgentFault {
    #[error("data provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Trait for independent scoring agents.
///
/// # Isolation Contract
/// Each agent operates in isolation:
/// - No shared mutable state between agents
/// - No access to other agents' results during a run
/// - Read-only lookups only, through injected providers
/// - Deterministic output for identical case and provider state
#[async_trait]
pub trait ScoringAgent: Send + Sync {
    /// The agent identity this implementation scores as.
    fn kind(&self) -> AgentKind;

    /// Score one case.
    ///
    /// # Arguments
    /// * `case` - The immutable case under analysis
    ///
    /// # Returns
    /// One [`AgentReport`] matching `kind()`, or a fault.
    ///
    /// # Isolation Contract
    /// - MUST NOT mutate external state
    /// - MUST NOT block indefinitely: lookups are awaited and the caller
    ///   cancels at the deadline
    async fn run(&self, case: &Case) -> Result<AgentReport, AgentFault>;
}
