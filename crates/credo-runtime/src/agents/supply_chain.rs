//! Supply-chain agent: buyer reliability and invoice financeability.

use async_trait::async_trait;

use credo_core::scoring::SupplyChainPolicy;
use credo_core::{AgentKind, AgentReport, Case};

use super::{AgentFault, ScoringAgent};

/// Scores financeability from the case itself: buyer history and
/// verification status are resolved onto the case before fan-out, so
/// this agent needs no further lookups.
pub struct SupplyChainAgent {
    policy: SupplyChainPolicy,
}

impl SupplyChainAgent {
    pub fn new() -> Self {
        Self {
            policy: SupplyChainPolicy::new(),
        }
    }
}

impl Default for SupplyChainAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoringAgent for SupplyChainAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::SupplyChain
    }

    async fn run(&self, case: &Case) -> Result<AgentReport, AgentFault> {
        let report = self.policy.assess(case);
        tracing::debug!(key = %case.key, approves = report.approves(), "supply chain assessed");
        Ok(report)
    }
}
