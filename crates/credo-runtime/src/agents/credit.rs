//! Credit-scoring agent: alternative-data merchant scoring.

use async_trait::async_trait;
use std::sync::Arc;

use credo_core::scoring::CreditScoringPolicy;
use credo_core::{AgentKind, AgentReport, Case};

use super::{AgentFault, ScoringAgent};
use crate::providers::MerchantDirectory;

/// Fetches the merchant's financial aggregates and scores them.
pub struct CreditScoringAgent {
    merchants: Arc<dyn MerchantDirectory>,
    policy: CreditScoringPolicy,
}

impl CreditScoringAgent {
    pub fn new(merchants: Arc<dyn MerchantDirectory>) -> Self {
        Self {
            merchants,
            policy: CreditScoringPolicy::new(),
        }
    }
}

#[async_trait]
impl ScoringAgent for CreditScoringAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::CreditScoring
    }

    async fn run(&self, case: &Case) -> Result<AgentReport, AgentFault> {
        let financials = self.merchants.financials(case.key.merchant_id).await?;
        let report = self.policy.assess(&financials);
        tracing::debug!(key = %case.key, approves = report.approves(), "merchant scored");
        Ok(report)
    }
}
