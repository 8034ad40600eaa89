//! Factoring agent: purchase-order reconciliation and tenor fit.

use async_trait::async_trait;
use std::sync::Arc;

use credo_core::scoring::FactoringPolicy;
use credo_core::{AgentKind, AgentReport, Case};

use super::{AgentFault, ScoringAgent};
use crate::providers::InvoiceDirectory;

/// Fetches the invoice's PO reconciliation record and judges viability.
pub struct FactoringAgent {
    invoices: Arc<dyn InvoiceDirectory>,
    policy: FactoringPolicy,
}

impl FactoringAgent {
    pub fn new(invoices: Arc<dyn InvoiceDirectory>) -> Self {
        Self {
            invoices,
            policy: FactoringPolicy::new(),
        }
    }
}

#[async_trait]
impl ScoringAgent for FactoringAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Factoring
    }

    async fn run(&self, case: &Case) -> Result<AgentReport, AgentFault> {
        let po = self.invoices.po_record(case.key.invoice_id).await?;
        let report = self.policy.assess(case, &po);
        tracing::debug!(key = %case.key, approves = report.approves(), "factoring assessed");
        Ok(report)
    }
}
