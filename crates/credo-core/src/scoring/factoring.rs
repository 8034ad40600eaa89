//! Factoring viability policy
//!
//! **Question**: should the factoring workflow proceed for this invoice?
//!
//! Checks purchase-order match and delivery confirmation, and recommends
//! a repayment tenor aligned with the buyer's observed payment cycle.

use serde::{Deserialize, Serialize};

use crate::types::{AgentReport, Case};

/// Fallback tenor when the buyer's payment cycle is unknown.
pub const DEFAULT_TENOR_DAYS: u32 = 30;

const MIN_TENOR_DAYS: u32 = 15;
const MAX_TENOR_DAYS: u32 = 90;

/// Purchase-order reconciliation record for an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoRecord {
    pub po_matched: bool,
    pub po_number: Option<String>,
    pub delivery_confirmed: bool,
}

/// The factoring viability policy.
pub struct FactoringPolicy;

impl FactoringPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, case: &Case, po: &PoRecord) -> AgentReport {
        let proceed = po.po_matched && po.delivery_confirmed;
        let recommended_tenor_days = recommend_tenor(case);

        let reasoning = match (&po.po_number, po.po_matched, po.delivery_confirmed) {
            (Some(number), true, true) => format!(
                "invoice matches {} with delivery confirmed; {}-day tenor fits the buyer's \
                 payment cycle",
                number, recommended_tenor_days
            ),
            (Some(number), true, false) => {
                format!("invoice matches {} but delivery is unconfirmed", number)
            }
            _ => format!(
                "no purchase order reconciled for invoice {}",
                case.key.invoice_id
            ),
        };

        AgentReport::Factoring {
            proceed,
            po_matched: po.po_matched,
            recommended_tenor_days,
            confidence: if proceed { 0.9 } else { 0.85 },
            reasoning,
        }
    }
}

impl Default for FactoringPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Round the buyer's average payment cycle up to the next 15-day step,
/// bounded to the product's tenor range.
fn recommend_tenor(case: &Case) -> u32 {
    match &case.buyer_history {
        Some(history) if history.avg_payment_days > 0 => {
            let stepped = history.avg_payment_days.div_ceil(MIN_TENOR_DAYS) * MIN_TENOR_DAYS;
            stepped.clamp(MIN_TENOR_DAYS, MAX_TENOR_DAYS)
        }
        _ => DEFAULT_TENOR_DAYS,
    }
}
