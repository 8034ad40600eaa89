//! # credo-core
//!
//! Deterministic multi-agent credit decision engine.
//!
//! This crate is the pure heart of the orchestrator, answering:
//! - Should this invoice be financed?
//! - On what terms?
//! - Which agents stand behind the decision?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same results in, same decision and offer out
//! 2. **No I/O**: scoring policies consume pre-fetched snapshots only
//! 3. **Order-independent**: reasoning and contributors are composed in
//!    canonical agent order regardless of completion order
//! 4. **Vote-safe**: a timed-out or faulted agent is structurally unable
//!    to cast a vote
//!
//! ## Example
//!
//! ```rust,ignore
//! use credo_core::{resolve, AgentResult};
//!
//! let resolution = resolve(&case, &agent_results);
//! match resolution.final_decision.decision {
//!     Decision::Approved => println!("offer: {:?}", resolution.offer),
//!     Decision::Rejected => println!("declined"),
//!     Decision::ManualReview => println!("needs a human"),
//! }
//! ```

pub mod aggregator;
pub mod pricer;
pub mod scoring;
pub mod types;
pub mod validate;

// Re-export main types at crate root
pub use aggregator::{AgentWeights, Aggregator, AggregatorConfig};
pub use pricer::{OfferPricer, PricingConfig, PricingError};
pub use types::{
    AgentKind, AgentReport, AgentResult, AgentStatus, BuyerHistory, Case, CaseKey, Decision,
    FinalDecision, Offer, RateBreakdown, RiskLevel, ScoreTier, Session, SessionState,
};
pub use validate::ValidationError;

/// Fused outcome of one orchestration run.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub final_decision: FinalDecision,
    pub offer: Option<Offer>,
}

/// Aggregate agent results and, when approved, price the offer with
/// default policy parameters.
///
/// A pricer refusal (for example, the credit agent timed out after the
/// vote still approved) yields a resolution with a decision but no offer;
/// the caller reports such a session as degraded.
pub fn resolve(case: &Case, results: &[AgentResult]) -> Resolution {
    resolve_with(case, results, &Aggregator::new(), &OfferPricer::new())
}

/// [`resolve`] with explicit aggregation and pricing components.
pub fn resolve_with(
    case: &Case,
    results: &[AgentResult],
    aggregator: &Aggregator,
    pricer: &OfferPricer,
) -> Resolution {
    let final_decision = aggregator.aggregate(results);

    let offer = if final_decision.decision == Decision::Approved {
        match pricer.price(&final_decision, case, results) {
            Ok(offer) => Some(offer),
            Err(err) => {
                tracing::warn!(error = %err, key = %case.key, "approved but unpriceable");
                None
            }
        }
    } else {
        None
    };

    Resolution {
        final_decision,
        offer,
    }
}
