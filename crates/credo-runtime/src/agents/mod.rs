//! Scoring agents.
//!
//! Each agent pairs a pure policy from `credo_core::scoring` with the
//! provider lookups it needs. The orchestrator holds them as trait
//! objects and neither knows nor cares which concrete agents are wired.

mod credit;
mod factoring;
mod supply_chain;
mod traits;

pub use credit::CreditScoringAgent;
pub use factoring::FactoringAgent;
pub use supply_chain::SupplyChainAgent;
pub use traits::{AgentFault, ScoringAgent};
