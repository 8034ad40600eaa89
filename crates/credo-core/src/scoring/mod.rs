//! Deterministic scoring policies, one per agent.
//!
//! Each policy is a pure function from read-only snapshots to one
//! [`AgentReport`](crate::types::AgentReport). Policies never see each
//! other's output and never touch mutable state; the async agents in the
//! runtime crate fetch the snapshots and delegate here.
//!
//! The concrete formulas are a default policy, not authoritative business
//! rules: any scorer producing the same report shape can be swapped in
//! without touching aggregation or pricing.

mod credit;
mod factoring;
mod supply_chain;

pub use credit::{
    ActivityTrend, CashflowSnapshot, CreditScoringPolicy, GstCompliance, MerchantFinancials,
    UpiActivity,
};
pub use factoring::{FactoringPolicy, PoRecord, DEFAULT_TENOR_DAYS};
pub use supply_chain::SupplyChainPolicy;
