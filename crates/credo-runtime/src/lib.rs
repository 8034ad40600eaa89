//! # credo-runtime
//!
//! Concurrent orchestration runtime for the credo decision engine.
//!
//! Where `credo-core` is pure and deterministic, this crate owns
//! everything that touches time and concurrency:
//!
//! - The [`ScoringAgent`] trait and the three standard agents
//! - The [`AgentRunner`]: per-agent deadlines and fault isolation
//! - The [`Orchestrator`]: single-flight fan-out/fan-in per case key
//! - The [`SessionStore`]: at-most-one concurrent run per key, idempotent
//!   reads of terminal sessions
//! - Read-only data providers and the audit sink
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use credo_runtime::{Orchestrator, RuntimeConfig, providers::InMemoryDirectory};
//!
//! let directory = Arc::new(InMemoryDirectory::with_demo_data());
//! let orchestrator = Orchestrator::with_directory(directory, RuntimeConfig::default());
//!
//! let case = orchestrator.resolve_case(1, 101, 1).await?;
//! let session = orchestrator.analyze(case).await?;
//! println!("{}", session.state);
//! ```

pub mod agents;
pub mod audit;
pub mod config;
pub mod orchestrator;
pub mod providers;
pub mod runner;
pub mod store;

pub use agents::{
    AgentFault, CreditScoringAgent, FactoringAgent, ScoringAgent, SupplyChainAgent,
};
pub use audit::{AuditEvent, AuditSink, TracingAuditSink};
pub use config::{RuntimeConfig, StoreConfig};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorError, SubmitOutcome};
pub use runner::AgentRunner;
pub use store::{BeginOutcome, RunHandle, RunOwner, SessionStore, StoreError};
