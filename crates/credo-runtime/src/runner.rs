//! Agent runner: deadline enforcement and failure isolation.
//!
//! One runner call produces exactly one [`AgentResult`], whatever the
//! agent does. A slow agent becomes `TIMEOUT` and its in-flight task is
//! aborted; a faulting or panicking agent becomes `ERROR`. Nothing an
//! agent does propagates as an error past this layer, and there are no
//! retries here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use credo_core::{AgentResult, Case};

use crate::agents::ScoringAgent;

/// Executes one agent against one case under a deadline.
#[derive(Debug, Clone, Copy)]
pub struct AgentRunner {
    deadline: Duration,
}

impl AgentRunner {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Run the agent, converting every outcome into a tagged result.
    pub async fn execute(&self, agent: Arc<dyn ScoringAgent>, case: Arc<Case>) -> AgentResult {
        let kind = agent.kind();
        let started = Instant::now();

        // Spawned so a panic is contained in the JoinError and an abort
        // at the deadline actually cancels the work.
        let task = tokio::spawn(async move { agent.run(&case).await });
        let abort = task.abort_handle();

        match tokio::time::timeout(self.deadline, task).await {
            Ok(Ok(Ok(report))) => {
                let latency = started.elapsed();
                tracing::debug!(agent = %kind, latency_ms = latency.as_millis() as u64, "agent completed");
                AgentResult::ok(kind, report, latency)
            }
            Ok(Ok(Err(fault))) => {
                let latency = started.elapsed();
                tracing::warn!(agent = %kind, error = %fault, "agent faulted");
                AgentResult::error(kind, fault.to_string(), latency)
            }
            Ok(Err(join_err)) => {
                let latency = started.elapsed();
                let message = if join_err.is_panic() {
                    "agent panicked".to_string()
                } else {
                    "agent task cancelled".to_string()
                };
                tracing::warn!(agent = %kind, error = %join_err, "agent task failed");
                AgentResult::error(kind, message, latency)
            }
            Err(_) => {
                abort.abort();
                tracing::warn!(agent = %kind, deadline = ?self.deadline, "agent timed out");
                AgentResult::timeout(kind, self.deadline)
            }
        }
    }
}
