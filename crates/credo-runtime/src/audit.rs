//! Audit notification on terminal session transitions.
//!
//! The orchestrator notifies the sink fire-and-forget: the notification
//! is spawned and never awaited on the decision path, so a slow or
//! broken sink cannot delay or fail an analysis.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use credo_core::{CaseKey, Decision, Session};

/// One compliance record for a terminal session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub event_type: &'static str,
    pub session_id: Uuid,
    pub key: CaseKey,
    pub state: String,
    pub decision: Option<Decision>,
    pub offer_present: bool,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn terminal(session: &Session) -> Self {
        Self {
            event_type: "analysis_terminal",
            session_id: session.id,
            key: session.key,
            state: session.state.to_string(),
            decision: session.final_decision.as_ref().map(|d| d.decision),
            offer_present: session.offer.is_some(),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Default sink: structured log lines under the `credo::audit` target.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "credo::audit",
            event_type = event.event_type,
            session_id = %event.session_id,
            key = %event.key,
            state = %event.state,
            decision = ?event.decision,
            offer_present = event.offer_present,
            "audit event"
        );
    }
}

/// Dispatch an event without blocking the caller.
pub fn notify(sink: &Arc<dyn AuditSink>, event: AuditEvent) {
    let sink = sink.clone();
    tokio::spawn(async move {
        sink.record(event).await;
    });
}
