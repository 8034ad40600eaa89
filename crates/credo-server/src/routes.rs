//! HTTP handlers and response shapes.
//!
//! The response bodies mirror what the client renders: a `final_decision`
//! block plus per-agent entries under `agent_results`, keyed
//! `supply_chain` / `credit_scoring` / `factoring`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use credo_core::{
    AgentKind, AgentResult, FinalDecision, Offer, Session, SessionState,
};
use credo_runtime::{Orchestrator, SubmitOutcome};

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sync_wait: Duration,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub invoice_id: u64,
    pub buyer_id: u64,
    #[serde(default = "default_merchant_id")]
    pub merchant_id: u64,
}

fn default_merchant_id() -> u64 {
    1
}

/// Per-agent results keyed the way the client consumes them.
#[derive(Debug, Serialize)]
pub struct AgentResultsBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply_chain: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_scoring: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factoring: Option<AgentResult>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub session_id: Uuid,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<FinalDecision>,
    pub agent_results: AgentResultsBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<Offer>,
}

impl From<&Session> for AnalysisResponse {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            state: session.state,
            final_decision: session.final_decision.clone(),
            agent_results: AgentResultsBody {
                supply_chain: session.result_for(AgentKind::SupplyChain).cloned(),
                credit_scoring: session.result_for(AgentKind::CreditScoring).cloned(),
                factoring: session.result_for(AgentKind::Factoring).cloned(),
            },
            offer: session.offer.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub session_id: Uuid,
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub agents: Vec<&'static str>,
    pub live_sessions: usize,
}

/// `POST /agents/analyze`
///
/// Resolves and validates the case, then joins the single-flight run for
/// its key. Answers 200 with the decision payload when the run finishes
/// within the sync wait, 202 with a poll target otherwise.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Response, ApiError> {
    let case = state
        .orchestrator
        .resolve_case(request.invoice_id, request.buyer_id, request.merchant_id)
        .await?;

    match state.orchestrator.clone().submit(case) {
        SubmitOutcome::Terminal(session) => terminal_response(&session),
        SubmitOutcome::Running(handle) => {
            let session_id = handle.session_id();
            let pending_state = handle.snapshot().state;

            match tokio::time::timeout(state.sync_wait, handle.wait_terminal()).await {
                Ok(Ok(session)) => terminal_response(&session),
                Ok(Err(store_err)) => Err(ApiError::Orchestrator(store_err.into())),
                Err(_) => Ok((
                    StatusCode::ACCEPTED,
                    Json(PendingResponse {
                        session_id,
                        state: pending_state,
                    }),
                )
                    .into_response()),
            }
        }
    }
}

/// `GET /agents/status/{session_id}`
///
/// Current state; the full decision/offer payload once terminal.
pub async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let session = state
        .orchestrator
        .store()
        .find_by_id(session_id)
        .ok_or(ApiError::SessionNotFound(session_id))?;

    if session.state.is_terminal() {
        Ok(Json(AnalysisResponse::from(session.as_ref())).into_response())
    } else {
        Ok(Json(PendingResponse {
            session_id: session.id,
            state: session.state,
        })
        .into_response())
    }
}

/// `GET /agents/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        agents: state.orchestrator.agent_names(),
        live_sessions: state.orchestrator.store().live_count(),
    })
}

fn terminal_response(session: &Session) -> Result<Response, ApiError> {
    if session.state == SessionState::Failed {
        return Err(ApiError::AnalysisFailed);
    }
    Ok(Json(AnalysisResponse::from(session)).into_response())
}
