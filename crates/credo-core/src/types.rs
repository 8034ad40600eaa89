//! Core data model for credit decision orchestration.
//!
//! Everything here is plain data: construction, serde, and small
//! derivations. A `Case` is immutable once built, a `Session` is mutated
//! only by the orchestrator invocation that owns its RUNNING phase and is
//! frozen once terminal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Identity of a scoring agent.
///
/// The variant order is the canonical aggregation order: reasoning and
/// contributor lists are always composed in this order regardless of
/// completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    SupplyChain,
    CreditScoring,
    Factoring,
}

impl AgentKind {
    /// Canonical order for deterministic fan-in composition.
    pub const CANONICAL: [AgentKind; 3] = [
        AgentKind::SupplyChain,
        AgentKind::CreditScoring,
        AgentKind::Factoring,
    ];

    /// Human-readable agent name, as rendered to clients and audit logs.
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::SupplyChain => "SupplyChainAgent",
            AgentKind::CreditScoring => "CreditScoringAgent",
            AgentKind::Factoring => "FactoringAgent",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Idempotency key for one analysis: a case is uniquely identified by the
/// (merchant, buyer, invoice) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseKey {
    pub merchant_id: u64,
    pub buyer_id: u64,
    pub invoice_id: u64,
}

impl std::fmt::Display for CaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "m{}/b{}/i{}",
            self.merchant_id, self.buyer_id, self.invoice_id
        )
    }
}

/// Prior payment-cycle statistics for a buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyerHistory {
    /// Average days the buyer takes to settle an invoice.
    pub avg_payment_days: u32,

    /// Fraction of invoices settled on or before the due date, 0.0..=1.0.
    pub on_time_rate: f64,

    /// Number of invoices observed.
    pub total_invoices: u32,

    /// Bureau-style risk score, 0..=1000 (higher is safer).
    pub risk_score: u32,
}

/// One analysis request. Immutable once constructed; agents receive it by
/// shared reference and never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub key: CaseKey,

    /// Invoice face value. Always positive (enforced by validation).
    pub invoice_amount: f64,

    pub invoice_date: NaiveDate,

    /// Whether the invoice passed registry verification upstream.
    pub invoice_verified: bool,

    /// Buyer payment history, when the directory has one.
    pub buyer_history: Option<BuyerHistory>,
}

/// Risk band reported by the supply-chain policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Credit-score tier. Ordered ascending so tier comparisons read naturally
/// (`Excellent > Good`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Subprime,
    Fair,
    Good,
    Excellent,
}

impl ScoreTier {
    /// Fixed, ordered breakpoints mapping a 0..=1000 score to a tier.
    pub fn from_score(score: u32) -> Self {
        match score {
            800.. => ScoreTier::Excellent,
            700..=799 => ScoreTier::Good,
            600..=699 => ScoreTier::Fair,
            _ => ScoreTier::Subprime,
        }
    }
}

impl std::fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScoreTier::Subprime => "subprime",
            ScoreTier::Fair => "fair",
            ScoreTier::Good => "good",
            ScoreTier::Excellent => "excellent",
        };
        f.write_str(s)
    }
}

/// Per-agent result payload. A closed set of fixed schemas, one per agent
/// type; agent output never travels as an untyped map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agent", rename_all = "snake_case")]
pub enum AgentReport {
    SupplyChain {
        /// Whether the invoice is eligible for financing.
        financeable: bool,
        /// Suggested annualized rate, percent.
        recommended_rate: f64,
        risk_level: RiskLevel,
        confidence: f64,
        reasoning: String,
    },
    CreditScoring {
        /// Alternative-data credit score, 0..=1000.
        score: u32,
        tier: ScoreTier,
        /// Suggested exposure ceiling for the merchant.
        recommended_limit: f64,
        confidence: f64,
        reasoning: String,
    },
    Factoring {
        /// Whether factoring should proceed.
        proceed: bool,
        po_matched: bool,
        /// Suggested repayment tenor.
        recommended_tenor_days: u32,
        confidence: f64,
        reasoning: String,
    },
}

/// Score at or above which the credit-scoring opinion counts as an
/// approve vote.
pub const CREDIT_APPROVE_FLOOR: u32 = 600;

impl AgentReport {
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentReport::SupplyChain { .. } => AgentKind::SupplyChain,
            AgentReport::CreditScoring { .. } => AgentKind::CreditScoring,
            AgentReport::Factoring { .. } => AgentKind::Factoring,
        }
    }

    /// The agent-local vote this report casts.
    pub fn approves(&self) -> bool {
        match self {
            AgentReport::SupplyChain { financeable, .. } => *financeable,
            AgentReport::CreditScoring { score, .. } => *score >= CREDIT_APPROVE_FLOOR,
            AgentReport::Factoring { proceed, .. } => *proceed,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            AgentReport::SupplyChain { confidence, .. }
            | AgentReport::CreditScoring { confidence, .. }
            | AgentReport::Factoring { confidence, .. } => *confidence,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            AgentReport::SupplyChain { reasoning, .. }
            | AgentReport::CreditScoring { reasoning, .. }
            | AgentReport::Factoring { reasoning, .. } => reasoning,
        }
    }
}

/// Terminal status of one agent execution.
///
/// Invariant: only `Ok` carries a report. A timed-out or faulted agent has
/// no decision and no confidence, and is never counted as a vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Ok { report: AgentReport },
    Timeout,
    Error { message: String },
}

impl AgentStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, AgentStatus::Ok { .. })
    }

    pub fn report(&self) -> Option<&AgentReport> {
        match self {
            AgentStatus::Ok { report } => Some(report),
            _ => None,
        }
    }

    /// Status label as rendered in reasoning text and audit records.
    pub fn label(&self) -> &'static str {
        match self {
            AgentStatus::Ok { .. } => "OK",
            AgentStatus::Timeout => "TIMEOUT",
            AgentStatus::Error { .. } => "ERROR",
        }
    }
}

/// Output of one agent execution, as recorded on the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: AgentKind,
    #[serde(flatten)]
    pub status: AgentStatus,
    #[serde(with = "duration_millis")]
    pub latency: Duration,
}

impl AgentResult {
    pub fn ok(agent: AgentKind, report: AgentReport, latency: Duration) -> Self {
        Self {
            agent,
            status: AgentStatus::Ok { report },
            latency,
        }
    }

    pub fn timeout(agent: AgentKind, latency: Duration) -> Self {
        Self {
            agent,
            status: AgentStatus::Timeout,
            latency,
        }
    }

    pub fn error(agent: AgentKind, message: impl Into<String>, latency: Duration) -> Self {
        Self {
            agent,
            status: AgentStatus::Error {
                message: message.into(),
            },
            latency,
        }
    }

    pub fn report(&self) -> Option<&AgentReport> {
        self.status.report()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Fused decision over all attempted agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
    ManualReview,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Approved => "APPROVED",
            Decision::Rejected => "REJECTED",
            Decision::ManualReview => "MANUAL_REVIEW",
        };
        f.write_str(s)
    }
}

/// Aggregator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub decision: Decision,

    /// Fused confidence, 0.0..=1.0, penalized for missing responses.
    pub confidence: f64,

    /// Deterministic composition of per-agent reasoning in canonical
    /// order; non-responding agents are named with their failure status.
    pub reasoning: String,

    /// Agents whose reports contributed to the vote, canonical order.
    pub contributing_agents: Vec<AgentKind>,
}

/// Composition of the annualized rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBreakdown {
    pub base_rate: f64,
    pub risk_premium: f64,
    pub tenor_adjustment: f64,
}

/// Financing offer terms. Present only on approved decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Advance paid to the merchant. Never exceeds the invoice amount.
    pub offer_amount: f64,

    /// Annualized rate, percent. Always positive.
    pub rate: f64,

    /// Repayment tenor in days. Always positive.
    pub tenor_days: u32,

    pub tier: ScoreTier,

    /// Interest withheld over the tenor.
    pub discount: f64,

    /// Flat processing fee.
    pub processing_fee: f64,

    /// What the merchant actually receives.
    pub net_amount: f64,

    pub breakdown: RateBreakdown,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Pending,
    Running,
    Completed,
    Degraded,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Degraded | SessionState::Failed
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Pending => "PENDING",
            SessionState::Running => "RUNNING",
            SessionState::Completed => "COMPLETED",
            SessionState::Degraded => "DEGRADED",
            SessionState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// The unit of work and caching: one case, its agent results, and the
/// fused outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub key: CaseKey,
    pub state: SessionState,
    pub case: Case,
    pub agent_results: Vec<AgentResult>,
    pub final_decision: Option<FinalDecision>,
    pub offer: Option<Offer>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A fresh PENDING session for a case.
    pub fn new(case: Case) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: case.key,
            state: SessionState::Pending,
            case,
            agent_results: Vec::new(),
            final_decision: None,
            offer: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Look up a specific agent's result.
    pub fn result_for(&self, agent: AgentKind) -> Option<&AgentResult> {
        self.agent_results.iter().find(|r| r.agent == agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_breakpoints() {
        assert_eq!(ScoreTier::from_score(1000), ScoreTier::Excellent);
        assert_eq!(ScoreTier::from_score(800), ScoreTier::Excellent);
        assert_eq!(ScoreTier::from_score(799), ScoreTier::Good);
        assert_eq!(ScoreTier::from_score(700), ScoreTier::Good);
        assert_eq!(ScoreTier::from_score(699), ScoreTier::Fair);
        assert_eq!(ScoreTier::from_score(600), ScoreTier::Fair);
        assert_eq!(ScoreTier::from_score(599), ScoreTier::Subprime);
        assert_eq!(ScoreTier::from_score(0), ScoreTier::Subprime);
    }

    #[test]
    fn tiers_order_ascending() {
        assert!(ScoreTier::Excellent > ScoreTier::Good);
        assert!(ScoreTier::Good > ScoreTier::Fair);
        assert!(ScoreTier::Fair > ScoreTier::Subprime);
    }

    #[test]
    fn non_ok_status_carries_no_report() {
        let timeout = AgentResult::timeout(AgentKind::Factoring, Duration::from_millis(500));
        assert!(timeout.report().is_none());
        assert!(!timeout.status.is_ok());
        assert_eq!(timeout.status.label(), "TIMEOUT");

        let error = AgentResult::error(AgentKind::CreditScoring, "provider down", Duration::ZERO);
        assert!(error.report().is_none());
        assert_eq!(error.status.label(), "ERROR");
    }

    #[test]
    fn credit_vote_follows_approve_floor() {
        let approve = AgentReport::CreditScoring {
            score: 600,
            tier: ScoreTier::Fair,
            recommended_limit: 50_000.0,
            confidence: 0.8,
            reasoning: "adequate".into(),
        };
        assert!(approve.approves());

        let reject = AgentReport::CreditScoring {
            score: 599,
            tier: ScoreTier::Subprime,
            recommended_limit: 0.0,
            confidence: 0.8,
            reasoning: "thin file".into(),
        };
        assert!(!reject.approves());
    }

    #[test]
    fn agent_result_serde_round_trip() {
        let result = AgentResult::ok(
            AgentKind::SupplyChain,
            AgentReport::SupplyChain {
                financeable: true,
                recommended_rate: 2.5,
                risk_level: RiskLevel::Low,
                confidence: 0.9,
                reasoning: "reliable buyer".into(),
            },
            Duration::from_millis(42),
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["agent"], "supply_chain");
        assert_eq!(json["status"], "OK");
        assert_eq!(json["latency"], 42);

        let back: AgentResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
