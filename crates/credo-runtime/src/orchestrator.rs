//! Orchestrator: concurrent fan-out, deterministic fan-in.
//!
//! One `analyze` call owns the full lifecycle of a session:
//! - Single-flight admission through the session store
//! - Parallel dispatch of every configured agent under the deadline
//! - Aggregation and pricing via credo-core
//! - Terminal state transition and fire-and-forget audit notification
//!
//! Agent failures never surface here as errors; they arrive as tagged
//! results and flow into aggregation. Only validation and
//! infrastructure faults are errors to the caller.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;

use credo_core::validate;
use credo_core::{
    resolve_with, Aggregator, Case, CaseKey, Decision, OfferPricer, Session, SessionState,
    ValidationError,
};

use crate::agents::{
    CreditScoringAgent, FactoringAgent, ScoringAgent, SupplyChainAgent,
};
use crate::audit::{notify, AuditEvent, AuditSink, TracingAuditSink};
use crate::config::RuntimeConfig;
use crate::providers::{BuyerDirectory, InvoiceDirectory, MerchantDirectory, ProviderError};
use crate::runner::AgentRunner;
use crate::store::{BeginOutcome, RunHandle, RunOwner, SessionStore, StoreError};

/// Errors surfaced to the orchestrator's caller.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("case lookup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("orchestration failed: {0}")]
    Store(#[from] StoreError),

    #[error("not configured: {0}")]
    NotConfigured(&'static str),
}

/// Outcome of a non-blocking submission.
pub enum SubmitOutcome {
    /// The key already resolved to a terminal session.
    Terminal(Arc<Session>),

    /// A run is in flight (just started or joined); poll the handle.
    Running(RunHandle),
}

/// The orchestrator fans a case out to all configured agents and fans
/// the results back into one session.
pub struct Orchestrator {
    agents: Vec<Arc<dyn ScoringAgent>>,
    aggregator: Aggregator,
    pricer: OfferPricer,
    store: SessionStore,
    invoices: Arc<dyn InvoiceDirectory>,
    buyers: Arc<dyn BuyerDirectory>,
    audit: Arc<dyn AuditSink>,
    config: RuntimeConfig,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Standard three-agent wiring over one directory implementing all
    /// provider traits.
    pub fn with_directory<D>(directory: Arc<D>, config: RuntimeConfig) -> Self
    where
        D: InvoiceDirectory + BuyerDirectory + MerchantDirectory + Send + Sync + 'static,
    {
        let invoices: Arc<dyn InvoiceDirectory> = directory.clone();
        let buyers: Arc<dyn BuyerDirectory> = directory.clone();
        let merchants: Arc<dyn MerchantDirectory> = directory.clone();

        Orchestrator {
            aggregator: Aggregator::with_config(config.aggregator.clone()),
            pricer: OfferPricer::with_config(config.pricing.clone()),
            store: SessionStore::new(&config.store),
            agents: vec![
                Arc::new(SupplyChainAgent::new()),
                Arc::new(CreditScoringAgent::new(merchants)),
                Arc::new(FactoringAgent::new(invoices.clone())),
            ],
            invoices,
            buyers,
            audit: Arc::new(TracingAuditSink),
            config,
        }
    }

    /// The session store, for status lookups by the outer surface.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Names of the configured agents, in registration order.
    pub fn agent_names(&self) -> Vec<&'static str> {
        self.agents.iter().map(|a| a.kind().name()).collect()
    }

    /// Resolve and validate a case from raw request identifiers.
    ///
    /// The invoice record is authoritative for the key; a request whose
    /// buyer or merchant id disagrees with the record is rejected before
    /// any session exists.
    pub async fn resolve_case(
        &self,
        invoice_id: u64,
        buyer_id: u64,
        merchant_id: u64,
    ) -> Result<Case, OrchestratorError> {
        validate::validate_identifiers(invoice_id, buyer_id, merchant_id)?;

        let record = self.invoices.invoice(invoice_id).await?;
        if let Some(irn) = &record.irn {
            validate::validate_invoice_ref(irn)?;
        }

        let requested = CaseKey {
            merchant_id,
            buyer_id,
            invoice_id,
        };
        let buyer_history = self.buyers.payment_history(record.buyer_id).await?;

        let case = Case {
            key: CaseKey {
                merchant_id: record.merchant_id,
                buyer_id: record.buyer_id,
                invoice_id: record.invoice_id,
            },
            invoice_amount: record.amount,
            invoice_date: record.invoice_date,
            invoice_verified: record.verified,
            buyer_history,
        };
        validate::validate_case(&case, &requested)?;

        Ok(case)
    }

    /// Analyze a case, waiting for the terminal session.
    ///
    /// Concurrent calls for the same key share a single execution: one
    /// caller runs the agents, the rest await the identical session.
    pub async fn analyze(&self, case: Case) -> Result<Arc<Session>, OrchestratorError> {
        match self.store.begin(case) {
            BeginOutcome::Finished(session) => Ok(session),
            BeginOutcome::Joined(handle) => Ok(handle.wait_terminal().await?),
            BeginOutcome::Started(owner) => Ok(self.run(owner).await),
        }
    }

    /// Submit a case without waiting: the run proceeds in the background
    /// and the caller polls the returned handle.
    pub fn submit(self: Arc<Self>, case: Case) -> SubmitOutcome {
        match self.store.begin(case) {
            BeginOutcome::Finished(session) => SubmitOutcome::Terminal(session),
            BeginOutcome::Joined(handle) => SubmitOutcome::Running(handle),
            BeginOutcome::Started(owner) => {
                let handle = owner.subscribe();
                tokio::spawn(async move {
                    self.run(owner).await;
                });
                SubmitOutcome::Running(handle)
            }
        }
    }

    /// Execute one owned run to its terminal state.
    async fn run(&self, mut owner: RunOwner) -> Arc<Session> {
        let key = owner.session().key;
        owner.session_mut().state = SessionState::Running;
        owner.publish();
        tracing::info!(%key, agents = self.agents.len(), "analysis started");

        let case = Arc::new(owner.session().case.clone());
        let runner = AgentRunner::new(self.config.agent_deadline());

        // Fan-out: all agents concurrently, each bounded by its own
        // deadline so a slow one cannot starve the rest.
        let results = join_all(
            self.agents
                .iter()
                .map(|agent| runner.execute(agent.clone(), case.clone())),
        )
        .await;

        // Fan-in: deterministic aggregation and pricing.
        let resolution = resolve_with(&case, &results, &self.aggregator, &self.pricer);

        let all_ok = results.iter().all(|r| r.status.is_ok());
        let approved_unpriced =
            resolution.final_decision.decision == Decision::Approved && resolution.offer.is_none();
        let state = if all_ok && !approved_unpriced {
            SessionState::Completed
        } else {
            SessionState::Degraded
        };

        {
            let session = owner.session_mut();
            session.agent_results = results;
            session.final_decision = Some(resolution.final_decision);
            session.offer = resolution.offer;
            session.state = state;
            session.completed_at = Some(Utc::now());
        }
        let session = owner.complete();

        tracing::info!(
            %key,
            state = %session.state,
            decision = ?session.final_decision.as_ref().map(|d| d.decision),
            "analysis finished"
        );
        notify(&self.audit, AuditEvent::terminal(&session));

        session
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    config: RuntimeConfig,
    agents: Vec<Arc<dyn ScoringAgent>>,
    invoices: Option<Arc<dyn InvoiceDirectory>>,
    buyers: Option<Arc<dyn BuyerDirectory>>,
    audit: Arc<dyn AuditSink>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            agents: Vec::new(),
            invoices: None,
            buyers: None,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a scoring agent. Order here is registration order only;
    /// aggregation output is always canonical.
    pub fn agent(mut self, agent: Arc<dyn ScoringAgent>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn invoices(mut self, invoices: Arc<dyn InvoiceDirectory>) -> Self {
        self.invoices = Some(invoices);
        self
    }

    pub fn buyers(mut self, buyers: Arc<dyn BuyerDirectory>) -> Self {
        self.buyers = Some(buyers);
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        let invoices = self
            .invoices
            .ok_or(OrchestratorError::NotConfigured("invoice directory"))?;
        let buyers = self
            .buyers
            .ok_or(OrchestratorError::NotConfigured("buyer directory"))?;
        if self.agents.is_empty() {
            return Err(OrchestratorError::NotConfigured("at least one agent"));
        }

        Ok(Orchestrator {
            aggregator: Aggregator::with_config(self.config.aggregator.clone()),
            pricer: OfferPricer::with_config(self.config.pricing.clone()),
            store: SessionStore::new(&self.config.store),
            agents: self.agents,
            invoices,
            buyers,
            audit: self.audit,
            config: self.config,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use credo_core::{AgentKind, AgentReport, AgentStatus, RiskLevel, ScoreTier};

    use crate::agents::AgentFault;
    use crate::audit::testing::RecordingAuditSink;
    use crate::providers::InMemoryDirectory;

    enum Behavior {
        Approve,
        Reject,
        Fault,
        Stall,
    }

    struct StubAgent {
        kind: AgentKind,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl StubAgent {
        fn new(kind: AgentKind, behavior: Behavior) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Arc::new(Self {
                    kind,
                    behavior,
                    calls: calls.clone(),
                }),
                calls,
            )
        }

        fn report(&self, approve: bool) -> AgentReport {
            match self.kind {
                AgentKind::SupplyChain => AgentReport::SupplyChain {
                    financeable: approve,
                    recommended_rate: 2.5,
                    risk_level: RiskLevel::Low,
                    confidence: 0.9,
                    reasoning: "stub".into(),
                },
                AgentKind::CreditScoring => AgentReport::CreditScoring {
                    score: if approve { 900 } else { 400 },
                    tier: ScoreTier::from_score(if approve { 900 } else { 400 }),
                    recommended_limit: 100_000.0,
                    confidence: 0.9,
                    reasoning: "stub".into(),
                },
                AgentKind::Factoring => AgentReport::Factoring {
                    proceed: approve,
                    po_matched: approve,
                    recommended_tenor_days: 30,
                    confidence: 0.9,
                    reasoning: "stub".into(),
                },
            }
        }
    }

    #[async_trait]
    impl ScoringAgent for StubAgent {
        fn kind(&self) -> AgentKind {
            self.kind
        }

        async fn run(&self, _case: &Case) -> Result<AgentReport, AgentFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Small stagger so concurrent analyze calls overlap.
            tokio::time::sleep(Duration::from_millis(20)).await;
            match self.behavior {
                Behavior::Approve => Ok(self.report(true)),
                Behavior::Reject => Ok(self.report(false)),
                Behavior::Fault => Err(AgentFault::Internal("stub failure".into())),
                Behavior::Stall => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(self.report(true))
                }
            }
        }
    }

    fn stub_orchestrator(
        behaviors: [Behavior; 3],
        audit: Arc<dyn AuditSink>,
    ) -> (Arc<Orchestrator>, Vec<Arc<AtomicUsize>>) {
        let directory = Arc::new(InMemoryDirectory::with_demo_data());
        let [supply, credit, factoring] = behaviors;

        let (a1, c1) = StubAgent::new(AgentKind::SupplyChain, supply);
        let (a2, c2) = StubAgent::new(AgentKind::CreditScoring, credit);
        let (a3, c3) = StubAgent::new(AgentKind::Factoring, factoring);

        let config = RuntimeConfig {
            overall_deadline: Duration::from_millis(150),
            ..Default::default()
        };

        let orchestrator = Orchestrator::builder()
            .config(config)
            .invoices(directory.clone())
            .buyers(directory)
            .audit(audit)
            .agent(a1)
            .agent(a2)
            .agent(a3)
            .build()
            .unwrap();

        (Arc::new(orchestrator), vec![c1, c2, c3])
    }

    async fn demo_case(orchestrator: &Orchestrator) -> Case {
        orchestrator.resolve_case(1, 101, 1).await.unwrap()
    }

    #[tokio::test]
    async fn full_approval_completes_with_offer() {
        let directory = Arc::new(InMemoryDirectory::with_demo_data());
        let orchestrator =
            Orchestrator::with_directory(directory, RuntimeConfig::default());

        let case = orchestrator.resolve_case(1, 101, 1).await.unwrap();
        let session = orchestrator.analyze(case).await.unwrap();

        assert_eq!(session.state, SessionState::Completed);
        let decision = session.final_decision.as_ref().unwrap();
        assert_eq!(decision.decision, Decision::Approved);
        assert_eq!(decision.contributing_agents.len(), 3);

        // Seeded merchant scores 767: good tier, 85% advance.
        let offer = session.offer.as_ref().unwrap();
        assert_eq!(offer.tier, ScoreTier::Good);
        assert!((offer.offer_amount - 0.85 * 75_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn single_dissent_does_not_block_approval() {
        let directory = Arc::new(InMemoryDirectory::with_demo_data());
        let orchestrator =
            Orchestrator::with_directory(directory, RuntimeConfig::default());

        // Buyer 105: 62% on-time, risk score 510.
        let case = orchestrator.resolve_case(3, 105, 1).await.unwrap();
        let session = orchestrator.analyze(case).await.unwrap();

        assert_eq!(session.state, SessionState::Completed);
        let decision = session.final_decision.as_ref().unwrap();
        // Supply chain votes no; credit (merchant-keyed) and factoring
        // still vote yes, so the default threshold approves 2 of 3. The
        // offer then prices at the merchant's tier.
        assert_eq!(decision.decision, Decision::Approved);
        assert!(session.offer.is_some());
    }

    #[tokio::test]
    async fn stalling_agent_times_out_and_session_degrades() {
        let (orchestrator, _) = stub_orchestrator(
            [Behavior::Approve, Behavior::Approve, Behavior::Stall],
            Arc::new(TracingAuditSink),
        );

        let case = demo_case(&orchestrator).await;
        let session = orchestrator.analyze(case).await.unwrap();

        // Liveness: terminal despite the stalled agent.
        assert_eq!(session.state, SessionState::Degraded);
        let factoring = session
            .result_for(AgentKind::Factoring)
            .expect("every attempted agent is recorded");
        assert_eq!(factoring.status, AgentStatus::Timeout);

        let decision = session.final_decision.as_ref().unwrap();
        assert_eq!(decision.decision, Decision::Approved);
        // Two of three responded: penalty keeps confidence under 0.9.
        assert!(decision.confidence < 0.9);
    }

    #[tokio::test]
    async fn quorum_unmet_yields_manual_review_without_offer() {
        let (orchestrator, _) = stub_orchestrator(
            [Behavior::Fault, Behavior::Approve, Behavior::Stall],
            Arc::new(TracingAuditSink),
        );

        let case = demo_case(&orchestrator).await;
        let session = orchestrator.analyze(case).await.unwrap();

        assert_eq!(session.state, SessionState::Degraded);
        let decision = session.final_decision.as_ref().unwrap();
        assert_eq!(decision.decision, Decision::ManualReview);
        assert_eq!(decision.confidence, 0.0);
        assert!(session.offer.is_none());
        assert!(decision.reasoning.contains("SupplyChainAgent: ERROR"));
        assert!(decision.reasoning.contains("FactoringAgent: TIMEOUT"));
    }

    #[tokio::test]
    async fn concurrent_same_key_calls_share_one_execution() {
        let (orchestrator, counters) = stub_orchestrator(
            [Behavior::Approve, Behavior::Approve, Behavior::Approve],
            Arc::new(TracingAuditSink),
        );

        let case = demo_case(&orchestrator).await;
        let (first, second) =
            tokio::join!(orchestrator.analyze(case.clone()), orchestrator.analyze(case));

        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first, second);
        for counter in counters {
            assert_eq!(counter.load(Ordering::SeqCst), 1, "one invocation per agent");
        }
    }

    #[tokio::test]
    async fn repeat_analyze_reads_the_cached_session() {
        let (orchestrator, counters) = stub_orchestrator(
            [Behavior::Approve, Behavior::Approve, Behavior::Approve],
            Arc::new(TracingAuditSink),
        );

        let case = demo_case(&orchestrator).await;
        let first = orchestrator.analyze(case.clone()).await.unwrap();
        let second = orchestrator.analyze(case).await.unwrap();

        assert_eq!(first.id, second.id);
        for counter in counters {
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn submit_polls_to_the_same_terminal_session() {
        let (orchestrator, _) = stub_orchestrator(
            [Behavior::Approve, Behavior::Approve, Behavior::Approve],
            Arc::new(TracingAuditSink),
        );

        let case = demo_case(&orchestrator).await;
        let SubmitOutcome::Running(handle) = orchestrator.clone().submit(case.clone()) else {
            panic!("fresh submit must start a run");
        };
        let session_id = handle.session_id();

        let session = handle.wait_terminal().await.unwrap();
        assert!(session.state.is_terminal());
        assert_eq!(session.id, session_id);

        let SubmitOutcome::Terminal(cached) = orchestrator.submit(case) else {
            panic!("resubmit after completion must be terminal");
        };
        assert_eq!(cached.id, session_id);
    }

    #[tokio::test]
    async fn validation_rejects_before_any_session_exists() {
        let directory = Arc::new(InMemoryDirectory::with_demo_data());
        let orchestrator =
            Orchestrator::with_directory(directory, RuntimeConfig::default());

        let err = orchestrator.resolve_case(0, 101, 1).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));

        // Invoice 1 belongs to buyer 101, not 103.
        let err = orchestrator.resolve_case(1, 103, 1).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Validation(ValidationError::IdentifierMismatch { .. })
        ));

        let err = orchestrator.resolve_case(999, 101, 1).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Provider(_)));

        assert_eq!(orchestrator.store().live_count(), 0);
    }

    #[tokio::test]
    async fn audit_sink_is_notified_on_terminal_transition() {
        let audit = Arc::new(RecordingAuditSink::default());
        let (orchestrator, _) = stub_orchestrator(
            [Behavior::Approve, Behavior::Approve, Behavior::Approve],
            audit.clone(),
        );

        let case = demo_case(&orchestrator).await;
        let session = orchestrator.analyze(case).await.unwrap();

        // Fire-and-forget: give the spawned notification a beat.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, session.id);
        assert_eq!(events[0].state, "COMPLETED");
        assert_eq!(events[0].decision, Some(Decision::Approved));
    }
}
