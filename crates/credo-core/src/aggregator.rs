//! Aggregator: fuses agent results into one final decision.
//!
//! The aggregation policy is deterministic and pure:
//! 1. Fewer than quorum OK results: MANUAL_REVIEW at confidence 0
//! 2. Otherwise a weighted approve vote over the agents that responded
//! 3. Confidence is the weighted mean of contributing confidences,
//!    penalized by the fraction of configured weight that never responded
//!
//! Reasoning and contributor lists are composed in canonical agent order,
//! so the output is identical regardless of completion order. An absent
//! result is never a vote, and a failed agent is always named.

use serde::{Deserialize, Serialize};

use crate::types::{AgentKind, AgentResult, AgentStatus, Decision, FinalDecision};

/// Relative vote weight per agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentWeights {
    pub supply_chain: f64,
    pub credit_scoring: f64,
    pub factoring: f64,
}

impl AgentWeights {
    pub fn weight(&self, agent: AgentKind) -> f64 {
        match agent {
            AgentKind::SupplyChain => self.supply_chain,
            AgentKind::CreditScoring => self.credit_scoring,
            AgentKind::Factoring => self.factoring,
        }
    }
}

impl Default for AgentWeights {
    fn default() -> Self {
        Self {
            supply_chain: 1.0,
            credit_scoring: 1.0,
            factoring: 1.0,
        }
    }
}

/// Tunable aggregation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Minimum number of OK agents for a non-MANUAL_REVIEW decision.
    pub quorum: usize,

    /// Approve iff the approve share of *responding* weight reaches this.
    /// Missing agents do not count against the denominator, so a single
    /// timeout cannot force a rejection on its own.
    pub approval_threshold: f64,

    pub weights: AgentWeights,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            quorum: 2,
            approval_threshold: 0.5,
            weights: AgentWeights::default(),
        }
    }
}

/// The aggregator fuses per-agent results into a [`FinalDecision`].
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_config(AggregatorConfig::default())
    }

    pub fn with_config(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Fuse the (possibly partial) results of one orchestration run.
    pub fn aggregate(&self, results: &[AgentResult]) -> FinalDecision {
        let ordered = canonical_order(results);

        let contributing: Vec<AgentKind> = ordered
            .iter()
            .filter(|r| r.status.is_ok())
            .map(|r| r.agent)
            .collect();

        let reasoning_body = compose_reasoning(&ordered);

        if contributing.len() < self.config.quorum {
            tracing::warn!(
                responded = contributing.len(),
                quorum = self.config.quorum,
                "quorum unmet, routing to manual review"
            );
            return FinalDecision {
                decision: Decision::ManualReview,
                confidence: 0.0,
                reasoning: format!(
                    "quorum unmet: {}/{} agents responded; {}",
                    contributing.len(),
                    ordered.len(),
                    reasoning_body
                ),
                contributing_agents: contributing,
            };
        }

        let total_weight: f64 = ordered
            .iter()
            .map(|r| self.config.weights.weight(r.agent))
            .sum();

        let mut responding_weight = 0.0;
        let mut approve_weight = 0.0;
        let mut weighted_confidence = 0.0;

        for result in &ordered {
            if let AgentStatus::Ok { report } = &result.status {
                let weight = self.config.weights.weight(result.agent);
                responding_weight += weight;
                weighted_confidence += weight * report.confidence();
                if report.approves() {
                    approve_weight += weight;
                }
            }
        }

        if responding_weight <= 0.0 {
            return FinalDecision {
                decision: Decision::ManualReview,
                confidence: 0.0,
                reasoning: format!("no weighted responses; {}", reasoning_body),
                contributing_agents: contributing,
            };
        }

        let approve_share = approve_weight / responding_weight;
        let decision = if approve_share >= self.config.approval_threshold {
            Decision::Approved
        } else {
            Decision::Rejected
        };

        // Fewer responses means less certainty, even on a unanimous vote.
        let response_penalty = if total_weight > 0.0 {
            responding_weight / total_weight
        } else {
            0.0
        };
        let confidence =
            ((weighted_confidence / responding_weight) * response_penalty).clamp(0.0, 1.0);

        tracing::debug!(
            %decision,
            confidence,
            approve_share,
            responded = contributing.len(),
            "aggregated agent results"
        );

        FinalDecision {
            decision,
            confidence,
            reasoning: reasoning_body,
            contributing_agents: contributing,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Order results canonically, keeping the first result per agent kind.
fn canonical_order(results: &[AgentResult]) -> Vec<AgentResult> {
    AgentKind::CANONICAL
        .iter()
        .filter_map(|kind| results.iter().find(|r| r.agent == *kind))
        .cloned()
        .collect()
}

/// Deterministic reasoning text: every attempted agent appears, in
/// canonical order, with its reasoning or its failure status.
fn compose_reasoning(ordered: &[AgentResult]) -> String {
    let parts: Vec<String> = ordered
        .iter()
        .map(|result| match &result.status {
            AgentStatus::Ok { report } => {
                format!("{}: {}", result.agent.name(), report.reasoning())
            }
            AgentStatus::Timeout => format!(
                "{}: TIMEOUT (no result before deadline)",
                result.agent.name()
            ),
            AgentStatus::Error { message } => {
                format!("{}: ERROR ({})", result.agent.name(), message)
            }
        })
        .collect();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentReport, RiskLevel, ScoreTier};
    use std::time::Duration;

    fn supply_chain_ok(financeable: bool, confidence: f64) -> AgentResult {
        AgentResult::ok(
            AgentKind::SupplyChain,
            AgentReport::SupplyChain {
                financeable,
                recommended_rate: 2.5,
                risk_level: RiskLevel::Low,
                confidence,
                reasoning: "reliable buyer".into(),
            },
            Duration::from_millis(10),
        )
    }

    fn credit_ok(score: u32, confidence: f64) -> AgentResult {
        AgentResult::ok(
            AgentKind::CreditScoring,
            AgentReport::CreditScoring {
                score,
                tier: ScoreTier::from_score(score),
                recommended_limit: 100_000.0,
                confidence,
                reasoning: "healthy cashflow".into(),
            },
            Duration::from_millis(12),
        )
    }

    fn factoring_ok(proceed: bool, confidence: f64) -> AgentResult {
        AgentResult::ok(
            AgentKind::Factoring,
            AgentReport::Factoring {
                proceed,
                po_matched: true,
                recommended_tenor_days: 30,
                confidence,
                reasoning: "PO matched".into(),
            },
            Duration::from_millis(8),
        )
    }

    #[test]
    fn unanimous_full_confidence_approves_at_full_confidence() {
        let aggregator = Aggregator::new();
        let decision = aggregator.aggregate(&[
            supply_chain_ok(true, 1.0),
            credit_ok(900, 1.0),
            factoring_ok(true, 1.0),
        ]);

        assert_eq!(decision.decision, Decision::Approved);
        assert_eq!(decision.confidence, 1.0);
        assert_eq!(decision.contributing_agents, AgentKind::CANONICAL.to_vec());
    }

    #[test]
    fn one_timeout_still_approves_but_with_penalized_confidence() {
        let aggregator = Aggregator::new();

        let full = aggregator.aggregate(&[
            supply_chain_ok(true, 0.9),
            credit_ok(900, 0.9),
            factoring_ok(true, 0.9),
        ]);

        let partial = aggregator.aggregate(&[
            supply_chain_ok(true, 0.9),
            credit_ok(900, 0.9),
            AgentResult::timeout(AgentKind::Factoring, Duration::from_secs(5)),
        ]);

        assert_eq!(full.decision, Decision::Approved);
        assert_eq!(partial.decision, Decision::Approved);
        assert!(
            partial.confidence < full.confidence,
            "missing response must lower confidence: {} vs {}",
            partial.confidence,
            full.confidence
        );
        assert_eq!(
            partial.contributing_agents,
            vec![AgentKind::SupplyChain, AgentKind::CreditScoring]
        );
    }

    #[test]
    fn two_failures_force_manual_review_regardless_of_vote() {
        let aggregator = Aggregator::new();
        let decision = aggregator.aggregate(&[
            AgentResult::error(AgentKind::SupplyChain, "provider down", Duration::ZERO),
            credit_ok(950, 0.99),
            AgentResult::timeout(AgentKind::Factoring, Duration::from_secs(5)),
        ]);

        assert_eq!(decision.decision, Decision::ManualReview);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.contributing_agents, vec![AgentKind::CreditScoring]);
        assert!(decision.reasoning.starts_with("quorum unmet"));
    }

    #[test]
    fn majority_rejection_rejects() {
        let aggregator = Aggregator::new();
        let decision = aggregator.aggregate(&[
            supply_chain_ok(false, 0.9),
            credit_ok(400, 0.8),
            factoring_ok(true, 0.9),
        ]);

        assert_eq!(decision.decision, Decision::Rejected);
    }

    #[test]
    fn even_split_of_responders_approves_at_default_threshold() {
        // Two responders, one approve: share is exactly 0.5 and the
        // default threshold admits it. Operators wanting a strict
        // majority raise the threshold.
        let aggregator = Aggregator::new();
        let decision = aggregator.aggregate(&[
            supply_chain_ok(true, 0.9),
            credit_ok(400, 0.8),
            AgentResult::timeout(AgentKind::Factoring, Duration::from_secs(5)),
        ]);

        assert_eq!(decision.decision, Decision::Approved);
    }

    #[test]
    fn reasoning_is_canonical_and_names_failures() {
        let aggregator = Aggregator::new();

        // Deliberately out of order.
        let decision = aggregator.aggregate(&[
            factoring_ok(true, 0.9),
            AgentResult::error(AgentKind::CreditScoring, "ledger unavailable", Duration::ZERO),
            supply_chain_ok(true, 0.9),
        ]);

        let supply = decision.reasoning.find("SupplyChainAgent").unwrap();
        let credit = decision.reasoning.find("CreditScoringAgent").unwrap();
        let factoring = decision.reasoning.find("FactoringAgent").unwrap();
        assert!(supply < credit && credit < factoring);
        assert!(decision.reasoning.contains("ERROR (ledger unavailable)"));
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let aggregator = Aggregator::new();
        let a = vec![
            supply_chain_ok(true, 0.9),
            credit_ok(750, 0.85),
            factoring_ok(true, 0.9),
        ];
        let mut b = a.clone();
        b.reverse();

        assert_eq!(aggregator.aggregate(&a), aggregator.aggregate(&b));
    }

    #[test]
    fn custom_weights_shift_the_vote() {
        let config = AggregatorConfig {
            weights: AgentWeights {
                supply_chain: 3.0,
                credit_scoring: 1.0,
                factoring: 1.0,
            },
            ..Default::default()
        };
        let aggregator = Aggregator::with_config(config);

        // Supply chain rejects with 3x weight: approve share 2/5 < 0.5.
        let decision = aggregator.aggregate(&[
            supply_chain_ok(false, 0.9),
            credit_ok(900, 0.9),
            factoring_ok(true, 0.9),
        ]);

        assert_eq!(decision.decision, Decision::Rejected);
    }
}
