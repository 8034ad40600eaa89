//! Offer pricing: deterministic derivation of financing terms.
//!
//! Invoked only for approved decisions. The credit-score tier selects the
//! advance rate and risk premium from a fixed, ordered table; the tenor
//! comes from the factoring agent's recommendation. Two invariants hold
//! for every configuration:
//!
//! - `offer_amount <= invoice_amount` (clamped)
//! - the annualized rate is monotonically non-increasing in score tier

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::DEFAULT_TENOR_DAYS;
use crate::types::{
    AgentKind, AgentReport, AgentResult, Case, Decision, FinalDecision, Offer, RateBreakdown,
    ScoreTier,
};

/// Pricing knobs. Tier terms are fixed; these set the shared components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Base annualized rate, percent.
    pub base_rate: f64,

    /// Tenor applied when the factoring agent did not recommend one.
    pub default_tenor_days: u32,

    /// Flat fee as a fraction of the advance.
    pub processing_fee_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_rate: 2.5,
            default_tenor_days: DEFAULT_TENOR_DAYS,
            processing_fee_rate: 0.01,
        }
    }
}

/// Reasons the pricer refuses to produce an offer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("offers are only priced for approved decisions")]
    NotApproved,

    #[error("no credit score available to derive offer terms")]
    MissingCreditScore,
}

/// Advance rate and annual risk premium for a tier.
///
/// Higher tiers advance more and pay less. The table is the monotonicity
/// invariant; changing it must preserve the ordering.
fn tier_terms(tier: ScoreTier) -> (f64, f64) {
    match tier {
        ScoreTier::Excellent => (0.90, 0.0),
        ScoreTier::Good => (0.85, 0.5),
        ScoreTier::Fair => (0.80, 1.0),
        ScoreTier::Subprime => (0.70, 1.5),
    }
}

/// The offer pricer.
pub struct OfferPricer {
    config: PricingConfig,
}

impl OfferPricer {
    pub fn new() -> Self {
        Self::with_config(PricingConfig::default())
    }

    pub fn with_config(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Derive offer terms from an approved decision and the agent results
    /// that produced it. Pure: same inputs, same offer.
    pub fn price(
        &self,
        decision: &FinalDecision,
        case: &Case,
        results: &[AgentResult],
    ) -> Result<Offer, PricingError> {
        if decision.decision != Decision::Approved {
            return Err(PricingError::NotApproved);
        }

        let score = results
            .iter()
            .filter(|r| r.agent == AgentKind::CreditScoring)
            .find_map(|r| match r.report() {
                Some(AgentReport::CreditScoring { score, .. }) => Some(*score),
                _ => None,
            })
            .ok_or(PricingError::MissingCreditScore)?;

        let tier = ScoreTier::from_score(score);
        let (advance_rate, risk_premium) = tier_terms(tier);

        let tenor_days = results
            .iter()
            .filter(|r| r.agent == AgentKind::Factoring)
            .find_map(|r| match r.report() {
                Some(AgentReport::Factoring {
                    recommended_tenor_days,
                    ..
                }) if *recommended_tenor_days > 0 => Some(*recommended_tenor_days),
                _ => None,
            })
            .unwrap_or(self.config.default_tenor_days);

        let tenor_adjustment = (tenor_days as f64 / 30.0) * 0.5;
        let rate = self.config.base_rate + risk_premium + tenor_adjustment;

        let offer_amount = (case.invoice_amount * advance_rate).min(case.invoice_amount);

        let daily_rate = rate / 365.0 / 100.0;
        let discount = offer_amount * daily_rate * tenor_days as f64;
        let processing_fee = offer_amount * self.config.processing_fee_rate;
        let net_amount = offer_amount - discount - processing_fee;

        tracing::debug!(
            score,
            %tier,
            rate,
            tenor_days,
            offer_amount,
            "priced financing offer"
        );

        Ok(Offer {
            offer_amount,
            rate,
            tenor_days,
            tier,
            discount,
            processing_fee,
            net_amount,
            breakdown: RateBreakdown {
                base_rate: self.config.base_rate,
                risk_premium,
                tenor_adjustment,
            },
        })
    }
}

impl Default for OfferPricer {
    fn default() -> Self {
        Self::new()
    }
}
