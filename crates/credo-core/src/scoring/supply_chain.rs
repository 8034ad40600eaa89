//! Supply-chain policy
//!
//! **Question**: is this invoice, from this buyer, financeable?
//!
//! Judges buyer payment reliability and invoice verification status, and
//! recommends an annualized rate in the 2.0%..=5.0% band.

use crate::types::{AgentReport, BuyerHistory, Case, RiskLevel};

/// Rate band the policy recommends within, percent annualized.
const RATE_FLOOR: f64 = 2.0;
const RATE_CEILING: f64 = 5.0;

/// Minimum reliability to finance at all.
const MIN_RISK_SCORE: u32 = 550;
const MIN_ON_TIME_RATE: f64 = 0.70;

/// The supply-chain scoring policy.
pub struct SupplyChainPolicy;

impl SupplyChainPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, case: &Case) -> AgentReport {
        if !case.invoice_verified {
            return AgentReport::SupplyChain {
                financeable: false,
                recommended_rate: RATE_CEILING,
                risk_level: RiskLevel::High,
                confidence: 0.95,
                reasoning: format!(
                    "invoice {} failed registry verification",
                    case.key.invoice_id
                ),
            };
        }

        let Some(history) = &case.buyer_history else {
            return AgentReport::SupplyChain {
                financeable: false,
                recommended_rate: RATE_CEILING,
                risk_level: RiskLevel::High,
                confidence: 0.5,
                reasoning: format!("no payment history on file for buyer {}", case.key.buyer_id),
            };
        };

        let risk_level = classify_risk(history);
        let financeable =
            history.risk_score >= MIN_RISK_SCORE && history.on_time_rate >= MIN_ON_TIME_RATE;
        let recommended_rate = recommend_rate(history);
        let confidence = history_confidence(history);

        let reasoning = format!(
            "buyer {} settles in {} days on average with {:.0}% on-time rate over {} invoices \
             (risk score {}/1000); {} risk, {}",
            case.key.buyer_id,
            history.avg_payment_days,
            history.on_time_rate * 100.0,
            history.total_invoices,
            history.risk_score,
            match risk_level {
                RiskLevel::Low => "low",
                RiskLevel::Medium => "medium",
                RiskLevel::High => "high",
            },
            if financeable {
                "financeable"
            } else {
                "not financeable"
            },
        );

        AgentReport::SupplyChain {
            financeable,
            recommended_rate,
            risk_level,
            confidence,
            reasoning,
        }
    }
}

impl Default for SupplyChainPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_risk(history: &BuyerHistory) -> RiskLevel {
    if history.risk_score >= 750 && history.on_time_rate >= 0.90 {
        RiskLevel::Low
    } else if history.risk_score < 600 || history.on_time_rate < 0.75 {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

/// Rate scales with the distance from a perfect risk score, with flat
/// penalties for late-payment behavior.
fn recommend_rate(history: &BuyerHistory) -> f64 {
    let mut rate = RATE_FLOOR;
    rate += (1000_u32.saturating_sub(history.risk_score) as f64 / 1000.0) * 2.0;
    if history.on_time_rate < 0.85 {
        rate += 0.5;
    }
    if history.avg_payment_days > 45 {
        rate += 0.5;
    }
    rate.clamp(RATE_FLOOR, RATE_CEILING)
}

/// Deeper history earns more confidence in the assessment.
fn history_confidence(history: &BuyerHistory) -> f64 {
    match history.total_invoices {
        20.. => 0.9,
        5..=19 => 0.8,
        _ => 0.65,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaseKey;
    use chrono::NaiveDate;

    fn case_with(history: Option<BuyerHistory>, verified: bool) -> Case {
        Case {
            key: CaseKey {
                merchant_id: 1,
                buyer_id: 101,
                invoice_id: 1,
            },
            invoice_amount: 75_000.0,
            invoice_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            invoice_verified: verified,
            buyer_history: history,
        }
    }

    fn reliable_buyer() -> BuyerHistory {
        BuyerHistory {
            avg_payment_days: 18,
            on_time_rate: 0.95,
            total_invoices: 24,
            risk_score: 820,
        }
    }

    #[test]
    fn reliable_buyer_is_financeable_at_low_rate() {
        let policy = SupplyChainPolicy::new();
        let report = policy.assess(&case_with(Some(reliable_buyer()), true));

        let AgentReport::SupplyChain {
            financeable,
            recommended_rate,
            risk_level,
            confidence,
            ..
        } = report
        else {
            panic!("wrong report variant");
        };

        assert!(financeable);
        assert_eq!(risk_level, RiskLevel::Low);
        assert_eq!(confidence, 0.9);
        // 2.0 + (1000-820)/1000 * 2.0 = 2.36, no penalties
        assert!((recommended_rate - 2.36).abs() < 1e-9);
    }

    #[test]
    fn unverified_invoice_is_not_financeable() {
        let policy = SupplyChainPolicy::new();
        let report = policy.assess(&case_with(Some(reliable_buyer()), false));

        assert!(!report.approves());
        assert_eq!(report.confidence(), 0.95);
        assert!(report.reasoning().contains("registry verification"));
    }

    #[test]
    fn missing_history_is_not_financeable() {
        let policy = SupplyChainPolicy::new();
        let report = policy.assess(&case_with(None, true));

        assert!(!report.approves());
        assert!(report.reasoning().contains("no payment history"));
    }

    #[test]
    fn chronically_late_buyer_is_rejected_with_penalties() {
        let late = BuyerHistory {
            avg_payment_days: 70,
            on_time_rate: 0.6,
            total_invoices: 40,
            risk_score: 480,
        };
        let policy = SupplyChainPolicy::new();
        let report = policy.assess(&case_with(Some(late), true));

        let AgentReport::SupplyChain {
            financeable,
            recommended_rate,
            risk_level,
            ..
        } = report
        else {
            panic!("wrong report variant");
        };

        assert!(!financeable);
        assert_eq!(risk_level, RiskLevel::High);
        // 2.0 + 520/1000*2.0 + 0.5 + 0.5 = 4.04
        assert!((recommended_rate - 4.04).abs() < 1e-9);
    }

    #[test]
    fn rate_never_leaves_band() {
        let worst = BuyerHistory {
            avg_payment_days: 120,
            on_time_rate: 0.1,
            total_invoices: 2,
            risk_score: 0,
        };
        let policy = SupplyChainPolicy::new();
        let AgentReport::SupplyChain {
            recommended_rate, ..
        } = policy.assess(&case_with(Some(worst), true))
        else {
            panic!("wrong report variant");
        };
        assert!(recommended_rate <= RATE_CEILING);
        assert!(recommended_rate >= RATE_FLOOR);
    }
}
