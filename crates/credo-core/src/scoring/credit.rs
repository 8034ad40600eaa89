//! Alternative-data credit scoring policy
//!
//! **Question**: how creditworthy is the merchant asking for the advance?
//!
//! Scores 0..=1000 from cashflow, tax-filing discipline, and payment-rail
//! activity. Additive band model: each signal contributes a bounded slice,
//! the slices sum to exactly 1000 at the theoretical maximum.

use serde::{Deserialize, Serialize};

use crate::types::{AgentReport, ScoreTier};

/// Merchant bank cashflow aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowSnapshot {
    pub monthly_inflow: f64,
    pub monthly_outflow: f64,
    pub avg_balance: f64,
    /// Month-over-month stability of inflows, 0.0..=1.0.
    pub consistency_score: f64,
}

/// Tax compliance aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstCompliance {
    pub filed_on_time: bool,
    pub consecutive_months: u32,
    pub avg_monthly_revenue: f64,
}

/// Direction of payment-rail volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityTrend {
    Growing,
    Stable,
    Declining,
}

/// UPI transaction aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpiActivity {
    pub monthly_transactions: u32,
    pub avg_transaction_value: f64,
    pub trend: ActivityTrend,
}

/// Everything the credit policy reads about a merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantFinancials {
    pub cashflow: CashflowSnapshot,
    pub gst: GstCompliance,
    pub upi: UpiActivity,
}

/// The credit scoring policy.
pub struct CreditScoringPolicy;

impl CreditScoringPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, financials: &MerchantFinancials) -> AgentReport {
        let score = compute_score(financials);
        let tier = ScoreTier::from_score(score);

        // Exposure ceiling scales with inflow and score.
        let recommended_limit =
            (financials.cashflow.monthly_inflow * (score as f64 / 1000.0) * 0.5).round();

        let confidence = score_confidence(financials);

        let margin = net_margin(&financials.cashflow);
        let reasoning = format!(
            "net cashflow margin {:.0}% with {:.0}% consistency; GST {} for {} consecutive \
             months; {} UPI transactions/month ({}); score {}/1000 ({})",
            margin * 100.0,
            financials.cashflow.consistency_score * 100.0,
            if financials.gst.filed_on_time {
                "filed on time"
            } else {
                "filings late"
            },
            financials.gst.consecutive_months,
            financials.upi.monthly_transactions,
            match financials.upi.trend {
                ActivityTrend::Growing => "growing",
                ActivityTrend::Stable => "stable",
                ActivityTrend::Declining => "declining",
            },
            score,
            tier,
        );

        AgentReport::CreditScoring {
            score,
            tier,
            recommended_limit,
            confidence,
            reasoning,
        }
    }
}

impl Default for CreditScoringPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn net_margin(cashflow: &CashflowSnapshot) -> f64 {
    if cashflow.monthly_inflow <= 0.0 {
        return 0.0;
    }
    ((cashflow.monthly_inflow - cashflow.monthly_outflow) / cashflow.monthly_inflow)
        .clamp(0.0, 1.0)
}

/// Band model: 300 base, 250 margin, 150 consistency, 200 GST, 100 UPI.
fn compute_score(financials: &MerchantFinancials) -> u32 {
    let mut score = 300.0;

    score += net_margin(&financials.cashflow) * 250.0;
    score += financials.cashflow.consistency_score.clamp(0.0, 1.0) * 150.0;

    if financials.gst.filed_on_time {
        score += 100.0;
    }
    score += (financials.gst.consecutive_months.min(6) as f64 / 6.0) * 100.0;

    score += (financials.upi.monthly_transactions.min(120) as f64 / 120.0) * 50.0;
    score += match financials.upi.trend {
        ActivityTrend::Growing => 50.0,
        ActivityTrend::Stable => 35.0,
        ActivityTrend::Declining => 0.0,
    };

    (score.round() as u32).min(1000)
}

/// Confidence tracks data quality: consistent cashflow and a long filing
/// streak mean the score rests on solid ground.
fn score_confidence(financials: &MerchantFinancials) -> f64 {
    let mut confidence = 0.55;
    confidence += financials.cashflow.consistency_score.clamp(0.0, 1.0) * 0.3;
    if financials.gst.filed_on_time {
        confidence += 0.05;
    }
    if financials.gst.consecutive_months >= 6 {
        confidence += 0.05;
    }
    confidence.min(0.95)
}
