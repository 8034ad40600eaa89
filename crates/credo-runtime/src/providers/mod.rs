//! Read-only data providers for scoring agents.
//!
//! Agents never talk to storage directly; they receive these trait
//! objects and perform bounded, read-only lookups. Implementations must
//! be cancellation-safe: an agent future may be aborted at its deadline
//! mid-lookup.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use credo_core::scoring::{MerchantFinancials, PoRecord};
use credo_core::BuyerHistory;

mod memory;

pub use memory::InMemoryDirectory;

/// Errors from data providers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("invoice {0} not found")]
    InvoiceNotFound(u64),

    #[error("buyer {0} not found")]
    BuyerNotFound(u64),

    #[error("merchant {0} not found")]
    MerchantNotFound(u64),

    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// An invoice as the upstream invoice service records it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_id: u64,
    pub merchant_id: u64,
    pub buyer_id: u64,
    pub amount: f64,
    pub invoice_date: NaiveDate,
    /// Registry reference assigned at verification time.
    pub irn: Option<String>,
    pub verified: bool,
}

/// Source of invoice records and their purchase-order reconciliation.
#[async_trait]
pub trait InvoiceDirectory: Send + Sync {
    async fn invoice(&self, invoice_id: u64) -> Result<InvoiceRecord, ProviderError>;

    async fn po_record(&self, invoice_id: u64) -> Result<PoRecord, ProviderError>;
}

/// Source of buyer payment histories.
///
/// Returns `None` for a known buyer with no observed history; unknown
/// buyers are an error.
#[async_trait]
pub trait BuyerDirectory: Send + Sync {
    async fn payment_history(&self, buyer_id: u64)
        -> Result<Option<BuyerHistory>, ProviderError>;
}

/// Source of merchant financial aggregates.
#[async_trait]
pub trait MerchantDirectory: Send + Sync {
    async fn financials(&self, merchant_id: u64) -> Result<MerchantFinancials, ProviderError>;
}
