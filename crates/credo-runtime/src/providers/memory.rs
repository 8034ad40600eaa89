//! In-memory provider backed by seeded maps.
//!
//! Serves tests and the demo profile; production deployments implement
//! the directory traits against their own stores.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::HashMap;

use credo_core::scoring::{
    ActivityTrend, CashflowSnapshot, GstCompliance, MerchantFinancials, PoRecord, UpiActivity,
};
use credo_core::BuyerHistory;

use super::{
    BuyerDirectory, InvoiceDirectory, InvoiceRecord, MerchantDirectory, ProviderError,
};

/// One in-memory directory implementing all three provider traits.
#[derive(Default)]
pub struct InMemoryDirectory {
    invoices: RwLock<HashMap<u64, InvoiceRecord>>,
    po_records: RwLock<HashMap<u64, PoRecord>>,
    buyers: RwLock<HashMap<u64, Option<BuyerHistory>>>,
    merchants: RwLock<HashMap<u64, MerchantFinancials>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory seeded with the demo dataset: three buyers spanning
    /// the risk spectrum, one healthy merchant, three invoices.
    pub fn with_demo_data() -> Self {
        let directory = Self::new();

        directory.put_buyer(
            101,
            Some(BuyerHistory {
                avg_payment_days: 18,
                on_time_rate: 0.95,
                total_invoices: 24,
                risk_score: 820,
            }),
        );
        directory.put_buyer(
            103,
            Some(BuyerHistory {
                avg_payment_days: 38,
                on_time_rate: 0.84,
                total_invoices: 11,
                risk_score: 680,
            }),
        );
        directory.put_buyer(
            105,
            Some(BuyerHistory {
                avg_payment_days: 65,
                on_time_rate: 0.62,
                total_invoices: 7,
                risk_score: 510,
            }),
        );

        directory.put_merchant(
            1,
            MerchantFinancials {
                cashflow: CashflowSnapshot {
                    monthly_inflow: 250_000.0,
                    monthly_outflow: 200_000.0,
                    avg_balance: 80_000.0,
                    consistency_score: 0.88,
                },
                gst: GstCompliance {
                    filed_on_time: true,
                    consecutive_months: 6,
                    avg_monthly_revenue: 300_000.0,
                },
                upi: UpiActivity {
                    monthly_transactions: 120,
                    avg_transaction_value: 8_500.0,
                    trend: ActivityTrend::Stable,
                },
            },
        );

        for (invoice_id, buyer_id) in [(1, 101), (2, 103), (3, 105)] {
            directory.put_invoice(InvoiceRecord {
                invoice_id,
                merchant_id: 1,
                buyer_id,
                amount: 75_000.0,
                invoice_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
                irn: Some(format!("IRN{:06}ABC123", invoice_id)),
                verified: true,
            });
            directory.put_po_record(
                invoice_id,
                PoRecord {
                    po_matched: true,
                    po_number: Some(format!("PO{:04}", invoice_id)),
                    delivery_confirmed: true,
                },
            );
        }

        directory
    }

    pub fn put_invoice(&self, record: InvoiceRecord) {
        self.invoices.write().insert(record.invoice_id, record);
    }

    pub fn put_po_record(&self, invoice_id: u64, record: PoRecord) {
        self.po_records.write().insert(invoice_id, record);
    }

    pub fn put_buyer(&self, buyer_id: u64, history: Option<BuyerHistory>) {
        self.buyers.write().insert(buyer_id, history);
    }

    pub fn put_merchant(&self, merchant_id: u64, financials: MerchantFinancials) {
        self.merchants.write().insert(merchant_id, financials);
    }
}

#[async_trait]
impl InvoiceDirectory for InMemoryDirectory {
    async fn invoice(&self, invoice_id: u64) -> Result<InvoiceRecord, ProviderError> {
        self.invoices
            .read()
            .get(&invoice_id)
            .cloned()
            .ok_or(ProviderError::InvoiceNotFound(invoice_id))
    }

    async fn po_record(&self, invoice_id: u64) -> Result<PoRecord, ProviderError> {
        self.po_records
            .read()
            .get(&invoice_id)
            .cloned()
            .ok_or(ProviderError::InvoiceNotFound(invoice_id))
    }
}

#[async_trait]
impl BuyerDirectory for InMemoryDirectory {
    async fn payment_history(
        &self,
        buyer_id: u64,
    ) -> Result<Option<BuyerHistory>, ProviderError> {
        self.buyers
            .read()
            .get(&buyer_id)
            .cloned()
            .ok_or(ProviderError::BuyerNotFound(buyer_id))
    }
}

#[async_trait]
impl MerchantDirectory for InMemoryDirectory {
    async fn financials(&self, merchant_id: u64) -> Result<MerchantFinancials, ProviderError> {
        self.merchants
            .read()
            .get(&merchant_id)
            .cloned()
            .ok_or(ProviderError::MerchantNotFound(merchant_id))
    }
}
