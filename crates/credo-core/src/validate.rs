//! Request and case validation.
//!
//! Everything here runs before a session exists: a request that fails
//! validation is rejected outright and no agent ever sees it.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::types::{Case, CaseKey};

lazy_static! {
    // GSTIN: 2-digit state code, 5-letter PAN prefix, 4-digit PAN number,
    // PAN check letter, entity digit, literal 'Z', checksum character.
    static ref GSTIN_PATTERN: Regex =
        Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").unwrap();

    // Registry invoice reference: IRN prefix plus alphanumeric tail.
    static ref IRN_PATTERN: Regex = Regex::new(r"^IRN[0-9A-Z]{6,61}$").unwrap();
}

/// Rejection reasons for malformed analysis requests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a positive identifier")]
    MissingIdentifier { field: &'static str },

    #[error("invoice amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("malformed GSTIN: {0}")]
    MalformedGstin(String),

    #[error("malformed invoice reference: {0}")]
    MalformedInvoiceRef(String),

    #[error("{field} {requested} does not match invoice record ({on_record})")]
    IdentifierMismatch {
        field: &'static str,
        requested: u64,
        on_record: u64,
    },
}

/// Validate the raw identifier triple of an analysis request.
pub fn validate_identifiers(
    invoice_id: u64,
    buyer_id: u64,
    merchant_id: u64,
) -> Result<(), ValidationError> {
    if invoice_id == 0 {
        return Err(ValidationError::MissingIdentifier { field: "invoice_id" });
    }
    if buyer_id == 0 {
        return Err(ValidationError::MissingIdentifier { field: "buyer_id" });
    }
    if merchant_id == 0 {
        return Err(ValidationError::MissingIdentifier {
            field: "merchant_id",
        });
    }
    Ok(())
}

/// Check a GSTIN against the registry format.
pub fn validate_gstin(gstin: &str) -> Result<(), ValidationError> {
    if GSTIN_PATTERN.is_match(gstin) {
        Ok(())
    } else {
        Err(ValidationError::MalformedGstin(gstin.to_string()))
    }
}

/// Check a registry invoice reference (IRN) shape.
pub fn validate_invoice_ref(irn: &str) -> Result<(), ValidationError> {
    if IRN_PATTERN.is_match(irn) {
        Ok(())
    } else {
        Err(ValidationError::MalformedInvoiceRef(irn.to_string()))
    }
}

/// Validate a fully resolved case before it is handed to the orchestrator.
///
/// The invoice record is authoritative: the requested buyer and merchant
/// ids must agree with the ids the invoice carries.
pub fn validate_case(case: &Case, requested: &CaseKey) -> Result<(), ValidationError> {
    validate_identifiers(
        requested.invoice_id,
        requested.buyer_id,
        requested.merchant_id,
    )?;

    if !(case.invoice_amount.is_finite() && case.invoice_amount > 0.0) {
        return Err(ValidationError::InvalidAmount(case.invoice_amount));
    }

    if case.key.buyer_id != requested.buyer_id {
        return Err(ValidationError::IdentifierMismatch {
            field: "buyer_id",
            requested: requested.buyer_id,
            on_record: case.key.buyer_id,
        });
    }

    if case.key.merchant_id != requested.merchant_id {
        return Err(ValidationError::IdentifierMismatch {
            field: "merchant_id",
            requested: requested.merchant_id,
            on_record: case.key.merchant_id,
        });
    }

    Ok(())
}
