//! # Validation Module
//!
//! Input validation for drafts and patches.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP collaborator                                            │
//! │  └── JSON body must be an object                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── parse_document: Document → typed draft/patch                      │
//! │  └── validate_*: required names, non-negative amounts                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: DocumentStore                                                │
//! │  └── uniqueness (customer name, billNumber) under collection lock      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Financial figures (`items`, `totals`, `calculations`) are NOT checked:
//! the caller computed them and the ledger keeps them as given.
//!
//! ## Usage
//! ```rust
//! use khata_core::validation::validate_customer_name;
//!
//! assert_eq!(validate_customer_name("  Ali Khan ").unwrap(), "Ali Khan");
//! assert!(validate_customer_name("   ").is_err());
//! ```

use serde::de::DeserializeOwned;

use crate::document::{from_document, Document};
use crate::error::ValidationError;
use crate::types::{BillDraft, BillPatch, ReceiptDraft, RoznamchaDraft, RoznamchaPatch};
use crate::MAX_NAME_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Parsing
// =============================================================================

/// Parses a request document into a typed draft or patch.
///
/// Wrong JSON types, missing required fields and (for patches) unknown or
/// immutable fields all come back as `InvalidFormat` for `entity`.
pub fn parse_document<T: DeserializeOwned>(entity: &str, doc: Document) -> ValidationResult<T> {
    from_document(doc).map_err(|e| ValidationError::invalid(entity, e.to_string()))
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates and normalizes a customer name.
///
/// ## Rules
/// - Leading/trailing whitespace is removed
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Returns
/// The trimmed name, casing untouched.
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Fails with `Required` when `value` is blank.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a money amount.
///
/// ## Rules
/// - Must be finite
/// - Must be >= 0 (zero allowed)
pub fn validate_amount(field: &str, amount: f64) -> ValidationResult<()> {
    if !amount.is_finite() {
        return Err(ValidationError::invalid(field, "must be a finite number"));
    }

    if amount < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Draft / Patch Validators
// =============================================================================

/// Validates a bill draft before a bill number is spent on it.
pub fn validate_bill_draft(draft: &BillDraft) -> ValidationResult<()> {
    validate_required("customerId", &draft.customer_id)?;
    validate_required("customerName", &draft.customer_name)?;
    Ok(())
}

/// Validates a bill patch. Only fields that are present are checked.
pub fn validate_bill_patch(patch: &BillPatch) -> ValidationResult<()> {
    if let Some(id) = &patch.customer_id {
        validate_required("customerId", id)?;
    }
    if let Some(name) = &patch.customer_name {
        validate_required("customerName", name)?;
    }
    Ok(())
}

pub fn validate_roznamcha_draft(draft: &RoznamchaDraft) -> ValidationResult<()> {
    validate_amount("amount", draft.amount)
}

pub fn validate_roznamcha_patch(patch: &RoznamchaPatch) -> ValidationResult<()> {
    match patch.amount {
        Some(amount) => validate_amount("amount", amount),
        None => Ok(()),
    }
}

pub fn validate_receipt_draft(draft: &ReceiptDraft) -> ValidationResult<()> {
    validate_required("ponchNumber", &draft.ponch_number)?;
    validate_amount("amount", draft.amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
