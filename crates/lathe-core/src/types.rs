//! # Domain Types
//!
//! Core domain types used throughout Lathe.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Quote       │   │   QuotePart     │   │ QuoteLineItem   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (int)       │   │  id (UUID)      │   │  id (int)       │       │
//! │  │  quote_number   │   │  quote_id (FK)  │   │  quote_id (FK)  │       │
//! │  │  status         │   │  tolerance      │   │  quote_part_id  │       │
//! │  │  total          │   │  position       │   │  total_price    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Multiplier    │   │  QuoteStatus    │   │ LeadTimeOption  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Decimal        │   │  Rfq, Draft     │   │  Fast           │       │
//! │  │  2.15 = ×2.15   │   │  Sent, ...      │   │  Standard       │       │
//! │  └─────────────────┘   └─────────────────┘   │  Economy        │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quote Lifecycle
//! ```text
//!            convert          send
//!    Rfq ───────────► Draft ───────► Sent ──┬── accept ──► Accepted
//!                       ▲                   ├── reject ──► Rejected ─┐
//!                       │                   ├── drop ────► Dropped ──┤
//!                       │                   └── expire ──► Expired ──┤
//!                       └──────────────── revise ◄───────────────────┘
//!                                       (also from Sent)
//! ```
//! Only `Rfq` and `Draft` accept pricing changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Multiplier
// =============================================================================

/// A pricing multiplier (lead time, complexity, tolerance).
///
/// ## Why a Newtype?
/// Prices and multipliers are both decimals. Keeping them apart stops a
/// multiplier from being summed into a total by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Multiplier(#[ts(type = "string")] Decimal);

impl Multiplier {
    /// Neutral multiplier (×1).
    pub const ONE: Multiplier = Multiplier(Decimal::ONE);

    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Multiplier(value)
    }

    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Clamps into `[min, max]`.
    pub fn bounded(self, min: Multiplier, max: Multiplier) -> Self {
        Multiplier(self.0.max(min.0).min(max.0))
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Multiplier::ONE
    }
}

impl From<Decimal> for Multiplier {
    fn from(value: Decimal) -> Self {
        Multiplier(value)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "×{}", self.0.normalize())
    }
}

// =============================================================================
// Lead Time
// =============================================================================

/// Turnaround the customer asked for. Each option has a default multiplier
/// in the rate table, but the stored multiplier is edited independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LeadTimeOption {
    Fast,
    Standard,
    Economy,
}

impl LeadTimeOption {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LeadTimeOption::Fast => "fast",
            LeadTimeOption::Standard => "standard",
            LeadTimeOption::Economy => "economy",
        }
    }
}

impl Default for LeadTimeOption {
    fn default() -> Self {
        LeadTimeOption::Standard
    }
}

impl FromStr for LeadTimeOption {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(LeadTimeOption::Fast),
            "standard" => Ok(LeadTimeOption::Standard),
            "economy" => Ok(LeadTimeOption::Economy),
            _ => Err(ValidationError::NotAllowed {
                field: "leadTimeOption".to_string(),
                allowed: vec![
                    "fast".to_string(),
                    "standard".to_string(),
                    "economy".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Quote Status
// =============================================================================

/// The lifecycle status of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Request for quote, not yet priced.
    Rfq,
    /// Being priced.
    Draft,
    /// Sent to the customer.
    Sent,
    Accepted,
    Rejected,
    Dropped,
    Expired,
}

impl QuoteStatus {
    /// Whether line items and calculations may change.
    ///
    /// ## User Workflow
    /// ```text
    /// Calculator: Save Part
    ///      │
    ///      ▼
    /// quote.status.is_editable() ← THIS FUNCTION
    ///      │
    ///      ├── Rfq / Draft → proceed
    ///      │
    ///      └── anything else → QuoteLocked, nothing is written
    /// ```
    pub const fn is_editable(&self) -> bool {
        matches!(self, QuoteStatus::Rfq | QuoteStatus::Draft)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Rfq => "rfq",
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Dropped => "dropped",
            QuoteStatus::Expired => "expired",
        }
    }

    /// Applies a lifecycle action, returning the new status.
    pub fn apply(self, action: QuoteAction) -> CoreResult<QuoteStatus> {
        use QuoteAction as A;
        use QuoteStatus as S;

        let next = match (self, action) {
            (S::Rfq, A::Convert) => S::Draft,
            (S::Draft, A::Send) => S::Sent,
            (S::Sent, A::Accept) => S::Accepted,
            (S::Sent, A::Reject) => S::Rejected,
            (S::Sent, A::Drop) => S::Dropped,
            (S::Sent, A::Expire) => S::Expired,
            (S::Sent | S::Rejected | S::Dropped | S::Expired, A::Revise) => S::Draft,
            (from, action) => {
                return Err(CoreError::InvalidStatusTransition {
                    from: from.as_str().to_string(),
                    action: action.as_str().to_string(),
                })
            }
        };

        Ok(next)
    }
}

impl Default for QuoteStatus {
    fn default() -> Self {
        QuoteStatus::Draft
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Quote Action
// =============================================================================

/// A lifecycle action requested against a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuoteAction {
    Convert,
    Send,
    Accept,
    Reject,
    Drop,
    Expire,
    Revise,
}

impl QuoteAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            QuoteAction::Convert => "convert",
            QuoteAction::Send => "send",
            QuoteAction::Accept => "accept",
            QuoteAction::Reject => "reject",
            QuoteAction::Drop => "drop",
            QuoteAction::Expire => "expire",
            QuoteAction::Revise => "revise",
        }
    }
}

// =============================================================================
// Quote
// =============================================================================

/// A customer quote. `total` is only ever written by the totals aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: i64,

    /// Human-readable number shown on the quote document.
    pub quote_number: String,

    pub customer_name: String,

    pub status: QuoteStatus,

    /// Sum of non-deleted line item totals.
    pub total: Money,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Returns `QuoteLocked` unless the quote still accepts pricing changes.
    pub fn ensure_editable(&self) -> CoreResult<()> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(CoreError::QuoteLocked {
                quote_id: self.id,
                status: self.status.to_string(),
            })
        }
    }
}

// =============================================================================
// Quote Part
// =============================================================================

/// A manufactured part on a quote.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuotePart {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub quote_id: i64,

    pub name: String,

    /// Free-text tolerance from the drawing, e.g. `"±0.005"`.
    pub tolerance: Option<String>,

    /// Order of the part within the quote.
    pub position: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Quote Line Item
// =============================================================================

/// A priced line on a quote, usually linked to a part.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLineItem {
    pub id: i64,
    pub quote_id: i64,
    pub quote_part_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// `unit_price × quantity`.
    pub total_price: Money,
    pub position: i64,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl QuoteLineItem {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_editable_statuses() {
        assert!(QuoteStatus::Rfq.is_editable());
        assert!(QuoteStatus::Draft.is_editable());

        for status in [
            QuoteStatus::Sent,
            QuoteStatus::Accepted,
            QuoteStatus::Rejected,
            QuoteStatus::Dropped,
            QuoteStatus::Expired,
        ] {
            assert!(!status.is_editable(), "{status} should be read-only");
        }
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let status = QuoteStatus::Rfq
            .apply(QuoteAction::Convert)
            .and_then(|s| s.apply(QuoteAction::Send))
            .and_then(|s| s.apply(QuoteAction::Accept))
            .unwrap();
        assert_eq!(status, QuoteStatus::Accepted);
    }

    #[test]
    fn test_revise_reopens_for_editing() {
        for status in [
            QuoteStatus::Sent,
            QuoteStatus::Rejected,
            QuoteStatus::Dropped,
            QuoteStatus::Expired,
        ] {
            assert_eq!(status.apply(QuoteAction::Revise).unwrap(), QuoteStatus::Draft);
        }
    }

    #[test]
    fn test_accepted_is_final() {
        for action in [QuoteAction::Revise, QuoteAction::Send, QuoteAction::Reject] {
            let err = QuoteStatus::Accepted.apply(action).unwrap_err();
            assert!(matches!(err, CoreError::InvalidStatusTransition { .. }));
        }
    }

    #[test]
    fn test_cannot_send_rfq_directly() {
        let err = QuoteStatus::Rfq.apply(QuoteAction::Send).unwrap_err();
        assert_eq!(err.to_string(), "Cannot send a quote that is rfq");
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&QuoteStatus::Rfq).unwrap(), "\"rfq\"");
        let parsed: QuoteStatus = serde_json::from_str("\"expired\"").unwrap();
        assert_eq!(parsed, QuoteStatus::Expired);
    }

    #[test]
    fn test_lead_time_from_str() {
        assert_eq!("Fast".parse::<LeadTimeOption>().unwrap(), LeadTimeOption::Fast);
        assert_eq!(" economy ".parse::<LeadTimeOption>().unwrap(), LeadTimeOption::Economy);
        assert!("overnight".parse::<LeadTimeOption>().is_err());
        assert_eq!(LeadTimeOption::default(), LeadTimeOption::Standard);
    }

    #[test]
    fn test_multiplier_clamp() {
        let min = Multiplier::new(dec!(1.15));
        let max = Multiplier::new(dec!(3.15));
        assert_eq!(Multiplier::new(dec!(5)).bounded(min, max), max);
        assert_eq!(Multiplier::new(dec!(0.5)).bounded(min, max), min);
        assert_eq!(Multiplier::new(dec!(2.15)).bounded(min, max).value(), dec!(2.15));
        assert_eq!(Multiplier::default(), Multiplier::ONE);
    }

    #[test]
    fn test_multiplier_display() {
        assert_eq!(Multiplier::new(dec!(2.150)).to_string(), "×2.15");
    }
}
