//! # Calculator Session
//!
//! The estimator walks a quote part by part, pricing each one. This module
//! is the pure model of that walk: it pre-fills each part from its stored
//! calculation (or from defaults) and keeps a cursor.
//!
//! ## Session Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  build(parts, line items, stored records, rates)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────┐   save ok    ┌──────────┐   save ok    ┌──────────┐      │
//! │  │ Part 1   │ ───────────► │ Part 2   │ ───────────► │ Part 3   │ ──►  │
//! │  │ Stored   │              │ Defaulted│              │ Stored   │ done │
//! │  └──────────┘              └────┬─────┘              └──────────┘      │
//! │                                 │ save failed                          │
//! │                                 └──► stays on Part 2, values intact    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A stored record always wins over the tolerance suggestion, so an
//! estimator's override survives every reload. The server rebuilds the
//! session from the database on each fetch rather than keeping it around.

use serde::Serialize;
use ts_rs::TS;

use crate::calculation::{CalculationKey, CalculationRecord};
use crate::pricing::{
    suggest_tolerance_multiplier, PriceBreakdown, PricingConfiguration, PricingRuleEngine,
    RateTable,
};
use crate::types::{Multiplier, QuoteLineItem, QuotePart};

/// Where an entry's pre-filled values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationSource {
    /// Loaded from the part's current calculation.
    Stored,
    /// Never priced; rate table defaults plus tolerance suggestion.
    Defaulted,
}

/// One stop of the walk.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorEntry {
    pub quote_part_id: Option<String>,
    pub quote_line_item_id: Option<i64>,
    /// Part name, or line item description for part-less lines.
    pub label: String,
    pub part_tolerance: Option<String>,
    pub suggested_tolerance_multiplier: Option<Multiplier>,
    pub configuration: PricingConfiguration,
    pub breakdown: PriceBreakdown,
    pub source: ConfigurationSource,
    /// Version of the stored record, `0` when none.
    pub version: i64,
}

impl CalculatorEntry {
    fn matches(&self, record: &CalculationRecord) -> bool {
        match record.key() {
            Ok(CalculationKey::Part(part_id)) => self.quote_part_id.as_deref() == Some(part_id.as_str()),
            Ok(CalculationKey::LineItem(line_item_id)) => {
                self.quote_line_item_id == Some(line_item_id)
            }
            Err(_) => false,
        }
    }

    fn apply_record(&mut self, record: &CalculationRecord) {
        self.configuration = record.configuration();
        self.breakdown = record.breakdown();
        self.source = ConfigurationSource::Stored;
        self.version = record.version;
    }
}

/// Projection of a quote for the calculator.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorSession {
    pub quote_id: i64,
    pub entries: Vec<CalculatorEntry>,
    /// Index of the current entry; equals `entries.len()` once finished.
    pub cursor: usize,
}

impl CalculatorSession {
    /// Builds the walk: parts in position order, then line items that have
    /// no part. Soft-deleted line items are skipped.
    pub fn build(
        quote_id: i64,
        parts: &[QuotePart],
        line_items: &[QuoteLineItem],
        records: &[CalculationRecord],
        rates: &RateTable,
    ) -> Self {
        let mut live_items: Vec<&QuoteLineItem> =
            line_items.iter().filter(|item| !item.is_deleted()).collect();
        live_items.sort_by_key(|item| (item.position, item.id));

        let mut ordered_parts: Vec<&QuotePart> = parts.iter().collect();
        ordered_parts.sort_by(|a, b| (a.position, &a.id).cmp(&(b.position, &b.id)));

        let mut entries = Vec::with_capacity(ordered_parts.len() + live_items.len());

        for part in ordered_parts {
            let line_item = live_items
                .iter()
                .find(|item| item.quote_part_id.as_deref() == Some(part.id.as_str()));
            let suggestion = suggest_tolerance_multiplier(part.tolerance.as_deref());
            let mut entry = default_entry(
                Some(part.id.clone()),
                line_item.map(|item| item.id),
                part.name.clone(),
                part.tolerance.clone(),
                suggestion,
                rates,
            );
            if let Some(record) = find_record(records, &entry) {
                entry.apply_record(record);
            }
            entries.push(entry);
        }

        for item in live_items.iter().filter(|item| item.quote_part_id.is_none()) {
            let mut entry = default_entry(None, Some(item.id), item.description.clone(), None, None, rates);
            if let Some(record) = find_record(records, &entry) {
                entry.apply_record(record);
            }
            entries.push(entry);
        }

        CalculatorSession {
            quote_id,
            entries,
            cursor: 0,
        }
    }

    pub fn current(&self) -> Option<&CalculatorEntry> {
        self.entries.get(self.cursor)
    }

    /// Moves to the next entry. Only call after a save succeeded.
    pub fn advance(&mut self) -> Option<&CalculatorEntry> {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
        self.current()
    }

    /// Folds a freshly saved record into the session. Advances when the
    /// record belongs to the current entry. Returns `false` when the record
    /// matches no entry.
    pub fn record_saved(&mut self, record: &CalculationRecord) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.matches(record)) else {
            return false;
        };

        self.entries[index].apply_record(record);
        if index == self.cursor {
            self.advance();
        }
        true
    }

    /// Jumps to the first entry that has never been priced.
    pub fn seek_first_unpriced(&mut self) -> Option<&CalculatorEntry> {
        self.cursor = self
            .entries
            .iter()
            .position(|entry| entry.source == ConfigurationSource::Defaulted)
            .unwrap_or(self.entries.len());
        self.current()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    /// Number of entries with a stored calculation.
    pub fn priced_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.source == ConfigurationSource::Stored)
            .count()
    }
}

fn default_entry(
    quote_part_id: Option<String>,
    quote_line_item_id: Option<i64>,
    label: String,
    part_tolerance: Option<String>,
    suggestion: Option<Multiplier>,
    rates: &RateTable,
) -> CalculatorEntry {
    let mut configuration = PricingConfiguration::defaults(rates);
    if let Some(multiplier) = suggestion {
        configuration.tolerance_multiplier = multiplier;
    }
    let breakdown = PricingRuleEngine::calculate(&configuration);

    CalculatorEntry {
        quote_part_id,
        quote_line_item_id,
        label,
        part_tolerance,
        suggested_tolerance_multiplier: suggestion,
        configuration,
        breakdown,
        source: ConfigurationSource::Defaulted,
        version: 0,
    }
}

/// Part-keyed record first, then one keyed by the entry's line item.
fn find_record<'a>(records: &'a [CalculationRecord], entry: &CalculatorEntry) -> Option<&'a CalculationRecord> {
    let by_part = entry.quote_part_id.as_deref().and_then(|part_id| {
        records
            .iter()
            .find(|r| r.quote_part_id.as_deref() == Some(part_id))
    });

    by_part.or_else(|| {
        entry.quote_line_item_id.and_then(|line_item_id| {
            records
                .iter()
                .find(|r| r.quote_part_id.is_none() && r.quote_line_item_id == Some(line_item_id))
        })
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
