//! Expense records and their document encoding.

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate, Utc};
use expensesync_store::Document;
use serde::{Deserialize, Serialize};

/// A single expense.
///
/// Expenses are immutable once created; an edit replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Opaque unique id, allocated by the remote store.
    #[serde(default)]
    pub id: String,
    /// Amount spent, in currency units.
    pub amount: f64,
    /// Free-text category label.
    pub category: String,
    /// When the expense was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Expense {
    /// Creates an expense.
    pub fn new(
        id: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            category: category.into(),
            timestamp,
        }
    }

    /// Checks the create-time constraints: a finite, non-negative amount and
    /// a non-blank category.
    ///
    /// Stored records are never re-validated on read.
    pub fn validate_new(amount: f64, category: &str) -> EngineResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EngineError::InvalidExpense(format!(
                "amount must be a non-negative number, got {amount}"
            )));
        }
        if category.trim().is_empty() {
            return Err(EngineError::InvalidExpense(
                "category must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Encodes the expense as a CBOR document keyed by its id.
    pub fn to_document(&self) -> EngineResult<Document> {
        let mut data = Vec::new();
        ciborium::into_writer(self, &mut data).map_err(|e| EngineError::Encode(e.to_string()))?;
        Ok(Document::new(self.id.clone(), data))
    }

    /// Decodes an expense from a CBOR document.
    ///
    /// A record without an embedded id takes the document id.
    pub fn from_document(document: &Document) -> EngineResult<Self> {
        let mut expense: Expense = ciborium::from_reader(document.data.as_slice())
            .map_err(|e| EngineError::Decode(format!("document {}: {}", document.id, e)))?;
        if expense.id.is_empty() {
            expense.id = document.id.clone();
        }
        Ok(expense)
    }
}

/// An inclusive range of calendar dates, compared in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range. Returns `None` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Creates a range only when both bounds are present and ordered.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => None,
        }
    }

    /// First day of the range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if the timestamp's UTC date falls within the range.
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        let date = timestamp.date_naive();
        self.start <= date && date <= self.end
    }
}

/// Sums expense amounts, optionally restricted to a date range.
pub fn total_for(expenses: &[Expense], range: Option<&DateRange>) -> f64 {
    expenses
        .iter()
        .filter(|e| range.map_or(true, |r| r.contains(&e.timestamp)))
        .map(|e| e.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn document_roundtrip_keeps_fields() {
        let expense = Expense::new("abc", 12.5, "Food", at(2024, 1, 2, 9));
        let doc = expense.to_document().unwrap();
        assert_eq!(doc.id, "abc");
        assert_eq!(Expense::from_document(&doc).unwrap(), expense);
    }

    #[test]
    fn missing_embedded_id_takes_document_id() {
        let expense = Expense::new("", 3.0, "Bills", at(2024, 1, 2, 9));
        let mut doc = expense.to_document().unwrap();
        doc.id = "from-store".into();
        assert_eq!(Expense::from_document(&doc).unwrap().id, "from-store");
    }

    #[test]
    fn garbage_document_fails_to_decode() {
        let doc = Document::new("bad", vec![0xff, 0x00, 0x13]);
        assert!(matches!(
            Expense::from_document(&doc),
            Err(EngineError::Decode(_))
        ));
    }

    #[test]
    fn negative_amount_decodes() {
        let expense = Expense::new("refund", -20.0, "Other", at(2024, 1, 2, 9));
        let doc = expense.to_document().unwrap();
        assert_eq!(Expense::from_document(&doc).unwrap().amount, -20.0);
    }

    #[test]
    fn create_validation() {
        assert!(Expense::validate_new(0.0, "Food").is_ok());
        assert!(Expense::validate_new(10.0, "Food").is_ok());
        assert!(Expense::validate_new(-1.0, "Food").is_err());
        assert!(Expense::validate_new(f64::NAN, "Food").is_err());
        assert!(Expense::validate_new(f64::INFINITY, "Food").is_err());
        assert!(Expense::validate_new(10.0, "   ").is_err());
    }

    #[test]
    fn range_is_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert!(range.contains(&at(2024, 1, 1, 0)));
        assert!(range.contains(&at(2024, 1, 31, 23)));
        assert!(!range.contains(&at(2024, 2, 1, 0)));
        assert!(!range.contains(&at(2023, 12, 31, 23)));
    }

    #[test]
    fn range_requires_order_and_both_bounds() {
        assert!(DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).is_none());
        assert!(DateRange::from_bounds(Some(date(2024, 1, 1)), None).is_none());
        assert!(DateRange::from_bounds(None, None).is_none());
        assert!(DateRange::from_bounds(Some(date(2024, 1, 1)), Some(date(2024, 1, 1))).is_some());
    }

    #[test]
    fn total_respects_range() {
        let expenses = vec![
            Expense::new("a", 100.0, "Food", at(2024, 1, 5, 12)),
            Expense::new("b", 50.0, "Travel", at(2024, 2, 5, 12)),
            Expense::new("c", 25.0, "Bills", at(2024, 1, 20, 12)),
        ];
        assert_eq!(total_for(&expenses, None), 175.0);

        let january = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(total_for(&expenses, Some(&january)), 125.0);
        assert_eq!(total_for(&[], Some(&january)), 0.0);
    }
}
