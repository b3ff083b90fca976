use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, PayerKind, PayerRef};

pub type PaymentId = Uuid;

/// One ledger entry: a debit against a payer, chained to the payer's
/// prior entry through `running_balance_cents`.
///
/// Entries are append-mostly. There is no recomputation path for
/// editing or deleting a historical entry, so the chain is only valid
/// as long as history is left alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub id: PaymentId,
    pub payer_kind: PayerKind,
    pub payer_id: Uuid,
    /// Debit amount ("Dr"), always non-negative.
    pub amount_cents: Cents,
    /// Lessons settled by this payment. Zero for student payers.
    pub lessons_settled: i64,
    /// Derived: prior entry's balance minus this entry's amount.
    pub running_balance_cents: Cents,
    /// Monotonic insertion order, assigned by the repository. Breaks
    /// `created_at` ties so "latest prior entry" is deterministic.
    pub sequence: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentEntry {
    /// Create an entry with a zero balance and unassigned sequence;
    /// both are filled in by the repository at insert time.
    pub fn new(payer: PayerRef, amount_cents: Cents, lessons_settled: i64) -> Self {
        debug_assert!(amount_cents >= 0, "debit amount must be non-negative");
        debug_assert!(lessons_settled >= 0, "lessons settled must be non-negative");
        Self {
            id: Uuid::new_v4(),
            payer_kind: payer.kind,
            payer_id: payer.id,
            amount_cents,
            lessons_settled,
            running_balance_cents: 0,
            sequence: 0,
            note: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn payer_ref(&self) -> PayerRef {
        PayerRef {
            kind: self.payer_kind,
            id: self.payer_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_awaits_repository_fields() {
        let payer = PayerRef::instructor(Uuid::new_v4());
        let entry = PaymentEntry::new(payer, 10000, 2).with_note("first block");

        assert_eq!(entry.amount_cents, 10000);
        assert_eq!(entry.lessons_settled, 2);
        assert_eq!(entry.running_balance_cents, 0);
        assert_eq!(entry.sequence, 0);
        assert_eq!(entry.note.as_deref(), Some("first block"));
        assert_eq!(entry.payer_ref(), payer);
    }
}
