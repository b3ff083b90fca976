use std::collections::HashMap;

use super::{AssignmentRecord, Cents, PayerId, PaymentEntry};

/// Compute the balance for the next entry in a payer's chain.
/// The oldest entry chains off an implicit zero prior balance.
pub fn next_balance(prior: Option<Cents>, amount: Cents) -> Cents {
    prior.unwrap_or(0) - amount
}

/// Replay a payer's amounts in creation order (oldest first) and return
/// the running balance after each entry.
pub fn chain_balances(amounts: &[Cents]) -> Vec<Cents> {
    let mut balances = Vec::with_capacity(amounts.len());
    let mut prior = None;
    for &amount in amounts {
        let balance = next_balance(prior, amount);
        balances.push(balance);
        prior = Some(balance);
    }
    balances
}

/// A stored balance that disagrees with the chain invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainViolation {
    pub sequence: i64,
    pub expected: Cents,
    pub stored: Cents,
}

/// Verify the chain invariant over a single payer's history, given
/// newest-first as the repository returns it. Returns every entry whose
/// stored balance differs from a zero-seeded replay.
pub fn verify_chain(history_newest_first: &[PaymentEntry]) -> Vec<ChainViolation> {
    let mut violations = Vec::new();
    let mut prior = None;
    for entry in history_newest_first.iter().rev() {
        let expected = next_balance(prior, entry.amount_cents);
        if entry.running_balance_cents != expected {
            violations.push(ChainViolation {
                sequence: entry.sequence,
                expected,
                stored: entry.running_balance_cents,
            });
        }
        prior = Some(entry.running_balance_cents);
    }
    violations
}

/// Count assignment links per instructor. Instructors with no links at
/// all are simply absent; callers must treat absence as zero.
pub fn assignment_counts(assignments: &[AssignmentRecord]) -> HashMap<PayerId, i64> {
    let mut counts: HashMap<PayerId, i64> = HashMap::new();
    for record in assignments {
        *counts.entry(record.instructor_id).or_insert(0) += 1;
    }
    counts
}
