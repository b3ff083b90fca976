use serde::{Deserialize, Serialize};

use crate::domain::{Cents, Instructor, PayerId};

/// Per-instructor payment totals. Only instructors with at least one
/// ledger entry appear in a report; a zero-entry instructor is absent,
/// not listed with zeros.
#[derive(Debug, Clone, Serialize)]
pub struct InstructorPaymentSummary {
    pub instructor: Instructor,
    pub total_lessons_paid: i64,
    pub total_compensation_cents: Cents,
    pub entry_count: i64,
}

/// Total paid by one student. `entry_count == 0` is the "no records"
/// case, which is a legitimate answer rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPaymentTotal {
    pub student_id: PayerId,
    pub total_cents: Cents,
    pub entry_count: i64,
}

impl StudentPaymentTotal {
    pub fn has_records(&self) -> bool {
        self.entry_count > 0
    }
}
