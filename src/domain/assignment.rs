use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PayerId;

pub type AssignmentId = Uuid;

/// Link record pairing one student with one instructor. Many students
/// may share an instructor; the capacity filter counts these links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub student_id: PayerId,
    pub instructor_id: PayerId,
    pub created_at: DateTime<Utc>,
}

impl AssignmentRecord {
    pub fn new(student_id: PayerId, instructor_id: PayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            instructor_id,
            created_at: Utc::now(),
        }
    }
}
