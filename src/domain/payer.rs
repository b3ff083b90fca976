use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PayerId = Uuid;

/// The two kinds of entity that carry their own payment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayerKind {
    Instructor,
    Student,
}

impl PayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayerKind::Instructor => "instructor",
            PayerKind::Student => "student",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "instructor" => Some(PayerKind::Instructor),
            "student" => Some(PayerKind::Student),
            _ => None,
        }
    }
}

impl std::fmt::Display for PayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a payer: which table and which row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayerRef {
    pub kind: PayerKind,
    pub id: PayerId,
}

impl PayerRef {
    pub fn instructor(id: PayerId) -> Self {
        Self {
            kind: PayerKind::Instructor,
            id,
        }
    }

    pub fn student(id: PayerId) -> Self {
        Self {
            kind: PayerKind::Student,
            id,
        }
    }
}

impl std::fmt::Display for PayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub id: PayerId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub hired_as: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub licence_number: Option<String>,
    pub di_number: Option<String>,
    /// Prepaid lesson counter. Mutated only by the ledger record
    /// operation, never by profile updates.
    pub lessons_remaining: i64,
    /// Optimistic-concurrency token bumped on every ledger write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Instructor {
    pub fn new(first_name: String, last_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            phone: None,
            email: None,
            address: None,
            hired_as: None,
            dob: None,
            gender: None,
            licence_number: None,
            di_number: None,
            lessons_remaining: 0,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_contact(
        mut self,
        phone: Option<String>,
        email: Option<String>,
        address: Option<String>,
    ) -> Self {
        self.phone = phone;
        self.email = email;
        self.address = address;
        self
    }

    pub fn with_licence(
        mut self,
        licence_number: Option<String>,
        di_number: Option<String>,
    ) -> Self {
        self.licence_number = licence_number;
        self.di_number = di_number;
        self
    }

    pub fn with_lessons_remaining(mut self, lessons: i64) -> Self {
        self.lessons_remaining = lessons;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn payer_ref(&self) -> PayerRef {
        PayerRef::instructor(self.id)
    }
}

/// Profile-only update for an instructor. The lesson counter and the
/// version token are deliberately absent: those belong to the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstructorUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub licence_number: Option<String>,
    pub di_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: PayerId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    /// Id of a supporting guardian/sponsor, if any.
    pub supportive_id: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn new(first_name: String, last_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            phone: None,
            email: None,
            address: None,
            dob: None,
            gender: None,
            supportive_id: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_contact(
        mut self,
        phone: Option<String>,
        email: Option<String>,
        address: Option<String>,
    ) -> Self {
        self.phone = phone;
        self.email = email;
        self.address = address;
        self
    }

    pub fn with_supportive_id(mut self, supportive_id: impl Into<String>) -> Self {
        self.supportive_id = Some(supportive_id.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn payer_ref(&self) -> PayerRef {
        PayerRef::student(self.id)
    }
}
