use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    parse_cents, AssignmentId, AssignmentRecord, Instructor, InstructorUpdate, PayerId, PayerKind,
    PayerRef, PaymentEntry, Student,
};
use crate::storage::{RecordOutcome, Repository};

use super::{AppError, InstructorPaymentSummary, StudentPaymentTotal};

/// Application service over the ledger and capacity-accounting core.
/// This is the primary interface for any boundary (CLI here, an HTTP
/// adapter elsewhere); authentication is assumed to have happened
/// before a call lands here.
pub struct LedgerService {
    repo: Repository,
}

impl LedgerService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Ledger write path
    // ========================

    /// Record a payment for a payer, chaining the running balance to
    /// the payer's latest entry and, for instructors, settling lessons
    /// against the prepaid counter in the same transactional unit.
    ///
    /// The amount arrives as a decimal string. A detected write race on
    /// the same payer is retried once with a fresh read; a storage
    /// failure is likewise retried once.
    pub async fn record_payment(
        &self,
        payer: PayerRef,
        amount: &str,
        lessons_settled: i64,
        note: Option<String>,
    ) -> Result<PaymentEntry, AppError> {
        let amount_cents = parse_cents(amount)
            .map_err(|err| AppError::Validation(format!("amount '{}': {}", amount, err)))?;
        if amount_cents < 0 {
            return Err(AppError::Validation(format!(
                "amount '{}' must not be negative",
                amount
            )));
        }
        if lessons_settled < 0 {
            return Err(AppError::Validation(
                "lessons settled must not be negative".into(),
            ));
        }
        if payer.kind == PayerKind::Student && lessons_settled != 0 {
            return Err(AppError::Validation(
                "student payments cannot settle lessons".into(),
            ));
        }

        let mut conflict_retried = false;
        let mut store_retried = false;
        loop {
            let attempt = self
                .repo
                .record_payment(payer, amount_cents, lessons_settled, note.clone())
                .await;

            match attempt {
                Ok(RecordOutcome::Recorded(entry)) => {
                    info!(
                        payer = %payer,
                        amount_cents,
                        lessons_settled,
                        balance = entry.running_balance_cents,
                        "payment recorded"
                    );
                    return Ok(entry);
                }
                Ok(RecordOutcome::PayerMissing) => {
                    return Err(AppError::not_found(payer.kind.as_str(), payer.id));
                }
                Ok(RecordOutcome::VersionConflict) if !conflict_retried => {
                    conflict_retried = true;
                    warn!(payer = %payer, "write conflict on payment chain, retrying");
                }
                Ok(RecordOutcome::VersionConflict) => {
                    return Err(AppError::Conflict {
                        payer: payer.to_string(),
                    });
                }
                Err(err) if !store_retried => {
                    store_retried = true;
                    warn!(payer = %payer, error = %err, "store failure, retrying once");
                }
                Err(err) => return Err(AppError::Store(err)),
            }
        }
    }

    /// Payment history for a payer, newest first. Pure read.
    pub async fn payment_history(&self, payer: PayerRef) -> Result<Vec<PaymentEntry>, AppError> {
        if !self.repo.payer_exists(payer).await? {
            return Err(AppError::not_found(payer.kind.as_str(), payer.id));
        }

        debug!(payer = %payer, "fetching payment history");
        match self.repo.payment_history(payer).await {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(payer = %payer, error = %err, "store failure, retrying once");
                Ok(self.repo.payment_history(payer).await?)
            }
        }
    }

    // ========================
    // Capacity filter
    // ========================

    /// Instructors with an assignment count at or below the threshold,
    /// zero-assignment instructors included. Ascending id order.
    pub async fn list_under_capacity(&self, threshold: i64) -> Result<Vec<Instructor>, AppError> {
        debug!(threshold, "filtering instructors under capacity");
        match self.repo.instructors_under_capacity(threshold).await {
            Ok(instructors) => Ok(instructors),
            Err(err) => {
                warn!(error = %err, "store failure, retrying once");
                Ok(self.repo.instructors_under_capacity(threshold).await?)
            }
        }
    }

    // ========================
    // Aggregation reports
    // ========================

    /// Payment totals per instructor, skipping instructors with no
    /// entries at all.
    pub async fn summarize_instructor_payments(
        &self,
    ) -> Result<Vec<InstructorPaymentSummary>, AppError> {
        debug!("aggregating instructor payments");
        let aggregates = match self.repo.aggregate_instructor_payments().await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "store failure, retrying once");
                self.repo.aggregate_instructor_payments().await?
            }
        };

        Ok(aggregates
            .into_iter()
            .map(|agg| InstructorPaymentSummary {
                instructor: agg.instructor,
                total_lessons_paid: agg.total_lessons_paid,
                total_compensation_cents: agg.total_compensation_cents,
                entry_count: agg.entry_count,
            })
            .collect())
    }

    /// Total amount paid by one student. A student with no entries gets
    /// a zero total with `entry_count == 0`, not an error.
    pub async fn summarize_student_payment_total(
        &self,
        student_id: PayerId,
    ) -> Result<StudentPaymentTotal, AppError> {
        debug!(%student_id, "summing student payments");
        let (total_cents, entry_count) = match self.repo.sum_student_payments(student_id).await {
            Ok(sums) => sums,
            Err(err) => {
                warn!(%student_id, error = %err, "store failure, retrying once");
                self.repo.sum_student_payments(student_id).await?
            }
        };

        Ok(StudentPaymentTotal {
            student_id,
            total_cents,
            entry_count,
        })
    }

    // ========================
    // Instructor management
    // ========================

    /// Register a new instructor.
    pub async fn add_instructor(&self, instructor: Instructor) -> Result<Instructor, AppError> {
        if instructor.first_name.trim().is_empty() || instructor.last_name.trim().is_empty() {
            return Err(AppError::Validation("instructor name is required".into()));
        }
        self.repo.save_instructor(&instructor).await?;
        info!(id = %instructor.id, name = %instructor.full_name(), "instructor added");
        Ok(instructor)
    }

    /// Get an instructor by id.
    pub async fn get_instructor(&self, id: PayerId) -> Result<Instructor, AppError> {
        self.repo
            .get_instructor(id)
            .await?
            .ok_or_else(|| AppError::not_found("instructor", id))
    }

    /// List all instructors.
    pub async fn list_instructors(&self) -> Result<Vec<Instructor>, AppError> {
        Ok(self.repo.list_instructors().await?)
    }

    /// Update an instructor's profile fields. The lesson counter is
    /// owned by the ledger and cannot be changed from here.
    pub async fn update_instructor(
        &self,
        id: PayerId,
        update: InstructorUpdate,
    ) -> Result<Instructor, AppError> {
        if !self.repo.update_instructor(id, &update).await? {
            return Err(AppError::not_found("instructor", id));
        }
        info!(%id, "instructor profile updated");
        self.get_instructor(id).await
    }

    /// Remove an instructor.
    pub async fn remove_instructor(&self, id: PayerId) -> Result<(), AppError> {
        if !self.repo.delete_instructor(id).await? {
            return Err(AppError::not_found("instructor", id));
        }
        info!(%id, "instructor removed");
        Ok(())
    }

    // ========================
    // Student management
    // ========================

    /// Register a new student.
    pub async fn add_student(&self, student: Student) -> Result<Student, AppError> {
        if student.first_name.trim().is_empty() || student.last_name.trim().is_empty() {
            return Err(AppError::Validation("student name is required".into()));
        }
        self.repo.save_student(&student).await?;
        info!(id = %student.id, name = %student.full_name(), "student added");
        Ok(student)
    }

    /// Get a student by id.
    pub async fn get_student(&self, id: PayerId) -> Result<Student, AppError> {
        self.repo
            .get_student(id)
            .await?
            .ok_or_else(|| AppError::not_found("student", id))
    }

    /// List all students.
    pub async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        Ok(self.repo.list_students().await?)
    }

    /// Remove a student.
    pub async fn remove_student(&self, id: PayerId) -> Result<(), AppError> {
        if !self.repo.delete_student(id).await? {
            return Err(AppError::not_found("student", id));
        }
        info!(%id, "student removed");
        Ok(())
    }

    // ========================
    // Assignment management
    // ========================

    /// Link a student to an instructor. Both sides must exist.
    pub async fn assign_student(
        &self,
        student_id: PayerId,
        instructor_id: PayerId,
    ) -> Result<AssignmentRecord, AppError> {
        if !self.repo.payer_exists(PayerRef::student(student_id)).await? {
            return Err(AppError::not_found("student", student_id));
        }
        if !self
            .repo
            .payer_exists(PayerRef::instructor(instructor_id))
            .await?
        {
            return Err(AppError::not_found("instructor", instructor_id));
        }

        let assignment = AssignmentRecord::new(student_id, instructor_id);
        self.repo.save_assignment(&assignment).await?;
        info!(%student_id, %instructor_id, "student assigned");
        Ok(assignment)
    }

    /// Remove an assignment link.
    pub async fn unassign(&self, assignment_id: AssignmentId) -> Result<(), AppError> {
        if !self.repo.delete_assignment(assignment_id).await? {
            return Err(AppError::not_found("assignment", assignment_id));
        }
        info!(%assignment_id, "assignment removed");
        Ok(())
    }

    /// List all assignment links.
    pub async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>, AppError> {
        Ok(self.repo.list_assignments().await?)
    }

    /// Resolve a payer reference from kind and id strings, as the
    /// boundary receives them.
    pub fn parse_payer(kind: &str, id: &str) -> Result<PayerRef, AppError> {
        let kind = PayerKind::from_str(kind)
            .ok_or_else(|| AppError::Validation(format!("unknown payer kind '{}'", kind)))?;
        let id = Uuid::parse_str(id)
            .map_err(|_| AppError::Validation(format!("invalid payer id '{}'", id)))?;
        Ok(PayerRef { kind, id })
    }
}
