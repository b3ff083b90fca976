use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    next_balance, AssignmentId, AssignmentRecord, Cents, Instructor, InstructorUpdate, PayerId,
    PayerKind, PayerRef, PaymentEntry, PaymentId, Student,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_ASSIGNMENTS};

/// Outcome of the transactional record-payment unit. Conflicts and
/// missing payers are expected states, not storage failures, so they
/// travel in the Ok channel and the service decides what to do.
#[derive(Debug)]
pub enum RecordOutcome {
    Recorded(PaymentEntry),
    PayerMissing,
    VersionConflict,
}

/// Aggregate row for the instructor payment report.
#[derive(Debug, Clone)]
pub struct InstructorPaymentAggregate {
    pub instructor: Instructor,
    pub total_lessons_paid: i64,
    pub total_compensation_cents: Cents,
    pub entry_count: i64,
}

/// Repository for persisting and querying payers, payments, and
/// assignment links.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL. WAL mode keeps
    /// readers running alongside the single writer; the busy timeout
    /// covers short write-lock contention.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_ASSIGNMENTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Instructor operations
    // ========================

    /// Save a new instructor.
    pub async fn save_instructor(&self, instructor: &Instructor) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO instructors (id, first_name, last_name, phone, email, address, hired_as, dob, gender, licence_number, di_number, lessons_remaining, version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(instructor.id.to_string())
        .bind(&instructor.first_name)
        .bind(&instructor.last_name)
        .bind(&instructor.phone)
        .bind(&instructor.email)
        .bind(&instructor.address)
        .bind(&instructor.hired_as)
        .bind(&instructor.dob)
        .bind(&instructor.gender)
        .bind(&instructor.licence_number)
        .bind(&instructor.di_number)
        .bind(instructor.lessons_remaining)
        .bind(instructor.version)
        .bind(instructor.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save instructor")?;
        Ok(())
    }

    /// Get an instructor by id.
    pub async fn get_instructor(&self, id: PayerId) -> Result<Option<Instructor>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, phone, email, address, hired_as, dob, gender, licence_number, di_number, lessons_remaining, version, created_at
            FROM instructors
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch instructor")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_instructor(&row)?)),
            None => Ok(None),
        }
    }

    /// List all instructors, ordered by id for deterministic output.
    pub async fn list_instructors(&self) -> Result<Vec<Instructor>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, phone, email, address, hired_as, dob, gender, licence_number, di_number, lessons_remaining, version, created_at
            FROM instructors
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list instructors")?;

        rows.iter().map(Self::row_to_instructor).collect()
    }

    /// Update an instructor's profile fields. The lesson counter and
    /// version token are not touchable from here.
    pub async fn update_instructor(
        &self,
        id: PayerId,
        update: &InstructorUpdate,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE instructors SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                phone = COALESCE(?, phone),
                email = COALESCE(?, email),
                address = COALESCE(?, address),
                dob = COALESCE(?, dob),
                gender = COALESCE(?, gender),
                licence_number = COALESCE(?, licence_number),
                di_number = COALESCE(?, di_number)
            WHERE id = ?
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .bind(&update.email)
        .bind(&update.address)
        .bind(&update.dob)
        .bind(&update.gender)
        .bind(&update.licence_number)
        .bind(&update.di_number)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update instructor")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an instructor. Returns false if no such row.
    pub async fn delete_instructor(&self, id: PayerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM instructors WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete instructor")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_instructor(row: &sqlx::sqlite::SqliteRow) -> Result<Instructor> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Instructor {
            id: Uuid::parse_str(&id_str).context("Invalid instructor ID")?,
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            phone: row.get("phone"),
            email: row.get("email"),
            address: row.get("address"),
            hired_as: row.get("hired_as"),
            dob: row.get("dob"),
            gender: row.get("gender"),
            licence_number: row.get("licence_number"),
            di_number: row.get("di_number"),
            lessons_remaining: row.get("lessons_remaining"),
            version: row.get("version"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Student operations
    // ========================

    /// Save a new student.
    pub async fn save_student(&self, student: &Student) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO students (id, first_name, last_name, phone, email, address, dob, gender, supportive_id, version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(student.id.to_string())
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.phone)
        .bind(&student.email)
        .bind(&student.address)
        .bind(&student.dob)
        .bind(&student.gender)
        .bind(&student.supportive_id)
        .bind(student.version)
        .bind(student.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save student")?;
        Ok(())
    }

    /// Get a student by id.
    pub async fn get_student(&self, id: PayerId) -> Result<Option<Student>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, phone, email, address, dob, gender, supportive_id, version, created_at
            FROM students
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch student")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_student(&row)?)),
            None => Ok(None),
        }
    }

    /// List all students, ordered by id.
    pub async fn list_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, phone, email, address, dob, gender, supportive_id, version, created_at
            FROM students
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list students")?;

        rows.iter().map(Self::row_to_student).collect()
    }

    /// Delete a student. Returns false if no such row.
    pub async fn delete_student(&self, id: PayerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete student")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_student(row: &sqlx::sqlite::SqliteRow) -> Result<Student> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Student {
            id: Uuid::parse_str(&id_str).context("Invalid student ID")?,
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            phone: row.get("phone"),
            email: row.get("email"),
            address: row.get("address"),
            dob: row.get("dob"),
            gender: row.get("gender"),
            supportive_id: row.get("supportive_id"),
            version: row.get("version"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    /// Check whether a payer row exists.
    pub async fn payer_exists(&self, payer: PayerRef) -> Result<bool> {
        let query = match payer.kind {
            PayerKind::Instructor => "SELECT 1 FROM instructors WHERE id = ?",
            PayerKind::Student => "SELECT 1 FROM students WHERE id = ?",
        };
        let row = sqlx::query(query)
            .bind(payer.id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to check payer existence")?;
        Ok(row.is_some())
    }

    // ========================
    // Payment operations
    // ========================

    /// Record a payment as one transactional unit: read the payer and
    /// the latest chain entry, bump the payer's version token (and for
    /// instructors decrement the lesson counter), then insert the new
    /// entry with the chained balance.
    ///
    /// The version guard (`WHERE version = ?`) is what serializes
    /// concurrent writers on the same payer: the loser of a race
    /// updates zero rows and gets `VersionConflict` instead of chaining
    /// off a stale prior balance.
    pub async fn record_payment(
        &self,
        payer: PayerRef,
        amount_cents: Cents,
        lessons_settled: i64,
        note: Option<String>,
    ) -> Result<RecordOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let payer_id_str = payer.id.to_string();

        let version_query = match payer.kind {
            PayerKind::Instructor => "SELECT version FROM instructors WHERE id = ?",
            PayerKind::Student => "SELECT version FROM students WHERE id = ?",
        };
        let payer_row = sqlx::query(version_query)
            .bind(&payer_id_str)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch payer for payment")?;

        let version: i64 = match payer_row {
            Some(row) => row.get("version"),
            None => return Ok(RecordOutcome::PayerMissing),
        };

        let prior_row = sqlx::query(
            r#"
            SELECT running_balance_cents
            FROM payments
            WHERE payer_kind = ? AND payer_id = ?
            ORDER BY created_at DESC, sequence DESC
            LIMIT 1
            "#,
        )
        .bind(payer.kind.as_str())
        .bind(&payer_id_str)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch latest payment")?;

        let prior_balance: Option<Cents> = prior_row.map(|row| row.get("running_balance_cents"));
        let new_balance = next_balance(prior_balance, amount_cents);

        let guard = match payer.kind {
            PayerKind::Instructor => sqlx::query(
                r#"
                UPDATE instructors
                SET lessons_remaining = lessons_remaining - ?, version = version + 1
                WHERE id = ? AND version = ?
                "#,
            )
            .bind(lessons_settled)
            .bind(&payer_id_str)
            .bind(version),
            PayerKind::Student => sqlx::query(
                "UPDATE students SET version = version + 1 WHERE id = ? AND version = ?",
            )
            .bind(&payer_id_str)
            .bind(version),
        };

        let guarded = guard
            .execute(&mut *tx)
            .await
            .context("Failed to update payer for payment")?;

        if guarded.rows_affected() == 0 {
            // Another writer advanced the chain between our read and
            // this update. Drop the transaction without committing.
            return Ok(RecordOutcome::VersionConflict);
        }

        let sequence_row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'payment_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to get next payment sequence")?;
        let sequence: i64 = sequence_row.get("value");

        let mut entry = PaymentEntry::new(payer, amount_cents, lessons_settled);
        entry.running_balance_cents = new_balance;
        entry.sequence = sequence;
        entry.note = note;

        sqlx::query(
            r#"
            INSERT INTO payments (id, payer_kind, payer_id, amount_cents, lessons_settled, running_balance_cents, sequence, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.payer_kind.as_str())
        .bind(entry.payer_id.to_string())
        .bind(entry.amount_cents)
        .bind(entry.lessons_settled)
        .bind(entry.running_balance_cents)
        .bind(entry.sequence)
        .bind(&entry.note)
        .bind(entry.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to insert payment")?;

        tx.commit().await.context("Failed to commit payment")?;

        Ok(RecordOutcome::Recorded(entry))
    }

    /// Payment history for a payer, newest first with sequence as the
    /// deterministic tie-break.
    pub async fn payment_history(&self, payer: PayerRef) -> Result<Vec<PaymentEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, payer_kind, payer_id, amount_cents, lessons_settled, running_balance_cents, sequence, note, created_at
            FROM payments
            WHERE payer_kind = ? AND payer_id = ?
            ORDER BY created_at DESC, sequence DESC
            "#,
        )
        .bind(payer.kind.as_str())
        .bind(payer.id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch payment history")?;

        rows.iter().map(Self::row_to_payment).collect()
    }

    /// Get a single payment entry by id.
    pub async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, payer_kind, payer_id, amount_cents, lessons_settled, running_balance_cents, sequence, note, created_at
            FROM payments
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch payment")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_payment(&row)?)),
            None => Ok(None),
        }
    }

    fn row_to_payment(row: &sqlx::sqlite::SqliteRow) -> Result<PaymentEntry> {
        let id_str: String = row.get("id");
        let payer_kind_str: String = row.get("payer_kind");
        let payer_id_str: String = row.get("payer_id");
        let created_at_str: String = row.get("created_at");

        Ok(PaymentEntry {
            id: Uuid::parse_str(&id_str).context("Invalid payment ID")?,
            payer_kind: PayerKind::from_str(&payer_kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid payer kind: {}", payer_kind_str))?,
            payer_id: Uuid::parse_str(&payer_id_str).context("Invalid payer ID")?,
            amount_cents: row.get("amount_cents"),
            lessons_settled: row.get("lessons_settled"),
            running_balance_cents: row.get("running_balance_cents"),
            sequence: row.get("sequence"),
            note: row.get("note"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Assignment operations
    // ========================

    /// Save a new assignment link.
    pub async fn save_assignment(&self, assignment: &AssignmentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO assignments (id, student_id, instructor_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(assignment.id.to_string())
        .bind(assignment.student_id.to_string())
        .bind(assignment.instructor_id.to_string())
        .bind(assignment.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save assignment")?;
        Ok(())
    }

    /// Delete an assignment link. Returns false if no such row.
    pub async fn delete_assignment(&self, id: AssignmentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM assignments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete assignment")?;
        Ok(result.rows_affected() > 0)
    }

    /// List all assignment links.
    pub async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, student_id, instructor_id, created_at
            FROM assignments
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list assignments")?;

        rows.iter().map(Self::row_to_assignment).collect()
    }

    fn row_to_assignment(row: &sqlx::sqlite::SqliteRow) -> Result<AssignmentRecord> {
        let id_str: String = row.get("id");
        let student_id_str: String = row.get("student_id");
        let instructor_id_str: String = row.get("instructor_id");
        let created_at_str: String = row.get("created_at");

        Ok(AssignmentRecord {
            id: Uuid::parse_str(&id_str).context("Invalid assignment ID")?,
            student_id: Uuid::parse_str(&student_id_str).context("Invalid student ID")?,
            instructor_id: Uuid::parse_str(&instructor_id_str).context("Invalid instructor ID")?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Joins and aggregation
    // ========================

    /// Instructors whose assignment count is at or below the threshold.
    ///
    /// The LEFT JOIN keeps zero-assignment instructors in the result
    /// with a count of zero; ordering by id keeps the output
    /// deterministic for a fixed snapshot.
    pub async fn instructors_under_capacity(&self, threshold: i64) -> Result<Vec<Instructor>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.first_name, i.last_name, i.phone, i.email, i.address, i.hired_as, i.dob, i.gender, i.licence_number, i.di_number, i.lessons_remaining, i.version, i.created_at
            FROM instructors i
            LEFT JOIN assignments a ON a.instructor_id = i.id
            GROUP BY i.id
            HAVING COUNT(a.id) <= ?
            ORDER BY i.id
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query instructors under capacity")?;

        rows.iter().map(Self::row_to_instructor).collect()
    }

    /// Per-instructor payment totals. The inner join drops instructors
    /// with no payment entries entirely.
    pub async fn aggregate_instructor_payments(&self) -> Result<Vec<InstructorPaymentAggregate>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.first_name, i.last_name, i.phone, i.email, i.address, i.hired_as, i.dob, i.gender, i.licence_number, i.di_number, i.lessons_remaining, i.version, i.created_at,
                   SUM(p.lessons_settled) AS total_lessons_paid,
                   SUM(p.amount_cents) AS total_compensation_cents,
                   COUNT(p.id) AS entry_count
            FROM instructors i
            JOIN payments p ON p.payer_id = i.id AND p.payer_kind = 'instructor'
            GROUP BY i.id
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate instructor payments")?;

        rows.iter()
            .map(|row| {
                Ok(InstructorPaymentAggregate {
                    instructor: Self::row_to_instructor(row)?,
                    total_lessons_paid: row.get("total_lessons_paid"),
                    total_compensation_cents: row.get("total_compensation_cents"),
                    entry_count: row.get("entry_count"),
                })
            })
            .collect()
    }

    /// Sum a student's payment amounts. Zero rows is a legitimate
    /// result, reported as (0, 0).
    pub async fn sum_student_payments(&self, student_id: PayerId) -> Result<(Cents, i64)> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) AS total, COUNT(*) AS entry_count
            FROM payments
            WHERE payer_kind = 'student' AND payer_id = ?
            "#,
        )
        .bind(student_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum student payments")?;

        Ok((row.get("total"), row.get("entry_count")))
    }
}
