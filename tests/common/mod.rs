// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use patente::application::LedgerService;
use patente::domain::{Instructor, Student};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Register an instructor with a prepaid lesson counter.
pub async fn add_instructor(
    service: &LedgerService,
    first_name: &str,
    last_name: &str,
    lessons: i64,
) -> Result<Instructor> {
    let instructor = Instructor::new(first_name.into(), last_name.into())
        .with_lessons_remaining(lessons);
    Ok(service.add_instructor(instructor).await?)
}

/// Register a student with just a name.
pub async fn add_student(
    service: &LedgerService,
    first_name: &str,
    last_name: &str,
) -> Result<Student> {
    let student = Student::new(first_name.into(), last_name.into());
    Ok(service.add_student(student).await?)
}
