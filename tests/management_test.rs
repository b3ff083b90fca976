mod common;

use anyhow::Result;
use patente::application::{ApiResponse, ErrorKind, LedgerService};
use uuid::Uuid;

use common::{add_instructor, add_student, test_service};

#[tokio::test]
async fn test_instructor_crud_round_trip() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let created = add_instructor(&service, "Anna", "Bruni", 12).await?;
    let fetched = service.get_instructor(created.id).await?;
    assert_eq!(fetched.full_name(), "Anna Bruni");
    assert_eq!(fetched.lessons_remaining, 12);

    assert_eq!(service.list_instructors().await?.len(), 1);

    service.remove_instructor(created.id).await?;
    let err = service.get_instructor(created.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_student_crud_round_trip() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let created = add_student(&service, "Marco", "Rossi").await?;
    let fetched = service.get_student(created.id).await?;
    assert_eq!(fetched.full_name(), "Marco Rossi");

    service.remove_student(created.id).await?;
    let err = service.get_student(created.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_blank_names_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = add_instructor(&service, "  ", "Bruni", 0).await;
    assert!(err.is_err());

    let err = add_student(&service, "Marco", "").await;
    assert!(err.is_err());

    Ok(())
}

#[tokio::test]
async fn test_assignment_requires_both_sides() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let instructor = add_instructor(&service, "Anna", "Bruni", 0).await?;
    let student = add_student(&service, "Marco", "Rossi").await?;

    let err = service
        .assign_student(Uuid::new_v4(), instructor.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .assign_student(student.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let assignment = service.assign_student(student.id, instructor.id).await?;
    assert_eq!(service.list_assignments().await?.len(), 1);

    service.unassign(assignment.id).await?;
    let err = service.unassign(assignment.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_payer_parsing_for_the_boundary() -> Result<()> {
    let id = Uuid::new_v4();

    let payer = LedgerService::parse_payer("instructor", &id.to_string())?;
    assert_eq!(payer.id, id);

    let err = LedgerService::parse_payer("admin", &id.to_string()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = LedgerService::parse_payer("student", "not-a-uuid").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    Ok(())
}

#[tokio::test]
async fn test_envelope_reflects_service_results() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let instructor = add_instructor(&service, "Anna", "Bruni", 5).await?;

    let ok = service
        .record_payment(instructor.payer_ref(), "100", 2, None)
        .await;
    let envelope = ApiResponse::from_result("Payment recorded", ok);
    assert!(envelope.success);
    assert!(envelope.payload.is_some());

    let err = service
        .record_payment(instructor.payer_ref(), "abc", 0, None)
        .await;
    let envelope = ApiResponse::from_result("Payment recorded", err);
    assert!(!envelope.success);
    assert_eq!(envelope.error_kind, Some("validation"));

    Ok(())
}
