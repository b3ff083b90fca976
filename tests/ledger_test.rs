mod common;

use anyhow::Result;
use patente::application::{AppError, ErrorKind};
use patente::domain::{verify_chain, PayerRef};
use uuid::Uuid;

use common::{add_instructor, add_student, test_service};

#[tokio::test]
async fn test_first_payment_chains_off_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let instructor = add_instructor(&service, "Anna", "Bruni", 10).await?;

    let entry = service
        .record_payment(instructor.payer_ref(), "100", 2, None)
        .await?;

    assert_eq!(entry.amount_cents, 10000);
    assert_eq!(entry.running_balance_cents, -10000);
    assert_eq!(entry.lessons_settled, 2);

    let reloaded = service.get_instructor(instructor.id).await?;
    assert_eq!(reloaded.lessons_remaining, 8);

    Ok(())
}

#[tokio::test]
async fn test_balance_chain_over_multiple_payments() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let instructor = add_instructor(&service, "Anna", "Bruni", 10).await?;
    let payer = instructor.payer_ref();

    let first = service.record_payment(payer, "100", 2, None).await?;
    let second = service.record_payment(payer, "50", 1, None).await?;
    let third = service.record_payment(payer, "25.50", 0, None).await?;

    assert_eq!(first.running_balance_cents, -10000);
    assert_eq!(second.running_balance_cents, -15000);
    assert_eq!(third.running_balance_cents, -17550);

    // Stored history satisfies the chain invariant end to end.
    let history = service.payment_history(payer).await?;
    assert_eq!(history.len(), 3);
    assert!(verify_chain(&history).is_empty());

    let reloaded = service.get_instructor(instructor.id).await?;
    assert_eq!(reloaded.lessons_remaining, 7);

    Ok(())
}

#[tokio::test]
async fn test_chains_are_independent_per_payer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let first = add_instructor(&service, "Anna", "Bruni", 0).await?;
    let second = add_instructor(&service, "Carlo", "Dotti", 0).await?;

    service
        .record_payment(first.payer_ref(), "100", 0, None)
        .await?;
    let entry = service
        .record_payment(second.payer_ref(), "40", 0, None)
        .await?;

    // Second instructor's chain starts from zero, untouched by the first.
    assert_eq!(entry.running_balance_cents, -4000);

    Ok(())
}

#[tokio::test]
async fn test_student_payments_chain_too() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let student = add_student(&service, "Marco", "Rossi").await?;
    let payer = student.payer_ref();

    service.record_payment(payer, "80", 0, None).await?;
    let entry = service.record_payment(payer, "20", 0, None).await?;

    assert_eq!(entry.running_balance_cents, -10000);

    Ok(())
}

#[tokio::test]
async fn test_student_payment_rejects_lessons() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let student = add_student(&service, "Marco", "Rossi").await?;

    let err = service
        .record_payment(student.payer_ref(), "80", 1, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    Ok(())
}

#[tokio::test]
async fn test_payment_validation_errors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let instructor = add_instructor(&service, "Anna", "Bruni", 5).await?;
    let payer = instructor.payer_ref();

    for bad_amount in ["abc", "", "12.34.56", "-5"] {
        let err = service
            .record_payment(payer, bad_amount, 0, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "amount {:?}", bad_amount);
    }

    let err = service.record_payment(payer, "10", -1, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Nothing was written and the counter is untouched.
    assert!(service.payment_history(payer).await?.is_empty());
    assert_eq!(service.get_instructor(instructor.id).await?.lessons_remaining, 5);

    Ok(())
}

#[tokio::test]
async fn test_payment_for_unknown_payer_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let ghost = PayerRef::instructor(Uuid::new_v4());
    let err = service.record_payment(ghost, "10", 0, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service.payment_history(ghost).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn test_history_is_newest_first_and_idempotent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let instructor = add_instructor(&service, "Anna", "Bruni", 0).await?;
    let payer = instructor.payer_ref();

    service.record_payment(payer, "100", 0, None).await?;
    service.record_payment(payer, "50", 0, None).await?;

    let first_read = service.payment_history(payer).await?;
    let second_read = service.payment_history(payer).await?;

    assert_eq!(first_read.len(), 2);
    assert_eq!(first_read[0].amount_cents, 5000);
    assert_eq!(first_read[1].amount_cents, 10000);
    assert!(first_read[0].sequence > first_read[1].sequence);

    let ids = |entries: &[patente::domain::PaymentEntry]| {
        entries.iter().map(|e| e.id).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first_read), ids(&second_read));

    Ok(())
}

#[tokio::test]
async fn test_payment_note_round_trips() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let instructor = add_instructor(&service, "Anna", "Bruni", 0).await?;

    service
        .record_payment(
            instructor.payer_ref(),
            "60",
            0,
            Some("march block".to_string()),
        )
        .await?;

    let history = service.payment_history(instructor.payer_ref()).await?;
    assert_eq!(history[0].note.as_deref(), Some("march block"));

    Ok(())
}

#[tokio::test]
async fn test_profile_update_leaves_ledger_state_alone() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let instructor = add_instructor(&service, "Anna", "Bruni", 10).await?;
    let payer = instructor.payer_ref();

    service.record_payment(payer, "100", 3, None).await?;

    let update = patente::domain::InstructorUpdate {
        phone: Some("555-0199".into()),
        ..Default::default()
    };
    let updated = service.update_instructor(instructor.id, update).await?;

    assert_eq!(updated.phone.as_deref(), Some("555-0199"));
    assert_eq!(updated.lessons_remaining, 7);

    // The chain is still valid and a follow-up payment extends it.
    let entry = service.record_payment(payer, "50", 1, None).await?;
    assert_eq!(entry.running_balance_cents, -15000);

    Ok(())
}
