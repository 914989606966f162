mod common;

use common::*;
use ward_core::model::{SupplyStatus, SupplyUrgency};
use ward_core::WardId;
use ward_engine::RequestSupply;

fn supply(item: &str, urgency: SupplyUrgency) -> RequestSupply {
    RequestSupply {
        ward: WardId::new(WARD),
        admission: None,
        item: item.into(),
        quantity: 2,
        urgency,
    }
}

#[tokio::test]
async fn test_pending_requests_are_ordered_by_urgency_then_age() {
    let ward = Ward::new();
    let supplies = ward.engine.supplies();

    let routine = supplies
        .request(&nurse(), supply("gauze", SupplyUrgency::Routine))
        .await
        .unwrap();
    ward.advance_minutes(5);
    let stat = supplies
        .request(&nurse(), supply("adrenaline", SupplyUrgency::Stat))
        .await
        .unwrap();
    ward.advance_minutes(5);
    let later_routine = supplies
        .request(&head_nurse(), supply("gloves", SupplyUrgency::Routine))
        .await
        .unwrap();
    let scheduled = supplies
        .request(&nurse(), supply("linen", SupplyUrgency::Scheduled))
        .await
        .unwrap();
    let fulfilled = supplies
        .request(&nurse(), supply("saline", SupplyUrgency::Urgent))
        .await
        .unwrap();
    supplies.fulfill(&clerk(), &fulfilled.id).await.unwrap();

    let pending: Vec<_> = supplies
        .pending_for_ward(&WardId::new(WARD))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(
        pending,
        vec![
            stat.id.clone(),
            routine.id.clone(),
            later_routine.id.clone(),
            scheduled.id.clone()
        ]
    );
}

#[tokio::test]
async fn test_requests_close_once() {
    let ward = Ward::new();
    let supplies = ward.engine.supplies();
    let request = supplies
        .request(&nurse(), supply("gauze", SupplyUrgency::Urgent))
        .await
        .unwrap();

    let fulfilled = supplies.fulfill(&clerk(), &request.id).await.unwrap();
    assert_eq!(fulfilled.status, SupplyStatus::Fulfilled);
    assert_eq!(fulfilled.closed_by.as_ref(), Some(&clerk().id));

    let err = supplies.fulfill(&head_nurse(), &request.id).await.unwrap_err();
    assert_eq!(err.kind(), "already_terminal");
    let err = supplies
        .cancel(&nurse(), &request.id, Some("not needed".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "already_terminal");
}

#[tokio::test]
async fn test_cancel_records_reason() {
    let ward = Ward::new();
    let supplies = ward.engine.supplies();
    let request = supplies
        .request(&nurse(), supply("gauze", SupplyUrgency::Routine))
        .await
        .unwrap();

    let err = supplies.cancel(&clerk(), &request.id, None).await.unwrap_err();
    assert!(err.is_forbidden());

    let cancelled = supplies
        .cancel(&nurse(), &request.id, Some("found stock".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, SupplyStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("found stock"));
}

#[tokio::test]
async fn test_request_validation() {
    let ward = Ward::new();
    let supplies = ward.engine.supplies();

    let mut empty = supply("gauze", SupplyUrgency::Routine);
    empty.quantity = 0;
    assert_eq!(
        supplies.request(&nurse(), empty).await.unwrap_err().kind(),
        "validation"
    );
    assert_eq!(
        supplies
            .request(&nurse(), supply(" ", SupplyUrgency::Routine))
            .await
            .unwrap_err()
            .kind(),
        "validation"
    );
    assert!(
        supplies
            .request(&clerk(), supply("gauze", SupplyUrgency::Routine))
            .await
            .unwrap_err()
            .is_forbidden()
    );

    let admission = ward.admitted("p-1").await;
    ward.engine
        .admissions()
        .discharge(&doctor(), &admission.id, None)
        .await
        .unwrap();
    let mut for_patient = supply("dressing pack", SupplyUrgency::Routine);
    for_patient.admission = Some(admission.id.clone());
    assert_eq!(
        supplies
            .request(&nurse(), for_patient)
            .await
            .unwrap_err()
            .kind(),
        "admission_closed"
    );
}
