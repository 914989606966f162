mod common;

use common::*;
use ward_core::model::{HandoverContent, HandoverStatus};
use ward_core::{WardEvent, WardId};
use ward_engine::CreateHandover;

fn content(key_points: &str) -> HandoverContent {
    HandoverContent {
        key_points: key_points.into(),
        clinical_update: "obs stable overnight".into(),
        pending_tasks: vec!["bloods at 10:00".into()],
        risk_alerts: vec!["falls risk".into()],
    }
}

fn handover(key_points: &str) -> CreateHandover {
    CreateHandover {
        ward: WardId::new(WARD),
        admission: None,
        content: content(key_points),
    }
}

#[tokio::test]
async fn test_acknowledge_only_once() {
    let ward = Ward::new();
    let ledger = ward.engine.handovers();
    let record = ledger.create(&nurse(), handover("bay 2 quiet")).await.unwrap();
    assert_eq!(record.status, HandoverStatus::Pending);

    let acknowledged = ledger.acknowledge(&incoming_nurse(), &record.id).await.unwrap();
    assert_eq!(acknowledged.status, HandoverStatus::Acknowledged);
    assert_eq!(
        acknowledged.acknowledgement.as_ref().map(|s| &s.by),
        Some(&incoming_nurse().id)
    );

    let err = ledger
        .acknowledge(&head_nurse(), &record.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "already_terminal");
}

#[tokio::test]
async fn test_author_cannot_acknowledge_own_handover() {
    let ward = Ward::new();
    let ledger = ward.engine.handovers();
    let record = ledger.create(&nurse(), handover("bay 2 quiet")).await.unwrap();

    let err = ledger.acknowledge(&nurse(), &record.id).await.unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert_eq!(
        ledger.get(&record.id).await.unwrap().status,
        HandoverStatus::Pending
    );
}

#[tokio::test]
async fn test_content_is_never_mutated() {
    let ward = Ward::new();
    let ledger = ward.engine.handovers();
    let record = ledger.create(&nurse(), handover("bay 2 quiet")).await.unwrap();
    let before = ledger.get(&record.id).await.unwrap();

    // Unrelated work plus the record's own sign-offs.
    ward.admitted("p-1").await;
    ledger.acknowledge(&incoming_nurse(), &record.id).await.unwrap();
    ledger
        .review(&head_nurse(), &record.id, Some("complete".into()))
        .await
        .unwrap();
    ledger
        .correct(&nurse(), &record.id, content("bay 2 quiet, bed 4 NBM"))
        .await
        .unwrap();

    let after = ledger.get(&record.id).await.unwrap();
    assert_eq!(after.content, before.content);
    assert_eq!(after.author, before.author);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.supersedes.is_none());
}

#[tokio::test]
async fn test_review_flow() {
    let ward = Ward::new();
    let ledger = ward.engine.handovers();
    let record = ledger.create(&nurse(), handover("bay 2 quiet")).await.unwrap();

    let err = ledger.review(&head_nurse(), &record.id, None).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_transition");

    ledger.acknowledge(&incoming_nurse(), &record.id).await.unwrap();
    let err = ledger.review(&nurse(), &record.id, None).await.unwrap_err();
    assert!(err.is_forbidden());

    let reviewed = ledger
        .review(&head_nurse(), &record.id, Some("ok".into()))
        .await
        .unwrap();
    assert_eq!(reviewed.status, HandoverStatus::Reviewed);

    let err = ledger.review(&head_nurse(), &record.id, None).await.unwrap_err();
    assert_eq!(err.kind(), "already_terminal");
}

#[tokio::test]
async fn test_corrections_supersede_without_editing() {
    let ward = Ward::new();
    let ledger = ward.engine.handovers();
    let mut events = ward.engine.subscribe();

    let original = ledger.create(&nurse(), handover("bay 2 quiet")).await.unwrap();
    ward.advance_minutes(10);
    let corrected = ledger
        .correct(&nurse(), &original.id, content("bay 2 quiet, bed 4 NBM"))
        .await
        .unwrap();
    ward.advance_minutes(10);
    let unrelated = ledger.create(&head_nurse(), handover("bay 5 isolation")).await.unwrap();

    assert_eq!(corrected.supersedes.as_ref(), Some(&original.id));
    assert_eq!(corrected.status, HandoverStatus::Pending);
    assert_ne!(corrected.id, original.id);

    let all: Vec<_> = ledger
        .for_ward(&WardId::new(WARD))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(
        all,
        vec![unrelated.id.clone(), corrected.id.clone(), original.id.clone()]
    );

    let current: Vec<_> = ledger
        .current_for_ward(&WardId::new(WARD))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(current, vec![unrelated.id.clone(), corrected.id.clone()]);

    let created: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            WardEvent::HandoverCreated(record) => Some(record.id),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 3);
    assert_eq!(created[1], corrected.id);
}

#[tokio::test]
async fn test_handover_requires_key_points() {
    let ward = Ward::new();
    let err = ward
        .engine
        .handovers()
        .create(&nurse(), handover(""))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    let err = ward
        .engine
        .handovers()
        .create(&doctor(), handover("notes"))
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[tokio::test]
async fn test_superseded_record_cannot_be_corrected_again() {
    let ward = Ward::new();
    let ledger = ward.engine.handovers();
    let original = ledger.create(&nurse(), handover("bay 2 quiet")).await.unwrap();
    let corrected = ledger
        .correct(&nurse(), &original.id, content("bay 2 quiet, bed 4 NBM"))
        .await
        .unwrap();

    let err = ledger
        .correct(&head_nurse(), &original.id, content("bay 2 quiet, bed 4 fasting"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_transition");

    let head = ledger
        .correct(&head_nurse(), &corrected.id, content("bay 2 quiet, bed 4 fasting"))
        .await
        .unwrap();
    assert_eq!(head.supersedes.as_ref(), Some(&corrected.id));

    let current: Vec<_> = ledger
        .current_for_ward(&WardId::new(WARD))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(current, vec![head.id.clone()]);
}

#[tokio::test]
async fn test_handover_requires_open_admission() {
    let ward = Ward::new();
    let ledger = ward.engine.handovers();
    let admission = ward.admitted("p-1").await;
    let for_patient = CreateHandover {
        admission: Some(admission.id.clone()),
        ..handover("p-1 settled after theatre")
    };
    let record = ledger.create(&nurse(), for_patient.clone()).await.unwrap();
    assert_eq!(record.admission.as_ref(), Some(&admission.id));

    ward.engine
        .admissions()
        .discharge(&doctor(), &admission.id, None)
        .await
        .unwrap();

    let err = ledger.create(&nurse(), for_patient).await.unwrap_err();
    assert_eq!(err.kind(), "admission_closed");
    let err = ledger
        .correct(&nurse(), &record.id, content("p-1 discharged home"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "admission_closed");

    // Ward-level notes carry on regardless.
    ledger.create(&nurse(), handover("bay 2 quiet")).await.unwrap();
}
