//! Concurrent writers against one record.

use std::sync::Arc;

use futures_util::future::join_all;
use time::macros::datetime;
use ward_core::model::{Admission, AdmissionType, Bed, BedLocation, SupplyRequest, SupplyUrgency};
use ward_core::{PatientId, StaffId, WardId};
use ward_db_memory::InMemoryStore;
use ward_storage::{BedAdmissionStore, ChangeFeed, OccupancyCommit, SupplyStore, Write};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_only_one_wins() {
    let store = Arc::new(InMemoryStore::new());
    let request = SupplyRequest::new(
        WardId::new("ward-a"),
        None,
        StaffId::new("rn-1"),
        "syringes",
        10,
        SupplyUrgency::Urgent,
        datetime!(2024-03-01 08:00:00 UTC),
    )
    .unwrap();
    let stored = store.insert_supply(request).await.unwrap();

    let attempts = (0..8).map(|i| {
        let store = store.clone();
        let mut record = stored.record.clone();
        let version = stored.version;
        tokio::spawn(async move {
            record.quantity = 20 + i;
            store.update_supply(record, version).await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.is_version_conflict())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admits_one_occupant() {
    let store = Arc::new(InMemoryStore::new());
    let bed = store
        .commit_occupancy(
            OccupancyCommit::new().bed(Write::Insert(Bed::new(BedLocation::new("ward-a", "7", "B")))),
        )
        .await
        .unwrap()
        .beds
        .remove(0);

    let attempts = (0..6).map(|i| {
        let store = store.clone();
        let bed = bed.clone();
        tokio::spawn(async move {
            let admission = Admission::new(
                PatientId::new(format!("p-{i}")),
                bed.id.clone(),
                StaffId::new("dr-1"),
                AdmissionType::Scheduled,
                datetime!(2024-03-01 08:00:00 UTC),
            );
            let mut occupied = bed.record.clone();
            occupied.occupy(&admission.id).unwrap();
            store
                .commit_occupancy(
                    OccupancyCommit::new()
                        .bed(Write::update(&bed, occupied))
                        .admission(Write::Insert(admission)),
                )
                .await
        })
    });
    let successes = join_all(attempts)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count();
    assert_eq!(successes, 1);

    let admissions = store.list_admissions().await.unwrap();
    assert_eq!(admissions.len(), 1);
    let bed = store.get_bed(&bed.id).await.unwrap().unwrap();
    assert_eq!(bed.current_admission.as_ref(), Some(&admissions[0].id));

    let feed = store.changes_since(0).await.unwrap();
    assert_eq!(feed.changes.len(), 2);
}
