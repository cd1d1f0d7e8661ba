//! Both repository implementations must behave the same.

mod common;

use academy::contract::model::*;
use academy::domain::repo::{AttendanceFilter, BatchFilter, PaymentFilter, Storage, UserFilter};
use academy::infra::storage;
use chrono::{Duration, Utc};
use uuid::Uuid;

use common::date;

fn user(email: &str, role: Role, offset_ms: i64) -> User {
    let at = Utc::now() + Duration::milliseconds(offset_ms);
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        display_name: email.to_string(),
        role,
        phone: None,
        created_at: at,
        updated_at: at,
    }
}

async fn crud_roundtrip(store: Storage) {
    let first = user("b@academy.test", Role::Teacher, 0);
    let second = user("a@academy.test", Role::Parent, 10);
    store.users.insert(second.clone()).await.unwrap();
    store.users.insert(first.clone()).await.unwrap();

    let found = store.users.find_by_id(first.id).await.unwrap();
    assert_eq!(found.as_ref().map(|u| u.email.as_str()), Some("b@academy.test"));
    assert_eq!(found.map(|u| u.role), Some(Role::Teacher));

    // ordered by creation time, not insertion or email
    let all = store.users.list(&UserFilter::default()).await.unwrap();
    let ids: Vec<Uuid> = all.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let parents = store
        .users
        .list(&UserFilter {
            role: Some(Role::Parent),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id, second.id);

    let mut changed = first.clone();
    changed.display_name = "Renamed".to_string();
    changed.phone = Some("+91 98450 00000".to_string());
    assert!(store.users.update(changed).await.unwrap());
    let reloaded = store.users.find_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(reloaded.display_name, "Renamed");
    assert_eq!(reloaded.phone.as_deref(), Some("+91 98450 00000"));

    assert!(!store.users.update(user("ghost@academy.test", Role::Student, 0)).await.unwrap());

    assert!(store.users.delete(first.id).await.unwrap());
    assert!(!store.users.delete(first.id).await.unwrap());
    assert!(store.users.find_by_id(first.id).await.unwrap().is_none());
}

async fn duplicate_id_is_rejected(store: Storage) {
    let u = user("dup@academy.test", Role::Admin, 0);
    store.users.insert(u.clone()).await.unwrap();
    assert!(store.users.insert(u).await.is_err());
}

async fn date_range_filters(store: Storage) {
    let enrollment_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();
    let batch_id = Uuid::new_v4();
    for day in 1..=5 {
        let now = Utc::now() + Duration::milliseconds(day.into());
        store
            .attendance
            .insert(Attendance {
                id: Uuid::new_v4(),
                enrollment_id,
                student_id,
                batch_id,
                date: date(2025, 3, day),
                status: if day % 2 == 0 {
                    AttendanceStatus::Absent
                } else {
                    AttendanceStatus::Present
                },
                marked_by: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    let window = store
        .attendance
        .list(&AttendanceFilter {
            student_id: Some(student_id),
            from: Some(date(2025, 3, 2)),
            to: Some(date(2025, 3, 4)),
            ..Default::default()
        })
        .await
        .unwrap();
    let days: Vec<_> = window.iter().map(|a| a.date).collect();
    assert_eq!(days, vec![date(2025, 3, 2), date(2025, 3, 3), date(2025, 3, 4)]);

    let one_day = store
        .attendance
        .list(&AttendanceFilter {
            batch_id: Some(batch_id),
            date: Some(date(2025, 3, 5)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(one_day.len(), 1);
    assert_eq!(one_day[0].status, AttendanceStatus::Present);
}

async fn batch_scope_filter(store: Storage) {
    let branch_id = Uuid::new_v4();
    let now = Utc::now();
    for (code, category) in [("GTKR0125", "music"), ("BHKR0125", "dance"), ("PNKR0225", "music")] {
        store
            .batches
            .insert(Batch {
                id: Uuid::new_v4(),
                code: code.to_string(),
                course_id: Uuid::new_v4(),
                branch_id,
                teacher_id: None,
                category: category.to_string(),
                schedule: None,
                start_date: date(2025, 1, 1),
                end_date: None,
                capacity: Some(20),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }
    let music = store
        .batches
        .list(&BatchFilter {
            branch_id: Some(branch_id),
            category: Some("music".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let mut codes: Vec<_> = music.into_iter().map(|b| b.code).collect();
    codes.sort();
    assert_eq!(codes, vec!["GTKR0125", "PNKR0225"]);
}

async fn invoice_number_lookup(store: Storage) {
    let now = Utc::now();
    let payment = Payment {
        id: Uuid::new_v4(),
        student_id: Uuid::new_v4(),
        amount: 250_000,
        method: PaymentMethod::Card,
        status: PaymentStatus::Pending,
        invoice_number: "INV-20250402-ABC123".to_string(),
        description: None,
        paid_on: None,
        created_at: now,
        updated_at: now,
    };
    store.payments.insert(payment.clone()).await.unwrap();

    let by_number = |n: &str| PaymentFilter {
        invoice_number: Some(n.to_string()),
        ..Default::default()
    };
    let hit = store.payments.list(&by_number("INV-20250402-ABC123")).await.unwrap();
    assert_eq!(hit.len(), 1);
    assert_eq!(hit[0].id, payment.id);
    assert!(store.payments.list(&by_number("INV-20250402-FFFFFF")).await.unwrap().is_empty());
}

#[tokio::test]
async fn memory_crud_roundtrip() {
    crud_roundtrip(storage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_crud_roundtrip() {
    crud_roundtrip(common::sqlite_storage().await).await;
}

#[tokio::test]
async fn memory_duplicate_id_is_rejected() {
    duplicate_id_is_rejected(storage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_duplicate_id_is_rejected() {
    duplicate_id_is_rejected(common::sqlite_storage().await).await;
}

#[tokio::test]
async fn memory_date_range_filters() {
    date_range_filters(storage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_date_range_filters() {
    date_range_filters(common::sqlite_storage().await).await;
}

#[tokio::test]
async fn memory_batch_scope_filter() {
    batch_scope_filter(storage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_batch_scope_filter() {
    batch_scope_filter(common::sqlite_storage().await).await;
}

#[tokio::test]
async fn memory_invoice_number_lookup() {
    invoice_number_lookup(storage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_invoice_number_lookup() {
    invoice_number_lookup(common::sqlite_storage().await).await;
}
