mod common;

use std::collections::HashSet;
use std::sync::Arc;

use academy::contract::model::*;
use academy::domain::error::DomainError;
use academy::domain::service::{Service, ServiceConfig};
use academy::infra::storage;
use chrono::Utc;
use uuid::Uuid;

use common::{branch, course, date, enroll, new_batch, student, teacher, user};

fn is_batch_code(code: &str) -> bool {
    let b = code.as_bytes();
    b.len() == 8 && b[..4].iter().all(u8::is_ascii_uppercase) && b[4..].iter().all(u8::is_ascii_digit)
}

async fn batch_codes_increment_within_scope(svc: Arc<Service>) {
    let kr = branch(&svc, "kr").await;
    let guitar = course(&svc, "gt", "Music").await;
    let piano = course(&svc, "PN", "music").await;
    let ballet = course(&svc, "BL", "dance").await;

    let first = svc.create_batch(new_batch(&guitar, &kr, date(2025, 6, 1))).await.unwrap();
    assert_eq!(first.code, "GTKR0125");
    assert!(is_batch_code(&first.code));
    assert_eq!(first.category, "music");

    // same branch and category, different course: serial continues
    let second = svc.create_batch(new_batch(&piano, &kr, date(2025, 7, 1))).await.unwrap();
    assert_eq!(second.code, "PNKR0225");

    // another category starts over
    let dance = svc.create_batch(new_batch(&ballet, &kr, date(2026, 1, 10))).await.unwrap();
    assert_eq!(dance.code, "BLKR0126");

    let preview = svc
        .preview_batch_code(guitar.id, kr.id, date(2026, 2, 1))
        .await
        .unwrap();
    assert_eq!(preview, "GTKR0326");

    let fetched = svc.get_batch(second.id).await.unwrap();
    assert_eq!(fetched.code, second.code);
    assert_eq!(fetched.course_id, piano.id);
    assert_eq!(fetched.schedule.as_deref(), Some("Sat 10:00"));
}

#[tokio::test]
async fn batch_codes_increment_within_scope_memory() {
    batch_codes_increment_within_scope(common::memory_service()).await;
}

#[tokio::test]
async fn batch_codes_increment_within_scope_sqlite() {
    batch_codes_increment_within_scope(common::sqlite_service().await).await;
}

async fn category_override_never_reuses_a_code(svc: Arc<Service>) {
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;
    let ballet = course(&svc, "BL", "dance").await;

    let first = svc.create_batch(new_batch(&guitar, &kr, date(2025, 6, 1))).await.unwrap();
    assert_eq!(first.code, "GTKR0125");

    // guitar taught under the dance category: its own scope is empty, but
    // GTKR0125 already exists for this course, branch and year
    let mut req = new_batch(&guitar, &kr, date(2025, 9, 1));
    req.category = Some("Dance".to_string());
    let crossover = svc.create_batch(req).await.unwrap();
    assert_eq!(crossover.category, "dance");
    assert_eq!(crossover.code, "GTKR0225");

    // the dance scope now holds serial 02
    let dance = svc.create_batch(new_batch(&ballet, &kr, date(2025, 10, 1))).await.unwrap();
    assert_eq!(dance.code, "BLKR0325");

    let preview = svc
        .preview_batch_code(guitar.id, kr.id, date(2025, 11, 1))
        .await
        .unwrap();
    assert_eq!(preview, "GTKR0325");
    let next = svc.create_batch(new_batch(&guitar, &kr, date(2025, 11, 1))).await.unwrap();
    assert_eq!(next.code, preview);

    let codes: HashSet<_> = svc
        .list_batches(Default::default())
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.code)
        .collect();
    assert_eq!(codes.len(), 4);
}

#[tokio::test]
async fn category_override_never_reuses_a_code_memory() {
    category_override_never_reuses_a_code(common::memory_service()).await;
}

#[tokio::test]
async fn category_override_never_reuses_a_code_sqlite() {
    category_override_never_reuses_a_code(common::sqlite_service().await).await;
}

#[tokio::test]
async fn malformed_legacy_codes_are_skipped() {
    let store = storage::in_memory();
    let svc = Service::new(store.clone(), ServiceConfig::default());
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;

    let now = Utc::now();
    store
        .batches
        .insert(Batch {
            id: Uuid::new_v4(),
            code: "GUITAR-2019".to_string(),
            course_id: guitar.id,
            branch_id: kr.id,
            teacher_id: None,
            category: "music".to_string(),
            schedule: None,
            start_date: date(2019, 1, 1),
            end_date: None,
            capacity: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let batch = svc.create_batch(new_batch(&guitar, &kr, date(2025, 1, 1))).await.unwrap();
    assert_eq!(batch.code, "GTKR0125");
}

#[tokio::test]
async fn serial_exhaustion_is_reported() {
    let store = storage::in_memory();
    let svc = Service::new(store.clone(), ServiceConfig::default());
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;

    let now = Utc::now();
    store
        .batches
        .insert(Batch {
            id: Uuid::new_v4(),
            code: "GTKR9924".to_string(),
            course_id: guitar.id,
            branch_id: kr.id,
            teacher_id: None,
            category: "music".to_string(),
            schedule: None,
            start_date: date(2024, 1, 1),
            end_date: None,
            capacity: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let err = svc
        .create_batch(new_batch(&guitar, &kr, date(2025, 1, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BatchSerialExhausted { .. }));
}

#[tokio::test]
async fn concurrent_batch_creation_yields_distinct_codes() {
    let svc = common::memory_service();
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let svc = svc.clone();
        let req = new_batch(&guitar, &kr, date(2025, 4, 1));
        handles.push(tokio::spawn(async move { svc.create_batch(req).await }));
    }
    let mut codes = HashSet::new();
    for h in handles {
        let batch = h.await.unwrap().unwrap();
        assert!(is_batch_code(&batch.code));
        codes.insert(batch.code);
    }
    assert_eq!(codes.len(), 10);
    assert!(codes.contains("GTKR0125"));
    assert!(codes.contains("GTKR1025"));
}

#[tokio::test]
async fn batch_requires_existing_course_and_keeps_code_on_update() {
    let svc = common::memory_service();
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;

    let mut orphan = new_batch(&guitar, &kr, date(2025, 1, 1));
    orphan.course_id = Uuid::new_v4();
    let err = svc.create_batch(orphan).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "Course", .. }));

    let batch = svc.create_batch(new_batch(&guitar, &kr, date(2025, 1, 1))).await.unwrap();
    let updated = svc
        .update_batch(
            batch.id,
            BatchPatch {
                start_date: Some(date(2026, 1, 1)),
                capacity: Some(12),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.code, batch.code);
    assert_eq!(updated.capacity, Some(12));

    let other = branch(&svc, "MU").await;
    let err = svc
        .update_batch(
            batch.id,
            BatchPatch {
                branch_id: Some(other.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}

async fn attendance_rows_per_pair(svc: Arc<Service>) {
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;
    let batch = svc.create_batch(new_batch(&guitar, &kr, date(2025, 1, 1))).await.unwrap();
    let marker = user(&svc, "teacher@academy.test", Role::Teacher).await;

    let mut students = Vec::new();
    for name in ["Asha", "Ravi", "Kiran"] {
        let s = student(&svc, name, None).await;
        enroll(&svc, &s, &batch).await;
        students.push(s);
    }

    let day = date(2025, 2, 1);
    let req = MarkAttendance {
        batch_id: batch.id,
        date: day,
        marks: vec![
            AttendanceMark { student_id: students[0].id, status: AttendanceStatus::Present },
            AttendanceMark { student_id: students[1].id, status: AttendanceStatus::Absent },
            AttendanceMark { student_id: students[2].id, status: AttendanceStatus::Late },
        ],
    };
    let rows = svc.mark_attendance(req, Some(marker.id)).await.unwrap();
    assert_eq!(rows.len(), 3);

    let listed = svc.list_attendance(batch.id, Some(day)).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|r| r.marked_by == Some(marker.id)));

    // re-marking overwrites instead of adding rows
    let again = MarkAttendance {
        batch_id: batch.id,
        date: day,
        marks: vec![AttendanceMark {
            student_id: students[1].id,
            status: AttendanceStatus::Excused,
        }],
    };
    svc.mark_attendance(again, Some(marker.id)).await.unwrap();
    let listed = svc.list_attendance(batch.id, Some(day)).await.unwrap();
    assert_eq!(listed.len(), 3);
    let ravi = listed.iter().find(|r| r.student_id == students[1].id).unwrap();
    assert_eq!(ravi.status, AttendanceStatus::Excused);

    let admin = user(&svc, "admin@academy.test", Role::Admin).await;
    let summary = svc.attendance_summary(&admin, students[2].id).await.unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.late, 1);
    assert!((summary.percentage - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn attendance_rows_per_pair_memory() {
    attendance_rows_per_pair(common::memory_service()).await;
}

#[tokio::test]
async fn attendance_rows_per_pair_sqlite() {
    attendance_rows_per_pair(common::sqlite_service().await).await;
}

#[tokio::test]
async fn attendance_rejects_bad_requests_without_writing() {
    let svc = common::memory_service();
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;
    let batch = svc.create_batch(new_batch(&guitar, &kr, date(2025, 1, 1))).await.unwrap();
    let enrolled = student(&svc, "Asha", None).await;
    enroll(&svc, &enrolled, &batch).await;
    let outsider = student(&svc, "Ravi", None).await;

    let day = date(2025, 2, 1);
    let mark = |student_id| AttendanceMark { student_id, status: AttendanceStatus::Present };

    let err = svc
        .mark_attendance(
            MarkAttendance { batch_id: Uuid::new_v4(), date: day, marks: vec![mark(enrolled.id)] },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "Batch", .. }));

    for marks in [
        vec![],
        vec![mark(enrolled.id), mark(enrolled.id)],
        vec![mark(enrolled.id), mark(outsider.id)],
    ] {
        let err = svc
            .mark_attendance(MarkAttendance { batch_id: batch.id, date: day, marks }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }), "{err}");
    }
    assert!(svc.list_attendance(batch.id, Some(day)).await.unwrap().is_empty());
}

#[tokio::test]
async fn parents_only_see_their_children() {
    let svc = common::memory_service();
    let parent = user(&svc, "parent@academy.test", Role::Parent).await;
    let other_parent = user(&svc, "other@academy.test", Role::Parent).await;
    let child = student(&svc, "Asha", Some(parent.id)).await;

    let children = svc.children_of(&parent).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);

    let err = svc
        .student_attendance(&other_parent, child.id, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden { .. }));

    // the parent link must point at a parent account
    let teacher_user = user(&svc, "t@academy.test", Role::Teacher).await;
    let err = svc
        .create_student(NewStudent {
            name: "Ravi".to_string(),
            email: None,
            phone: None,
            date_of_birth: None,
            branch_id: None,
            parent_id: Some(teacher_user.id),
            user_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn enrollment_capacity_and_duplicates() {
    let svc = common::memory_service();
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;
    let mut req = new_batch(&guitar, &kr, date(2025, 1, 1));
    req.capacity = Some(1);
    let batch = svc.create_batch(req).await.unwrap();

    let asha = student(&svc, "Asha", None).await;
    let ravi = student(&svc, "Ravi", None).await;
    enroll(&svc, &asha, &batch).await;

    let again = svc
        .enroll(NewEnrollment { student_id: asha.id, batch_id: batch.id, enrolled_on: None, status: None })
        .await
        .unwrap_err();
    assert!(matches!(again, DomainError::Conflict { .. }));

    let full = svc
        .enroll(NewEnrollment { student_id: ravi.id, batch_id: batch.id, enrolled_on: None, status: None })
        .await
        .unwrap_err();
    assert!(full.to_string().contains("is full"));

    let students = svc.batch_students(batch.id).await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].id, asha.id);
}

async fn reactivation_respects_capacity(svc: Arc<Service>) {
    let kr = branch(&svc, "KR").await;
    let guitar = course(&svc, "GT", "music").await;
    let mut req = new_batch(&guitar, &kr, date(2025, 1, 1));
    req.capacity = Some(1);
    let batch = svc.create_batch(req).await.unwrap();

    let asha = student(&svc, "Asha", None).await;
    let ravi = student(&svc, "Ravi", None).await;
    let dropped = svc
        .enroll(NewEnrollment {
            student_id: ravi.id,
            batch_id: batch.id,
            enrolled_on: None,
            status: Some(EnrollmentStatus::Dropped),
        })
        .await
        .unwrap();
    let active = enroll(&svc, &asha, &batch).await;

    let reactivate = EnrollmentPatch {
        status: Some(EnrollmentStatus::Active),
        ..Default::default()
    };
    let err = svc
        .update_enrollment(dropped.id, reactivate.clone())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("is full"), "{err}");
    assert_eq!(svc.batch_students(batch.id).await.unwrap().len(), 1);

    // a freed seat can be taken again
    svc.update_enrollment(
        active.id,
        EnrollmentPatch {
            status: Some(EnrollmentStatus::Dropped),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let back = svc.update_enrollment(dropped.id, reactivate).await.unwrap();
    assert_eq!(back.status, EnrollmentStatus::Active);

    let students = svc.batch_students(batch.id).await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].id, ravi.id);
}

#[tokio::test]
async fn reactivation_respects_capacity_memory() {
    reactivation_respects_capacity(common::memory_service()).await;
}

#[tokio::test]
async fn reactivation_respects_capacity_sqlite() {
    reactivation_respects_capacity(common::sqlite_service().await).await;
}

#[tokio::test]
async fn admin_own_record_views_are_empty() {
    let svc = common::memory_service();
    let admin = user(&svc, "admin@academy.test", Role::Admin).await;
    let parent = user(&svc, "parent@academy.test", Role::Parent).await;
    student(&svc, "Asha", Some(parent.id)).await;

    assert!(svc.children_of(&admin).await.unwrap().is_empty());
    assert!(svc.my_attendance(&admin).await.unwrap().is_empty());
    assert!(svc.my_payments(&admin).await.unwrap().is_empty());
    assert!(svc.my_payrolls(&admin).await.unwrap().is_empty());

    let teacher_user = user(&svc, "t@academy.test", Role::Teacher).await;
    let err = svc.children_of(&teacher_user).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden { .. }));
}

#[tokio::test]
async fn payroll_net_amount_and_uniqueness() {
    let svc = common::sqlite_service().await;
    let login = user(&svc, "meera@academy.test", Role::Teacher).await;
    let emp = teacher(&svc, "meera.staff@academy.test", Some(login.id)).await;

    let payroll = svc
        .create_payroll(NewPayroll {
            employee_id: emp.id,
            month: "2025-03".to_string(),
            base_salary: None,
            bonus: 500_000,
            deductions: 200_000,
            status: None,
            paid_on: None,
        })
        .await
        .unwrap();
    assert_eq!(payroll.base_salary, 4_000_000);
    assert_eq!(payroll.net_amount, 4_300_000);
    assert_eq!(payroll.status, PayrollStatus::Pending);

    let dup = svc
        .create_payroll(NewPayroll {
            employee_id: emp.id,
            month: "2025-03".to_string(),
            base_salary: Some(1),
            bonus: 0,
            deductions: 0,
            status: None,
            paid_on: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(dup, DomainError::Conflict { .. }));

    let paid = svc
        .update_payroll(
            payroll.id,
            PayrollPatch {
                deductions: Some(0),
                status: Some(PayrollStatus::Paid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(paid.net_amount, 4_500_000);
    assert!(paid.paid_on.is_some());

    let too_much = svc
        .update_payroll(
            payroll.id,
            PayrollPatch {
                deductions: Some(10_000_000),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(too_much, DomainError::Validation { .. }));

    let mine = svc.my_payrolls(&login).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, payroll.id);
}

#[tokio::test]
async fn payments_get_invoice_numbers() {
    let svc = common::memory_service();
    let parent = user(&svc, "parent@academy.test", Role::Parent).await;
    let child = student(&svc, "Asha", Some(parent.id)).await;

    let payment = svc
        .create_payment(NewPayment {
            student_id: child.id,
            amount: 250_000,
            method: PaymentMethod::Upi,
            status: Some(PaymentStatus::Paid),
            description: Some("Term 1".to_string()),
            paid_on: Some(date(2025, 4, 2)),
        })
        .await
        .unwrap();
    assert!(payment.invoice_number.starts_with("INV-"));
    assert_eq!(payment.invoice_number.len(), "INV-20250402-ABCDEF".len());

    let zero = svc
        .create_payment(NewPayment {
            student_id: child.id,
            amount: 0,
            method: PaymentMethod::Cash,
            status: None,
            description: None,
            paid_on: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(zero, DomainError::Validation { .. }));

    let mine = svc.my_payments(&parent).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, payment.id);
}

#[tokio::test]
async fn messages_between_users() {
    let svc = common::memory_service();
    let admin = user(&svc, "admin@academy.test", Role::Admin).await;
    let parent = user(&svc, "parent@academy.test", Role::Parent).await;
    let stranger = user(&svc, "stranger@academy.test", Role::Student).await;

    let msg = svc
        .send_message(
            &admin,
            NewMessage {
                recipient_id: parent.id,
                subject: "Fee reminder".to_string(),
                body: "Term 2 fees are due next week.".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(svc.inbox(&parent).await.unwrap().len(), 1);
    assert_eq!(svc.sent_messages(&admin).await.unwrap().len(), 1);
    assert!(svc.inbox(&admin).await.unwrap().is_empty());

    let err = svc.mark_message_read(&admin, msg.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden { .. }));

    let read = svc.mark_message_read(&parent, msg.id).await.unwrap();
    let read_at = read.read_at.expect("read_at set");
    let again = svc.mark_message_read(&parent, msg.id).await.unwrap();
    assert_eq!(again.read_at, Some(read_at));

    let err = svc.delete_message(&stranger, msg.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden { .. }));
    svc.delete_message(&parent, msg.id).await.unwrap();
    let err = svc.delete_message(&parent, msg.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}
