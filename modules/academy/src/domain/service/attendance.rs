//! Attendance marking. A mark request is validated as a whole before any row
//! is written; each pair then upserts the row for `(enrollment, date)`.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use super::Service;
use crate::contract::model::{
    Attendance, AttendanceStatus, AttendanceSummary, EnrollmentStatus, MarkAttendance, User,
};
use crate::domain::error::DomainError;
use crate::domain::repo::{AttendanceFilter, EnrollmentFilter};

impl Service {
    #[instrument(
        name = "academy.service.mark_attendance",
        skip(self, req),
        fields(batch_id = %req.batch_id, date = %req.date, marks = req.marks.len())
    )]
    pub async fn mark_attendance(
        &self,
        req: MarkAttendance,
        marked_by: Option<Uuid>,
    ) -> Result<Vec<Attendance>, DomainError> {
        Self::ensure_exists(&self.store.batches, req.batch_id).await?;
        if req.marks.is_empty() {
            return Err(DomainError::validation("records", "at least one student is required"));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = req.marks.iter().find(|m| !seen.insert(m.student_id)) {
            return Err(DomainError::validation(
                "records",
                format!("student {} appears more than once", dup.student_id),
            ));
        }

        let enrollments: HashMap<Uuid, Uuid> = self
            .store
            .enrollments
            .list(&EnrollmentFilter {
                batch_id: Some(req.batch_id),
                status: Some(EnrollmentStatus::Active),
                ..Default::default()
            })
            .await?
            .into_iter()
            .map(|e| (e.student_id, e.id))
            .collect();
        if let Some(missing) = req.marks.iter().find(|m| !enrollments.contains_key(&m.student_id)) {
            return Err(DomainError::validation(
                "records",
                format!("student {} is not enrolled in this batch", missing.student_id),
            ));
        }

        let mut rows = Vec::with_capacity(req.marks.len());
        for mark in &req.marks {
            let enrollment_id = enrollments[&mark.student_id];
            let existing = self
                .store
                .attendance
                .list(&AttendanceFilter {
                    enrollment_id: Some(enrollment_id),
                    date: Some(req.date),
                    ..Default::default()
                })
                .await?
                .into_iter()
                .next();

            let now = Utc::now();
            let row = match existing {
                Some(mut row) => {
                    row.status = mark.status;
                    row.marked_by = marked_by;
                    row.updated_at = now;
                    Self::replace(&self.store.attendance, row).await?
                }
                None => {
                    let row = Attendance {
                        id: Uuid::new_v4(),
                        enrollment_id,
                        student_id: mark.student_id,
                        batch_id: req.batch_id,
                        date: req.date,
                        status: mark.status,
                        marked_by,
                        created_at: now,
                        updated_at: now,
                    };
                    self.store.attendance.insert(row.clone()).await?;
                    row
                }
            };
            rows.push(row);
        }

        info!("Marked attendance for {} students", rows.len());
        Ok(rows)
    }

    #[instrument(name = "academy.service.list_attendance", skip(self))]
    pub async fn list_attendance(
        &self,
        batch_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Attendance>, DomainError> {
        Self::ensure_exists(&self.store.batches, batch_id).await?;
        Ok(self
            .store
            .attendance
            .list(&AttendanceFilter {
                batch_id: Some(batch_id),
                date,
                ..Default::default()
            })
            .await?)
    }

    #[instrument(name = "academy.service.student_attendance", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn student_attendance(
        &self,
        actor: &User,
        student_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Attendance>, DomainError> {
        if let (Some(from), Some(to)) = (from, to) {
            if to < from {
                return Err(DomainError::validation("to", "cannot be before from"));
            }
        }
        self.ensure_can_view_student(actor, student_id).await?;
        Ok(self
            .store
            .attendance
            .list(&AttendanceFilter {
                student_id: Some(student_id),
                from,
                to,
                ..Default::default()
            })
            .await?)
    }

    #[instrument(name = "academy.service.attendance_summary", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn attendance_summary(
        &self,
        actor: &User,
        student_id: Uuid,
    ) -> Result<AttendanceSummary, DomainError> {
        let rows = self.student_attendance(actor, student_id, None, None).await?;
        Ok(summarize(student_id, &rows))
    }

    /// Attendance of the actor's own student record (student) or children (parent).
    #[instrument(name = "academy.service.my_attendance", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn my_attendance(&self, actor: &User) -> Result<Vec<Attendance>, DomainError> {
        let mut rows = Vec::new();
        for student in self.linked_students(actor).await? {
            rows.extend(
                self.store
                    .attendance
                    .list(&AttendanceFilter {
                        student_id: Some(student.id),
                        ..Default::default()
                    })
                    .await?,
            );
        }
        rows.sort_by_key(|a| (a.created_at, a.id));
        Ok(rows)
    }
}

fn summarize(student_id: Uuid, rows: &[Attendance]) -> AttendanceSummary {
    let count = |status: AttendanceStatus| rows.iter().filter(|r| r.status == status).count() as u32;
    let present = count(AttendanceStatus::Present);
    let late = count(AttendanceStatus::Late);
    let total = rows.len() as u32;
    let percentage = if total == 0 {
        0.0
    } else {
        f64::from(present + late) * 100.0 / f64::from(total)
    };
    AttendanceSummary {
        student_id,
        total,
        present,
        absent: count(AttendanceStatus::Absent),
        late,
        excused: count(AttendanceStatus::Excused),
        percentage,
    }
}
