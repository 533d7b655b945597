//! 选课申请实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "enrollment_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub subject: String,
    pub grade_level: String,
    pub stream: Option<String>,
    pub family_id: Option<i64>,
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub review_comment: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_enrollment_request(
        self,
    ) -> crate::models::enrollment_requests::entities::EnrollmentRequest {
        use crate::models::enrollment_requests::entities::{
            EnrollmentRequest, EnrollmentRequestStatus,
        };
        use chrono::{DateTime, Utc};

        EnrollmentRequest {
            id: self.id,
            student_id: self.student_id,
            teacher_id: self.teacher_id,
            subject: self.subject,
            grade_level: self.grade_level,
            stream: self.stream,
            family_id: self.family_id,
            status: self
                .status
                .parse::<EnrollmentRequestStatus>()
                .unwrap_or(EnrollmentRequestStatus::Pending),
            note: self.note,
            review_comment: self.review_comment,
            reviewed_by: self.reviewed_by,
            reviewed_at: self
                .reviewed_at
                .map(|ts| DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()),
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
            updated_at: DateTime::<Utc>::from_timestamp(self.updated_at, 0).unwrap_or_default(),
        }
    }
}
