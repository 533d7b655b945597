use super::entities::EnrollmentRequestStatus;
use crate::models::common::PaginationQuery;
use serde::Deserialize;

// 学生提交选课申请
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEnrollmentRequest {
    pub teacher_id: i64,
    pub subject: String,
    pub grade_level: String,
    pub stream: Option<String>,
    pub family_id: Option<i64>,
    pub note: Option<String>,
}

// 审核选课申请
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewEnrollmentRequest {
    pub comment: Option<String>,
}

// 申请查询参数（来自HTTP请求）
#[derive(Debug, Deserialize)]
pub struct EnrollmentRequestQueryParams {
    #[serde(flatten)]
    pub pagination: PaginationQuery,
    pub status: Option<EnrollmentRequestStatus>,
    pub teacher_id: Option<i64>,
    pub student_id: Option<i64>,
}

// 申请列表查询参数（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct EnrollmentRequestListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub status: Option<EnrollmentRequestStatus>,
    pub teacher_id: Option<i64>,
    pub student_id: Option<i64>,
}
