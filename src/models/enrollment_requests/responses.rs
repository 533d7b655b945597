use super::entities::EnrollmentRequest;
use crate::models::common::PaginationInfo;
use crate::models::courses::entities::{Course, Enrollment};
use serde::Serialize;

// 申请列表响应
#[derive(Debug, Serialize)]
pub struct EnrollmentRequestListResponse {
    pub pagination: PaginationInfo,
    pub items: Vec<EnrollmentRequest>,
}

// 批准结果：申请、对应课程及选课记录
#[derive(Debug, Serialize)]
pub struct ApprovalOutcome {
    pub request: EnrollmentRequest,
    pub course: Course,
    pub enrollment: Enrollment,
    pub course_created: bool,
    pub enrollment_created: bool,
}
