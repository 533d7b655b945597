use super::entities::Course;
use crate::models::common::PaginationInfo;
use serde::Serialize;

// 课程列表响应
#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub pagination: PaginationInfo,
    pub items: Vec<Course>,
}

// 课程学生
#[derive(Debug, Clone, Serialize)]
pub struct CourseStudent {
    pub student_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}

// 课程学生列表响应
#[derive(Debug, Serialize)]
pub struct CourseStudentsResponse {
    pub course: Course,
    pub students: Vec<CourseStudent>,
}
