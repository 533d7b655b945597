pub mod auth;
pub mod common;
pub mod courses;
pub mod enrollment_requests;
pub mod grades;
pub mod reconciliation;
pub mod teacher_subjects;
pub mod users;

pub use common::{ApiResponse, ErrorCode, PaginatedResponse, PaginationInfo, PaginationQuery};

// 程序启动时间
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}
