use crate::models::common::PaginationQuery;
use serde::Deserialize;

// 创建课程请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourseRequest {
    // 管理员必须指定；教师为空时使用自己的 ID
    pub teacher_id: Option<i64>,
    pub subject: String,
    pub grade_level: String,
    pub stream: Option<String>,
    pub description: Option<String>,
}

// 课程查询参数（来自HTTP请求）
#[derive(Debug, Deserialize)]
pub struct CourseQueryParams {
    #[serde(flatten)]
    pub pagination: PaginationQuery,
    pub teacher_id: Option<i64>,
    pub subject: Option<String>,
    pub grade_level: Option<String>,
}

// 课程列表查询参数（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct CourseListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub teacher_id: Option<i64>,
    // 仅列出该学生已选的课程
    pub student_id: Option<i64>,
    pub subject: Option<String>,
    pub grade_level: Option<String>,
}
