use crate::reconcile::TeacherSubjectView;
use serde::{Deserialize, Serialize};

// 教师基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherSummary {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
}

// 教师科目视图响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherSubjectsResponse {
    pub teacher: TeacherSummary,
    #[serde(flatten)]
    pub view: TeacherSubjectView,
    // 本次查询中自动补建的课程
    pub created_course_ids: Vec<i64>,
}
