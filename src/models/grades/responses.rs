use super::entities::StudentGrade;
use crate::models::common::PaginationInfo;
use crate::reconcile::ScoreSummary;
use serde::Serialize;

// 成绩列表响应
#[derive(Debug, Serialize)]
pub struct GradeListResponse {
    pub pagination: PaginationInfo,
    pub items: Vec<StudentGrade>,
}

// 单科成绩概览
#[derive(Debug, Clone, Serialize)]
pub struct SubjectScoreSummary {
    pub subject: String,
    pub subject_key: String,
    pub scores: ScoreSummary,
}

// 学生成绩概览
#[derive(Debug, Serialize)]
pub struct StudentGradeSummary {
    pub student_id: i64,
    pub subjects: Vec<SubjectScoreSummary>,
    pub overall: ScoreSummary,
}
