use super::entities::GradeType;
use crate::models::common::PaginationQuery;
use serde::Deserialize;

fn default_max_score() -> f64 {
    100.0
}

// 录入成绩请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGradeRequest {
    pub student_id: i64,
    pub subject: String,
    pub score: f64,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    pub grade_type: GradeType,
    pub title: Option<String>,
    pub comment: Option<String>,
}

// 更新成绩请求
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateGradeRequest {
    pub subject: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub grade_type: Option<GradeType>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

// 成绩查询参数（来自HTTP请求）
#[derive(Debug, Deserialize)]
pub struct GradeQueryParams {
    #[serde(flatten)]
    pub pagination: PaginationQuery,
    pub student_id: Option<i64>,
    pub subject: Option<String>,
    pub grade_type: Option<GradeType>,
}

// 成绩概览查询参数
#[derive(Debug, Deserialize)]
pub struct GradeSummaryParams {
    pub student_id: Option<i64>,
}

// 成绩列表查询参数（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct GradeListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub student_id: Option<i64>,
    pub subject: Option<String>,
    pub grade_type: Option<GradeType>,
    pub graded_by: Option<i64>,
}

/// 校验分数：0 <= score <= max_score，且 max_score > 0
pub fn validate_score(score: f64, max_score: f64) -> Result<(), &'static str> {
    if !score.is_finite() || !max_score.is_finite() {
        return Err("Score and max score must be finite numbers");
    }
    if max_score <= 0.0 {
        return Err("Max score must be greater than zero");
    }
    if score < 0.0 {
        return Err("Score must not be negative");
    }
    if score > max_score {
        return Err("Score must not exceed max score");
    }
    Ok(())
}
