use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{GradeService, can_modify_grade, invalidate_for_student};
use crate::middlewares::RequireJWT;
use crate::models::grades::requests::{UpdateGradeRequest, validate_score};
use crate::models::{ApiResponse, ErrorCode};
use crate::utils::validate::validate_label;

pub async fn update_grade(
    service: &GradeService,
    grade_id: i64,
    data: UpdateGradeRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    let storage = service.get_storage(request)?;

    let existing = match storage.get_grade_by_id(grade_id).await {
        Ok(Some(grade)) => grade,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::GradeNotFound,
                "Grade not found",
            )));
        }
        Err(e) => return Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    };

    if !can_modify_grade(&current_user, &existing) {
        return Ok(super::super::forbidden(
            ErrorCode::GradePermissionDenied,
            "Only the grader or an admin can modify this grade",
        ));
    }

    // 与现有值合并后再校验分数
    let score = data.score.unwrap_or(existing.score);
    let max_score = data.max_score.unwrap_or(existing.max_score);
    if let Err(msg) = validate_score(score, max_score) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::GradeInvalid, msg)));
    }
    if let Some(subject) = &data.subject
        && let Err(msg) = validate_label("subject", subject, 64)
    {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::GradeInvalid, msg)));
    }

    match storage.update_grade(grade_id, data).await {
        Ok(Some(grade)) => {
            invalidate_for_student(&storage, request, grade.student_id).await;
            Ok(HttpResponse::Ok().json(ApiResponse::success(grade, "成绩更新成功")))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::GradeNotFound,
            "Grade not found",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
