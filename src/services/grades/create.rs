use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{GradeService, invalidate_for_student};
use crate::middlewares::RequireJWT;
use crate::models::grades::requests::{CreateGradeRequest, validate_score};
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::utils::validate::validate_label;

pub async fn create_grade(
    service: &GradeService,
    data: CreateGradeRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    if current_user.role == UserRole::Student {
        return Ok(super::super::forbidden(
            ErrorCode::GradePermissionDenied,
            "Only teachers and admins can record grades",
        ));
    }

    if let Err(msg) = validate_score(data.score, data.max_score) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::GradeInvalid, msg)));
    }
    if let Err(msg) = validate_label("subject", &data.subject, 64) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::GradeInvalid, msg)));
    }

    let storage = service.get_storage(request)?;

    match storage.get_user_by_id(data.student_id).await {
        Ok(Some(student)) if student.role == UserRole::Student => {}
        Ok(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::GradeInvalid,
                "student_id must refer to a student",
            )));
        }
        Err(e) => return Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }

    match storage.create_grade(current_user.id, data).await {
        Ok(grade) => {
            info!(
                "Grade {} recorded for student {} in {} by {}",
                grade.id, grade.student_id, grade.subject, current_user.id
            );
            invalidate_for_student(&storage, request, grade.student_id).await;
            Ok(HttpResponse::Created().json(ApiResponse::success(grade, "成绩录入成功")))
        }
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
