use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::EnrollmentRequestService;
use crate::middlewares::RequireJWT;
use crate::models::enrollment_requests::requests::CreateEnrollmentRequest;
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::reconcile::CourseKey;
use crate::services::courses::create::validate_course_labels;

pub async fn create_request(
    service: &EnrollmentRequestService,
    data: CreateEnrollmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    if current_user.role != UserRole::Student {
        return Ok(super::super::forbidden(
            ErrorCode::EnrollmentPermissionDenied,
            "Only students can submit enrollment requests",
        ));
    }

    if let Err(msg) =
        validate_course_labels(&data.subject, &data.grade_level, data.stream.as_deref())
    {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::EnrollmentRequestInvalid,
            msg,
        )));
    }

    let Some(key) = CourseKey::new(&data.subject, &data.grade_level, data.teacher_id) else {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::EnrollmentRequestInvalid,
            "subject and grade_level must not be empty",
        )));
    };

    let storage = service.get_storage(request)?;

    match storage.get_user_by_id(data.teacher_id).await {
        Ok(Some(teacher)) if teacher.role == UserRole::Teacher => {}
        Ok(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::EnrollmentRequestInvalid,
                "teacher_id must refer to a teacher",
            )));
        }
        Err(e) => return Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }

    match storage
        .has_active_enrollment_request(current_user.id, &key)
        .await
    {
        Ok(false) => {}
        Ok(true) => {
            return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::EnrollmentRequestDuplicate,
                "A pending or approved request for this course already exists",
            )));
        }
        Err(e) => return Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }

    match storage
        .create_enrollment_request(current_user.id, data)
        .await
    {
        Ok(created) => {
            info!(
                "Enrollment request {} submitted by student {} to teacher {}",
                created.id, created.student_id, created.teacher_id
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(created, "选课申请已提交")))
        }
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
