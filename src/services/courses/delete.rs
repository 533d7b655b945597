use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{CourseService, can_manage_course};
use crate::middlewares::RequireJWT;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::teacher_subjects::invalidate_teacher_views;

pub async fn delete_course(
    service: &CourseService,
    course_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    let storage = service.get_storage(request)?;

    let course = match storage.get_course_by_id(course_id).await {
        Ok(Some(course)) => course,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::CourseNotFound,
                "Course not found",
            )));
        }
        Err(e) => return Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    };

    if !can_manage_course(&current_user, &course) {
        return Ok(super::super::forbidden(
            ErrorCode::CoursePermissionDenied,
            "Only the course teacher or an admin can delete this course",
        ));
    }

    match storage.delete_course(course_id).await {
        Ok(true) => {
            info!("Course {} deleted by user {}", course_id, current_user.id);
            invalidate_teacher_views(request, [course.teacher_id]).await;
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("Course deleted successfully")))
        }
        Ok(false) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::CourseNotFound,
            "Course not found",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
