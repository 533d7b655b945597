use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{CourseService, can_manage_course};
use crate::middlewares::RequireJWT;
use crate::models::courses::responses::CourseStudentsResponse;
use crate::models::{ApiResponse, ErrorCode};

pub async fn list_course_students(
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
            "Only the course teacher or an admin can view the roster",
        ));
    }

    match storage.list_course_students(course_id).await {
        Ok(students) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            CourseStudentsResponse { course, students },
            "Course students retrieved successfully",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
