use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{CourseService, can_view_course};
use crate::middlewares::RequireJWT;
use crate::models::{ApiResponse, ErrorCode};

pub async fn get_course(
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

    match can_view_course(&storage, &current_user, &course).await {
        Ok(true) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            course,
            "Course retrieved successfully",
        ))),
        Ok(false) => Ok(super::super::forbidden(
            ErrorCode::CoursePermissionDenied,
            "You do not have access to this course",
        )),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
