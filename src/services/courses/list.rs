use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::CourseService;
use crate::middlewares::RequireJWT;
use crate::models::courses::requests::{CourseListQuery, CourseQueryParams};
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};

pub async fn list_courses(
    service: &CourseService,
    query: CourseQueryParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    let storage = service.get_storage(request)?;

    let mut list_query = CourseListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        teacher_id: query.teacher_id,
        student_id: None,
        subject: query.subject,
        grade_level: query.grade_level,
    };

    // 按角色收窄范围
    match current_user.role {
        UserRole::Admin => {}
        UserRole::Teacher => list_query.teacher_id = Some(current_user.id),
        UserRole::Student => list_query.student_id = Some(current_user.id),
    }

    match storage.list_courses_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Course list retrieved successfully",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
