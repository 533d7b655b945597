use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::EnrollmentRequestService;
use crate::middlewares::RequireJWT;
use crate::models::enrollment_requests::requests::{
    EnrollmentRequestListQuery, EnrollmentRequestQueryParams,
};
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};

pub async fn list_requests(
    service: &EnrollmentRequestService,
    query: EnrollmentRequestQueryParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    let storage = service.get_storage(request)?;

    let mut list_query = EnrollmentRequestListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        status: query.status,
        teacher_id: query.teacher_id,
        student_id: query.student_id,
    };

    // 学生只看自己的申请，教师只看发给自己的申请
    match current_user.role {
        UserRole::Admin => {}
        UserRole::Teacher => list_query.teacher_id = Some(current_user.id),
        UserRole::Student => list_query.student_id = Some(current_user.id),
    }

    match storage
        .list_enrollment_requests_with_pagination(list_query)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Enrollment requests retrieved successfully",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
