use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::enrollment_requests::requests::{
    CreateEnrollmentRequest, EnrollmentRequestQueryParams, ReviewEnrollmentRequest,
};
use crate::services::EnrollmentRequestService;
use crate::utils::{OptionalJson, SafeIDI64};

static ENROLLMENT_REQUEST_SERVICE: Lazy<EnrollmentRequestService> =
    Lazy::new(EnrollmentRequestService::new_lazy);

pub async fn list_requests(
    req: HttpRequest,
    query: web::Query<EnrollmentRequestQueryParams>,
) -> ActixResult<HttpResponse> {
    ENROLLMENT_REQUEST_SERVICE
        .list_requests(query.into_inner(), &req)
        .await
}

pub async fn create_request(
    req: HttpRequest,
    data: web::Json<CreateEnrollmentRequest>,
) -> ActixResult<HttpResponse> {
    ENROLLMENT_REQUEST_SERVICE
        .create_request(data.into_inner(), &req)
        .await
}

// 审核意见可省略，请求体为空时按无意见处理
pub async fn approve_request(
    req: HttpRequest,
    request_id: SafeIDI64,
    review: OptionalJson<ReviewEnrollmentRequest>,
) -> ActixResult<HttpResponse> {
    let review = review.into_inner();
    ENROLLMENT_REQUEST_SERVICE
        .approve_request(request_id.0, review, &req)
        .await
}

pub async fn reject_request(
    req: HttpRequest,
    request_id: SafeIDI64,
    review: OptionalJson<ReviewEnrollmentRequest>,
) -> ActixResult<HttpResponse> {
    let review = review.into_inner();
    ENROLLMENT_REQUEST_SERVICE
        .reject_request(request_id.0, review, &req)
        .await
}

// 配置路由
pub fn configure_enrollment_request_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/enrollment-requests")
            .wrap(middlewares::RequireJWT)
            .route("", web::get().to(list_requests))
            .route("", web::post().to(create_request))
            .route("/{id}/approve", web::post().to(approve_request))
            .route("/{id}/reject", web::post().to(reject_request)),
    );
}
