use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{EnrollmentRequestService, can_review};
use crate::middlewares::RequireJWT;
use crate::models::enrollment_requests::entities::EnrollmentRequest;
use crate::models::enrollment_requests::requests::ReviewEnrollmentRequest;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::teacher_subjects::invalidate_teacher_views;

fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

// 加载申请并校验审核权限，失败时返回响应
async fn load_for_review(
    service: &EnrollmentRequestService,
    request_id: i64,
    request: &HttpRequest,
) -> ActixResult<Result<(User, EnrollmentRequest), HttpResponse>> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(Err(super::super::unauthorized()));
    };
    let storage = service.get_storage(request)?;

    let enrollment_request = match storage.get_enrollment_request_by_id(request_id).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            return Ok(Err(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::EnrollmentRequestNotFound,
                "Enrollment request not found",
            ))));
        }
        Err(e) => {
            return Ok(Err(super::super::error_response(
                &e,
                ErrorCode::InternalServerError,
            )));
        }
    };

    if !can_review(&current_user, &enrollment_request) {
        return Ok(Err(super::super::forbidden(
            ErrorCode::EnrollmentPermissionDenied,
            "Only the addressed teacher or an admin can review this request",
        )));
    }

    Ok(Ok((current_user, enrollment_request)))
}

pub async fn approve_request(
    service: &EnrollmentRequestService,
    request_id: i64,
    review: ReviewEnrollmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let (reviewer, enrollment_request) =
        match load_for_review(service, request_id, request).await? {
            Ok(loaded) => loaded,
            Err(response) => return Ok(response),
        };
    let storage = service.get_storage(request)?;

    match storage
        .approve_enrollment_request(request_id, reviewer.id, normalize_comment(review.comment))
        .await
    {
        Ok(outcome) => {
            info!(
                "Enrollment request {} approved by {}: course {} (created: {}), enrollment {} (created: {})",
                request_id,
                reviewer.id,
                outcome.course.id,
                outcome.course_created,
                outcome.enrollment.id,
                outcome.enrollment_created
            );
            invalidate_teacher_views(request, [enrollment_request.teacher_id]).await;
            Ok(HttpResponse::Ok().json(ApiResponse::success(outcome, "选课申请已批准")))
        }
        Err(e) => Ok(super::super::error_response(
            &e,
            ErrorCode::EnrollmentRequestNotPending,
        )),
    }
}

pub async fn reject_request(
    service: &EnrollmentRequestService,
    request_id: i64,
    review: ReviewEnrollmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let (reviewer, enrollment_request) =
        match load_for_review(service, request_id, request).await? {
            Ok(loaded) => loaded,
            Err(response) => return Ok(response),
        };
    let storage = service.get_storage(request)?;

    match storage
        .reject_enrollment_request(request_id, reviewer.id, normalize_comment(review.comment))
        .await
    {
        Ok(rejected) => {
            info!("Enrollment request {} rejected by {}", request_id, reviewer.id);
            invalidate_teacher_views(request, [enrollment_request.teacher_id]).await;
            Ok(HttpResponse::Ok().json(ApiResponse::success(rejected, "选课申请已拒绝")))
        }
        Err(e) => Ok(super::super::error_response(
            &e,
            ErrorCode::EnrollmentRequestNotPending,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_comment() {
        assert_eq!(normalize_comment(None), None);
        assert_eq!(normalize_comment(Some("   ".to_string())), None);
        assert_eq!(
            normalize_comment(Some(" see office ".to_string())),
            Some("see office".to_string())
        );
    }
}
