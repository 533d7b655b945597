pub mod create;
pub mod list;
pub mod review;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::enrollment_requests::entities::EnrollmentRequest;
use crate::models::enrollment_requests::requests::{
    CreateEnrollmentRequest, EnrollmentRequestQueryParams, ReviewEnrollmentRequest,
};
use crate::models::users::entities::{User, UserRole};
use crate::storage::Storage;

pub struct EnrollmentRequestService {
    storage: Option<Arc<dyn Storage>>,
}

impl EnrollmentRequestService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    pub async fn list_requests(
        &self,
        query: EnrollmentRequestQueryParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_requests(self, query, request).await
    }

    pub async fn create_request(
        &self,
        data: CreateEnrollmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_request(self, data, request).await
    }

    pub async fn approve_request(
        &self,
        request_id: i64,
        review: ReviewEnrollmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        review::approve_request(self, request_id, review, request).await
    }

    pub async fn reject_request(
        &self,
        request_id: i64,
        review: ReviewEnrollmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        review::reject_request(self, request_id, review, request).await
    }
}

/// 审核权限：申请指向的教师或管理员
pub(crate) fn can_review(user: &User, enrollment_request: &EnrollmentRequest) -> bool {
    user.is_admin()
        || (user.role == UserRole::Teacher && enrollment_request.teacher_id == user.id)
}
