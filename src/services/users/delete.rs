use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use super::UserService;
use crate::{
    middlewares::RequireJWT,
    models::{ApiResponse, ErrorCode, users::entities::UserRole},
    services::{grades::teachers_of_student, teacher_subjects::invalidate_teacher_views},
    storage::Storage,
};

// 删除会级联到课程、选课、申请和成绩，需在删除前收集受影响的教师
async fn affected_teachers(storage: &Arc<dyn Storage>, user_id: i64) -> BTreeSet<i64> {
    let mut teachers = match teachers_of_student(storage, user_id).await {
        Ok(teachers) => teachers,
        Err(e) => {
            warn!("Failed to resolve teachers affected by deleting user {}: {}", user_id, e);
            BTreeSet::new()
        }
    };
    if let Ok(Some(user)) = storage.get_user_by_id(user_id).await
        && user.role == UserRole::Teacher
    {
        teachers.insert(user_id);
    }
    teachers
}

pub async fn delete_user(
    service: &UserService,
    user_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user_id) = RequireJWT::extract_user_id(request) else {
        return Ok(super::super::unauthorized());
    };

    if user_id == current_user_id {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::CanNotDeleteCurrentUser,
            "Cannot delete current user",
        )));
    }

    let storage = service.get_storage(request)?;
    let affected = affected_teachers(&storage, user_id).await;

    match storage.delete_user(user_id).await {
        Ok(true) => {
            info!("User {} deleted by {}", user_id, current_user_id);
            invalidate_teacher_views(request, affected).await;
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("User deleted successfully")))
        }
        Ok(false) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::UserNotFound,
            "User not found",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}
