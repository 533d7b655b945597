use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::TeacherSubjectService;
use super::view::{ViewOptions, load_teacher_view};
use crate::cache::{ObjectCacheExt, keys};
use crate::config::AppConfig;
use crate::middlewares::RequireJWT;
use crate::models::teacher_subjects::responses::{TeacherSubjectsResponse, TeacherSummary};
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::reconcile::TeacherSubjectView;

pub async fn get_my_subjects(
    service: &TeacherSubjectService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    if current_user.role != UserRole::Teacher {
        return Ok(super::super::forbidden(
            ErrorCode::Forbidden,
            "Only teachers have a subject view",
        ));
    }
    get_teacher_subjects(service, current_user.id, request).await
}

pub async fn get_teacher_subjects(
    service: &TeacherSubjectService,
    teacher_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    if !current_user.is_admin() && current_user.id != teacher_id {
        return Ok(super::super::forbidden(
            ErrorCode::Forbidden,
            "You can only view your own subjects",
        ));
    }

    let storage = service.get_storage(request)?;

    let teacher = match storage.get_user_by_id(teacher_id).await {
        Ok(Some(user)) if user.role == UserRole::Teacher => user,
        Ok(_) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::UserNotFound,
                "Teacher not found",
            )));
        }
        Err(e) => return Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    };

    let config = AppConfig::get();
    let cache = super::super::cache_from_request(request);
    let cache_key = keys::teacher_subjects(teacher_id);

    let cached = match &cache {
        Some(cache) => cache.get_json::<TeacherSubjectView>(&cache_key).await.found(),
        None => None,
    };

    let (view, created_course_ids) = match cached {
        Some(view) => (view, Vec::new()),
        None => {
            let options = ViewOptions::from_config(config);
            match load_teacher_view(&storage, teacher_id, &options).await {
                Ok((view, created)) => {
                    if let Some(cache) = &cache {
                        cache
                            .insert_json(
                                cache_key,
                                &view,
                                config.reconciliation.view_cache_ttl,
                            )
                            .await;
                    }
                    (view, created)
                }
                Err(e) => {
                    return Ok(super::super::error_response(
                        &e,
                        ErrorCode::ReconciliationFailed,
                    ));
                }
            }
        }
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        TeacherSubjectsResponse {
            teacher: TeacherSummary {
                id: teacher.id,
                username: teacher.username,
                display_name: teacher.display_name,
            },
            view,
            created_course_ids,
        },
        "Teacher subjects retrieved successfully",
    )))
}

#[cfg(test)]
mod tests {
    use crate::models::users::entities::UserRole;
    use crate::routes::configure_teacher_routes;
    use crate::services::test_app::{TestContext, bearer, init_app};
    use crate::storage::sea_orm_storage::test_support::{storage, user};
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_teachers_only_see_their_own_view() {
        let db = storage().await;
        let admin = user(&db, "admin", UserRole::Admin).await;
        let teacher = user(&db, "teacher", UserRole::Teacher).await;
        let other = user(&db, "other", UserRole::Teacher).await;
        let student = user(&db, "student", UserRole::Student).await;
        let ctx = TestContext::new(db);
        let app = init_app!(ctx, configure_teacher_routes);

        let get = |uri: String, user_id: i64, role: UserRole| {
            test::TestRequest::get()
                .uri(&uri)
                .insert_header(bearer(user_id, role))
                .to_request()
        };
        let subjects_of = |teacher_id: i64| format!("/api/v1/teachers/{teacher_id}/subjects");

        let req = get(subjects_of(other), teacher, UserRole::Teacher);
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = get(subjects_of(teacher), teacher, UserRole::Teacher);
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["teacher"]["id"], teacher);

        let resp = test::call_service(&app, get(subjects_of(other), admin, UserRole::Admin)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // 管理员查看非教师用户
        let req = get(subjects_of(student), admin, UserRole::Admin);
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // 学生被角色中间件拦下
        let req = get(subjects_of(teacher), student, UserRole::Student);
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
