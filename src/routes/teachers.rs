use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::users::entities::UserRole;
use crate::services::TeacherSubjectService;
use crate::utils::SafeTeacherIdI64;

static TEACHER_SUBJECT_SERVICE: Lazy<TeacherSubjectService> =
    Lazy::new(TeacherSubjectService::new_lazy);

pub async fn get_my_subjects(req: HttpRequest) -> ActixResult<HttpResponse> {
    TEACHER_SUBJECT_SERVICE.get_my_subjects(&req).await
}

pub async fn get_teacher_subjects(
    req: HttpRequest,
    teacher_id: SafeTeacherIdI64,
) -> ActixResult<HttpResponse> {
    TEACHER_SUBJECT_SERVICE
        .get_teacher_subjects(teacher_id.0, &req)
        .await
}

// 配置路由
pub fn configure_teacher_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/teachers")
            .wrap(middlewares::RequireRole::new_any(UserRole::teacher_roles()))
            .wrap(middlewares::RequireJWT)
            .route("/me/subjects", web::get().to(get_my_subjects))
            .route("/{teacher_id}/subjects", web::get().to(get_teacher_subjects)),
    );
}
