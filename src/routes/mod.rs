pub mod auth;

pub mod users;

pub mod courses;

pub mod enrollment_requests;

pub mod grades;

pub mod teachers;

pub mod reconciliation;

pub use auth::configure_auth_routes;
pub use courses::configure_course_routes;
pub use enrollment_requests::configure_enrollment_request_routes;
pub use grades::configure_grade_routes;
pub use reconciliation::configure_reconciliation_routes;
pub use teachers::configure_teacher_routes;
pub use users::configure_user_routes;

use actix_web::web;

/// 注册全部 API 路由
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_auth_routes)
        .configure(configure_user_routes)
        .configure(configure_course_routes)
        .configure(configure_enrollment_request_routes)
        .configure(configure_grade_routes)
        .configure(configure_teacher_routes)
        .configure(configure_reconciliation_routes);
}
