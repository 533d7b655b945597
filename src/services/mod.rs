pub mod auth;
pub mod courses;
pub mod enrollment_requests;
pub mod grades;
pub mod reconciliation;
pub mod teacher_subjects;
pub mod users;

pub use auth::AuthService;
pub use courses::CourseService;
pub use enrollment_requests::EnrollmentRequestService;
pub use grades::GradeService;
pub use reconciliation::ReconciliationService;
pub use teacher_subjects::TeacherSubjectService;
pub use users::UserService;

use actix_web::{HttpRequest, HttpResponse, web};
use std::sync::Arc;
use tracing::error;

use crate::cache::ObjectCache;
use crate::errors::SchoolSystemError;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

/// 从 app_data 取存储实例
pub(crate) fn storage_from_request(
    request: &HttpRequest,
) -> actix_web::Result<Arc<dyn Storage>> {
    request
        .app_data::<web::Data<Arc<dyn Storage>>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| {
            error!("Storage not found in app data");
            actix_web::error::ErrorInternalServerError("storage unavailable")
        })
}

/// 从 app_data 取缓存实例，未配置时返回 None
pub(crate) fn cache_from_request(request: &HttpRequest) -> Option<Arc<dyn ObjectCache>> {
    request
        .app_data::<web::Data<Arc<dyn ObjectCache>>>()
        .map(|data| data.get_ref().clone())
}

/// 存储层错误转为统一响应，`fallback` 用于数据库等内部错误
pub(crate) fn error_response(err: &SchoolSystemError, fallback: ErrorCode) -> HttpResponse {
    let message = err.message().to_string();
    match err {
        SchoolSystemError::Validation(_) => {
            HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, message))
        }
        SchoolSystemError::NotFound(_) => {
            HttpResponse::NotFound().json(ApiResponse::error_empty(ErrorCode::NotFound, message))
        }
        SchoolSystemError::Conflict(_) => {
            HttpResponse::Conflict().json(ApiResponse::error_empty(ErrorCode::Conflict, message))
        }
        SchoolSystemError::InvalidState(_) => {
            HttpResponse::Conflict().json(ApiResponse::error_empty(fallback, message))
        }
        SchoolSystemError::Authentication(_) => HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, message)),
        SchoolSystemError::Authorization(_) => {
            HttpResponse::Forbidden().json(ApiResponse::error_empty(ErrorCode::Forbidden, message))
        }
        _ => {
            error!("{}", err);
            HttpResponse::InternalServerError()
                .json(ApiResponse::error_empty(fallback, err.format_simple()))
        }
    }
}

pub(crate) fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiResponse::error_empty(
        ErrorCode::Unauthorized,
        "Unauthorized access, please login",
    ))
}

pub(crate) fn forbidden(code: ErrorCode, message: &str) -> HttpResponse {
    HttpResponse::Forbidden().json(ApiResponse::error_empty(code, message))
}

/// 请求级测试用的应用组装
#[cfg(test)]
pub(crate) mod test_app {
    use std::sync::Arc;

    use crate::cache::ObjectCache;
    use crate::cache::object_cache::moka::MokaCacheWrapper;
    use crate::models::users::entities::UserRole;
    use crate::storage::Storage;
    use crate::storage::sea_orm_storage::SeaOrmStorage;
    use crate::utils::jwt::{JwtUtils, TokenKind};

    pub struct TestContext {
        pub storage: Arc<dyn Storage>,
        pub cache: Arc<dyn ObjectCache>,
    }

    impl TestContext {
        pub fn new(storage: SeaOrmStorage) -> Self {
            Self {
                storage: Arc::new(storage),
                cache: Arc::new(MokaCacheWrapper::with_capacity(100, 60).expect("cache")),
            }
        }
    }

    pub fn bearer(user_id: i64, role: UserRole) -> (&'static str, String) {
        let token = JwtUtils::issue(user_id, &role, TokenKind::Access).expect("token");
        ("Authorization", format!("Bearer {token}"))
    }

    /// 按生产配置挂上存储、缓存和参数错误处理
    macro_rules! init_app {
        ($ctx:expr, $configure:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data(
                        actix_web::web::QueryConfig::default()
                            .error_handler($crate::utils::query_error_handler),
                    )
                    .app_data(
                        actix_web::web::JsonConfig::default()
                            .error_handler($crate::utils::json_error_handler),
                    )
                    .app_data(actix_web::web::Data::new($ctx.storage.clone()))
                    .app_data(actix_web::web::Data::new($ctx.cache.clone()))
                    .configure($configure),
            )
            .await
        };
    }

    pub(crate) use init_app;
}
