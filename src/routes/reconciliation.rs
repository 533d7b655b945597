use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::reconciliation::requests::RunReconciliationRequest;
use crate::models::users::entities::UserRole;
use crate::services::ReconciliationService;
use crate::utils::OptionalJson;

static RECONCILIATION_SERVICE: Lazy<ReconciliationService> =
    Lazy::new(ReconciliationService::new_lazy);

pub async fn run_reconciliation(
    req: HttpRequest,
    data: OptionalJson<RunReconciliationRequest>,
) -> ActixResult<HttpResponse> {
    RECONCILIATION_SERVICE.run(data.into_inner(), &req).await
}

// 配置路由
pub fn configure_reconciliation_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/reconciliation")
            .wrap(middlewares::RateLimit::reconciliation())
            .wrap(middlewares::RequireRole::new(&UserRole::Admin))
            .wrap(middlewares::RequireJWT)
            .route("/run", web::post().to(run_reconciliation)),
    );
}
