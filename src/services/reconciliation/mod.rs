pub mod run;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::reconciliation::requests::RunReconciliationRequest;
use crate::storage::Storage;

pub use run::run_reconciliation;

pub struct ReconciliationService {
    storage: Option<Arc<dyn Storage>>,
}

impl ReconciliationService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 生成并（可选）执行对账计划
    pub async fn run(
        &self,
        data: RunReconciliationRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        run::run(self, data, request).await
    }
}
