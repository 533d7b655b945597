pub mod get;
pub mod view;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::debug;

use crate::cache::keys;
use crate::storage::Storage;

pub use view::{ViewOptions, load_teacher_view};

pub struct TeacherSubjectService {
    storage: Option<Arc<dyn Storage>>,
}

impl TeacherSubjectService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 当前教师的科目视图
    pub async fn get_my_subjects(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        get::get_my_subjects(self, request).await
    }

    // 指定教师的科目视图
    pub async fn get_teacher_subjects(
        &self,
        teacher_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        get::get_teacher_subjects(self, teacher_id, request).await
    }
}

/// 使教师科目视图缓存失效
pub(crate) async fn invalidate_teacher_views(
    request: &HttpRequest,
    teacher_ids: impl IntoIterator<Item = i64>,
) {
    let Some(cache) = super::cache_from_request(request) else {
        return;
    };
    for teacher_id in teacher_ids {
        debug!("Invalidating subject view cache for teacher {}", teacher_id);
        cache.remove(&keys::teacher_subjects(teacher_id)).await;
    }
}
