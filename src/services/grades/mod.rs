pub mod create;
pub mod delete;
pub mod list;
pub mod summary;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::errors::Result;
use crate::models::enrollment_requests::entities::EnrollmentRequestStatus;
use crate::models::grades::entities::StudentGrade;
use crate::models::grades::requests::{
    CreateGradeRequest, GradeQueryParams, GradeSummaryParams, UpdateGradeRequest,
};
use crate::models::users::entities::User;
use crate::storage::Storage;

pub struct GradeService {
    storage: Option<Arc<dyn Storage>>,
}

impl GradeService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    pub async fn list_grades(
        &self,
        query: GradeQueryParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_grades(self, query, request).await
    }

    pub async fn create_grade(
        &self,
        data: CreateGradeRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_grade(self, data, request).await
    }

    pub async fn update_grade(
        &self,
        grade_id: i64,
        data: UpdateGradeRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        update::update_grade(self, grade_id, data, request).await
    }

    pub async fn delete_grade(
        &self,
        grade_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        delete::delete_grade(self, grade_id, request).await
    }

    pub async fn get_summary(
        &self,
        query: GradeSummaryParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        summary::get_summary(self, query, request).await
    }
}

/// 修改权限：录入者本人或管理员
pub(crate) fn can_modify_grade(user: &User, grade: &StudentGrade) -> bool {
    user.is_admin() || grade.graded_by == Some(user.id)
}

/// 成绩变更后可能受影响的教师：学生所选课程与已批准申请涉及的教师
pub(crate) async fn teachers_of_student(
    storage: &Arc<dyn Storage>,
    student_id: i64,
) -> Result<BTreeSet<i64>> {
    let mut teachers = BTreeSet::new();

    for enrollment in storage.list_student_enrollments(student_id).await? {
        if let Some(course) = storage.get_course_by_id(enrollment.course_id).await? {
            teachers.insert(course.teacher_id);
        }
    }

    let approved = storage
        .list_student_enrollment_requests(student_id, Some(EnrollmentRequestStatus::Approved))
        .await?;
    teachers.extend(approved.iter().map(|r| r.teacher_id));

    Ok(teachers)
}

/// 失效与该学生相关的教师视图
pub(crate) async fn invalidate_for_student(
    storage: &Arc<dyn Storage>,
    request: &HttpRequest,
    student_id: i64,
) {
    match teachers_of_student(storage, student_id).await {
        Ok(teachers) => {
            super::teacher_subjects::invalidate_teacher_views(request, teachers).await;
        }
        Err(e) => tracing::warn!(
            "Failed to resolve teachers of student {} for cache invalidation: {}",
            student_id,
            e
        ),
    }
}
