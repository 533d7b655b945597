pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod students;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::Result;
use crate::models::courses::entities::Course;
use crate::models::courses::requests::{CourseQueryParams, CreateCourseRequest};
use crate::models::users::entities::{User, UserRole};
use crate::storage::Storage;

pub struct CourseService {
    storage: Option<Arc<dyn Storage>>,
}

impl CourseService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    pub async fn list_courses(
        &self,
        query: CourseQueryParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_courses(self, query, request).await
    }

    pub async fn create_course(
        &self,
        course_data: CreateCourseRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_course(self, course_data, request).await
    }

    pub async fn get_course(
        &self,
        course_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        get::get_course(self, course_id, request).await
    }

    pub async fn delete_course(
        &self,
        course_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        delete::delete_course(self, course_id, request).await
    }

    pub async fn list_course_students(
        &self,
        course_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        students::list_course_students(self, course_id, request).await
    }
}

/// 课程是否对用户可见：管理员全部，教师本人课程，学生已选课程
pub(crate) async fn can_view_course(
    storage: &Arc<dyn Storage>,
    user: &User,
    course: &Course,
) -> Result<bool> {
    match user.role {
        UserRole::Admin => Ok(true),
        UserRole::Teacher => Ok(course.teacher_id == user.id),
        UserRole::Student => Ok(storage
            .list_student_enrollments(user.id)
            .await?
            .iter()
            .any(|e| e.course_id == course.id)),
    }
}

/// 课程管理权限：任课教师本人或管理员
pub(crate) fn can_manage_course(user: &User, course: &Course) -> bool {
    user.is_admin() || (user.role == UserRole::Teacher && course.teacher_id == user.id)
}
