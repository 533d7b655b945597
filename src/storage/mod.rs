use std::sync::Arc;

use crate::models::{
    courses::{
        entities::{Course, Enrollment},
        requests::{CourseListQuery, CreateCourseRequest},
        responses::{CourseListResponse, CourseStudent},
    },
    enrollment_requests::{
        entities::{EnrollmentRequest, EnrollmentRequestStatus},
        requests::{CreateEnrollmentRequest, EnrollmentRequestListQuery},
        responses::{ApprovalOutcome, EnrollmentRequestListResponse},
    },
    grades::{
        entities::StudentGrade,
        requests::{CreateGradeRequest, GradeListQuery, UpdateGradeRequest},
        responses::GradeListResponse,
    },
    users::{
        entities::User,
        requests::{CreateUserRequest, UserListQuery},
        responses::UserListResponse,
    },
};
use crate::reconcile::{CourseKey, DuplicateGroup};

use crate::errors::Result;

pub mod sea_orm_storage;

/// 合并重复课程的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub enrollments_moved: usize,
    pub enrollments_removed: usize,
    pub courses_deleted: usize,
}

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户管理方法
    // 创建用户（密码已哈希）
    async fn create_user(&self, user: CreateUserRequest) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 通过用户名获取用户信息
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    // 通过邮箱获取用户信息
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    // 通过用户名或邮箱获取用户信息
    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>>;
    // 列出用户
    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse>;
    // 删除用户
    async fn delete_user(&self, id: i64) -> Result<bool>;
    // 更新用户最后登录时间
    async fn update_last_login(&self, id: i64) -> Result<bool>;
    // 统计用户数量
    async fn count_users(&self) -> Result<u64>;

    /// 课程管理方法
    // 按 (科目, 年级, 教师) 查找课程，不存在时创建；返回值第二项表示是否新建
    async fn find_or_create_course(
        &self,
        teacher_id: i64,
        req: CreateCourseRequest,
    ) -> Result<(Course, bool)>;
    // 通过ID获取课程
    async fn get_course_by_id(&self, id: i64) -> Result<Option<Course>>;
    // 列出课程
    async fn list_courses_with_pagination(
        &self,
        query: CourseListQuery,
    ) -> Result<CourseListResponse>;
    // 列出教师的全部课程，教师为空时列出所有课程
    async fn list_courses(&self, teacher_id: Option<i64>) -> Result<Vec<Course>>;
    // 删除课程（选课记录级联删除）
    async fn delete_course(&self, id: i64) -> Result<bool>;
    // 列出课程的学生
    async fn list_course_students(&self, course_id: i64) -> Result<Vec<CourseStudent>>;

    /// 选课管理方法
    // 学生选课，已选时直接返回原记录
    async fn enroll_student(&self, student_id: i64, course_id: i64) -> Result<(Enrollment, bool)>;
    // 列出若干课程的选课记录
    async fn list_enrollments_for_courses(&self, course_ids: &[i64]) -> Result<Vec<Enrollment>>;
    // 列出学生的选课记录
    async fn list_student_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>>;
    // 合并一组重复课程到规范课程
    async fn merge_duplicate_courses(&self, group: &DuplicateGroup) -> Result<MergeOutcome>;

    /// 选课申请方法
    // 创建选课申请
    async fn create_enrollment_request(
        &self,
        student_id: i64,
        req: CreateEnrollmentRequest,
    ) -> Result<EnrollmentRequest>;
    // 通过ID获取选课申请
    async fn get_enrollment_request_by_id(&self, id: i64) -> Result<Option<EnrollmentRequest>>;
    // 学生对同一课程是否已有待审批或已批准的申请
    async fn has_active_enrollment_request(&self, student_id: i64, key: &CourseKey)
    -> Result<bool>;
    // 分页列出选课申请
    async fn list_enrollment_requests_with_pagination(
        &self,
        query: EnrollmentRequestListQuery,
    ) -> Result<EnrollmentRequestListResponse>;
    // 按教师与状态列出全部选课申请
    async fn list_enrollment_requests(
        &self,
        teacher_id: Option<i64>,
        status: Option<EnrollmentRequestStatus>,
    ) -> Result<Vec<EnrollmentRequest>>;
    // 列出某学生的全部选课申请，可按状态过滤
    async fn list_student_enrollment_requests(
        &self,
        student_id: i64,
        status: Option<EnrollmentRequestStatus>,
    ) -> Result<Vec<EnrollmentRequest>>;
    // 批准申请：查找或创建课程、选课、更新状态，在同一事务中完成
    async fn approve_enrollment_request(
        &self,
        id: i64,
        reviewer_id: i64,
        comment: Option<String>,
    ) -> Result<ApprovalOutcome>;
    // 拒绝申请
    async fn reject_enrollment_request(
        &self,
        id: i64,
        reviewer_id: i64,
        comment: Option<String>,
    ) -> Result<EnrollmentRequest>;

    /// 成绩管理方法
    // 录入成绩
    async fn create_grade(&self, graded_by: i64, req: CreateGradeRequest) -> Result<StudentGrade>;
    // 通过ID获取成绩
    async fn get_grade_by_id(&self, id: i64) -> Result<Option<StudentGrade>>;
    // 更新成绩
    async fn update_grade(&self, id: i64, update: UpdateGradeRequest)
    -> Result<Option<StudentGrade>>;
    // 删除成绩
    async fn delete_grade(&self, id: i64) -> Result<bool>;
    // 分页列出成绩
    async fn list_grades_with_pagination(&self, query: GradeListQuery)
    -> Result<GradeListResponse>;
    // 列出若干学生的全部成绩
    async fn list_grades_for_students(&self, student_ids: &[i64]) -> Result<Vec<StudentGrade>>;
    // 列出所有成绩
    async fn list_all_grades(&self) -> Result<Vec<StudentGrade>>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
