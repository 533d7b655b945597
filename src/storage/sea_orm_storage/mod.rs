//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod courses;
mod enrollment_requests;
mod enrollments;
mod grades;
mod users;

use crate::config::AppConfig;
use crate::errors::{Result, SchoolSystemError};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;
        if db_url == "sqlite::memory:" {
            return Self::new_in_memory().await;
        }

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        Self::migrate(&db).await?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// 内存 SQLite，单连接保证所有查询看到同一个库
    pub async fn new_in_memory() -> Result<Self> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| SchoolSystemError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opt)
            .await
            .map_err(|e| SchoolSystemError::database_connection(format!("SQLite 连接失败: {e}")))?;

        let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
        Self::migrate(&db).await?;

        Ok(Self { db })
    }

    async fn migrate(db: &DatabaseConnection) -> Result<()> {
        Migrator::up(db, None)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("数据库迁移失败: {e}")))
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| SchoolSystemError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| SchoolSystemError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| SchoolSystemError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url == ":memory:" {
            Ok("sqlite::memory:".to_string())
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(SchoolSystemError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
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
use crate::storage::{MergeOutcome, Storage};
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email_impl(email).await
    }

    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        self.get_user_by_username_or_email_impl(identifier).await
    }

    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse> {
        self.list_users_with_pagination_impl(query).await
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        self.delete_user_impl(id).await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.update_last_login_impl(id).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_users_impl().await
    }

    // 课程模块
    async fn find_or_create_course(
        &self,
        teacher_id: i64,
        req: CreateCourseRequest,
    ) -> Result<(Course, bool)> {
        self.find_or_create_course_impl(teacher_id, req).await
    }

    async fn get_course_by_id(&self, id: i64) -> Result<Option<Course>> {
        self.get_course_by_id_impl(id).await
    }

    async fn list_courses_with_pagination(
        &self,
        query: CourseListQuery,
    ) -> Result<CourseListResponse> {
        self.list_courses_with_pagination_impl(query).await
    }

    async fn list_courses(&self, teacher_id: Option<i64>) -> Result<Vec<Course>> {
        self.list_courses_impl(teacher_id).await
    }

    async fn delete_course(&self, id: i64) -> Result<bool> {
        self.delete_course_impl(id).await
    }

    async fn list_course_students(&self, course_id: i64) -> Result<Vec<CourseStudent>> {
        self.list_course_students_impl(course_id).await
    }

    // 选课模块
    async fn enroll_student(&self, student_id: i64, course_id: i64) -> Result<(Enrollment, bool)> {
        self.enroll_student_impl(student_id, course_id).await
    }

    async fn list_enrollments_for_courses(&self, course_ids: &[i64]) -> Result<Vec<Enrollment>> {
        self.list_enrollments_for_courses_impl(course_ids).await
    }

    async fn list_student_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>> {
        self.list_student_enrollments_impl(student_id).await
    }

    async fn merge_duplicate_courses(&self, group: &DuplicateGroup) -> Result<MergeOutcome> {
        self.merge_duplicate_courses_impl(group).await
    }

    // 选课申请模块
    async fn create_enrollment_request(
        &self,
        student_id: i64,
        req: CreateEnrollmentRequest,
    ) -> Result<EnrollmentRequest> {
        self.create_enrollment_request_impl(student_id, req).await
    }

    async fn get_enrollment_request_by_id(&self, id: i64) -> Result<Option<EnrollmentRequest>> {
        self.get_enrollment_request_by_id_impl(id).await
    }

    async fn has_active_enrollment_request(
        &self,
        student_id: i64,
        key: &CourseKey,
    ) -> Result<bool> {
        self.has_active_enrollment_request_impl(student_id, key)
            .await
    }

    async fn list_enrollment_requests_with_pagination(
        &self,
        query: EnrollmentRequestListQuery,
    ) -> Result<EnrollmentRequestListResponse> {
        self.list_enrollment_requests_with_pagination_impl(query)
            .await
    }

    async fn list_enrollment_requests(
        &self,
        teacher_id: Option<i64>,
        status: Option<EnrollmentRequestStatus>,
    ) -> Result<Vec<EnrollmentRequest>> {
        self.list_enrollment_requests_impl(teacher_id, status).await
    }

    async fn list_student_enrollment_requests(
        &self,
        student_id: i64,
        status: Option<EnrollmentRequestStatus>,
    ) -> Result<Vec<EnrollmentRequest>> {
        self.list_student_enrollment_requests_impl(student_id, status)
            .await
    }

    async fn approve_enrollment_request(
        &self,
        id: i64,
        reviewer_id: i64,
        comment: Option<String>,
    ) -> Result<ApprovalOutcome> {
        self.approve_enrollment_request_impl(id, reviewer_id, comment)
            .await
    }

    async fn reject_enrollment_request(
        &self,
        id: i64,
        reviewer_id: i64,
        comment: Option<String>,
    ) -> Result<EnrollmentRequest> {
        self.reject_enrollment_request_impl(id, reviewer_id, comment)
            .await
    }

    // 成绩模块
    async fn create_grade(&self, graded_by: i64, req: CreateGradeRequest) -> Result<StudentGrade> {
        self.create_grade_impl(graded_by, req).await
    }

    async fn get_grade_by_id(&self, id: i64) -> Result<Option<StudentGrade>> {
        self.get_grade_by_id_impl(id).await
    }

    async fn update_grade(
        &self,
        id: i64,
        update: UpdateGradeRequest,
    ) -> Result<Option<StudentGrade>> {
        self.update_grade_impl(id, update).await
    }

    async fn delete_grade(&self, id: i64) -> Result<bool> {
        self.delete_grade_impl(id).await
    }

    async fn list_grades_with_pagination(
        &self,
        query: GradeListQuery,
    ) -> Result<GradeListResponse> {
        self.list_grades_with_pagination_impl(query).await
    }

    async fn list_grades_for_students(&self, student_ids: &[i64]) -> Result<Vec<StudentGrade>> {
        self.list_grades_for_students_impl(student_ids).await
    }

    async fn list_all_grades(&self) -> Result<Vec<StudentGrade>> {
        self.list_all_grades_impl().await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SeaOrmStorage;
    use crate::models::users::{entities::UserRole, requests::CreateUserRequest};

    pub async fn storage() -> SeaOrmStorage {
        SeaOrmStorage::new_in_memory()
            .await
            .expect("in-memory database should open")
    }

    pub async fn user(storage: &SeaOrmStorage, username: &str, role: UserRole) -> i64 {
        storage
            .create_user_impl(CreateUserRequest {
                username: username.to_string(),
                email: format!("{username}@school.test"),
                password: "hashed".to_string(),
                role,
                display_name: None,
            })
            .await
            .expect("user insert")
            .id
    }

    /// 绕过审核流程直接修改申请状态
    pub async fn force_status(
        storage: &SeaOrmStorage,
        request_id: i64,
        status: crate::models::enrollment_requests::entities::EnrollmentRequestStatus,
    ) {
        use sea_orm::{ActiveModelTrait, Set};
        let model = crate::entity::enrollment_requests::ActiveModel {
            id: Set(request_id),
            status: Set(status.to_string()),
            ..Default::default()
        };
        model.update(&storage.db).await.expect("force status");
    }

    /// 绕过查找逻辑直接插入课程，用于构造重复课程
    pub async fn insert_course_raw(
        storage: &SeaOrmStorage,
        teacher_id: i64,
        subject: &str,
        grade_level: &str,
    ) -> i64 {
        use sea_orm::{ActiveModelTrait, Set};
        let now = chrono::Utc::now().timestamp();
        let model = crate::entity::courses::ActiveModel {
            subject: Set(subject.to_string()),
            grade_level: Set(grade_level.to_string()),
            stream: Set(None),
            teacher_id: Set(teacher_id),
            description: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        model.insert(&storage.db).await.expect("insert course").id
    }

    #[test]
    fn test_build_database_url() {
        assert_eq!(
            SeaOrmStorage::build_database_url("school.db").expect("sqlite file"),
            "sqlite://school.db?mode=rwc"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url(":memory:").expect("memory"),
            "sqlite::memory:"
        );
        assert!(SeaOrmStorage::build_database_url("postgres://localhost/school").is_ok());
        assert!(SeaOrmStorage::build_database_url("ftp://nowhere").is_err());
    }
}
