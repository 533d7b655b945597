//! 课程存储操作

use super::SeaOrmStorage;
use crate::entity::courses::{ActiveModel, Column, Entity as Courses};
use crate::entity::enrollments::{Column as EnrollmentColumn, Entity as Enrollments};
use crate::entity::users::Entity as Users;
use crate::errors::{Result, SchoolSystemError};
use crate::models::{
    PaginationInfo, PaginationQuery,
    courses::{
        entities::Course,
        requests::{CourseListQuery, CreateCourseRequest},
        responses::{CourseListResponse, CourseStudent},
    },
};
use crate::reconcile::CourseKey;
use crate::utils::like_contains;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 查找或创建课程，可在事务中调用
///
/// 已有多门匹配课程时返回 ID 最小的一门。
pub(super) async fn find_or_create_course_in<C: ConnectionTrait>(
    conn: &C,
    teacher_id: i64,
    req: CreateCourseRequest,
) -> Result<(Course, bool)> {
    let key = CourseKey::new(&req.subject, &req.grade_level, teacher_id)
        .ok_or_else(|| SchoolSystemError::validation("科目和年级不能为空"))?;

    let existing = Courses::find()
        .filter(Column::TeacherId.eq(teacher_id))
        .order_by_asc(Column::Id)
        .all(conn)
        .await
        .map_err(|e| SchoolSystemError::database_operation(format!("查询课程失败: {e}")))?;

    if let Some(found) = existing
        .into_iter()
        .find(|m| CourseKey::new(&m.subject, &m.grade_level, m.teacher_id).as_ref() == Some(&key))
    {
        return Ok((found.into_course(), false));
    }

    let now = chrono::Utc::now().timestamp();
    let model = ActiveModel {
        subject: Set(req.subject.trim().to_string()),
        grade_level: Set(req.grade_level.trim().to_string()),
        stream: Set(non_empty(req.stream)),
        teacher_id: Set(teacher_id),
        description: Set(non_empty(req.description)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = model
        .insert(conn)
        .await
        .map_err(|e| SchoolSystemError::database_operation(format!("创建课程失败: {e}")))?;

    Ok((result.into_course(), true))
}

impl SeaOrmStorage {
    /// 查找或创建课程
    pub async fn find_or_create_course_impl(
        &self,
        teacher_id: i64,
        req: CreateCourseRequest,
    ) -> Result<(Course, bool)> {
        find_or_create_course_in(&self.db, teacher_id, req).await
    }

    /// 通过 ID 获取课程
    pub async fn get_course_by_id_impl(&self, id: i64) -> Result<Option<Course>> {
        let result = Courses::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询课程失败: {e}")))?;

        Ok(result.map(|m| m.into_course()))
    }

    /// 分页列出课程
    pub async fn list_courses_with_pagination_impl(
        &self,
        query: CourseListQuery,
    ) -> Result<CourseListResponse> {
        let (page, size) = PaginationQuery::normalized(query.page, query.size, 20);

        let mut select = Courses::find();

        // 教师筛选
        if let Some(teacher_id) = query.teacher_id {
            select = select.filter(Column::TeacherId.eq(teacher_id));
        }

        // 学生筛选：只列出已选课程
        if let Some(student_id) = query.student_id {
            let course_ids: Vec<i64> = Enrollments::find()
                .select_only()
                .column(EnrollmentColumn::CourseId)
                .filter(EnrollmentColumn::StudentId.eq(student_id))
                .into_tuple()
                .all(&self.db)
                .await
                .map_err(|e| {
                    SchoolSystemError::database_operation(format!("查询学生选课失败: {e}"))
                })?;
            select = select.filter(Column::Id.is_in(course_ids));
        }

        if let Some(ref subject) = query.subject
            && !subject.trim().is_empty()
        {
            select = select.filter(Column::Subject.like(like_contains(subject.trim())));
        }

        if let Some(ref grade_level) = query.grade_level
            && !grade_level.trim().is_empty()
        {
            select = select
                .filter(Column::GradeLevel.like(like_contains(grade_level.trim())));
        }

        select = select
            .order_by_asc(Column::Subject)
            .order_by_asc(Column::GradeLevel)
            .order_by_asc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询课程总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询课程页数失败: {e}")))?;

        let courses = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询课程列表失败: {e}")))?;

        Ok(CourseListResponse {
            items: courses.into_iter().map(|m| m.into_course()).collect(),
            pagination: PaginationInfo {
                page: page as i64,
                page_size: size as i64,
                total: total as i64,
                total_pages: pages as i64,
            },
        })
    }

    /// 列出课程（不分页）
    pub async fn list_courses_impl(&self, teacher_id: Option<i64>) -> Result<Vec<Course>> {
        let mut select = Courses::find();
        if let Some(teacher_id) = teacher_id {
            select = select.filter(Column::TeacherId.eq(teacher_id));
        }

        let courses = select
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询课程列表失败: {e}")))?;

        Ok(courses.into_iter().map(|m| m.into_course()).collect())
    }

    /// 删除课程
    pub async fn delete_course_impl(&self, id: i64) -> Result<bool> {
        Enrollments::delete_many()
            .filter(EnrollmentColumn::CourseId.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("删除课程选课记录失败: {e}")))?;

        let result = Courses::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("删除课程失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 列出课程的学生
    pub async fn list_course_students_impl(&self, course_id: i64) -> Result<Vec<CourseStudent>> {
        let rows = Enrollments::find()
            .filter(EnrollmentColumn::CourseId.eq(course_id))
            .order_by_asc(EnrollmentColumn::EnrolledAt)
            .order_by_asc(EnrollmentColumn::Id)
            .find_also_related(Users)
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询课程学生失败: {e}")))?;

        Ok(rows
            .into_iter()
            .filter_map(|(enrollment, user)| {
                let user = user?;
                let enrollment = enrollment.into_enrollment();
                Some(CourseStudent {
                    student_id: user.id,
                    username: user.username,
                    display_name: user.display_name,
                    enrolled_at: enrollment.enrolled_at,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage, user};
    use crate::models::courses::requests::{CourseListQuery, CreateCourseRequest};
    use crate::models::users::entities::UserRole;

    fn create(subject: &str, grade_level: &str) -> CreateCourseRequest {
        CreateCourseRequest {
            teacher_id: None,
            subject: subject.to_string(),
            grade_level: grade_level.to_string(),
            stream: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_find_or_create_matches_normalized_key() {
        let storage = storage().await;
        let teacher = user(&storage, "t1", UserRole::Teacher).await;
        let other = user(&storage, "t2", UserRole::Teacher).await;

        let (first, created) = storage
            .find_or_create_course_impl(teacher, create(" Biology ", "Grade 10"))
            .await
            .expect("create");
        assert!(created);
        assert_eq!(first.subject, "Biology");

        let (again, created) = storage
            .find_or_create_course_impl(teacher, create("biology", "10"))
            .await
            .expect("find");
        assert!(!created);
        assert_eq!(again.id, first.id);

        let (elsewhere, created) = storage
            .find_or_create_course_impl(other, create("Biology", "10"))
            .await
            .expect("other teacher");
        assert!(created);
        assert_ne!(elsewhere.id, first.id);

        assert!(
            storage
                .find_or_create_course_impl(teacher, create("  ", "10"))
                .await
                .is_err()
        );
        assert_eq!(storage.list_courses_impl(Some(teacher)).await.expect("list").len(), 1);
        assert_eq!(storage.list_courses_impl(None).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_student_course_listing_and_roster() {
        let storage = storage().await;
        let teacher = user(&storage, "teacher", UserRole::Teacher).await;
        let student = user(&storage, "student", UserRole::Student).await;

        let (maths, _) = storage
            .find_or_create_course_impl(teacher, create("Mathematics", "9"))
            .await
            .expect("create");
        storage
            .find_or_create_course_impl(teacher, create("Physics", "9"))
            .await
            .expect("create");
        storage.enroll_student_impl(student, maths.id).await.expect("enroll");

        let listed = storage
            .list_courses_with_pagination_impl(CourseListQuery {
                student_id: Some(student),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(listed.pagination.total, 1);
        assert_eq!(listed.items[0].id, maths.id);

        let roster = storage.list_course_students_impl(maths.id).await.expect("roster");
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].username, "student");

        assert!(storage.delete_course_impl(maths.id).await.expect("delete"));
        assert!(storage.list_student_enrollments_impl(student).await.expect("list").is_empty());
    }
}
