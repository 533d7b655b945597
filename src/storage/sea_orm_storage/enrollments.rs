//! 选课存储操作

use std::collections::BTreeSet;

use super::SeaOrmStorage;
use crate::entity::courses::{Column as CourseColumn, Entity as Courses};
use crate::entity::enrollments::{ActiveModel, Column, Entity as Enrollments};
use crate::errors::{Result, SchoolSystemError};
use crate::models::courses::entities::Enrollment;
use crate::reconcile::DuplicateGroup;
use crate::storage::MergeOutcome;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

/// 学生选课，已存在时返回原记录，可在事务中调用
pub(super) async fn enroll_in<C: ConnectionTrait>(
    conn: &C,
    student_id: i64,
    course_id: i64,
) -> Result<(Enrollment, bool)> {
    let existing = Enrollments::find()
        .filter(Column::StudentId.eq(student_id))
        .filter(Column::CourseId.eq(course_id))
        .one(conn)
        .await
        .map_err(|e| SchoolSystemError::database_operation(format!("查询选课记录失败: {e}")))?;

    if let Some(found) = existing {
        return Ok((found.into_enrollment(), false));
    }

    let model = ActiveModel {
        student_id: Set(student_id),
        course_id: Set(course_id),
        enrolled_at: Set(chrono::Utc::now().timestamp()),
        ..Default::default()
    };

    let result = model
        .insert(conn)
        .await
        .map_err(|e| SchoolSystemError::database_operation(format!("创建选课记录失败: {e}")))?;

    Ok((result.into_enrollment(), true))
}

impl SeaOrmStorage {
    /// 学生选课
    pub async fn enroll_student_impl(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<(Enrollment, bool)> {
        enroll_in(&self.db, student_id, course_id).await
    }

    /// 列出若干课程的选课记录
    pub async fn list_enrollments_for_courses_impl(
        &self,
        course_ids: &[i64],
    ) -> Result<Vec<Enrollment>> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }

        let enrollments = Enrollments::find()
            .filter(Column::CourseId.is_in(course_ids.iter().copied()))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询选课记录失败: {e}")))?;

        Ok(enrollments.into_iter().map(|m| m.into_enrollment()).collect())
    }

    /// 列出学生的选课记录
    pub async fn list_student_enrollments_impl(&self, student_id: i64) -> Result<Vec<Enrollment>> {
        let enrollments = Enrollments::find()
            .filter(Column::StudentId.eq(student_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询选课记录失败: {e}")))?;

        Ok(enrollments.into_iter().map(|m| m.into_enrollment()).collect())
    }

    /// 合并重复课程
    ///
    /// 以事务内的当前数据为准重新计算迁移与删除，计划生成之后新增的选课也会被迁移。
    pub async fn merge_duplicate_courses_impl(&self, group: &DuplicateGroup) -> Result<MergeOutcome> {
        if group.duplicate_course_ids.is_empty() {
            return Ok(MergeOutcome::default());
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("开启事务失败: {e}")))?;

        let canonical = Courses::find_by_id(group.canonical_course_id)
            .one(&txn)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询课程失败: {e}")))?
            .ok_or_else(|| {
                SchoolSystemError::not_found(format!("课程 {} 不存在", group.canonical_course_id))
            })?;

        let mut seen: BTreeSet<i64> = Enrollments::find()
            .filter(Column::CourseId.eq(canonical.id))
            .all(&txn)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询选课记录失败: {e}")))?
            .into_iter()
            .map(|e| e.student_id)
            .collect();

        let duplicates = Enrollments::find()
            .filter(Column::CourseId.is_in(group.duplicate_course_ids.iter().copied()))
            .order_by_asc(Column::Id)
            .all(&txn)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询选课记录失败: {e}")))?;

        let mut outcome = MergeOutcome::default();
        for enrollment in duplicates {
            if seen.insert(enrollment.student_id) {
                let mut model: ActiveModel = enrollment.into();
                model.course_id = Set(canonical.id);
                model.update(&txn).await.map_err(|e| {
                    SchoolSystemError::database_operation(format!("迁移选课记录失败: {e}"))
                })?;
                outcome.enrollments_moved += 1;
            } else {
                Enrollments::delete_by_id(enrollment.id)
                    .exec(&txn)
                    .await
                    .map_err(|e| {
                        SchoolSystemError::database_operation(format!("删除选课记录失败: {e}"))
                    })?;
                outcome.enrollments_removed += 1;
            }
        }

        // 只删除同一教师名下的课程
        let deleted = Courses::delete_many()
            .filter(CourseColumn::Id.is_in(group.duplicate_course_ids.iter().copied()))
            .filter(CourseColumn::TeacherId.eq(canonical.teacher_id))
            .exec(&txn)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("删除重复课程失败: {e}")))?;
        outcome.courses_deleted = deleted.rows_affected as usize;

        txn.commit()
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("提交事务失败: {e}")))?;

        info!(
            "合并重复课程: 规范课程 {}, 删除 {} 门, 迁移选课 {} 条, 删除选课 {} 条",
            canonical.id,
            outcome.courses_deleted,
            outcome.enrollments_moved,
            outcome.enrollments_removed
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{insert_course_raw, storage, user};
    use crate::models::courses::requests::CreateCourseRequest;
    use crate::models::users::entities::UserRole;
    use crate::reconcile::{CourseIndex, plan_reconciliation};
    use crate::storage::MergeOutcome;

    #[tokio::test]
    async fn test_enroll_is_idempotent() {
        let storage = storage().await;
        let teacher = user(&storage, "t", UserRole::Teacher).await;
        let student = user(&storage, "s", UserRole::Student).await;
        let (course, _) = storage
            .find_or_create_course_impl(
                teacher,
                CreateCourseRequest {
                    teacher_id: None,
                    subject: "Art".to_string(),
                    grade_level: "7".to_string(),
                    stream: None,
                    description: None,
                },
            )
            .await
            .expect("course");

        let (first, created) = storage.enroll_student_impl(student, course.id).await.expect("enroll");
        assert!(created);
        let (second, created) = storage.enroll_student_impl(student, course.id).await.expect("enroll");
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(
            storage.list_enrollments_for_courses_impl(&[course.id]).await.expect("list").len(),
            1
        );
        assert!(storage.list_enrollments_for_courses_impl(&[]).await.expect("empty").is_empty());
    }

    #[tokio::test]
    async fn test_merge_duplicate_courses() {
        let storage = storage().await;
        let teacher = user(&storage, "teacher", UserRole::Teacher).await;
        let s1 = user(&storage, "s1", UserRole::Student).await;
        let s2 = user(&storage, "s2", UserRole::Student).await;

        let canonical = insert_course_raw(&storage, teacher, "History", "Grade 8").await;
        let duplicate = insert_course_raw(&storage, teacher, "History", "8").await;
        let ids = vec![canonical, duplicate];

        storage.enroll_student_impl(s1, canonical).await.expect("enroll");
        storage.enroll_student_impl(s1, duplicate).await.expect("enroll");
        storage.enroll_student_impl(s2, duplicate).await.expect("enroll");

        let courses = storage.list_courses_impl(Some(teacher)).await.expect("courses");
        assert_eq!(CourseIndex::build(&courses).iter().count(), 1);
        let enrollments = storage
            .list_enrollments_for_courses_impl(&ids)
            .await
            .expect("enrollments");
        let plan = plan_reconciliation(&[], &[], &courses, &enrollments);
        assert_eq!(plan.duplicate_groups.len(), 1);

        let outcome = storage
            .merge_duplicate_courses_impl(&plan.duplicate_groups[0])
            .await
            .expect("merge");
        assert_eq!(
            outcome,
            MergeOutcome {
                enrollments_moved: 1,
                enrollments_removed: 1,
                courses_deleted: 1,
            }
        );

        assert!(storage.get_course_by_id_impl(duplicate).await.expect("get").is_none());
        let remaining = storage
            .list_enrollments_for_courses_impl(&[canonical])
            .await
            .expect("enrollments");
        let students: Vec<i64> = remaining.iter().map(|e| e.student_id).collect();
        assert_eq!(students, vec![s1, s2]);
    }
}
