//! 成绩存储操作

use super::SeaOrmStorage;
use crate::entity::student_grades::{ActiveModel, Column, Entity as StudentGrades};
use crate::errors::{Result, SchoolSystemError};
use crate::models::{
    PaginationInfo, PaginationQuery,
    grades::{
        entities::StudentGrade,
        requests::{CreateGradeRequest, GradeListQuery, UpdateGradeRequest},
        responses::GradeListResponse,
    },
};
use crate::utils::like_contains;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

impl SeaOrmStorage {
    /// 录入成绩
    pub async fn create_grade_impl(
        &self,
        graded_by: i64,
        req: CreateGradeRequest,
    ) -> Result<StudentGrade> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            student_id: Set(req.student_id),
            subject: Set(req.subject.trim().to_string()),
            score: Set(req.score),
            max_score: Set(req.max_score),
            grade_type: Set(req.grade_type.to_string()),
            title: Set(req.title),
            comment: Set(req.comment),
            graded_by: Set(Some(graded_by)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("录入成绩失败: {e}")))?;

        Ok(result.into_student_grade())
    }

    /// 通过 ID 获取成绩
    pub async fn get_grade_by_id_impl(&self, id: i64) -> Result<Option<StudentGrade>> {
        let result = StudentGrades::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询成绩失败: {e}")))?;

        Ok(result.map(|m| m.into_student_grade()))
    }

    /// 更新成绩
    pub async fn update_grade_impl(
        &self,
        id: i64,
        update: UpdateGradeRequest,
    ) -> Result<Option<StudentGrade>> {
        let existing = self.get_grade_by_id_impl(id).await?;
        if existing.is_none() {
            return Ok(None);
        }

        let now = chrono::Utc::now().timestamp();

        let mut model = ActiveModel {
            id: Set(id),
            updated_at: Set(now),
            ..Default::default()
        };

        if let Some(subject) = update.subject {
            model.subject = Set(subject.trim().to_string());
        }

        if let Some(score) = update.score {
            model.score = Set(score);
        }

        if let Some(max_score) = update.max_score {
            model.max_score = Set(max_score);
        }

        if let Some(grade_type) = update.grade_type {
            model.grade_type = Set(grade_type.to_string());
        }

        if let Some(title) = update.title {
            model.title = Set(Some(title));
        }

        if let Some(comment) = update.comment {
            model.comment = Set(Some(comment));
        }

        model
            .update(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("更新成绩失败: {e}")))?;

        self.get_grade_by_id_impl(id).await
    }

    /// 删除成绩
    pub async fn delete_grade_impl(&self, id: i64) -> Result<bool> {
        let result = StudentGrades::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("删除成绩失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 分页列出成绩
    pub async fn list_grades_with_pagination_impl(
        &self,
        query: GradeListQuery,
    ) -> Result<GradeListResponse> {
        let (page, size) = PaginationQuery::normalized(query.page, query.size, 20);

        let mut select = StudentGrades::find();

        if let Some(student_id) = query.student_id {
            select = select.filter(Column::StudentId.eq(student_id));
        }

        if let Some(ref subject) = query.subject
            && !subject.trim().is_empty()
        {
            select = select.filter(Column::Subject.like(like_contains(subject.trim())));
        }

        if let Some(grade_type) = query.grade_type {
            select = select.filter(Column::GradeType.eq(grade_type.to_string()));
        }

        if let Some(graded_by) = query.graded_by {
            select = select.filter(Column::GradedBy.eq(graded_by));
        }

        select = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询成绩总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询成绩页数失败: {e}")))?;

        let grades = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询成绩列表失败: {e}")))?;

        Ok(GradeListResponse {
            items: grades.into_iter().map(|m| m.into_student_grade()).collect(),
            pagination: PaginationInfo {
                page: page as i64,
                page_size: size as i64,
                total: total as i64,
                total_pages: pages as i64,
            },
        })
    }

    /// 列出若干学生的全部成绩
    pub async fn list_grades_for_students_impl(
        &self,
        student_ids: &[i64],
    ) -> Result<Vec<StudentGrade>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        let grades = StudentGrades::find()
            .filter(Column::StudentId.is_in(student_ids.iter().copied()))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询成绩失败: {e}")))?;

        Ok(grades.into_iter().map(|m| m.into_student_grade()).collect())
    }

    /// 列出所有成绩
    pub async fn list_all_grades_impl(&self) -> Result<Vec<StudentGrade>> {
        let grades = StudentGrades::find()
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询成绩失败: {e}")))?;

        Ok(grades.into_iter().map(|m| m.into_student_grade()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage, user};
    use crate::models::grades::{
        entities::GradeType,
        requests::{CreateGradeRequest, GradeListQuery, UpdateGradeRequest},
    };
    use crate::models::users::entities::UserRole;

    fn grade(student_id: i64, subject: &str, score: f64) -> CreateGradeRequest {
        CreateGradeRequest {
            student_id,
            subject: subject.to_string(),
            score,
            max_score: 100.0,
            grade_type: GradeType::Quiz,
            title: None,
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_grade_crud_and_filters() {
        let storage = storage().await;
        let teacher = user(&storage, "teacher", UserRole::Teacher).await;
        let s1 = user(&storage, "s1", UserRole::Student).await;
        let s2 = user(&storage, "s2", UserRole::Student).await;

        let created = storage
            .create_grade_impl(teacher, grade(s1, " Biology ", 70.0))
            .await
            .expect("create");
        assert_eq!(created.subject, "Biology");
        assert_eq!(created.graded_by, Some(teacher));
        storage
            .create_grade_impl(teacher, grade(s2, "Chemistry", 50.0))
            .await
            .expect("create");

        let updated = storage
            .update_grade_impl(
                created.id,
                UpdateGradeRequest {
                    subject: None,
                    score: Some(85.0),
                    max_score: None,
                    grade_type: Some(GradeType::Exam),
                    title: Some("Midterm".to_string()),
                    comment: None,
                },
            )
            .await
            .expect("update")
            .expect("exists");
        assert_eq!(updated.score, 85.0);
        assert_eq!(updated.grade_type, GradeType::Exam);
        assert_eq!(updated.title.as_deref(), Some("Midterm"));

        let exams = storage
            .list_grades_with_pagination_impl(GradeListQuery {
                grade_type: Some(GradeType::Exam),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(exams.pagination.total, 1);

        let for_s1 = storage.list_grades_for_students_impl(&[s1]).await.expect("list");
        assert_eq!(for_s1.len(), 1);
        assert_eq!(storage.list_all_grades_impl().await.expect("all").len(), 2);

        assert!(storage.delete_grade_impl(created.id).await.expect("delete"));
        assert!(storage.get_grade_by_id_impl(created.id).await.expect("get").is_none());
        assert!(
            storage
                .update_grade_impl(
                    created.id,
                    UpdateGradeRequest {
                        subject: None,
                        score: Some(1.0),
                        max_score: None,
                        grade_type: None,
                        title: None,
                        comment: None,
                    },
                )
                .await
                .expect("update")
                .is_none()
        );
    }
}
