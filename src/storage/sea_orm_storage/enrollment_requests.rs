//! 选课申请存储操作

use super::SeaOrmStorage;
use super::courses::find_or_create_course_in;
use super::enrollments::enroll_in;
use crate::entity::enrollment_requests::{ActiveModel, Column, Entity as EnrollmentRequests};
use crate::errors::{Result, SchoolSystemError};
use crate::models::{
    PaginationInfo, PaginationQuery,
    courses::requests::CreateCourseRequest,
    enrollment_requests::{
        entities::{EnrollmentRequest, EnrollmentRequestStatus},
        requests::{CreateEnrollmentRequest, EnrollmentRequestListQuery},
        responses::{ApprovalOutcome, EnrollmentRequestListResponse},
    },
};
use crate::reconcile::CourseKey;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use tracing::info;

async fn load_request<C: ConnectionTrait>(conn: &C, id: i64) -> Result<EnrollmentRequest> {
    EnrollmentRequests::find_by_id(id)
        .one(conn)
        .await
        .map_err(|e| SchoolSystemError::database_operation(format!("查询选课申请失败: {e}")))?
        .map(|m| m.into_enrollment_request())
        .ok_or_else(|| SchoolSystemError::not_found(format!("选课申请 {id} 不存在")))
}

/// 把待审批申请更新为终态；状态已变化时返回 InvalidState
async fn finish_review<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    next: EnrollmentRequestStatus,
    reviewer_id: i64,
    comment: Option<String>,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let result = EnrollmentRequests::update_many()
        .col_expr(Column::Status, Expr::value(next.to_string()))
        .col_expr(Column::ReviewedBy, Expr::value(reviewer_id))
        .col_expr(Column::ReviewedAt, Expr::value(now))
        .col_expr(Column::ReviewComment, Expr::value(comment))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .filter(Column::Status.eq(EnrollmentRequestStatus::PENDING))
        .exec(conn)
        .await
        .map_err(|e| SchoolSystemError::database_operation(format!("更新选课申请失败: {e}")))?;

    if result.rows_affected == 0 {
        return Err(SchoolSystemError::invalid_state(format!(
            "选课申请 {id} 已被处理"
        )));
    }
    Ok(())
}

impl SeaOrmStorage {
    /// 创建选课申请
    pub async fn create_enrollment_request_impl(
        &self,
        student_id: i64,
        req: CreateEnrollmentRequest,
    ) -> Result<EnrollmentRequest> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            student_id: Set(student_id),
            teacher_id: Set(req.teacher_id),
            subject: Set(req.subject.trim().to_string()),
            grade_level: Set(req.grade_level.trim().to_string()),
            stream: Set(req
                .stream
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())),
            family_id: Set(req.family_id),
            status: Set(EnrollmentRequestStatus::Pending.to_string()),
            note: Set(req.note),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("创建选课申请失败: {e}")))?;

        Ok(result.into_enrollment_request())
    }

    /// 通过 ID 获取选课申请
    pub async fn get_enrollment_request_by_id_impl(
        &self,
        id: i64,
    ) -> Result<Option<EnrollmentRequest>> {
        let result = EnrollmentRequests::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询选课申请失败: {e}")))?;

        Ok(result.map(|m| m.into_enrollment_request()))
    }

    /// 是否已有同一课程的待审批或已批准申请
    pub async fn has_active_enrollment_request_impl(
        &self,
        student_id: i64,
        key: &CourseKey,
    ) -> Result<bool> {
        let requests = EnrollmentRequests::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::TeacherId.eq(key.teacher_id))
            .filter(Column::Status.is_in([
                EnrollmentRequestStatus::PENDING,
                EnrollmentRequestStatus::APPROVED,
            ]))
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询选课申请失败: {e}")))?;

        Ok(requests.iter().any(|r| {
            CourseKey::new(&r.subject, &r.grade_level, r.teacher_id).as_ref() == Some(key)
        }))
    }

    /// 分页列出选课申请
    pub async fn list_enrollment_requests_with_pagination_impl(
        &self,
        query: EnrollmentRequestListQuery,
    ) -> Result<EnrollmentRequestListResponse> {
        let (page, size) = PaginationQuery::normalized(query.page, query.size, 20);

        let mut select = EnrollmentRequests::find();

        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }

        if let Some(teacher_id) = query.teacher_id {
            select = select.filter(Column::TeacherId.eq(teacher_id));
        }

        if let Some(student_id) = query.student_id {
            select = select.filter(Column::StudentId.eq(student_id));
        }

        select = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator.num_items().await.map_err(|e| {
            SchoolSystemError::database_operation(format!("查询选课申请总数失败: {e}"))
        })?;

        let pages = paginator.num_pages().await.map_err(|e| {
            SchoolSystemError::database_operation(format!("查询选课申请页数失败: {e}"))
        })?;

        let requests = paginator.fetch_page(page - 1).await.map_err(|e| {
            SchoolSystemError::database_operation(format!("查询选课申请列表失败: {e}"))
        })?;

        Ok(EnrollmentRequestListResponse {
            items: requests
                .into_iter()
                .map(|m| m.into_enrollment_request())
                .collect(),
            pagination: PaginationInfo {
                page: page as i64,
                page_size: size as i64,
                total: total as i64,
                total_pages: pages as i64,
            },
        })
    }

    /// 按教师与状态列出选课申请（不分页）
    pub async fn list_enrollment_requests_impl(
        &self,
        teacher_id: Option<i64>,
        status: Option<EnrollmentRequestStatus>,
    ) -> Result<Vec<EnrollmentRequest>> {
        let mut select = EnrollmentRequests::find();

        if let Some(teacher_id) = teacher_id {
            select = select.filter(Column::TeacherId.eq(teacher_id));
        }

        if let Some(status) = status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }

        let requests = select
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询选课申请失败: {e}")))?;

        Ok(requests
            .into_iter()
            .map(|m| m.into_enrollment_request())
            .collect())
    }

    pub async fn list_student_enrollment_requests_impl(
        &self,
        student_id: i64,
        status: Option<EnrollmentRequestStatus>,
    ) -> Result<Vec<EnrollmentRequest>> {
        let mut select = EnrollmentRequests::find().filter(Column::StudentId.eq(student_id));

        if let Some(status) = status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }

        let requests = select
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("查询学生选课申请失败: {e}")))?;

        Ok(requests
            .into_iter()
            .map(|m| m.into_enrollment_request())
            .collect())
    }

    /// 批准选课申请
    pub async fn approve_enrollment_request_impl(
        &self,
        id: i64,
        reviewer_id: i64,
        comment: Option<String>,
    ) -> Result<ApprovalOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("开启事务失败: {e}")))?;

        let request = load_request(&txn, id).await?;
        if !request
            .status
            .can_transition_to(EnrollmentRequestStatus::Approved)
        {
            return Err(SchoolSystemError::invalid_state(format!(
                "选课申请 {id} 当前状态为 {}，无法批准",
                request.status
            )));
        }

        let (course, course_created) = find_or_create_course_in(
            &txn,
            request.teacher_id,
            CreateCourseRequest {
                teacher_id: Some(request.teacher_id),
                subject: request.subject.clone(),
                grade_level: request.grade_level.clone(),
                stream: request.stream.clone(),
                description: None,
            },
        )
        .await?;

        let (enrollment, enrollment_created) = enroll_in(&txn, request.student_id, course.id).await?;

        finish_review(
            &txn,
            id,
            EnrollmentRequestStatus::Approved,
            reviewer_id,
            comment,
        )
        .await?;
        let request = load_request(&txn, id).await?;

        txn.commit()
            .await
            .map_err(|e| SchoolSystemError::database_operation(format!("提交事务失败: {e}")))?;

        info!(
            "选课申请 {} 已批准: 课程 {} (新建: {}), 学生 {}",
            id, course.id, course_created, request.student_id
        );

        Ok(ApprovalOutcome {
            request,
            course,
            enrollment,
            course_created,
            enrollment_created,
        })
    }

    /// 拒绝选课申请
    pub async fn reject_enrollment_request_impl(
        &self,
        id: i64,
        reviewer_id: i64,
        comment: Option<String>,
    ) -> Result<EnrollmentRequest> {
        let request = load_request(&self.db, id).await?;
        if !request
            .status
            .can_transition_to(EnrollmentRequestStatus::Rejected)
        {
            return Err(SchoolSystemError::invalid_state(format!(
                "选课申请 {id} 当前状态为 {}，无法拒绝",
                request.status
            )));
        }

        finish_review(
            &self.db,
            id,
            EnrollmentRequestStatus::Rejected,
            reviewer_id,
            comment,
        )
        .await?;

        load_request(&self.db, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{force_status, storage, user};
    use crate::errors::SchoolSystemError;
    use crate::models::enrollment_requests::{
        entities::EnrollmentRequestStatus,
        requests::{CreateEnrollmentRequest, EnrollmentRequestListQuery},
    };
    use crate::models::users::entities::UserRole;
    use crate::reconcile::CourseKey;

    fn request(teacher_id: i64, subject: &str, grade_level: &str) -> CreateEnrollmentRequest {
        CreateEnrollmentRequest {
            teacher_id,
            subject: subject.to_string(),
            grade_level: grade_level.to_string(),
            stream: None,
            family_id: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_approve_creates_course_and_enrollment() {
        let storage = storage().await;
        let teacher = user(&storage, "teacher", UserRole::Teacher).await;
        let s1 = user(&storage, "s1", UserRole::Student).await;
        let s2 = user(&storage, "s2", UserRole::Student).await;

        let r1 = storage
            .create_enrollment_request_impl(s1, request(teacher, "Chemistry", "Grade 11"))
            .await
            .expect("create");
        let r2 = storage
            .create_enrollment_request_impl(s2, request(teacher, "chemistry", "11"))
            .await
            .expect("create");
        assert_eq!(r1.status, EnrollmentRequestStatus::Pending);

        let first = storage
            .approve_enrollment_request_impl(r1.id, teacher, Some("ok".to_string()))
            .await
            .expect("approve");
        assert!(first.course_created);
        assert!(first.enrollment_created);
        assert_eq!(first.request.status, EnrollmentRequestStatus::Approved);
        assert_eq!(first.request.reviewed_by, Some(teacher));
        assert_eq!(first.request.review_comment.as_deref(), Some("ok"));
        assert!(first.request.reviewed_at.is_some());

        // 第二个申请复用同一门课程
        let second = storage
            .approve_enrollment_request_impl(r2.id, teacher, None)
            .await
            .expect("approve");
        assert!(!second.course_created);
        assert_eq!(second.course.id, first.course.id);

        let again = storage
            .approve_enrollment_request_impl(r1.id, teacher, None)
            .await
            .expect_err("already approved");
        assert!(matches!(again, SchoolSystemError::InvalidState(_)));

        let missing = storage
            .approve_enrollment_request_impl(9999, teacher, None)
            .await
            .expect_err("missing");
        assert!(matches!(missing, SchoolSystemError::NotFound(_)));

        assert_eq!(storage.list_courses_impl(Some(teacher)).await.expect("courses").len(), 1);
        assert_eq!(
            storage
                .list_enrollments_for_courses_impl(&[first.course.id])
                .await
                .expect("enrollments")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_reject_and_active_lookup() {
        let storage = storage().await;
        let teacher = user(&storage, "teacher", UserRole::Teacher).await;
        let student = user(&storage, "student", UserRole::Student).await;
        let key = CourseKey::new("Physics", "12", teacher).expect("key");

        assert!(!storage.has_active_enrollment_request_impl(student, &key).await.expect("query"));
        let created = storage
            .create_enrollment_request_impl(student, request(teacher, "PHYSICS", "grade 12"))
            .await
            .expect("create");
        assert!(storage.has_active_enrollment_request_impl(student, &key).await.expect("query"));

        let rejected = storage
            .reject_enrollment_request_impl(created.id, teacher, Some("full".to_string()))
            .await
            .expect("reject");
        assert_eq!(rejected.status, EnrollmentRequestStatus::Rejected);
        assert!(!storage.has_active_enrollment_request_impl(student, &key).await.expect("query"));

        let err = storage
            .reject_enrollment_request_impl(created.id, teacher, None)
            .await
            .expect_err("not pending");
        assert!(matches!(err, SchoolSystemError::InvalidState(_)));

        let pending = storage
            .list_enrollment_requests_with_pagination_impl(EnrollmentRequestListQuery {
                status: Some(EnrollmentRequestStatus::Pending),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(pending.pagination.total, 0);
        let all = storage
            .list_enrollment_requests_impl(Some(teacher), None)
            .await
            .expect("list");
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_student_requests_are_not_truncated() {
        let storage = storage().await;
        let teacher = user(&storage, "teacher", UserRole::Teacher).await;
        let student = user(&storage, "student", UserRole::Student).await;
        let other = user(&storage, "other", UserRole::Student).await;

        for n in 0..120 {
            let subject = format!("Elective {n}");
            let created = storage
                .create_enrollment_request_impl(student, request(teacher, &subject, "10"))
                .await
                .expect("create");
            if n % 2 == 0 {
                force_status(&storage, created.id, EnrollmentRequestStatus::Approved).await;
            }
        }
        storage
            .create_enrollment_request_impl(other, request(teacher, "Elective 0", "10"))
            .await
            .expect("create");

        let all = storage
            .list_student_enrollment_requests_impl(student, None)
            .await
            .expect("list");
        assert_eq!(all.len(), 120);
        assert!(all.iter().all(|r| r.student_id == student));

        let approved = storage
            .list_student_enrollment_requests_impl(student, Some(EnrollmentRequestStatus::Approved))
            .await
            .expect("list");
        assert_eq!(approved.len(), 60);
    }
}
