//! 对账执行
//!
//! 计划按范围（单个教师或全部）生成；孤立成绩检测始终使用全部选课数据，
//! 避免把学生在其他教师处的科目误判为孤立。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use super::ReconciliationService;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::courses::requests::CreateCourseRequest;
use crate::models::enrollment_requests::entities::EnrollmentRequestStatus;
use crate::models::reconciliation::{
    requests::RunReconciliationRequest,
    responses::{AppliedChanges, ReconciliationReport},
};
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::reconcile::{
    CourseKey, ReconciliationPlan, find_orphan_grades, plan_reconciliation,
};
use crate::storage::Storage;

/// 生成对账报告，非 dry run 时执行计划
pub async fn run_reconciliation(
    storage: &Arc<dyn Storage>,
    options: &RunReconciliationRequest,
    subject_aliases: &HashMap<String, String>,
) -> Result<ReconciliationReport> {
    let started_at = chrono::Utc::now();
    let scope = options.teacher_id;
    let in_scope = |teacher_id: i64| scope.is_none_or(|t| t == teacher_id);

    let approved_all = storage
        .list_enrollment_requests(None, Some(EnrollmentRequestStatus::Approved))
        .await?;
    let pending = storage
        .list_enrollment_requests(scope, Some(EnrollmentRequestStatus::Pending))
        .await?;
    let courses_all = storage.list_courses(None).await?;
    let course_ids: Vec<i64> = courses_all.iter().map(|c| c.id).collect();
    let enrollments_all = storage.list_enrollments_for_courses(&course_ids).await?;

    let approved: Vec<_> = approved_all
        .iter()
        .filter(|r| in_scope(r.teacher_id))
        .cloned()
        .collect();
    let courses: Vec<_> = courses_all
        .iter()
        .filter(|c| in_scope(c.teacher_id))
        .cloned()
        .collect();
    let scoped_course_ids: BTreeSet<i64> = courses.iter().map(|c| c.id).collect();
    let enrollments: Vec<_> = enrollments_all
        .iter()
        .filter(|e| scoped_course_ids.contains(&e.course_id))
        .cloned()
        .collect();

    let plan = plan_reconciliation(&approved, &pending, &courses, &enrollments);

    let grades = match scope {
        None => storage.list_all_grades().await?,
        Some(_) => {
            let students: Vec<i64> = approved
                .iter()
                .map(|r| r.student_id)
                .chain(enrollments.iter().map(|e| e.student_id))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            storage.list_grades_for_students(&students).await?
        }
    };
    let orphan_grades = find_orphan_grades(
        &grades,
        &approved_all,
        &courses_all,
        &enrollments_all,
        subject_aliases,
    );

    let applied = if options.dry_run {
        AppliedChanges::default()
    } else {
        apply_plan(storage, &plan, options.merge_duplicates).await?
    };

    Ok(ReconciliationReport {
        teacher_id: scope,
        dry_run: options.dry_run,
        merge_duplicates: options.merge_duplicates,
        plan,
        orphan_grades,
        applied,
        started_at,
        finished_at: chrono::Utc::now(),
    })
}

async fn apply_plan(
    storage: &Arc<dyn Storage>,
    plan: &ReconciliationPlan,
    merge_duplicates: bool,
) -> Result<AppliedChanges> {
    let mut applied = AppliedChanges::default();

    let mut created_courses: HashMap<CourseKey, i64> = HashMap::new();
    for planned in &plan.create_courses {
        let (course, created) = storage
            .find_or_create_course(
                planned.teacher_id,
                CreateCourseRequest {
                    teacher_id: Some(planned.teacher_id),
                    subject: planned.subject.clone(),
                    grade_level: planned.grade_level.clone(),
                    stream: planned.stream.clone(),
                    description: None,
                },
            )
            .await?;
        if created {
            applied.courses_created += 1;
        }
        created_courses.insert(planned.key(), course.id);
    }

    for planned in &plan.create_enrollments {
        let Some(course_id) = planned
            .course_id
            .or_else(|| created_courses.get(&planned.key()).copied())
        else {
            warn!(
                "No course for planned enrollment of student {} ({} / {}), skipped",
                planned.student_id, planned.subject_key, planned.grade_level_key
            );
            continue;
        };
        let (_, created) = storage.enroll_student(planned.student_id, course_id).await?;
        if created {
            applied.enrollments_created += 1;
        }
    }

    if merge_duplicates {
        for group in &plan.duplicate_groups {
            let outcome = storage.merge_duplicate_courses(group).await?;
            applied.enrollments_moved += outcome.enrollments_moved;
            applied.enrollments_removed += outcome.enrollments_removed;
            applied.duplicate_courses_deleted += outcome.courses_deleted;
        }
    }

    Ok(applied)
}

pub async fn run(
    service: &ReconciliationService,
    data: RunReconciliationRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    if let Some(teacher_id) = data.teacher_id {
        match storage.get_user_by_id(teacher_id).await {
            Ok(Some(user)) if user.role == UserRole::Teacher => {}
            Ok(_) => {
                return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                    ErrorCode::UserNotFound,
                    "Teacher not found",
                )));
            }
            Err(e) => {
                return Ok(super::super::error_response(&e, ErrorCode::InternalServerError));
            }
        }
    }

    let aliases = &AppConfig::get().reconciliation.subject_aliases;
    let report = match run_reconciliation(&storage, &data, aliases).await {
        Ok(report) => report,
        Err(e) => {
            return Ok(super::super::error_response(&e, ErrorCode::ReconciliationFailed));
        }
    };

    info!(
        "Reconciliation finished (scope: {:?}, dry_run: {}): {} courses, {} enrollments, {} duplicate groups, {} orphan grades",
        report.teacher_id,
        report.dry_run,
        report.plan.create_courses.len(),
        report.plan.create_enrollments.len(),
        report.plan.duplicate_groups.len(),
        report.orphan_grades.len()
    );

    if !report.dry_run {
        super::super::teacher_subjects::invalidate_teacher_views(
            request,
            report.plan.affected_teachers(),
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        report,
        "Reconciliation completed",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enrollment_requests::requests::CreateEnrollmentRequest;
    use crate::models::grades::{entities::GradeType, requests::CreateGradeRequest};
    use crate::reconcile::OrphanReason;
    use crate::storage::sea_orm_storage::test_support::{
        force_status, insert_course_raw, storage, user,
    };

    fn options(teacher_id: Option<i64>, dry_run: bool, merge_duplicates: bool) -> RunReconciliationRequest {
        RunReconciliationRequest {
            teacher_id,
            dry_run,
            merge_duplicates,
        }
    }

    fn grade(student_id: i64, subject: &str) -> CreateGradeRequest {
        CreateGradeRequest {
            student_id,
            subject: subject.to_string(),
            score: 7.0,
            max_score: 10.0,
            grade_type: GradeType::Quiz,
            title: None,
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_dry_run_then_apply() {
        let db = storage().await;
        let teacher = user(&db, "teacher", UserRole::Teacher).await;
        let other = user(&db, "other", UserRole::Teacher).await;
        let s1 = user(&db, "s1", UserRole::Student).await;
        let s2 = user(&db, "s2", UserRole::Student).await;

        let request = db
            .create_enrollment_request(
                s1,
                CreateEnrollmentRequest {
                    teacher_id: teacher,
                    subject: "Chemistry".to_string(),
                    grade_level: "Grade 11".to_string(),
                    stream: Some("Science".to_string()),
                    family_id: None,
                    note: None,
                },
            )
            .await
            .expect("request");
        force_status(&db, request.id, EnrollmentRequestStatus::Approved).await;

        // 另一位教师名下的重复课程
        let canonical = insert_course_raw(&db, other, "Geography", "9").await;
        let duplicate = insert_course_raw(&db, other, " geography ", "Grade 9").await;
        db.enroll_student(s2, duplicate).await.expect("enroll");

        db.create_grade(teacher, grade(s1, "chem")).await.expect("grade");
        db.create_grade(teacher, grade(s1, "Music")).await.expect("grade");
        let storage: Arc<dyn Storage> = Arc::new(db);

        let report = run_reconciliation(&storage, &options(None, true, false), &HashMap::new())
            .await
            .expect("dry run");
        assert_eq!(report.plan.create_courses.len(), 1);
        assert_eq!(report.plan.create_enrollments.len(), 1);
        assert_eq!(report.plan.duplicate_groups.len(), 1);
        assert_eq!(report.applied, AppliedChanges::default());
        assert_eq!(report.orphan_grades.len(), 1);
        assert_eq!(report.orphan_grades[0].subject, "Music");
        assert_eq!(report.orphan_grades[0].reason, OrphanReason::UnmatchedSubject);
        assert!(storage.list_courses(Some(teacher)).await.expect("courses").is_empty());

        // 限定教师范围时不涉及其他教师的重复课程
        let scoped = run_reconciliation(&storage, &options(Some(teacher), false, true), &HashMap::new())
            .await
            .expect("apply");
        assert!(scoped.plan.duplicate_groups.is_empty());
        assert_eq!(scoped.applied.courses_created, 1);
        assert_eq!(scoped.applied.enrollments_created, 1);
        assert_eq!(scoped.applied.duplicate_courses_deleted, 0);

        let courses = storage.list_courses(Some(teacher)).await.expect("courses");
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].subject, "Chemistry");
        assert_eq!(courses[0].stream.as_deref(), Some("Science"));
        assert_eq!(storage.list_student_enrollments(s1).await.expect("enrollments").len(), 1);

        let merged = run_reconciliation(&storage, &options(None, false, true), &HashMap::new())
            .await
            .expect("merge");
        assert_eq!(merged.applied.duplicate_courses_deleted, 1);
        assert_eq!(merged.applied.enrollments_moved, 1);
        assert!(storage.get_course_by_id(duplicate).await.expect("get").is_none());
        let moved = storage.list_student_enrollments(s2).await.expect("enrollments");
        assert_eq!(moved[0].course_id, canonical);

        let rerun = run_reconciliation(&storage, &options(None, true, false), &HashMap::new())
            .await
            .expect("rerun");
        assert!(rerun.plan.is_empty());
    }

    #[actix_web::test]
    async fn test_run_rejects_malformed_body() {
        use crate::routes::configure_reconciliation_routes;
        use crate::services::test_app::{TestContext, bearer, init_app};
        use actix_web::{http::StatusCode, test};

        let db = storage().await;
        let admin = user(&db, "admin", UserRole::Admin).await;
        let teacher = user(&db, "teacher", UserRole::Teacher).await;
        let student = user(&db, "student", UserRole::Student).await;
        let request = db
            .create_enrollment_request(
                student,
                CreateEnrollmentRequest {
                    teacher_id: teacher,
                    subject: "Music".to_string(),
                    grade_level: "8".to_string(),
                    stream: None,
                    family_id: None,
                    note: None,
                },
            )
            .await
            .expect("request");
        force_status(&db, request.id, EnrollmentRequestStatus::Approved).await;

        let ctx = TestContext::new(db);
        let app = init_app!(ctx, configure_reconciliation_routes);

        let post = |body: serde_json::Value| {
            test::TestRequest::post()
                .uri("/api/v1/reconciliation/run")
                .insert_header(bearer(admin, UserRole::Admin))
                .set_json(body)
                .to_request()
        };

        // teacher_id 类型错误或字段拼写错误都不能退化成默认的全局试运行
        for body in [
            serde_json::json!({"teacher_id": teacher.to_string(), "dry_run": false}),
            serde_json::json!({"teacher_id": teacher, "dryrun": false}),
        ] {
            let resp = test::call_service(&app, post(body)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["code"], ErrorCode::BadRequest as i32);
        }
        assert!(ctx.storage.list_courses(None).await.expect("courses").is_empty());

        // 空请求体按默认值执行：全局试运行
        let empty = test::TestRequest::post()
            .uri("/api/v1/reconciliation/run")
            .insert_header(bearer(admin, UserRole::Admin))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, empty).await;
        assert_eq!(body["data"]["dry_run"], true);
        assert!(body["data"]["teacher_id"].is_null());
        assert!(ctx.storage.list_courses(None).await.expect("courses").is_empty());

        let apply = post(serde_json::json!({"teacher_id": teacher, "dry_run": false}));
        let resp = test::call_service(&app, apply).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(ctx.storage.list_courses(Some(teacher)).await.expect("courses").len(), 1);
    }
}
