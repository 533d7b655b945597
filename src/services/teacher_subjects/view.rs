//! 从存储层取数并物化教师科目视图

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::courses::requests::CreateCourseRequest;
use crate::models::enrollment_requests::entities::EnrollmentRequestStatus;
use crate::reconcile::{TeacherSubjectView, TeacherViewInput, build_teacher_view, plan_reconciliation};
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// 为缺失课程的已批准申请补建课程
    pub auto_create_courses: bool,
    pub prefer_own_grades: bool,
    pub subject_aliases: HashMap<String, String>,
}

impl ViewOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            auto_create_courses: config.reconciliation.auto_create_courses,
            prefer_own_grades: config.reconciliation.prefer_own_grades,
            subject_aliases: config.reconciliation.subject_aliases.clone(),
        }
    }
}

/// 构建教师科目视图，返回视图和本次补建的课程 ID
pub async fn load_teacher_view(
    storage: &Arc<dyn Storage>,
    teacher_id: i64,
    options: &ViewOptions,
) -> Result<(TeacherSubjectView, Vec<i64>)> {
    let requests = storage
        .list_enrollment_requests(Some(teacher_id), Some(EnrollmentRequestStatus::Approved))
        .await?;
    let mut courses = storage.list_courses(Some(teacher_id)).await?;

    let mut created_course_ids = Vec::new();
    if options.auto_create_courses {
        let plan = plan_reconciliation(&requests, &[], &courses, &[]);
        for planned in plan.create_courses {
            let (course, created) = storage
                .find_or_create_course(
                    teacher_id,
                    CreateCourseRequest {
                        teacher_id: Some(teacher_id),
                        subject: planned.subject,
                        grade_level: planned.grade_level,
                        stream: planned.stream,
                        description: None,
                    },
                )
                .await?;
            if created {
                info!(
                    "Auto-created course {} ({} / {}) for teacher {}",
                    course.id, course.subject, course.grade_level, teacher_id
                );
                created_course_ids.push(course.id);
            }
        }
        if !created_course_ids.is_empty() {
            courses = storage.list_courses(Some(teacher_id)).await?;
        }
    }

    let course_ids: Vec<i64> = courses.iter().map(|c| c.id).collect();
    let enrollments = storage.list_enrollments_for_courses(&course_ids).await?;

    let student_ids: Vec<i64> = requests
        .iter()
        .map(|r| r.student_id)
        .chain(enrollments.iter().map(|e| e.student_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let grades = storage.list_grades_for_students(&student_ids).await?;

    let view = build_teacher_view(&TeacherViewInput {
        teacher_id,
        requests: &requests,
        courses: &courses,
        enrollments: &enrollments,
        grades: &grades,
        prefer_own_grades: options.prefer_own_grades,
        subject_aliases: &options.subject_aliases,
    });

    Ok((view, created_course_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enrollment_requests::requests::CreateEnrollmentRequest;
    use crate::models::grades::{entities::GradeType, requests::CreateGradeRequest};
    use crate::models::users::entities::UserRole;
    use crate::reconcile::{SubjectSource, SyncIssue};
    use crate::storage::sea_orm_storage::test_support::{force_status, storage, user};

    fn options(auto_create_courses: bool) -> ViewOptions {
        ViewOptions {
            auto_create_courses,
            prefer_own_grades: true,
            subject_aliases: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_view_auto_creates_missing_course() {
        let db = storage().await;
        let teacher = user(&db, "teacher", UserRole::Teacher).await;
        let student = user(&db, "student", UserRole::Student).await;

        let request = db
            .create_enrollment_request(
                student,
                CreateEnrollmentRequest {
                    teacher_id: teacher,
                    subject: "Biology".to_string(),
                    grade_level: "Grade 10".to_string(),
                    stream: None,
                    family_id: None,
                    note: None,
                },
            )
            .await
            .expect("request");
        // 模拟已批准但没有课程的历史数据
        force_status(&db, request.id, EnrollmentRequestStatus::Approved).await;
        db.create_grade(
            teacher,
            CreateGradeRequest {
                student_id: student,
                subject: "bio".to_string(),
                score: 40.0,
                max_score: 50.0,
                grade_type: GradeType::Test,
                title: None,
                comment: None,
            },
        )
        .await
        .expect("grade");
        let storage: Arc<dyn Storage> = Arc::new(db);

        let (report_only, created) = load_teacher_view(&storage, teacher, &options(false))
            .await
            .expect("view");
        assert!(created.is_empty());
        assert!(!report_only.in_sync);
        assert!(report_only.subjects[0].issues.contains(&SyncIssue::MissingCourse));

        let (view, created) = load_teacher_view(&storage, teacher, &options(true))
            .await
            .expect("view");
        assert_eq!(created.len(), 1);
        let subject = &view.subjects[0];
        assert_eq!(subject.source, SubjectSource::Both);
        assert_eq!(subject.course_id, Some(created[0]));
        assert_eq!(subject.scores.average_percentage, Some(80.0));
        assert!(
            subject
                .issues
                .contains(&SyncIssue::MissingEnrollments { student_ids: vec![student] })
        );

        // 再次查询不会重复建课
        let (_, created) = load_teacher_view(&storage, teacher, &options(true))
            .await
            .expect("view");
        assert!(created.is_empty());
    }
}
