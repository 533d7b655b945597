use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::{BTreeMap, HashMap};

use super::GradeService;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::middlewares::RequireJWT;
use crate::models::enrollment_requests::entities::EnrollmentRequestStatus;
use crate::models::grades::entities::StudentGrade;
use crate::models::grades::requests::GradeSummaryParams;
use crate::models::grades::responses::{StudentGradeSummary, SubjectScoreSummary};
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::reconcile::keys::most_common;
use crate::reconcile::{ScoreAccumulator, SubjectKey, SubjectResolver, percentage};
use crate::storage::Storage;

/// 按科目汇总学生成绩
///
/// 成绩科目先按学生已知科目（已选课程与已批准申请）解析，解析不到时按自身规范化键归组。
pub fn summarize_student_grades(
    student_id: i64,
    grades: &[StudentGrade],
    known_subjects: impl IntoIterator<Item = SubjectKey>,
    subject_aliases: &HashMap<String, String>,
) -> StudentGradeSummary {
    let resolver = SubjectResolver::new(known_subjects).with_aliases(subject_aliases);

    let mut groups: BTreeMap<SubjectKey, (Vec<&str>, ScoreAccumulator)> = BTreeMap::new();
    let mut overall = ScoreAccumulator::default();

    for grade in grades.iter().filter(|g| g.student_id == student_id) {
        let Some(pct) = percentage(grade.score, grade.max_score) else {
            continue;
        };
        let Some(key) = resolver
            .resolve(&grade.subject)
            .into_key()
            .or_else(|| SubjectKey::new(&grade.subject))
        else {
            continue;
        };
        let (spellings, acc) = groups.entry(key).or_default();
        spellings.push(grade.subject.as_str());
        acc.push(pct);
        overall.push(pct);
    }

    let subjects = groups
        .into_iter()
        .map(|(key, (spellings, acc))| SubjectScoreSummary {
            subject: most_common(spellings).unwrap_or_else(|| key.to_string()),
            subject_key: key.to_string(),
            scores: acc.summary(),
        })
        .collect();

    StudentGradeSummary {
        student_id,
        subjects,
        overall: overall.summary(),
    }
}

async fn known_subjects_of(
    storage: &std::sync::Arc<dyn Storage>,
    student_id: i64,
) -> Result<Vec<SubjectKey>> {
    let mut known = Vec::new();
    for enrollment in storage.list_student_enrollments(student_id).await? {
        if let Some(course) = storage.get_course_by_id(enrollment.course_id).await?
            && let Some(key) = SubjectKey::new(&course.subject)
        {
            known.push(key);
        }
    }

    let approved = storage
        .list_student_enrollment_requests(student_id, Some(EnrollmentRequestStatus::Approved))
        .await?;
    known.extend(approved.iter().filter_map(|r| SubjectKey::new(&r.subject)));
    Ok(known)
}

pub async fn get_summary(
    service: &GradeService,
    query: GradeSummaryParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };

    let student_id = match (&current_user.role, query.student_id) {
        (UserRole::Student, None) => current_user.id,
        (UserRole::Student, Some(id)) if id == current_user.id => id,
        (UserRole::Student, Some(_)) => {
            return Ok(super::super::forbidden(
                ErrorCode::GradePermissionDenied,
                "Students can only view their own summary",
            ));
        }
        (_, Some(id)) => id,
        (_, None) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::BadRequest,
                "student_id is required",
            )));
        }
    };

    let storage = service.get_storage(request)?;

    let result = async {
        let known = known_subjects_of(&storage, student_id).await?;
        let grades = storage.list_grades_for_students(&[student_id]).await?;
        Ok::<_, crate::errors::SchoolSystemError>(summarize_student_grades(
            student_id,
            &grades,
            known,
            &AppConfig::get().reconciliation.subject_aliases,
        ))
    }
    .await;

    match result {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            summary,
            "Grade summary retrieved successfully",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::fixtures;

    #[test]
    fn test_summary_groups_aliases_under_known_subject() {
        let grades = vec![
            fixtures::grade(1, 5, "Mathematics", 80.0, 100.0, Some(9)),
            fixtures::grade(2, 5, "maths", 30.0, 50.0, Some(9)),
            fixtures::grade(3, 5, "Art", 10.0, 20.0, None),
            fixtures::grade(4, 5, "Art", 1.0, 0.0, None),
            fixtures::grade(5, 6, "Mathematics", 0.0, 100.0, None),
        ];
        let known = SubjectKey::new("mathematics").into_iter();

        let summary = summarize_student_grades(5, &grades, known, &HashMap::new());

        assert_eq!(summary.subjects.len(), 2);
        let art = &summary.subjects[0];
        assert_eq!(art.subject_key, "art");
        assert_eq!(art.scores.grade_count, 1);
        assert_eq!(art.scores.average_percentage, Some(50.0));

        let maths = &summary.subjects[1];
        assert_eq!(maths.subject_key, "mathematics");
        assert_eq!(maths.scores.grade_count, 2);
        assert_eq!(maths.scores.average_percentage, Some(70.0));

        assert_eq!(summary.overall.grade_count, 3);
        assert_eq!(summary.overall.average_percentage, Some(63.33));
    }
}
