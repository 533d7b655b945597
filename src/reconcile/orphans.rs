//! 孤立成绩检测：成绩的科目对不上学生任何已选课程或已批准申请

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::keys::SubjectKey;
use super::resolver::SubjectResolver;
use crate::models::courses::entities::{Course, Enrollment};
use crate::models::enrollment_requests::entities::EnrollmentRequest;
use crate::models::grades::entities::StudentGrade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanReason {
    /// 学生没有任何选课或已批准申请
    NoEnrollment,
    UnmatchedSubject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanGrade {
    pub grade_id: i64,
    pub student_id: i64,
    pub subject: String,
    pub reason: OrphanReason,
}

pub fn find_orphan_grades(
    grades: &[StudentGrade],
    approved: &[EnrollmentRequest],
    courses: &[Course],
    enrollments: &[Enrollment],
    subject_aliases: &HashMap<String, String>,
) -> Vec<OrphanGrade> {
    let course_subjects: HashMap<i64, SubjectKey> = courses
        .iter()
        .filter_map(|c| Some((c.id, SubjectKey::new(&c.subject)?)))
        .collect();

    let mut subjects_by_student: HashMap<i64, BTreeSet<SubjectKey>> = HashMap::new();
    for request in approved {
        if let Some(key) = SubjectKey::new(&request.subject) {
            subjects_by_student
                .entry(request.student_id)
                .or_default()
                .insert(key);
        }
    }
    for enrollment in enrollments {
        if let Some(key) = course_subjects.get(&enrollment.course_id) {
            subjects_by_student
                .entry(enrollment.student_id)
                .or_default()
                .insert(key.clone());
        }
    }

    let mut resolvers: HashMap<i64, SubjectResolver> = HashMap::new();
    let mut orphans = Vec::new();
    for grade in grades {
        let reason = match subjects_by_student.get(&grade.student_id) {
            None => Some(OrphanReason::NoEnrollment),
            Some(known) => {
                let resolver = resolvers.entry(grade.student_id).or_insert_with(|| {
                    SubjectResolver::new(known.iter().cloned()).with_aliases(subject_aliases)
                });
                resolver
                    .resolve(&grade.subject)
                    .key()
                    .is_none()
                    .then_some(OrphanReason::UnmatchedSubject)
            }
        };
        if let Some(reason) = reason {
            orphans.push(OrphanGrade {
                grade_id: grade.id,
                student_id: grade.student_id,
                subject: grade.subject.clone(),
                reason,
            });
        }
    }

    orphans.sort_by_key(|o| o.grade_id);
    orphans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::fixtures::{approved, course, enrollment, grade};

    #[test]
    fn test_orphan_detection() {
        let approved = vec![approved(1, 10, 1, "Mathematics", "10")];
        let courses = vec![course(1, "Biology", "10", 2)];
        let enrollments = vec![enrollment(1, 11, 1), enrollment(2, 10, 1)];
        let grades = vec![
            grade(1, 10, "Maths", 50.0, 100.0, Some(1)),
            grade(2, 10, "Biology Lab", 50.0, 100.0, Some(2)),
            grade(3, 10, "Music", 50.0, 100.0, Some(1)),
            grade(4, 11, "Mathematics", 50.0, 100.0, Some(1)),
            grade(5, 12, "Art", 50.0, 100.0, None),
        ];
        let orphans = find_orphan_grades(&grades, &approved, &courses, &enrollments, &HashMap::new());

        let found: Vec<(i64, OrphanReason)> = orphans.iter().map(|o| (o.grade_id, o.reason)).collect();
        assert_eq!(
            found,
            vec![
                (3, OrphanReason::UnmatchedSubject),
                (4, OrphanReason::UnmatchedSubject),
                (5, OrphanReason::NoEnrollment),
            ]
        );
    }

    #[test]
    fn test_configured_alias_rescues_grade() {
        let approved = vec![approved(1, 10, 1, "Literature", "9")];
        let grades = vec![grade(1, 10, "Lit", 8.0, 10.0, Some(1))];
        let mut aliases = HashMap::new();
        assert_eq!(find_orphan_grades(&grades, &approved, &[], &[], &aliases).len(), 1);
        aliases.insert("lit".to_string(), "literature".to_string());
        assert!(find_orphan_grades(&grades, &approved, &[], &[], &aliases).is_empty());
    }
}
