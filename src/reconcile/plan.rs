//! 对账计划
//!
//! 对比已批准申请与课程、选课记录，列出需要补建的课程与选课、
//! 重复课程组，以及已经没有意义的待审批申请。计划本身不做任何修改。

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::keys::{CourseIndex, CourseKey, GradeLevelKey, SubjectKey, most_common};
use crate::models::courses::entities::{Course, Enrollment};
use crate::models::enrollment_requests::entities::EnrollmentRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCourse {
    pub teacher_id: i64,
    pub subject: String,
    pub grade_level: String,
    pub stream: Option<String>,
    pub subject_key: SubjectKey,
    pub grade_level_key: GradeLevelKey,
    pub request_ids: Vec<i64>,
}

impl PlannedCourse {
    pub fn key(&self) -> CourseKey {
        CourseKey {
            subject: self.subject_key.clone(),
            grade_level: self.grade_level_key.clone(),
            teacher_id: self.teacher_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEnrollment {
    pub student_id: i64,
    pub teacher_id: i64,
    pub subject_key: SubjectKey,
    pub grade_level_key: GradeLevelKey,
    /// 规范课程；为 None 时课程需先按计划创建
    pub course_id: Option<i64>,
}

impl PlannedEnrollment {
    pub fn key(&self) -> CourseKey {
        CourseKey {
            subject: self.subject_key.clone(),
            grade_level: self.grade_level_key.clone(),
            teacher_id: self.teacher_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub teacher_id: i64,
    pub subject_key: SubjectKey,
    pub grade_level_key: GradeLevelKey,
    pub canonical_course_id: i64,
    pub duplicate_course_ids: Vec<i64>,
    /// 需要迁移到规范课程的选课记录
    pub enrollments_to_move: Vec<i64>,
    /// 学生已在规范课程中，合并时直接删除
    pub enrollments_to_drop: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub create_courses: Vec<PlannedCourse>,
    pub create_enrollments: Vec<PlannedEnrollment>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub stale_pending: Vec<i64>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.create_courses.is_empty()
            && self.create_enrollments.is_empty()
            && self.duplicate_groups.is_empty()
            && self.stale_pending.is_empty()
    }

    /// 涉及的教师，用于失效缓存
    pub fn affected_teachers(&self) -> BTreeSet<i64> {
        self.create_courses
            .iter()
            .map(|c| c.teacher_id)
            .chain(self.create_enrollments.iter().map(|e| e.teacher_id))
            .chain(self.duplicate_groups.iter().map(|g| g.teacher_id))
            .collect()
    }
}

/// 生成对账计划，`approved` 与 `pending` 中状态不符的记录由调用方保证不会混入
pub fn plan_reconciliation(
    approved: &[EnrollmentRequest],
    pending: &[EnrollmentRequest],
    courses: &[Course],
    enrollments: &[Enrollment],
) -> ReconciliationPlan {
    let index = CourseIndex::build(courses);

    let mut students_by_course: HashMap<i64, BTreeSet<i64>> = HashMap::new();
    let mut enrollments_by_course: HashMap<i64, Vec<&Enrollment>> = HashMap::new();
    for enrollment in enrollments {
        students_by_course
            .entry(enrollment.course_id)
            .or_default()
            .insert(enrollment.student_id);
        enrollments_by_course
            .entry(enrollment.course_id)
            .or_default()
            .push(enrollment);
    }
    let enrolled_in_any = |key: &CourseKey, student_id: i64| {
        index.matching(key).iter().any(|c| {
            students_by_course
                .get(&c.id)
                .is_some_and(|s| s.contains(&student_id))
        })
    };

    let mut sorted: Vec<&EnrollmentRequest> = approved.iter().collect();
    sorted.sort_by_key(|r| (r.created_at, r.id));
    let mut groups: BTreeMap<CourseKey, Vec<&EnrollmentRequest>> = BTreeMap::new();
    for request in sorted {
        if let Some(key) = CourseKey::new(&request.subject, &request.grade_level, request.teacher_id)
        {
            groups.entry(key).or_default().push(request);
        }
    }

    let mut plan = ReconciliationPlan::default();

    for (key, requests) in &groups {
        let canonical = index.canonical(key);
        if canonical.is_none() {
            let mut request_ids: Vec<i64> = requests.iter().map(|r| r.id).collect();
            request_ids.sort_unstable();
            plan.create_courses.push(PlannedCourse {
                teacher_id: key.teacher_id,
                subject: most_common(requests.iter().map(|r| r.subject.as_str()))
                    .unwrap_or_else(|| key.subject.to_string()),
                grade_level: most_common(requests.iter().map(|r| r.grade_level.as_str()))
                    .unwrap_or_else(|| key.grade_level.to_string()),
                stream: most_common(requests.iter().filter_map(|r| r.stream.as_deref())),
                subject_key: key.subject.clone(),
                grade_level_key: key.grade_level.clone(),
                request_ids,
            });
        }

        let students: BTreeSet<i64> = requests.iter().map(|r| r.student_id).collect();
        for student_id in students {
            if enrolled_in_any(key, student_id) {
                continue;
            }
            plan.create_enrollments.push(PlannedEnrollment {
                student_id,
                teacher_id: key.teacher_id,
                subject_key: key.subject.clone(),
                grade_level_key: key.grade_level.clone(),
                course_id: canonical.map(|c| c.id),
            });
        }
    }

    for (key, matching) in index.iter() {
        let [canonical, duplicates @ ..] = matching.as_slice() else {
            continue;
        };
        if duplicates.is_empty() {
            continue;
        }

        let mut seen: BTreeSet<i64> = students_by_course
            .get(&canonical.id)
            .cloned()
            .unwrap_or_default();
        let mut enrollments_to_move = Vec::new();
        let mut enrollments_to_drop = Vec::new();
        for duplicate in duplicates {
            let mut list = enrollments_by_course
                .get(&duplicate.id)
                .cloned()
                .unwrap_or_default();
            list.sort_by_key(|e| e.id);
            for enrollment in list {
                if seen.insert(enrollment.student_id) {
                    enrollments_to_move.push(enrollment.id);
                } else {
                    enrollments_to_drop.push(enrollment.id);
                }
            }
        }

        plan.duplicate_groups.push(DuplicateGroup {
            teacher_id: key.teacher_id,
            subject_key: key.subject.clone(),
            grade_level_key: key.grade_level.clone(),
            canonical_course_id: canonical.id,
            duplicate_course_ids: duplicates.iter().map(|c| c.id).collect(),
            enrollments_to_move,
            enrollments_to_drop,
        });
    }

    plan.stale_pending = pending
        .iter()
        .filter(|r| {
            CourseKey::new(&r.subject, &r.grade_level, r.teacher_id)
                .is_some_and(|key| enrolled_in_any(&key, r.student_id))
        })
        .map(|r| r.id)
        .collect();
    plan.stale_pending.sort_unstable();

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enrollment_requests::entities::EnrollmentRequestStatus;
    use crate::reconcile::fixtures::{approved, course, enrollment, request};

    fn pending(id: i64, student: i64, teacher: i64, subject: &str, grade: &str) -> EnrollmentRequest {
        request(id, student, teacher, subject, grade, EnrollmentRequestStatus::Pending)
    }

    #[test]
    fn test_in_sync_data_yields_empty_plan() {
        let approved = vec![approved(1, 10, 1, "Biology", "10")];
        let courses = vec![course(1, "biology", "Grade 10", 1)];
        let enrollments = vec![enrollment(1, 10, 1)];
        let plan = plan_reconciliation(&approved, &[], &courses, &enrollments);
        assert!(plan.is_empty());
        assert!(plan.affected_teachers().is_empty());
    }

    #[test]
    fn test_missing_course_is_planned_with_enrollments() {
        let mut first = approved(1, 10, 1, "Chemistry", "Grade 11");
        first.stream = Some("Science".to_string());
        let approved = vec![
            first,
            approved(2, 11, 1, "chemistry", "11"),
            approved(3, 12, 1, "chemistry", "11"),
        ];
        let plan = plan_reconciliation(&approved, &[], &[], &[]);

        assert_eq!(plan.create_courses.len(), 1);
        let planned = &plan.create_courses[0];
        assert_eq!(planned.subject, "chemistry");
        assert_eq!(planned.grade_level, "11");
        assert_eq!(planned.stream.as_deref(), Some("Science"));
        assert_eq!(planned.request_ids, vec![1, 2, 3]);

        let students: Vec<i64> = plan.create_enrollments.iter().map(|e| e.student_id).collect();
        assert_eq!(students, vec![10, 11, 12]);
        assert!(plan.create_enrollments.iter().all(|e| e.course_id.is_none()));
        assert!(plan.create_enrollments.iter().all(|e| e.key() == planned.key()));
        assert_eq!(plan.affected_teachers().into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_missing_enrollment_targets_canonical_course() {
        let approved = vec![
            approved(1, 10, 1, "Physics", "12"),
            approved(2, 11, 1, "Physics", "12"),
        ];
        let courses = vec![course(9, "Physics", "12", 1), course(4, "physics", "12", 1)];
        // 学生 10 选在重复课程里，不需要补选
        let enrollments = vec![enrollment(1, 10, 9)];
        let plan = plan_reconciliation(&approved, &[], &courses, &enrollments);

        assert!(plan.create_courses.is_empty());
        assert_eq!(plan.create_enrollments.len(), 1);
        assert_eq!(plan.create_enrollments[0].student_id, 11);
        assert_eq!(plan.create_enrollments[0].course_id, Some(4));
    }

    #[test]
    fn test_duplicate_groups_split_moves_and_drops() {
        let courses = vec![
            course(3, "History", "9", 2),
            course(5, "history", "Year 9", 2),
            course(8, "History ", "9", 2),
            course(6, "History", "9", 7),
        ];
        let enrollments = vec![
            enrollment(1, 20, 3),
            enrollment(2, 20, 5),
            enrollment(3, 21, 5),
            enrollment(4, 21, 8),
            enrollment(5, 22, 8),
        ];
        let plan = plan_reconciliation(&[], &[], &courses, &enrollments);

        assert_eq!(plan.duplicate_groups.len(), 1);
        let group = &plan.duplicate_groups[0];
        assert_eq!(group.teacher_id, 2);
        assert_eq!(group.canonical_course_id, 3);
        assert_eq!(group.duplicate_course_ids, vec![5, 8]);
        assert_eq!(group.enrollments_to_move, vec![3, 5]);
        assert_eq!(group.enrollments_to_drop, vec![2, 4]);
    }

    #[test]
    fn test_stale_pending_requests() {
        let courses = vec![course(1, "Art", "7", 3)];
        let enrollments = vec![enrollment(1, 30, 1)];
        let pending = vec![
            pending(5, 30, 3, "art", "Grade 7"),
            pending(4, 31, 3, "Art", "7"),
            pending(6, 30, 4, "Art", "7"),
        ];
        let plan = plan_reconciliation(&[], &pending, &courses, &enrollments);
        assert_eq!(plan.stale_pending, vec![5]);
    }
}
