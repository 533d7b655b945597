//! 教师科目视图
//!
//! 回答"这位教师实际在教哪些科目、教哪些学生、平均成绩如何"。
//! 以已批准的选课申请和教师名下的课程为来源，按 (科目, 年级) 分组，
//! 再把学生成绩按科目解析后归入各组。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::keys::{CourseIndex, CourseKey, GradeLevelKey, SubjectKey, most_common};
use super::resolver::SubjectResolver;
use super::scores::{ScoreAccumulator, ScoreSummary, percentage};
use crate::models::courses::entities::{Course, Enrollment};
use crate::models::enrollment_requests::entities::{EnrollmentRequest, EnrollmentRequestStatus};
use crate::models::grades::entities::{GradeType, StudentGrade};

pub struct TeacherViewInput<'a> {
    pub teacher_id: i64,
    pub requests: &'a [EnrollmentRequest],
    pub courses: &'a [Course],
    pub enrollments: &'a [Enrollment],
    pub grades: &'a [StudentGrade],
    pub prefer_own_grades: bool,
    pub subject_aliases: &'a HashMap<String, String>,
}

/// 分组来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectSource {
    RequestsOnly,
    CourseOnly,
    Both,
}

/// 三类记录之间的失配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncIssue {
    MissingCourse,
    DuplicateCourses { course_ids: Vec<i64> },
    MissingEnrollments { student_ids: Vec<i64> },
    // 仅提示：学生已选课但没有已批准的申请
    UnrequestedEnrollments { student_ids: Vec<i64> },
}

impl SyncIssue {
    pub fn is_blocking(&self) -> bool {
        !matches!(self, SyncIssue::UnrequestedEnrollments { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentScore {
    pub student_id: i64,
    pub requested: bool,
    pub enrolled: bool,
    pub grade_count: usize,
    pub average_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeTypeAverage {
    pub grade_type: GradeType,
    pub grade_count: usize,
    pub average_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherSubject {
    pub subject: String,
    pub subject_key: SubjectKey,
    pub grade_level: String,
    pub grade_level_key: GradeLevelKey,
    pub streams: Vec<String>,
    pub source: SubjectSource,
    // 规范课程（ID 最小者）
    pub course_id: Option<i64>,
    pub course_ids: Vec<i64>,
    pub approved_request_count: usize,
    pub student_count: usize,
    pub enrollment_count: usize,
    pub graded_student_count: usize,
    pub scores: ScoreSummary,
    pub by_grade_type: Vec<GradeTypeAverage>,
    pub students: Vec<StudentScore>,
    pub issues: Vec<SyncIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewTotals {
    pub subject_count: usize,
    pub student_count: usize,
    pub grade_count: usize,
    pub average_percentage: Option<f64>,
    pub issue_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherSubjectView {
    pub teacher_id: i64,
    pub subjects: Vec<TeacherSubject>,
    pub totals: ViewTotals,
    pub in_sync: bool,
}

struct Group<'a> {
    key: CourseKey,
    requests: Vec<&'a EnrollmentRequest>,
}

pub fn build_teacher_view(input: &TeacherViewInput<'_>) -> TeacherSubjectView {
    let teacher_id = input.teacher_id;
    let index = CourseIndex::build(input.courses.iter().filter(|c| c.teacher_id == teacher_id));

    let mut approved: Vec<&EnrollmentRequest> = input
        .requests
        .iter()
        .filter(|r| r.teacher_id == teacher_id && r.status == EnrollmentRequestStatus::Approved)
        .collect();
    approved.sort_by_key(|r| (r.created_at, r.id));

    let mut groups: BTreeMap<CourseKey, Group> = BTreeMap::new();
    for request in approved {
        let Some(key) = CourseKey::new(&request.subject, &request.grade_level, teacher_id) else {
            continue;
        };
        groups
            .entry(key.clone())
            .or_insert_with(|| Group {
                key,
                requests: Vec::new(),
            })
            .requests
            .push(request);
    }
    for (key, _) in index.iter() {
        groups.entry(key.clone()).or_insert_with(|| Group {
            key: key.clone(),
            requests: Vec::new(),
        });
    }

    // 每门课程的选课学生
    let mut enrolled_by_course: HashMap<i64, BTreeSet<i64>> = HashMap::new();
    let mut enrollment_count_by_course: HashMap<i64, usize> = HashMap::new();
    for (_, courses) in index.iter() {
        for course in courses {
            enrolled_by_course.entry(course.id).or_default();
        }
    }
    for enrollment in input.enrollments {
        if let Some(students) = enrolled_by_course.get_mut(&enrollment.course_id) {
            students.insert(enrollment.student_id);
            *enrollment_count_by_course
                .entry(enrollment.course_id)
                .or_default() += 1;
        }
    }

    // 成绩按学生分桶，科目解析到该教师的科目集合
    let resolver = SubjectResolver::new(groups.keys().map(|k| k.subject.clone()))
        .with_aliases(input.subject_aliases);
    let mut grades_by_student: HashMap<i64, Vec<(&StudentGrade, SubjectKey, f64)>> =
        HashMap::new();
    for grade in input.grades {
        let Some(pct) = percentage(grade.score, grade.max_score) else {
            continue;
        };
        if let Some(key) = resolver.resolve(&grade.subject).into_key() {
            grades_by_student
                .entry(grade.student_id)
                .or_default()
                .push((grade, key, pct));
        }
    }

    let mut subjects = Vec::with_capacity(groups.len());
    let mut all_students: BTreeSet<i64> = BTreeSet::new();
    let mut counted_grades: HashMap<i64, f64> = HashMap::new();

    for group in groups.values() {
        let matching = index.matching(&group.key);
        let course_ids: Vec<i64> = matching.iter().map(|c| c.id).collect();

        let requested: BTreeSet<i64> = group.requests.iter().map(|r| r.student_id).collect();
        let enrolled: BTreeSet<i64> = course_ids
            .iter()
            .filter_map(|id| enrolled_by_course.get(id))
            .flatten()
            .copied()
            .collect();
        let enrollment_count: usize = course_ids
            .iter()
            .filter_map(|id| enrollment_count_by_course.get(id))
            .sum();
        let students: BTreeSet<i64> = requested.union(&enrolled).copied().collect();

        let subject = most_common(group.requests.iter().map(|r| r.subject.as_str()))
            .or_else(|| matching.first().map(|c| c.subject.trim().to_string()))
            .unwrap_or_else(|| group.key.subject.to_string());
        let grade_level = most_common(group.requests.iter().map(|r| r.grade_level.as_str()))
            .or_else(|| matching.first().map(|c| c.grade_level.trim().to_string()))
            .unwrap_or_else(|| group.key.grade_level.to_string());
        let streams: Vec<String> = group
            .requests
            .iter()
            .filter_map(|r| r.stream.as_deref())
            .chain(matching.iter().filter_map(|c| c.stream.as_deref()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let source = match (group.requests.is_empty(), matching.is_empty()) {
            (false, true) => SubjectSource::RequestsOnly,
            (true, _) => SubjectSource::CourseOnly,
            (false, false) => SubjectSource::Both,
        };

        let mut group_acc = ScoreAccumulator::default();
        let mut type_acc: BTreeMap<GradeType, ScoreAccumulator> = BTreeMap::new();
        let mut student_scores = Vec::with_capacity(students.len());
        let mut graded_student_count = 0;

        for &student_id in &students {
            let candidates: Vec<&(&StudentGrade, SubjectKey, f64)> = grades_by_student
                .get(&student_id)
                .map(|list| {
                    list.iter()
                        .filter(|(_, key, _)| *key == group.key.subject)
                        .collect()
                })
                .unwrap_or_default();

            let chosen: Vec<&(&StudentGrade, SubjectKey, f64)> = if input.prefer_own_grades {
                let own: Vec<_> = candidates
                    .iter()
                    .copied()
                    .filter(|(g, _, _)| g.graded_by == Some(teacher_id))
                    .collect();
                if own.is_empty() { candidates } else { own }
            } else {
                candidates
            };

            let mut student_acc = ScoreAccumulator::default();
            for (grade, _, pct) in chosen {
                student_acc.push(*pct);
                group_acc.push(*pct);
                type_acc.entry(grade.grade_type).or_default().push(*pct);
                counted_grades.insert(grade.id, *pct);
            }
            if student_acc.count() > 0 {
                graded_student_count += 1;
            }

            student_scores.push(StudentScore {
                student_id,
                requested: requested.contains(&student_id),
                enrolled: enrolled.contains(&student_id),
                grade_count: student_acc.count(),
                average_percentage: student_acc.average(),
            });
        }

        let mut issues = Vec::new();
        if course_ids.is_empty() {
            issues.push(SyncIssue::MissingCourse);
        } else {
            if course_ids.len() > 1 {
                issues.push(SyncIssue::DuplicateCourses {
                    course_ids: course_ids.clone(),
                });
            }
            let missing: Vec<i64> = requested.difference(&enrolled).copied().collect();
            if !missing.is_empty() {
                issues.push(SyncIssue::MissingEnrollments {
                    student_ids: missing,
                });
            }
        }
        let unrequested: Vec<i64> = enrolled.difference(&requested).copied().collect();
        if !unrequested.is_empty() {
            issues.push(SyncIssue::UnrequestedEnrollments {
                student_ids: unrequested,
            });
        }

        all_students.extend(students.iter().copied());

        subjects.push(TeacherSubject {
            subject,
            subject_key: group.key.subject.clone(),
            grade_level,
            grade_level_key: group.key.grade_level.clone(),
            streams,
            source,
            course_id: course_ids.first().copied(),
            course_ids,
            approved_request_count: group.requests.len(),
            student_count: students.len(),
            enrollment_count,
            graded_student_count,
            scores: group_acc.summary(),
            by_grade_type: type_acc
                .into_iter()
                .map(|(grade_type, acc)| GradeTypeAverage {
                    grade_type,
                    grade_count: acc.count(),
                    average_percentage: acc.average(),
                })
                .collect(),
            students: student_scores,
            issues,
        });
    }

    subjects.sort_by(|a, b| {
        (a.subject.to_lowercase(), &a.grade_level_key)
            .cmp(&(b.subject.to_lowercase(), &b.grade_level_key))
    });

    let overall: ScoreAccumulator = counted_grades.values().copied().collect();
    let issue_count = subjects.iter().map(|s| s.issues.len()).sum();
    let in_sync = subjects
        .iter()
        .all(|s| s.issues.iter().all(|i| !i.is_blocking()));

    TeacherSubjectView {
        teacher_id,
        totals: ViewTotals {
            subject_count: subjects.len(),
            student_count: all_students.len(),
            grade_count: overall.count(),
            average_percentage: overall.average(),
            issue_count,
        },
        subjects,
        in_sync,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::fixtures::{approved, course, enrollment, grade, request};

    const TEACHER: i64 = 100;

    fn view(
        requests: &[EnrollmentRequest],
        courses: &[Course],
        enrollments: &[Enrollment],
        grades: &[StudentGrade],
    ) -> TeacherSubjectView {
        let aliases = HashMap::new();
        build_teacher_view(&TeacherViewInput {
            teacher_id: TEACHER,
            requests,
            courses,
            enrollments,
            grades,
            prefer_own_grades: true,
            subject_aliases: &aliases,
        })
    }

    #[test]
    fn test_groups_requests_by_subject_and_grade() {
        let requests = vec![
            approved(1, 10, TEACHER, "Biology", "Grade 10"),
            approved(2, 11, TEACHER, "biology", "10"),
            approved(3, 12, TEACHER, "Biology", "Grade 11"),
            request(4, 13, TEACHER, "Biology", "10", EnrollmentRequestStatus::Pending),
            approved(5, 14, 999, "Biology", "10"),
        ];
        let courses = vec![course(1, "Biology", "10", TEACHER), course(2, "Biology", "11", TEACHER)];
        let enrollments = vec![enrollment(1, 10, 1), enrollment(2, 11, 1), enrollment(3, 12, 2)];

        let v = view(&requests, &courses, &enrollments, &[]);
        assert_eq!(v.subjects.len(), 2);
        let g10 = &v.subjects[0];
        assert_eq!(g10.grade_level_key.as_str(), "10");
        assert_eq!(g10.subject, "Biology");
        assert_eq!(g10.approved_request_count, 2);
        assert_eq!(g10.student_count, 2);
        assert_eq!(g10.enrollment_count, 2);
        assert_eq!(g10.source, SubjectSource::Both);
        assert!(g10.issues.is_empty());
        assert_eq!(v.totals.student_count, 3);
        assert!(v.in_sync);
    }

    #[test]
    fn test_subjects_ordered_by_numeric_grade() {
        let requests = vec![
            approved(1, 10, TEACHER, "Maths", "Grade 10"),
            approved(2, 11, TEACHER, "Maths", "9"),
            approved(3, 12, TEACHER, "Maths", "12"),
        ];
        let v = view(&requests, &[], &[], &[]);
        let order: Vec<&str> = v.subjects.iter().map(|s| s.grade_level_key.as_str()).collect();
        assert_eq!(order, ["9", "10", "12"]);
    }

    #[test]
    fn test_display_name_prefers_most_common_spelling() {
        let requests = vec![
            approved(1, 10, TEACHER, "chemistry", "9"),
            approved(2, 11, TEACHER, "Chemistry", "9"),
            approved(3, 12, TEACHER, "Chemistry", "9"),
        ];
        let v = view(&requests, &[], &[], &[]);
        assert_eq!(v.subjects[0].subject, "Chemistry");
    }

    #[test]
    fn test_reports_missing_and_duplicate_courses() {
        let requests = vec![
            approved(1, 10, TEACHER, "Physics", "12"),
            approved(2, 11, TEACHER, "History", "12"),
        ];
        let courses = vec![
            course(8, "History", "12", TEACHER),
            course(4, "history", "Grade 12", TEACHER),
        ];
        let enrollments = vec![enrollment(1, 11, 8)];

        let v = view(&requests, &courses, &enrollments, &[]);
        let history = v.subjects.iter().find(|s| s.subject == "History").expect("history");
        assert_eq!(history.course_id, Some(4));
        assert_eq!(
            history.issues,
            vec![SyncIssue::DuplicateCourses {
                course_ids: vec![4, 8]
            }]
        );
        // 学生选在了重复课程里，仍算已选课
        assert!(history.students[0].enrolled);

        let physics = v.subjects.iter().find(|s| s.subject == "Physics").expect("physics");
        assert_eq!(physics.issues, vec![SyncIssue::MissingCourse]);
        assert_eq!(physics.source, SubjectSource::RequestsOnly);
        assert!(!v.in_sync);
        assert_eq!(v.totals.issue_count, 2);
    }

    #[test]
    fn test_missing_and_unrequested_enrollments() {
        let requests = vec![
            approved(1, 10, TEACHER, "English", "8"),
            approved(2, 11, TEACHER, "English", "8"),
        ];
        let courses = vec![course(1, "English", "8", TEACHER)];
        let enrollments = vec![enrollment(1, 10, 1), enrollment(2, 12, 1)];

        let v = view(&requests, &courses, &enrollments, &[]);
        let english = &v.subjects[0];
        assert_eq!(english.student_count, 3);
        assert!(english.issues.contains(&SyncIssue::MissingEnrollments {
            student_ids: vec![11]
        }));
        assert!(english.issues.contains(&SyncIssue::UnrequestedEnrollments {
            student_ids: vec![12]
        }));
        assert!(!v.in_sync);
    }

    #[test]
    fn test_course_only_group_is_informational() {
        let courses = vec![course(1, "Art", "7", TEACHER)];
        let enrollments = vec![enrollment(1, 20, 1)];
        let v = view(&[], &courses, &enrollments, &[]);
        assert_eq!(v.subjects[0].source, SubjectSource::CourseOnly);
        assert_eq!(v.subjects[0].student_count, 1);
        // 未申请的选课只是提示，不影响同步状态
        assert!(v.in_sync);
    }

    #[test]
    fn test_scores_prefer_own_grades_with_fallback() {
        let requests = vec![
            approved(1, 10, TEACHER, "Mathematics", "10"),
            approved(2, 11, TEACHER, "Mathematics", "10"),
        ];
        let courses = vec![course(1, "Mathematics", "10", TEACHER)];
        let enrollments = vec![enrollment(1, 10, 1), enrollment(2, 11, 1)];
        let grades = vec![
            // 学生 10：本人录入的成绩优先，忽略其他教师的
            grade(1, 10, "Maths", 80.0, 100.0, Some(TEACHER)),
            grade(2, 10, "mathematics", 10.0, 100.0, Some(555)),
            // 学生 11：没有本人录入的，回退到其他教师
            grade(3, 11, "Mathematics", 30.0, 50.0, Some(555)),
            // 其他科目与无效满分不计入
            grade(4, 11, "Music", 50.0, 50.0, Some(TEACHER)),
            grade(5, 11, "Mathematics", 5.0, 0.0, Some(TEACHER)),
        ];

        let v = view(&requests, &courses, &enrollments, &grades);
        let maths = &v.subjects[0];
        assert_eq!(maths.scores.grade_count, 2);
        assert_eq!(maths.scores.average_percentage, Some(70.0));
        assert_eq!(maths.scores.highest_percentage, Some(80.0));
        assert_eq!(maths.scores.lowest_percentage, Some(60.0));
        assert_eq!(maths.graded_student_count, 2);
        assert_eq!(maths.by_grade_type.len(), 1);
        assert_eq!(maths.students[0].average_percentage, Some(80.0));
        assert_eq!(maths.students[1].average_percentage, Some(60.0));
        assert_eq!(v.totals.grade_count, 2);
        assert_eq!(v.totals.average_percentage, Some(70.0));
    }

    #[test]
    fn test_without_preference_all_graders_count() {
        let requests = vec![approved(1, 10, TEACHER, "Geography", "9")];
        let courses = vec![course(1, "Geography", "9", TEACHER)];
        let enrollments = vec![enrollment(1, 10, 1)];
        let grades = vec![
            grade(1, 10, "Geo", 100.0, 100.0, Some(TEACHER)),
            grade(2, 10, "Geography", 50.0, 100.0, None),
        ];
        let aliases = HashMap::new();
        let v = build_teacher_view(&TeacherViewInput {
            teacher_id: TEACHER,
            requests: &requests,
            courses: &courses,
            enrollments: &enrollments,
            grades: &grades,
            prefer_own_grades: false,
            subject_aliases: &aliases,
        });
        assert_eq!(v.subjects[0].scores.average_percentage, Some(75.0));
    }

    #[test]
    fn test_streams_are_collected() {
        let mut a = approved(1, 10, TEACHER, "Physics", "11");
        a.stream = Some("Science".to_string());
        let mut b = approved(2, 11, TEACHER, "Physics", "11");
        b.stream = Some(" Science ".to_string());
        let mut c = course(1, "Physics", "11", TEACHER);
        c.stream = Some("Engineering".to_string());
        let v = view(&[a, b], &[c], &[], &[]);
        assert_eq!(
            v.subjects[0].streams,
            vec!["Engineering".to_string(), "Science".to_string()]
        );
    }

    #[test]
    fn test_empty_teacher() {
        let v = view(&[], &[], &[], &[]);
        assert!(v.subjects.is_empty());
        assert_eq!(v.totals, ViewTotals::default());
        assert!(v.in_sync);
    }
}
