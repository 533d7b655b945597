//! 测试用的记录构造函数

use chrono::{DateTime, Utc};

use crate::models::courses::entities::{Course, Enrollment};
use crate::models::enrollment_requests::entities::{EnrollmentRequest, EnrollmentRequestStatus};
use crate::models::grades::entities::{GradeType, StudentGrade};

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

pub fn course(id: i64, subject: &str, grade_level: &str, teacher_id: i64) -> Course {
    Course {
        id,
        subject: subject.to_string(),
        grade_level: grade_level.to_string(),
        stream: None,
        teacher_id,
        description: None,
        created_at: ts(1_700_000_000 + id),
        updated_at: ts(1_700_000_000 + id),
    }
}

pub fn enrollment(id: i64, student_id: i64, course_id: i64) -> Enrollment {
    Enrollment {
        id,
        student_id,
        course_id,
        enrolled_at: ts(1_700_000_000 + id),
    }
}

pub fn request(
    id: i64,
    student_id: i64,
    teacher_id: i64,
    subject: &str,
    grade_level: &str,
    status: EnrollmentRequestStatus,
) -> EnrollmentRequest {
    EnrollmentRequest {
        id,
        student_id,
        teacher_id,
        subject: subject.to_string(),
        grade_level: grade_level.to_string(),
        stream: None,
        family_id: None,
        status,
        note: None,
        review_comment: None,
        reviewed_by: None,
        reviewed_at: None,
        created_at: ts(1_700_000_000 + id),
        updated_at: ts(1_700_000_000 + id),
    }
}

pub fn approved(
    id: i64,
    student_id: i64,
    teacher_id: i64,
    subject: &str,
    grade_level: &str,
) -> EnrollmentRequest {
    request(
        id,
        student_id,
        teacher_id,
        subject,
        grade_level,
        EnrollmentRequestStatus::Approved,
    )
}

pub fn grade(
    id: i64,
    student_id: i64,
    subject: &str,
    score: f64,
    max_score: f64,
    graded_by: Option<i64>,
) -> StudentGrade {
    StudentGrade {
        id,
        student_id,
        subject: subject.to_string(),
        score,
        max_score,
        grade_type: GradeType::Assignment,
        title: None,
        comment: None,
        graded_by,
        created_at: ts(1_700_000_000 + id),
        updated_at: ts(1_700_000_000 + id),
    }
}
