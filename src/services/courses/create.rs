use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::CourseService;
use crate::middlewares::RequireJWT;
use crate::models::courses::requests::CreateCourseRequest;
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::teacher_subjects::invalidate_teacher_views;
use crate::utils::validate::validate_label;

/// 校验课程或申请中的科目、年级、方向
pub(crate) fn validate_course_labels(
    subject: &str,
    grade_level: &str,
    stream: Option<&str>,
) -> Result<(), String> {
    validate_label("subject", subject, 64)?;
    validate_label("grade_level", grade_level, 32)?;
    if let Some(stream) = stream.filter(|s| !s.trim().is_empty()) {
        validate_label("stream", stream, 32)?;
    }
    Ok(())
}

pub async fn create_course(
    service: &CourseService,
    course_data: CreateCourseRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };

    // 教师只能为自己建课，管理员必须指定教师
    let teacher_id = match (&current_user.role, course_data.teacher_id) {
        (UserRole::Teacher, None) => current_user.id,
        (UserRole::Teacher, Some(id)) if id == current_user.id => id,
        (UserRole::Admin, Some(id)) => id,
        (UserRole::Admin, None) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::CourseInvalid,
                "teacher_id is required",
            )));
        }
        _ => {
            return Ok(super::super::forbidden(
                ErrorCode::CoursePermissionDenied,
                "Only teachers can create their own courses",
            ));
        }
    };

    if let Err(msg) = validate_course_labels(
        &course_data.subject,
        &course_data.grade_level,
        course_data.stream.as_deref(),
    ) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::CourseInvalid, msg)));
    }

    let storage = service.get_storage(request)?;

    match storage.get_user_by_id(teacher_id).await {
        Ok(Some(teacher)) if teacher.role == UserRole::Teacher => {}
        Ok(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::CourseInvalid,
                "teacher_id must refer to a teacher",
            )));
        }
        Err(e) => return Ok(super::super::error_response(&e, ErrorCode::CourseCreationFailed)),
    }

    match storage.find_or_create_course(teacher_id, course_data).await {
        Ok((course, true)) => {
            info!(
                "Course {} created: {} / {} for teacher {}",
                course.id, course.subject, course.grade_level, teacher_id
            );
            invalidate_teacher_views(request, [teacher_id]).await;
            Ok(HttpResponse::Created().json(ApiResponse::success(course, "课程创建成功")))
        }
        Ok((course, false)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            course,
            "Matching course already exists",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::CourseCreationFailed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_course_labels() {
        assert!(validate_course_labels("Biology", "Grade 10", None).is_ok());
        assert!(validate_course_labels("Biology", "10", Some("Science")).is_ok());
        assert!(validate_course_labels("Biology", "10", Some("  ")).is_ok());
        assert!(validate_course_labels("", "10", None).is_err());
        let err = validate_course_labels("Biology", "10", Some("<b>")).expect_err("bad stream");
        assert!(err.starts_with("stream"));
    }

    #[actix_web::test]
    async fn test_find_or_create_over_http() {
        use crate::routes::configure_course_routes;
        use crate::services::test_app::{TestContext, bearer, init_app};
        use crate::storage::Storage;
        use crate::storage::sea_orm_storage::test_support::{storage, user};
        use actix_web::{http::StatusCode, test};

        let db = storage().await;
        let teacher = user(&db, "teacher", UserRole::Teacher).await;
        let student = user(&db, "student", UserRole::Student).await;
        let ctx = TestContext::new(db);
        let app = init_app!(ctx, configure_course_routes);

        let post = |user_id: i64, role: UserRole, body: serde_json::Value| {
            test::TestRequest::post()
                .uri("/api/v1/courses")
                .insert_header(bearer(user_id, role))
                .set_json(body)
                .to_request()
        };

        let body = serde_json::json!({"subject": "Biology", "grade_level": "Grade 10"});
        let first = test::call_service(&app, post(teacher, UserRole::Teacher, body)).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let first: serde_json::Value = test::read_body_json(first).await;

        // 科目大小写、空白与年级前缀不同，仍命中同一课程
        let body = serde_json::json!({"subject": " biology ", "grade_level": "10"});
        let repeat = test::call_service(&app, post(teacher, UserRole::Teacher, body)).await;
        assert_eq!(repeat.status(), StatusCode::OK);
        let repeat: serde_json::Value = test::read_body_json(repeat).await;
        assert_eq!(repeat["data"]["id"], first["data"]["id"]);
        assert_eq!(ctx.storage.list_courses(Some(teacher)).await.expect("courses").len(), 1);

        let body = serde_json::json!({"subject": "Art", "grade_level": "10"});
        let denied = test::call_service(&app, post(student, UserRole::Student, body)).await;
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }
}
