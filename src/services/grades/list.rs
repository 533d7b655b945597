use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::GradeService;
use crate::middlewares::RequireJWT;
use crate::models::grades::requests::{GradeListQuery, GradeQueryParams};
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};

pub async fn list_grades(
    service: &GradeService,
    query: GradeQueryParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(super::super::unauthorized());
    };
    let storage = service.get_storage(request)?;

    let mut list_query = GradeListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        student_id: query.student_id,
        subject: query.subject,
        grade_type: query.grade_type,
        graded_by: None,
    };

    // 学生只能看到自己的成绩
    if current_user.role == UserRole::Student {
        list_query.student_id = Some(current_user.id);
    }

    match storage.list_grades_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Grade list retrieved successfully",
        ))),
        Err(e) => Ok(super::super::error_response(&e, ErrorCode::InternalServerError)),
    }
}

#[cfg(test)]
mod tests {
    use crate::models::grades::{entities::GradeType, requests::CreateGradeRequest};
    use crate::models::users::entities::UserRole;
    use crate::routes::configure_grade_routes;
    use crate::services::test_app::{TestContext, bearer, init_app};
    use crate::storage::Storage;
    use crate::storage::sea_orm_storage::test_support::{storage, user};
    use actix_web::{http::StatusCode, test};

    fn grade(student_id: i64, subject: &str) -> CreateGradeRequest {
        CreateGradeRequest {
            student_id,
            subject: subject.to_string(),
            score: 15.0,
            max_score: 20.0,
            grade_type: GradeType::Exam,
            title: None,
            comment: None,
        }
    }

    #[actix_web::test]
    async fn test_students_list_only_their_own_grades() {
        let db = storage().await;
        let teacher = user(&db, "teacher", UserRole::Teacher).await;
        let s1 = user(&db, "s1", UserRole::Student).await;
        let s2 = user(&db, "s2", UserRole::Student).await;
        db.create_grade(teacher, grade(s1, "History")).await.expect("grade");
        db.create_grade(teacher, grade(s2, "History")).await.expect("grade");
        db.create_grade(teacher, grade(s2, "Physics")).await.expect("grade");
        let ctx = TestContext::new(db);
        let app = init_app!(ctx, configure_grade_routes);

        let list = |uri: String, user_id: i64, role: UserRole| {
            test::TestRequest::get()
                .uri(&uri)
                .insert_header(bearer(user_id, role))
                .to_request()
        };
        let student_ids = |body: &serde_json::Value| -> Vec<i64> {
            body["data"]["items"]
                .as_array()
                .map(|items| items.iter().filter_map(|g| g["student_id"].as_i64()).collect())
                .unwrap_or_default()
        };

        // 学生传入别人的 student_id 也只能拿到自己的成绩
        for uri in ["/api/v1/grades".to_string(), format!("/api/v1/grades?student_id={s2}")] {
            let resp = test::call_service(&app, list(uri, s1, UserRole::Student)).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(student_ids(&body), vec![s1]);
        }

        let req = list("/api/v1/grades".to_string(), teacher, UserRole::Teacher);
        let resp = test::call_service(&app, req).await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(student_ids(&body).len(), 3);
    }
}
