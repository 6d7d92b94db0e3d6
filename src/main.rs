mod models;
mod handlers;
mod services;
mod middleware;
mod config;
mod errors;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_sessions::cookie::SameSite;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::{config::Config, services::EnrollmentService};

#[tokio::main]
async fn main() {
    // Initialize basic tracing subscriber
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::load().expect("Failed to load configuration");

    // Open the database and run migrations
    let service = EnrollmentService::connect(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to initialize database");

    // Make sure the provisioning account exists
    service
        .ensure_admin(&config.admin.username, &config.admin.password)
        .await
        .expect("Failed to provision admin account");

    let app = build_router(service);

    println!("Server running");
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
        .await
        .expect("Failed to bind server");

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Failed to start server");
}

fn build_router(service: EnrollmentService) -> Router {
    // Session store setup
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_name("session");

    Router::new()
        // Auth routes
        .route("/login", get(handlers::serve_login_page).post(handlers::handle_login))
        .route("/register", post(handlers::handle_register))
        .route("/logout", get(handlers::handle_logout))
        // Course pages
        .route("/", get(handlers::serve_index))
        .route("/course-details", get(handlers::serve_course_details))
        .route("/quota-status", get(handlers::serve_quota_status))
        .route("/academic-year", get(handlers::serve_academic_year))
        // Enrollment actions
        .route("/enroll/:course_id", post(handlers::enroll_course))
        .route("/withdraw/:course_id", post(handlers::withdraw_course))
        // Admin
        .route("/admin", get(handlers::serve_admin_page))
        .route("/admin/courses", post(handlers::create_course))
        // Static files
        .nest_service("/static", ServeDir::new("static"))
        // Add middleware
        .layer(from_fn(middleware::require_auth))
        .layer(session_layer)
        // Add state
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::models::NewCourseForm;

    async fn test_app() -> (Router, EnrollmentService, i64) {
        let service = EnrollmentService::connect("sqlite::memory:", 1).await.unwrap();
        service.ensure_admin("admin", "adminpass").await.unwrap();

        let password_hash = bcrypt::hash("test123", bcrypt::DEFAULT_COST).unwrap();
        service
            .register_student("6610681111", "Somsak Saksom", &password_hash)
            .await
            .unwrap();

        let course_id = service
            .create_course(&NewCourseForm {
                course_code: "CN543".to_string(),
                course_name: "Java master".to_string(),
                course_detail: "Learn about java".to_string(),
                course_credit: 3,
                course_section: "111000".to_string(),
                course_remain: 40,
                semester: "1".to_string(),
                year: "2700".to_string(),
            })
            .await
            .unwrap();
        service
            .create_course(&NewCourseForm {
                course_code: "EL070".to_string(),
                course_name: "English basics".to_string(),
                course_detail: "Reading and writing".to_string(),
                course_credit: 3,
                course_section: "111001".to_string(),
                course_remain: 10,
                semester: "2".to_string(),
                year: "2699".to_string(),
            })
            .await
            .unwrap();

        (build_router(service.clone()), service, course_id)
    }

    async fn post_login(app: &Router, username: &str, password: &str) -> Response<Body> {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(format!("username={}&password={}", username, password)))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    // The session cookie from a login response, ready to send back.
    fn session_cookie(response: &Response<Body>) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login should set a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    fn location(response: &Response<Body>) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .expect("response should be a redirect")
            .to_str()
            .unwrap()
    }

    async fn get_with_cookie(app: &Router, uri: &str, cookie: &str) -> Response<Body> {
        app.clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn post_with_cookie(app: &Router, uri: &str, cookie: &str) -> Response<Body> {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn student_cookie(app: &Router) -> String {
        let response = post_login(app, "6610681111", "test123").await;
        session_cookie(&response)
    }

    #[tokio::test]
    async fn test_login_page_renders() {
        let (app, _, _) = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_index_requires_login() {
        let (app, _, _) = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_valid_login_redirects_and_flashes() {
        let (app, _, _) = test_app().await;

        let response = post_login(&app, "6610681111", "test123").await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
        let cookie = session_cookie(&response);

        let response = get_with_cookie(&app, "/", &cookie).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Login successful!"));
        assert!(body.contains("CN543"));

        // The flash is one-shot.
        let response = get_with_cookie(&app, "/", &cookie).await;
        let body = body_text(response).await;
        assert!(!body.contains("Login successful!"));
    }

    #[tokio::test]
    async fn test_invalid_login_stays_on_the_form() {
        let (app, _, _) = test_app().await;

        let response = post_login(&app, "wrong_user", "wrong_pass").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Invalid username or password."));

        let response = post_login(&app, "6610681111", "wrong_pass").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Invalid username or password."));
    }

    #[tokio::test]
    async fn test_admin_login_redirects_to_admin() {
        let (app, _, _) = test_app().await;
        let response = post_login(&app, "admin", "adminpass").await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/admin");
    }

    #[tokio::test]
    async fn test_index_filters_by_term() {
        let (app, _, _) = test_app().await;
        let cookie = student_cookie(&app).await;

        let response = get_with_cookie(&app, "/?year=2700&semester=1", &cookie).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("CN543"));
        assert!(!body.contains("EL070"));
    }

    #[tokio::test]
    async fn test_enroll_and_withdraw_round_trip() {
        let (app, service, course_id) = test_app().await;
        let cookie = student_cookie(&app).await;

        let response = post_with_cookie(&app, &format!("/enroll/{}", course_id), &cookie).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");

        let course = service.get_course(course_id).await.unwrap().unwrap();
        assert_eq!(course.course_remain, 39);
        assert!(!course.full);

        let response = get_with_cookie(&app, "/quota-status", &cookie).await;
        let body = body_text(response).await;
        assert!(body.contains("CN543"));

        let response = post_with_cookie(&app, &format!("/withdraw/{}", course_id), &cookie).await;
        assert!(response.status().is_redirection());

        let course = service.get_course(course_id).await.unwrap().unwrap();
        assert_eq!(course.course_remain, 40);

        let response = get_with_cookie(&app, "/quota-status", &cookie).await;
        let body = body_text(response).await;
        assert!(!body.contains("CN543"));
    }

    #[tokio::test]
    async fn test_enroll_redirects_to_the_referring_page() {
        let (app, _, course_id) = test_app().await;
        let cookie = student_cookie(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/enroll/{}", course_id))
                    .header(header::COOKIE, &cookie)
                    .header(header::REFERER, "/course-details")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/course-details");
    }

    #[tokio::test]
    async fn test_enroll_unknown_course_is_not_found() {
        let (app, _, _) = test_app().await;
        let cookie = student_cookie(&app).await;

        let response = post_with_cookie(&app, "/enroll/999", &cookie).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_page_rejects_students() {
        let (app, _, _) = test_app().await;
        let cookie = student_cookie(&app).await;

        let response = get_with_cookie(&app, "/admin", &cookie).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_admin_provisions_a_course() {
        let (app, service, _) = test_app().await;
        let response = post_login(&app, "admin", "adminpass").await;
        let cookie = session_cookie(&response);

        let response = get_with_cookie(&app, "/admin", &cookie).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("CN543"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/courses")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "course_code=CN510&course_name=Networks&course_detail=Packets\
                         &course_credit=3&course_section=111002&course_remain=25\
                         &semester=1&year=2700",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/admin");

        let courses = service.list_courses(&Default::default()).await.unwrap();
        assert_eq!(courses.len(), 3);
        assert!(courses.iter().any(|c| c.course_code == "CN510" && c.course_remain == 25));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (app, service, _) = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "username=6610682222&name=Somying+Yingsom&password=test234&confirm_password=test234",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login");

        let student = service.get_student("6610682222").await.unwrap().unwrap();
        assert_eq!(student.name, "Somying Yingsom");

        let response = post_login(&app, "6610682222", "test234").await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let (app, service, _) = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "username=6610683333&name=Nobody&password=abc&confirm_password=xyz",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert!(location(&response).starts_with("/login?error="));
        assert!(service.get_user("6610683333").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_drops_the_session() {
        let (app, _, _) = test_app().await;
        let cookie = student_cookie(&app).await;

        let response = get_with_cookie(&app, "/logout", &cookie).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login");

        let response = get_with_cookie(&app, "/", &cookie).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_academic_year_lists_terms() {
        let (app, _, _) = test_app().await;
        let cookie = student_cookie(&app).await;

        let response = get_with_cookie(&app, "/academic-year", &cookie).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("2700"));
        assert!(body.contains("2699"));
    }
}
