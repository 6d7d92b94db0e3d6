use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use std::fs;
use tower_sessions::Session;

use crate::errors::{AppError, AppResult};
use crate::models::{LoginForm, LoginPageQuery, RegisterForm};
use crate::services::EnrollmentService;

/// Pulls the logged-in username out of the session. The auth middleware
/// guarantees the key exists on protected routes.
pub(crate) async fn current_username(session: &Session) -> Result<String, AppError> {
    session
        .get::<String>("user_session")
        .await
        .map_err(|e| AppError::Auth(format!("Session error: {}", e)))?
        .ok_or_else(|| AppError::Auth("Not authenticated".into()))
}

fn render_login(template: &str, error: &str, message: &str, pane: &str) -> Html<String> {
    Html(
        template
            .replace("{{error}}", error)
            .replace("{{message}}", message)
            .replace("{{pane}}", pane),
    )
}

pub async fn serve_login_page(
    session: Session,
    Query(query): Query<LoginPageQuery>,
) -> AppResult<Response> {
    let template = fs::read_to_string("templates/login.html")?;

    // One-shot flash left by registration or logout.
    let message = session.remove::<String>("flash").await.ok().flatten().unwrap_or_default();
    let error = query.error.unwrap_or_default();
    let pane = match query.form.as_deref() {
        Some("register") => "register",
        _ => "login",
    };

    Ok(render_login(&template, &error, &message, pane).into_response())
}

#[axum::debug_handler]
pub async fn handle_login(
    State(service): State<EnrollmentService>,
    session: Session,
    Form(login_form): Form<LoginForm>,
) -> AppResult<Response> {
    tracing::info!("Login attempt for user: {}", login_form.username);

    if let Some(user) = service.get_user(&login_form.username).await? {
        let password_ok = verify(&login_form.password, &user.password_hash)
            .map_err(|e| AppError::Auth(format!("Password check failed: {}", e)))?;

        if password_ok {
            session
                .insert("user_session", user.username.clone())
                .await
                .map_err(|e| AppError::Auth(format!("Session error: {}", e)))?;

            if user.is_admin {
                tracing::info!("Admin {} logged in", user.username);
                return Ok(Redirect::to("/admin").into_response());
            }

            tracing::info!("Student {} logged in", user.username);
            session
                .insert("flash", "Login successful!".to_string())
                .await
                .map_err(|e| AppError::Auth(format!("Session error: {}", e)))?;
            return Ok(Redirect::to("/").into_response());
        }

        tracing::info!("Invalid password for user: {}", login_form.username);
    } else {
        tracing::info!("Unknown username: {}", login_form.username);
    }

    // Stay on the login form, plain 200 with the message inline.
    let template = fs::read_to_string("templates/login.html")?;
    Ok(render_login(&template, "Invalid username or password.", "", "login").into_response())
}

pub async fn handle_register(
    State(service): State<EnrollmentService>,
    session: Session,
    Form(register_form): Form<RegisterForm>,
) -> AppResult<Response> {
    if register_form.password != register_form.confirm_password {
        return Ok(register_error("Passwords don't match").into_response());
    }

    if service.get_user(&register_form.username).await?.is_some() {
        return Ok(register_error("Username already taken").into_response());
    }

    let password_hash = hash(register_form.password.as_bytes(), DEFAULT_COST)
        .map_err(|e| AppError::Auth(format!("Password hashing failed: {}", e)))?;

    let student = service
        .register_student(&register_form.username, &register_form.name, &password_hash)
        .await?;
    tracing::info!("Registered student {}", student);

    session
        .insert("flash", "Registration successful! Please login".to_string())
        .await
        .map_err(|e| AppError::Auth(format!("Session error: {}", e)))?;
    Ok(Redirect::to("/login").into_response())
}

fn register_error(msg: &str) -> Redirect {
    Redirect::to(&format!("/login?error={}&form=register", urlencoding::encode(msg)))
}

#[axum::debug_handler]
pub async fn handle_logout(session: Session) -> Response {
    if let Err(e) = session.remove::<String>("user_session").await {
        tracing::warn!("Session removal error: {}", e);
    }
    Redirect::to("/login").into_response()
}
