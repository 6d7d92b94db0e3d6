use std::fs;

use axum::{
    extract::{Form, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::auth::current_username;
use crate::errors::{AppError, AppResult};
use crate::models::NewCourseForm;
use crate::services::EnrollmentService;

// Admin pages sit behind the same session middleware; the role check
// happens here because the middleware only knows the username.
async fn require_admin(service: &EnrollmentService, session: &Session) -> AppResult<Option<String>> {
    let username = current_username(session).await?;
    let user = service
        .get_user(&username)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".into()))?;
    Ok(user.is_admin.then_some(username))
}

pub async fn serve_admin_page(
    State(service): State<EnrollmentService>,
    session: Session,
) -> AppResult<Response> {
    let Some(username) = require_admin(&service, &session).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    let courses = service.list_courses(&Default::default()).await?;

    let mut rows = Vec::with_capacity(courses.len());
    for course in &courses {
        let enrolled = service.enrolled_count(course.id).await?;
        rows.push(format!(
            r#"<tr>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{} / {}</td>
            </tr>"#,
            course.course_code,
            course.course_name,
            course.course_section,
            course.course_remain,
            enrolled,
            course.year,
            course.semester,
        ));
    }

    let admin_html = fs::read_to_string("templates/admin.html")?
        .replace("{{username}}", &username)
        .replace("{{courses}}", &rows.join("\n"));

    Ok(Html(admin_html).into_response())
}

pub async fn create_course(
    State(service): State<EnrollmentService>,
    session: Session,
    Form(form): Form<NewCourseForm>,
) -> AppResult<Response> {
    if require_admin(&service, &session).await?.is_none() {
        return Ok(Redirect::to("/").into_response());
    }

    let course_id = service.create_course(&form).await?;
    tracing::info!(
        "Created course {} - {} (id {}, {} seats)",
        form.course_code,
        form.course_name,
        course_id,
        form.course_remain
    );

    Ok(Redirect::to("/admin").into_response())
}
