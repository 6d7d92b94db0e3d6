use std::collections::HashSet;
use std::fs;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use tower_sessions::Session;

use super::auth::current_username;
use crate::errors::AppResult;
use crate::models::{Course, CourseFilter, Student};
use crate::services::EnrollmentService;

// Action cell for a listing row: withdraw when enrolled, enroll while a
// seat is left, plain text otherwise.
fn action_cell(course: &Course, enrolled: bool) -> String {
    if enrolled {
        format!(
            r#"<form method="post" action="/withdraw/{}"><button class="withdraw-btn">Withdraw</button></form>"#,
            course.id
        )
    } else if course.full {
        r#"<span class="full-tag">Full</span>"#.to_string()
    } else {
        format!(
            r#"<form method="post" action="/enroll/{}"><button class="enroll-btn">Enroll</button></form>"#,
            course.id
        )
    }
}

async fn enrolled_ids(
    service: &EnrollmentService,
    student: Option<&Student>,
) -> Result<HashSet<i64>, sqlx::Error> {
    match student {
        Some(student) => Ok(service
            .enrolled_courses(student.id)
            .await?
            .iter()
            .map(|c| c.id)
            .collect()),
        None => Ok(HashSet::new()),
    }
}

pub async fn serve_index(
    State(service): State<EnrollmentService>,
    session: Session,
    Query(filter): Query<CourseFilter>,
) -> AppResult<Response> {
    let username = current_username(&session).await?;
    tracing::debug!("Rendering course listing for {}", username);

    let student = service.get_student(&username).await?;
    let courses = service.list_courses(&filter).await?;
    let enrolled = enrolled_ids(&service, student.as_ref()).await?;

    let message = session.remove::<String>("flash").await.ok().flatten().unwrap_or_default();

    let rows = courses
        .iter()
        .map(|course| {
            format!(
                r#"<tr>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{} / {}</td>
                <td>{}</td>
                <td class="action-cell">{}</td>
            </tr>"#,
                course.course_code,
                course.course_name,
                course.course_credit,
                course.course_section,
                course.year,
                course.semester,
                course.course_remain,
                action_cell(course, enrolled.contains(&course.id)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let index_html = fs::read_to_string("templates/index.html")?
        .replace("{{username}}", &username)
        .replace("{{message}}", &message)
        .replace("{{year}}", filter.year.as_deref().unwrap_or(""))
        .replace("{{semester}}", filter.semester.as_deref().unwrap_or(""))
        .replace("{{courses}}", &rows);

    Ok(Html(index_html).into_response())
}

pub async fn serve_course_details(
    State(service): State<EnrollmentService>,
    session: Session,
) -> AppResult<Response> {
    let username = current_username(&session).await?;

    let student = service.get_student(&username).await?;
    let courses = service.list_courses(&CourseFilter::default()).await?;
    let enrolled = enrolled_ids(&service, student.as_ref()).await?;

    let rows = courses
        .iter()
        .map(|course| {
            format!(
                r#"<tr>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{} / {}</td>
                <td class="action-cell">{}</td>
            </tr>"#,
                course.course_code,
                course.course_name,
                course.course_detail,
                course.course_credit,
                course.course_section,
                course.year,
                course.semester,
                action_cell(course, enrolled.contains(&course.id)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let details_html = fs::read_to_string("templates/course_details.html")?
        .replace("{{username}}", &username)
        .replace("{{courses}}", &rows);

    Ok(Html(details_html).into_response())
}

/// The student's own enrollments with a credit total.
pub async fn serve_quota_status(
    State(service): State<EnrollmentService>,
    session: Session,
) -> AppResult<Response> {
    let username = current_username(&session).await?;

    let student = service.get_student(&username).await?;
    let courses = match &student {
        Some(student) => service.enrolled_courses(student.id).await?,
        None => Vec::new(),
    };
    let total_credits: i64 = courses.iter().map(|c| c.course_credit).sum();

    let rows = courses
        .iter()
        .map(|course| {
            format!(
                r#"<tr>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{} / {}</td>
                <td class="action-cell">
                    <form method="post" action="/withdraw/{}"><button class="withdraw-btn">Withdraw</button></form>
                </td>
            </tr>"#,
                course.course_code,
                course.course_name,
                course.course_credit,
                course.course_section,
                course.year,
                course.semester,
                course.id,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let status_html = fs::read_to_string("templates/quota_status.html")?
        .replace("{{username}}", &username)
        .replace("{{course_count}}", &courses.len().to_string())
        .replace("{{total_credits}}", &total_credits.to_string())
        .replace("{{courses}}", &rows);

    Ok(Html(status_html).into_response())
}

/// Every (year, semester) term with at least one course, each linking to
/// the filtered listing.
pub async fn serve_academic_year(
    State(service): State<EnrollmentService>,
    session: Session,
) -> AppResult<Response> {
    let username = current_username(&session).await?;

    let terms = service.academic_terms().await?;
    let rows = terms
        .iter()
        .map(|(year, semester)| {
            format!(
                r#"<tr>
                <td>{}</td>
                <td>{}</td>
                <td class="action-cell"><a href="/?year={}&semester={}" class="view-btn">View courses</a></td>
            </tr>"#,
                year, semester, year, semester,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let terms_html = fs::read_to_string("templates/academic_year.html")?
        .replace("{{username}}", &username)
        .replace("{{terms}}", &rows);

    Ok(Html(terms_html).into_response())
}
