use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::auth::current_username;
use crate::errors::{AppError, AppResult};
use crate::models::{EnrollOutcome, WithdrawOutcome};
use crate::services::EnrollmentService;

// Enrollment actions come from several pages, so they bounce back to
// wherever the form was submitted from.
fn redirect_back(headers: &HeaderMap) -> Redirect {
    let target = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("/");
    Redirect::to(target)
}

pub async fn enroll_course(
    State(service): State<EnrollmentService>,
    session: Session,
    Path(course_id): Path<i64>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let username = current_username(&session).await?;
    let student = service
        .get_student(&username)
        .await?
        .ok_or_else(|| AppError::Auth("No student profile for this account".into()))?;

    match service.enroll(student.id, course_id).await? {
        EnrollOutcome::Enrolled => {
            tracing::info!("Student {} enrolled in course {}", student, course_id);
        }
        EnrollOutcome::CourseFull => {
            // Silent no-op on a full course, the student just bounces back.
            tracing::info!("Course {} is full, enrollment skipped for {}", course_id, student);
        }
        EnrollOutcome::AlreadyEnrolled => {
            tracing::debug!("Student {} already enrolled in course {}", student, course_id);
        }
        EnrollOutcome::CourseNotFound => {
            return Err(AppError::NotFound(format!("Course {} not found", course_id)));
        }
    }

    Ok(redirect_back(&headers).into_response())
}

pub async fn withdraw_course(
    State(service): State<EnrollmentService>,
    session: Session,
    Path(course_id): Path<i64>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let username = current_username(&session).await?;
    let student = service
        .get_student(&username)
        .await?
        .ok_or_else(|| AppError::Auth("No student profile for this account".into()))?;

    match service.withdraw(student.id, course_id).await? {
        WithdrawOutcome::Withdrawn => {
            tracing::info!("Student {} withdrew from course {}", student, course_id);
        }
        WithdrawOutcome::NotEnrolled => {
            tracing::debug!("Student {} not enrolled in course {}", student, course_id);
        }
        WithdrawOutcome::CourseNotFound => {
            return Err(AppError::NotFound(format!("Course {} not found", course_id)));
        }
    }

    Ok(redirect_back(&headers).into_response())
}
