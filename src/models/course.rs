use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A course offering for one (semester, year) term.
///
/// `course_remain` counts the remaining seats and never goes negative;
/// `full` holds exactly when `course_remain` is zero. Both are adjusted
/// together with the enrollment relationship inside one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub course_detail: String,
    pub course_credit: i64,
    pub course_section: String,
    pub course_remain: i64,
    pub full: bool,
    pub semester: String,
    pub year: String,
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.course_code, self.course_name)
    }
}

/// Result of an enrollment attempt. Everything except `Enrolled` leaves
/// the database untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled,
    CourseFull,
    AlreadyEnrolled,
    CourseNotFound,
}

/// Result of a withdrawal attempt. The seat counter moves only for
/// `Withdrawn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Withdrawn,
    NotEnrolled,
    CourseNotFound,
}
