mod admin;
mod auth;
mod courses;
mod enrollment;

pub use admin::{create_course, serve_admin_page};
pub use auth::{handle_login, handle_logout, handle_register, serve_login_page};
pub use courses::{serve_academic_year, serve_course_details, serve_index, serve_quota_status};
pub use enrollment::{enroll_course, withdraw_course};
