use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub name: String,
    pub password: String,
    pub confirm_password: String,
}

// Query string of the login page: error text carried across a redirect
// and which pane (login or register) to show.
#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
    pub form: Option<String>,
}

/// Listing filter. Either field may be given alone; empty values are
/// treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilter {
    pub year: Option<String>,
    pub semester: Option<String>,
}

/// Course provisioning form on the admin page.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourseForm {
    pub course_code: String,
    pub course_name: String,
    pub course_detail: String,
    pub course_credit: i64,
    pub course_section: String,
    pub course_remain: i64,
    pub semester: String,
    pub year: String,
}
