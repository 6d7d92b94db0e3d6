mod course;
mod forms;
mod user;

pub use course::{Course, EnrollOutcome, WithdrawOutcome};
pub use forms::{CourseFilter, LoginForm, LoginPageQuery, NewCourseForm, RegisterForm};
pub use user::{Student, User};
