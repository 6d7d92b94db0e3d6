use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Login account. `is_admin` accounts land on the administrative page
/// instead of the course listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String, // bcrypt, never the plain text
    pub is_admin: bool,
    pub created_at: String,
}

/// Student profile, one per non-admin account. `username` mirrors the
/// login username (the student number).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub username: String,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.username, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_display() {
        let student = Student {
            id: 1,
            user_id: 1,
            name: "Somsak Saksom".to_string(),
            username: "6610681111".to_string(),
        };
        assert_eq!(student.to_string(), "6610681111 Somsak Saksom");
    }
}
