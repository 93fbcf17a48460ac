use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role. Ordered by privilege, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Customer,
    Staff,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Staff => "STAFF",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }

    /// Kitchen and front-of-house roles that see every order
    pub fn is_staff(&self) -> bool {
        *self >= Role::Staff
    }

    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Role::Customer),
            "STAFF" => Ok(Role::Staff),
            "MANAGER" => Ok(Role::Manager),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: &str,
        phone: Option<String>,
        password_hash: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: normalize_email(email),
            phone,
            password_hash,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering_and_gates() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::Staff);
        assert!(Role::Staff > Role::Customer);

        assert!(Role::Staff.is_staff());
        assert!(!Role::Customer.is_staff());
        assert!(Role::Manager.can_manage());
        assert!(!Role::Staff.can_manage());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("MANAGER".parse::<Role>().unwrap(), Role::Manager);
        assert!("chef".parse::<Role>().is_err());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::new("Ada", " Ada@Example.COM ", None, "secret-hash".into(), Role::Customer);
        assert_eq!(user.email, "ada@example.com");

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "CUSTOMER");
        assert_eq!(json["isActive"], true);
    }
}
