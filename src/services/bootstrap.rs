//! First-run setup: the initial administrator account.

use crate::auth::hash_password;
use crate::config::AdminConfig;
use crate::domain::user::normalize_email;
use crate::domain::{Role, User};
use crate::error::AppError;
use crate::store::Store;

/// What `ensure_admin` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBootstrap {
    /// No credentials configured
    Skipped,
    /// Account with that email already exists
    Exists,
    Created,
}

/// Create the configured administrator unless the email is already taken.
pub async fn ensure_admin(store: &dyn Store, config: &AdminConfig) -> Result<AdminBootstrap, AppError> {
    let (Some(email), Some(password)) = (config.email.as_deref(), config.password.as_deref()) else {
        return Ok(AdminBootstrap::Skipped);
    };
    if email.trim().is_empty() || password.len() < 8 {
        tracing::warn!("Admin bootstrap credentials are incomplete, skipping");
        return Ok(AdminBootstrap::Skipped);
    }

    let email = normalize_email(email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Ok(AdminBootstrap::Exists);
    }

    let name = config.name.clone().unwrap_or_else(|| "Administrator".to_string());
    let admin = User::new(name, &email, None, hash_password(password)?, Role::Admin);
    store.create_user(&admin).await?;

    tracing::info!(user_id = %admin.id, email = %admin.email, "Administrator account created");
    Ok(AdminBootstrap::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, UserStore};

    fn admin_config(password: &str) -> AdminConfig {
        AdminConfig {
            email: Some("Owner@Example.com".to_string()),
            password: Some(password.to_string()),
            name: None,
        }
    }

    #[tokio::test]
    async fn test_creates_admin_once() {
        let store = MemoryStore::new();
        let config = admin_config("super-secret");

        assert_eq!(ensure_admin(&store, &config).await.unwrap(), AdminBootstrap::Created);
        assert_eq!(ensure_admin(&store, &config).await.unwrap(), AdminBootstrap::Exists);

        let user = store.find_user_by_email("owner@example.com").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name, "Administrator");
    }

    #[tokio::test]
    async fn test_skips_without_credentials() {
        let store = MemoryStore::new();
        assert_eq!(
            ensure_admin(&store, &AdminConfig::default()).await.unwrap(),
            AdminBootstrap::Skipped
        );
        assert_eq!(
            ensure_admin(&store, &admin_config("short")).await.unwrap(),
            AdminBootstrap::Skipped
        );
    }
}
