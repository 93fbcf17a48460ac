use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::JwtConfig;
use crate::domain::User;
use crate::error::AppError;

use super::Claims;

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    audience: Option<String>,
    expiration_hours: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::default();

        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = config.audience {
            validation.set_audience(&[audience]);
        }

        Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiration_hours: config.expiration_hours,
        }
    }

    /// Issue a signed token for the given user.
    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            exp: (now + Duration::hours(self.expiration_hours)).timestamp(),
            iat: now.timestamp(),
            roles: vec![user.role.as_str().to_string()],
            email: Some(user.email.clone()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn create_test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            issuer: None,
            audience: None,
            expiration_hours: 1,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let service = JwtService::new(&create_test_config());
        let user = User::new("Ada", "ada@example.com", None, "hash".to_string(), Role::Manager);

        let token = service.issue(&user).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert!(claims.has_role("MANAGER"));
        assert_eq!(claims.parsed_roles(), vec![Role::Manager]);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_issuer_and_audience_round_trip() {
        let config = JwtConfig {
            issuer: Some("food-order".to_string()),
            audience: Some("food-order-clients".to_string()),
            ..create_test_config()
        };
        let service = JwtService::new(&config);
        let user = User::new("Bo", "bo@example.com", None, "hash".to_string(), Role::Customer);

        let token = service.issue(&user).unwrap();
        assert!(service.validate(&token).is_ok());

        // A validator expecting a different issuer rejects it
        let other = JwtService::new(&JwtConfig {
            issuer: Some("someone-else".to_string()),
            ..config
        });
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new(&create_test_config());
        assert!(service.validate("invalid-token").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = JwtService::new(&create_test_config());
        let user = User::new("Cy", "cy@example.com", None, "hash".to_string(), Role::Customer);
        let token = service.issue(&user).unwrap();

        let other = JwtService::new(&JwtConfig {
            secret: "another-secret".to_string(),
            ..create_test_config()
        });
        assert!(other.validate(&token).is_err());
    }
}
