use argon2::Argon2;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::{info, warn};

use henhouse_core::{merge_patch, new_id, now_rfc3339};
use henhouse_sql::Value;

use crate::model::{Claims, LoginRequest, RegisterUser, TokenResponse, UpdateProfile, User};
use crate::service::schema::USERS;
use crate::service::validate;
use crate::service::{FarmError, FarmService};

const MIN_PASSWORD_LEN: usize = 8;

impl FarmService {
    /// Register a new farmer account.
    pub fn register(&self, input: RegisterUser) -> Result<User, FarmError> {
        let email = normalize_email(&input.email)?;
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FarmError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        validate::optional_text("full_name", &input.full_name, 255)?;
        validate::optional_text("phone_number", &input.phone_number, 20)?;
        validate::optional_text("location", &input.location, 255)?;

        let password_hash = hash_password(&input.password)?;
        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            email,
            full_name: input.full_name,
            phone_number: input.phone_number,
            location: input.location,
            is_active: true,
            is_superuser: false,
            preferences: serde_json::json!({}),
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let indexes: Vec<(&str, Value)> = vec![
            ("email", Value::from(user.email.clone())),
            ("password_hash", Value::from(password_hash)),
            ("is_active", Value::from(true)),
            ("created_at", Value::from(now.clone())),
            ("updated_at", Value::from(now)),
        ];

        self.insert_record(USERS, &user.id, &user, &indexes)
            .map_err(|e| match e {
                FarmError::Conflict(_) => {
                    FarmError::Conflict("Email already registered".to_string())
                }
                other => other,
            })?;
        info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Verify credentials and issue an access token.
    pub fn login(&self, input: LoginRequest) -> Result<TokenResponse, FarmError> {
        let invalid = || FarmError::Unauthorized("Incorrect email or password".to_string());
        let email = input.email.trim().to_lowercase();

        let rows = self.sql.query(
            "SELECT data, password_hash FROM users WHERE email = ?1",
            &[Value::from(email.clone())],
        )?;
        let row = rows.first().ok_or_else(invalid)?;
        let hash = row.get_str("password_hash").ok_or_else(invalid)?;
        if !verify_password(&input.password, hash) {
            warn!(%email, "failed login attempt");
            return Err(invalid());
        }

        let data = row
            .get_str("data")
            .ok_or_else(|| FarmError::Internal("missing data column".into()))?;
        let user: User = serde_json::from_str(data)?;
        if !user.is_active {
            return Err(invalid());
        }

        self.issue_token(&user)
    }

    /// Sign a JWT for `user`.
    pub fn issue_token(&self, user: &User) -> Result<TokenResponse, FarmError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: now,
            exp: now + self.config.token_ttl,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| FarmError::Internal(format!("failed to sign token: {}", e)))?;

        Ok(TokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: self.config.token_ttl,
        })
    }

    /// Verify a JWT and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, FarmError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| FarmError::Unauthorized(format!("invalid token: {}", e)))?;
        Ok(data.claims)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: &str) -> Result<User, FarmError> {
        self.find_one(
            "SELECT data FROM users WHERE id = ?1",
            &[Value::from(id)],
        )?
        .ok_or_else(|| FarmError::NotFound("User not found".to_string()))
    }

    /// Resolve the user behind verified claims. Deleted users are
    /// unauthenticated and deactivated users are forbidden.
    pub fn current_user(&self, claims: &Claims) -> Result<User, FarmError> {
        let user = self.get_user(&claims.sub).map_err(|e| match e {
            FarmError::NotFound(_) => {
                FarmError::Unauthorized("Could not validate credentials".to_string())
            }
            other => other,
        })?;
        if !user.is_active {
            return Err(FarmError::Forbidden("Inactive user".to_string()));
        }
        Ok(user)
    }

    /// Update the caller's own profile.
    pub fn update_profile(&self, user_id: &str, input: UpdateProfile) -> Result<User, FarmError> {
        let mut user = self.get_user(user_id)?;

        if let Some(full_name) = input.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(phone_number) = input.phone_number {
            user.phone_number = Some(phone_number);
        }
        if let Some(location) = input.location {
            user.location = Some(location);
        }
        if let Some(patch) = input.preferences {
            if !patch.is_object() {
                return Err(FarmError::Validation("preferences must be an object".into()));
            }
            merge_patch(&mut user.preferences, &patch);
        }
        validate::optional_text("full_name", &user.full_name, 255)?;
        validate::optional_text("phone_number", &user.phone_number, 20)?;
        validate::optional_text("location", &user.location, 255)?;

        let now = now_rfc3339();
        user.updated_at = now.clone();
        self.update_record(
            USERS,
            &user.id,
            &user,
            &[
                ("is_active", Value::from(user.is_active)),
                ("updated_at", Value::from(now)),
            ],
        )?;
        Ok(user)
    }
}

fn normalize_email(raw: &str) -> Result<String, FarmError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.len() > 255 {
        return Err(FarmError::Validation(format!("'{}' is not a valid email address", raw)));
    }
    Ok(email)
}

fn hash_password(password: &str) -> Result<String, FarmError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| FarmError::Internal(format!("failed to hash password: {}", e)))
}

/// Verify a password against a stored argon2id PHC string.
fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil;

    #[test]
    fn test_register_and_login() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "Wanjiru@Example.com");
        assert_eq!(user.email, "wanjiru@example.com");
        assert!(user.is_active);

        let token = svc
            .login(LoginRequest {
                email: "wanjiru@example.com".into(),
                password: "correct-horse".into(),
            })
            .unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 604800);

        let claims = svc.verify_token(&token.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(svc.current_user(&claims).unwrap().id, user.id);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let svc = testutil::service();
        testutil::farmer(&svc, "a@example.com");
        let err = svc
            .register(RegisterUser {
                email: "A@example.com".into(),
                password: "another-pass".into(),
                full_name: None,
                phone_number: None,
                location: None,
            })
            .unwrap_err();
        assert!(matches!(err, FarmError::Conflict(_)));
    }

    #[test]
    fn test_register_validation() {
        let svc = testutil::service();
        let short = svc.register(RegisterUser {
            email: "b@example.com".into(),
            password: "short".into(),
            full_name: None,
            phone_number: None,
            location: None,
        });
        assert!(matches!(short, Err(FarmError::Validation(_))));

        let bad_email = svc.register(RegisterUser {
            email: "not-an-email".into(),
            password: "long-enough".into(),
            full_name: None,
            phone_number: None,
            location: None,
        });
        assert!(matches!(bad_email, Err(FarmError::Validation(_))));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let svc = testutil::service();
        testutil::farmer(&svc, "c@example.com");
        let err = svc
            .login(LoginRequest {
                email: "c@example.com".into(),
                password: "wrong-horse".into(),
            })
            .unwrap_err();
        assert!(matches!(err, FarmError::Unauthorized(_)));

        let err = svc
            .login(LoginRequest {
                email: "nobody@example.com".into(),
                password: "correct-horse".into(),
            })
            .unwrap_err();
        assert!(matches!(err, FarmError::Unauthorized(_)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "d@example.com");
        let token = svc.issue_token(&user).unwrap().access_token;
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(svc.verify_token(&tampered).is_err());
    }

    #[test]
    fn test_update_profile_merges_preferences() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "e@example.com");

        svc.update_profile(
            &user.id,
            UpdateProfile {
                preferences: Some(serde_json::json!({"theme": "dark", "units": "metric"})),
                ..Default::default()
            },
        )
        .unwrap();
        let updated = svc
            .update_profile(
                &user.id,
                UpdateProfile {
                    location: Some("Eldoret".into()),
                    preferences: Some(serde_json::json!({"theme": null})),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.location.as_deref(), Some("Eldoret"));
        assert_eq!(updated.full_name.as_deref(), Some("Test Farmer"));
        assert_eq!(updated.preferences, serde_json::json!({"units": "metric"}));
        assert_eq!(svc.get_user(&user.id).unwrap().location.as_deref(), Some("Eldoret"));
    }
}
