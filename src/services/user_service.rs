use crate::config::AuthConfig;
use crate::models::user::{Role, User, UserLoginRequest, UserLoginResponse, UserRegistrationRequest};
use crate::utils::error::{AppError, AppResult};
use crate::utils::jwt;
use bcrypt::{hash, verify, DEFAULT_COST};
use sqlx::MySqlPool;
use std::str::FromStr;

pub struct UserService {
    pool: MySqlPool,
    auth: AuthConfig,
}

impl UserService {
    pub fn new(pool: MySqlPool, auth: AuthConfig) -> Self {
        UserService { pool, auth }
    }

    // Register a new user
    pub async fn register_user(&self, request: UserRegistrationRequest) -> AppResult<i32> {
        // Check if email already exists
        let existing_user = sqlx::query("SELECT id FROM user WHERE email = ?")
            .bind(&request.email)
            .fetch_optional(&self.pool)
            .await?;

        if existing_user.is_some() {
            return Err(AppError::Conflict("Email already taken".into()));
        }

        // Hash password
        let hashed_password = hash(request.password.as_bytes(), DEFAULT_COST)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        // New accounts are always plain users, only an admin can promote
        let result = sqlx::query("INSERT INTO user (name, email, password, role) VALUES (?, ?, ?, ?)")
            .bind(&request.name)
            .bind(&request.email)
            .bind(&hashed_password)
            .bind(Role::User.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::DuplicateId(_) => AppError::Conflict("Email already taken".into()),
                other => other,
            })?;

        let user_id = result.last_insert_id() as i32;
        tracing::info!(user_id, "user registered");
        Ok(user_id)
    }

    // Login user
    pub async fn login_user(&self, request: UserLoginRequest) -> AppResult<UserLoginResponse> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, role FROM user WHERE email = ?",
        )
        .bind(&request.email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid credentials".into()))?;

        // Verify password
        let password_matches = verify(request.password.as_bytes(), &user.password)
            .map_err(|e| AppError::AuthError(e.to_string()))?;

        if !password_matches {
            return Err(AppError::AuthError("Invalid credentials".into()));
        }

        let role = Role::from_str(&user.role)
            .map_err(|_| AppError::AuthError(format!("Unknown role {}", user.role)))?;

        let access_token = jwt::generate_access_token(&self.auth, user.id, role)
            .map_err(|e| AppError::AuthError(e.to_string()))?;
        let refresh_token = jwt::generate_refresh_token(&self.auth, user.id, role)
            .map_err(|e| AppError::AuthError(e.to_string()))?;

        Ok(UserLoginResponse {
            access_token,
            refresh_token,
            user_id: user.id,
            role,
        })
    }

    // Exchange a refresh token for a fresh access token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<UserLoginResponse> {
        let claims = jwt::decode_refresh_token(&self.auth, refresh_token)
            .map_err(|e| AppError::AuthError(e.to_string()))?;

        // Pick up role changes made since the refresh token was issued
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM user WHERE id = ?")
            .bind(claims.sub)
            .fetch_optional(&self.pool)
            .await?;
        let role = role
            .and_then(|r| Role::from_str(&r).ok())
            .ok_or_else(|| AppError::AuthError("Unknown user".into()))?;

        let access_token = jwt::generate_access_token(&self.auth, claims.sub, role)
            .map_err(|e| AppError::AuthError(e.to_string()))?;

        Ok(UserLoginResponse {
            access_token,
            refresh_token: refresh_token.to_string(),
            user_id: claims.sub,
            role,
        })
    }

    pub async fn promote_to_admin(&self, user_id: i32) -> AppResult<()> {
        let current_role: Option<String> = sqlx::query_scalar("SELECT role FROM user WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match current_role.as_deref().map(Role::from_str) {
            None => return Err(AppError::NotFound(format!("User {}", user_id))),
            Some(Ok(Role::Admin)) => {
                return Err(AppError::Conflict("User is already an admin".into()))
            }
            _ => {}
        }

        sqlx::query("UPDATE user SET role = ? WHERE id = ?")
            .bind(Role::Admin.to_string())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id, "user promoted to admin");
        Ok(())
    }
}
