use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::user::{self, Model as UserModel};
use crate::entities::Role;
use crate::errors::ServiceError;
use crate::repositories::UserRepository;

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub is_active: bool,
    pub lang: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserModel> for UserView {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            phone: user.phone,
            is_active: user.is_active,
            lang: user.lang,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// Inserts a staff account with a freshly hashed password.
pub async fn create_user<C: ConnectionTrait>(
    conn: &C,
    new_user: NewUser,
) -> Result<UserModel, ServiceError> {
    let password_hash = hash_password(&new_user.password)?;
    UserRepository::new(conn)
        .insert(user::ActiveModel {
            username: Set(new_user.username),
            password_hash: Set(password_hash),
            full_name: Set(new_user.full_name),
            role: Set(new_user.role),
            phone: Set(new_user.phone),
            is_active: Set(true),
            lang: Set("ru".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
        .await
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Checks credentials. Unknown users, inactive users and wrong passwords
    /// all yield the same error.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserModel, ServiceError> {
        let db = &*self.db_pool;
        let rejected = || ServiceError::Unauthorized("Invalid username or password".to_string());

        let user = UserRepository::new(db)
            .find_by_username(username.trim())
            .await?
            .ok_or_else(rejected)?;

        if !user.is_active || !verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, "Login rejected");
            return Err(rejected());
        }

        info!(user_id = user.id, role = %user.role, "User logged in");
        Ok(user)
    }

    pub async fn get(&self, id: i32) -> Result<UserModel, ServiceError> {
        let db = &*self.db_pool;
        UserRepository::new(db)
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }
}
