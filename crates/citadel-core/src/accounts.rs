//! Registration and login.

use crate::error::{require, AppError, Result};
use crate::models::{User, ANONYMOUS_USERNAME};
use crate::traits::{AuthProvider, UserRepo};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Accounts {
    users: Arc<dyn UserRepo>,
    auth: Arc<dyn AuthProvider>,
}

impl Accounts {
    pub fn new(users: Arc<dyn UserRepo>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { users, auth }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User> {
        require("username", username)?;
        require("password", password)?;
        if username == ANONYMOUS_USERNAME {
            return Err(AppError::Conflict("username already taken".into()));
        }

        let hash = self.auth.hash_password(password).await?;
        let user = self.users.insert_user(username, &hash).await?;
        info!(user_id = %user.id, username, "user registered");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let rejected = || AppError::Unauthorized("invalid username or password".into());
        require("username", username)?;
        require("password", password)?;
        // The shared identity carries an internal credential only.
        if username == ANONYMOUS_USERNAME {
            return Err(rejected());
        }

        let Some(stored) = self.users.find_credentials(username).await? else {
            return Err(rejected());
        };
        if !self.auth.verify_password(password, &stored.password_hash).await {
            warn!(username, "failed login");
            return Err(rejected());
        }
        Ok(stored.user)
    }
}
