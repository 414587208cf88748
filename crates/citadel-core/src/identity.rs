//! # Identity Resolver
//!
//! Maps display names to stable user identities. Unattributed actions land on a
//! single shared "Anonymous" identity, provisioned on first use. Provisioning
//! relies on the unique username constraint rather than in-process state, so
//! concurrent first uses (even across processes) converge on one row.

use crate::error::{require, AppError, Result};
use crate::models::{Author, User, ANONYMOUS_USERNAME};
use crate::traits::{AuthProvider, UserRepo};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};

pub struct IdentityResolver {
    users: Arc<dyn UserRepo>,
    auth: Arc<dyn AuthProvider>,
    /// Internal credential stored (hashed) on the Anonymous row; never used to log in
    anonymous_secret: SecretString,
}

impl IdentityResolver {
    pub fn new(
        users: Arc<dyn UserRepo>,
        auth: Arc<dyn AuthProvider>,
        anonymous_secret: SecretString,
    ) -> Self {
        Self {
            users,
            auth,
            anonymous_secret,
        }
    }

    /// Resolves the identity an action is attributed to.
    ///
    /// Blank names, the anonymous marker and unknown names all resolve to the
    /// shared Anonymous identity; this never fails with "user not found".
    pub async fn resolve(&self, display_name: &str) -> Result<User> {
        if display_name.trim().is_empty() || display_name == ANONYMOUS_USERNAME {
            return self.ensure_anonymous().await;
        }
        match self.users.find_user_by_name(display_name).await? {
            Some(user) => Ok(user),
            None => {
                debug!(username = display_name, "unknown user, attributing to anonymous");
                self.ensure_anonymous().await
            }
        }
    }

    /// Strict resolution for the update/delete authorization paths.
    /// Unrecognized acting names are rejected instead of falling back.
    pub async fn resolve_actor(&self, display_name: &str) -> Result<User> {
        require("username", display_name)?;
        self.users
            .find_user_by_name(display_name)
            .await?
            .ok_or_else(|| AppError::Forbidden(format!("unknown user '{display_name}'")))
    }

    /// Read-only lookup for viewers. Never provisions anything.
    pub async fn lookup(&self, display_name: &str) -> Result<Option<User>> {
        if display_name.trim().is_empty() {
            return Ok(None);
        }
        self.users.find_user_by_name(display_name).await
    }

    /// Returns the canonical Anonymous identity, creating it if absent.
    pub async fn ensure_anonymous(&self) -> Result<User> {
        if let Some(user) = self.users.find_user_by_name(ANONYMOUS_USERNAME).await? {
            return Ok(user);
        }
        let hash = self
            .auth
            .hash_password(self.anonymous_secret.expose_secret())
            .await?;
        // A concurrent caller may win the insert; ensure_user returns its row.
        let user = self.users.ensure_user(ANONYMOUS_USERNAME, &hash).await?;
        info!(user_id = %user.id, "anonymous identity provisioned");
        Ok(user)
    }
}

/// Authorship check for the update/delete paths. Identities are compared by
/// display name, not by ID.
pub(crate) fn ensure_author(author: &Author, actor: &User, action: &str) -> Result<()> {
    if author.username != actor.username {
        return Err(AppError::Forbidden(format!("only the author can {action}")));
    }
    Ok(())
}
