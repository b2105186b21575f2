use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use crate::security::{hash_password, verify_password, SecurityEvent, SecurityLogger};
use crate::store::Database;
use crate::text::sanitize;
use crate::types::{NewUser, User, UserPatch, UserRole};
use crate::{QuizError, Result};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

const BAD_CREDENTIALS: &str = "Incorrect email or password";

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if EMAIL.is_match(&email) {
        Ok(email)
    } else {
        Err(QuizError::validation(format!("'{}' is not a valid email address", email)))
    }
}

fn check_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(QuizError::validation("password must not be empty"));
    }
    Ok(())
}

fn user_not_found(id: Uuid) -> QuizError {
    QuizError::NotFound(format!("User with ID {} not found", id))
}

#[derive(Clone)]
pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.db.users().find_one(|u| u.email == email).await
    }

    pub async fn register(&self, input: NewUser) -> Result<User> {
        let email = normalize_email(&input.email)?;
        check_password(&input.password)?;
        let full_name = sanitize(&input.full_name);
        if full_name.is_empty() {
            return Err(QuizError::validation("full_name must not be empty"));
        }

        let _guard = self.db.write_guard().await;
        if self.find_by_email(&email).await?.is_some() {
            return Err(QuizError::Conflict(format!(
                "User with email '{}' already exists",
                email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            full_name,
            role: input.role,
            is_active: true,
            hashed_password: hash_password(&input.password)?,
            created_at: now,
            updated_at: Some(now),
        };
        self.db.users().insert(&user).await?;
        info!(user_id = %user.id, role = %user.role, "Registered user");
        Ok(user)
    }

    /// Checks credentials; unknown email and wrong password are indistinguishable.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let user = match self.find_by_email(&email).await? {
            Some(u) if verify_password(password, &u.hashed_password) => u,
            _ => {
                SecurityLogger::log_event(SecurityEvent::AuthenticationFailure {
                    email,
                    reason: "bad credentials".into(),
                });
                return Err(QuizError::Unauthorized(BAD_CREDENTIALS.into()));
            }
        };

        if !user.is_active {
            SecurityLogger::log_event(SecurityEvent::AuthenticationFailure {
                email,
                reason: "inactive account".into(),
            });
            return Err(QuizError::Unauthorized("Account is inactive".into()));
        }

        SecurityLogger::log_event(SecurityEvent::AuthenticationSuccess {
            user_id: user.id,
            role: user.role,
        });
        Ok(user)
    }

    pub async fn list(&self, role: Option<UserRole>, skip: usize, limit: usize) -> Result<Vec<User>> {
        let users = self
            .db
            .users()
            .find(|u| role.map_or(true, |r| u.role == r))
            .await?;
        Ok(users.into_iter().skip(skip).take(limit).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.db.users().get(id).await?.ok_or_else(|| user_not_found(id))
    }

    pub async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User> {
        let _guard = self.db.write_guard().await;
        let mut user = self.get(id).await?;

        if let Some(email) = patch.email {
            let email = normalize_email(&email)?;
            if email != user.email {
                if self.find_by_email(&email).await?.is_some() {
                    return Err(QuizError::Conflict(format!(
                        "User with email '{}' already exists",
                        email
                    )));
                }
                user.email = email;
            }
        }
        if let Some(name) = patch.full_name {
            user.full_name = sanitize(&name);
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        user.updated_at = Some(Utc::now());
        self.db.users().save(&user).await?;
        Ok(user)
    }

    pub async fn delete(&self, actor: Uuid, id: Uuid) -> Result<()> {
        let user = self.get(id).await?;
        if user.id == actor {
            return Err(QuizError::validation("Cannot delete your own account"));
        }
        self.db.users().delete(id).await?;
        SecurityLogger::log_event(SecurityEvent::AdminAction {
            user_id: actor,
            action: "delete_user".into(),
            target: id.to_string(),
        });
        Ok(())
    }

    pub async fn reset_password(&self, actor: Uuid, id: Uuid, new_password: &str) -> Result<()> {
        check_password(new_password)?;
        let mut user = self.get(id).await?;
        user.hashed_password = hash_password(new_password)?;
        user.updated_at = Some(Utc::now());
        self.db.users().save(&user).await?;
        SecurityLogger::log_event(SecurityEvent::AdminAction {
            user_id: actor,
            action: "reset_password".into(),
            target: id.to_string(),
        });
        Ok(())
    }

    /// Activates or deactivates an account; admins cannot deactivate themselves.
    pub async fn set_active(&self, actor: Uuid, id: Uuid, active: bool) -> Result<User> {
        let mut user = self.get(id).await?;
        if !active && user.id == actor {
            return Err(QuizError::validation("Cannot deactivate your own account"));
        }
        user.is_active = active;
        user.updated_at = Some(Utc::now());
        self.db.users().save(&user).await?;
        SecurityLogger::log_event(SecurityEvent::AdminAction {
            user_id: actor,
            action: if active { "activate_user" } else { "deactivate_user" }.into(),
            target: id.to_string(),
        });
        Ok(user)
    }

    /// Creates the admin account, or promotes and re-keys an existing one.
    /// Returns the user and whether it was newly created.
    pub async fn ensure_admin(&self, email: &str, password: &str, full_name: &str) -> Result<(User, bool)> {
        let email = normalize_email(email)?;
        check_password(password)?;

        if let Some(mut existing) = self.find_by_email(&email).await? {
            existing.role = UserRole::Admin;
            existing.is_active = true;
            existing.hashed_password = hash_password(password)?;
            existing.updated_at = Some(Utc::now());
            self.db.users().save(&existing).await?;
            info!(user_id = %existing.id, "Promoted existing user to admin");
            return Ok((existing, false));
        }

        let user = self
            .register(NewUser {
                email,
                full_name: full_name.to_string(),
                role: UserRole::Admin,
                password: password.to_string(),
            })
            .await?;
        Ok((user, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, role: UserRole) -> NewUser {
        NewUser {
            email: email.into(),
            full_name: "Ada Lovelace".into(),
            role,
            password: "correct horse".into(),
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let svc = UserService::new(Database::in_memory());
        let user = svc.register(new_user("Ada@Example.com", UserRole::Teacher)).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.hashed_password, "correct horse");

        let err = svc
            .register(new_user("ada@example.com", UserRole::Student))
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::Conflict(_)));
        assert!(svc.register(new_user("not-an-email", UserRole::Student)).await.is_err());
    }

    #[tokio::test]
    async fn authenticate_checks_password_and_activity() {
        let svc = UserService::new(Database::in_memory());
        let user = svc.register(new_user("ada@example.com", UserRole::Student)).await.unwrap();

        assert_eq!(
            svc.authenticate("ada@example.com", "wrong").await.unwrap_err().to_string(),
            "Incorrect email or password"
        );
        assert!(svc.authenticate("ada@example.com", "correct horse").await.is_ok());

        let admin = Uuid::new_v4();
        svc.set_active(admin, user.id, false).await.unwrap();
        assert_eq!(
            svc.authenticate("ada@example.com", "correct horse")
                .await
                .unwrap_err()
                .to_string(),
            "Account is inactive"
        );
    }

    #[tokio::test]
    async fn admins_cannot_remove_themselves() {
        let svc = UserService::new(Database::in_memory());
        let admin = svc.register(new_user("root@example.com", UserRole::Admin)).await.unwrap();
        assert_eq!(
            svc.delete(admin.id, admin.id).await.unwrap_err().to_string(),
            "Cannot delete your own account"
        );
        assert!(svc.set_active(admin.id, admin.id, false).await.is_err());
    }

    #[tokio::test]
    async fn list_filters_by_role() {
        let svc = UserService::new(Database::in_memory());
        svc.register(new_user("t@example.com", UserRole::Teacher)).await.unwrap();
        svc.register(new_user("s@example.com", UserRole::Student)).await.unwrap();
        let teachers = svc.list(Some(UserRole::Teacher), 0, 100).await.unwrap();
        assert_eq!(teachers.len(), 1);
        assert_eq!(svc.list(None, 1, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ensure_admin_promotes_existing_account() {
        let svc = UserService::new(Database::in_memory());
        svc.register(new_user("boss@example.com", UserRole::Teacher)).await.unwrap();
        let (user, created) = svc
            .ensure_admin("boss@example.com", "new-pass", "Boss")
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(user.role, UserRole::Admin);
        assert!(svc.authenticate("boss@example.com", "new-pass").await.is_ok());

        let (_, created) = svc.ensure_admin("fresh@example.com", "pw", "Fresh").await.unwrap();
        assert!(created);
    }
}
