//! User profiles, sessions and privileges.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::cache::SessionStore;
use crate::error::{AppError, AppResult};
use crate::models::{Privilege, Privileges, User};
use crate::store::UserStore;

/// Name given to users added by email before they ever log in.
pub const PLACEHOLDER_NAME: &str = "CHANGE ME";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddUserForm {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    Created,
    /// A user with that email existed and now belongs to this login.
    Overridden,
}

impl ProfileOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ProfileOutcome::Created => "Account created successfully.",
            ProfileOutcome::Overridden => "Account with this email already exists.  Overridden.",
        }
    }
}

/// Rejects anonymous callers and callers without `privilege`.
pub fn authorize(user: Option<&User>, privilege: Privilege) -> AppResult<&User> {
    let user = user.ok_or(AppError::Unauthorized)?;
    if !user.has_privilege(privilege) {
        warn!("User {} lacks the {} privilege", user.email, privilege);
        return Err(AppError::Forbidden(privilege.to_string()));
    }
    Ok(user)
}

pub fn require_login(user: Option<&User>) -> AppResult<&User> {
    user.ok_or(AppError::Unauthorized)
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { users, sessions }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// The user behind a session token. Unknown, expired and not-yet-profiled
    /// logins all come back as anonymous.
    pub async fn resolve_current_user(&self, token: Option<&str>) -> AppResult<Option<User>> {
        let Some(token) = token else {
            return Ok(None);
        };
        let Some(external_id) = self.sessions.resolve(token).await? else {
            return Ok(None);
        };
        self.users.get_by_external_id(&external_id).await
    }

    /// Opens a session for an identity the SSO provider has vouched for.
    pub async fn login(&self, external_id: &str) -> AppResult<String> {
        self.sessions.create(external_id).await
    }

    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.sessions.destroy(token).await
    }

    /// Registers the profile for the identity logged in under `token`.
    pub async fn create_profile(&self, token: &str, form: &ProfileForm) -> AppResult<(User, ProfileOutcome)> {
        form.validate()?;
        let external_id = self
            .sessions
            .resolve(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        // An identity keeps a single profile; submitting again updates it
        let by_email = self.users.get_by_email(&form.email).await?;
        let (mut user, outcome) = match self.users.get_by_external_id(&external_id).await? {
            Some(mine) => {
                if by_email.as_ref().is_some_and(|other| other.id != mine.id) {
                    return Err(AppError::Validation(format!(
                        "email {} belongs to another account",
                        form.email
                    )));
                }
                (mine, ProfileOutcome::Overridden)
            }
            None => match by_email {
                Some(existing) => (existing, ProfileOutcome::Overridden),
                None => (User::new(&form.name, &form.email), ProfileOutcome::Created),
            },
        };
        user.external_id = Some(external_id);
        user.name = form.name.clone();
        user.email = form.email.clone();
        if form.image_url.is_some() {
            user.image_url = form.image_url.clone();
        }
        self.users.save(&user).await?;

        info!("Profile for {}: {:?}", user.email, outcome);
        Ok((user, outcome))
    }

    pub async fn add_user(&self, form: &AddUserForm) -> AppResult<User> {
        form.validate()?;
        let user = User::new(PLACEHOLDER_NAME, &form.email);
        self.users.save(&user).await?;
        info!("Pre-registered {}", user.email);
        Ok(user)
    }

    /// Deletes the user with `email`. Returns `true` when that was the
    /// caller, whose session is then closed too.
    pub async fn remove_user(&self, email: &str, current: &User, token: &str) -> AppResult<bool> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user with email {}", email)))?;
        self.users.delete(user.id).await?;
        info!("Removed user {}", email);

        if user.id == current.id {
            self.sessions.destroy(token).await?;
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn set_level(&self, user: &User, level: u8) -> AppResult<User> {
        let mut user = user.clone();
        user.privileges = Privileges::for_level(level);
        self.users.save(&user).await?;
        info!("User {} set to privilege level {}", user.email, level);
        Ok(user)
    }

    pub async fn all(&self) -> AppResult<Vec<User>> {
        self.users.all().await
    }

    pub async fn wipe(&self) -> AppResult<u64> {
        let removed = self.users.delete_all().await?;
        warn!("Wiped {} users", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySessionStore;
    use crate::store::MemoryUserStore;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use std::time::Duration;

    fn service() -> UserService {
        UserService::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemorySessionStore::new(Duration::from_secs(60))),
        )
    }

    fn profile() -> ProfileForm {
        ProfileForm {
            name: Name().fake(),
            email: SafeEmail().fake(),
            image_url: None,
        }
    }

    #[test]
    fn authorize_checks_login_then_privilege() {
        assert!(matches!(
            authorize(None, Privilege::Edit),
            Err(AppError::Unauthorized)
        ));

        let mut user = User::new("Ada", "ada@example.com");
        assert!(matches!(
            authorize(Some(&user), Privilege::Edit),
            Err(AppError::Forbidden(_))
        ));

        user.privileges = Privileges::for_level(1);
        assert!(authorize(Some(&user), Privilege::Edit).is_ok());
        assert!(authorize(Some(&user), Privilege::Publish).is_err());
    }

    #[tokio::test]
    async fn session_without_profile_is_anonymous() {
        let service = service();
        let token = service.login("sso-1").await.unwrap();
        assert!(service.resolve_current_user(Some(&token)).await.unwrap().is_none());
        assert!(service.resolve_current_user(None).await.unwrap().is_none());

        service.create_profile(&token, &profile()).await.unwrap();
        let user = service.resolve_current_user(Some(&token)).await.unwrap().unwrap();
        assert_eq!(user.external_id.as_deref(), Some("sso-1"));
    }

    #[tokio::test]
    async fn existing_email_is_taken_over() {
        let service = service();
        let added = service
            .add_user(&AddUserForm {
                email: "grace@example.com".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(added.name, PLACEHOLDER_NAME);

        let token = service.login("sso-2").await.unwrap();
        let form = ProfileForm {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            image_url: None,
        };
        let (user, outcome) = service.create_profile(&token, &form).await.unwrap();
        assert_eq!(outcome, ProfileOutcome::Overridden);
        assert_eq!(user.id, added.id);
        assert_eq!(user.name, "Grace");
        assert_eq!(service.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resubmitting_a_profile_updates_the_same_user() {
        let service = service();
        let token = service.login("sso-4").await.unwrap();
        let (first, outcome) = service.create_profile(&token, &profile()).await.unwrap();
        assert_eq!(outcome, ProfileOutcome::Created);

        let changed = profile();
        let (second, outcome) = service.create_profile(&token, &changed).await.unwrap();
        assert_eq!(outcome, ProfileOutcome::Overridden);
        assert_eq!(second.id, first.id);
        assert_eq!(second.email, changed.email);

        let users = service.all().await.unwrap();
        assert_eq!(users.len(), 1);
        let current = service.resolve_current_user(Some(&token)).await.unwrap().unwrap();
        assert_eq!(current.email, changed.email);
    }

    #[tokio::test]
    async fn profile_cannot_claim_another_accounts_email() {
        let service = service();
        let taken = service
            .add_user(&AddUserForm {
                email: "taken@example.com".to_string(),
            })
            .await
            .unwrap();

        let token = service.login("sso-5").await.unwrap();
        service.create_profile(&token, &profile()).await.unwrap();

        let form = ProfileForm {
            name: "Mallory".to_string(),
            email: taken.email.clone(),
            image_url: None,
        };
        let err = service.create_profile(&token, &form).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(service.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn removing_yourself_logs_you_out() {
        let service = service();
        let token = service.login("sso-3").await.unwrap();
        let form = profile();
        let (me, _) = service.create_profile(&token, &form).await.unwrap();

        let was_self = service.remove_user(&form.email, &me, &token).await.unwrap();
        assert!(was_self);
        assert!(service.resolve_current_user(Some(&token)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_profile_is_rejected() {
        let service = service();
        let token = service.login("sso-4").await.unwrap();
        let form = ProfileForm {
            name: "Nobody".to_string(),
            email: "not-an-email".to_string(),
            image_url: None,
        };
        assert!(matches!(
            service.create_profile(&token, &form).await,
            Err(AppError::Validation(_))
        ));
    }
}
