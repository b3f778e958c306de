use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Capabilities a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    Edit,
    Publish,
    Admin,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Privilege::Edit => write!(f, "edit"),
            Privilege::Publish => write!(f, "publish"),
            Privilege::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Privileges {
    pub edit: bool,
    pub publish: bool,
    pub admin: bool,
}

impl Privileges {
    /// 1: editor, 2: publisher, 3: admin. Anything else is a plain user.
    pub fn for_level(level: u8) -> Self {
        Self {
            edit: level > 0,
            publish: level > 1,
            admin: level > 2,
        }
    }

    pub fn has(&self, privilege: Privilege) -> bool {
        match privilege {
            Privilege::Edit => self.edit,
            Privilege::Publish => self.publish,
            Privilege::Admin => self.admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    // Subject id from the SSO provider; unset for pre-registered users
    pub external_id: Option<String>,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
    #[sqlx(flatten)]
    pub privileges: Privileges,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: None,
            name: name.into(),
            email: email.into(),
            image_url: None,
            privileges: Privileges::default(),
            created_at: Utc::now(),
        }
    }

    pub fn has_privilege(&self, privilege: Privilege) -> bool {
        self.privileges.has(privilege)
    }
}
