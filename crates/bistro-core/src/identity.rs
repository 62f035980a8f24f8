//! # Identity Types
//!
//! User accounts and the role dimension used by the access guards.

use crate::store::new_document_id;
use serde::{Deserialize, Serialize};

/// Authorization role. An account without an explicit role is an ordinary user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Returns true if this role satisfies `required`
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => self.is_admin(),
        }
    }
}

/// The authenticated caller, attached to a request once its token verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::User,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Exact email match, the comparison every self-scoped check uses
    pub fn owns(&self, email: &str) -> bool {
        self.email == email
    }
}

/// A stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub email: String,

    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    /// Only ever set by the admin promotion operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl UserAccount {
    pub fn role(&self) -> Role {
        self.role.unwrap_or_default()
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.email.clone()).with_role(self.role())
    }
}

/// Registration payload. Carries no role: clients cannot self-promote.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(rename = "photoURL", default)]
    pub photo_url: Option<String>,
}

impl NewUser {
    pub fn into_account(self) -> UserAccount {
        UserAccount {
            id: new_document_id(),
            name: self.name,
            email: self.email,
            photo_url: self.photo_url,
            role: None,
        }
    }
}
