//! The `users` resource.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user on the developer team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque resource id.
    #[serde(default)]
    pub id: Option<String>,

    /// Resource type, `users`.
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub attributes: Option<UserAttributes>,

    /// Related resources, kept as raw JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<serde_json::Value>,

    /// Resource links, kept as raw JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Value>,
}

/// Attributes that describe a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttributes {
    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    /// The user's Apple ID.
    #[serde(default)]
    pub username: Option<String>,

    /// Roles granted to the user.
    #[serde(default)]
    pub roles: Option<Vec<String>>,

    /// Whether the user's role allows provisioning.
    #[serde(default)]
    pub provisioning_allowed: bool,

    /// Whether the user can see every app on the team.
    #[serde(default)]
    pub all_apps_visible: bool,
}

impl UserAttributes {
    /// Roles joined with `, `, or `none` when the server sent no roles.
    pub fn roles_display(&self) -> String {
        match &self.roles {
            Some(roles) => roles.join(", "),
            None => "none".to_string(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(attributes) = &self.attributes else {
            return write!(f, "{}", self.id.as_deref().unwrap_or("<unknown user>"));
        };

        write!(
            f,
            "{} {} <{}> Roles={}",
            attributes.first_name.as_deref().unwrap_or(""),
            attributes.last_name.as_deref().unwrap_or(""),
            attributes.username.as_deref().unwrap_or(""),
            attributes.roles_display()
        )
    }
}
