//! Data shapes exchanged with the host application's collaborators.

use super::entity::{attachment_kind_for_url, AttachmentToken, Entity};
use serde::{Deserialize, Serialize};

/// A variable a `{{ apiName }}` token can resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDef {
    pub api_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl VariableDef {
    pub fn new(api_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn to_entity(&self) -> Entity {
        Entity::variable(&self.api_name, &self.title, self.subtitle.as_deref())
    }
}

/// Result of an upload. Only `url`, `id` and `name` reach the document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Attachment {
    pub fn to_entity(&self) -> Entity {
        Entity::attachment(
            attachment_kind_for_url(&self.url),
            AttachmentToken {
                url: self.url.clone(),
                id: self.id.clone(),
                name: self.name.clone(),
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionUser {
    pub id: u64,
    pub name: String,
}

/// Users whose name contains `query`, ignoring case. Prefix matches come first;
/// input order is kept within each group.
pub fn suggest_mentions<'a>(users: &'a [MentionUser], query: &str) -> Vec<&'a MentionUser> {
    let query = query.trim().to_lowercase();
    let (mut prefixed, mut contained) = (Vec::new(), Vec::new());
    for user in users {
        let name = user.name.to_lowercase();
        if name.starts_with(&query) {
            prefixed.push(user);
        } else if name.contains(&query) {
            contained.push(user);
        }
    }
    prefixed.append(&mut contained);
    prefixed
}
