//! Entities: immutable annotations referenced from blocks by key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an entity in a document's entity map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub u32);

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Variable,
    Mention,
    Link,
    Image,
    Video,
    File,
}

impl EntityKind {
    /// Image, video and file entities must sit alone in an atomic block.
    pub fn is_atomic(self) -> bool {
        matches!(self, EntityKind::Image | EntityKind::Video | EntityKind::File)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mutability {
    Mutable,
    Immutable,
}

/// Payload of an uploaded or linked attachment.
///
/// `id` is present only for uploaded attachments and is what a deletion request
/// to the upload service is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttachmentToken {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityData {
    #[serde(rename_all = "camelCase")]
    Variable {
        api_name: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Mention { user_id: u64, name: String },
    // Tried before `Link`: attachment payloads reject the `autolink` field links always carry.
    Attachment(AttachmentToken),
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        autolink: bool,
    },
}

impl EntityData {
    fn strings_mut(&mut self) -> Vec<&mut String> {
        match self {
            EntityData::Variable {
                api_name,
                title,
                subtitle,
            } => {
                let mut fields = vec![api_name, title];
                fields.extend(subtitle.as_mut());
                fields
            }
            EntityData::Mention { name, .. } => vec![name],
            EntityData::Link { url, name, .. } => {
                let mut fields = vec![url];
                fields.extend(name.as_mut());
                fields
            }
            EntityData::Attachment(token) => {
                let mut fields = vec![&mut token.url];
                fields.extend(token.id.as_mut());
                fields.extend(token.name.as_mut());
                fields
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub mutability: Mutability,
    pub data: EntityData,
}

impl Entity {
    pub fn variable(api_name: &str, title: &str, subtitle: Option<&str>) -> Self {
        Self {
            kind: EntityKind::Variable,
            mutability: Mutability::Immutable,
            data: EntityData::Variable {
                api_name: api_name.to_string(),
                title: title.to_string(),
                subtitle: subtitle.map(str::to_string),
            },
        }
    }

    pub fn mention(user_id: u64, name: &str) -> Self {
        Self {
            kind: EntityKind::Mention,
            mutability: Mutability::Immutable,
            data: EntityData::Mention {
                user_id,
                name: name.to_string(),
            },
        }
    }

    pub fn link(url: &str) -> Self {
        Self {
            kind: EntityKind::Link,
            mutability: Mutability::Mutable,
            data: EntityData::Link {
                url: url.to_string(),
                name: None,
                autolink: false,
            },
        }
    }

    /// A link that was written as a bare URL or email and should stay bare.
    pub fn autolink(url: &str) -> Self {
        Self {
            kind: EntityKind::Link,
            mutability: Mutability::Mutable,
            data: EntityData::Link {
                url: url.to_string(),
                name: None,
                autolink: true,
            },
        }
    }

    /// An image, video or file entity. Non-atomic kinds fall back to `File`.
    pub fn attachment(kind: EntityKind, token: AttachmentToken) -> Self {
        let kind = if kind.is_atomic() {
            kind
        } else {
            EntityKind::File
        };
        Self {
            kind,
            mutability: Mutability::Immutable,
            data: EntityData::Attachment(token),
        }
    }

    pub fn is_atomic(&self) -> bool {
        self.kind.is_atomic()
    }

    pub fn url(&self) -> Option<&str> {
        match &self.data {
            EntityData::Link { url, .. } => Some(url),
            EntityData::Attachment(token) => Some(&token.url),
            _ => None,
        }
    }

    pub(crate) fn map_chars(&mut self, map: impl Fn(char) -> char) {
        for field in self.data.strings_mut() {
            *field = field.chars().map(&map).collect();
        }
    }
}

/// Guess the attachment kind from the extension of a URL path.
///
/// URLs without an extension are treated as images, which is how pasted image
/// links from CDNs usually look.
pub fn attachment_kind_for_url(url: &str) -> EntityKind {
    const IMAGE: &[&str] = &[
        "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico", "tif", "tiff", "heic", "avif",
    ];
    const VIDEO: &[&str] = &["mp4", "webm", "mov", "avi", "mkv", "m4v", "ogv", "wmv", "mpeg"];

    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    let path = path.as_str();
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return EntityKind::Image;
    };
    let extension = extension.to_ascii_lowercase();
    if VIDEO.contains(&extension.as_str()) {
        EntityKind::Video
    } else if IMAGE.contains(&extension.as_str()) {
        EntityKind::Image
    } else {
        EntityKind::File
    }
}
