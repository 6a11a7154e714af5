//! Custom inline tokens layered over markdown.
//!
//! Each matcher looks at the text remaining on a line and either declines or
//! reports how many bytes it consumed and what they became. The scanner tries
//! the matchers in priority order at every position; text no matcher claims is
//! copied through unchanged.

use crate::model::{
    attachment_kind_for_url, AttachmentToken, Block, Document, Entity, InlineStyle, VariableDef,
    ATOMIC_PLACEHOLDER,
};
use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{\s*([A-Za-z0-9_-]+)\s*\}\}").expect("valid regex"));
static CHECKLIST_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\[clist:[^\]|\n]+\|[^\]\n]+\]|\[/clist\])").expect("valid regex")
});
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\[\]|\n]+)\|([0-9]+)\]").expect("valid regex"));
static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[([^\[\]\n]*)\]\(([^()\s]+)\)").expect("valid regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\[\]\n]+)\]\(([^()\s]+)\)").expect("valid regex"));
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:https?://|www\.)[^\s<>\[\]{}]+").expect("valid regex")
});
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+").expect("valid regex")
});

/// What a matcher turned its span into.
pub(crate) enum Piece {
    /// Keep the span as plain text and skip past it.
    Literal,
    /// Replace the span with `text` bound to a new entity.
    Entity { text: String, entity: Entity },
}

pub(crate) struct Match {
    /// Bytes of input consumed.
    pub len: usize,
    pub piece: Piece,
}

pub(crate) struct Cursor<'a> {
    pub rest: &'a str,
    pub previous: Option<char>,
    pub variables: &'a [VariableDef],
}

pub(crate) type Matcher = fn(&Cursor<'_>) -> Option<Match>;

/// Tokens that survive inside markdown text nodes. Links and images come from
/// the markdown parser itself.
pub(crate) const MARKDOWN_MATCHERS: &[Matcher] = &[variable, checklist_tag, mention];

/// Tokens recognized when markdown formatting is off.
pub(crate) const PLAIN_MATCHERS: &[Matcher] = &[
    variable,
    checklist_tag,
    mention,
    image,
    link,
    autolink,
];

/// Name inside the `{{ name }}` token at the start of `text`, resolved or not.
pub(crate) fn variable_token_name(text: &str) -> Option<&str> {
    VARIABLE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str())
}

fn variable(cursor: &Cursor<'_>) -> Option<Match> {
    if !cursor.rest.starts_with("{{") {
        return None;
    }
    let caps = VARIABLE_RE.captures(cursor.rest)?;
    let api_name = &caps[1];
    let Some(def) = cursor
        .variables
        .iter()
        .find(|def| def.api_name == api_name)
        .or_else(|| {
            cursor
                .variables
                .iter()
                .find(|def| def.api_name.eq_ignore_ascii_case(api_name))
        })
    else {
        tracing::trace!(api_name, "unresolved variable kept as text");
        return None;
    };
    Some(Match {
        len: caps[0].len(),
        piece: Piece::Entity {
            text: def.title.clone(),
            entity: def.to_entity(),
        },
    })
}

fn checklist_tag(cursor: &Cursor<'_>) -> Option<Match> {
    if !cursor.rest.starts_with('[') {
        return None;
    }
    let found = CHECKLIST_TAG_RE.find(cursor.rest)?;
    Some(Match {
        len: found.end(),
        piece: Piece::Literal,
    })
}

fn mention(cursor: &Cursor<'_>) -> Option<Match> {
    if !cursor.rest.starts_with('[') {
        return None;
    }
    let caps = MENTION_RE.captures(cursor.rest)?;
    let user_id = caps[2].parse::<u64>().ok()?;
    let name = caps[1].trim();
    if name.is_empty() {
        return None;
    }
    Some(Match {
        len: caps[0].len(),
        piece: Piece::Entity {
            text: name.to_string(),
            entity: Entity::mention(user_id, name),
        },
    })
}

fn image(cursor: &Cursor<'_>) -> Option<Match> {
    if !cursor.rest.starts_with("![") {
        return None;
    }
    let caps = IMAGE_RE.captures(cursor.rest)?;
    let url = &caps[2];
    if !is_safe_url(url) {
        return None;
    }
    Some(Match {
        len: caps[0].len(),
        piece: Piece::Entity {
            text: ATOMIC_PLACEHOLDER.to_string(),
            entity: attachment_entity(url, &caps[1]),
        },
    })
}

fn link(cursor: &Cursor<'_>) -> Option<Match> {
    if !cursor.rest.starts_with('[') {
        return None;
    }
    let caps = LINK_RE.captures(cursor.rest)?;
    let url = &caps[2];
    if !is_safe_url(url) {
        return None;
    }
    Some(Match {
        len: caps[0].len(),
        piece: Piece::Entity {
            text: caps[1].to_string(),
            entity: Entity::link(url),
        },
    })
}

fn autolink(cursor: &Cursor<'_>) -> Option<Match> {
    if cursor
        .previous
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-' | '@' | '/'))
    {
        return None;
    }
    let first = cursor.rest.chars().next()?;
    if !first.is_ascii_alphanumeric() {
        return None;
    }
    if let Some(found) = URL_RE.find(cursor.rest) {
        let text = trim_trailing_punctuation(found.as_str());
        let url = if text.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("www.")) {
            format!("http://{text}")
        } else {
            text.to_string()
        };
        return Some(Match {
            len: text.len(),
            piece: Piece::Entity {
                text: text.to_string(),
                entity: Entity::autolink(&url),
            },
        });
    }
    let found = EMAIL_RE.find(cursor.rest)?;
    let text = trim_trailing_punctuation(found.as_str());
    Some(Match {
        len: text.len(),
        piece: Piece::Entity {
            text: text.to_string(),
            entity: Entity::autolink(&format!("mailto:{text}")),
        },
    })
}

fn trim_trailing_punctuation(text: &str) -> &str {
    text.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'', '"'])
}

pub(crate) fn attachment_entity(url: &str, name: &str) -> Entity {
    let name = name.trim();
    Entity::attachment(
        attachment_kind_for_url(url),
        AttachmentToken {
            url: url.to_string(),
            id: None,
            name: (!name.is_empty()).then(|| name.to_string()),
        },
    )
}

/// Whether a URL may become a link or attachment. Script-bearing schemes stay text.
pub(crate) fn is_safe_url(url: &str) -> bool {
    match url::Url::parse(url.trim()) {
        Ok(parsed) => !matches!(parsed.scheme(), "javascript" | "vbscript" | "data"),
        // Relative references do not parse on their own and carry no scheme.
        Err(_) => {
            let lowered = url.trim().to_ascii_lowercase();
            !["javascript:", "vbscript:", "data:"]
                .iter()
                .any(|scheme| lowered.starts_with(scheme))
        }
    }
}

/// Append `text` to `block`, turning custom tokens into entities.
pub(crate) fn scan_into(
    doc: &mut Document,
    block: &mut Block,
    text: &str,
    styles: &[InlineStyle],
    variables: &[VariableDef],
    matchers: &[Matcher],
) {
    let mut literal_start = 0;
    let mut position = 0;
    let mut previous = block.text.chars().last();

    'scan: while position < text.len() {
        let cursor = Cursor {
            rest: &text[position..],
            previous,
            variables,
        };
        for matcher in matchers {
            let Some(found) = matcher(&cursor) else {
                continue;
            };
            if found.len == 0 {
                continue;
            }
            let end = position + found.len;
            match found.piece {
                Piece::Literal => {}
                Piece::Entity { text: shown, entity } => {
                    block.push_text(&text[literal_start..position], styles);
                    let styles = if entity.is_atomic() { &[][..] } else { styles };
                    let key = doc.create_entity(entity);
                    block.push_entity_text(&shown, styles, key);
                    literal_start = end;
                }
            }
            previous = text[..end].chars().last();
            position = end;
            continue 'scan;
        }
        let Some(c) = cursor.rest.chars().next() else {
            break;
        };
        previous = Some(c);
        position += c.len_utf8();
    }
    block.push_text(&text[literal_start..], styles);
}

/// Escaped characters the custom grammar cares about, mapped to private-use
/// stand-ins before parsing so no matcher can see them.
const PROTECTED: [char; 5] = ['\\', '{', '}', '[', ']'];
const SENTINEL_BASE: u32 = 0xE000;

pub(crate) fn protect(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(index) = chars
                .peek()
                .and_then(|next| PROTECTED.iter().position(|p| p == next))
            {
                chars.next();
                out.push(sentinel(index));
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn sentinel(index: usize) -> char {
    char::from_u32(SENTINEL_BASE + index as u32).unwrap_or(PROTECTED[index])
}

pub(crate) fn restore(c: char) -> char {
    let code = c as u32;
    if (SENTINEL_BASE..SENTINEL_BASE + PROTECTED.len() as u32).contains(&code) {
        PROTECTED[(code - SENTINEL_BASE) as usize]
    } else {
        c
    }
}
