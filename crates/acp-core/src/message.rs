//! The message model: parts, artifacts, and whole messages.
//!
//! Mirrors the part-structured message design of `ag-ui-core::types::message`
//! (a tagged enum per role) but ACP messages are role-agnostic containers of
//! MIME-typed parts rather than role-tagged text, so the shape here is a
//! plain `Vec<MessagePart>` with an explicit `role` field instead of an enum
//! per role.

use serde::{Deserialize, Serialize};

/// How a part's inline `content` is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    #[default]
    Plain,
    Base64,
}

/// Where a part's bytes live: inline or by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartContent {
    Inline(String),
    Url(String),
}

/// One part of a [`Message`].
///
/// Invariant: exactly one of `content` / `content_url` is present; this is
/// enforced by [`MessagePart::new_inline`] / [`MessagePart::new_url`] rather
/// than by the wire shape, since callers deserializing from JSON need a
/// clear error rather than an untagged-enum parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content_type: String,
    #[serde(default)]
    pub content_encoding: ContentEncoding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

/// Error constructing or validating a [`MessagePart`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PartError {
    #[error("a message part must have exactly one of content or content_url")]
    ContentXorUrl,
    #[error("an artifact must have a name")]
    MissingArtifactName,
}

impl MessagePart {
    /// Builds a plain-text, inline-content part (the common case).
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            name: None,
            content_type: "text/plain".to_string(),
            content_encoding: ContentEncoding::Plain,
            content: Some(content.into()),
            content_url: None,
        }
    }

    /// Builds a part referencing out-of-band content by URL.
    #[must_use]
    pub fn by_url(content_type: impl Into<String>, content_url: impl Into<String>) -> Self {
        Self {
            name: None,
            content_type: content_type.into(),
            content_encoding: ContentEncoding::Plain,
            content: None,
            content_url: Some(content_url.into()),
        }
    }

    /// Validates the content XOR content_url invariant.
    pub fn validate(&self) -> Result<(), PartError> {
        match (&self.content, &self.content_url) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(PartError::ContentXorUrl),
        }
    }

    /// An artifact is a part that carries a `name`.
    pub fn validate_as_artifact(&self) -> Result<(), PartError> {
        self.validate()?;
        if self.name.is_none() {
            return Err(PartError::MissingArtifactName);
        }
        Ok(())
    }

    /// Whether this part is eligible to fuse with an adjacent part under
    /// [`Message::compress`]: no name, `text/plain`, `plain` encoding, and
    /// inline (no `content_url`).
    #[must_use]
    fn is_fusible(&self) -> bool {
        self.name.is_none()
            && self.content_type == "text/plain"
            && self.content_encoding == ContentEncoding::Plain
            && self.content_url.is_none()
            && self.content.is_some()
    }
}

/// A [`MessagePart`] known to carry a `name`; constructed only through
/// validated conversion from a `MessagePart`.
pub type Artifact = MessagePart;

/// An ordered sequence of parts, optionally stamped with a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<MessagePart>,
}

impl Message {
    #[must_use]
    pub fn new(parts: Vec<MessagePart>) -> Self {
        Self { role: None, parts }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Appends another message's parts in place.
    pub fn append(&mut self, other: Message) {
        self.parts.extend(other.parts);
    }

    /// Fuses adjacent fusible parts, leaving non-fusible parts untouched.
    ///
    /// Idempotent: running this twice produces the same result as running
    /// it once, since a freshly-fused part is itself fusible and will only
    /// merge further if neighbours remain, and a message with no adjacent
    /// fusible pair is a fixed point.
    #[must_use]
    pub fn compress(&self) -> Message {
        let mut compressed: Vec<MessagePart> = Vec::with_capacity(self.parts.len());

        for part in &self.parts {
            if part.is_fusible() {
                if let Some(last) = compressed.last_mut() {
                    if last.is_fusible() {
                        let mut fused_content = last.content.clone().unwrap_or_default();
                        fused_content.push_str(part.content.as_deref().unwrap_or_default());
                        last.content = Some(fused_content);
                        continue;
                    }
                }
            }
            compressed.push(part.clone());
        }

        Message {
            role: self.role.clone(),
            parts: compressed,
        }
    }

    /// Concatenates the `text/plain` content of every part (compressed or
    /// not, fusible or not) in order, used by the round-trip invariant
    /// check and by the `message.part` event emission.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.content.as_deref())
            .collect()
    }
}
