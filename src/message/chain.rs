//! Message chains and their provenance.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::image::Image;

/// One element of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageElement {
    /// Plain text
    Plain {
        /// Text content
        text: String,
    },
    /// Mention of a group member
    At {
        /// Mentioned uin
        target: u64,
        /// Rendered text, e.g. `@alice`
        display: String,
    },
    /// Built-in face
    Face {
        /// Face id
        id: u32,
    },
    /// Uploaded image
    Image(Image),
}

impl MessageElement {
    /// Text rendering used by [`MessageChain::content_to_string`].
    pub fn content(&self) -> String {
        match self {
            Self::Plain { text } => text.clone(),
            Self::At { display, .. } => display.clone(),
            Self::Face { id } => format!("[face:{}]", id),
            Self::Image(image) => format!("[image:{}]", image.id()),
        }
    }
}

/// Where a message lives and who sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Private chat with a friend
    Friend {
        /// Friend uin
        friend_id: u64,
    },
    /// Group chat
    Group {
        /// Group id
        group_id: u64,
    },
}

/// Identity of a sent or received message, needed to recall it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageSource {
    /// Server-assigned message id
    pub id: u32,
    /// Sender uin
    pub author_id: u64,
    /// Server timestamp, seconds since the Unix epoch
    pub time_seconds: i64,
    /// Conversation
    pub kind: SourceKind,
}

impl MessageSource {
    /// Server timestamp as a `DateTime`.
    pub fn time(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.time_seconds, 0)
            .single()
            .unwrap_or_default()
    }
}

/// Immutable ordered sequence of message elements.
///
/// Cloning is cheap; elements are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageChain {
    elements: Arc<[MessageElement]>,
    source: Option<MessageSource>,
}

impl MessageChain {
    /// Build a chain from elements.
    pub fn new(elements: Vec<MessageElement>) -> Self {
        Self {
            elements: elements.into(),
            source: None,
        }
    }

    /// Start a builder.
    pub fn builder() -> MessageChainBuilder {
        MessageChainBuilder::default()
    }

    /// Elements in order.
    pub fn elements(&self) -> &[MessageElement] {
        &self.elements
    }

    /// Iterate elements.
    pub fn iter(&self) -> std::slice::Iter<'_, MessageElement> {
        self.elements.iter()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the chain has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Source of a received message.
    pub fn source(&self) -> Option<&MessageSource> {
        self.source.as_ref()
    }

    /// Same elements, tagged with a source.
    pub fn with_source(&self, source: MessageSource) -> Self {
        Self {
            elements: Arc::clone(&self.elements),
            source: Some(source),
        }
    }

    /// Concatenated text rendering of every element.
    pub fn content_to_string(&self) -> String {
        self.elements.iter().map(MessageElement::content).collect()
    }
}

impl fmt::Debug for MessageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChain")
            .field("elements", &self.elements)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for MessageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content_to_string())
    }
}

impl From<&str> for MessageChain {
    fn from(text: &str) -> Self {
        Self::new(vec![MessageElement::Plain {
            text: text.to_string(),
        }])
    }
}

impl From<String> for MessageChain {
    fn from(text: String) -> Self {
        Self::new(vec![MessageElement::Plain { text }])
    }
}

impl From<Image> for MessageChain {
    fn from(image: Image) -> Self {
        Self::new(vec![MessageElement::Image(image)])
    }
}

impl FromIterator<MessageElement> for MessageChain {
    fn from_iter<I: IntoIterator<Item = MessageElement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MessageChain {
    type Item = &'a MessageElement;
    type IntoIter = std::slice::Iter<'a, MessageElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builder for [`MessageChain`]
#[derive(Debug, Default)]
pub struct MessageChainBuilder {
    elements: Vec<MessageElement>,
}

impl MessageChainBuilder {
    /// Append plain text
    pub fn plain(mut self, text: impl Into<String>) -> Self {
        self.elements.push(MessageElement::Plain { text: text.into() });
        self
    }

    /// Append a mention
    pub fn at(mut self, target: u64, display: impl Into<String>) -> Self {
        self.elements.push(MessageElement::At {
            target,
            display: display.into(),
        });
        self
    }

    /// Append a face
    pub fn face(mut self, id: u32) -> Self {
        self.elements.push(MessageElement::Face { id });
        self
    }

    /// Append an image
    pub fn image(mut self, image: Image) -> Self {
        self.elements.push(MessageElement::Image(image));
        self
    }

    /// Append any element
    pub fn push(mut self, element: MessageElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Finish the chain
    pub fn build(self) -> MessageChain {
        MessageChain::new(self.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_content() {
        let chain = MessageChain::builder()
            .at(42, "@alice")
            .plain(" hello ")
            .face(14)
            .build();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.content_to_string(), "@alice hello [face:14]");
    }

    #[test]
    fn test_with_source_shares_elements() {
        let chain = MessageChain::from("hi");
        let source = MessageSource {
            id: 1,
            author_id: 2,
            time_seconds: 1_700_000_000,
            kind: SourceKind::Friend { friend_id: 2 },
        };
        let tagged = chain.with_source(source);

        assert!(chain.source().is_none());
        assert_eq!(tagged.source(), Some(&source));
        assert_eq!(tagged.elements(), chain.elements());
        assert_eq!(tagged.source().unwrap().time().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_element_wire_shape() {
        let json = serde_json::to_string(&MessageElement::Plain { text: "x".into() }).unwrap();
        assert_eq!(json, r#"{"type":"plain","text":"x"}"#);
    }
}
