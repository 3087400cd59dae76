//! Message content model.
//!
//! A [`MessageChain`] is an immutable list of [`MessageElement`]s. Chains
//! received from the server carry a [`MessageSource`]; chains the bot sends
//! come back as a [`MessageReceipt`] whose source can be used to recall them.

mod chain;
mod image;

pub use chain::{MessageChain, MessageChainBuilder, MessageElement, MessageSource, SourceKind};
pub use image::{ExternalImage, Image, ImageFormat};

use crate::contact::Contact;
use crate::error::Result;

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageReceipt {
    /// Identity of the sent message
    pub source: MessageSource,
    /// Where it was sent
    pub target: Contact,
}

impl MessageReceipt {
    /// Recall the sent message.
    pub async fn recall(&self) -> Result<()> {
        self.target.bot()?.recall(&self.source).await
    }
}
