//! Request, response and push bodies.
//!
//! Every frame payload is one JSON-encoded [`ProtocolMessage`], tagged by
//! `type`. Replies reuse the sequence id of the request they answer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::base64_bytes;
use super::push::PushNotice;
use crate::contact::{ContactKind, Roster};
use crate::message::{MessageElement, MessageSource};

/// Result of a login step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// Logged in
    Success {
        /// Account nickname
        nick: String,
    },
    /// Server wants a captcha answered first
    CaptchaRequired {
        /// Challenge id to echo back
        captcha_id: String,
        /// Captcha image
        #[serde(with = "base64_bytes")]
        image: Vec<u8>,
    },
    /// Credentials rejected
    WrongPassword,
    /// Login refused for another reason
    Rejected {
        /// Server-provided reason
        reason: String,
    },
}

/// Reference to a chat on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRef {
    /// Friend or group
    pub kind: ContactKind,
    /// Friend uin or group id
    pub id: u64,
}

/// Protocol message envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolMessage {
    /// Client key-agreement opener (plaintext)
    Hello {
        /// Account uin
        uin: u64,
        /// Client ephemeral X25519 public key
        #[serde(with = "base64_bytes")]
        public_key: Vec<u8>,
    },
    /// Server key-agreement reply (plaintext)
    ServerHello {
        /// Server ephemeral X25519 public key
        #[serde(with = "base64_bytes")]
        public_key: Vec<u8>,
    },
    /// Credentials (first encrypted frame)
    Login {
        /// Account uin
        uin: u64,
        /// SHA-256 of the password
        #[serde(with = "base64_bytes")]
        password_digest: Vec<u8>,
        /// Stable device id
        device_id: Uuid,
    },
    /// Answer to `Login` or `SubmitCaptcha`
    LoginResult {
        /// Outcome
        outcome: LoginOutcome,
    },
    /// Captcha answer
    SubmitCaptcha {
        /// Challenge id
        captcha_id: String,
        /// Answer text
        answer: String,
    },
    /// Keep-alive
    Heartbeat,
    /// Keep-alive reply
    HeartbeatAck,
    /// Ask for the full contact roster
    RosterRequest,
    /// Full contact roster
    Roster {
        /// Friends and groups
        roster: Roster,
    },
    /// Send a private message
    SendFriendMessage {
        /// Friend uin
        friend_id: u64,
        /// Message elements
        message: Vec<MessageElement>,
    },
    /// Send a group message
    SendGroupMessage {
        /// Group id
        group_id: u64,
        /// Message elements
        message: Vec<MessageElement>,
    },
    /// Message accepted by the server
    Receipt {
        /// Server-assigned message id
        message_id: u32,
        /// Server timestamp (seconds)
        time: i64,
    },
    /// Recall a message
    Recall {
        /// Message to recall
        source: MessageSource,
    },
    /// Ask where to upload an image
    UploadImageRequest {
        /// Chat the image is for
        target: ContactRef,
        /// SHA-256 of the image
        #[serde(with = "base64_bytes")]
        digest: Vec<u8>,
        /// Size in bytes
        size: u64,
    },
    /// Upload destination
    UploadTicket {
        /// Server image id
        image_id: String,
        /// Where to upload; `None` when the server already has the image
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upload_url: Option<String>,
    },
    /// Ask for an image's download URL
    QueryImageUrl {
        /// Server image id
        image_id: String,
    },
    /// Image download URL
    ImageUrl {
        /// URL
        url: String,
    },
    /// Rename a group
    SetGroupName {
        /// Group id
        group_id: u64,
        /// New name
        name: String,
    },
    /// Mute a member (`seconds = 0` unmutes)
    MuteMember {
        /// Group id
        group_id: u64,
        /// Member uin
        member_id: u64,
        /// Mute length
        seconds: u32,
    },
    /// Remove a member
    KickMember {
        /// Group id
        group_id: u64,
        /// Member uin
        member_id: u64,
        /// Message shown to the member
        reason: String,
    },
    /// Generic success reply
    Ack,
    /// Generic failure reply
    Error {
        /// Error code
        code: i32,
        /// Human-readable message
        message: String,
    },
    /// Server-initiated notification
    Push {
        /// Notification body
        notice: PushNotice,
    },
}

impl ProtocolMessage {
    /// Message type name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::ServerHello { .. } => "server_hello",
            Self::Login { .. } => "login",
            Self::LoginResult { .. } => "login_result",
            Self::SubmitCaptcha { .. } => "submit_captcha",
            Self::Heartbeat => "heartbeat",
            Self::HeartbeatAck => "heartbeat_ack",
            Self::RosterRequest => "roster_request",
            Self::Roster { .. } => "roster",
            Self::SendFriendMessage { .. } => "send_friend_message",
            Self::SendGroupMessage { .. } => "send_group_message",
            Self::Receipt { .. } => "receipt",
            Self::Recall { .. } => "recall",
            Self::UploadImageRequest { .. } => "upload_image_request",
            Self::UploadTicket { .. } => "upload_ticket",
            Self::QueryImageUrl { .. } => "query_image_url",
            Self::ImageUrl { .. } => "image_url",
            Self::SetGroupName { .. } => "set_group_name",
            Self::MuteMember { .. } => "mute_member",
            Self::KickMember { .. } => "kick_member",
            Self::Ack => "ack",
            Self::Error { .. } => "error",
            Self::Push { .. } => "push",
        }
    }

    /// Serialize to a frame payload
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse a frame payload
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
