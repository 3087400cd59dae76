//! # Botwire - Bot-Side IM Protocol Engine
//!
//! Client library for running IM bot accounts against a botwire server:
//! encrypted sessions with automatic reconnect, a live contact directory,
//! and a typed event bus.
//!
//! ## Features
//!
//! - **Encrypted sessions**: X25519 key agreement, ChaCha20-Poly1305 frames
//! - **Request correlation**: sequence-numbered requests, replies in any order
//! - **Resilience**: heartbeat-based drop detection, backoff reconnect, roster resync
//! - **Contact directory**: friends, groups and members kept current by server pushes
//! - **Event bus**: cancellable and suppressible events, isolated subscribers
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────────────── Bot ──────────────────────────┐
//!  user code ───> │ send_*/recall/upload   directory()   events().subscribe │
//!                 └──────┬──────────────────────▲──────────────────┬────────┘
//!                        │ request               │ deltas           │ broadcast
//!                 ┌──────▼───────────────────────┴──────────────────▼───────┐
//!                 │ NetworkSession: handshake, pending table, heartbeat,    │
//!                 │ reconnect loop, push translation                        │
//!                 └──────┬──────────────────────────────────────────────────┘
//!                        │ frames (codec: compress, encrypt, checksum)
//!                 ┌──────▼──────┐
//!                 │  Transport  │  TCP, or anything AsyncRead + AsyncWrite
//!                 └─────────────┘
//! ```
//!
//! ### Session States
//!
//! | State            | Meaning                                        |
//! |------------------|------------------------------------------------|
//! | `Disconnected`   | created, never logged in                       |
//! | `Connecting`     | opening the transport                          |
//! | `Authenticating` | key agreement, login, captcha rounds           |
//! | `Online`         | requests flow, heartbeat running               |
//! | `Reconnecting`   | connection lost, backing off                   |
//! | `Closed`         | terminal                                       |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use botwire::{Bot, BotConfiguration, BotEvent};
//!
//! botwire::logging::init(&Default::default());
//!
//! let bot = Bot::new(10001, "password", BotConfiguration::from_env())?;
//! bot.events().subscribe(|event| {
//!     if let BotEvent::GroupMessage(msg) = event {
//!         tracing::info!(group = msg.group().id(), text = %msg.message, "group message");
//!     }
//!     Ok(())
//! });
//!
//! bot.login().await?;
//! bot.join().await?;
//! ```
//!
//! ## Modules
//!
//! - [`bot`]: the facade and the process-wide registry
//! - [`network`]: session lifecycle and request correlation
//! - [`codec`]: framing, compression, encryption
//! - [`protocol`]: wire message bodies
//! - [`contact`]: directory and contact handles
//! - [`event`]: events and the event bus
//! - [`message`]: message chains and images
//! - [`media`]: image upload/download over HTTP
//! - [`transport`]: byte-stream connectors

pub mod bot;
pub mod codec;
pub mod config;
pub mod contact;
pub mod error;
pub mod event;
pub mod logging;
pub mod media;
pub mod message;
pub mod network;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use bot::{Bot, BotBuilder, LoginSolver, NoCaptchaSolver, WeakBot};
pub use config::BotConfiguration;
pub use contact::{Contact, ContactDirectory, Friend, Group, Member, MemberPermission};
pub use error::{BotError, LoginError, Result};
pub use event::{BotEvent, EventBus, EventOrigin, SubscriptionId};
pub use message::{ExternalImage, Image, MessageChain, MessageReceipt, MessageSource};
pub use network::{CloseReason, NetworkSession, SessionState};
pub use transport::{TcpTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire protocol version carried in every frame header
pub const PROTOCOL_VERSION: u8 = codec::FRAME_VERSION;
