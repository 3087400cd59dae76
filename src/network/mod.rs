//! Network session of a bot.
//!
//! | Piece        | Role                                                   |
//! |--------------|--------------------------------------------------------|
//! | `handshake`  | X25519 key agreement, login, captcha rounds            |
//! | `session`    | connection lifecycle, request/reply correlation        |
//! | `pending`    | sequence id -> waiting caller                          |
//! | `push`       | server notifications -> directory deltas and events    |
//! | `backoff`    | reconnect delays                                       |
//!
//! Pushes of one connection are handled strictly in arrival order on the
//! reader task, so subscribers observe them in server order.

mod backoff;
mod handshake;
mod pending;
mod push;
mod session;

pub(crate) use handshake::Credentials;
pub use session::{CloseReason, NetworkSession, SessionState};
