//! Wire vocabulary of the botwire protocol.
//!
//! Defines the JSON bodies carried inside codec frames.
//!
//! # Exchange
//!
//! ```text
//! Client                                   Server
//!   |------ Hello{uin, pk_c}  (plain) ------->|
//!   |<----- ServerHello{pk_s} (plain) --------|
//!   |       both derive the session key       |
//!   |------ Login{uin, digest, device} ------>|
//!   |<----- LoginResult{captcha_required} ----|   0..n rounds
//!   |------ SubmitCaptcha{id, answer} ------->|
//!   |<----- LoginResult{success} -------------|
//!   |------ RosterRequest ------------------->|
//!   |<----- Roster{...} ----------------------|
//!   |                                         |
//!   |------ request (seq = n) --------------->|
//!   |<----- reply   (seq = n) ----------------|   any order
//!   |<----- Push{notice} ---------------------|   unsolicited
//! ```

mod message;
mod push;

pub use message::{ContactRef, LoginOutcome, ProtocolMessage};
pub use push::PushNotice;

/// Base64 (standard alphabet) serde adapter for byte fields.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
