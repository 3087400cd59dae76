//! Key agreement and login over a fresh connection.
//!
//! Runs on the unsplit stream before the reader and writer tasks exist, so
//! every frame here is read and written inline.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};
use uuid::Uuid;

use crate::bot::LoginSolver;
use crate::codec::crypto::{EphemeralKeys, PublicKey, SessionKey};
use crate::codec::{read_frame, write_frame, FrameCodec};
use crate::error::LoginError;
use crate::protocol::{LoginOutcome, ProtocolMessage};

type LoginResult<T> = std::result::Result<T, LoginError>;

/// What the handshake needs to prove the bot's identity.
#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) uin: u64,
    pub(crate) password_digest: [u8; 32],
    pub(crate) device_id: Uuid,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("uin", &self.uin)
            .field("password_digest", &"<redacted>")
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// A completed login.
#[derive(Debug)]
pub(crate) struct Established {
    pub(crate) key: SessionKey,
    pub(crate) nick: String,
    pub(crate) captcha_rounds: u32,
}

/// Parameters shared by every handshake of one session.
pub(crate) struct Handshake<'a> {
    pub(crate) credentials: &'a Credentials,
    pub(crate) codec: &'a FrameCodec,
    pub(crate) sequence: &'a AtomicU32,
    pub(crate) solver: &'a dyn LoginSolver,
    pub(crate) max_captcha_rounds: u32,
}

impl Handshake<'_> {
    /// Agree on a session key, then log in, answering captchas on the way.
    pub(crate) async fn perform<S>(&self, stream: &mut S) -> LoginResult<Established>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let uin = self.credentials.uin;
        let keys = EphemeralKeys::generate();

        self.send(
            stream,
            &ProtocolMessage::Hello {
                uin,
                public_key: keys.public_key().to_vec(),
            },
            None,
        )
        .await?;

        let server_public = match self.recv(stream, None).await? {
            ProtocolMessage::ServerHello { public_key } => {
                PublicKey::try_from(public_key.as_slice())
                    .map_err(|e| LoginError::Protocol(e.to_string()))?
            },
            other => return Err(unexpected(&other)),
        };
        let shared = keys
            .agree(&server_public)
            .map_err(|e| LoginError::Protocol(e.to_string()))?;
        let key =
            SessionKey::derive(&shared, uin).map_err(|e| LoginError::Protocol(e.to_string()))?;
        debug!("Session key agreed");

        self.send(
            stream,
            &ProtocolMessage::Login {
                uin,
                password_digest: self.credentials.password_digest.to_vec(),
                device_id: self.credentials.device_id,
            },
            Some(&key),
        )
        .await?;

        let mut rounds = 0u32;
        loop {
            let outcome = match self.recv(stream, Some(&key)).await? {
                ProtocolMessage::LoginResult { outcome } => outcome,
                ProtocolMessage::Error { code, message } => {
                    return Err(LoginError::Rejected(format!("{code}: {message}")));
                },
                other => return Err(unexpected(&other)),
            };

            match outcome {
                LoginOutcome::Success { nick } => {
                    info!(nick = %nick, captcha_rounds = rounds, "Login accepted");
                    return Ok(Established {
                        key,
                        nick,
                        captcha_rounds: rounds,
                    });
                },
                LoginOutcome::CaptchaRequired { captcha_id, image } => {
                    if rounds >= self.max_captcha_rounds {
                        return Err(LoginError::CaptchaUnresolved { rounds });
                    }
                    rounds += 1;
                    info!(round = rounds, captcha_id = %captcha_id, "Captcha required");

                    let Some(answer) = self.solver.solve_captcha(uin, &image).await else {
                        return Err(LoginError::CaptchaUnresolved { rounds });
                    };
                    self.send(
                        stream,
                        &ProtocolMessage::SubmitCaptcha { captcha_id, answer },
                        Some(&key),
                    )
                    .await?;
                },
                LoginOutcome::WrongPassword => return Err(LoginError::WrongPassword),
                LoginOutcome::Rejected { reason } => return Err(LoginError::Rejected(reason)),
            }
        }
    }

    async fn send<S>(
        &self,
        stream: &mut S,
        message: &ProtocolMessage,
        key: Option<&SessionKey>,
    ) -> LoginResult<()>
    where
        S: AsyncWrite + Unpin,
    {
        let payload = message
            .to_bytes()
            .map_err(|e| LoginError::Protocol(e.to_string()))?;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let frame = self
            .codec
            .encode(sequence, &payload, key)
            .map_err(|e| LoginError::Protocol(e.to_string()))?;
        write_frame(stream, &frame)
            .await
            .map_err(|e| LoginError::Network(e.to_string()))
    }

    async fn recv<S>(&self, stream: &mut S, key: Option<&SessionKey>) -> LoginResult<ProtocolMessage>
    where
        S: AsyncRead + Unpin,
    {
        let bytes = read_frame(stream)
            .await
            .map_err(|e| LoginError::Network(e.to_string()))?
            .ok_or_else(|| LoginError::Network("connection closed during login".to_string()))?;
        let frame = self
            .codec
            .decode(&bytes, key)
            .map_err(|e| LoginError::Protocol(e.to_string()))?;
        ProtocolMessage::from_bytes(&frame.payload).map_err(|e| LoginError::Protocol(e.to_string()))
    }
}

fn unexpected(message: &ProtocolMessage) -> LoginError {
    LoginError::Protocol(format!("unexpected {} during login", message.kind()))
}
