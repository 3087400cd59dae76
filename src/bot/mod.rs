//! The bot facade.
//!
//! A [`Bot`] bundles one account's network session, contact directory and
//! event bus. Contact handles and events refer back to it through
//! [`WeakBot`], so they never keep a bot alive on their own.
//!
//! # Usage
//!
//! ```rust,ignore
//! use botwire::{Bot, BotConfiguration};
//!
//! let bot = Bot::new(10001, "password", BotConfiguration::from_env())?;
//! bot.events().subscribe(|event| {
//!     tracing::info!(event = event.name(), "event");
//!     Ok(())
//! });
//! bot.login().await?;
//! bot.get_group(42)?.send_message("hello").await?;
//! bot.join().await?;
//! ```

mod registry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::crypto::digest;
use crate::codec::FrameCodec;
use crate::config::BotConfiguration;
use crate::contact::{Contact, ContactDirectory, Friend, Group, Member, MemberPermission};
use crate::error::{BotError, Result};
use crate::event::{
    BeforeImageUploadEvent, BotEvent, CancelFlag, EventBus, ImageUploadEvent, MessageSendEvent,
};
use crate::media::{HttpMediaClient, MediaClient, MediaStream};
use crate::message::{ExternalImage, Image, MessageChain, MessageReceipt, MessageSource, SourceKind};
use crate::network::{Credentials, NetworkSession, SessionState};
use crate::protocol::{ContactRef, ProtocolMessage};
use crate::transport::{TcpTransport, Transport};

/// Longest mute the server accepts.
pub const MAX_MUTE_DURATION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Answers captcha challenges during login.
pub trait LoginSolver: Send + Sync {
    /// Return the captcha text, or `None` to give up the login.
    fn solve_captcha<'a>(
        &'a self,
        uin: u64,
        image: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
}

/// Solver for headless bots: every captcha fails the login.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCaptchaSolver;

impl LoginSolver for NoCaptchaSolver {
    fn solve_captcha<'a>(
        &'a self,
        uin: u64,
        image: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            warn!(uin, image_len = image.len(), "Captcha required but no solver configured");
            None
        })
    }
}

pub(crate) struct BotInner {
    uin: u64,
    config: BotConfiguration,
    directory: ContactDirectory,
    events: EventBus,
    session: Arc<NetworkSession>,
    media: Arc<dyn MediaClient>,
}

impl Drop for BotInner {
    fn drop(&mut self) {
        self.session.close(Some("bot dropped".to_string()));
        registry::prune();
        debug!(uin = self.uin, "Bot dropped");
    }
}

/// One logged-in (or logging-in) account.
///
/// Cheap to clone; all clones share the same session.
#[derive(Clone)]
pub struct Bot(Arc<BotInner>);

/// Non-owning reference to a [`Bot`].
#[derive(Clone)]
pub struct WeakBot {
    uin: u64,
    inner: Weak<BotInner>,
}

impl WeakBot {
    /// Uin of the referenced bot, available even after it was dropped.
    pub fn uin(&self) -> u64 {
        self.uin
    }

    /// The bot, if still alive.
    pub fn upgrade(&self) -> Option<Bot> {
        self.inner.upgrade().map(Bot)
    }

    /// The bot, or [`BotError::BotDropped`].
    pub fn require(&self) -> Result<Bot> {
        self.upgrade().ok_or(BotError::BotDropped)
    }

    #[cfg(test)]
    pub(crate) fn dangling(uin: u64) -> Self {
        Self {
            uin,
            inner: Weak::new(),
        }
    }
}

impl fmt::Debug for WeakBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakBot({})", self.uin)
    }
}

/// Builder for [`Bot`].
pub struct BotBuilder {
    uin: u64,
    password_digest: [u8; 32],
    config: BotConfiguration,
    device_id: Option<Uuid>,
    transport: Option<Arc<dyn Transport>>,
    media: Option<Arc<dyn MediaClient>>,
    solver: Option<Arc<dyn LoginSolver>>,
}

impl BotBuilder {
    /// Replace the configuration
    pub fn config(mut self, config: BotConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Fix the device id reported at login (random by default)
    pub fn device_id(mut self, device_id: Uuid) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Use a custom transport instead of TCP
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom media client instead of HTTP
    pub fn media_client(mut self, media: Arc<dyn MediaClient>) -> Self {
        self.media = Some(media);
        self
    }

    /// Answer captchas with `solver`
    pub fn login_solver(mut self, solver: Arc<dyn LoginSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Create the bot and register it.
    ///
    /// Fails with [`BotError::DuplicateBot`] if a live bot with the same uin
    /// exists in this process.
    pub fn build(self) -> Result<Bot> {
        let Self {
            uin,
            password_digest,
            config,
            device_id,
            transport,
            media,
            solver,
        } = self;
        config.validate()?;

        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Arc::new(TcpTransport::from_config(&config.network)),
        };
        let media: Arc<dyn MediaClient> = match media {
            Some(media) => media,
            None => Arc::new(HttpMediaClient::new(&config.media)?),
        };
        let solver: Arc<dyn LoginSolver> = match solver {
            Some(solver) => solver,
            None => Arc::new(NoCaptchaSolver),
        };
        let credentials = Credentials {
            uin,
            password_digest,
            device_id: device_id.unwrap_or_else(Uuid::new_v4),
        };
        let codec = FrameCodec::new(config.codec.compression_threshold);

        let inner = Arc::new_cyclic(|weak| {
            let handle = WeakBot {
                uin,
                inner: weak.clone(),
            };
            BotInner {
                uin,
                session: Arc::new(NetworkSession::new(
                    handle,
                    credentials,
                    config.network.clone(),
                    codec,
                    transport,
                    solver,
                )),
                directory: ContactDirectory::new(uin),
                events: EventBus::new(),
                media,
                config,
            }
        });
        registry::register(uin, &inner)?;

        info!(uin, "Bot created");
        Ok(Bot(inner))
    }
}

impl Bot {
    /// Start building a bot for `uin`. Only the password's digest is kept.
    pub fn builder(uin: u64, password: impl AsRef<[u8]>) -> BotBuilder {
        BotBuilder {
            uin,
            password_digest: digest(password.as_ref()),
            config: BotConfiguration::default(),
            device_id: None,
            transport: None,
            media: None,
            solver: None,
        }
    }

    /// Create a bot with default transport, media client and solver.
    pub fn new(uin: u64, password: impl AsRef<[u8]>, config: BotConfiguration) -> Result<Self> {
        Self::builder(uin, password).config(config).build()
    }

    /// Every live bot, sorted by uin
    pub fn instances() -> Vec<Bot> {
        registry::live()
    }

    /// The live bot with `uin`
    pub fn get_instance(uin: u64) -> Result<Bot> {
        registry::find(uin).ok_or(BotError::NoSuchBot(uin))
    }

    /// The live bot with `uin`, if any
    pub fn find_instance(uin: u64) -> Option<Bot> {
        registry::find(uin)
    }

    /// Run `f` on every live bot. The registry is not locked while `f` runs.
    pub fn for_each_instance(mut f: impl FnMut(&Bot)) {
        for bot in registry::live() {
            f(&bot);
        }
    }

    /// Account uin
    pub fn uin(&self) -> u64 {
        self.0.uin
    }

    /// Account nickname from the last roster
    pub fn nick(&self) -> String {
        self.0.directory.self_nick()
    }

    /// Configuration the bot was built with
    pub fn config(&self) -> &BotConfiguration {
        &self.0.config
    }

    /// Contact directory
    pub fn directory(&self) -> &ContactDirectory {
        &self.0.directory
    }

    /// Event bus
    pub fn events(&self) -> &EventBus {
        &self.0.events
    }

    /// Network session
    pub fn session(&self) -> &Arc<NetworkSession> {
        &self.0.session
    }

    /// Session state
    pub fn state(&self) -> SessionState {
        self.0.session.state()
    }

    /// Whether the session is online
    pub fn is_online(&self) -> bool {
        self.0.session.is_online()
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakBot {
        WeakBot {
            uin: self.0.uin,
            inner: Arc::downgrade(&self.0),
        }
    }

    /// Connect and log in. A failed login closes the bot.
    pub async fn login(&self) -> Result<()> {
        self.0.session.login().await
    }

    /// Wait until the bot is closed.
    ///
    /// `Ok` after [`Bot::close`]; otherwise the error that ended the session.
    pub async fn join(&self) -> Result<()> {
        self.0.session.join().await
    }

    /// Close the bot. Idempotent; pending requests fail with `SessionClosed`.
    pub fn close(&self, cause: Option<String>) {
        self.0.session.close(cause);
    }

    /// All friends
    pub fn friends(&self) -> Vec<Friend> {
        self.directory()
            .friends()
            .ids()
            .into_iter()
            .map(|id| Friend::new(id, self.downgrade()))
            .collect()
    }

    /// All groups
    pub fn groups(&self) -> Vec<Group> {
        self.directory()
            .groups()
            .ids()
            .into_iter()
            .map(|id| Group::new(id, self.downgrade()))
            .collect()
    }

    /// Friend by uin; the bot's own uin resolves to [`Bot::self_friend`]
    pub fn get_friend(&self, id: u64) -> Result<Friend> {
        self.directory().require_friend(id)?;
        Ok(Friend::new(id, self.downgrade()))
    }

    /// Group by id
    pub fn get_group(&self, id: u64) -> Result<Group> {
        self.directory().require_group(id)?;
        Ok(Group::new(id, self.downgrade()))
    }

    /// Whether `id` is a known friend or group
    pub fn contains(&self, id: u64) -> bool {
        self.directory().contains(id)
    }

    /// The bot as a friend of itself
    pub fn self_friend(&self) -> Friend {
        Friend::new(self.uin(), self.downgrade())
    }

    async fn request(&self, message: ProtocolMessage) -> Result<ProtocolMessage> {
        self.0.session.send(message).await
    }

    /// Send a private message.
    ///
    /// Publishes a cancellable [`MessageSendEvent`] first.
    pub async fn send_friend_message(
        &self,
        friend: &Friend,
        message: MessageChain,
    ) -> Result<MessageReceipt> {
        ensure_not_empty(&message)?;
        self.directory().require_friend(friend.id())?;

        let event = BotEvent::MessageSend(MessageSendEvent::Friend {
            target: friend.clone(),
            message: message.clone(),
            cancel: CancelFlag::new(),
        });
        self.events().broadcast(&event);
        if event.is_cancelled() {
            debug!(friend = friend.id(), "Friend message cancelled by subscriber");
            return Err(BotError::EventCancelled);
        }

        let reply = self
            .request(ProtocolMessage::SendFriendMessage {
                friend_id: friend.id(),
                message: message.elements().to_vec(),
            })
            .await?;
        receipt(
            reply,
            self.uin(),
            SourceKind::Friend {
                friend_id: friend.id(),
            },
            Contact::Friend(friend.clone()),
        )
    }

    /// Send a group message.
    ///
    /// Fails with `PermissionDenied` while the bot is muted, or while the
    /// whole group is muted and the bot is not an operator.
    pub async fn send_group_message(
        &self,
        group: &Group,
        message: MessageChain,
    ) -> Result<MessageReceipt> {
        ensure_not_empty(&message)?;
        let info = self.directory().require_group(group.id())?.info();
        if info.bot_mute_seconds_remaining() > 0 {
            return Err(BotError::PermissionDenied(format!(
                "bot is muted in group {}",
                group.id()
            )));
        }
        if info.settings.mute_all && !info.bot_permission.is_operator() {
            return Err(BotError::PermissionDenied(format!(
                "group {} is muted",
                group.id()
            )));
        }

        let event = BotEvent::MessageSend(MessageSendEvent::Group {
            target: group.clone(),
            message: message.clone(),
            cancel: CancelFlag::new(),
        });
        self.events().broadcast(&event);
        if event.is_cancelled() {
            debug!(group = group.id(), "Group message cancelled by subscriber");
            return Err(BotError::EventCancelled);
        }

        let reply = self
            .request(ProtocolMessage::SendGroupMessage {
                group_id: group.id(),
                message: message.elements().to_vec(),
            })
            .await?;
        receipt(
            reply,
            self.uin(),
            SourceKind::Group {
                group_id: group.id(),
            },
            Contact::Group(group.clone()),
        )
    }

    /// Recall a message.
    ///
    /// The bot may recall its own messages, and group messages of members it
    /// outranks. Friends' messages cannot be recalled.
    pub async fn recall(&self, source: &MessageSource) -> Result<()> {
        if source.author_id != self.uin() {
            match source.kind {
                SourceKind::Friend { .. } => {
                    return Err(BotError::PermissionDenied(
                        "cannot recall a friend's message".to_string(),
                    ));
                },
                SourceKind::Group { group_id } => {
                    let bot_permission =
                        self.directory().require_group(group_id)?.info().bot_permission;
                    let author_permission = self
                        .directory()
                        .member(group_id, source.author_id)
                        .map_or(MemberPermission::Member, |m| m.permission);
                    if bot_permission <= author_permission {
                        return Err(BotError::PermissionDenied(format!(
                            "{bot_permission:?} cannot recall a message of {author_permission:?}"
                        )));
                    }
                },
            }
        }

        expect_ack(self.request(ProtocolMessage::Recall { source: *source }).await?)
    }

    /// Upload an image for use in messages to `target`.
    ///
    /// Publishes a cancellable [`BeforeImageUploadEvent`], then exactly one
    /// [`ImageUploadEvent`] with the outcome.
    pub async fn upload_image(&self, target: &Contact, image: ExternalImage) -> Result<Image> {
        let before = BotEvent::BeforeImageUpload(BeforeImageUploadEvent {
            target: target.clone(),
            source: image.clone(),
            cancel: CancelFlag::new(),
        });
        self.events().broadcast(&before);
        if before.is_cancelled() {
            return Err(BotError::EventCancelled);
        }

        let result = self.transfer_image(target, &image).await;
        let after = match &result {
            Ok(uploaded) => ImageUploadEvent::Succeed {
                target: target.clone(),
                source: image,
                image: uploaded.clone(),
            },
            Err(err) => {
                warn!(target = target.id(), error = %err, "Image upload failed");
                ImageUploadEvent::Failed {
                    target: target.clone(),
                    source: image,
                    error_code: match err {
                        BotError::Remote { code, .. } => *code,
                        _ => -1,
                    },
                    message: err.to_string(),
                }
            },
        };
        self.events().broadcast(&BotEvent::ImageUpload(after));
        result
    }

    async fn transfer_image(&self, target: &Contact, image: &ExternalImage) -> Result<Image> {
        let reply = self
            .request(ProtocolMessage::UploadImageRequest {
                target: ContactRef {
                    kind: target.kind(),
                    id: target.id(),
                },
                digest: image.digest().to_vec(),
                size: image.len() as u64,
            })
            .await?;
        let (image_id, upload_url) = match reply {
            ProtocolMessage::UploadTicket {
                image_id,
                upload_url,
            } => (image_id, upload_url),
            other => return Err(unexpected("upload_ticket", &other)),
        };

        match upload_url {
            Some(url) => {
                debug!(image_id = %image_id, size = image.len(), "Uploading image");
                self.0.media.upload(&url, image.data().clone()).await?;
            },
            None => debug!(image_id = %image_id, "Image already on server"),
        }
        Ok(Image::new(image_id))
    }

    /// Download URL of an uploaded image
    pub async fn query_image_url(&self, image: &Image) -> Result<String> {
        let reply = self
            .request(ProtocolMessage::QueryImageUrl {
                image_id: image.id().to_string(),
            })
            .await?;
        match reply {
            ProtocolMessage::ImageUrl { url } => Ok(url),
            other => Err(unexpected("image_url", &other)),
        }
    }

    /// Stream an uploaded image's bytes
    pub async fn download_image(&self, image: &Image) -> Result<MediaStream> {
        let url = self.query_image_url(image).await?;
        self.0.media.download(&url).await
    }

    pub(crate) async fn set_group_name(&self, group: &Group, name: String) -> Result<()> {
        if name.trim().is_empty() {
            return Err(BotError::InvalidArgument(
                "group name must not be empty".to_string(),
            ));
        }
        let info = self.directory().require_group(group.id())?.info();
        if !info.bot_permission.is_operator() {
            return Err(BotError::PermissionDenied(format!(
                "renaming group {} requires administrator",
                group.id()
            )));
        }
        expect_ack(
            self.request(ProtocolMessage::SetGroupName {
                group_id: group.id(),
                name,
            })
            .await?,
        )
    }

    pub(crate) async fn mute_member(&self, member: &Member, duration: Duration) -> Result<()> {
        if duration < Duration::from_secs(1) || duration > MAX_MUTE_DURATION {
            return Err(BotError::InvalidArgument(format!(
                "mute duration {duration:?} outside 1s..=30d"
            )));
        }
        self.check_outranks(member)?;
        let seconds = u32::try_from(duration.as_secs())
            .map_err(|_| BotError::InvalidArgument("mute duration too long".to_string()))?;
        expect_ack(
            self.request(ProtocolMessage::MuteMember {
                group_id: member.group_id(),
                member_id: member.id(),
                seconds,
            })
            .await?,
        )
    }

    pub(crate) async fn unmute_member(&self, member: &Member) -> Result<()> {
        self.check_outranks(member)?;
        expect_ack(
            self.request(ProtocolMessage::MuteMember {
                group_id: member.group_id(),
                member_id: member.id(),
                seconds: 0,
            })
            .await?,
        )
    }

    pub(crate) async fn kick_member(&self, member: &Member, reason: String) -> Result<()> {
        self.check_outranks(member)?;
        expect_ack(
            self.request(ProtocolMessage::KickMember {
                group_id: member.group_id(),
                member_id: member.id(),
                reason,
            })
            .await?,
        )
    }

    fn check_outranks(&self, member: &Member) -> Result<()> {
        if member.is_bot() {
            return Err(BotError::PermissionDenied(
                "the bot cannot act on itself".to_string(),
            ));
        }
        let bot_permission = self
            .directory()
            .require_group(member.group_id())?
            .info()
            .bot_permission;
        let target = self
            .directory()
            .require_member(member.group_id(), member.id())?;
        if bot_permission <= target.permission {
            return Err(BotError::PermissionDenied(format!(
                "{bot_permission:?} does not outrank {:?} {}",
                target.permission,
                member.id()
            )));
        }
        Ok(())
    }
}

fn ensure_not_empty(message: &MessageChain) -> Result<()> {
    if message.is_empty() {
        return Err(BotError::InvalidArgument("message is empty".to_string()));
    }
    Ok(())
}

fn receipt(
    reply: ProtocolMessage,
    author_id: u64,
    kind: SourceKind,
    target: Contact,
) -> Result<MessageReceipt> {
    match reply {
        ProtocolMessage::Receipt { message_id, time } => Ok(MessageReceipt {
            source: MessageSource {
                id: message_id,
                author_id,
                time_seconds: time,
                kind,
            },
            target,
        }),
        other => Err(unexpected("receipt", &other)),
    }
}

fn expect_ack(reply: ProtocolMessage) -> Result<()> {
    match reply {
        ProtocolMessage::Ack => Ok(()),
        other => Err(unexpected("ack", &other)),
    }
}

fn unexpected(expected: &str, got: &ProtocolMessage) -> BotError {
    BotError::Protocol(format!("expected {expected}, got {}", got.kind()))
}

impl PartialEq for Bot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Bot {}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("uin", &self.uin())
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bot({})", self.uin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_bot(uin: u64) -> Bot {
        Bot::builder(uin, "pw")
            .transport(Arc::new(TcpTransport::new(
                "127.0.0.1:1",
                Duration::from_millis(10),
            )))
            .build()
            .unwrap()
    }

    #[test]
    fn test_registry_lifecycle() {
        let bot = offline_bot(900_001);
        assert_eq!(Bot::get_instance(900_001).unwrap(), bot);
        assert!(matches!(
            Bot::builder(900_001, "pw").build(),
            Err(BotError::DuplicateBot(900_001))
        ));

        let weak = bot.downgrade();
        drop(bot);
        assert!(weak.upgrade().is_none());
        assert!(matches!(weak.require(), Err(BotError::BotDropped)));
        assert!(matches!(
            Bot::get_instance(900_001),
            Err(BotError::NoSuchBot(900_001))
        ));
        assert!(Bot::instances().iter().all(|b| b.uin() != 900_001));

        // uin is free again
        let again = offline_bot(900_001);
        assert_eq!(again.uin(), 900_001);
    }

    #[test]
    fn test_for_each_instance_sees_live_bots() {
        let a = offline_bot(900_011);
        let b = offline_bot(900_012);
        let mut seen = Vec::new();
        Bot::for_each_instance(|bot| seen.push(bot.uin()));
        assert!(seen.contains(&a.uin()));
        assert!(seen.contains(&b.uin()));
    }

    #[test]
    fn test_lookups_before_login() {
        let bot = offline_bot(900_021);
        assert_eq!(bot.state(), SessionState::Disconnected);
        assert!(bot.friends().is_empty());
        assert!(matches!(bot.get_group(1), Err(BotError::NoSuchContact { .. })));
        assert!(bot.self_friend().is_self());
        assert_eq!(bot.to_string(), "Bot(900021)");
    }

    #[tokio::test]
    async fn test_send_before_login_is_not_online() {
        let bot = offline_bot(900_031);
        let err = bot
            .request(ProtocolMessage::Heartbeat)
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::NotOnline));
    }

    #[tokio::test]
    async fn test_mute_range_checked_first() {
        let bot = offline_bot(900_041);
        let member = Member::new(1, 2, bot.downgrade());
        assert!(matches!(
            bot.mute_member(&member, Duration::ZERO).await,
            Err(BotError::InvalidArgument(_))
        ));
        assert!(matches!(
            bot.mute_member(&member, MAX_MUTE_DURATION + Duration::from_secs(1)).await,
            Err(BotError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_join_ok() {
        let bot = offline_bot(900_051);
        bot.close(Some("done".into()));
        bot.close(None);
        assert_eq!(bot.state(), SessionState::Closed);
        bot.join().await.unwrap();
        assert!(matches!(bot.login().await, Err(BotError::SessionClosed)));
    }
}
