//! Concrete bot events.
//!
//! # Taxonomy
//!
//! | Family          | Events                                                        |
//! |-----------------|---------------------------------------------------------------|
//! | Lifecycle       | `BotOnline`, `BotOffline{Active,Force,Dropped}`, `BotRelogin` |
//! | Outgoing        | `MessageSend` (cancellable), `BeforeImageUpload` (cancellable), `ImageUpload` |
//! | Incoming        | `FriendMessage`, `GroupMessage`, `MessageRecall`              |
//! | Bot in group    | `BotGroupPermissionChange`, `BotMute`, `BotUnmute`, `BotJoinGroup` |
//! | Group settings  | name, announcement, mute-all, anonymous chat, confess talk, member invite |
//! | Members         | join, leave (kick/quit), card, special title, permission, mute, unmute |
//!
//! Group setting events are suppressed by the bus when the value did not
//! actually change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{BroadcastControllable, Cancellable, EventOrigin, GroupSettingChange};
use crate::contact::{Contact, Friend, Group, Member, MemberInfo, MemberPermission};
use crate::message::{ExternalImage, Image, MessageChain};

/// Shared cancellation state of one cancellable event.
///
/// Clones observe the same flag, so a subscriber cancelling its copy of the
/// event is visible to the publisher.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A fresh, uncancelled flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark cancelled
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether any holder cancelled
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The bot finished logging in (initial login or reconnect).
#[derive(Debug, Clone)]
pub struct BotOnlineEvent {
    /// Bot uin
    pub bot_uin: u64,
}

/// The bot went offline.
#[derive(Debug, Clone)]
pub enum BotOfflineEvent {
    /// Closed locally via `close`
    Active {
        /// Bot uin
        bot_uin: u64,
        /// Reason given to `close`, if any
        cause: Option<String>,
    },
    /// Kicked by the server; no reconnection follows
    Force {
        /// Bot uin
        bot_uin: u64,
        /// Notice title
        title: String,
        /// Notice body
        message: String,
    },
    /// Connection lost; reconnection follows
    Dropped {
        /// Bot uin
        bot_uin: u64,
        /// What broke the connection
        cause: String,
    },
}

/// A reconnect attempt is starting.
#[derive(Debug, Clone)]
pub struct BotReloginEvent {
    /// Bot uin
    pub bot_uin: u64,
    /// Attempt number, starting at 1
    pub attempt: u32,
    /// Why the previous connection ended
    pub cause: String,
}

/// The bot is about to send a message. Cancelling it aborts the send.
#[derive(Debug, Clone)]
pub enum MessageSendEvent {
    /// Message to a group
    Group {
        /// Destination
        target: Group,
        /// Message about to be sent
        message: MessageChain,
        /// Cancellation state
        cancel: CancelFlag,
    },
    /// Message to a friend
    Friend {
        /// Destination
        target: Friend,
        /// Message about to be sent
        message: MessageChain,
        /// Cancellation state
        cancel: CancelFlag,
    },
}

impl MessageSendEvent {
    /// Message about to be sent
    pub fn message(&self) -> &MessageChain {
        match self {
            Self::Group { message, .. } | Self::Friend { message, .. } => message,
        }
    }

    /// Destination
    pub fn target(&self) -> Contact {
        match self {
            Self::Group { target, .. } => Contact::Group(target.clone()),
            Self::Friend { target, .. } => Contact::Friend(target.clone()),
        }
    }
}

impl Cancellable for MessageSendEvent {
    fn cancel_flag(&self) -> &CancelFlag {
        match self {
            Self::Group { cancel, .. } | Self::Friend { cancel, .. } => cancel,
        }
    }
}

/// A message was recalled.
#[derive(Debug, Clone)]
pub enum MessageRecallEvent {
    /// A message between the bot and a friend was recalled by the friend
    FriendRecall {
        /// Bot uin
        bot_uin: u64,
        /// Recalled message id
        message_id: u32,
        /// Recalled message timestamp (seconds)
        message_time: i64,
        /// Friend who recalled
        operator_id: u64,
    },
    /// A group message was recalled
    GroupRecall {
        /// Bot uin
        bot_uin: u64,
        /// Uin of the message author
        author_id: u64,
        /// Recalled message id
        message_id: u32,
        /// Recalled message timestamp (seconds)
        message_time: i64,
        /// Who recalled; `None` when the bot did
        operator: Option<Member>,
        /// Group
        group: Group,
    },
}

impl MessageRecallEvent {
    /// Uin of the recalled message's author.
    ///
    /// A friend can only recall messages in a private chat that the bot
    /// received, and the recall notice reports the bot's side, so the
    /// author of a `FriendRecall` is always the bot.
    pub fn author_id(&self) -> u64 {
        match self {
            Self::FriendRecall { bot_uin, .. } => *bot_uin,
            Self::GroupRecall { author_id, .. } => *author_id,
        }
    }

    /// Recalled message id
    pub fn message_id(&self) -> u32 {
        match self {
            Self::FriendRecall { message_id, .. } | Self::GroupRecall { message_id, .. } => {
                *message_id
            },
        }
    }

    /// Whether the bot performed the recall
    pub fn is_by_bot(&self) -> bool {
        match self {
            Self::FriendRecall {
                bot_uin,
                operator_id,
                ..
            } => operator_id == bot_uin,
            Self::GroupRecall { operator, .. } => operator.is_none(),
        }
    }

    /// Author of a group recall as a member handle; the bot itself when it
    /// authored the message.
    pub fn author(&self) -> Option<Member> {
        match self {
            Self::FriendRecall { .. } => None,
            Self::GroupRecall {
                bot_uin,
                author_id,
                group,
                ..
            } => Some(if author_id == bot_uin {
                group.bot_as_member()
            } else {
                group.member_handle(*author_id)
            }),
        }
    }
}

/// An image upload is about to start. Cancelling it aborts the upload.
#[derive(Debug, Clone)]
pub struct BeforeImageUploadEvent {
    /// Chat the image is for
    pub target: Contact,
    /// Image to upload
    pub source: ExternalImage,
    /// Cancellation state
    pub cancel: CancelFlag,
}

impl Cancellable for BeforeImageUploadEvent {
    fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }
}

/// An image upload finished.
#[derive(Debug, Clone)]
pub enum ImageUploadEvent {
    /// Upload succeeded
    Succeed {
        /// Chat the image is for
        target: Contact,
        /// Uploaded image
        source: ExternalImage,
        /// Server-side image
        image: Image,
    },
    /// Upload failed
    Failed {
        /// Chat the image was for
        target: Contact,
        /// Image that failed
        source: ExternalImage,
        /// Server or transport error code
        error_code: i32,
        /// Error message
        message: String,
    },
}

/// The bot's privilege in a group changed.
#[derive(Debug, Clone)]
pub struct BotGroupPermissionChangeEvent {
    /// Group
    pub group: Group,
    /// Previous privilege
    pub origin: MemberPermission,
    /// New privilege
    pub new: MemberPermission,
}

/// The bot was muted in a group.
#[derive(Debug, Clone)]
pub struct BotMuteEvent {
    /// Mute length in seconds
    pub duration_seconds: u32,
    /// Member who muted the bot
    pub operator: Member,
}

/// The bot's mute was lifted.
#[derive(Debug, Clone)]
pub struct BotUnmuteEvent {
    /// Member who lifted the mute
    pub operator: Member,
}

/// The bot joined a group.
#[derive(Debug, Clone)]
pub struct BotJoinGroupEvent {
    /// Group joined
    pub group: Group,
}

/// A group was renamed.
#[derive(Debug, Clone)]
pub struct GroupNameChangeEvent {
    /// Previous name
    pub origin: String,
    /// New name
    pub new: String,
    /// Group
    pub group: Group,
    /// Whether the bot renamed it
    pub is_by_bot: bool,
}

/// A group's entrance announcement changed.
#[derive(Debug, Clone)]
pub struct GroupEntranceAnnouncementChangeEvent {
    /// Previous announcement
    pub origin: String,
    /// New announcement
    pub new: String,
    /// Group
    pub group: Group,
    /// Who changed it; `None` when the bot did
    pub operator: Option<Member>,
}

/// Whole-group mute toggled.
#[derive(Debug, Clone)]
pub struct GroupMuteAllEvent {
    /// Previous state
    pub origin: bool,
    /// New state
    pub new: bool,
    /// Group
    pub group: Group,
    /// Who changed it; `None` when the bot did
    pub operator: Option<Member>,
}

/// Anonymous chat toggled.
#[derive(Debug, Clone)]
pub struct GroupAllowAnonymousChatEvent {
    /// Previous state
    pub origin: bool,
    /// New state
    pub new: bool,
    /// Group
    pub group: Group,
    /// Who changed it; `None` when the bot did
    pub operator: Option<Member>,
}

/// Confess talk toggled.
#[derive(Debug, Clone)]
pub struct GroupAllowConfessTalkEvent {
    /// Previous state
    pub origin: bool,
    /// New state
    pub new: bool,
    /// Group
    pub group: Group,
    /// Whether the bot changed it
    pub is_by_bot: bool,
}

/// Member invitation toggled.
#[derive(Debug, Clone)]
pub struct GroupAllowMemberInviteEvent {
    /// Previous state
    pub origin: bool,
    /// New state
    pub new: bool,
    /// Group
    pub group: Group,
    /// Who changed it; `None` when the bot did
    pub operator: Option<Member>,
}

macro_rules! group_setting_change {
    ($($event:ty => $value:ty),+ $(,)?) => {
        $(
            impl GroupSettingChange for $event {
                type Value = $value;

                fn origin(&self) -> &$value {
                    &self.origin
                }

                fn new_value(&self) -> &$value {
                    &self.new
                }

                fn group(&self) -> &Group {
                    &self.group
                }
            }

            impl BroadcastControllable for $event {
                fn should_broadcast(&self) -> bool {
                    self.is_changed()
                }
            }
        )+
    };
}

group_setting_change! {
    GroupNameChangeEvent => String,
    GroupEntranceAnnouncementChangeEvent => String,
    GroupMuteAllEvent => bool,
    GroupAllowAnonymousChatEvent => bool,
    GroupAllowConfessTalkEvent => bool,
    GroupAllowMemberInviteEvent => bool,
}

/// A member joined a group.
#[derive(Debug, Clone)]
pub struct MemberJoinEvent {
    /// New member
    pub member: Member,
}

/// A member left a group.
///
/// The handle is already stale when subscribers run; `info` holds the last
/// known data.
#[derive(Debug, Clone)]
pub enum MemberLeaveEvent {
    /// Removed by an operator
    Kick {
        /// Member removed
        member: Member,
        /// Last known member data
        info: Arc<MemberInfo>,
        /// Who removed them; `None` when the bot did
        operator: Option<Member>,
    },
    /// Left voluntarily
    Quit {
        /// Member who left
        member: Member,
        /// Last known member data
        info: Arc<MemberInfo>,
    },
}

impl MemberLeaveEvent {
    /// Member who left
    pub fn member(&self) -> &Member {
        match self {
            Self::Kick { member, .. } | Self::Quit { member, .. } => member,
        }
    }
}

/// A member's group card changed.
#[derive(Debug, Clone)]
pub struct MemberCardChangeEvent {
    /// Previous card
    pub origin: String,
    /// New card
    pub new: String,
    /// Member
    pub member: Member,
    /// Who changed it; `None` when the bot did
    pub operator: Option<Member>,
}

/// A member's special title changed.
#[derive(Debug, Clone)]
pub struct MemberSpecialTitleChangeEvent {
    /// Previous title
    pub origin: String,
    /// New title
    pub new: String,
    /// Member
    pub member: Member,
}

/// A member's privilege changed.
#[derive(Debug, Clone)]
pub struct MemberPermissionChangeEvent {
    /// Member
    pub member: Member,
    /// Previous privilege
    pub origin: MemberPermission,
    /// New privilege
    pub new: MemberPermission,
}

/// A member was muted.
#[derive(Debug, Clone)]
pub struct MemberMuteEvent {
    /// Member muted
    pub member: Member,
    /// Mute length in seconds
    pub duration_seconds: u32,
    /// Who muted them; `None` when the bot did
    pub operator: Option<Member>,
}

/// A member's mute was lifted.
#[derive(Debug, Clone)]
pub struct MemberUnmuteEvent {
    /// Member unmuted
    pub member: Member,
    /// Who lifted the mute; `None` when the bot did
    pub operator: Option<Member>,
}

/// A private message arrived.
#[derive(Debug, Clone)]
pub struct FriendMessageEvent {
    /// Sender
    pub sender: Friend,
    /// Message, with its source
    pub message: MessageChain,
}

/// A group message arrived.
#[derive(Debug, Clone)]
pub struct GroupMessageEvent {
    /// Sender
    pub sender: Member,
    /// Message, with its source
    pub message: MessageChain,
}

impl GroupMessageEvent {
    /// Group the message was posted in
    pub fn group(&self) -> Group {
        self.sender.group()
    }
}

/// Every event a bot can publish.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum BotEvent {
    Online(BotOnlineEvent),
    Offline(BotOfflineEvent),
    Relogin(BotReloginEvent),
    MessageSend(MessageSendEvent),
    MessageRecall(MessageRecallEvent),
    BeforeImageUpload(BeforeImageUploadEvent),
    ImageUpload(ImageUploadEvent),
    BotGroupPermissionChange(BotGroupPermissionChangeEvent),
    BotMute(BotMuteEvent),
    BotUnmute(BotUnmuteEvent),
    BotJoinGroup(BotJoinGroupEvent),
    GroupNameChange(GroupNameChangeEvent),
    GroupEntranceAnnouncementChange(GroupEntranceAnnouncementChangeEvent),
    GroupMuteAll(GroupMuteAllEvent),
    GroupAllowAnonymousChat(GroupAllowAnonymousChatEvent),
    GroupAllowConfessTalk(GroupAllowConfessTalkEvent),
    GroupAllowMemberInvite(GroupAllowMemberInviteEvent),
    MemberJoin(MemberJoinEvent),
    MemberLeave(MemberLeaveEvent),
    MemberCardChange(MemberCardChangeEvent),
    MemberSpecialTitleChange(MemberSpecialTitleChangeEvent),
    MemberPermissionChange(MemberPermissionChangeEvent),
    MemberMute(MemberMuteEvent),
    MemberUnmute(MemberUnmuteEvent),
    FriendMessage(FriendMessageEvent),
    GroupMessage(GroupMessageEvent),
}

fn operator_origin(operator: Option<&Member>) -> EventOrigin {
    if operator.is_none() {
        EventOrigin::Active
    } else {
        EventOrigin::Passive
    }
}

fn by_bot_origin(is_by_bot: bool) -> EventOrigin {
    if is_by_bot {
        EventOrigin::Active
    } else {
        EventOrigin::Passive
    }
}

impl BotEvent {
    /// Short stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Online(_) => "BotOnline",
            Self::Offline(BotOfflineEvent::Active { .. }) => "BotOffline.Active",
            Self::Offline(BotOfflineEvent::Force { .. }) => "BotOffline.Force",
            Self::Offline(BotOfflineEvent::Dropped { .. }) => "BotOffline.Dropped",
            Self::Relogin(_) => "BotRelogin",
            Self::MessageSend(_) => "MessageSend",
            Self::MessageRecall(MessageRecallEvent::FriendRecall { .. }) => "FriendRecall",
            Self::MessageRecall(MessageRecallEvent::GroupRecall { .. }) => "GroupRecall",
            Self::BeforeImageUpload(_) => "BeforeImageUpload",
            Self::ImageUpload(ImageUploadEvent::Succeed { .. }) => "ImageUpload.Succeed",
            Self::ImageUpload(ImageUploadEvent::Failed { .. }) => "ImageUpload.Failed",
            Self::BotGroupPermissionChange(_) => "BotGroupPermissionChange",
            Self::BotMute(_) => "BotMute",
            Self::BotUnmute(_) => "BotUnmute",
            Self::BotJoinGroup(_) => "BotJoinGroup",
            Self::GroupNameChange(_) => "GroupNameChange",
            Self::GroupEntranceAnnouncementChange(_) => "GroupEntranceAnnouncementChange",
            Self::GroupMuteAll(_) => "GroupMuteAll",
            Self::GroupAllowAnonymousChat(_) => "GroupAllowAnonymousChat",
            Self::GroupAllowConfessTalk(_) => "GroupAllowConfessTalk",
            Self::GroupAllowMemberInvite(_) => "GroupAllowMemberInvite",
            Self::MemberJoin(_) => "MemberJoin",
            Self::MemberLeave(MemberLeaveEvent::Kick { .. }) => "MemberLeave.Kick",
            Self::MemberLeave(MemberLeaveEvent::Quit { .. }) => "MemberLeave.Quit",
            Self::MemberCardChange(_) => "MemberCardChange",
            Self::MemberSpecialTitleChange(_) => "MemberSpecialTitleChange",
            Self::MemberPermissionChange(_) => "MemberPermissionChange",
            Self::MemberMute(_) => "MemberMute",
            Self::MemberUnmute(_) => "MemberUnmute",
            Self::FriendMessage(_) => "FriendMessage",
            Self::GroupMessage(_) => "GroupMessage",
        }
    }

    /// Uin of the bot that published the event.
    pub fn bot_uin(&self) -> u64 {
        match self {
            Self::Online(e) => e.bot_uin,
            Self::Offline(
                BotOfflineEvent::Active { bot_uin, .. }
                | BotOfflineEvent::Force { bot_uin, .. }
                | BotOfflineEvent::Dropped { bot_uin, .. },
            ) => *bot_uin,
            Self::Relogin(e) => e.bot_uin,
            Self::MessageSend(e) => e.target().bot_uin(),
            Self::MessageRecall(
                MessageRecallEvent::FriendRecall { bot_uin, .. }
                | MessageRecallEvent::GroupRecall { bot_uin, .. },
            ) => *bot_uin,
            Self::BeforeImageUpload(e) => e.target.bot_uin(),
            Self::ImageUpload(
                ImageUploadEvent::Succeed { target, .. } | ImageUploadEvent::Failed { target, .. },
            ) => target.bot_uin(),
            Self::BotGroupPermissionChange(e) => e.group.bot_uin(),
            Self::BotMute(e) => e.operator.bot_uin(),
            Self::BotUnmute(e) => e.operator.bot_uin(),
            Self::BotJoinGroup(e) => e.group.bot_uin(),
            Self::GroupNameChange(e) => e.group.bot_uin(),
            Self::GroupEntranceAnnouncementChange(e) => e.group.bot_uin(),
            Self::GroupMuteAll(e) => e.group.bot_uin(),
            Self::GroupAllowAnonymousChat(e) => e.group.bot_uin(),
            Self::GroupAllowConfessTalk(e) => e.group.bot_uin(),
            Self::GroupAllowMemberInvite(e) => e.group.bot_uin(),
            Self::MemberJoin(e) => e.member.bot_uin(),
            Self::MemberLeave(e) => e.member().bot_uin(),
            Self::MemberCardChange(e) => e.member.bot_uin(),
            Self::MemberSpecialTitleChange(e) => e.member.bot_uin(),
            Self::MemberPermissionChange(e) => e.member.bot_uin(),
            Self::MemberMute(e) => e.member.bot_uin(),
            Self::MemberUnmute(e) => e.member.bot_uin(),
            Self::FriendMessage(e) => e.sender.bot_uin(),
            Self::GroupMessage(e) => e.sender.bot_uin(),
        }
    }

    /// Whether the bot caused the event or merely observed it.
    ///
    /// `None` for events that are neither, such as recalls.
    pub fn origin(&self) -> Option<EventOrigin> {
        match self {
            Self::Online(_)
            | Self::Offline(BotOfflineEvent::Active { .. })
            | Self::Relogin(_)
            | Self::MessageSend(_)
            | Self::BeforeImageUpload(_)
            | Self::ImageUpload(_) => Some(EventOrigin::Active),
            Self::Offline(_)
            | Self::BotGroupPermissionChange(_)
            | Self::BotMute(_)
            | Self::BotUnmute(_)
            | Self::BotJoinGroup(_)
            | Self::MemberJoin(_)
            | Self::MemberSpecialTitleChange(_)
            | Self::MemberPermissionChange(_)
            | Self::FriendMessage(_)
            | Self::GroupMessage(_) => Some(EventOrigin::Passive),
            Self::GroupNameChange(e) => Some(by_bot_origin(e.is_by_bot)),
            Self::GroupAllowConfessTalk(e) => Some(by_bot_origin(e.is_by_bot)),
            Self::GroupEntranceAnnouncementChange(e) => {
                Some(operator_origin(e.operator.as_ref()))
            },
            Self::GroupMuteAll(e) => Some(operator_origin(e.operator.as_ref())),
            Self::GroupAllowAnonymousChat(e) => Some(operator_origin(e.operator.as_ref())),
            Self::GroupAllowMemberInvite(e) => Some(operator_origin(e.operator.as_ref())),
            Self::MemberLeave(MemberLeaveEvent::Kick { operator, .. }) => {
                Some(operator_origin(operator.as_ref()))
            },
            Self::MemberLeave(MemberLeaveEvent::Quit { .. }) => Some(EventOrigin::Passive),
            Self::MemberCardChange(e) => Some(operator_origin(e.operator.as_ref())),
            Self::MemberMute(e) => Some(operator_origin(e.operator.as_ref())),
            Self::MemberUnmute(e) => Some(operator_origin(e.operator.as_ref())),
            Self::MessageRecall(_) => None,
        }
    }

    /// Cancellation state, for cancellable events.
    pub fn cancel_flag(&self) -> Option<&CancelFlag> {
        match self {
            Self::MessageSend(e) => Some(e.cancel_flag()),
            Self::BeforeImageUpload(e) => Some(e.cancel_flag()),
            _ => None,
        }
    }

    /// Whether this event can be cancelled.
    pub fn is_cancellable(&self) -> bool {
        self.cancel_flag().is_some()
    }

    /// Cancel the event. No-op for events that are not cancellable.
    pub fn cancel(&self) {
        if let Some(flag) = self.cancel_flag() {
            flag.cancel();
        }
    }

    /// Whether a subscriber cancelled the event.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag().is_some_and(CancelFlag::is_cancelled)
    }

    /// Whether the bus should deliver this event at all.
    pub fn should_broadcast(&self) -> bool {
        match self {
            Self::GroupNameChange(e) => e.should_broadcast(),
            Self::GroupEntranceAnnouncementChange(e) => e.should_broadcast(),
            Self::GroupMuteAll(e) => e.should_broadcast(),
            Self::GroupAllowAnonymousChat(e) => e.should_broadcast(),
            Self::GroupAllowConfessTalk(e) => e.should_broadcast(),
            Self::GroupAllowMemberInvite(e) => e.should_broadcast(),
            _ => true,
        }
    }

    /// Whether the event comes from, or directly causes, protocol traffic.
    pub fn is_packet(&self) -> bool {
        !matches!(
            self,
            Self::Online(_)
                | Self::Offline(_)
                | Self::Relogin(_)
                | Self::BeforeImageUpload(_)
                | Self::ImageUpload(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::WeakBot;

    const BOT: u64 = 10_001;

    fn group() -> Group {
        Group::new(500, WeakBot::dangling(BOT))
    }

    fn rename(origin: &str, new: &str) -> BotEvent {
        BotEvent::GroupNameChange(GroupNameChangeEvent {
            origin: origin.to_string(),
            new: new.to_string(),
            group: group(),
            is_by_bot: false,
        })
    }

    #[test]
    fn test_setting_change_broadcast_predicate() {
        assert!(rename("Old", "New").should_broadcast());
        assert!(!rename("Same", "Same").should_broadcast());

        let unchanged = BotEvent::GroupMuteAll(GroupMuteAllEvent {
            origin: true,
            new: true,
            group: group(),
            operator: None,
        });
        assert!(!unchanged.should_broadcast());
        assert!(BotEvent::BotJoinGroup(BotJoinGroupEvent { group: group() }).should_broadcast());
    }

    #[test]
    fn test_friend_recall_author_is_bot() {
        let recall = MessageRecallEvent::FriendRecall {
            bot_uin: BOT,
            message_id: 3,
            message_time: 0,
            operator_id: 20_001,
        };
        assert_eq!(recall.author_id(), BOT);
        assert!(!recall.is_by_bot());
        assert!(recall.author().is_none());
    }

    #[test]
    fn test_group_recall_author_handle() {
        let recall = |author_id| MessageRecallEvent::GroupRecall {
            bot_uin: BOT,
            author_id,
            message_id: 4,
            message_time: 0,
            operator: None,
            group: group(),
        };
        assert!(recall(BOT).author().unwrap().is_bot());
        assert_eq!(recall(30_001).author().unwrap().id(), 30_001);
        assert!(recall(30_001).is_by_bot());
    }

    #[test]
    fn test_cancel_visible_through_clones() {
        let event = BotEvent::MessageSend(MessageSendEvent::Group {
            target: group(),
            message: MessageChain::from("hi"),
            cancel: CancelFlag::new(),
        });
        let copy = event.clone();
        copy.cancel();
        assert!(event.is_cancelled());

        // Not cancellable: cancel is a no-op
        let online = BotEvent::Online(BotOnlineEvent { bot_uin: BOT });
        online.cancel();
        assert!(!online.is_cancellable());
        assert!(!online.is_cancelled());
    }

    #[test]
    fn test_origin_from_operator() {
        let member = group().member_handle(30_001);
        let by_member = BotEvent::MemberCardChange(MemberCardChangeEvent {
            origin: String::new(),
            new: "card".to_string(),
            member: member.clone(),
            operator: Some(member.clone()),
        });
        assert_eq!(by_member.origin(), Some(EventOrigin::Passive));

        let by_bot = BotEvent::MemberCardChange(MemberCardChangeEvent {
            origin: String::new(),
            new: "card".to_string(),
            member,
            operator: None,
        });
        assert_eq!(by_bot.origin(), Some(EventOrigin::Active));
        assert_eq!(by_bot.bot_uin(), BOT);
        assert!(by_bot.is_packet());
    }
}
