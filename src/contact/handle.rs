//! Lightweight handles to contacts.
//!
//! A handle is an id plus a weak reference to the owning bot. It never holds
//! contact data itself: every accessor resolves through the bot's directory,
//! so a handle to a removed contact is stale and fails with `NoSuchContact`,
//! and a handle whose bot was dropped fails with `BotDropped`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::model::{
    ContactKind, FriendInfo, GroupInfo, GroupSettings, MemberInfo, MemberPermission,
};
use crate::bot::{Bot, WeakBot};
use crate::error::Result;
use crate::message::{ExternalImage, Image, MessageChain, MessageReceipt};

/// A friend of the bot.
#[derive(Clone)]
pub struct Friend {
    id: u64,
    bot: WeakBot,
}

impl Friend {
    pub(crate) fn new(id: u64, bot: WeakBot) -> Self {
        Self { id, bot }
    }

    /// Friend uin
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Owning bot's uin
    pub fn bot_uin(&self) -> u64 {
        self.bot.uin()
    }

    /// Owning bot
    pub fn bot(&self) -> Result<Bot> {
        self.bot.require()
    }

    /// Whether this is the bot's own synthetic friend entry
    pub fn is_self(&self) -> bool {
        self.id == self.bot.uin()
    }

    /// Current friend data
    pub fn info(&self) -> Result<Arc<FriendInfo>> {
        self.bot()?.directory().require_friend(self.id)
    }

    /// Current nickname
    pub fn nick(&self) -> Result<String> {
        Ok(self.info()?.nick.clone())
    }

    /// Send a private message
    pub async fn send_message(&self, message: impl Into<MessageChain>) -> Result<MessageReceipt> {
        self.bot()?.send_friend_message(self, message.into()).await
    }

    /// Upload an image for use in this chat
    pub async fn upload_image(&self, image: ExternalImage) -> Result<Image> {
        self.bot()?
            .upload_image(&Contact::Friend(self.clone()), image)
            .await
    }
}

impl PartialEq for Friend {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.bot.uin() == other.bot.uin()
    }
}

impl Eq for Friend {}

impl fmt::Debug for Friend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Friend({})", self.id)
    }
}

/// A group the bot belongs to.
#[derive(Clone)]
pub struct Group {
    id: u64,
    bot: WeakBot,
}

impl Group {
    pub(crate) fn new(id: u64, bot: WeakBot) -> Self {
        Self { id, bot }
    }

    /// Group id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Owning bot's uin
    pub fn bot_uin(&self) -> u64 {
        self.bot.uin()
    }

    /// Owning bot
    pub fn bot(&self) -> Result<Bot> {
        self.bot.require()
    }

    /// Current group data
    pub fn info(&self) -> Result<GroupInfo> {
        Ok(self.bot()?.directory().require_group(self.id)?.info())
    }

    /// Current name
    pub fn name(&self) -> Result<String> {
        Ok(self.info()?.name)
    }

    /// Current switches
    pub fn settings(&self) -> Result<GroupSettings> {
        Ok(self.info()?.settings)
    }

    /// The bot's privilege in this group
    pub fn bot_permission(&self) -> Result<MemberPermission> {
        Ok(self.info()?.bot_permission)
    }

    /// The bot viewed as a member of this group
    pub fn bot_as_member(&self) -> Member {
        Member::new(self.id, self.bot.uin(), self.bot.clone())
    }

    /// Group owner
    pub fn owner(&self) -> Result<Member> {
        let owner_id = self.info()?.owner_id;
        self.member(owner_id)
    }

    /// Look up a member, failing with `NoSuchContact`
    pub fn member(&self, member_id: u64) -> Result<Member> {
        self.bot()?.directory().require_member(self.id, member_id)?;
        Ok(Member::new(self.id, member_id, self.bot.clone()))
    }

    /// Handle to a member without checking the directory
    pub(crate) fn member_handle(&self, member_id: u64) -> Member {
        Member::new(self.id, member_id, self.bot.clone())
    }

    /// Look up a member
    pub fn get_member(&self, member_id: u64) -> Option<Member> {
        self.member(member_id).ok()
    }

    /// Whether `member_id` is in this group (the bot always is)
    pub fn contains(&self, member_id: u64) -> bool {
        self.bot
            .upgrade()
            .map(|bot| bot.directory().member(self.id, member_id).is_some())
            .unwrap_or(false)
    }

    /// All members except the bot
    pub fn members(&self) -> Result<Vec<Member>> {
        let entry = self.bot()?.directory().require_group(self.id)?;
        Ok(entry
            .members()
            .ids()
            .into_iter()
            .map(|id| Member::new(self.id, id, self.bot.clone()))
            .collect())
    }

    /// Send a group message
    pub async fn send_message(&self, message: impl Into<MessageChain>) -> Result<MessageReceipt> {
        self.bot()?.send_group_message(self, message.into()).await
    }

    /// Upload an image for use in this group
    pub async fn upload_image(&self, image: ExternalImage) -> Result<Image> {
        self.bot()?
            .upload_image(&Contact::Group(self.clone()), image)
            .await
    }

    /// Rename the group; requires administrator privilege
    pub async fn set_name(&self, name: impl Into<String>) -> Result<()> {
        self.bot()?.set_group_name(self, name.into()).await
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.bot.uin() == other.bot.uin()
    }
}

impl Eq for Group {}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group({})", self.id)
    }
}

/// A member of a group.
#[derive(Clone)]
pub struct Member {
    group_id: u64,
    id: u64,
    bot: WeakBot,
}

impl Member {
    pub(crate) fn new(group_id: u64, id: u64, bot: WeakBot) -> Self {
        Self { group_id, id, bot }
    }

    /// Member uin
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Owning bot's uin
    pub fn bot_uin(&self) -> u64 {
        self.bot.uin()
    }

    /// Owning bot
    pub fn bot(&self) -> Result<Bot> {
        self.bot.require()
    }

    /// Group this member belongs to
    pub fn group(&self) -> Group {
        Group::new(self.group_id, self.bot.clone())
    }

    /// Id of the group this member belongs to
    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    /// Whether this member is the bot itself
    pub fn is_bot(&self) -> bool {
        self.id == self.bot.uin()
    }

    /// Current member data
    pub fn info(&self) -> Result<Arc<MemberInfo>> {
        self.bot()?
            .directory()
            .require_member(self.group_id, self.id)
    }

    /// Current privilege
    pub fn permission(&self) -> Result<MemberPermission> {
        Ok(self.info()?.permission)
    }

    /// Card if set, nickname otherwise
    pub fn name_card_or_nick(&self) -> Result<String> {
        Ok(self.info()?.name_card_or_nick().to_string())
    }

    /// Mute for `duration` (1 second to 30 days); requires outranking the member
    pub async fn mute(&self, duration: Duration) -> Result<()> {
        self.bot()?.mute_member(self, duration).await
    }

    /// Lift a mute; requires outranking the member
    pub async fn unmute(&self) -> Result<()> {
        self.bot()?.unmute_member(self).await
    }

    /// Remove from the group; requires outranking the member
    pub async fn kick(&self, reason: impl Into<String>) -> Result<()> {
        self.bot()?.kick_member(self, reason.into()).await
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id
            && self.id == other.id
            && self.bot.uin() == other.bot.uin()
    }
}

impl Eq for Member {}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({}@{})", self.id, self.group_id)
    }
}

/// Any contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    /// A friend
    Friend(Friend),
    /// A group
    Group(Group),
    /// A group member
    Member(Member),
}

impl Contact {
    /// Contact id
    pub fn id(&self) -> u64 {
        match self {
            Self::Friend(f) => f.id(),
            Self::Group(g) => g.id(),
            Self::Member(m) => m.id(),
        }
    }

    /// Contact kind
    pub fn kind(&self) -> ContactKind {
        match self {
            Self::Friend(_) => ContactKind::Friend,
            Self::Group(_) => ContactKind::Group,
            Self::Member(_) => ContactKind::Member,
        }
    }

    /// Owning bot's uin
    pub fn bot_uin(&self) -> u64 {
        match self {
            Self::Friend(f) => f.bot_uin(),
            Self::Group(g) => g.bot_uin(),
            Self::Member(m) => m.bot_uin(),
        }
    }

    /// Owning bot
    pub fn bot(&self) -> Result<Bot> {
        match self {
            Self::Friend(f) => f.bot(),
            Self::Group(g) => g.bot(),
            Self::Member(m) => m.bot(),
        }
    }
}

impl From<Friend> for Contact {
    fn from(friend: Friend) -> Self {
        Self::Friend(friend)
    }
}

impl From<Group> for Contact {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}

impl From<Member> for Contact {
    fn from(member: Member) -> Self {
        Self::Member(member)
    }
}
