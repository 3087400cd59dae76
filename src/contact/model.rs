//! Contact records as mirrored from the server roster.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which contact list an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// Friend list entry
    Friend,
    /// Group the bot belongs to
    Group,
    /// Member of a group
    Member,
}

impl ContactKind {
    /// Lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Friend => "friend",
            Self::Group => "group",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for ContactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Privilege of a member inside a group, ordered from least to most.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MemberPermission {
    /// Ordinary member
    #[default]
    Member,
    /// Group administrator
    Administrator,
    /// Group owner
    Owner,
}

impl MemberPermission {
    /// Administrator or owner.
    pub fn is_operator(&self) -> bool {
        *self >= Self::Administrator
    }

    /// Owner only.
    pub fn is_owner(&self) -> bool {
        *self == Self::Owner
    }
}

/// Friend list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendInfo {
    /// Friend uin
    pub id: u64,
    /// Nickname
    pub nick: String,
    /// Remark set by the bot
    #[serde(default)]
    pub remark: String,
}

/// Group member entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Member uin
    pub id: u64,
    /// Nickname
    pub nick: String,
    /// Group card (display name inside the group)
    #[serde(default)]
    pub card: String,
    /// Special title granted by the owner
    #[serde(default)]
    pub special_title: String,
    /// Member privilege
    #[serde(default)]
    pub permission: MemberPermission,
    /// End of the current mute, if any
    #[serde(default)]
    pub muted_until: Option<DateTime<Utc>>,
}

impl MemberInfo {
    /// Card if set, nickname otherwise.
    pub fn name_card_or_nick(&self) -> &str {
        if self.card.is_empty() {
            &self.nick
        } else {
            &self.card
        }
    }

    /// Seconds of mute left, 0 when not muted.
    pub fn mute_seconds_remaining(&self) -> u32 {
        remaining_seconds(self.muted_until)
    }

    /// Whether the member is currently muted.
    pub fn is_muted(&self) -> bool {
        self.mute_seconds_remaining() > 0
    }
}

/// Group-wide switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSettings {
    /// Whole-group mute
    pub mute_all: bool,
    /// Anonymous chat allowed
    pub anonymous_chat: bool,
    /// Confess talk allowed
    pub confess_talk: bool,
    /// Members may invite others
    pub member_invite: bool,
}

/// Group entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group id
    pub id: u64,
    /// Group name
    pub name: String,
    /// Owner uin
    pub owner_id: u64,
    /// Entrance announcement
    #[serde(default)]
    pub announcement: String,
    /// Group switches
    #[serde(default)]
    pub settings: GroupSettings,
    /// The bot's own privilege in this group
    #[serde(default)]
    pub bot_permission: MemberPermission,
    /// End of the bot's current mute, if any
    #[serde(default)]
    pub bot_muted_until: Option<DateTime<Utc>>,
}

impl GroupInfo {
    /// Seconds of mute left for the bot, 0 when not muted.
    pub fn bot_mute_seconds_remaining(&self) -> u32 {
        remaining_seconds(self.bot_muted_until)
    }
}

/// A group with its member list, as delivered in a roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    /// Group data
    pub info: GroupInfo,
    /// Members, excluding the bot itself
    #[serde(default)]
    pub members: Vec<MemberInfo>,
}

/// Full contact snapshot for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// The bot's own nickname
    #[serde(default)]
    pub nick: String,
    /// Friend list
    #[serde(default)]
    pub friends: Vec<FriendInfo>,
    /// Groups with members
    #[serde(default)]
    pub groups: Vec<GroupSnapshot>,
}

/// Mute end `seconds` from now, or `None` for zero.
pub(crate) fn mute_deadline(seconds: u32) -> Option<DateTime<Utc>> {
    (seconds > 0).then(|| Utc::now() + chrono::Duration::seconds(i64::from(seconds)))
}

fn remaining_seconds(until: Option<DateTime<Utc>>) -> u32 {
    until
        .map(|t| (t - Utc::now()).num_seconds().clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}
