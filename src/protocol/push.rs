//! Server push notifications.
//!
//! Pushes carry the new value only. The previous value for change events is
//! read from the contact directory before the push is applied.
//! `operator_id` equal to the bot's uin means the bot made the change.

use serde::{Deserialize, Serialize};

use crate::contact::{GroupSnapshot, MemberInfo, MemberPermission};
use crate::message::MessageElement;

/// Push notification body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PushNotice {
    GroupNameChanged {
        group_id: u64,
        name: String,
        operator_id: u64,
    },
    AnnouncementChanged {
        group_id: u64,
        text: String,
        operator_id: u64,
    },
    MuteAllChanged {
        group_id: u64,
        enabled: bool,
        operator_id: u64,
    },
    AnonymousChatChanged {
        group_id: u64,
        enabled: bool,
        operator_id: u64,
    },
    ConfessTalkChanged {
        group_id: u64,
        enabled: bool,
        operator_id: u64,
    },
    MemberInviteChanged {
        group_id: u64,
        enabled: bool,
        operator_id: u64,
    },
    BotPermissionChanged {
        group_id: u64,
        permission: MemberPermission,
    },
    BotMuted {
        group_id: u64,
        seconds: u32,
        operator_id: u64,
    },
    BotUnmuted {
        group_id: u64,
        operator_id: u64,
    },
    BotJoinedGroup {
        group: GroupSnapshot,
    },
    MemberJoined {
        group_id: u64,
        member: MemberInfo,
    },
    MemberKicked {
        group_id: u64,
        member_id: u64,
        operator_id: u64,
    },
    MemberQuit {
        group_id: u64,
        member_id: u64,
    },
    MemberPermissionChanged {
        group_id: u64,
        member_id: u64,
        permission: MemberPermission,
    },
    MemberMuted {
        group_id: u64,
        member_id: u64,
        seconds: u32,
        operator_id: u64,
    },
    MemberUnmuted {
        group_id: u64,
        member_id: u64,
        operator_id: u64,
    },
    MemberCardChanged {
        group_id: u64,
        member_id: u64,
        card: String,
        operator_id: u64,
    },
    MemberTitleChanged {
        group_id: u64,
        member_id: u64,
        title: String,
    },
    FriendRecall {
        friend_id: u64,
        message_id: u32,
        time: i64,
    },
    GroupRecall {
        group_id: u64,
        author_id: u64,
        message_id: u32,
        time: i64,
        operator_id: u64,
    },
    FriendMessage {
        friend_id: u64,
        message_id: u32,
        time: i64,
        message: Vec<MessageElement>,
    },
    GroupMessage {
        group_id: u64,
        sender_id: u64,
        message_id: u32,
        time: i64,
        message: Vec<MessageElement>,
    },
    /// Session terminated by the server
    ForceOffline {
        title: String,
        message: String,
    },
}
