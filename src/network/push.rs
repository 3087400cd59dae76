//! Turning server pushes into directory updates and events.
//!
//! For change events the previous value is read from the directory before
//! the delta is applied, so `origin` is what the bot last knew. Operators are
//! resolved up front: an operator equal to the bot's uin becomes `None`, any
//! other operator must be a known member of the group.
//!
//! A push naming a contact the directory does not know fails with
//! `NoSuchContact`; the session treats that as drift and resyncs.

use crate::bot::Bot;
use crate::contact::model::mute_deadline;
use crate::contact::{DirectoryDelta, Friend, Group, Member};
use crate::error::Result;
use crate::event::{
    BotEvent, BotGroupPermissionChangeEvent, BotJoinGroupEvent, BotMuteEvent, BotUnmuteEvent,
    FriendMessageEvent, GroupAllowAnonymousChatEvent, GroupAllowConfessTalkEvent,
    GroupAllowMemberInviteEvent, GroupEntranceAnnouncementChangeEvent, GroupMessageEvent,
    GroupMuteAllEvent, GroupNameChangeEvent, MemberCardChangeEvent, MemberJoinEvent,
    MemberLeaveEvent, MemberMuteEvent, MemberPermissionChangeEvent,
    MemberSpecialTitleChangeEvent, MemberUnmuteEvent, MessageRecallEvent,
};
use crate::message::{MessageChain, MessageSource, SourceKind};
use crate::protocol::PushNotice;

/// What the session must do after a push was handled.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PushOutcome {
    /// Directory updated and event broadcast.
    Applied,
    /// Server kicked this session.
    ForceOffline { title: String, message: String },
}

/// Apply one push to `bot`'s directory and broadcast the resulting event.
pub(crate) fn apply(bot: &Bot, notice: PushNotice) -> Result<PushOutcome> {
    let uin = bot.uin();
    let dir = bot.directory();
    let weak = bot.downgrade();
    let group = |id: u64| Group::new(id, weak.clone());
    let member = |group_id: u64, id: u64| Member::new(group_id, id, weak.clone());

    let operator = |group_id: u64, operator_id: u64| -> Result<Option<Member>> {
        if operator_id == uin {
            return Ok(None);
        }
        dir.require_member(group_id, operator_id)?;
        Ok(Some(member(group_id, operator_id)))
    };

    let event = match notice {
        PushNotice::GroupNameChanged {
            group_id,
            name,
            operator_id,
        } => {
            let origin = dir.require_group(group_id)?.info().name;
            dir.apply_delta(DirectoryDelta::GroupName {
                group_id,
                name: name.clone(),
            })?;
            BotEvent::GroupNameChange(GroupNameChangeEvent {
                origin,
                new: name,
                group: group(group_id),
                is_by_bot: operator_id == uin,
            })
        },
        PushNotice::AnnouncementChanged {
            group_id,
            text,
            operator_id,
        } => {
            let origin = dir.require_group(group_id)?.info().announcement;
            let operator = operator(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::Announcement {
                group_id,
                text: text.clone(),
            })?;
            BotEvent::GroupEntranceAnnouncementChange(GroupEntranceAnnouncementChangeEvent {
                origin,
                new: text,
                group: group(group_id),
                operator,
            })
        },
        PushNotice::MuteAllChanged {
            group_id,
            enabled,
            operator_id,
        } => {
            let origin = dir.require_group(group_id)?.info().settings.mute_all;
            let operator = operator(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::MuteAll { group_id, enabled })?;
            BotEvent::GroupMuteAll(GroupMuteAllEvent {
                origin,
                new: enabled,
                group: group(group_id),
                operator,
            })
        },
        PushNotice::AnonymousChatChanged {
            group_id,
            enabled,
            operator_id,
        } => {
            let origin = dir.require_group(group_id)?.info().settings.anonymous_chat;
            let operator = operator(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::AnonymousChat { group_id, enabled })?;
            BotEvent::GroupAllowAnonymousChat(GroupAllowAnonymousChatEvent {
                origin,
                new: enabled,
                group: group(group_id),
                operator,
            })
        },
        PushNotice::ConfessTalkChanged {
            group_id,
            enabled,
            operator_id,
        } => {
            let origin = dir.require_group(group_id)?.info().settings.confess_talk;
            dir.apply_delta(DirectoryDelta::ConfessTalk { group_id, enabled })?;
            BotEvent::GroupAllowConfessTalk(GroupAllowConfessTalkEvent {
                origin,
                new: enabled,
                group: group(group_id),
                is_by_bot: operator_id == uin,
            })
        },
        PushNotice::MemberInviteChanged {
            group_id,
            enabled,
            operator_id,
        } => {
            let origin = dir.require_group(group_id)?.info().settings.member_invite;
            let operator = operator(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::MemberInvite { group_id, enabled })?;
            BotEvent::GroupAllowMemberInvite(GroupAllowMemberInviteEvent {
                origin,
                new: enabled,
                group: group(group_id),
                operator,
            })
        },
        PushNotice::BotPermissionChanged {
            group_id,
            permission,
        } => {
            let origin = dir.require_group(group_id)?.info().bot_permission;
            dir.apply_delta(DirectoryDelta::BotPermission {
                group_id,
                permission,
            })?;
            BotEvent::BotGroupPermissionChange(BotGroupPermissionChangeEvent {
                group: group(group_id),
                origin,
                new: permission,
            })
        },
        PushNotice::BotMuted {
            group_id,
            seconds,
            operator_id,
        } => {
            dir.require_member(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::BotMute {
                group_id,
                until: mute_deadline(seconds),
            })?;
            BotEvent::BotMute(BotMuteEvent {
                duration_seconds: seconds,
                operator: member(group_id, operator_id),
            })
        },
        PushNotice::BotUnmuted {
            group_id,
            operator_id,
        } => {
            dir.require_member(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::BotMute {
                group_id,
                until: None,
            })?;
            BotEvent::BotUnmute(BotUnmuteEvent {
                operator: member(group_id, operator_id),
            })
        },
        PushNotice::BotJoinedGroup { group: snapshot } => {
            let group_id = snapshot.info.id;
            dir.apply_delta(DirectoryDelta::GroupJoined(snapshot))?;
            BotEvent::BotJoinGroup(BotJoinGroupEvent {
                group: group(group_id),
            })
        },
        PushNotice::MemberJoined {
            group_id,
            member: info,
        } => {
            let member_id = info.id;
            dir.apply_delta(DirectoryDelta::MemberJoined {
                group_id,
                member: info,
            })?;
            BotEvent::MemberJoin(MemberJoinEvent {
                member: member(group_id, member_id),
            })
        },
        PushNotice::MemberKicked {
            group_id,
            member_id,
            operator_id,
        } => {
            let info = dir.require_member(group_id, member_id)?;
            let operator = operator(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::MemberRemoved {
                group_id,
                member_id,
            })?;
            BotEvent::MemberLeave(MemberLeaveEvent::Kick {
                member: member(group_id, member_id),
                info,
                operator,
            })
        },
        PushNotice::MemberQuit {
            group_id,
            member_id,
        } => {
            let info = dir.require_member(group_id, member_id)?;
            dir.apply_delta(DirectoryDelta::MemberRemoved {
                group_id,
                member_id,
            })?;
            BotEvent::MemberLeave(MemberLeaveEvent::Quit {
                member: member(group_id, member_id),
                info,
            })
        },
        PushNotice::MemberPermissionChanged {
            group_id,
            member_id,
            permission,
        } => {
            let origin = dir.require_member(group_id, member_id)?.permission;
            dir.apply_delta(DirectoryDelta::MemberPermission {
                group_id,
                member_id,
                permission,
            })?;
            BotEvent::MemberPermissionChange(MemberPermissionChangeEvent {
                member: member(group_id, member_id),
                origin,
                new: permission,
            })
        },
        PushNotice::MemberMuted {
            group_id,
            member_id,
            seconds,
            operator_id,
        } => {
            dir.require_member(group_id, member_id)?;
            let operator = operator(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::MemberMute {
                group_id,
                member_id,
                until: mute_deadline(seconds),
            })?;
            BotEvent::MemberMute(MemberMuteEvent {
                member: member(group_id, member_id),
                duration_seconds: seconds,
                operator,
            })
        },
        PushNotice::MemberUnmuted {
            group_id,
            member_id,
            operator_id,
        } => {
            dir.require_member(group_id, member_id)?;
            let operator = operator(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::MemberMute {
                group_id,
                member_id,
                until: None,
            })?;
            BotEvent::MemberUnmute(MemberUnmuteEvent {
                member: member(group_id, member_id),
                operator,
            })
        },
        PushNotice::MemberCardChanged {
            group_id,
            member_id,
            card,
            operator_id,
        } => {
            let origin = dir.require_member(group_id, member_id)?.card.clone();
            let operator = operator(group_id, operator_id)?;
            dir.apply_delta(DirectoryDelta::MemberCard {
                group_id,
                member_id,
                card: card.clone(),
            })?;
            BotEvent::MemberCardChange(MemberCardChangeEvent {
                origin,
                new: card,
                member: member(group_id, member_id),
                operator,
            })
        },
        PushNotice::MemberTitleChanged {
            group_id,
            member_id,
            title,
        } => {
            let origin = dir
                .require_member(group_id, member_id)?
                .special_title
                .clone();
            dir.apply_delta(DirectoryDelta::MemberTitle {
                group_id,
                member_id,
                title: title.clone(),
            })?;
            BotEvent::MemberSpecialTitleChange(MemberSpecialTitleChangeEvent {
                origin,
                new: title,
                member: member(group_id, member_id),
            })
        },
        PushNotice::FriendRecall {
            friend_id,
            message_id,
            time,
        } => {
            dir.require_friend(friend_id)?;
            BotEvent::MessageRecall(MessageRecallEvent::FriendRecall {
                bot_uin: uin,
                message_id,
                message_time: time,
                operator_id: friend_id,
            })
        },
        PushNotice::GroupRecall {
            group_id,
            author_id,
            message_id,
            time,
            operator_id,
        } => {
            dir.require_group(group_id)?;
            let operator = operator(group_id, operator_id)?;
            BotEvent::MessageRecall(MessageRecallEvent::GroupRecall {
                bot_uin: uin,
                author_id,
                message_id,
                message_time: time,
                operator,
                group: group(group_id),
            })
        },
        PushNotice::FriendMessage {
            friend_id,
            message_id,
            time,
            message,
        } => {
            dir.require_friend(friend_id)?;
            let source = MessageSource {
                id: message_id,
                author_id: friend_id,
                time_seconds: time,
                kind: SourceKind::Friend { friend_id },
            };
            BotEvent::FriendMessage(FriendMessageEvent {
                sender: Friend::new(friend_id, weak.clone()),
                message: MessageChain::new(message).with_source(source),
            })
        },
        PushNotice::GroupMessage {
            group_id,
            sender_id,
            message_id,
            time,
            message,
        } => {
            dir.require_member(group_id, sender_id)?;
            let source = MessageSource {
                id: message_id,
                author_id: sender_id,
                time_seconds: time,
                kind: SourceKind::Group { group_id },
            };
            BotEvent::GroupMessage(GroupMessageEvent {
                sender: member(group_id, sender_id),
                message: MessageChain::new(message).with_source(source),
            })
        },
        PushNotice::ForceOffline { title, message } => {
            return Ok(PushOutcome::ForceOffline { title, message });
        },
    };

    bot.events().broadcast(&event);
    Ok(PushOutcome::Applied)
}
