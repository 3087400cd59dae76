//! Per-bot mirror of the server-side contact graph.
//!
//! The directory is written only by the owning session's inbound path: a
//! full [`resync`](ContactDirectory::resync) after login or on drift, and one
//! [`DirectoryDelta`] per push otherwise. Everyone else reads.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::list::{ContactList, ContactRecord};
use super::model::{
    ContactKind, FriendInfo, GroupInfo, GroupSnapshot, MemberInfo, MemberPermission, Roster,
};
use crate::error::{BotError, Result};

/// A group and its member list.
pub struct GroupEntry {
    id: u64,
    info: RwLock<GroupInfo>,
    members: ContactList<MemberInfo>,
}

impl GroupEntry {
    fn from_snapshot(snapshot: GroupSnapshot) -> Self {
        let members = ContactList::new();
        members.replace_all(snapshot.members);
        Self {
            id: snapshot.info.id,
            info: RwLock::new(snapshot.info),
            members,
        }
    }

    /// Group id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Snapshot of the group data
    pub fn info(&self) -> GroupInfo {
        self.info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Member list, excluding the bot
    pub fn members(&self) -> &ContactList<MemberInfo> {
        &self.members
    }

    fn update_info<R>(&self, f: impl FnOnce(&mut GroupInfo) -> R) -> R {
        f(&mut self.info.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ContactRecord for GroupEntry {
    const KIND: ContactKind = ContactKind::Group;

    fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for GroupEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupEntry")
            .field("id", &self.id)
            .field("members", &self.members.len())
            .finish()
    }
}

/// One incremental directory change.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryDelta {
    /// Group renamed
    GroupName { group_id: u64, name: String },
    /// Entrance announcement replaced
    Announcement { group_id: u64, text: String },
    /// Whole-group mute toggled
    MuteAll { group_id: u64, enabled: bool },
    /// Anonymous chat toggled
    AnonymousChat { group_id: u64, enabled: bool },
    /// Confess talk toggled
    ConfessTalk { group_id: u64, enabled: bool },
    /// Member invitation toggled
    MemberInvite { group_id: u64, enabled: bool },
    /// The bot's privilege changed
    BotPermission {
        group_id: u64,
        permission: MemberPermission,
    },
    /// The bot was muted (`None` lifts the mute)
    BotMute {
        group_id: u64,
        until: Option<DateTime<Utc>>,
    },
    /// The bot joined a group
    GroupJoined(GroupSnapshot),
    /// A member joined
    MemberJoined { group_id: u64, member: MemberInfo },
    /// A member left or was removed
    MemberRemoved { group_id: u64, member_id: u64 },
    /// A member's privilege changed
    MemberPermission {
        group_id: u64,
        member_id: u64,
        permission: MemberPermission,
    },
    /// A member was muted (`None` lifts the mute)
    MemberMute {
        group_id: u64,
        member_id: u64,
        until: Option<DateTime<Utc>>,
    },
    /// A member's card changed
    MemberCard {
        group_id: u64,
        member_id: u64,
        card: String,
    },
    /// A member's special title changed
    MemberTitle {
        group_id: u64,
        member_id: u64,
        title: String,
    },
}

/// Friends and groups of one bot.
pub struct ContactDirectory {
    self_id: u64,
    self_nick: RwLock<String>,
    friends: ContactList<FriendInfo>,
    groups: ContactList<GroupEntry>,
}

impl ContactDirectory {
    /// Create an empty directory for the bot `self_id`.
    pub fn new(self_id: u64) -> Self {
        Self {
            self_id,
            self_nick: RwLock::new(String::new()),
            friends: ContactList::new(),
            groups: ContactList::new(),
        }
    }

    /// The owning bot's uin.
    pub fn self_id(&self) -> u64 {
        self.self_id
    }

    /// The bot's own nickname, empty before the first roster.
    pub fn self_nick(&self) -> String {
        self.self_nick
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Friend list.
    pub fn friends(&self) -> &ContactList<FriendInfo> {
        &self.friends
    }

    /// Group list.
    pub fn groups(&self) -> &ContactList<GroupEntry> {
        &self.groups
    }

    /// Look up a friend. The bot's own uin resolves to a synthetic record.
    pub fn friend(&self, id: u64) -> Option<Arc<FriendInfo>> {
        if id == self.self_id {
            return Some(Arc::new(FriendInfo {
                id,
                nick: self.self_nick(),
                remark: String::new(),
            }));
        }
        self.friends.get(id)
    }

    /// Look up a friend, failing with `NoSuchContact`.
    pub fn require_friend(&self, id: u64) -> Result<Arc<FriendInfo>> {
        self.friend(id)
            .ok_or_else(|| BotError::no_such(ContactKind::Friend, id))
    }

    /// Look up a group.
    pub fn group(&self, id: u64) -> Option<Arc<GroupEntry>> {
        self.groups.get(id)
    }

    /// Look up a group, failing with `NoSuchContact`.
    pub fn require_group(&self, id: u64) -> Result<Arc<GroupEntry>> {
        self.groups.require(id)
    }

    /// Look up a member. The bot's own uin resolves to a record built from
    /// the group's bot fields.
    pub fn member(&self, group_id: u64, member_id: u64) -> Option<Arc<MemberInfo>> {
        let group = self.groups.get(group_id)?;
        if member_id == self.self_id {
            let info = group.info();
            return Some(Arc::new(MemberInfo {
                id: member_id,
                nick: self.self_nick(),
                card: String::new(),
                special_title: String::new(),
                permission: info.bot_permission,
                muted_until: info.bot_muted_until,
            }));
        }
        group.members.get(member_id)
    }

    /// Look up a member, failing with `NoSuchContact` for the group or the member.
    pub fn require_member(&self, group_id: u64, member_id: u64) -> Result<Arc<MemberInfo>> {
        self.require_group(group_id)?;
        self.member(group_id, member_id)
            .ok_or_else(|| BotError::no_such(ContactKind::Member, member_id))
    }

    /// Whether `id` is a friend or a group.
    pub fn contains(&self, id: u64) -> bool {
        self.friends.contains(id) || self.groups.contains(id)
    }

    /// Replace all contacts with a fresh roster.
    pub(crate) fn resync(&self, roster: Roster) {
        *self.self_nick.write().unwrap_or_else(PoisonError::into_inner) = roster.nick;
        self.friends.replace_all(roster.friends);
        self.groups
            .replace_all(roster.groups.into_iter().map(GroupEntry::from_snapshot));
        tracing::debug!(
            friends = self.friends.len(),
            groups = self.groups.len(),
            "Contact directory resynced"
        );
    }

    /// Apply one incremental change.
    ///
    /// Fails with `NoSuchContact` when the target group or member is unknown,
    /// which the caller treats as drift.
    pub(crate) fn apply_delta(&self, delta: DirectoryDelta) -> Result<()> {
        match delta {
            DirectoryDelta::GroupName { group_id, name } => {
                self.require_group(group_id)?.update_info(|g| g.name = name);
            },
            DirectoryDelta::Announcement { group_id, text } => {
                self.require_group(group_id)?
                    .update_info(|g| g.announcement = text);
            },
            DirectoryDelta::MuteAll { group_id, enabled } => {
                self.require_group(group_id)?
                    .update_info(|g| g.settings.mute_all = enabled);
            },
            DirectoryDelta::AnonymousChat { group_id, enabled } => {
                self.require_group(group_id)?
                    .update_info(|g| g.settings.anonymous_chat = enabled);
            },
            DirectoryDelta::ConfessTalk { group_id, enabled } => {
                self.require_group(group_id)?
                    .update_info(|g| g.settings.confess_talk = enabled);
            },
            DirectoryDelta::MemberInvite { group_id, enabled } => {
                self.require_group(group_id)?
                    .update_info(|g| g.settings.member_invite = enabled);
            },
            DirectoryDelta::BotPermission {
                group_id,
                permission,
            } => {
                self.require_group(group_id)?
                    .update_info(|g| g.bot_permission = permission);
            },
            DirectoryDelta::BotMute { group_id, until } => {
                self.require_group(group_id)?
                    .update_info(|g| g.bot_muted_until = until);
            },
            DirectoryDelta::GroupJoined(snapshot) => {
                self.groups.insert(GroupEntry::from_snapshot(snapshot));
            },
            DirectoryDelta::MemberJoined { group_id, member } => {
                self.require_group(group_id)?.members.insert(member);
            },
            DirectoryDelta::MemberRemoved {
                group_id,
                member_id,
            } => {
                self.require_group(group_id)?
                    .members
                    .remove(member_id)
                    .ok_or_else(|| BotError::no_such(ContactKind::Member, member_id))?;
            },
            DirectoryDelta::MemberPermission {
                group_id,
                member_id,
                permission,
            } => {
                self.require_group(group_id)?
                    .members
                    .update(member_id, |m| m.permission = permission)?;
            },
            DirectoryDelta::MemberMute {
                group_id,
                member_id,
                until,
            } => {
                self.require_group(group_id)?
                    .members
                    .update(member_id, |m| m.muted_until = until)?;
            },
            DirectoryDelta::MemberCard {
                group_id,
                member_id,
                card,
            } => {
                self.require_group(group_id)?
                    .members
                    .update(member_id, |m| m.card = card)?;
            },
            DirectoryDelta::MemberTitle {
                group_id,
                member_id,
                title,
            } => {
                self.require_group(group_id)?
                    .members
                    .update(member_id, |m| m.special_title = title)?;
            },
        }
        Ok(())
    }
}

impl std::fmt::Debug for ContactDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactDirectory")
            .field("self_id", &self.self_id)
            .field("friends", &self.friends.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::model::GroupSettings;

    fn roster() -> Roster {
        Roster {
            nick: "bot".into(),
            friends: vec![FriendInfo {
                id: 20,
                nick: "alice".into(),
                remark: String::new(),
            }],
            groups: vec![GroupSnapshot {
                info: GroupInfo {
                    id: 100,
                    name: "Old".into(),
                    owner_id: 30,
                    announcement: String::new(),
                    settings: GroupSettings::default(),
                    bot_permission: MemberPermission::Administrator,
                    bot_muted_until: None,
                },
                members: vec![MemberInfo {
                    id: 30,
                    nick: "owner".into(),
                    card: String::new(),
                    special_title: String::new(),
                    permission: MemberPermission::Owner,
                    muted_until: None,
                }],
            }],
        }
    }

    #[test]
    fn test_resync_and_lookup() {
        let dir = ContactDirectory::new(10);
        dir.resync(roster());

        assert_eq!(dir.require_friend(20).unwrap().nick, "alice");
        assert_eq!(dir.require_group(100).unwrap().info().name, "Old");
        assert_eq!(
            dir.require_member(100, 30).unwrap().permission,
            MemberPermission::Owner
        );
        assert!(dir.contains(20));
        assert!(dir.contains(100));
        assert!(!dir.contains(999));
    }

    #[test]
    fn test_self_resolves_as_friend_and_member() {
        let dir = ContactDirectory::new(10);
        dir.resync(roster());

        assert_eq!(dir.require_friend(10).unwrap().nick, "bot");
        let me = dir.require_member(100, 10).unwrap();
        assert_eq!(me.permission, MemberPermission::Administrator);
    }

    #[test]
    fn test_unknown_lookups_fail_with_kind() {
        let dir = ContactDirectory::new(10);
        dir.resync(roster());

        assert!(matches!(
            dir.require_group(7),
            Err(BotError::NoSuchContact {
                kind: ContactKind::Group,
                id: 7
            })
        ));
        assert!(matches!(
            dir.require_member(100, 8),
            Err(BotError::NoSuchContact {
                kind: ContactKind::Member,
                id: 8
            })
        ));
    }

    #[test]
    fn test_apply_delta() {
        let dir = ContactDirectory::new(10);
        dir.resync(roster());

        dir.apply_delta(DirectoryDelta::GroupName {
            group_id: 100,
            name: "New".into(),
        })
        .unwrap();
        assert_eq!(dir.require_group(100).unwrap().info().name, "New");

        dir.apply_delta(DirectoryDelta::MemberJoined {
            group_id: 100,
            member: MemberInfo {
                id: 40,
                nick: "bob".into(),
                card: String::new(),
                special_title: String::new(),
                permission: MemberPermission::Member,
                muted_until: None,
            },
        })
        .unwrap();
        dir.apply_delta(DirectoryDelta::MemberCard {
            group_id: 100,
            member_id: 40,
            card: "Bobby".into(),
        })
        .unwrap();
        assert_eq!(dir.require_member(100, 40).unwrap().card, "Bobby");

        dir.apply_delta(DirectoryDelta::MemberRemoved {
            group_id: 100,
            member_id: 40,
        })
        .unwrap();
        assert!(dir.member(100, 40).is_none());
    }

    #[test]
    fn test_delta_on_unknown_target_is_drift() {
        let dir = ContactDirectory::new(10);
        dir.resync(roster());

        assert!(dir
            .apply_delta(DirectoryDelta::MuteAll {
                group_id: 404,
                enabled: true
            })
            .is_err());
        assert!(dir
            .apply_delta(DirectoryDelta::MemberRemoved {
                group_id: 100,
                member_id: 404
            })
            .is_err());
    }

    #[test]
    fn test_resync_replaces_removed_groups() {
        let dir = ContactDirectory::new(10);
        dir.resync(roster());

        let mut next = roster();
        next.groups.clear();
        dir.resync(next);
        assert!(dir.group(100).is_none());
        assert_eq!(dir.friends().len(), 1);
    }
}
