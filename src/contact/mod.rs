//! Contact state model.
//!
//! Three layers:
//!
//! | Layer                  | Owns data | Purpose                                   |
//! |------------------------|-----------|-------------------------------------------|
//! | [`model`] records      | yes       | `FriendInfo`, `GroupInfo`, `MemberInfo`   |
//! | [`ContactDirectory`]   | yes       | per-bot id-keyed lists, resync and deltas |
//! | handles                | no        | `Friend`, `Group`, `Member`: id + `WeakBot` |
//!
//! Handles are what events and the public API hand out. They are cheap to
//! clone and resolve their data on demand, so they never keep a bot alive
//! and never show data older than the directory.

mod directory;
mod handle;
mod list;
pub mod model;

pub use directory::{ContactDirectory, DirectoryDelta, GroupEntry};
pub use handle::{Contact, Friend, Group, Member};
pub use list::{ContactList, ContactRecord};
pub use model::{
    ContactKind, FriendInfo, GroupInfo, GroupSettings, GroupSnapshot, MemberInfo,
    MemberPermission, Roster,
};
