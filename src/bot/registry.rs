//! Process-wide registry of live bots.
//!
//! Holds weak references only: a bot disappears from the registry as soon as
//! the last [`Bot`] handle is dropped. Dead entries are pruned whenever the
//! registry is enumerated and when a bot is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use lazy_static::lazy_static;

use super::{Bot, BotInner};
use crate::error::{BotError, Result};

lazy_static! {
    static ref INSTANCES: Mutex<HashMap<u64, Weak<BotInner>>> = Mutex::new(HashMap::new());
}

fn instances() -> MutexGuard<'static, HashMap<u64, Weak<BotInner>>> {
    INSTANCES.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Add a new bot; fails if a live bot with the same uin exists.
pub(super) fn register(uin: u64, inner: &Arc<BotInner>) -> Result<()> {
    let mut map = instances();
    if map.get(&uin).is_some_and(|existing| existing.strong_count() > 0) {
        return Err(BotError::DuplicateBot(uin));
    }
    map.insert(uin, Arc::downgrade(inner));
    Ok(())
}

/// Drop entries whose bot is gone.
pub(super) fn prune() {
    instances().retain(|_, weak| weak.strong_count() > 0);
}

/// Live bots, sorted by uin.
pub(super) fn live() -> Vec<Bot> {
    let mut bots: Vec<Bot> = {
        let mut map = instances();
        map.retain(|_, weak| weak.strong_count() > 0);
        map.values().filter_map(Weak::upgrade).map(Bot).collect()
    };
    bots.sort_by_key(Bot::uin);
    bots
}

pub(super) fn find(uin: u64) -> Option<Bot> {
    instances().get(&uin).and_then(Weak::upgrade).map(Bot)
}
