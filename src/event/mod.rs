//! Event dispatch.
//!
//! Every bot owns one [`EventBus`]. The session publishes protocol activity
//! as [`BotEvent`]s; facade actions publish cancellable "before" events and
//! check the [`CancelFlag`] once every subscriber has run.
//!
//! ```text
//! push frame ──► directory delta ──► BotEvent ──► EventBus::broadcast
//!                                                   │ should_broadcast()?
//!                                                   ▼
//!                                   handler 1 → handler 2 → … (in order)
//! ```
//!
//! Capability traits mirror what each event supports:
//!
//! | Trait                   | Meaning                                         |
//! |-------------------------|-------------------------------------------------|
//! | [`Cancellable`]         | subscribers may veto the publisher's action     |
//! | [`BroadcastControllable`] | the event may decide not to be delivered      |
//! | [`GroupSettingChange`]  | `origin`/`new` pair; delivered only if they differ |

mod bus;
mod events;

pub use bus::{EventBus, EventHandler, EventStats, SubscriptionId};
pub use events::*;

use crate::contact::Group;

/// Whether the bot caused an event or observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOrigin {
    /// Caused by the bot's own action
    Active,
    /// Caused by someone else, observed via the server
    Passive,
}

/// Event a subscriber can veto.
pub trait Cancellable {
    /// Shared cancellation state
    fn cancel_flag(&self) -> &CancelFlag;

    /// Veto the publisher's action
    fn cancel(&self) {
        self.cancel_flag().cancel();
    }

    /// Whether any subscriber vetoed
    fn is_cancelled(&self) -> bool {
        self.cancel_flag().is_cancelled()
    }
}

/// Event that may suppress its own delivery.
pub trait BroadcastControllable {
    /// Whether the bus should deliver the event
    fn should_broadcast(&self) -> bool {
        true
    }
}

/// Change of one group setting.
pub trait GroupSettingChange {
    /// Setting value type
    type Value: PartialEq;

    /// Value before the change
    fn origin(&self) -> &Self::Value;

    /// Value after the change
    fn new_value(&self) -> &Self::Value;

    /// Group whose setting changed
    fn group(&self) -> &Group;

    /// Whether the value actually changed
    fn is_changed(&self) -> bool {
        self.origin() != self.new_value()
    }
}
