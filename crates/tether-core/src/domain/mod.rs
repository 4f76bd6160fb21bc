//! Domain model (ids, actions, dead-letter items, errors, events).

pub mod action;
pub mod errors;
pub mod events;
pub mod ids;

pub use self::action::{Action, ActionType, DeadLetterItem};
pub use self::errors::{EngineError, HookError, PersistenceError, ProcessError};
pub use self::events::QueueEvent;
pub use self::ids::{ActionId, Id, IdMarker};
