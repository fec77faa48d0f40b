//! Reactive state primitives
//!
//! Every piece of editor state that other parts react to is an
//! [`ObservableList`]. [`Membership`] and [`SubsetSync`] keep lists in step
//! declaratively, and [`ResolveOnce`] stands in for references that resolve
//! after the first frame.

pub mod list;
pub mod membership;
pub mod resolve;
pub mod subset;

pub use list::{ListEvent, ObservableList, SubscriptionId, WeakList};
pub use membership::{InsertPosition, Membership, PositionMemory};
pub use resolve::{ObjectRef, ObserverId, ResolveOnce};
pub use subset::{SubsetSync, SyncMode};
