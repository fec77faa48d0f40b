//! Declarative list membership with insert-position memory

use super::list::{ObservableList, SubscriptionId};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// Where an item sat relative to its neighbours
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition<T> {
    /// At the head of the list
    Front,
    /// Immediately after this item
    After(T),
}

impl<T: Clone + PartialEq + 'static> InsertPosition<T> {
    /// Position of the item at `index` in `list`
    pub fn of_index(list: &ObservableList<T>, index: usize) -> Self {
        match index.checked_sub(1).and_then(|prev| list.get(prev)) {
            Some(predecessor) => Self::After(predecessor),
            None => Self::Front,
        }
    }

    /// Index to re-insert at; the end of the list when the predecessor is gone
    pub fn resolve(&self, list: &ObservableList<T>) -> usize {
        match self {
            Self::Front => 0,
            Self::After(predecessor) => list
                .index_of(predecessor)
                .map(|index| index + 1)
                .unwrap_or_else(|| list.len()),
        }
    }
}

/// Remembered positions for items that left a list
#[derive(Debug, Clone)]
pub struct PositionMemory<T> {
    entries: Vec<(T, InsertPosition<T>)>,
}

impl<T> Default for PositionMemory<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> PositionMemory<T> {
    /// Record where `item` currently sits in `list`
    pub fn remember(&mut self, list: &ObservableList<T>, item: &T) {
        if let Some(index) = list.index_of(item) {
            let position = InsertPosition::of_index(list, index);
            self.entries.retain(|(existing, _)| existing != item);
            self.entries.push((item.clone(), position));
        }
    }

    /// Remove and return the remembered position of `item`
    pub fn take(&mut self, item: &T) -> Option<InsertPosition<T>> {
        let index = self.entries.iter().position(|(existing, _)| existing == item)?;
        Some(self.entries.remove(index).1)
    }

    /// Insert `item` into `list` at its remembered position, or at the end
    pub fn restore(&mut self, list: &ObservableList<T>, item: T) {
        let index = match self.take(&item) {
            Some(position) => position.resolve(list),
            None => list.len(),
        };
        list.insert(index, item);
    }
}

/// Keeps `item` in `list` while a flag holds
///
/// While present, the item's predecessor is tracked on every list change,
/// so toggling the flag off and on puts the item back where it was.
/// Dropping the membership removes the item.
pub struct Membership<T: Clone + PartialEq + 'static> {
    list: ObservableList<T>,
    item: T,
    last_position: Rc<RefCell<Option<InsertPosition<T>>>>,
    subscription: SubscriptionId,
}

impl<T: Clone + PartialEq + std::fmt::Debug + 'static> std::fmt::Debug for Membership<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Membership")
            .field("item", &self.item)
            .field("present", &self.is_present())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Membership<T> {
    /// Bind `item` to `list`, initially present or not
    pub fn new(list: ObservableList<T>, item: T, present: bool) -> Self {
        let last_position = Rc::new(RefCell::new(None));
        let tracked = item.clone();
        let memory = Rc::clone(&last_position);
        let subscription = list.subscribe(move |list, _| {
            if let Some(index) = list.index_of(&tracked) {
                *memory.borrow_mut() = Some(InsertPosition::of_index(list, index));
            }
        });

        let membership = Self {
            list,
            item,
            last_position,
            subscription,
        };
        membership.set_present(present);
        membership
    }

    /// Whether the item is currently in the list
    pub fn is_present(&self) -> bool {
        self.list.contains(&self.item)
    }

    /// Add or remove the item
    pub fn set_present(&self, present: bool) {
        match (present, self.is_present()) {
            (true, false) => {
                let index = self
                    .last_position
                    .borrow()
                    .as_ref()
                    .map(|position| position.resolve(&self.list))
                    .unwrap_or_else(|| self.list.len());
                trace!(index, "Membership re-inserting item");
                self.list.insert(index, self.item.clone());
            }
            (false, true) => {
                self.list.remove(&self.item);
            }
            _ => {}
        }
    }

    /// The bound item
    pub fn item(&self) -> &T {
        &self.item
    }
}

impl<T: Clone + PartialEq + 'static> Drop for Membership<T> {
    fn drop(&mut self) {
        self.list.unsubscribe(self.subscription);
        self.list.remove(&self.item);
    }
}
