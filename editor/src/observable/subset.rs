//! One-way synchronization of one list into another

use super::list::{ListEvent, ObservableList, SubscriptionId, WeakList};
use super::membership::PositionMemory;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// What a [`SubsetSync`] propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Inserts and deletes
    Mirror,
    /// Deletes only
    FollowRemovals,
}

/// Mirrors changes of a source list into a destination list
///
/// Redundant operations (inserting an item the destination already holds,
/// deleting one it does not) are skipped, so two syncs wired in opposite
/// directions settle instead of echoing. Both lists are held weakly.
pub struct SubsetSync<T: Clone + PartialEq + 'static> {
    source: WeakList<T>,
    subscription: SubscriptionId,
    mode: SyncMode,
}

impl<T: Clone + PartialEq + 'static> std::fmt::Debug for SubsetSync<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsetSync")
            .field("mode", &self.mode)
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> SubsetSync<T> {
    /// Mirror inserts and deletes; current source items are mirrored immediately
    pub fn mirror(source: &ObservableList<T>, destination: &ObservableList<T>) -> Self {
        for item in source.to_vec() {
            if !destination.contains(&item) {
                destination.push(item);
            }
        }
        Self::connect(source, destination, SyncMode::Mirror)
    }

    /// Mirror deletes only
    pub fn follow_removals(source: &ObservableList<T>, destination: &ObservableList<T>) -> Self {
        Self::connect(source, destination, SyncMode::FollowRemovals)
    }

    fn connect(source: &ObservableList<T>, destination: &ObservableList<T>, mode: SyncMode) -> Self {
        let target = destination.downgrade();
        let memory = Rc::new(RefCell::new(PositionMemory::default()));

        let subscription = source.subscribe(move |_, event| {
            let Some(destination) = target.upgrade() else {
                return;
            };
            match event {
                ListEvent::Insert(item) if mode == SyncMode::Mirror => {
                    if !destination.contains(item) {
                        trace!("Mirroring insert into destination list");
                        let remembered = memory.borrow_mut().take(item);
                        let index = remembered
                            .map(|position| position.resolve(&destination))
                            .unwrap_or_else(|| destination.len());
                        destination.insert(index, item.clone());
                    }
                }
                ListEvent::Delete(item) => {
                    if destination.contains(item) {
                        trace!("Mirroring delete into destination list");
                        memory.borrow_mut().remember(&destination, item);
                        destination.remove(item);
                    }
                }
                _ => {}
            }
        });

        Self {
            source: source.downgrade(),
            subscription,
            mode,
        }
    }

    /// What this sync propagates
    pub fn mode(&self) -> SyncMode {
        self.mode
    }
}

impl<T: Clone + PartialEq + 'static> Drop for SubsetSync<T> {
    fn drop(&mut self) {
        if let Some(source) = self.source.upgrade() {
            source.unsubscribe(self.subscription);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_copies_existing_and_future_items() {
        let source = ObservableList::from_vec(vec![1, 2]);
        let destination = ObservableList::from_vec(vec![9]);
        let _sync = SubsetSync::mirror(&source, &destination);

        assert_eq!(destination.to_vec(), vec![9, 1, 2]);

        source.push(3);
        source.remove(&1);
        assert_eq!(destination.to_vec(), vec![9, 2, 3]);
    }

    #[test]
    fn test_mirror_restores_destination_position() {
        let source = ObservableList::new();
        let destination = ObservableList::from_vec(vec![10, 20]);
        let _sync = SubsetSync::mirror(&source, &destination);

        source.push(15);
        destination.move_item(2, 1);
        assert_eq!(destination.to_vec(), vec![10, 15, 20]);

        source.remove(&15);
        destination.push(30);
        source.push(15);

        assert_eq!(destination.to_vec(), vec![10, 15, 20, 30]);
    }

    #[test]
    fn test_follow_removals_ignores_inserts() {
        let source = ObservableList::from_vec(vec![1]);
        let destination = ObservableList::from_vec(vec![1, 2]);
        let _sync = SubsetSync::follow_removals(&source, &destination);

        source.push(2);
        source.push(3);
        source.remove(&1);
        source.remove(&2);

        assert!(destination.is_empty());
    }

    #[test]
    fn test_opposite_syncs_settle() {
        let child = ObservableList::new();
        let parent = ObservableList::new();
        let _up = SubsetSync::mirror(&child, &parent);
        let _down = SubsetSync::follow_removals(&parent, &child);

        child.push('a');
        assert_eq!(parent.to_vec(), vec!['a']);

        parent.remove(&'a');
        assert!(child.is_empty());

        child.push('b');
        child.remove(&'b');
        assert!(parent.is_empty());
    }

    #[test]
    fn test_drop_disconnects() {
        let source = ObservableList::new();
        let destination = ObservableList::new();
        let sync = SubsetSync::mirror(&source, &destination);
        drop(sync);

        source.push(1);
        assert!(destination.is_empty());
    }
}
