//! Ordered list with insert/delete/reorder notifications
//!
//! [`ObservableList`] is a cheap-to-clone shared handle. Every mutation
//! completes before subscribers run, so a subscriber always observes the
//! list in its new state. Subscribers are snapshotted before each
//! notification round, which lets a subscriber unsubscribe itself or mutate
//! other lists while it runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// A change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent<T> {
    /// `item` was inserted
    Insert(T),
    /// `item` was removed
    Delete(T),
    /// Items changed position without entering or leaving the list
    Reorder,
}

/// Handle returned by [`ObservableList::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Rc<dyn Fn(&ObservableList<T>, &ListEvent<T>)>;

struct ListState<T> {
    items: Vec<T>,
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
    next_subscription: u64,
}

/// Shared, observable, insertion-ordered list
pub struct ObservableList<T> {
    state: Rc<RefCell<ListState<T>>>,
}

/// Non-owning handle to an [`ObservableList`]
pub struct WeakList<T> {
    state: Weak<RefCell<ListState<T>>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Clone for WeakList<T> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

impl<T> WeakList<T> {
    /// Upgrade to a strong handle if the list is still alive
    pub fn upgrade(&self) -> Option<ObservableList<T>> {
        self.state.upgrade().map(|state| ObservableList { state })
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ObservableList")
            .field("items", &state.items)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create a list holding `items`; no notifications are emitted
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            state: Rc::new(RefCell::new(ListState {
                items,
                subscribers: Vec::new(),
                next_subscription: 0,
            })),
        }
    }

    /// Weak handle to this list
    pub fn downgrade(&self) -> WeakList<T> {
        WeakList {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Whether both handles refer to the same list
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.state.borrow().items.is_empty()
    }

    /// Item at `index`
    pub fn get(&self, index: usize) -> Option<T> {
        self.state.borrow().items.get(index).cloned()
    }

    /// First item
    pub fn first(&self) -> Option<T> {
        self.state.borrow().items.first().cloned()
    }

    /// Last item
    pub fn last(&self) -> Option<T> {
        self.state.borrow().items.last().cloned()
    }

    /// Whether `item` is present
    pub fn contains(&self, item: &T) -> bool {
        self.state.borrow().items.contains(item)
    }

    /// Index of the first occurrence of `item`
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.state.borrow().items.iter().position(|it| it == item)
    }

    /// Snapshot of the current items
    ///
    /// Iterate over the snapshot when the loop body may mutate the list.
    pub fn to_vec(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    /// Append `item`
    pub fn push(&self, item: T) {
        let index = self.len();
        self.insert(index, item);
    }

    /// Insert `item` at `index`, clamped to the list length
    pub fn insert(&self, index: usize, item: T) {
        {
            let mut state = self.state.borrow_mut();
            let index = index.min(state.items.len());
            state.items.insert(index, item.clone());
        }
        self.notify(vec![ListEvent::Insert(item)]);
    }

    /// Remove the first occurrence of `item`; returns whether it was present
    pub fn remove(&self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => {
                self.remove_at(index);
                true
            }
            None => false,
        }
    }

    /// Remove and return the item at `index`
    pub fn remove_at(&self, index: usize) -> Option<T> {
        let removed = {
            let mut state = self.state.borrow_mut();
            if index >= state.items.len() {
                return None;
            }
            state.items.remove(index)
        };
        self.notify(vec![ListEvent::Delete(removed.clone())]);
        Some(removed)
    }

    /// Remove `delete_count` items starting at `start` and insert `items` in their place
    ///
    /// One `Delete` per removed item followed by one `Insert` per inserted
    /// item, each in index order, all after the splice completes.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<T>) -> Vec<T> {
        let removed: Vec<T> = {
            let mut state = self.state.borrow_mut();
            let start = start.min(state.items.len());
            let end = start.saturating_add(delete_count).min(state.items.len());
            let removed: Vec<T> = state.items.splice(start..end, items.iter().cloned()).collect();
            removed
        };

        let events = removed
            .iter()
            .cloned()
            .map(ListEvent::Delete)
            .chain(items.into_iter().map(ListEvent::Insert))
            .collect();
        self.notify(events);
        removed
    }

    /// Move the item at `from` to index `to`
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        {
            let mut state = self.state.borrow_mut();
            let len = state.items.len();
            if from >= len || to >= len {
                return false;
            }
            if from == to {
                return true;
            }
            let item = state.items.remove(from);
            state.items.insert(to, item);
        }
        self.notify(vec![ListEvent::Reorder]);
        true
    }

    /// Remove every item
    pub fn clear(&self) {
        let len = self.len();
        if len > 0 {
            self.splice(0, len, Vec::new());
        }
    }

    /// Register a subscriber for every subsequent change
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&ObservableList<T>, &ListEvent<T>) + 'static,
    ) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.subscribers.push((id, Rc::new(subscriber)));
        id
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.subscribers.len();
        state.subscribers.retain(|(existing, _)| *existing != id);
        state.subscribers.len() != before
    }

    fn notify(&self, events: Vec<ListEvent<T>>) {
        if events.is_empty() {
            return;
        }
        let subscribers: Vec<(SubscriptionId, Subscriber<T>)> =
            self.state.borrow().subscribers.clone();
        trace!(
            events = events.len(),
            subscribers = subscribers.len(),
            "Notifying list subscribers"
        );
        for event in &events {
            for (id, subscriber) in &subscribers {
                // A subscriber removed earlier in this round no longer hears events
                let still_subscribed = self
                    .state
                    .borrow()
                    .subscribers
                    .iter()
                    .any(|(existing, _)| existing == id);
                if still_subscribed {
                    subscriber(self, event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(list: &ObservableList<u32>) -> Rc<RefCell<Vec<ListEvent<u32>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        list.subscribe(move |_, event| sink.borrow_mut().push(event.clone()));
        log
    }

    #[test]
    fn test_insert_and_remove_notify() {
        let list = ObservableList::new();
        let log = record(&list);

        list.push(1);
        list.insert(0, 0);
        assert!(list.remove(&1));
        assert!(!list.remove(&7));

        assert_eq!(list.to_vec(), vec![0]);
        assert_eq!(
            *log.borrow(),
            vec![
                ListEvent::Insert(1),
                ListEvent::Insert(0),
                ListEvent::Delete(1)
            ]
        );
    }

    #[test]
    fn test_splice_emits_one_event_per_item() {
        let list = ObservableList::from_vec(vec![1, 2, 3, 4, 5]);
        let log = record(&list);

        let removed = list.splice(1, 3, vec![8, 9]);

        assert_eq!(removed, vec![2, 3, 4]);
        assert_eq!(list.to_vec(), vec![1, 8, 9, 5]);
        assert_eq!(
            *log.borrow(),
            vec![
                ListEvent::Delete(2),
                ListEvent::Delete(3),
                ListEvent::Delete(4),
                ListEvent::Insert(8),
                ListEvent::Insert(9),
            ]
        );
    }

    #[test]
    fn test_subscriber_observes_new_state() {
        let list = ObservableList::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        list.subscribe(move |list, _| sink.borrow_mut().push(list.len()));

        list.push(10);
        list.push(11);
        list.remove(&10);

        assert_eq!(*seen.borrow(), vec![1, 2, 1]);
    }

    #[test]
    fn test_move_item_emits_reorder() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let log = record(&list);

        assert!(list.move_item(0, 2));
        assert!(!list.move_item(0, 5));

        assert_eq!(list.to_vec(), vec![2, 3, 1]);
        assert_eq!(*log.borrow(), vec![ListEvent::Reorder]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let list = ObservableList::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = list.subscribe(move |_, _| *sink.borrow_mut() += 1);

        list.push(1);
        assert!(list.unsubscribe(id));
        list.push(2);

        assert_eq!(*count.borrow(), 1);
        assert!(!list.unsubscribe(id));
    }

    #[test]
    fn test_subscriber_may_mutate_list() {
        // Mirror every insert of an odd number as its double
        let list = ObservableList::new();
        list.subscribe(|list, event| {
            if let ListEvent::Insert(value) = event {
                if value % 2 == 1 {
                    list.push(value * 2);
                }
            }
        });

        list.push(3);
        assert_eq!(list.to_vec(), vec![3, 6]);
    }

    #[test]
    fn test_clear_on_empty_list_is_silent() {
        let list = ObservableList::<u32>::new();
        let log = record(&list);
        list.clear();
        assert!(log.borrow().is_empty());
    }
}
