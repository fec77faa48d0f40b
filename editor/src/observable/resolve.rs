//! Resolve-once cell for references that become available later

use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Handle returned by [`ResolveOnce::on_resolved`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer<T> = Box<dyn FnOnce(&T)>;

struct ResolveState<T> {
    value: Option<T>,
    observers: Vec<(ObserverId, Observer<T>)>,
    next_observer: u64,
}

/// A value that is assigned exactly once, with observers waiting for it
///
/// The scene mounting callback resolves the cell; anything that needs the
/// value registers an observer instead of polling.
pub struct ResolveOnce<T> {
    state: Rc<RefCell<ResolveState<T>>>,
}

/// Reference to a scene object that may not exist yet
pub type ObjectRef = ResolveOnce<hecs::Entity>;

impl<T> Clone for ResolveOnce<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ResolveOnce<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ResolveOnce")
            .field("value", &state.value)
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl<T: Clone + 'static> Default for ResolveOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ResolveOnce<T> {
    /// Create an unresolved cell
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ResolveState {
                value: None,
                observers: Vec::new(),
                next_observer: 0,
            })),
        }
    }

    /// Create an already-resolved cell
    pub fn resolved(value: T) -> Self {
        let cell = Self::new();
        cell.state.borrow_mut().value = Some(value);
        cell
    }

    /// The value, once resolved
    pub fn get(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    /// Whether the value has been assigned
    pub fn is_resolved(&self) -> bool {
        self.state.borrow().value.is_some()
    }

    /// Assign the value and run pending observers
    ///
    /// Returns `false` and leaves the existing value in place when the cell
    /// was already resolved.
    pub fn resolve(&self, value: T) -> bool {
        let observers = {
            let mut state = self.state.borrow_mut();
            if state.value.is_some() {
                debug!("Ignoring second resolution of a resolve-once cell");
                return false;
            }
            state.value = Some(value.clone());
            std::mem::take(&mut state.observers)
        };
        for (_, observer) in observers {
            observer(&value);
        }
        true
    }

    /// Run `observer` with the value once it is available
    ///
    /// Runs immediately when the cell is already resolved.
    pub fn on_resolved(&self, observer: impl FnOnce(&T) + 'static) -> ObserverId {
        let ready = self.get();
        let mut state = self.state.borrow_mut();
        let id = ObserverId(state.next_observer);
        state.next_observer += 1;
        match ready {
            Some(value) => {
                drop(state);
                observer(&value);
            }
            None => state.observers.push((id, Box::new(observer))),
        }
        id
    }

    /// Drop a pending observer; returns whether it was still waiting
    pub fn cancel(&self, id: ObserverId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.observers.len();
        state.observers.retain(|(existing, _)| *existing != id);
        state.observers.len() != before
    }
}
