//! Synchronous publish/subscribe bus
//!
//! An `Observable<T>` is a cheap, cloneable handle to a shared observer list.
//! Notification runs observers in registration order on the calling thread.
//! Observers may add or remove observers (including themselves) while a
//! notification is in flight: the list is snapshotted before iterating and
//! removed observers are skipped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Mask that matches every observer
pub const MASK_ALL: u32 = u32::MAX;

/// Per-notification state handed to every observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventState {
    /// Mask the notification was sent with
    pub mask: u32,
    /// Set to stop the remaining observers from running for this notification
    pub skip_next_observers: bool,
    /// Value an observer leaves for the ones after it, e.g. "handled"
    pub last_return_value: Option<bool>,
}

impl EventState {
    pub fn new(mask: u32) -> Self {
        Self {
            mask,
            skip_next_observers: false,
            last_return_value: None,
        }
    }
}

/// Handle returned by `Observable::add`, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

type Callback<T> = Box<dyn FnMut(&T, &mut EventState)>;

struct Observer<T> {
    id: u64,
    mask: u32,
    once: bool,
    removed: Cell<bool>,
    callback: RefCell<Callback<T>>,
}

struct ObserverList<T> {
    observers: Vec<Rc<Observer<T>>>,
    next_id: u64,
}

/// A list of observers notified synchronously with a `&T` payload
pub struct Observable<T> {
    inner: Rc<RefCell<ObserverList<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl<T> Observable<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObserverList {
                observers: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Register an observer that receives every notification
    pub fn add(&self, callback: impl FnMut(&T, &mut EventState) + 'static) -> ObserverHandle {
        self.insert(Box::new(callback), MASK_ALL, false, false)
    }

    /// Register an observer filtered by `mask`, optionally ahead of existing observers
    pub fn add_with_mask(
        &self,
        callback: impl FnMut(&T, &mut EventState) + 'static,
        mask: u32,
        insert_first: bool,
    ) -> ObserverHandle {
        self.insert(Box::new(callback), mask, insert_first, false)
    }

    /// Register an observer that is removed after its first call
    pub fn add_once(&self, callback: impl FnMut(&T, &mut EventState) + 'static) -> ObserverHandle {
        self.insert(Box::new(callback), MASK_ALL, false, true)
    }

    fn insert(&self, callback: Callback<T>, mask: u32, insert_first: bool, once: bool) -> ObserverHandle {
        let mut list = self.inner.borrow_mut();
        let id = list.next_id;
        list.next_id += 1;

        let observer = Rc::new(Observer {
            id,
            mask,
            once,
            removed: Cell::new(false),
            callback: RefCell::new(callback),
        });
        if insert_first {
            list.observers.insert(0, observer);
        } else {
            list.observers.push(observer);
        }
        ObserverHandle(id)
    }

    /// Unregister an observer. Returns false if it was not registered.
    pub fn remove(&self, handle: ObserverHandle) -> bool {
        let mut list = self.inner.borrow_mut();
        match list.observers.iter().position(|o| o.id == handle.0) {
            Some(index) => {
                let observer = list.observers.remove(index);
                observer.removed.set(true);
                true
            }
            None => false,
        }
    }

    /// Move an observer to the front of the list
    pub fn make_observer_top_priority(&self, handle: ObserverHandle) {
        let mut list = self.inner.borrow_mut();
        if let Some(index) = list.observers.iter().position(|o| o.id == handle.0) {
            let observer = list.observers.remove(index);
            list.observers.insert(0, observer);
        }
    }

    /// Move an observer to the back of the list
    pub fn make_observer_bottom_priority(&self, handle: ObserverHandle) {
        let mut list = self.inner.borrow_mut();
        if let Some(index) = list.observers.iter().position(|o| o.id == handle.0) {
            let observer = list.observers.remove(index);
            list.observers.push(observer);
        }
    }

    /// Notify every observer. Returns false if an observer stopped propagation.
    pub fn notify_observers(&self, value: &T) -> bool {
        self.notify_observers_with_mask(value, MASK_ALL)
    }

    /// Notify the observers whose mask intersects `mask`
    pub fn notify_observers_with_mask(&self, value: &T, mask: u32) -> bool {
        let snapshot: Vec<Rc<Observer<T>>> = self.inner.borrow().observers.clone();
        let mut state = EventState::new(mask);

        for observer in snapshot {
            if observer.removed.get() || observer.mask & mask == 0 {
                continue;
            }
            if observer.once {
                self.remove(ObserverHandle(observer.id));
            }
            // An observer that triggers its own observable re-entrantly is not re-run
            let Ok(mut callback) = observer.callback.try_borrow_mut() else {
                continue;
            };
            (*callback)(value, &mut state);
            if state.skip_next_observers {
                return false;
            }
        }
        true
    }

    /// True if at least one observer is registered
    pub fn has_observers(&self) -> bool {
        !self.inner.borrow().observers.is_empty()
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Remove every observer
    pub fn clear(&self) {
        let mut list = self.inner.borrow_mut();
        for observer in list.observers.drain(..) {
            observer.removed.set(true);
        }
    }
}
