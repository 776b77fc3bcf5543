//! Pending-resource tracking
//!
//! Every asynchronous load (a texture still decoding, a mesh still streaming)
//! holds a `ReadinessToken`. The gate is open when no unresolved token
//! remains. Loaders that have no access to the scene resolve their token
//! directly; the gate notices on its next `poll`.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// One outstanding resource
#[derive(Clone)]
pub struct ReadinessToken {
    id: u64,
    label: Rc<str>,
    resolved: Rc<Cell<bool>>,
}

impl ReadinessToken {
    /// Mark the resource as loaded
    pub fn resolve(&self) {
        self.resolved.set(true);
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// What the token was registered for (a URL, a texture name, ...)
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for ReadinessToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ReadinessToken {}

impl fmt::Debug for ReadinessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessToken")
            .field("id", &self.id)
            .field("label", &&*self.label)
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

/// Set of outstanding tokens plus callbacks waiting for readiness
#[derive(Default)]
pub struct ReadinessGate {
    next_id: u64,
    pending: Vec<ReadinessToken>,
    deferred: Vec<Box<dyn FnOnce()>>,
}

impl fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("pending", &self.pending)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new outstanding resource
    pub fn add(&mut self, label: &str) -> ReadinessToken {
        self.next_id += 1;
        let token = ReadinessToken {
            id: self.next_id,
            label: Rc::from(label),
            resolved: Rc::new(Cell::new(false)),
        };
        self.pending.push(token.clone());
        token
    }

    /// Remove a resource from the pending set.
    ///
    /// Returns true when this removal emptied the set.
    pub fn remove(&mut self, token: &ReadinessToken) -> bool {
        let was_loading = !self.pending.is_empty();
        let before = self.pending.len();
        self.pending.retain(|t| t.id != token.id);
        token.resolve();
        was_loading && before != self.pending.len() && self.pending.is_empty()
    }

    /// Drop every token that was resolved from outside.
    ///
    /// Returns true when this poll emptied the set.
    pub fn poll(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.pending.retain(|t| !t.is_resolved());
        self.pending.is_empty()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Labels of unresolved resources, in registration order
    pub fn pending_labels(&self) -> Vec<String> {
        self.pending.iter().map(|t| t.label().to_string()).collect()
    }

    /// Queue a callback to run the next time the owner finds everything ready
    pub fn defer(&mut self, callback: impl FnOnce() + 'static) {
        self.deferred.push(Box::new(callback));
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Take the queued callbacks, leaving the queue empty
    pub fn take_deferred(&mut self) -> Vec<Box<dyn FnOnce()>> {
        std::mem::take(&mut self.deferred)
    }

    /// Forget every pending token and callback
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deferred.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_gate_is_ready() {
        let gate = ReadinessGate::new();
        assert!(gate.is_empty());
        assert_eq!(gate.pending_count(), 0);
    }

    #[test]
    fn remove_reports_transition_to_empty() {
        let mut gate = ReadinessGate::new();
        let a = gate.add("a.png");
        let b = gate.add("b.mesh");
        assert_eq!(gate.pending_labels(), vec!["a.png", "b.mesh"]);

        assert!(!gate.remove(&a));
        assert!(gate.remove(&b));
        assert!(gate.is_empty());
        // already gone
        assert!(!gate.remove(&b));
    }

    #[test]
    fn externally_resolved_tokens_clear_on_poll() {
        let mut gate = ReadinessGate::new();
        let token = gate.add("texture");
        let loader_copy = token.clone();

        assert!(!gate.poll());
        loader_copy.resolve();
        assert!(token.is_resolved());
        assert!(gate.poll());
        assert!(gate.is_empty());
        assert!(!gate.poll());
    }

    #[test]
    fn tokens_compare_by_id() {
        let mut gate = ReadinessGate::new();
        let a = gate.add("same");
        let b = gate.add("same");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn deferred_callbacks_are_taken_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        let fired = Rc::new(Cell::new(0));
        let mut gate = ReadinessGate::new();
        let f = fired.clone();
        gate.defer(move || f.set(f.get() + 1));
        assert!(gate.has_deferred());

        for callback in gate.take_deferred() {
            callback();
        }
        assert_eq!(fired.get(), 1);
        assert!(!gate.has_deferred());
        assert!(gate.take_deferred().is_empty());
    }
}
