//! Per-operation identity bookkeeping.
//!
//! Reference identity attaches to shared handles and is keyed by the
//! address of the target allocation. Both trackers live exactly as long as
//! one serialize/deserialize call and never escape it.

use std::collections::HashMap;

use jot_contracts::Node;

// -----------------------------------------------------------------------------
// WriteTracker

/// Write-side identity state: assigned ids plus the open ancestor stack.
#[derive(Default)]
pub(crate) struct WriteTracker {
    ids: HashMap<usize, u32>,
    next: u32,
    stack: Vec<usize>,
}

impl WriteTracker {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next: 1,
            stack: Vec::new(),
        }
    }

    /// The id for a target, assigning the next one on first encounter.
    /// Returns `(id, first_encounter)`.
    pub fn id_for(&mut self, address: usize) -> (u32, bool) {
        if let Some(&id) = self.ids.get(&address) {
            return (id, false);
        }
        let id = self.next;
        self.next += 1;
        self.ids.insert(address, id);
        (id, true)
    }

    /// Whether the target is an ancestor of the node being written.
    pub fn on_stack(&self, address: usize) -> bool {
        self.stack.contains(&address)
    }

    pub fn enter(&mut self, address: usize) {
        self.stack.push(address);
    }

    pub fn exit(&mut self, address: usize) {
        debug_assert_eq!(self.stack.last(), Some(&address));
        self.stack.pop();
    }
}

// -----------------------------------------------------------------------------
// ReadTracker

/// Read-side identity state: `$id` → a live handle to the target.
///
/// Handles are registered before their members are read, so a descendant
/// `$ref` can resolve while the ancestor is still being populated.
#[derive(Default)]
pub(crate) struct ReadTracker {
    handles: HashMap<String, Box<dyn Node>>,
}

impl ReadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle under an id; `false` when the id was taken.
    pub fn register(&mut self, id: String, handle: Box<dyn Node>) -> bool {
        if self.handles.contains_key(&id) {
            return false;
        }
        self.handles.insert(id, handle);
        true
    }

    /// The handle registered under `id`, if any.
    pub fn get(&self, id: &str) -> Option<&dyn Node> {
        self.handles.get(id).map(|h| h.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_encounter_assigns_sequential_ids() {
        let mut tracker = WriteTracker::new();
        assert_eq!(tracker.id_for(0x10), (1, true));
        assert_eq!(tracker.id_for(0x20), (2, true));
        assert_eq!(tracker.id_for(0x10), (1, false));
    }

    #[test]
    fn stack_tracks_open_ancestors() {
        let mut tracker = WriteTracker::new();
        tracker.enter(0x10);
        tracker.enter(0x20);
        assert!(tracker.on_stack(0x10));
        tracker.exit(0x20);
        assert!(!tracker.on_stack(0x20));
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let mut tracker = ReadTracker::new();
        assert!(tracker.register("1".into(), Box::new(String::from("a"))));
        assert!(!tracker.register("1".into(), Box::new(String::from("b"))));
        assert!(tracker.get("1").is_some());
        assert!(tracker.get("2").is_none());
    }
}
