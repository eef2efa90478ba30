//! Observer contract for structural changes that outside consumers (e.g., a
//! presentation layer) want to be told about.

/// A change to an observable object. The event does not say which properties
/// changed, only the subject; a name change is reported specially so
/// consumers can update their own bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// The named subject changed in some way.
    Changed { subject: String },
    /// Only the subject's name changed.
    NameChanged {
        old_name: String,
        new_name: String,
    },
}

/// A listener for change events.
pub trait ChangeListener {
    fn changed(&mut self, event: &ChangeEvent);
}

/// A registry of change listeners. Each registration gets an id; removing an
/// id that is not registered is tolerated. Listeners are notified at most
/// once per logical change.
#[derive(Default)]
pub struct ListenerSet {
    next_id: usize,
    listeners: Vec<(usize, Box<dyn ChangeListener>)>,
}

impl ListenerSet {
    pub fn new() -> Self {
        ListenerSet::default()
    }

    /// Register a listener and return its registration id.
    pub fn add(&mut self, listener: Box<dyn ChangeListener>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Deregister a listener by id. Unknown ids are ignored.
    pub fn remove(&mut self, id: usize) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    /// Notify every registered listener of one event.
    pub fn notify(&mut self, event: &ChangeEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener.changed(event);
        }
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every event it sees; shared handle for assertions.
    pub(crate) struct Recorder {
        pub events: Rc<RefCell<Vec<ChangeEvent>>>,
    }

    impl ChangeListener for Recorder {
        fn changed(&mut self, event: &ChangeEvent) {
            self.events.borrow_mut().push(event.clone());
        }
    }

    #[test]
    fn test_notify_reaches_every_listener() {
        let events = Rc::new(RefCell::new(vec![]));
        let mut set = ListenerSet::new();
        set.add(Box::new(Recorder {
            events: Rc::clone(&events),
        }));
        set.add(Box::new(Recorder {
            events: Rc::clone(&events),
        }));
        set.notify(&ChangeEvent::Changed {
            subject: "ensemble".to_string(),
        });
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_remove_unknown_id_is_tolerated() {
        let mut set = ListenerSet::new();
        let id = set.add(Box::new(Recorder {
            events: Rc::new(RefCell::new(vec![])),
        }));
        set.remove(17);
        assert_eq!(set.len(), 1);
        set.remove(id);
        assert!(set.is_empty());
    }
}
