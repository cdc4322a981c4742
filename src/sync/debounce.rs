use super::timers::Timers;
use crate::models::NoteId;
use std::cell::RefCell;
use std::rc::Rc;

/// Per-note debounce: each new schedule for a note cancels the previous one.
pub struct Debouncer<T: Timers> {
    timers: T,
    /// Armed timers in schedule order.
    pending: Rc<RefCell<Vec<(NoteId, T::Handle)>>>,
}

impl<T: Timers> Debouncer<T> {
    pub fn new(timers: T) -> Self {
        Self {
            timers,
            pending: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn schedule(&self, id: NoteId, delay_ms: u32, on_fire: impl FnOnce() + 'static) {
        self.cancel(&id);

        let pending = Rc::clone(&self.pending);
        let fired_id = id.clone();
        let handle = self.timers.set_timeout(
            delay_ms,
            Box::new(move || {
                pending.borrow_mut().retain(|(k, _)| k != &fired_id);
                on_fire();
            }),
        );

        self.pending.borrow_mut().push((id, handle));
    }

    pub fn cancel(&self, id: &NoteId) -> bool {
        let removed = {
            let mut pending = self.pending.borrow_mut();
            let idx = pending.iter().position(|(k, _)| k == id);
            idx.map(|i| pending.remove(i))
        };

        match removed {
            Some((_, handle)) => {
                self.timers.clear_timeout(&handle);
                true
            }
            None => false,
        }
    }

    /// Disarm every timer and return the notes that were waiting, oldest
    /// first, so the caller can record them immediately.
    pub fn take_pending(&self) -> Vec<NoteId> {
        let drained = std::mem::take(&mut *self.pending.borrow_mut());
        drained
            .into_iter()
            .map(|(id, handle)| {
                self.timers.clear_timeout(&handle);
                id
            })
            .collect()
    }

    pub fn is_pending(&self, id: &NoteId) -> bool {
        self.pending.borrow().iter().any(|(k, _)| k == id)
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
