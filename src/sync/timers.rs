use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// Deferred-callback primitives the session schedules against.
pub trait Timers {
    type Handle: Clone + 'static;

    fn set_timeout(&self, delay_ms: u32, cb: Box<dyn FnOnce()>) -> Self::Handle;

    fn clear_timeout(&self, handle: &Self::Handle);

    /// Recurring callback for the life of the session.
    fn set_interval(&self, period_ms: u32, cb: Box<dyn FnMut()>) -> Self::Handle;

    /// Run once the render layer has picked up the current update.
    fn after_render(&self, cb: Box<dyn FnOnce()>);
}

/// `window.setTimeout` / `setInterval` / `requestAnimationFrame`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTimers;

impl Timers for BrowserTimers {
    type Handle = i32;

    fn set_timeout(&self, delay_ms: u32, cb: Box<dyn FnOnce()>) -> i32 {
        let Some(win) = web_sys::window() else {
            return 0;
        };
        let cb = Closure::once_into_js(move || cb());
        win.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            delay_ms.min(i32::MAX as u32) as i32,
        )
        .unwrap_or(0)
    }

    fn clear_timeout(&self, handle: &i32) {
        if let Some(win) = web_sys::window() {
            win.clear_timeout_with_handle(*handle);
        }
    }

    fn set_interval(&self, period_ms: u32, cb: Box<dyn FnMut()>) -> i32 {
        let Some(win) = web_sys::window() else {
            return 0;
        };
        let cb = Closure::wrap(cb);
        let tid = win
            .set_interval_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                period_ms.min(i32::MAX as u32) as i32,
            )
            .unwrap_or(0);

        // Session-lifetime ticker; the closure must outlive this call.
        cb.forget();
        tid
    }

    fn after_render(&self, cb: Box<dyn FnOnce()>) {
        let Some(win) = web_sys::window() else {
            return;
        };
        let cb = Closure::once_into_js(move || cb());
        let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}

#[cfg(test)]
pub(crate) mod manual {
    use super::Timers;
    use std::cell::RefCell;
    use std::rc::Rc;

    enum Task {
        Once(Box<dyn FnOnce()>),
        Every(u64, Box<dyn FnMut()>),
    }

    struct Entry {
        id: u32,
        due: u64,
        task: Task,
    }

    #[derive(Default)]
    struct Inner {
        now: u64,
        next_id: u32,
        entries: Vec<Entry>,
        renders: Vec<Box<dyn FnOnce()>>,
    }

    /// Virtual clock for tests; nothing runs until `advance` or `render`.
    #[derive(Clone, Default)]
    pub(crate) struct ManualTimers {
        inner: Rc<RefCell<Inner>>,
    }

    impl ManualTimers {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        fn push(&self, due_in: u64, task: Task) -> u32 {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            let id = inner.next_id;
            let due = inner.now + due_in;
            inner.entries.push(Entry { id, due, task });
            id
        }

        pub(crate) fn pending_timeouts(&self) -> usize {
            self.inner
                .borrow()
                .entries
                .iter()
                .filter(|e| matches!(e.task, Task::Once(_)))
                .count()
        }

        /// Move the clock forward, firing due callbacks in due order.
        pub(crate) fn advance(&self, ms: u64) {
            let target = self.inner.borrow().now + ms;
            loop {
                let next = {
                    let mut inner = self.inner.borrow_mut();
                    let idx = inner
                        .entries
                        .iter()
                        .enumerate()
                        .filter(|(_, e)| e.due <= target)
                        .min_by_key(|(_, e)| (e.due, e.id))
                        .map(|(i, _)| i);
                    idx.map(|i| {
                        let entry = inner.entries.remove(i);
                        inner.now = entry.due;
                        entry
                    })
                };
                let Some(entry) = next else {
                    break;
                };

                match entry.task {
                    Task::Once(cb) => cb(),
                    Task::Every(period, mut cb) => {
                        cb();
                        let mut inner = self.inner.borrow_mut();
                        inner.entries.push(Entry {
                            id: entry.id,
                            due: entry.due + period.max(1),
                            task: Task::Every(period, cb),
                        });
                    }
                }
            }
            self.inner.borrow_mut().now = target;
        }

        /// Run callbacks queued with `after_render`.
        pub(crate) fn render(&self) {
            let renders = std::mem::take(&mut self.inner.borrow_mut().renders);
            for cb in renders {
                cb();
            }
        }
    }

    impl Timers for ManualTimers {
        type Handle = u32;

        fn set_timeout(&self, delay_ms: u32, cb: Box<dyn FnOnce()>) -> u32 {
            self.push(delay_ms as u64, Task::Once(cb))
        }

        fn clear_timeout(&self, handle: &u32) {
            self.inner.borrow_mut().entries.retain(|e| e.id != *handle);
        }

        fn set_interval(&self, period_ms: u32, cb: Box<dyn FnMut()>) -> u32 {
            let period = period_ms as u64;
            self.push(period, Task::Every(period, cb))
        }

        fn after_render(&self, cb: Box<dyn FnOnce()>) {
            self.inner.borrow_mut().renders.push(cb);
        }
    }

    mod tests {
        use super::*;
        use std::cell::Cell;

        #[test]
        fn test_manual_timers_fire_in_due_order_and_clear() {
            let t = ManualTimers::new();
            let log = Rc::new(RefCell::new(Vec::new()));

            let l1 = Rc::clone(&log);
            t.set_timeout(20, Box::new(move || l1.borrow_mut().push("b")));
            let l2 = Rc::clone(&log);
            t.set_timeout(10, Box::new(move || l2.borrow_mut().push("a")));
            let l3 = Rc::clone(&log);
            let cancelled = t.set_timeout(15, Box::new(move || l3.borrow_mut().push("x")));
            t.clear_timeout(&cancelled);

            t.advance(25);
            assert_eq!(*log.borrow(), vec!["a", "b"]);
            assert_eq!(t.pending_timeouts(), 0);
        }

        #[test]
        fn test_manual_interval_repeats() {
            let t = ManualTimers::new();
            let ticks = Rc::new(Cell::new(0));
            let t2 = Rc::clone(&ticks);
            t.set_interval(5, Box::new(move || t2.set(t2.get() + 1)));
            t.advance(4);
            assert_eq!(ticks.get(), 0);
            t.advance(11);
            assert_eq!(ticks.get(), 3);
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_browser_timeout_can_be_cleared() {
        let t = BrowserTimers;
        let tid = t.set_timeout(10_000, Box::new(|| panic!("cleared timeout fired")));
        assert!(tid > 0);
        t.clear_timeout(&tid);
    }
}
