mod controller;

pub use controller::OutlineController;

use crate::api::{ApiResult, EnvConfig};
use crate::models::NoteId;
use crate::outline::Outline;
use crate::sync::debounce::Debouncer;
use crate::sync::timers::Timers;
use crate::sync::{Backend, FlushOutcome, Synchronizer};
use crate::tree::{Mutation, TreeError};
use std::cell::{Ref, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use tracing::debug;
use wasm_bindgen::JsCast;

/// UI hook that moves keyboard focus to a note after a structural change.
pub trait FocusController {
    fn move_focus_to(&self, id: &NoteId);
}

/// Focuses the element whose DOM id is `{id_prefix}{note_id}`.
#[derive(Clone, Debug)]
pub struct DomFocus {
    pub id_prefix: String,
}

impl Default for DomFocus {
    fn default() -> Self {
        Self {
            id_prefix: "note-".to_string(),
        }
    }
}

impl FocusController for DomFocus {
    fn move_focus_to(&self, id: &NoteId) {
        let Some(doc) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let el = doc
            .get_element_by_id(&format!("{}{}", self.id_prefix, id))
            .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok());
        if let Some(el) = el {
            let _ = el.focus();
        }
    }
}

pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// One editing session: the outline, its debounce timers, the synchronizer
/// and the focus collaborator, all on the single UI thread.
///
/// Tree, queue and timers live in one `RefCell` domain; no borrow is held
/// across an await.
pub struct OutlineSession<B, T: Timers, F> {
    outline: Rc<RefCell<Outline>>,
    sync: Synchronizer<B>,
    debouncer: Debouncer<T>,
    timers: T,
    focus: Rc<F>,
    config: EnvConfig,
}

impl<B, T, F> OutlineSession<B, T, F>
where
    B: Backend + 'static,
    T: Timers + Clone + 'static,
    F: FocusController + 'static,
{
    pub fn new(backend: B, timers: T, focus: F, config: EnvConfig) -> Self {
        Self {
            outline: Rc::new(RefCell::new(Outline::default())),
            sync: Synchronizer::new(backend),
            debouncer: Debouncer::new(timers.clone()),
            timers,
            focus: Rc::new(focus),
            config,
        }
    }

    pub fn outline(&self) -> Ref<'_, Outline> {
        self.outline.borrow()
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        self.sync.backend()
    }

    /// Load the tree. On failure the current (empty) tree is left alone and
    /// the error goes back to the caller.
    pub async fn bootstrap(&self) -> ApiResult<()> {
        let tree = self.sync.bootstrap().await?;
        self.outline.borrow_mut().replace_tree(tree);
        Ok(())
    }

    pub fn insert_sibling(
        &self,
        path: &[usize],
        insert_after: usize,
    ) -> Result<Mutation, TreeError> {
        let m = self.outline.borrow_mut().insert_sibling(path, insert_after);
        self.after_structural(path, m)
    }

    pub fn indent(&self, path: &[usize]) -> Result<Mutation, TreeError> {
        let m = self.outline.borrow_mut().indent(path);
        self.after_structural(path, m)
    }

    pub fn dedent(&self, path: &[usize]) -> Result<Mutation, TreeError> {
        let m = self.outline.borrow_mut().dedent(path);
        self.after_structural(path, m)
    }

    fn after_structural(
        &self,
        path: &[usize],
        m: Result<Mutation, TreeError>,
    ) -> Result<Mutation, TreeError> {
        match &m {
            Ok(Mutation::Applied(id)) => {
                let focus = Rc::clone(&self.focus);
                let id = id.clone();
                self.timers
                    .after_render(Box::new(move || focus.move_focus_to(&id)));
            }
            Ok(Mutation::NoOp) => {}
            Err(e) => debug!(?path, error = %e, "structural command aborted"),
        }
        m
    }

    /// Replace a note's text and (re)arm its debounce.
    pub fn update_text(&self, id: &NoteId, text: &str) -> Result<(), TreeError> {
        self.outline.borrow_mut().update_text(id, text)?;

        let outline = Rc::clone(&self.outline);
        let fired = id.clone();
        self.debouncer
            .schedule(id.clone(), self.config.debounce_ms, move || {
                outline.borrow_mut().record_update(&fired);
            });
        Ok(())
    }

    pub async fn flush(&self) -> ApiResult<FlushOutcome> {
        self.sync.flush(&self.outline).await
    }

    /// Synchronous drain: record every debounced edit now, then flush.
    pub async fn drain_now(&self) -> ApiResult<FlushOutcome> {
        let waiting = self.debouncer.take_pending();
        if !waiting.is_empty() {
            let mut o = self.outline.borrow_mut();
            for id in &waiting {
                o.record_update(id);
            }
        }
        self.flush().await
    }

    /// Arm the periodic flush. `spawn` runs each flush without blocking the
    /// ticker; `on_flush` sees every result.
    pub fn start_ticker(
        self: &Rc<Self>,
        spawn: impl Fn(LocalTask) + 'static,
        on_flush: impl Fn(ApiResult<FlushOutcome>) + 'static,
    ) -> T::Handle {
        let session = Rc::clone(self);
        let on_flush = Rc::new(on_flush);
        self.timers.set_interval(
            self.config.flush_interval_ms,
            Box::new(move || {
                let session = Rc::clone(&session);
                let on_flush = Rc::clone(&on_flush);
                spawn(Box::pin(async move {
                    let res = session.flush().await;
                    on_flush(res);
                }));
            }),
        )
    }
}
