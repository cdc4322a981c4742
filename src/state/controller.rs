use super::{DomFocus, OutlineSession};
use crate::api::{ApiClient, EnvConfig};
use crate::models::NoteId;
use crate::sync::timers::BrowserTimers;
use crate::sync::FlushOutcome;
use crate::tree::{Mutation, Tree, TreeError};
use leptos::ev;
use leptos::prelude::*;
use any_spawner::Executor;
use leptos::task::spawn_local;
use std::rc::Rc;
use tracing::warn;

type BrowserSession = OutlineSession<ApiClient, BrowserTimers, DomFocus>;

/// Browser-side outline controller.
///
/// Responsibilities:
/// - initial tree load (retryable by the caller)
/// - the four editor commands, with focus moved after re-render
/// - fixed-interval batched flush, plus a drain on `pagehide`
///
/// Non-responsibilities:
/// - rendering, key handling (callers translate input into commands)
#[derive(Clone)]
pub struct OutlineController {
    session: Rc<BrowserSession>,

    /// Bumped after every mutation; the render layer tracks this.
    tree_version: RwSignal<u64>,

    loading: RwSignal<bool>,
    load_error: RwSignal<Option<String>>,
    last_sync_error: RwSignal<Option<String>>,

    flush_timer_id: RwSignal<Option<i32>>,

    /// Global listener (keep handle alive).
    _pagehide_handle: StoredValue<Option<WindowListenerHandle>>,
}

impl OutlineController {
    pub fn new(config: EnvConfig) -> Self {
        // Bootstrap, ticks and drains run on `spawn_local`; a host that has
        // already mounted a Leptos app owns the executor, so "already set"
        // is fine here.
        let _ = Executor::init_wasm_bindgen();

        let api_client = ApiClient::from_config(&config);
        let session = Rc::new(OutlineSession::new(
            api_client,
            BrowserTimers,
            DomFocus::default(),
            config,
        ));

        let s = Self {
            session,
            tree_version: RwSignal::new(0),
            loading: RwSignal::new(false),
            load_error: RwSignal::new(None),
            last_sync_error: RwSignal::new(None),
            flush_timer_id: RwSignal::new(None),
            _pagehide_handle: StoredValue::new(None),
        };

        s.start_global_listeners();
        s.start_flush_ticker();
        s.bootstrap();

        s
    }

    /// Config from `window.ENV`.
    pub fn from_env() -> Self {
        Self::new(EnvConfig::load())
    }

    pub fn tree_version(&self) -> ReadSignal<u64> {
        self.tree_version.read_only()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn load_error(&self) -> Option<String> {
        self.load_error.get()
    }

    pub fn last_sync_error(&self) -> Option<String> {
        self.last_sync_error.get()
    }

    /// Read the current tree. Do not hold paths computed here across a
    /// command; every structural change invalidates them.
    pub fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        f(self.session.outline().tree())
    }

    fn touch(&self) {
        self.tree_version.update(|v| *v += 1);
    }

    fn touched(&self, m: Result<Mutation, TreeError>) -> Result<Mutation, TreeError> {
        if matches!(m, Ok(Mutation::Applied(_))) {
            self.touch();
        }
        m
    }

    /// (Re)load the tree from the backend. A failure leaves the tree empty
    /// and is reported through [`OutlineController::load_error`].
    pub fn bootstrap(&self) {
        if self.loading.get_untracked() {
            return;
        }
        self.loading.set(true);
        self.load_error.set(None);

        let s2 = self.clone();
        spawn_local(async move {
            match s2.session.bootstrap().await {
                Ok(()) => s2.touch(),
                Err(e) => s2.load_error.set(Some(e.to_string())),
            }
            s2.loading.set(false);
        });
    }

    pub fn insert_sibling(
        &self,
        path: &[usize],
        insert_after: usize,
    ) -> Result<Mutation, TreeError> {
        self.touched(self.session.insert_sibling(path, insert_after))
    }

    pub fn indent(&self, path: &[usize]) -> Result<Mutation, TreeError> {
        self.touched(self.session.indent(path))
    }

    pub fn dedent(&self, path: &[usize]) -> Result<Mutation, TreeError> {
        self.touched(self.session.dedent(path))
    }

    pub fn update_text(&self, id: &NoteId, text: &str) -> Result<(), TreeError> {
        self.session.update_text(id, text)?;
        self.touch();
        Ok(())
    }

    /// Flush debounced edits and the queue right away (e.g. before leaving
    /// the page).
    pub fn request_drain(&self) {
        let s2 = self.clone();
        spawn_local(async move {
            let res = s2.session.drain_now().await;
            s2.note_flush_result(res.map_err(|e| e.to_string()));
        });
    }

    fn note_flush_result(&self, res: Result<FlushOutcome, String>) {
        match res {
            Ok(_) => self.last_sync_error.set(None),
            Err(e) => self.last_sync_error.set(Some(e)),
        }
    }

    fn start_flush_ticker(&self) {
        if self.flush_timer_id.get_untracked().is_some() {
            return;
        }

        let s2 = self.clone();
        let tid = self.session.start_ticker(
            |task| spawn_local(task),
            move |res| s2.note_flush_result(res.map_err(|e| e.to_string())),
        );
        self.flush_timer_id.set(Some(tid));
    }

    fn start_global_listeners(&self) {
        // pagehide -> drain debounced edits and the queue
        let s2 = self.clone();
        let pagehide =
            window_event_listener(ev::pagehide, move |_ev: web_sys::PageTransitionEvent| {
                if s2.session.outline().recorder().is_in_flight() {
                    warn!("page hidden while a flush is in flight; newer edits wait for it");
                }
                s2.request_drain();
            });
        self._pagehide_handle.set_value(Some(pagehide));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_controller_commands_bump_tree_version() {
        let c = OutlineController::new(EnvConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            ..EnvConfig::default()
        });
        let v0 = c.tree_version().get_untracked();

        // The tree is empty until the load lands, so any path is stale.
        assert!(c.indent(&[0]).is_err());
        assert_eq!(c.tree_version().get_untracked(), v0);
        assert!(c.with_tree(|t| t.is_empty()));
    }

    #[wasm_bindgen_test]
    fn test_second_controller_reuses_running_executor() {
        let config = EnvConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            ..EnvConfig::default()
        };
        let a = OutlineController::new(config.clone());
        let b = OutlineController::new(config);

        // Both spawned their initial load without panicking.
        assert!(a.is_loading());
        assert!(b.is_loading());
    }
}
