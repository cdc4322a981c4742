pub mod debounce;
pub mod timers;

use crate::api::ApiResult;
use crate::models::{DiffEntry, WireNote};
use crate::outline::{Outline, PendingFlush};
use crate::tree::Tree;
use std::cell::RefCell;
use tracing::{debug, info, warn};

/// Backend boundary: one full-tree fetch and one batched diff apply.
///
/// Futures are not `Send`; everything runs on the browser's single thread.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn fetch_tree(&self) -> ApiResult<Vec<WireNote>>;

    /// Apply an ordered batch. Success or failure is reported per batch.
    async fn apply_diff(&self, diff: &[DiffEntry]) -> ApiResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued.
    Idle,
    /// A previous flush is still waiting on the backend.
    Busy,
    /// The batch was accepted; carries the number of records cleared.
    Sent(usize),
}

pub struct Synchronizer<B> {
    backend: B,
}

impl<B: Backend> Synchronizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch the whole tree once. Failures are returned, never retried here.
    pub async fn bootstrap(&self) -> ApiResult<Tree> {
        match self.backend.fetch_tree().await {
            Ok(notes) => {
                let tree = Tree::from_wire(notes);
                info!(notes = tree.len(), roots = tree.roots().len(), "tree loaded");
                Ok(tree)
            }
            Err(e) => {
                warn!(error = %e, "initial tree load failed");
                Err(e)
            }
        }
    }

    /// Send every queued record as one batch.
    ///
    /// The queue snapshot is taken before the request goes out and no borrow
    /// of `outline` is held across the await, so edits keep landing while
    /// the request is in flight and stay queued for the next cycle. Dropping
    /// the returned future mid-request counts as a failed delivery.
    pub async fn flush(&self, outline: &RefCell<Outline>) -> ApiResult<FlushOutcome> {
        let pending = {
            let mut o = outline.borrow_mut();
            if o.recorder().is_in_flight() {
                return Ok(FlushOutcome::Busy);
            }
            match o.begin_flush() {
                Some(p) => p,
                None => return Ok(FlushOutcome::Idle),
            }
        };
        let count = pending.ticket.records.len();
        let guard = InFlight::new(outline, pending);

        if guard.diff().is_empty() {
            guard.settle(true);
            return Ok(FlushOutcome::Sent(count));
        }

        debug!(records = count, "flushing diff");
        let result = self.backend.apply_diff(guard.diff()).await;

        match result {
            Ok(()) => {
                guard.settle(true);
                let remaining = outline.borrow().recorder().len();
                debug!(records = count, remaining, "diff applied");
                Ok(FlushOutcome::Sent(count))
            }
            Err(e) => {
                guard.settle(false);
                let queued = outline.borrow().recorder().len();
                warn!(error = %e, queued, "diff flush failed; will retry next tick");
                Err(e)
            }
        }
    }
}

/// Holds a started flush; releases the recorder as undelivered if dropped
/// before [`InFlight::settle`].
struct InFlight<'a> {
    outline: &'a RefCell<Outline>,
    pending: Option<PendingFlush>,
}

impl<'a> InFlight<'a> {
    fn new(outline: &'a RefCell<Outline>, pending: PendingFlush) -> Self {
        Self {
            outline,
            pending: Some(pending),
        }
    }

    fn diff(&self) -> &[DiffEntry] {
        self.pending.as_ref().map_or(&[][..], |p| p.diff.as_slice())
    }

    fn settle(mut self, delivered: bool) {
        if let Some(p) = self.pending.take() {
            self.outline.borrow_mut().complete_flush(&p, delivered);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(p) = self.pending.take() {
            let records = p.ticket.records.len();
            warn!(records, "flush abandoned mid-request; records stay queued");
            if let Ok(mut o) = self.outline.try_borrow_mut() {
                o.complete_flush(&p, false);
            }
        }
    }
}
