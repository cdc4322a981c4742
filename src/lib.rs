//! Outline editor sync engine.
//!
//! A client-side tree of notes addressed by structural paths, the
//! restructuring commands an outliner needs (new line, indent, dedent, text
//! edit), and a batched change stream that keeps a remote store up to date.

pub mod api;
pub mod models;
pub mod outline;
pub mod recorder;
pub mod state;
pub mod sync;
pub mod tree;
pub mod util;

pub use api::{ApiClient, ApiError, ApiErrorKind, ApiResult, EnvConfig};
pub use models::{ChangeKind, ChangeRecord, DiffEntry, Note, NoteId, WireNote};
pub use outline::Outline;
pub use recorder::ChangeRecorder;
pub use state::{DomFocus, FocusController, OutlineController, OutlineSession};
pub use sync::{Backend, FlushOutcome, Synchronizer};
pub use tree::{Mutation, Resolved, Tree, TreeError};

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
}
