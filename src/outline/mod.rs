use crate::models::{ChangeKind, DiffEntry, NoteId, WireNote};
use crate::recorder::{ChangeRecorder, FlushTicket};
use crate::tree::{Mutation, Tree, TreeError};
use crate::util::new_note_id;
use tracing::{debug, warn};

/// Batch handed to the backend, plus the queue snapshot it settles.
#[derive(Clone, Debug)]
pub struct PendingFlush {
    pub ticket: FlushTicket,
    pub diff: Vec<DiffEntry>,
}

/// The note tree together with its pending change queue.
///
/// All four editor commands go through here so that every mutation that must
/// reach the backend is recorded.
#[derive(Clone, Debug, Default)]
pub struct Outline {
    tree: Tree,
    recorder: ChangeRecorder,
}

impl Outline {
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            recorder: ChangeRecorder::new(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn recorder(&self) -> &ChangeRecorder {
        &self.recorder
    }

    /// Swap in a freshly loaded tree. Pending records are kept.
    pub fn replace_tree(&mut self, tree: Tree) {
        self.tree = tree;
    }

    pub fn insert_sibling(
        &mut self,
        path: &[usize],
        insert_after: usize,
    ) -> Result<Mutation, TreeError> {
        let m = self.tree.insert_sibling(path, insert_after, new_note_id())?;
        if let Mutation::Applied(id) = &m {
            debug!(note_id = %id, ?path, insert_after, "note created");
            self.recorder.enqueue(id.clone(), ChangeKind::Create);
        }
        Ok(m)
    }

    pub fn indent(&mut self, path: &[usize]) -> Result<Mutation, TreeError> {
        self.tree.indent(path)
    }

    pub fn dedent(&mut self, path: &[usize]) -> Result<Mutation, TreeError> {
        self.tree.dedent(path)
    }

    /// Write the text now; the Update record is queued separately via
    /// [`Outline::record_update`] once typing pauses.
    pub fn update_text(&mut self, id: &NoteId, text: &str) -> Result<(), TreeError> {
        self.tree.set_text(id, text)
    }

    pub fn record_update(&mut self, id: &NoteId) -> bool {
        if self.tree.get(id).is_none() {
            warn!(note_id = %id, "dropping update for a note that is no longer in the tree");
            return false;
        }
        self.recorder.enqueue(id.clone(), ChangeKind::Update)
    }

    /// Snapshot the queue and serialize each record from the live note.
    pub fn begin_flush(&mut self) -> Option<PendingFlush> {
        let ticket = self.recorder.begin_flush()?;

        let diff = ticket
            .records
            .iter()
            .filter_map(|r| match self.tree.get(&r.note_id) {
                Some(note) => Some(DiffEntry {
                    note: WireNote::from_note(note),
                    kind: r.kind,
                }),
                None => {
                    warn!(note_id = %r.note_id, "queued record has no note; not sent");
                    None
                }
            })
            .collect();

        Some(PendingFlush { ticket, diff })
    }

    pub fn complete_flush(&mut self, flush: &PendingFlush, delivered: bool) {
        self.recorder.complete_flush(&flush.ticket, delivered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{id, sample_tree, wn};

    #[test]
    fn test_insert_records_create() {
        let mut o = Outline::new(sample_tree());
        let Ok(Mutation::Applied(new_id)) = o.insert_sibling(&[0], 0) else {
            panic!("insert should apply");
        };
        assert_eq!(o.recorder().len(), 1);
        assert_eq!(o.recorder().pending()[0].note_id, new_id);
        assert_eq!(o.recorder().pending()[0].kind, ChangeKind::Create);
    }

    #[test]
    fn test_structural_commands_do_not_record() {
        let mut o = Outline::new(sample_tree());
        o.indent(&[2]).expect("indent");
        o.dedent(&[1, 2]).expect("dedent");
        o.indent(&[0]).expect("noop");
        assert!(o.recorder().is_empty());
    }

    #[test]
    fn test_two_text_updates_leave_one_record_with_latest_text() {
        let mut o = Outline::new(sample_tree());
        o.update_text(&id("C"), "first").expect("update");
        o.record_update(&id("C"));
        o.update_text(&id("C"), "second").expect("update");
        o.record_update(&id("C"));

        assert_eq!(o.recorder().len(), 1);
        let flush = o.begin_flush().expect("flush");
        assert_eq!(flush.diff.len(), 1);
        assert_eq!(flush.diff[0].kind, ChangeKind::Update);
        assert_eq!(flush.diff[0].note.text, "second");
    }

    #[test]
    fn test_create_payload_reflects_state_at_flush_time() {
        let mut o = Outline::new(Tree::from_wire(vec![wn("A", "a", None), wn("B", "b", None)]));
        let Ok(Mutation::Applied(new_id)) = o.insert_sibling(&[0], 0) else {
            panic!("insert should apply");
        };
        o.update_text(&new_id, "typed before flush").expect("update");
        o.record_update(&new_id);
        // Move it under A before the flush goes out.
        o.indent(&[1]).expect("indent");

        let flush = o.begin_flush().expect("flush");
        assert_eq!(flush.diff.len(), 1);
        let sent = &flush.diff[0];
        assert_eq!(sent.kind, ChangeKind::Create);
        assert_eq!(sent.note.id, new_id);
        assert_eq!(sent.note.text, "typed before flush");
        assert_eq!(sent.note.parent_id, Some(id("A")));
        assert_eq!(sent.note.position, 1);
    }

    #[test]
    fn test_nested_create_payload_names_anchor_and_sibling_position() {
        let mut o = Outline::new(sample_tree());
        let Ok(Mutation::Applied(new_id)) = o.insert_sibling(&[1], 1) else {
            panic!("insert should apply");
        };
        assert_eq!(o.tree().path_of(&new_id), Some(vec![1, 0]));

        let flush = o.begin_flush().expect("flush");
        let sent = &flush.diff[0];
        assert_eq!(sent.kind, ChangeKind::Create);
        assert_eq!(sent.note.parent_id, Some(id("B")));
        assert_eq!(sent.note.position, 2);
    }

    #[test]
    fn test_record_update_for_unknown_note_is_dropped() {
        let mut o = Outline::new(sample_tree());
        assert!(!o.record_update(&id("ghost")));
        assert!(o.recorder().is_empty());
    }

    #[test]
    fn test_stale_path_does_not_record() {
        let mut o = Outline::new(sample_tree());
        assert!(o.insert_sibling(&[4], 4).is_err());
        assert!(o.recorder().is_empty());
    }
}
