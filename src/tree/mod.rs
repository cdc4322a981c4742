mod mutate;

pub use mutate::Mutation;

use crate::models::{Note, NoteId, WireNote};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A path index ran past its sequence. Usually a stale path held across a
    /// structural change; the operation is aborted without touching the tree.
    #[error("path {path:?} is out of range at depth {depth}")]
    OutOfRange { path: Vec<usize>, depth: usize },

    #[error("unknown note {0}")]
    UnknownNote(NoteId),
}

impl TreeError {
    fn out_of_range(path: &[usize], depth: usize) -> Self {
        Self::OutOfRange {
            path: path.to_vec(),
            depth,
        }
    }
}

/// Result of resolving a path.
///
/// `Root` stands for the root sequence itself, which has no note fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Root,
    Note(NoteId),
}

impl Resolved {
    /// Value for a child's `parent_id` when placed in this container.
    pub fn as_parent_id(&self) -> Option<NoteId> {
        match self {
            Resolved::Root => None,
            Resolved::Note(id) => Some(id.clone()),
        }
    }
}

/// Ordered outline held as an arena keyed by note id.
///
/// Every note is reachable from `roots` through exactly one `children` list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tree {
    notes: HashMap<NoteId, Note>,
    roots: Vec<NoteId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the arena from the nested backend shape.
    pub fn from_wire(notes: Vec<WireNote>) -> Self {
        let mut tree = Self::new();
        let roots = notes
            .into_iter()
            .filter_map(|n| tree.adopt(n, None))
            .collect();
        tree.roots = roots;
        tree
    }

    fn adopt(&mut self, wire: WireNote, parent: Option<&NoteId>) -> Option<NoteId> {
        if self.notes.contains_key(&wire.id) {
            warn!(note_id = %wire.id, "duplicate note id in tree payload, skipping subtree");
            return None;
        }

        let id = wire.id;
        self.notes.insert(
            id.clone(),
            Note {
                id: id.clone(),
                parent_id: parent.cloned(),
                position: wire.position,
                text: wire.text,
                children: None,
            },
        );

        let children = wire.children.map(|kids| {
            kids.into_iter()
                .filter_map(|k| self.adopt(k, Some(&id)))
                .collect::<Vec<_>>()
        });
        if let Some(n) = self.notes.get_mut(&id) {
            n.children = children;
        }

        Some(id)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn roots(&self) -> &[NoteId] {
        &self.roots
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    pub(crate) fn note(&self, id: &NoteId) -> Result<&Note, TreeError> {
        self.notes
            .get(id)
            .ok_or_else(|| TreeError::UnknownNote(id.clone()))
    }

    pub(crate) fn note_mut(&mut self, id: &NoteId) -> Result<&mut Note, TreeError> {
        self.notes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNote(id.clone()))
    }

    /// Walk `path` from the root. An empty path resolves to [`Resolved::Root`].
    pub fn resolve(&self, path: &[usize]) -> Result<Resolved, TreeError> {
        let Some((&first, rest)) = path.split_first() else {
            return Ok(Resolved::Root);
        };

        let mut current = self
            .roots
            .get(first)
            .ok_or_else(|| TreeError::out_of_range(path, 0))?;

        for (depth, &idx) in rest.iter().enumerate() {
            current = self
                .note(current)?
                .child_ids()
                .get(idx)
                .ok_or_else(|| TreeError::out_of_range(path, depth + 1))?;
        }

        Ok(Resolved::Note(current.clone()))
    }

    /// Resolve a path that must land on a note (length >= 1).
    pub fn note_at(&self, path: &[usize]) -> Result<&Note, TreeError> {
        match self.resolve(path)? {
            Resolved::Root => Err(TreeError::out_of_range(path, 0)),
            Resolved::Note(id) => self.note(&id),
        }
    }

    /// Children of a container; the root sequence for [`Resolved::Root`].
    pub fn children_of(&self, at: &Resolved) -> Result<&[NoteId], TreeError> {
        match at {
            Resolved::Root => Ok(&self.roots),
            Resolved::Note(id) => Ok(self.note(id)?.child_ids()),
        }
    }

    /// Current path of a note, recomputed from the parent chain.
    pub fn path_of(&self, id: &NoteId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = self.notes.get(id)?;

        // Bounded by the arena size so a corrupted parent chain cannot spin.
        for _ in 0..=self.notes.len() {
            let siblings: &[NoteId] = match &current.parent_id {
                None => &self.roots,
                Some(pid) => self.notes.get(pid)?.child_ids(),
            };
            path.push(siblings.iter().position(|s| s == &current.id)?);

            match &current.parent_id {
                None => {
                    path.reverse();
                    return Some(path);
                }
                Some(pid) => current = self.notes.get(pid)?,
            }
        }

        None
    }

    /// Depth-first walk in display order.
    pub fn iter_preorder(&self) -> impl Iterator<Item = &Note> + '_ {
        let mut stack: Vec<&NoteId> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let note = self.notes.get(id)?;
            stack.extend(note.child_ids().iter().rev());
            Some(note)
        })
    }
}
