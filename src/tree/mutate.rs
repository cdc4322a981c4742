use super::{Resolved, Tree, TreeError};
use crate::models::{Note, NoteId};
use tracing::warn;

/// Outcome of a structural command.
///
/// `Applied` carries the note that should receive focus once the view has
/// re-rendered. `NoOp` means a precondition did not hold and nothing changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Applied(NoteId),
    NoOp,
}

impl Tree {
    fn container_mut(&mut self, at: &Resolved) -> Result<&mut Vec<NoteId>, TreeError> {
        match at {
            Resolved::Root => Ok(&mut self.roots),
            Resolved::Note(id) => Ok(self.note_mut(id)?.children.get_or_insert_with(Vec::new)),
        }
    }

    /// Start a new line after the note at `insert_after` in the list that
    /// `path` points into.
    ///
    /// When that note already has children the new note becomes its first
    /// child instead of a sibling.
    pub fn insert_sibling(
        &mut self,
        path: &[usize],
        insert_after: usize,
        new_id: NoteId,
    ) -> Result<Mutation, TreeError> {
        let Some((_, parent_path)) = path.split_last() else {
            return Err(TreeError::out_of_range(path, 0));
        };

        let parent = self.resolve(parent_path)?;
        let anchor = self
            .children_of(&parent)?
            .get(insert_after)
            .cloned()
            .ok_or_else(|| TreeError::out_of_range(path, parent_path.len()))?;

        if self.notes.contains_key(&new_id) {
            warn!(note_id = %new_id, "refusing to insert a note id that already exists");
            return Ok(Mutation::NoOp);
        }

        // `position` is the index after the anchor even when nesting. The
        // backend orders siblings by it, so a nested note sorts among the
        // anchor's children by that value, not as their first entry.
        let position = insert_after + 1;
        if self.note(&anchor)?.has_children() {
            self.notes.insert(
                new_id.clone(),
                Note::new(new_id.clone(), Some(anchor.clone()), position),
            );
            self.container_mut(&Resolved::Note(anchor))?
                .insert(0, new_id.clone());
        } else {
            self.notes.insert(
                new_id.clone(),
                Note::new(new_id.clone(), parent.as_parent_id(), position),
            );
            self.container_mut(&parent)?
                .insert(insert_after + 1, new_id.clone());
        }

        Ok(Mutation::Applied(new_id))
    }

    /// Make the note at `path` the last child of its preceding sibling.
    pub fn indent(&mut self, path: &[usize]) -> Result<Mutation, TreeError> {
        let Some((&index, parent_path)) = path.split_last() else {
            return Err(TreeError::out_of_range(path, 0));
        };

        let parent = self.resolve(parent_path)?;
        let siblings = self.children_of(&parent)?;
        let note_id = siblings
            .get(index)
            .cloned()
            .ok_or_else(|| TreeError::out_of_range(path, parent_path.len()))?;

        if index == 0 {
            return Ok(Mutation::NoOp);
        }
        let preceding = siblings[index - 1].clone();

        self.container_mut(&Resolved::Note(preceding.clone()))?
            .push(note_id.clone());
        self.container_mut(&parent)?.remove(index);
        self.note_mut(&note_id)?.parent_id = Some(preceding);

        Ok(Mutation::Applied(note_id))
    }

    /// Move the note at `path` one level up, right after its parent.
    ///
    /// Siblings that followed the note become its trailing children, so they
    /// stay visually below it. Top-level dedent splices into the root
    /// sequence; deeper dedent splices into the grandparent's children.
    pub fn dedent(&mut self, path: &[usize]) -> Result<Mutation, TreeError> {
        let Some((&index, parent_path)) = path.split_last() else {
            return Err(TreeError::out_of_range(path, 0));
        };
        let Some((&parent_index, grandparent_path)) = parent_path.split_last() else {
            // Already top-level; only validate the path.
            self.resolve(path)?;
            return Ok(Mutation::NoOp);
        };

        let Resolved::Note(parent_id) = self.resolve(parent_path)? else {
            return Err(TreeError::out_of_range(path, 0));
        };
        let grandparent = self.resolve(grandparent_path)?;
        let note_id = self
            .note(&parent_id)?
            .child_ids()
            .get(index)
            .cloned()
            .ok_or_else(|| TreeError::out_of_range(path, parent_path.len()))?;

        let siblings = self.container_mut(&Resolved::Note(parent_id.clone()))?;
        let succeeding = siblings.split_off(index + 1);
        siblings.truncate(index);

        for s in &succeeding {
            self.note_mut(s)?.parent_id = Some(note_id.clone());
        }
        let note = self.note_mut(&note_id)?;
        note.children.get_or_insert_with(Vec::new).extend(succeeding);
        note.parent_id = grandparent.as_parent_id();

        match grandparent {
            Resolved::Root => {
                let at = self
                    .roots
                    .iter()
                    .position(|r| r == &parent_id)
                    .unwrap_or(parent_index);
                self.roots.insert(at + 1, note_id.clone());
            }
            Resolved::Note(gp) => {
                let children = self.container_mut(&Resolved::Note(gp))?;
                let at = children
                    .iter()
                    .position(|c| c == &parent_id)
                    .unwrap_or(parent_index);
                children.insert(at + 1, note_id.clone());
            }
        }

        Ok(Mutation::Applied(note_id))
    }

    pub fn set_text(&mut self, id: &NoteId, text: &str) -> Result<(), TreeError> {
        self.note_mut(id)?.text = text.to_string();
        Ok(())
    }
}
