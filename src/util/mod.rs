use crate::models::NoteId;
use uuid::Uuid;

/// Fresh identifier for a locally created note.
///
/// The backend accepts client ids on create, so no round trip is needed.
pub fn new_note_id() -> NoteId {
    NoteId(Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_note_id_is_unique_uuid() {
        let ids: HashSet<NoteId> = (0..256).map(|_| new_note_id()).collect();
        assert_eq!(ids.len(), 256);

        let id = new_note_id();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }
}
