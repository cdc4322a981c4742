use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Stable note identifier.
///
/// Locally created notes get a random UUID; notes loaded from the backend keep
/// whatever key the backend assigned (observed as both strings and integers).
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl NoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => NoteId(s),
            Raw::Int(n) => NoteId(n.to_string()),
        })
    }
}

/// A node of the outline as held in the client arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,

    /// Structural parent. `None` means the note sits in the root sequence.
    pub parent_id: Option<NoteId>,

    /// Ordering metadata sent to the backend; the tree shape is authoritative.
    pub position: usize,

    pub text: String,

    /// `None` until something is nested under the note for the first time.
    pub children: Option<Vec<NoteId>>,
}

impl Note {
    pub fn new(id: NoteId, parent_id: Option<NoteId>, position: usize) -> Self {
        Self {
            id,
            parent_id,
            position,
            text: String::new(),
            children: None,
        }
    }

    pub fn child_ids(&self) -> &[NoteId] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn has_children(&self) -> bool {
        !self.child_ids().is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    #[serde(rename = "C")]
    Create,
    #[serde(rename = "U")]
    Update,
}

/// Pending change for one note.
///
/// Holds the note id rather than a copy of the note: the payload is built
/// from the live tree when the flush is dispatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    pub seq: u64,
    pub note_id: NoteId,
    pub kind: ChangeKind,
}

/// Note as exchanged with the backend.
///
/// The tree endpoint nests `children`; diff entries never carry them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WireNote {
    #[serde(rename = "uuid")]
    pub id: NoteId,

    #[serde(rename = "parent", default)]
    pub parent_id: Option<NoteId>,

    #[serde(default)]
    pub position: usize,

    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WireNote>>,
}

impl WireNote {
    /// Flat diff payload for a live note.
    pub fn from_note(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            parent_id: note.parent_id.clone(),
            position: note.position,
            text: note.text.clone(),
            children: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    pub note: WireNote,
    pub kind: ChangeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_accepts_string_and_integer_keys() {
        let a: NoteId = serde_json::from_str(r#""abc""#).expect("string id");
        let b: NoteId = serde_json::from_str("9223372036854775807").expect("integer id");
        assert_eq!(a.as_str(), "abc");
        assert_eq!(b.as_str(), "9223372036854775807");
    }

    #[test]
    fn test_diff_entry_contract_serialize() {
        let mut note = Note::new(NoteId::from("n1"), None, 1);
        note.text = "hello".to_string();
        let entry = DiffEntry {
            note: WireNote::from_note(&note),
            kind: ChangeKind::Create,
        };
        let v = serde_json::to_value(entry).expect("should serialize");
        assert_eq!(v["kind"], "C");
        assert_eq!(v["note"]["uuid"], "n1");
        assert!(v["note"]["parent"].is_null());
        assert_eq!(v["note"]["position"], 1);
        assert_eq!(v["note"]["text"], "hello");
        assert!(v["note"].get("children").is_none());
    }

    #[test]
    fn test_wire_note_nested_deserialize() {
        let json = r#"{
            "uuid": 7,
            "parent": null,
            "position": 0,
            "text": "root",
            "children": [{"uuid": 8, "parent": 7, "position": 0, "text": "child"}]
        }"#;
        let parsed: WireNote = serde_json::from_str(json).expect("tree note should parse");
        assert_eq!(parsed.id.as_str(), "7");
        let children = parsed.children.expect("children present");
        assert_eq!(children[0].parent_id, Some(NoteId::from("7")));
        assert!(children[0].children.is_none());
    }

    #[test]
    fn test_child_ids_empty_container_vs_absent() {
        let mut n = Note::new(NoteId::from("a"), None, 0);
        assert!(n.children.is_none());
        assert!(!n.has_children());
        n.children = Some(vec![]);
        assert!(n.child_ids().is_empty());
        assert!(!n.has_children());
    }
}
