use crate::models::{ChangeKind, ChangeRecord, NoteId};

/// Records taken by one in-flight flush.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlushTicket {
    /// Highest sequence number included in the batch.
    pub through_seq: u64,
    pub records: Vec<ChangeRecord>,
}

/// Pending change queue, in arrival order.
///
/// Updates are coalesced per note. Records only leave the queue through a
/// successful flush, and only the ones that flush actually sent.
#[derive(Clone, Debug, Default)]
pub struct ChangeRecorder {
    pending: Vec<ChangeRecord>,
    next_seq: u64,
    in_flight_through: Option<u64>,
}

impl ChangeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a change. Returns `false` when an Update was absorbed by a
    /// record already waiting for the same note.
    pub fn enqueue(&mut self, note_id: NoteId, kind: ChangeKind) -> bool {
        if kind == ChangeKind::Update && self.waiting().any(|r| r.note_id == note_id) {
            return false;
        }

        self.next_seq += 1;
        self.pending.push(ChangeRecord {
            seq: self.next_seq,
            note_id,
            kind,
        });
        true
    }

    /// Records not yet handed to a flush. Anything already in flight was
    /// serialized at dispatch, so a later edit needs its own record.
    fn waiting(&self) -> impl Iterator<Item = &ChangeRecord> + '_ {
        let boundary = self.in_flight_through.unwrap_or(0);
        self.pending.iter().filter(move |r| r.seq > boundary)
    }

    pub fn pending(&self) -> &[ChangeRecord] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight_through.is_some()
    }

    /// Snapshot the queue for a flush. `None` when there is nothing to send
    /// or another flush has not completed yet.
    pub fn begin_flush(&mut self) -> Option<FlushTicket> {
        if self.is_in_flight() {
            return None;
        }
        let through_seq = self.pending.last()?.seq;

        self.in_flight_through = Some(through_seq);
        Some(FlushTicket {
            through_seq,
            records: self.pending.clone(),
        })
    }

    /// Settle the flush described by `ticket`.
    pub fn complete_flush(&mut self, ticket: &FlushTicket, delivered: bool) {
        if delivered {
            self.pending.retain(|r| r.seq > ticket.through_seq);
        }
        self.in_flight_through = None;
    }
}
