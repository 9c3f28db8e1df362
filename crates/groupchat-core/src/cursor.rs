use crate::types::ChatMessage;

/// High-water mark for one polled stream, in Unix seconds.
///
/// Items are admitted only when their timestamp is strictly greater than the
/// mark. `advance_to` never moves the mark backwards; `reset` is reserved for
/// navigation, where the stream itself changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollCursor {
    last_seen: i64,
}

impl PollCursor {
    pub fn new(last_seen: i64) -> Self {
        Self { last_seen }
    }

    pub fn value(&self) -> i64 {
        self.last_seen
    }

    /// Replace the mark unconditionally.
    pub fn reset(&mut self, last_seen: i64) {
        self.last_seen = last_seen;
    }

    pub fn admits(&self, timestamp: i64) -> bool {
        timestamp > self.last_seen
    }

    /// Raise the mark to `timestamp` if it is newer. Returns whether it moved.
    pub fn advance_to(&mut self, timestamp: i64) -> bool {
        if timestamp > self.last_seen {
            self.last_seen = timestamp;
            true
        } else {
            false
        }
    }

    /// Messages the cursor admits, in server order.
    pub fn filter_new<'a>(&self, messages: &'a [ChatMessage]) -> Vec<&'a ChatMessage> {
        messages
            .iter()
            .filter(|message| self.admits(message.timestamp))
            .collect()
    }
}
