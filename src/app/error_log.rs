use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub message: String,
    pub caught_at: Instant,
}

/// Errors surfaced to the user, newest last.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
    pub modal_open: bool,
}

impl ErrorLog {
    pub fn push_at(&mut self, message: impl Into<String>, now: Instant) {
        self.entries.push(ErrorEntry {
            message: message.into(),
            caught_at: now,
        });
        self.modal_open = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.modal_open = false;
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&ErrorEntry> {
        self.entries.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
