use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Invalid history index")]
    InvalidIndex(usize),
    #[error("Invalid history size")]
    InvalidSize(String),
}

/// Bounded log of executed command lines.
///
/// Storage is newest-first: the front of the queue is the most recently
/// recorded line. A capacity of zero disables recording until the history
/// is resized again.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Store `line` as the newest entry, evicting the oldest one when full.
    pub fn record(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(line.to_string());
    }

    /// Entries numbered for display: index 1 is the oldest retained line,
    /// index `len()` the newest.
    pub fn show(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries
            .iter()
            .rev()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_str()))
    }

    /// Look up a line for re-execution. Index 1 is the most recent line.
    pub fn get(&self, index: usize) -> Result<&str, HistoryError> {
        if index == 0 || index > self.entries.len() {
            return Err(HistoryError::InvalidIndex(index));
        }
        Ok(self.entries[index - 1].as_str())
    }

    /// Change the capacity, dropping the oldest entries that no longer fit.
    pub fn resize(&mut self, capacity: usize) {
        self.entries.truncate(capacity);
        self.entries.shrink_to(capacity);
        self.capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse the argument of `history set <n>`.
pub fn parse_size(arg: &str) -> Result<usize, HistoryError> {
    arg.trim()
        .parse::<usize>()
        .map_err(|_| HistoryError::InvalidSize(arg.to_string()))
}
