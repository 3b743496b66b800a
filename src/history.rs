use std::collections::VecDeque;
use std::io::{self, Write};

/// Number of commands kept by default.
pub const DEFAULT_CAPACITY: usize = 100;

/// Append-only log of the most recent commands, oldest first.
///
/// When full, pushing a new entry evicts the oldest one.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, command: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(command.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Write one `"<n>  <command>"` line per entry, numbered from 1.
    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        for (i, command) in self.iter().enumerate() {
            writeln!(out, "{}  {}", i + 1, command)?;
        }
        Ok(())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
