use std::collections::HashSet;

use crate::{File, Id};

/// Tracks which children the in-progress root already holds, per nesting
/// depth, so fan-out rows never attach a child twice.
#[derive(Debug, Default)]
pub struct ChildDeduplicator {
    seen: HashSet<(usize, Id)>,
}

impl ChildDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `file` unless a file with the same id was already attached at
    /// `depth`. Returns whether it was appended.
    pub fn attach(&mut self, depth: usize, files: &mut Vec<File>, file: File) -> bool {
        if !self.seen.insert((depth, file.id)) {
            return false;
        }
        files.push(file);
        true
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }
}
