//! Append-only log of envelopes received from the relay

use super::Envelope;

/// Received envelopes in arrival order. Entries are never edited or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayLog {
    entries: Vec<Envelope>,
}

impl DisplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, envelope: Envelope) {
        self.entries.push(envelope);
    }

    pub fn entries(&self) -> &[Envelope] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent `n` entries, oldest first
    pub fn tail(&self, n: usize) -> &[Envelope] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// One `type: data` line per entry
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|envelope| envelope.to_string())
    }
}
