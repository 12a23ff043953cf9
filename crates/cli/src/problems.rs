use std::fmt::Display;

use tracing::{info, warn};

/// Per-entity failures collected while a pipeline keeps going.
///
/// Entries keep insertion order; recording a key twice replaces the earlier message in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemLog<K> {
    entries: Vec<(K, String)>,
}

impl<K> Default for ProblemLog<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: PartialEq + Display> ProblemLog<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: K, problem: impl Display) {
        let problem = problem.to_string();
        warn!(%key, %problem, "recorded problem");
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = problem,
            None => self.entries.push((key, problem)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    pub fn get(&self, key: &K) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, problem)| problem.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &str)> {
        self.entries.iter().map(|(key, problem)| (key, problem.as_str()))
    }

    /// Log the summary. `label` names what the keys are, e.g. "operator".
    pub fn report(&self, label: &str) {
        if self.is_empty() {
            info!("no problems recorded");
            return;
        }
        warn!(count = self.len(), "finished with problems");
        for (key, problem) in self.iter() {
            warn!("{label} {key}: {problem}");
        }
    }
}
