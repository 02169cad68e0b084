//! Temporal consensus over noisy per-frame plate readings.
//!
//! A single OCR pass is unreliable. The engine accumulates normalized
//! readings for the current media unit and only emits a plate once the
//! same string has been seen often enough across independent frames,
//! filtering transient misreads without waiting for the unit to finish.

use std::collections::HashSet;

use crate::config::PipelineProfile;

/// Consensus state scoped to one media unit (or one vehicle track).
///
/// Holds the ordered reading buffer and the set of plates already
/// confirmed within the unit, so the same vehicle is not registered twice
/// while a later, different vehicle still can be.
#[derive(Debug)]
pub struct ConsensusEngine {
    buffer: Vec<String>,
    confirmed: HashSet<String>,
    min_samples: usize,
    min_frequency: usize,
    buffer_cap: usize,
    vote_at_end: bool,
}

impl ConsensusEngine {
    /// Creates an engine with the profile's thresholds.
    #[must_use]
    pub fn new(profile: &PipelineProfile) -> Self {
        Self {
            buffer: Vec::new(),
            confirmed: HashSet::new(),
            min_samples: profile.min_samples,
            min_frequency: profile.min_frequency,
            buffer_cap: profile.buffer_cap,
            vote_at_end: profile.vote_at_end,
        }
    }

    /// Number of readings currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Plates confirmed so far in this unit.
    #[must_use]
    pub fn confirmed_plates(&self) -> &HashSet<String> {
        &self.confirmed
    }

    /// Appends a normalized reading and takes an incremental vote.
    ///
    /// Once the buffer holds `min_samples` readings, the most frequent
    /// string wins if it reaches `min_frequency`; the buffer is cleared on
    /// a winning vote so a subsequent, different vehicle can still be
    /// confirmed within the same unit. A buffer that grows past the
    /// safety cap without producing a winner is cleared to bound memory
    /// and avoid frequency dilution across unrelated vehicles.
    ///
    /// Returns the plate when this reading produced a new confirmation.
    pub fn push(&mut self, reading: String) -> Option<String> {
        self.buffer.push(reading);

        if self.buffer.len() >= self.min_samples {
            if let Some((winner, frequency)) = most_frequent(&self.buffer) {
                if frequency >= self.min_frequency {
                    self.buffer.clear();
                    if self.confirmed.insert(winner.clone()) {
                        return Some(winner);
                    }
                    return None;
                }
            }
        }

        if self.buffer.len() > self.buffer_cap {
            self.buffer.clear();
        }
        None
    }

    /// End-of-unit plurality vote over whatever is still buffered.
    ///
    /// Only the image profile votes here; video profiles either confirmed
    /// incrementally or ran out of agreeing frames.
    pub fn finalize(&mut self) -> Option<String> {
        if !self.vote_at_end || self.buffer.is_empty() {
            return None;
        }
        let (winner, _) = most_frequent(&self.buffer)?;
        self.buffer.clear();
        if self.confirmed.insert(winner.clone()) {
            Some(winner)
        } else {
            None
        }
    }
}

/// Most frequent string in the buffer; ties resolve to the earliest first
/// occurrence.
fn most_frequent(buffer: &[String]) -> Option<(String, usize)> {
    let mut best: Option<(&str, usize)> = None;
    for (i, candidate) in buffer.iter().enumerate() {
        // Count only the first occurrence of each candidate.
        if buffer[..i].contains(candidate) {
            continue;
        }
        let count = buffer[i..].iter().filter(|r| *r == candidate).count();
        match best {
            Some((_, best_count)) if count <= best_count => {},
            _ => best = Some((candidate, count)),
        }
    }
    best.map(|(winner, count)| (winner.to_string(), count))
}
