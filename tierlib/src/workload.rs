use std::ops::Range;
use std::sync::Arc;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use crate::config::WorkloadProfile;
use crate::error::Result;

const ROOTS: [&str; 6] = ["home", "var", "usr", "opt", "srv", "data"];
const DIRECTORIES: [&str; 12] = [
    "docs", "src", "lib", "logs", "cache", "assets", "config", "build", "media", "backup", "tmp", "share",
];
const STEMS: [&str; 8] = ["report", "index", "main", "notes", "image", "archive", "module", "record"];
const EXTENSIONS: [&str; 8] = ["txt", "rs", "json", "log", "png", "tar", "csv", "md"];
const MAX_EXTRA_DEPTH: usize = 4;
const PAYLOAD_BYTES: std::ops::RangeInclusive<u64> = 256..=4 * 1024 * 1024;

/// Descriptive data carried alongside a record, never used for lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub extension: String,
    /// Position of the record in creation order
    pub sequence: usize,
    /// Number of directories in the path
    pub depth: usize,
}

/// A synthetic file. Immutable once generated, shared between structures through an `Arc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub size: u64,
    pub metadata: RecordMetadata,
}

/// Builds the record corpus and the access sequences run against it
///
/// The random number generator is injected so whole simulations can be replayed from a seed
pub struct WorkloadGenerator<R> {
    profile: WorkloadProfile,
    rng: R,
}

impl<R: Rng> WorkloadGenerator<R> {
    pub fn new(profile: WorkloadProfile, rng: R) -> Result<Self> {
        profile.validate()?;
        Ok(Self { profile, rng })
    }

    pub fn profile(&self) -> &WorkloadProfile {
        &self.profile
    }

    /// Generates `corpus_size` records with unique path-like keys
    ///
    /// Uniqueness comes from the sequence number embedded in the file name, the rest of the path
    /// is random
    pub fn generate_corpus(&mut self) -> Vec<Arc<Record>> {
        (0..self.profile.corpus_size).map(|sequence| Arc::new(self.generate_record(sequence))).collect()
    }

    fn generate_record(&mut self, sequence: usize) -> Record {
        let rng = &mut self.rng;
        let depth = rng.random_range(1..=MAX_EXTRA_DEPTH);
        let mut key = String::new();
        key.push('/');
        key.push_str(pick(rng, &ROOTS));
        for _ in 0..depth {
            key.push('/');
            key.push_str(pick(rng, &DIRECTORIES));
        }
        let extension = pick(rng, &EXTENSIONS);
        key.push_str(&format!("/{}_{sequence:06}.{extension}", pick(rng, &STEMS)));
        Record {
            key,
            size: rng.random_range(PAYLOAD_BYTES),
            metadata: RecordMetadata {
                extension: extension.to_string(),
                sequence,
                // Root directory plus the nested ones
                depth: depth + 1,
            },
        }
    }

    /// Indices of the hot records for a corpus of the given size: the leading `hot_fraction` of
    /// it in creation order
    pub fn hot_range(&self, corpus_len: usize) -> Range<usize> {
        let hot = (corpus_len as f64 * self.profile.hot_fraction).round() as usize;
        0..hot.min(corpus_len)
    }

    /// Draws `length` record indices, each going to the hot set with probability
    /// `hot_probability` and to the cold remainder otherwise, uniformly within either set
    ///
    /// If either set is empty every draw goes to the other one. An empty corpus gives an empty
    /// sequence
    pub fn access_sequence(&mut self, corpus_len: usize, length: usize) -> Vec<usize> {
        if corpus_len == 0 {
            return Vec::new();
        }
        let hot = self.hot_range(corpus_len);
        let cold = hot.end..corpus_len;
        (0..length)
            .map(|_| {
                let use_hot = if hot.is_empty() {
                    false
                } else if cold.is_empty() {
                    true
                } else {
                    self.rng.random_bool(self.profile.hot_probability)
                };
                let range = if use_hot { hot.clone() } else { cold.clone() };
                self.rng.random_range(range)
            })
            .collect()
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, options: &[&'a str]) -> &'a str {
    // Options are non-empty constants
    options.choose(rng).copied().unwrap_or_default()
}
