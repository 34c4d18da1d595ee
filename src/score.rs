//! Priority scoring
//!
//! The scorer is a pure function from an entry and the current
//! wall-clock instant to a score in [0, 1]. Four signals are combined:
//! file-type importance, file size, access frequency, and access
//! recency. Small, often-accessed config-like files dominate; large
//! binary blobs sink.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::entry::CacheEntry;
use crate::metadata::normalize_extension;

/// Score given to extensions absent from the priority table
pub const DEFAULT_TYPE_PRIORITY: f64 = 0.5;

const TYPE_WEIGHT: f64 = 0.3;
const SIZE_WEIGHT: f64 = 0.2;
const ACCESS_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.2;

/// Per-extension priority bias in [0, 1]
///
/// Keys are lowercase extensions with a leading dot. Seeded with
/// defaults favoring configuration and text formats over binaries.
#[derive(Debug, Clone)]
pub struct TypePriorities {
    table: HashMap<String, f64>,
}

impl Default for TypePriorities {
    fn default() -> Self {
        let table = [
            (".txt", 0.7),
            (".cfg", 0.9),
            (".conf", 0.9),
            (".ini", 0.9),
            (".log", 0.6),
            (".json", 0.8),
            (".xml", 0.8),
            (".cpp", 0.7),
            (".h", 0.7),
            (".c", 0.7),
            (".py", 0.7),
            (".jpg", 0.4),
            (".png", 0.4),
            (".pdf", 0.3),
            (".exe", 0.1),
            (".so", 0.1),
            (".dll", 0.1),
        ]
        .into_iter()
        .map(|(ext, priority)| (ext.to_string(), priority))
        .collect();

        Self { table }
    }
}

impl TypePriorities {
    /// Create a table seeded with the default priorities
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the priority for a lowercase leading-dot extension
    pub fn get(&self, extension: &str) -> f64 {
        self.table
            .get(extension)
            .copied()
            .unwrap_or(DEFAULT_TYPE_PRIORITY)
    }

    /// Set the priority for an extension
    ///
    /// The extension is normalized to leading-dot lowercase and the
    /// value clamped to [0, 1]. Returns the normalized extension so
    /// callers can recompute scores for matching entries.
    pub fn set(&mut self, extension: &str, priority: f64) -> String {
        let ext = normalize_extension(extension);
        self.table.insert(ext.clone(), priority.clamp(0.0, 1.0));
        ext
    }
}

/// Compute an entry's priority score at `now`
///
/// Pure; higher means keep. The result is always in [0, 1].
pub fn priority_score(entry: &CacheEntry, priorities: &TypePriorities, now: SystemTime) -> f64 {
    let type_score = priorities.get(&entry.metadata.extension);

    // 1.0 for files up to 1 KiB, decreasing beyond 10 KiB.
    let size = entry.metadata.size;
    let size_score = if size <= 1024 {
        1.0
    } else {
        (10240.0 / size as f64).min(1.0)
    };

    // Log scale: more accesses raise the score, saturating at 1.0.
    let access_score =
        0.1 + ((1.0 + entry.stats.access_count as f64).log2() / 10.0).min(0.9);

    // Decay over ~1 hour. A backward clock jump clamps to zero elapsed
    // so the subscore stays within [0, 1].
    let elapsed = now
        .duration_since(entry.stats.last_accessed)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let recency_score = (-elapsed / 3600.0).exp();

    let score = type_score * TYPE_WEIGHT
        + size_score * SIZE_WEIGHT
        + access_score * ACCESS_WEIGHT
        + recency_score * RECENCY_WEIGHT;
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FileMetadata;
    use std::time::Duration;

    fn entry_with(name: &str, size: u64, accesses: u64) -> CacheEntry {
        let mut entry = CacheEntry::new(FileMetadata::empty(name));
        entry.resize_data(size as usize);
        entry.stats.access_count = accesses;
        entry
    }

    #[test]
    fn test_score_in_range() {
        let priorities = TypePriorities::new();
        let now = SystemTime::now();

        for (name, size, accesses) in [
            ("a.cfg", 0, 0),
            ("b.exe", 4 * 1024 * 1024, 0),
            ("c.txt", 512, 100_000),
            ("d", 10240, 3),
        ] {
            let score = priority_score(&entry_with(name, size, accesses), &priorities, now);
            assert!((0.0..=1.0).contains(&score), "{name}: {score}");
        }
    }

    #[test]
    fn test_unknown_extension_defaults() {
        let priorities = TypePriorities::new();
        assert_eq!(priorities.get(".weird"), DEFAULT_TYPE_PRIORITY);
        assert_eq!(priorities.get(""), DEFAULT_TYPE_PRIORITY);
    }

    #[test]
    fn test_type_priority_orders_scores() {
        let priorities = TypePriorities::new();
        let now = SystemTime::now();

        let cfg = priority_score(&entry_with("a.cfg", 2048, 1), &priorities, now);
        let exe = priority_score(&entry_with("a.exe", 2048, 1), &priorities, now);
        assert!(cfg > exe);
    }

    #[test]
    fn test_small_files_beat_large_files() {
        let priorities = TypePriorities::new();
        let now = SystemTime::now();

        let small = priority_score(&entry_with("a.dat", 512, 1), &priorities, now);
        let large = priority_score(&entry_with("b.dat", 1024 * 1024, 1), &priorities, now);
        assert!(small > large);
    }

    #[test]
    fn test_recency_decays() {
        let priorities = TypePriorities::new();
        let entry = entry_with("a.txt", 100, 1);

        let fresh = priority_score(&entry, &priorities, entry.stats.last_accessed);
        let stale = priority_score(
            &entry,
            &priorities,
            entry.stats.last_accessed + Duration::from_secs(7200),
        );
        assert!(fresh > stale);
    }

    #[test]
    fn test_backward_clock_jump_stays_in_range() {
        let priorities = TypePriorities::new();
        let entry = entry_with("a.txt", 100, 1);

        let past = entry.stats.last_accessed - Duration::from_secs(3600);
        let score = priority_score(&entry, &priorities, past);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_access_count_raises_score() {
        let priorities = TypePriorities::new();
        let now = SystemTime::now();

        let cold = priority_score(&entry_with("a.txt", 100, 0), &priorities, now);
        let hot = priority_score(&entry_with("b.txt", 100, 50), &priorities, now);
        assert!(hot > cold);
    }

    #[test]
    fn test_set_normalizes_and_clamps() {
        let mut priorities = TypePriorities::new();

        assert_eq!(priorities.set("TMP", 1.5), ".tmp");
        assert_eq!(priorities.get(".tmp"), 1.0);

        priorities.set(".neg", -0.5);
        assert_eq!(priorities.get(".neg"), 0.0);
    }
}
