//! Cache statistics snapshot and reporting

use std::fmt;

/// Point-in-time snapshot of the cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    /// Opens served from a resident entry
    pub hits: u64,
    /// Opens that had to admit a new entry
    pub misses: u64,
    /// Whole files read from disk
    pub disk_reads: u64,
    /// Whole buffers written back to disk
    pub disk_writes: u64,
    /// Sum of resident buffer lengths in bytes
    pub current_size: u64,
    /// Configured size bound in bytes
    pub max_size: u64,
    /// Number of resident entries
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of opens served from memory, 0.0 before the first open
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Statistics:")?;
        writeln!(
            f,
            "  Cache Size: {} / {} bytes",
            self.current_size, self.max_size
        )?;
        writeln!(f, "  Cache Entries: {}", self.entries)?;
        writeln!(f, "  Cache Hits: {}", self.hits)?;
        writeln!(f, "  Cache Misses: {}", self.misses)?;
        writeln!(f, "  Hit Rate: {:.2}%", self.hit_rate() * 100.0)?;
        writeln!(f, "  Disk Reads: {}", self.disk_reads)?;
        write!(f, "  Disk Writes: {}", self.disk_writes)
    }
}
