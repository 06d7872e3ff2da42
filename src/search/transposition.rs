use anyhow::{anyhow, Result};

pub const MATE_VALUE: i32 = 49_000;
pub const MATE_SCORE: i32 = 48_000;

/// Sentinel returned by `probe` when the slot holds nothing usable. Sits
/// outside every reachable score.
pub const NO_HASH_ENTRY: i32 = 100_000;

const BYTES_PER_MB: usize = 0x10_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFlag {
    Exact,
    Alpha,
    Beta,
}

#[derive(Clone, Copy)]
struct TranspositionEntry {
    hash: u64,
    depth: u32,
    flag: HashFlag,
    score: i32,
}

impl TranspositionEntry {
    const fn empty() -> Self {
        Self {
            hash: 0,
            depth: 0,
            flag: HashFlag::Exact,
            score: 0,
        }
    }
}

/// Direct-mapped, always-replace cache of search results keyed on the
/// position hash.
pub struct TranspositionTable {
    entries: Vec<TranspositionEntry>,
}

impl TranspositionTable {
    /// Allocates `size_mb` MiB of entries. On allocation failure the
    /// request is halved until 1 MiB; failing that the error propagates.
    pub fn new(size_mb: usize) -> Result<Self> {
        let mut size_mb = size_mb.max(1);

        loop {
            let entry_count = size_mb * BYTES_PER_MB / std::mem::size_of::<TranspositionEntry>();

            let mut entries = Vec::new();
            match entries.try_reserve_exact(entry_count) {
                Ok(()) => {
                    entries.resize(entry_count, TranspositionEntry::empty());
                    return Ok(Self { entries });
                }
                Err(_) if size_mb > 1 => size_mb /= 2,
                Err(e) => {
                    return Err(anyhow!(e)
                        .context("failed to allocate the minimum 1 MiB transposition table"))
                }
            }
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.fill(TranspositionEntry::empty());
    }

    /// Returns the usable score for this node or `NO_HASH_ENTRY`. A stored
    /// score only counts when the hashes match and the stored depth covers
    /// the requested depth.
    pub fn probe(&self, alpha: i32, beta: i32, depth: u32, hash: u64, ply: usize) -> i32 {
        let entry = &self.entries[(hash % self.entries.len() as u64) as usize];

        if entry.hash != hash || entry.depth < depth {
            return NO_HASH_ENTRY;
        }

        let score = adjust_score_from_table(entry.score, ply);

        match entry.flag {
            HashFlag::Exact => score,
            HashFlag::Alpha if score <= alpha => alpha,
            HashFlag::Beta if score >= beta => beta,
            _ => NO_HASH_ENTRY,
        }
    }

    pub fn store(&mut self, score: i32, depth: u32, flag: HashFlag, hash: u64, ply: usize) {
        let index = (hash % self.entries.len() as u64) as usize;

        self.entries[index] = TranspositionEntry {
            hash,
            depth,
            flag,
            score: adjust_score_for_table(score, ply),
        };
    }
}

// Mate scores are stored relative to the root, not the probing node:
// translate by the node's ply on the way in and out.

#[inline(always)]
fn adjust_score_for_table(score: i32, ply: usize) -> i32 {
    if score > MATE_SCORE {
        score + ply as i32
    } else if score < -MATE_SCORE {
        score - ply as i32
    } else {
        score
    }
}

#[inline(always)]
fn adjust_score_from_table(score: i32, ply: usize) -> i32 {
    if score > MATE_SCORE {
        score - ply as i32
    } else if score < -MATE_SCORE {
        score + ply as i32
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_probe_exact() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let hash = 0x1234_5678_9ABC_DEF0;

        tt.store(150, 6, HashFlag::Exact, hash, 0);
        assert_eq!(tt.probe(-100, 100, 6, hash, 0), 150);
        assert_eq!(tt.probe(-100, 100, 6, hash ^ 1, 0), NO_HASH_ENTRY);
    }

    #[test]
    fn test_shallower_entry_misses() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let hash = 0xDEAD_BEEF;

        tt.store(42, 4, HashFlag::Exact, hash, 0);
        assert_eq!(tt.probe(-100, 100, 5, hash, 0), NO_HASH_ENTRY);
        assert_eq!(tt.probe(-100, 100, 3, hash, 0), 42);
    }

    #[test]
    fn test_bound_flags() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let hash = 0xCAFE;

        tt.store(10, 4, HashFlag::Alpha, hash, 0);
        assert_eq!(tt.probe(20, 100, 4, hash, 0), 20);
        assert_eq!(tt.probe(-20, 100, 4, hash, 0), NO_HASH_ENTRY);

        tt.store(90, 4, HashFlag::Beta, hash, 0);
        assert_eq!(tt.probe(-100, 50, 4, hash, 0), 50);
        assert_eq!(tt.probe(-100, 95, 4, hash, 0), NO_HASH_ENTRY);
    }

    #[test]
    fn test_always_replace() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let hash = 0xABCD;

        tt.store(100, 8, HashFlag::Exact, hash, 0);
        tt.store(50, 2, HashFlag::Exact, hash, 0);
        assert_eq!(tt.probe(-500, 500, 2, hash, 0), 50);
    }

    #[test]
    fn test_mate_scores_survive_ply_translation() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let hash = 0x77;
        let (store_ply, probe_ply) = (6, 2);
        let mate_in_3 = MATE_VALUE - 3;

        tt.store(mate_in_3, 8, HashFlag::Exact, hash, store_ply);
        assert_eq!(
            tt.probe(-500_000, 500_000, 8, hash, probe_ply),
            mate_in_3 + (store_ply as i32 - probe_ply as i32),
        );

        tt.store(-mate_in_3, 8, HashFlag::Exact, hash, store_ply);
        assert_eq!(
            tt.probe(-500_000, 500_000, 8, hash, probe_ply),
            -mate_in_3 - (store_ply as i32 - probe_ply as i32),
        );
    }

    #[test]
    fn test_clear() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let hash = 0x99;

        tt.store(77, 4, HashFlag::Exact, hash, 0);
        tt.clear();
        assert_eq!(tt.probe(-100, 100, 4, hash, 0), NO_HASH_ENTRY);
    }
}
