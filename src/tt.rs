//! Shared transposition table.
//!
//! Buckets of four entries are guarded by a per-bucket seqlock: readers
//! copy the bucket and verify the version counter, writers make the
//! counter odd for the duration of the write. Probes are lock-free; an
//! unstable read retries once and then reports a miss. ABDADA reservation
//! counters live inside the entries, so concurrent workers can avoid
//! duplicating the same subtree without any side structure.

use std::sync::atomic::{fence, AtomicU64, AtomicU8, Ordering};

use crate::board::Move;

/// Relationship between a stored score and the true value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// Score is the exact value.
    Exact,
    /// Score is a lower bound (search failed high).
    Lower,
    /// Score is an upper bound (search failed low).
    Upper,
}

impl Bound {
    const fn to_bits(self) -> u64 {
        match self {
            Bound::Exact => 0,
            Bound::Lower => 1,
            Bound::Upper => 2,
        }
    }

    const fn from_bits(bits: u64) -> Bound {
        match bits {
            0 => Bound::Exact,
            1 => Bound::Lower,
            _ => Bound::Upper,
        }
    }
}

/// Generations wrap at 6 bits.
const GENERATION_MASK: u8 = 0x3F;
const MAX_AGE: i32 = 63;

/// An unpacked table entry.
///
/// Data word layout:
/// - bits 0-15:  best move
/// - bits 16-31: score (i16)
/// - bits 32-39: depth
/// - bits 40-41: bound
/// - bits 42-47: generation
/// - bits 48-55: ABDADA searcher count
/// - bits 56-63: ABDADA search depth
#[derive(Clone, Copy, Debug)]
pub struct TtEntry {
    pub key: u64,
    pub mv: Move,
    pub score: i32,
    pub depth: i32,
    pub bound: Bound,
    pub generation: u8,
    pub searchers: u8,
    pub search_depth: u8,
}

impl TtEntry {
    fn pack(&self) -> u64 {
        let score_bits = (self.score as i16) as u16;
        u64::from(self.mv.as_u16())
            | (u64::from(score_bits) << 16)
            | ((self.depth.clamp(0, 255) as u64) << 32)
            | (self.bound.to_bits() << 40)
            | (u64::from(self.generation & GENERATION_MASK) << 42)
            | (u64::from(self.searchers) << 48)
            | (u64::from(self.search_depth) << 56)
    }

    fn unpack(key: u64, data: u64) -> TtEntry {
        TtEntry {
            key,
            mv: Move::from_u16((data & 0xFFFF) as u16),
            score: ((data >> 16) & 0xFFFF) as u16 as i16 as i32,
            depth: ((data >> 32) & 0xFF) as i32,
            bound: Bound::from_bits((data >> 40) & 0x3),
            generation: ((data >> 42) & 0x3F) as u8,
            searchers: ((data >> 48) & 0xFF) as u8,
            search_depth: ((data >> 56) & 0xFF) as u8,
        }
    }

    /// The best move, if one was stored.
    #[must_use]
    pub fn best_move(&self) -> Option<Move> {
        if self.mv.is_null() {
            None
        } else {
            Some(self.mv)
        }
    }
}

const ENTRIES_PER_BUCKET: usize = 4;

/// Four entries plus a seqlock version counter.
#[derive(Default)]
struct Bucket {
    version: AtomicU64,
    keys: [AtomicU64; ENTRIES_PER_BUCKET],
    data: [AtomicU64; ENTRIES_PER_BUCKET],
}

impl Bucket {
    /// Acquire the write side of the seqlock: spin until the version is
    /// even and we win the increment to odd.
    fn lock(&self) -> u64 {
        loop {
            let v = self.version.load(Ordering::Relaxed);
            if v & 1 == 0
                && self
                    .version
                    .compare_exchange_weak(v, v + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return v;
            }
            std::hint::spin_loop();
        }
    }

    fn unlock(&self, locked_from: u64) {
        self.version.store(locked_from + 2, Ordering::Release);
    }

    /// Seqlock read: a self-consistent snapshot of the four entries, or
    /// `None` if the bucket stayed unstable across one retry.
    fn snapshot(&self) -> Option<[(u64, u64); ENTRIES_PER_BUCKET]> {
        for attempt in 0..2 {
            let v1 = self.version.load(Ordering::Acquire);
            if v1 & 1 == 0 {
                let mut snap = [(0u64, 0u64); ENTRIES_PER_BUCKET];
                for (i, slot) in snap.iter_mut().enumerate() {
                    *slot = (
                        self.keys[i].load(Ordering::Relaxed),
                        self.data[i].load(Ordering::Relaxed),
                    );
                }
                fence(Ordering::Acquire);
                if self.version.load(Ordering::Relaxed) == v1 {
                    return Some(snap);
                }
            }
            if attempt == 0 {
                std::hint::spin_loop();
            }
        }
        None
    }
}

/// Atomic probe/store counters, reported for tuning and never consulted
/// by the search itself.
#[derive(Default)]
pub struct TtStats {
    pub probes: AtomicU64,
    pub hits: AtomicU64,
    pub collisions: AtomicU64,
    pub stores_fill: AtomicU64,
    pub stores_overwrite: AtomicU64,
    pub stores_evict: AtomicU64,
    pub stores_skipped: AtomicU64,
    pub unstable_reads: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct TtStatsSnapshot {
    pub probes: u64,
    pub hits: u64,
    pub collisions: u64,
    pub stores_fill: u64,
    pub stores_overwrite: u64,
    pub stores_evict: u64,
    pub stores_skipped: u64,
    pub unstable_reads: u64,
}

pub struct TranspositionTable {
    buckets: Vec<Bucket>,
    mask: usize,
    generation: AtomicU8,
    /// Entries deeper than this age at half rate (preserved across
    /// iterations).
    aging_depth_threshold: AtomicU8,
    stats: TtStats,
}

/// TT allocation failure; the caller keeps its previous table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtAllocError;

impl std::fmt::Display for TtAllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transposition table allocation failed")
    }
}

impl std::error::Error for TtAllocError {}

const fn prev_power_of_two(n: usize) -> usize {
    if n == 0 {
        1
    } else {
        let p = n.next_power_of_two();
        if p > n {
            p / 2
        } else {
            p
        }
    }
}

impl TranspositionTable {
    /// Allocate a table: the largest power of two of buckets fitting
    /// `size_mb`.
    pub fn try_new(size_mb: usize) -> Result<Self, TtAllocError> {
        let bucket_size = std::mem::size_of::<Bucket>();
        let budget = size_mb.max(1) * 1024 * 1024;
        let bucket_count = prev_power_of_two((budget / bucket_size).max(1024));

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(bucket_count)
            .map_err(|_| TtAllocError)?;
        buckets.resize_with(bucket_count, Bucket::default);

        Ok(TranspositionTable {
            buckets,
            mask: bucket_count - 1,
            generation: AtomicU8::new(0),
            aging_depth_threshold: AtomicU8::new(8),
            stats: TtStats::default(),
        })
    }

    /// Allocate a table, shrinking toward a 1 MiB floor on failure.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let mut mb = size_mb.max(1);
        loop {
            match Self::try_new(mb) {
                Ok(tt) => return tt,
                Err(TtAllocError) if mb > 1 => mb /= 2,
                Err(TtAllocError) => {
                    // 1 MiB of buckets; if this fails the process has no
                    // usable heap anyway.
                    return Self::try_new(1).expect("minimal TT allocation");
                }
            }
        }
    }

    #[inline]
    fn bucket_for(&self, hash: u64) -> &Bucket {
        &self.buckets[(hash as usize) & self.mask]
    }

    #[inline]
    fn current_generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed) & GENERATION_MASK
    }

    /// Advance the generation. Called once per root search.
    pub fn new_search(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_aging_depth_threshold(&self, threshold: u8) {
        self.aging_depth_threshold.store(threshold, Ordering::Relaxed);
    }

    /// Wipe every entry. The generation counter survives.
    pub fn clear(&self) {
        for bucket in &self.buckets {
            let v = bucket.lock();
            for i in 0..ENTRIES_PER_BUCKET {
                bucket.keys[i].store(0, Ordering::Relaxed);
                bucket.data[i].store(0, Ordering::Relaxed);
            }
            bucket.unlock(v);
        }
    }

    /// Look up the entry for `hash`, if present.
    pub fn probe(&self, hash: u64) -> Option<TtEntry> {
        self.stats.probes.fetch_add(1, Ordering::Relaxed);

        let Some(snapshot) = self.bucket_for(hash).snapshot() else {
            self.stats.unstable_reads.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let mut occupied = 0;
        for (key, data) in snapshot {
            if data != 0 {
                occupied += 1;
                if key == hash {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(TtEntry::unpack(key, data));
                }
            }
        }
        if occupied == ENTRIES_PER_BUCKET {
            self.stats.collisions.fetch_add(1, Ordering::Relaxed);
        }
        None
    }

    /// Convenience probe for just the stored best move.
    pub fn best_move(&self, hash: u64) -> Option<Move> {
        self.probe(hash).and_then(|e| e.best_move())
    }

    /// Store a search result, applying the replacement policy and the
    /// skip-rewrite rules.
    pub fn store(&self, hash: u64, depth: i32, score: i32, bound: Bound, mv: Option<Move>) {
        let generation = self.current_generation();
        let bucket = self.bucket_for(hash);
        let locked = bucket.lock();

        let mut entries = [(0u64, 0u64); ENTRIES_PER_BUCKET];
        for (i, slot) in entries.iter_mut().enumerate() {
            *slot = (
                bucket.keys[i].load(Ordering::Relaxed),
                bucket.data[i].load(Ordering::Relaxed),
            );
        }

        let new_entry = |searchers: u8, search_depth: u8| TtEntry {
            key: hash,
            mv: mv.unwrap_or(Move::null()),
            score,
            depth,
            bound,
            generation,
            searchers,
            search_depth,
        };

        // Same key: overwrite unless a skip rule protects the entry.
        for (i, &(key, data)) in entries.iter().enumerate() {
            if data == 0 || key != hash {
                continue;
            }
            let existing = TtEntry::unpack(key, data);
            let identical = existing.mv.as_u16() == mv.unwrap_or(Move::null()).as_u16()
                && existing.score == score
                && existing.bound == bound;
            let protect_exact =
                existing.bound == Bound::Exact && existing.depth >= depth && bound != Bound::Exact;
            let protect_from_qsearch = depth == 0 && existing.depth > 0;
            if (identical && existing.depth >= depth) || protect_exact || protect_from_qsearch {
                self.stats.stores_skipped.fetch_add(1, Ordering::Relaxed);
            } else {
                // Keep live ABDADA reservations across the overwrite.
                let entry = new_entry(existing.searchers, existing.search_depth);
                bucket.data[i].store(entry.pack(), Ordering::Relaxed);
                self.stats.stores_overwrite.fetch_add(1, Ordering::Relaxed);
            }
            bucket.unlock(locked);
            return;
        }

        // Empty slot.
        for (i, &(_, data)) in entries.iter().enumerate() {
            if data == 0 {
                let entry = new_entry(0, 0);
                bucket.keys[i].store(hash, Ordering::Relaxed);
                bucket.data[i].store(entry.pack(), Ordering::Relaxed);
                self.stats.stores_fill.fetch_add(1, Ordering::Relaxed);
                bucket.unlock(locked);
                return;
            }
        }

        // Full bucket: evict the slot with the lowest replacement score.
        let aging_threshold = i32::from(self.aging_depth_threshold.load(Ordering::Relaxed));
        let mut victim = 0;
        let mut victim_score = i32::MAX;
        let mut victim_depth = 0;
        for (i, &(key, data)) in entries.iter().enumerate() {
            let existing = TtEntry::unpack(key, data);
            let mut age =
                i32::from(generation.wrapping_sub(existing.generation) & GENERATION_MASK);
            if existing.depth > aging_threshold {
                age /= 2;
            }
            let mut replacement_score = existing.depth * 256 + (MAX_AGE - age);
            if existing.bound == Bound::Exact {
                replacement_score += 4096;
            }
            if existing.depth == 0 {
                replacement_score -= 2048;
            }
            if replacement_score < victim_score {
                victim_score = replacement_score;
                victim = i;
                victim_depth = existing.depth;
            }
        }

        // A qsearch entry never evicts a real search entry.
        if depth == 0 && victim_depth > 0 {
            self.stats.stores_skipped.fetch_add(1, Ordering::Relaxed);
            bucket.unlock(locked);
            return;
        }

        let entry = new_entry(0, 0);
        bucket.keys[victim].store(hash, Ordering::Relaxed);
        bucket.data[victim].store(entry.pack(), Ordering::Relaxed);
        self.stats.stores_evict.fetch_add(1, Ordering::Relaxed);
        bucket.unlock(locked);
    }

    // ------------------------------------------------------------------
    // ABDADA reservation
    // ------------------------------------------------------------------

    /// Reserve `hash` for expansion at `depth`. Returns false if another
    /// worker already searches this position at >= `depth`; the caller
    /// should defer the move instead of duplicating the work.
    pub fn try_start_search(&self, hash: u64, depth: i32) -> bool {
        let bucket = self.bucket_for(hash);
        let locked = bucket.lock();

        let mut proceed = true;
        let mut reserved = false;
        for i in 0..ENTRIES_PER_BUCKET {
            let key = bucket.keys[i].load(Ordering::Relaxed);
            let data = bucket.data[i].load(Ordering::Relaxed);
            if data == 0 || key != hash {
                continue;
            }
            let mut entry = TtEntry::unpack(key, data);
            if entry.searchers > 0 && i32::from(entry.search_depth) >= depth {
                proceed = false;
            } else {
                entry.searchers = entry.searchers.saturating_add(1);
                entry.search_depth = entry.search_depth.max(depth.clamp(0, 255) as u8);
                bucket.data[i].store(entry.pack(), Ordering::Relaxed);
            }
            reserved = true;
            break;
        }

        // Unknown position: reserve an empty slot so peers can see us.
        if !reserved && proceed {
            for i in 0..ENTRIES_PER_BUCKET {
                if bucket.data[i].load(Ordering::Relaxed) == 0 {
                    let entry = TtEntry {
                        key: hash,
                        mv: Move::null(),
                        score: 0,
                        depth: 0,
                        bound: Bound::Upper,
                        generation: self.current_generation(),
                        searchers: 1,
                        search_depth: depth.clamp(0, 255) as u8,
                    };
                    bucket.keys[i].store(hash, Ordering::Relaxed);
                    bucket.data[i].store(entry.pack(), Ordering::Relaxed);
                    break;
                }
            }
        }

        bucket.unlock(locked);
        proceed
    }

    /// Release a reservation taken by `try_start_search`. A replacement
    /// may have clobbered the entry in the meantime; that only costs a
    /// stale counter, never correctness.
    pub fn end_search(&self, hash: u64) {
        let bucket = self.bucket_for(hash);
        let locked = bucket.lock();
        for i in 0..ENTRIES_PER_BUCKET {
            let key = bucket.keys[i].load(Ordering::Relaxed);
            let data = bucket.data[i].load(Ordering::Relaxed);
            if data != 0 && key == hash {
                let mut entry = TtEntry::unpack(key, data);
                entry.searchers = entry.searchers.saturating_sub(1);
                bucket.data[i].store(entry.pack(), Ordering::Relaxed);
                break;
            }
        }
        bucket.unlock(locked);
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Occupancy estimate in permille, sampled from a prefix of the table.
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let sample_buckets = self.buckets.len().min(250);
        if sample_buckets == 0 {
            return 0;
        }
        let mut filled = 0u64;
        for bucket in &self.buckets[..sample_buckets] {
            for data in &bucket.data {
                if data.load(Ordering::Relaxed) != 0 {
                    filled += 1;
                }
            }
        }
        ((filled * 1000) / (sample_buckets as u64 * ENTRIES_PER_BUCKET as u64)) as u32
    }

    #[must_use]
    pub fn stats(&self) -> TtStatsSnapshot {
        TtStatsSnapshot {
            probes: self.stats.probes.load(Ordering::Relaxed),
            hits: self.stats.hits.load(Ordering::Relaxed),
            collisions: self.stats.collisions.load(Ordering::Relaxed),
            stores_fill: self.stats.stores_fill.load(Ordering::Relaxed),
            stores_overwrite: self.stats.stores_overwrite.load(Ordering::Relaxed),
            stores_evict: self.stats.stores_evict.load(Ordering::Relaxed),
            stores_skipped: self.stats.stores_skipped.load(Ordering::Relaxed),
            unstable_reads: self.stats.unstable_reads.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;
    use std::sync::Arc;

    fn test_move() -> Move {
        Move::quiet(Square::new(1, 4), Square::new(3, 4))
    }

    #[test]
    fn test_entry_pack_round_trip() {
        let entry = TtEntry {
            key: 0xDEADBEEF,
            mv: test_move(),
            score: -1234,
            depth: 17,
            bound: Bound::Lower,
            generation: 42,
            searchers: 3,
            search_depth: 9,
        };
        let unpacked = TtEntry::unpack(entry.key, entry.pack());
        assert_eq!(unpacked.mv, entry.mv);
        assert_eq!(unpacked.score, entry.score);
        assert_eq!(unpacked.depth, entry.depth);
        assert_eq!(unpacked.bound, entry.bound);
        assert_eq!(unpacked.generation, entry.generation);
        assert_eq!(unpacked.searchers, entry.searchers);
        assert_eq!(unpacked.search_depth, entry.search_depth);
    }

    #[test]
    fn test_store_and_probe() {
        let tt = TranspositionTable::new(1);
        tt.store(0x1234, 8, 55, Bound::Exact, Some(test_move()));

        let entry = tt.probe(0x1234).expect("hit");
        assert_eq!(entry.score, 55);
        assert_eq!(entry.depth, 8);
        assert_eq!(entry.bound, Bound::Exact);
        assert_eq!(entry.best_move(), Some(test_move()));

        assert!(tt.probe(0x9999).is_none());
    }

    #[test]
    fn test_skip_rewrite_protects_deeper_exact() {
        let tt = TranspositionTable::new(1);
        tt.store(0x42, 10, 100, Bound::Exact, Some(test_move()));
        // Shallower non-exact store for the same key must not clobber it.
        tt.store(0x42, 5, -20, Bound::Lower, None);

        let entry = tt.probe(0x42).unwrap();
        assert_eq!(entry.score, 100);
        assert_eq!(entry.depth, 10);
        assert_eq!(entry.bound, Bound::Exact);
    }

    #[test]
    fn test_qsearch_store_never_clobbers_search_entry() {
        let tt = TranspositionTable::new(1);
        tt.store(0x42, 6, 100, Bound::Lower, Some(test_move()));
        tt.store(0x42, 0, 1, Bound::Upper, None);

        let entry = tt.probe(0x42).unwrap();
        assert_eq!(entry.depth, 6);
        assert_eq!(entry.score, 100);
    }

    #[test]
    fn test_deeper_store_overwrites() {
        let tt = TranspositionTable::new(1);
        tt.store(0x42, 4, 10, Bound::Upper, None);
        tt.store(0x42, 9, 30, Bound::Exact, Some(test_move()));

        let entry = tt.probe(0x42).unwrap();
        assert_eq!(entry.depth, 9);
        assert_eq!(entry.score, 30);
    }

    #[test]
    fn test_abdada_reservation() {
        let tt = TranspositionTable::new(1);
        // First reservation proceeds, the duplicate at <= depth defers.
        assert!(tt.try_start_search(0x77, 9));
        assert!(!tt.try_start_search(0x77, 9));
        assert!(!tt.try_start_search(0x77, 6));
        // A deeper request is fresh work.
        assert!(tt.try_start_search(0x77, 12));

        tt.end_search(0x77);
        tt.end_search(0x77);
        assert!(tt.try_start_search(0x77, 9));
    }

    #[test]
    fn test_generation_wraps_at_six_bits() {
        let tt = TranspositionTable::new(1);
        for _ in 0..70 {
            tt.new_search();
        }
        assert!(tt.current_generation() <= GENERATION_MASK);
    }

    #[test]
    fn test_clear_empties_table() {
        let tt = TranspositionTable::new(1);
        tt.store(0x42, 5, 10, Bound::Exact, Some(test_move()));
        tt.clear();
        assert!(tt.probe(0x42).is_none());
    }

    #[test]
    fn test_concurrent_store_probe_no_torn_reads() {
        // Workers hammer a small key set; every successful probe must
        // return a (key, depth, score) tuple that some thread stored.
        let tt = Arc::new(TranspositionTable::new(1));
        let threads = 4;
        let iterations = 20_000;

        std::thread::scope(|scope| {
            for t in 0..threads {
                let tt = Arc::clone(&tt);
                scope.spawn(move || {
                    for i in 0..iterations {
                        let key = (i % 64) as u64 + 1;
                        // Depth and score are both derived from the key, so
                        // a torn read would produce a mismatched tuple.
                        let depth = (key % 32) as i32 + 1;
                        let score = key as i32 * 7 + t as i32;
                        tt.store(key, depth, score, Bound::Exact, Some(test_move()));

                        if let Some(entry) = tt.probe(key) {
                            assert_eq!(entry.key, key);
                            assert_eq!(entry.depth, depth);
                            assert!(
                                (0..threads as i32)
                                    .any(|x| entry.score == key as i32 * 7 + x),
                                "torn score {} for key {key}",
                                entry.score
                            );
                            assert_eq!(entry.best_move(), Some(test_move()));
                        }
                    }
                });
            }
        });
    }
}
