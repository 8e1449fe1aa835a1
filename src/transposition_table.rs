use crate::moves::SmallMove;
use crate::zobrist::Zobrist;

/// Bound kind of a stored score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtFlag {
    Exact = 1,
    Lower = 2,
    Upper = 3,
}

const BOTTOM_24_MASK: u64 = (1 << 24) - 1;
const DEPTH_MASK: u8 = (1 << 6) - 1;

/// One 16-byte entry: 40 bits of hash prefix, a 16-bit score and an
/// 8-bit flag+depth packed into one word, plus the packed move.
///
/// The bottom 24 bits of the hash come back from the bucket index, so
/// tables must have at least 2^24 buckets for full self-validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtEntry {
    meta: u64,
    tiny_move: u64,
}

impl TtEntry {
    pub fn new(score: i16, flag: TtFlag, depth: u8, small_move: SmallMove) -> TtEntry {
        debug_assert!(depth <= DEPTH_MASK);
        let flag_and_depth = ((flag as u8) << 6) | (depth & DEPTH_MASK);
        TtEntry {
            meta: (score as u16 as u64) << 8 | flag_and_depth as u64,
            tiny_move: small_move.raw(),
        }
    }

    fn with_hash_prefix(mut self, hash: u64) -> TtEntry {
        self.meta = (hash >> 24) << 24 | (self.meta & BOTTOM_24_MASK);
        self
    }

    fn full_hash(&self, index: u64) -> u64 {
        (self.meta >> 24) << 24 | (index & BOTTOM_24_MASK)
    }

    pub fn score(&self) -> i16 {
        (self.meta >> 8) as u16 as i16
    }

    pub fn flag(&self) -> Option<TtFlag> {
        match (self.meta as u8) >> 6 {
            1 => Some(TtFlag::Exact),
            2 => Some(TtFlag::Lower),
            3 => Some(TtFlag::Upper),
            _ => None,
        }
    }

    pub fn depth(&self) -> u8 {
        self.meta as u8 & DEPTH_MASK
    }

    pub fn is_valid(&self) -> bool {
        self.flag().is_some()
    }

    pub fn small_move(&self) -> SmallMove {
        SmallMove::from_raw(self.tiny_move)
    }
}

/// Open-addressed, always-replace transposition table keyed by Zobrist
/// hash. Entries self-validate through the stored hash prefix; a stale
/// or colliding slot reads as a miss.
pub struct TranspositionTable {
    table: Vec<TtEntry>,
    size_mask: u64,
    zobrist: Zobrist,
    lookups: u64,
    hits: u64,
    t2_collisions: u64,
    created: u64,
}

/// Smallest size whose bucket index recovers the full 24 stored-prefix
/// complement.
pub const MIN_SIZE_POWER: u32 = 24;

impl TranspositionTable {
    /// A table of `2^size_power` entries. Sizes below 2^24 are raised to
    /// the minimum, since smaller tables cannot reconstruct hashes.
    pub fn new(size_power: u32, dim: usize, zobrist_seed: u64) -> TranspositionTable {
        let size_power = if size_power < MIN_SIZE_POWER {
            log::warn!(
                "transposition table raised to 2^{} entries",
                MIN_SIZE_POWER
            );
            MIN_SIZE_POWER
        } else {
            size_power
        };
        Self::with_size_power_unchecked(size_power, dim, zobrist_seed)
    }

    /// No minimum-size clamp; self-validation only covers hashes whose
    /// bits `size_power..24` are zero. Exposed for tests and tooling.
    pub fn with_size_power_unchecked(
        size_power: u32,
        dim: usize,
        zobrist_seed: u64,
    ) -> TranspositionTable {
        let num_entries = 1usize << size_power;
        log::info!(
            "creating transposition table: 2^{} entries, {}MB",
            size_power,
            (num_entries * std::mem::size_of::<TtEntry>()) / (1024 * 1024)
        );
        TranspositionTable {
            table: vec![TtEntry::default(); num_entries],
            size_mask: num_entries as u64 - 1,
            zobrist: Zobrist::new(dim, zobrist_seed),
            lookups: 0,
            hits: 0,
            t2_collisions: 0,
            created: 0,
        }
    }

    pub fn zobrist(&self) -> &Zobrist {
        &self.zobrist
    }

    pub fn reset(&mut self) {
        for entry in self.table.iter_mut() {
            *entry = TtEntry::default();
        }
        self.lookups = 0;
        self.hits = 0;
        self.t2_collisions = 0;
        self.created = 0;
    }

    /// Always-replace store.
    pub fn store(&mut self, hash: u64, entry: TtEntry) {
        let index = hash & self.size_mask;
        self.created += 1;
        self.table[index as usize] = entry.with_hash_prefix(hash);
    }

    /// Probe; a prefix mismatch is a miss (and counts a type-2 collision
    /// when the slot held a different live key). A matching hash with a
    /// different position is a type-1 collision, accepted as negligible.
    pub fn lookup(&mut self, hash: u64) -> Option<TtEntry> {
        let index = hash & self.size_mask;
        let entry = self.table[index as usize];
        self.lookups += 1;
        if entry.full_hash(index) != hash {
            if entry.is_valid() {
                self.t2_collisions += 1;
            }
            return None;
        }
        self.hits += 1;
        Some(entry)
    }

    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn t2_collisions(&self) -> u64 {
        self.t2_collisions
    }

    pub fn created(&self) -> u64 {
        self.created
    }
}
