use crate::letter_distribution::{LetterDistribution, Tile, MAX_ALPHABET};
use crate::Error;
use std::fmt;

/// Tiles a player holds between turns.
pub const RACK_SIZE: usize = 7;

/// Largest alphabet the packed [`BitRack`] key supports (4 bits per kind).
pub const BIT_RACK_MAX_ALPHABET: usize = 32;

/// A multiset of tiles held on a rack.
///
/// Stored as per-kind counts. The blank is tile `0`; its designation as a
/// letter is a property of a move, never of the rack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rack {
    counts: [u8; MAX_ALPHABET + 1],
    dist_size: u8,
    total: u8,
}

impl Rack {
    pub fn new(dist_size: usize) -> Rack {
        debug_assert!(dist_size <= MAX_ALPHABET + 1);
        Rack {
            counts: [0; MAX_ALPHABET + 1],
            dist_size: dist_size as u8,
            total: 0,
        }
    }

    pub fn from_tiles(dist_size: usize, tiles: &[Tile]) -> Rack {
        let mut rack = Rack::new(dist_size);
        for &tile in tiles {
            rack.add(tile);
        }
        rack
    }

    /// Number of tile kinds in the distribution this rack belongs to.
    pub fn dist_size(&self) -> usize {
        self.dist_size as usize
    }

    pub fn count(&self, tile: Tile) -> u8 {
        self.counts[tile as usize]
    }

    pub fn total(&self) -> u8 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn clear(&mut self) {
        self.counts = [0; MAX_ALPHABET + 1];
        self.total = 0;
    }

    pub fn add(&mut self, tile: Tile) {
        self.counts[tile as usize] += 1;
        self.total += 1;
    }

    /// Remove one tile of the given kind. The tile must be present.
    pub fn take(&mut self, tile: Tile) {
        debug_assert!(self.counts[tile as usize] > 0);
        self.counts[tile as usize] -= 1;
        self.total -= 1;
    }

    pub fn has(&self, tile: Tile) -> bool {
        self.counts[tile as usize] > 0
    }

    /// Check rack legality against a distribution: no unknown kinds, no
    /// more of a kind than exist, and at most [`RACK_SIZE`] tiles.
    pub fn validate(&self, ld: &LetterDistribution) -> Result<(), Error> {
        if self.total as usize > RACK_SIZE {
            return Err(Error::RackTooLarge(self.total as usize, RACK_SIZE));
        }
        for tile in 0..self.dist_size {
            let count = self.counts[tile as usize];
            if count > ld.count(tile) {
                return Err(Error::RackOverflow {
                    tile,
                    count,
                    max: ld.count(tile),
                });
            }
        }
        Ok(())
    }

    /// Tiles in ascending kind order, blank first.
    pub fn to_tiles(&self) -> Vec<Tile> {
        let mut tiles = Vec::with_capacity(self.total as usize);
        for tile in 0..self.dist_size {
            for _ in 0..self.counts[tile as usize] {
                tiles.push(tile);
            }
        }
        tiles
    }

    /// Compact packed key for hashing and table lookups.
    pub fn bit_rack(&self) -> BitRack {
        let mut key = BitRack::new();
        for tile in 0..self.dist_size {
            for _ in 0..self.counts[tile as usize] {
                key.add(tile);
            }
        }
        key
    }

    pub fn display(&self, ld: &LetterDistribution) -> String {
        self.to_tiles()
            .iter()
            .map(|&t| ld.char_from_tile(t))
            .collect()
    }
}

/// A 128-bit packed rack: 4 bits of count per tile kind.
///
/// Supports XOR-free incremental update by nibble addition and removal,
/// which makes it usable as a table key for word-map lookups. Alphabets
/// up to [`BIT_RACK_MAX_ALPHABET`] kinds fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitRack(u128);

impl BitRack {
    pub fn new() -> BitRack {
        BitRack(0)
    }

    #[inline(always)]
    pub fn add(&mut self, tile: Tile) {
        debug_assert!((tile as usize) < BIT_RACK_MAX_ALPHABET);
        self.0 += 1u128 << (tile as u32 * 4);
    }

    #[inline(always)]
    pub fn remove(&mut self, tile: Tile) {
        debug_assert!(self.count(tile) > 0);
        self.0 -= 1u128 << (tile as u32 * 4);
    }

    pub fn count(&self, tile: Tile) -> u8 {
        ((self.0 >> (tile as u32 * 4)) & 0xf) as u8
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Expand back into a counted rack.
    pub fn to_rack(&self, dist_size: usize) -> Rack {
        let mut rack = Rack::new(dist_size);
        for tile in 0..dist_size as Tile {
            for _ in 0..self.count(tile) {
                rack.add(tile);
            }
        }
        rack
    }
}

impl fmt::Display for Rack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Rack {} tiles>", self.total)
    }
}
