use crate::letter_distribution::{rack_tile, LetterDistribution, Tile};
use crate::prng::Prng;

/// The tile bag.
///
/// Tiles live in a fixed buffer; `start..end` brackets the live region.
/// Player 0 draws from the end, player 1 from the start, so that two
/// players replaying the same seeded game draw disjoint streams. Returned
/// tiles go to a random position inside the live region.
#[derive(Debug, Clone)]
pub struct Bag {
    tiles: Vec<Tile>,
    start: usize,
    end: usize,
    prng: Prng,
}

const BAG_PRNG_DEFAULT_SEED: u64 = 42;

impl Bag {
    pub fn new(ld: &LetterDistribution) -> Bag {
        let mut bag = Bag {
            tiles: vec![0; ld.total_tiles() as usize],
            start: 0,
            end: 0,
            prng: Prng::new(BAG_PRNG_DEFAULT_SEED),
        };
        bag.reset(ld);
        bag
    }

    /// Refill from the distribution and shuffle.
    pub fn reset(&mut self, ld: &LetterDistribution) {
        let mut index = 0;
        for tile in 0..ld.size() as Tile {
            for _ in 0..ld.count(tile) {
                self.tiles[index] = tile;
                index += 1;
            }
        }
        self.start = 0;
        self.end = index;
        self.shuffle();
    }

    pub fn shuffle(&mut self) {
        if self.remaining() > 1 {
            for i in self.start..self.end - 1 {
                let j = i + self.prng.range((self.end - i) as u64) as usize;
                self.tiles.swap(i, j);
            }
        }
    }

    pub fn remaining(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Number of tiles of kind `tile` still in the bag.
    pub fn count_of(&self, tile: Tile) -> usize {
        self.tiles[self.start..self.end]
            .iter()
            .filter(|&&t| t == tile)
            .count()
    }

    /// Draw the next tile from the player's side of the bag.
    /// Assumes the bag is shuffled and non-empty.
    pub fn draw_random(&mut self, player_index: usize) -> Tile {
        debug_assert!(!self.is_empty());
        if player_index == 0 {
            self.end -= 1;
            self.tiles[self.end]
        } else {
            let tile = self.tiles[self.start];
            self.start += 1;
            tile
        }
    }

    /// Draw a specific tile (used when setting known racks). A blanked
    /// tile draws the blank. Returns false if the tile is not in the bag.
    #[must_use]
    pub fn draw_tile(&mut self, tile: Tile, player_index: usize) -> bool {
        let tile = rack_tile(tile);
        let found = match self.tiles[self.start..self.end]
            .iter()
            .position(|&t| t == tile)
        {
            Some(offset) => self.start + offset,
            None => return false,
        };
        if player_index == 0 {
            self.end -= 1;
            self.tiles[found] = self.tiles[self.end];
        } else {
            self.tiles[found] = self.tiles[self.start];
            self.start += 1;
        }
        true
    }

    /// Return a tile to a random position in the live region, growing the
    /// bag on the player's own side.
    pub fn add_tile(&mut self, tile: Tile, player_index: usize) {
        let tile = rack_tile(tile);
        let remaining = self.remaining();
        let offset = if remaining > 0 {
            self.prng.range(remaining as u64 + 1) as usize
        } else {
            0
        };
        if player_index == 0 {
            // New slot opens at the end; the displaced tile moves there.
            let insert_index = self.start + offset;
            self.tiles[self.end] = self.tiles[insert_index];
            self.end += 1;
            self.tiles[insert_index] = tile;
        } else {
            debug_assert!(self.start > 0);
            self.start -= 1;
            let insert_index = self.start + offset;
            self.tiles[self.start] = self.tiles[insert_index];
            self.tiles[insert_index] = tile;
        }
    }

    /// Seed this bag's generator with a unique non-overlapping stream for
    /// the given worker.
    pub fn seed_for_worker(&mut self, seed: u64, worker_index: usize) {
        self.prng.seed(seed);
        for _ in 0..worker_index {
            self.prng.jump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::letter_distribution::BLANK;

    fn tile_histogram(bag: &Bag, size: usize) -> Vec<usize> {
        (0..size as Tile).map(|t| bag.count_of(t)).collect()
    }

    #[test]
    fn test_full_bag() {
        let ld = LetterDistribution::english();
        let bag = Bag::new(&ld);
        assert_eq!(bag.remaining(), 100);
        for tile in 0..ld.size() as Tile {
            assert_eq!(bag.count_of(tile), ld.count(tile) as usize);
        }
    }

    #[test]
    fn test_shuffle_preserves_multiset() {
        let ld = LetterDistribution::english();
        let mut bag = Bag::new(&ld);
        let before = tile_histogram(&bag, ld.size());
        bag.shuffle();
        assert_eq!(before, tile_histogram(&bag, ld.size()));
    }

    #[test]
    fn test_sided_draws_disjoint() {
        let ld = LetterDistribution::english();
        let mut bag = Bag::new(&ld);
        for _ in 0..7 {
            bag.draw_random(0);
            bag.draw_random(1);
        }
        assert_eq!(bag.remaining(), 86);
    }

    #[test]
    fn test_draw_and_return_conserves() {
        let ld = LetterDistribution::english();
        let mut bag = Bag::new(&ld);
        let before = tile_histogram(&bag, ld.size());
        let drawn: Vec<Tile> = (0..7).map(|_| bag.draw_random(0)).collect();
        for &tile in &drawn {
            bag.add_tile(tile, 0);
        }
        assert_eq!(bag.remaining(), 100);
        assert_eq!(before, tile_histogram(&bag, ld.size()));
    }

    #[test]
    fn test_draw_specific_tile() {
        let ld = LetterDistribution::english();
        let mut bag = Bag::new(&ld);
        let z = ld.tile_from_char('Z').unwrap();
        assert!(bag.draw_tile(z, 0));
        assert_eq!(bag.count_of(z), 0);
        // only one Z in the bag
        assert!(!bag.draw_tile(z, 0));
        assert_eq!(bag.remaining(), 99);
    }

    #[test]
    fn test_blanked_tile_draws_blank() {
        let ld = LetterDistribution::english();
        let mut bag = Bag::new(&ld);
        let blanked = crate::letter_distribution::to_blanked(ld.tile_from_char('E').unwrap());
        assert!(bag.draw_tile(blanked, 1));
        assert_eq!(bag.count_of(BLANK), 1);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let ld = LetterDistribution::english();
        let mut a = Bag::new(&ld);
        let mut b = Bag::new(&ld);
        a.seed_for_worker(7, 0);
        b.seed_for_worker(7, 0);
        a.reset(&ld);
        b.reset(&ld);
        let da: Vec<Tile> = (0..20).map(|_| a.draw_random(0)).collect();
        let db: Vec<Tile> = (0..20).map(|_| b.draw_random(0)).collect();
        assert_eq!(da, db);
    }

    #[test]
    fn test_worker_streams_differ() {
        let ld = LetterDistribution::english();
        let mut a = Bag::new(&ld);
        let mut b = Bag::new(&ld);
        a.seed_for_worker(7, 0);
        b.seed_for_worker(7, 1);
        a.reset(&ld);
        b.reset(&ld);
        let da: Vec<Tile> = (0..20).map(|_| a.draw_random(0)).collect();
        let db: Vec<Tile> = (0..20).map(|_| b.draw_random(0)).collect();
        assert_ne!(da, db);
    }
}
