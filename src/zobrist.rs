use crate::board::{Board, EMPTY_SQUARE};
use crate::letter_distribution::{is_blanked, unblank, Tile};
use crate::prng::Prng;

/// Position hashing by XOR-composed per-(square, tile) keys.
///
/// Blanked designations get their own keys, and a single side-to-move
/// key is XOR'd on turn change. The bag does not enter the hash: the
/// endgame positions the hash keys assume deterministic draws.
#[derive(Debug, Clone)]
pub struct Zobrist {
    dim: usize,
    keys: Vec<u64>,
    side_to_move: u64,
}

// Naturals occupy 0..64, blanked designations 64..128.
const TILE_SLOTS: usize = 128;

#[inline(always)]
fn tile_slot(tile: Tile) -> usize {
    if is_blanked(tile) {
        64 + unblank(tile) as usize
    } else {
        tile as usize
    }
}

impl Zobrist {
    pub fn new(dim: usize, seed: u64) -> Zobrist {
        let mut prng = Prng::new(seed);
        let keys = (0..dim * dim * TILE_SLOTS).map(|_| prng.next()).collect();
        Zobrist {
            dim,
            keys,
            side_to_move: prng.next(),
        }
    }

    /// Key of a tile on a physical square; XOR to place or remove.
    #[inline(always)]
    pub fn tile_key(&self, row: usize, col: usize, tile: Tile) -> u64 {
        self.keys[(row * self.dim + col) * TILE_SLOTS + tile_slot(tile)]
    }

    pub fn side_to_move_key(&self) -> u64 {
        self.side_to_move
    }

    /// Full hash of a board position with `on_turn` to move (0 or 1).
    pub fn hash(&self, board: &Board, on_turn: usize) -> u64 {
        debug_assert_eq!(board.dim(), self.dim);
        let transposed = board.is_transposed();
        let mut h = 0u64;
        for row in 0..self.dim {
            for col in 0..self.dim {
                let (r, c) = if transposed { (col, row) } else { (row, col) };
                let tile = board.letter(r, c);
                if tile != EMPTY_SQUARE {
                    h ^= self.tile_key(row, col, tile);
                }
            }
        }
        if on_turn == 1 {
            h ^= self.side_to_move;
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kwg::Kwg;
    use crate::layout::Layout;
    use crate::letter_distribution::{to_blanked, LetterDistribution};

    fn board_fixture() -> (LetterDistribution, Kwg, Board) {
        let ld = LetterDistribution::english();
        let kwg = Kwg::from_words(&ld, &["CARE", "ACE"]).unwrap();
        let board = Board::new(Layout::default(), &ld);
        (ld, kwg, board)
    }

    #[test]
    fn test_order_independence() {
        let (ld, kwg, mut a) = board_fixture();
        let mut b = a.clone();
        let zobrist = Zobrist::new(a.dim(), 1);
        let c = ld.tile_from_char('C').unwrap();
        let r = ld.tile_from_char('R').unwrap();
        a.place_tiles(&[(7, 7, c)], &kwg, &ld);
        a.place_tiles(&[(7, 8, r)], &kwg, &ld);
        b.place_tiles(&[(7, 8, r)], &kwg, &ld);
        b.place_tiles(&[(7, 7, c)], &kwg, &ld);
        assert_eq!(zobrist.hash(&a, 0), zobrist.hash(&b, 0));
    }

    #[test]
    fn test_side_to_move_changes_hash() {
        let (_ld, _kwg, board) = board_fixture();
        let zobrist = Zobrist::new(board.dim(), 1);
        assert_ne!(zobrist.hash(&board, 0), zobrist.hash(&board, 1));
        assert_eq!(
            zobrist.hash(&board, 0) ^ zobrist.side_to_move_key(),
            zobrist.hash(&board, 1)
        );
    }

    #[test]
    fn test_blanked_distinct_from_natural() {
        let (ld, kwg, mut a) = board_fixture();
        let mut b = a.clone();
        let zobrist = Zobrist::new(a.dim(), 1);
        let e = ld.tile_from_char('E').unwrap();
        a.place_tiles(&[(7, 7, e)], &kwg, &ld);
        b.place_tiles(&[(7, 7, to_blanked(e))], &kwg, &ld);
        assert_ne!(zobrist.hash(&a, 0), zobrist.hash(&b, 0));
    }

    #[test]
    fn test_incremental_matches_full() {
        let (ld, kwg, mut board) = board_fixture();
        let zobrist = Zobrist::new(board.dim(), 1);
        let before = zobrist.hash(&board, 0);
        let c = ld.tile_from_char('C').unwrap();
        board.place_tiles(&[(3, 4, c)], &kwg, &ld);
        let incremental = before ^ zobrist.tile_key(3, 4, c);
        assert_eq!(incremental, zobrist.hash(&board, 0));
    }

    #[test]
    fn test_transposition_invariant() {
        let (ld, kwg, mut board) = board_fixture();
        let zobrist = Zobrist::new(board.dim(), 1);
        let c = ld.tile_from_char('C').unwrap();
        board.place_tiles(&[(2, 9, c)], &kwg, &ld);
        let hash = zobrist.hash(&board, 0);
        board.transpose();
        assert_eq!(zobrist.hash(&board, 0), hash);
        board.transpose();
    }
}
