use crate::cross_set::CrossSet;
use crate::kwg::Kwg;
use crate::layout::Layout;
use crate::letter_distribution::{unblank, LetterDistribution, Tile};

/// A square's letter; `0` means empty (placed blanks always carry their
/// designation flag, so no placed tile is ever `0`).
pub const EMPTY_SQUARE: Tile = 0;

/// The playing surface with its cached generation data.
///
/// Stores placed letters plus, per direction, the cross-set, cross-score
/// and anchor caches the move generator depends on. A `transposed` flag
/// swaps row/column interpretation so that generation can always walk
/// "horizontally"; all public accessors honor it.
#[derive(Debug, Clone)]
pub struct Board {
    dim: usize,
    dist_size: usize,
    layout: Layout,
    letters: Vec<Tile>,
    // Plane 0 caches plays along physical rows, plane 1 along columns.
    cross_sets: [Vec<CrossSet>; 2],
    cross_scores: [Vec<i32>; 2],
    anchors: Vec<bool>,
    transposed: bool,
    tiles_on_board: usize,
}

impl Board {
    pub fn new(layout: Layout, ld: &LetterDistribution) -> Board {
        let dim = layout.dim();
        let squares = dim * dim;
        let mut board = Board {
            dim,
            dist_size: ld.size(),
            layout,
            letters: vec![EMPTY_SQUARE; squares],
            cross_sets: [
                vec![CrossSet::trivial(ld.size()); squares],
                vec![CrossSet::trivial(ld.size()); squares],
            ],
            cross_scores: [vec![0; squares], vec![0; squares]],
            anchors: vec![false; squares],
            transposed: false,
            tiles_on_board: 0,
        };
        board.reset_anchors();
        board
    }

    #[inline(always)]
    fn phys(&self, row: usize, col: usize) -> usize {
        if self.transposed {
            col * self.dim + row
        } else {
            row * self.dim + col
        }
    }

    #[inline(always)]
    fn plane(&self) -> usize {
        self.transposed as usize
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    pub fn transpose(&mut self) {
        self.transposed = !self.transposed;
    }

    pub fn set_transposed(&mut self, transposed: bool) {
        self.transposed = transposed;
    }

    pub fn tiles_on_board(&self) -> usize {
        self.tiles_on_board
    }

    pub fn is_board_empty(&self) -> bool {
        self.tiles_on_board == 0
    }

    /// Center square in logical coordinates (the layout is symmetric
    /// under transposition for the standard maps; use physical center).
    pub fn center(&self) -> (usize, usize) {
        self.layout.center()
    }

    #[inline(always)]
    pub fn letter(&self, row: usize, col: usize) -> Tile {
        self.letters[self.phys(row, col)]
    }

    #[inline(always)]
    pub fn is_empty_square(&self, row: usize, col: usize) -> bool {
        self.letter(row, col) == EMPTY_SQUARE
    }

    #[inline(always)]
    pub fn is_anchor(&self, row: usize, col: usize) -> bool {
        self.anchors[self.phys(row, col)]
    }

    /// Cross set for a placement at this square along the current
    /// orientation's rows.
    #[inline(always)]
    pub fn cross_set(&self, row: usize, col: usize) -> CrossSet {
        self.cross_sets[self.plane()][self.phys(row, col)]
    }

    /// Sum of the perpendicular word's letter scores at this square
    /// (zero when the square has no perpendicular neighbors).
    #[inline(always)]
    pub fn cross_score(&self, row: usize, col: usize) -> i32 {
        self.cross_scores[self.plane()][self.phys(row, col)]
    }

    /// Whether the square has a perpendicular neighbor in the current
    /// orientation (a cross word would be formed by placing here).
    pub fn has_cross_neighbor(&self, row: usize, col: usize) -> bool {
        let (r, c) = if self.transposed {
            (col, row)
        } else {
            (row, col)
        };
        let (dr, dc) = if self.transposed { (0, 1) } else { (1, 0) };
        let before = r >= dr && c >= dc && self.letters[(r - dr) * self.dim + (c - dc)] != EMPTY_SQUARE;
        let after = r + dr < self.dim
            && c + dc < self.dim
            && self.letters[(r + dr) * self.dim + (c + dc)] != EMPTY_SQUARE;
        before || after
    }

    #[inline(always)]
    pub fn letter_multiplier(&self, row: usize, col: usize) -> u8 {
        let (r, c) = if self.transposed {
            (col, row)
        } else {
            (row, col)
        };
        self.layout.letter_multiplier(r, c)
    }

    #[inline(always)]
    pub fn word_multiplier(&self, row: usize, col: usize) -> u8 {
        let (r, c) = if self.transposed {
            (col, row)
        } else {
            (row, col)
        };
        self.layout.word_multiplier(r, c)
    }

    /// Place tiles at physical coordinates and refresh the caches along
    /// the affected rows and columns only.
    pub fn place_tiles(
        &mut self,
        placements: &[(usize, usize, Tile)],
        kwg: &Kwg,
        ld: &LetterDistribution,
    ) {
        for &(row, col, tile) in placements {
            debug_assert_eq!(self.letters[row * self.dim + col], EMPTY_SQUARE);
            self.letters[row * self.dim + col] = tile;
            self.tiles_on_board += 1;
        }
        for &(row, col, _) in placements {
            self.update_caches_around(row, col, kwg, ld);
        }
    }

    /// Remove tiles (undo of `place_tiles`), refreshing caches.
    pub fn remove_tiles(
        &mut self,
        placements: &[(usize, usize, Tile)],
        kwg: &Kwg,
        ld: &LetterDistribution,
    ) {
        for &(row, col, _) in placements {
            debug_assert_ne!(self.letters[row * self.dim + col], EMPTY_SQUARE);
            self.letters[row * self.dim + col] = EMPTY_SQUARE;
            self.tiles_on_board -= 1;
        }
        for &(row, col, _) in placements {
            self.update_caches_around(row, col, kwg, ld);
        }
        if self.tiles_on_board == 0 {
            self.reset_anchors();
        }
    }

    /// Set raw letters (CGP load). Caches must be rebuilt afterwards with
    /// [`recompute_all_caches`](Board::recompute_all_caches).
    pub fn set_letters_physical(&mut self, letters: &[Tile]) {
        debug_assert_eq!(letters.len(), self.letters.len());
        self.letters.copy_from_slice(letters);
        self.tiles_on_board = letters.iter().filter(|&&t| t != EMPTY_SQUARE).count();
    }

    fn reset_anchors(&mut self) {
        for anchor in self.anchors.iter_mut() {
            *anchor = false;
        }
        if self.tiles_on_board == 0 {
            let (row, col) = self.layout.center();
            self.anchors[row * self.dim + col] = true;
        }
    }

    /// Rebuild every cache from the placed letters. Quadratic in the
    /// board area; used after bulk loads and by consistency tests.
    pub fn recompute_all_caches(&mut self, kwg: &Kwg, ld: &LetterDistribution) {
        for row in 0..self.dim {
            for col in 0..self.dim {
                for plane in 0..2 {
                    self.recompute_cross(plane, row, col, kwg, ld);
                }
                self.recompute_anchor(row, col);
            }
        }
        if self.tiles_on_board == 0 {
            self.reset_anchors();
        }
    }

    /// Refresh caches affected by a tile change at physical `(row, col)`:
    /// the ends of the occupied runs through it in both directions, the
    /// square itself, and the anchor state of its neighborhood.
    fn update_caches_around(
        &mut self,
        row: usize,
        col: usize,
        kwg: &Kwg,
        ld: &LetterDistribution,
    ) {
        for plane in 0..2 {
            self.recompute_cross(plane, row, col, kwg, ld);
        }
        // Column runs bound the squares whose vertical cross words changed.
        let (mut top, mut bottom) = (row, row);
        while top > 0 && self.letters[(top - 1) * self.dim + col] != EMPTY_SQUARE {
            top -= 1;
        }
        while bottom + 1 < self.dim && self.letters[(bottom + 1) * self.dim + col] != EMPTY_SQUARE {
            bottom += 1;
        }
        if top > 0 {
            for plane in 0..2 {
                self.recompute_cross(plane, top - 1, col, kwg, ld);
            }
        }
        if bottom + 1 < self.dim {
            for plane in 0..2 {
                self.recompute_cross(plane, bottom + 1, col, kwg, ld);
            }
        }
        // Row runs bound the squares whose horizontal cross words changed.
        let (mut left, mut right) = (col, col);
        while left > 0 && self.letters[row * self.dim + left - 1] != EMPTY_SQUARE {
            left -= 1;
        }
        while right + 1 < self.dim && self.letters[row * self.dim + right + 1] != EMPTY_SQUARE {
            right += 1;
        }
        if left > 0 {
            for plane in 0..2 {
                self.recompute_cross(plane, row, left - 1, kwg, ld);
            }
        }
        if right + 1 < self.dim {
            for plane in 0..2 {
                self.recompute_cross(plane, row, right + 1, kwg, ld);
            }
        }
        // Anchor states move with occupancy.
        self.recompute_anchor(row, col);
        let neighbors = [
            (row.wrapping_sub(1), col),
            (row + 1, col),
            (row, col.wrapping_sub(1)),
            (row, col + 1),
        ];
        for &(r, c) in neighbors.iter() {
            if r < self.dim && c < self.dim {
                self.recompute_anchor(r, c);
            }
        }
    }

    fn recompute_anchor(&mut self, row: usize, col: usize) {
        let index = row * self.dim + col;
        if self.letters[index] != EMPTY_SQUARE {
            self.anchors[index] = false;
            return;
        }
        let mut adjacent = false;
        if row > 0 && self.letters[index - self.dim] != EMPTY_SQUARE {
            adjacent = true;
        }
        if row + 1 < self.dim && self.letters[index + self.dim] != EMPTY_SQUARE {
            adjacent = true;
        }
        if col > 0 && self.letters[index - 1] != EMPTY_SQUARE {
            adjacent = true;
        }
        if col + 1 < self.dim && self.letters[index + 1] != EMPTY_SQUARE {
            adjacent = true;
        }
        self.anchors[index] = adjacent;
    }

    /// Recompute one plane's cross set and score at physical `(row, col)`.
    ///
    /// Plane 0 serves plays along rows, so its cross words run down
    /// columns, and vice versa.
    fn recompute_cross(
        &mut self,
        plane: usize,
        row: usize,
        col: usize,
        kwg: &Kwg,
        ld: &LetterDistribution,
    ) {
        let index = row * self.dim + col;
        if self.letters[index] != EMPTY_SQUARE {
            self.cross_sets[plane][index] = CrossSet::new();
            self.cross_scores[plane][index] = 0;
            return;
        }
        let (dr, dc) = if plane == 0 { (1, 0) } else { (0, 1) };
        // Letters before the square, in reading order.
        let mut prefix = Vec::new();
        let (mut r, mut c) = (row, col);
        while r >= dr && c >= dc {
            r -= dr;
            c -= dc;
            let letter = self.letters[r * self.dim + c];
            if letter == EMPTY_SQUARE {
                break;
            }
            prefix.push(letter);
        }
        prefix.reverse();
        // Letters after the square.
        let mut suffix = Vec::new();
        let (mut r, mut c) = (row, col);
        while r + dr < self.dim && c + dc < self.dim {
            r += dr;
            c += dc;
            let letter = self.letters[r * self.dim + c];
            if letter == EMPTY_SQUARE {
                break;
            }
            suffix.push(letter);
        }
        if prefix.is_empty() && suffix.is_empty() {
            self.cross_sets[plane][index] = CrossSet::trivial(self.dist_size);
            self.cross_scores[plane][index] = 0;
            return;
        }
        let score: i32 = prefix
            .iter()
            .chain(suffix.iter())
            .map(|&t| ld.score(t))
            .sum();
        let mut set = CrossSet::new();
        // Walk the prefix once, then test every candidate letter against
        // the suffix from the post-prefix node.
        let mut group = kwg.dawg_root();
        let mut prefix_ok = true;
        for &letter in &prefix {
            group = kwg.advance(group, unblank(letter));
            if group == 0 {
                prefix_ok = false;
                break;
            }
        }
        if prefix_ok {
            for candidate in 1..self.dist_size as Tile {
                let node_index = kwg.seek(group, candidate);
                if node_index == 0 {
                    continue;
                }
                if self.suffix_accepts(kwg, node_index, &suffix) {
                    set.insert(candidate);
                }
            }
        }
        self.cross_sets[plane][index] = set;
        self.cross_scores[plane][index] = score;
    }

    fn suffix_accepts(&self, kwg: &Kwg, mut node_index: u32, suffix: &[Tile]) -> bool {
        if suffix.is_empty() {
            return Kwg::accepts(kwg.node(node_index));
        }
        for &letter in suffix {
            let group = Kwg::arc_index(kwg.node(node_index));
            node_index = kwg.seek(group, unblank(letter));
            if node_index == 0 {
                return false;
            }
        }
        Kwg::accepts(kwg.node(node_index))
    }

    /// Rows of glyphs, empty squares as `.` (CGP-style display).
    pub fn to_strings(&self, ld: &LetterDistribution) -> Vec<String> {
        (0..self.dim)
            .map(|row| {
                (0..self.dim)
                    .map(|col| {
                        let letter = self.letters[row * self.dim + col];
                        if letter == EMPTY_SQUARE {
                            '.'
                        } else {
                            ld.char_from_tile(letter)
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
