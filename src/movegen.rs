//! The move generator.
//!
//! Classic gaddag generation: for every anchor square, extend leftward
//! from the anchor (consuming rack tiles on empty squares and board
//! letters on occupied ones), then switch through the gaddag separator
//! and extend rightward. Cross sets prune placements that would form an
//! invalid perpendicular word, so every emitted move is legal by
//! construction.

use crate::board::Board;
use crate::equity::Equity;
use crate::klv::Klv;
use crate::kwg::{Kwg, GADDAG_SEPARATOR};
use crate::letter_distribution::{
    to_blanked, unblank, LetterDistribution, Tile, BLANK, PLAYED_THROUGH,
};
use crate::moves::{Direction, Move, MoveList, MoveTiles, MoveType, SortKey};
use crate::rack::{Rack, RACK_SIZE};
use crate::Error;

/// Bonus for emptying a full rack in one placement.
pub const BINGO_BONUS: i32 = 50;

/// Fixed equity of a pass. Very poor on a full board; the endgame owns
/// smarter pass valuation.
pub const PASS_EQUITY: Equity = Equity::from_int(-40);

const NO_ANCHOR: usize = usize::MAX;

/// Recording policy for one generation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordMode {
    /// Keep every legal move, capacity permitting.
    All,
    /// Keep only the single best move under the sort key.
    Best,
    /// Keep every move whose key is within the margin of the best.
    AllWithinEquityMargin(Equity),
}

/// Inputs of one generation run. The lexicon, leaves and distribution
/// are shared read-only; the policy fields are per-call.
#[derive(Clone, Copy)]
pub struct MoveGenArgs<'a> {
    pub kwg: &'a Kwg,
    pub klv: Option<&'a Klv>,
    pub ld: &'a LetterDistribution,
    pub sort_key: SortKey,
    pub record_mode: RecordMode,
    /// Tiles left in the bag; exchanges need a full rack's worth.
    pub bag_remaining: usize,
    /// Only emit exchanges keeping exactly this many tiles, if set.
    pub leave_size_for_exchange_cutoff: Option<u8>,
    /// Equity adjustment applied to opening plays (empty board only).
    pub opening_adjustment: Option<fn(&Board, &Move) -> Equity>,
}

/// Per-thread generator scratch. Reset between invocations; holds no
/// shared state, so independent threads run independent generators.
#[derive(Debug)]
pub struct MoveGenerator {
    strip: Vec<Tile>,
    rack: Rack,
    exchange_buffer: Vec<Tile>,
    tiles_played: u8,
    row: usize,
    anchor_col: usize,
    last_anchor_col: usize,
    dir: Direction,
    floor: Equity,
    exact_floor: bool,
    max_leave: Equity,
    error: Option<Error>,
}

impl MoveGenerator {
    pub fn new(dim: usize) -> MoveGenerator {
        MoveGenerator {
            strip: vec![PLAYED_THROUGH; dim],
            rack: Rack::new(0),
            exchange_buffer: Vec::with_capacity(RACK_SIZE),
            tiles_played: 0,
            row: 0,
            anchor_col: 0,
            last_anchor_col: NO_ANCHOR,
            dir: Direction::Horizontal,
            floor: Equity::MIN,
            exact_floor: false,
            max_leave: Equity::ZERO,
            error: None,
        }
    }

    /// Generate all legal plays for `rack` on `board` into `move_list`,
    /// per the recording policy. The board is restored to its original
    /// orientation before returning.
    /// ## Errors
    /// If the move list overflows under `RecordMode::All`. The move list
    /// contents are unspecified after an error; callers clear it.
    pub fn generate(
        &mut self,
        args: &MoveGenArgs,
        board: &mut Board,
        rack: &Rack,
        move_list: &mut MoveList,
    ) -> Result<(), Error> {
        move_list.clear();
        match args.record_mode {
            RecordMode::All | RecordMode::Best => {
                self.run(args, board, rack, move_list, Equity::MIN, false)?;
            }
            RecordMode::AllWithinEquityMargin(margin) => {
                // Pass 1: find the best equity in record-best mode.
                let best_args = MoveGenArgs {
                    record_mode: RecordMode::Best,
                    ..*args
                };
                let mut best_list = MoveList::new(1);
                self.run(&best_args, board, rack, &mut best_list, Equity::MIN, false)?;
                let floor = match best_list.best(args.sort_key) {
                    Some(best) => self.sort_key_value(args.sort_key, best) - margin,
                    None => Equity::MIN,
                };
                // Pass 2: record everything at or above the floor.
                let all_args = MoveGenArgs {
                    record_mode: RecordMode::All,
                    ..*args
                };
                self.run(&all_args, board, rack, move_list, floor, true)?;
            }
        }
        Ok(())
    }

    fn sort_key_value(&self, sort_key: SortKey, m: &Move) -> Equity {
        match sort_key {
            SortKey::Score => Equity::from_int(m.score),
            SortKey::Equity => m.equity,
        }
    }

    fn run(
        &mut self,
        args: &MoveGenArgs,
        board: &mut Board,
        rack: &Rack,
        move_list: &mut MoveList,
        floor: Equity,
        exact_floor: bool,
    ) -> Result<(), Error> {
        self.rack = rack.clone();
        self.tiles_played = 0;
        self.floor = floor;
        self.exact_floor = exact_floor;
        self.max_leave = args
            .klv
            .map(|klv| klv.max_leave_value())
            .unwrap_or(Equity::ZERO);
        self.error = None;
        for slot in self.strip.iter_mut() {
            *slot = PLAYED_THROUGH;
        }

        // A pass is always eligible. In record-best mode it also seeds
        // the pruning floor.
        self.record_candidate(args, move_list, pass_move());

        let was_transposed = board.is_transposed();
        board.set_transposed(false);
        self.gen_pass(args, board, move_list, Direction::Horizontal);
        if !board.is_board_empty() {
            // Opening plays in one orientation only; the transposed set
            // is identical by symmetry.
            board.set_transposed(true);
            self.gen_pass(args, board, move_list, Direction::Vertical);
        }
        board.set_transposed(was_transposed);

        self.gen_exchanges(args, move_list);

        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn gen_pass(
        &mut self,
        args: &MoveGenArgs,
        board: &Board,
        move_list: &mut MoveList,
        dir: Direction,
    ) {
        self.dir = dir;
        let dim = board.dim();
        for row in 0..dim {
            self.row = row;
            self.last_anchor_col = NO_ANCHOR;
            for col in 0..dim {
                if board.is_anchor(row, col) {
                    self.anchor_col = col;
                    self.recursive_gen(args, board, move_list, col, args.kwg.gaddag_root(), col, col);
                    self.last_anchor_col = col;
                }
            }
        }
    }

    /// Extend the play at logical `col` with the automaton sibling group
    /// `group`. `leftstrip..=rightstrip` brackets the word built so far.
    fn recursive_gen(
        &mut self,
        args: &MoveGenArgs,
        board: &Board,
        move_list: &mut MoveList,
        col: usize,
        group: u32,
        leftstrip: usize,
        rightstrip: usize,
    ) {
        if self.error.is_some() {
            return;
        }
        let letter = board.letter(self.row, col);
        if letter != crate::board::EMPTY_SQUARE {
            // Played-through square: the automaton consumes it, the rack
            // does not.
            let node_index = args.kwg.seek(group, unblank(letter));
            if node_index == 0 {
                return;
            }
            let node = args.kwg.node(node_index);
            self.go_on(
                args,
                board,
                move_list,
                col,
                PLAYED_THROUGH,
                Kwg::arc_index(node),
                Kwg::accepts(node),
                leftstrip,
                rightstrip,
            );
        } else if !self.rack.is_empty() {
            let cross_set = board.cross_set(self.row, col);
            for tile in 1..self.rack.dist_size() as Tile {
                if self.rack.count(tile) == 0 || !cross_set.contains(tile) {
                    continue;
                }
                let node_index = args.kwg.seek(group, tile);
                if node_index == 0 {
                    continue;
                }
                let node = args.kwg.node(node_index);
                self.rack.take(tile);
                self.tiles_played += 1;
                self.go_on(
                    args,
                    board,
                    move_list,
                    col,
                    tile,
                    Kwg::arc_index(node),
                    Kwg::accepts(node),
                    leftstrip,
                    rightstrip,
                );
                self.tiles_played -= 1;
                self.rack.add(tile);
            }
            if self.rack.count(BLANK) > 0 {
                // The blank tries every designation the automaton and the
                // cross set both allow.
                for node_index in args.kwg.siblings(group) {
                    let node = args.kwg.node(node_index);
                    let designation = Kwg::tile(node);
                    if designation == GADDAG_SEPARATOR || !cross_set.contains(designation) {
                        continue;
                    }
                    self.rack.take(BLANK);
                    self.tiles_played += 1;
                    self.go_on(
                        args,
                        board,
                        move_list,
                        col,
                        to_blanked(designation),
                        Kwg::arc_index(node),
                        Kwg::accepts(node),
                        leftstrip,
                        rightstrip,
                    );
                    self.tiles_played -= 1;
                    self.rack.add(BLANK);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn go_on(
        &mut self,
        args: &MoveGenArgs,
        board: &Board,
        move_list: &mut MoveList,
        col: usize,
        placed: Tile,
        next_group: u32,
        accepts: bool,
        leftstrip: usize,
        rightstrip: usize,
    ) {
        if col <= self.anchor_col {
            self.strip[col] = placed;
            let leftstrip = col;
            let no_letter_left = col == 0 || board.is_empty_square(self.row, col - 1);
            if accepts && no_letter_left && self.tiles_played > 0 {
                self.record_placement(args, board, move_list, leftstrip, rightstrip);
            }
            if next_group == 0 {
                return;
            }
            // Keep extending left, but never into the previous anchor's
            // territory: those plays were generated from it.
            if col > 0 && col - 1 != self.last_anchor_col {
                self.recursive_gen(args, board, move_list, col - 1, next_group, leftstrip, rightstrip);
            }
            let sep_node = args.kwg.seek(next_group, GADDAG_SEPARATOR);
            if sep_node != 0 && no_letter_left && self.anchor_col + 1 < board.dim() {
                self.recursive_gen(
                    args,
                    board,
                    move_list,
                    self.anchor_col + 1,
                    Kwg::arc_index(args.kwg.node(sep_node)),
                    leftstrip,
                    rightstrip,
                );
            }
        } else {
            self.strip[col] = placed;
            let rightstrip = col;
            let no_letter_right = col + 1 == board.dim() || board.is_empty_square(self.row, col + 1);
            if accepts && no_letter_right && self.tiles_played > 0 {
                self.record_placement(args, board, move_list, leftstrip, rightstrip);
            }
            if next_group != 0 && col + 1 < board.dim() {
                self.recursive_gen(args, board, move_list, col + 1, next_group, leftstrip, rightstrip);
            }
        }
    }

    fn record_placement(
        &mut self,
        args: &MoveGenArgs,
        board: &Board,
        move_list: &mut MoveList,
        leftstrip: usize,
        rightstrip: usize,
    ) {
        if self.error.is_some() {
            return;
        }
        let row = self.row;
        let mut main_score = 0i32;
        let mut word_multiplier = 1i32;
        let mut cross_total = 0i32;
        let mut single_tile_col = None;
        for col in leftstrip..=rightstrip {
            let tile = self.strip[col];
            if tile == PLAYED_THROUGH {
                main_score += args.ld.score(board.letter(row, col));
                continue;
            }
            let letter_score = args.ld.score(tile) * board.letter_multiplier(row, col) as i32;
            main_score += letter_score;
            let square_word_multiplier = board.word_multiplier(row, col) as i32;
            word_multiplier *= square_word_multiplier;
            if board.has_cross_neighbor(row, col) {
                cross_total +=
                    (letter_score + board.cross_score(row, col)) * square_word_multiplier;
            }
            single_tile_col = Some(col);
        }
        // A one-tile play that also forms a perpendicular word was
        // already generated by the other orientation's pass.
        if self.dir == Direction::Vertical && self.tiles_played == 1 {
            if let Some(col) = single_tile_col {
                if board.has_cross_neighbor(row, col) {
                    return;
                }
            }
        }
        let mut score = main_score * word_multiplier + cross_total;
        if self.tiles_played as usize == RACK_SIZE {
            score += BINGO_BONUS;
        }
        // Cheap upper bound before the leave lookup.
        if self.floor > Equity::MIN {
            let bound = match args.sort_key {
                SortKey::Score => Equity::from_int(score),
                SortKey::Equity => Equity::from_int(score) + self.max_leave,
            };
            if bound < self.floor {
                return;
            }
        }
        let leave_value = match args.klv {
            Some(klv) => klv.leave_value(&self.rack),
            None => Equity::ZERO,
        };
        let equity = Equity::from_int(score) + leave_value;
        let mut tiles = MoveTiles::new();
        tiles.extend_from_slice(&self.strip[leftstrip..=rightstrip]);
        let (move_row, move_col) = match self.dir {
            Direction::Horizontal => (row, leftstrip),
            Direction::Vertical => (leftstrip, row),
        };
        let mut m = Move {
            move_type: MoveType::Place,
            dir: self.dir,
            row: move_row as u8,
            col: move_col as u8,
            tiles,
            tiles_played: self.tiles_played,
            score,
            equity,
        };
        if board.is_board_empty() {
            if let Some(adjust) = args.opening_adjustment {
                m.equity += adjust(board, &m);
            }
        }
        self.record_candidate(args, move_list, m);
    }

    fn record_candidate(&mut self, args: &MoveGenArgs, move_list: &mut MoveList, m: Move) {
        match args.record_mode {
            RecordMode::Best => {
                move_list.push_best(m, args.sort_key);
                if let Some(best) = move_list.best(args.sort_key) {
                    self.floor = self.sort_key_value(args.sort_key, best);
                }
            }
            _ => {
                if self.exact_floor && self.sort_key_value(args.sort_key, &m) < self.floor {
                    return;
                }
                if let Err(error) = move_list.push(m) {
                    self.error = Some(error);
                }
            }
        }
    }

    fn gen_exchanges(&mut self, args: &MoveGenArgs, move_list: &mut MoveList) {
        if args.bag_remaining < RACK_SIZE || self.rack.is_empty() {
            return;
        }
        self.exchange_buffer.clear();
        self.gen_exchanges_for_tile(args, move_list, 0);
    }

    /// Enumerate multiset subsets of the rack, kind by kind. The scratch
    /// rack always holds the leave of the subset built so far.
    fn gen_exchanges_for_tile(&mut self, args: &MoveGenArgs, move_list: &mut MoveList, tile: Tile) {
        if self.error.is_some() {
            return;
        }
        if tile as usize >= self.rack.dist_size() {
            if self.exchange_buffer.is_empty() {
                return;
            }
            if let Some(cutoff) = args.leave_size_for_exchange_cutoff {
                if self.rack.total() != cutoff {
                    return;
                }
            }
            let leave_value = match args.klv {
                Some(klv) => klv.leave_value(&self.rack),
                None => Equity::ZERO,
            };
            let buffer = self.exchange_buffer.clone();
            let m = Move::exchange(&buffer, leave_value);
            self.record_candidate(args, move_list, m);
            return;
        }
        self.gen_exchanges_for_tile(args, move_list, tile + 1);
        let available = self.rack.count(tile);
        for _ in 0..available {
            self.rack.take(tile);
            self.exchange_buffer.push(tile);
            self.gen_exchanges_for_tile(args, move_list, tile + 1);
        }
        for _ in 0..available {
            self.rack.add(tile);
            self.exchange_buffer.pop();
        }
    }
}

fn pass_move() -> Move {
    let mut m = Move::pass();
    m.equity = PASS_EQUITY;
    m
}
