use crate::bag::Bag;
use crate::board::{Board, EMPTY_SQUARE};
use crate::klv::Klv;
use crate::kwg::Kwg;
use crate::layout::Layout;
use crate::letter_distribution::{rack_tile, unblank, LetterDistribution, Tile, PLAYED_THROUGH};
use crate::moves::{Direction, Move, MoveType};
use crate::rack::{Rack, RACK_SIZE};
use crate::Error;
use std::sync::Arc;

/// Consecutive scoreless turns that end a game.
pub const MAX_SCORELESS_TURNS: u32 = 6;

#[derive(Debug, Clone)]
pub struct Player {
    pub rack: Rack,
    pub score: i32,
}

/// A position in play: board, bag, both racks and the turn state.
///
/// The lexicon, leave table and distribution are shared read-only with
/// every clone, so rollout workers clone games freely.
#[derive(Debug, Clone)]
pub struct Game {
    ld: Arc<LetterDistribution>,
    kwg: Arc<Kwg>,
    klv: Arc<Klv>,
    board: Board,
    bag: Bag,
    players: [Player; 2],
    on_turn: usize,
    consecutive_scoreless: u32,
    game_over: bool,
}

impl Game {
    pub fn new(
        layout: Layout,
        ld: Arc<LetterDistribution>,
        kwg: Arc<Kwg>,
        klv: Arc<Klv>,
    ) -> Game {
        let board = Board::new(layout, &ld);
        let bag = Bag::new(&ld);
        let dist_size = ld.size();
        Game {
            ld,
            kwg,
            klv,
            board,
            bag,
            players: [
                Player {
                    rack: Rack::new(dist_size),
                    score: 0,
                },
                Player {
                    rack: Rack::new(dist_size),
                    score: 0,
                },
            ],
            on_turn: 0,
            consecutive_scoreless: 0,
            game_over: false,
        }
    }

    pub fn ld(&self) -> &Arc<LetterDistribution> {
        &self.ld
    }

    pub fn kwg(&self) -> &Arc<Kwg> {
        &self.kwg
    }

    pub fn klv(&self) -> &Arc<Klv> {
        &self.klv
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut Bag {
        &mut self.bag
    }

    pub fn on_turn(&self) -> usize {
        self.on_turn
    }

    pub fn player(&self, index: usize) -> &Player {
        &self.players[index]
    }

    pub fn rack(&self, index: usize) -> &Rack {
        &self.players[index].rack
    }

    pub fn consecutive_scoreless(&self) -> u32 {
        self.consecutive_scoreless
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    /// Score difference from `player`'s point of view.
    pub fn spread(&self, player: usize) -> i32 {
        self.players[player].score - self.players[1 - player].score
    }

    /// Tiles not visible to the player on turn: bag plus the opponent's
    /// rack.
    pub fn tiles_unseen(&self) -> usize {
        self.bag.remaining() + self.players[1 - self.on_turn].rack.total() as usize
    }

    /// Fill both racks from the bag (game start).
    pub fn draw_starting_racks(&mut self) {
        for index in 0..2 {
            self.refill_rack(index);
        }
    }

    fn refill_rack(&mut self, index: usize) {
        while (self.players[index].rack.total() as usize) < RACK_SIZE && !self.bag.is_empty() {
            let tile = self.bag.draw_random(index);
            self.players[index].rack.add(tile);
        }
    }

    /// Give a player a known rack, drawing its tiles from the bag; the
    /// previous rack is returned first.
    /// ## Errors
    /// If the bag does not hold the requested tiles.
    pub fn set_rack_from_bag(&mut self, index: usize, tiles: &[Tile]) -> Result<(), Error> {
        let old = self.players[index].rack.to_tiles();
        for tile in old {
            self.bag.add_tile(tile, index);
        }
        self.players[index].rack.clear();
        for &tile in tiles {
            if !self.bag.draw_tile(tile, index) {
                return Err(Error::CgpParseError(format!(
                    "tile '{}' is not in the bag",
                    self.ld.char_from_tile(tile)
                )));
            }
            self.players[index].rack.add(rack_tile(tile));
        }
        self.players[index].rack.validate(&self.ld)
    }

    /// Return a player's rack to the bag and draw a random replacement
    /// of the same size (opponent-model sampling in rollouts).
    pub fn redraw_rack_at_random(&mut self, index: usize) {
        let old = self.players[index].rack.to_tiles();
        let size = old.len();
        for tile in old {
            self.bag.add_tile(tile, index);
        }
        self.players[index].rack.clear();
        for _ in 0..size {
            if self.bag.is_empty() {
                break;
            }
            let tile = self.bag.draw_random(index);
            self.players[index].rack.add(tile);
        }
    }

    /// Physical square/tile placements of a placement move, skipping
    /// played-through positions.
    fn placements(&self, m: &Move) -> Vec<(usize, usize, Tile)> {
        let (dr, dc) = match m.dir {
            Direction::Horizontal => (0usize, 1usize),
            Direction::Vertical => (1, 0),
        };
        let (mut row, mut col) = (m.row as usize, m.col as usize);
        let mut placements = Vec::with_capacity(m.tiles_played as usize);
        for &tile in m.tiles.iter() {
            if tile != PLAYED_THROUGH {
                placements.push((row, col, tile));
            }
            row += dr;
            col += dc;
        }
        placements
    }

    /// Check a move against this position: rack coverage, placement
    /// geometry, connectivity, and every formed word.
    /// ## Errors
    /// The first violated rule, as a move-validation error.
    pub fn validate_move(&self, m: &Move) -> Result<(), Error> {
        let rack = &self.players[self.on_turn].rack;
        match m.move_type {
            MoveType::Pass => Ok(()),
            MoveType::Exchange => {
                if self.bag.remaining() < RACK_SIZE {
                    return Err(Error::InvalidExchange(format!(
                        "{} tiles in the bag",
                        self.bag.remaining()
                    )));
                }
                let mut scratch = rack.clone();
                for &tile in m.tiles.iter() {
                    let needed = rack_tile(tile);
                    if !scratch.has(needed) {
                        return Err(Error::TileNotInRack(needed));
                    }
                    scratch.take(needed);
                }
                Ok(())
            }
            MoveType::Place => self.validate_placement(m, rack),
        }
    }

    fn validate_placement(&self, m: &Move, rack: &Rack) -> Result<(), Error> {
        let dim = self.board.dim();
        let (dr, dc) = match m.dir {
            Direction::Horizontal => (0usize, 1usize),
            Direction::Vertical => (1, 0),
        };
        let (row, col) = (m.row as usize, m.col as usize);
        let len = m.tiles.len();
        if len == 0 || m.tiles_played == 0 {
            return Err(Error::TilePlacementError { row, col, len });
        }
        if row + dr * (len - 1) >= dim || col + dc * (len - 1) >= dim {
            return Err(Error::TilePlacementError { row, col, len });
        }
        let mut scratch = rack.clone();
        let mut connected = false;
        let (mut r, mut c) = (row, col);
        for &tile in m.tiles.iter() {
            if tile == PLAYED_THROUGH {
                if self.board.letter(r, c) == EMPTY_SQUARE {
                    return Err(Error::DisconnectedPlacement { row: r, col: c });
                }
                connected = true;
            } else {
                if self.board.letter(r, c) != EMPTY_SQUARE {
                    return Err(Error::TileReplaceError { row: r, col: c });
                }
                let needed = rack_tile(tile);
                if !scratch.has(needed) {
                    return Err(Error::TileNotInRack(needed));
                }
                scratch.take(needed);
                if self.has_neighbor(r, c) {
                    connected = true;
                }
                if self.board.is_board_empty() && (r, c) == self.board.center() {
                    connected = true;
                }
            }
            r += dr;
            c += dc;
        }
        if !connected {
            return Err(Error::DisconnectedPlacement { row, col });
        }
        // The main word and every perpendicular word must be words.
        let main_word = self.read_word_through(m, row, col, dr, dc);
        if main_word.len() >= 2 && !self.kwg.is_word(&main_word) {
            return Err(Error::PhonyWord(self.word_to_string(&main_word)));
        }
        let (mut r, mut c) = (row, col);
        for &tile in m.tiles.iter() {
            if tile != PLAYED_THROUGH {
                let cross = self.read_cross_word(r, c, tile, dr, dc);
                if cross.len() >= 2 && !self.kwg.is_word(&cross) {
                    return Err(Error::PhonyWord(self.word_to_string(&cross)));
                }
            }
            r += dr;
            c += dc;
        }
        Ok(())
    }

    fn has_neighbor(&self, row: usize, col: usize) -> bool {
        let dim = self.board.dim();
        (row > 0 && self.board.letter(row - 1, col) != EMPTY_SQUARE)
            || (row + 1 < dim && self.board.letter(row + 1, col) != EMPTY_SQUARE)
            || (col > 0 && self.board.letter(row, col - 1) != EMPTY_SQUARE)
            || (col + 1 < dim && self.board.letter(row, col + 1) != EMPTY_SQUARE)
    }

    /// Main word of a placement, including existing letters on both
    /// sides, as natural letters.
    fn read_word_through(
        &self,
        m: &Move,
        row: usize,
        col: usize,
        dr: usize,
        dc: usize,
    ) -> Vec<Tile> {
        let len = m.tiles.len();
        // The square's letter with the move virtually applied.
        let letter_at = |r: usize, c: usize| -> Tile {
            if r >= row && c >= col {
                let on_line = if dr == 1 { c == col } else { r == row };
                let offset = (r - row) + (c - col);
                if on_line && offset < len && m.tiles[offset] != PLAYED_THROUGH {
                    return m.tiles[offset];
                }
            }
            self.board.letter(r, c)
        };
        let (mut r, mut c) = (row, col);
        while r >= dr && c >= dc && letter_at(r - dr, c - dc) != EMPTY_SQUARE {
            r -= dr;
            c -= dc;
        }
        let dim = self.board.dim();
        let mut word = Vec::new();
        loop {
            let letter = letter_at(r, c);
            if letter == EMPTY_SQUARE {
                break;
            }
            word.push(unblank(letter));
            r += dr;
            c += dc;
            if r >= dim || c >= dim {
                break;
            }
        }
        word
    }

    /// Perpendicular word formed by placing `tile` at a square.
    fn read_cross_word(&self, row: usize, col: usize, tile: Tile, dr: usize, dc: usize) -> Vec<Tile> {
        // Perpendicular direction.
        let (pr, pc) = (dc, dr);
        let dim = self.board.dim();
        let (mut r, mut c) = (row, col);
        while r >= pr && c >= pc && self.board.letter(r - pr, c - pc) != EMPTY_SQUARE {
            r -= pr;
            c -= pc;
        }
        let mut word = Vec::new();
        loop {
            let letter = if (r, c) == (row, col) {
                tile
            } else {
                self.board.letter(r, c)
            };
            if letter == EMPTY_SQUARE {
                break;
            }
            word.push(unblank(letter));
            r += pr;
            c += pc;
            if r >= dim || c >= dim {
                break;
            }
        }
        word
    }

    fn word_to_string(&self, word: &[Tile]) -> String {
        word.iter().map(|&t| self.ld.char_from_tile(t)).collect()
    }

    /// Apply a move for the player on turn: place or exchange tiles,
    /// update scores and the scoreless-turn count, refill the rack, and
    /// flip the turn. The move is validated first; on error nothing
    /// changes.
    /// ## Errors
    /// Any move-validation error.
    pub fn play_move(&mut self, m: &Move) -> Result<(), Error> {
        self.validate_move(m)?;
        let index = self.on_turn;
        match m.move_type {
            MoveType::Pass => {
                self.consecutive_scoreless += 1;
            }
            MoveType::Exchange => {
                for &tile in m.tiles.iter() {
                    self.players[index].rack.take(rack_tile(tile));
                }
                // Draw replacements before returning the exchanged
                // tiles, so none of them come straight back.
                self.refill_rack(index);
                for &tile in m.tiles.iter() {
                    self.bag.add_tile(tile, index);
                }
                self.consecutive_scoreless += 1;
            }
            MoveType::Place => {
                let placements = self.placements(m);
                for &(_, _, tile) in &placements {
                    self.players[index].rack.take(rack_tile(tile));
                }
                let kwg = Arc::clone(&self.kwg);
                let ld = Arc::clone(&self.ld);
                self.board.place_tiles(&placements, &kwg, &ld);
                self.players[index].score += m.score;
                if m.score > 0 {
                    self.consecutive_scoreless = 0;
                } else {
                    self.consecutive_scoreless += 1;
                }
                self.refill_rack(index);
                if self.players[index].rack.is_empty() && self.bag.is_empty() {
                    // Going out: collect twice the opponent's remaining
                    // tile scores.
                    let opponent_tiles: i32 = self.players[1 - index]
                        .rack
                        .to_tiles()
                        .iter()
                        .map(|&t| self.ld.score(t))
                        .sum();
                    self.players[index].score += 2 * opponent_tiles;
                    self.game_over = true;
                }
            }
        }
        if self.consecutive_scoreless >= MAX_SCORELESS_TURNS {
            self.game_over = true;
        }
        self.on_turn = 1 - self.on_turn;
        Ok(())
    }

    /// Serialize as a CGP position string.
    pub fn to_cgp(&self) -> String {
        let dim = self.board.dim();
        let mut rows = Vec::with_capacity(dim);
        for row in 0..dim {
            let mut out = String::new();
            let mut empty_run = 0;
            for col in 0..dim {
                let letter = self.board.letter(row, col);
                if letter == EMPTY_SQUARE {
                    empty_run += 1;
                } else {
                    if empty_run > 0 {
                        out.push_str(&empty_run.to_string());
                        empty_run = 0;
                    }
                    out.push(self.ld.char_from_tile(letter));
                }
            }
            if empty_run > 0 {
                out.push_str(&empty_run.to_string());
            }
            rows.push(out);
        }
        format!(
            "{} {}/{} {}/{} {}",
            rows.join("/"),
            self.players[0].rack.display(&self.ld),
            self.players[1].rack.display(&self.ld),
            self.players[0].score,
            self.players[1].score,
            self.consecutive_scoreless
        )
    }

    /// Load a CGP position string:
    /// `<board> <rack0>/<rack1> <score0>/<score1> <scoreless> [opts]`.
    /// The player on turn is player 0 by CGP convention.
    /// ## Errors
    /// Any CGP-parse error; the game is left unchanged on failure.
    pub fn set_from_cgp(&mut self, cgp: &str) -> Result<(), Error> {
        let parsed = parse_cgp(cgp, &self.ld, self.board.dim())?;
        let mut game = Game::new(
            self.board.layout().clone(),
            Arc::clone(&self.ld),
            Arc::clone(&self.kwg),
            Arc::clone(&self.klv),
        );
        game.board.set_letters_physical(&parsed.letters);
        let kwg = Arc::clone(&game.kwg);
        let ld = Arc::clone(&game.ld);
        game.board.recompute_all_caches(&kwg, &ld);
        // Remove every visible tile from the bag.
        for &tile in parsed.letters.iter().filter(|&&t| t != EMPTY_SQUARE) {
            if !game.bag.draw_tile(tile, 0) {
                return Err(Error::CgpParseError(format!(
                    "board tile '{}' is not in the bag",
                    game.ld.char_from_tile(tile)
                )));
            }
        }
        for (index, rack) in parsed.racks.iter().enumerate() {
            game.set_rack_from_bag(index, rack)?;
        }
        game.players[0].score = parsed.scores[0];
        game.players[1].score = parsed.scores[1];
        game.consecutive_scoreless = parsed.consecutive_scoreless;
        game.on_turn = 0;
        *self = game;
        Ok(())
    }
}

struct ParsedCgp {
    letters: Vec<Tile>,
    racks: [Vec<Tile>; 2],
    scores: [i32; 2],
    consecutive_scoreless: u32,
}

fn parse_cgp(cgp: &str, ld: &LetterDistribution, dim: usize) -> Result<ParsedCgp, Error> {
    let mut fields = cgp.split_whitespace();
    let board_field = fields
        .next()
        .ok_or_else(|| Error::CgpParseError(String::from("missing board")))?;
    let racks_field = fields
        .next()
        .ok_or_else(|| Error::CgpParseError(String::from("missing racks")))?;
    let scores_field = fields
        .next()
        .ok_or_else(|| Error::CgpParseError(String::from("missing scores")))?;
    let scoreless_field = fields
        .next()
        .ok_or_else(|| Error::CgpParseError(String::from("missing scoreless-turn count")))?;
    // Trailing `[op val; ...]` options are accepted and ignored here;
    // the shell owns their semantics.

    let rows: Vec<&str> = board_field.split('/').collect();
    if rows.len() != dim {
        return Err(Error::InvalidRowCount(rows.len(), dim));
    }
    let mut letters = vec![EMPTY_SQUARE; dim * dim];
    for (row_index, row) in rows.iter().enumerate() {
        let mut col = 0usize;
        let mut digits = String::new();
        for c in row.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            if !digits.is_empty() {
                col += digits.parse::<usize>().map_err(|_| {
                    Error::CgpParseError(format!("bad empty run in row {}", row_index + 1))
                })?;
                digits.clear();
            }
            if col >= dim {
                return Err(Error::InvalidRowLength {
                    row: String::from(*row),
                    len: col + 1,
                    expected: dim,
                });
            }
            letters[row_index * dim + col] = ld.tile_from_board_char(c)?;
            col += 1;
        }
        if !digits.is_empty() {
            col += digits
                .parse::<usize>()
                .map_err(|_| Error::CgpParseError(format!("bad empty run in row {}", row_index + 1)))?;
        }
        if col != dim {
            return Err(Error::InvalidRowLength {
                row: String::from(*row),
                len: col,
                expected: dim,
            });
        }
    }

    let racks: Vec<&str> = racks_field.split('/').collect();
    if racks.len() != 2 {
        return Err(Error::CgpParseError(String::from("expected two racks")));
    }
    let parse_rack = |s: &str| -> Result<Vec<Tile>, Error> {
        if s.len() > RACK_SIZE {
            return Err(Error::RackTooLarge(s.len(), RACK_SIZE));
        }
        ld.tiles_from_str(s)
    };
    let rack0 = parse_rack(racks[0])?;
    let rack1 = parse_rack(racks[1])?;

    let scores: Vec<&str> = scores_field.split('/').collect();
    if scores.len() != 2 {
        return Err(Error::CgpParseError(String::from("expected two scores")));
    }
    let parse_score = |s: &str| -> Result<i32, Error> {
        s.parse()
            .map_err(|_| Error::CgpParseError(format!("bad score \"{}\"", s)))
    };
    let consecutive_scoreless = scoreless_field
        .parse()
        .map_err(|_| Error::CgpParseError(format!("bad scoreless count \"{}\"", scoreless_field)))?;

    Ok(ParsedCgp {
        letters,
        racks: [rack0, rack1],
        scores: [parse_score(scores[0])?, parse_score(scores[1])?],
        consecutive_scoreless,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveTiles;

    fn game_fixture(words: &[&str]) -> Game {
        let ld = Arc::new(LetterDistribution::english());
        let kwg = Arc::new(Kwg::from_words(&ld, words).unwrap());
        let klv = Arc::new(Klv::from_leaves(&ld, &[]).unwrap());
        Game::new(Layout::default(), ld, kwg, klv)
    }

    fn place_move(
        game: &Game,
        word: &str,
        row: u8,
        col: u8,
        dir: Direction,
        score: i32,
    ) -> Move {
        let tiles = game.ld.tiles_from_str(word).unwrap();
        let mut strip = MoveTiles::new();
        strip.extend_from_slice(&tiles);
        Move {
            move_type: MoveType::Place,
            dir,
            row,
            col,
            tiles_played: tiles.len() as u8,
            tiles: strip,
            score,
            equity: crate::equity::Equity::from_int(score),
        }
    }

    fn total_tiles(game: &Game) -> usize {
        game.bag.remaining()
            + game.players[0].rack.total() as usize
            + game.players[1].rack.total() as usize
            + game.board.tiles_on_board()
    }

    #[test]
    fn test_bag_conservation_through_plays() {
        let mut game = game_fixture(&["CARE", "ACE"]);
        game.draw_starting_racks();
        assert_eq!(total_tiles(&game), 100);
        let tiles = game.ld.tiles_from_str("CARE").unwrap();
        game.set_rack_from_bag(0, &tiles).unwrap();
        assert_eq!(total_tiles(&game), 100);
        let m = place_move(&game, "CARE", 7, 7, Direction::Horizontal, 10);
        game.play_move(&m).unwrap();
        assert_eq!(total_tiles(&game), 100);
        assert_eq!(game.on_turn(), 1);
        assert_eq!(game.player(0).score, 10);
        // Rack refilled to seven.
        assert_eq!(game.rack(0).total() as usize, RACK_SIZE);
    }

    #[test]
    fn test_exchange_conserves_and_redraws() {
        let mut game = game_fixture(&["CARE"]);
        game.draw_starting_racks();
        let rack_before = game.rack(0).to_tiles();
        let mut m = Move::exchange(&rack_before[0..3], crate::equity::Equity::ZERO);
        m.equity = crate::equity::Equity::ZERO;
        game.play_move(&m).unwrap();
        assert_eq!(total_tiles(&game), 100);
        assert_eq!(game.rack(0).total() as usize, RACK_SIZE);
        assert_eq!(game.consecutive_scoreless(), 1);
    }

    #[test]
    fn test_exchange_rejected_with_small_bag() {
        let mut game = game_fixture(&["CARE"]);
        game.draw_starting_racks();
        // Drain the bag to fewer than seven tiles.
        while game.bag.remaining() >= RACK_SIZE {
            game.bag.draw_random(0);
        }
        let tiles = game.rack(0).to_tiles();
        let m = Move::exchange(&tiles[0..1], crate::equity::Equity::ZERO);
        assert!(matches!(
            game.play_move(&m),
            Err(Error::InvalidExchange(_))
        ));
    }

    #[test]
    fn test_validate_rejects_phony() {
        let mut game = game_fixture(&["CARE"]);
        game.draw_starting_racks();
        let tiles = game.ld.tiles_from_str("ECARX").unwrap();
        game.set_rack_from_bag(0, &tiles).unwrap();
        let m = place_move(&game, "RACE", 7, 7, Direction::Horizontal, 10);
        assert!(matches!(game.play_move(&m), Err(Error::PhonyWord(_))));
    }

    #[test]
    fn test_validate_rejects_tiles_not_in_rack() {
        let mut game = game_fixture(&["CARE"]);
        game.draw_starting_racks();
        let tiles = game.ld.tiles_from_str("XYZQJWV").unwrap();
        game.set_rack_from_bag(0, &tiles).unwrap();
        let m = place_move(&game, "CARE", 7, 7, Direction::Horizontal, 10);
        assert!(matches!(game.play_move(&m), Err(Error::TileNotInRack(_))));
    }

    #[test]
    fn test_validate_rejects_disconnected() {
        let mut game = game_fixture(&["CARE", "ACE"]);
        game.draw_starting_racks();
        let tiles = game.ld.tiles_from_str("CAREACE").unwrap();
        game.set_rack_from_bag(0, &tiles).unwrap();
        let opening = place_move(&game, "CARE", 7, 7, Direction::Horizontal, 10);
        game.play_move(&opening).unwrap();
        // Opponent tries ACE nowhere near the existing word.
        let tiles = game.ld.tiles_from_str("ACEXYZQ").unwrap();
        game.set_rack_from_bag(1, &tiles).unwrap();
        let floating = place_move(&game, "ACE", 0, 0, Direction::Horizontal, 5);
        assert!(matches!(
            game.play_move(&floating),
            Err(Error::DisconnectedPlacement { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_off_board() {
        let mut game = game_fixture(&["CARE"]);
        game.draw_starting_racks();
        let tiles = game.ld.tiles_from_str("CARE").unwrap();
        game.set_rack_from_bag(0, &tiles).unwrap();
        let m = place_move(&game, "CARE", 7, 13, Direction::Horizontal, 10);
        assert!(matches!(
            game.play_move(&m),
            Err(Error::TilePlacementError { .. })
        ));
    }

    #[test]
    fn test_scoreless_turns_end_game() {
        let mut game = game_fixture(&["CARE"]);
        game.draw_starting_racks();
        for _ in 0..MAX_SCORELESS_TURNS {
            assert!(!game.is_over());
            game.play_move(&Move::pass()).unwrap();
        }
        assert!(game.is_over());
    }

    #[test]
    fn test_cgp_round_trip() {
        let mut game = game_fixture(&["CARE", "ACE", "BE"]);
        game.draw_starting_racks();
        let tiles = game.ld.tiles_from_str("CAREBE?").unwrap();
        game.set_rack_from_bag(0, &tiles).unwrap();
        let m = place_move(&game, "CARE", 7, 7, Direction::Horizontal, 12);
        game.play_move(&m).unwrap();
        let cgp = game.to_cgp();
        let mut reloaded = game_fixture(&["CARE", "ACE", "BE"]);
        reloaded.set_from_cgp(&cgp).unwrap();
        assert_eq!(reloaded.to_cgp(), cgp);
        assert_eq!(reloaded.board().tiles_on_board(), 4);
        assert_eq!(total_tiles(&reloaded), 100);
    }

    #[test]
    fn test_cgp_parses_blanks_and_scores() {
        let mut game = game_fixture(&["CARE"]);
        let board_rows: Vec<String> = (0..15)
            .map(|r| {
                if r == 7 {
                    String::from("7cARE4")
                } else {
                    String::from("15")
                }
            })
            .collect();
        let cgp = format!("{} AB/ 17/-3 2", board_rows.join("/"));
        game.set_from_cgp(&cgp).unwrap();
        assert!(crate::letter_distribution::is_blanked(
            game.board().letter(7, 7)
        ));
        assert_eq!(game.player(0).score, 17);
        assert_eq!(game.player(1).score, -3);
        assert_eq!(game.consecutive_scoreless(), 2);
        assert_eq!(game.rack(0).total(), 2);
        assert_eq!(game.rack(1).total(), 0);
        assert_eq!(total_tiles(&game), 100);
    }

    #[test]
    fn test_cgp_rejects_malformed() {
        let mut game = game_fixture(&["CARE"]);
        assert!(game.set_from_cgp("not a cgp").is_err());
        // Wrong row count.
        assert!(game.set_from_cgp("15/15 / 0/0 0").is_err());
        // Row too long.
        let rows: Vec<String> = (0..15).map(|_| String::from("16")).collect();
        let cgp = format!("{} / 0/0 0", rows.join("/"));
        assert!(game.set_from_cgp(&cgp).is_err());
        // Bad score.
        let rows: Vec<String> = (0..15).map(|_| String::from("15")).collect();
        let cgp = format!("{} / x/0 0", rows.join("/"));
        assert!(game.set_from_cgp(&cgp).is_err());
        // More tiles than the bag holds.
        let rows: Vec<String> = (0..15).map(|_| String::from("15")).collect();
        let cgp = format!("{} ZZZZ/ 0/0 0", rows.join("/"));
        assert!(game.set_from_cgp(&cgp).is_err());
    }

    #[test]
    fn test_generated_moves_all_play_legally() {
        use crate::movegen::{MoveGenArgs, MoveGenerator, RecordMode};
        use crate::moves::{MoveList, SortKey};

        let mut game = game_fixture(&["CARE", "CARES", "ACE", "ES", "AB", "BA"]);
        game.draw_starting_racks();
        let tiles = game.ld.tiles_from_str("CAREABS").unwrap();
        game.set_rack_from_bag(0, &tiles).unwrap();
        let opening = place_move(&game, "CARE", 7, 7, Direction::Horizontal, 12);
        game.play_move(&opening).unwrap();
        let tiles = game.ld.tiles_from_str("ABES").unwrap();
        game.set_rack_from_bag(1, &tiles).unwrap();

        let kwg = Arc::clone(&game.kwg);
        let klv = Arc::clone(&game.klv);
        let ld = Arc::clone(&game.ld);
        let rack = game.rack(1).clone();
        let args = MoveGenArgs {
            kwg: &kwg,
            klv: Some(&klv),
            ld: &ld,
            sort_key: SortKey::Equity,
            record_mode: RecordMode::All,
            bag_remaining: game.bag.remaining(),
            leave_size_for_exchange_cutoff: None,
            opening_adjustment: None,
        };
        let mut gen = MoveGenerator::new(game.board.dim());
        let mut list = MoveList::default();
        gen.generate(&args, &mut game.board, &rack, &mut list)
            .unwrap();
        assert!(list.len() > 2);
        for m in list.iter() {
            let mut probe = game.clone();
            probe
                .play_move(m)
                .unwrap_or_else(|e| panic!("generated move {:?} rejected: {}", m, e));
        }
    }

    #[test]
    fn test_going_out_collects_opponent_tiles() {
        let mut game = game_fixture(&["CARE"]);
        // Empty the bag completely.
        while !game.bag.is_empty() {
            game.bag.draw_random(0);
        }
        // Hand back just enough for the racks.
        for &c in &['C', 'A', 'R', 'E'] {
            let t = game.ld.tile_from_char(c).unwrap();
            game.bag.add_tile(t, 0);
        }
        let q = game.ld.tile_from_char('Q').unwrap();
        game.bag.add_tile(q, 0);
        game.set_rack_from_bag(0, &game.ld.tiles_from_str("CARE").unwrap())
            .unwrap();
        game.set_rack_from_bag(1, &[q]).unwrap();
        let m = place_move(&game, "CARE", 7, 7, Direction::Horizontal, 10);
        game.play_move(&m).unwrap();
        assert!(game.is_over());
        // 10 for the word plus twice the opponent's Q.
        assert_eq!(game.player(0).score, 10 + 20);
    }
}
