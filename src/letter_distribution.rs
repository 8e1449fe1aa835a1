use crate::Error;
use std::fmt;
use std::fs::read_to_string;

/// A tile on a rack, in the bag, or on the board.
///
/// `0` is the blank; `1..size` are the letters of the alphabet. A blank
/// that has been designated as a letter carries the [`BLANKED`] flag bit.
pub type Tile = u8;

/// The undesignated blank.
pub const BLANK: Tile = 0;

/// Flag bit marking a blank designated as a letter.
pub const BLANKED: Tile = 0x80;

/// Marker in a move's tile sequence for a square whose letter was already
/// on the board. Shares the value of [`BLANK`]: an undesignated blank can
/// never appear in a placement sequence.
pub const PLAYED_THROUGH: Tile = 0;

/// Largest supported alphabet (6-bit tile values plus the blanked flag).
pub const MAX_ALPHABET: usize = 63;

#[inline(always)]
pub fn is_blanked(tile: Tile) -> bool {
    tile & BLANKED != 0
}

#[inline(always)]
pub fn to_blanked(tile: Tile) -> Tile {
    tile | BLANKED
}

/// Strip a blank designation, returning the natural letter value.
#[inline(always)]
pub fn unblank(tile: Tile) -> Tile {
    tile & !BLANKED
}

/// The tile consumed from rack or bag for a (possibly blanked) played tile.
#[inline(always)]
pub fn rack_tile(tile: Tile) -> Tile {
    if is_blanked(tile) {
        BLANK
    } else {
        tile
    }
}

/// The tile alphabet of a game: per-tile glyphs, bag counts and scores.
///
/// Read-only after load. Shared by reference between the board, the move
/// generator and the simulator.
#[derive(Debug, Clone)]
pub struct LetterDistribution {
    name: String,
    glyphs: Vec<char>,
    counts: Vec<u8>,
    scores: Vec<i32>,
    total_tiles: u16,
}

impl fmt::Display for LetterDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<LetterDistribution {}: {} tiles, {} kinds>",
            self.name,
            self.total_tiles,
            self.glyphs.len()
        )
    }
}

/// The standard English distribution: 100 tiles, 2 blanks.
const ENGLISH_ROWS: &[(char, u8, i32)] = &[
    ('?', 2, 0),
    ('A', 9, 1),
    ('B', 2, 3),
    ('C', 2, 3),
    ('D', 4, 2),
    ('E', 12, 1),
    ('F', 2, 4),
    ('G', 3, 2),
    ('H', 2, 4),
    ('I', 9, 1),
    ('J', 1, 8),
    ('K', 1, 5),
    ('L', 4, 1),
    ('M', 2, 3),
    ('N', 6, 1),
    ('O', 8, 1),
    ('P', 2, 3),
    ('Q', 1, 10),
    ('R', 6, 1),
    ('S', 4, 1),
    ('T', 6, 1),
    ('U', 4, 1),
    ('V', 2, 4),
    ('W', 2, 4),
    ('X', 1, 8),
    ('Y', 2, 4),
    ('Z', 1, 10),
];

impl LetterDistribution {
    fn from_rows(name: &str, rows: &[(char, u8, i32)]) -> Result<LetterDistribution, Error> {
        if rows.len() > MAX_ALPHABET {
            return Err(Error::AlphabetTooLarge(rows.len(), MAX_ALPHABET));
        }
        let mut glyphs = Vec::with_capacity(rows.len());
        let mut counts = Vec::with_capacity(rows.len());
        let mut scores = Vec::with_capacity(rows.len());
        let mut total_tiles: u16 = 0;
        for &(glyph, count, score) in rows {
            glyphs.push(glyph);
            counts.push(count);
            scores.push(score);
            total_tiles += count as u16;
        }
        Ok(LetterDistribution {
            name: String::from(name),
            glyphs,
            counts,
            scores,
            total_tiles,
        })
    }

    pub fn english() -> LetterDistribution {
        // The built-in table is always within bounds.
        LetterDistribution::from_rows("english", ENGLISH_ROWS).unwrap()
    }

    /// Parse a distribution from CSV rows of `glyph,count,score`.
    /// The blank row uses the reserved glyph `?` and must come first.
    /// ## Errors
    /// If a row does not parse or the alphabet is too large.
    pub fn from_csv(name: &str, csv: &str) -> Result<LetterDistribution, Error> {
        let mut rows = Vec::new();
        for line in csv.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let parsed = match fields.as_slice() {
                [glyph, count, score] if glyph.chars().count() == 1 => {
                    let glyph = glyph.chars().next().unwrap();
                    match (count.parse::<u8>(), score.parse::<i32>()) {
                        (Ok(count), Ok(score)) => Some((glyph, count, score)),
                        _ => None,
                    }
                }
                _ => None,
            };
            match parsed {
                Some(row) => rows.push(row),
                None => return Err(Error::DistributionParseError(String::from(line))),
            }
        }
        if rows.is_empty() || rows[0].0 != '?' {
            return Err(Error::DistributionParseError(String::from(
                "first row must be the blank ('?')",
            )));
        }
        LetterDistribution::from_rows(name, &rows)
    }

    /// Read a distribution from a CSV file.
    /// ## Errors
    /// If the file cannot be read or parsed.
    pub fn from_file(name: &str, path: &str) -> Result<LetterDistribution, Error> {
        let csv = read_to_string(path).map_err(|source| Error::ReadError {
            path: String::from(path),
            source,
        })?;
        log::info!("loaded letter distribution {} from {}", name, path);
        LetterDistribution::from_csv(name, &csv)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct tile kinds, blank included.
    pub fn size(&self) -> usize {
        self.glyphs.len()
    }

    /// Tiles of kind `tile` in a fresh bag.
    pub fn count(&self, tile: Tile) -> u8 {
        self.counts[tile as usize]
    }

    /// Total tiles in a fresh bag.
    pub fn total_tiles(&self) -> u16 {
        self.total_tiles
    }

    /// Points per placement. A blanked tile scores zero.
    pub fn score(&self, tile: Tile) -> i32 {
        if is_blanked(tile) {
            0
        } else {
            self.scores[tile as usize]
        }
    }

    /// Natural tile for an alphabet glyph. Uppercase and lowercase both
    /// resolve to the natural value; the case decides blanking at the
    /// call sites that care (see [`tile_from_board_char`]).
    ///
    /// [`tile_from_board_char`]: LetterDistribution::tile_from_board_char
    pub fn tile_from_char(&self, c: char) -> Result<Tile, Error> {
        let upper = c.to_ascii_uppercase();
        self.glyphs
            .iter()
            .position(|&g| g == upper)
            .map(|i| i as Tile)
            .ok_or_else(|| Error::UnknownGlyph(c.to_string()))
    }

    /// Tile for a board/CGP character: uppercase is a natural tile,
    /// lowercase a blank designated as that letter.
    pub fn tile_from_board_char(&self, c: char) -> Result<Tile, Error> {
        let tile = self.tile_from_char(c)?;
        if tile == BLANK {
            return Ok(BLANK);
        }
        if c.is_lowercase() {
            Ok(to_blanked(tile))
        } else {
            Ok(tile)
        }
    }

    /// Board/CGP character for a tile: natural tiles uppercase, blanked
    /// designations lowercase, the undesignated blank as `?`.
    pub fn char_from_tile(&self, tile: Tile) -> char {
        if is_blanked(tile) {
            self.glyphs[unblank(tile) as usize].to_ascii_lowercase()
        } else {
            self.glyphs[tile as usize]
        }
    }

    /// Parse a rack string such as `"AABDELT"` or `"DEGORV?"`.
    pub fn tiles_from_str(&self, s: &str) -> Result<Vec<Tile>, Error> {
        s.chars().map(|c| self.tile_from_char(c)).collect()
    }
}
