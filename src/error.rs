use thiserror::Error;

#[derive(Error, Debug)]
/// Errors that can be returned
pub enum Error {
    /// Error reading a data file (lexicon, leaves, layout, distribution, win percentages)
    #[error("Data file \"{path}\" could not be read")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// A lexicon or leave blob was shorter than its header claims
    #[error("Data file \"{path}\" is truncated: expected {expected} bytes, got {got}")]
    TruncatedData {
        path: String,
        expected: usize,
        got: usize,
    },

    /// Error parsing a letter distribution row
    #[error("Invalid letter distribution row: \"{0}\"")]
    DistributionParseError(String),

    /// The alphabet is too large for the packed encodings
    #[error("Alphabet size {0} exceeds the supported maximum {1}")]
    AlphabetTooLarge(usize, usize),

    /// A glyph that is not part of the letter distribution
    #[error("Unknown tile glyph '{0}'")]
    UnknownGlyph(String),

    /// Error parsing a board layout cell
    #[error("Invalid layout bonus square: '{0}'")]
    LayoutParseError(char),

    /// Error parsing the win-percentage table
    #[error("Invalid win-percentage table: {0}")]
    WinPctParseError(String),

    /// Board state or layout has the wrong number of rows
    #[error("Invalid number of rows {0} (expect {1})")]
    InvalidRowCount(usize, usize),

    /// A board or layout row has the wrong number of squares
    #[error("Invalid row \"{row}\": {len} squares (expect {expected})")]
    InvalidRowLength {
        row: String,
        len: usize,
        expected: usize,
    },

    /// A CGP position string is missing fields or has malformed fields
    #[error("Invalid CGP string: {0}")]
    CgpParseError(String),

    /// A rack holds more tiles of a kind than the distribution defines
    #[error("Rack has {count} of tile {tile}, distribution only has {max}")]
    RackOverflow { tile: u8, count: u8, max: u8 },

    /// A rack holds more tiles than fit on a rack
    #[error("Rack size {0} exceeds {1}")]
    RackTooLarge(usize, usize),

    /// Attempt to place tiles outside the board
    #[error("Playing {len} tiles at row {row}, col {col} does not fit")]
    TilePlacementError { row: usize, col: usize, len: usize },

    /// Attempt to place a tile on an occupied square
    #[error("Attempt to place over a tile at row {row}, col {col}")]
    TileReplaceError { row: usize, col: usize },

    /// A placement that touches no existing tile (and is not the opening play through center)
    #[error("Placement at row {row}, col {col} is disconnected")]
    DisconnectedPlacement { row: usize, col: usize },

    /// A move plays tiles that are not on the rack
    #[error("Move plays tile {0} which is not on the rack")]
    TileNotInRack(u8),

    /// A formed word is not in the lexicon
    #[error("\"{0}\" is not a word")]
    PhonyWord(String),

    /// An exchange while the bag is too small, or of letters not in the rack
    #[error("Invalid exchange: {0}")]
    InvalidExchange(String),

    /// The move list cannot hold another move
    #[error("Move list capacity {0} exceeded")]
    MoveListOverflow(usize),

    /// Best-arm identification needs at least one arm
    #[error("Cannot run best-arm identification on an empty move list")]
    NoArms,

    /// An engine command that the core does not understand
    #[error("Unknown command: \"{0}\"")]
    UnknownCommand(String),
}
