#![deny(clippy::used_underscore_binding,
//    clippy::missing_docs_in_private_items,
//    clippy::unwrap_used,
   clippy::int_plus_one, clippy::string_add_assign,
   clippy::invalid_upcast_comparisons,
//    clippy::cast_possible_wrap, clippy::cast_possible_truncation,
   clippy::mem_forget, clippy::maybe_infinite_iter)]

//! A crossword board-game engine for Rust.
//! <br>
//! This crate generates, scores and simulates moves for Scrabble-family
//! crossword games. The move generator walks a gaddag-style word graph
//! with per-square cross-set pruning, so every emitted play is legal by
//! construction; the simulator ranks candidate plays by Monte-Carlo
//! rollouts under a multi-threaded best-arm-identification procedure
//! that stops as soon as a statistical confidence threshold is met.
//!
//! # How to use `crossword_engine`
//! Load a letter distribution, a lexicon (or build one from a word
//! list), and optionally a leave-value table and win-percentage table,
//! then drive the [`Engine`] with `position`, `gen` and `sim` commands.
//! Compiled lexicon and leave files are decoded once at startup and
//! shared read-only across worker threads.
//!
//! # Basic usage
//! ```
//! use std::sync::Arc;
//! use crossword_engine::{CommandStatus, Engine, Klv, Kwg, Layout, LetterDistribution};
//!
//! let ld = Arc::new(LetterDistribution::english());
//! let kwg = Arc::new(Kwg::from_words(&ld, &["CARE", "RACE", "ACE"]).unwrap());
//! let klv = Arc::new(Klv::from_leaves(&ld, &[]).unwrap());
//! let mut engine = Engine::from_parts(ld, kwg, klv, Layout::default(), None, 42);
//! let empty_rows: Vec<String> = (0..15).map(|_| String::from("15")).collect();
//! engine.run_sync(&format!("position {} ACER/ 0/0 0", empty_rows.join("/")));
//! assert_eq!(engine.run_sync("gen"), CommandStatus::Success);
//! print!("{}", engine.get_output());
//! ```

pub mod bag;
pub mod bai;
pub mod board;
pub mod cross_set;
pub mod engine;
pub mod equity;
mod error;
pub mod game;
pub mod klv;
pub mod kwg;
pub mod layout;
pub mod letter_distribution;
pub mod movegen;
pub mod moves;
pub mod prng;
pub mod rack;
pub mod random_variable;
pub mod sim;
pub mod thread_control;
pub mod transposition_table;
pub mod win_pct;
pub mod zobrist;

pub use crate::bag::Bag;
pub use crate::bai::{
    bai, ArmStats, BaiOptions, BaiResult, BaiSamplingRule, BaiStatus, BaiThreshold,
};
pub use crate::board::Board;
pub use crate::cross_set::CrossSet;
pub use crate::engine::{CommandStatus, Engine, EnginePaths};
pub use crate::equity::{Equity, EQUITY_SCALE};
pub use crate::error::Error;
pub use crate::game::Game;
pub use crate::klv::Klv;
pub use crate::kwg::Kwg;
pub use crate::layout::{Layout, BOARD_DIM};
pub use crate::letter_distribution::{LetterDistribution, Tile, BLANK, BLANKED, PLAYED_THROUGH};
pub use crate::movegen::{MoveGenArgs, MoveGenerator, RecordMode, BINGO_BONUS, PASS_EQUITY};
pub use crate::moves::{Direction, Move, MoveList, MoveType, SmallMove, SortKey};
pub use crate::prng::Prng;
pub use crate::rack::{BitRack, Rack, RACK_SIZE};
pub use crate::random_variable::{
    NormalPredeterminedRvs, NormalRvs, RandomVariables, UniformPredeterminedRvs, UniformRvs,
};
pub use crate::sim::{simulate, SimResults, SimmedPlaysRvs};
pub use crate::thread_control::{ThreadControl, ThreadStatus};
pub use crate::transposition_table::{TranspositionTable, TtEntry, TtFlag};
pub use crate::win_pct::WinPct;
pub use crate::zobrist::Zobrist;
