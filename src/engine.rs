//! The command bridge the shell and WASM layers drive.
//!
//! The engine owns the loaded resources, the current game, the move
//! list and the thread-control block. Commands are one-line strings;
//! output is captured through the thread-control print sink and read
//! back with [`Engine::get_output`].

use crate::bai::BaiOptions;
use crate::game::Game;
use crate::klv::Klv;
use crate::kwg::Kwg;
use crate::layout::Layout;
use crate::letter_distribution::LetterDistribution;
use crate::movegen::{MoveGenArgs, MoveGenerator, RecordMode};
use crate::moves::{Move, MoveList, SortKey};
use crate::sim::simulate;
use crate::thread_control::{ThreadControl, ThreadStatus};
use crate::win_pct::WinPct;
use crate::Error;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Error,
    DidNotRun,
}

/// Resource locations for [`Engine::init`]. Only the lexicon is
/// required; everything else falls back to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct EnginePaths {
    pub lexicon: String,
    pub leaves: Option<String>,
    pub distribution: Option<String>,
    pub layout: Option<String>,
    pub win_pct: Option<String>,
    pub seed: Option<u64>,
}

/// Number of moves a `gen` command prints.
const GEN_PRINT_LIMIT: usize = 15;
const DEFAULT_SIM_PLIES: usize = 2;
/// The `sim` command simulates the head of the sorted move list.
const SIM_MAX_ARMS: usize = 15;
/// Backstop budget: indistinguishable candidates would otherwise keep
/// the threshold out of reach forever.
const SIM_SAMPLE_LIMIT: u64 = 2_000;
const SIM_EPIGON_CUTOFF: u64 = 500;

pub struct Engine {
    game: Game,
    move_list: MoveList,
    gen: MoveGenerator,
    thread_control: Arc<ThreadControl>,
    win_pct: Option<Arc<WinPct>>,
    last_error: Option<String>,
}

impl Engine {
    /// Load every resource and construct the engine state.
    /// ## Errors
    /// Any resource-load error.
    pub fn init(paths: &EnginePaths) -> Result<Engine, Error> {
        let ld = Arc::new(match &paths.distribution {
            Some(path) => LetterDistribution::from_file("custom", path)?,
            None => LetterDistribution::english(),
        });
        let kwg = Arc::new(Kwg::from_file(&paths.lexicon)?);
        let klv = Arc::new(match &paths.leaves {
            Some(path) => Klv::from_file(path)?,
            None => Klv::from_leaves(&ld, &[])?,
        });
        let layout = match &paths.layout {
            Some(path) => Layout::from_file(path)?,
            None => Layout::default(),
        };
        let win_pct = match &paths.win_pct {
            Some(path) => Some(Arc::new(WinPct::from_file(path)?)),
            None => None,
        };
        let seed = paths.seed.unwrap_or_else(rand::random);
        Ok(Engine::from_parts(ld, kwg, klv, layout, win_pct, seed))
    }

    /// Construct from already-loaded resources (tests, embeddings).
    pub fn from_parts(
        ld: Arc<LetterDistribution>,
        kwg: Arc<Kwg>,
        klv: Arc<Klv>,
        layout: Layout,
        win_pct: Option<Arc<WinPct>>,
        seed: u64,
    ) -> Engine {
        let mut game = Game::new(layout, ld, kwg, klv);
        game.draw_starting_racks();
        let dim = game.board().dim();
        Engine {
            game,
            move_list: MoveList::default(),
            gen: MoveGenerator::new(dim),
            thread_control: Arc::new(ThreadControl::new(seed)),
            win_pct,
            last_error: None,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn move_list(&self) -> &MoveList {
        &self.move_list
    }

    /// Shared control block; `stop()` on a clone interrupts a running
    /// command from another thread.
    pub fn thread_control(&self) -> Arc<ThreadControl> {
        Arc::clone(&self.thread_control)
    }

    pub fn thread_status(&self) -> ThreadStatus {
        self.thread_control.status()
    }

    /// Request interruption of the running command.
    pub fn stop(&self) {
        self.thread_control.interrupt();
    }

    /// Captured output of the last command.
    pub fn get_output(&mut self) -> String {
        self.thread_control.take_output()
    }

    /// Last command's error message, consumed on read.
    pub fn get_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Run one command to completion.
    pub fn run_sync(&mut self, command: &str) -> CommandStatus {
        if self.thread_control.status() == ThreadStatus::Started {
            return CommandStatus::DidNotRun;
        }
        match self.execute(command) {
            Ok(()) => CommandStatus::Success,
            Err(error) => {
                self.last_error = Some(error.to_string());
                CommandStatus::Error
            }
        }
    }

    fn execute(&mut self, command: &str) -> Result<(), Error> {
        let mut tokens = command.split_whitespace();
        let verb = tokens.next().unwrap_or("");
        let rest: Vec<&str> = tokens.collect();
        match verb {
            "position" => self.game.set_from_cgp(command.trim_start_matches("position").trim()),
            "gen" => self.cmd_gen(&rest),
            "sim" => self.cmd_sim(&rest),
            "seed" => {
                let seed = rest
                    .first()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::UnknownCommand(String::from(command)))?;
                self.thread_control.set_seed(seed);
                Ok(())
            }
            "threads" => {
                let threads = rest
                    .first()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::UnknownCommand(String::from(command)))?;
                self.thread_control.set_num_threads(threads);
                Ok(())
            }
            _ => Err(Error::UnknownCommand(String::from(command))),
        }
    }

    /// `gen [all|best]` — generate moves for the player on turn,
    /// equity-sorted, and print the head of the list.
    fn cmd_gen(&mut self, rest: &[&str]) -> Result<(), Error> {
        let record_mode = match rest.first() {
            Some(&"best") => RecordMode::Best,
            Some(&"all") | None => RecordMode::All,
            Some(other) => return Err(Error::UnknownCommand(format!("gen {}", other))),
        };
        let kwg = Arc::clone(self.game.kwg());
        let klv = Arc::clone(self.game.klv());
        let ld = Arc::clone(self.game.ld());
        let rack = self.game.rack(self.game.on_turn()).clone();
        rack.validate(&ld)?;
        let args = MoveGenArgs {
            kwg: &kwg,
            klv: Some(&klv),
            ld: &ld,
            sort_key: SortKey::Equity,
            record_mode,
            bag_remaining: self.game.bag().remaining(),
            leave_size_for_exchange_cutoff: None,
            opening_adjustment: None,
        };
        // Generate into a fresh list so a failure leaves the previous
        // list intact.
        let mut list = MoveList::default();
        self.gen
            .generate(&args, self.game.board_mut(), &rack, &mut list)?;
        list.sort(SortKey::Equity);
        self.move_list = list;
        for m in self.move_list.iter().take(GEN_PRINT_LIMIT) {
            self.thread_control.print(&format!(
                "{} {}\n",
                m.display(&ld),
                m.equity
            ));
        }
        Ok(())
    }

    /// `sim [plies]` — rank the generated move list by simulation.
    fn cmd_sim(&mut self, rest: &[&str]) -> Result<(), Error> {
        if self.move_list.is_empty() {
            return Err(Error::NoArms);
        }
        let plies = match rest.first() {
            Some(s) => s
                .parse()
                .map_err(|_| Error::UnknownCommand(format!("sim {}", s)))?,
            None => DEFAULT_SIM_PLIES,
        };
        let bai_options = BaiOptions {
            num_threads: self.thread_control.num_threads(),
            sample_limit: Some(SIM_SAMPLE_LIMIT),
            epigon_cutoff: SIM_EPIGON_CUTOFF,
            ..BaiOptions::default()
        };
        let moves: Vec<Move> = self.move_list.iter().take(SIM_MAX_ARMS).cloned().collect();
        let results = simulate(
            &self.game,
            &moves,
            plies,
            self.win_pct.clone(),
            &bai_options,
            &self.thread_control,
        )?;
        let ld = Arc::clone(self.game.ld());
        self.thread_control.print(&format!(
            "best: {} ({:?}, {} samples, {:.2}s)\n",
            results.moves[results.best_move_index].display(&ld),
            results.bai.status,
            results.bai.total_samples,
            results.bai.total_time,
        ));
        for &index in results.ranked().iter().take(GEN_PRINT_LIMIT) {
            let stats = &results.bai.arm_stats[index];
            self.thread_control.print(&format!(
                "{} mean {:.2} var {:.2} n {}{}\n",
                results.moves[index].display(&ld),
                stats.mean,
                stats.variance,
                stats.samples,
                if stats.is_epigon { " (epigon)" } else { "" },
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_fixture(words: &[&str]) -> Engine {
        let ld = Arc::new(LetterDistribution::english());
        let kwg = Arc::new(Kwg::from_words(&ld, words).unwrap());
        let klv = Arc::new(Klv::from_leaves(&ld, &[]).unwrap());
        Engine::from_parts(ld, kwg, klv, Layout::default(), None, 42)
    }

    fn empty_board_cgp(rack0: &str) -> String {
        let rows: Vec<String> = (0..15).map(|_| String::from("15")).collect();
        format!("{} {}/ 0/0 0", rows.join("/"), rack0)
    }

    #[test]
    fn test_gen_command() {
        let mut engine = engine_fixture(&["AB"]);
        assert_eq!(
            engine.run_sync(&format!("position {}", empty_board_cgp("AB"))),
            CommandStatus::Success
        );
        assert_eq!(engine.run_sync("gen"), CommandStatus::Success);
        let output = engine.get_output();
        assert!(output.contains("8G AB 8"), "output: {}", output);
        assert!(engine.move_list().len() >= 2);
        assert_eq!(engine.thread_status(), ThreadStatus::Uninit);
    }

    #[test]
    fn test_gen_best_keeps_one() {
        let mut engine = engine_fixture(&["AB"]);
        engine.run_sync(&format!("position {}", empty_board_cgp("AB")));
        assert_eq!(engine.run_sync("gen best"), CommandStatus::Success);
        assert_eq!(engine.move_list().len(), 1);
    }

    #[test]
    fn test_sim_command() {
        let mut engine = engine_fixture(&["AB"]);
        engine.run_sync(&format!("position {}", empty_board_cgp("AB")));
        engine.run_sync("gen");
        engine.get_output();
        assert_eq!(engine.run_sync("sim 0"), CommandStatus::Success);
        let output = engine.get_output();
        assert!(output.starts_with("best:"), "output: {}", output);
        assert_eq!(engine.thread_status(), ThreadStatus::Finished);
    }

    #[test]
    fn test_sim_without_gen_fails() {
        let mut engine = engine_fixture(&["AB"]);
        assert_eq!(engine.run_sync("sim 1"), CommandStatus::Error);
        let error = engine.get_error().unwrap();
        assert!(error.contains("empty move list"), "error: {}", error);
        // Errors are consumed on read.
        assert!(engine.get_error().is_none());
    }

    #[test]
    fn test_unknown_command() {
        let mut engine = engine_fixture(&["AB"]);
        assert_eq!(engine.run_sync("frobnicate"), CommandStatus::Error);
        assert!(engine.get_error().unwrap().contains("frobnicate"));
    }

    #[test]
    fn test_failed_position_preserves_state(){
        let mut engine = engine_fixture(&["AB"]);
        engine.run_sync(&format!("position {}", empty_board_cgp("AB")));
        engine.run_sync("gen");
        let moves_before = engine.move_list().len();
        assert_eq!(engine.run_sync("position garbage"), CommandStatus::Error);
        assert!(engine.get_error().is_some());
        // Neither the game nor the move list changed.
        assert_eq!(engine.move_list().len(), moves_before);
        assert_eq!(engine.game().rack(0).total(), 2);
    }

    #[test]
    fn test_seed_and_threads_commands() {
        let mut engine = engine_fixture(&["AB"]);
        assert_eq!(engine.run_sync("seed 99"), CommandStatus::Success);
        assert_eq!(engine.thread_control().seed(), 99);
        assert_eq!(engine.run_sync("threads 4"), CommandStatus::Success);
        assert_eq!(engine.thread_control().num_threads(), 4);
        assert_eq!(engine.run_sync("threads x"), CommandStatus::Error);
    }

    #[test]
    fn test_stop_is_safe_anytime() {
        let engine = engine_fixture(&["AB"]);
        engine.stop();
        assert_eq!(engine.thread_status(), ThreadStatus::Uninit);
    }

    #[test]
    fn test_sim_deterministic_under_seed() {
        let mut outputs = Vec::new();
        for _ in 0..2 {
            let mut engine = engine_fixture(&["AB"]);
            engine.run_sync("seed 1234");
            engine.run_sync(&format!("position {}", empty_board_cgp("AB")));
            engine.run_sync("gen");
            engine.get_output();
            assert_eq!(engine.run_sync("sim 1"), CommandStatus::Success);
            let output = engine.get_output();
            // The header line carries wall-clock time; compare the
            // ranked arm lines only.
            let ranked: Vec<String> = output.lines().skip(1).map(String::from).collect();
            outputs.push(ranked);
        }
        assert_eq!(outputs[0], outputs[1]);
    }
}
