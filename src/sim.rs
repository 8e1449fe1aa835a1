//! The simulator: ranks candidate moves by Monte-Carlo rollouts.
//!
//! Each candidate becomes one best-arm-identification arm whose samples
//! are rollout results: clone the game, play the candidate, then
//! alternate top-equity replies for a fixed number of plies and score
//! the resulting spread. Epigon detection prunes candidates that
//! transpose into the same position.

use crate::bai::{bai, BaiOptions, BaiResult};
use crate::game::Game;
use crate::movegen::{MoveGenArgs, MoveGenerator, RecordMode};
use crate::moves::{Move, MoveList, MoveType, SortKey};
use crate::prng::Prng;
use crate::random_variable::{RandomVariables, UniformRvs};
use crate::thread_control::ThreadControl;
use crate::win_pct::WinPct;
use crate::zobrist::Zobrist;
use crate::Error;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const SIM_ZOBRIST_SEED: u64 = 0x5eed_0b0a_4d;

struct SimWorker {
    rng: Prng,
    gen: MoveGenerator,
    list: MoveList,
}

/// The simmed-plays random-variable family: one arm per candidate move.
pub struct SimmedPlaysRvs {
    base: Game,
    moves: Vec<Move>,
    /// Board hash after each candidate; placements that transpose to
    /// the same board are the same play in disguise.
    hashes: Vec<u64>,
    plies: usize,
    win_pct: Option<Arc<WinPct>>,
    workers: Vec<Mutex<SimWorker>>,
    epigon: Vec<AtomicBool>,
    count: AtomicU64,
}

impl SimmedPlaysRvs {
    pub fn new(
        game: &Game,
        moves: &[Move],
        plies: usize,
        win_pct: Option<Arc<WinPct>>,
        thread_control: &ThreadControl,
        num_threads: usize,
    ) -> SimmedPlaysRvs {
        let dim = game.board().dim();
        let zobrist = Zobrist::new(dim, SIM_ZOBRIST_SEED);
        let hashes = moves
            .iter()
            .map(|m| {
                if m.move_type != MoveType::Place {
                    return 0;
                }
                let mut probe = game.clone();
                // Scores and bag state do not enter the hash.
                probe
                    .play_move(m)
                    .expect("candidate moves are legal for the base position");
                zobrist.hash(probe.board(), 0)
            })
            .collect();
        let workers = (0..num_threads.max(1))
            .map(|_| {
                Mutex::new(SimWorker {
                    rng: thread_control.copy_prng_and_jump(),
                    gen: MoveGenerator::new(dim),
                    list: MoveList::default(),
                })
            })
            .collect();
        SimmedPlaysRvs {
            base: game.clone(),
            moves: moves.to_vec(),
            hashes,
            plies,
            win_pct,
            workers,
            epigon: moves.iter().map(|_| AtomicBool::new(false)).collect(),
            count: AtomicU64::new(0),
        }
    }

    fn rollout(&self, worker: &mut SimWorker, k: usize) -> f64 {
        let mut game = self.base.clone();
        let us = game.on_turn();
        game.bag_mut().seed_for_worker(worker.rng.next(), 0);
        game.bag_mut().shuffle();
        // The opponent's held tiles are unknown; sample a fresh rack.
        game.redraw_rack_at_random(1 - us);
        game.play_move(&self.moves[k])
            .expect("candidate moves are legal for the base position");
        for _ in 0..self.plies {
            if game.is_over() {
                break;
            }
            let reply = best_equity_move(worker, &mut game);
            game.play_move(&reply)
                .expect("generated moves are legal");
        }
        let spread = game.spread(us);
        match &self.win_pct {
            Some(win_pct) => {
                let unseen =
                    game.bag().remaining() + game.rack(1 - us).total() as usize;
                100.0 * win_pct.win_probability(spread, unseen)
            }
            None => spread as f64,
        }
    }
}

/// Top-equity reply for the player on turn (the fixed opponent model).
fn best_equity_move(worker: &mut SimWorker, game: &mut Game) -> Move {
    let kwg = Arc::clone(game.kwg());
    let klv = Arc::clone(game.klv());
    let ld = Arc::clone(game.ld());
    let rack = game.rack(game.on_turn()).clone();
    let args = MoveGenArgs {
        kwg: &kwg,
        klv: Some(&klv),
        ld: &ld,
        sort_key: SortKey::Equity,
        record_mode: RecordMode::Best,
        bag_remaining: game.bag().remaining(),
        leave_size_for_exchange_cutoff: None,
        opening_adjustment: None,
    };
    worker
        .gen
        .generate(&args, game.board_mut(), &rack, &mut worker.list)
        .expect("record-best generation cannot overflow");
    worker
        .list
        .best(SortKey::Equity)
        .cloned()
        .unwrap_or_else(Move::pass)
}

impl RandomVariables for SimmedPlaysRvs {
    fn num_rvs(&self) -> usize {
        self.moves.len()
    }

    fn sample(&self, k: usize, thread_index: usize) -> f64 {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut worker = self.workers[thread_index].lock().unwrap();
        self.rollout(&mut worker, k)
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        for flag in &self.epigon {
            flag.store(false, Ordering::Relaxed);
        }
    }

    fn total_samples(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn mark_as_epigon_if_similar(&self, leader: usize, i: usize) -> bool {
        let similar = self.moves[leader].move_type == MoveType::Place
            && self.moves[i].move_type == MoveType::Place
            && self.hashes[leader] == self.hashes[i];
        if similar {
            self.epigon[i].store(true, Ordering::Relaxed);
        }
        similar
    }

    fn is_epigon(&self, k: usize) -> bool {
        self.epigon[k].load(Ordering::Relaxed)
    }
}

/// Simulation outcome: the winning candidate plus the full BAI report.
#[derive(Debug, Clone)]
pub struct SimResults {
    pub best_move_index: usize,
    pub moves: Vec<Move>,
    pub bai: BaiResult,
}

impl SimResults {
    /// Candidate indices ordered by sampled mean, best first.
    pub fn ranked(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.moves.len()).collect();
        order.sort_by(|&a, &b| {
            self.bai.arm_stats[b]
                .mean
                .partial_cmp(&self.bai.arm_stats[a].mean)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        order
    }
}

/// Rank `moves` from the current position by simulation.
/// ## Errors
/// If the candidate list is empty.
pub fn simulate(
    game: &Game,
    moves: &[Move],
    plies: usize,
    win_pct: Option<Arc<WinPct>>,
    bai_options: &BaiOptions,
    thread_control: &ThreadControl,
) -> Result<SimResults, Error> {
    if moves.is_empty() {
        return Err(Error::NoArms);
    }
    let rvs = SimmedPlaysRvs::new(
        game,
        moves,
        plies,
        win_pct,
        thread_control,
        bai_options.num_threads,
    );
    let rng_seed = thread_control.copy_prng_and_jump().next();
    let rng = UniformRvs::new(1, rng_seed, 1);
    let bai_result = bai(bai_options, &rvs, &rng, thread_control)?;
    Ok(SimResults {
        best_move_index: bai_result.best_arm,
        moves: moves.to_vec(),
        bai: bai_result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bai::{BaiSamplingRule, BaiStatus, BaiThreshold};
    use crate::klv::Klv;
    use crate::kwg::Kwg;
    use crate::layout::Layout;
    use crate::letter_distribution::LetterDistribution;
    use crate::moves::MoveType;

    fn base_game(words: &[&str], rack: &str) -> Game {
        let ld = Arc::new(LetterDistribution::english());
        let kwg = Arc::new(Kwg::from_words(&ld, words).unwrap());
        let klv = Arc::new(Klv::from_leaves(&ld, &[]).unwrap());
        let mut game = Game::new(Layout::default(), ld, kwg, klv);
        game.draw_starting_racks();
        let tiles = game.ld().tiles_from_str(rack).unwrap();
        game.set_rack_from_bag(0, &tiles).unwrap();
        game
    }

    fn candidates(game: &mut Game) -> Vec<Move> {
        let kwg = Arc::clone(game.kwg());
        let klv = Arc::clone(game.klv());
        let ld = Arc::clone(game.ld());
        let rack = game.rack(0).clone();
        let args = MoveGenArgs {
            kwg: &kwg,
            klv: Some(&klv),
            ld: &ld,
            sort_key: SortKey::Equity,
            record_mode: RecordMode::All,
            bag_remaining: game.bag().remaining(),
            leave_size_for_exchange_cutoff: None,
            opening_adjustment: None,
        };
        let mut gen = MoveGenerator::new(game.board().dim());
        let mut list = MoveList::default();
        gen.generate(&args, game.board_mut(), &rack, &mut list)
            .unwrap();
        list.sort(SortKey::Equity);
        list.iter().cloned().collect()
    }

    fn fast_options() -> BaiOptions {
        BaiOptions {
            sampling_rule: BaiSamplingRule::TopTwo,
            threshold: BaiThreshold::Gk16 { delta: 0.05 },
            sample_minimum: 30,
            sample_limit: Some(2_000),
            time_limit_seconds: None,
            num_threads: 1,
            epigon_cutoff: 0,
        }
    }

    #[test]
    fn test_zero_ply_sim_prefers_higher_spread() {
        let mut game = base_game(&["AB", "A"], "AB");
        let moves = candidates(&mut game);
        // Keep the top placement and the pass.
        let mut picked: Vec<Move> = Vec::new();
        picked.push(moves[0].clone());
        picked.push(
            moves
                .iter()
                .find(|m| m.move_type == MoveType::Pass)
                .unwrap()
                .clone(),
        );
        let tc = ThreadControl::new(7);
        let results =
            simulate(&game, &picked, 0, None, &fast_options(), &tc).unwrap();
        // With zero plies the sample is the immediate spread: the
        // placement strictly beats the pass.
        assert_eq!(results.best_move_index, 0);
        assert_eq!(results.bai.status, BaiStatus::Threshold);
        assert!(results.bai.arm_stats[0].mean > results.bai.arm_stats[1].mean);
    }

    #[test]
    fn test_rollout_sim_runs_and_ranks() {
        let mut game = base_game(&["AB", "BA", "ABA"], "AB");
        let moves = candidates(&mut game);
        let picked: Vec<Move> = moves.into_iter().take(3).collect();
        let tc = ThreadControl::new(11);
        let mut options = fast_options();
        options.sample_minimum = 20;
        options.sample_limit = Some(400);
        let results = simulate(&game, &picked, 2, None, &options, &tc).unwrap();
        assert!(results.best_move_index < picked.len());
        for stats in &results.bai.arm_stats {
            assert!(stats.samples >= 20);
        }
        let ranked = results.ranked();
        assert_eq!(ranked.len(), picked.len());
        // The ranking is consistent with the sampled means.
        for pair in ranked.windows(2) {
            assert!(
                results.bai.arm_stats[pair[0]].mean >= results.bai.arm_stats[pair[1]].mean
            );
        }
    }

    #[test]
    fn test_transposed_candidates_marked_epigon() {
        let mut game = base_game(&["AB"], "AB");
        let moves = candidates(&mut game);
        let placement = moves
            .iter()
            .find(|m| m.move_type == MoveType::Place)
            .unwrap()
            .clone();
        let pass = moves
            .iter()
            .find(|m| m.move_type == MoveType::Pass)
            .unwrap()
            .clone();
        // The same placement listed twice transposes to one position.
        let picked = vec![placement.clone(), placement, pass];
        let tc = ThreadControl::new(3);
        let mut options = fast_options();
        options.epigon_cutoff = 80;
        let results = simulate(&game, &picked, 0, None, &options, &tc).unwrap();
        // One of the two duplicates was retired; the pass was not.
        let epigons: Vec<usize> = (0..3)
            .filter(|&i| results.bai.arm_stats[i].is_epigon)
            .collect();
        assert_eq!(epigons.len(), 1);
        assert!(epigons[0] <= 1);
        assert!(results.best_move_index <= 1);
        assert_eq!(results.bai.status, BaiStatus::Threshold);
    }

    #[test]
    fn test_win_pct_bounds_samples() {
        let mut game = base_game(&["AB"], "AB");
        let moves = candidates(&mut game);
        let picked: Vec<Move> = moves.into_iter().take(2).collect();
        let wp = Arc::new(
            WinPct::from_csv("50,1.0\n0,0.5\n-50,0.0\n").unwrap(),
        );
        let tc = ThreadControl::new(5);
        let results = simulate(&game, &picked, 0, Some(wp), &fast_options(), &tc).unwrap();
        for stats in &results.bai.arm_stats {
            assert!(stats.mean >= 0.0 && stats.mean <= 100.0);
        }
    }

    #[test]
    fn test_empty_candidate_list_rejected() {
        let game = base_game(&["AB"], "AB");
        let tc = ThreadControl::new(5);
        assert!(matches!(
            simulate(&game, &[], 1, None, &fast_options(), &tc),
            Err(Error::NoArms)
        ));
    }

    #[test]
    fn test_multithreaded_sim() {
        let mut game = base_game(&["AB", "BA"], "AB");
        let moves = candidates(&mut game);
        let picked: Vec<Move> = moves.into_iter().take(2).collect();
        let tc = ThreadControl::new(13);
        let mut options = fast_options();
        options.num_threads = 2;
        options.sample_minimum = 20;
        options.sample_limit = Some(300);
        let results = simulate(&game, &picked, 1, None, &options, &tc).unwrap();
        assert!(results.best_move_index < picked.len());
    }
}
