//! Best-arm identification.
//!
//! Multi-armed arm elimination after "Dealing with Unknown Variances in
//! Best-Arm Identification" (https://arxiv.org/pdf/2210.00974): sample
//! arms adaptively under a sampling rule, stop as soon as the GLR
//! statistic of every challenger clears the threshold, and retire arms
//! proven equivalent to the leader (epigons) along the way.
//!
//! With more than one thread, workers pull sample requests from a
//! bounded queue and push results back; the main thread is the sole
//! updater of the running statistics, so responses may arrive in any
//! order.

pub mod helper;
pub mod peps;
pub mod queue;
pub mod sampling;

pub use helper::BaiThreshold;
pub use sampling::BaiSamplingRule;

use crate::bai::peps::glrt;
use crate::bai::queue::ProdConQueue;
use crate::bai::sampling::SamplingRuleState;
use crate::random_variable::RandomVariables;
use crate::thread_control::{ThreadControl, ThreadStatus};
use crate::Error;

const MINIMUM_VARIANCE: f64 = 1e-10;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaiStatus {
    Threshold,
    SampleLimit,
    TimeLimit,
    UserInterrupt,
    OneArmRemaining,
}

#[derive(Debug, Clone)]
pub struct BaiOptions {
    pub sampling_rule: BaiSamplingRule,
    pub threshold: BaiThreshold,
    pub sample_minimum: u64,
    /// Total-sample budget (per arm under round-robin); `None` is
    /// unlimited.
    pub sample_limit: Option<u64>,
    pub time_limit_seconds: Option<f64>,
    pub num_threads: usize,
    /// Evaluate arm similarity once this many samples have arrived;
    /// `0` disables epigon detection.
    pub epigon_cutoff: u64,
}

impl Default for BaiOptions {
    fn default() -> BaiOptions {
        BaiOptions {
            sampling_rule: BaiSamplingRule::TopTwo,
            threshold: BaiThreshold::Gk16 { delta: 0.05 },
            sample_minimum: 50,
            sample_limit: None,
            time_limit_seconds: None,
            num_threads: 1,
            epigon_cutoff: 0,
        }
    }
}

/// Final per-arm statistics, indexed like the input arms.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArmStats {
    pub samples: u64,
    pub mean: f64,
    pub variance: f64,
    pub is_epigon: bool,
}

#[derive(Debug, Clone)]
pub struct BaiResult {
    /// Index into the input arms.
    pub best_arm: usize,
    pub status: BaiStatus,
    pub total_samples: u64,
    pub total_time: f64,
    pub arm_stats: Vec<ArmStats>,
}

struct Request {
    rvs_index: usize,
}

struct Response {
    rvs_index: usize,
    sample: f64,
}

/// Mutable run state. Arm arrays are indexed by "bai index"; epigons are
/// swapped to the tail and `k` shrinks past them.
struct Bai {
    initial_k: usize,
    k: usize,
    n_received: Vec<u64>,
    n_requested: Vec<u64>,
    s: Vec<f64>,
    s2: Vec<f64>,
    mu: Vec<f64>,
    sigma2: Vec<f64>,
    /// bai index -> original arm index.
    rvs_index: Vec<usize>,
    /// original arm index -> bai index.
    bai_index: Vec<usize>,
    similarity_evaluated: Vec<bool>,
    is_epigon: Vec<bool>,
    total_received: u64,
    total_requested: u64,
    threshold_reached: bool,
    rule_state: Option<SamplingRuleState>,
}

impl Bai {
    fn new(k: usize) -> Bai {
        Bai {
            initial_k: k,
            k,
            n_received: vec![0; k],
            n_requested: vec![0; k],
            s: vec![0.0; k],
            s2: vec![0.0; k],
            mu: vec![0.0; k],
            sigma2: vec![0.0; k],
            rvs_index: (0..k).collect(),
            bai_index: (0..k).collect(),
            similarity_evaluated: vec![false; k],
            is_epigon: vec![false; k],
            total_received: 0,
            total_requested: 0,
            threshold_reached: false,
            rule_state: None,
        }
    }

    fn update(&mut self, bai_index: usize, sample: f64) {
        self.s[bai_index] += sample;
        self.s2[bai_index] += sample * sample;
        self.n_received[bai_index] += 1;
        let n = self.n_received[bai_index] as f64;
        let mean = self.s[bai_index] / n;
        self.mu[bai_index] = mean;
        self.sigma2[bai_index] = (self.s2[bai_index] / n - mean * mean).max(MINIMUM_VARIANCE);
        self.total_received += 1;
    }

    fn receive(&mut self, response: Response) {
        let bai_index = self.bai_index[response.rvs_index];
        if self.is_epigon[bai_index] {
            return;
        }
        self.update(bai_index, response.sample);
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.n_received.swap(i, j);
        self.n_requested.swap(i, j);
        self.s.swap(i, j);
        self.s2.swap(i, j);
        self.mu.swap(i, j);
        self.sigma2.swap(i, j);
        self.similarity_evaluated.swap(i, j);
        self.is_epigon.swap(i, j);
        self.rvs_index.swap(i, j);
        self.bai_index[self.rvs_index[i]] = i;
        self.bai_index[self.rvs_index[j]] = j;
        if let Some(rule_state) = self.rule_state.as_mut() {
            rule_state.swap_indexes(i, j);
        }
    }

    /// Retire arms equivalent to the leader. Returns the leader's new
    /// bai index (0 after an evaluation pass).
    fn mark_epigons(
        &mut self,
        rvs: &dyn RandomVariables,
        epigon_cutoff: u64,
        astar: usize,
    ) -> usize {
        if epigon_cutoff == 0
            || self.total_received < epigon_cutoff
            || self.similarity_evaluated[astar]
        {
            return astar;
        }
        self.swap(astar, 0);
        for i in (1..self.k).rev() {
            if !rvs.mark_as_epigon_if_similar(self.rvs_index[0], self.rvs_index[i]) {
                continue;
            }
            self.is_epigon[i] = true;
            self.swap(i, self.k - 1);
            self.k -= 1;
            if self.k == 1 {
                break;
            }
        }
        self.similarity_evaluated[0] = true;
        0
    }

    fn sample_limit_reached(&self, options: &BaiOptions) -> bool {
        let limit = match options.sample_limit {
            Some(limit) => limit,
            None => return false,
        };
        if options.sampling_rule != BaiSamplingRule::RoundRobin {
            return self.total_requested >= limit;
        }
        self.n_requested[..self.k].iter().all(|&n| n >= limit)
    }

    fn round_robin_complete(&self) -> bool {
        let first = self.n_requested[0];
        self.n_requested[1..self.k].iter().all(|&n| n == first)
    }

    fn stopping_criterion(
        &self,
        threshold: &helper::ThresholdEvaluator,
        zs: &[f64],
        astar: usize,
    ) -> bool {
        for a in 0..self.k {
            if a == astar {
                continue;
            }
            let value = match threshold.value(&self.n_received, astar, a) {
                Some(value) => value,
                None => return false,
            };
            if zs[a] <= value {
                return false;
            }
        }
        true
    }

    fn arm_stats(&self) -> Vec<ArmStats> {
        let mut stats = vec![ArmStats::default(); self.initial_k];
        for bai_index in 0..self.initial_k {
            stats[self.rvs_index[bai_index]] = ArmStats {
                samples: self.n_received[bai_index],
                mean: self.mu[bai_index],
                variance: self.sigma2[bai_index],
                is_epigon: self.is_epigon[bai_index],
            };
        }
        stats
    }
}

fn make_result(
    bai: &Bai,
    status: BaiStatus,
    astar: usize,
    thread_control: &ThreadControl,
) -> BaiResult {
    BaiResult {
        best_arm: bai.rvs_index[astar],
        status,
        total_samples: bai.total_requested,
        total_time: thread_control.seconds_elapsed(),
        arm_stats: bai.arm_stats(),
    }
}

/// Run best-arm identification over `rvs`, drawing sampling-rule
/// randomness from `rng` (a uniform RV on `[0, 1)`).
///
/// Exit conditions are checked each iteration in priority order:
/// sample limit, time limit, user interrupt, one arm remaining, then
/// the statistical threshold.
/// ## Errors
/// If `rvs` has no arms.
pub fn bai(
    options: &BaiOptions,
    rvs: &dyn RandomVariables,
    rng: &dyn RandomVariables,
    thread_control: &ThreadControl,
) -> Result<BaiResult, Error> {
    let k = rvs.num_rvs();
    if k == 0 {
        return Err(Error::NoArms);
    }
    rvs.reset();
    thread_control.reset();

    let mut bai = Bai::new(k);
    let num_threads = options.num_threads.max(1);
    let result = if num_threads > 1 && k > 0 {
        run_multithreaded(options, rvs, rng, thread_control, &mut bai, num_threads)
    } else {
        run_singlethreaded(options, rvs, rng, thread_control, &mut bai)
    };
    if thread_control.status() == ThreadStatus::Started {
        thread_control.set_status(ThreadStatus::Finished);
    }
    Ok(result)
}

fn run_singlethreaded(
    options: &BaiOptions,
    rvs: &dyn RandomVariables,
    rng: &dyn RandomVariables,
    thread_control: &ThreadControl,
    bai: &mut Bai,
) -> BaiResult {
    for arm in 0..bai.initial_k {
        for _ in 0..options.sample_minimum {
            let sample = rvs.sample(arm, 0);
            bai.n_requested[arm] += 1;
            bai.total_requested += 1;
            bai.update(arm, sample);
        }
    }
    bai.rule_state = Some(SamplingRuleState::new(
        options.sampling_rule,
        &bai.n_received,
    ));
    main_loop(options, thread_control, bai, rvs, rng, &mut |bai, next| {
        let sample = rvs.sample(bai.rvs_index[next], 0);
        bai.n_requested[next] += 1;
        bai.total_requested += 1;
        bai.update(next, sample);
    })
}

fn run_multithreaded(
    options: &BaiOptions,
    rvs: &dyn RandomVariables,
    rng: &dyn RandomVariables,
    thread_control: &ThreadControl,
    bai: &mut Bai,
    num_threads: usize,
) -> BaiResult {
    let request_queue = ProdConQueue::<Request>::new(num_threads);
    let response_queue = ProdConQueue::<Response>::new(num_threads);

    std::thread::scope(|scope| {
        for thread_index in 0..num_threads {
            let request_queue = &request_queue;
            let response_queue = &response_queue;
            scope.spawn(move || {
                log::debug!("bai worker {} started", thread_index);
                while let Some(request) = request_queue.consume() {
                    let sample = rvs.sample(request.rvs_index, thread_index);
                    response_queue.produce(Response {
                        rvs_index: request.rvs_index,
                        sample,
                    });
                }
                log::debug!("bai worker {} exiting", thread_index);
            });
        }

        let request = |bai: &mut Bai, arm: usize| {
            request_queue.produce(Request {
                rvs_index: bai.rvs_index[arm],
            });
            bai.n_requested[arm] += 1;
            bai.total_requested += 1;
        };

        // Keep every worker busy: once num_threads requests are in
        // flight, receive and request one-for-one.
        for arm in 0..bai.initial_k {
            for _ in 0..options.sample_minimum {
                if bai.total_requested >= num_threads as u64 {
                    if let Some(response) = response_queue.consume() {
                        bai.receive(response);
                    }
                }
                request(bai, arm);
            }
        }
        let mut to_receive = num_threads as u64;
        if to_receive > bai.total_requested {
            to_receive = bai.total_requested;
        }
        for _ in 0..to_receive {
            if let Some(response) = response_queue.consume() {
                bai.receive(response);
            }
        }
        debug_assert_eq!(bai.total_requested, bai.total_received);

        bai.rule_state = Some(SamplingRuleState::new(
            options.sampling_rule,
            &bai.n_received,
        ));

        // Prime the pipeline so the main loop's receive never starves.
        let warmup_arm = if options.sampling_rule == BaiSamplingRule::RoundRobin {
            None
        } else {
            let mut best = 0;
            for i in 1..bai.initial_k {
                if bai.mu[i] > bai.mu[best] {
                    best = i;
                }
            }
            Some(best)
        };
        for i in 0..num_threads {
            if bai.sample_limit_reached(options) {
                break;
            }
            let arm = warmup_arm.unwrap_or(i % bai.initial_k);
            request(bai, arm);
        }

        let result = main_loop(options, thread_control, bai, rvs, rng, &mut |bai, next| {
            if let Some(response) = response_queue.consume() {
                bai.receive(response);
            }
            request_queue.produce(Request {
                rvs_index: bai.rvs_index[next],
            });
            bai.n_requested[next] += 1;
            bai.total_requested += 1;
        });

        request_queue.close();
        result
        // Workers drain the closed queue and exit; the scope joins them.
    })
}

fn main_loop(
    options: &BaiOptions,
    thread_control: &ThreadControl,
    bai: &mut Bai,
    rvs: &dyn RandomVariables,
    rng: &dyn RandomVariables,
    draw_one: &mut dyn FnMut(&mut Bai, usize),
) -> BaiResult {
    let threshold = options.threshold.evaluator();
    let mut astar = 0;
    loop {
        if bai.sample_limit_reached(options) {
            return make_result(bai, BaiStatus::SampleLimit, astar, thread_control);
        }
        if let Some(limit) = options.time_limit_seconds {
            if thread_control.seconds_elapsed() >= limit {
                return make_result(bai, BaiStatus::TimeLimit, astar, thread_control);
            }
        }
        if thread_control.is_interrupted() {
            return make_result(bai, BaiStatus::UserInterrupt, astar, thread_control);
        }
        if bai.k == 1 {
            return make_result(bai, BaiStatus::OneArmRemaining, astar, thread_control);
        }

        let glrt_results = glrt(bai.k, &bai.n_received, &bai.mu, &bai.sigma2);
        astar = glrt_results.astar;
        let zs = &glrt_results.vals;

        bai.threshold_reached =
            bai.threshold_reached || bai.stopping_criterion(&threshold, zs, astar);
        if bai.threshold_reached
            && (options.sampling_rule != BaiSamplingRule::RoundRobin
                || bai.round_robin_complete())
        {
            return make_result(bai, BaiStatus::Threshold, astar, thread_control);
        }

        let n_for_rule: Vec<u64> = if options.sampling_rule == BaiSamplingRule::RoundRobin {
            bai.n_requested[..bai.k].to_vec()
        } else {
            bai.n_received[..bai.k].to_vec()
        };
        let k_active = bai.k;
        let mut rule_state = bai.rule_state.take().expect("rule state initialized");
        let next = rule_state.next_sample(
            astar,
            glrt_results.aalt,
            &bai.mu,
            &bai.sigma2,
            &n_for_rule,
            zs,
            k_active,
            rng,
        );
        bai.rule_state = Some(rule_state);

        draw_one(bai, next);
        thread_control.increment_iter();
        astar = bai.mark_epigons(rvs, options.epigon_cutoff, astar);
    }
}
