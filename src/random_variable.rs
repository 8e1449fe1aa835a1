use crate::prng::Prng;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A family of arms that can be sampled by index.
///
/// Samplers are shared across worker threads; per-thread generator state
/// lives in slots indexed by `thread_index`, so concurrent samples on
/// different threads never contend on one generator.
pub trait RandomVariables: Send + Sync {
    /// Number of arms.
    fn num_rvs(&self) -> usize;

    /// Draw one sample of arm `k` on the given worker thread.
    fn sample(&self, k: usize, thread_index: usize) -> f64;

    /// Forget per-run state before a fresh run.
    fn reset(&self);

    /// Total samples drawn since creation or reset.
    fn total_samples(&self) -> u64;

    /// Mark `i` as an epigon of `leader` if the two arms are equivalent
    /// under the family's similarity notion. Families without one never
    /// mark anything.
    fn mark_as_epigon_if_similar(&self, _leader: usize, _i: usize) -> bool {
        false
    }

    fn is_epigon(&self, _k: usize) -> bool {
        false
    }
}

fn worker_prngs(seed: u64, num_threads: usize) -> Vec<Mutex<Prng>> {
    let base = Prng::new(seed);
    (0..num_threads.max(1))
        .map(|i| Mutex::new(base.for_worker(i)))
        .collect()
}

/// `U(0, 1)` arms.
pub struct UniformRvs {
    num_rvs: usize,
    prngs: Vec<Mutex<Prng>>,
    count: AtomicU64,
}

impl UniformRvs {
    pub fn new(num_rvs: usize, seed: u64, num_threads: usize) -> UniformRvs {
        UniformRvs {
            num_rvs,
            prngs: worker_prngs(seed, num_threads),
            count: AtomicU64::new(0),
        }
    }
}

impl RandomVariables for UniformRvs {
    fn num_rvs(&self) -> usize {
        self.num_rvs
    }

    fn sample(&self, _k: usize, thread_index: usize) -> f64 {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.prngs[thread_index].lock().unwrap().uniform()
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    fn total_samples(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Replays a caller-supplied sequence; deterministic tests drive the
/// sampling rules with this.
pub struct UniformPredeterminedRvs {
    num_rvs: usize,
    samples: Vec<f64>,
    index: AtomicUsize,
}

impl UniformPredeterminedRvs {
    pub fn new(num_rvs: usize, samples: Vec<f64>) -> UniformPredeterminedRvs {
        UniformPredeterminedRvs {
            num_rvs,
            samples,
            index: AtomicUsize::new(0),
        }
    }
}

impl RandomVariables for UniformPredeterminedRvs {
    fn num_rvs(&self) -> usize {
        self.num_rvs
    }

    fn sample(&self, _k: usize, _thread_index: usize) -> f64 {
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        self.samples[i % self.samples.len()]
    }

    fn reset(&self) {
        self.index.store(0, Ordering::Relaxed);
    }

    fn total_samples(&self) -> u64 {
        self.index.load(Ordering::Relaxed) as u64
    }
}

/// Draw a standard normal via Box-Muller from two uniforms.
pub fn box_muller(prng: &mut Prng) -> f64 {
    // Shift into (0, 1] so the log never sees zero.
    let u1 = 1.0 - prng.uniform();
    let u2 = prng.uniform();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Independent `N(mean, var)` arms.
pub struct NormalRvs {
    means_and_vars: Vec<(f64, f64)>,
    prngs: Vec<Mutex<Prng>>,
    count: AtomicU64,
}

impl NormalRvs {
    /// One `(mean, variance)` pair per arm.
    pub fn new(means_and_vars: Vec<(f64, f64)>, seed: u64, num_threads: usize) -> NormalRvs {
        NormalRvs {
            means_and_vars,
            prngs: worker_prngs(seed, num_threads),
            count: AtomicU64::new(0),
        }
    }
}

impl RandomVariables for NormalRvs {
    fn num_rvs(&self) -> usize {
        self.means_and_vars.len()
    }

    fn sample(&self, k: usize, thread_index: usize) -> f64 {
        self.count.fetch_add(1, Ordering::Relaxed);
        let (mean, var) = self.means_and_vars[k];
        let z = box_muller(&mut self.prngs[thread_index].lock().unwrap());
        mean + var.sqrt() * z
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    fn total_samples(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// `mean + sqrt(var) * z[i]` over a replayed `z` sequence.
pub struct NormalPredeterminedRvs {
    means_and_vars: Vec<(f64, f64)>,
    zs: Vec<f64>,
    index: AtomicUsize,
}

impl NormalPredeterminedRvs {
    pub fn new(means_and_vars: Vec<(f64, f64)>, zs: Vec<f64>) -> NormalPredeterminedRvs {
        NormalPredeterminedRvs {
            means_and_vars,
            zs,
            index: AtomicUsize::new(0),
        }
    }
}

impl RandomVariables for NormalPredeterminedRvs {
    fn num_rvs(&self) -> usize {
        self.means_and_vars.len()
    }

    fn sample(&self, k: usize, _thread_index: usize) -> f64 {
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        let (mean, var) = self.means_and_vars[k];
        mean + var.sqrt() * self.zs[i % self.zs.len()]
    }

    fn reset(&self) {
        self.index.store(0, Ordering::Relaxed);
    }

    fn total_samples(&self) -> u64 {
        self.index.load(Ordering::Relaxed) as u64
    }
}
