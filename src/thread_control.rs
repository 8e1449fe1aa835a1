use crate::prng::Prng;
use std::sync::Mutex;
use std::time::Instant;

/// Scheduling status of the engine's current command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Uninit,
    Started,
    UserInterrupt,
    Finished,
}

/// Process-wide control block shared by the main thread and workers.
///
/// Owns the status flag workers poll for cancellation, the iteration
/// counter, the shared PRNG that worker streams are jumped from, the
/// monotonic command timer, and the single-writer output buffer.
pub struct ThreadControl {
    status: Mutex<ThreadStatus>,
    iter_count: Mutex<u64>,
    output: Mutex<String>,
    prng: Mutex<Prng>,
    seed: Mutex<u64>,
    num_threads: Mutex<usize>,
    timer_start: Mutex<Instant>,
}

impl Default for ThreadControl {
    fn default() -> ThreadControl {
        ThreadControl::new(rand::random())
    }
}

impl ThreadControl {
    pub fn new(seed: u64) -> ThreadControl {
        ThreadControl {
            status: Mutex::new(ThreadStatus::Uninit),
            iter_count: Mutex::new(0),
            output: Mutex::new(String::new()),
            prng: Mutex::new(Prng::new(seed)),
            seed: Mutex::new(seed),
            num_threads: Mutex::new(1),
            timer_start: Mutex::new(Instant::now()),
        }
    }

    pub fn status(&self) -> ThreadStatus {
        *self.status.lock().unwrap()
    }

    pub fn set_status(&self, status: ThreadStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Request cancellation. Safe to call from any thread; only upgrades
    /// a running command, never downgrades a finished one.
    pub fn interrupt(&self) {
        let mut status = self.status.lock().unwrap();
        if *status == ThreadStatus::Started {
            *status = ThreadStatus::UserInterrupt;
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.status() == ThreadStatus::UserInterrupt
    }

    /// Restart for a new command: status, iteration count and timer.
    pub fn reset(&self) {
        *self.status.lock().unwrap() = ThreadStatus::Started;
        *self.iter_count.lock().unwrap() = 0;
        *self.timer_start.lock().unwrap() = Instant::now();
    }

    pub fn increment_iter(&self) -> u64 {
        let mut count = self.iter_count.lock().unwrap();
        *count += 1;
        *count
    }

    pub fn iter_count(&self) -> u64 {
        *self.iter_count.lock().unwrap()
    }

    pub fn seconds_elapsed(&self) -> f64 {
        self.timer_start.lock().unwrap().elapsed().as_secs_f64()
    }

    pub fn num_threads(&self) -> usize {
        *self.num_threads.lock().unwrap()
    }

    pub fn set_num_threads(&self, num_threads: usize) {
        *self.num_threads.lock().unwrap() = num_threads.max(1);
    }

    pub fn seed(&self) -> u64 {
        *self.seed.lock().unwrap()
    }

    pub fn set_seed(&self, seed: u64) {
        *self.seed.lock().unwrap() = seed;
        self.prng.lock().unwrap().seed(seed);
    }

    /// Copy of the shared generator; the shared one is jumped so the
    /// next caller gets a non-overlapping stream.
    pub fn copy_prng_and_jump(&self) -> Prng {
        let mut prng = self.prng.lock().unwrap();
        let copy = prng.clone();
        prng.jump();
        copy
    }

    /// Serialized textual output; everything a command prints goes
    /// through here.
    pub fn print(&self, content: &str) {
        let mut output = self.output.lock().unwrap();
        output.push_str(content);
    }

    pub fn take_output(&self) -> String {
        std::mem::take(&mut *self.output.lock().unwrap())
    }
}
