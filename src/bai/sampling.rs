//! Sampling rules: which arm to pull next.

use crate::bai::peps::oracle;
use crate::random_variable::RandomVariables;

/// Rule selection, configured per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaiSamplingRule {
    /// Equalize request counts.
    RoundRobin,
    /// Track the oracle proportions with cumulative (C) tracking.
    TrackAndStop,
    /// Sample the leader with probability beta, else the TCI challenger.
    TopTwo,
}

const TOP_TWO_BETA: f64 = 0.5;

/// Per-run rule state. Created after initial sampling (tracking starts
/// from the observed counts) and swapped alongside the arm arrays when
/// epigons are retired.
pub enum SamplingRuleState {
    RoundRobin,
    TrackAndStop { sumw: Vec<f64> },
    TopTwo,
}

impl SamplingRuleState {
    pub fn new(rule: BaiSamplingRule, n: &[u64]) -> SamplingRuleState {
        match rule {
            BaiSamplingRule::RoundRobin => SamplingRuleState::RoundRobin,
            BaiSamplingRule::TrackAndStop => SamplingRuleState::TrackAndStop {
                sumw: n.iter().map(|&c| c as f64).collect(),
            },
            BaiSamplingRule::TopTwo => SamplingRuleState::TopTwo,
        }
    }

    pub fn swap_indexes(&mut self, i: usize, j: usize) {
        if let SamplingRuleState::TrackAndStop { sumw } = self {
            sumw.swap(i, j);
        }
    }

    /// Pick the next arm among the first `k` (active) arms.
    #[allow(clippy::too_many_arguments)]
    pub fn next_sample(
        &mut self,
        astar: usize,
        _aalt: usize,
        mu: &[f64],
        sigma2: &[f64],
        n: &[u64],
        zs: &[f64],
        k: usize,
        rng: &dyn RandomVariables,
    ) -> usize {
        match self {
            SamplingRuleState::RoundRobin => {
                let mut sample = 0;
                for i in 1..k {
                    if n[i] < n[sample] {
                        sample = i;
                    }
                }
                sample
            }
            SamplingRuleState::TrackAndStop { sumw } => {
                let ws = oracle(&mu[..k], &sigma2[..k]);
                let t: u64 = n[..k].iter().sum();
                // Forced exploration of undersampled arms.
                let cutoff = (t as f64).sqrt() - k as f64 / 2.0;
                let undersampled: Vec<usize> =
                    (0..k).filter(|&i| (n[i] as f64) <= cutoff).collect();
                let weights: Vec<f64> = if undersampled.is_empty() {
                    ws
                } else {
                    let share = 1.0 / undersampled.len() as f64;
                    (0..k)
                        .map(|i| {
                            if undersampled.contains(&i) {
                                share
                            } else {
                                0.0
                            }
                        })
                        .collect()
                };
                for i in 0..k {
                    sumw[i] += weights[i];
                }
                let mut min_index = 0;
                for i in 1..k {
                    if n[i] as f64 - sumw[i] < n[min_index] as f64 - sumw[min_index] {
                        min_index = i;
                    }
                }
                min_index
            }
            SamplingRuleState::TopTwo => {
                let u = rng.sample(0, 0);
                if u <= TOP_TWO_BETA {
                    return astar;
                }
                // TCI challenger: smallest Zs + ln(N). The leader's
                // infinite statistic keeps it out.
                let mut challenger = 0;
                let mut best = zs[0] + (n[0] as f64).ln();
                for i in 1..k {
                    let val = zs[i] + (n[i] as f64).ln();
                    if val < best {
                        challenger = i;
                        best = val;
                    }
                }
                challenger
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_variable::UniformPredeterminedRvs;

    #[test]
    fn test_round_robin_picks_least_requested() {
        let rng = UniformPredeterminedRvs::new(1, vec![0.5]);
        let mut rule = SamplingRuleState::new(BaiSamplingRule::RoundRobin, &[3, 1, 2]);
        let pick = rule.next_sample(
            0,
            1,
            &[0.0, 0.0, 0.0],
            &[1.0, 1.0, 1.0],
            &[3, 1, 2],
            &[f64::INFINITY, 1.0, 2.0],
            3,
            &rng,
        );
        assert_eq!(pick, 1);
    }

    #[test]
    fn test_top_two_leader_or_challenger() {
        // First draw 0.4 <= beta picks the leader; second draw 0.9
        // picks the TCI challenger.
        let rng = UniformPredeterminedRvs::new(1, vec![0.4, 0.9]);
        let mut rule = SamplingRuleState::new(BaiSamplingRule::TopTwo, &[50, 50, 50]);
        let zs = [f64::INFINITY, 3.0, 30.0];
        let n = [50u64, 50, 50];
        let mu = [1.0, 0.5, -1.0];
        let sigma2 = [1.0, 1.0, 1.0];
        assert_eq!(rule.next_sample(0, 1, &mu, &sigma2, &n, &zs, 3, &rng), 0);
        assert_eq!(rule.next_sample(0, 1, &mu, &sigma2, &n, &zs, 3, &rng), 1);
    }

    #[test]
    fn test_track_and_stop_prefers_tracked_deficit() {
        let rng = UniformPredeterminedRvs::new(1, vec![0.5]);
        let n = [100u64, 100, 100];
        let mut rule = SamplingRuleState::new(BaiSamplingRule::TrackAndStop, &n);
        let mu = [1.0, 0.9, -5.0];
        let sigma2 = [1.0, 1.0, 1.0];
        let zs = [f64::INFINITY, 1.0, 50.0];
        let pick = rule.next_sample(0, 1, &mu, &sigma2, &n, &zs, 3, &rng);
        // With equal counts the oracle concentrates on the leader and
        // the near challenger; the far arm has no tracking deficit.
        assert_ne!(pick, 2);
    }

    #[test]
    fn test_swap_indexes_moves_tracking_state() {
        let mut rule = SamplingRuleState::new(BaiSamplingRule::TrackAndStop, &[10, 20]);
        rule.swap_indexes(0, 1);
        match rule {
            SamplingRuleState::TrackAndStop { ref sumw } => {
                assert_eq!(sumw, &vec![20.0, 10.0]);
            }
            _ => unreachable!(),
        }
    }
}
