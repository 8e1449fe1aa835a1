//! Generalized likelihood ratio computations and the sampling-proportion
//! oracle, after "Dealing with Unknown Variances in Best-Arm
//! Identification" (https://arxiv.org/pdf/2210.00974).

const BAI_EPSILON: f64 = 1e-10;
const BINARY_SEARCH_MAX_ITER: usize = 100;

/// Gaussian divergence `0.5 (mu - lambda)^2 / sigma^2`.
pub fn bai_d(mu: f64, sigma2: f64, lambda: f64) -> f64 {
    let diff = mu - lambda;
    0.5 * (diff * diff) / sigma2
}

/// Weighted alternative mean between the leader and a challenger.
pub fn alt_lambda(mu1: f64, sigma21: f64, w1: f64, mua: f64, sigma2a: f64, wa: f64) -> f64 {
    if w1 == 0.0 {
        return mua;
    }
    if wa == 0.0 || mu1 == mua {
        return mu1;
    }
    let x = wa / w1;
    (sigma2a * mu1 + x * sigma21 * mua) / (sigma2a + x * sigma21)
}

/// Monotone scalar root search on `[lo, hi]`.
pub fn binary_search<F: Fn(f64) -> f64>(f: F, mut lo: f64, mut hi: f64, epsilon: f64) -> f64 {
    let flo = f(lo);
    let fhi = f(hi);
    if flo > 0.0 {
        return lo;
    }
    if fhi < 0.0 {
        return hi;
    }
    for _ in 0..BINARY_SEARCH_MAX_ITER {
        let mid = (lo + hi) / 2.0;
        if mid == lo || mid == hi {
            return mid;
        }
        let fmid = f(mid);
        if fmid < -epsilon {
            lo = mid;
        } else if fmid > epsilon {
            hi = mid;
        } else {
            return mid;
        }
    }
    (lo + hi) / 2.0
}

/// Per-iteration GLR output: the statistic for every arm, the least
/// distinguishable challenger and the empirical best arm.
#[derive(Debug, Clone)]
pub struct GlrtResults {
    pub vals: Vec<f64>,
    pub thetas: Vec<f64>,
    pub aalt: usize,
    pub astar: usize,
}

/// Compute the GLR statistic `Zs[a]` of every challenger against the
/// empirical best arm, weighted by the sample counts `w`.
pub fn glrt(k: usize, w: &[u64], mu: &[f64], sigma2: &[f64]) -> GlrtResults {
    debug_assert!(k >= 2);
    let mut astar = 0;
    for i in 1..k {
        if mu[i] > mu[astar] {
            astar = i;
        }
    }
    let mut vals = vec![f64::INFINITY; k];
    let mut thetas = vec![0.0; k];
    for a in 0..k {
        if a == astar {
            continue;
        }
        let theta = alt_lambda(
            mu[astar],
            sigma2[astar],
            w[astar] as f64,
            mu[a],
            sigma2[a],
            w[a] as f64,
        );
        thetas[a] = theta;
        let d_astar = bai_d(mu[astar], sigma2[astar], theta);
        let d_a = bai_d(mu[a], sigma2[a], theta);
        vals[a] = w[astar] as f64 * d_astar + w[a] as f64 * d_a;
    }
    let mut aalt = 0;
    for i in 1..k {
        if vals[i] < vals[aalt] {
            aalt = i;
        }
    }
    GlrtResults {
        vals,
        thetas,
        aalt,
        astar,
    }
}

/// Weight ratio of one challenger at threshold level `v`.
fn bai_x(mu1: f64, sigma21: f64, mua: f64, sigma2a: f64, v: f64) -> (f64, f64) {
    let upd_a = bai_d(mu1, sigma21, mua);
    let alpha = binary_search(
        |z| {
            let mu_z = alt_lambda(mu1, sigma21, 1.0 - z, mua, sigma2a, z);
            (1.0 - z) * bai_d(mu1, sigma21, mu_z) + z * bai_d(mua, sigma2a, mu_z) - (1.0 - z) * v
        },
        0.0,
        1.0,
        upd_a * BAI_EPSILON,
    );
    let alpha_ratio = alpha / (1.0 - alpha);
    let alt = alt_lambda(mu1, sigma21, 1.0 - alpha, mua, sigma2a, alpha);
    (alpha_ratio, alt)
}

/// Optimal sampling proportions for the current empirical means and
/// variances (the track-and-stop oracle). Returns weights summing to 1.
pub fn oracle(mu: &[f64], sigma2: &[f64]) -> Vec<f64> {
    let size = mu.len();
    let mut astar = 0;
    for i in 1..size {
        if mu[i] > mu[astar] {
            astar = i;
        }
    }
    let mustar = mu[astar];
    if mu.iter().all(|&m| m == mustar) {
        return vec![1.0 / size as f64; size];
    }
    let mut hi = f64::INFINITY;
    for k in 0..size {
        if k == astar {
            continue;
        }
        let d = bai_d(mustar, sigma2[astar], mu[k]);
        if d < hi {
            hi = d;
        }
    }
    let val = binary_search(
        |z| {
            let mut sum = 0.0;
            for k in 0..size {
                if k == astar {
                    continue;
                }
                let (_, mu_x) = bai_x(mustar, sigma2[astar], mu[k], sigma2[k], z);
                sum += bai_d(mustar, sigma2[astar], mu_x) / bai_d(mu[k], sigma2[k], mu_x);
            }
            sum - 1.0
        },
        0.0,
        hi,
        BAI_EPSILON,
    );
    let mut ws = vec![0.0; size];
    let mut total = 0.0;
    for k in 0..size {
        ws[k] = if k == astar {
            1.0
        } else {
            bai_x(mustar, sigma2[astar], mu[k], sigma2[k], val).0
        };
        total += ws[k];
    }
    for w in ws.iter_mut() {
        *w /= total;
    }
    ws
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bai_d() {
        assert_eq!(bai_d(0.0, 1.0, 0.0), 0.0);
        assert_eq!(bai_d(2.0, 1.0, 0.0), 2.0);
        assert_eq!(bai_d(2.0, 4.0, 0.0), 0.5);
    }

    #[test]
    fn test_alt_lambda_degenerate_weights() {
        assert_eq!(alt_lambda(1.0, 1.0, 0.0, 5.0, 1.0, 3.0), 5.0);
        assert_eq!(alt_lambda(1.0, 1.0, 3.0, 5.0, 1.0, 0.0), 1.0);
        assert_eq!(alt_lambda(2.0, 1.0, 3.0, 2.0, 1.0, 3.0), 2.0);
    }

    #[test]
    fn test_alt_lambda_between_means() {
        let lambda = alt_lambda(0.0, 1.0, 10.0, 4.0, 1.0, 10.0);
        assert!(lambda > 0.0 && lambda < 4.0);
        // Equal weights and variances land in the middle.
        assert!((lambda - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_binary_search_root() {
        let root = binary_search(|x| x * x - 2.0, 0.0, 2.0, 1e-12);
        assert!((root - std::f64::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_glrt_identifies_leader_and_challenger() {
        let mu = vec![-10.0, 0.0, 100.0, -20.0];
        let sigma2 = vec![1.0, 1.0, 10.0, 5.0];
        let n = vec![50u64, 50, 50, 50];
        let results = glrt(4, &n, &mu, &sigma2);
        assert_eq!(results.astar, 2);
        // The closest competitor by divergence is arm 1 (mean 0).
        assert_eq!(results.aalt, 1);
        assert!(results.vals[results.aalt] < results.vals[0]);
        assert!(results.vals[2].is_infinite());
    }

    #[test]
    fn test_glrt_grows_with_separation() {
        let n = vec![50u64, 50];
        let near = glrt(2, &n, &[0.0, -1.0], &[1.0, 1.0]);
        let far = glrt(2, &n, &[0.0, -10.0], &[1.0, 1.0]);
        assert!(far.vals[1] > near.vals[1]);
    }

    #[test]
    fn test_oracle_weights() {
        let mu = vec![1.0, 0.0, -5.0];
        let sigma2 = vec![1.0, 1.0, 1.0];
        let ws = oracle(&mu, &sigma2);
        let total: f64 = ws.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        // The near challenger needs more samples than the far one.
        assert!(ws[1] > ws[2]);
        assert!(ws.iter().all(|&w| w > 0.0));
    }

    #[test]
    fn test_oracle_all_equal() {
        let ws = oracle(&[0.5, 0.5, 0.5, 0.5], &[1.0, 1.0, 1.0, 1.0]);
        for &w in &ws {
            assert!((w - 0.25).abs() < 1e-12);
        }
    }
}
