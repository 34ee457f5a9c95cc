//! Single-pass central-moment accumulator (Welford, extended to M3/M4).

/// Running mean/variance/skewness/kurtosis over a stream of finite doubles.
///
/// Updates on non-finite values are no-ops. Memory is constant; merging two
/// accumulators uses the standard parallel formulae.
#[derive(Debug, Clone)]
pub struct MomentAccumulator {
    n: u64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
    min: f64,
    max: f64,
    sum: f64,
}

impl Default for MomentAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MomentAccumulator {
    pub fn new() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }

    pub fn update(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        let n_old = self.n as f64;
        self.n += 1;
        let n = self.n as f64;

        let delta = x - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n_old;

        self.mean += delta_n;
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;

        self.sum += x;
        if x < self.min {
            self.min = x;
        }
        if x > self.max {
            self.max = x;
        }
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.max
        }
    }

    pub fn range(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.max - self.min
        }
    }

    /// Population variance M2/n.
    pub fn variance(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.m2 / self.n as f64
        }
    }

    /// Sample variance M2/(n-1).
    pub fn sample_variance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.m2 / (self.n - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// sqrt(n) * M3 / M2^1.5, defined once n >= 3 and M2 > 0.
    pub fn skewness(&self) -> f64 {
        if self.n < 3 || self.m2 <= 0.0 {
            return 0.0;
        }
        (self.n as f64).sqrt() * self.m3 / self.m2.powf(1.5)
    }

    /// Excess kurtosis n * M4 / M2^2 - 3, defined once n >= 4 and M2 > 0.
    pub fn kurtosis(&self) -> f64 {
        if self.n < 4 || self.m2 <= 0.0 {
            return 0.0;
        }
        self.n as f64 * self.m4 / (self.m2 * self.m2) - 3.0
    }

    /// sigma / |mean|, or 0 when the mean is zero.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.n == 0 || self.mean == 0.0 {
            0.0
        } else {
            self.std_dev() / self.mean.abs()
        }
    }

    /// Combine with another accumulator (Chan et al. parallel update).
    pub fn merge(&mut self, other: &Self) {
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = other.clone();
            return;
        }

        let na = self.n as f64;
        let nb = other.n as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        let delta2 = delta * delta;
        let delta3 = delta2 * delta;
        let delta4 = delta2 * delta2;

        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta3 * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta4 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        self.mean = (na * self.mean + nb * other.mean) / n;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
        self.n += other.n;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(values: &[f64]) -> MomentAccumulator {
        let mut acc = MomentAccumulator::new();
        for &v in values {
            acc.update(v);
        }
        acc
    }

    #[test]
    fn matches_naive_moments_on_small_sample() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let acc = feed(&values);
        assert_eq!(acc.count(), 8);
        assert!((acc.mean() - 5.0).abs() < 1e-12);
        assert!((acc.variance() - 4.0).abs() < 1e-12);
        assert!((acc.std_dev() - 2.0).abs() < 1e-12);
        assert_eq!(acc.min(), 2.0);
        assert_eq!(acc.max(), 9.0);
        assert_eq!(acc.sum(), 40.0);
    }

    #[test]
    fn skewness_zero_for_symmetric_data() {
        let acc = feed(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(acc.skewness().abs() < 1e-12);
        // Uniform 1..=5 excess kurtosis = -1.3
        assert!((acc.kurtosis() - (-1.3)).abs() < 1e-9);
    }

    #[test]
    fn non_finite_updates_are_ignored() {
        let mut acc = feed(&[1.0, 2.0, 3.0]);
        acc.update(f64::NAN);
        acc.update(f64::INFINITY);
        assert_eq!(acc.count(), 3);
        assert!((acc.mean() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn merge_agrees_with_single_pass() {
        let all: Vec<f64> = (0..200).map(|i| (i as f64) * 0.37 - 20.0).collect();
        let whole = feed(&all);
        let mut left = feed(&all[..77]);
        let right = feed(&all[77..]);
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert!((left.mean() - whole.mean()).abs() < 1e-9);
        assert!((left.variance() - whole.variance()).abs() < 1e-9);
        assert!((left.skewness() - whole.skewness()).abs() < 1e-9);
        assert!((left.kurtosis() - whole.kurtosis()).abs() < 1e-9);
    }

    #[test]
    fn cv_is_zero_when_mean_is_zero() {
        let acc = feed(&[-1.0, 1.0]);
        assert_eq!(acc.coefficient_of_variation(), 0.0);
    }
}
