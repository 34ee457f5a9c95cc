//! Online covariance and Pearson correlation over paired streams.

/// Single-pass covariance accumulator tracking both axes.
///
/// Pairs containing a non-finite value are skipped entirely so the axis
/// sums never diverge from the co-moment.
#[derive(Debug, Clone, Default)]
pub struct OnlineCovariance {
    n: u64,
    mean_x: f64,
    mean_y: f64,
    /// Running co-moment sum((x - mean_x)(y - mean_y)).
    c: f64,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
}

/// Variances below this are treated as degenerate (correlation 0).
const VARIANCE_FLOOR: f64 = 1e-12;

impl OnlineCovariance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.n += 1;
        let n = self.n as f64;
        let dx = x - self.mean_x;
        self.mean_x += dx / n;
        self.mean_y += (y - self.mean_y) / n;
        self.c += dx * (y - self.mean_y);

        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn mean_x(&self) -> f64 {
        self.mean_x
    }

    pub fn mean_y(&self) -> f64 {
        self.mean_y
    }

    /// Sample covariance C/(n-1).
    pub fn covariance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.c / (self.n - 1) as f64
        }
    }

    /// Sample variance of the x axis.
    pub fn variance_x(&self) -> f64 {
        self.axis_variance(self.sum_x, self.sum_xx)
    }

    /// Sample variance of the y axis.
    pub fn variance_y(&self) -> f64 {
        self.axis_variance(self.sum_y, self.sum_yy)
    }

    fn axis_variance(&self, sum: f64, sum_sq: f64) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        let n = self.n as f64;
        ((sum_sq - sum * sum / n) / (n - 1.0)).max(0.0)
    }

    /// Pearson r with sample denominators, clamped to [-1, 1].
    /// Returns 0 when either axis variance is below the degeneracy floor.
    pub fn pearson(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        let vx = self.variance_x();
        let vy = self.variance_y();
        if vx < VARIANCE_FLOOR || vy < VARIANCE_FLOOR {
            return 0.0;
        }
        (self.covariance() / (vx * vy).sqrt()).clamp(-1.0, 1.0)
    }

    /// Parallel merge (Chan et al. co-moment form), for property tests.
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
        let dx = other.mean_x - self.mean_x;
        let dy = other.mean_y - self.mean_y;

        self.c += other.c + dx * dy * na * nb / n;
        self.mean_x += dx * nb / n;
        self.mean_y += dy * nb / n;
        self.n += other.n;
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.sum_xx += other.sum_xx;
        self.sum_yy += other.sum_yy;
    }

    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_pearson(x: &[f64], y: &[f64]) -> f64 {
        let n = x.len() as f64;
        let mx = x.iter().sum::<f64>() / n;
        let my = y.iter().sum::<f64>() / n;
        let cov: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
        let vx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
        let vy: f64 = y.iter().map(|b| (b - my).powi(2)).sum();
        cov / (vx * vy).sqrt()
    }

    #[test]
    fn perfect_positive_correlation() {
        let mut cov = OnlineCovariance::new();
        for i in 0..100 {
            let v = f64::from(i);
            cov.update(v, v);
        }
        assert!((cov.pearson() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_negative_correlation() {
        let mut cov = OnlineCovariance::new();
        for i in 0..100 {
            let v = f64::from(i);
            cov.update(v, -2.0 * v + 7.0);
        }
        assert!((cov.pearson() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn agrees_with_naive_two_pass_formula() {
        let x: Vec<f64> = (0..500).map(|i| (f64::from(i) * 0.731).sin() * 10.0).collect();
        let y: Vec<f64> = (0..500)
            .map(|i| (f64::from(i) * 0.291).cos() * 4.0 + f64::from(i) * 0.01)
            .collect();
        let mut cov = OnlineCovariance::new();
        for (&a, &b) in x.iter().zip(&y) {
            cov.update(a, b);
        }
        let naive = naive_pearson(&x, &y);
        assert!(
            (cov.pearson() - naive).abs() < 1e-9 * naive.abs().max(1.0),
            "online {} vs naive {}",
            cov.pearson(),
            naive
        );
    }

    #[test]
    fn constant_axis_yields_zero() {
        let mut cov = OnlineCovariance::new();
        for i in 0..50 {
            cov.update(3.0, f64::from(i));
        }
        assert_eq!(cov.pearson(), 0.0);
    }

    #[test]
    fn non_finite_pairs_are_skipped() {
        let mut cov = OnlineCovariance::new();
        cov.update(1.0, 2.0);
        cov.update(f64::NAN, 3.0);
        cov.update(4.0, f64::INFINITY);
        cov.update(2.0, 4.0);
        assert_eq!(cov.count(), 2);
    }

    #[test]
    fn merge_agrees_with_single_pass() {
        let pairs: Vec<(f64, f64)> = (0..300)
            .map(|i| (f64::from(i) * 0.5, (f64::from(i) * 0.17).sin()))
            .collect();
        let mut whole = OnlineCovariance::new();
        let mut left = OnlineCovariance::new();
        let mut right = OnlineCovariance::new();
        for (i, &(x, y)) in pairs.iter().enumerate() {
            whole.update(x, y);
            if i < 120 {
                left.update(x, y);
            } else {
                right.update(x, y);
            }
        }
        left.merge(&right);
        assert_eq!(left.count(), whole.count());
        assert!((left.pearson() - whole.pearson()).abs() < 1e-12);
        assert!((left.covariance() - whole.covariance()).abs() < 1e-9);
    }
}
