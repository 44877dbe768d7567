// closed form least squares line fitting, y = m * x + b

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub m: f64,
    pub b: f64,
}

impl LineFit {
    #[inline]
    pub fn at(&self, x: f64) -> f64 {
        self.m * x + self.b
    }
}

/// Running sums for a least squares fit that can grow one sample at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquares {
    n: usize,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_xy: f64,
}

impl LeastSquares {
    pub fn from_samples(x: &[f64], y: &[f64]) -> LeastSquares {
        let mut acc = LeastSquares::default();
        for (&xi, &yi) in x.iter().zip(y) {
            acc.push(xi, yi);
        }
        acc
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_xy += x * y;
    }

    /// adds a sample and returns the updated fit
    pub fn update(&mut self, x: f64, y: f64) -> LineFit {
        self.push(x, y);
        self.fit()
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn fit(&self) -> LineFit {
        if self.n == 0 {
            return LineFit { m: 0., b: 0. };
        }
        let n = self.n as f64;

        let denominator = n * self.sum_xx - self.sum_x * self.sum_x;
        // a single sample or a vertical stack of samples has no slope
        if denominator.abs() <= f64::EPSILON * (n * self.sum_xx).abs() {
            return LineFit {
                m: 0.,
                b: self.sum_y / n,
            };
        }

        let m = (n * self.sum_xy - self.sum_x * self.sum_y) / denominator;
        let b = (self.sum_y - m * self.sum_x) / n;
        LineFit { m, b }
    }
}

pub fn least_squares(x: &[f64], y: &[f64]) -> LineFit {
    debug_assert_eq!(x.len(), y.len());
    LeastSquares::from_samples(x, y).fit()
}

/// mean of the squared residuals, only meaningful for comparing fits
pub fn error(x: &[f64], y: &[f64], fit: LineFit) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.;
    }
    x.iter()
        .zip(y)
        .fold(0., |acc, (&xi, &yi)| acc + (yi - fit.at(xi)).powi(2))
        / n as f64
}

/// the largest single squared residual
pub fn max_error(x: &[f64], y: &[f64], fit: LineFit) -> f64 {
    x.iter()
        .zip(y)
        .fold(0., |acc: f64, (&xi, &yi)| acc.max((yi - fit.at(xi)).powi(2)))
}
