// =============================================================================
// Windowed reductions and lag helpers
// =============================================================================
//
// Every trailing-window indicator in the engine is built from a window of
// exactly `period` values ending at (and including) position t. Positions
// before `period - 1`, and windows holding a NaN, are NaN.
//
// `sma`, `rolling_std`, `rolling_min` and `rolling_max` slide an accumulator
// over the input, so each costs O(n) regardless of `period`:
//   mean      compensated (Kahan) running sum
//   std       Welford add/remove updates of mean and squared deviations
//   min/max   monotonic deque of candidate indices
// A window whose values are all identical reports that value (and std 0)
// exactly, so running-sum residue never leaks into flat stretches. A window
// holding ±inf is reduced directly.
// =============================================================================

use std::collections::VecDeque;

/// Apply `reduce` to each trailing window of `period` values.
///
/// The output has the same length as `values`. This is the direct O(n·period)
/// form, kept for arbitrary reducers.
pub fn rolling<F>(values: &[f64], period: usize, reduce: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for (i, window) in values.windows(period).enumerate() {
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i + period - 1] = reduce(window);
    }
    out
}

pub fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

pub fn min(window: &[f64]) -> f64 {
    window.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max(window: &[f64]) -> f64 {
    window.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Sample standard deviation (`n - 1` denominator). NaN for a single value.
pub fn sample_std(window: &[f64]) -> f64 {
    let n = window.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(window);
    let ss: f64 = window.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Simple moving average.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    slide(values, period, RunningMean::default())
}

pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    slide(values, period, MonotonicWindow::new(|newer: f64, older: f64| newer <= older, min))
}

pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    slide(values, period, MonotonicWindow::new(|newer: f64, older: f64| newer >= older, max))
}

pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    slide(values, period, RunningVariance::default())
}

/// Lag `values` by `k` positions; the first `k` entries are NaN.
pub fn shift(values: &[f64], k: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i >= k { values[i - k] } else { f64::NAN })
        .collect()
}

/// Replace each NaN with the last defined value before it. Leading NaNs have
/// nothing to copy and stay NaN. Returns how many cells were filled.
pub fn forward_fill(values: &mut [f64]) -> usize {
    let mut last: Option<f64> = None;
    let mut filled = 0;
    for v in values.iter_mut() {
        if v.is_nan() {
            if let Some(prev) = last {
                *v = prev;
                filled += 1;
            }
        } else {
            last = Some(*v);
        }
    }
    filled
}

// -----------------------------------------------------------------------------
// Sliding accumulators
// -----------------------------------------------------------------------------

/// Incremental window state. Only finite values are ever pushed or popped.
trait Accumulator {
    fn push(&mut self, index: usize, x: f64);
    fn pop(&mut self, index: usize, x: f64);
    /// Reduction of the finite values currently in the window.
    fn value(&self) -> f64;
    /// Reduction of a window of `period` copies of `x`.
    fn constant(&self, x: f64, period: usize) -> f64;
    /// Direct reduction, used for windows holding ±inf.
    fn reduce(&self, window: &[f64]) -> f64;
}

fn slide<A: Accumulator>(values: &[f64], period: usize, mut acc: A) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut nans = 0usize;
    let mut infinities = 0usize;
    // Length of the run of identical values ending at the current position.
    let mut run = 0usize;

    for (i, &x) in values.iter().enumerate() {
        if i >= period {
            let old = values[i - period];
            if old.is_nan() {
                nans -= 1;
            } else if old.is_infinite() {
                infinities -= 1;
            } else {
                acc.pop(i - period, old);
            }
        }

        if x.is_nan() {
            nans += 1;
        } else if x.is_infinite() {
            infinities += 1;
        } else {
            acc.push(i, x);
        }
        run = if i > 0 && x == values[i - 1] { run + 1 } else { 1 };

        if i + 1 < period || nans > 0 {
            continue;
        }
        out[i] = if infinities > 0 {
            acc.reduce(&values[i + 1 - period..=i])
        } else if run >= period {
            acc.constant(x, period)
        } else {
            acc.value()
        };
    }
    out
}

#[derive(Debug, Default)]
struct RunningMean {
    count: usize,
    sum: f64,
    compensation: f64,
}

impl RunningMean {
    fn add(&mut self, x: f64) {
        let y = x - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }
}

impl Accumulator for RunningMean {
    fn push(&mut self, _index: usize, x: f64) {
        self.count += 1;
        self.add(x);
    }

    fn pop(&mut self, _index: usize, x: f64) {
        self.count -= 1;
        self.add(-x);
    }

    fn value(&self) -> f64 {
        self.sum / self.count as f64
    }

    fn constant(&self, x: f64, _period: usize) -> f64 {
        x
    }

    fn reduce(&self, window: &[f64]) -> f64 {
        mean(window)
    }
}

/// Welford's online mean / sum of squared deviations, with removal.
#[derive(Debug, Default)]
struct RunningVariance {
    count: usize,
    mean: f64,
    ssqd: f64,
}

impl Accumulator for RunningVariance {
    fn push(&mut self, _index: usize, x: f64) {
        self.count += 1;
        let n = self.count as f64;
        let delta = x - self.mean;
        self.mean += delta / n;
        self.ssqd += (n - 1.0) * delta * delta / n;
    }

    fn pop(&mut self, _index: usize, x: f64) {
        self.count -= 1;
        if self.count == 0 {
            self.mean = 0.0;
            self.ssqd = 0.0;
            return;
        }
        let n = self.count as f64;
        let delta = x - self.mean;
        self.mean -= delta / n;
        self.ssqd -= (n + 1.0) * delta * delta / n;
    }

    fn value(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        (self.ssqd.max(0.0) / (self.count - 1) as f64).sqrt()
    }

    fn constant(&self, _x: f64, period: usize) -> f64 {
        if period < 2 {
            f64::NAN
        } else {
            0.0
        }
    }

    fn reduce(&self, window: &[f64]) -> f64 {
        sample_std(window)
    }
}

/// Window extremum via a deque of `(index, value)` whose values are monotonic
/// from front to back. `dominates(newer, older)` evicts `older` from the back.
struct MonotonicWindow<D> {
    deque: VecDeque<(usize, f64)>,
    dominates: D,
    direct: fn(&[f64]) -> f64,
}

impl<D: Fn(f64, f64) -> bool> MonotonicWindow<D> {
    fn new(dominates: D, direct: fn(&[f64]) -> f64) -> Self {
        Self {
            deque: VecDeque::new(),
            dominates,
            direct,
        }
    }
}

impl<D: Fn(f64, f64) -> bool> Accumulator for MonotonicWindow<D> {
    fn push(&mut self, index: usize, x: f64) {
        while let Some(&(_, back)) = self.deque.back() {
            if !(self.dominates)(x, back) {
                break;
            }
            self.deque.pop_back();
        }
        self.deque.push_back((index, x));
    }

    fn pop(&mut self, index: usize, _x: f64) {
        if self.deque.front().is_some_and(|&(i, _)| i == index) {
            self.deque.pop_front();
        }
    }

    fn value(&self) -> f64 {
        self.deque.front().map_or(f64::NAN, |&(_, v)| v)
    }

    fn constant(&self, x: f64, _period: usize) -> f64 {
        x
    }

    fn reduce(&self, window: &[f64]) -> f64 {
        (self.direct)(window)
    }
}
