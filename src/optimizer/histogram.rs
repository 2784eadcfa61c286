// Fixed-width histograms for selectivity estimation.

use crate::query::executor::predicate::CmpOp;

/// Histogram over one integer column with equal-width buckets. Space and
/// per-value time are constant in the number of values added.
pub struct IntHistogram {
    counts: Vec<u64>,
    widths: Vec<i64>,
    step: f64,
    min: i32,
    max: i32,
    ntups: u64,
}

impl IntHistogram {
    /// `min` and `max` bound every value that will be added. Buckets beyond
    /// the number of distinct integers in range are not allocated.
    pub fn new(buckets: usize, min: i32, max: i32) -> Self {
        assert!(min <= max, "histogram range is empty");
        let range = (max as i64 - min as i64 + 1) as usize;
        let buckets = buckets.min(range).max(1);
        let step = range as f64 / buckets as f64;
        let widths = (0..buckets)
            .map(|i| (((i + 1) as f64 * step).floor() - (i as f64 * step).floor()) as i64)
            .collect();
        Self {
            counts: vec![0; buckets],
            widths,
            step,
            min,
            max,
            ntups: 0,
        }
    }

    /// Record one value. Must lie within the range given at construction.
    pub fn add_value(&mut self, v: i32) {
        let b = self.bucket_of(v);
        self.counts[b] += 1;
        self.ntups += 1;
    }

    pub fn total(&self) -> u64 {
        self.ntups
    }

    fn bucket_of(&self, v: i32) -> usize {
        (((v as i64 - self.min as i64) as f64) / self.step).floor() as usize
    }

    /// Left edge of bucket `b` on the value axis.
    fn bucket_left(&self, b: usize) -> i64 {
        (self.min as f64 + b as f64 * self.step).floor() as i64
    }

    /// Right edge (inclusive) of bucket `b` on the value axis.
    fn bucket_right(&self, b: usize) -> i64 {
        let next_left = (self.min as f64 + (b + 1) as f64 * self.step).floor() as i64;
        (next_left - 1).max(self.bucket_left(b))
    }

    /// Estimated fraction of recorded values satisfying `value <op> v`.
    pub fn estimate_selectivity(&self, op: CmpOp, v: i32) -> f64 {
        if self.ntups == 0 {
            return 0.0;
        }
        let ntups = self.ntups as f64;
        match op {
            CmpOp::Equals => {
                if v < self.min || v > self.max {
                    return 0.0;
                }
                let b = self.bucket_of(v);
                (self.counts[b] as f64 / self.widths[b] as f64) / ntups
            }
            CmpOp::GreaterThan => {
                if v >= self.max {
                    return 0.0;
                }
                if v < self.min {
                    return 1.0;
                }
                let b = self.bucket_of(v);
                let in_bucket = (self.bucket_right(b) - v as i64 + 1) as f64
                    / self.widths[b] as f64;
                let mut sel = (self.counts[b] as f64 / ntups) * in_bucket;
                for i in b + 1..self.counts.len() {
                    sel += self.counts[i] as f64 / ntups;
                }
                sel
            }
            CmpOp::LessThan => {
                if v > self.max {
                    return 1.0;
                }
                if v <= self.min {
                    return 0.0;
                }
                let b = self.bucket_of(v);
                let in_bucket =
                    (v as i64 - self.bucket_left(b) + 1) as f64 / self.widths[b] as f64;
                let mut sel = (self.counts[b] as f64 / ntups) * in_bucket;
                for i in 0..b {
                    sel += self.counts[i] as f64 / ntups;
                }
                sel
            }
            CmpOp::GreaterThanOrEq => {
                self.estimate_selectivity(CmpOp::Equals, v)
                    + self.estimate_selectivity(CmpOp::GreaterThan, v)
            }
            CmpOp::LessThanOrEq => {
                self.estimate_selectivity(CmpOp::Equals, v)
                    + self.estimate_selectivity(CmpOp::LessThan, v)
            }
            CmpOp::NotEquals => 1.0 - self.estimate_selectivity(CmpOp::Equals, v),
        }
    }

    pub fn avg_selectivity(&self) -> f64 {
        1.0
    }
}

/// Histogram over a text column, layered on an integer histogram of a
/// stable order-preserving prefix encoding of the strings.
pub struct TextHistogram {
    inner: IntHistogram,
}

const TEXT_ENCODE_MAX: i32 = i32::from_be_bytes(*b"zzzz");

impl TextHistogram {
    pub fn new(buckets: usize) -> Self {
        Self {
            inner: IntHistogram::new(buckets, 0, TEXT_ENCODE_MAX),
        }
    }

    pub fn add_value(&mut self, s: &str) {
        self.inner.add_value(Self::encode(s));
    }

    pub fn estimate_selectivity(&self, op: CmpOp, s: &str) -> f64 {
        self.inner.estimate_selectivity(op, Self::encode(s))
    }

    pub fn avg_selectivity(&self) -> f64 {
        self.inner.avg_selectivity()
    }

    /// The first four bytes packed big-endian, clamped to the bucket range.
    fn encode(s: &str) -> i32 {
        let bytes = s.as_bytes();
        let mut v: i64 = 0;
        for i in 0..4 {
            let b = bytes.get(i).copied().unwrap_or(0);
            v = (v << 8) | b as i64;
        }
        (v as i32).clamp(0, TEXT_ENCODE_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_selectivity() {
        let mut hist = IntHistogram::new(10, 1, 100);
        for v in 1..=100 {
            hist.add_value(v);
        }
        let eq = hist.estimate_selectivity(CmpOp::Equals, 50);
        assert!((eq - 0.01).abs() < 0.005, "eq selectivity was {}", eq);

        let gt = hist.estimate_selectivity(CmpOp::GreaterThan, 50);
        assert!((gt - 0.5).abs() < 0.1, "gt selectivity was {}", gt);
    }

    #[test]
    fn test_out_of_range_bounds() {
        let mut hist = IntHistogram::new(4, 0, 9);
        for v in 0..10 {
            hist.add_value(v);
        }
        assert_eq!(hist.estimate_selectivity(CmpOp::Equals, 42), 0.0);
        assert_eq!(hist.estimate_selectivity(CmpOp::GreaterThan, 9), 0.0);
        assert_eq!(hist.estimate_selectivity(CmpOp::GreaterThan, -1), 1.0);
        assert_eq!(hist.estimate_selectivity(CmpOp::LessThan, 0), 0.0);
        assert_eq!(hist.estimate_selectivity(CmpOp::LessThan, 10), 1.0);
    }

    #[test]
    fn test_complement_ops_sum_to_one() {
        let mut hist = IntHistogram::new(5, 0, 49);
        for v in 0..50 {
            hist.add_value(v);
        }
        let le = hist.estimate_selectivity(CmpOp::LessThanOrEq, 20);
        let gt = hist.estimate_selectivity(CmpOp::GreaterThan, 20);
        assert!((le + gt - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_text_histogram_orders_prefixes() {
        let mut hist = TextHistogram::new(100);
        for s in ["apple", "banana", "cherry", "date"] {
            hist.add_value(s);
        }
        let before_all = hist.estimate_selectivity(CmpOp::LessThan, "aaa");
        let after_all = hist.estimate_selectivity(CmpOp::GreaterThan, "zzz");
        assert!(before_all < 0.5);
        assert!(after_all < 0.5);
    }
}
