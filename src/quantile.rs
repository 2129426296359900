use tdigests::TDigest;

use crate::model::FlowPercentile;
use crate::stats::{sort_ascending, tail_index};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantileImpl {
    Brute,
    TDigest,
}

fn exact_quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sort_ascending(&mut sorted);
    sorted[tail_index(sorted.len(), q)]
}

/// Streaming FCT accumulator. Count, sum, min and max are exact in both
/// implementations; quantiles are exact under `Brute` and estimated from a
/// compressed digest under `TDigest`.
#[derive(Debug)]
pub struct FctAgg {
    pub count: u32,
    sum: f64,
    min: f64,
    max: f64,
    impl_kind: QuantileImpl,
    values: Vec<f64>,
    digest: Option<TDigest>,
}

impl FctAgg {
    pub fn new(impl_kind: QuantileImpl) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            impl_kind,
            values: Vec::new(),
            digest: None,
        }
    }

    pub fn insert(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        match self.impl_kind {
            QuantileImpl::Brute => self.values.push(x),
            QuantileImpl::TDigest => {
                let incoming = TDigest::from_values(vec![x]);
                let mut merged = match self.digest.take() {
                    Some(existing) => existing.merge(&incoming),
                    None => incoming,
                };
                if self.count % 1024 == 0 {
                    merged.compress(200);
                }
                self.digest = Some(merged);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn avg(&self) -> f64 {
        match self.count {
            0 => f64::NAN,
            _ => self.sum / (self.count as f64),
        }
    }

    pub fn quantile(&self, q: f64) -> f64 {
        match self.impl_kind {
            QuantileImpl::Brute => exact_quantile(&self.values, q),
            QuantileImpl::TDigest => self
                .digest
                .as_ref()
                .map(|d| d.estimate_quantile(q))
                .unwrap_or(f64::NAN),
        }
    }

    pub fn value_for(&self, p: FlowPercentile) -> f64 {
        match p {
            FlowPercentile::Min => match self.count {
                0 => f64::NAN,
                _ => self.min,
            },
            FlowPercentile::Max => match self.count {
                0 => f64::NAN,
                _ => self.max,
            },
            FlowPercentile::Avg => self.avg(),
            FlowPercentile::P50 => self.quantile(0.5),
            FlowPercentile::P90 => self.quantile(0.9),
            FlowPercentile::P95 => self.quantile(0.95),
            FlowPercentile::P99 => self.quantile(0.99),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_with(values: &[f64]) -> FctAgg {
        let mut agg = FctAgg::new(QuantileImpl::Brute);
        for v in values {
            agg.insert(*v);
        }
        agg
    }

    #[test]
    fn brute_quantile_uses_the_floor_index_law() {
        // 10 values ascending 1..=10: floor(0.99 * 10) = 9 -> last element.
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let agg = brute_with(&values);
        assert_eq!(agg.quantile(0.99), 10.0);
        assert_eq!(agg.quantile(0.5), 6.0);
    }

    #[test]
    fn brute_quantile_sorts_before_indexing() {
        let agg = brute_with(&[3.2, 1.5]);
        assert_eq!(agg.quantile(0.99), 3.2);
    }

    #[test]
    fn avg_min_max_track_inserted_values() {
        let agg = brute_with(&[1.5, 3.2]);
        assert_eq!(agg.count, 2);
        assert!((agg.avg() - 2.35).abs() < 1e-12);
        assert_eq!(agg.value_for(FlowPercentile::Min), 1.5);
        assert_eq!(agg.value_for(FlowPercentile::Max), 3.2);
    }

    #[test]
    fn empty_aggregate_reports_nan() {
        let agg = FctAgg::new(QuantileImpl::Brute);
        assert!(agg.is_empty());
        assert!(agg.avg().is_nan());
        assert!(agg.quantile(0.99).is_nan());
        assert!(agg.value_for(FlowPercentile::Min).is_nan());
        assert!(agg.value_for(FlowPercentile::Max).is_nan());
    }

    #[test]
    fn tdigest_keeps_exact_count_sum_and_bounds() {
        let mut agg = FctAgg::new(QuantileImpl::TDigest);
        for v in 1..=100 {
            agg.insert(v as f64);
        }
        assert_eq!(agg.count, 100);
        assert!((agg.avg() - 50.5).abs() < 1e-12);
        assert_eq!(agg.value_for(FlowPercentile::Min), 1.0);
        assert_eq!(agg.value_for(FlowPercentile::Max), 100.0);

        let p50 = agg.quantile(0.5);
        assert!(p50.is_finite());
        assert!(p50 >= 1.0 && p50 <= 100.0);
    }
}
