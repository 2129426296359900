use crate::config::{MEDIAN_FLOW_MAX_BYTES, SMALL_FLOW_MAX_BYTES};
use crate::quantile::{FctAgg, QuantileImpl};

/// One completed flow pulled out of a finished-flow log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRecord {
    pub fct_ms: f64,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeBucket {
    Small,
    Median,
    Large,
}

impl SizeBucket {
    /// Bucket bounds are inclusive on the upper end.
    pub fn classify(size_bytes: u64) -> SizeBucket {
        if size_bytes <= SMALL_FLOW_MAX_BYTES {
            SizeBucket::Small
        } else if size_bytes <= MEDIAN_FLOW_MAX_BYTES {
            SizeBucket::Median
        } else {
            SizeBucket::Large
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowPercentile {
    Min,
    Avg,
    P50,
    P90,
    P95,
    P99,
    Max,
}

impl FlowPercentile {
    pub fn all_in_order() -> &'static [FlowPercentile] {
        use FlowPercentile::*;
        &[Min, Avg, P50, P90, P95, P99, Max]
    }

    pub fn name(self) -> &'static str {
        match self {
            FlowPercentile::Min => "Min",
            FlowPercentile::Avg => "Avg",
            FlowPercentile::P50 => "P50",
            FlowPercentile::P90 => "P90",
            FlowPercentile::P95 => "P95",
            FlowPercentile::P99 => "P99",
            FlowPercentile::Max => "Max",
        }
    }
}

/// The four FCT accumulators, populated by one pass over the input.
#[derive(Debug)]
pub struct FctData {
    pub overall: FctAgg,
    pub small: FctAgg,
    pub median: FctAgg,
    pub large: FctAgg,
}

impl FctData {
    pub fn new(impl_kind: QuantileImpl) -> Self {
        Self {
            overall: FctAgg::new(impl_kind),
            small: FctAgg::new(impl_kind),
            median: FctAgg::new(impl_kind),
            large: FctAgg::new(impl_kind),
        }
    }

    /// Every record lands in the overall accumulator and exactly one bucket.
    pub fn insert(&mut self, record: FlowRecord) {
        self.overall.insert(record.fct_ms);
        match SizeBucket::classify(record.size_bytes) {
            SizeBucket::Small => self.small.insert(record.fct_ms),
            SizeBucket::Median => self.median.insert(record.fct_ms),
            SizeBucket::Large => self.large.insert(record.fct_ms),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_bounds_are_inclusive_on_the_upper_end() {
        assert_eq!(SizeBucket::classify(1), SizeBucket::Small);
        assert_eq!(SizeBucket::classify(102_400), SizeBucket::Small);
        assert_eq!(SizeBucket::classify(102_401), SizeBucket::Median);
        assert_eq!(SizeBucket::classify(1_048_576), SizeBucket::Median);
        assert_eq!(SizeBucket::classify(1_048_577), SizeBucket::Large);
    }

    #[test]
    fn insert_routes_into_overall_and_one_bucket() {
        let mut data = FctData::new(QuantileImpl::Brute);
        data.insert(FlowRecord { fct_ms: 1.5, size_bytes: 50_000 });
        data.insert(FlowRecord { fct_ms: 3.0, size_bytes: 500_000 });
        data.insert(FlowRecord { fct_ms: 9.1, size_bytes: 2_000_000 });

        assert_eq!(data.overall.count, 3);
        assert_eq!(data.small.count, 1);
        assert_eq!(data.median.count, 1);
        assert_eq!(data.large.count, 1);
    }
}
