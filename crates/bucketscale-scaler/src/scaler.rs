//! Ratio-based replica sizing.

use bucketscale_core::{MetricSample, ScalingRule};

/// Integer division rounding up. `b` must be non-zero.
pub fn ceiling_divide(a: u64, b: u64) -> u64 {
    // `a.div_ceil(b)` without the `a + b - 1` overflow near u64::MAX.
    a / b + u64::from(a % b != 0)
}

/// Replicas needed for `sample`, clamped into the rule's replica range.
pub fn compute(sample: &MetricSample, rule: &ScalingRule) -> u32 {
    if sample.count == 0 {
        return rule.min_replicas();
    }

    let wanted = ceiling_divide(sample.count, rule.target_object_count());
    let min = u64::from(rule.min_replicas());
    let max = u64::from(rule.max_replicas());
    // Bounded by max, which came from a u32.
    wanted.clamp(min, max) as u32
}
