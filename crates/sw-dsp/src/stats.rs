//! Small statistics helpers shared by the stages

use sw_core::Sample;

/// Median of `values` (mean of the two middle values for even counts)
///
/// Returns 0.0 for an empty slice. NaNs sort last.
pub fn median(values: &[Sample]) -> Sample {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }

    let mut scratch = values.to_vec();
    let mid = n / 2;
    let (lower, upper_mid, _) = scratch.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper_mid = *upper_mid;

    if n % 2 == 1 {
        upper_mid
    } else {
        let lower_mid = lower
            .iter()
            .copied()
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or(upper_mid);
        0.5 * (lower_mid + upper_mid)
    }
}

/// Median of absolute values
pub fn median_abs(values: &[Sample]) -> Sample {
    let abs: Vec<Sample> = values.iter().map(|v| v.abs()).collect();
    median(&abs)
}

/// Root mean square (0.0 for an empty slice)
pub fn rms(values: &[Sample]) -> Sample {
    if values.is_empty() {
        return 0.0;
    }
    let sum: Sample = values.iter().map(|x| x * x).sum();
    (sum / values.len() as Sample).sqrt()
}
