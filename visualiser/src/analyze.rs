use crate::model::{Quantile, QuantileLevels, WorkloadStats};
use polars::prelude::*;

/// Mean, population standard deviation, min and max of a series.
///
/// Returns `None` for an empty series.
pub(crate) fn workload_stats(values: &Series) -> PolarsResult<Option<WorkloadStats>> {
    let Some(mean) = values.mean() else {
        return Ok(None);
    };
    let Some(std) = values.std(0) else {
        return Ok(None);
    };
    let Some(min) = values.min::<f64>()? else {
        return Ok(None);
    };
    let Some(max) = values.max::<f64>()? else {
        return Ok(None);
    };

    Ok(Some(WorkloadStats {
        mean,
        std,
        min,
        max,
    }))
}

/// Quantiles with linear interpolation between the closest ranks.
pub(crate) fn quantiles(values: &[f64], levels: &QuantileLevels) -> Vec<Quantile> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = (sorted.len() - 1) as f64;

    levels
        .levels()
        .iter()
        .map(|&level| {
            let rank = level / 100.0 * last;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let value = sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64);
            Quantile { level, value }
        })
        .collect()
}

/// Counts per bin as `(bin_start, count)`, for `bins` equal-width bins covering `[min, max]`.
///
/// Values outside of the range are dropped, `max` itself falls into the last bin.
pub(crate) fn histogram_counts(
    values: &[f64],
    min: f64,
    max: f64,
    bins: usize,
) -> Vec<(f64, usize)> {
    if bins == 0 || max <= min {
        return Vec::new();
    }

    let bin_width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &value in values {
        if !(min..=max).contains(&value) {
            continue;
        }
        let idx = (((value - min) / bin_width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (min + i as f64 * bin_width, count))
        .collect()
}
