//! Noise removal on pose clustering histograms.
//!
//! A raw hash table holds one dominant mode on top of a broad background of random
//! correspondences. [`denoise`] strips the background in three stages (tophat filter,
//! frequency cutoff, iterative mean/stdev trim) and reports the location and spread of
//! what is left.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::algorithm::histogram::Histogram1D;
use crate::algorithm::tophat::tophat;
use crate::error::Result;
use crate::io::dump::BucketDump;
use crate::params::{CutoffAnchor, DenoiseSettings};

/// How histogram keys relate to the estimated quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyDomain {
    /// Keys are natural logarithms; estimates are exponentiated.
    Log,
    /// Keys are the quantity itself.
    Linear,
}

/// Location of the dominant histogram mode with a one-stdev window around it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeEstimate {
    pub low: f64,
    pub centroid: f64,
    pub high: f64,
}

impl ModeEstimate {
    /// Estimate of a histogram without any support left.
    pub fn undefined() -> Self {
        ModeEstimate {
            low: f64::NAN,
            centroid: f64::NAN,
            high: f64::NAN,
        }
    }

    fn from_key_stats(mean_key: f64, stdev_key: f64, domain: KeyDomain) -> Self {
        let (low, centroid, high) = (mean_key - stdev_key, mean_key, mean_key + stdev_key);
        match domain {
            KeyDomain::Log => ModeEstimate {
                low: low.exp(),
                centroid: centroid.exp(),
                high: high.exp(),
            },
            KeyDomain::Linear => ModeEstimate {
                low,
                centroid,
                high,
            },
        }
    }

    pub fn is_finite(&self) -> bool {
        self.low.is_finite() && self.centroid.is_finite() && self.high.is_finite()
    }

    /// Inclusive test against `[low, high]`.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Buckets kept beyond `mean -/+ k * stdev` when the trim range is narrowed.
///
/// The range becomes `[floor(mean - k * stdev - below), ceil(mean + k * stdev + above))`,
/// clamped to the table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrimPadding {
    pub below: f64,
    pub above: f64,
}

impl TrimPadding {
    /// Scale and rt low tables.
    pub const NARROW: TrimPadding = TrimPadding {
        below: 0.0,
        above: 1.0,
    };
    /// rt high table, one extra bucket on either side.
    pub const WIDE: TrimPadding = TrimPadding {
        below: 1.0,
        above: 2.0,
    };
}

impl Default for TrimPadding {
    fn default() -> Self {
        TrimPadding::NARROW
    }
}

/// Weighted mean and standard deviation of bucket positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Statistics of the positions `offset..offset + values.len()` weighted by `values`.
///
/// Returns `None` if the values carry no positive mass.
pub fn index_stats(values: &[f64], offset: usize) -> Option<IndexStats> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let mean = values
        .iter()
        .enumerate()
        .map(|(i, &w)| i as f64 * w)
        .sum::<f64>()
        / total;

    let variance = values
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let d = i as f64 - mean;
            d * d * w
        })
        .sum::<f64>()
        / total;

    Some(IndexStats {
        mean: mean + offset as f64,
        stdev: variance.max(0.0).sqrt(),
    })
}

/// Height separating noise buckets from enriched buckets.
///
/// The bucket heights are sorted in descending order and compared against a straight
/// reference line that starts at the first anchor value and falls (or rises) by
/// `(last - first) / len / crossing_slope` per rank. The cutoff is the last sorted height
/// that still lies on or above the line, counted from rank 1. An empty input or a flat
/// line gives a cutoff of 0.
///
/// # Arguments
/// * `values` - bucket heights in histogram order
/// * `crossing_slope` - divisor of the reference line slope
/// * `anchor` - which values define the first and last point of the line
pub fn freq_cutoff(values: &[f64], crossing_slope: f64, anchor: CutoffAnchor) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let (first, last) = match anchor {
        CutoffAnchor::HistogramEdges => (values[0], values[n - 1]),
        CutoffAnchor::SortedExtremes => (sorted[0], sorted[n - 1]),
    };
    let intercept = first;
    let slope = (last - first) / n as f64 / crossing_slope;
    if slope == 0.0 || !slope.is_finite() {
        return 0.0;
    }

    let mut index = 1;
    while index < n && sorted[index] >= intercept + slope * index as f64 {
        index += 1;
    }
    sorted[index - 1]
}

/// Zero every bucket below `cutoff`, returning how many buckets were cleared.
pub fn apply_cutoff(values: &mut [f64], cutoff: f64) -> usize {
    let mut cleared = 0;
    for v in values.iter_mut() {
        if *v < cutoff {
            if *v != 0.0 {
                cleared += 1;
            }
            *v = 0.0;
        }
    }
    cleared
}

/// Isolate the dominant mode of `hist` and estimate its location and spread.
///
/// The histogram is modified in place (tophat filtered, noise buckets zeroed). If every
/// bucket ends up empty the estimate is [`ModeEstimate::undefined`]; the caller is
/// expected to reject non-finite results.
///
/// # Arguments
/// * `hist` - raw hash table
/// * `settings` - filter constants
/// * `domain` - whether keys are log-transformed
/// * `padding` - extra buckets kept around the trimmed range
/// * `dump` - optional bucket dump receiving every filtering stage
pub fn denoise(
    hist: &mut Histogram1D,
    settings: &DenoiseSettings,
    domain: KeyDomain,
    padding: TrimPadding,
    mut dump: Option<&mut BucketDump>,
) -> Result<ModeEstimate> {
    let mut stage = 0;
    if let Some(d) = dump.as_deref_mut() {
        d.write_stage("unfiltered hash data", hist, stage)?;
    }
    stage += 1;

    let filtered = tophat(hist.data(), settings.struc_elem_length);
    hist.replace_data(filtered);
    if let Some(d) = dump.as_deref_mut() {
        d.write_stage("tophat filtered hash data", hist, stage)?;
    }
    stage += 1;

    let cutoff = freq_cutoff(hist.data(), settings.crossing_slope, settings.cutoff_anchor);
    let cleared = apply_cutoff(hist.data_mut(), cutoff);
    trace!("freq_cutoff {} cleared {} buckets", cutoff, cleared);
    if let Some(d) = dump.as_deref_mut() {
        d.write_stage(&format!("after freq_cutoff, which is: {}", cutoff), hist, stage)?;
    }

    let size = hist.len();
    let k = settings.stdev_multiplier;
    let mut range_begin = 0;
    let mut range_end = size;
    let mut estimate = ModeEstimate::undefined();

    for round in 0..settings.trim_loops {
        let stats = match index_stats(&hist.data()[range_begin..range_end], range_begin) {
            Some(stats) => stats,
            None => {
                trace!("trim loop {}: no support in [{}, {})", round, range_begin, range_end);
                estimate = ModeEstimate::undefined();
                break;
            }
        };

        range_begin = (stats.mean - k * stats.stdev - padding.below)
            .max(0.0)
            .floor() as usize;
        range_end = (stats.mean + k * stats.stdev + padding.above)
            .min(size as f64)
            .ceil() as usize;

        let mean_key = hist.index_to_key(stats.mean);
        let stdev_key = stats.stdev * hist.scale();
        estimate = ModeEstimate::from_key_stats(mean_key, stdev_key, domain);

        trace!(
            "trim loop {}: mean {} stdev {} range [{}, {})",
            round,
            mean_key,
            stdev_key,
            range_begin,
            range_end
        );
        if let Some(d) = dump.as_deref_mut() {
            let line = match domain {
                KeyDomain::Log => format!(
                    "loop: {}  mean: {} [{}]  stdev: {} [{}]  (mean-stdev): {} [{}]  (mean+stdev): {} [{}]  data_range_begin: {}  data_range_end: {}",
                    round,
                    mean_key,
                    estimate.centroid,
                    stdev_key,
                    estimate.centroid,
                    mean_key - stdev_key,
                    estimate.low,
                    mean_key + stdev_key,
                    estimate.high,
                    range_begin,
                    range_end
                ),
                KeyDomain::Linear => format!(
                    "loop: {}  mean: {}  stdev: {}  (mean-stdev): {}  (mean+stdev): {}  data_range_begin: {}  data_range_end: {}",
                    round,
                    mean_key,
                    stdev_key,
                    estimate.low,
                    estimate.high,
                    range_begin,
                    range_end
                ),
            };
            d.write_comment(&line)?;
        }
    }

    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::{Continuous, Normal};

    fn gaussian_histogram(center_index: f64, sigma: f64, half: usize) -> Histogram1D {
        let normal = Normal::new(center_index, sigma).unwrap();
        let mut hist = Histogram1D::new(0.005, half, 0.0);
        for i in 0..hist.len() {
            let x = i as f64;
            if (x - center_index).abs() <= 4.0 * sigma {
                hist.set(i, 100.0 * normal.pdf(x));
            }
        }
        hist
    }

    #[test]
    fn test_index_stats() {
        let stats = index_stats(&[0.0, 1.0, 0.0, 1.0, 0.0], 10).unwrap();
        assert!((stats.mean - 12.0).abs() < 1e-12);
        assert!((stats.stdev - 1.0).abs() < 1e-12);
        assert!(index_stats(&[0.0, 0.0], 0).is_none());
        assert!(index_stats(&[], 0).is_none());
    }

    #[test]
    fn test_freq_cutoff_histogram_edges() {
        // line from 4 with slope (1 - 4) / 5 / 3 = -0.2; sorted: 9, 4, 1, 0, 0
        let values = [4.0, 0.0, 9.0, 0.0, 1.0];
        let cutoff = freq_cutoff(&values, 3.0, CutoffAnchor::HistogramEdges);
        assert!((cutoff - 4.0).abs() < 1e-12);

        let mut v = values;
        apply_cutoff(&mut v, cutoff);
        assert_eq!(v, [4.0, 0.0, 9.0, 0.0, 0.0]);
    }

    #[test]
    fn test_freq_cutoff_zero_background_is_noop() {
        let mut values = vec![0.0; 21];
        values[9] = 2.0;
        values[10] = 5.0;
        values[11] = 2.0;
        assert_eq!(freq_cutoff(&values, 3.0, CutoffAnchor::HistogramEdges), 0.0);
        assert_eq!(freq_cutoff(&[], 3.0, CutoffAnchor::HistogramEdges), 0.0);
    }

    #[test]
    fn test_freq_cutoff_sorted_extremes() {
        let mut values = vec![1.0; 21];
        values[10] = 12.0;
        values[9] = 10.0;
        values[11] = 10.0;
        // line from 12 down with slope -11 / 63, the 10s fall below it at rank 1
        let cutoff = freq_cutoff(&values, 3.0, CutoffAnchor::SortedExtremes);
        assert!((cutoff - 12.0).abs() < 1e-12);

        apply_cutoff(&mut values, cutoff);
        assert_eq!(values.iter().filter(|&&v| v > 0.0).count(), 1);
    }

    #[test]
    fn test_freq_cutoff_sloped_edges() {
        // line from 10 with slope (1 - 10) / 5 / 3 = -0.6: 9.5, 9.0, 8.5 stay above it
        let values = [10.0, 9.5, 9.0, 8.5, 1.0];
        let cutoff = freq_cutoff(&values, 3.0, CutoffAnchor::HistogramEdges);
        assert!((cutoff - 8.5).abs() < 1e-12);
    }

    #[test]
    fn test_denoise_clean_gaussian_peak() {
        let center = 160.0;
        let mut hist = gaussian_histogram(center, 2.0, 140);
        let true_key = hist.index_to_key(center);

        let estimate = denoise(
            &mut hist,
            &DenoiseSettings::default(),
            KeyDomain::Linear,
            TrimPadding::NARROW,
            None,
        )
        .unwrap();

        assert!((estimate.centroid - true_key).abs() <= hist.scale());
        assert!(estimate.low < estimate.centroid);
        assert!(estimate.centroid < estimate.high);
    }

    #[test]
    fn test_denoise_log_domain_exponentiates() {
        let center = 100.0;
        let mut hist = gaussian_histogram(center, 3.0, 140);
        let true_scale = hist.index_to_key(center).exp();

        let estimate = denoise(
            &mut hist,
            &DenoiseSettings::default(),
            KeyDomain::Log,
            TrimPadding::NARROW,
            None,
        )
        .unwrap();

        assert!((estimate.centroid - true_scale).abs() < 0.005);
        assert!(estimate.low < estimate.centroid && estimate.centroid < estimate.high);
        assert!(estimate.contains(true_scale));
    }

    #[test]
    fn test_denoise_removes_baseline() {
        // peak at 60 on a slowly rising baseline
        let mut hist = Histogram1D::new(1.0, 100, 0.0);
        for i in 0..hist.len() {
            hist.set(i, 5.0 + i as f64 * 0.01);
        }
        for (offset, h) in [(-1i64, 20.0), (0, 40.0), (1, 20.0)] {
            let i = (160 + offset) as usize;
            hist.set(i, hist.get(i) + h);
        }

        let estimate = denoise(
            &mut hist,
            &DenoiseSettings::default(),
            KeyDomain::Linear,
            TrimPadding::NARROW,
            None,
        )
        .unwrap();

        // bucket 160 holds key 60
        assert!((estimate.centroid - 60.0).abs() < 1.0);
    }

    #[test]
    fn test_denoise_empty_histogram_is_undefined() {
        let mut hist = Histogram1D::new(1.0, 30, 0.0);
        let estimate = denoise(
            &mut hist,
            &DenoiseSettings::default(),
            KeyDomain::Linear,
            TrimPadding::NARROW,
            None,
        )
        .unwrap();
        assert!(!estimate.is_finite());
        assert!(!estimate.contains(0.0));
    }

    #[test]
    fn test_wide_padding_keeps_outer_shoulders() {
        // skewed peak around bucket 50 (key 0) with isolated shoulders at 46 and 54
        let peak = |hist: &mut Histogram1D| {
            for (i, v) in [
                (46, 0.6),
                (48, 1.0),
                (49, 3.0),
                (50, 6.0),
                (51, 2.0),
                (52, 1.0),
                (54, 0.8),
            ] {
                hist.set(i, v);
            }
        };
        let settings = DenoiseSettings::default();

        let mut narrow = Histogram1D::new(1.0, 50, 0.0);
        peak(&mut narrow);
        let narrow = denoise(
            &mut narrow,
            &settings,
            KeyDomain::Linear,
            TrimPadding::NARROW,
            None,
        )
        .unwrap();

        let mut wide = Histogram1D::new(1.0, 50, 0.0);
        peak(&mut wide);
        let wide = denoise(
            &mut wide,
            &settings,
            KeyDomain::Linear,
            TrimPadding::WIDE,
            None,
        )
        .unwrap();

        // narrow trim ends on [48, 53), weighted mean 49.923
        assert!((narrow.centroid + 1.0 / 13.0).abs() < 1e-9);
        // wide trim keeps [46, 55), every bucket stays in, weighted mean 49.986
        assert!((wide.centroid + 1.0 / 72.0).abs() < 1e-9);
        assert!(wide.high - wide.low > narrow.high - narrow.low);
    }
}
