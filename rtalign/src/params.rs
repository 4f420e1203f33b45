use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AlignmentError, Result};

/// Which values anchor the reference line of the frequency cutoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffAnchor {
    /// First and last bucket of the histogram as stored (background level at both ends).
    HistogramEdges,
    /// First and last value of the descending sorted copy.
    SortedExtremes,
}

/// Constants of the histogram denoising pipeline (tophat, frequency cutoff, mean/stdev trim).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseSettings {
    /// Length of the tophat structuring element in buckets (default: 21)
    pub struc_elem_length: usize,
    /// Divisor of the expected frequency line separating noise from enriched buckets (default: 3.0)
    pub crossing_slope: f64,
    /// End points of the expected frequency line (default: histogram edges)
    pub cutoff_anchor: CutoffAnchor,
    /// Half width of the trimmed range in standard deviations (default: 1.5)
    pub stdev_multiplier: f64,
    /// Number of mean/stdev trimming rounds (default: 3)
    pub trim_loops: usize,
}

impl Default for DenoiseSettings {
    fn default() -> Self {
        DenoiseSettings {
            struc_elem_length: 21,
            crossing_slope: 3.0,
            cutoff_anchor: CutoffAnchor::HistogramEdges,
            stdev_multiplier: 1.5,
            trim_loops: 3,
        }
    }
}

/// Parameters of the affine pose clustering superimposer.
///
/// Build with [`Default`] and override fields, or parse a (partial) JSON document with
/// [`SuperimposerParams::from_json_str`]. The superimposer validates once on construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuperimposerParams {
    /// Maximum m/z deviation of corresponding elements in different maps (default: 0.5)
    pub mz_pair_max_distance: f64,
    /// Minimum RT separation of a pair, as a fraction of the total RT interval (default: 0.1)
    pub rt_pair_distance_fraction: f64,
    /// Maximum number of elements per map, selected by intensity; -1 uses all (default: 2000)
    pub num_used_points: i64,
    /// Bucket width of the log-scaling histogram (default: 0.005)
    pub scaling_bucket_size: f64,
    /// Bucket width of the boundary shift histograms (default: 3.0)
    pub shift_bucket_size: f64,
    /// Maximal shift considered during histogramming, both directions (default: 1000.0)
    pub max_shift: f64,
    /// Maximal scaling considered; the minimal scaling is its reciprocal (default: 2.0)
    pub max_scaling: f64,
    /// Weight subtracted from every m/z window weight; dense windows drop out (default: 0.1)
    pub window_weight_baseline: f64,
    /// Base file name for hash table bucket dumps, a serial number is appended
    pub dump_buckets: Option<PathBuf>,
    /// Base file name for hashed pair dumps (large!), a serial number is appended
    pub dump_pairs: Option<PathBuf>,
    pub denoise: DenoiseSettings,
}

impl Default for SuperimposerParams {
    fn default() -> Self {
        SuperimposerParams {
            mz_pair_max_distance: 0.5,
            rt_pair_distance_fraction: 0.1,
            num_used_points: 2000,
            scaling_bucket_size: 0.005,
            shift_bucket_size: 3.0,
            max_shift: 1000.0,
            max_scaling: 2.0,
            window_weight_baseline: 0.1,
            dump_buckets: None,
            dump_pairs: None,
            denoise: DenoiseSettings::default(),
        }
    }
}

impl SuperimposerParams {
    /// Parse parameters from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: SuperimposerParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of points kept per map, `None` if all points are used.
    pub fn used_points_limit(&self) -> Option<usize> {
        if self.num_used_points < 0 {
            None
        } else {
            Some(self.num_used_points as usize)
        }
    }

    /// Check every parameter against its admissible range.
    pub fn validate(&self) -> Result<()> {
        check(
            "mz_pair_max_distance",
            self.mz_pair_max_distance >= 0.0,
            "must be >= 0",
        )?;
        check(
            "rt_pair_distance_fraction",
            (0.0..=1.0).contains(&self.rt_pair_distance_fraction),
            "must lie in [0, 1]",
        )?;
        check("num_used_points", self.num_used_points >= -1, "must be >= -1")?;
        check(
            "scaling_bucket_size",
            self.scaling_bucket_size > 0.0 && self.scaling_bucket_size.is_finite(),
            "must be a finite value > 0",
        )?;
        check(
            "shift_bucket_size",
            self.shift_bucket_size > 0.0 && self.shift_bucket_size.is_finite(),
            "must be a finite value > 0",
        )?;
        check(
            "max_shift",
            self.max_shift >= 0.0 && self.max_shift.is_finite(),
            "must be a finite value >= 0",
        )?;
        check(
            "max_scaling",
            self.max_scaling >= 1.0 && self.max_scaling.is_finite(),
            "must be a finite value >= 1",
        )?;
        check(
            "window_weight_baseline",
            (0.0..1.0).contains(&self.window_weight_baseline),
            "must lie in [0, 1)",
        )?;
        check(
            "denoise.struc_elem_length",
            self.denoise.struc_elem_length >= 1,
            "must be >= 1",
        )?;
        check(
            "denoise.crossing_slope",
            self.denoise.crossing_slope > 0.0,
            "must be > 0",
        )?;
        check(
            "denoise.stdev_multiplier",
            self.denoise.stdev_multiplier > 0.0,
            "must be > 0",
        )?;
        check("denoise.trim_loops", self.denoise.trim_loops >= 1, "must be >= 1")?;
        Ok(())
    }
}

fn check(name: &'static str, ok: bool, reason: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(AlignmentError::InvalidParameter {
            name,
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = SuperimposerParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.num_used_points, 2000);
        assert!((params.mz_pair_max_distance - 0.5).abs() < 1e-12);
        assert_eq!(params.denoise.struc_elem_length, 21);
        assert_eq!(params.denoise.trim_loops, 3);
        assert_eq!(params.denoise.cutoff_anchor, CutoffAnchor::HistogramEdges);
    }

    #[test]
    fn test_used_points_limit() {
        let mut params = SuperimposerParams::default();
        assert_eq!(params.used_points_limit(), Some(2000));
        params.num_used_points = -1;
        assert_eq!(params.used_points_limit(), None);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let params = SuperimposerParams::from_json_str(
            r#"{ "max_scaling": 1.5, "denoise": { "cutoff_anchor": "sorted_extremes" } }"#,
        )
        .unwrap();
        assert!((params.max_scaling - 1.5).abs() < 1e-12);
        assert!((params.shift_bucket_size - 3.0).abs() < 1e-12);
        assert_eq!(params.denoise.cutoff_anchor, CutoffAnchor::SortedExtremes);
        assert_eq!(params.denoise.trim_loops, 3);
    }

    #[test]
    fn test_json_round_trip_keeps_dump_paths() {
        let mut params = SuperimposerParams::default();
        params.dump_buckets = Some(PathBuf::from("/tmp/buckets"));
        let json = params.to_json_string().unwrap();
        let parsed = SuperimposerParams::from_json_str(&json).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let result = SuperimposerParams::from_json_str(r#"{ "max_scaling": 0.5 }"#);
        assert!(matches!(
            result,
            Err(AlignmentError::InvalidParameter { name: "max_scaling", .. })
        ));

        let mut params = SuperimposerParams::default();
        params.rt_pair_distance_fraction = 1.5;
        assert!(params.validate().is_err());

        params = SuperimposerParams::default();
        params.num_used_points = -2;
        assert!(params.validate().is_err());

        params = SuperimposerParams::default();
        params.scaling_bucket_size = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let result = SuperimposerParams::from_json_str("{ not json");
        assert!(matches!(result, Err(AlignmentError::Json(_))));
    }
}
