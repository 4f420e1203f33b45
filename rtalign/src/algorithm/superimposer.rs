//! Affine retention time superimposer based on pose clustering.
//!
//! Every pair of model points is matched against every pair of scene points with similar
//! m/z; each such correspondence implies an affine RT transform. The transforms are voted
//! into hash tables and the dominant cluster is taken as the result. This happens in two
//! rounds: the first one estimates the scaling alone, the second one only hashes
//! correspondences whose scaling lies within one standard deviation of that estimate and
//! votes for the images of both ends of the RT interval.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::algorithm::denoise::{denoise, KeyDomain, ModeEstimate, TrimPadding};
use crate::algorithm::histogram::Histogram1D;
use crate::algorithm::pair_matching::{PairMatcher, PairingSettings};
use crate::data::point_cloud::PointCloud;
use crate::data::transform::LinearTransform;
use crate::error::{AlignmentError, Result};
use crate::io::dump::{BucketDump, PairDump};
use crate::params::SuperimposerParams;
use crate::progress::{NoProgress, ProgressReporter};

/// Result of one pairwise superposition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoseEstimate {
    /// Maps scene RTs onto model RTs.
    pub transform: LinearTransform,
    /// Round one scaling estimate, its window filters round two.
    pub scale: ModeEstimate,
    /// Scaling estimate of the correspondences hashed in round two.
    pub refined_scale: ModeEstimate,
    pub rt_low_image: ModeEstimate,
    pub rt_high_image: ModeEstimate,
    pub rt_low: f64,
    pub rt_high: f64,
    pub round_one_candidates: usize,
    pub round_two_candidates: usize,
    /// Suffix of the dump files written by this run.
    pub serial: usize,
}

/// Hash tables filled in round two.
struct BoundaryHashes {
    refined_scale: Histogram1D,
    low: Histogram1D,
    high: Histogram1D,
}

pub struct PoseClusteringAffineSuperimposer {
    params: SuperimposerParams,
    serial: AtomicUsize,
}

impl PoseClusteringAffineSuperimposer {
    pub fn new(params: SuperimposerParams) -> Result<Self> {
        params.validate()?;
        Ok(PoseClusteringAffineSuperimposer {
            params,
            serial: AtomicUsize::new(0),
        })
    }

    pub fn params(&self) -> &SuperimposerParams {
        &self.params
    }

    /// Number of runs started so far, which is also the serial of the latest run.
    pub fn runs_started(&self) -> usize {
        self.serial.load(Ordering::SeqCst)
    }

    /// Estimate the transform mapping `scene` RTs onto `model` RTs.
    pub fn run(&self, model: &PointCloud, scene: &PointCloud) -> Result<PoseEstimate> {
        self.run_with_progress(model, scene, &mut NoProgress)
    }

    /// Takes exactly two maps (model first) and appends the transform of the scene to `out`.
    pub fn run_maps(&self, maps: &[PointCloud], out: &mut Vec<LinearTransform>) -> Result<()> {
        if maps.len() != 2 {
            return Err(AlignmentError::InvalidArgument(format!(
                "Exactly two input maps are required, got {}",
                maps.len()
            )));
        }
        let estimate = self.run(&maps[0], &maps[1])?;
        out.push(estimate.transform);
        Ok(())
    }

    /// Independent pairwise runs `(model, scene)` executed in parallel.
    pub fn run_batch(&self, pairs: &[(PointCloud, PointCloud)]) -> Vec<Result<PoseEstimate>> {
        pairs
            .par_iter()
            .map(|(model, scene)| self.run(model, scene))
            .collect()
    }

    pub fn run_with_progress(
        &self,
        model: &PointCloud,
        scene: &PointCloud,
        progress: &mut dyn ProgressReporter,
    ) -> Result<PoseEstimate> {
        if model.is_empty() || scene.is_empty() {
            return Err(AlignmentError::InvalidArgument(
                "One of the input maps is empty! This is not allowed!".to_string(),
            ));
        }

        let serial = self.serial.fetch_add(1, Ordering::SeqCst) + 1;
        progress.start("affine pose clustering", 0, 100);
        let result = self.estimate(model, scene, serial, progress);
        if let Err(e) = &result {
            warn!("run {}: {}", serial, e);
        }
        progress.end();
        result
    }

    fn estimate(
        &self,
        model: &PointCloud,
        scene: &PointCloud,
        serial: usize,
        progress: &mut dyn ProgressReporter,
    ) -> Result<PoseEstimate> {
        let p = &self.params;

        // RT interval of both maps, before truncation
        let rt_low = (model.rt_min + scene.rt_min) / 2.0;
        let rt_high = (model.rt_max + scene.rt_max) / 2.0;

        let limit = p.used_points_limit();
        let model = model.truncated(limit);
        let scene = scene.truncated(limit);
        debug!(
            "run {}: using {} model and {} scene points, rt interval [{}, {}]",
            serial,
            model.len(),
            scene.len(),
            rt_low,
            rt_high
        );
        progress.set(10);

        let matcher = PairMatcher::new(
            &model,
            &scene,
            PairingSettings {
                mz_pair_max_distance: p.mz_pair_max_distance,
                rt_pair_min_distance: p.rt_pair_distance_fraction * (rt_high - rt_low),
                window_weight_baseline: p.window_weight_baseline,
            },
        );
        debug!("run {}: intensity ratio {}", serial, matcher.intensity_ratio());
        progress.set(20);

        // round one: scaling only
        let (mut scale_hash, round_one_candidates) =
            self.hash_scaling(&matcher, &model, &scene, serial)?;
        debug!("run {}: round one hashed {} candidates", serial, round_one_candidates);
        progress.set(30);

        let scale = {
            let mut dump = self.bucket_dump("scale", serial, "rt scale")?;
            let scale = denoise(
                &mut scale_hash,
                &p.denoise,
                KeyDomain::Log,
                TrimPadding::NARROW,
                dump.as_mut(),
            )?;
            if let Some(d) = dump {
                d.finish()?;
            }
            scale
        };
        debug!(
            "run {}: scale {} in [{}, {}]",
            serial, scale.centroid, scale.low, scale.high
        );
        progress.set(40);

        // round two: boundary images of the candidates agreeing with the scaling
        let (mut hashes, round_two_candidates) =
            self.hash_boundaries(&matcher, &model, &scene, &scale, rt_low, rt_high, serial)?;
        debug!("run {}: round two hashed {} candidates", serial, round_two_candidates);
        progress.set(50);

        let refined_scale = denoise(
            &mut hashes.refined_scale,
            &p.denoise,
            KeyDomain::Log,
            TrimPadding::NARROW,
            None,
        )?;
        let rt_low_image = self.denoise_boundary(
            &mut hashes.low,
            TrimPadding::NARROW,
            "low",
            "rt low",
            serial,
        )?;
        // the high table keeps one more bucket on either side of its trimmed range
        let rt_high_image = self.denoise_boundary(
            &mut hashes.high,
            TrimPadding::WIDE,
            "high",
            "rt high",
            serial,
        )?;
        debug!(
            "run {}: refined scale {}, rt low image {}, rt high image {}",
            serial, refined_scale.centroid, rt_low_image.centroid, rt_high_image.centroid
        );
        progress.set(80);

        let transform = LinearTransform::from_boundary_images(
            rt_low,
            rt_high,
            rt_low_image.centroid,
            rt_high_image.centroid,
        )?;
        info!(
            "run {}: rt transform slope {} intercept {}",
            serial, transform.slope, transform.intercept
        );
        progress.set(100);

        Ok(PoseEstimate {
            transform,
            scale,
            refined_scale,
            rt_low_image,
            rt_high_image,
            rt_low,
            rt_high,
            round_one_candidates,
            round_two_candidates,
            serial,
        })
    }

    fn hash_scaling(
        &self,
        matcher: &PairMatcher,
        model: &PointCloud,
        scene: &PointCloud,
        serial: usize,
    ) -> Result<(Histogram1D, usize)> {
        let p = &self.params;
        let mut hash = Histogram1D::for_log_scaling(p.max_scaling, p.scaling_bucket_size);
        let mut dump = self.pair_dump("phase_one", serial)?;

        let hashed = matcher.try_for_each_candidate(|c| {
            hash.add_value(c.scaling.ln(), c.weight);
            if let Some(d) = dump.as_mut() {
                d.write(c, model, scene)?;
            }
            Ok::<(), AlignmentError>(())
        })?;

        if let Some(d) = dump {
            d.finish()?;
        }
        Ok((hash, hashed))
    }

    #[allow(clippy::too_many_arguments)]
    fn hash_boundaries(
        &self,
        matcher: &PairMatcher,
        model: &PointCloud,
        scene: &PointCloud,
        scale: &ModeEstimate,
        rt_low: f64,
        rt_high: f64,
        serial: usize,
    ) -> Result<(BoundaryHashes, usize)> {
        let p = &self.params;
        let mut hashes = BoundaryHashes {
            refined_scale: Histogram1D::for_log_scaling(p.max_scaling, p.scaling_bucket_size),
            low: Histogram1D::for_boundary(
                rt_low,
                p.max_shift,
                p.max_scaling,
                p.shift_bucket_size,
            ),
            high: Histogram1D::for_boundary(
                rt_high,
                p.max_shift,
                p.max_scaling,
                p.shift_bucket_size,
            ),
        };
        let mut dump = self.pair_dump("phase_two", serial)?;
        let mut hashed = 0;

        matcher.try_for_each_candidate(|c| {
            // an undefined scale window admits nothing
            if !scale.contains(c.scaling) {
                return Ok(());
            }
            hashes.refined_scale.add_value(c.scaling.ln(), c.weight);
            hashes.low.add_value(c.shift + rt_low * c.scaling, c.weight);
            hashes.high.add_value(c.shift + rt_high * c.scaling, c.weight);
            hashed += 1;
            if let Some(d) = dump.as_mut() {
                d.write(c, model, scene)?;
            }
            Ok::<(), AlignmentError>(())
        })?;

        if let Some(d) = dump {
            d.finish()?;
        }
        Ok((hashes, hashed))
    }

    fn denoise_boundary(
        &self,
        hash: &mut Histogram1D,
        padding: TrimPadding,
        tag: &str,
        title: &str,
        serial: usize,
    ) -> Result<ModeEstimate> {
        let mut dump = self.bucket_dump(tag, serial, title)?;
        let estimate = denoise(
            hash,
            &self.params.denoise,
            KeyDomain::Linear,
            padding,
            dump.as_mut(),
        )?;
        if let Some(d) = dump {
            d.finish()?;
        }
        Ok(estimate)
    }

    fn bucket_dump(&self, tag: &str, serial: usize, title: &str) -> Result<Option<BucketDump>> {
        self.params
            .dump_buckets
            .as_deref()
            .map(|base| BucketDump::create(base, tag, serial, title))
            .transpose()
    }

    fn pair_dump(&self, phase: &str, serial: usize) -> Result<Option<PairDump>> {
        self.params
            .dump_pairs
            .as_deref()
            .map(|base| PairDump::create(base, phase, serial))
            .transpose()
    }
}
