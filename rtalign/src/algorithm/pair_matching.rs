//! Correspondence search between two m/z sorted point clouds.
//!
//! A candidate maps a model pair `(i, j)` onto a scene pair `(k, l)` where `k` lies in the
//! m/z window of `i` and `l` in the m/z window of `j`. Each candidate implies an affine RT
//! transform (scaling and shift) and carries a weight derived from intensity similarity
//! and window crowding. Candidates are handed to a visitor as they are found; the search
//! produces O(n^2 w^2) of them, so none are stored.

use std::convert::Infallible;

use crate::algorithm::window::MzWindow;
use crate::data::point::Point;
use crate::data::point_cloud::PointCloud;

/// One hashed correspondence `(i, j) -> (k, l)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
    /// `(rt_j - rt_i) / (rt_l - rt_k)`
    pub scaling: f64,
    /// `rt_i - rt_k * scaling`
    pub shift: f64,
    pub weight: f64,
}

/// Knobs of the correspondence search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairingSettings {
    pub mz_pair_max_distance: f64,
    pub rt_pair_min_distance: f64,
    pub window_weight_baseline: f64,
}

/// Intensity ratio of two points in `(0, 1]`, or 0 if both are empty.
#[inline]
pub fn intensity_similarity(a: f64, b: f64) -> f64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    if hi > 0.0 {
        lo / hi
    } else {
        0.0
    }
}

pub struct PairMatcher<'a> {
    model: &'a [Point],
    scene: &'a [Point],
    settings: PairingSettings,
    intensity_ratio: f64,
}

impl<'a> PairMatcher<'a> {
    /// Both clouds must be sorted by m/z.
    pub fn new(model: &'a PointCloud, scene: &'a PointCloud, settings: PairingSettings) -> Self {
        debug_assert!(model.is_sorted_by_mz() && scene.is_sorted_by_mz());

        let total_scene = scene.total_intensity();
        let intensity_ratio = if total_scene > 0.0 {
            model.total_intensity() / total_scene
        } else {
            1.0
        };

        PairMatcher {
            model: &model.points,
            scene: &scene.points,
            settings,
            intensity_ratio,
        }
    }

    /// Scene intensities are multiplied by this before comparing them to model intensities.
    pub fn intensity_ratio(&self) -> f64 {
        self.intensity_ratio
    }

    #[inline]
    fn similarity(&self, model_index: usize, scene_index: usize) -> f64 {
        intensity_similarity(
            self.model[model_index].intensity,
            self.scene[scene_index].intensity * self.intensity_ratio,
        )
    }

    /// Call `visit` for every candidate, returning how many were produced.
    pub fn for_each_candidate<F>(&self, mut visit: F) -> usize
    where
        F: FnMut(&Candidate),
    {
        let result = self.try_for_each_candidate(|c| {
            visit(c);
            Ok::<(), Infallible>(())
        });
        match result {
            Ok(produced) => produced,
            Err(never) => match never {},
        }
    }

    /// Like [`PairMatcher::for_each_candidate`], stopping at the first error of `visit`.
    pub fn try_for_each_candidate<F, E>(&self, mut visit: F) -> Result<usize, E>
    where
        F: FnMut(&Candidate) -> Result<(), E>,
    {
        let n_model = self.model.len();
        if n_model < 2 {
            return Ok(0);
        }

        let d = self.settings.mz_pair_max_distance;
        let baseline = self.settings.window_weight_baseline;
        let mut produced = 0;

        let mut i_win = MzWindow::default();
        let mut k_win = MzWindow::default();

        for i in 0..n_model - 1 {
            let mz_i = self.model[i].mz;

            i_win.advance(self.model, mz_i, d);
            let i_weight = i_win.weight(baseline);
            if i_weight <= 0.0 {
                continue;
            }

            k_win.advance(self.scene, mz_i, d);
            let k_weight = k_win.weight(baseline);
            if k_weight <= 0.0 {
                continue;
            }

            for k in k_win.range() {
                let similarity_ik = self.similarity(i, k) * i_weight * k_weight;
                produced +=
                    self.visit_second_pairs(i, k, &i_win, &k_win, similarity_ik, &mut visit)?;
            }
        }

        Ok(produced)
    }

    /// Extend the anchor pair `i -> k` by every admissible `j -> l`.
    fn visit_second_pairs<F, E>(
        &self,
        i: usize,
        k: usize,
        i_win: &MzWindow,
        k_win: &MzWindow,
        similarity_ik: f64,
        visit: &mut F,
    ) -> Result<usize, E>
    where
        F: FnMut(&Candidate) -> Result<(), E>,
    {
        let d = self.settings.mz_pair_max_distance;
        let min_distance = self.settings.rt_pair_min_distance;
        let baseline = self.settings.window_weight_baseline;

        let rt_i = self.model[i].rt;
        let rt_k = self.scene[k].rt;
        let mut produced = 0;

        // j > i, hence mz_j >= mz_i and both windows can start from the anchor windows
        let mut j_win = MzWindow::new(i_win.low, i_win.low);
        let mut l_win = *k_win;

        for j in i + 1..self.model.len() {
            let diff_model = self.model[j].rt - rt_i;
            if diff_model == 0.0 || diff_model.abs() < min_distance {
                continue;
            }

            let mz_j = self.model[j].mz;
            j_win.advance(self.model, mz_j, d);
            let j_weight = j_win.weight(baseline);
            if j_weight <= 0.0 {
                continue;
            }

            l_win.advance(self.scene, mz_j, d);
            let l_weight = l_win.weight(baseline);
            if l_weight <= 0.0 {
                continue;
            }

            for l in l_win.range() {
                let diff_scene = self.scene[l].rt - rt_k;

                // no pairs with equal RTs, no crossed mappings
                if diff_scene == 0.0
                    || diff_scene.abs() < min_distance
                    || (diff_model > 0.0) != (diff_scene > 0.0)
                {
                    continue;
                }

                let scaling = diff_model / diff_scene;
                let shift = rt_i - rt_k * scaling;
                let similarity_jl = self.similarity(j, l) * j_weight * l_weight;

                visit(&Candidate {
                    i,
                    j,
                    k,
                    l,
                    scaling,
                    shift,
                    weight: similarity_ik * similarity_jl,
                })?;
                produced += 1;
            }
        }

        Ok(produced)
    }
}
