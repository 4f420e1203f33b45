use std::ops::Range;

use crate::data::point::Point;

/// Half-open index range `[low, high)` of the points of an m/z sorted slice that lie within
/// `max_distance` of a centre m/z.
///
/// The window is a sliding cursor: [`MzWindow::advance`] only ever moves both bounds forward,
/// so sweeping the centre over increasing m/z costs amortised O(n) for the whole sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MzWindow {
    pub low: usize,
    pub high: usize,
}

impl MzWindow {
    pub fn new(low: usize, high: usize) -> Self {
        MzWindow { low, high }
    }

    /// Move the window onto `center_mz`. The centre must not decrease between calls.
    #[inline]
    pub fn advance(&mut self, points: &[Point], center_mz: f64, max_distance: f64) {
        let n = points.len();
        while self.low < n && points[self.low].mz < center_mz - max_distance {
            self.low += 1;
        }
        while self.high < n && points[self.high].mz <= center_mz + max_distance {
            self.high += 1;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.high.saturating_sub(self.low)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.low..self.high.max(self.low)
    }

    /// Unit weight shared by the window members, minus `baseline`.
    ///
    /// Crowded windows get a weight `<= 0` and are skipped by the pair search; an empty
    /// window has weight 0.
    #[inline]
    pub fn weight(&self, baseline: f64) -> f64 {
        match self.len() {
            0 => 0.0,
            len => 1.0 / len as f64 - baseline,
        }
    }
}
