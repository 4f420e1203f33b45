use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::data::point::Point;
use crate::data::transform::LinearTransform;

/// The elements of one input map together with the RT extent of that map.
///
/// The RT extrema describe the source map and are kept when the cloud is truncated,
/// so callers that know the full map range can supply it with [`PointCloud::with_rt_range`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub rt_min: f64,
    pub rt_max: f64,
}

impl PointCloud {
    /// Create a cloud and derive the RT range from its points (`0..0` when empty).
    pub fn new(points: Vec<Point>) -> Self {
        let (rt_min, rt_max) = match points.iter().map(|p| p.rt).minmax_by(|a, b| {
            a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
        }) {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(rt) => (rt, rt),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        PointCloud {
            points,
            rt_min,
            rt_max,
        }
    }

    /// Create a cloud with a precomputed RT range of its source map.
    pub fn with_rt_range(points: Vec<Point>, rt_min: f64, rt_max: f64) -> Self {
        PointCloud {
            points,
            rt_min,
            rt_max,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_intensity(&self) -> f64 {
        self.points.iter().map(|p| p.intensity).sum()
    }

    /// Keep the `limit` most intense points and sort them by m/z.
    ///
    /// Both sorts are stable: points of equal intensity keep their input order when the
    /// intensity cut is made, points of equal m/z keep their intensity order. With `None`
    /// (or a limit not smaller than the cloud) the cloud is only re-sorted by m/z.
    /// The RT range of the source map is carried over unchanged.
    pub fn truncated(&self, limit: Option<usize>) -> PointCloud {
        let mut points = self.points.clone();

        if let Some(limit) = limit {
            if points.len() > limit {
                points.sort_by(|a, b| {
                    b.intensity
                        .partial_cmp(&a.intensity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                points.truncate(limit);
            }
        }

        points.sort_by(|a, b| a.mz.partial_cmp(&b.mz).unwrap_or(std::cmp::Ordering::Equal));

        PointCloud {
            points,
            rt_min: self.rt_min,
            rt_max: self.rt_max,
        }
    }

    /// Map every RT (and the RT range) through `transform`.
    pub fn transformed_rt(&self, transform: &LinearTransform) -> PointCloud {
        let points = self
            .points
            .iter()
            .map(|p| Point {
                rt: transform.apply(p.rt),
                ..*p
            })
            .collect();
        let (a, b) = (transform.apply(self.rt_min), transform.apply(self.rt_max));
        PointCloud {
            points,
            rt_min: a.min(b),
            rt_max: a.max(b),
        }
    }

    pub fn is_sorted_by_mz(&self) -> bool {
        self.points.windows(2).all(|w| w[0].mz <= w[1].mz)
    }
}

impl From<Vec<Point>> for PointCloud {
    fn from(points: Vec<Point>) -> Self {
        PointCloud::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> PointCloud {
        PointCloud::new(vec![
            Point::new(400.0, 50.0, 10.0, 0),
            Point::new(200.0, 10.0, 50.0, 1),
            Point::new(300.0, 90.0, 30.0, 2),
            Point::new(100.0, 30.0, 100.0, 3),
            Point::new(500.0, 70.0, 20.0, 4),
        ])
    }

    #[test]
    fn test_rt_range_from_points() {
        let c = cloud();
        assert_eq!(c.rt_min, 10.0);
        assert_eq!(c.rt_max, 90.0);
        assert_eq!(PointCloud::new(vec![]).rt_min, 0.0);
    }

    #[test]
    fn test_truncated_keeps_top_intensity_sorted_by_mz() {
        let c = cloud().truncated(Some(3));

        // top 3 by intensity: 100 (100), 200 (50), 300 (30)
        let ids: Vec<u64> = c.points.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(c.is_sorted_by_mz());
        // RT range of the source map survives truncation
        assert_eq!(c.rt_min, 10.0);
        assert_eq!(c.rt_max, 90.0);
    }

    #[test]
    fn test_truncated_tie_break_is_input_order() {
        let c = PointCloud::new(vec![
            Point::new(300.0, 1.0, 5.0, 0),
            Point::new(100.0, 2.0, 5.0, 1),
            Point::new(200.0, 3.0, 5.0, 2),
            Point::new(400.0, 4.0, 9.0, 3),
        ]);
        let ids: Vec<u64> = c.truncated(Some(2)).points.iter().map(|p| p.id).collect();
        // 3 wins on intensity, 0 wins the tie by input order
        assert_eq!(ids, vec![0, 3]);
    }

    #[test]
    fn test_no_limit_only_sorts() {
        let c = cloud().truncated(None);
        assert_eq!(c.len(), 5);
        assert!(c.is_sorted_by_mz());

        let c = cloud().truncated(Some(10));
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn test_transformed_rt() {
        let t = LinearTransform::new(2.0, 1.0);
        let c = cloud().transformed_rt(&t);
        assert_eq!(c.points[0].rt, 101.0);
        assert_eq!(c.points[0].mz, 400.0);
        assert_eq!(c.rt_min, 21.0);
        assert_eq!(c.rt_max, 181.0);
    }
}
