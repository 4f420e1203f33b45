use serde::{Deserialize, Serialize};

/// A single element of a feature map.
///
/// `mz` is the windowing axis, `rt` the axis being aligned.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub mz: f64,
    pub rt: f64,
    pub intensity: f64,
    pub id: u64,
}

impl Point {
    pub fn new(mz: f64, rt: f64, intensity: f64, id: u64) -> Self {
        Point {
            mz,
            rt,
            intensity,
            id,
        }
    }
}
