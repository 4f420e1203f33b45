// error and configuration
pub mod error;
pub mod params;
pub mod progress;

// data module
pub mod data {
    pub mod point;
    pub mod point_cloud;
    pub mod transform;
}

// algorithm module
pub mod algorithm {
    pub mod window;
    pub mod histogram;
    pub mod pair_matching;
    pub mod tophat;
    pub mod denoise;
    pub mod superimposer;
}

// debug output
pub mod io {
    pub mod dump;
}

pub use algorithm::superimposer::{PoseClusteringAffineSuperimposer, PoseEstimate};
pub use data::point::Point;
pub use data::point_cloud::PointCloud;
pub use data::transform::LinearTransform;
pub use error::{AlignmentError, Result};
pub use params::SuperimposerParams;
