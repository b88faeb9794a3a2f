//! Wait-time estimation: regression models, the model registry and the
//! blending estimator

mod model;
mod registry;
mod wait_time;

pub use model::{LinearModel, RegressionModel};
pub use registry::ModelRegistry;
pub use wait_time::{moving_average, WaitTimeEstimator};
