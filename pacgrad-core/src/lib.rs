pub mod catalog;
pub mod config;
pub mod continuity;
pub mod coverage;
pub mod field;
pub mod loader;
pub mod pipeline;
pub mod region;
pub mod registry;
pub mod stitch;
pub mod time;
pub mod timeseries;
pub mod trend;
pub mod utils;

pub mod errors;
