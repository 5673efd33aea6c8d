pub mod acquisition_config;

pub use acquisition_config::{load_acquisition_config, AcquisitionConfig};
