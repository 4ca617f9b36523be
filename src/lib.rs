pub mod error;
pub mod height_field;
pub mod sampler;
pub mod scan;
pub mod types;
pub mod vol;
pub mod volume;

pub use height_field::HeightField;
pub use scan::{ScanEngine, ScanParams, extract_height_field};
pub use volume::Volume;
