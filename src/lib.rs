pub mod data_structs;
pub mod errors;
pub mod io;
pub mod tools;
pub mod utils;

pub use crate::data_structs::array_design::ArrayDesign;
pub use crate::data_structs::probes::{Channel, Manifest, ProbeSubtype, SubtypeIndices};
pub use crate::data_structs::raw::{RawIntensities, SampleIntensities};
pub use crate::errors::MethylNormError;
pub use crate::tools::PreprocessMethod;
