#![forbid(unsafe_code)]

pub mod descriptor;
pub mod error;
pub mod registry;

pub use descriptor::{parse_descriptor, PackageInfo, PackageVersionInfo};
pub use error::RegistryError;
pub use registry::Registry;
