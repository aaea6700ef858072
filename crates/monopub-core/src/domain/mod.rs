//! Domain types for monopub: package records, run options and errors.

pub mod error;
pub mod options;
pub mod package;

pub use error::{MonopubError, Result};
pub use options::RunOptions;
pub use package::{
    LoadException, Manifest, PackageRecord, PublishConfig, RegistryInfo, VcsStatus,
};
