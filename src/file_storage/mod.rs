//! # File Storage
//!
//! Upload binary objects into named buckets and resolve public URLs for them.

pub mod backend;
pub mod local;
pub mod object;
pub mod rest;

pub use backend::StorageBackend;
pub use local::LocalStorage;
pub use object::{
    calculate_checksum, guess_content_type, validate_location, ObjectMetadata, StoredObject,
    UploadOptions,
};
pub use rest::RestStorage;
