pub mod azblob;
pub mod backend;
pub mod local;
pub mod mime;
pub mod s3;
pub mod store;
pub mod types;

pub use azblob::AzureBlobFs;
pub use backend::{BackendType, ObjectStoreGateway, S3Provider};
pub use local::{LocalFs, LocalScan};
pub use mime::{ExtensionMimeMapper, MimeMapper};
pub use s3::S3Fs;
pub use store::OpendalStore;
pub use types::*;
