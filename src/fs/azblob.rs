use opendal::{services::Azblob, Operator};

use crate::error::{Result, SyncError};
use crate::fs::backend::BackendType;
use crate::fs::store::OpendalStore;

/// Connection string for the local storage emulator (Azurite)
pub const DEVELOPMENT_CONNECTION_STRING: &str = "UseDevelopmentStorage=true";

/// Azure Blob Storage backend using OpenDAL
pub struct AzureBlobFs;

impl AzureBlobFs {
    /// Open `container` using an Azure storage connection string.
    ///
    /// Accepts the full `DefaultEndpointsProtocol=...;AccountName=...;AccountKey=...`
    /// form, SAS connection strings, and `UseDevelopmentStorage=true` for the emulator.
    pub fn connect(connection_string: &str, container: &str) -> Result<OpendalStore> {
        if container.trim().is_empty() {
            return Err(SyncError::invalid_argument("container name must not be blank"));
        }

        let builder = Azblob::from_connection_string(connection_string)
            .map_err(|e| {
                SyncError::invalid_argument(format!("invalid storage connection string: {}", e))
            })?
            .container(container);

        let operator = Operator::new(builder)
            .map_err(|e| SyncError::remote("connect", container, e))?
            .finish();

        Ok(OpendalStore::new(
            operator,
            BackendType::Azure {
                container: container.to_string(),
            },
        ))
    }
}
