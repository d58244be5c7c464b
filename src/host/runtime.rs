//! Extension runtime surface

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait RuntimeHost: Send + Sync {
    /// Open the options surface (job management lives there)
    async fn open_options_page(&self) -> Result<()>;

    /// Version of the running extension
    fn version(&self) -> String;
}
