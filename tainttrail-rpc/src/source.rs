//! The block-fetching seam between the engine and the node.

use async_trait::async_trait;

use crate::client::NodeClient;
use crate::error::Result;
use crate::types::VerboseBlock;

/// Anything that can serve verbose-with-prevouts blocks by height.
///
/// The scanner and seed builder depend on this trait rather than on
/// [`NodeClient`] directly; tests implement it over synthetic chains.
#[async_trait]
pub trait BlockSource: Send + Sync + 'static {
    /// Height of the current chain tip.
    async fn chain_height(&self) -> Result<u64>;

    /// The block at `height`, every input annotated with its prevout.
    async fn block_at(&self, height: u64) -> Result<VerboseBlock>;
}

#[async_trait]
impl BlockSource for NodeClient {
    async fn chain_height(&self) -> Result<u64> {
        Ok(self.chain_info().await?.height)
    }

    async fn block_at(&self, height: u64) -> Result<VerboseBlock> {
        NodeClient::block_at(self, height).await
    }
}
