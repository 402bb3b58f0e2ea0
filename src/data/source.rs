use async_trait::async_trait;

use crate::engine::EngineError;
use crate::types::PriceBar;

/// Where historical batches come from. `name` is whatever the caller was
/// given (a file name for the CSV source).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BarSource: Send + Sync {
    async fn fetch_bars(&self, name: &str) -> Result<Vec<PriceBar>, EngineError>;
}
