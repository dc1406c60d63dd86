// Source trait for battery telemetry
use crate::domain::reading::Reading;
use async_trait::async_trait;

#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Take one reading from the battery pack
    async fn read(&self) -> anyhow::Result<Reading>;
}
