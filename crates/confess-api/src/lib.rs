pub mod error;
pub mod feed;
pub mod moderation;
pub mod policy;
pub mod submissions;
pub mod votes;

use std::sync::Arc;

use confess_db::{Database, StoreError};
use tracing::error;

use crate::error::ApiError;
use crate::policy::Policy;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub policy: Policy,
}

/// Run a store call off the async runtime. rusqlite is blocking, so
/// every handler funnels its DB work through here.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError(StoreError::Unavailable(format!("task join error: {}", e)))
        })?
        .map_err(ApiError)
}
