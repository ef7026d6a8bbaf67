//! Error types for the resource pool

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::pool::ResourceId;

/// Boxed error produced by a resource factory.
pub type FactoryError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    /// The factory failed while the pool tried to allocate a new resource.
    #[error("Resource construction failed: {0}")]
    ConstructionFailed(#[source] Arc<dyn Error + Send + Sync + 'static>),

    /// The released handle is not currently outstanding from this pool.
    #[error("Resource {resource} was not acquired from this pool")]
    InvalidRelease { resource: ResourceId },

    #[error("Pool has been disposed")]
    PoolDisposed,

    #[error("Acquire timed out after {0:?}")]
    Timeout(Duration),

    #[error("Pool is exhausted (max size {max_size})")]
    Exhausted { max_size: usize },
}

impl PoolError {
    pub(crate) fn construction_failed(err: FactoryError) -> Self {
        PoolError::ConstructionFailed(Arc::from(err))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
