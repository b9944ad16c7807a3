//! The single boundary between the resilience core and a remote backend.
//!
//! An [`Operation`] is one idempotent, read-style call (a vector-similarity query,
//! a keyword query, ...). The core may invoke it several times per request.
mod error;
pub use error::BackendError;

use std::{future::Future, sync::Arc};

use async_trait::async_trait;

/// One idempotent remote call.
///
/// Implementations must be safe to invoke repeatedly for the same request.
#[async_trait]
pub trait Operation<Req, T>: Send + Sync {
    async fn call(&self, request: &Req) -> Result<T, BackendError>;
}

/// Shared handle to an operation.
pub type OperationRef<Req, T> = Arc<dyn Operation<Req, T>>;

/// Adapter turning an async closure into an [`Operation`].
///
/// The closure receives an owned clone of the request.
///
/// ```rust
/// use resq_core::{BackendError, OperationFn, OperationRef};
///
/// let op: OperationRef<String, Vec<String>> = OperationFn::arc(|query: String| async move {
///     Ok::<_, BackendError>(vec![query])
/// });
/// ```
pub struct OperationFn<F> {
    f: F,
}

impl<F> OperationFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<Req, T, F, Fut> Operation<Req, T> for OperationFn<F>
where
    Req: Clone + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
{
    async fn call(&self, request: &Req) -> Result<T, BackendError> {
        (self.f)(request.clone()).await
    }
}
