//! Tower integration.
//!
//! [`DispatchService`] exposes one service type of a [`Pipeline`] as a
//! `tower::Service`, so middleware such as timeouts or concurrency limits can
//! wrap dispatch:
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use tower::timeout::TimeoutLayer;
//!
//! let svc = ServiceBuilder::new()
//!     .layer(TimeoutLayer::new(Duration::from_secs(5)))
//!     .service(pipeline.service::<Greeting>());
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::task::{Context, Poll};

use tower::Service as TowerService;

use crate::error::PipelineError;
use crate::executor::DispatchFuture;
use crate::pipeline::Pipeline;
use crate::service::ServiceType;

/// A `tower::Service` dispatching requests through service type `S`.
///
/// Each call runs one asynchronous walk on the pipeline's executor.
pub struct DispatchService<S> {
    pipeline: Pipeline,
    _marker: PhantomData<fn() -> S>,
}

impl<S> Clone for DispatchService<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S: ServiceType> fmt::Debug for DispatchService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchService")
            .field("service", &S::name())
            .finish()
    }
}

impl Pipeline {
    /// Returns a `tower::Service` dispatching through `S`.
    pub fn service<S: ServiceType>(&self) -> DispatchService<S> {
        DispatchService {
            pipeline: self.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S: ServiceType> TowerService<S::Context> for DispatchService<S> {
    type Response = S::Result;
    type Error = PipelineError;
    type Future = DispatchFuture<S::Result>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, context: S::Context) -> Self::Future {
        self.pipeline.pump(context).through::<S>().result_async()
    }
}
