//! Dispatch cursors: walking a chain for one context.
//!
//! [`Pipeline::pump`] binds a context, [`Pump::through`] picks the service
//! type, and the resulting [`Spigot`] produces the result:
//!
//! ```text
//! pump(ctx) ──► through::<S>() ──► result()          (on the calling thread)
//!                              ├─► result_async()    (on the pipeline executor)
//!                              ├─► forward()         ──► Pump<S::Result>
//!                              └─► forward_async()   ──► Pump<S::Result>, later
//! ```
//!
//! # The walk
//!
//! 1. Resolve the repository of `S`.
//! 2. Take a snapshot of its ordered chain.
//! 3. For each slot: skip it if a filter rejects the context (never for the
//!    default), otherwise invoke it and let the service [`Mode`] decide
//!    whether the result settles the walk.
//! 4. Running off the end is an error unless the mode supplies a result
//!    (consumer services accept implicitly).

use std::fmt;

use tracing::{Level, debug, error, span, trace};

use crate::error::{PipelineError, PipelineResult};
use crate::executor::DispatchFuture;
use crate::pipeline::Pipeline;
use crate::repository::ServiceRepository;
use crate::service::{Mode, ServiceType};

/// A context waiting for a service type to be chosen.
pub struct Pump<C> {
    pipeline: Pipeline,
    context: C,
}

impl<C> Pump<C> {
    pub(crate) fn new(pipeline: Pipeline, context: C) -> Self {
        Self { pipeline, context }
    }

    /// Routes the context through service type `S`.
    pub fn through<S>(self) -> Spigot<S>
    where
        S: ServiceType<Context = C>,
    {
        Spigot {
            pipeline: self.pipeline,
            context: self.context,
        }
    }

    /// The bound context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Takes the bound context back.
    pub fn into_context(self) -> C {
        self.context
    }
}

impl<C: fmt::Debug> fmt::Debug for Pump<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pump")
            .field("context", &self.context)
            .finish()
    }
}

/// A context bound to a service type, ready to produce a result.
pub struct Spigot<S: ServiceType> {
    pipeline: Pipeline,
    context: S::Context,
}

impl<S: ServiceType> Spigot<S> {
    /// The bound context.
    pub fn context(&self) -> &S::Context {
        &self.context
    }

    /// Walks the chain on the calling thread.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnknownServiceType`] if `S` was never declared.
    /// - [`PipelineError::ContractViolation`] if a side-effect or consumer
    ///   implementation produced no outcome.
    /// - [`PipelineError::Exhausted`] if nothing, not even the default,
    ///   settled the walk.
    pub fn result(&self) -> PipelineResult<S::Result> {
        let repository = self.pipeline.repository::<S>()?;
        walk(&repository, &self.context)
    }

    /// Walks the chain on the pipeline's executor.
    ///
    /// Returns immediately; the future resolves once the walk completes.
    pub fn result_async(self) -> DispatchFuture<S::Result> {
        self.schedule(|_, result| result)
    }

    /// Walks the chain and binds the result as the context of a new dispatch.
    pub fn forward(&self) -> PipelineResult<Pump<S::Result>> {
        let result = self.result()?;
        Ok(self.pipeline.pump(result))
    }

    /// Like [`forward`](Self::forward), with the walk on the pipeline's executor.
    ///
    /// The new dispatch is only available once this walk has completed. An
    /// error from this walk is delivered instead and nothing is forwarded.
    pub fn forward_async(self) -> DispatchFuture<Pump<S::Result>> {
        self.schedule(|pipeline, result| pipeline.pump(result))
    }

    fn schedule<T, F>(self, finish: F) -> DispatchFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&Pipeline, S::Result) -> T + Send + 'static,
    {
        let (completion, future) = DispatchFuture::channel(S::name());
        let Self { pipeline, context } = self;
        let executor = pipeline.executor().clone();

        trace!(service = S::name(), "Scheduling asynchronous dispatch");
        executor.execute(Box::new(move || {
            let result = pipeline
                .repository::<S>()
                .and_then(|repository| walk(&repository, &context))
                .map(|result| finish(&pipeline, result));
            completion.complete(result);
        }));

        future
    }
}

impl<S: ServiceType> fmt::Debug for Spigot<S>
where
    S::Context: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spigot")
            .field("service", &S::name())
            .field("context", &self.context)
            .finish()
    }
}

/// Walks the chain of `repository` for `context`.
fn walk<S: ServiceType>(
    repository: &ServiceRepository<S>,
    context: &S::Context,
) -> PipelineResult<S::Result> {
    let span = span!(Level::DEBUG, "dispatch", service = S::name());
    let _enter = span.enter();

    let kind = <S::Mode as Mode<S::Result>>::KIND;
    let chain = repository.snapshot();

    for slot in chain.iter() {
        if !slot.accepts(context) {
            trace!(implementation = slot.name(), "Filter rejected context, skipping");
            continue;
        }

        trace!(
            implementation = slot.name(),
            is_default = slot.is_default(),
            "Invoking implementation"
        );

        match slot.handle(context) {
            Some(result) if <S::Mode as Mode<S::Result>>::settles(&result) => {
                debug!(implementation = slot.name(), "Context consumed");
                return Ok(result);
            }
            Some(_) => {
                trace!(implementation = slot.name(), "Context rejected, trying next");
            }
            None if kind.requires_outcome() => {
                error!(
                    implementation = slot.name(),
                    kind = %kind,
                    "Implementation returned no outcome"
                );
                return Err(PipelineError::ContractViolation {
                    service: S::name(),
                    implementation: slot.name().to_string(),
                });
            }
            None => {
                trace!(implementation = slot.name(), "No result, trying next");
            }
        }
    }

    if let Some(result) = <S::Mode as Mode<S::Result>>::exhausted() {
        debug!("Chain ended without interruption, accepting");
        return Ok(result);
    }

    error!(
        implementations = chain.len(),
        "No implementation consumed the context"
    );
    Err(PipelineError::Exhausted { service: S::name() })
}
