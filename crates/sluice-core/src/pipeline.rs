//! The service pipeline: a registry of service types and their chains.
//!
//! # Registration
//!
//! Every service type is declared once with its default implementation, then
//! extended with any number of further implementations:
//!
//! ```rust,ignore
//! use sluice_core::{Pipeline, filter, service_fn};
//!
//! let pipeline = Pipeline::new();
//! pipeline
//!     .register_service_type::<Greeting>(service_fn(|name: &String| Some(name.len() as i32)))?
//!     .register_implementation::<Greeting>(
//!         service_fn(|_: &String| Some(-91)),
//!         [filter(|name: &String| name.starts_with("-91"))],
//!     )?;
//!
//! let length = pipeline.pump("Hello".to_string()).through::<Greeting>().result()?;
//! ```
//!
//! # Locking
//!
//! All registrations share one exclusive lock on the pipeline's map, so two
//! threads can never create two repositories for the same type. Dispatch only
//! takes the shared side of that lock long enough to resolve a repository and
//! then walks an immutable snapshot of its chain.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::error::{PipelineError, PipelineResult};
use crate::executor::{BoxedExecutor, Executor, InlineExecutor, WorkerPool};
use crate::repository::{ErasedRepository, ImplementationInfo, ServiceRepository};
use crate::service::{Filter, Service, ServiceKey, ServiceType};
use crate::spigot::Pump;

struct PipelineInner {
    repositories: RwLock<HashMap<ServiceKey, Arc<dyn ErasedRepository>>>,
    executor: BoxedExecutor,
}

/// Registry of service types, each with an ordered chain of implementations.
///
/// `Pipeline` is a cheap handle; clones share the same registry and executor.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Creates a pipeline with a single dedicated dispatch worker.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder for configuring the pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Declares a service type together with its default implementation.
    ///
    /// The default implementation is never filtered and is always tried last.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyRegistered`] if `S` was declared before; the
    /// pipeline is left unchanged.
    pub fn register_service_type<S: ServiceType>(
        &self,
        default: impl Service<S>,
    ) -> PipelineResult<&Self> {
        let key = ServiceKey::of::<S>();
        let mut repositories = self.inner.repositories.write();

        if repositories.contains_key(&key) {
            error!(service = key.name(), "Service type registered twice");
            return Err(PipelineError::AlreadyRegistered {
                service: key.name(),
            });
        }

        let repository = ServiceRepository::<S>::new();
        repository.register_implementation(default, []);
        repositories.insert(key, Arc::new(repository));

        info!(service = key.name(), kind = %key.kind(), "Registered service type");
        Ok(self)
    }

    /// Adds an implementation to the chain of a declared service type.
    ///
    /// The implementation is only tried when every filter accepts the context.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownServiceType`] if `S` has not been declared.
    pub fn register_implementation<S: ServiceType>(
        &self,
        implementation: impl Service<S>,
        filters: impl IntoIterator<Item = Filter<S::Context>>,
    ) -> PipelineResult<&Self> {
        let repositories = self.inner.repositories.write();
        let repository = Self::downcast::<S>(&repositories)?;
        repository.register_implementation(implementation, filters);
        Ok(self)
    }

    /// Starts a dispatch for `context`.
    ///
    /// The service type is chosen later with [`Pump::through`].
    pub fn pump<C>(&self, context: C) -> Pump<C> {
        Pump::new(self.clone(), context)
    }

    /// Returns whether `S` has been declared.
    pub fn is_registered<S: ServiceType>(&self) -> bool {
        self.contains(&ServiceKey::of::<S>())
    }

    /// Returns whether the service type behind `key` has been declared.
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.inner.repositories.read().contains_key(key)
    }

    /// Returns the keys of all declared service types, sorted by name.
    pub fn registered_types(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self.inner.repositories.read().keys().copied().collect();
        keys.sort_by_key(|key| key.name());
        keys
    }

    /// Describes the implementations of `S` in walk order.
    pub fn implementations<S: ServiceType>(&self) -> PipelineResult<Vec<ImplementationInfo>> {
        Ok(self.repository::<S>()?.describe())
    }

    /// Describes the implementations of the service type behind `key` in walk order.
    pub fn implementations_of(&self, key: &ServiceKey) -> PipelineResult<Vec<ImplementationInfo>> {
        let repository = self
            .inner
            .repositories
            .read()
            .get(key)
            .cloned()
            .ok_or(PipelineError::UnknownServiceType {
                service: key.name(),
            })?;
        Ok(repository.describe())
    }

    /// Resolves the repository of `S`.
    pub(crate) fn repository<S: ServiceType>(&self) -> PipelineResult<Arc<ServiceRepository<S>>> {
        let repositories = self.inner.repositories.read();
        Self::downcast::<S>(&repositories)
    }

    pub(crate) fn executor(&self) -> &BoxedExecutor {
        &self.inner.executor
    }

    fn downcast<S: ServiceType>(
        repositories: &HashMap<ServiceKey, Arc<dyn ErasedRepository>>,
    ) -> PipelineResult<Arc<ServiceRepository<S>>> {
        let unknown = || PipelineError::UnknownServiceType { service: S::name() };
        let erased = repositories
            .get(&ServiceKey::of::<S>())
            .cloned()
            .ok_or_else(unknown)?;
        erased
            .as_any()
            .downcast::<ServiceRepository<S>>()
            .map_err(|_| unknown())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("service_types", &self.registered_types())
            .finish()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    executor: Option<BoxedExecutor>,
}

impl PipelineBuilder {
    /// Sets the executor used for asynchronous dispatch.
    pub fn executor(mut self, executor: impl Executor) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Sets an already shared executor.
    pub fn shared_executor(mut self, executor: BoxedExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Builds the pipeline.
    ///
    /// Without an explicit executor a single dedicated worker thread is
    /// started. Should that thread fail to spawn, asynchronous dispatch falls
    /// back to running on the calling thread.
    pub fn build(self) -> Pipeline {
        let executor = self.executor.unwrap_or_else(|| match WorkerPool::single() {
            Ok(pool) => Arc::new(pool),
            Err(err) => {
                error!(error = %err, "Failed to start dispatch worker, running inline");
                Arc::new(InlineExecutor)
            }
        });

        debug!("Created service pipeline");
        Pipeline {
            inner: Arc::new(PipelineInner {
                repositories: RwLock::new(HashMap::new()),
                executor,
            }),
        }
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("custom_executor", &self.executor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ExecutionOrder;
    use crate::service::{Plain, service_fn};

    struct Greeting;

    impl ServiceType for Greeting {
        type Context = String;
        type Result = i32;
        type Mode = Plain;
    }

    struct Shout;

    impl ServiceType for Shout {
        type Context = String;
        type Result = String;
        type Mode = Plain;
    }

    fn greeting_default() -> impl Service<Greeting> {
        service_fn(|_: &String| Some(32)).named("default")
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let pipeline = Pipeline::builder().executor(InlineExecutor).build();
        pipeline
            .register_service_type::<Greeting>(greeting_default())
            .unwrap();
        let before = pipeline.implementations::<Greeting>().unwrap();

        let err = pipeline
            .register_service_type::<Greeting>(service_fn(|_: &String| Some(0)).named("second"))
            .unwrap_err();
        assert_eq!(err, PipelineError::AlreadyRegistered { service: Greeting::name() });
        assert_eq!(pipeline.implementations::<Greeting>().unwrap(), before);
    }

    #[test]
    fn test_implementation_requires_declared_type() {
        let pipeline = Pipeline::builder().executor(InlineExecutor).build();
        let err = pipeline
            .register_implementation::<Greeting>(service_fn(|_: &String| Some(1)), [])
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownServiceType { .. }));
        assert!(!pipeline.is_registered::<Greeting>());
    }

    #[test]
    fn test_registered_types() {
        let pipeline = Pipeline::builder().executor(InlineExecutor).build();
        pipeline
            .register_service_type::<Greeting>(greeting_default())
            .unwrap()
            .register_service_type::<Shout>(service_fn(|s: &String| Some(s.to_uppercase())))
            .unwrap();

        let types = pipeline.registered_types();
        assert_eq!(types.len(), 2);
        assert!(types.contains(&ServiceKey::of::<Greeting>()));
        assert!(types.contains(&ServiceKey::of::<Shout>()));
    }

    #[test]
    fn test_implementations_in_walk_order() {
        let pipeline = Pipeline::builder().executor(InlineExecutor).build();
        pipeline
            .register_service_type::<Greeting>(greeting_default())
            .unwrap()
            .register_implementation::<Greeting>(
                service_fn(|_: &String| Some(1))
                    .named("first")
                    .with_order(ExecutionOrder::First),
                [],
            )
            .unwrap()
            .register_implementation::<Greeting>(
                service_fn(|_: &String| Some(2))
                    .named("last")
                    .with_order(ExecutionOrder::Last),
                [],
            )
            .unwrap();

        let typed = pipeline.implementations::<Greeting>().unwrap();
        let erased = pipeline
            .implementations_of(&ServiceKey::of::<Greeting>())
            .unwrap();
        assert_eq!(typed, erased);

        let names: Vec<_> = typed.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["first", "last", "default"]);
        assert!(typed[2].is_default);
    }

    #[test]
    fn test_implementations_of_unknown_key() {
        let pipeline = Pipeline::builder().executor(InlineExecutor).build();
        assert!(
            pipeline
                .implementations_of(&ServiceKey::of::<Shout>())
                .is_err()
        );
    }
}
