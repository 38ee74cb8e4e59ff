//! # Sluice Core
//!
//! A typed chain-of-responsibility pipeline. Callers pump a context into a
//! named *service type*; the implementations registered for that type are
//! tried in priority order until one produces a result.
//!
//! ## Building blocks
//!
//! - **Service types** ([`ServiceType`]): a (context, result, [`Mode`]) contract.
//! - **Implementations** ([`Service`]): anything mapping a context to an
//!   optional result, with an [`ExecutionOrder`] tier and optional [`Filter`]s.
//! - **Repositories** ([`ServiceRepository`]): the ordered chain of one type.
//!   The first implementation registered is the default, tried last and
//!   never filtered.
//! - **Pipeline** ([`Pipeline`]): maps service types to repositories.
//! - **Spigot** ([`Spigot`]): walks a chain for one context, synchronously,
//!   asynchronously or forwarding the result into a new dispatch.
//!
//! ```text
//! pump(ctx) ──► through::<S>() ──► [First ... Last] ──► default ──► result
//!                                   filters skip slots   never skipped
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sluice_core::{Pipeline, Plain, ServiceType, filter, service_fn};
//!
//! struct Greeting;
//!
//! impl ServiceType for Greeting {
//!     type Context = String;
//!     type Result = i32;
//!     type Mode = Plain;
//! }
//!
//! let pipeline = Pipeline::new();
//! pipeline
//!     .register_service_type::<Greeting>(service_fn(|s: &String| Some(s.len() as i32)))?
//!     .register_implementation::<Greeting>(
//!         service_fn(|_: &String| Some(999)),
//!         [filter(|s: &String| s == "potato")],
//!     )?;
//!
//! assert_eq!(pipeline.pump("potato".to_string()).through::<Greeting>().result()?, 999);
//! ```

pub mod dispatch_service;
pub mod error;
pub mod executor;
pub mod order;
pub mod partial;
pub mod pipeline;
pub mod registrar;
pub mod repository;
pub mod service;
pub mod spigot;

pub use dispatch_service::DispatchService;
pub use error::{PipelineError, PipelineResult};
pub use executor::{
    BoxedExecutor, DispatchFuture, Executor, InlineExecutor, Task, TokioExecutor, WorkerPool,
};
pub use order::{ChainPosition, ExecutionOrder, chain_order, sort_chain};
pub use partial::{ChunkedRequest, PartialFn, partial_fn};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use registrar::{IMPLEMENTATIONS, Registrar};
pub use repository::{Chain, ImplementationInfo, ServiceRepository, Slot};
pub use service::{
    Consumer, ConsumerFn, Filter, Mode, Plain, Service, ServiceFn, ServiceKey, ServiceKind,
    ServiceType, SideEffect, SideEffectFn, State, consumer_fn, filter, service_fn,
    side_effect_fn,
};
pub use spigot::{Pump, Spigot};

// Used by `#[implementation]` expansions.
#[doc(hidden)]
pub use linkme;

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Consumer, ExecutionOrder, Filter, Pipeline, PipelineError, PipelineResult, Plain,
        Service, ServiceType, SideEffect, State, consumer_fn, filter, service_fn,
        side_effect_fn,
    };
}
