//! # Sluice
//!
//! A typed chain-of-responsibility service pipeline.
//!
//! ## Overview
//!
//! A *service type* is a contract from a context to a result. Any number of
//! implementations can be registered for it, each with a priority tier and
//! optional filters. Dispatching a context walks the implementations in
//! order until one of them produces a result; the first implementation ever
//! registered is the default and always answers last.
//!
//! ```text
//!                ┌──────────────── chain of Greeting ───────────────┐
//! pump("potato") │ First ──▶ ... ──▶ Soon ──▶ ... ──▶ Last ──▶ default │──▶ 999
//!                └──────────────────────────────────────────────────┘
//!                   filters decide whether a slot is tried at all
//! ```
//!
//! Three flavours of service type exist:
//!
//! - **Plain**: the first `Some(result)` wins.
//! - **Side effect**: implementations report `Accepted` or `Rejected`.
//! - **Consumer**: a sink where an implementation may stop propagation.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sluice::prelude::*;
//!
//! struct Greeting;
//!
//! impl ServiceType for Greeting {
//!     type Context = String;
//!     type Result = i32;
//!     type Mode = Plain;
//! }
//!
//! #[implementation(Greeting, order = First, filter = is_potato)]
//! fn potato(_: &String) -> Option<i32> {
//!     Some(999)
//! }
//!
//! fn is_potato(name: &String) -> bool {
//!     name == "potato"
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = SluiceRuntime::builder().build()?.into_pipeline();
//!     pipeline.register_service_type::<Greeting>(service_fn(|s: &String| Some(s.len() as i32)))?;
//!     pipeline.register_collected()?;
//!
//!     assert_eq!(pipeline.pump("potato".to_string()).through::<Greeting>().result()?, 999);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros`: Enable the `#[implementation]` attribute (default)
//! - `toml-config`: Load `sluice.toml` (default)
//! - `yaml-config`: Load `sluice.yaml`
//! - `json-log`: JSON log output

// `#[implementation]` expands to paths under `::sluice::core`.
pub use sluice_core as core;
pub use sluice_runtime as runtime;

#[cfg(feature = "macros")]
pub use sluice_macros::implementation;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use sluice::prelude::*;
/// ```
pub mod prelude {
    // Runtime - configuration and bootstrap
    pub use sluice_runtime::{SluiceConfig, SluiceRuntime};

    // Pipeline and dispatch
    pub use sluice_core::{DispatchFuture, Pipeline, PipelineError, PipelineResult, Pump, Spigot};

    // Declaring service types and implementations
    pub use sluice_core::{
        ChunkedRequest, Consumer, ExecutionOrder, Filter, Plain, Service, ServiceType,
        SideEffect, State, consumer_fn, filter, partial_fn, service_fn, side_effect_fn,
    };

    #[cfg(feature = "macros")]
    pub use sluice_macros::implementation;
}
