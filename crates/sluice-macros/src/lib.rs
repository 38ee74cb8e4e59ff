//! Procedural macros for the Sluice service pipeline.
//!
//! This crate provides:
//!
//! - `#[implementation(...)]` - Collects a function as an implementation of a
//!   service type, to be registered by `Pipeline::register_collected`
//!
//! ```rust,ignore
//! use sluice::prelude::*;
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
//! pipeline.register_service_type::<Greeting>(service_fn(|s: &String| Some(s.len() as i32)))?;
//! pipeline.register_collected()?;
//! ```

mod implementation;

use proc_macro::TokenStream;

/// Collects a function as an implementation of a service type.
///
/// The function is left unchanged. A registrar is appended to the
/// link-time `IMPLEMENTATIONS` slice of the core crate, reached through the
/// `sluice` facade as `::sluice::core`.
///
/// # Arguments
///
/// - The service type, first and positional (required)
/// - `order = <ExecutionOrder variant>` - Priority tier (default: `Soon`)
/// - `filter = <path>` - A `fn(&Context) -> bool`; may be repeated
/// - `name = "..."` - Name shown in introspection (default: the function path)
/// - `crate = <path>` - Path to the core crate, for callers depending on
///   `sluice-core` directly (default: `::sluice::core`)
///
/// # Adapters
///
/// The adapter is chosen from the return type:
///
/// | Return type | Adapter |
/// |-------------|---------|
/// | `State` | `side_effect_fn` |
/// | `ControlFlow<()>` | `consumer_fn` |
/// | anything else (`Option<R>`) | `service_fn` |
#[proc_macro_attribute]
pub fn implementation(attr: TokenStream, item: TokenStream) -> TokenStream {
    implementation::implementation(attr, item)
}
