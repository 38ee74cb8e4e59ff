//! Service types, implementations and filters.
//!
//! A *service type* is a zero-sized marker declaring the context an
//! implementation receives, the result it produces and the [`Mode`] that
//! decides how results end a walk:
//!
//! ```rust,ignore
//! use sluice_core::{Plain, ServiceType};
//!
//! struct Greeting;
//!
//! impl ServiceType for Greeting {
//!     type Context = String;
//!     type Result = i32;
//!     type Mode = Plain;
//! }
//! ```
//!
//! Implementations are any value implementing [`Service`]. Closures are
//! adapted with [`service_fn`], [`side_effect_fn`] and [`consumer_fn`].

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::order::ExecutionOrder;

// =============================================================================
// Service kinds
// =============================================================================

/// Outcome of a side-effect or consumer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// The context was consumed; the walk stops here.
    Accepted,
    /// The context was not consumed; the next implementation gets a chance.
    Rejected,
}

impl State {
    /// Returns `true` if the state is [`State::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Runtime description of a service type's [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Any result; an empty answer means "try the next implementation".
    Plain,
    /// Accept/reject outcome; an empty answer is a contract violation.
    SideEffect,
    /// Sink-only; walking off the end of the chain counts as accepted.
    Consumer,
}

impl ServiceKind {
    /// Whether an implementation must always produce an outcome.
    pub fn requires_outcome(&self) -> bool {
        !matches!(self, Self::Plain)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::SideEffect => "side-effect",
            Self::Consumer => "consumer",
        })
    }
}

/// Decides how a result of type `R` settles a walk.
pub trait Mode<R>: Send + Sync + 'static {
    /// Runtime description of the mode.
    const KIND: ServiceKind;

    /// Returns `true` if `result` ends the walk as the final result.
    fn settles(result: &R) -> bool;

    /// Result of a walk that ran off the end of the chain, if that is not an error.
    fn exhausted() -> Option<R>;
}

/// Marker for ordinary services: the first non-empty result wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl<R: Send + 'static> Mode<R> for Plain {
    const KIND: ServiceKind = ServiceKind::Plain;

    fn settles(_result: &R) -> bool {
        true
    }

    fn exhausted() -> Option<R> {
        None
    }
}

/// Marker for side-effect services: the first [`State::Accepted`] wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SideEffect;

impl Mode<State> for SideEffect {
    const KIND: ServiceKind = ServiceKind::SideEffect;

    fn settles(result: &State) -> bool {
        result.is_accepted()
    }

    fn exhausted() -> Option<State> {
        None
    }
}

/// Marker for consumer services: every implementation may see the context
/// until one interrupts, and running off the end is an implicit acceptance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Consumer;

impl Mode<State> for Consumer {
    const KIND: ServiceKind = ServiceKind::Consumer;

    fn settles(result: &State) -> bool {
        result.is_accepted()
    }

    fn exhausted() -> Option<State> {
        Some(State::Accepted)
    }
}

// =============================================================================
// Service types
// =============================================================================

/// A declared (context, result) contract with its own chain of implementations.
pub trait ServiceType: 'static {
    /// Value handed to every implementation.
    type Context: Send + 'static;
    /// Value produced by the implementation that settles the walk.
    type Result: Send + 'static;
    /// How results settle a walk.
    type Mode: Mode<Self::Result>;

    /// Human-readable name used in errors and logs.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Identifier of a service type, usable as a map key.
///
/// Equality and hashing only consider the service type itself, so every
/// `ServiceKey::of::<S>()` equals every other one for the same `S`.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
    kind: ServiceKind,
}

impl ServiceKey {
    /// Returns the key of service type `S`.
    pub fn of<S: ServiceType>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: S::name(),
            kind: <S::Mode as Mode<S::Result>>::KIND,
        }
    }

    /// Name of the service type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Kind of the service type.
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Returns `true` if this is the key of `S`.
    pub fn is<S: ServiceType>(&self) -> bool {
        self.id == TypeId::of::<S>()
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceKey")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Implementations
// =============================================================================

/// An implementation of service type `S`.
///
/// Returning `None` passes the context on to the next implementation in the
/// chain. For side-effect and consumer services `None` is a contract
/// violation and aborts the walk.
pub trait Service<S: ServiceType>: Send + Sync + 'static {
    /// Produces a result for `context`, if this implementation can.
    fn handle(&self, context: &S::Context) -> Option<S::Result>;

    /// Priority tier of this implementation.
    fn order(&self) -> ExecutionOrder {
        ExecutionOrder::default()
    }

    /// Name shown in introspection and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<S: ServiceType> Service<S> for Arc<dyn Service<S>> {
    fn handle(&self, context: &S::Context) -> Option<S::Result> {
        (**self).handle(context)
    }

    fn order(&self) -> ExecutionOrder {
        (**self).order()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Order and name carried by the closure adapters.
#[derive(Debug, Clone)]
pub(crate) struct Meta {
    pub(crate) order: ExecutionOrder,
    pub(crate) name: Cow<'static, str>,
}

impl Meta {
    pub(crate) fn new<F>() -> Self {
        Self {
            order: ExecutionOrder::default(),
            name: Cow::Borrowed(std::any::type_name::<F>()),
        }
    }
}

macro_rules! impl_meta_builders {
    ($ty:ident) => {
        impl<F, C> $ty<F, C> {
            /// Sets the priority tier of this implementation.
            pub fn with_order(mut self, order: ExecutionOrder) -> Self {
                self.meta.order = order;
                self
            }

            /// Sets the name shown in introspection and errors.
            pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
                self.meta.name = name.into();
                self
            }
        }
    };
}

/// Adapts a closure returning `Option<Result>` into a [`Service`].
pub struct ServiceFn<F, C, R> {
    f: F,
    meta: Meta,
    _marker: PhantomData<fn(&C) -> R>,
}

/// Wraps `f` as an implementation of any service type with matching
/// context and result.
pub fn service_fn<C, R, F>(f: F) -> ServiceFn<F, C, R>
where
    F: Fn(&C) -> Option<R>,
{
    ServiceFn {
        f,
        meta: Meta::new::<F>(),
        _marker: PhantomData,
    }
}

impl<F, C, R> ServiceFn<F, C, R> {
    /// Sets the priority tier of this implementation.
    pub fn with_order(mut self, order: ExecutionOrder) -> Self {
        self.meta.order = order;
        self
    }

    /// Sets the name shown in introspection and errors.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.meta.name = name.into();
        self
    }
}

impl<S, F> Service<S> for ServiceFn<F, S::Context, S::Result>
where
    S: ServiceType,
    F: Fn(&S::Context) -> Option<S::Result> + Send + Sync + 'static,
{
    fn handle(&self, context: &S::Context) -> Option<S::Result> {
        (self.f)(context)
    }

    fn order(&self) -> ExecutionOrder {
        self.meta.order
    }

    fn name(&self) -> &str {
        &self.meta.name
    }
}

/// Adapts a closure returning a [`State`] into a side-effect [`Service`].
pub struct SideEffectFn<F, C> {
    f: F,
    meta: Meta,
    _marker: PhantomData<fn(&C)>,
}

/// Wraps `f` as an implementation of a service whose result is [`State`].
pub fn side_effect_fn<C, F>(f: F) -> SideEffectFn<F, C>
where
    F: Fn(&C) -> State,
{
    SideEffectFn {
        f,
        meta: Meta::new::<F>(),
        _marker: PhantomData,
    }
}

impl_meta_builders!(SideEffectFn);

impl<S, F> Service<S> for SideEffectFn<F, S::Context>
where
    S: ServiceType<Result = State>,
    F: Fn(&S::Context) -> State + Send + Sync + 'static,
{
    fn handle(&self, context: &S::Context) -> Option<State> {
        Some((self.f)(context))
    }

    fn order(&self) -> ExecutionOrder {
        self.meta.order
    }

    fn name(&self) -> &str {
        &self.meta.name
    }
}

/// Adapts a sink closure into a consumer [`Service`].
///
/// Returning `ControlFlow::Break(())` interrupts the chain and accepts the
/// context; `ControlFlow::Continue(())` lets the next consumer see it too.
pub struct ConsumerFn<F, C> {
    f: F,
    meta: Meta,
    _marker: PhantomData<fn(&C)>,
}

/// Wraps `f` as an implementation of a consumer service.
pub fn consumer_fn<C, F>(f: F) -> ConsumerFn<F, C>
where
    F: Fn(&C) -> ControlFlow<()>,
{
    ConsumerFn {
        f,
        meta: Meta::new::<F>(),
        _marker: PhantomData,
    }
}

impl_meta_builders!(ConsumerFn);

impl<S, F> Service<S> for ConsumerFn<F, S::Context>
where
    S: ServiceType<Result = State>,
    F: Fn(&S::Context) -> ControlFlow<()> + Send + Sync + 'static,
{
    fn handle(&self, context: &S::Context) -> Option<State> {
        match (self.f)(context) {
            ControlFlow::Break(()) => Some(State::Accepted),
            ControlFlow::Continue(()) => Some(State::Rejected),
        }
    }

    fn order(&self) -> ExecutionOrder {
        self.meta.order
    }

    fn name(&self) -> &str {
        &self.meta.name
    }
}

// =============================================================================
// Filters
// =============================================================================

/// A predicate over the context deciding whether an implementation is tried.
pub struct Filter<C>(Arc<dyn Fn(&C) -> bool + Send + Sync>);

impl<C> Filter<C> {
    /// Creates a filter from a predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluates the filter against `context`.
    pub fn test(&self, context: &C) -> bool {
        (self.0)(context)
    }
}

/// Shorthand for [`Filter::new`].
pub fn filter<C, F>(f: F) -> Filter<C>
where
    F: Fn(&C) -> bool + Send + Sync + 'static,
{
    Filter::new(f)
}

impl<C> Clone for Filter<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C> fmt::Debug for Filter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Length;

    impl ServiceType for Length {
        type Context = String;
        type Result = usize;
        type Mode = Plain;
    }

    struct Sink;

    impl ServiceType for Sink {
        type Context = u32;
        type Result = State;
        type Mode = Consumer;
    }

    #[test]
    fn test_service_key_structural_equality() {
        let a = ServiceKey::of::<Length>();
        let b = ServiceKey::of::<Length>();
        assert_eq!(a, b);
        assert_ne!(a, ServiceKey::of::<Sink>());
        assert!(a.is::<Length>());
        assert_eq!(a.kind(), ServiceKind::Plain);
        assert_eq!(ServiceKey::of::<Sink>().kind(), ServiceKind::Consumer);
    }

    #[test]
    fn test_service_fn_metadata() {
        let svc = service_fn(|s: &String| Some(s.len()))
            .with_order(ExecutionOrder::First)
            .named("length");
        assert_eq!(Service::<Length>::handle(&svc, &"four".to_string()), Some(4));
        assert_eq!(Service::<Length>::order(&svc), ExecutionOrder::First);
        assert_eq!(Service::<Length>::name(&svc), "length");
    }

    #[test]
    fn test_consumer_fn_maps_control_flow() {
        let svc = consumer_fn(|n: &u32| {
            if *n > 10 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(Service::<Sink>::handle(&svc, &11), Some(State::Accepted));
        assert_eq!(Service::<Sink>::handle(&svc, &1), Some(State::Rejected));
    }

    #[test]
    fn test_filter_is_shared_on_clone() {
        let f = filter(|s: &String| s.starts_with('-'));
        let g = f.clone();
        assert!(f.test(&"-91".to_string()));
        assert!(!g.test(&"91".to_string()));
    }
}
