//! Services that answer a batch of requests piece by piece.
//!
//! A [`ChunkedRequest`] carries many requests at once. Every implementation
//! in the chain answers whatever still-unanswered requests it can, and the
//! walk settles as soon as every request has an answer.
//!
//! ```rust,ignore
//! struct Lookup;
//!
//! impl ServiceType for Lookup {
//!     type Context = ChunkedRequest<u32, String>;
//!     type Result = HashMap<u32, String>;
//!     type Mode = Plain;
//! }
//!
//! pipeline.register_service_type::<Lookup>(partial_fn(|ids: &[u32]| {
//!     ids.iter().map(|id| (*id, format!("user-{id}"))).collect()
//! }))?;
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use parking_lot::Mutex;
use tracing::trace;

use crate::order::ExecutionOrder;
use crate::service::{Meta, Service, ServiceType};

/// A batch of requests together with the answers collected so far.
pub struct ChunkedRequest<C, R> {
    requests: Vec<C>,
    results: Mutex<HashMap<C, R>>,
}

impl<C, R> ChunkedRequest<C, R>
where
    C: Eq + Hash + Clone,
    R: Clone,
{
    /// Creates a request batch with no answers yet.
    pub fn new(requests: impl IntoIterator<Item = C>) -> Self {
        Self {
            requests: requests.into_iter().collect(),
            results: Mutex::new(HashMap::new()),
        }
    }

    /// All requests, in their original order.
    pub fn requests(&self) -> &[C] {
        &self.requests
    }

    /// Requests that have no answer yet, in their original order.
    pub fn remaining(&self) -> Vec<C> {
        let results = self.results.lock();
        self.requests
            .iter()
            .filter(|request| !results.contains_key(*request))
            .cloned()
            .collect()
    }

    /// Records the answer to `request`.
    ///
    /// Answers to requests outside the batch are ignored.
    pub fn store_result(&self, request: C, result: R) {
        if self.requests.contains(&request) {
            self.results.lock().insert(request, result);
        } else {
            trace!("Ignoring answer to a request outside the batch");
        }
    }

    /// Returns `true` once every request has an answer.
    pub fn is_completed(&self) -> bool {
        let results = self.results.lock();
        self.requests
            .iter()
            .all(|request| results.contains_key(request))
    }

    /// The answers collected so far.
    pub fn available_results(&self) -> HashMap<C, R> {
        self.results.lock().clone()
    }
}

impl<C: fmt::Debug, R> fmt::Debug for ChunkedRequest<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedRequest")
            .field("requests", &self.requests)
            .field("answered", &self.results.lock().len())
            .finish()
    }
}

/// Adapts a batch-answering closure into a [`Service`] over [`ChunkedRequest`]s.
pub struct PartialFn<F, C, R> {
    f: F,
    meta: Meta,
    _marker: PhantomData<fn(&[C]) -> R>,
}

/// Wraps `f`, which answers some subset of the requests it is given.
pub fn partial_fn<C, R, F>(f: F) -> PartialFn<F, C, R>
where
    F: Fn(&[C]) -> HashMap<C, R>,
{
    PartialFn {
        f,
        meta: Meta::new::<F>(),
        _marker: PhantomData,
    }
}

impl<F, C, R> PartialFn<F, C, R> {
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

impl<S, F, C, R> Service<S> for PartialFn<F, C, R>
where
    S: ServiceType<Context = ChunkedRequest<C, R>, Result = HashMap<C, R>>,
    C: Eq + Hash + Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(&[C]) -> HashMap<C, R> + Send + Sync + 'static,
{
    fn handle(&self, context: &ChunkedRequest<C, R>) -> Option<HashMap<C, R>> {
        if !context.is_completed() {
            let remaining = context.remaining();
            for (request, result) in (self.f)(&remaining) {
                context.store_result(request, result);
            }
        }

        context
            .is_completed()
            .then(|| context.available_results())
    }

    fn order(&self) -> ExecutionOrder {
        self.meta.order
    }

    fn name(&self) -> &str {
        &self.meta.name
    }
}
