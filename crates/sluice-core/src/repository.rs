//! Per-service-type storage of implementations.
//!
//! A [`ServiceRepository`] owns the chain of [`Slot`]s for exactly one service
//! type. The chain is kept as an immutable, already-ordered array: appending
//! builds a new array under the write lock and swaps it in, and a snapshot is
//! a clone of the current `Arc`. Walks iterate a snapshot without holding any
//! lock, so registrations never disturb a walk in flight.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::order::{ChainPosition, ExecutionOrder, sort_chain};
use crate::service::{Filter, Service, ServiceType};

/// An ordered, immutable view of a repository's chain.
pub type Chain<S> = Arc<[Arc<Slot<S>>]>;

/// One registered implementation together with its filters and position.
pub struct Slot<S: ServiceType> {
    implementation: Box<dyn Service<S>>,
    filters: Vec<Filter<S::Context>>,
    is_default: bool,
    order: ExecutionOrder,
    sequence: u64,
}

impl<S: ServiceType> Slot<S> {
    /// Name of the wrapped implementation.
    pub fn name(&self) -> &str {
        self.implementation.name()
    }

    /// Whether this is the repository's default implementation.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Priority tier captured at registration.
    pub fn order(&self) -> ExecutionOrder {
        self.order
    }

    /// Registration sequence number within the repository.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of filters attached to this slot.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if every filter passes. The default slot accepts everything.
    pub fn accepts(&self, context: &S::Context) -> bool {
        self.is_default || self.filters.iter().all(|f| f.test(context))
    }

    /// Invokes the wrapped implementation.
    pub fn handle(&self, context: &S::Context) -> Option<S::Result> {
        self.implementation.handle(context)
    }

    /// Returns the slot's position for chain ordering.
    pub fn position(&self) -> ChainPosition {
        ChainPosition {
            is_default: self.is_default,
            order: self.order,
            sequence: self.sequence,
        }
    }

    /// Describes the slot for introspection.
    pub fn info(&self) -> ImplementationInfo {
        ImplementationInfo {
            name: self.name().to_string(),
            order: self.order,
            is_default: self.is_default,
        }
    }
}

impl<S: ServiceType> fmt::Debug for Slot<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("service", &S::name())
            .field("implementation", &self.name())
            .field("is_default", &self.is_default)
            .field("order", &self.order)
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Introspection record for one implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationInfo {
    /// Name of the implementation.
    pub name: String,
    /// Declared priority tier.
    pub order: ExecutionOrder,
    /// Whether it is the default implementation.
    pub is_default: bool,
}

/// The ordered collection of implementations for one service type.
pub struct ServiceRepository<S: ServiceType> {
    chain: RwLock<Chain<S>>,
}

impl<S: ServiceType> Default for ServiceRepository<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ServiceType> ServiceRepository<S> {
    /// Creates an empty repository.
    ///
    /// The first implementation registered becomes the default.
    pub fn new() -> Self {
        Self {
            chain: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Appends an implementation to the chain.
    ///
    /// The first implementation ever registered becomes the default and its
    /// `filters` are discarded. Returns whether the new slot is the default.
    pub fn register_implementation<I>(
        &self,
        implementation: I,
        filters: impl IntoIterator<Item = Filter<S::Context>>,
    ) -> bool
    where
        I: Service<S>,
    {
        let order = implementation.order();
        let mut chain = self.chain.write();

        let is_default = chain.is_empty();
        let filters = if is_default {
            Vec::new()
        } else {
            filters.into_iter().collect()
        };
        let slot = Slot {
            implementation: Box::new(implementation),
            filters,
            is_default,
            order,
            sequence: chain.len() as u64,
        };

        debug!(
            service = S::name(),
            implementation = slot.name(),
            order = %slot.order,
            is_default,
            filters = slot.filters.len(),
            "Registered service implementation"
        );

        let mut slots: Vec<Arc<Slot<S>>> = chain.iter().cloned().collect();
        slots.push(Arc::new(slot));
        sort_chain(&mut slots, |s| s.position());
        *chain = Arc::from(slots);

        is_default
    }

    /// Returns the current chain in walk order.
    ///
    /// The snapshot is unaffected by later registrations.
    pub fn snapshot(&self) -> Chain<S> {
        Arc::clone(&self.chain.read())
    }

    /// Number of registered implementations.
    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    /// Returns `true` if nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.chain.read().is_empty()
    }

    /// Describes every implementation in walk order.
    pub fn describe(&self) -> Vec<ImplementationInfo> {
        self.snapshot().iter().map(|slot| slot.info()).collect()
    }
}

impl<S: ServiceType> fmt::Debug for ServiceRepository<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRepository")
            .field("service", &S::name())
            .field("implementations", &self.len())
            .finish()
    }
}

/// Type-erased view of a repository stored in the pipeline's map.
pub(crate) trait ErasedRepository: Send + Sync {
    fn describe(&self) -> Vec<ImplementationInfo>;

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<S: ServiceType> ErasedRepository for ServiceRepository<S> {
    fn describe(&self) -> Vec<ImplementationInfo> {
        ServiceRepository::describe(self)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{Plain, filter, service_fn};
    use std::thread;

    struct Echo;

    impl ServiceType for Echo {
        type Context = u32;
        type Result = u32;
        type Mode = Plain;
    }

    fn named(name: &'static str, order: ExecutionOrder) -> impl Service<Echo> {
        service_fn(|n: &u32| Some(*n)).named(name).with_order(order)
    }

    fn names(repo: &ServiceRepository<Echo>) -> Vec<String> {
        repo.describe().into_iter().map(|i| i.name).collect()
    }

    #[test]
    fn test_first_registration_is_default() {
        let repo = ServiceRepository::<Echo>::new();
        assert!(repo.is_empty());
        assert!(repo.register_implementation(named("base", ExecutionOrder::Soon), []));
        assert!(!repo.register_implementation(named("extra", ExecutionOrder::Soon), []));

        let chain = repo.snapshot();
        assert_eq!(chain.iter().filter(|s| s.is_default()).count(), 1);
        assert!(chain.last().is_some_and(|s| s.is_default() && s.name() == "base"));
    }

    #[test]
    fn test_default_ignores_filters() {
        let repo = ServiceRepository::<Echo>::new();
        repo.register_implementation(named("base", ExecutionOrder::Soon), [filter(|_: &u32| false)]);
        let chain = repo.snapshot();
        assert_eq!(chain[0].filter_count(), 0);
        assert!(chain[0].accepts(&7));
    }

    #[test]
    fn test_chain_order() {
        let repo = ServiceRepository::<Echo>::new();
        repo.register_implementation(named("base", ExecutionOrder::First), []);
        repo.register_implementation(named("late", ExecutionOrder::Last), []);
        repo.register_implementation(named("a", ExecutionOrder::Soon), []);
        repo.register_implementation(named("b", ExecutionOrder::Soon), []);
        repo.register_implementation(named("first", ExecutionOrder::First), []);

        assert_eq!(names(&repo), vec!["first", "b", "a", "late", "base"]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_registrations() {
        let repo = ServiceRepository::<Echo>::new();
        repo.register_implementation(named("base", ExecutionOrder::Soon), []);
        let before = repo.snapshot();
        repo.register_implementation(named("extra", ExecutionOrder::Soon), []);

        assert_eq!(before.len(), 1);
        assert_eq!(repo.snapshot().len(), 2);
    }

    #[test]
    fn test_concurrent_registration_keeps_single_default() {
        let repo = Arc::new(ServiceRepository::<Echo>::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                thread::spawn(move || {
                    for _ in 0..16 {
                        repo.register_implementation(named("worker", ExecutionOrder::Soon), []);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let chain = repo.snapshot();
        assert_eq!(chain.len(), 128);
        assert_eq!(chain.iter().filter(|s| s.is_default()).count(), 1);
        assert!(chain.last().unwrap().is_default());
        let mut sequences: Vec<_> = chain.iter().map(|s| s.sequence()).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (0..128).collect::<Vec<_>>());
    }
}
