// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-type pools of reusable handler instances.
//!
//! One pool exists per concrete handler type, created on first demand. Pooled
//! handlers are handed out as-is: no reset hook runs on reuse.

use indexmap::IndexMap;
use std::any::{type_name, Any, TypeId};

/// Idle handlers of one concrete type
#[derive(Debug)]
struct HandlerPool {
    /// Handler type name, for diagnostics
    type_name: &'static str,
    /// Idle instances ready for reuse
    free: Vec<Box<dyn Any>>,
    /// Number of instances constructed for this pool
    created: usize,
}

impl HandlerPool {
    fn new<H: 'static>() -> Self {
        Self {
            type_name: type_name::<H>(),
            free: Vec::new(),
            created: 0,
        }
    }
}

/// Handler pools keyed by concrete handler type
#[derive(Debug, Default)]
pub struct HandlerPools {
    pools: IndexMap<TypeId, HandlerPool>,
    /// Cap on idle handlers kept per type (`None` = unbounded)
    max_idle: Option<usize>,
}

impl HandlerPools {
    /// Create empty, unbounded pools
    pub fn new() -> Self {
        Self::default()
    }

    /// Create pools keeping at most `max_idle` idle handlers per type
    pub fn with_max_idle(max_idle: Option<usize>) -> Self {
        Self {
            pools: IndexMap::new(),
            max_idle,
        }
    }

    /// Take a recycled handler, or construct one if the pool is empty
    pub fn acquire<H: Default + 'static>(&mut self) -> Box<H> {
        let pool = self
            .pools
            .entry(TypeId::of::<H>())
            .or_insert_with(HandlerPool::new::<H>);

        while let Some(recycled) = pool.free.pop() {
            if let Ok(handler) = recycled.downcast::<H>() {
                return handler;
            }
        }

        pool.created += 1;
        tracing::trace!(
            "Handler pool {} grew to {} instances",
            pool.type_name,
            pool.created
        );
        Box::new(H::default())
    }

    /// Return a handler to its type's pool
    pub fn release<H: 'static>(&mut self, handler: Box<H>) {
        let max_idle = self.max_idle;
        let pool = self
            .pools
            .entry(TypeId::of::<H>())
            .or_insert_with(HandlerPool::new::<H>);

        if max_idle.is_some_and(|max| pool.free.len() >= max) {
            return;
        }
        pool.free.push(handler);
    }

    /// Construct idle handlers until `count` are available
    pub fn prewarm<H: Default + 'static>(&mut self, count: usize) {
        let count = self.max_idle.map_or(count, |max| count.min(max));
        let pool = self
            .pools
            .entry(TypeId::of::<H>())
            .or_insert_with(HandlerPool::new::<H>);

        while pool.free.len() < count {
            pool.free.push(Box::new(H::default()));
            pool.created += 1;
        }
    }

    /// Number of idle handlers of type `H`
    pub fn available<H: 'static>(&self) -> usize {
        self.pools
            .get(&TypeId::of::<H>())
            .map_or(0, |p| p.free.len())
    }

    /// Number of handlers of type `H` ever constructed by these pools
    pub fn created<H: 'static>(&self) -> usize {
        self.pools
            .get(&TypeId::of::<H>())
            .map_or(0, |p| p.created)
    }

    /// Number of handler types with a pool
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Drop every pool and its idle handlers
    pub fn clear(&mut self) {
        self.pools.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        uses: u32,
    }

    #[derive(Debug, Default)]
    struct Other;

    #[test]
    fn test_acquire_reuses_released_instance() {
        let mut pools = HandlerPools::new();
        let mut handler = pools.acquire::<Counter>();
        handler.uses += 1;
        let addr: *const Counter = &*handler;
        pools.release(handler);
        assert_eq!(pools.available::<Counter>(), 1);

        let handler = pools.acquire::<Counter>();
        assert_eq!(handler.uses, 1);
        assert_eq!(&*handler as *const Counter, addr);
        assert_eq!(pools.created::<Counter>(), 1);
        assert_eq!(pools.available::<Counter>(), 0);
    }

    #[test]
    fn test_pools_are_per_type() {
        let mut pools = HandlerPools::new();
        let a = pools.acquire::<Counter>();
        let b = pools.acquire::<Other>();
        pools.release(a);
        pools.release(b);
        assert_eq!(pools.pool_count(), 2);
        assert_eq!(pools.available::<Counter>(), 1);
        assert_eq!(pools.available::<Other>(), 1);

        pools.clear();
        assert_eq!(pools.pool_count(), 0);
        assert_eq!(pools.available::<Counter>(), 0);
    }

    #[test]
    fn test_max_idle_caps_released_handlers() {
        let mut pools = HandlerPools::with_max_idle(Some(1));
        let a = pools.acquire::<Counter>();
        let b = pools.acquire::<Counter>();
        pools.release(a);
        pools.release(b);
        assert_eq!(pools.available::<Counter>(), 1);
        assert_eq!(pools.created::<Counter>(), 2);

        pools.prewarm::<Counter>(4);
        assert_eq!(pools.available::<Counter>(), 1);
    }

    #[test]
    fn test_prewarm() {
        let mut pools = HandlerPools::new();
        pools.prewarm::<Counter>(3);
        assert_eq!(pools.available::<Counter>(), 3);
        let _handler = pools.acquire::<Counter>();
        assert_eq!(pools.created::<Counter>(), 3);
    }
}
