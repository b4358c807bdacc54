//! Singleton Registry
//!
//! One shared instance per (type, configuration) pair.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::singleton::{CtorArgs, KwArgs, SingletonKey};

type Instance = Arc<dyn Any + Send + Sync>;

static GLOBAL: Lazy<SingletonRegistry> = Lazy::new(SingletonRegistry::new);

// == Singleton Registry ==
/// Maps `(type, SingletonKey)` to the instance built for it.
///
/// A process-wide registry is available through [`SingletonRegistry::global`];
/// separate registries can be created for isolation and cleared at will.
/// Entries never expire.
#[derive(Default)]
pub struct SingletonRegistry {
    instances: Mutex<HashMap<(TypeId, SingletonKey), Instance>>,
}

impl std::fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("instances", &self.len())
            .finish()
    }
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static SingletonRegistry {
        &GLOBAL
    }

    // == Get Or Create ==
    /// Returns the instance for `args`, building it with `ctor` on first use.
    ///
    /// `ctor` runs outside the registry lock, so constructors may themselves
    /// use the registry. When two threads race on the same key, the first
    /// instance stored wins and the other is discarded.
    ///
    /// # Errors
    /// - `CacheError::PositionalArgs` if `args` carries positional arguments
    /// - whatever `ctor` returns
    pub fn get_or_create<T, F>(&self, args: CtorArgs, ctor: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&KwArgs) -> Result<T>,
    {
        if args.has_positional() {
            return Err(CacheError::PositionalArgs);
        }

        let slot = (TypeId::of::<T>(), args.key());
        if let Some(existing) = self.lookup::<T>(&slot) {
            return Ok(existing);
        }

        let created = Arc::new(ctor(args.kwargs())?);

        let mut instances = self.instances.lock();
        if let Some(existing) = Self::downcast::<T>(instances.get(&slot)) {
            return Ok(existing);
        }
        debug!(
            "Singleton created for {} with key {}",
            std::any::type_name::<T>(),
            slot.1
        );
        instances.insert(slot, Arc::clone(&created) as Instance);
        Ok(created)
    }

    /// Whether an instance of `T` exists for `args`.
    pub fn contains<T: 'static>(&self, args: &CtorArgs) -> bool {
        self.instances
            .lock()
            .contains_key(&(TypeId::of::<T>(), args.key()))
    }

    /// Forgets the instance of `T` for `args`. Holders keep their `Arc`.
    pub fn remove<T: 'static>(&self, args: &CtorArgs) -> bool {
        self.instances
            .lock()
            .remove(&(TypeId::of::<T>(), args.key()))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }

    /// Forgets every instance.
    pub fn clear(&self) {
        self.instances.lock().clear();
    }

    fn lookup<T: Send + Sync + 'static>(&self, slot: &(TypeId, SingletonKey)) -> Option<Arc<T>> {
        Self::downcast(self.instances.lock().get(slot))
    }

    fn downcast<T: Send + Sync + 'static>(instance: Option<&Instance>) -> Option<Arc<T>> {
        instance.and_then(|instance| Arc::clone(instance).downcast::<T>().ok())
    }
}

// == Constructor Singleton ==
/// Types built once per distinct keyword-argument set.
///
/// Implementors only provide [`construct`](ConstructorSingleton::construct);
/// repeated requests for the same configuration return the cached `Arc`
/// without running it again.
pub trait ConstructorSingleton: Sized + Send + Sync + 'static {
    /// Builds a fresh instance from keyword arguments.
    fn construct(kwargs: &KwArgs) -> Result<Self>;

    /// Shared instance from the process-wide registry.
    fn instance(args: CtorArgs) -> Result<Arc<Self>> {
        Self::instance_in(SingletonRegistry::global(), args)
    }

    /// Shared instance from a specific registry.
    fn instance_in(registry: &SingletonRegistry, args: CtorArgs) -> Result<Arc<Self>> {
        registry.get_or_create(args, Self::construct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTED_BUILDS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug)]
    struct Foo {
        key: String,
    }

    impl ConstructorSingleton for Foo {
        fn construct(kwargs: &KwArgs) -> Result<Self> {
            let key = match kwargs.get("key") {
                Some(_) => kwargs.require_str("key")?.to_string(),
                None => "default".to_string(),
            };
            Ok(Self { key })
        }
    }

    #[derive(Debug)]
    struct Bar;

    /// Only built by `test_construct_runs_once_per_key`.
    #[derive(Debug)]
    struct Counted;

    impl ConstructorSingleton for Counted {
        fn construct(_: &KwArgs) -> Result<Self> {
            COUNTED_BUILDS.fetch_add(1, Ordering::SeqCst);
            Ok(Self)
        }
    }

    impl ConstructorSingleton for Bar {
        fn construct(_: &KwArgs) -> Result<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn test_same_kwargs_same_instance() {
        let registry = SingletonRegistry::new();
        let a = Foo::instance_in(&registry, CtorArgs::new().kwarg("key", "a")).unwrap();
        let again = Foo::instance_in(&registry, CtorArgs::new().kwarg("key", "a")).unwrap();
        let b = Foo::instance_in(&registry, CtorArgs::new().kwarg("key", "b")).unwrap();

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.key, "b");
    }

    #[test]
    fn test_no_kwargs_share_default_instance() {
        let registry = SingletonRegistry::new();
        let a = Foo::instance_in(&registry, CtorArgs::new()).unwrap();
        let b = Foo::instance_in(&registry, CtorArgs::new()).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.key, "default");
    }

    #[test]
    fn test_positional_args_rejected() {
        let registry = SingletonRegistry::new();
        let result = Foo::instance_in(&registry, CtorArgs::new().positional("positional"));

        assert!(matches!(result, Err(CacheError::PositionalArgs)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_construct_runs_once_per_key() {
        let registry = SingletonRegistry::new();
        let args = || CtorArgs::new().kwarg("key", "once");
        Counted::instance_in(&registry, args()).unwrap();
        Counted::instance_in(&registry, args()).unwrap();
        Counted::instance_in(&registry, args()).unwrap();

        assert_eq!(COUNTED_BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_types_are_kept_apart() {
        let registry = SingletonRegistry::new();
        Foo::instance_in(&registry, CtorArgs::new()).unwrap();
        Bar::instance_in(&registry, CtorArgs::new()).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains::<Foo>(&CtorArgs::new()));
        assert!(registry.contains::<Bar>(&CtorArgs::new()));
    }

    #[test]
    fn test_failed_construction_is_not_cached() {
        let registry = SingletonRegistry::new();
        let result = Foo::instance_in(&registry, CtorArgs::new().kwarg("key", 5));

        assert!(matches!(result, Err(CacheError::InvalidArgument { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = SingletonRegistry::new();
        let first = Foo::instance_in(&registry, CtorArgs::new()).unwrap();

        assert!(registry.remove::<Foo>(&CtorArgs::new()));
        assert!(!registry.remove::<Foo>(&CtorArgs::new()));
        let second = Foo::instance_in(&registry, CtorArgs::new()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_requests_share_one_instance() {
        let registry = Arc::new(SingletonRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    Foo::instance_in(&registry, CtorArgs::new().kwarg("key", "race")).unwrap()
                })
            })
            .collect();

        let instances: Vec<Arc<Foo>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for instance in &instances {
            assert!(Arc::ptr_eq(instance, &instances[0]));
        }
        assert_eq!(registry.len(), 1);
    }
}
