//! Process-wide component registry and type-erased component bundles.
//!
//! ## Purpose
//! The registry assigns each distinct component type a dense, stable
//! [`ComponentId`] on first reference, records per-type metadata
//! ([`ComponentDesc`]), and installs a storage factory so archetypes can
//! allocate an empty typed column from an id alone.
//!
//! ## Design
//! - One registry per process, shared by every world, usable before any
//!   world exists.
//! - Ids are allocated monotonically from zero; the mapping `type -> id` is
//!   deterministic for a fixed first-touch order within a run.
//! - Registration is idempotent: re-registering a type returns its id.
//! - Registration fails once [`MAX_COMPONENTS`] types exist.
//!
//! ## Concurrency
//! The registry sits behind an `RwLock` so concurrent lookups stay cheap
//! and writes are serialized. Everything else in the store is
//! single-threaded by contract; this is the one process-wide resource.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::mem::{align_of, size_of};
use std::sync::{OnceLock, RwLock};

use crate::engine::error::{EcsResult, RegistryError};
use crate::engine::storage::{Column, TypedColumn};
use crate::engine::types::{ComponentId, Fingerprint, MAX_COMPONENTS};

/// Factory producing an empty typed column for a registered component.
type ColumnFactory = fn() -> Box<dyn Column>;

fn new_column<T: 'static + Send + Sync>() -> Box<dyn Column> {
    Box::new(TypedColumn::<T>::new())
}

/// Describes a registered component type.
///
/// `ComponentDesc` is `Copy` and safe to hand out freely for diagnostics
/// and tooling; it carries no storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentDesc {
    /// Runtime identifier assigned by the registry.
    pub component_id: ComponentId,
    /// Rust type name for diagnostics.
    pub name: &'static str,
    /// Runtime `TypeId` of the component type.
    pub type_id: TypeId,
    /// Size of the component type in bytes.
    pub size: usize,
    /// Alignment of the component type in bytes.
    pub align: usize,
}

impl ComponentDesc {
    fn of<T: 'static>(component_id: ComponentId) -> Self {
        Self {
            component_id,
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }
}

impl fmt::Display for ComponentDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComponentDesc {{ id: {}, name: {}, size: {}, align: {} }}",
            self.component_id, self.name, self.size, self.align
        )
    }
}

/// Mapping between Rust component types and dense [`ComponentId`]s.
///
/// ## Invariants
/// - Every entry in `by_type` has a matching descriptor and factory at the
///   same id.
/// - Issued ids are contiguous in `[0, next_id)`.
pub struct ComponentRegistry {
    next_id: ComponentId,
    by_type: HashMap<TypeId, ComponentId>,
    by_id: Vec<Option<ComponentDesc>>,
    factories: Vec<Option<ColumnFactory>>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// Creates an empty registry.
    ///
    /// Worlds share the process-wide instance behind [`component_id_of`];
    /// constructing a standalone registry is mainly useful for tests.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            by_type: HashMap::new(),
            by_id: vec![None; MAX_COMPONENTS],
            factories: vec![None; MAX_COMPONENTS],
        }
    }

    fn alloc_id(&mut self) -> Result<ComponentId, RegistryError> {
        let component_id = self.next_id;
        if (component_id as usize) >= MAX_COMPONENTS {
            return Err(RegistryError::CapacityExceeded { cap: MAX_COMPONENTS });
        }
        self.next_id = component_id.wrapping_add(1);
        Ok(component_id)
    }

    /// Registers component type `T` and returns its id.
    ///
    /// ## Behavior
    /// - If `T` is already registered, returns the existing id.
    /// - Otherwise allocates the next id, stores a [`ComponentDesc`], and
    ///   installs the column factory used by archetype construction.
    ///
    /// ## Errors
    /// `CapacityExceeded` when [`MAX_COMPONENTS`] types already exist.
    pub fn register<T: 'static + Send + Sync>(&mut self) -> Result<ComponentId, RegistryError> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Ok(existing);
        }

        let component_id = self.alloc_id()?;
        self.by_type.insert(type_id, component_id);
        self.by_id[component_id as usize] = Some(ComponentDesc::of::<T>(component_id));
        self.factories[component_id as usize] = Some(new_column::<T>);

        tracing::debug!(
            component = type_name::<T>(),
            id = component_id,
            "registered component type"
        );

        Ok(component_id)
    }

    /// Returns the id for `T`, if registered.
    pub fn id_of<T: 'static>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the descriptor for `component_id`, if registered.
    pub fn description(&self, component_id: ComponentId) -> Option<&ComponentDesc> {
        self.by_id.get(component_id as usize).and_then(|d| d.as_ref())
    }

    /// Returns the column factory for `component_id`.
    pub fn factory(&self, component_id: ComponentId) -> Result<ColumnFactory, RegistryError> {
        self.factories
            .get(component_id as usize)
            .copied()
            .flatten()
            .ok_or(RegistryError::MissingFactory { component_id })
    }
}

static REGISTRY: OnceLock<RwLock<ComponentRegistry>> = OnceLock::new();

fn registry() -> &'static RwLock<ComponentRegistry> {
    REGISTRY.get_or_init(|| RwLock::new(ComponentRegistry::new()))
}

/// Returns the [`ComponentId`] for `T`, registering the type on first use.
///
/// The id is process-wide: every world in the process sees the same
/// assignment, and repeated calls are idempotent.
///
/// ## Errors
/// `TooManyComponents` (as [`RegistryError::CapacityExceeded`]) when the
/// registry is full; `PoisonedLock` if another thread panicked inside the
/// registry.
pub fn component_id_of<T: 'static + Send + Sync>() -> EcsResult<ComponentId> {
    {
        let registry = registry().read().map_err(|_| RegistryError::PoisonedLock)?;
        if let Some(component_id) = registry.id_of::<T>() {
            return Ok(component_id);
        }
    }
    let mut registry = registry().write().map_err(|_| RegistryError::PoisonedLock)?;
    Ok(registry.register::<T>()?)
}

/// Registers component type `T` explicitly.
///
/// Equivalent to [`component_id_of`]; useful at startup to pin the id
/// assignment order before any world is touched.
pub fn register_component<T: 'static + Send + Sync>() -> EcsResult<ComponentId> {
    component_id_of::<T>()
}

/// Returns a copy of the descriptor for `component_id`, if registered.
pub fn component_description(component_id: ComponentId) -> EcsResult<Option<ComponentDesc>> {
    let registry = registry().read().map_err(|_| RegistryError::PoisonedLock)?;
    Ok(registry.description(component_id).copied())
}

/// Allocates an empty typed column for `component_id`.
///
/// Used by archetype construction; fails when the id was never issued.
pub(crate) fn new_column_for(component_id: ComponentId) -> EcsResult<Box<dyn Column>> {
    let factory = {
        let registry = registry().read().map_err(|_| RegistryError::PoisonedLock)?;
        registry.factory(component_id)?
    };
    Ok(factory())
}

/// Type-erased source of component values, consumed while writing one row.
pub trait DynamicBundle {
    /// Fingerprint of the components the bundle carries.
    fn fingerprint(&self) -> Fingerprint;

    /// Removes and returns the value for `component_id`, if present.
    fn take(&mut self, component_id: ComponentId) -> Option<Box<dyn Any + Send>>;
}

/// Heterogeneous set of component values used to spawn an entity.
///
/// Values are stored sparsely alongside a fingerprint of their component
/// ids. Inserting a component that is already present replaces the earlier
/// value.
pub struct Bundle {
    fingerprint: Fingerprint,
    values: Vec<(ComponentId, Box<dyn Any + Send>)>,
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self { fingerprint: Fingerprint::empty(), values: Vec::new() }
    }

    /// Adds a component value, consuming and returning the bundle.
    ///
    /// Registers `T` on first use. A later value for the same component
    /// replaces the earlier one.
    pub fn with<T: 'static + Send + Sync>(mut self, value: T) -> EcsResult<Self> {
        self.insert(value)?;
        Ok(self)
    }

    /// Adds a component value in place.
    pub fn insert<T: 'static + Send + Sync>(&mut self, value: T) -> EcsResult<()> {
        let component_id = component_id_of::<T>()?;
        if self.fingerprint.contains(component_id) {
            let slot = self
                .values
                .iter_mut()
                .find(|(existing, _)| *existing == component_id)
                .expect("bundle fingerprint out of sync with values");
            slot.1 = Box::new(value);
        } else {
            self.fingerprint.set(component_id);
            self.values.push((component_id, Box::new(value)));
        }
        Ok(())
    }

    /// Number of component values held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the bundle holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl DynamicBundle for Bundle {
    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    fn take(&mut self, component_id: ComponentId) -> Option<Box<dyn Any + Send>> {
        let index = self.values.iter().position(|(id, _)| *id == component_id)?;
        let (_, value) = self.values.swap_remove(index);
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha(#[allow(dead_code)] u32);
    struct Beta;

    #[test]
    fn registration_is_idempotent_and_monotonic() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register::<Alpha>().unwrap();
        let b = registry.register::<Beta>().unwrap();
        assert!(a < b);
        assert_eq!(registry.register::<Alpha>().unwrap(), a);
        assert_eq!(registry.id_of::<Beta>(), Some(b));

        let desc = registry.description(a).unwrap();
        assert_eq!(desc.component_id, a);
        assert_eq!(desc.type_id, TypeId::of::<Alpha>());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Alpha>().unwrap();
        // Exhaust the id space directly; distinct Rust types are not needed
        // to exercise the allocator's bound.
        for _ in 1..MAX_COMPONENTS {
            registry.alloc_id().unwrap();
        }
        assert_eq!(
            registry.alloc_id(),
            Err(RegistryError::CapacityExceeded { cap: MAX_COMPONENTS })
        );
    }

    #[test]
    fn factory_builds_a_column_of_the_registered_type() {
        let mut registry = ComponentRegistry::new();
        let id = registry.register::<Alpha>().unwrap();
        let column = registry.factory(id).unwrap()();
        assert_eq!(column.element_type_id(), TypeId::of::<Alpha>());
        assert!(registry.factory(id + 1).is_err());
    }

    #[test]
    fn bundle_replaces_duplicate_components() {
        let mut bundle = Bundle::new().with(Alpha(1)).unwrap().with(Alpha(2)).unwrap();
        assert_eq!(bundle.len(), 1);
        let id = component_id_of::<Alpha>().unwrap();
        let value = bundle.take(id).unwrap();
        assert_eq!(value.downcast::<Alpha>().unwrap().0, 2);
        assert!(bundle.take(id).is_none());
    }
}
