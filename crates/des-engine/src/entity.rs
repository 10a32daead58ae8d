//! Entities and the entity registry.
//!
//! An entity is a named, numbered, long-lived simulation object — a task, a
//! station, a server.  The registry exists for two things:
//!
//! - **lookup**: scripted construction resolves entities by name;
//! - **multicast**: before and after every replica, the driver calls every
//!   live entity's `new_run`/`end_run` hook, in registration order.
//!
//! Ownership stays with application code (`Rc<RefCell<T>>`); the registry
//! holds weak references and treats a dead one as deregistered.  That gives
//! the construct/register, destroy/deregister pairing without destructors.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use des_core::EntityId;

use crate::error::{EngineError, EngineResult};
use crate::sim::Simulation;

// ── Entity ────────────────────────────────────────────────────────────────────

/// A long-lived simulation object with per-replica lifecycle hooks.
///
/// `new_run` is called once before each replica starts (post the initial
/// events, reset state); `end_run` once after it ends (drop pending events,
/// flush).  Both default to no-ops.  A hook error aborts the replica; the
/// driver clears the event queue before propagating it.
///
/// The `Any` supertrait allows concrete-type recovery after a registry
/// lookup (`find` returns `dyn Entity`).
pub trait Entity: Any {
    fn new_run(&mut self, _sim: &mut Simulation) -> EngineResult<()> {
        Ok(())
    }

    fn end_run(&mut self, _sim: &mut Simulation) -> EngineResult<()> {
        Ok(())
    }
}

/// Shared handle onto a registered entity.
pub type EntityHandle = Rc<RefCell<dyn Entity>>;

// ── EntityRegistry ────────────────────────────────────────────────────────────

struct Entry {
    id: EntityId,
    name: String,
    entity: Weak<RefCell<dyn Entity>>,
    /// Same object behind `dyn Any`, for typed recovery via `find_as`.
    concrete: Weak<dyn Any>,
}

/// Registration-ordered collection of weak entity references.
#[derive(Default)]
pub(crate) struct EntityRegistry {
    entries: Vec<Entry>,
    /// Name → index into `entries`.  Empty names get no binding.
    by_name: HashMap<String, usize>,
}

impl EntityRegistry {
    /// Register an entity, allocating the next id.  A non-empty name must
    /// be unique; an empty name skips the lookup binding.
    pub(crate) fn add(
        &mut self,
        name: &str,
        entity: Weak<RefCell<dyn Entity>>,
        concrete: Weak<dyn Any>,
    ) -> EngineResult<EntityId> {
        let id = EntityId(self.entries.len() as u32);
        if !name.is_empty() {
            if self.by_name.contains_key(name) {
                return Err(EngineError::DuplicateName(name.to_owned()));
            }
            self.by_name.insert(name.to_owned(), self.entries.len());
        }
        self.entries.push(Entry {
            id,
            name: name.to_owned(),
            entity,
            concrete,
        });
        Ok(id)
    }

    /// Look an entity up by name.  Absence — never bound, or already
    /// destroyed — is an error, not a tolerated state.
    pub(crate) fn find(&self, name: &str) -> EngineResult<EntityHandle> {
        self.by_name
            .get(name)
            .and_then(|&i| self.entries[i].entity.upgrade())
            .ok_or_else(|| EngineError::NotFound(name.to_owned()))
    }

    /// Look an entity up by name, recovering its concrete type.
    pub(crate) fn find_as<T: Entity>(&self, name: &str) -> EngineResult<Rc<RefCell<T>>> {
        let entry = self
            .by_name
            .get(name)
            .and_then(|&i| self.entries[i].concrete.upgrade())
            .ok_or_else(|| EngineError::NotFound(name.to_owned()))?;
        entry
            .downcast::<RefCell<T>>()
            .map_err(|_| EngineError::EntityType(name.to_owned()))
    }

    /// Snapshot of all live entities, in registration order, with names for
    /// diagnostics.
    pub(crate) fn live(&self) -> Vec<(EntityId, String, EntityHandle)> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.entity
                    .upgrade()
                    .map(|rc| (e.id, e.name.clone(), rc))
            })
            .collect()
    }

    /// Number of registrations ever made (dead entries included — ids are
    /// registration numbers, not a live count).
    pub(crate) fn registered(&self) -> usize {
        self.entries.len()
    }
}
