//! Constraint storage.
//!
//! Constraints live in an arena indexed by stable generational handles,
//! with a hash map from collision id to handle for the contact scan. This
//! replaces pointer-chasing ownership between bodies and constraints: a
//! stale handle simply resolves to nothing.

use std::collections::HashMap;

use super::constraint::AdhesionConstraint;

/// Stable handle to a constraint slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintHandle {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    value: Option<AdhesionConstraint>,
}

#[derive(Default)]
pub struct ConstraintRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_collision: HashMap<u64, ConstraintHandle>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_collision.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_collision.is_empty()
    }

    pub fn insert(&mut self, constraint: AdhesionConstraint) -> ConstraintHandle {
        let collision_id = constraint.collision_id;
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.value = Some(constraint);
                ConstraintHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(constraint),
                });
                ConstraintHandle {
                    index,
                    generation: 0,
                }
            }
        };
        self.by_collision.insert(collision_id, handle);
        handle
    }

    pub fn get(&self, handle: ConstraintHandle) -> Option<&AdhesionConstraint> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: ConstraintHandle) -> Option<&mut AdhesionConstraint> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Handle of the constraint registered for a collision id, if any
    pub fn find_by_collision(&self, collision_id: u64) -> Option<ConstraintHandle> {
        self.by_collision.get(&collision_id).copied()
    }

    /// Remove a constraint; its slot is recycled and the handle goes stale
    pub fn remove(&mut self, handle: ConstraintHandle) -> Option<AdhesionConstraint> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let constraint = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.by_collision.remove(&constraint.collision_id);
        Some(constraint)
    }

    /// Snapshot of all live handles, in slot order
    pub fn handles(&self) -> Vec<ConstraintHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(index, slot)| ConstraintHandle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyId, JointHandle};

    fn constraint(collision_id: u64) -> AdhesionConstraint {
        AdhesionConstraint::new(
            collision_id,
            BodyId(0),
            BodyId(1),
            0,
            0,
            0,
            100.0,
            1000.0,
            JointHandle(0),
            0,
            5000.0,
        )
    }

    #[test]
    fn test_insert_and_lookup_by_collision() {
        let mut registry = ConstraintRegistry::new();
        let handle = registry.insert(constraint(42));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find_by_collision(42), Some(handle));
        assert!(registry.find_by_collision(7).is_none());
        assert_eq!(registry.get(handle).unwrap().collision_id, 42);
    }

    #[test]
    fn test_removed_handle_goes_stale() {
        let mut registry = ConstraintRegistry::new();
        let handle = registry.insert(constraint(1));
        assert!(registry.remove(handle).is_some());
        assert!(registry.get(handle).is_none());
        assert!(registry.remove(handle).is_none());
        assert!(registry.find_by_collision(1).is_none());

        // The slot is recycled under a new generation
        let handle2 = registry.insert(constraint(2));
        assert!(registry.get(handle).is_none());
        assert!(registry.get(handle2).is_some());
    }

    #[test]
    fn test_handles_snapshot() {
        let mut registry = ConstraintRegistry::new();
        let h1 = registry.insert(constraint(1));
        let _h2 = registry.insert(constraint(2));
        let h3 = registry.insert(constraint(3));
        registry.remove(h1);

        let handles = registry.handles();
        assert_eq!(handles.len(), 2);
        assert!(handles.contains(&h3));
    }
}
