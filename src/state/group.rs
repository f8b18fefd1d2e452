//! Named cell groups.
//!
//! Groups collect cells seeded together so their collective drift can be
//! tracked: the exported group table reports each group's center of mass
//! and membership count per output interval.

use glam::Vec3;

#[derive(Debug, Clone)]
pub struct CellGroup {
    pub name: String,
    /// Ids of member cells
    pub members: Vec<u32>,
}

impl CellGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn add_member(&mut self, cell_id: u32) {
        self.members.push(cell_id);
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Center of mass of the member positions; zero for an empty group
    pub fn center_of_mass(&self, positions: &[Vec3]) -> Vec3 {
        if positions.is_empty() {
            return Vec3::ZERO;
        }
        positions.iter().sum::<Vec3>() / positions.len() as f32
    }
}
