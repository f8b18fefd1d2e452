//! A migrating cell with a segmented surface.
//!
//! Each cell owns an icosphere surface mesh and the receptor kinetics state
//! for every triangular segment of it. The rigid body itself lives in the
//! external physics engine; the cell only holds its handle.

use glam::{Quat, Vec3};

use crate::config::CellParameters;
use crate::geometry::SphereMesh;
use crate::kinetics::{MembraneProteinSpecies, SegmentKinetics};
use crate::physics::BodyId;

pub struct SegmentedCell {
    pub id: u32,
    pub body: BodyId,
    pub kinetics: SegmentKinetics,
    mesh: SphereMesh,
    radius_um: f32,
    volume_um3: f32,
    mass_pg: f32,
}

impl SegmentedCell {
    pub fn new(
        id: u32,
        body: BodyId,
        params: &CellParameters,
        species: &[MembraneProteinSpecies],
    ) -> Self {
        let mesh = SphereMesh::icosphere(params.radius_um, params.detail_level);
        let kinetics = SegmentKinetics::new(mesh.triangle_areas_um2(), species);

        let r = params.radius_um;
        let volume_um3 = 4.0 / 3.0 * std::f32::consts::PI * r * r * r;
        let mass_pg = params.density_pg_per_um3 * volume_um3;

        Self {
            id,
            body,
            kinetics,
            mesh,
            radius_um: r,
            volume_um3,
            mass_pg,
        }
    }

    pub fn radius_um(&self) -> f32 {
        self.radius_um
    }

    pub fn mass_pg(&self) -> f32 {
        self.mass_pg
    }

    pub fn num_segments(&self) -> usize {
        self.mesh.num_triangles()
    }

    pub fn mesh(&self) -> &SphereMesh {
        &self.mesh
    }

    /// Gravity corrected for buoyancy in water-density medium:
    /// a = g (V - m) / (m + V), with water density 1 pg/μm³
    pub fn buoyant_acceleration(&self) -> Vec3 {
        let g = 9.8;
        let accel = g * (self.volume_um3 - self.mass_pg) / (self.mass_pg + self.volume_um3);
        Vec3::new(0.0, accel, 0.0)
    }

    /// World-space centroid of one surface segment given the body pose
    pub fn segment_world_centroid(&self, segment: usize, position: Vec3, orientation: Quat) -> Vec3 {
        position + orientation * self.mesh.triangle_centroid(segment)
    }
}
