//! External physics engine boundary.
//!
//! Rigid-body dynamics, broad/narrow-phase collision detection, and
//! constraint solving live in an external engine. This module defines the
//! narrow interface the simulation relies on: per-body pose and velocity
//! queries and mutators, a per-frame contact list, and 6-DOF joints with
//! per-axis limits. [`stub::StubPhysicsWorld`] is a deterministic kinematic
//! stand-in used in tests and headless runs.

pub mod stub;

use glam::{Quat, Vec3};

pub use stub::StubPhysicsWorld;

/// Opaque handle to a rigid body owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

/// Opaque handle to a joint owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub u64);

/// One narrow-phase contact point reported by the engine
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Contact location in world coordinates (μm)
    pub point: Vec3,
    /// Penetration depth (μm); small positive values graze, larger values
    /// overlap
    pub penetration_depth_um: f32,
    /// Surface triangle index on body A, when A has a triangulated shape
    pub segment_a: Option<u32>,
    /// Surface triangle index on body B, when B has a triangulated shape
    pub segment_b: Option<u32>,
}

impl ContactPoint {
    /// Triangle index on whichever side reported one
    pub fn segment_index(&self) -> Option<u32> {
        self.segment_a.or(self.segment_b)
    }
}

/// Per-axis translational and rotational limits of a 6-DOF joint.
///
/// Equal lower and upper values lock an axis; lower > upper frees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    pub linear_lower: Vec3,
    pub linear_upper: Vec3,
    pub angular_lower: Vec3,
    pub angular_upper: Vec3,
}

impl JointLimits {
    /// Limits that pin two bodies together with no play
    pub fn locked() -> Self {
        Self {
            linear_lower: Vec3::ZERO,
            linear_upper: Vec3::ZERO,
            angular_lower: Vec3::ZERO,
            angular_upper: Vec3::ZERO,
        }
    }
}

/// The engine-facing interface.
///
/// All calls are synchronous; the engine is stepped exactly once per
/// simulation tick, between the kinetics pass and the contact scan.
pub trait PhysicsWorld {
    /// Advance the dynamics by `dt_sec`
    fn step(&mut self, dt_sec: f32);

    fn body_position(&self, body: BodyId) -> Vec3;
    fn body_orientation(&self, body: BodyId) -> Quat;
    fn body_linear_velocity(&self, body: BodyId) -> Vec3;
    fn set_angular_velocity(&mut self, body: BodyId, velocity: Vec3);
    /// Per-body gravity; buoyancy is folded in by the caller
    fn set_gravity(&mut self, body: BodyId, acceleration: Vec3);

    /// Contact points found by the most recent step
    fn contacts(&self) -> &[ContactPoint];

    /// Create a 6-DOF joint between two bodies anchored at a world point
    fn add_joint(&mut self, a: BodyId, b: BodyId, anchor: Vec3, limits: JointLimits)
        -> JointHandle;

    /// Reshape an existing joint's limits; unknown handles are ignored
    fn set_joint_limits(&mut self, joint: JointHandle, limits: JointLimits);

    /// Remove a joint; removing an already-removed handle is a no-op
    fn remove_joint(&mut self, joint: JointHandle);
}
