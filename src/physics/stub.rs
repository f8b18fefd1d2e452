//! Deterministic kinematic stand-in for the external engine.
//!
//! Bodies integrate position from velocity and velocity from per-body
//! gravity; there is no collision detection or constraint solving. Contacts
//! are injected with [`StubPhysicsWorld::set_contacts`] and persist until
//! replaced, the way a real engine re-reports persistent manifolds each
//! frame.

use std::collections::HashMap;

use glam::{Quat, Vec3};

use super::{BodyId, ContactPoint, JointHandle, JointLimits, PhysicsWorld};

#[derive(Debug, Clone)]
struct BodyState {
    position: Vec3,
    orientation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    gravity: Vec3,
    /// Static bodies ignore gravity and velocity integration
    is_static: bool,
}

#[derive(Debug, Clone)]
pub struct StubJoint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub anchor: Vec3,
    pub limits: JointLimits,
}

#[derive(Default)]
pub struct StubPhysicsWorld {
    bodies: HashMap<BodyId, BodyState>,
    joints: HashMap<JointHandle, StubJoint>,
    contacts: Vec<ContactPoint>,
    next_body: u64,
    next_joint: u64,
}

impl StubPhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_body(&mut self, position: Vec3) -> BodyId {
        self.spawn(position, false)
    }

    pub fn spawn_static_body(&mut self, position: Vec3) -> BodyId {
        self.spawn(position, true)
    }

    fn spawn(&mut self, position: Vec3, is_static: bool) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            id,
            BodyState {
                position,
                orientation: Quat::IDENTITY,
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
                gravity: Vec3::ZERO,
                is_static,
            },
        );
        id
    }

    pub fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec3) {
        if let Some(state) = self.bodies.get_mut(&body) {
            state.linear_velocity = velocity;
        }
    }

    /// Replace the contact list reported by [`PhysicsWorld::contacts`]
    pub fn set_contacts(&mut self, contacts: Vec<ContactPoint>) {
        self.contacts = contacts;
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joint(&self, handle: JointHandle) -> Option<&StubJoint> {
        self.joints.get(&handle)
    }
}

impl PhysicsWorld for StubPhysicsWorld {
    fn step(&mut self, dt_sec: f32) {
        for state in self.bodies.values_mut() {
            if state.is_static {
                continue;
            }
            state.linear_velocity += state.gravity * dt_sec;
            state.position += state.linear_velocity * dt_sec;
            let w = state.angular_velocity;
            if w.length_squared() > 0.0 {
                let angle = w.length() * dt_sec;
                state.orientation = (Quat::from_axis_angle(w.normalize(), angle)
                    * state.orientation)
                    .normalize();
            }
        }
    }

    fn body_position(&self, body: BodyId) -> Vec3 {
        self.bodies.get(&body).map(|s| s.position).unwrap_or(Vec3::ZERO)
    }

    fn body_orientation(&self, body: BodyId) -> Quat {
        self.bodies
            .get(&body)
            .map(|s| s.orientation)
            .unwrap_or(Quat::IDENTITY)
    }

    fn body_linear_velocity(&self, body: BodyId) -> Vec3 {
        self.bodies
            .get(&body)
            .map(|s| s.linear_velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_angular_velocity(&mut self, body: BodyId, velocity: Vec3) {
        if let Some(state) = self.bodies.get_mut(&body) {
            state.angular_velocity = velocity;
        }
    }

    fn set_gravity(&mut self, body: BodyId, acceleration: Vec3) {
        if let Some(state) = self.bodies.get_mut(&body) {
            state.gravity = acceleration;
        }
    }

    fn contacts(&self) -> &[ContactPoint] {
        &self.contacts
    }

    fn add_joint(
        &mut self,
        a: BodyId,
        b: BodyId,
        anchor: Vec3,
        limits: JointLimits,
    ) -> JointHandle {
        let handle = JointHandle(self.next_joint);
        self.next_joint += 1;
        self.joints.insert(
            handle,
            StubJoint {
                body_a: a,
                body_b: b,
                anchor,
                limits,
            },
        );
        handle
    }

    fn set_joint_limits(&mut self, joint: JointHandle, limits: JointLimits) {
        if let Some(j) = self.joints.get_mut(&joint) {
            j.limits = limits;
        }
    }

    fn remove_joint(&mut self, joint: JointHandle) {
        self.joints.remove(&joint);
    }
}
