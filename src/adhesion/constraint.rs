//! A single adhesion constraint and its decay model.

use glam::Vec3;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::kinetics::SegmentKinetics;
use crate::physics::{BodyId, JointHandle, JointLimits, PhysicsWorld};

/// Maturation state of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondState {
    /// Created; fewer than two check-ins so far
    Pending,
    /// Both bodies registered the contact; the joint carries load
    Active,
    /// Destroyed
    Retired,
}

/// How the breakage force factor is supplied.
///
/// No force-sensing input exists yet, so the default is a constant; a
/// custom function can be injected to couple breakage to bond loading.
#[derive(Debug, Clone, Copy)]
pub enum ForceFactor {
    Constant(f64),
    Custom(fn(bonds: f64, max_bonds: f64) -> f64),
}

impl ForceFactor {
    pub fn evaluate(&self, bonds: f64, max_bonds: f64) -> f64 {
        let value = match self {
            ForceFactor::Constant(v) => *v,
            ForceFactor::Custom(f) => f(bonds, max_bonds),
        };
        value.clamp(0.0, 1.0)
    }
}

/// Parameters of the stochastic decay model shared by all constraints
#[derive(Debug, Clone)]
pub struct DecayModel {
    /// Mean of the drawn maximum lifespan (ms)
    pub mean_lifespan_ms: f64,
    /// Gaussian spread of the drawn lifespan (ms)
    pub lifespan_sd_ms: f64,
    /// Below this bond count a constraint retires on its next update
    pub min_bonds: f64,
    /// Fraction of bonds lost per tick while active
    pub bond_attrition_per_tick: f64,
    /// Linear joint travel allowed at zero bond strength (μm)
    pub max_bond_length_um: f32,
    pub force_factor: ForceFactor,
}

impl DecayModel {
    pub fn from_params(params: &crate::config::AdhesionParameters) -> Self {
        Self {
            mean_lifespan_ms: params.mean_lifespan_ms,
            lifespan_sd_ms: params.lifespan_sd_ms,
            min_bonds: params.min_bonds,
            bond_attrition_per_tick: params.bond_attrition_per_tick,
            max_bond_length_um: params.max_bond_length_um,
            force_factor: ForceFactor::Constant(params.force_factor),
        }
    }

    /// Draw a maximum lifespan for one new constraint (ms)
    pub fn draw_lifespan_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let gauss: f64 = rng.sample(StandardNormal);
        (self.mean_lifespan_ms + gauss * self.lifespan_sd_ms).max(1.0)
    }
}

/// Joint limits for a given bond strength in [0, 1]: free approach along
/// the bond axis up to the slack length, rotation narrowing as the bond
/// strengthens.
pub fn limits_for_strength(strength: f32, decay: &DecayModel) -> JointLimits {
    let strength = strength.clamp(0.0, 1.0);
    let bond_length = (1.0 - strength) * decay.max_bond_length_um;
    let angular_x = strength * std::f32::consts::PI;
    let angular_yz = strength * std::f32::consts::FRAC_PI_2;
    JointLimits {
        linear_lower: Vec3::ZERO,
        linear_upper: Vec3::new(0.0, bond_length, 0.0),
        angular_lower: Vec3::new(-angular_x, -angular_yz, -angular_yz),
        angular_upper: Vec3::new(angular_x, angular_yz, angular_yz),
    }
}

/// What an update pass decided about a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Keep,
    Retire,
}

/// A candidate or active mechanical bond between two bodies at a contact
pub struct AdhesionConstraint {
    pub collision_id: u64,
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Index of the owning cell in the orchestrator's cell list
    pub cell: usize,
    /// Contacted surface segment on the owning cell
    pub segment: usize,
    /// Adhesion species whose receptors the bond consumed
    pub species: usize,

    state: BondState,
    check_ins: u8,
    ever_activated: bool,
    reclaimed: bool,
    created_at_ms: u64,
    lifespan_ms: f64,
    joint: Option<JointHandle>,

    /// Bonds currently holding; attrition erodes this while active
    pub bonds: f64,
    /// Receptors available on the segment when the bond formed
    pub max_bonds: f64,
    /// Receptors debited from the free pool at creation
    initial_bonds: f64,
}

impl AdhesionConstraint {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collision_id: u64,
        body_a: BodyId,
        body_b: BodyId,
        cell: usize,
        segment: usize,
        species: usize,
        bonds: f64,
        max_bonds: f64,
        joint: JointHandle,
        created_at_ms: u64,
        lifespan_ms: f64,
    ) -> Self {
        Self {
            collision_id,
            body_a,
            body_b,
            cell,
            segment,
            species,
            state: BondState::Pending,
            check_ins: 0,
            ever_activated: false,
            reclaimed: false,
            created_at_ms,
            lifespan_ms,
            joint: Some(joint),
            bonds,
            max_bonds,
            initial_bonds: bonds,
        }
    }

    pub fn state(&self) -> BondState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == BondState::Active
    }

    pub fn check_in_count(&self) -> u8 {
        self.check_ins
    }

    pub fn ever_activated(&self) -> bool {
        self.ever_activated
    }

    pub fn joint(&self) -> Option<JointHandle> {
        self.joint
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms)
    }

    /// One body registering the contact. The count caps at two; reaching
    /// two activates the constraint.
    pub fn check_in(&mut self) {
        if self.state == BondState::Retired {
            return;
        }
        if self.check_ins < 2 {
            self.check_ins += 1;
        }
        if self.check_ins >= 2 && self.state == BondState::Pending {
            self.state = BondState::Active;
            self.ever_activated = true;
        }
    }

    /// Fraction of the possible bonds currently holding
    pub fn strength(&self) -> f64 {
        if self.max_bonds > 0.0 {
            (self.bonds / self.max_bonds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Joint limits for the current bond strength
    pub fn joint_limits(&self, decay: &DecayModel) -> JointLimits {
        limits_for_strength(self.strength() as f32, decay)
    }

    /// Probability that an active constraint breaks this tick.
    ///
    /// The product of three independent factors in [0, 1]:
    /// - age-based degradation, linear in age and 1.0 at the lifespan,
    /// - the focal-adhesion development curve, a parabola peaking at half
    ///   the lifespan,
    /// - the force factor.
    pub fn breakage_probability(&self, now_ms: u64, decay: &DecayModel) -> f64 {
        if self.lifespan_ms <= 0.0 {
            return 1.0;
        }
        let x = (self.age_ms(now_ms) as f64 / self.lifespan_ms).clamp(0.0, 1.0);
        let age_factor = x;
        let focal_factor = 4.0 * x * (1.0 - x);
        let force_factor = decay.force_factor.evaluate(self.bonds, self.max_bonds);
        (age_factor * focal_factor * force_factor).clamp(0.0, 1.0)
    }

    /// Per-tick aging of an active constraint.
    ///
    /// Pending constraints that never met quorum retire here too, which
    /// routes them through the reclaim path in `destroy`.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        now_ms: u64,
        decay: &DecayModel,
        rng: &mut R,
    ) -> UpdateOutcome {
        match self.state {
            BondState::Retired => UpdateOutcome::Retire,
            BondState::Pending => UpdateOutcome::Retire,
            BondState::Active => {
                if self.bonds < decay.min_bonds {
                    return UpdateOutcome::Retire;
                }
                let broken = (self.bonds * decay.bond_attrition_per_tick).round();
                self.bonds -= broken;

                let p = self.breakage_probability(now_ms, decay);
                if rng.gen::<f64>() < p {
                    UpdateOutcome::Retire
                } else {
                    UpdateOutcome::Keep
                }
            }
        }
    }

    /// Retire the constraint: remove its joint and, if it never activated,
    /// return the debited receptors to the owning segment's free pool.
    /// Reclaim and joint removal each happen at most once, so repeated
    /// calls are safe.
    pub fn destroy<W: PhysicsWorld>(&mut self, kinetics: &mut SegmentKinetics, world: &mut W) {
        self.state = BondState::Retired;
        if !self.ever_activated && !self.reclaimed {
            kinetics.reclaim(self.segment, self.species, self.initial_bonds);
            self.reclaimed = true;
        }
        if let Some(joint) = self.joint.take() {
            world.remove_joint(joint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::MembraneProteinSpecies;
    use crate::physics::StubPhysicsWorld;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn decay() -> DecayModel {
        DecayModel {
            mean_lifespan_ms: 5000.0,
            lifespan_sd_ms: 50.0,
            min_bonds: 10.0,
            bond_attrition_per_tick: 0.1,
            max_bond_length_um: 1.5,
            force_factor: ForceFactor::Constant(0.5),
        }
    }

    fn constraint(world: &mut StubPhysicsWorld) -> AdhesionConstraint {
        let a = world.spawn_static_body(Vec3::ZERO);
        let b = world.spawn_body(Vec3::ONE);
        let joint = world.add_joint(a, b, Vec3::ZERO, JointLimits::locked());
        AdhesionConstraint::new(1, a, b, 0, 3, 0, 100.0, 1000.0, joint, 0, 5000.0)
    }

    #[test]
    fn test_quorum_gating() {
        let mut world = StubPhysicsWorld::new();
        let mut con = constraint(&mut world);

        assert_eq!(con.state(), BondState::Pending);
        con.check_in();
        assert_eq!(con.state(), BondState::Pending);
        assert!(!con.is_active());

        con.check_in();
        assert_eq!(con.state(), BondState::Active);

        // A third check-in is a no-op; the count stays capped at 2
        con.check_in();
        assert_eq!(con.check_in_count(), 2);
        assert_eq!(con.state(), BondState::Active);
    }

    #[test]
    fn test_reclaim_exactly_once() {
        let mut world = StubPhysicsWorld::new();
        let species = vec![MembraneProteinSpecies::integrin()];
        let mut kin = SegmentKinetics::new(vec![1.0; 20], &species);
        let mut con = constraint(&mut world);
        con.check_in(); // only one side: never activated

        kin.debit_free(3, 0, 100.0);
        let free_before_destroy = kin.free_count(3, 0);

        con.destroy(&mut kin, &mut world);
        assert!((kin.free_count(3, 0) - (free_before_destroy + 100.0)).abs() < 1e-9);
        assert_eq!(world.joint_count(), 0);

        // A second destroy must not reclaim again
        con.destroy(&mut kin, &mut world);
        assert!((kin.free_count(3, 0) - (free_before_destroy + 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_no_reclaim_after_activation() {
        let mut world = StubPhysicsWorld::new();
        let species = vec![MembraneProteinSpecies::integrin()];
        let mut kin = SegmentKinetics::new(vec![1.0; 20], &species);
        let mut con = constraint(&mut world);
        con.check_in();
        con.check_in();

        kin.debit_free(3, 0, 100.0);
        let free_before = kin.free_count(3, 0);
        con.destroy(&mut kin, &mut world);
        // Active bonds are consumed, not returned
        assert!((kin.free_count(3, 0) - free_before).abs() < 1e-9);
    }

    #[test]
    fn test_breakage_probability_shape() {
        let mut world = StubPhysicsWorld::new();
        let con = constraint(&mut world);
        let decay = decay();

        // Fresh bond: age factor zero
        assert_eq!(con.breakage_probability(0, &decay), 0.0);
        // Half life: age 0.5, parabola 1.0, force 0.5
        let p_half = con.breakage_probability(2500, &decay);
        assert!((p_half - 0.25).abs() < 1e-9, "got {}", p_half);
        // Full life: parabola returns to zero
        let p_full = con.breakage_probability(5000, &decay);
        assert!(p_full.abs() < 1e-9);
        // Probabilities stay in [0, 1] past the lifespan
        let p_past = con.breakage_probability(50_000, &decay);
        assert!((0.0..=1.0).contains(&p_past));
    }

    #[test]
    fn test_low_bond_count_retires() {
        let mut world = StubPhysicsWorld::new();
        let mut con = constraint(&mut world);
        con.check_in();
        con.check_in();
        con.bonds = 5.0;

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(con.update(100, &decay(), &mut rng), UpdateOutcome::Retire);
    }

    #[test]
    fn test_pending_constraint_retires_on_update() {
        let mut world = StubPhysicsWorld::new();
        let mut con = constraint(&mut world);
        con.check_in();

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(con.update(100, &decay(), &mut rng), UpdateOutcome::Retire);
    }

    #[test]
    fn test_attrition_erodes_bonds() {
        let mut world = StubPhysicsWorld::new();
        let mut con = constraint(&mut world);
        con.check_in();
        con.check_in();

        let mut rng = StdRng::seed_from_u64(1);
        let before = con.bonds;
        // Age 100 of 5000 ms keeps the breakage probability tiny
        let _ = con.update(100, &decay(), &mut rng);
        assert!((con.bonds - (before - 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_joint_limits_scale_with_strength() {
        let mut world = StubPhysicsWorld::new();
        let mut con = constraint(&mut world);
        let decay = decay();

        con.bonds = 1000.0; // full strength
        let tight = con.joint_limits(&decay);
        assert!(tight.linear_upper.y.abs() < 1e-6);

        con.bonds = 0.0;
        let slack = con.joint_limits(&decay);
        assert!((slack.linear_upper.y - 1.5).abs() < 1e-6);
        assert_eq!(slack.angular_upper, Vec3::ZERO);
    }

    #[test]
    fn test_lifespan_draw_positive() {
        let decay = decay();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let life = decay.draw_lifespan_ms(&mut rng);
            assert!(life >= 1.0);
            assert!(life < 6000.0);
        }
    }
}
