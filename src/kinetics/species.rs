//! Membrane protein species and their rate constants.
//!
//! A species is a static description of one receptor type. Two variants
//! exist:
//! - **LigandReceptor** (EGFR-like): binding is driven by the local ligand
//!   concentration through mass-action kinetics.
//! - **SubstrateAdhesion** (integrin-like): binding happens only through the
//!   adhesion constraint lifecycle; the per-tick integration touches the
//!   free pool alone.
//!
//! Rate constants are per minute. EGFR values are for EGF on human mammary
//! epithelial cells (~15 μm diameter):
//! Reference: Lauffenburger DA, Linderman JJ. Receptors, 1993
//! Reference: Wiley HS, Cunningham DD. J Biol Chem 1982

use rand::Rng;

/// How a species binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeciesKind {
    /// Binds diffusible ligand in solution
    LigandReceptor,
    /// Binds immobilized ligand on a substrate through adhesion constraints
    SubstrateAdhesion,
}

/// Rate-constant description of one receptor type
#[derive(Debug, Clone)]
pub struct MembraneProteinSpecies {
    pub name: &'static str,
    pub kind: SpeciesKind,

    /// Forward rate of ligand binding (/min, per nM of ligand)
    pub k_on: f64,
    /// Reverse rate of ligand binding (/min)
    pub k_off: f64,
    /// Internalization rate of bound receptor (/min)
    pub k_e: f64,
    /// Internalization rate of unbound receptor (/min)
    pub k_t: f64,
    /// Synthesis (exocytosis) rate for the whole cell (molecules/min)
    pub q_r: f64,
    /// Steady-state receptor abundance for the whole cell (molecules)
    pub r_t: f64,
}

impl MembraneProteinSpecies {
    /// EGF receptor.
    ///
    /// k_on is derived from the dissociation constant: k_on = k_off / k_D
    /// with k_D = 2.47 nM. Synthesis balances unbound internalization at
    /// steady state: Q_r = R_t * k_t.
    pub fn egfr() -> Self {
        let k_off = 0.24;
        let k_d = 2.47;
        let k_t = 0.02;
        let r_t = 200_000.0;
        Self {
            name: "EGFR",
            kind: SpeciesKind::LigandReceptor,
            k_on: k_off / k_d,
            k_off,
            k_e: 0.15,
            k_t,
            q_r: r_t * k_t,
            r_t,
        }
    }

    /// Laminin-binding integrin.
    ///
    /// k_on here scales the stochastic bond draw in [`Self::bind_receptors`]
    /// rather than a mass-action term.
    pub fn integrin() -> Self {
        let k_t = 0.02;
        let r_t = 200_000.0;
        Self {
            name: "Integrin",
            kind: SpeciesKind::SubstrateAdhesion,
            k_on: 0.05,
            k_off: 0.24,
            k_e: 0.15,
            k_t,
            q_r: r_t * k_t,
            r_t,
        }
    }

    pub fn binds_to_substrate(&self) -> bool {
        self.kind == SpeciesKind::SubstrateAdhesion
    }

    /// Receptors initially assigned to a surface portion (0-1 of the cell)
    pub fn initial_receptors(&self, portion: f64) -> f64 {
        self.r_t * portion
    }

    /// One forward-Euler step of the free receptor count.
    ///
    /// `unbound_rate` and `exo_rate` are the effective per-segment rates for
    /// this tick (baseline constants after any interaction modulation);
    /// `exo_rate` is already scaled to the segment's share of the surface.
    /// `dt_min` is in minutes. The result is clamped at zero.
    pub fn update_free_receptors(
        &self,
        ligand_nM: f64,
        bound: f64,
        free: f64,
        unbound_rate: f64,
        exo_rate: f64,
        dt_min: f64,
    ) -> f64 {
        let d_free = match self.kind {
            SpeciesKind::LigandReceptor => {
                dt_min
                    * (-self.k_on * free * ligand_nM + self.k_off * bound - unbound_rate * free
                        + exo_rate)
            }
            // Adhesion receptors do not bind from solution; only
            // internalization and synthesis move the free pool
            SpeciesKind::SubstrateAdhesion => dt_min * (-unbound_rate * free + exo_rate),
        };
        (free + d_free).max(0.0)
    }

    /// One forward-Euler step of the bound receptor count.
    ///
    /// For the substrate-adhesion variant the bound count is owned by the
    /// constraint lifecycle and passes through unchanged.
    pub fn update_bound_receptors(
        &self,
        ligand_nM: f64,
        bound: f64,
        free: f64,
        bound_rate: f64,
        dt_min: f64,
    ) -> f64 {
        match self.kind {
            SpeciesKind::LigandReceptor => {
                let d_bound =
                    dt_min * (self.k_on * free * ligand_nM - self.k_off * bound - bound_rate * bound);
                (bound + d_bound).max(0.0)
            }
            SpeciesKind::SubstrateAdhesion => bound,
        }
    }

    /// Stochastic count of bonds formed between substrate ligand sites and
    /// free receptors when a contact qualifies for adhesion.
    pub fn bind_receptors<R: Rng + ?Sized>(
        &self,
        num_ligand_sites: u64,
        num_free_receptors: u64,
        rng: &mut R,
    ) -> u64 {
        if self.kind != SpeciesKind::SubstrateAdhesion {
            return 0;
        }
        let possible = num_ligand_sites.min(num_free_receptors) as f64;
        (rng.gen::<f64>() * self.k_on * possible).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Direct fixture: one Euler step with hand-computed deltas
    #[test]
    fn test_single_euler_step() {
        let species = MembraneProteinSpecies {
            name: "test",
            kind: SpeciesKind::LigandReceptor,
            k_on: 0.1,
            k_off: 0.24,
            k_e: 0.15,
            k_t: 0.02,
            q_r: 4000.0,
            r_t: 190_000.0,
        };

        let free = 190_000.0;
        let bound = 0.0;
        let ligand = 1.0;
        let dt = 1.0;

        // dFree = 1.0*(-0.1*190000*1.0 + 0.24*0 - 0.02*190000 + 4000) = -18800
        let new_free = species.update_free_receptors(ligand, bound, free, 0.02, 4000.0, dt);
        assert!((new_free - 171_200.0).abs() < 1e-6, "got {}", new_free);

        // dBound = 1.0*(0.1*190000*1.0 - 0.24*0 - 0.15*0) = 19000
        let new_bound = species.update_bound_receptors(ligand, bound, free, 0.15, dt);
        assert!((new_bound - 19_000.0).abs() < 1e-6, "got {}", new_bound);
    }

    #[test]
    fn test_egfr_derived_constants() {
        let egfr = MembraneProteinSpecies::egfr();
        assert!((egfr.k_on - 0.24 / 2.47).abs() < 1e-12);
        assert!((egfr.q_r - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn test_counts_clamped_at_zero() {
        let egfr = MembraneProteinSpecies::egfr();
        // A huge dt drives the Euler step far negative; the count clamps
        let new_free = egfr.update_free_receptors(100.0, 0.0, 1000.0, 0.02, 0.0, 1e6);
        assert_eq!(new_free, 0.0);
        let new_bound = egfr.update_bound_receptors(0.0, 500.0, 0.0, 0.15, 1e6);
        assert_eq!(new_bound, 0.0);
    }

    #[test]
    fn test_integrin_ignores_ligand() {
        let integrin = MembraneProteinSpecies::integrin();
        let with_ligand = integrin.update_free_receptors(50.0, 0.0, 1000.0, 0.02, 10.0, 1.0);
        let without = integrin.update_free_receptors(0.0, 0.0, 1000.0, 0.02, 10.0, 1.0);
        assert!((with_ligand - without).abs() < 1e-12);

        // Bound count is owned by the constraint lifecycle
        let bound = integrin.update_bound_receptors(50.0, 321.0, 1000.0, 0.15, 1.0);
        assert_eq!(bound, 321.0);
    }

    #[test]
    fn test_bind_receptors_bounded() {
        let integrin = MembraneProteinSpecies::integrin();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let bonds = integrin.bind_receptors(5000, 800, &mut rng);
            // Draw is uniform * k_on * min(sites, free)
            assert!(bonds as f64 <= integrin.k_on * 800.0 + 0.5);
        }
    }

    #[test]
    fn test_ligand_receptor_never_binds_substrate() {
        let egfr = MembraneProteinSpecies::egfr();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(egfr.bind_receptors(5000, 800, &mut rng), 0);
        assert!(!egfr.binds_to_substrate());
    }
}
