//! Per-segment receptor populations.
//!
//! Each cell carries one `SegmentKinetics` holding free and bound counts for
//! every (segment, species) pair. Receptors are assigned at construction in
//! proportion to each segment's share of the surface area and integrated
//! every tick. Constraint creation and destruction move counts between the
//! pools through [`SegmentKinetics::debit_free`] and
//! [`SegmentKinetics::reclaim`].

use super::interaction::{ProteinInteraction, RateKind};
use super::species::MembraneProteinSpecies;
use crate::concentration::ConcentrationField;

pub struct SegmentKinetics {
    num_species: usize,
    /// Free receptor counts, indexed [segment][species]
    free: Vec<Vec<f64>>,
    /// Bound receptor counts, indexed [segment][species]
    bound: Vec<Vec<f64>>,
    /// Segment areas (μm²)
    areas_um2: Vec<f32>,
    total_area_um2: f32,
    /// Ligand concentration sampled at each segment last tick (nM)
    ligand_nM: Vec<f64>,
}

impl SegmentKinetics {
    pub fn new(areas_um2: Vec<f32>, species: &[MembraneProteinSpecies]) -> Self {
        let total_area_um2: f32 = areas_um2.iter().sum();
        let num_segments = areas_um2.len();

        let mut free = Vec::with_capacity(num_segments);
        let bound = vec![vec![0.0; species.len()]; num_segments];
        for &area in &areas_um2 {
            let portion = (area / total_area_um2) as f64;
            free.push(
                species
                    .iter()
                    .map(|sp| sp.initial_receptors(portion))
                    .collect(),
            );
        }

        Self {
            num_species: species.len(),
            free,
            bound,
            areas_um2,
            total_area_um2,
            ligand_nM: vec![0.0; num_segments],
        }
    }

    pub fn num_segments(&self) -> usize {
        self.areas_um2.len()
    }

    pub fn num_species(&self) -> usize {
        self.num_species
    }

    pub fn free_count(&self, segment: usize, species: usize) -> f64 {
        self.free[segment][species]
    }

    pub fn bound_count(&self, segment: usize, species: usize) -> f64 {
        self.bound[segment][species]
    }

    pub fn segment_area_um2(&self, segment: usize) -> f32 {
        self.areas_um2[segment]
    }

    pub fn ligand_nM(&self, segment: usize) -> f64 {
        self.ligand_nM[segment]
    }

    /// Total free receptors of one species across the surface
    pub fn total_free(&self, species: usize) -> f64 {
        self.free.iter().map(|seg| seg[species]).sum()
    }

    /// Total bound receptors of one species across the surface
    pub fn total_bound(&self, species: usize) -> f64 {
        self.bound.iter().map(|seg| seg[species]).sum()
    }

    /// Move receptors from the free pool to the bound pool when bonds form.
    /// The debit is capped at the available free count; the capped amount is
    /// returned.
    pub fn debit_free(&mut self, segment: usize, species: usize, count: f64) -> f64 {
        let debit = count.min(self.free[segment][species]);
        self.free[segment][species] -= debit;
        self.bound[segment][species] += debit;
        debit
    }

    /// Return receptors from the bound pool to the free pool
    pub fn reclaim(&mut self, segment: usize, species: usize, count: f64) {
        let returned = count.min(self.bound[segment][species]);
        self.bound[segment][species] -= returned;
        self.free[segment][species] += returned;
    }

    /// Drop bound receptors without returning them (consumed bonds)
    pub fn consume_bound(&mut self, segment: usize, species: usize, count: f64) {
        self.bound[segment][species] = (self.bound[segment][species] - count).max(0.0);
    }

    /// Integrate every (segment, species) pair over one tick.
    ///
    /// `segment_distances_um` gives each segment centroid's distance from
    /// the source; `time_ms` is the experimental time the field is sampled
    /// at; `dt_min` is the tick length in minutes. Both deltas of a pair are
    /// computed from the pre-step counts, so free + bound is conserved when
    /// the trafficking rates are zero.
    pub fn integrate(
        &mut self,
        species: &[MembraneProteinSpecies],
        interactions: &[ProteinInteraction],
        segment_distances_um: &[f64],
        field: &mut ConcentrationField,
        time_ms: u64,
        dt_min: f64,
    ) {
        debug_assert_eq!(segment_distances_um.len(), self.num_segments());
        if dt_min <= 0.0 {
            return;
        }

        for seg in 0..self.num_segments() {
            let ligand = field.concentration(segment_distances_um[seg], time_ms);
            self.ligand_nM[seg] = ligand;
            let area_share = (self.areas_um2[seg] / self.total_area_um2) as f64;

            for (i, sp) in species.iter().enumerate() {
                let (exo, unbound_rate, bound_rate) =
                    self.effective_rates(seg, i, sp, interactions, area_share);

                let free = self.free[seg][i];
                let bound = self.bound[seg][i];
                let new_free =
                    sp.update_free_receptors(ligand, bound, free, unbound_rate, exo, dt_min);
                let new_bound = sp.update_bound_receptors(ligand, bound, free, bound_rate, dt_min);
                self.free[seg][i] = new_free;
                self.bound[seg][i] = new_bound;
            }
        }
    }

    /// Effective (exocytosis, unbound endocytosis, bound endocytosis) rates
    /// for one (segment, species) pair this tick.
    ///
    /// Baselines come from the species constants, exocytosis scaled to the
    /// segment's area share. Each interaction targeting this species applies
    /// its multiplier, with the signal species' bound surface density on
    /// this segment as the signal concentration.
    fn effective_rates(
        &self,
        segment: usize,
        species_index: usize,
        sp: &MembraneProteinSpecies,
        interactions: &[ProteinInteraction],
        area_share: f64,
    ) -> (f64, f64, f64) {
        let mut exo = sp.q_r * area_share;
        let mut unbound = sp.k_t;
        let mut bound = sp.k_e;

        for inter in interactions {
            if inter.target_species() != species_index {
                continue;
            }
            let area = self.areas_um2[segment] as f64;
            let signal_density = if area > 0.0 {
                self.bound[segment][inter.signal_species()] / area
            } else {
                0.0
            };
            exo = inter.modified_rate(signal_density, exo, RateKind::Exocytosis);
            unbound = inter.modified_rate(signal_density, unbound, RateKind::UnboundEndocytosis);
            bound = inter.modified_rate(signal_density, bound, RateKind::BoundEndocytosis);
        }
        (exo, unbound, bound)
    }
}
