//! Data-parallel storage for agents.
//!
//! Attributes live in structure-of-arrays form: one `Vec` per attribute in
//! [`People`], plus one [`DiseaseArrays`] block per disease. Agents are
//! partitioned into per-cell bins that are rebuilt by
//! [`AgentStore::redistribute`] after any movement pass; a position outside
//! the domain at that point is a programming error and panics.

use crate::agent::{AgeGroup, Cell, Status, SymptomPhase};
use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use rand::Rng;

/// Ordering policy for the per-cell bins. `Serial` fills each bin in
/// ascending agent order; `Fast` makes no ordering promise.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BinPolicy {
    Serial,
    Fast,
}

/// Shared (non-disease) agent attributes, one array per attribute.
///
/// Geography attributes are static after initialization; the location,
/// travel, and behavior flags change daily. `random_travel` and `air_travel`
/// hold the agent's own index while traveling and -1 otherwise.
#[derive(Default, Debug)]
pub struct People {
    pub age_group: Vec<AgeGroup>,
    pub family: Vec<i32>,
    pub home: Vec<Cell>,
    pub work: Vec<Cell>,
    pub hosp: Vec<Cell>,
    pub trav: Vec<Cell>,
    pub nborhood: Vec<i32>,
    pub work_nborhood: Vec<i32>,
    pub school_id: Vec<i32>,
    pub school_grade: Vec<i32>,
    pub school_closed: Vec<bool>,
    pub naics: Vec<i32>,
    pub workgroup: Vec<i32>,
    pub withdrawn: Vec<bool>,
    pub random_travel: Vec<i32>,
    pub air_travel: Vec<i32>,
    pub pos_x: Vec<f64>,
    pub pos_y: Vec<f64>,
}

impl People {
    #[inline]
    pub fn len(&self) -> usize {
        self.age_group.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.age_group.is_empty()
    }

    #[inline]
    pub fn in_hospital(&self, i: usize) -> bool {
        self.hosp[i].is_set()
    }

    #[inline]
    pub fn is_adult(&self, i: usize) -> bool {
        self.age_group[i].is_adult()
    }

    #[inline]
    pub fn traveling(&self, i: usize) -> bool {
        self.random_travel[i] >= 0 || self.air_travel[i] >= 0
    }
}

/// Per-disease dynamic attributes, indexed by agent.
///
/// `counter` counts days since infection while infected and days of immunity
/// remaining while immune. `prob` accumulates the complement of the infection
/// probability across the day's interaction passes.
#[derive(Debug)]
pub struct DiseaseArrays {
    pub status: Vec<Status>,
    pub symptom: Vec<SymptomPhase>,
    pub counter: Vec<f64>,
    pub treatment_timer: Vec<f64>,
    pub prob: Vec<f64>,
    pub latent_period: Vec<f64>,
    pub infectious_period: Vec<f64>,
    pub incubation_period: Vec<f64>,
}

impl DiseaseArrays {
    pub fn new(n: usize) -> DiseaseArrays {
        DiseaseArrays {
            status: vec![Status::Never; n],
            symptom: vec![SymptomPhase::Presymptomatic; n],
            counter: vec![0.0; n],
            treatment_timer: vec![0.0; n],
            prob: vec![1.0; n],
            latent_period: vec![0.0; n],
            infectious_period: vec![0.0; n],
            incubation_period: vec![0.0; n],
        }
    }

    /// Infected and past the latent period.
    #[inline]
    pub fn is_infectious(&self, i: usize) -> bool {
        self.status[i] == Status::Infected && self.counter[i] >= self.latent_period[i]
    }

    /// Infected but not yet infectious.
    #[inline]
    pub fn is_exposed(&self, i: usize) -> bool {
        self.status[i] == Status::Infected && self.counter[i] <= self.latent_period[i]
    }

    /// Not immune, not dead, not already infected.
    #[inline]
    pub fn is_susceptible(&self, i: usize) -> bool {
        !matches!(
            self.status[i],
            Status::Immune | Status::Dead | Status::Infected
        )
    }

    /// Transitions the agent to infected and samples its clinical periods.
    pub fn set_infected<R: Rng + ?Sized>(&mut self, i: usize, parm: &DiseaseParm, rng: &mut R) {
        let (latent, infectious, incubation) = parm.sample_periods(rng);
        self.status[i] = Status::Infected;
        self.counter[i] = 0.0;
        self.latent_period[i] = latent;
        self.infectious_period[i] = infectious;
        self.incubation_period[i] = incubation;
    }
}

/// Largest value of each grouping attribute, cached once after the
/// population is loaded. Interaction kernels size their dense count arrays
/// from these.
#[derive(Copy, Clone, Default, Debug)]
pub struct GroupMaxima {
    pub family: i32,
    pub nborhood: i32,
    pub work_nborhood: i32,
    pub workgroup: i32,
    pub naics: i32,
    pub school_id: i32,
    pub school_grade: i32,
}

/// Per-cell bins over agent indices, rebuilt from positions.
#[derive(Default, Debug)]
struct CellBins {
    offsets: Vec<u32>,
    perm: Vec<u32>,
}

pub struct AgentStore {
    pub people: People,
    pub diseases: Vec<DiseaseArrays>,
    pub groups: GroupMaxima,
    bins: CellBins,
    bin_policy: BinPolicy,
}

impl AgentStore {
    /// Wraps a fully populated [`People`] block, sizing the per-disease
    /// arrays and the group maxima. The caller must `redistribute` before
    /// using the bins.
    pub fn from_people(people: People, num_diseases: usize, bin_policy: BinPolicy) -> AgentStore {
        let n = people.len();
        let max_of = |values: &[i32]| values.iter().copied().max().unwrap_or(0).max(0);
        let groups = GroupMaxima {
            family: max_of(&people.family),
            nborhood: max_of(&people.nborhood),
            work_nborhood: max_of(&people.work_nborhood),
            workgroup: max_of(&people.workgroup),
            naics: max_of(&people.naics),
            school_id: max_of(&people.school_id),
            school_grade: max_of(&people.school_grade),
        };
        AgentStore {
            people,
            diseases: (0..num_diseases).map(|_| DiseaseArrays::new(n)).collect(),
            groups,
            bins: CellBins::default(),
            bin_policy,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.people.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    #[inline]
    pub fn num_diseases(&self) -> usize {
        self.diseases.len()
    }

    /// Death is an agent-level property: if any disease is dead, all are.
    #[inline]
    pub fn is_dead(&self, i: usize) -> bool {
        self.diseases[0].status[i] == Status::Dead
    }

    /// Splits the store into the shared block and the disease blocks so a
    /// kernel can hold both mutably.
    #[inline]
    pub fn parts_mut(&mut self) -> (&mut People, &mut [DiseaseArrays]) {
        (&mut self.people, &mut self.diseases)
    }

    /// Rebuilds the per-cell bins from current positions.
    ///
    /// Panics if any agent sits outside the domain: movement passes must
    /// keep every position inside an owned cell.
    pub fn redistribute(&mut self, geom: &Geometry) {
        let n = self.len();
        let num_cells = geom.num_cells();
        let mut counts = vec![0u32; num_cells + 1];
        let mut cell_of = vec![0u32; n];

        for i in 0..n {
            let cell = geom.cell_of(self.people.pos_x[i], self.people.pos_y[i]);
            assert!(
                geom.contains(cell),
                "agent {i} left the domain at ({}, {})",
                self.people.pos_x[i],
                self.people.pos_y[i]
            );
            let linear = geom.linear(cell) as u32;
            cell_of[i] = linear;
            counts[linear as usize + 1] += 1;
        }
        for c in 0..num_cells {
            counts[c + 1] += counts[c];
        }

        let offsets = counts;
        let mut cursor = offsets.clone();
        let mut perm = vec![0u32; n];
        let scatter = |perm: &mut [u32], cursor: &mut [u32], i: usize| {
            let c = cell_of[i] as usize;
            perm[cursor[c] as usize] = i as u32;
            cursor[c] += 1;
        };
        match self.bin_policy {
            BinPolicy::Serial => {
                for i in 0..n {
                    scatter(&mut perm, &mut cursor, i);
                }
            }
            BinPolicy::Fast => {
                for i in (0..n).rev() {
                    scatter(&mut perm, &mut cursor, i);
                }
            }
        }
        self.bins = CellBins { offsets, perm };
    }

    /// Agent indices currently binned in the cell with the given linear
    /// index. Empty until the first `redistribute`.
    #[inline]
    pub fn bin(&self, linear: usize) -> &[u32] {
        if self.bins.offsets.is_empty() {
            return &[];
        }
        let lo = self.bins.offsets[linear] as usize;
        let hi = self.bins.offsets[linear + 1] as usize;
        &self.bins.perm[lo..hi]
    }

    /// Validates the cross-attribute invariants. Used by tests and debug
    /// builds after every phase; any violation is a bug, not an input error.
    pub fn check(&self, geom: &Geometry) -> Result<(), String> {
        let n = self.len();
        let people = &self.people;
        for i in 0..n {
            if people.hosp[i].is_set() != (people.hosp[i].i >= 0 && people.hosp[i].j >= 0) {
                return Err(format!("agent {i}: inconsistent hospital cell"));
            }
            if people.in_hospital(i) && people.traveling(i) {
                return Err(format!("agent {i}: hospitalized while traveling"));
            }
            if people.random_travel[i] >= 0 && people.air_travel[i] >= 0 {
                return Err(format!("agent {i}: on random and air travel at once"));
            }
            if !geom.position_in_domain(people.pos_x[i], people.pos_y[i]) {
                return Err(format!("agent {i}: position outside the domain"));
            }
            let dead = self.is_dead(i);
            for (d, dis) in self.diseases.iter().enumerate() {
                if dead != (dis.status[i] == Status::Dead) {
                    return Err(format!("agent {i}: disease {d} disagrees on death"));
                }
                if dis.status[i] != Status::Infected {
                    if dis.symptom[i] == SymptomPhase::Symptomatic {
                        return Err(format!("agent {i}: symptomatic without infection (disease {d})"));
                    }
                    if dis.treatment_timer[i] != 0.0 {
                        return Err(format!(
                            "agent {i}: treatment timer without infection (disease {d})"
                        ));
                    }
                }
                if dis.incubation_period[i] > dis.latent_period[i] + dis.infectious_period[i] {
                    return Err(format!("agent {i}: incubation beyond course (disease {d})"));
                }
                if !(0.0..=1.0).contains(&dis.prob[i]) {
                    return Err(format!(
                        "agent {i}: probability accumulator out of range (disease {d})"
                    ));
                }
                if dis.counter[i] < 0.0 || dis.treatment_timer[i] < 0.0 {
                    return Err(format!("agent {i}: negative timer (disease {d})"));
                }
            }
        }
        Ok(())
    }
}
