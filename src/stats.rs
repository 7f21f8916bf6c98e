//! Per-cell and global disease statistics.

use crate::agent::{school_type_for_grade, AgeGroup, DiseaseStat, SchoolType, Status, SymptomPhase};
use crate::geometry::Geometry;
use crate::store::AgentStore;
use log::info;
use serde::Serialize;

/// Cumulative per-cell counters for one disease: hospitalization, ICU, and
/// ventilator run as occupancy gauges (admissions add, exits subtract);
/// deaths only accumulate.
#[derive(Clone, Debug)]
pub struct DiseaseStatsGrid {
    cells: Vec<[f64; DiseaseStat::COUNT]>,
}

impl DiseaseStatsGrid {
    pub fn new(num_cells: usize) -> DiseaseStatsGrid {
        DiseaseStatsGrid {
            cells: vec![[0.0; DiseaseStat::COUNT]; num_cells],
        }
    }

    #[inline]
    pub fn add(&mut self, linear: usize, stat: DiseaseStat, amount: f64) {
        self.cells[linear][stat.index()] += amount;
    }

    #[inline]
    pub fn get(&self, linear: usize, stat: DiseaseStat) -> f64 {
        self.cells[linear][stat.index()]
    }

    /// Domain-wide total of one component.
    pub fn total(&self, stat: DiseaseStat) -> f64 {
        self.cells.iter().map(|c| c[stat.index()]).sum()
    }
}

/// Global status totals for one disease at one step. The first five fields
/// partition the population; the last four split the infected by where they
/// stand in their course.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub never: u64,
    pub infected: u64,
    pub immune: u64,
    pub susceptible: u64,
    pub dead: u64,
    /// infected, still inside the latent period
    pub exposed: u64,
    pub asymptomatic: u64,
    pub presymptomatic: u64,
    pub symptomatic: u64,
}

/// Counts every agent's status for disease `d`.
pub fn totals(store: &AgentStore, d: usize) -> Totals {
    let dis = &store.diseases[d];
    let mut out = Totals::default();
    for i in 0..store.len() {
        match dis.status[i] {
            Status::Never => out.never += 1,
            Status::Infected => out.infected += 1,
            Status::Immune => out.immune += 1,
            Status::Susceptible => out.susceptible += 1,
            Status::Dead => out.dead += 1,
        }
        if dis.status[i] == Status::Infected {
            if dis.is_exposed(i) {
                out.exposed += 1;
            } else {
                match dis.symptom[i] {
                    SymptomPhase::Asymptomatic => out.asymptomatic += 1,
                    SymptomPhase::Presymptomatic => out.presymptomatic += 1,
                    SymptomPhase::Symptomatic => out.symptomatic += 1,
                }
            }
        }
    }
    out
}

/// Per-cell agent census for one disease.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct CellCensus {
    pub total: u32,
    pub never: u32,
    pub infected: u32,
    pub immune: u32,
    pub susceptible: u32,
}

/// Counts agents per cell by current position. The dead count into the
/// total only.
pub fn cell_census(store: &AgentStore, geom: &Geometry, d: usize) -> Vec<CellCensus> {
    let mut out = vec![CellCensus::default(); geom.num_cells()];
    let dis = &store.diseases[d];
    for i in 0..store.len() {
        let cell = geom.cell_of(store.people.pos_x[i], store.people.pos_y[i]);
        let census = &mut out[geom.linear(cell)];
        census.total += 1;
        match dis.status[i] {
            Status::Never => census.never += 1,
            Status::Infected => census.infected += 1,
            Status::Immune => census.immune += 1,
            Status::Susceptible => census.susceptible += 1,
            Status::Dead => {}
        }
    }
    out
}

/// Educator and student counts per school type, in the order college, high,
/// middle, elementary, daycare. Agents with a workgroup count as educators.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct SchoolCounts {
    pub educators: [u64; 5],
    pub students: [u64; 5],
}

impl SchoolCounts {
    pub fn total_educators(&self) -> u64 {
        self.educators.iter().sum()
    }

    pub fn total_students(&self) -> u64 {
        self.students.iter().sum()
    }

    /// Logs the breakdown with per-type student/teacher ratios.
    pub fn log_table(&self) {
        let names = ["College", "High", "Middle", "Elementary", "Childcare"];
        info!("School counts: (educators, students, ratio)");
        for (k, name) in names.iter().enumerate() {
            info!(
                "  {:<10} {} {} {:.1}",
                name,
                self.educators[k],
                self.students[k],
                self.students[k] as f64 / self.educators[k].max(1) as f64
            );
        }
        info!(
            "  {:<10} {} {} {:.1}",
            "Total",
            self.total_educators(),
            self.total_students(),
            self.total_students() as f64 / self.total_educators().max(1) as f64
        );
    }
}

pub fn school_counts(store: &AgentStore) -> SchoolCounts {
    let mut out = SchoolCounts::default();
    let people = &store.people;
    for i in 0..store.len() {
        if people.school_id[i] > 0 {
            let school_type = school_type_for_grade(people.school_grade[i]);
            if school_type == SchoolType::None {
                continue;
            }
            let k = school_type.index() - SchoolType::College.index();
            if people.workgroup[i] > 0 {
                out.educators[k] += 1;
            } else {
                out.students[k] += 1;
            }
        }
    }
    out
}

/// Population counts per age group.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct AgeGroupCounts {
    pub counts: [u64; AgeGroup::COUNT],
}

impl AgeGroupCounts {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn log_table(&self) {
        let names = [
            "under 5", "5 to 17", "18 to 29", "30 to 49", "50 to 64", "over 64",
        ];
        let total = self.total().max(1);
        info!("Age group counts (percentage):");
        for (k, name) in names.iter().enumerate() {
            info!(
                "  {:<9} {} {:.1}",
                name,
                self.counts[k],
                100.0 * self.counts[k] as f64 / total as f64
            );
        }
        info!("  {:<9} {}", "Total", self.total());
    }
}

pub fn age_group_counts(store: &AgentStore) -> AgeGroupCounts {
    let mut out = AgeGroupCounts::default();
    for i in 0..store.len() {
        out.counts[store.people.age_group[i].index()] += 1;
    }
    out
}
