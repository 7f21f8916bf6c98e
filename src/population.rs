//! Initial-condition contract between the engine and the external loaders.
//!
//! Census and UrbanPop loaders live outside this crate; they describe what
//! they read through a [`Population`] (communities plus agent seeds), and the
//! engine turns that into an [`AgentStore`](crate::store::AgentStore) and the
//! per-cell auxiliary grids. Everything here fails fast: a malformed
//! population is a data error, not something the day loop should discover.

use crate::agent::{AgeGroup, Cell};
use crate::error::EpiError;
use crate::geometry::Geometry;
use crate::store::{AgentStore, BinPolicy, People};
use log::info;

/// One community: a grid cell with its census unit, FIPS code, and tract.
#[derive(Copy, Clone, Debug)]
pub struct CommunitySpec {
    pub cell: Cell,
    pub unit: u32,
    pub fips: i32,
    pub tract: i32,
}

/// One agent as described by a loader. `work == Cell::NONE` means the agent
/// spends the day in its home community.
#[derive(Copy, Clone, Debug)]
pub struct AgentSeed {
    pub age_group: AgeGroup,
    pub family: i32,
    pub home: Cell,
    pub work: Cell,
    pub nborhood: i32,
    pub work_nborhood: i32,
    /// 0 = no school; see [`crate::agent::school_type_for_grade`] for the
    /// grade coding of attendees.
    pub school_id: i32,
    pub school_grade: i32,
    pub naics: i32,
    /// 0 = not employed in a workgroup.
    pub workgroup: i32,
}

impl Default for AgentSeed {
    fn default() -> AgentSeed {
        AgentSeed {
            age_group: AgeGroup::A30to49,
            family: 0,
            home: Cell::NONE,
            work: Cell::NONE,
            nborhood: 0,
            work_nborhood: 0,
            school_id: 0,
            school_grade: 0,
            naics: 0,
            workgroup: 0,
        }
    }
}

/// What a loader hands the engine.
#[derive(Default, Debug)]
pub struct Population {
    communities: Vec<CommunitySpec>,
    agents: Vec<AgentSeed>,
}

impl Population {
    pub fn new() -> Population {
        Population::default()
    }

    pub fn add_community(&mut self, cell: Cell, unit: u32, fips: i32, tract: i32) {
        self.communities.push(CommunitySpec {
            cell,
            unit,
            fips,
            tract,
        });
    }

    pub fn add_agent(&mut self, seed: AgentSeed) {
        self.agents.push(seed);
    }

    pub fn num_communities(&self) -> usize {
        self.communities.len()
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }
}

/// Per-cell auxiliary grids, all indexed by the cell's linear index.
#[derive(Debug)]
pub struct CellGrids {
    /// Census unit of each community cell, -1 elsewhere.
    pub unit: Vec<i32>,
    /// FIPS code of each community cell, -1 elsewhere.
    pub fips: Vec<i32>,
    /// Census tract of each community cell, -1 elsewhere.
    pub tract: Vec<i32>,
    /// Dense community index of each occupied cell, -1 elsewhere.
    pub community: Vec<i32>,
    /// Residents by age group, from agent home cells.
    pub residents: Vec<[u32; AgeGroup::COUNT]>,
    pub num_communities: usize,
    /// Linear cell indices of all communities, ordered by community index.
    pub community_cells: Vec<u32>,
    /// Linear cell indices of each unit's communities, indexed by unit id.
    pub unit_communities: Vec<Vec<u32>>,
}

impl CellGrids {
    #[inline]
    pub fn community_of(&self, linear: usize) -> i32 {
        self.community[linear]
    }

    #[inline]
    pub fn num_units(&self) -> usize {
        self.unit_communities.len()
    }
}

/// Validates a [`Population`] and builds the store and grids from it.
pub(crate) fn build(
    pop: &Population,
    geom: &Geometry,
    num_diseases: usize,
    bin_policy: BinPolicy,
) -> Result<(AgentStore, CellGrids), EpiError> {
    if pop.communities.is_empty() {
        return Err("population has no communities".into());
    }

    let num_cells = geom.num_cells();
    let mut grids = CellGrids {
        unit: vec![-1; num_cells],
        fips: vec![-1; num_cells],
        tract: vec![-1; num_cells],
        community: vec![-1; num_cells],
        residents: vec![[0; AgeGroup::COUNT]; num_cells],
        num_communities: 0,
        community_cells: Vec::new(),
        unit_communities: Vec::new(),
    };

    let max_unit = pop.communities.iter().map(|c| c.unit).max().unwrap_or(0);
    grids.unit_communities = vec![Vec::new(); max_unit as usize + 1];

    for (k, comm) in pop.communities.iter().enumerate() {
        if !geom.contains(comm.cell) {
            return Err(EpiError::EpiError(format!(
                "community {k} at ({}, {}) is outside the domain",
                comm.cell.i, comm.cell.j
            )));
        }
        let linear = geom.linear(comm.cell);
        if grids.community[linear] >= 0 {
            return Err(EpiError::EpiError(format!(
                "cell ({}, {}) declared as a community twice",
                comm.cell.i, comm.cell.j
            )));
        }
        grids.community[linear] = grids.num_communities as i32;
        grids.unit[linear] = comm.unit as i32;
        grids.fips[linear] = comm.fips;
        grids.tract[linear] = comm.tract;
        grids.community_cells.push(linear as u32);
        grids.unit_communities[comm.unit as usize].push(linear as u32);
        grids.num_communities += 1;
    }

    let mut people = People::default();
    for (k, seed) in pop.agents.iter().enumerate() {
        let home = seed.home;
        if !geom.contains(home) || grids.community[geom.linear(home)] < 0 {
            return Err(EpiError::EpiError(format!(
                "agent {k}: home ({}, {}) is not a community cell",
                home.i, home.j
            )));
        }
        let work = if seed.work.is_set() { seed.work } else { home };
        if !geom.contains(work) || grids.community[geom.linear(work)] < 0 {
            return Err(EpiError::EpiError(format!(
                "agent {k}: workplace ({}, {}) is not a community cell",
                work.i, work.j
            )));
        }
        for (what, value) in [
            ("family", seed.family),
            ("nborhood", seed.nborhood),
            ("work_nborhood", seed.work_nborhood),
            ("school_id", seed.school_id),
            ("school_grade", seed.school_grade),
            ("naics", seed.naics),
            ("workgroup", seed.workgroup),
        ] {
            if value < 0 {
                return Err(EpiError::EpiError(format!(
                    "agent {k}: negative {what} id ({value})"
                )));
            }
        }

        grids.residents[geom.linear(home)][seed.age_group.index()] += 1;

        let (x, y) = geom.cell_center(home);
        people.age_group.push(seed.age_group);
        people.family.push(seed.family);
        people.home.push(home);
        people.work.push(work);
        people.hosp.push(Cell::NONE);
        people.trav.push(Cell::NONE);
        people.nborhood.push(seed.nborhood);
        people.work_nborhood.push(seed.work_nborhood);
        people.school_id.push(seed.school_id);
        people.school_grade.push(seed.school_grade);
        people.school_closed.push(false);
        people.naics.push(seed.naics);
        people.workgroup.push(seed.workgroup);
        people.withdrawn.push(false);
        people.random_travel.push(-1);
        people.air_travel.push(-1);
        people.pos_x.push(x);
        people.pos_y.push(y);
    }

    let mut store = AgentStore::from_people(people, num_diseases, bin_policy);
    store.redistribute(geom);
    info!(
        "populated {} agents across {} communities ({} units)",
        store.len(),
        grids.num_communities,
        grids.num_units()
    );
    Ok((store, grids))
}
