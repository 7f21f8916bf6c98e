//! Workgroup interactions, run during the day phase at work locations.
//!
//! Workers mix within their workgroup, keyed by (workgroup, NAICS industry)
//! inside the community they commuted to. A single transmission coefficient
//! applies regardless of age.

use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use crate::interaction::{community_of, fold_exposure, InteractionModel};
use crate::population::CellGrids;
use crate::store::{AgentStore, People};

pub struct WorkModel;

#[inline]
fn candidate(people: &People, i: usize) -> bool {
    !people.in_hospital(i)
        && people.work[i].is_set()
        && people.workgroup[i] > 0
        && !people.withdrawn[i]
        && people.random_travel[i] < 0
        && people.air_travel[i] < 0
}

impl InteractionModel for WorkModel {
    fn interact(
        &self,
        store: &mut AgentStore,
        geom: &Geometry,
        grids: &CellGrids,
        d: usize,
        parm: &DiseaseParm,
    ) {
        let groups = store.groups;
        let (people, diseases) = store.parts_mut();
        let dis = &mut diseases[d];
        let n = people.len();

        let num_comms = grids.num_communities;
        let max_workgroup = groups.workgroup as usize + 1;
        let max_naics = groups.naics as usize + 1;

        let mut infected_workgroup = vec![0i32; num_comms * max_workgroup * max_naics];

        let scale = 1.0;
        let infect = 1.0 - parm.vac_eff;

        for i in 0..n {
            if dis.is_infectious(i) && candidate(people, i) {
                let community = community_of(people, geom, grids, i);
                let wgroup = (community * max_workgroup + people.workgroup[i] as usize)
                    * max_naics
                    + people.naics[i] as usize;
                infected_workgroup[wgroup] += 1;
            }
        }

        for i in 0..n {
            if dis.is_susceptible(i) && candidate(people, i) {
                let community = community_of(people, geom, grids, i);
                let wgroup = (community * max_workgroup + people.workgroup[i] as usize)
                    * max_naics
                    + people.naics[i] as usize;
                fold_exposure(
                    &mut dis.prob[i],
                    infect,
                    parm.xmit_work,
                    scale,
                    infected_workgroup[wgroup],
                );
            }
        }
    }
}
