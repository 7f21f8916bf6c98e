//! Neighborhood and community interactions around home, run during the
//! night phase.
//!
//! Each susceptible agent sees two exposure groups: its home neighborhood,
//! and the rest of its community. Neighborhood infectious agents are a
//! subset of the community's, so the community exponent is the difference of
//! the two counts. This is the one model that lets random travelers
//! interact: a visitor mixes with the community it is standing in.

use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use crate::interaction::{community_of, fold_exposure, InteractionModel};
use crate::population::CellGrids;
use crate::store::{AgentStore, People};

pub struct HomeNborhoodModel;

#[inline]
fn candidate(people: &People, i: usize) -> bool {
    !people.in_hospital(i) && !people.withdrawn[i]
}

impl InteractionModel for HomeNborhoodModel {
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
        let max_nborhood = groups.nborhood as usize + 1;

        let mut infected_community = vec![0i32; num_comms];
        let mut infected_nborhood = vec![0i32; num_comms * max_nborhood];

        let scale = 1.0;
        let infect = 1.0 - parm.vac_eff;

        for i in 0..n {
            if dis.is_infectious(i) && candidate(people, i) {
                let community = community_of(people, geom, grids, i);
                let nborhood = people.nborhood[i] as usize;
                infected_community[community] += 1;
                infected_nborhood[community * max_nborhood + nborhood] += 1;
            }
        }

        for i in 0..n {
            if dis.is_susceptible(i) && candidate(people, i) {
                let age = people.age_group[i].index();
                let community = community_of(people, geom, grids, i);
                let nborhood = people.nborhood[i] as usize;
                let num_nborhood = infected_nborhood[community * max_nborhood + nborhood];
                let num_community = infected_community[community];
                debug_assert!(num_community >= num_nborhood);
                fold_exposure(
                    &mut dis.prob[i],
                    infect,
                    parm.xmit_comm[age],
                    scale,
                    num_community - num_nborhood,
                );
                fold_exposure(
                    &mut dis.prob[i],
                    infect,
                    parm.xmit_hood[age],
                    scale,
                    num_nborhood,
                );
            }
        }
    }
}
