//! Daytime neighborhood and community interactions around the workplace.
//!
//! The daytime analogue of the home-neighborhood model, grouped by the work
//! neighborhood. The work neighborhood id applies to every age group, since
//! children spend the day where their school or daycare is, which need not
//! be their home neighborhood. Air travelers mix with the community they
//! flew into; random travelers are excluded here.

use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use crate::interaction::{community_of, fold_exposure, InteractionModel};
use crate::population::CellGrids;
use crate::store::{AgentStore, People};

pub struct WorkNborhoodModel;

#[inline]
fn candidate(people: &People, i: usize) -> bool {
    !people.in_hospital(i) && !people.withdrawn[i] && people.random_travel[i] < 0
}

impl InteractionModel for WorkNborhoodModel {
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
        let max_nborhood = groups.work_nborhood as usize + 1;

        let mut infected_community = vec![0i32; num_comms];
        let mut infected_nborhood = vec![0i32; num_comms * max_nborhood];

        let scale = 1.0;
        let infect = 1.0 - parm.vac_eff;

        for i in 0..n {
            if dis.is_infectious(i) && candidate(people, i) {
                let community = community_of(people, geom, grids, i);
                let nborhood = people.work_nborhood[i] as usize;
                infected_community[community] += 1;
                infected_nborhood[community * max_nborhood + nborhood] += 1;
            }
        }

        for i in 0..n {
            if dis.is_susceptible(i) && candidate(people, i) {
                let age = people.age_group[i].index();
                let community = community_of(people, geom, grids, i);
                let nborhood = people.work_nborhood[i] as usize;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::testutil::{adult_seed, make_infectious, single_community};
    use crate::population::AgentSeed;
    use approx::assert_relative_eq;

    fn day_world() -> Vec<AgentSeed> {
        vec![
            AgentSeed {
                work_nborhood: 2,
                ..adult_seed()
            },
            AgentSeed {
                family: 1,
                work_nborhood: 2,
                ..adult_seed()
            },
            AgentSeed {
                family: 2,
                work_nborhood: 3,
                ..adult_seed()
            },
        ]
    }

    #[test]
    fn work_neighborhood_splits_the_community() {
        let (geom, mut store, grids) = single_community(day_world());
        make_infectious(&mut store, 0, 0);
        let parm = DiseaseParm::new("test");

        WorkNborhoodModel.interact(&mut store, &geom, &grids, 0, &parm);

        let age = crate::agent::AgeGroup::A30to49.index();
        let dis = &store.diseases[0];
        assert_relative_eq!(dis.prob[1], 1.0 - parm.xmit_hood[age]);
        assert_relative_eq!(dis.prob[2], 1.0 - parm.xmit_comm[age]);
    }

    #[test]
    fn random_travelers_are_excluded() {
        let (geom, mut store, grids) = single_community(day_world());
        make_infectious(&mut store, 0, 0);
        store.people.random_travel[0] = 0;
        let parm = DiseaseParm::new("test");

        WorkNborhoodModel.interact(&mut store, &geom, &grids, 0, &parm);

        let dis = &store.diseases[0];
        assert_relative_eq!(dis.prob[1], 1.0);
        assert_relative_eq!(dis.prob[2], 1.0);
    }

    #[test]
    fn air_travelers_mix_here() {
        let (geom, mut store, grids) = single_community(day_world());
        make_infectious(&mut store, 0, 0);
        // agent 2 flew in; it still shares only community-level contact
        store.people.air_travel[2] = 2;
        let parm = DiseaseParm::new("test");

        WorkNborhoodModel.interact(&mut store, &geom, &grids, 0, &parm);

        let age = crate::agent::AgeGroup::A30to49.index();
        assert_relative_eq!(store.diseases[0].prob[2], 1.0 - parm.xmit_comm[age]);
    }
}
