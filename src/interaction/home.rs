//! Household and neighborhood-cluster interactions, run during the night
//! phase when agents are home.
//!
//! Two exposure groups per susceptible agent: its family, and its
//! neighborhood cluster (a block of [`FAMILIES_PER_CLUSTER`] families within
//! one neighborhood). Family exposure applies regardless of withdrawal;
//! cluster exposure requires both sides out and about. Because same family
//! implies same cluster, the cluster count subtracts the agent's
//! family-not-withdrawn count to avoid charging those contacts twice.

use crate::agent::FAMILIES_PER_CLUSTER;
use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use crate::interaction::{community_of, fold_exposure, InteractionModel};
use crate::population::CellGrids;
use crate::store::{AgentStore, People};

pub struct HomeModel;

#[inline]
fn candidate(people: &People, i: usize) -> bool {
    !people.in_hospital(i) && people.random_travel[i] < 0 && people.air_travel[i] < 0
}

impl InteractionModel for HomeModel {
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
        let max_family = groups.family as usize + 1;
        let max_nborhood = groups.nborhood as usize + 1;
        let num_ncs = max_family / FAMILIES_PER_CLUSTER as usize + 1;

        let mut infected_family = vec![0i32; num_comms * max_family];
        let mut infected_family_not_withdrawn = vec![0i32; num_comms * max_family];
        let mut infected_nc = vec![0i32; num_comms * max_nborhood * num_ncs];

        // cell-level social scale, currently uniform
        let scale = 1.0;
        let infect = 1.0 - parm.vac_eff;

        // Separate count passes for infectious adults and children: the
        // transmission coefficient depends on the transmitter's age class.
        for adults in [true, false] {
            infected_family.fill(0);
            infected_family_not_withdrawn.fill(0);
            infected_nc.fill(0);

            for i in 0..n {
                if dis.is_infectious(i) && candidate(people, i) && people.is_adult(i) == adults {
                    let community = community_of(people, geom, grids, i);
                    let family_i = community * max_family + people.family[i] as usize;
                    infected_family[family_i] += 1;
                    if !people.withdrawn[i] {
                        infected_family_not_withdrawn[family_i] += 1;
                        let cluster = (people.family[i] / FAMILIES_PER_CLUSTER) as usize;
                        let nc = (community * max_nborhood + people.nborhood[i] as usize)
                            * num_ncs
                            + cluster;
                        infected_nc[nc] += 1;
                    }
                }
            }

            let (xmit_family, xmit_nc) = if adults {
                (&parm.xmit_hh_adult, &parm.xmit_nc_adult)
            } else {
                (&parm.xmit_hh_child, &parm.xmit_nc_child)
            };

            for i in 0..n {
                if dis.is_susceptible(i) && candidate(people, i) {
                    let age = people.age_group[i].index();
                    let community = community_of(people, geom, grids, i);
                    let family_i = community * max_family + people.family[i] as usize;
                    let num_family = infected_family[family_i];
                    fold_exposure(&mut dis.prob[i], infect, xmit_family[age], scale, num_family);

                    if !people.withdrawn[i] {
                        let num_family_not_withdrawn = infected_family_not_withdrawn[family_i];
                        debug_assert!(num_family >= num_family_not_withdrawn);
                        let cluster = (people.family[i] / FAMILIES_PER_CLUSTER) as usize;
                        let nc = (community * max_nborhood + people.nborhood[i] as usize)
                            * num_ncs
                            + cluster;
                        // family members also sit in the cluster bin
                        let num_cluster = infected_nc[nc] - num_family_not_withdrawn;
                        debug_assert!(num_cluster >= 0);
                        fold_exposure(&mut dis.prob[i], infect, xmit_nc[age], scale, num_cluster);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::testutil::{adult_seed, child_seed, make_infectious, single_community};
    use crate::population::AgentSeed;
    use approx::assert_relative_eq;

    // agent 0: infectious adult, family 0
    // agent 1: adult, family 0 (household contact)
    // agent 2: adult, family 1, same cluster (families 0-3)
    // agent 3: adult, family 4, other cluster
    fn cluster_world() -> Vec<AgentSeed> {
        vec![
            adult_seed(),
            adult_seed(),
            AgentSeed {
                family: 1,
                ..adult_seed()
            },
            AgentSeed {
                family: 4,
                ..adult_seed()
            },
        ]
    }

    #[test]
    fn family_and_cluster_exposure() {
        let (geom, mut store, grids) = single_community(cluster_world());
        make_infectious(&mut store, 0, 0);
        let parm = DiseaseParm::new("test");

        HomeModel.interact(&mut store, &geom, &grids, 0, &parm);

        let age = crate::agent::AgeGroup::A30to49.index();
        let dis = &store.diseases[0];
        assert_relative_eq!(dis.prob[1], 1.0 - parm.xmit_hh_adult[age]);
        assert_relative_eq!(dis.prob[2], 1.0 - parm.xmit_nc_adult[age]);
        assert_relative_eq!(dis.prob[3], 1.0);
    }

    #[test]
    fn child_transmitter_uses_child_coefficients() {
        let mut seeds = cluster_world();
        seeds[0] = child_seed();
        let (geom, mut store, grids) = single_community(seeds);
        make_infectious(&mut store, 0, 0);
        let parm = DiseaseParm::new("test");

        HomeModel.interact(&mut store, &geom, &grids, 0, &parm);

        let age = crate::agent::AgeGroup::A30to49.index();
        let dis = &store.diseases[0];
        assert_relative_eq!(dis.prob[1], 1.0 - parm.xmit_hh_child[age]);
        assert_relative_eq!(dis.prob[2], 1.0 - parm.xmit_nc_child[age]);
    }

    #[test]
    fn withdrawn_transmitter_reaches_family_only() {
        let (geom, mut store, grids) = single_community(cluster_world());
        make_infectious(&mut store, 0, 0);
        store.people.withdrawn[0] = true;
        let parm = DiseaseParm::new("test");

        HomeModel.interact(&mut store, &geom, &grids, 0, &parm);

        let age = crate::agent::AgeGroup::A30to49.index();
        let dis = &store.diseases[0];
        assert_relative_eq!(dis.prob[1], 1.0 - parm.xmit_hh_adult[age]);
        assert_relative_eq!(dis.prob[2], 1.0);
    }

    #[test]
    fn withdrawn_receiver_keeps_family_exposure_only() {
        let (geom, mut store, grids) = single_community(cluster_world());
        make_infectious(&mut store, 0, 0);
        store.people.withdrawn[2] = true;
        let parm = DiseaseParm::new("test");

        HomeModel.interact(&mut store, &geom, &grids, 0, &parm);

        let dis = &store.diseases[0];
        assert_relative_eq!(dis.prob[2], 1.0);
    }

    #[test]
    fn hospitalized_transmitter_is_excluded() {
        let (geom, mut store, grids) = single_community(cluster_world());
        make_infectious(&mut store, 0, 0);
        store.people.hosp[0] = crate::agent::Cell::new(0, 0);
        let parm = DiseaseParm::new("test");

        HomeModel.interact(&mut store, &geom, &grids, 0, &parm);

        let dis = &store.diseases[0];
        assert_relative_eq!(dis.prob[1], 1.0);
        assert_relative_eq!(dis.prob[2], 1.0);
    }

    #[test]
    fn probabilities_stay_in_range() {
        let (geom, mut store, grids) = single_community(cluster_world());
        make_infectious(&mut store, 0, 0);
        make_infectious(&mut store, 0, 3);
        let mut parm = DiseaseParm::new("test");
        parm.xmit_hh_adult = [1.0; 6];
        parm.xmit_nc_adult = [1.0; 6];

        HomeModel.interact(&mut store, &geom, &grids, 0, &parm);

        for i in 0..store.len() {
            let p = store.diseases[0].prob[i];
            assert!((0.0..=1.0).contains(&p), "prob[{i}] = {p}");
        }
        assert_relative_eq!(store.diseases[0].prob[1], 0.0);
    }
}
