//! School interactions, run during the day phase.
//!
//! Attendees mix within (school id, grade) inside the community; teachers
//! attend too, carrying the grade they teach. Daycare grades
//! are counted apart from the rest so a daycare room never mixes with the
//! co-located school. The coefficient depends on the school type and on the
//! direction of transmission: child-to-child and adult-to-adult use the base
//! table, adult-to-child and child-to-adult their own tables.

use crate::agent::{school_type_for_grade, SchoolType};
use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use crate::interaction::{community_of, fold_exposure, InteractionModel};
use crate::population::CellGrids;
use crate::store::{AgentStore, People};

pub struct SchoolModel;

#[inline]
fn candidate(people: &People, i: usize) -> bool {
    !people.in_hospital(i)
        && people.school_id[i] > 0
        && !people.school_closed[i]
        && !people.withdrawn[i]
        && people.random_travel[i] < 0
        && people.air_travel[i] < 0
}

impl InteractionModel for SchoolModel {
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
        let max_school_id = groups.school_id as usize + 1;
        let max_grade = groups.school_grade as usize + 1;

        let mut infected_school = vec![0i32; num_comms * max_school_id * max_grade];
        let mut infected_daycare = vec![0i32; num_comms * max_school_id * max_grade];

        let scale = 1.0;
        let infect = 1.0 - parm.vac_eff;

        // Transmitter age classes are counted separately; the coefficient
        // in the apply pass depends on the infectious side's class.
        for adults in [true, false] {
            infected_school.fill(0);
            infected_daycare.fill(0);

            for i in 0..n {
                if dis.is_infectious(i) && candidate(people, i) && people.is_adult(i) == adults {
                    let community = community_of(people, geom, grids, i);
                    let pos = (community * max_school_id + people.school_id[i] as usize)
                        * max_grade
                        + people.school_grade[i] as usize;
                    if school_type_for_grade(people.school_grade[i]) == SchoolType::Daycare {
                        infected_daycare[pos] += 1;
                    } else {
                        infected_school[pos] += 1;
                    }
                }
            }

            for i in 0..n {
                if dis.is_susceptible(i) && candidate(people, i) {
                    let community = community_of(people, geom, grids, i);
                    let pos = (community * max_school_id + people.school_id[i] as usize)
                        * max_grade
                        + people.school_grade[i] as usize;
                    let school_type = school_type_for_grade(people.school_grade[i]);
                    if school_type == SchoolType::Daycare {
                        fold_exposure(
                            &mut dis.prob[i],
                            infect,
                            parm.xmit_school[SchoolType::Daycare.index()],
                            scale,
                            infected_daycare[pos],
                        );
                    } else {
                        let receiver_is_child = !people.is_adult(i);
                        let xmit = match (adults, receiver_is_child) {
                            // teachers and staff to students
                            (true, true) => parm.xmit_school_a2c[school_type.index()],
                            // students to teachers and staff
                            (false, false) => parm.xmit_school_c2a[school_type.index()],
                            _ => parm.xmit_school[school_type.index()],
                        };
                        fold_exposure(
                            &mut dis.prob[i],
                            infect,
                            xmit,
                            scale,
                            infected_school[pos],
                        );
                    }
                }
            }
        }
    }
}
