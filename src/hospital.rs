//! In-hospital treatment: timer countdown, ICU/ventilator phase exits,
//! death versus recovery, and discharge.
//!
//! The single per-disease treatment timer encodes the clinical phases by
//! offset: a plain hospital stay runs `t_hosp` days; an ICU course adds
//! `t_hosp_offset`, a ventilator course another. Counting down, the timer
//! crossing `2 * t_hosp_offset` ends a ventilator course, crossing
//! `t_hosp_offset` ends an ICU course, and reaching zero ends a plain stay.
//! Each exit event draws death against the event's bucket; survivors recover
//! to immunity. An agent leaves the hospital when every disease's timer is
//! back to zero; death ends every course at once and releases whatever beds
//! the other diseases still hold.

use crate::agent::{Cell, DiseaseStat, Status, SymptomPhase};
use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use crate::stats::DiseaseStatsGrid;
use crate::store::AgentStore;
use rand::Rng;

pub struct HospitalEngine;

impl HospitalEngine {
    pub fn treat_agents<R: Rng + ?Sized>(
        store: &mut AgentStore,
        geom: &Geometry,
        parms: &[DiseaseParm],
        stats: &mut [DiseaseStatsGrid],
        rng: &mut R,
    ) {
        let n = store.len();
        let num_diseases = parms.len();
        let (people, diseases) = store.parts_mut();

        // Death is agent-level: all diseases must agree before and after.
        let mut is_alive = vec![true; n];
        for i in 0..n {
            let dead = diseases[0].status[i] == Status::Dead;
            is_alive[i] = !dead;
            for dis in diseases.iter().skip(1) {
                assert!(
                    (dis.status[i] == Status::Dead) == dead,
                    "agent {i}: diseases disagree on death"
                );
            }
        }

        // Exit event per (disease, agent): +1 hospital end, +2 ICU end,
        // +3 ventilator end; negated when the agent dies at that event.
        let mut exit_events = vec![vec![0i32; n]; num_diseases];

        for d in 0..num_diseases {
            let dis = &mut diseases[d];
            let parm = &parms[d];

            for i in 0..n {
                if !people.in_hospital(i) {
                    continue;
                }
                if dis.counter[i] == dis.incubation_period[i].floor() {
                    // admitted earlier today, treatment starts tomorrow
                    continue;
                }
                if dis.treatment_timer[i] == 0.0 {
                    continue;
                }
                if !is_alive[i] {
                    continue;
                }
                debug_assert!(dis.status[i] == Status::Infected);

                dis.treatment_timer[i] -= 1.0;
                let event = if dis.treatment_timer[i] == 0.0 {
                    1
                } else if dis.treatment_timer[i] == parm.t_hosp_offset {
                    2
                } else if dis.treatment_timer[i] == 2.0 * parm.t_hosp_offset {
                    3
                } else {
                    0
                };
                if event > 0 {
                    let age = people.age_group[i].index();
                    if rng.random::<f64>() < parm.hosp_to_death[(event - 1) as usize][age] {
                        is_alive[i] = false;
                        exit_events[d][i] = -event;
                        dis.status[i] = Status::Dead;
                    } else {
                        exit_events[d][i] = event;
                        dis.status[i] = Status::Immune;
                        dis.counter[i] = parm.sample_immune_period(rng);
                        dis.symptom[i] = SymptomPhase::Presymptomatic;
                        people.withdrawn[i] = false;
                        dis.treatment_timer[i] = 0.0;
                    }
                }
            }
        }

        for i in 0..n {
            if !people.in_hospital(i) {
                continue;
            }
            if !is_alive[i] {
                // Death carries every disease with it. A co-morbid disease
                // still holding a bed gets a synthetic exit event so its
                // admission gauges are released; the phase is recoverable
                // from the timer because an active course never counts past
                // an event threshold.
                for (d, dis) in diseases.iter_mut().enumerate() {
                    let timer = dis.treatment_timer[i];
                    if timer > 0.0 && exit_events[d][i] == 0 {
                        exit_events[d][i] = if timer > 2.0 * parms[d].t_hosp_offset {
                            3
                        } else if timer > parms[d].t_hosp_offset {
                            2
                        } else {
                            1
                        };
                    }
                    dis.status[i] = Status::Dead;
                    dis.treatment_timer[i] = 0.0;
                    dis.symptom[i] = SymptomPhase::Presymptomatic;
                }
                people.hosp[i] = Cell::NONE;
                people.withdrawn[i] = false;
            } else {
                let remaining: f64 = diseases.iter().map(|dis| dis.treatment_timer[i]).sum();
                if remaining == 0.0 {
                    people.hosp[i] = Cell::NONE;
                    people.withdrawn[i] = false;
                    let (x, y) = geom.cell_center(people.home[i]);
                    people.pos_x[i] = x;
                    people.pos_y[i] = y;
                }
            }
        }

        // Every exit event releases its bed gauges; deaths also count.
        for d in 0..num_diseases {
            for i in 0..n {
                let event = exit_events[d][i];
                if event == 0 {
                    continue;
                }
                let home = geom.linear(people.home[i]);
                if event < 0 {
                    stats[d].add(home, DiseaseStat::Death, 1.0);
                }
                let phases = event.abs();
                stats[d].add(home, DiseaseStat::Hospitalization, -1.0);
                if phases > 1 {
                    stats[d].add(home, DiseaseStat::Icu, -1.0);
                }
                if phases > 2 {
                    stats[d].add(home, DiseaseStat::Ventilator, -1.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgeGroup;
    use crate::population::{AgentSeed, Population};
    use crate::store::BinPolicy;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn hospital_world(num_diseases: usize) -> (Geometry, AgentStore, Vec<DiseaseStatsGrid>) {
        let geom = Geometry::grid(2, 2);
        let mut pop = Population::new();
        pop.add_community(Cell::new(0, 0), 0, 0, 0);
        for f in 0..2 {
            pop.add_agent(AgentSeed {
                age_group: AgeGroup::A30to49,
                family: f,
                home: Cell::new(0, 0),
                ..AgentSeed::default()
            });
        }
        let (store, _) =
            crate::population::build(&pop, &geom, num_diseases, BinPolicy::Serial).unwrap();
        let stats = (0..num_diseases)
            .map(|_| DiseaseStatsGrid::new(geom.num_cells()))
            .collect();
        (geom, store, stats)
    }

    fn admit(store: &mut AgentStore, d: usize, i: usize, timer: f64) {
        let dis = &mut store.diseases[d];
        dis.status[i] = Status::Infected;
        dis.symptom[i] = SymptomPhase::Symptomatic;
        dis.counter[i] = 6.0;
        dis.incubation_period[i] = 5.0;
        dis.latent_period[i] = 3.0;
        dis.infectious_period[i] = 20.0;
        dis.treatment_timer[i] = timer;
        store.people.hosp[i] = store.people.home[i];
        store.people.withdrawn[i] = true;
    }

    #[test]
    fn plain_stay_recovers_and_discharges() {
        let (geom, mut store, mut stats) = hospital_world(1);
        let mut parm = DiseaseParm::new("test");
        parm.hosp_to_death = [[0.0; 6]; 3];
        let mut rng = SmallRng::seed_from_u64(21);

        admit(&mut store, 0, 0, 3.0);
        for _ in 0..2 {
            HospitalEngine::treat_agents(
                &mut store,
                &geom,
                std::slice::from_ref(&parm),
                &mut stats,
                &mut rng,
            );
            assert!(store.people.in_hospital(0));
        }
        HospitalEngine::treat_agents(
            &mut store,
            &geom,
            std::slice::from_ref(&parm),
            &mut stats,
            &mut rng,
        );

        assert_eq!(store.diseases[0].status[0], Status::Immune);
        assert!(!store.people.in_hospital(0));
        assert!(!store.people.withdrawn[0]);
        let home = geom.linear(store.people.home[0]);
        assert_eq!(stats[0].get(home, DiseaseStat::Hospitalization), -1.0);
        assert_eq!(stats[0].get(home, DiseaseStat::Death), 0.0);
    }

    #[test]
    fn just_admitted_agents_wait_a_day() {
        let (geom, mut store, mut stats) = hospital_world(1);
        let parm = DiseaseParm::new("test");
        let mut rng = SmallRng::seed_from_u64(22);

        admit(&mut store, 0, 0, 3.0);
        // counter equals the floored incubation period on admission day
        store.diseases[0].counter[0] = 5.0;
        HospitalEngine::treat_agents(
            &mut store,
            &geom,
            std::slice::from_ref(&parm),
            &mut stats,
            &mut rng,
        );
        assert_eq!(store.diseases[0].treatment_timer[0], 3.0);
    }

    #[test]
    fn ventilator_exit_kills_everyone_when_forced() {
        let (geom, mut store, mut stats) = hospital_world(2);
        let mut parm = DiseaseParm::new("test");
        parm.hosp_to_death = [[0.0; 6], [0.0; 6], [1.0; 6]];
        let parms = vec![parm.clone(), parm.clone()];
        let mut rng = SmallRng::seed_from_u64(23);

        // ventilator course for disease 0: 3 + 2 * 10 days
        admit(&mut store, 0, 0, 3.0 + 2.0 * parm.t_hosp_offset);
        store.diseases[1].status[0] = Status::Infected;
        store.diseases[1].counter[0] = 2.0;
        store.diseases[1].incubation_period[0] = 5.0;

        // timer reaches 2 * offset after 3 days; the exit event kills
        for _ in 0..3 {
            HospitalEngine::treat_agents(&mut store, &geom, &parms, &mut stats, &mut rng);
        }

        assert_eq!(store.diseases[0].status[0], Status::Dead);
        assert_eq!(store.diseases[1].status[0], Status::Dead);
        assert!(!store.people.in_hospital(0));
        assert!(!store.people.withdrawn[0]);
        let home = geom.linear(store.people.home[0]);
        assert_eq!(stats[0].get(home, DiseaseStat::Death), 1.0);
        assert_eq!(stats[0].get(home, DiseaseStat::Hospitalization), -1.0);
        assert_eq!(stats[0].get(home, DiseaseStat::Icu), -1.0);
        assert_eq!(stats[0].get(home, DiseaseStat::Ventilator), -1.0);
        assert_eq!(stats[1].get(home, DiseaseStat::Death), 0.0);
        assert!(store.check(&geom).is_ok());
    }

    #[test]
    fn death_releases_comorbid_beds() {
        let (geom, mut store, mut stats) = hospital_world(2);
        let mut parm = DiseaseParm::new("test");
        parm.hosp_to_death = [[0.0; 6], [0.0; 6], [1.0; 6]];
        let parms = vec![parm.clone(), parm.clone()];
        let mut rng = SmallRng::seed_from_u64(26);

        // disease 0 one day from its ventilator exit; disease 1 mid-ICU
        admit(&mut store, 0, 0, 1.0 + 2.0 * parm.t_hosp_offset);
        admit(&mut store, 1, 0, 8.0 + parm.t_hosp_offset);

        HospitalEngine::treat_agents(&mut store, &geom, &parms, &mut stats, &mut rng);

        assert_eq!(store.diseases[0].status[0], Status::Dead);
        assert_eq!(store.diseases[1].status[0], Status::Dead);
        assert_eq!(store.diseases[1].treatment_timer[0], 0.0);

        let home = geom.linear(store.people.home[0]);
        assert_eq!(stats[0].get(home, DiseaseStat::Death), 1.0);
        assert_eq!(stats[0].get(home, DiseaseStat::Hospitalization), -1.0);
        assert_eq!(stats[0].get(home, DiseaseStat::Icu), -1.0);
        assert_eq!(stats[0].get(home, DiseaseStat::Ventilator), -1.0);
        // the co-morbid ICU bed is released without a death of its own
        assert_eq!(stats[1].get(home, DiseaseStat::Death), 0.0);
        assert_eq!(stats[1].get(home, DiseaseStat::Hospitalization), -1.0);
        assert_eq!(stats[1].get(home, DiseaseStat::Icu), -1.0);
        assert_eq!(stats[1].get(home, DiseaseStat::Ventilator), 0.0);
    }

    #[test]
    fn discharge_waits_for_every_disease() {
        let (geom, mut store, mut stats) = hospital_world(2);
        let mut parm = DiseaseParm::new("test");
        parm.hosp_to_death = [[0.0; 6]; 3];
        let parms = vec![parm.clone(), parm];
        let mut rng = SmallRng::seed_from_u64(24);

        admit(&mut store, 0, 0, 1.0);
        admit(&mut store, 1, 0, 2.0);

        HospitalEngine::treat_agents(&mut store, &geom, &parms, &mut stats, &mut rng);
        // disease 0 finished, disease 1 still holds the bed
        assert_eq!(store.diseases[0].status[0], Status::Immune);
        assert!(store.people.in_hospital(0));

        HospitalEngine::treat_agents(&mut store, &geom, &parms, &mut stats, &mut rng);
        assert_eq!(store.diseases[1].status[0], Status::Immune);
        assert!(!store.people.in_hospital(0));
    }

    #[test]
    #[should_panic(expected = "disagree on death")]
    fn inconsistent_death_is_fatal() {
        let (geom, mut store, mut stats) = hospital_world(2);
        let parm = DiseaseParm::new("test");
        let parms = vec![parm.clone(), parm];
        let mut rng = SmallRng::seed_from_u64(25);

        store.diseases[0].status[0] = Status::Dead;
        HospitalEngine::treat_agents(&mut store, &geom, &parms, &mut stats, &mut rng);
    }
}
