//! Daily disease-status update for every agent and disease.
//!
//! Runs once per day after the infector: resets the probability accumulator
//! for the next cycle, counts immunity down to susceptibility, advances the
//! infected through symptom onset, and retires non-hospitalized courses to
//! immunity. Symptom onset (the day the counter reaches the floored
//! incubation period) triggers the withdrawal-compliance draw and the
//! hospitalization branch; within a day the first disease to hospitalize an
//! agent assigns the hospital cell, later ones only add to their own
//! treatment timers.

use crate::agent::{DiseaseStat, Status, SymptomPhase};
use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use crate::stats::DiseaseStatsGrid;
use crate::store::AgentStore;
use rand::Rng;

pub struct DiseaseProgression;

impl DiseaseProgression {
    pub fn update_agents<R: Rng + ?Sized>(
        store: &mut AgentStore,
        geom: &Geometry,
        parms: &[DiseaseParm],
        stats: &mut [DiseaseStatsGrid],
        symptomatic_withdraw_compliance: f64,
        rng: &mut R,
    ) {
        let n = store.len();
        let num_diseases = parms.len();
        let mut marked_hosp = vec![vec![false; n]; num_diseases];
        let mut marked_icu = vec![vec![false; n]; num_diseases];
        let mut marked_vent = vec![vec![false; n]; num_diseases];

        let (people, diseases) = store.parts_mut();

        for d in 0..num_diseases {
            let dis = &mut diseases[d];
            let parm = &parms[d];

            for i in 0..n {
                dis.prob[i] = 1.0;
                match dis.status[i] {
                    Status::Never | Status::Susceptible | Status::Dead => {}
                    Status::Immune => {
                        dis.counter[i] -= 1.0;
                        if dis.counter[i] < 0.0 {
                            dis.counter[i] = 0.0;
                            dis.treatment_timer[i] = 0.0;
                            dis.status[i] = Status::Susceptible;
                        }
                    }
                    Status::Infected => {
                        dis.counter[i] += 1.0;
                        if dis.counter[i] == 1.0 {
                            // first full day: decide the symptomatic course
                            dis.symptom[i] = if rng.random::<f64>() < parm.p_asymp {
                                SymptomPhase::Asymptomatic
                            } else {
                                SymptomPhase::Presymptomatic
                            };
                        } else if dis.counter[i] == dis.incubation_period[i].floor() {
                            debug_assert!(dis.symptom[i] != SymptomPhase::Symptomatic);
                            if dis.symptom[i] == SymptomPhase::Presymptomatic {
                                dis.symptom[i] = SymptomPhase::Symptomatic;
                                if symptomatic_withdraw_compliance > 0.0
                                    && rng.random::<f64>() < symptomatic_withdraw_compliance
                                {
                                    people.withdrawn[i] = true;
                                }
                                let course =
                                    parm.check_hospitalization(people.age_group[i], rng);
                                if course.days > 0.0 {
                                    dis.treatment_timer[i] = course.days;
                                    marked_hosp[d][i] = true;
                                    marked_icu[d][i] = course.icu;
                                    marked_vent[d][i] = course.ventilator;
                                }
                            }
                        } else if !people.in_hospital(i)
                            && dis.counter[i] >= dis.latent_period[i] + dis.infectious_period[i]
                        {
                            dis.status[i] = Status::Immune;
                            dis.counter[i] = parm.sample_immune_period(rng);
                            dis.symptom[i] = SymptomPhase::Presymptomatic;
                            people.withdrawn[i] = false;
                        }
                    }
                }
            }
        }

        // Assign hospital cells for today's admissions. An agent already
        // hospitalized for another disease keeps its cell; travel is
        // incompatible with hospitalization, so travelers are recalled.
        for i in 0..n {
            if people.in_hospital(i) {
                continue;
            }
            if (0..num_diseases).any(|d| marked_hosp[d][i]) {
                people.hosp[i] = people.home[i];
                people.random_travel[i] = -1;
                people.air_travel[i] = -1;
            }
        }

        for d in 0..num_diseases {
            for i in 0..n {
                let home = geom.linear(people.home[i]);
                if marked_hosp[d][i] {
                    stats[d].add(home, DiseaseStat::Hospitalization, 1.0);
                }
                if marked_icu[d][i] {
                    stats[d].add(home, DiseaseStat::Icu, 1.0);
                }
                if marked_vent[d][i] {
                    stats[d].add(home, DiseaseStat::Ventilator, 1.0);
                }
            }
        }
    }
}
