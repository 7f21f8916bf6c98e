//! The infector: converts the day's accumulated exposure into new
//! infections, plus initial-case seeding.

use crate::agent::Status;
use crate::disease::{CaseType, DiseaseParm};
use crate::store::AgentStore;
use log::{info, warn};
use rand::Rng;

/// Flips each day's `prob` accumulator into an infection probability and
/// samples new infections: an agent that has never been infected or has lost
/// immunity is infected with probability `1 - prob`.
pub fn infect_agents<R: Rng + ?Sized>(store: &mut AgentStore, parms: &[DiseaseParm], rng: &mut R) {
    let n = store.len();
    let (_, diseases) = store.parts_mut();
    for (d, parm) in parms.iter().enumerate() {
        let dis = &mut diseases[d];
        for i in 0..n {
            dis.prob[i] = 1.0 - dis.prob[i];
            if dis.status[i] == Status::Never || dis.status[i] == Status::Susceptible {
                if rng.random::<f64>() < dis.prob[i] {
                    dis.set_infected(i, parm, rng);
                }
            }
        }
    }
}

/// Infects `num_cases` distinct, currently uninfected agents chosen
/// uniformly. Returns how many were actually seeded.
pub fn seed_random_cases<R: Rng + ?Sized>(
    store: &mut AgentStore,
    d: usize,
    parm: &DiseaseParm,
    num_cases: usize,
    rng: &mut R,
) -> usize {
    let n = store.len();
    let dis = &mut store.diseases[d];
    let mut candidates: Vec<usize> = (0..n)
        .filter(|&i| matches!(dis.status[i], Status::Never | Status::Susceptible))
        .collect();
    let seeded = num_cases.min(candidates.len());
    if seeded < num_cases {
        warn!(
            "disease `{}`: only {seeded} of {num_cases} initial cases could be seeded",
            parm.name
        );
    }
    for k in 0..seeded {
        let pick = rng.random_range(k..candidates.len());
        candidates.swap(k, pick);
        dis.set_infected(candidates[k], parm, rng);
    }
    info!("disease `{}`: seeded {seeded} initial cases", parm.name);
    seeded
}

/// Infects the given agents with disease `d`. The entry point for external
/// case loaders that resolve case files to agent indices.
pub fn seed_cases<R: Rng + ?Sized>(
    store: &mut AgentStore,
    d: usize,
    parm: &DiseaseParm,
    agents: &[usize],
    rng: &mut R,
) {
    let dis = &mut store.diseases[d];
    for &i in agents {
        if matches!(dis.status[i], Status::Never | Status::Susceptible) {
            dis.set_infected(i, parm, rng);
        }
    }
}

/// Seeds every disease according to its configured case type. File-sourced
/// diseases wait for the external loader to call [`seed_cases`].
pub fn seed_initial_cases<R: Rng + ?Sized>(
    store: &mut AgentStore,
    parms: &[DiseaseParm],
    rng: &mut R,
) {
    for (d, parm) in parms.iter().enumerate() {
        match parm.initial_case_type {
            CaseType::Random => {
                if parm.num_initial_cases > 0 {
                    seed_random_cases(store, d, parm, parm.num_initial_cases, rng);
                }
            }
            CaseType::File => {
                warn!(
                    "disease `{}`: case file `{}` is seeded by the external loader",
                    parm.name,
                    parm.case_filename.as_deref().unwrap_or("<unset>")
                );
            }
        }
    }
}
