//! Air travel: tabulated airport flows and the passes that send agents
//! through them.
//!
//! The tables arrive from the external airflow loader in CSR form: for each
//! origin airport a segment of destination airports with a cumulative
//! probability ladder, and for each destination airport a segment of arrival
//! units with its own ladder. Residual mass at the end of a ladder means "no
//! trip today". Units are mapped to airports and to per-unit outbound
//! probabilities; an arrival unit resolves to a uniformly chosen community
//! of that unit.

use crate::agent::Cell;
use crate::error::EpiError;
use crate::geometry::Geometry;
use crate::population::CellGrids;
use crate::store::AgentStore;
use log::debug;
use rand::Rng;

/// Arrival ladders longer than this are searched by bisection.
const LINEAR_SCAN_MAX: usize = 16;

/// Tabulated airport flows, indexed by unit and airport ids.
#[derive(Default, Debug, Clone)]
pub struct AirTravelFlow {
    /// Airport serving each unit.
    pub assigned_airport: Vec<i32>,
    /// Per-unit probability of flying on a given day.
    pub air_travel_prob: Vec<f64>,
    /// Destination-airport CSR: ids, per-origin offsets, cumulative probs.
    pub dest_airports: Vec<i32>,
    pub dest_airports_offset: Vec<u32>,
    pub dest_airports_prob: Vec<f64>,
    /// Arrival-unit CSR: ids, per-destination offsets, cumulative probs.
    pub arrival_units: Vec<i32>,
    pub arrival_units_offset: Vec<u32>,
    pub arrival_units_prob: Vec<f64>,
}

impl AirTravelFlow {
    pub fn num_airports(&self) -> usize {
        self.dest_airports_offset.len().saturating_sub(1)
    }

    /// Fails fast on malformed tables: ragged offsets, non-monotone
    /// probability ladders, or ids that point outside the loaded population.
    pub fn validate(&self, grids: &CellGrids) -> Result<(), EpiError> {
        let num_units = grids.num_units();
        let num_airports = self.num_airports();

        if self.assigned_airport.len() != num_units || self.air_travel_prob.len() != num_units {
            return Err("air travel tables must cover every unit".into());
        }
        for (unit, &prob) in self.air_travel_prob.iter().enumerate() {
            if !(0.0..=1.0).contains(&prob) {
                return Err(EpiError::EpiError(format!(
                    "unit {unit}: air travel probability {prob} out of range"
                )));
            }
        }
        for (unit, &airport) in self.assigned_airport.iter().enumerate() {
            if airport < 0 || airport as usize >= num_airports {
                return Err(EpiError::EpiError(format!(
                    "unit {unit}: assigned airport {airport} does not exist"
                )));
            }
        }

        check_csr(
            "destination airports",
            &self.dest_airports_offset,
            &self.dest_airports,
            &self.dest_airports_prob,
            num_airports as i32,
        )?;
        if self.arrival_units_offset.len() != num_airports + 1 {
            return Err("arrival table must cover every airport".into());
        }
        check_csr(
            "arrival units",
            &self.arrival_units_offset,
            &self.arrival_units,
            &self.arrival_units_prob,
            num_units as i32,
        )?;
        for &unit in &self.arrival_units {
            if grids.unit_communities[unit as usize].is_empty() {
                return Err(EpiError::EpiError(format!(
                    "arrival unit {unit} has no communities"
                )));
            }
        }
        Ok(())
    }

    fn dest_airport<R: Rng + ?Sized>(&self, origin: usize, rng: &mut R) -> Option<i32> {
        let lo = self.dest_airports_offset[origin] as usize;
        let hi = self.dest_airports_offset[origin + 1] as usize;
        // airport fan-outs are short, a sequential walk beats bisection
        pick_linear(
            &self.dest_airports[lo..hi],
            &self.dest_airports_prob[lo..hi],
            rng.random::<f64>(),
        )
    }

    fn arrival_unit<R: Rng + ?Sized>(&self, dest: usize, rng: &mut R) -> Option<i32> {
        let lo = self.arrival_units_offset[dest] as usize;
        let hi = self.arrival_units_offset[dest + 1] as usize;
        let ids = &self.arrival_units[lo..hi];
        let probs = &self.arrival_units_prob[lo..hi];
        let u = rng.random::<f64>();
        if ids.len() <= LINEAR_SCAN_MAX {
            pick_linear(ids, probs, u)
        } else {
            pick_bisect(ids, probs, u)
        }
    }
}

fn check_csr(
    what: &str,
    offsets: &[u32],
    ids: &[i32],
    probs: &[f64],
    id_limit: i32,
) -> Result<(), EpiError> {
    if offsets.is_empty() || offsets[0] != 0 || *offsets.last().unwrap() as usize != ids.len() {
        return Err(EpiError::EpiError(format!("{what}: malformed offsets")));
    }
    if probs.len() != ids.len() {
        return Err(EpiError::EpiError(format!(
            "{what}: {} ids but {} probabilities",
            ids.len(),
            probs.len()
        )));
    }
    for window in offsets.windows(2) {
        let (lo, hi) = (window[0] as usize, window[1] as usize);
        if lo > hi {
            return Err(EpiError::EpiError(format!("{what}: offsets not monotone")));
        }
        let mut prev = 0.0;
        for k in lo..hi {
            if probs[k] < prev || probs[k] > 1.0 + 1e-9 {
                return Err(EpiError::EpiError(format!(
                    "{what}: probability ladder not monotone in [0, 1]"
                )));
            }
            prev = probs[k];
        }
    }
    for &id in ids {
        if id < 0 || id >= id_limit {
            return Err(EpiError::EpiError(format!("{what}: id {id} out of range")));
        }
    }
    Ok(())
}

/// Walks a cumulative ladder; returns the first entry whose upper bound
/// exceeds the draw, or `None` when the draw lands in the residual mass.
fn pick_linear(ids: &[i32], probs: &[f64], u: f64) -> Option<i32> {
    for (k, &hi) in probs.iter().enumerate() {
        if u < hi {
            return Some(ids[k]);
        }
    }
    None
}

/// Bisection on the same ladder: first entry with upper bound above `u`.
fn pick_bisect(ids: &[i32], probs: &[f64], u: f64) -> Option<i32> {
    let idx = probs.partition_point(|&hi| hi <= u);
    if idx < ids.len() {
        Some(ids[idx])
    } else {
        None
    }
}

/// Samples tomorrow's air-travel destination for every agent into
/// `trav`: origin airport from the home unit, destination airport from the
/// origin's ladder, arrival unit from the destination's ladder, and a
/// uniform community of that unit.
pub fn set_air_travel<R: Rng + ?Sized>(
    store: &mut AgentStore,
    geom: &Geometry,
    grids: &CellGrids,
    flow: &AirTravelFlow,
    rng: &mut R,
) {
    debug!("computing air travel destinations");
    let n = store.len();
    for i in 0..n {
        store.people.trav[i] = Cell::NONE;
        let home = store.people.home[i];
        let unit = grids.unit[geom.linear(home)];
        debug_assert!(unit >= 0);
        let origin = flow.assigned_airport[unit as usize];
        let Some(dest_airport) = flow.dest_airport(origin as usize, rng) else {
            continue;
        };
        let Some(dest_unit) = flow.arrival_unit(dest_airport as usize, rng) else {
            continue;
        };
        let communities = &grids.unit_communities[dest_unit as usize];
        let linear = communities[rng.random_range(0..communities.len())];
        store.people.trav[i] = geom.cell_at(linear as usize);
    }
}

/// Flies each eligible agent to its sampled destination with its home
/// unit's outbound probability. No redistribute; the commute-phase
/// redistribute absorbs outbound travelers.
pub fn move_air_travel<R: Rng + ?Sized>(
    store: &mut AgentStore,
    geom: &Geometry,
    grids: &CellGrids,
    flow: &AirTravelFlow,
    rng: &mut R,
) {
    let n = store.len();
    for i in 0..n {
        if store.people.in_hospital(i)
            || store.people.traveling(i)
            || store.people.withdrawn[i]
            || store.is_dead(i)
            || !store.people.trav[i].is_set()
        {
            continue;
        }
        let unit = grids.unit[geom.linear(store.people.home[i])];
        if rng.random::<f64>() < flow.air_travel_prob[unit as usize] {
            let (x, y) = geom.cell_center(store.people.trav[i]);
            store.people.pos_x[i] = x;
            store.people.pos_y[i] = y;
            store.people.air_travel[i] = i as i32;
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

    fn two_unit_world() -> (Geometry, AgentStore, CellGrids) {
        let geom = Geometry::grid(4, 1);
        let mut pop = Population::new();
        pop.add_community(Cell::new(0, 0), 0, 0, 0);
        pop.add_community(Cell::new(1, 0), 0, 0, 0);
        pop.add_community(Cell::new(2, 0), 1, 0, 0);
        pop.add_community(Cell::new(3, 0), 1, 0, 0);
        for _ in 0..4 {
            pop.add_agent(AgentSeed {
                age_group: AgeGroup::A18to29,
                home: Cell::new(0, 0),
                ..AgentSeed::default()
            });
        }
        let (store, grids) = crate::population::build(&pop, &geom, 1, BinPolicy::Serial).unwrap();
        (geom, store, grids)
    }

    fn cross_flow() -> AirTravelFlow {
        // two airports; everyone at airport 0 flies to airport 1 and lands
        // in unit 1, and vice versa
        AirTravelFlow {
            assigned_airport: vec![0, 1],
            air_travel_prob: vec![1.0, 1.0],
            dest_airports: vec![1, 0],
            dest_airports_offset: vec![0, 1, 2],
            dest_airports_prob: vec![1.0, 1.0],
            arrival_units: vec![0, 1],
            arrival_units_offset: vec![0, 1, 2],
            arrival_units_prob: vec![1.0, 1.0],
        }
    }

    #[test]
    fn validation_accepts_good_tables() {
        let (_, _, grids) = two_unit_world();
        assert!(cross_flow().validate(&grids).is_ok());
    }

    #[test]
    fn validation_rejects_bad_ladder() {
        let (_, _, grids) = two_unit_world();
        let mut flow = cross_flow();
        flow.dest_airports_prob = vec![1.0, 0.4];
        flow.dest_airports = vec![1, 0];
        flow.dest_airports_offset = vec![0, 2, 2];
        assert!(flow.validate(&grids).is_err());
    }

    #[test]
    fn validation_rejects_unknown_airport() {
        let (_, _, grids) = two_unit_world();
        let mut flow = cross_flow();
        flow.assigned_airport = vec![0, 7];
        assert!(flow.validate(&grids).is_err());
    }

    #[test]
    fn validation_rejects_short_probability_table() {
        let (_, _, grids) = two_unit_world();
        let mut flow = cross_flow();
        flow.air_travel_prob = vec![1.0];
        assert!(flow.validate(&grids).is_err());
    }

    #[test]
    fn linear_and_bisect_agree() {
        let ids: Vec<i32> = (0..24).collect();
        let probs: Vec<f64> = (0..24).map(|k| (f64::from(k) + 1.0) / 30.0).collect();
        for step in 0..300 {
            let u = f64::from(step) / 300.0;
            assert_eq!(pick_linear(&ids, &probs, u), pick_bisect(&ids, &probs, u));
        }
        // residual mass beyond the ladder selects nothing
        assert_eq!(pick_linear(&ids, &probs, 0.95), None);
        assert_eq!(pick_bisect(&ids, &probs, 0.95), None);
    }

    #[test]
    fn round_trip_through_the_flow() {
        let (geom, mut store, grids) = two_unit_world();
        let flow = cross_flow();
        flow.validate(&grids).unwrap();
        let mut rng = SmallRng::seed_from_u64(41);

        set_air_travel(&mut store, &geom, &grids, &flow, &mut rng);
        for i in 0..store.len() {
            // all homes are in unit 0, so all destinations land in unit 1
            let trav = store.people.trav[i];
            assert!(trav.is_set());
            assert_eq!(grids.unit[geom.linear(trav)], 1);
        }

        move_air_travel(&mut store, &geom, &grids, &flow, &mut rng);
        for i in 0..store.len() {
            assert_eq!(store.people.air_travel[i], i as i32);
            let here = geom.cell_of(store.people.pos_x[i], store.people.pos_y[i]);
            assert_eq!(grids.unit[geom.linear(here)], 1);
        }

        crate::movement::return_air_travel(&mut store, &geom);
        for i in 0..store.len() {
            assert_eq!(store.people.air_travel[i], -1);
            let here = geom.cell_of(store.people.pos_x[i], store.people.pos_y[i]);
            assert_eq!(here, store.people.home[i]);
        }
        assert!(store.check(&geom).is_ok());
    }

    #[test]
    fn withdrawn_agents_stay_grounded() {
        let (geom, mut store, grids) = two_unit_world();
        let flow = cross_flow();
        let mut rng = SmallRng::seed_from_u64(43);
        set_air_travel(&mut store, &geom, &grids, &flow, &mut rng);
        store.people.withdrawn[0] = true;
        move_air_travel(&mut store, &geom, &grids, &flow, &mut rng);
        assert_eq!(store.people.air_travel[0], -1);
        assert_eq!(store.people.air_travel[1], 1);
    }
}
