//! Relocation passes: commutes, random walk, random travel, and hospital
//! placement.
//!
//! Every pass that can move an agent across a cell boundary ends with a
//! `redistribute()`. The outbound random-travel pass intentionally does not:
//! the traveler keeps its destination position through the commute (commutes
//! skip active travelers), and the commute-phase redistribute absorbs it into
//! the destination cell's bin.

use crate::geometry::Geometry;
use crate::population::CellGrids;
use crate::store::AgentStore;
use rand::Rng;

/// Places every non-hospitalized, non-traveling, living agent at the center
/// of its work cell.
pub fn move_to_work(store: &mut AgentStore, geom: &Geometry) {
    let n = store.len();
    for i in 0..n {
        if store.people.in_hospital(i) || store.people.traveling(i) || store.is_dead(i) {
            continue;
        }
        let (x, y) = geom.cell_center(store.people.work[i]);
        store.people.pos_x[i] = x;
        store.people.pos_y[i] = y;
    }
    store.redistribute(geom);
}

/// Places every non-hospitalized, non-traveling, living agent at the center
/// of its home cell.
pub fn move_to_home(store: &mut AgentStore, geom: &Geometry) {
    let n = store.len();
    for i in 0..n {
        if store.people.in_hospital(i) || store.people.traveling(i) || store.is_dead(i) {
            continue;
        }
        let (x, y) = geom.cell_center(store.people.home[i]);
        store.people.pos_x[i] = x;
        store.people.pos_y[i] = y;
    }
    store.redistribute(geom);
}

/// Jitters every mobile agent by up to one cell width per axis. A
/// sensitivity-testing tool, not part of the daily loop.
pub fn move_random_walk<R: Rng + ?Sized>(store: &mut AgentStore, geom: &Geometry, rng: &mut R) {
    let (dx, dy) = geom.cell_size();
    let n = store.len();
    for i in 0..n {
        if store.people.in_hospital(i) || store.is_dead(i) {
            continue;
        }
        let x = store.people.pos_x[i] + (2.0 * rng.random::<f64>() - 1.0) * dx;
        let y = store.people.pos_y[i] + (2.0 * rng.random::<f64>() - 1.0) * dy;
        let (x, y) = geom.clamp_into_domain(x, y);
        store.people.pos_x[i] = x;
        store.people.pos_y[i] = y;
    }
    store.redistribute(geom);
}

/// Sends each eligible agent on a domestic trip with probability `prob`:
/// flags it and teleports it to a uniformly chosen community. No
/// redistribute here; see the module docs.
pub fn move_random_travel<R: Rng + ?Sized>(
    store: &mut AgentStore,
    geom: &Geometry,
    grids: &CellGrids,
    prob: f64,
    rng: &mut R,
) {
    if prob <= 0.0 || grids.community_cells.is_empty() {
        return;
    }
    let n = store.len();
    for i in 0..n {
        if store.people.in_hospital(i)
            || store.people.withdrawn[i]
            || store.people.traveling(i)
            || store.is_dead(i)
        {
            continue;
        }
        if rng.random::<f64>() < prob {
            store.people.random_travel[i] = i as i32;
            let pick = rng.random_range(0..grids.community_cells.len());
            let cell = geom.cell_at(grids.community_cells[pick] as usize);
            let (x, y) = geom.cell_center(cell);
            store.people.pos_x[i] = x;
            store.people.pos_y[i] = y;
        }
    }
}

/// Brings every random traveler home and clears its flag.
pub fn return_random_travel(store: &mut AgentStore, geom: &Geometry) {
    let n = store.len();
    for i in 0..n {
        if store.people.random_travel[i] >= 0 {
            store.people.random_travel[i] = -1;
            let (x, y) = geom.cell_center(store.people.home[i]);
            store.people.pos_x[i] = x;
            store.people.pos_y[i] = y;
        }
    }
    store.redistribute(geom);
}

/// Brings every air traveler home and clears its flag.
pub fn return_air_travel(store: &mut AgentStore, geom: &Geometry) {
    let n = store.len();
    for i in 0..n {
        if store.people.air_travel[i] >= 0 {
            store.people.air_travel[i] = -1;
            let (x, y) = geom.cell_center(store.people.home[i]);
            store.people.pos_x[i] = x;
            store.people.pos_y[i] = y;
        }
    }
    store.redistribute(geom);
}

/// Places every hospitalized agent at its hospital cell. Runs after the
/// status update assigns hospital cells for the day's admissions.
pub fn move_hospitalized(store: &mut AgentStore, geom: &Geometry) {
    let n = store.len();
    for i in 0..n {
        if store.people.in_hospital(i) {
            let (x, y) = geom.cell_center(store.people.hosp[i]);
            store.people.pos_x[i] = x;
            store.people.pos_y[i] = y;
        }
    }
    store.redistribute(geom);
}
