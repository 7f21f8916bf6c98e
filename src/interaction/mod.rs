//! The interaction models.
//!
//! Each model runs a three-phase skeleton over the agents of one disease:
//! bin by (community, group), count infectious agents per group, then fold
//! each susceptible agent's exposure into its `prob` accumulator as
//! `(1 - infect * xmit * scale)^n` per applicable group, where `infect`
//! discounts for vaccine efficacy and `n` is the group's infectious count.
//! The models compose multiplicatively: every model the day runs multiplies
//! into the same per-agent accumulator, and the infector converts
//! `1 - prob` into an infection draw at the end of the day.
//!
//! Counting infectious agents and exponentiating once per susceptible agent
//! is equivalent to the pairwise formulation but does linear work per model.

mod home;
mod home_nborhood;
mod school;
mod work;
mod work_nborhood;

pub use home::HomeModel;
pub use home_nborhood::HomeNborhoodModel;
pub use school::SchoolModel;
pub use work::WorkModel;
pub use work_nborhood::WorkNborhoodModel;

use crate::disease::DiseaseParm;
use crate::geometry::Geometry;
use crate::population::CellGrids;
use crate::store::{AgentStore, People};
use rustc_hash::FxHashMap;

/// Names of the interaction models a day can run.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum InteractionName {
    Home,
    Work,
    School,
    HomeNborhood,
    WorkNborhood,
}

/// Common contract of the five models. `d` indexes the disease whose
/// accumulator the pass updates.
pub trait InteractionModel {
    fn interact(
        &self,
        store: &mut AgentStore,
        geom: &Geometry,
        grids: &CellGrids,
        d: usize,
        parm: &DiseaseParm,
    );
}

/// The full model set, keyed by name.
pub fn default_models() -> FxHashMap<InteractionName, Box<dyn InteractionModel>> {
    let mut models: FxHashMap<InteractionName, Box<dyn InteractionModel>> = FxHashMap::default();
    models.insert(InteractionName::Home, Box::new(HomeModel));
    models.insert(InteractionName::Work, Box::new(WorkModel));
    models.insert(InteractionName::School, Box::new(SchoolModel));
    models.insert(InteractionName::HomeNborhood, Box::new(HomeNborhoodModel));
    models.insert(InteractionName::WorkNborhood, Box::new(WorkNborhoodModel));
    models
}

/// Dense community index of the cell an agent currently occupies.
/// Interactions only ever run with every agent inside a community cell.
#[inline]
pub(crate) fn community_of(people: &People, geom: &Geometry, grids: &CellGrids, i: usize) -> usize {
    let cell = geom.cell_of(people.pos_x[i], people.pos_y[i]);
    let community = grids.community[geom.linear(cell)];
    assert!(community >= 0, "agent {i} interacting outside any community");
    community as usize
}

/// One multiplicative exposure step: `n` infectious contacts, each passing
/// the disease with probability `infect * xmit * scale`.
#[inline]
pub(crate) fn fold_exposure(prob: &mut f64, infect: f64, xmit: f64, scale: f64, n: i32) {
    if n > 0 {
        *prob *= (1.0 - infect * xmit * scale).powi(n);
    }
}
