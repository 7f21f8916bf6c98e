//! A spatial, multi-disease, agent-based epidemic simulation engine
//!
//! Epigrid simulates the daily life of a population of individual agents
//! distributed across a two-dimensional grid of geographic *communities*.
//! Agents cycle through daily phases (commute, day activities, evening,
//! night) and interact within their structured social groups (household,
//! family cluster, neighborhood, school, workplace, community), potentially
//! contracting and transmitting one or more diseases and progressing through
//! a stochastic clinical course that may include hospitalization, ICU
//! admission, ventilation, recovery, or death.
//!
//! The crate is the disease-dynamics core of a larger simulation stack:
//! * An external population loader (census or UrbanPop) describes the
//!   initial conditions through a [`Population`].
//! * A flat key/value parameter table ([`Inputs`]) tunes agent behavior and
//!   the per-disease clinical and transmission parameters.
//! * The [`EpiEngine`] owns the agents and advances the simulation one day
//!   per [`EpiEngine::step`], exposing per-disease totals, per-cell
//!   censuses, and cumulative hospitalization/ICU/ventilator/death grids.
//!
//! Simulation kernels are bulk-synchronous passes over structure-of-arrays
//! agent storage; a run is deterministic given its seed.

pub mod agent;
pub use agent::{AgeGroup, Cell, DiseaseStat, SchoolType, Status, SymptomPhase};

pub mod error;
pub use error::EpiError;

pub mod geometry;
pub use geometry::{Geometry, IcType};

pub mod params;
pub use params::Inputs;

pub mod disease;
pub use disease::{CaseType, DiseaseParm};

pub mod store;
pub use store::{AgentStore, BinPolicy};

pub mod population;
pub use population::{AgentSeed, CellGrids, CommunitySpec, Population};

pub mod movement;

pub mod travel;
pub use travel::AirTravelFlow;

pub mod interaction;
pub use interaction::{InteractionModel, InteractionName};

pub mod infection;

pub mod progression;

pub mod hospital;

pub mod stats;
pub use stats::{CellCensus, DiseaseStatsGrid, Totals};

pub mod report;
pub use report::TotalsReport;

pub mod engine;
pub use engine::{EngineOptions, EngineOptionsBuilder, EpiEngine};
