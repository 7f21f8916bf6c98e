//! CSV reporting of per-day disease totals.

use crate::error::EpiError;
use crate::stats::Totals;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Serialize, Debug)]
struct TotalsRow<'a> {
    day: u32,
    disease: &'a str,
    never: u64,
    infected: u64,
    immune: u64,
    susceptible: u64,
    dead: u64,
    exposed: u64,
    asymptomatic: u64,
    presymptomatic: u64,
    symptomatic: u64,
}

/// Writes one row per (day, disease) of global status totals.
pub struct TotalsReport<W: Write> {
    writer: csv::Writer<W>,
}

impl TotalsReport<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<TotalsReport<File>, EpiError> {
        let file = File::create(path)?;
        Ok(TotalsReport {
            writer: csv::Writer::from_writer(file),
        })
    }
}

impl<W: Write> TotalsReport<W> {
    pub fn from_writer(writer: W) -> TotalsReport<W> {
        TotalsReport {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn append(&mut self, day: u32, disease: &str, totals: &Totals) -> Result<(), EpiError> {
        self.writer.serialize(TotalsRow {
            day,
            disease,
            never: totals.never,
            infected: totals.infected,
            immune: totals.immune,
            susceptible: totals.susceptible,
            dead: totals.dead,
            exposed: totals.exposed,
            asymptomatic: totals.asymptomatic,
            presymptomatic: totals.presymptomatic,
            symptomatic: totals.symptomatic,
        })?;
        self.writer.flush()?;
        Ok(())
    }
}
