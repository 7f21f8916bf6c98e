//! Per-disease parameters: transmission coefficients, clinical period
//! distributions, and the hospitalization branching probabilities.

use crate::agent::{AgeGroup, HospAgeGroup, SchoolType};
use crate::error::EpiError;
use crate::params::Inputs;
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};

/// How initial cases for a disease are chosen.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CaseType {
    /// Seed uniformly at random across the population.
    Random,
    /// Seed from an external case file (parsed by the driver's loader).
    File,
}

/// Outcome of the hospitalization branch at symptom onset.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HospitalCourse {
    /// Total treatment days, offset-encoded for ICU/ventilator phases.
    pub days: f64,
    pub icu: bool,
    pub ventilator: bool,
}

/// Parameters of one disease.
///
/// Transmission probabilities are indexed by the age group of the receiver;
/// the `hh`/`nc` (household / neighborhood-cluster) pairs additionally split
/// on whether the transmitter is an adult or a child. School probabilities
/// are indexed by [`SchoolType`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiseaseParm {
    pub name: String,

    pub initial_case_type: CaseType,
    pub num_initial_cases: usize,
    pub case_filename: Option<String>,

    /// community transmission, both home and work
    pub xmit_comm: [f64; AgeGroup::COUNT],
    /// neighborhood transmission, both home and work
    pub xmit_hood: [f64; AgeGroup::COUNT],
    /// within household, adult transmitter
    pub xmit_hh_adult: [f64; AgeGroup::COUNT],
    /// within household, child transmitter
    pub xmit_hh_child: [f64; AgeGroup::COUNT],
    /// neighborhood cluster, adult transmitter
    pub xmit_nc_adult: [f64; AgeGroup::COUNT],
    /// neighborhood cluster, child transmitter
    pub xmit_nc_child: [f64; AgeGroup::COUNT],
    /// school, child-to-child (and adult-to-adult) by school type
    pub xmit_school: [f64; SchoolType::COUNT],
    /// school, adult transmitter to child receiver
    pub xmit_school_a2c: [f64; SchoolType::COUNT],
    /// school, child transmitter to adult receiver
    pub xmit_school_c2a: [f64; SchoolType::COUNT],
    /// within a workgroup, independent of age group
    pub xmit_work: f64,

    /// probability of transmission given contact
    pub p_trans: f64,
    /// fraction of cases that are asymptomatic
    pub p_asymp: f64,
    /// relative infectiousness of asymptomatic individuals
    pub asymp_relative_inf: f64,
    /// vaccine efficacy
    pub vac_eff: f64,

    pub immune_length_alpha: f64,
    pub immune_length_beta: f64,
    pub latent_length_alpha: f64,
    pub latent_length_beta: f64,
    pub infectious_length_alpha: f64,
    pub infectious_length_beta: f64,
    pub incubation_length_alpha: f64,
    pub incubation_length_beta: f64,

    /// Hospitalization days by [`HospAgeGroup`] (note: not [`AgeGroup`]).
    pub t_hosp: [f64; HospAgeGroup::COUNT],
    /// Spacing that encodes the ICU and ventilator phases inside the single
    /// treatment timer; must exceed the maximum of `t_hosp`.
    pub t_hosp_offset: f64,

    /// sick -> hospital probabilities by age group
    pub chr: [f64; AgeGroup::COUNT],
    /// hospital -> ICU probabilities by age group
    pub cic: [f64; AgeGroup::COUNT],
    /// ICU -> ventilator probabilities by age group
    pub cve: [f64; AgeGroup::COUNT],
    /// In-hospital death probabilities by exit event (hospital, ICU,
    /// ventilator) and age group.
    pub hosp_to_death: [[f64; AgeGroup::COUNT]; HospAgeGroup::COUNT],
}

impl DiseaseParm {
    pub fn new(name: &str) -> DiseaseParm {
        DiseaseParm {
            name: name.to_string(),
            initial_case_type: CaseType::Random,
            num_initial_cases: 0,
            case_filename: None,
            xmit_comm: [
                0.000018125, 0.000054375, 0.000145, 0.000145, 0.000145, 0.0002175,
            ],
            xmit_hood: [0.0000725, 0.0002175, 0.00058, 0.00058, 0.00058, 0.00087],
            xmit_hh_adult: [0.3, 0.3, 0.4, 0.4, 0.4, 0.4],
            xmit_hh_child: [0.6, 0.6, 0.3, 0.3, 0.3, 0.3],
            xmit_nc_adult: [0.04, 0.04, 0.05, 0.05, 0.05, 0.05],
            xmit_nc_child: [0.075, 0.075, 0.04, 0.04, 0.04, 0.04],
            xmit_school: [0.0, 0.0315, 0.0315, 0.0375, 0.0435, 0.15],
            xmit_school_a2c: [0.0, 0.0315, 0.0315, 0.0375, 0.0435, 0.15],
            xmit_school_c2a: [0.0, 0.0315, 0.0315, 0.0375, 0.0435, 0.15],
            xmit_work: 0.0575,
            p_trans: 0.20,
            p_asymp: 0.40,
            asymp_relative_inf: 0.75,
            vac_eff: 0.0,
            immune_length_alpha: 9.0,
            immune_length_beta: 20.0,
            latent_length_alpha: 9.0,
            latent_length_beta: 0.33,
            infectious_length_alpha: 36.0,
            infectious_length_beta: 0.17,
            incubation_length_alpha: 25.0,
            incubation_length_beta: 0.2,
            t_hosp: [3.0, 8.0, 7.0],
            t_hosp_offset: 10.0,
            chr: [0.0104, 0.0104, 0.070, 0.28, 0.28, 1.0],
            cic: [0.24, 0.24, 0.24, 0.36, 0.36, 0.35],
            cve: [0.12, 0.12, 0.12, 0.22, 0.22, 0.22],
            hosp_to_death: [
                [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0, 0.0, 0.26],
                [0.20, 0.20, 0.20, 0.45, 0.45, 1.0],
            ],
        }
    }

    /// Reads every recognized key under `prefix` (e.g. `disease` or
    /// `disease_flu`), leaving absent keys at their current values. Called
    /// twice per disease: once for the shared prefix, once for the
    /// disease-specific one, so later reads win.
    pub fn read_inputs(&mut self, inputs: &Inputs, prefix: &str) -> Result<(), EpiError> {
        let key = |name: &str| format!("{prefix}.{name}");

        inputs.query_f64_array(&key("xmit_comm"), &mut self.xmit_comm)?;
        inputs.query_f64_array(&key("xmit_hood"), &mut self.xmit_hood)?;
        inputs.query_f64_array(&key("xmit_hh_adult"), &mut self.xmit_hh_adult)?;
        inputs.query_f64_array(&key("xmit_hh_child"), &mut self.xmit_hh_child)?;
        inputs.query_f64_array(&key("xmit_nc_adult"), &mut self.xmit_nc_adult)?;
        inputs.query_f64_array(&key("xmit_nc_child"), &mut self.xmit_nc_child)?;
        inputs.query_f64_array(&key("xmit_school"), &mut self.xmit_school)?;
        inputs.query_f64_array(&key("xmit_school_a2c"), &mut self.xmit_school_a2c)?;
        inputs.query_f64_array(&key("xmit_school_c2a"), &mut self.xmit_school_c2a)?;
        inputs.query_f64(&key("xmit_work"), &mut self.xmit_work)?;

        inputs.query_f64(&key("p_trans"), &mut self.p_trans)?;
        inputs.query_f64(&key("p_asymp"), &mut self.p_asymp)?;
        inputs.query_f64(&key("asymp_relative_inf"), &mut self.asymp_relative_inf)?;
        inputs.query_f64(&key("vac_eff"), &mut self.vac_eff)?;

        inputs.query_f64(&key("immune_length_alpha"), &mut self.immune_length_alpha)?;
        inputs.query_f64(&key("immune_length_beta"), &mut self.immune_length_beta)?;
        inputs.query_f64(&key("latent_length_alpha"), &mut self.latent_length_alpha)?;
        inputs.query_f64(&key("latent_length_beta"), &mut self.latent_length_beta)?;
        inputs.query_f64(
            &key("infectious_length_alpha"),
            &mut self.infectious_length_alpha,
        )?;
        inputs.query_f64(
            &key("infectious_length_beta"),
            &mut self.infectious_length_beta,
        )?;
        inputs.query_f64(
            &key("incubation_length_alpha"),
            &mut self.incubation_length_alpha,
        )?;
        inputs.query_f64(
            &key("incubation_length_beta"),
            &mut self.incubation_length_beta,
        )?;

        let read_t_hosp = inputs.query_f64_array(&key("m_t_hosp"), &mut self.t_hosp)?;
        let explicit_offset = inputs.query_f64(&key("m_t_hosp_offset"), &mut self.t_hosp_offset)?;
        if read_t_hosp && !explicit_offset {
            // The offset separates the hospital/ICU/ventilator segments of
            // the treatment timer and must stay above every stay length.
            let longest = self.t_hosp.iter().cloned().fold(0.0_f64, f64::max);
            self.t_hosp_offset = (longest.ceil() + 1.0).max(10.0);
        }

        inputs.query_f64_array(&key("m_CHR"), &mut self.chr)?;
        inputs.query_f64_array(&key("m_CIC"), &mut self.cic)?;
        inputs.query_f64_array(&key("m_CVE"), &mut self.cve)?;
        inputs.query_f64_matrix(&key("m_hospToDeath"), &mut self.hosp_to_death)?;

        inputs.query_usize(&key("num_initial_cases"), &mut self.num_initial_cases)?;

        let mut case_type = String::new();
        if inputs.query_string(&key("initial_case_type"), &mut case_type)? {
            self.initial_case_type = match case_type.as_str() {
                "random" => CaseType::Random,
                "file" => CaseType::File,
                other => {
                    return Err(EpiError::EpiError(format!(
                        "`{}` must be `random` or `file`, got `{other}`",
                        key("initial_case_type")
                    )))
                }
            };
        }
        let mut filename = String::new();
        if inputs.query_string(&key("case_filename"), &mut filename)? {
            self.case_filename = Some(filename);
        }

        self.validate()
    }

    fn validate(&self) -> Result<(), EpiError> {
        for (what, value) in [
            ("p_trans", self.p_trans),
            ("p_asymp", self.p_asymp),
            ("vac_eff", self.vac_eff),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EpiError::EpiError(format!(
                    "disease `{}`: {what} must be in [0, 1], got {value}",
                    self.name
                )));
            }
        }
        let longest = self.t_hosp.iter().cloned().fold(0.0_f64, f64::max);
        if self.t_hosp_offset <= longest {
            return Err(EpiError::EpiError(format!(
                "disease `{}`: m_t_hosp_offset ({}) must exceed the longest \
                 hospital stay ({longest})",
                self.name, self.t_hosp_offset
            )));
        }
        Ok(())
    }

    /// Given an age group, decide if the agent is hospitalized; if so,
    /// compute the number of hospitalization days and check if moved on to
    /// ICU and ventilator.
    pub fn check_hospitalization<R: Rng + ?Sized>(
        &self,
        age_group: AgeGroup,
        rng: &mut R,
    ) -> HospitalCourse {
        let mut course = HospitalCourse {
            days: 0.0,
            icu: false,
            ventilator: false,
        };
        if rng.random::<f64>() < self.chr[age_group.index()] {
            course.days = self.t_hosp[age_group.hosp_group().index()];
            if rng.random::<f64>() < self.cic[age_group.index()] {
                course.days += self.t_hosp_offset;
                course.icu = true;
                if rng.random::<f64>() < self.cve[age_group.index()] {
                    course.days += self.t_hosp_offset;
                    course.ventilator = true;
                }
            }
        }
        course
    }

    /// Samples the latent, infectious, and incubation periods for a fresh
    /// infection. Negative draws clamp to zero and the incubation period is
    /// capped at the end of the infectious course.
    pub fn sample_periods<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64, f64) {
        let latent = sample_gamma(self.latent_length_alpha, self.latent_length_beta, rng).max(0.0);
        let infectious = sample_gamma(
            self.infectious_length_alpha,
            self.infectious_length_beta,
            rng,
        )
        .max(0.0);
        let mut incubation = sample_gamma(
            self.incubation_length_alpha,
            self.incubation_length_beta,
            rng,
        )
        .max(0.0);
        if incubation > latent + infectious {
            incubation = (latent + infectious).floor();
        }
        (latent, infectious, incubation)
    }

    /// Samples the length of post-recovery immunity.
    pub fn sample_immune_period<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        sample_gamma(self.immune_length_alpha, self.immune_length_beta, rng).max(0.0)
    }
}

/// Γ(alpha, beta) draw with beta as the scale parameter. Degenerate
/// parameters yield 0 instead of an error; the clinical timers treat that as
/// an instantaneous phase.
pub fn sample_gamma<R: Rng + ?Sized>(alpha: f64, beta: f64, rng: &mut R) -> f64 {
    if alpha <= 0.0 || beta <= 0.0 {
        return 0.0;
    }
    match Gamma::new(alpha, beta) {
        Ok(gamma) => gamma.sample(rng),
        Err(_) => 0.0,
    }
}
