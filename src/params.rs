//! Flat key/value parameter surface.
//!
//! All engine parameters arrive through an [`Inputs`] table of dotted keys
//! (`agent.shelter_compliance`, `disease_flu.p_asymp`, ...). The table can be
//! loaded from a JSON document (nested objects are flattened into dotted
//! keys) or assembled programmatically. Queries record which keys were
//! consumed so that [`Inputs::warn_unrecognized`] can report keys nobody
//! asked for; unrecognized keys are ignored with a warning, never an error.

use crate::error::EpiError;
use log::warn;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Default, Debug)]
pub struct Inputs {
    values: BTreeMap<String, Value>,
    consumed: RefCell<BTreeSet<String>>,
}

impl Inputs {
    pub fn new() -> Inputs {
        Inputs::default()
    }

    /// Parses a JSON document into a parameter table. Objects nest; every
    /// leaf becomes one dotted key.
    pub fn from_json(text: &str) -> Result<Inputs, EpiError> {
        let value: Value = serde_json::from_str(text)?;
        Inputs::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Inputs, EpiError> {
        let Value::Object(map) = value else {
            return Err("parameter document must be a JSON object".into());
        };
        let mut inputs = Inputs::new();
        for (key, val) in map {
            flatten_into(&mut inputs.values, key, val);
        }
        Ok(inputs)
    }

    /// Sets one key, replacing any previous value.
    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn set_f64(&mut self, key: &str, value: f64) {
        self.set(key, Value::from(value));
    }

    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.set(key, Value::from(value));
    }

    pub fn set_str(&mut self, key: &str, value: &str) {
        self.set(key, Value::from(value));
    }

    pub fn set_f64_array(&mut self, key: &str, values: &[f64]) {
        self.set(key, Value::from(values.to_vec()));
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let value = self.values.get(key)?;
        self.consumed.borrow_mut().insert(key.to_string());
        Some(value)
    }

    /// Reads a float into `out` if the key is present. Returns whether the
    /// key was found; a present-but-mistyped value is a configuration error.
    pub fn query_f64(&self, key: &str, out: &mut f64) -> Result<bool, EpiError> {
        match self.lookup(key) {
            None => Ok(false),
            Some(value) => {
                *out = as_f64(key, value)?;
                Ok(true)
            }
        }
    }

    pub fn query_usize(&self, key: &str, out: &mut usize) -> Result<bool, EpiError> {
        match self.lookup(key) {
            None => Ok(false),
            Some(value) => {
                let n = value
                    .as_u64()
                    .ok_or_else(|| type_error(key, "a non-negative integer", value))?;
                *out = usize::try_from(n)
                    .map_err(|_| type_error(key, "a non-negative integer", value))?;
                Ok(true)
            }
        }
    }

    pub fn query_string(&self, key: &str, out: &mut String) -> Result<bool, EpiError> {
        match self.lookup(key) {
            None => Ok(false),
            Some(value) => {
                let s = value
                    .as_str()
                    .ok_or_else(|| type_error(key, "a string", value))?;
                *out = s.to_string();
                Ok(true)
            }
        }
    }

    /// Reads a fixed-length float array. The stored array length must match
    /// `out.len()` exactly.
    pub fn query_f64_array(&self, key: &str, out: &mut [f64]) -> Result<bool, EpiError> {
        match self.lookup(key) {
            None => Ok(false),
            Some(value) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| type_error(key, "an array", value))?;
                if items.len() != out.len() {
                    return Err(EpiError::EpiError(format!(
                        "parameter `{key}` expects {} entries, got {}",
                        out.len(),
                        items.len()
                    )));
                }
                for (slot, item) in out.iter_mut().zip(items) {
                    *slot = as_f64(key, item)?;
                }
                Ok(true)
            }
        }
    }

    pub fn query_i32_array(&self, key: &str, out: &mut [i32]) -> Result<bool, EpiError> {
        match self.lookup(key) {
            None => Ok(false),
            Some(value) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| type_error(key, "an array", value))?;
                if items.len() != out.len() {
                    return Err(EpiError::EpiError(format!(
                        "parameter `{key}` expects {} entries, got {}",
                        out.len(),
                        items.len()
                    )));
                }
                for (slot, item) in out.iter_mut().zip(items) {
                    let n = item
                        .as_i64()
                        .ok_or_else(|| type_error(key, "an integer array", item))?;
                    *slot = i32::try_from(n)
                        .map_err(|_| type_error(key, "an i32 array", item))?;
                }
                Ok(true)
            }
        }
    }

    /// Reads a `ROWS x COLS` float matrix stored as an array of arrays.
    pub fn query_f64_matrix<const ROWS: usize, const COLS: usize>(
        &self,
        key: &str,
        out: &mut [[f64; COLS]; ROWS],
    ) -> Result<bool, EpiError> {
        match self.lookup(key) {
            None => Ok(false),
            Some(value) => {
                let rows = value
                    .as_array()
                    .ok_or_else(|| type_error(key, "an array of arrays", value))?;
                if rows.len() != ROWS {
                    return Err(EpiError::EpiError(format!(
                        "parameter `{key}` expects {ROWS} rows, got {}",
                        rows.len()
                    )));
                }
                for (r, row) in rows.iter().enumerate() {
                    let items = row
                        .as_array()
                        .ok_or_else(|| type_error(key, "an array of arrays", row))?;
                    if items.len() != COLS {
                        return Err(EpiError::EpiError(format!(
                            "parameter `{key}` row {r} expects {COLS} entries, got {}",
                            items.len()
                        )));
                    }
                    for (slot, item) in out[r].iter_mut().zip(items) {
                        *slot = as_f64(key, item)?;
                    }
                }
                Ok(true)
            }
        }
    }

    /// Logs a warning for every key under one of `prefixes` that no query
    /// consumed. Returns the ignored keys for tests.
    pub fn warn_unrecognized(&self, prefixes: &[&str]) -> Vec<String> {
        let consumed = self.consumed.borrow();
        let mut ignored = Vec::new();
        for key in self.values.keys() {
            let owned = prefixes
                .iter()
                .any(|p| key == p || key.starts_with(&format!("{p}.")));
            if owned && !consumed.contains(key) {
                warn!("ignoring unrecognized parameter `{key}`");
                ignored.push(key.clone());
            }
        }
        ignored
    }
}

fn flatten_into(values: &mut BTreeMap<String, Value>, key: String, value: Value) {
    match value {
        Value::Object(map) => {
            for (sub, val) in map {
                flatten_into(values, format!("{key}.{sub}"), val);
            }
        }
        other => {
            values.insert(key, other);
        }
    }
}

fn as_f64(key: &str, value: &Value) -> Result<f64, EpiError> {
    value
        .as_f64()
        .ok_or_else(|| type_error(key, "a number", value))
}

fn type_error(key: &str, expected: &str, value: &Value) -> EpiError {
    EpiError::EpiError(format!(
        "parameter `{key}` expects {expected}, got `{value}`"
    ))
}
