//! The named-parameter table.
//!
//! # Permissive lookups
//!
//! A lookup for a name that is not in the table returns 0.0 and logs a
//! warning **once per distinct name**.  This preserves the permissive
//! behavior expected by utility specifications: they may emit terms whose
//! parameters are absent from a given parameter file, and those terms simply
//! contribute nothing.
//!
//! # Latent classes
//!
//! Class-specific values use the key `c<k>:<name>` (e.g. `c1:durWork`).
//! Lookups first try the class-prefixed key, then fall back to the shared
//! unprefixed name.  The class count itself comes from the `nClasses` row of
//! the parameter file (default 1 when absent).

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

// ── Param ─────────────────────────────────────────────────────────────────────

/// One named parameter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Param {
    pub value: f64,
    /// `true` if the estimation command may move this parameter.
    pub estimate: bool,
}

// ── ParamSet ──────────────────────────────────────────────────────────────────

/// The full parameter table for one model, shared read-only across workers.
///
/// A `BTreeMap` keeps `estimated_names()` deterministic without a sort.
#[derive(Debug, Default)]
pub struct ParamSet {
    params: BTreeMap<String, Param>,
    n_classes: usize,
    /// Names already warned about, so each missing name logs exactly once.
    missing: Mutex<HashSet<String>>,
}

impl ParamSet {
    pub fn new(params: BTreeMap<String, Param>, n_classes: usize) -> Self {
        Self {
            params,
            n_classes: n_classes.max(1),
            missing: Mutex::new(HashSet::new()),
        }
    }

    /// Number of latent classes (≥ 1).
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Resolve `name` for `class`: the class-prefixed key if present, else
    /// the shared key, else `None`.
    pub fn resolve(&self, class: usize, name: &str) -> Option<(String, Param)> {
        let prefixed = format!("c{class}:{name}");
        if let Some(p) = self.params.get(&prefixed) {
            return Some((prefixed, *p));
        }
        self.params.get(name).map(|p| (name.to_string(), *p))
    }

    /// Numeric value of `name` for `class`; 0.0 (with a one-time warning) if
    /// the parameter is absent.
    pub fn value(&self, class: usize, name: &str) -> f64 {
        match self.resolve(class, name) {
            Some((_, p)) => p.value,
            None => {
                self.warn_missing(name);
                0.0
            }
        }
    }

    /// Value of a shared (class-independent) parameter.
    pub fn shared_value(&self, name: &str) -> f64 {
        self.value(0, name)
    }

    /// Whether `name` exists in the table under any key.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// All keys flagged `estimate = true`, in deterministic (sorted) order.
    /// This ordering defines the layout of the θ vector during estimation.
    pub fn estimated_names(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|(_, p)| p.estimate)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Iterate over all `(name, param)` entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A copy of this table with the estimated parameters replaced by the
    /// entries of `theta`, in `estimated_names()` order.
    ///
    /// # Panics
    ///
    /// Panics if `theta.len()` differs from the number of estimated keys.
    pub fn with_estimates(&self, theta: &[f64]) -> ParamSet {
        let names = self.estimated_names();
        assert_eq!(names.len(), theta.len(), "theta length mismatch");
        let mut params = self.params.clone();
        for (name, &v) in names.iter().zip(theta) {
            if let Some(p) = params.get_mut(name) {
                p.value = v;
            }
        }
        ParamSet::new(params, self.n_classes)
    }

    fn warn_missing(&self, name: &str) {
        let mut seen = self.missing.lock().unwrap();
        if seen.insert(name.to_string()) {
            log::warn!("parameter '{name}' not in parameter file; using 0");
        }
    }
}

impl Clone for ParamSet {
    fn clone(&self) -> Self {
        // The warned-once set intentionally resets: a cloned table is a new
        // context (e.g. a perturbed estimation restart).
        ParamSet::new(self.params.clone(), self.n_classes)
    }
}

impl FromIterator<(String, Param)> for ParamSet {
    fn from_iter<T: IntoIterator<Item = (String, Param)>>(iter: T) -> Self {
        ParamSet::new(iter.into_iter().collect(), 1)
    }
}
