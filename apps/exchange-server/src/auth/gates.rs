//! Authorization gates
//!
//! Named predicates over the authenticated principal. The configuration
//! lists the gates an exchange account must pass; names that were never
//! registered are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use crate::session::Principal;

type GateFn = Arc<dyn Fn(&Principal) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct GateRegistry {
    gates: HashMap<String, GateFn>,
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define<F>(&mut self, name: impl Into<String>, gate: F) -> &mut Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.gates.insert(name.into(), Arc::new(gate));
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    /// Whether a registered gate denies `principal`
    pub fn denies(&self, name: &str, principal: &Principal) -> bool {
        self.gates
            .get(name)
            .map(|gate| !gate(principal))
            .unwrap_or(false)
    }

    /// First of `names` that denies `principal`
    pub fn first_denial<'a>(&self, names: &'a [String], principal: &Principal) -> Option<&'a str> {
        names
            .iter()
            .find(|name| self.has(name) && self.denies(name, principal))
            .map(String::as_str)
    }
}

impl std::fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateRegistry")
            .field("gates", &self.gates.keys().collect::<Vec<_>>())
            .finish()
    }
}
