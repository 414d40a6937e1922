// src/macros/context.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{Result, SoapCiError};
use crate::macros::expand::placeholder_names;

/// Configuration layers a [`MacroContext`] is assembled from.
///
/// Ordered from lowest to highest precedence: a name defined in a later layer
/// shadows the same name from an earlier one, whatever order the builder
/// received them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MacroLayer {
    Global,
    Repository,
    Branch,
    Reserved,
}

/// Immutable name table used to expand every command template of one branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroContext {
    values: BTreeMap<String, String>,
}

impl MacroContext {
    pub fn builder() -> MacroContextBuilder {
        MacroContextBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// All defined names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Precedence-ordered builder for [`MacroContext`].
#[derive(Debug, Clone, Default)]
pub struct MacroContextBuilder {
    layers: BTreeMap<MacroLayer, BTreeMap<String, String>>,
}

impl MacroContextBuilder {
    /// Define `name` in `layer`. Within one layer the last definition wins.
    pub fn define(
        mut self,
        layer: MacroLayer,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.layers
            .entry(layer)
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    /// Define every pair from `values` in `layer`.
    pub fn define_all<I, K, V>(mut self, layer: MacroLayer, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let slot = self.layers.entry(layer).or_default();
        for (k, v) in values {
            slot.insert(k.into(), v.into());
        }
        self
    }

    /// Merge the layers and reject definitions that reference each other in a
    /// cycle.
    pub fn build(self) -> Result<MacroContext> {
        let mut values = BTreeMap::new();
        for (layer, defs) in self.layers {
            debug!(?layer, count = defs.len(), "merging macro layer");
            values.extend(defs);
        }

        let ctx = MacroContext { values };
        check_acyclic(&ctx)?;
        Ok(ctx)
    }
}

fn check_acyclic(ctx: &MacroContext) -> Result<()> {
    // Edge direction: name -> name it references.
    // Undefined references are left alone here; they only matter (and fail)
    // if a template actually expands them.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for (name, value) in ctx.iter() {
        graph.add_node(name);
        for referenced in placeholder_names(value) {
            if let Some((key, _)) = ctx.values.get_key_value(referenced) {
                graph.add_edge(name, key.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SoapCiError::CyclicMacro(format!(
            "macro '{}' is part of a reference cycle",
            cycle.node_id()
        ))),
    }
}
