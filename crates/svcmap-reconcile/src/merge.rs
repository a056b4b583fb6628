//! Attribute merging
//!
//! Attribute sets are combined as an explicit ordered list of layers. Later
//! layers win on key collisions. Updates finish by re-asserting the identity
//! keys from the desired state, whatever the layers contained.

use svcmap_types::{Attributes, IDENTITY_KEYS};

/// Ordered attribute layers, lowest precedence first
#[derive(Debug, Default)]
pub struct AttributeSources<'a> {
    layers: Vec<(&'static str, &'a Attributes)>,
}

impl<'a> AttributeSources<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer that overrides every layer added before it
    pub fn then(mut self, label: &'static str, attributes: &'a Attributes) -> Self {
        self.layers.push((label, attributes));
        self
    }

    /// Layer labels in precedence order
    pub fn labels(&self) -> Vec<&'static str> {
        self.layers.iter().map(|(label, _)| *label).collect()
    }

    pub fn combine(&self) -> Attributes {
        let mut merged = Attributes::new();
        for (_, layer) in &self.layers {
            merged.extend_from(layer);
        }
        merged
    }
}

/// Attributes for a fresh registration: caller overrides win
pub fn merge_for_register(desired: &Attributes, extra: &Attributes) -> Attributes {
    AttributeSources::new()
        .then("desired", desired)
        .then("extra", extra)
        .combine()
}

/// Attributes for updating an existing instance
///
/// `current`, then `desired`, then `extra`, followed by re-asserting the
/// identity keys from `desired`. Identity keys absent from `desired` are left
/// as the layers produced them.
pub fn merge_for_update(current: &Attributes, desired: &Attributes, extra: &Attributes) -> Attributes {
    let mut merged = AttributeSources::new()
        .then("current", current)
        .then("desired", desired)
        .then("extra", extra)
        .combine();
    reassert_identity(&mut merged, desired);
    merged
}

fn reassert_identity(merged: &mut Attributes, desired: &Attributes) {
    for key in IDENTITY_KEYS {
        if let Some(value) = desired.get(key) {
            merged.insert(key, value);
        }
    }
}
