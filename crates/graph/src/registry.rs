//! Node registry - type strings to constructors and modality sets
//!
//! Unknown types in loaded config are not an error: they occupy a null slot
//! that emits no frames and is preserved across save/load.

use std::collections::HashMap;
use std::sync::Arc;

use thalamus_protocol::{Modality, ModalitySet};

use crate::node::{Node, NodeContext};
use crate::nodes;
use crate::Result;

/// Builds a node from its config subtree and services
pub type Constructor = Arc<dyn Fn(NodeContext) -> Result<Box<dyn Node>> + Send + Sync>;

/// One registered node type
#[derive(Clone)]
pub struct NodeTypeEntry {
    /// Human label reported by `get_type_name`
    pub label: String,
    /// Modalities every instance of this type declares
    pub modalities: ModalitySet,
    pub constructor: Constructor,
}

/// Maps `type` strings to node constructors
#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, NodeTypeEntry>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in node types
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            nodes::none::TYPE_TAG,
            "None",
            ModalitySet::EMPTY,
            Arc::new(|ctx| nodes::none::NoneNode::create(ctx)),
        );
        registry.register(
            nodes::wave::TYPE_TAG,
            "Wave Generator",
            ModalitySet::of(&[Modality::Analog]),
            Arc::new(|ctx| nodes::wave::WaveGeneratorNode::create(ctx)),
        );
        registry.register(
            nodes::analog::TYPE_TAG,
            "Analog",
            ModalitySet::of(&[Modality::Analog, Modality::Stim]),
            Arc::new(|ctx| nodes::analog::AnalogNode::create(ctx)),
        );
        registry
    }

    /// Register a node type
    pub fn register(
        &mut self,
        type_tag: impl Into<String>,
        label: impl Into<String>,
        modalities: ModalitySet,
        constructor: Constructor,
    ) {
        self.entries.insert(
            type_tag.into(),
            NodeTypeEntry {
                label: label.into(),
                modalities,
                constructor,
            },
        );
    }

    /// Look up a type
    pub fn get(&self, type_tag: &str) -> Option<&NodeTypeEntry> {
        self.entries.get(type_tag)
    }

    /// Human label for a type; `None` when the type is not compiled in
    pub fn type_name(&self, type_tag: &str) -> Option<&str> {
        self.entries.get(type_tag).map(|entry| entry.label.as_str())
    }

    /// Registered type tags
    pub fn type_tags(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
