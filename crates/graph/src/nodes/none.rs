//! The null node: a placeholder that declares nothing and emits nothing

use async_trait::async_trait;

use crate::node::{Node, NodeContext};
use crate::Result;

/// Type tag in node configs
pub const TYPE_TAG: &str = "NONE";

/// A node with no modalities and no behavior
pub struct NoneNode;

impl NoneNode {
    /// Constructor for the registry
    pub fn create(_ctx: NodeContext) -> Result<Box<dyn Node>> {
        Ok(Box::new(NoneNode))
    }
}

#[async_trait]
impl Node for NoneNode {
    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
