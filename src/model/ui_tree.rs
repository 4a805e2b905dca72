use serde::{Deserialize, Serialize};

use crate::model::action::BoundingBox;

/// One node of the captured UI hierarchy.
///
/// The capture layer serializes the device's view tree to JSON; this is the
/// subset of attributes the engine cares about. Unknown attributes are
/// ignored on parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(default)]
    pub class: Option<String>,

    #[serde(default, rename = "resource-id")]
    pub resource_id: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default, rename = "content-desc")]
    pub content_desc: Option<String>,

    #[serde(default)]
    pub bounds: Option<BoundingBox>,

    #[serde(default)]
    pub clickable: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub editable: bool,

    #[serde(default)]
    pub password: bool,

    #[serde(default)]
    pub children: Vec<UiNode>,
}

fn default_true() -> bool {
    true
}

impl UiNode {
    /// Depth-first flattening, self first. Resolution strategies iterate
    /// this order, so document order decides ties.
    pub fn flatten(&self) -> Vec<&UiNode> {
        let mut out = Vec::new();
        self.walk(&mut out);
        out
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a UiNode>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }

    /// Count of nodes in the subtree, self included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UiNode::node_count).sum::<usize>()
    }
}

/// Screen dimensions in pixels, needed for coordinate clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
}
