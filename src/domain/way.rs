use std::collections::BTreeMap;

use super::classify::{FeatureClass, WayFlags};
use super::node::{NodeId, WayId};

/// Tag written in place of `bridge` when a bridge is too short to be modelled
pub const REPLACED_BRIDGE_KEY: &str = "replaced_bridge";

/// A linear feature: an ordered list of node references plus its classification
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: WayId,
    pub refs: Vec<NodeId>,
    /// Raw tags, kept for diagnostics
    pub tags: BTreeMap<String, String>,
    pub class: FeatureClass,
    pub flags: WayFlags,
}

impl Way {
    /// Build a way from tags, `None` if the tags describe no supported feature
    pub fn from_tags(id: WayId, refs: Vec<NodeId>, tags: BTreeMap<String, String>) -> Option<Self> {
        let class = FeatureClass::from_tags(&tags)?;
        let flags = WayFlags::from_tags(&tags);
        Some(Self {
            id,
            refs,
            tags,
            class,
            flags,
        })
    }

    /// A copy of this way's attributes with new id and refs
    pub fn derive(&self, id: WayId, refs: Vec<NodeId>) -> Self {
        Self {
            id,
            refs,
            tags: self.tags.clone(),
            class: self.class,
            flags: self.flags,
        }
    }

    pub fn first(&self) -> Option<NodeId> {
        self.refs.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.refs.last().copied()
    }

    pub fn is_closed(&self) -> bool {
        self.refs.len() > 2 && self.refs.first() == self.refs.last()
    }

    pub fn is_bridge(&self) -> bool {
        self.flags.bridge
    }

    /// Strip the bridge tag, leaving a marker so water clipping still skips the way
    pub fn demote_bridge(&mut self) {
        self.tags.remove("bridge");
        self.tags
            .insert(REPLACED_BRIDGE_KEY.to_string(), "yes".to_string());
        self.flags.bridge = false;
        self.flags.replaced_bridge = true;
    }

    /// Number of times `node` appears in the refs
    pub fn count_of(&self, node: NodeId) -> usize {
        self.refs.iter().filter(|&&r| r == node).count()
    }
}
