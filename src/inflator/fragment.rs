//! Retained record of the objects an inflation produced
//!
//! Re-inflating the same host walks the template again with the previous
//! [`Fragment`] at hand. A child whose template position and type match an
//! entry is reused in place; anything left over afterwards is detached.

use indexmap::IndexMap;

use crate::host::ObjectId;

/// One inflated node and its inflated children
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    object: ObjectId,
    /// Keyed by the child's position among the template node's children,
    /// vetoed children included
    children: IndexMap<usize, Fragment>,
}

impl Fragment {
    pub fn new(object: ObjectId) -> Self {
        Self {
            object,
            children: IndexMap::new(),
        }
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Child created for the template child at `position`
    pub fn child(&self, position: usize) -> Option<&Fragment> {
        self.children.get(&position)
    }

    /// Inflated children in host order
    pub fn children(&self) -> impl Iterator<Item = &Fragment> {
        self.children.values()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (usize, &Fragment)> {
        self.children.iter().map(|(position, child)| (*position, child))
    }

    pub(crate) fn insert(&mut self, position: usize, child: Fragment) {
        self.children.insert(position, child);
    }

    /// Total number of objects below this one
    pub fn descendants(&self) -> usize {
        self.children.values().map(|c| 1 + c.descendants()).sum()
    }
}
