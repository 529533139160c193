//! Tree identity shared by strategies and assets.

use super::strategy::Strategy;

#[derive(Debug)]
pub struct Node {
    name: String,
    root: bool,
    children: Vec<Member>,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, root: bool) -> Self {
        Self {
            name: name.into(),
            root,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn children(&self) -> &[Member] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Member] {
        &mut self.children
    }

    pub(crate) fn push_child(&mut self, child: Member) {
        self.children.push(child);
    }

    /// Only used when a root is attached below another strategy.
    pub(crate) fn demote(&mut self) {
        self.root = false;
    }
}

/// A tradable symbol. Always a leaf, never a root.
#[derive(Debug)]
pub struct Asset {
    node: Node,
}

impl Asset {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            node: Node::new(symbol, false),
        }
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn is_root(&self) -> bool {
        self.node.is_root()
    }
}

/// A member of the strategy tree.
#[derive(Debug)]
pub enum Member {
    Strategy(Strategy),
    Asset(Asset),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Strategy(s) => s.name(),
            Member::Asset(a) => a.name(),
        }
    }

    pub fn as_strategy(&self) -> Option<&Strategy> {
        match self {
            Member::Strategy(s) => Some(s),
            Member::Asset(_) => None,
        }
    }

    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            Member::Asset(a) => Some(a),
            Member::Strategy(_) => None,
        }
    }
}

impl From<Strategy> for Member {
    fn from(s: Strategy) -> Self {
        Member::Strategy(s)
    }
}

impl From<Asset> for Member {
    fn from(a: Asset) -> Self {
        Member::Asset(a)
    }
}
