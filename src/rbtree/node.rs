use core::fmt;

/// Index of a node slot in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(super) usize);

impl NodeId {
    pub(super) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LOW => f.write_str("LOW"),
            HIGH => f.write_str("HIGH"),
            NodeId(i) => write!(f, "#{i}"),
        }
    }
}

/// The sentinel before the first element. Its `parent` link caches the
/// minimum data node.
pub const LOW: NodeId = NodeId(0);
/// The sentinel after the last element, i.e. `end()`. Its `parent` link
/// caches the maximum data node.
pub const HIGH: NodeId = NodeId(1);
/// First slot available to data nodes.
pub const FIRST_DATA: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dir {
    Left,
    Right,
}

impl Dir {
    pub fn opposite(self) -> Self {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// The structural part of a node: parent back-reference and both children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Links {
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl Links {
    #[inline]
    pub fn child(&self, dir: Dir) -> Option<NodeId> {
        match dir {
            Dir::Left => self.left,
            Dir::Right => self.right,
        }
    }

    #[inline]
    pub fn set_child(&mut self, dir: Dir, child: Option<NodeId>) {
        match dir {
            Dir::Left => self.left = child,
            Dir::Right => self.right = child,
        }
    }
}

/// A tree node. Data nodes carry a payload; sentinels and vacant slots don't.
pub struct Node<K, V> {
    pub links: Links,
    pub color: Color,
    pub payload: Option<(K, V)>,
}

impl<K, V> Node<K, V> {
    /// New data nodes are always red.
    pub fn data(key: K, value: V) -> Self {
        Self {
            links: Links::default(),
            color: Color::Red,
            payload: Some((key, value)),
        }
    }

    pub fn sentinel() -> Self {
        Self {
            links: Links::default(),
            color: Color::Black,
            payload: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.payload.is_none()
    }

    pub fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    pub fn key(&self) -> Option<&K> {
        self.payload.as_ref().map(|(k, _)| k)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Node<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("links", &self.links)
            .field("color", &self.color)
            .field("payload", &self.payload)
            .finish()
    }
}
