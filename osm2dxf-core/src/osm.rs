//! OpenStreetMap primitives held in memory for a single conversion.
//!
//! Nodes, ways and relations are immutable once parsed. Ways and relations
//! refer to their members by identifier; nothing here owns another element.

use std::collections::{BTreeMap, HashMap};

use geo::Coord;

/// OpenStreetMap element identifier.
///
/// Identifiers are signed because editors such as JOSM use negative ids for
/// elements that have not been uploaded yet.
pub type OsmId = i64;

/// Free-form key/value tags.
///
/// A `BTreeMap` keeps iteration order stable, which in turn keeps output
/// deterministic.
pub type Tags = BTreeMap<String, String>;

/// Reference to an element of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "id", rename_all = "lowercase"))]
pub enum ElementRef {
    /// A node.
    Node(OsmId),
    /// A way.
    Way(OsmId),
    /// A relation.
    Relation(OsmId),
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node {id}"),
            Self::Way(id) => write!(f, "way {id}"),
            Self::Relation(id) => write!(f, "relation {id}"),
        }
    }
}

/// A tagged geodetic position.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osm2dxf_core::{Node, Tags};
///
/// let node = Node::new(7, Coord { x: 13.4, y: 52.5 }, Tags::new());
/// assert_eq!(node.lat(), 52.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Element identifier.
    pub id: OsmId,
    /// Longitude/latitude in degrees.
    pub location: Coord<f64>,
    /// Node tags. Most nodes are untagged way vertices.
    pub tags: Tags,
}

impl Node {
    /// Construct a node.
    pub fn new(id: OsmId, location: Coord<f64>, tags: Tags) -> Self {
        Self { id, location, tags }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.location.x
    }
}

/// An ordered path through nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// Element identifier.
    pub id: OsmId,
    /// Node references in path order.
    pub node_refs: Vec<OsmId>,
    /// Way tags.
    pub tags: Tags,
}

impl Way {
    /// Construct a way.
    pub fn new(id: OsmId, node_refs: Vec<OsmId>, tags: Tags) -> Self {
        Self {
            id,
            node_refs,
            tags,
        }
    }

    /// Whether the first and last node references are identical.
    ///
    /// This is the only signal used to decide polygon treatment of a way.
    ///
    /// # Examples
    /// ```
    /// use osm2dxf_core::{Tags, Way};
    ///
    /// assert!(Way::new(1, vec![1, 2, 3, 1], Tags::new()).is_closed());
    /// assert!(!Way::new(2, vec![1, 2, 3], Tags::new()).is_closed());
    /// ```
    pub fn is_closed(&self) -> bool {
        self.node_refs.len() > 2 && self.node_refs.first() == self.node_refs.last()
    }
}

/// Kind of an OSM element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementKind {
    /// Node.
    Node,
    /// Way.
    Way,
    /// Relation.
    Relation,
}

impl ElementKind {
    /// Parse the `type` attribute used by OSM XML.
    pub fn from_osm(value: &str) -> Option<Self> {
        match value {
            "node" => Some(Self::Node),
            "way" => Some(Self::Way),
            "relation" => Some(Self::Relation),
            _ => None,
        }
    }

    /// Element name as used by OSM XML.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relation member with its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Member kind.
    pub kind: ElementKind,
    /// Member identifier.
    pub id: OsmId,
    /// Role, for example `outer` or `inner`.
    pub role: String,
}

/// A structured grouping of elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Element identifier.
    pub id: OsmId,
    /// Ordered members.
    pub members: Vec<Member>,
    /// Relation tags.
    pub tags: Tags,
}

impl Relation {
    /// Construct a relation.
    pub fn new(id: OsmId, members: Vec<Member>, tags: Tags) -> Self {
        Self { id, members, tags }
    }

    /// Whether the relation describes an area assembled from rings.
    ///
    /// Both `type=multipolygon` and `type=boundary` use outer/inner roles.
    pub fn is_multipolygon(&self) -> bool {
        matches!(
            self.tags.get("type").map(String::as_str),
            Some("multipolygon" | "boundary")
        )
    }
}

/// Node table preserving first-seen order with constant-time lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTable {
    nodes: Vec<Node>,
    index: HashMap<OsmId, usize>,
}

impl NodeTable {
    /// Insert a node, replacing any node with the same id in place.
    ///
    /// Returns `true` when an existing node was replaced.
    pub fn insert(&mut self, node: Node) -> bool {
        match self.index.get(&node.id).copied() {
            Some(position) => {
                if let Some(slot) = self.nodes.get_mut(position) {
                    *slot = node;
                }
                true
            }
            None => {
                self.index.insert(node.id, self.nodes.len());
                self.nodes.push(node);
                false
            }
        }
    }

    /// Look up a node by id.
    pub fn get(&self, id: OsmId) -> Option<&Node> {
        self.index.get(&id).and_then(|position| self.nodes.get(*position))
    }

    /// Whether a node with `id` exists.
    pub fn contains(&self, id: OsmId) -> bool {
        self.index.contains_key(&id)
    }

    /// Iterate over nodes in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<'a> IntoIterator for &'a NodeTable {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The in-memory graph produced by a parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsmData {
    /// All nodes by id, in source order.
    pub nodes: NodeTable,
    /// Ways in source order.
    pub ways: Vec<Way>,
    /// Relations in source order.
    pub relations: Vec<Relation>,
}

impl OsmData {
    /// Build an id lookup over the ways, used to resolve relation members.
    pub fn way_index(&self) -> HashMap<OsmId, &Way> {
        self.ways.iter().map(|way| (way.id, way)).collect()
    }
}
