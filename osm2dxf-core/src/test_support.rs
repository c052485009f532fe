//! Test-only builders for in-memory OSM datasets.

use geo::Coord;

use crate::osm::{ElementKind, Member, Node, OsmData, OsmId, Relation, Tags, Way};

/// Collect `key=value` pairs into [`Tags`].
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// Fluent builder for [`OsmData`].
///
/// # Examples
/// ```
/// use osm2dxf_core::test_support::{OsmDataBuilder, tags};
///
/// let data = OsmDataBuilder::default()
///     .node(1, 13.40, 52.50, &[])
///     .node(2, 13.41, 52.50, &[])
///     .way(10, &[1, 2], &[("highway", "primary")])
///     .build();
/// assert_eq!(data.ways.len(), 1);
/// assert_eq!(data.nodes.len(), 2);
/// # let _ = tags(&[]);
/// ```
#[derive(Debug, Default)]
pub struct OsmDataBuilder {
    data: OsmData,
}

impl OsmDataBuilder {
    /// Add a node at longitude `lon`, latitude `lat`.
    pub fn node(mut self, id: OsmId, lon: f64, lat: f64, pairs: &[(&str, &str)]) -> Self {
        self.data
            .nodes
            .insert(Node::new(id, Coord { x: lon, y: lat }, tags(pairs)));
        self
    }

    /// Add a way.
    pub fn way(mut self, id: OsmId, refs: &[OsmId], pairs: &[(&str, &str)]) -> Self {
        self.data.ways.push(Way::new(id, refs.to_vec(), tags(pairs)));
        self
    }

    /// Add a relation whose members are all ways, given as `(id, role)`.
    pub fn way_relation(
        mut self,
        id: OsmId,
        members: &[(OsmId, &str)],
        pairs: &[(&str, &str)],
    ) -> Self {
        let members = members
            .iter()
            .map(|(member, role)| Member {
                kind: ElementKind::Way,
                id: *member,
                role: (*role).to_owned(),
            })
            .collect();
        self.data.relations.push(Relation::new(id, members, tags(pairs)));
        self
    }

    /// Finish the dataset.
    pub fn build(self) -> OsmData {
        self.data
    }
}
