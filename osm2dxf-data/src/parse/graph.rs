//! Accumulates parsed elements into an [`OsmData`] graph.
//!
//! Both backends feed elements here in source order. Node coordinates must
//! be finite on arrival; range checks are left to the projector so ways
//! through an out-of-domain node are reported as unprojectable. Way
//! references are validated once every node is known, so files that list
//! ways before nodes still resolve.
use geo::{Coord, Rect};
use log::debug;
use osm2dxf_core::{
    ConversionWarning, ElementKind, Member, Node, OsmData, OsmId, Relation, Tags, Way,
};

use super::ParsedGeodata;

#[derive(Debug, Default)]
pub(super) struct OsmGraphBuilder {
    data: OsmData,
    warnings: Vec<ConversionWarning>,
    declared_bounds: Option<Rect<f64>>,
    extent: Option<Rect<f64>>,
}

impl OsmGraphBuilder {
    pub(super) fn add_node(&mut self, id: OsmId, lon: f64, lat: f64, tags: Tags) {
        let Some(location) = finite_coord(lon, lat) else {
            self.skip_malformed(
                ElementKind::Node,
                Some(id),
                format!("coordinate ({lon}, {lat}) is not a finite number"),
            );
            return;
        };
        if in_wgs84_range(location) {
            self.include(location);
        } else {
            debug!("node {id} at ({lon}, {lat}) lies outside the WGS84 range");
        }
        if self.data.nodes.insert(Node::new(id, location, tags)) {
            self.warnings.push(ConversionWarning::DuplicateNode { node: id });
        }
    }

    pub(super) fn add_way(&mut self, id: OsmId, node_refs: Vec<OsmId>, tags: Tags) {
        self.data.ways.push(Way::new(id, node_refs, tags));
    }

    pub(super) fn add_relation(&mut self, id: OsmId, members: Vec<Member>, tags: Tags) {
        self.data.relations.push(Relation::new(id, members, tags));
    }

    pub(super) fn skip_malformed(
        &mut self,
        element: ElementKind,
        id: Option<OsmId>,
        reason: impl Into<String>,
    ) {
        self.warnings.push(ConversionWarning::MalformedElement {
            element,
            id,
            reason: reason.into(),
        });
    }

    pub(super) fn declare_bounds(&mut self, bounds: Rect<f64>) {
        self.declared_bounds = Some(bounds);
    }

    fn include(&mut self, location: Coord<f64>) {
        self.extent = Some(match self.extent {
            Some(existing) => Rect::new(
                Coord {
                    x: existing.min().x.min(location.x),
                    y: existing.min().y.min(location.y),
                },
                Coord {
                    x: existing.max().x.max(location.x),
                    y: existing.max().y.max(location.y),
                },
            ),
            None => Rect::new(location, location),
        });
    }

    /// Drop ways that are too short or reference unknown nodes.
    fn validate_ways(&mut self) {
        let nodes = &self.data.nodes;
        let warnings = &mut self.warnings;
        self.data.ways.retain(|way| {
            if way.node_refs.len() < 2 {
                warnings.push(ConversionWarning::TooFewNodes {
                    way: way.id,
                    count: way.node_refs.len(),
                });
                return false;
            }
            match way.node_refs.iter().find(|id| !nodes.contains(**id)) {
                Some(missing) => {
                    debug!("way {} dropped: node {missing} not in input", way.id);
                    warnings.push(ConversionWarning::UnresolvedNode {
                        way: way.id,
                        node: *missing,
                    });
                    false
                }
                None => true,
            }
        });
    }

    pub(super) fn finish(mut self) -> ParsedGeodata {
        self.validate_ways();
        ParsedGeodata {
            data: self.data,
            bounds: self.declared_bounds.or(self.extent),
            warnings: self.warnings,
        }
    }
}

fn finite_coord(lon: f64, lat: f64) -> Option<Coord<f64>> {
    (lon.is_finite() && lat.is_finite()).then_some(Coord { x: lon, y: lat })
}

fn in_wgs84_range(location: Coord<f64>) -> bool {
    (-180.0..=180.0).contains(&location.x) && (-90.0..=90.0).contains(&location.y)
}
