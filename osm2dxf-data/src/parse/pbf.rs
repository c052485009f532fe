//! OSM PBF backend built on `osmpbf`.
//!
//! Blobs are decoded sequentially with `for_each` so element order, and with
//! it the drawing, is identical from run to run.
use std::io::Read;

use osm2dxf_core::{ElementKind, Member};
use osmpbf::{Element, ElementReader, RelMemberType};

use super::graph::OsmGraphBuilder;
use super::tags::collect_tags;
use super::{GeodataSource, ParseError, ParsedGeodata};

/// Reads an OSM PBF container from a byte stream.
pub struct PbfSource<R: Read + Send> {
    reader: ElementReader<R>,
}

impl<R: Read + Send> PbfSource<R> {
    /// Wrap a byte stream.
    pub fn new(input: R) -> Self {
        Self {
            reader: ElementReader::new(input),
        }
    }
}

impl<R: Read + Send> GeodataSource for PbfSource<R> {
    fn read_geodata(self) -> Result<ParsedGeodata, ParseError> {
        let mut builder = OsmGraphBuilder::default();
        self.reader
            .for_each(|element| process_element(&mut builder, element))
            .map_err(|source| ParseError::Pbf { source })?;
        Ok(builder.finish())
    }
}

fn process_element(builder: &mut OsmGraphBuilder, element: Element<'_>) {
    match element {
        Element::Node(node) => {
            builder.add_node(node.id(), node.lon(), node.lat(), collect_tags(node.tags()));
        }
        Element::DenseNode(node) => {
            builder.add_node(node.id(), node.lon(), node.lat(), collect_tags(node.tags()));
        }
        Element::Way(way) => {
            builder.add_way(way.id(), way.refs().collect(), collect_tags(way.tags()));
        }
        Element::Relation(relation) => {
            let mut members = Vec::new();
            for member in relation.members() {
                let role = match member.role() {
                    Ok(role) => role.to_owned(),
                    Err(err) => {
                        builder.skip_malformed(
                            ElementKind::Relation,
                            Some(relation.id()),
                            format!("member {} has an undecodable role: {err}", member.member_id),
                        );
                        return;
                    }
                };
                members.push(Member {
                    kind: member_kind(&member.member_type),
                    id: member.member_id,
                    role,
                });
            }
            builder.add_relation(relation.id(), members, collect_tags(relation.tags()));
        }
    }
}

const fn member_kind(member_type: &RelMemberType) -> ElementKind {
    match member_type {
        RelMemberType::Node => ElementKind::Node,
        RelMemberType::Way => ElementKind::Way,
        RelMemberType::Relation => ElementKind::Relation,
    }
}
