//! Conversion warnings and the summary returned to callers.

use geo::Rect;
use thiserror::Error;

use crate::classify::{AciColor, Category, Lineweight};
use crate::geometry::{Placement, Primitive, ShapeKind};
use crate::osm::{ElementKind, ElementRef, OsmId};
use crate::plan::{PlanType, StyleMode};
use crate::projection::Crs;

/// A recoverable anomaly. The affected element is skipped and conversion
/// continues.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ConversionWarning {
    /// A node id appeared more than once; the later definition was kept.
    #[error("node {node} is defined more than once; keeping the last definition")]
    DuplicateNode {
        /// Repeated node id.
        node: OsmId,
    },
    /// A way referenced a node absent from the input and was dropped.
    #[error("way {way} references missing node {node}; way dropped")]
    UnresolvedNode {
        /// Dropped way.
        way: OsmId,
        /// First missing node.
        node: OsmId,
    },
    /// A way had fewer than two node references and was dropped.
    #[error("way {way} has {count} node reference(s); at least two are required")]
    TooFewNodes {
        /// Dropped way.
        way: OsmId,
        /// Number of references found.
        count: usize,
    },
    /// An element lacked or carried an invalid required attribute.
    #[error("skipping malformed {element}{}: {reason}", .id.map(|id| format!(" {id}")).unwrap_or_default())]
    MalformedElement {
        /// Element kind.
        element: ElementKind,
        /// Element id, when it could be read.
        id: Option<OsmId>,
        /// What was wrong.
        reason: String,
    },
    /// A node could not be projected into the target system.
    #[error("node {node} cannot be projected: {reason}")]
    Projection {
        /// Affected node.
        node: OsmId,
        /// Projection failure.
        reason: String,
    },
    /// A way referenced a node without a projected coordinate.
    #[error("way {way} references unprojectable node {node}; way dropped")]
    UnresolvableWay {
        /// Dropped way.
        way: OsmId,
        /// First unprojectable node.
        node: OsmId,
    },
    /// A relation member is not present in the input.
    #[error("relation {relation} member {member} is missing")]
    UnresolvedMember {
        /// Owning relation.
        relation: OsmId,
        /// Missing member.
        member: ElementRef,
    },
    /// A multipolygon's rings could not be assembled.
    #[error("multipolygon relation {relation} is malformed ({reason}); drawing member ways")]
    MalformedMultipolygon {
        /// Affected relation.
        relation: OsmId,
        /// Why assembly failed.
        reason: String,
    },
    /// Geometry collapsed below what its shape needs.
    #[error("{element} has degenerate geometry: {reason}")]
    DegenerateGeometry {
        /// Affected element.
        element: ElementRef,
        /// What collapsed.
        reason: String,
    },
}

impl ConversionWarning {
    /// Id of the way this warning dropped, if it dropped one.
    pub fn dropped_way(&self) -> Option<OsmId> {
        match self {
            Self::UnresolvedNode { way, .. }
            | Self::TooFewNodes { way, .. }
            | Self::UnresolvableWay { way, .. } => Some(*way),
            Self::MalformedElement {
                element: ElementKind::Way,
                id,
                ..
            } => *id,
            _ => None,
        }
    }
}

/// Per-layer summary in first-emission order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LayerSummary {
    /// Layer name.
    pub name: &'static str,
    /// Layer category.
    pub category: Category,
    /// Display colour.
    pub color: AciColor,
    /// RGB value of [`LayerSummary::color`].
    pub rgb: [u8; 3],
    /// Lineweight.
    pub lineweight: Lineweight,
    /// Distinct source elements drawn on the layer.
    pub features: usize,
    /// Entities written to the layer.
    pub entities: usize,
}

/// Entity counts by type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EntityCounts {
    /// Open polylines.
    pub polylines: usize,
    /// Closed polylines.
    pub polygons: usize,
    /// Points.
    pub points: usize,
    /// Text labels.
    pub labels: usize,
}

impl EntityCounts {
    /// Sum over all entity types.
    pub fn total(&self) -> usize {
        self.polylines + self.polygons + self.points + self.labels
    }

    fn record(&mut self, primitive: &Primitive) {
        match primitive {
            Primitive::Shape(shape) => match shape.kind() {
                ShapeKind::Polyline => self.polylines += 1,
                ShapeKind::Polygon => self.polygons += 1,
                ShapeKind::Point => self.points += 1,
            },
            Primitive::Label { .. } => self.labels += 1,
        }
    }
}

/// Summary of a finished conversion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConversionReport {
    /// Plan type.
    pub plan: PlanType,
    /// Resolved style mode.
    pub style: StyleMode,
    /// Plan scale denominator.
    pub scale_denominator: u32,
    /// Target coordinate reference system.
    pub crs: Crs,
    /// Nodes kept after parsing.
    pub nodes_parsed: usize,
    /// Ways kept after parsing.
    pub ways_parsed: usize,
    /// Relations kept after parsing.
    pub relations_parsed: usize,
    /// Ways dropped during parsing or geometry construction.
    pub ways_dropped: usize,
    /// Features classified.
    pub features_classified: usize,
    /// Features retained by the plan filter.
    pub features_retained: usize,
    /// Layers in first-emission order.
    pub layers: Vec<LayerSummary>,
    /// Entities written.
    pub entities: EntityCounts,
    /// Planar extents of the emitted entities.
    pub bounds: Option<Rect<f64>>,
    /// Every recoverable anomaly, in the order encountered.
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionReport {
    /// Start a report for a run with the given settings.
    pub fn new(plan: PlanType, style: StyleMode, crs: Crs) -> Self {
        Self {
            plan,
            style,
            scale_denominator: plan.scale_denominator(),
            crs,
            nodes_parsed: 0,
            ways_parsed: 0,
            relations_parsed: 0,
            ways_dropped: 0,
            features_classified: 0,
            features_retained: 0,
            layers: Vec::new(),
            entities: EntityCounts::default(),
            bounds: None,
            warnings: Vec::new(),
        }
    }

    /// Record the placements handed to the emitter.
    pub fn record_placements(&mut self, placements: &[Placement]) {
        self.layers = summarize_layers(placements);
        self.entities = EntityCounts::default();
        for placement in placements {
            self.entities.record(&placement.primitive);
        }
        self.bounds = crate::geometry::placement_bounds(placements);
    }

    /// Attach warnings and derive the dropped-way count from them.
    pub fn record_warnings(&mut self, warnings: Vec<ConversionWarning>) {
        let mut dropped: Vec<OsmId> = warnings
            .iter()
            .filter_map(ConversionWarning::dropped_way)
            .collect();
        dropped.sort_unstable();
        dropped.dedup();
        self.ways_dropped = dropped.len();
        self.warnings = warnings;
    }
}

/// Group placements by layer in first-emission order.
pub fn summarize_layers(placements: &[Placement]) -> Vec<LayerSummary> {
    let mut layers: Vec<(LayerSummary, Vec<ElementRef>)> = Vec::new();
    for placement in placements {
        let position = layers
            .iter()
            .position(|(layer, _)| layer.category == placement.category);
        let (layer, sources) = match position {
            Some(index) => &mut layers[index],
            None => {
                layers.push((
                    LayerSummary {
                        name: placement.category.layer_name(),
                        category: placement.category,
                        color: placement.color,
                        rgb: placement.color.rgb(),
                        lineweight: placement.lineweight,
                        features: 0,
                        entities: 0,
                    },
                    Vec::new(),
                ));
                let last = layers.len() - 1;
                &mut layers[last]
            }
        };
        layer.entities += 1;
        if !sources.contains(&placement.source) {
            sources.push(placement.source);
            layer.features += 1;
        }
    }
    layers.into_iter().map(|(layer, _)| layer).collect()
}
