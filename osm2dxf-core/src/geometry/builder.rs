use std::collections::HashMap;

use geo::Coord;

use super::multipolygon::{OpenRing, stitch_rings};
use super::{Placement, Primitive, ProjectedGeometry, ShapeKind};
use crate::osm::{ElementKind, ElementRef, OsmData, OsmId, Relation, Way};
use crate::plan::{FilteredPlan, RetainedFeature};
use crate::projection::ProjectedNodes;
use crate::report::ConversionWarning;

/// Turns retained features into drawable [`Placement`]s.
///
/// Shapes are resolved through the projected-coordinate table. A way with a
/// node that has no projected coordinate is dropped with a warning; nothing
/// in the dataset is modified.
#[derive(Debug)]
pub struct GeometryBuilder<'a> {
    projected: &'a ProjectedNodes,
    ways: HashMap<OsmId, &'a Way>,
    relations: HashMap<OsmId, &'a Relation>,
}

impl<'a> GeometryBuilder<'a> {
    /// Builder over `data` whose nodes were projected into `projected`.
    pub fn new(data: &'a OsmData, projected: &'a ProjectedNodes) -> Self {
        Self {
            projected,
            ways: data.way_index(),
            relations: data
                .relations
                .iter()
                .map(|relation| (relation.id, relation))
                .collect(),
        }
    }

    /// Build placements for every retained feature, in order.
    ///
    /// Each feature contributes its shapes (unless label-only) followed by
    /// its label, so entities of one feature stay together.
    pub fn build(
        &self,
        plan: &FilteredPlan<'_>,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Vec<Placement> {
        let mut placements = Vec::new();
        for retained in &plan.retained {
            let shapes = self.shapes(retained.feature.source, warnings);
            self.place(retained, shapes, &mut placements);
        }
        placements
    }

    fn place(
        &self,
        retained: &RetainedFeature<'_>,
        shapes: Vec<ProjectedGeometry>,
        placements: &mut Vec<Placement>,
    ) {
        let anchor = shapes.first().map(ProjectedGeometry::label_anchor);
        let placement = |primitive| Placement {
            source: retained.feature.source,
            category: retained.feature.category(),
            color: retained.display_color,
            lineweight: retained.feature.class.lineweight,
            primitive,
        };
        if retained.presentation.draws_shape() {
            placements.extend(shapes.into_iter().map(|shape| placement(Primitive::Shape(shape))));
        }
        if let (Some(text), Some(anchor)) = (retained.label, anchor) {
            placements.push(placement(Primitive::Label {
                text: text.to_owned(),
                anchor,
            }));
        }
    }

    fn shapes(
        &self,
        source: ElementRef,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Vec<ProjectedGeometry> {
        match source {
            // Unprojectable nodes were already reported by the projector.
            ElementRef::Node(id) => self
                .projected
                .get(id)
                .map(ProjectedGeometry::point)
                .into_iter()
                .collect(),
            ElementRef::Way(id) => self
                .ways
                .get(&id)
                .and_then(|way| self.way_shape(way, warnings))
                .into_iter()
                .collect(),
            ElementRef::Relation(id) => self
                .relations
                .get(&id)
                .map(|relation| self.multipolygon_shapes(relation, warnings))
                .unwrap_or_default(),
        }
    }

    fn resolve_path(&self, refs: &[OsmId]) -> Result<Vec<Coord<f64>>, OsmId> {
        refs.iter()
            .map(|id| self.projected.get(*id).ok_or(*id))
            .collect()
    }

    fn way_shape(
        &self,
        way: &Way,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Option<ProjectedGeometry> {
        let path = match self.resolve_path(&way.node_refs) {
            Ok(path) => path,
            Err(node) => {
                warnings.push(ConversionWarning::UnresolvableWay { way: way.id, node });
                return None;
            }
        };
        let shape = ProjectedGeometry::from_path(path, way.is_closed())?;
        if shape.kind() == ShapeKind::Point {
            warnings.push(ConversionWarning::DegenerateGeometry {
                element: ElementRef::Way(way.id),
                reason: "all nodes coincide; drawn as a point".to_owned(),
            });
        }
        Some(shape)
    }

    fn multipolygon_shapes(
        &self,
        relation: &Relation,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Vec<ProjectedGeometry> {
        let mut outer = Vec::new();
        let mut inner = Vec::new();
        for member in &relation.members {
            if member.kind != ElementKind::Way {
                continue;
            }
            match self.ways.get(&member.id) {
                Some(way) if member.role == "inner" => inner.push(*way),
                Some(way) => outer.push(*way),
                None => warnings.push(ConversionWarning::UnresolvedMember {
                    relation: relation.id,
                    member: ElementRef::Way(member.id),
                }),
            }
        }

        match self.assemble_rings(&outer, &inner) {
            Ok(rings) => rings,
            Err(reason) => {
                warnings.push(ConversionWarning::MalformedMultipolygon {
                    relation: relation.id,
                    reason,
                });
                outer
                    .iter()
                    .chain(&inner)
                    .filter_map(|way| self.way_shape(way, warnings))
                    .collect()
            }
        }
    }

    /// Outer rings first, then inner rings, each as a closed polygon.
    fn assemble_rings(&self, outer: &[&Way], inner: &[&Way]) -> Result<Vec<ProjectedGeometry>, String> {
        if outer.is_empty() {
            return Err("no outer ring".to_owned());
        }
        let open = |OpenRing { start, end }: OpenRing| {
            format!("ring from node {start} stops at node {end}")
        };
        let outer_rings = stitch_rings(outer).map_err(open)?;
        let inner_rings = stitch_rings(inner).map_err(open)?;

        outer_rings
            .iter()
            .chain(&inner_rings)
            .map(|ring| {
                let path = self
                    .resolve_path(ring)
                    .map_err(|node| format!("ring node {node} has no projected coordinate"))?;
                ProjectedGeometry::from_path(path, true)
                    .filter(ProjectedGeometry::is_closed)
                    .ok_or_else(|| "ring has fewer than three distinct vertices".to_owned())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classifier, ClassifiedFeature};
    use crate::plan::{PlanFilter, PlanType, StyleMode};
    use crate::projection::{Crs, Projector};
    use crate::test_support::OsmDataBuilder;
    use rstest::{fixture, rstest};

    /// A 3x3 grid of nodes 0.001 degrees apart, ids 1..=9 row by row.
    #[fixture]
    fn grid() -> OsmDataBuilder {
        let mut builder = OsmDataBuilder::default();
        for row in 0..3_i64 {
            for col in 0..3_i64 {
                let id = row * 3 + col + 1;
                let (lon, lat) = (10.0 + col as f64 * 0.001, 50.0 + row as f64 * 0.001);
                builder = builder.node(id, lon, lat, &[]);
            }
        }
        builder
    }

    fn placements(data: &OsmData, plan: PlanType) -> (Vec<Placement>, Vec<ConversionWarning>) {
        let mut warnings = Vec::new();
        let projected = Projector::new(Crs::WebMercator).project_nodes(&data.nodes, &mut warnings);
        let features: Vec<ClassifiedFeature> = Classifier::default().classify_elements(data);
        let filtered = PlanFilter::new(plan, StyleMode::resolve(plan, None)).apply(&features);
        let placements = GeometryBuilder::new(data, &projected).build(&filtered, &mut warnings);
        (placements, warnings)
    }

    #[rstest]
    fn named_way_gets_shape_then_label(grid: OsmDataBuilder) {
        let data = grid
            .way(1, &[1, 2, 3], &[("highway", "primary"), ("name", "Ring Road")])
            .build();
        let (placements, warnings) = placements(&data, PlanType::Location);
        assert!(warnings.is_empty());
        assert_eq!(placements.len(), 2);
        assert!(matches!(placements[0].primitive, Primitive::Shape(_)));
        assert!(matches!(
            &placements[1].primitive,
            Primitive::Label { text, .. } if text == "Ring Road"
        ));
    }

    #[rstest]
    fn key_plan_label_only_features_draw_no_shape(grid: OsmDataBuilder) {
        let data = grid
            .way(1, &[1, 2, 3], &[("highway", "residential"), ("name", "Mill Lane")])
            .build();
        let (placements, _) = placements(&data, PlanType::Key);
        assert_eq!(placements.len(), 1);
        assert!(matches!(placements[0].primitive, Primitive::Label { .. }));
    }

    #[rstest]
    fn multipolygon_emits_outer_then_inner_rings(grid: OsmDataBuilder) {
        let data = grid
            .way(10, &[1, 3, 9, 7, 1], &[])
            .way(11, &[2, 6, 8], &[])
            .way(12, &[8, 4, 2], &[])
            .way_relation(
                20,
                &[(10, "outer"), (11, "inner"), (12, "inner")],
                &[("type", "multipolygon"), ("natural", "water")],
            )
            .build();
        let (placements, warnings) = placements(&data, PlanType::Location);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        let rings: Vec<usize> = placements
            .iter()
            .filter(|p| p.source == ElementRef::Relation(20))
            .filter_map(|p| match &p.primitive {
                Primitive::Shape(shape) if shape.is_closed() => Some(shape.points().len()),
                _ => None,
            })
            .collect();
        assert_eq!(rings, vec![5, 5]);
    }

    #[rstest]
    fn open_multipolygon_degrades_to_member_ways(grid: OsmDataBuilder) {
        let data = grid
            .way(10, &[1, 2, 3], &[])
            .way_relation(
                20,
                &[(10, "outer"), (99, "outer")],
                &[("type", "multipolygon"), ("landuse", "retail")],
            )
            .build();
        let (placements, warnings) = placements(&data, PlanType::Location);
        assert!(matches!(
            warnings.as_slice(),
            [
                ConversionWarning::UnresolvedMember { relation: 20, .. },
                ConversionWarning::MalformedMultipolygon { relation: 20, .. },
            ]
        ));
        let relation_shapes = placements
            .iter()
            .filter(|p| p.source == ElementRef::Relation(20))
            .count();
        assert_eq!(relation_shapes, 1);
    }

    #[rstest]
    fn unprojectable_node_drops_way(grid: OsmDataBuilder) {
        let data = grid
            .node(100, 10.0, 90.0, &[])
            .way(1, &[1, 100], &[("highway", "motorway")])
            .build();
        let (placements, warnings) = placements(&data, PlanType::Location);
        assert!(placements.is_empty());
        assert!(matches!(
            warnings.as_slice(),
            [
                ConversionWarning::Projection { node: 100, .. },
                ConversionWarning::UnresolvableWay { way: 1, node: 100 },
            ]
        ));
    }
}
