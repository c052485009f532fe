//! Property-based tests for the conversion model.
//!
//! # Invariants tested
//!
//! - **Round trip:** every supported projection inverts its forward mapping.
//! - **Totality:** every tag map receives exactly one category.
//! - **Monotonicity:** a Location Plan retains everything a Key Plan does.
//! - **Closure:** polygons are explicitly closed and polylines never are.

use geo::Coord;
use osm2dxf_core::projection::{Hemisphere, UtmZone};
use osm2dxf_core::{
    Category, Classifier, ClassifiedFeature, Crs, DEDUP_EPSILON, ElementRef, PlanFilter,
    PlanType, ProjectedGeometry, Projection, ShapeKind, StyleMode, Tags,
};
use proptest::prelude::*;

const ROUND_TRIP_TOLERANCE_DEG: f64 = 1.0e-6;

fn assert_round_trip(crs: Crs, geodetic: Coord<f64>) -> Result<(), TestCaseError> {
    let planar = crs
        .forward(geodetic)
        .map_err(|err| TestCaseError::fail(format!("forward failed: {err}")))?;
    let back = crs
        .inverse(planar)
        .map_err(|err| TestCaseError::fail(format!("inverse failed: {err}")))?;
    prop_assert!((back.x - geodetic.x).abs() < ROUND_TRIP_TOLERANCE_DEG, "lon {} -> {}", geodetic.x, back.x);
    prop_assert!((back.y - geodetic.y).abs() < ROUND_TRIP_TOLERANCE_DEG, "lat {} -> {}", geodetic.y, back.y);
    Ok(())
}

/// Keys and values that exercise every row of the default rule table.
fn tag_strategy() -> impl Strategy<Value = Tags> {
    let key = proptest::sample::select(vec![
        "highway", "building", "waterway", "natural", "water", "leisure", "landuse", "amenity",
        "name", "surface",
    ])
    .prop_map(str::to_owned);
    let value = prop_oneof![
        proptest::sample::select(vec![
            "motorway",
            "primary",
            "secondary",
            "residential",
            "path",
            "yes",
            "no",
            "water",
            "park",
            "forest",
            "coastline",
        ])
        .prop_map(str::to_owned),
        "[a-z]{1,8}",
    ];
    proptest::collection::btree_map(key, value, 0..5)
}

fn feature_strategy() -> impl Strategy<Value = ClassifiedFeature> {
    let source = prop_oneof![
        (1_i64..1000).prop_map(ElementRef::Node),
        (1_i64..1000).prop_map(ElementRef::Way),
        (1_i64..1000).prop_map(ElementRef::Relation),
    ];
    (source, tag_strategy()).prop_map(|(source, tags)| ClassifiedFeature {
        source,
        class: Classifier::default().classify(&tags),
        name: tags.get("name").cloned(),
    })
}

fn path_strategy() -> impl Strategy<Value = Vec<Coord<f64>>> {
    // A coarse grid makes repeated and coincident points likely.
    let coord = (0_i32..4, 0_i32..4).prop_map(|(x, y)| Coord {
        x: f64::from(x) * 10.0,
        y: f64::from(y) * 10.0,
    });
    let fresh = proptest::collection::vec(coord, 1..8);
    // Splice in earlier vertices so rings revisit places non-consecutively.
    (fresh, proptest::collection::vec(any::<proptest::sample::Index>(), 0..4)).prop_map(
        |(mut points, revisits)| {
            for index in revisits {
                let earlier = points[index.index(points.len())];
                points.push(earlier);
            }
            points
        },
    )
}

fn distinct_vertices(points: &[Coord<f64>]) -> usize {
    let mut seen: Vec<Coord<f64>> = Vec::new();
    for point in points {
        if !seen
            .iter()
            .any(|kept| (kept.x - point.x).hypot(kept.y - point.y) < DEDUP_EPSILON)
        {
            seen.push(*point);
        }
    }
    seen.len()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn web_mercator_round_trips(lon in -180.0_f64..=180.0, lat in -85.0_f64..85.0) {
        assert_round_trip(Crs::WebMercator, Coord { x: lon, y: lat })?;
    }

    #[test]
    fn world_mercator_round_trips(lon in -180.0_f64..=180.0, lat in -85.0_f64..85.0) {
        assert_round_trip(Crs::WorldMercator, Coord { x: lon, y: lat })?;
    }

    #[test]
    fn utm_round_trips_within_its_zone(
        number in 1_u8..=60,
        south in any::<bool>(),
        offset in -6.0_f64..6.0,
        lat in -80.0_f64..84.0,
    ) {
        let hemisphere = if south { Hemisphere::South } else { Hemisphere::North };
        let zone = UtmZone::new(number, hemisphere).expect("zone in range");
        let mut lon = zone.central_meridian() + offset;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        assert_round_trip(Crs::Utm(zone), Coord { x: lon, y: lat })?;
    }

    #[test]
    fn classification_is_total(tags in tag_strategy()) {
        let classifier = Classifier::default();
        let class = classifier.classify(&tags);
        prop_assert!(Category::ALL.contains(&class.category));
        let matched = classifier.rules().iter().find(|rule| rule.matcher.matches(&tags));
        match matched {
            Some(rule) => {
                prop_assert_eq!(rule.category, class.category);
            }
            None => {
                prop_assert_eq!(class.category, Category::Unclassified);
            }
        }
    }

    #[test]
    fn location_plan_retains_everything_key_plan_does(
        features in proptest::collection::vec(feature_strategy(), 0..20),
        colors in proptest::option::of(any::<bool>()),
    ) {
        let key = PlanFilter::new(PlanType::Key, StyleMode::resolve(PlanType::Key, colors));
        let location = PlanFilter::new(
            PlanType::Location,
            StyleMode::resolve(PlanType::Location, colors),
        );
        for feature in &features {
            if let Some(kept) = key.retain(feature) {
                let wider = location.retain(feature);
                prop_assert!(wider.is_some(), "{:?} dropped by location plan", feature.source);
                if kept.label.is_some() {
                    prop_assert_eq!(wider.and_then(|w| w.label), kept.label);
                }
            }
        }
    }

    #[test]
    fn shapes_respect_closure_invariants(path in path_strategy(), closed in any::<bool>()) {
        let shape = ProjectedGeometry::from_path(path, closed).expect("path is non-empty");
        let points = shape.points();
        let near = |a: Coord<f64>, b: Coord<f64>| (a.x - b.x).hypot(a.y - b.y) < DEDUP_EPSILON;
        match shape.kind() {
            ShapeKind::Polygon => {
                prop_assert!(points.len() >= 4);
                prop_assert_eq!(points.first(), points.last());
                prop_assert!(distinct_vertices(points) >= 3, "degenerate ring {points:?}");
            }
            ShapeKind::Polyline => {
                prop_assert!(points.len() >= 2);
                prop_assert!(!near(points[0], points[points.len() - 1]));
            }
            ShapeKind::Point => {
                prop_assert_eq!(points.len(), 1);
            }
        }
        for pair in points.windows(2) {
            prop_assert!(!near(pair[0], pair[1]), "consecutive duplicates survived");
        }
    }
}
