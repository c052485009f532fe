//! Planar shapes built from projected node coordinates.
//!
//! Every shape upholds its kind's invariant at construction: polygons are
//! explicitly closed rings of at least three distinct vertices, polylines
//! never end where they start, and points carry a single coordinate.

mod builder;
mod multipolygon;

use geo::{Centroid, Coord, LineString, Polygon, Rect};

pub use builder::GeometryBuilder;

use crate::classify::{AciColor, Category, Lineweight};
use crate::osm::ElementRef;

/// Consecutive points closer than this (in projected units) are merged.
pub const DEDUP_EPSILON: f64 = 1.0e-6;

/// Shape of a [`ProjectedGeometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ShapeKind {
    /// Open path.
    Polyline,
    /// Closed ring, first vertex repeated at the end.
    Polygon,
    /// Single coordinate.
    Point,
}

/// An ordered sequence of planar coordinates with a shape kind.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osm2dxf_core::{ProjectedGeometry, ShapeKind};
///
/// let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]
///     .map(|(x, y)| Coord { x, y });
/// let shape = ProjectedGeometry::from_path(square.to_vec(), true).expect("non-empty");
/// assert_eq!(shape.kind(), ShapeKind::Polygon);
/// assert_eq!(shape.points().len(), 5);
/// assert_eq!(shape.points().first(), shape.points().last());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedGeometry {
    kind: ShapeKind,
    points: Vec<Coord<f64>>,
}

impl ProjectedGeometry {
    /// Build a shape from a path of projected coordinates.
    ///
    /// Consecutive near-duplicates are dropped first. The path becomes a
    /// polygon when it was closed in the source or its endpoints coincide,
    /// and at least three pairwise-distinct vertices remain; a ring that only
    /// revisits two places stays a polyline. Returns `None` only for an empty
    /// path.
    pub fn from_path(path: Vec<Coord<f64>>, closed_in_source: bool) -> Option<Self> {
        let mut points = dedup_consecutive(path);
        let coincident =
            points.len() > 1 && points.first().zip(points.last()).is_some_and(|(a, b)| near(*a, *b));
        if coincident {
            points.pop();
        }
        let first = *points.first()?;
        if (closed_in_source || coincident) && has_three_distinct(&points) {
            points.push(first);
            return Some(Self {
                kind: ShapeKind::Polygon,
                points,
            });
        }
        if points.len() == 1 {
            return Some(Self::point(first));
        }
        Some(Self {
            kind: ShapeKind::Polyline,
            points,
        })
    }

    /// A single-coordinate shape.
    pub fn point(at: Coord<f64>) -> Self {
        Self {
            kind: ShapeKind::Point,
            points: vec![at],
        }
    }

    /// Shape kind.
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Vertices in drawing order. Polygons repeat the first vertex last.
    pub fn points(&self) -> &[Coord<f64>] {
        &self.points
    }

    /// Whether the shape is a closed ring.
    pub fn is_closed(&self) -> bool {
        self.kind == ShapeKind::Polygon
    }

    /// Where a label for this shape is anchored.
    ///
    /// Polygons use their centroid, polylines the point half-way along their
    /// length and points themselves.
    pub fn label_anchor(&self) -> Coord<f64> {
        let fallback = self.points.first().copied().unwrap_or_default();
        match self.kind {
            ShapeKind::Point => fallback,
            ShapeKind::Polygon => Polygon::new(LineString::from(self.points.clone()), Vec::new())
                .centroid()
                .map_or(fallback, |point| point.0),
            ShapeKind::Polyline => half_length_point(&self.points).unwrap_or(fallback),
        }
    }

    /// Axis-aligned extents.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        geo::BoundingRect::bounding_rect(&LineString::from(self.points.clone()))
    }
}

fn near(a: Coord<f64>, b: Coord<f64>) -> bool {
    (a.x - b.x).hypot(a.y - b.y) < DEDUP_EPSILON
}

/// Whether at least three vertices are pairwise further apart than
/// [`DEDUP_EPSILON`].
fn has_three_distinct(points: &[Coord<f64>]) -> bool {
    let Some(&a) = points.first() else {
        return false;
    };
    let Some(&b) = points.iter().find(|p| !near(a, **p)) else {
        return false;
    };
    points.iter().any(|p| !near(a, *p) && !near(b, *p))
}

fn dedup_consecutive(path: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    let mut kept: Vec<Coord<f64>> = Vec::with_capacity(path.len());
    for point in path {
        if kept.last().is_some_and(|last| near(*last, point)) {
            continue;
        }
        kept.push(point);
    }
    kept
}

fn half_length_point(points: &[Coord<f64>]) -> Option<Coord<f64>> {
    let lengths: Vec<f64> = points
        .windows(2)
        .map(|pair| (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y))
        .collect();
    let mut remaining = lengths.iter().sum::<f64>() / 2.0;
    for (pair, length) in points.windows(2).zip(lengths) {
        if remaining <= length && length > 0.0 {
            let t = remaining / length;
            return Some(Coord {
                x: pair[0].x + (pair[1].x - pair[0].x) * t,
                y: pair[0].y + (pair[1].y - pair[0].y) * t,
            });
        }
        remaining -= length;
    }
    points.last().copied()
}

/// What a placement draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// A shape.
    Shape(ProjectedGeometry),
    /// A text label.
    Label {
        /// Label text.
        text: String,
        /// Middle-centre alignment point.
        anchor: Coord<f64>,
    },
}

/// A primitive ready for emission, with its layer styling.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Element the primitive was derived from.
    pub source: ElementRef,
    /// Layer category.
    pub category: Category,
    /// Display colour.
    pub color: AciColor,
    /// Layer lineweight.
    pub lineweight: Lineweight,
    /// Shape or label.
    pub primitive: Primitive,
}

/// Extents covering every shape vertex and label anchor.
pub fn placement_bounds(placements: &[Placement]) -> Option<Rect<f64>> {
    let mut coords = placements
        .iter()
        .flat_map(|placement| match &placement.primitive {
            Primitive::Shape(shape) => shape.points().to_vec(),
            Primitive::Label { anchor, .. } => vec![*anchor],
        });
    let first = coords.next()?;
    let (min, max) = coords.fold((first, first), |(min, max), c| {
        (
            Coord {
                x: min.x.min(c.x),
                y: min.y.min(c.y),
            },
            Coord {
                x: max.x.max(c.x),
                y: max.y.max(c.y),
            },
        )
    });
    Some(Rect::new(min, max))
}
