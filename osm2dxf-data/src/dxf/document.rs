//! In-memory drawing assembled from placements.
use geo::{Coord, Rect};
use osm2dxf_core::geometry::placement_bounds;
use osm2dxf_core::report::summarize_layers;
use osm2dxf_core::{AciColor, Crs, Lineweight, Placement, PlanType, Primitive, ShapeKind};

/// Text height on paper, in millimetres.
pub const PAPER_TEXT_HEIGHT_MM: f64 = 2.5;

/// Drawing-wide settings written to the `HEADER` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingHeader {
    /// Plan type.
    pub plan: PlanType,
    /// Plan scale denominator.
    pub scale_denominator: u32,
    /// Coordinate reference system of the model space.
    pub crs: Crs,
    /// Extents of every entity, if any were emitted.
    pub extents: Option<Rect<f64>>,
}

impl DrawingHeader {
    /// Model-space metres per paper millimetre.
    pub fn scale_factor(&self) -> f64 {
        f64::from(self.scale_denominator) / 1000.0
    }

    /// Label height in model-space metres.
    pub fn text_height(&self) -> f64 {
        PAPER_TEXT_HEIGHT_MM * self.scale_factor()
    }
}

/// A layer table entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    /// Layer name.
    pub name: &'static str,
    /// ACI colour of the layer.
    pub color: AciColor,
    /// Layer lineweight.
    pub lineweight: Lineweight,
}

/// An entity in model space. Every entity inherits colour and lineweight
/// from its layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// `LWPOLYLINE`. Closed polylines keep their repeated closing vertex.
    Polyline {
        /// Owning layer.
        layer: &'static str,
        /// Whether the closed flag is set.
        closed: bool,
        /// Vertices in order.
        vertices: Vec<Coord<f64>>,
    },
    /// `POINT`.
    Point {
        /// Owning layer.
        layer: &'static str,
        /// Location.
        at: Coord<f64>,
    },
    /// Middle-centre aligned `TEXT`.
    Text {
        /// Owning layer.
        layer: &'static str,
        /// Unescaped label.
        text: String,
        /// Alignment point.
        anchor: Coord<f64>,
        /// Height in model-space units.
        height: f64,
    },
}

/// A complete drawing ready for serialisation.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    /// Header variables.
    pub header: DrawingHeader,
    /// Layers in first-emission order.
    pub layers: Vec<Layer>,
    /// Entities in emission order.
    pub entities: Vec<Entity>,
}

impl Drawing {
    /// Lay out placements as a drawing. Geometry is never scaled; only text
    /// height follows the plan scale.
    ///
    /// # Examples
    /// ```
    /// use osm2dxf_core::{Crs, PlanType};
    /// use osm2dxf_data::Drawing;
    ///
    /// let drawing = Drawing::from_placements(PlanType::Key, Crs::default(), &[]);
    /// assert!(drawing.layers.is_empty());
    /// assert_eq!(drawing.header.text_height(), 5.0);
    /// ```
    pub fn from_placements(plan: PlanType, crs: Crs, placements: &[Placement]) -> Self {
        let header = DrawingHeader {
            plan,
            scale_denominator: plan.scale_denominator(),
            crs,
            extents: placement_bounds(placements),
        };
        let layers = summarize_layers(placements)
            .into_iter()
            .map(|layer| Layer {
                name: layer.name,
                color: layer.color,
                lineweight: layer.lineweight,
            })
            .collect();
        let height = header.text_height();
        let entities = placements
            .iter()
            .map(|placement| entity(placement, height))
            .collect();
        Self {
            header,
            layers,
            entities,
        }
    }
}

fn entity(placement: &Placement, text_height: f64) -> Entity {
    let layer = placement.category.layer_name();
    match &placement.primitive {
        Primitive::Shape(shape) => match shape.kind() {
            ShapeKind::Point => Entity::Point {
                layer,
                at: shape.label_anchor(),
            },
            kind => Entity::Polyline {
                layer,
                closed: kind == ShapeKind::Polygon,
                vertices: shape.points().to_vec(),
            },
        },
        Primitive::Label { text, anchor } => Entity::Text {
            layer,
            text: text.clone(),
            anchor: *anchor,
            height: text_height,
        },
    }
}
