//! Classify tagged elements into drawing layers.
//!
//! Classification walks an ordered table of [`ClassificationRule`]s and takes
//! the first rule whose [`TagMatcher`] accepts the element's tags. Elements
//! that match nothing fall back to [`Category::Unclassified`], so every
//! element receives exactly one category.
//!
//! # Examples
//! ```
//! use osm2dxf_core::{AciColor, Category, Classifier, Tags};
//!
//! let tags = Tags::from([("highway".to_owned(), "motorway".to_owned())]);
//! let class = Classifier::default().classify(&tags);
//! assert_eq!(class.category, Category::HighwayMotorway);
//! assert_eq!(class.color, AciColor::Red);
//! assert_eq!(class.lineweight.hundredths_mm(), 100);
//! ```

use crate::osm::{ElementRef, OsmData, Tags};

/// Semantic drawing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Category {
    /// `highway=motorway`.
    HighwayMotorway,
    /// `highway=trunk`.
    HighwayTrunk,
    /// `highway=primary`.
    HighwayPrimary,
    /// `highway=secondary`.
    HighwaySecondary,
    /// `highway=tertiary`.
    HighwayTertiary,
    /// `highway=residential`.
    HighwayResidential,
    /// `highway=service`.
    HighwayService,
    /// `highway=footway`.
    HighwayFootway,
    /// `highway=cycleway`.
    HighwayCycleway,
    /// `highway=path`.
    HighwayPath,
    /// Building footprints.
    Building,
    /// Rivers, streams, canals and drains.
    Waterway,
    /// Standing water.
    NaturalWater,
    /// Coastlines.
    NaturalCoastline,
    /// Individual trees.
    NaturalTree,
    /// Parks, woods and other vegetated areas.
    Natural,
    /// Amenities.
    Amenity,
    /// Remaining land use.
    Landuse,
    /// Everything no rule matched.
    Unclassified,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Self; 19] = [
        Self::HighwayMotorway,
        Self::HighwayTrunk,
        Self::HighwayPrimary,
        Self::HighwaySecondary,
        Self::HighwayTertiary,
        Self::HighwayResidential,
        Self::HighwayService,
        Self::HighwayFootway,
        Self::HighwayCycleway,
        Self::HighwayPath,
        Self::Building,
        Self::Waterway,
        Self::NaturalWater,
        Self::NaturalCoastline,
        Self::NaturalTree,
        Self::Natural,
        Self::Amenity,
        Self::Landuse,
        Self::Unclassified,
    ];

    /// Layer name used in the drawing.
    ///
    /// # Examples
    /// ```
    /// use osm2dxf_core::Category;
    ///
    /// assert_eq!(Category::NaturalWater.layer_name(), "NATURAL_WATER");
    /// ```
    pub fn layer_name(&self) -> &'static str {
        match self {
            Self::HighwayMotorway => "HIGHWAY_MOTORWAY",
            Self::HighwayTrunk => "HIGHWAY_TRUNK",
            Self::HighwayPrimary => "HIGHWAY_PRIMARY",
            Self::HighwaySecondary => "HIGHWAY_SECONDARY",
            Self::HighwayTertiary => "HIGHWAY_TERTIARY",
            Self::HighwayResidential => "HIGHWAY_RESIDENTIAL",
            Self::HighwayService => "HIGHWAY_SERVICE",
            Self::HighwayFootway => "HIGHWAY_FOOTWAY",
            Self::HighwayCycleway => "HIGHWAY_CYCLEWAY",
            Self::HighwayPath => "HIGHWAY_PATH",
            Self::Building => "BUILDING",
            Self::Waterway => "WATERWAY",
            Self::NaturalWater => "NATURAL_WATER",
            Self::NaturalCoastline => "NATURAL_COASTLINE",
            Self::NaturalTree => "NATURAL_TREE",
            Self::Natural => "NATURAL",
            Self::Amenity => "AMENITY",
            Self::Landuse => "LANDUSE",
            Self::Unclassified => "UNCLASSIFIED",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.layer_name())
    }
}

/// AutoCAD Color Index entries used by the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum AciColor {
    /// ACI 1.
    Red,
    /// ACI 2.
    Yellow,
    /// ACI 3.
    Green,
    /// ACI 4.
    Cyan,
    /// ACI 5.
    Blue,
    /// ACI 6.
    Magenta,
    /// ACI 7, drawn black on light backgrounds.
    White,
    /// ACI 8.
    Gray,
    /// ACI 9.
    LightGray,
}

impl AciColor {
    /// Colour index as written to the drawing.
    pub fn index(&self) -> u8 {
        match self {
            Self::Red => 1,
            Self::Yellow => 2,
            Self::Green => 3,
            Self::Cyan => 4,
            Self::Blue => 5,
            Self::Magenta => 6,
            Self::White => 7,
            Self::Gray => 8,
            Self::LightGray => 9,
        }
    }

    /// Default RGB value of the colour index.
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Self::Red => [255, 0, 0],
            Self::Yellow => [255, 255, 0],
            Self::Green => [0, 255, 0],
            Self::Cyan => [0, 255, 255],
            Self::Blue => [0, 0, 255],
            Self::Magenta => [255, 0, 255],
            Self::White => [255, 255, 255],
            Self::Gray => [65, 65, 65],
            Self::LightGray => [128, 128, 128],
        }
    }
}

impl TryFrom<u8> for AciColor {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(Self::Red),
            2 => Ok(Self::Yellow),
            3 => Ok(Self::Green),
            4 => Ok(Self::Cyan),
            5 => Ok(Self::Blue),
            6 => Ok(Self::Magenta),
            7 => Ok(Self::White),
            8 => Ok(Self::Gray),
            9 => Ok(Self::LightGray),
            other => Err(format!("unsupported colour index {other}")),
        }
    }
}

impl From<AciColor> for u8 {
    fn from(color: AciColor) -> Self {
        color.index()
    }
}

/// Lineweights accepted by DXF readers, in hundredths of a millimetre.
pub const VALID_LINEWEIGHTS: [i16; 24] = [
    0, 5, 9, 13, 15, 18, 20, 25, 30, 35, 40, 50, 53, 60, 70, 80, 90, 100, 106, 120, 140, 158,
    200, 211,
];

/// A valid DXF lineweight.
///
/// Construction snaps to the nearest entry of [`VALID_LINEWEIGHTS`]; ties go
/// to the thinner weight.
///
/// # Examples
/// ```
/// use osm2dxf_core::Lineweight;
///
/// assert_eq!(Lineweight::snap(10).hundredths_mm(), 9);
/// assert_eq!(Lineweight::snap(12).hundredths_mm(), 13);
/// assert_eq!(Lineweight::snap(500).hundredths_mm(), 211);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "i16", into = "i16"))]
pub struct Lineweight(i16);

impl Lineweight {
    /// Snap `raw` to the nearest valid lineweight.
    pub fn snap(raw: i16) -> Self {
        let mut best = VALID_LINEWEIGHTS[0];
        for candidate in VALID_LINEWEIGHTS {
            if (i32::from(candidate) - i32::from(raw)).abs()
                < (i32::from(best) - i32::from(raw)).abs()
            {
                best = candidate;
            }
        }
        Self(best)
    }

    /// Weight in hundredths of a millimetre.
    pub fn hundredths_mm(&self) -> i16 {
        self.0
    }
}

impl From<i16> for Lineweight {
    fn from(raw: i16) -> Self {
        Self::snap(raw)
    }
}

impl From<Lineweight> for i16 {
    fn from(weight: Lineweight) -> Self {
        weight.0
    }
}

/// Predicate over an element's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TagMatcher {
    /// `key=value` exactly.
    Equals {
        /// Tag key.
        key: String,
        /// Required value.
        value: String,
    },
    /// `key=*`: the key is present with any value except `no`.
    HasKey {
        /// Tag key.
        key: String,
    },
    /// Any of the nested matchers.
    AnyOf(Vec<TagMatcher>),
}

impl TagMatcher {
    /// Shorthand for [`TagMatcher::Equals`].
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for [`TagMatcher::HasKey`].
    pub fn has_key(key: impl Into<String>) -> Self {
        Self::HasKey { key: key.into() }
    }

    /// Whether the tags satisfy this matcher.
    pub fn matches(&self, tags: &Tags) -> bool {
        match self {
            Self::Equals { key, value } => tags.get(key) == Some(value),
            Self::HasKey { key } => tags.get(key).is_some_and(|value| value != "no"),
            Self::AnyOf(matchers) => matchers.iter().any(|matcher| matcher.matches(tags)),
        }
    }
}

/// Category and styling assigned to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Classification {
    /// Layer category.
    pub category: Category,
    /// Layer colour in coloured plans.
    pub color: AciColor,
    /// Layer lineweight.
    pub lineweight: Lineweight,
}

impl Classification {
    /// Fallback for elements no rule matches.
    pub const UNCLASSIFIED: Self = Self {
        category: Category::Unclassified,
        color: AciColor::White,
        lineweight: Lineweight(9),
    };
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassificationRule {
    /// Tag predicate.
    #[cfg_attr(feature = "serde", serde(rename = "match"))]
    pub matcher: TagMatcher,
    /// Category assigned on match.
    pub category: Category,
    /// Layer colour.
    pub color: AciColor,
    /// Layer lineweight, snapped on load.
    pub lineweight: Lineweight,
}

impl ClassificationRule {
    /// Construct a rule, snapping the lineweight.
    pub fn new(matcher: TagMatcher, category: Category, color: AciColor, lineweight: i16) -> Self {
        Self {
            matcher,
            category,
            color,
            lineweight: Lineweight::snap(lineweight),
        }
    }

    fn classification(&self) -> Classification {
        Classification {
            category: self.category,
            color: self.color,
            lineweight: self.lineweight,
        }
    }
}

/// Errors raised while loading a rule table.
#[cfg(feature = "serde")]
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// The rules document was not valid JSON for the rule schema.
    #[error("invalid classification rules: {0}")]
    Json(#[from] serde_json::Error),
    /// The document contained no rules.
    #[error("classification rules must contain at least one rule")]
    Empty,
    /// Two rules send features to one layer with different styles.
    ///
    /// Entities inherit colour and lineweight from their layer, so the
    /// later rule's style could never be drawn.
    #[error("rule {second} styles layer {layer} differently from rule {first}")]
    InconsistentLayerStyle {
        /// Layer both rules target.
        layer: &'static str,
        /// One-based position of the earlier rule.
        first: usize,
        /// One-based position of the later rule.
        second: usize,
    },
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesDocument {
    rules: Vec<ClassificationRule>,
}

/// Ordered rule table; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        use AciColor::{Blue, Cyan, Green, Gray, Magenta, Red, White, Yellow};
        use Category as C;
        use TagMatcher as M;

        let highway = |value: &str, category, color, weight| {
            ClassificationRule::new(M::equals("highway", value), category, color, weight)
        };
        let vegetation = [
            ("leisure", "park"),
            ("leisure", "garden"),
            ("landuse", "forest"),
            ("landuse", "grass"),
            ("landuse", "meadow"),
            ("natural", "wood"),
            ("natural", "scrub"),
            ("natural", "grassland"),
            ("natural", "heath"),
        ]
        .into_iter()
        .map(|(key, value)| M::equals(key, value))
        .collect();

        Self::new(vec![
            highway("motorway", C::HighwayMotorway, Red, 100),
            highway("trunk", C::HighwayTrunk, Red, 80),
            highway("primary", C::HighwayPrimary, Yellow, 60),
            highway("secondary", C::HighwaySecondary, Cyan, 40),
            highway("tertiary", C::HighwayTertiary, Green, 30),
            highway("residential", C::HighwayResidential, White, 20),
            highway("service", C::HighwayService, Gray, 13),
            highway("footway", C::HighwayFootway, Magenta, 5),
            highway("cycleway", C::HighwayCycleway, Blue, 5),
            highway("path", C::HighwayPath, Green, 5),
            ClassificationRule::new(M::has_key("building"), C::Building, Blue, 25),
            ClassificationRule::new(M::has_key("waterway"), C::Waterway, Cyan, 30),
            ClassificationRule::new(
                M::AnyOf(vec![M::equals("natural", "water"), M::has_key("water")]),
                C::NaturalWater,
                Blue,
                25,
            ),
            ClassificationRule::new(
                M::equals("natural", "coastline"),
                C::NaturalCoastline,
                Blue,
                50,
            ),
            ClassificationRule::new(M::equals("natural", "tree"), C::NaturalTree, Green, 5),
            ClassificationRule::new(M::AnyOf(vegetation), C::Natural, Green, 25),
            ClassificationRule::new(M::has_key("amenity"), C::Amenity, Magenta, 15),
            ClassificationRule::new(M::has_key("landuse"), C::Landuse, Yellow, 15),
        ])
    }
}

impl Classifier {
    /// Build a classifier from an ordered rule list.
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Load a rule table from a JSON document of the form
    /// `{"rules": [{"match": ..., "category": ..., "color": 1, "lineweight": 25}]}`.
    ///
    /// # Examples
    /// ```
    /// use osm2dxf_core::{Category, Classifier, Tags};
    ///
    /// let json = r#"{"rules": [
    ///     {"match": {"has_key": {"key": "shop"}}, "category": "AMENITY", "color": 6, "lineweight": 14}
    /// ]}"#;
    /// let classifier = Classifier::from_json_reader(json.as_bytes()).expect("valid rules");
    /// let tags = Tags::from([("shop".to_owned(), "bakery".to_owned())]);
    /// let class = classifier.classify(&tags);
    /// assert_eq!(class.category, Category::Amenity);
    /// assert_eq!(class.lineweight.hundredths_mm(), 13);
    /// ```
    #[cfg(feature = "serde")]
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self, RulesError> {
        let document: RulesDocument = serde_json::from_reader(reader)?;
        if document.rules.is_empty() {
            return Err(RulesError::Empty);
        }
        let classifier = Self::new(document.rules);
        if let Some((category, first, second)) = classifier.conflicting_layer_styles() {
            return Err(RulesError::InconsistentLayerStyle {
                layer: category.layer_name(),
                first: first + 1,
                second: second + 1,
            });
        }
        Ok(classifier)
    }

    /// First category given two styles, with the zero-based indices of the
    /// rules involved.
    pub fn conflicting_layer_styles(&self) -> Option<(Category, usize, usize)> {
        self.rules.iter().enumerate().find_map(|(later, rule)| {
            self.rules
                .iter()
                .take(later)
                .position(|earlier| {
                    earlier.category == rule.category
                        && (earlier.color, earlier.lineweight) != (rule.color, rule.lineweight)
                })
                .map(|earlier| (rule.category, earlier, later))
        })
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Classify a tag set. Total: unmatched tags yield
    /// [`Classification::UNCLASSIFIED`].
    pub fn classify(&self, tags: &Tags) -> Classification {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(tags))
            .map_or(Classification::UNCLASSIFIED, ClassificationRule::classification)
    }

    /// Classify every feature-bearing element of `data`.
    ///
    /// Features are produced in a fixed order: tagged nodes, then ways, then
    /// multipolygon relations, each in source order. Untagged nodes are way
    /// vertices and never become features.
    pub fn classify_elements(&self, data: &OsmData) -> Vec<ClassifiedFeature> {
        let nodes = data
            .nodes
            .iter()
            .filter(|node| !node.tags.is_empty())
            .map(|node| self.feature(ElementRef::Node(node.id), &node.tags));
        let ways = data
            .ways
            .iter()
            .map(|way| self.feature(ElementRef::Way(way.id), &way.tags));
        let relations = data
            .relations
            .iter()
            .filter(|relation| relation.is_multipolygon())
            .map(|relation| self.feature(ElementRef::Relation(relation.id), &relation.tags));
        nodes.chain(ways).chain(relations).collect()
    }

    fn feature(&self, source: ElementRef, tags: &Tags) -> ClassifiedFeature {
        ClassifiedFeature {
            source,
            class: self.classify(tags),
            name: tags.get("name").filter(|name| !name.trim().is_empty()).cloned(),
        }
    }
}

/// An element paired with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassifiedFeature {
    /// Element the feature was derived from.
    pub source: ElementRef,
    /// Assigned category and styling.
    pub class: Classification,
    /// Value of the `name` tag, if any.
    pub name: Option<String>,
}

impl ClassifiedFeature {
    /// Feature category.
    pub fn category(&self) -> Category {
        self.class.category
    }

    /// Drawing layer name.
    pub fn layer_name(&self) -> &'static str {
        self.class.category.layer_name()
    }
}
