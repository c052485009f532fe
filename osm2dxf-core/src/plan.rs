//! Reduce classified features to what a plan type draws.
//!
//! A Key Plan (1:2000) shows the principal road network and building
//! outlines, with other named features reduced to labels. A Location Plan
//! (1:1000) draws every classified feature. Unclassified features are never
//! drawn, so everything a Key Plan retains is also retained by the Location
//! Plan of the same data.

use std::fmt;
use std::str::FromStr;

use crate::classify::{AciColor, Category, ClassifiedFeature};
use crate::osm::ElementRef;

/// Output profile of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PlanType {
    /// Overview plan at 1:2000.
    Key,
    /// Detailed plan at 1:1000.
    #[default]
    Location,
}

impl PlanType {
    /// Lowercase name used on the command line and in the drawing header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Location => "location",
        }
    }

    /// Denominator of the plan scale, for example `1000` for 1:1000.
    pub fn scale_denominator(&self) -> u32 {
        match self {
            Self::Key => 2000,
            Self::Location => 1000,
        }
    }

    /// Style used when the caller expresses no colour preference.
    pub fn default_style(&self) -> StyleMode {
        match self {
            Self::Key => StyleMode::Monochrome,
            Self::Location => StyleMode::Colored,
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "key" | "key-plan" => Ok(Self::Key),
            "location" | "location-plan" => Ok(Self::Location),
            _ => Err(format!("unknown plan type '{s}' (expected 'key' or 'location')")),
        }
    }
}

/// Whether layers keep their rule colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StyleMode {
    /// Layers use their rule colour.
    Colored,
    /// Every layer uses ACI 7.
    Monochrome,
}

impl StyleMode {
    /// Resolve the style from a plan and an optional explicit preference.
    ///
    /// # Examples
    /// ```
    /// use osm2dxf_core::{PlanType, StyleMode};
    ///
    /// assert_eq!(StyleMode::resolve(PlanType::Key, None), StyleMode::Monochrome);
    /// assert_eq!(StyleMode::resolve(PlanType::Key, Some(true)), StyleMode::Colored);
    /// assert_eq!(StyleMode::resolve(PlanType::Location, Some(false)), StyleMode::Monochrome);
    /// ```
    pub fn resolve(plan: PlanType, colors: Option<bool>) -> Self {
        match colors {
            Some(true) => Self::Colored,
            Some(false) => Self::Monochrome,
            None => plan.default_style(),
        }
    }

    /// Colour a layer is drawn with under this style.
    pub fn display_color(&self, rule_color: AciColor) -> AciColor {
        match self {
            Self::Colored => rule_color,
            Self::Monochrome => AciColor::White,
        }
    }
}

/// How a retained feature is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Presentation {
    /// Full geometry.
    Geometry,
    /// Boundary of an area.
    Outline,
    /// Only the name label, placed on the feature.
    LabelOnly,
}

impl Presentation {
    /// Whether the feature's shape is drawn.
    pub fn draws_shape(&self) -> bool {
        !matches!(self, Self::LabelOnly)
    }
}

/// A feature that survived filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetainedFeature<'a> {
    /// The classified feature, unchanged.
    pub feature: &'a ClassifiedFeature,
    /// How to draw it.
    pub presentation: Presentation,
    /// Label text, when the feature is named.
    pub label: Option<&'a str>,
    /// Layer colour after applying the style mode.
    pub display_color: AciColor,
}

/// Result of [`PlanFilter::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredPlan<'a> {
    /// Plan type that produced the selection.
    pub plan: PlanType,
    /// Style applied to display colours.
    pub style: StyleMode,
    /// Retained features in input order.
    pub retained: Vec<RetainedFeature<'a>>,
}

/// Applies a plan type's selection policy.
///
/// # Examples
/// ```
/// use osm2dxf_core::{Classifier, OsmData, PlanFilter, PlanType, StyleMode};
///
/// let features = Classifier::default().classify_elements(&OsmData::default());
/// let plan = PlanFilter::new(PlanType::Key, StyleMode::Monochrome).apply(&features);
/// assert!(plan.retained.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanFilter {
    plan: PlanType,
    style: StyleMode,
}

impl PlanFilter {
    /// Filter for `plan` drawn in `style`.
    pub fn new(plan: PlanType, style: StyleMode) -> Self {
        Self { plan, style }
    }

    /// Decide how, if at all, `feature` is drawn.
    pub fn retain<'a>(&self, feature: &'a ClassifiedFeature) -> Option<RetainedFeature<'a>> {
        let category = feature.category();
        if category == Category::Unclassified {
            return None;
        }
        let label = feature.name.as_deref();
        let presentation = match self.plan {
            PlanType::Location => Presentation::Geometry,
            PlanType::Key => Self::key_presentation(feature.source, category, label)?,
        };
        Some(RetainedFeature {
            feature,
            presentation,
            label,
            display_color: self.style.display_color(feature.class.color),
        })
    }

    /// Apply the policy to every feature, preserving order.
    pub fn apply<'a>(&self, features: &'a [ClassifiedFeature]) -> FilteredPlan<'a> {
        FilteredPlan {
            plan: self.plan,
            style: self.style,
            retained: features
                .iter()
                .filter_map(|feature| self.retain(feature))
                .collect(),
        }
    }

    fn key_presentation(
        source: ElementRef,
        category: Category,
        label: Option<&str>,
    ) -> Option<Presentation> {
        if matches!(source, ElementRef::Node(_)) {
            return None;
        }
        match category {
            Category::HighwayMotorway | Category::HighwayPrimary | Category::HighwaySecondary => {
                Some(Presentation::Geometry)
            }
            Category::Building => Some(Presentation::Outline),
            _ => label.map(|_| Presentation::LabelOnly),
        }
    }
}
