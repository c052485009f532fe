//! Settings for a single conversion.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::classify::Classifier;
use crate::plan::{PlanFilter, PlanType, StyleMode};
use crate::projection::Crs;

/// Encoding of the input map data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InputFormat {
    /// OSM XML.
    Xml,
    /// OSM PBF.
    Pbf,
}

impl InputFormat {
    /// Guess the format from a file name.
    ///
    /// `.pbf` selects PBF; everything else, including `.osm` and `.xml`, is
    /// read as XML.
    ///
    /// # Examples
    /// ```
    /// use osm2dxf_core::InputFormat;
    ///
    /// assert_eq!(InputFormat::from_path("berlin.osm.pbf"), InputFormat::Pbf);
    /// assert_eq!(InputFormat::from_path("site.osm"), InputFormat::Xml);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let is_pbf = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pbf"));
        if is_pbf { Self::Pbf } else { Self::Xml }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xml => "xml",
            Self::Pbf => "pbf",
        })
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" | "osm" => Ok(Self::Xml),
            "pbf" => Ok(Self::Pbf),
            _ => Err(format!("unknown input format '{s}' (expected 'xml' or 'pbf')")),
        }
    }
}

/// Options controlling a conversion.
///
/// # Examples
/// ```
/// use osm2dxf_core::{ConvertOptions, PlanType, StyleMode};
///
/// let options = ConvertOptions {
///     plan: PlanType::Key,
///     ..ConvertOptions::default()
/// };
/// assert_eq!(options.style(), StyleMode::Monochrome);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertOptions {
    /// Output profile.
    pub plan: PlanType,
    /// Explicit colour preference; `None` follows the plan default.
    pub colors: Option<bool>,
    /// Target coordinate reference system.
    pub projection: Crs,
    /// Emit per-element diagnostics. Never changes the output.
    pub verbose: bool,
    /// Classification rule table.
    pub classifier: Classifier,
    /// Input format; `None` infers it from the input path.
    pub input_format: Option<InputFormat>,
}

impl ConvertOptions {
    /// Style mode after applying the plan default.
    pub fn style(&self) -> StyleMode {
        StyleMode::resolve(self.plan, self.colors)
    }

    /// Plan filter for these options.
    pub fn plan_filter(&self) -> PlanFilter {
        PlanFilter::new(self.plan, self.style())
    }
}
