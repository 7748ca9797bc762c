//! Scale limits and the map's scale table.
//!
//! Scale limits are stored as map scale denominators. On the wire `-1` means
//! "no restriction"; inside the editor that state is `None`.
//!
//! The scale table is supplied by the map surface and lists denominators
//! from coarsest (zoom level 0) to finest. It maps scale limits to zoom
//! levels for range sliders and back.

use serde::{Deserialize, Serialize};

/// Wire value for an unrestricted scale limit.
pub const NO_RESTRICTION: f64 = -1.0;

/// Map a stored or typed scale value to the editor's representation.
/// Zero and negative denominators mean no restriction.
pub fn normalize_scale(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Scale limits of a layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    /// Coarsest scale the layer is visible at
    pub min: Option<f64>,
    /// Finest scale the layer is visible at
    pub max: Option<f64>,
}

impl ScaleRange {
    /// Build from wire values, where `-1` means no restriction.
    pub fn from_wire(minscale: f64, maxscale: f64) -> Self {
        Self {
            min: normalize_scale(Some(minscale)),
            max: normalize_scale(Some(maxscale)),
        }
    }

    /// Wire values, `-1` standing in for no restriction.
    pub fn to_wire(&self) -> (f64, f64) {
        (
            self.min.unwrap_or(NO_RESTRICTION),
            self.max.unwrap_or(NO_RESTRICTION),
        )
    }

    /// A coarse limit must not be finer than the fine limit. Open ended
    /// ranges are always ordered.
    pub fn is_ordered(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min >= max,
            _ => true,
        }
    }
}

/// Ordered scale denominators, coarsest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleTable {
    scales: Vec<f64>,
}

impl ScaleTable {
    pub fn new(scales: Vec<f64>) -> Self {
        Self { scales }
    }

    /// Parse a comma separated list of denominators, e.g. from an
    /// environment variable.
    pub fn parse(list: &str) -> Result<Self, std::num::ParseFloatError> {
        let scales = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(scales))
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// First zoom level whose scale is at or below `scale`, or `default`
    /// when the limit is unrestricted or finer than the table.
    pub fn zoom_level(&self, scale: Option<f64>, default: i32) -> i32 {
        let Some(scale) = normalize_scale(scale) else {
            return default;
        };
        self.scales
            .iter()
            .position(|s| scale >= *s)
            .map(|idx| idx as i32)
            .unwrap_or(default)
    }

    /// Slider position of the coarse limit; `-1` when unrestricted.
    pub fn min_zoom(&self, minscale: Option<f64>) -> i32 {
        self.zoom_level(minscale, -1)
    }

    /// Slider position of the fine limit; one past the last level when
    /// unrestricted.
    pub fn max_zoom(&self, maxscale: Option<f64>) -> i32 {
        self.zoom_level(maxscale, self.scales.len() as i32)
    }

    /// Scale at a zoom level. Positions outside the table (the slider's
    /// "no restriction" ends) yield `None`.
    pub fn scale_at(&self, zoom: i32) -> Option<f64> {
        usize::try_from(zoom)
            .ok()
            .and_then(|idx| self.scales.get(idx))
            .copied()
    }

    /// Scale limits for a slider range.
    pub fn range_for_zoom(&self, min_zoom: i32, max_zoom: i32) -> ScaleRange {
        ScaleRange {
            min: self.scale_at(min_zoom),
            max: self.scale_at(max_zoom),
        }
    }
}
