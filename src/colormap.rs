// ============================================================================
// COLOR MAPPING — scalar sample value → display color
// ============================================================================
//
// Pure functions: no state beyond the precomputed grayscale table. The
// compositor calls `map_value` once per in-bounds pixel; `None` means the
// destination pixel is left untouched by the value pass.

use serde::{Deserialize, Serialize};

use crate::layer::LayerConfig;
use crate::lut::ColorTable;

pub const GRAYSCALE_LUT_ENTRIES: usize = 256;
pub const MAX_PIXEL_COMPONENT: f32 = 255.0;

/// Strategy mapping a scalar sample to a display color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMapMethod {
    #[default]
    Grayscale,
    HeatScale,
    Lut,
}

impl ColorMapMethod {
    pub fn label(&self) -> &'static str {
        match self {
            ColorMapMethod::Grayscale => "grayscale",
            ColorMapMethod::HeatScale => "heatScale",
            ColorMapMethod::Lut => "lut",
        }
    }

    pub fn all() -> &'static [ColorMapMethod] {
        &[
            ColorMapMethod::Grayscale,
            ColorMapMethod::HeatScale,
            ColorMapMethod::Lut,
        ]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ColorMapMethod::all().iter().copied().find(|m| m.label() == name)
    }
}

// ============================================================================
// GRAYSCALE LUT — 256 byte intensities derived from brightness/contrast
// ============================================================================

/// Fixed-size intensity table. Rebuilt eagerly whenever brightness, contrast,
/// or the visible range changes — never partially stale.
#[derive(Clone, PartialEq, Eq)]
pub struct GrayscaleLut {
    entries: [u8; GRAYSCALE_LUT_ENTRIES],
}

impl GrayscaleLut {
    /// Deterministic rebuild from the config. Each entry maps its share of
    /// the visible range through a sigmoid centered at `brightness` with
    /// steepness `contrast`.
    pub fn build(cfg: &LayerConfig) -> Self {
        let min = cfg.min_visible_value();
        let max = cfg.max_visible_value();
        let span = max - min;

        let mut entries = [0u8; GRAYSCALE_LUT_ENTRIES];
        for (n, entry) in entries.iter_mut().enumerate() {
            // Spread entries across the actual visible range for the highest
            // granularity within the table.
            let value = (n as f32 * span) / GRAYSCALE_LUT_ENTRIES as f32 + min;
            let normalized = (value - min) / span;
            let curved = 1.0 / (1.0 + f32::exp(-(normalized - cfg.brightness()) * cfg.contrast()));
            *entry = (curved * MAX_PIXEL_COMPONENT) as u8;
        }
        Self { entries }
    }

    pub fn intensity(&self, index: usize) -> u8 {
        self.entries[index.min(GRAYSCALE_LUT_ENTRIES - 1)]
    }

    pub fn entries(&self) -> &[u8; GRAYSCALE_LUT_ENTRIES] {
        &self.entries
    }
}

impl std::fmt::Debug for GrayscaleLut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GrayscaleLut({} entries)", GRAYSCALE_LUT_ENTRIES)
    }
}

// ============================================================================
// MAPPING
// ============================================================================

/// Map one sampled value to an RGB color.
///
/// Returns `None` when the value pass should leave the pixel alone entirely:
/// the value fails the visibility gate (grayscale/LUT modes), zero-clear
/// skips an exact zero, or LUT mode has no table bound. Heat scale never
/// returns `None` for a gated-out value — it passes the prior destination
/// color back so the blend is a no-op on RGB while the pass still runs.
pub fn map_value(
    value: f32,
    cfg: &LayerConfig,
    lut: &GrayscaleLut,
    dest: [u8; 3],
    table: Option<&ColorTable>,
) -> Option<[u8; 3]> {
    let min = cfg.min_visible_value();
    let max = cfg.max_visible_value();

    // Visibility gate: heat scale applies its own magnitude-based gate below.
    let method = cfg.colormap_method();
    if method != ColorMapMethod::HeatScale && (value < min || value > max) {
        return None;
    }
    if cfg.clear_zero() && value == 0.0 {
        return None;
    }

    match method {
        ColorMapMethod::Grayscale => {
            let index = ((GRAYSCALE_LUT_ENTRIES as f32 - 1.0) * (value - min) / (max - min))
                .floor()
                .clamp(0.0, GRAYSCALE_LUT_ENTRIES as f32 - 1.0) as usize;
            let intensity = lut.intensity(index);
            Some([intensity, intensity, intensity])
        }
        ColorMapMethod::HeatScale => Some(heat_scale(value, min, max, dest)),
        ColorMapMethod::Lut => table.and_then(|t| t.color_at(value.trunc() as i32)),
    }
}

/// The classic signed heat scale: positive values ramp red then green,
/// negative values ramp blue then green. Magnitudes outside [min, max] pass
/// the prior destination color through.
fn heat_scale(value: f32, min: f32, max: f32, dest: [u8; 3]) -> [u8; 3] {
    let mid = (max - min) / 2.0 + min;

    if value.abs() < min || value.abs() > max {
        return dest;
    }

    // Quadratic ease over the first half so faint values stay faint.
    let mut value = value;
    if value.abs() > min && value.abs() < mid {
        let t = value.abs();
        let eased = (t - min) * (t - min) / (mid - min) + min;
        value = if value < 0.0 { -eased } else { eased };
    }

    let ramp = |v: f32, lo: f32, hi: f32| -> f32 {
        if v < lo {
            0.0
        } else if v < hi {
            (v - lo) / (hi - lo)
        } else {
            1.0
        }
    };

    let (red, green, blue);
    if value >= 0.0 {
        red = ramp(value, min, mid);
        green = ramp(value, mid, max);
        blue = 0.0;
    } else {
        let v = -value;
        red = 0.0;
        green = ramp(v, mid, max);
        blue = ramp(v, min, mid);
    }

    [
        (red.min(1.0) * MAX_PIXEL_COMPONENT) as u8,
        (green.min(1.0) * MAX_PIXEL_COMPONENT) as u8,
        (blue.min(1.0) * MAX_PIXEL_COMPONENT) as u8,
    ]
}
