// ============================================================================
// SLICE LAYER — configuration, derived grayscale table, top-level facade
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::annotations::AnnotationStore;
use crate::colormap::{ColorMapMethod, GrayscaleLut};
use crate::error::{LayerError, Result};
use crate::geom::WorldPoint;
use crate::history::EditLog;
use crate::lut::ColorTableRegistry;
use crate::tools::{PointerEvent, Tool, ToolOptions};
use crate::view::{PixelToWorld, ViewState};
use crate::volume::{SampleMethod, VolumeSource};

/// All user-facing rendering settings of one slice layer.
///
/// Fields are crate-private: mutation goes through `SliceLayer`'s validated
/// setters so the derived grayscale table can never go stale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub(crate) sample_method: SampleMethod,
    pub(crate) colormap: ColorMapMethod,
    /// Sigmoid center for the grayscale curve, in normalized [0,1] range.
    pub(crate) brightness: f32,
    /// Sigmoid steepness for the grayscale curve.
    pub(crate) contrast: f32,
    pub(crate) min_visible: f32,
    pub(crate) max_visible: f32,
    /// Skip exactly-zero samples entirely (background stays untouched).
    pub(crate) clear_zero: bool,
    /// Value-pass blend weight.
    pub(crate) opacity: f32,
    /// Selection-overlay blend weight, independent of `opacity`.
    pub(crate) roi_opacity: f32,
    pub(crate) color_table_id: Option<i32>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            sample_method: SampleMethod::Nearest,
            colormap: ColorMapMethod::Grayscale,
            brightness: 0.25,
            contrast: 12.0,
            min_visible: 0.0,
            max_visible: 255.0,
            clear_zero: false,
            opacity: 1.0,
            roi_opacity: 0.7,
            color_table_id: None,
        }
    }
}

impl LayerConfig {
    pub fn sample_method(&self) -> SampleMethod {
        self.sample_method
    }
    pub fn colormap_method(&self) -> ColorMapMethod {
        self.colormap
    }
    pub fn brightness(&self) -> f32 {
        self.brightness
    }
    pub fn contrast(&self) -> f32 {
        self.contrast
    }
    pub fn min_visible_value(&self) -> f32 {
        self.min_visible
    }
    pub fn max_visible_value(&self) -> f32 {
        self.max_visible
    }
    pub fn clear_zero(&self) -> bool {
        self.clear_zero
    }
    pub fn opacity(&self) -> f32 {
        self.opacity
    }
    pub fn roi_opacity(&self) -> f32 {
        self.roi_opacity
    }
    pub fn color_table_id(&self) -> Option<i32> {
        self.color_table_id
    }
}

/// Probe readout for one world coordinate: value, voxel index, and the color
/// table's structure label when one applies.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeInfo {
    pub value: f32,
    pub index: [i32; 3],
    pub label: Option<String>,
}

// ============================================================================
// LAYER
// ============================================================================

/// One renderable, annotatable slice layer. Owns its configuration, the
/// derived grayscale table, and the annotation store; volumes, translators,
/// color tables, and the undo log are collaborators passed in per call.
pub struct SliceLayer {
    config: LayerConfig,
    grayscale: GrayscaleLut,
    annotations: AnnotationStore,
}

impl Default for SliceLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SliceLayer {
    pub fn new() -> Self {
        let config = LayerConfig::default();
        let grayscale = GrayscaleLut::build(&config);
        Self {
            config,
            grayscale,
            annotations: AnnotationStore::default(),
        }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn grayscale_lut(&self) -> &GrayscaleLut {
        &self.grayscale
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    /// Adopt a freshly attached volume's full value range as the visible
    /// range, then rebuild the grayscale table for it.
    pub fn init_visible_range_from(&mut self, volume: &dyn VolumeSource) {
        let (min, max) = volume.value_range();
        // A constant volume would collapse the range; keep min < max.
        self.config.min_visible = min;
        self.config.max_visible = if max > min { max } else { min + 1.0 };
        self.rebuild_grayscale();
    }

    fn rebuild_grayscale(&mut self) {
        self.grayscale = GrayscaleLut::build(&self.config);
    }

    // -- validated setters ---------------------------------------------------
    //
    // Every setter rejects bad input before mutating, and every setter that
    // feeds the grayscale table rebuilds it synchronously.

    pub fn set_sample_method(&mut self, method: SampleMethod) {
        self.config.sample_method = method;
    }

    pub fn set_sample_method_by_name(&mut self, name: &str) -> Result<()> {
        match SampleMethod::from_name(name) {
            Some(method) => {
                self.set_sample_method(method);
                Ok(())
            }
            None => Err(LayerError::config(
                "sample method",
                format!("\"{name}\" should be nearest, trilinear, sinc, or magnitude"),
            )),
        }
    }

    pub fn set_colormap_method(&mut self, method: ColorMapMethod) {
        self.config.colormap = method;
    }

    pub fn set_colormap_method_by_name(&mut self, name: &str) -> Result<()> {
        match ColorMapMethod::from_name(name) {
            Some(method) => {
                self.set_colormap_method(method);
                Ok(())
            }
            None => Err(LayerError::config(
                "colormap method",
                format!("\"{name}\" should be grayscale, heatScale, or lut"),
            )),
        }
    }

    pub fn set_brightness(&mut self, brightness: f32) -> Result<()> {
        if !brightness.is_finite() {
            return Err(LayerError::config("brightness", "must be a finite number"));
        }
        self.config.brightness = brightness;
        self.rebuild_grayscale();
        Ok(())
    }

    pub fn set_contrast(&mut self, contrast: f32) -> Result<()> {
        if !contrast.is_finite() {
            return Err(LayerError::config("contrast", "must be a finite number"));
        }
        self.config.contrast = contrast;
        self.rebuild_grayscale();
        Ok(())
    }

    pub fn set_min_visible_value(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(LayerError::config("min visible value", "must be a finite number"));
        }
        if value >= self.config.max_visible {
            return Err(LayerError::config(
                "min visible value",
                format!("{} is not below the max visible value {}", value, self.config.max_visible),
            ));
        }
        self.config.min_visible = value;
        self.rebuild_grayscale();
        Ok(())
    }

    pub fn set_max_visible_value(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(LayerError::config("max visible value", "must be a finite number"));
        }
        if value <= self.config.min_visible {
            return Err(LayerError::config(
                "max visible value",
                format!("{} is not above the min visible value {}", value, self.config.min_visible),
            ));
        }
        self.config.max_visible = value;
        self.rebuild_grayscale();
        Ok(())
    }

    /// Set both bounds at once, for ranges that would transiently violate the
    /// min < max invariant if set one at a time.
    pub fn set_visible_range(&mut self, min: f32, max: f32) -> Result<()> {
        if !min.is_finite() || !max.is_finite() {
            return Err(LayerError::config("visible range", "must be finite numbers"));
        }
        if min >= max {
            return Err(LayerError::config(
                "visible range",
                format!("min {} must be below max {}", min, max),
            ));
        }
        self.config.min_visible = min;
        self.config.max_visible = max;
        self.rebuild_grayscale();
        Ok(())
    }

    pub fn set_clear_zero(&mut self, clear: bool) {
        self.config.clear_zero = clear;
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(LayerError::config("opacity", "must be between 0 and 1"));
        }
        self.config.opacity = opacity;
        Ok(())
    }

    pub fn set_roi_opacity(&mut self, opacity: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(LayerError::config("roi opacity", "must be between 0 and 1"));
        }
        self.config.roi_opacity = opacity;
        Ok(())
    }

    /// Bind a color table by id, validated against the registry. `None`
    /// unbinds; LUT-mode rendering then degrades to a no-op.
    pub fn set_color_table(
        &mut self,
        id: Option<i32>,
        registry: &ColorTableRegistry,
    ) -> Result<()> {
        if let Some(id) = id {
            if !registry.contains(id) {
                return Err(LayerError::NoColorTable(id));
            }
        }
        self.config.color_table_id = id;
        Ok(())
    }

    // -- rendering & interaction --------------------------------------------

    /// Composite this layer into an RGBA8 destination buffer. See
    /// `compositor::draw_into_buffer` for pass order and semantics.
    pub fn draw_into_buffer(
        &self,
        buffer: &mut [u8],
        view: &ViewState,
        translator: &dyn PixelToWorld,
        volume: &dyn VolumeSource,
        registry: &ColorTableRegistry,
    ) {
        let table = self.config.color_table_id.and_then(|id| registry.get(id));
        crate::compositor::draw_into_buffer(
            buffer,
            view,
            translator,
            volume,
            &self.config,
            &self.grayscale,
            table,
            &self.annotations,
        );
    }

    /// Route one pointer event through the active tool.
    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        tool: Tool,
        opts: &ToolOptions,
        view: &ViewState,
        translator: &dyn PixelToWorld,
        volume: &mut dyn VolumeSource,
        log: &mut dyn EditLog,
        cancel: &mut dyn FnMut() -> bool,
    ) {
        crate::tools::handle_pointer(
            &mut self.annotations,
            event,
            tool,
            opts,
            view,
            translator,
            volume,
            log,
            cancel,
        );
    }

    /// Value/index/label readout at a world coordinate, or `None` outside the
    /// volume.
    pub fn info_at(
        &self,
        world: WorldPoint,
        volume: &dyn VolumeSource,
        registry: &ColorTableRegistry,
    ) -> Option<ProbeInfo> {
        let index = volume.world_to_index(world)?;
        let value = volume.value_at(world, SampleMethod::Nearest);
        let label = match (self.config.colormap, self.config.color_table_id) {
            (ColorMapMethod::Lut, Some(id)) => registry
                .get(id)
                .map(|t| t.label_at(value as i32).to_string()),
            _ => None,
        };
        Some(ProbeInfo { value, index, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::{ColorTable, ColorTableRegistry};
    use crate::volume::GridVolume;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = LayerConfig::default();
        assert_eq!(cfg.brightness(), 0.25);
        assert_eq!(cfg.contrast(), 12.0);
        assert_eq!(cfg.roi_opacity(), 0.7);
        assert_eq!(cfg.colormap_method(), ColorMapMethod::Grayscale);
        assert_eq!(cfg.sample_method(), SampleMethod::Nearest);
    }

    #[test]
    fn rejected_setters_leave_state_unchanged() {
        let mut layer = SliceLayer::new();
        let before = layer.config().clone();
        let lut_before = layer.grayscale_lut().clone();

        assert!(layer.set_brightness(f32::NAN).is_err());
        assert!(layer.set_min_visible_value(500.0).is_err()); // >= max
        assert!(layer.set_max_visible_value(-1.0).is_err()); // <= min
        assert!(layer.set_visible_range(10.0, 10.0).is_err());
        assert!(layer.set_opacity(1.5).is_err());
        assert!(layer.set_roi_opacity(-0.1).is_err());
        assert!(layer.set_colormap_method_by_name("plasma").is_err());
        assert!(layer.set_sample_method_by_name("bicubic").is_err());

        assert_eq!(layer.config(), &before);
        assert!(layer.grayscale_lut().entries() == lut_before.entries());
    }

    #[test]
    fn range_setters_rebuild_the_lut() {
        let mut layer = SliceLayer::new();
        let before = layer.grayscale_lut().clone();
        layer.set_visible_range(0.0, 100.0).unwrap();
        // Entries differ because the range (and so the sigmoid input) moved
        assert!(layer.grayscale_lut().entries() != before.entries());

        let after_range = layer.grayscale_lut().clone();
        layer.set_brightness(0.5).unwrap();
        assert!(layer.grayscale_lut().entries() != after_range.entries());
    }

    #[test]
    fn by_name_setters_accept_documented_names() {
        let mut layer = SliceLayer::new();
        layer.set_colormap_method_by_name("heatScale").unwrap();
        assert_eq!(layer.config().colormap_method(), ColorMapMethod::HeatScale);
        layer.set_sample_method_by_name("trilinear").unwrap();
        assert_eq!(layer.config().sample_method(), SampleMethod::Trilinear);
    }

    #[test]
    fn color_table_binding_is_validated() {
        let mut layer = SliceLayer::new();
        let mut registry = ColorTableRegistry::new();
        assert!(layer.set_color_table(Some(3), &registry).is_err());
        assert_eq!(layer.config().color_table_id(), None);

        registry.insert(3, ColorTable::new("aseg"));
        layer.set_color_table(Some(3), &registry).unwrap();
        assert_eq!(layer.config().color_table_id(), Some(3));
        layer.set_color_table(None, &registry).unwrap();
        assert_eq!(layer.config().color_table_id(), None);
    }

    #[test]
    fn attaching_a_volume_adopts_its_range() {
        let mut layer = SliceLayer::new();
        let mut values = vec![0.0; 4 * 4 * 4];
        values[12] = 80.0;
        let vol = GridVolume::from_values([4, 4, 4], [1.0; 3], values);
        layer.init_visible_range_from(&vol);
        assert_eq!(layer.config().min_visible_value(), 0.0);
        assert_eq!(layer.config().max_visible_value(), 80.0);
    }

    #[test]
    fn probe_reports_value_and_lut_label() {
        let mut layer = SliceLayer::new();
        let mut values = vec![0.0; 4 * 4 * 4];
        values[0] = 17.0;
        let vol = GridVolume::from_values([4, 4, 4], [1.0; 3], values);

        let mut registry = ColorTableRegistry::new();
        let mut table = ColorTable::new("aseg");
        table.insert(17, [0, 255, 0], "hippocampus");
        registry.insert(0, table);

        let info = layer.info_at([0.0, 0.0, 0.0], &vol, &registry).unwrap();
        assert_eq!(info.value, 17.0);
        assert_eq!(info.index, [0, 0, 0]);
        assert_eq!(info.label, None);

        layer.set_colormap_method(ColorMapMethod::Lut);
        layer.set_color_table(Some(0), &registry).unwrap();
        let info = layer.info_at([0.0, 0.0, 0.0], &vol, &registry).unwrap();
        assert_eq!(info.label.as_deref(), Some("hippocampus"));

        assert!(layer.info_at([99.0, 0.0, 0.0], &vol, &registry).is_none());
    }
}
