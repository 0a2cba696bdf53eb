// ============================================================================
// COMPOSITOR — value pass, selection-overlay pass, annotation pass
// ============================================================================
//
// Walks every destination pixel twice and then rasterizes annotations on top,
// in that order, every redraw. Mutates the RGBA8 buffer in place; no per-pixel
// allocation; deterministic for a given volume, view, and translator.

use crate::annotations::AnnotationStore;
use crate::colormap::{map_value, GrayscaleLut};
use crate::geom::{points_on_segment, PixelPoint};
use crate::layer::LayerConfig;
use crate::lut::ColorTable;
use crate::view::{PixelToWorld, ViewState};
use crate::volume::VolumeSource;

/// Fixed draw color for straight lines.
pub const LINE_COLOR: [u8; 3] = [0, 0, 255];
/// Fixed draw color for snapped (edge-snap) paths.
pub const SNAKE_COLOR: [u8; 3] = [255, 0, 0];

#[inline]
fn blend(dest: &mut [u8], color: [u8; 3], opacity: f32) {
    dest[0] = (dest[0] as f32 * (1.0 - opacity) + color[0] as f32 * opacity) as u8;
    dest[1] = (dest[1] as f32 * (1.0 - opacity) + color[1] as f32 * opacity) as u8;
    dest[2] = (dest[2] as f32 * (1.0 - opacity) + color[2] as f32 * opacity) as u8;
}

/// Composite one layer into `buffer` (row-major RGBA8, top-left origin).
///
/// Pass order per redraw:
/// 1. Value pass — sample, colormap, alpha-blend with the layer opacity,
///    alpha forced fully opaque. Out-of-bounds and gated-out pixels are left
///    untouched.
/// 2. Selection-overlay pass — selected voxels blend their highlight color
///    with the independent ROI opacity.
/// 3. Annotation pass — straight lines then snapped paths, subject to the
///    half-voxel visibility test against the view plane.
#[allow(clippy::too_many_arguments)]
pub fn draw_into_buffer(
    buffer: &mut [u8],
    view: &ViewState,
    translator: &dyn PixelToWorld,
    volume: &dyn VolumeSource,
    cfg: &LayerConfig,
    grayscale: &GrayscaleLut,
    table: Option<&ColorTable>,
    annotations: &AnnotationStore,
) {
    let width = view.width as usize;
    let height = view.height as usize;
    if buffer.len() != width * height * 4 {
        crate::log_err!(
            "destination buffer is {} bytes, expected {} for {}x{}",
            buffer.len(),
            width * height * 4,
            width,
            height
        );
        return;
    }

    // -- pass 1: values ------------------------------------------------------
    let opacity = cfg.opacity();
    for y in 0..height {
        for x in 0..width {
            let world = translator.pixel_to_world(PixelPoint::new(x as i32, y as i32));
            if !volume.contains(world) {
                continue;
            }
            let dest = &mut buffer[(y * width + x) * 4..(y * width + x) * 4 + 4];
            let value = volume.value_at(world, cfg.sample_method());
            if let Some(color) =
                map_value(value, cfg, grayscale, [dest[0], dest[1], dest[2]], table)
            {
                blend(dest, color, opacity);
                dest[3] = 255;
            }
        }
    }

    // -- pass 2: selection overlay -------------------------------------------
    let roi_opacity = cfg.roi_opacity();
    for y in 0..height {
        for x in 0..width {
            let world = translator.pixel_to_world(PixelPoint::new(x as i32, y as i32));
            if !volume.contains(world) {
                continue;
            }
            if let Some(highlight) = volume.selection_at(world) {
                let dest = &mut buffer[(y * width + x) * 4..(y * width + x) * 4 + 4];
                blend(dest, highlight, roi_opacity);
            }
        }
    }

    // -- pass 3: annotations --------------------------------------------------
    let range = view.visibility_range(volume.voxel_size());

    if let Some(line) = annotations.current_line() {
        draw_segment(buffer, view, translator, line.begin, line.end, LINE_COLOR);
    }
    for line in annotations.lines() {
        if view.is_world_visible(line.begin, range) && view.is_world_visible(line.end, range) {
            draw_segment(buffer, view, translator, line.begin, line.end, LINE_COLOR);
        }
    }

    if let Some(snake) = annotations.current_snake() {
        draw_snake(buffer, view, translator, &snake.points);
    }
    for snake in annotations.snake_lines() {
        if view.is_world_visible(snake.begin, range) && view.is_world_visible(snake.end(), range)
        {
            draw_snake(buffer, view, translator, &snake.points);
        }
    }
}

/// Rasterize one world-space segment as a fixed-color pixel run.
fn draw_segment(
    buffer: &mut [u8],
    view: &ViewState,
    translator: &dyn PixelToWorld,
    begin: crate::geom::WorldPoint,
    end: crate::geom::WorldPoint,
    color: [u8; 3],
) {
    let from = translator.world_to_pixel(begin);
    let to = translator.world_to_pixel(end);
    for p in points_on_segment(from, to) {
        put_pixel(buffer, view, p, color);
    }
}

/// Rasterize a snapped path by joining each consecutive point pair.
fn draw_snake(
    buffer: &mut [u8],
    view: &ViewState,
    translator: &dyn PixelToWorld,
    points: &[crate::geom::WorldPoint],
) {
    for pair in points.windows(2) {
        draw_segment(buffer, view, translator, pair[0], pair[1], SNAKE_COLOR);
    }
}

#[inline]
fn put_pixel(buffer: &mut [u8], view: &ViewState, p: PixelPoint, color: [u8; 3]) {
    if p.x < 0 || p.y < 0 || p.x as u32 >= view.width || p.y as u32 >= view.height {
        return;
    }
    let offset = (p.y as usize * view.width as usize + p.x as usize) * 4;
    buffer[offset] = color[0];
    buffer[offset + 1] = color[1];
    buffer[offset + 2] = color[2];
    buffer[offset + 3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::ColorMapMethod;
    use crate::geom::Axis;
    use crate::view::SliceTranslator;
    use crate::volume::GridVolume;

    const W: u32 = 8;
    const H: u32 = 8;

    fn setup(fill: f32) -> (GridVolume, ViewState, SliceTranslator) {
        let count = (W * H * 4) as usize;
        let vol = GridVolume::from_values([W, H, 4], [1.0; 3], vec![fill; count]);
        let view = ViewState::new(W, H, Axis::Z, 1.0);
        let translator = SliceTranslator::new(Axis::Z, 1.0);
        (vol, view, translator)
    }

    fn cfg(colormap: ColorMapMethod, min: f32, max: f32) -> LayerConfig {
        let mut cfg = LayerConfig::default();
        cfg.colormap = colormap;
        cfg.min_visible = min;
        cfg.max_visible = max;
        cfg
    }

    fn pixel(buffer: &[u8], x: u32, y: u32) -> [u8; 4] {
        let o = ((y * W + x) * 4) as usize;
        [buffer[o], buffer[o + 1], buffer[o + 2], buffer[o + 3]]
    }

    #[test]
    fn value_pass_fills_and_forces_opaque_alpha() {
        let (vol, view, tr) = setup(100.0);
        let cfg = cfg(ColorMapMethod::Grayscale, 0.0, 200.0);
        let lut = GrayscaleLut::build(&cfg);
        let mut buffer = vec![0u8; (W * H * 4) as usize];

        draw_into_buffer(
            &mut buffer,
            &view,
            &tr,
            &vol,
            &cfg,
            &lut,
            None,
            &AnnotationStore::default(),
        );

        let px = pixel(&buffer, 3, 3);
        assert_eq!(px[3], 255);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert!(px[0] > 0);
    }

    #[test]
    fn out_of_range_values_leave_pixels_untouched() {
        let (vol, view, tr) = setup(300.0); // above max_visible
        let cfg = cfg(ColorMapMethod::Grayscale, 0.0, 200.0);
        let lut = GrayscaleLut::build(&cfg);
        let mut buffer = vec![7u8; (W * H * 4) as usize];

        draw_into_buffer(
            &mut buffer,
            &view,
            &tr,
            &vol,
            &cfg,
            &lut,
            None,
            &AnnotationStore::default(),
        );
        assert!(buffer.iter().all(|&b| b == 7));
    }

    #[test]
    fn heat_scale_out_of_range_keeps_rgb_but_writes_alpha() {
        let (vol, view, tr) = setup(5.0); // below heat min of 10
        let cfg = cfg(ColorMapMethod::HeatScale, 10.0, 100.0);
        let lut = GrayscaleLut::build(&cfg);
        let mut buffer = vec![0u8; (W * H * 4) as usize];
        for px in buffer.chunks_exact_mut(4) {
            px.copy_from_slice(&[12, 34, 56, 0]);
        }

        draw_into_buffer(
            &mut buffer,
            &view,
            &tr,
            &vol,
            &cfg,
            &lut,
            None,
            &AnnotationStore::default(),
        );

        // The passthrough asymmetry: RGB unchanged, alpha still forced opaque
        let px = pixel(&buffer, 2, 5);
        assert_eq!(&px[..3], &[12, 34, 56]);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn out_of_volume_pixels_stay_untouched() {
        // Volume covers only half the view width
        let vol = GridVolume::from_values([4, H, 4], [1.0; 3], vec![100.0; (4 * H * 4) as usize]);
        let view = ViewState::new(W, H, Axis::Z, 1.0);
        let tr = SliceTranslator::new(Axis::Z, 1.0);
        let cfg = cfg(ColorMapMethod::Grayscale, 0.0, 200.0);
        let lut = GrayscaleLut::build(&cfg);
        let mut buffer = vec![0u8; (W * H * 4) as usize];

        draw_into_buffer(
            &mut buffer,
            &view,
            &tr,
            &vol,
            &cfg,
            &lut,
            None,
            &AnnotationStore::default(),
        );

        assert_ne!(pixel(&buffer, 1, 1)[3], 0);
        assert_eq!(pixel(&buffer, 6, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn selection_overlay_blends_with_roi_opacity() {
        let (mut vol, view, tr) = setup(0.0);
        vol.select([2.0, 2.0, 1.0]);
        let mut cfg = cfg(ColorMapMethod::Grayscale, 0.0, 200.0);
        cfg.opacity = 0.0; // isolate the overlay pass
        cfg.roi_opacity = 1.0;
        let lut = GrayscaleLut::build(&cfg);
        let mut buffer = vec![0u8; (W * H * 4) as usize];

        draw_into_buffer(
            &mut buffer,
            &view,
            &tr,
            &vol,
            &cfg,
            &lut,
            None,
            &AnnotationStore::default(),
        );

        assert_eq!(&pixel(&buffer, 2, 2)[..3], &crate::volume::DEFAULT_SELECT_COLOR);
        assert_eq!(&pixel(&buffer, 3, 3)[..3], &[0, 0, 0]);
    }

    #[test]
    fn annotation_pass_draws_visible_lines_only() {
        let (vol, view, tr) = setup(0.0);
        let cfg = cfg(ColorMapMethod::Grayscale, 0.0, 200.0);
        let lut = GrayscaleLut::build(&cfg);

        let mut annotations = AnnotationStore::default();
        // On-plane line across the top row
        annotations.push_line([0.0, 0.0, 1.0], [5.0, 0.0, 1.0]);
        // Off-plane line (z=3, plane at z=1, half-voxel range 0.5)
        annotations.push_line([0.0, 4.0, 3.0], [5.0, 4.0, 3.0]);

        let mut buffer = vec![0u8; (W * H * 4) as usize];
        draw_into_buffer(&mut buffer, &view, &tr, &vol, &cfg, &lut, None, &annotations);

        assert_eq!(&pixel(&buffer, 2, 0)[..3], &LINE_COLOR);
        assert_eq!(&pixel(&buffer, 2, 4)[..3], &[0, 0, 0]);
    }

    #[test]
    fn snake_paths_rasterize_pairwise_in_their_own_color() {
        let (vol, view, tr) = setup(0.0);
        let cfg = cfg(ColorMapMethod::Grayscale, 0.0, 200.0);
        let lut = GrayscaleLut::build(&cfg);

        let mut annotations = AnnotationStore::default();
        annotations.push_snake(
            [0.0, 0.0, 1.0],
            vec![[0.0, 0.0, 1.0], [2.0, 2.0, 1.0], [4.0, 2.0, 1.0]],
        );

        let mut buffer = vec![0u8; (W * H * 4) as usize];
        draw_into_buffer(&mut buffer, &view, &tr, &vol, &cfg, &lut, None, &annotations);

        assert_eq!(&pixel(&buffer, 1, 1)[..3], &SNAKE_COLOR);
        assert_eq!(&pixel(&buffer, 3, 2)[..3], &SNAKE_COLOR);
    }

    #[test]
    fn wrong_buffer_size_is_rejected_without_panic() {
        let (vol, view, tr) = setup(0.0);
        let cfg = cfg(ColorMapMethod::Grayscale, 0.0, 200.0);
        let lut = GrayscaleLut::build(&cfg);
        let mut buffer = vec![0u8; 16];
        draw_into_buffer(
            &mut buffer,
            &view,
            &tr,
            &vol,
            &cfg,
            &lut,
            None,
            &AnnotationStore::default(),
        );
        assert!(buffer.iter().all(|&b| b == 0));
    }
}
