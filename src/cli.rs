// ============================================================================
// SliceView CLI — headless slice rendering via command-line arguments
// ============================================================================
//
// Usage examples:
//   sliceview --input brain.f32 --dims 256x256x160 --output slice.png
//   sliceview -i scan.f32 --dims 128x128x64 --axis y --slice 40 -o out.png
//   sliceview --phantom --colormap heatScale --min-visible 20 -o heat.png
//
// All rendering runs synchronously on the current thread using CPU-only
// paths; no window is ever opened.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::geom::Axis;
use crate::layer::SliceLayer;
use crate::lut::ColorTableRegistry;
use crate::view::{SliceTranslator, ViewState};
use crate::volume::{GridVolume, VolumeSource};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// SliceView headless slice renderer.
///
/// Render one 2D slice of a volumetric scan to a PNG — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "sliceview",
    about = "SliceView headless volume slice renderer",
    long_about = "Render a 2D slice of a raw volumetric scan to an image file.\n\
                  Input volumes are raw little-endian f32 voxel buffers in\n\
                  x-fastest order; pass --dims to describe their shape.\n\n\
                  Example:\n  \
                  sliceview --input brain.f32 --dims 256x256x160 --output slice.png\n  \
                  sliceview --phantom --colormap heatScale -o heat.png"
)]
pub struct CliArgs {
    /// Input volume: raw little-endian f32 voxels, x varying fastest.
    #[arg(short, long, value_name = "FILE", conflicts_with = "phantom")]
    pub input: Option<PathBuf>,

    /// Volume dimensions as WIDTHxHEIGHTxDEPTH (required with --input).
    #[arg(long, value_name = "WxHxD", requires = "input")]
    pub dims: Option<String>,

    /// Voxel size along x,y,z in world units.
    #[arg(long, default_value = "1,1,1", value_name = "X,Y,Z")]
    pub spacing: String,

    /// Render a built-in spherical test volume instead of loading a file.
    #[arg(long)]
    pub phantom: bool,

    /// Slice normal axis: x, y, or z.
    #[arg(short, long, default_value = "z", value_name = "AXIS")]
    pub axis: String,

    /// Slice index along the normal axis. Defaults to the middle slice.
    #[arg(short, long, value_name = "INDEX")]
    pub slice: Option<u32>,

    /// Color mapping method: grayscale, heatScale, or lut.
    #[arg(long, default_value = "grayscale", value_name = "METHOD")]
    pub colormap: String,

    /// Sampling method: nearest, trilinear, sinc, or magnitude.
    #[arg(long, default_value = "nearest", value_name = "METHOD")]
    pub sample: String,

    /// Sigmoid center for the grayscale curve, in normalized [0,1].
    #[arg(short, long, default_value_t = 0.25)]
    pub brightness: f32,

    /// Sigmoid steepness for the grayscale curve.
    #[arg(short, long, default_value_t = 12.0)]
    pub contrast: f32,

    /// Lower bound of the visible value window. Defaults to the volume minimum.
    #[arg(long, value_name = "VALUE")]
    pub min_visible: Option<f32>,

    /// Upper bound of the visible value window. Defaults to the volume maximum.
    #[arg(long, value_name = "VALUE")]
    pub max_visible: Option<f32>,

    /// Skip exact-zero voxels regardless of the visible window.
    #[arg(long)]
    pub clear_zero: bool,

    /// Layer opacity in [0, 1].
    #[arg(long, default_value_t = 1.0)]
    pub opacity: f32,

    /// Output image path (PNG).
    #[arg(short, long, required = true, value_name = "FILE")]
    pub output: PathBuf,

    /// Print volume statistics and timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one headless render and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    match run_inner(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            crate::log_err!("{}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run_inner(args: &CliArgs) -> Result<(), String> {
    let start = Instant::now();

    // -- Step 1: Load or synthesize the volume ---------------------------
    let spacing = parse_spacing(&args.spacing)?;
    let volume = match &args.input {
        Some(path) => {
            let dims_arg = args
                .dims
                .as_deref()
                .ok_or_else(|| "--dims is required with --input".to_string())?;
            let dims = parse_dims(dims_arg)?;
            load_raw_volume(path, dims, spacing)?
        }
        None => {
            if !args.phantom {
                return Err("give --input FILE --dims WxHxD, or --phantom".to_string());
            }
            phantom_volume([64, 64, 64], spacing)
        }
    };
    let dims = volume.dims();

    if args.verbose {
        let (lo, hi) = volume.value_range();
        println!(
            "volume {}x{}x{}  values [{:.2}, {:.2}]",
            dims[0], dims[1], dims[2], lo, hi
        );
    }

    // -- Step 2: Configure the layer -------------------------------------
    let axis = parse_axis(&args.axis)?;
    let registry = ColorTableRegistry::default();

    let mut layer = SliceLayer::new();
    layer.init_visible_range_from(&volume);
    let err = |e: crate::error::LayerError| e.to_string();
    layer.set_colormap_method_by_name(&args.colormap).map_err(err)?;
    layer.set_sample_method_by_name(&args.sample).map_err(err)?;
    layer.set_brightness(args.brightness).map_err(err)?;
    layer.set_contrast(args.contrast).map_err(err)?;
    if let (Some(min), Some(max)) = (args.min_visible, args.max_visible) {
        layer.set_visible_range(min, max).map_err(err)?;
    } else {
        if let Some(min) = args.min_visible {
            layer.set_min_visible_value(min).map_err(err)?;
        }
        if let Some(max) = args.max_visible {
            layer.set_max_visible_value(max).map_err(err)?;
        }
    }
    layer.set_clear_zero(args.clear_zero);
    layer.set_opacity(args.opacity).map_err(err)?;

    // -- Step 3: Build the view ------------------------------------------
    let normal = axis.index();
    let slice_index = match args.slice {
        Some(i) => {
            if i >= dims[normal] {
                return Err(format!(
                    "slice {} out of range for axis {} (0..{})",
                    i,
                    args.axis,
                    dims[normal]
                ));
            }
            i
        }
        None => dims[normal] / 2,
    };
    let mut slice_idx = [0i32; 3];
    slice_idx[normal] = slice_index as i32;
    let plane_position = volume.index_to_world(slice_idx)[normal];

    let (ax, ay) = match axis {
        Axis::X => (1, 2),
        Axis::Y => (0, 2),
        Axis::Z => (0, 1),
    };
    let width = (dims[ax] as f32 * spacing[ax]).ceil() as u32;
    let height = (dims[ay] as f32 * spacing[ay]).ceil() as u32;
    let view = ViewState::new(width, height, axis, plane_position);
    let translator = SliceTranslator::new(axis, plane_position);

    // -- Step 4: Render and save -----------------------------------------
    let mut buffer = vec![0u8; width as usize * height as usize * 4];
    layer.draw_into_buffer(&mut buffer, &view, &translator, &volume, &registry);

    let image = image::RgbaImage::from_raw(width, height, buffer)
        .ok_or_else(|| "rendered buffer has invalid dimensions".to_string())?;
    image
        .save(&args.output)
        .map_err(|e| format!("could not save '{}': {}", args.output.display(), e))?;

    crate::log_info!(
        "rendered {}x{} slice {} along {} to {}",
        width,
        height,
        slice_index,
        args.axis,
        args.output.display()
    );
    if args.verbose {
        println!(
            "→ {} ({:.0}ms)",
            args.output.display(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_axis(name: &str) -> Result<Axis, String> {
    match name.to_lowercase().as_str() {
        "x" => Ok(Axis::X),
        "y" => Ok(Axis::Y),
        "z" => Ok(Axis::Z),
        _ => Err(format!("\"{}\" should be x, y, or z", name)),
    }
}

/// Parse "WxHxD" into volume dimensions.
fn parse_dims(text: &str) -> Result<[u32; 3], String> {
    let parts: Vec<&str> = text.split(['x', 'X']).collect();
    if parts.len() != 3 {
        return Err(format!("\"{}\" should look like 256x256x160", text));
    }
    let mut dims = [0u32; 3];
    for (slot, part) in dims.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("\"{}\" is not a valid dimension", part))?;
        if *slot == 0 {
            return Err("dimensions must be non-zero".to_string());
        }
    }
    Ok(dims)
}

/// Parse "X,Y,Z" (or a single number for isotropic voxels) into voxel sizes.
fn parse_spacing(text: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = text.split(',').collect();
    let parse_one = |part: &str| -> Result<f32, String> {
        let v = part
            .trim()
            .parse::<f32>()
            .map_err(|_| format!("\"{}\" is not a valid voxel size", part))?;
        if !v.is_finite() || v <= 0.0 {
            return Err(format!("voxel size {} must be positive", v));
        }
        Ok(v)
    };
    match parts.as_slice() {
        [one] => {
            let v = parse_one(one)?;
            Ok([v, v, v])
        }
        [x, y, z] => Ok([parse_one(x)?, parse_one(y)?, parse_one(z)?]),
        _ => Err(format!("\"{}\" should look like 1,1,1.5", text)),
    }
}

/// Load a raw little-endian f32 voxel buffer, x varying fastest.
fn load_raw_volume(
    path: &std::path::Path,
    dims: [u32; 3],
    spacing: [f32; 3],
) -> Result<GridVolume, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    let count = dims[0] as usize * dims[1] as usize * dims[2] as usize;
    if bytes.len() != count * 4 {
        return Err(format!(
            "'{}' holds {} bytes but {}x{}x{} voxels need {}",
            path.display(),
            bytes.len(),
            dims[0],
            dims[1],
            dims[2],
            count * 4
        ));
    }
    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(GridVolume::from_values(dims, spacing, values))
}

/// Spherical test volume: value falls off linearly from 255 at the center
/// to 0 at half the smallest dimension.
fn phantom_volume(dims: [u32; 3], spacing: [f32; 3]) -> GridVolume {
    let center = [
        dims[0] as f32 / 2.0,
        dims[1] as f32 / 2.0,
        dims[2] as f32 / 2.0,
    ];
    let radius = dims.iter().copied().min().unwrap_or(1) as f32 / 2.0;
    let count = dims[0] as usize * dims[1] as usize * dims[2] as usize;
    let mut values = Vec::with_capacity(count);
    for z in 0..dims[2] {
        for y in 0..dims[1] {
            for x in 0..dims[0] {
                let dx = x as f32 - center[0];
                let dy = y as f32 - center[1];
                let dz = z as f32 - center[2];
                let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                values.push(((1.0 - dist / radius).max(0.0) * 255.0).round());
            }
        }
    }
    GridVolume::from_values(dims, spacing, values)
}
