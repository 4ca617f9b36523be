use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use log::LevelFilter;
use tracing::{error, info};
use vol2heightfield::{ScanParams, error::Result, extract_height_field, vol::read_vol, types::Vector};

/// Convert a volumetric file into a projected 2D height field.
///
/// The volume is scanned along the direction N starting from the point P with
/// a step of |N|. Each pixel stores `heightFieldMaxScan - k`, where k is the
/// first scan step whose voxel lies strictly inside the thresholds.
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    after_help = "Example:\n  vol2heightfield -i lobster.vol -m 60 -M 500 --nx 0 --ny 0.7 --nz -1 \
                  -x 150 -y 0 -z 150 --width 300 --height 300 --heightFieldMaxScan 350 \
                  -o resultingHeightMap.pgm"
)]
struct Args {
    /// Volumetric file (.vol).
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Output raster; the format follows the extension (.pgm, .png).
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Min threshold (exclusive).
    #[arg(long = "thresholdMin", short = 'm', default_value_t = 128, allow_negative_numbers = true)]
    threshold_min: i64,

    /// Max threshold (exclusive).
    #[arg(long = "thresholdMax", short = 'M', default_value_t = 255, allow_negative_numbers = true)]
    threshold_max: i64,

    /// X component of the scan direction.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    nx: f64,

    /// Y component of the scan direction.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    ny: f64,

    /// Z component of the scan direction.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    nz: f64,

    /// X of the scan start point (centre of the height field image).
    #[arg(long = "centerX", short = 'x', default_value_t = 0)]
    center_x: u32,

    /// Y of the scan start point.
    #[arg(long = "centerY", short = 'y', default_value_t = 0)]
    center_y: u32,

    /// Z of the scan start point.
    #[arg(long = "centerZ", short = 'z', default_value_t = 1)]
    center_z: u32,

    /// Columns of the resulting height field image.
    #[arg(long, default_value_t = 100)]
    width: u32,

    /// Rows of the resulting height field image.
    #[arg(long, default_value_t = 100)]
    height: u32,

    /// Maximal scan depth; capped to 255 for 8-bit output.
    #[arg(long = "heightFieldMaxScan", default_value_t = 255)]
    height_field_max_scan: u32,

    /// Fill the background with the depth of the last hit instead of black.
    #[arg(long = "setBackgroundLastDepth")]
    set_background_last_depth: bool,
}

impl Args {
    fn scan_params(&self) -> ScanParams {
        ScanParams::default()
            .with_threshold(self.threshold_min, self.threshold_max)
            .with_direction(Vector::new(self.nx, self.ny, self.nz))
            .with_origin([
                self.center_x as i64,
                self.center_y as i64,
                self.center_z as i64,
            ])
            .with_size(self.width as usize, self.height as usize)
            .with_max_scan(self.height_field_max_scan)
            .with_background_last_depth(self.set_background_last_depth)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    info!("reading input file {}", args.input.display());
    let volume = read_vol(&args.input)?;
    let [size_x, size_y, size_z] = volume.dims();
    info!("volume is {size_x}x{size_y}x{size_z}");

    let outcome = extract_height_field::<u8, u8>(&volume, args.scan_params())?;

    info!("writing height field to {}", args.output.display());
    outcome.field.save(&args.output)?;
    Ok(())
}
