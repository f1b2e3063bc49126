use raster_layers::layout::{DEFAULT_RESOLUTION_THRESHOLD, DEFAULT_TILE_SIZE};
use raster_layers::prelude::*;
use raster_tools::cli::args::{invalid_value, parse_opt};
use raster_tools::{arg, args_parser, opt};
use std::path::PathBuf;

/// Program arguments
pub struct Args {
    /// Raster inputs
    pub inputs: Vec<String>,
    /// Output directory
    pub output: PathBuf,
    pub options: IngestOptions,
    /// Coarsest zoom of a pyramid built from a global layer
    pub pyramid: Option<u32>,
}

pub fn parse_cmd_line() -> Args {
    let matches = args_parser!("raster-ingest")
        .about("Ingest rasters into a tiled layer.")
        .arg(
            arg!("input")
                .required(true)
                .multiple(true)
                .help("Input paths (raster datasets)"),
        )
        .arg(
            opt!("output")
                .short("o")
                .required(true)
                .help("Output directory"),
        )
        .arg(
            opt!("layout")
                .possible_values(&["global", "local"])
                .help("Tiling scheme (default: local)"),
        )
        .arg(opt!("tile size").help("Tile width and height (default: 256 pixels)"))
        .arg(opt!("tile cols").help("Tile width, overrides tile size"))
        .arg(opt!("tile rows").help("Tile height, overrides tile size"))
        .arg(opt!("zoom").help("Zoom of a global layout (default: from the source resolution)"))
        .arg(
            opt!("resolution threshold")
                .help("Slack when matching source resolution to a zoom (default: 0.1)"),
        )
        .arg(
            opt!("pyramid")
                .requires("layout")
                .help("Also build coarser zoom levels down to this zoom (global layout only)"),
        )
        .arg(opt!("target crs").help("Reproject sources into this CRS (EPSG:<code> or PROJ.4)"))
        .arg(opt!("resample").help("Resampling method (default: nearest)"))
        .arg(
            opt!("backend")
                .possible_values(&["native", "gdal"])
                .help("Raster decoder (default: native)"),
        )
        .get_matches();

    let inputs = matches
        .values_of("input")
        .map(|vals| vals.map(String::from).collect())
        .unwrap_or_default();
    let output = PathBuf::from(matches.value_of("output").unwrap_or_default());

    let tile_size = parse_opt(&matches, "tile size").unwrap_or(DEFAULT_TILE_SIZE);
    let tile_cols = parse_opt(&matches, "tile cols").unwrap_or(tile_size);
    let tile_rows = parse_opt(&matches, "tile rows").unwrap_or(tile_size);
    let zoom = parse_opt(&matches, "zoom");
    let threshold = parse_opt(&matches, "resolution threshold").unwrap_or(DEFAULT_RESOLUTION_THRESHOLD);

    let layout = matches.value_of("layout").unwrap_or("local");
    let policy = LayoutPolicy::named(layout, tile_cols, tile_rows, zoom, threshold)
        .unwrap_or_else(|e| invalid_value(&e.to_string()));

    let options = IngestOptions {
        policy,
        target_crs: matches.value_of("target crs").map(String::from),
        resample: parse_opt(&matches, "resample").unwrap_or_default(),
        backend: parse_opt(&matches, "backend").unwrap_or_default(),
    };

    let pyramid = parse_opt(&matches, "pyramid");
    if pyramid.is_some() && !matches!(options.policy, LayoutPolicy::Global { .. }) {
        invalid_value("--pyramid needs --layout global");
    }

    Args {
        inputs,
        output,
        options,
        pyramid,
    }
}
