// Main function
raster_tools::sync_main!(run());

use raster_layers::{read_to_layout, TiledLayer};
use raster_tools::{utils::*, Result};

fn run() -> Result<()> {
    // Parse command line
    let args = parse_cmd_line();

    let layer = read_to_layout(&args.inputs, &args.options)?;
    let meta = layer.metadata();
    tracing::info!(
        zoom = meta.zoom,
        key_bounds = %meta.key_bounds,
        crs = %meta.crs,
        "writing layer to {}",
        args.output.display()
    );

    let levels = match args.pyramid {
        Some(end_zoom) => layer.pyramid(end_zoom, args.options.resample)?,
        None => vec![layer],
    };

    for level in &levels {
        // Pyramid levels go to one directory per zoom.
        let dir = match args.pyramid {
            Some(_) => args.output.join(level.metadata().zoom.to_string()),
            None => args.output.clone(),
        };
        let written = write_layer(&dir, level)?;
        print_summary(level, &written);
    }

    Ok(())
}

fn print_summary(layer: &TiledLayer, written: &WriteSummary) {
    let meta = layer.metadata();
    println!(
        "{} tiles ({} bytes) in {}x{} grid at zoom {}, keys {}",
        written.tiles,
        written.bytes,
        meta.layout_definition.tile_layout.layout_cols,
        meta.layout_definition.tile_layout.layout_rows,
        meta.zoom,
        meta.key_bounds,
    );
}

mod args;
use args::parse_cmd_line;
