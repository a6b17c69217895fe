//! This example forms a printable map of Kyiv surroundings with OSM imagery, a couple of overlays
//! and a geodetic grid.
//!
//! Optionally, the first argument is a path to a JSON file with a [`MapFormConfig`]. The map and
//! the temporary tiles are written into `./maps`, downloaded tiles are cached in `.tile_cache`.
//!
//! ```shell
//! cargo run --example form_map -- ./config.json
//! ```

use std::sync::Arc;

use anyhow::Result;
use kartograf::config::GridConfig;
use kartograf::kartograf_types::geo::BoundingBox;
use kartograf::kartograf_types::latlon;
use kartograf::overlay::{Layer, LayerObject, Style, StrokePattern};
use kartograf::{
    Color, FileCacheController, FileTileStore, MapFormConfig, MapFormRequest, MapFormState,
    MapFormer, MapSource, RestTileSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => MapFormConfig::load(path)?,
        None => MapFormConfig {
            grid: Some(GridConfig {
                step_deg: 0.1,
                ..Default::default()
            }),
            ..Default::default()
        },
    };

    let osm = RestTileSource::new("https://tile.openstreetmap.org/{z}/{x}/{y}.png")?
        .with_cache(FileCacheController::new(".tile_cache", None)?);

    let former = MapFormer::new(config, Arc::new(FileTileStore::new("./maps")?))
        .with_state_observer(Arc::new(|state: &MapFormState| {
            log::info!("{} ({}%)", state.progress_message, state.progress)
        }));

    let bbox = BoundingBox::new(50.55, 50.35, 30.75, 30.35)?;
    let preflight = former.preflight(&bbox, 12)?;
    log::info!(
        "The map needs {} tiles, about {} MiB",
        preflight.tile_count,
        preflight.estimated_bytes / 1024 / 1024
    );

    // Overlays can be given in code or parsed from JSON.
    let route = Layer::new(
        "route",
        vec![
            LayerObject::Line {
                points: vec![
                    latlon!(50.4501, 30.5234),
                    latlon!(50.4433, 30.5516),
                    latlon!(50.4016, 30.6305),
                ],
                style: Style::new(Color::RED, 4.0).with_pattern(StrokePattern::Arrows),
            },
            LayerObject::Radius {
                center: latlon!(50.4501, 30.5234),
                radius: 3000.0,
                style: Style::new(Color::BLUE, 2.0).with_fill_alpha(32),
            },
        ],
    );
    let markers: Layer = serde_json::from_str(
        r##"{
            "name": "points",
            "objects": [
                {"type": "marker", "position": {"lat": 50.4501, "lon": 30.5234},
                 "icon": {"builtin": "pin"}, "color": "#D02020", "name": "Maidan"},
                {"type": "text", "position": {"lat": 50.52, "lon": 30.40},
                 "text": "Kyiv", "size": 40.0, "color": "#202020"}
            ]
        }"##,
    )?;

    let map = former
        .form_map(&MapFormRequest {
            bounding_box: bbox,
            zoom: 12,
            sources: vec![MapSource::new("osm", Arc::new(osm))],
            layers: vec![route, markers],
            output_name: "kyiv".into(),
        })
        .await?;

    log::info!(
        "Map saved to {:?}, it covers {:?}",
        map.path,
        map.bounding_box
    );

    Ok(())
}
