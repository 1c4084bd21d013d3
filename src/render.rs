use crate::config::AppConfig;
use crate::map::MapView;
use crate::selector::Selector;
use anyhow::{Context, Result};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::Rect;
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

// Constants for Web Mercator
const TILE_SIZE: u32 = 256;
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Renders choropleth tiles for every selectable statistic. Returns the number of tiles written.
pub fn generate_tiles(config: &AppConfig, view: &MapView, selector: &Selector) -> Result<usize> {
    info!("Generating tiles from min_zoom {} to max_zoom {}...", config.output.min_zoom, config.output.max_zoom);

    let Some(bounds) = feature_bounds(view) else {
        info!("No geometry loaded, nothing to render");
        return Ok(0);
    };

    let alpha = (config.style.fill_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut written = 0;

    // output/tiles/{statistic}/z/x/y.png
    for statistic in selector.values() {
        info!("Rendering statistic: {}", statistic);
        for zoom in config.output.min_zoom..=config.output.max_zoom {
            written += render_zoom_level(&config.output.tile_dir, view, statistic, zoom, &bounds, alpha)?;
        }
    }

    info!("Wrote {} tiles", written);
    Ok(written)
}

fn feature_bounds(view: &MapView) -> Option<Rect<f64>> {
    view.features().iter()
        .filter_map(|f| f.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                geo::Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                geo::Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
}

fn render_zoom_level(
    tile_dir: &Path,
    view: &MapView,
    statistic: &str,
    zoom: u8,
    bounds: &Rect<f64>,
    alpha: u8,
) -> Result<usize> {
    let scale = view.scale(statistic);

    // North edge has the smaller tile row
    let (x0, y0, _, _) = lat_lon_to_tile_pixel(bounds.max().y, bounds.min().x, zoom);
    let (x1, y1, _, _) = lat_lon_to_tile_pixel(bounds.min().y, bounds.max().x, zoom);

    let tiles: Vec<(u32, u32)> = (x0..=x1)
        .flat_map(|x| (y0..=y1).map(move |y| (x, y)))
        .collect();
    debug!("{} z{}: {} candidate tiles", statistic, zoom, tiles.len());

    let z_dir = tile_dir.join(statistic).join(zoom.to_string());

    let saved: Vec<bool> = tiles.par_iter()
        .map(|&(x, y)| {
            let mut img: RgbaImage = ImageBuffer::new(TILE_SIZE, TILE_SIZE);
            let mut covered = false;

            for py in 0..TILE_SIZE {
                for px in 0..TILE_SIZE {
                    let (lat, lon) = tile_pixel_to_lat_lon(x, y, px as f64 + 0.5, py as f64 + 0.5, zoom);
                    if let Some(feature) = view.feature_at(lon, lat) {
                        let rgb = view.fill(feature, statistic, scale.as_ref());
                        img.put_pixel(px, py, Rgba([rgb.0, rgb.1, rgb.2, alpha]));
                        covered = true;
                    }
                }
            }

            if !covered {
                return Ok(false);
            }

            let x_dir = z_dir.join(x.to_string());
            fs::create_dir_all(&x_dir)
                .with_context(|| format!("Failed to create tile directory {:?}", x_dir))?;
            let path = x_dir.join(format!("{}.png", y));
            img.save(&path)
                .with_context(|| format!("Failed to save tile {:?}", path))?;
            Ok(true)
        })
        .collect::<Result<_>>()?;

    Ok(saved.into_iter().filter(|s| *s).count())
}

// Coordinate conversions
fn lat_lon_to_tile_pixel(lat: f64, lon: f64, zoom: u8) -> (u32, u32, u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x_t = ((lon + 180.0) / 360.0 * n).clamp(0.0, n - 1e-9);
    let y_t = ((1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n).clamp(0.0, n - 1e-9);

    let tx = x_t as u32;
    let ty = y_t as u32;

    let px = ((x_t - tx as f64) * TILE_SIZE as f64) as u32;
    let py = ((y_t - ty as f64) * TILE_SIZE as f64) as u32;

    (tx, ty, px, py)
}

fn tile_pixel_to_lat_lon(tx: u32, ty: u32, px: f64, py: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let x_t = tx as f64 + px / TILE_SIZE as f64;
    let y_t = ty as f64 + py / TILE_SIZE as f64;

    let lon = x_t / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y_t / n)).sinh().atan().to_degrees();
    (lat, lon)
}
