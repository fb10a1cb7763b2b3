//! Placement of tiles on a square grid centred at the origin.

use glam::{IVec2, Vec3};
use terra_config::FieldConfig;

/// One grid slot: its integer coordinate and world-space origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridTile {
    pub coordinate: IVec2,
    pub world_position: Vec3,
}

/// Tiles `(i, j)` for `i, j` in `[-radius, radius]`, row-major by `i` then
/// `j`, placed at `(i * width, 0, j * length)`.
///
/// Coordinates are `i32`, so a radius above `i32::MAX` is clamped to it.
/// Validated configurations never get close.
pub fn tile_grid(radius: u32, width: f32, length: f32) -> impl Iterator<Item = GridTile> {
    let k = i32::try_from(radius).unwrap_or(i32::MAX);
    (-k..=k).flat_map(move |i| {
        (-k..=k).map(move |j| GridTile {
            coordinate: IVec2::new(i, j),
            world_position: Vec3::new(i as f32 * width, 0.0, j as f32 * length),
        })
    })
}

/// [`tile_grid`] for a field configuration, lifted to its base elevation.
pub fn tile_grid_for(config: &FieldConfig) -> impl Iterator<Item = GridTile> {
    let elevation = config.base_elevation;
    tile_grid(config.radius, config.tile_width, config.tile_length).map(move |mut tile| {
        tile.world_position.y = elevation;
        tile
    })
}
