use clap::Parser;
use std::fs;
use tracing::info;

use drmaze::common::Coord;
use drmaze::{Cli, Dir, GridGraph, Layer, LayerDir, MazeIdx, MazeSearch, Pin, Point, RouterConfig, Tech};

/// Three alternating-direction layers with uniform width and pitch, vias
/// allowed everywhere.
fn demo_tech() -> Tech {
    let layers = (0..3i64)
        .map(|z| Layer {
            layer_num: 2 * (z + 1),
            dir: if z % 2 == 0 {
                LayerDir::Horizontal
            } else {
                LayerDir::Vertical
            },
            width: 100,
            pitch: 200,
            min_area: Some(20_000),
        })
        .collect();
    Tech::new(layers, vec![(6_000, 5_000); 2])
}

/// An 8x8x3 grid with planar edges along each layer's preferred direction
/// and full via connectivity.
fn demo_grid(tech: &Tech) -> GridGraph {
    let coords: Vec<Coord> = (0..8i64).map(|i| 200 * i).collect();
    let heights: Vec<Coord> = (0..3i64).map(|i| 150 * i).collect();
    let mut grid = GridGraph::new(tech, coords.clone(), coords, heights);
    let (x_dim, y_dim, z_dim) = grid.dims();
    for z in 0..z_dim {
        for y in 0..y_dim {
            for x in 0..x_dim {
                let idx = MazeIdx::new(x, y, z);
                match tech.layer(z).dir {
                    LayerDir::Horizontal if x + 1 < x_dim => grid.add_edge(idx, Dir::East),
                    LayerDir::Vertical if y + 1 < y_dim => grid.add_edge(idx, Dir::North),
                    _ => {}
                }
                if z + 1 < z_dim {
                    grid.add_edge(idx, Dir::Up);
                }
            }
        }
    }
    grid
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RouterConfig::from_yaml_str(&fs::read_to_string(path)?)?,
        None => RouterConfig::default(),
    };

    let tech = demo_tech();
    let mut grid = demo_grid(&tech);
    let (x_dim, y_dim, z_dim) = grid.dims();

    let mut search = MazeSearch::new(&mut grid, &tech, &config, None);
    let mut conn_comps = vec![MazeIdx::new(0, 0, 0)];
    let pin = Pin {
        access_patterns: vec![MazeIdx::new(6, 5, 2)],
    };
    let mut cc_idx1 = MazeIdx::new(x_dim - 1, y_dim - 1, z_dim - 1);
    let mut cc_idx2 = MazeIdx::new(0, 0, 0);

    match search.search(
        &mut conn_comps,
        &pin,
        &mut cc_idx1,
        &mut cc_idx2,
        Point::new(600, 500),
    ) {
        Some((path, cost)) => {
            info!("routed with cost {cost}, bounding box {cc_idx1:?}..{cc_idx2:?}");
            for idx in &path {
                info!("  via ({}, {}, {})", idx.x, idx.y, idx.z);
            }
        }
        None => info!("no route found"),
    }
    search.stats().print();

    Ok(())
}
