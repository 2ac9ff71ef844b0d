//! Maze routing core of a detailed router: a weighted A* search over a
//! bit-packed 3-D routing grid, with design-rule-driven edge costs,
//! forbidden via/turn geometries, and a fixed-size back-trace buffer that
//! delays predecessor commits so recently diverged wavefront states can
//! still be compared.
//!
//! The owning worker builds a [`grid::GridGraph`] and a [`tech::Tech`] for
//! its region, then runs [`astar::MazeSearch::search`] once per pin,
//! feeding the returned nodes back as the next search's connected
//! component.

pub mod astar;
pub mod common;
pub mod config;
pub mod grid;
pub mod stat;
pub mod tech;
pub mod wavefront;

pub use astar::MazeSearch;
pub use common::{Coord, Cost, Dir, MazeIdx, Pin, Point};
pub use config::{Cli, DrWorker, RouterConfig};
pub use grid::GridGraph;
pub use tech::{Layer, LayerDir, Tech};
pub use wavefront::{Wavefront, WavefrontCell};
