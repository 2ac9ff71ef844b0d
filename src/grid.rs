use crate::common::{Coord, Dir, MazeIdx, Point, DIR_MASK};
use crate::tech::{LayerDir, Tech};

// One u64 word per cell. Edge-indexed flags are stored once, on the lower
// cell of each edge, in canonical E/N/U form; W/S/D lookups are redirected
// to the neighbor's opposite bit. Layout:
//
//   bits  0..2   edge exists            (E, N, U)
//   bits  3..5   committed predecessor direction
//   bit   6      src
//   bit   7      dst
//   bits  8..10  grid cost              (E, N, U)
//   bits 11..13  DRC cost               (E, N, U)
//   bits 14..16  marker cost            (E, N, U)
//   bits 17..19  shape cost             (E, N, U)
//   bits 20..22  blocked                (E, N, U)
//   bits 23..25  guide                  (E, N, U)
const EDGE_BASE: u32 = 0;
const PREV_DIR_SHIFT: u32 = 3;
const PREV_DIR_MASK: u64 = (DIR_MASK as u64) << PREV_DIR_SHIFT;
const SRC_BIT: u32 = 6;
const DST_BIT: u32 = 7;
const GRID_COST_BASE: u32 = 8;
const DRC_COST_BASE: u32 = 11;
const MARKER_COST_BASE: u32 = 14;
const SHAPE_COST_BASE: u32 = 17;
const BLOCK_BASE: u32 = 20;
const GUIDE_BASE: u32 = 23;

const STATUS_MASK: u64 = PREV_DIR_MASK | (1 << SRC_BIT) | (1 << DST_BIT);

/// Dense 3-D routing grid: per-cell flag words, track coordinates, and the
/// per-layer metadata the cost model reads on every expansion.
#[derive(Debug, Clone)]
pub struct GridGraph {
    x_dim: usize,
    y_dim: usize,
    z_dim: usize,
    bits: Vec<u64>,
    x_coords: Vec<Coord>,
    y_coords: Vec<Coord>,
    z_heights: Vec<Coord>,
    z_dirs: Vec<LayerDir>,
    layer_nums: Vec<i64>,
    half_via_enc_area: Vec<(Coord, Coord)>,
}

impl GridGraph {
    /// Builds an empty grid over the given track coordinates. Layer
    /// metadata is copied out of `tech`, which must describe one layer per
    /// entry of `z_heights`.
    pub fn new(tech: &Tech, x_coords: Vec<Coord>, y_coords: Vec<Coord>, z_heights: Vec<Coord>) -> Self {
        assert_eq!(tech.layers().len(), z_heights.len());
        let (x_dim, y_dim, z_dim) = (x_coords.len(), y_coords.len(), z_heights.len());
        let z_dirs = tech.layers().iter().map(|layer| layer.dir).collect();
        let layer_nums = tech.layers().iter().map(|layer| layer.layer_num).collect();
        let half_via_enc_area = (0..z_dim.saturating_sub(1))
            .map(|z| (tech.half_via_enc_area(z, true), tech.half_via_enc_area(z, false)))
            .collect();
        Self {
            x_dim,
            y_dim,
            z_dim,
            bits: vec![0; x_dim * y_dim * z_dim],
            x_coords,
            y_coords,
            z_heights,
            z_dirs,
            layer_nums,
            half_via_enc_area,
        }
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        (self.x_dim, self.y_dim, self.z_dim)
    }

    /// Database-unit location of track crossing `(x, y)`.
    pub fn point(&self, x: usize, y: usize) -> Point {
        Point::new(self.x_coords[x], self.y_coords[y])
    }

    /// Database-unit height of layer `z`, used by the heuristic's vertical
    /// distance term.
    pub fn z_height(&self, z: usize) -> Coord {
        self.z_heights[z]
    }

    pub fn layer_num(&self, z: usize) -> i64 {
        self.layer_nums[z]
    }

    /// Preferred routing axis of layer `z`.
    pub fn z_dir(&self, z: usize) -> LayerDir {
        self.z_dirs[z]
    }

    /// Half enclosure area of the via between layers `z` and `z + 1`.
    pub fn half_via_enc_area(&self, z: usize, is_top: bool) -> Coord {
        let (top, bottom) = self.half_via_enc_area[z];
        if is_top {
            top
        } else {
            bottom
        }
    }

    /// Physical length of the edge leaving `idx` in direction `dir`. Only
    /// meaningful for edges that exist.
    pub fn edge_length(&self, idx: MazeIdx, dir: Dir) -> Coord {
        let MazeIdx { x, y, z } = idx;
        match dir {
            Dir::East => self.x_coords[x + 1] - self.x_coords[x],
            Dir::West => self.x_coords[x] - self.x_coords[x - 1],
            Dir::North => self.y_coords[y + 1] - self.y_coords[y],
            Dir::South => self.y_coords[y] - self.y_coords[y - 1],
            Dir::Up => self.z_heights[z + 1] - self.z_heights[z],
            Dir::Down => self.z_heights[z] - self.z_heights[z - 1],
            Dir::Unknown => 0,
        }
    }

    fn word_idx(&self, idx: MazeIdx) -> usize {
        debug_assert!(idx.x < self.x_dim && idx.y < self.y_dim && idx.z < self.z_dim);
        (idx.z * self.y_dim + idx.y) * self.x_dim + idx.x
    }

    /// Redirects a (cell, direction) pair to the cell that stores the edge
    /// bit and the canonical bit offset (E=0, N=1, U=2) within a flag
    /// group.
    fn correct(&self, idx: MazeIdx, dir: Dir) -> Option<(MazeIdx, u32)> {
        match dir {
            Dir::East => Some((idx, 0)),
            Dir::North => Some((idx, 1)),
            Dir::Up => Some((idx, 2)),
            Dir::West => (idx.x > 0).then(|| (idx.stepped(Dir::West), 0)),
            Dir::South => (idx.y > 0).then(|| (idx.stepped(Dir::South), 1)),
            Dir::Down => (idx.z > 0).then(|| (idx.stepped(Dir::Down), 2)),
            Dir::Unknown => None,
        }
    }

    fn get_edge_flag(&self, idx: MazeIdx, dir: Dir, base: u32) -> bool {
        match self.correct(idx, dir) {
            Some((cell, offset)) => (self.bits[self.word_idx(cell)] >> (base + offset)) & 1 == 1,
            None => false,
        }
    }

    fn set_edge_flag(&mut self, idx: MazeIdx, dir: Dir, base: u32, value: bool) {
        if let Some((cell, offset)) = self.correct(idx, dir) {
            let word_idx = self.word_idx(cell);
            let word = &mut self.bits[word_idx];
            if value {
                *word |= 1 << (base + offset);
            } else {
                *word &= !(1 << (base + offset));
            }
        }
    }

    fn get_cell_bit(&self, idx: MazeIdx, bit: u32) -> bool {
        (self.bits[self.word_idx(idx)] >> bit) & 1 == 1
    }

    fn set_cell_bit(&mut self, idx: MazeIdx, bit: u32, value: bool) {
        let word_idx = self.word_idx(idx);
        let word = &mut self.bits[word_idx];
        if value {
            *word |= 1 << bit;
        } else {
            *word &= !(1 << bit);
        }
    }

    pub fn has_edge(&self, idx: MazeIdx, dir: Dir) -> bool {
        self.get_edge_flag(idx, dir, EDGE_BASE)
    }

    pub fn add_edge(&mut self, idx: MazeIdx, dir: Dir) {
        debug_assert!(idx.try_stepped(dir, self.dims()).is_some());
        self.set_edge_flag(idx, dir, EDGE_BASE, true);
    }

    pub fn remove_edge(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, EDGE_BASE, false);
    }

    pub fn has_grid_cost(&self, idx: MazeIdx, dir: Dir) -> bool {
        self.get_edge_flag(idx, dir, GRID_COST_BASE)
    }

    pub fn set_grid_cost(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, GRID_COST_BASE, true);
    }

    pub fn reset_grid_cost(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, GRID_COST_BASE, false);
    }

    pub fn has_drc_cost(&self, idx: MazeIdx, dir: Dir) -> bool {
        self.get_edge_flag(idx, dir, DRC_COST_BASE)
    }

    pub fn set_drc_cost(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, DRC_COST_BASE, true);
    }

    pub fn reset_drc_cost(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, DRC_COST_BASE, false);
    }

    pub fn has_marker_cost(&self, idx: MazeIdx, dir: Dir) -> bool {
        self.get_edge_flag(idx, dir, MARKER_COST_BASE)
    }

    pub fn set_marker_cost(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, MARKER_COST_BASE, true);
    }

    pub fn reset_marker_cost(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, MARKER_COST_BASE, false);
    }

    pub fn has_shape_cost(&self, idx: MazeIdx, dir: Dir) -> bool {
        self.get_edge_flag(idx, dir, SHAPE_COST_BASE)
    }

    pub fn set_shape_cost(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, SHAPE_COST_BASE, true);
    }

    pub fn reset_shape_cost(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, SHAPE_COST_BASE, false);
    }

    pub fn is_blocked(&self, idx: MazeIdx, dir: Dir) -> bool {
        self.get_edge_flag(idx, dir, BLOCK_BASE)
    }

    pub fn set_blocked(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, BLOCK_BASE, true);
    }

    pub fn reset_blocked(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, BLOCK_BASE, false);
    }

    pub fn has_guide(&self, idx: MazeIdx, dir: Dir) -> bool {
        self.get_edge_flag(idx, dir, GUIDE_BASE)
    }

    pub fn set_guide(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, GUIDE_BASE, true);
    }

    pub fn reset_guide(&mut self, idx: MazeIdx, dir: Dir) {
        self.set_edge_flag(idx, dir, GUIDE_BASE, false);
    }

    pub fn is_src(&self, idx: MazeIdx) -> bool {
        self.get_cell_bit(idx, SRC_BIT)
    }

    pub fn set_src(&mut self, idx: MazeIdx) {
        self.set_cell_bit(idx, SRC_BIT, true);
    }

    pub fn reset_src(&mut self, idx: MazeIdx) {
        self.set_cell_bit(idx, SRC_BIT, false);
    }

    pub fn is_dst(&self, idx: MazeIdx) -> bool {
        self.get_cell_bit(idx, DST_BIT)
    }

    pub fn set_dst(&mut self, idx: MazeIdx) {
        self.set_cell_bit(idx, DST_BIT, true);
    }

    pub fn reset_dst(&mut self, idx: MazeIdx) {
        self.set_cell_bit(idx, DST_BIT, false);
    }

    /// The committed predecessor direction of `idx`; `Unknown` until the
    /// search commits one.
    pub fn prev_astar_node_dir(&self, idx: MazeIdx) -> Dir {
        Dir::from_bits(((self.bits[self.word_idx(idx)] >> PREV_DIR_SHIFT) & DIR_MASK as u64) as u8)
    }

    pub fn set_prev_astar_node_dir(&mut self, idx: MazeIdx, dir: Dir) {
        let word_idx = self.word_idx(idx);
        let word = &mut self.bits[word_idx];
        *word = (*word & !PREV_DIR_MASK) | ((dir as u64) << PREV_DIR_SHIFT);
    }

    /// Clears all committed predecessor directions.
    pub fn reset_prev_astar_node_dirs(&mut self) {
        for word in &mut self.bits {
            *word &= !PREV_DIR_MASK;
        }
    }

    /// Clears every per-search field: predecessor directions and the
    /// src/dst marks. Edge structure and cost flags are untouched.
    pub fn reset_status(&mut self) {
        for word in &mut self.bits {
            *word &= !STATUS_MASK;
        }
    }
}
