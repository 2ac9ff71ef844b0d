use tracing::{debug, instrument, trace, warn};

use crate::common::{
    Coord, Cost, Dir, MazeIdx, Pin, Point, COORD_INF, DIR_BIT_SIZE, DIR_MASK,
    WAVEFRONT_BUFFER_SIZE,
};
use crate::config::{DrWorker, RouterConfig, GF14_PROCESS_NODE};
use crate::grid::GridGraph;
use crate::stat::SearchStats;
use crate::tech::{LayerDir, Tech};
use crate::wavefront::{Wavefront, WavefrontCell};

/// A* maze search over one routing region. Borrows the grid mutably for
/// the predecessor commits; the technology rules, the cost constants, and
/// the worker view are read-only.
pub struct MazeSearch<'a> {
    grid: &'a mut GridGraph,
    tech: &'a Tech,
    config: &'a RouterConfig,
    worker: Option<&'a DrWorker>,
    wavefront: Wavefront,
    stats: SearchStats,
}

impl<'a> MazeSearch<'a> {
    pub fn new(
        grid: &'a mut GridGraph,
        tech: &'a Tech,
        config: &'a RouterConfig,
        worker: Option<&'a DrWorker>,
    ) -> Self {
        Self {
            grid,
            tech,
            config,
            worker,
            wavefront: Wavefront::new(),
            stats: SearchStats::default(),
        }
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Routes from the net's connected component to the next pin. Returns
    /// the path (turn points and endpoints, destination first) and its
    /// accumulated cost, or `None` when the wavefront empties without
    /// reaching an access pattern.
    ///
    /// Every node the route traverses is appended to `conn_comps` so the
    /// caller can seed the next search with it, and `cc_idx1`/`cc_idx2`
    /// are widened to the bounding box of the new route.
    #[instrument(
        skip_all,
        name = "maze_search",
        fields(
            conn_comps = conn_comps.len(),
            access_patterns = next_pin.access_patterns.len()
        ),
        level = "debug"
    )]
    pub fn search(
        &mut self,
        conn_comps: &mut Vec<MazeIdx>,
        next_pin: &Pin,
        cc_idx1: &mut MazeIdx,
        cc_idx2: &mut MazeIdx,
        center: Point,
    ) -> Option<(Vec<MazeIdx>, Cost)> {
        self.stats.reset();

        let (x_dim, y_dim, z_dim) = self.grid.dims();
        let mut dst_idx1 = MazeIdx::new(x_dim - 1, y_dim - 1, z_dim - 1);
        let mut dst_idx2 = MazeIdx::new(0, 0, 0);
        for &ap in &next_pin.access_patterns {
            dst_idx1 = dst_idx1.elementwise_min(ap);
            dst_idx2 = dst_idx2.elementwise_max(ap);
            self.grid.set_dst(ap);
        }

        self.wavefront.cleanup();
        for &idx in conn_comps.iter() {
            if self.grid.is_dst(idx) {
                debug!("destination already covered at {idx:?}");
                return Some((vec![idx], 0));
            }
            // Pre-credit the minimum-area rule so a fresh source does not
            // look like a min-area violation.
            let fake_area = self.tech.layer(idx.z).min_area.unwrap_or(0).max(0);
            let pt = self.grid.point(idx.x, idx.y);
            let dist = (pt.x - center.x).abs() + (pt.y - center.y).abs();
            let total_cost = self.est_cost(idx, dst_idx1, dst_idx2, Dir::Unknown);
            self.grid.set_src(idx);
            self.wavefront.push(WavefrontCell {
                idx,
                layer_path_area: fake_area,
                v_length_x: COORD_INF,
                v_length_y: COORD_INF,
                prev_via_up: true,
                t_length: COORD_INF,
                dist_to_center: dist,
                path_cost: 0,
                total_cost,
                back_trace_buffer: 0,
            });
            self.stats.pushes += 1;
            trace!("seeded wavefront at {idx:?}");
        }

        while let Some(curr) = self.wavefront.pop() {
            self.stats.pops += 1;
            if self.grid.prev_astar_node_dir(curr.idx()) != Dir::Unknown {
                self.stats.stale_skips += 1;
                continue;
            }
            if self.grid.is_dst(curr.idx()) {
                let path_cost = curr.path_cost();
                let mut path = Vec::new();
                self.trace_back_path(&curr, &mut path, conn_comps, cc_idx1, cc_idx2);
                debug!("path found, cost {path_cost}, {} pops", self.stats.pops);
                return Some((path, path_cost));
            }
            self.expand_wavefront(&curr, dst_idx1, dst_idx2, center);
        }
        debug!("wavefront exhausted, no route");
        None
    }

    fn expand_wavefront(
        &mut self,
        curr: &WavefrontCell,
        dst_idx1: MazeIdx,
        dst_idx2: MazeIdx,
        center: Point,
    ) {
        trace!("expand from {:?}", curr.idx());
        for dir in [Dir::North, Dir::East, Dir::South, Dir::West, Dir::Up, Dir::Down] {
            if self.is_expandable(curr, dir) {
                self.expand(curr, dir, dst_idx1, dst_idx2, center);
            }
        }
    }

    fn is_expandable(&self, curr: &WavefrontCell, dir: Dir) -> bool {
        let idx = curr.idx();
        if !self.grid.has_edge(idx, dir) {
            return false;
        }
        let next = idx.stepped(dir);
        // A state never immediately re-traverses the edge it arrived on.
        !(self.grid.is_src(next)
            || self.grid.prev_astar_node_dir(next) != Dir::Unknown
            || curr.last_dir() == dir.reverse())
    }

    fn expand(
        &mut self,
        curr: &WavefrontCell,
        dir: Dir,
        dst_idx1: MazeIdx,
        dst_idx2: MazeIdx,
        center: Point,
    ) {
        let curr_idx = curr.idx();
        let next_idx = curr_idx.stepped(dir);
        let next_est_cost = self.est_cost(next_idx, dst_idx1, dst_idx2, dir);
        let next_path_cost = self.next_path_cost(curr, dir);

        let path_width = self.tech.layer(curr_idx.z).width;
        let edge_len = self.grid.edge_length(curr_idx, dir);
        let next_pt = self.grid.point(next_idx.x, next_idx.y);
        let dist = (next_pt.x - center.x).abs() + (next_pt.y - center.y).abs();

        let (mut v_length_x, mut v_length_y) = curr.v_length();
        let mut prev_via_up = curr.is_prev_via_up();
        if dir.is_via() {
            v_length_x = 0;
            v_length_y = 0;
            // Up via if the current path goes down: the top enclosure
            // lands on the layer the path came from.
            prev_via_up = dir == Dir::Down;
        } else if v_length_x != COORD_INF && v_length_y != COORD_INF {
            if matches!(dir, Dir::East | Dir::West) {
                v_length_x += edge_len;
            } else {
                v_length_y += edge_len;
            }
        }

        let mut t_length = curr.t_length();
        // Once a turn happened, the straight run keeps growing ...
        if t_length != COORD_INF {
            t_length += edge_len;
        }
        // ... unless this move is itself a turn, which restarts it.
        if curr.last_dir() != Dir::Unknown && curr.last_dir() != dir {
            t_length = edge_len;
        }
        if dir.is_via() {
            t_length = COORD_INF;
        }

        let mut next = WavefrontCell {
            idx: next_idx,
            layer_path_area: curr.layer_path_area() + edge_len * path_width,
            v_length_x,
            v_length_y,
            prev_via_up,
            t_length,
            dist_to_center: dist,
            path_cost: next_path_cost,
            total_cost: next_path_cost + next_est_cost,
            back_trace_buffer: curr.back_trace_buffer(),
        };
        if dir.is_via() {
            next.reset_layer_path_area();
            next.reset_length();
            next.add_layer_path_area(if dir == Dir::Up {
                self.grid.half_via_enc_area(curr_idx.z, false)
            } else {
                self.grid.half_via_enc_area(next_idx.z, true)
            });
        }

        let tail_dir = next.shift_add_buffer(dir);
        if tail_dir != Dir::Unknown {
            // The window just aged out a move; commit it B steps behind
            // the frontier. First commit wins; a conflicting late-comer is
            // dropped.
            let tail_idx = self.get_tail_idx(next_idx, &next);
            let committed = self.grid.prev_astar_node_dir(tail_idx);
            if committed == Dir::Unknown || committed == tail_dir {
                self.grid.set_prev_astar_node_dir(tail_idx, tail_dir);
                self.stats.commits += 1;
                trace!("commit {tail_dir:?} at {tail_idx:?}");
                self.wavefront.push(next);
                self.stats.pushes += 1;
            }
        } else {
            self.wavefront.push(next);
            self.stats.pushes += 1;
        }
    }

    /// Lower bound on the remaining cost from `src` to the destination
    /// box, seen after arriving at `src` along `dir`.
    fn est_cost(&self, src: MazeIdx, dst_idx1: MazeIdx, dst_idx2: MazeIdx, dir: Dir) -> Cost {
        let src_pt = self.grid.point(src.x, src.y);
        let dst_pt1 = self.grid.point(dst_idx1.x, dst_idx1.y);
        let dst_pt2 = self.grid.point(dst_idx2.x, dst_idx2.y);
        let min_cost_x = (dst_pt1.x - src_pt.x).max(src_pt.x - dst_pt2.x).max(0);
        let min_cost_y = (dst_pt1.y - src_pt.y).max(src_pt.y - dst_pt2.y).max(0);
        let min_cost_z = (self.grid.z_height(dst_idx1.z) - self.grid.z_height(src.z))
            .max(self.grid.z_height(src.z) - self.grid.z_height(dst_idx2.z))
            .max(0);

        let mut bend_cnt: Coord = 0;
        bend_cnt += (min_cost_x != 0 && dir != Dir::Unknown && dir != Dir::East && dir != Dir::West)
            as Coord;
        bend_cnt += (min_cost_y != 0
            && dir != Dir::Unknown
            && dir != Dir::South
            && dir != Dir::North) as Coord;
        bend_cnt +=
            (min_cost_z != 0 && dir != Dir::Unknown && dir != Dir::Up && dir != Dir::Down) as Coord;

        let mut forbidden_penalty: Coord = 0;
        // Late rip-up iterations on the gated process node: keep the
        // wavefront from closing in on a lone boundary pin at a spacing
        // that forbids the landing via in both directions.
        if self.config.db_process_node == GF14_PROCESS_NODE
            && self
                .worker
                .is_some_and(|w| w.dr_iter() >= 30 && w.ripup_mode() == 0)
            && dst_idx1 == dst_idx2
        {
            if let Some(next) = src.try_stepped(dir, self.grid.dims()) {
                if next.z == dst_idx1.z {
                    let layer = self.tech.layer(next.z);
                    let layer_num = layer.layer_num;
                    let next_pt = self.grid.point(next.x, next.y);
                    let is_h = layer.dir == LayerDir::Horizontal;
                    let gap = if is_h {
                        (next_pt.y - dst_pt1.y).abs()
                    } else {
                        (next_pt.x - dst_pt1.x).abs()
                    };
                    let along_x = !is_h;
                    if gap != 0
                        && (self
                            .tech
                            .is_via2via_forbidden_len(next.z, false, false, along_x, gap, false)
                            || layer_num - 2 < self.config.bottom_routing_layer)
                        && (self
                            .tech
                            .is_via2via_forbidden_len(next.z, true, true, along_x, gap, false)
                            || layer_num + 2 > self.tech.top_layer_num())
                    {
                        forbidden_penalty = layer.pitch * self.config.gg_drc_cost as Coord * 20;
                    }
                }
            }
        }

        (min_cost_x + min_cost_y + min_cost_z + bend_cnt + forbidden_penalty) as Cost
    }

    /// Path cost after taking one step in `dir` from `curr`: bend penalty,
    /// forbidden via-to-via and via-to-turn lengths, then the per-edge
    /// cost flavors.
    fn next_path_cost(&self, curr: &WavefrontCell, dir: Dir) -> Cost {
        let idx = curr.idx();
        let curr_dir = curr.last_dir();
        let path_width = self.tech.layer(idx.z).width;
        let edge_len = self.grid.edge_length(idx, dir);
        let late_iter = self.worker.is_some_and(|w| w.dr_iter() >= 3);

        let mut next_path_cost = curr.path_cost();

        if curr_dir != dir && curr_dir != Dir::Unknown {
            next_path_cost += 1;
        }

        if dir.is_via() {
            let (v_length_x, v_length_y) = curr.v_length();
            let is_curr_via_up = dir == Dir::Up;
            let prev_enc_up = !curr.is_prev_via_up();
            let curr_enc_up = !is_curr_via_up;
            let forbidden_via2via = if v_length_x == 0 && v_length_y > 0 {
                self.tech.is_via2via_forbidden_len(
                    idx.z,
                    prev_enc_up,
                    curr_enc_up,
                    false,
                    v_length_y,
                    false,
                )
            } else if v_length_x > 0 && v_length_y == 0 {
                self.tech.is_via2via_forbidden_len(
                    idx.z,
                    prev_enc_up,
                    curr_enc_up,
                    true,
                    v_length_x,
                    false,
                )
            } else if v_length_x > 0 && v_length_y > 0 {
                self.tech.is_via2via_forbidden_len(
                    idx.z,
                    prev_enc_up,
                    curr_enc_up,
                    false,
                    v_length_y,
                    false,
                ) && self.tech.is_via2via_forbidden_len(
                    idx.z,
                    prev_enc_up,
                    curr_enc_up,
                    true,
                    v_length_x,
                    false,
                )
            } else {
                false
            };
            if forbidden_via2via {
                let unit = if late_iter {
                    self.config.gg_marker_cost
                } else {
                    self.config.gg_drc_cost
                };
                next_path_cost += unit * edge_len as Cost;
            }
        }

        if curr_dir != Dir::Unknown && curr_dir != dir {
            let mut forbidden_t_len = false;
            if dir.is_via() {
                // A via landing right after a turn.
                let is_t_length_via_up = dir == Dir::Up;
                if curr.t_length() != COORD_INF {
                    let t_length = curr.t_length();
                    match curr_dir {
                        Dir::West | Dir::East => {
                            forbidden_t_len = self.tech.is_via_forbidden_turn_len(
                                idx.z,
                                !is_t_length_via_up,
                                true,
                                t_length,
                            );
                        }
                        Dir::South | Dir::North => {
                            forbidden_t_len = self.tech.is_via_forbidden_turn_len(
                                idx.z,
                                !is_t_length_via_up,
                                false,
                                t_length,
                            );
                        }
                        _ => {}
                    }
                }
            } else {
                // A planar turn too close to the previous via.
                let is_t_length_via_up = curr.is_prev_via_up();
                match curr_dir {
                    Dir::West | Dir::East => {
                        forbidden_t_len = self.tech.is_via_forbidden_turn_len(
                            idx.z,
                            !is_t_length_via_up,
                            true,
                            curr.v_length().0,
                        );
                    }
                    Dir::South | Dir::North => {
                        forbidden_t_len = self.tech.is_via_forbidden_turn_len(
                            idx.z,
                            !is_t_length_via_up,
                            false,
                            curr.v_length().1,
                        );
                    }
                    _ => {}
                }
            }
            if forbidden_t_len {
                // Deliberately the opposite pair from the via-to-via case.
                let unit = if late_iter {
                    self.config.gg_drc_cost
                } else {
                    self.config.gg_marker_cost
                };
                next_path_cost += unit * edge_len as Cost;
            }
        }

        let grid_cost = self.grid.has_grid_cost(idx, dir);
        let drc_cost = self.grid.has_drc_cost(idx, dir);
        let marker_cost = self.grid.has_marker_cost(idx, dir);
        let shape_cost = self.grid.has_shape_cost(idx, dir);
        let block_cost = self.grid.is_blocked(idx, dir);
        let guide_cost = self.grid.has_guide(idx, dir);

        next_path_cost += edge_len as Cost
            + if grid_cost {
                self.config.grid_cost * edge_len as Cost
            } else {
                0
            }
            + if drc_cost {
                self.config.gg_drc_cost * edge_len as Cost
            } else {
                0
            }
            + if marker_cost {
                self.config.gg_marker_cost * edge_len as Cost
            } else {
                0
            }
            + if shape_cost {
                self.config.shape_cost * edge_len as Cost
            } else {
                0
            }
            + if block_cost {
                self.config.block_cost * path_width as Cost * 20
            } else {
                0
            }
            + if !guide_cost {
                self.config.guide_cost * edge_len as Cost
            } else {
                0
            };
        next_path_cost
    }

    /// The cell `WAVEFRONT_BUFFER_SIZE` steps behind `idx` along the
    /// state's back-trace buffer. Empty slots decode to `Unknown` and do
    /// not move.
    fn get_tail_idx(&self, idx: MazeIdx, cell: &WavefrontCell) -> MazeIdx {
        let mut pos = idx;
        let mut buffer = cell.back_trace_buffer();
        for _ in 0..WAVEFRONT_BUFFER_SIZE {
            let dir = Dir::from_bits((buffer & DIR_MASK) as u8);
            buffer >>= DIR_BIT_SIZE;
            pos = pos.stepped_back(dir);
        }
        pos
    }

    /// Walks from the destination state back to a source: first draining
    /// the state's own buffer, then following the committed predecessor
    /// directions. `path` receives turn points and endpoints (destination
    /// first); `root` receives every traversed node.
    fn trace_back_path(
        &self,
        curr: &WavefrontCell,
        path: &mut Vec<MazeIdx>,
        root: &mut Vec<MazeIdx>,
        cc_idx1: &mut MazeIdx,
        cc_idx2: &mut MazeIdx,
    ) {
        let mut prev_dir = Dir::Unknown;
        let mut pos = curr.idx();
        let mut buffer = curr.back_trace_buffer();
        for _ in 0..WAVEFRONT_BUFFER_SIZE {
            if self.grid.is_src(pos) {
                break;
            }
            let curr_dir = Dir::from_bits((buffer & DIR_MASK) as u8);
            buffer >>= DIR_BIT_SIZE;
            if curr_dir == Dir::Unknown {
                warn!("unexpected direction in back-trace buffer at {pos:?}");
                break;
            }
            root.push(pos);
            if curr_dir != prev_dir {
                path.push(pos);
            }
            pos = pos.stepped_back(curr_dir);
            prev_dir = curr_dir;
        }
        while !self.grid.is_src(pos) {
            let curr_dir = self.grid.prev_astar_node_dir(pos);
            root.push(pos);
            if curr_dir == Dir::Unknown {
                warn!("broken predecessor chain at {pos:?}");
                break;
            }
            if curr_dir != prev_dir {
                path.push(pos);
            }
            pos = pos.stepped_back(curr_dir);
            prev_dir = curr_dir;
        }
        // Close the path at the source; an empty path means the endpoints
        // coincide.
        if !path.is_empty() {
            path.push(pos);
        }
        for &idx in path.iter() {
            *cc_idx1 = cc_idx1.elementwise_min(idx);
            *cc_idx2 = cc_idx2.elementwise_max(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tech::Layer;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .try_init();
    }

    fn uniform_tech(z_dim: usize) -> Tech {
        let layers = (0..z_dim)
            .map(|z| Layer {
                layer_num: 2 * (z as i64 + 1),
                dir: if z % 2 == 0 {
                    LayerDir::Horizontal
                } else {
                    LayerDir::Vertical
                },
                width: 100,
                pitch: 200,
                min_area: None,
            })
            .collect();
        Tech::new(layers, vec![(0, 0); z_dim.saturating_sub(1)])
    }

    /// A grid with every edge present and uniform edge length 100.
    fn full_grid(tech: &Tech, x_dim: usize, y_dim: usize, z_dim: usize) -> GridGraph {
        let mut grid = GridGraph::new(
            tech,
            (0..x_dim).map(|i| 100 * i as Coord).collect(),
            (0..y_dim).map(|i| 100 * i as Coord).collect(),
            (0..z_dim).map(|i| 100 * i as Coord).collect(),
        );
        for z in 0..z_dim {
            for y in 0..y_dim {
                for x in 0..x_dim {
                    let idx = MazeIdx::new(x, y, z);
                    if x + 1 < x_dim {
                        grid.add_edge(idx, Dir::East);
                    }
                    if y + 1 < y_dim {
                        grid.add_edge(idx, Dir::North);
                    }
                    if z + 1 < z_dim {
                        grid.add_edge(idx, Dir::Up);
                    }
                }
            }
        }
        grid
    }

    fn zero_config() -> RouterConfig {
        RouterConfig {
            grid_cost: 0,
            shape_cost: 0,
            block_cost: 0,
            guide_cost: 0,
            gg_drc_cost: 0,
            gg_marker_cost: 0,
            bottom_routing_layer: 2,
            db_process_node: String::new(),
        }
    }

    fn run_search(
        grid: &mut GridGraph,
        tech: &Tech,
        config: &RouterConfig,
        src: MazeIdx,
        dst: MazeIdx,
        center: Point,
    ) -> Option<(Vec<MazeIdx>, Cost)> {
        let (x_dim, y_dim, z_dim) = grid.dims();
        let mut search = MazeSearch::new(grid, tech, config, None);
        let mut conn_comps = vec![src];
        let pin = Pin {
            access_patterns: vec![dst],
        };
        let mut cc_idx1 = MazeIdx::new(x_dim - 1, y_dim - 1, z_dim - 1);
        let mut cc_idx2 = MazeIdx::new(0, 0, 0);
        search.search(&mut conn_comps, &pin, &mut cc_idx1, &mut cc_idx2, center)
    }

    fn seed_cell(idx: MazeIdx, dist_to_center: Coord) -> WavefrontCell {
        WavefrontCell {
            idx,
            layer_path_area: 0,
            v_length_x: COORD_INF,
            v_length_y: COORD_INF,
            prev_via_up: true,
            t_length: COORD_INF,
            dist_to_center,
            path_cost: 0,
            total_cost: 0,
            back_trace_buffer: 0,
        }
    }

    #[test]
    fn test_search_straight_line() {
        init_tracing();
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 5, 1, 1);
        let config = zero_config();
        let (path, cost) = run_search(
            &mut grid,
            &tech,
            &config,
            MazeIdx::new(0, 0, 0),
            MazeIdx::new(4, 0, 0),
            Point::new(400, 0),
        )
        .unwrap();
        assert_eq!(path, vec![MazeIdx::new(4, 0, 0), MazeIdx::new(0, 0, 0)]);
        assert_eq!(cost, 400);
    }

    #[test]
    fn test_search_one_bend() {
        init_tracing();
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 5, 5, 1);
        let config = zero_config();
        let (path, cost) = run_search(
            &mut grid,
            &tech,
            &config,
            MazeIdx::new(0, 0, 0),
            MazeIdx::new(4, 4, 0),
            Point::new(400, 400),
        )
        .unwrap();
        // Destination, the single bend, source.
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], MazeIdx::new(4, 4, 0));
        assert_eq!(path[2], MazeIdx::new(0, 0, 0));
        assert!(path[1] == MazeIdx::new(4, 0, 0) || path[1] == MazeIdx::new(0, 4, 0));
        assert_eq!(cost, 800 + 1);
    }

    #[test]
    fn test_search_layer_change() {
        init_tracing();
        let tech = uniform_tech(3);
        let mut grid = full_grid(&tech, 1, 1, 3);
        let config = zero_config();
        let (path, cost) = run_search(
            &mut grid,
            &tech,
            &config,
            MazeIdx::new(0, 0, 0),
            MazeIdx::new(0, 0, 2),
            Point::new(0, 0),
        )
        .unwrap();
        // Two stacked vias are one straight run; no bend cost.
        assert_eq!(path, vec![MazeIdx::new(0, 0, 2), MazeIdx::new(0, 0, 0)]);
        assert_eq!(cost, 200);
    }

    #[test]
    fn test_search_blocked_edge_forces_detour() {
        init_tracing();
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 3, 2, 1);
        for dir in [Dir::East, Dir::South, Dir::West, Dir::North, Dir::Up, Dir::Down] {
            grid.set_blocked(MazeIdx::new(1, 0, 0), dir);
        }
        let mut config = zero_config();
        config.block_cost = 1_000_000;
        let (path, cost) = run_search(
            &mut grid,
            &tech,
            &config,
            MazeIdx::new(0, 0, 0),
            MazeIdx::new(2, 0, 0),
            Point::new(200, 0),
        )
        .unwrap();
        assert_eq!(
            path,
            vec![
                MazeIdx::new(2, 0, 0),
                MazeIdx::new(2, 1, 0),
                MazeIdx::new(0, 1, 0),
                MazeIdx::new(0, 0, 0),
            ]
        );
        assert_eq!(cost, 4 * 100 + 2);
    }

    #[test]
    fn test_search_unreachable() {
        init_tracing();
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 5, 1, 1);
        grid.remove_edge(MazeIdx::new(2, 0, 0), Dir::East);
        let config = zero_config();
        let result = run_search(
            &mut grid,
            &tech,
            &config,
            MazeIdx::new(0, 0, 0),
            MazeIdx::new(4, 0, 0),
            Point::new(400, 0),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_search_src_equals_dst() {
        init_tracing();
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 3, 1, 1);
        let config = zero_config();
        let idx = MazeIdx::new(1, 0, 0);
        let mut search = MazeSearch::new(&mut grid, &tech, &config, None);
        let mut conn_comps = vec![idx];
        let pin = Pin {
            access_patterns: vec![idx],
        };
        let mut cc_idx1 = MazeIdx::new(2, 0, 0);
        let mut cc_idx2 = MazeIdx::new(0, 0, 0);
        let (path, cost) = search
            .search(
                &mut conn_comps,
                &pin,
                &mut cc_idx1,
                &mut cc_idx2,
                Point::new(0, 0),
            )
            .unwrap();
        assert_eq!(path, vec![idx]);
        assert_eq!(cost, 0);
        // Nothing was pushed; the endpoints coincided at seeding time.
        assert_eq!(search.stats().pushes, 0);
    }

    #[test]
    fn test_search_is_deterministic() {
        init_tracing();
        let tech = uniform_tech(2);
        let mut grid = full_grid(&tech, 4, 4, 2);
        let config = zero_config();
        let first = run_search(
            &mut grid,
            &tech,
            &config,
            MazeIdx::new(0, 0, 0),
            MazeIdx::new(3, 3, 1),
            Point::new(150, 150),
        )
        .unwrap();
        grid.reset_status();
        let second = run_search(
            &mut grid,
            &tech,
            &config,
            MazeIdx::new(0, 0, 0),
            MazeIdx::new(3, 3, 1),
            Point::new(150, 150),
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_search_appends_route_to_conn_comps_and_bbox() {
        init_tracing();
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 5, 1, 1);
        let config = zero_config();
        let mut search = MazeSearch::new(&mut grid, &tech, &config, None);
        let mut conn_comps = vec![MazeIdx::new(0, 0, 0)];
        let pin = Pin {
            access_patterns: vec![MazeIdx::new(4, 0, 0)],
        };
        let mut cc_idx1 = MazeIdx::new(4, 0, 0);
        let mut cc_idx2 = MazeIdx::new(0, 0, 0);
        search
            .search(
                &mut conn_comps,
                &pin,
                &mut cc_idx1,
                &mut cc_idx2,
                Point::new(400, 0),
            )
            .unwrap();
        // Every traversed node except the source is appended for the next
        // pin's seeding.
        assert_eq!(
            conn_comps,
            vec![
                MazeIdx::new(0, 0, 0),
                MazeIdx::new(4, 0, 0),
                MazeIdx::new(3, 0, 0),
                MazeIdx::new(2, 0, 0),
                MazeIdx::new(1, 0, 0),
            ]
        );
        assert_eq!(cc_idx1, MazeIdx::new(0, 0, 0));
        assert_eq!(cc_idx2, MazeIdx::new(4, 0, 0));
    }

    #[test]
    fn test_est_cost_zero_inside_destination_box() {
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 5, 5, 1);
        let config = zero_config();
        let search = MazeSearch::new(&mut grid, &tech, &config, None);
        let cost = search.est_cost(
            MazeIdx::new(2, 2, 0),
            MazeIdx::new(1, 1, 0),
            MazeIdx::new(3, 3, 0),
            Dir::East,
        );
        assert_eq!(cost, 0);
    }

    #[test]
    fn test_est_cost_counts_bends_against_incoming_dir() {
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 5, 5, 1);
        let config = zero_config();
        let search = MazeSearch::new(&mut grid, &tech, &config, None);
        let dst = MazeIdx::new(4, 4, 0);
        // Moving east with both x and y distance left: y needs a bend.
        assert_eq!(
            search.est_cost(MazeIdx::new(2, 2, 0), dst, dst, Dir::East),
            200 + 200 + 1
        );
        // An unknown incoming direction never counts bends.
        assert_eq!(
            search.est_cost(MazeIdx::new(2, 2, 0), dst, dst, Dir::Unknown),
            400
        );
        // Moving north with only x distance left: one bend ahead.
        assert_eq!(
            search.est_cost(MazeIdx::new(2, 4, 0), dst, dst, Dir::North),
            200 + 1
        );
    }

    #[test]
    fn test_est_cost_forbidden_penalty_gated_by_process_node() {
        let tech = uniform_tech(1);
        let mut config = zero_config();
        config.gg_drc_cost = 8;
        let worker = DrWorker::new(30, 0);
        let dst = MazeIdx::new(4, 0, 0);
        let src = MazeIdx::new(1, 1, 0);

        // Process node differs: the gate is a no-op.
        {
            let mut grid = full_grid(&tech, 5, 3, 1);
            let search = MazeSearch::new(&mut grid, &tech, &config, Some(&worker));
            assert_eq!(search.est_cost(src, dst, dst, Dir::North), 300 + 100 + 1);
        }

        // Gated on: the single layer is both the bottom and top routing
        // layer, so the stacked-via escapes are unavailable and any
        // nonzero gap to the lone access pattern is penalized.
        {
            let mut grid = full_grid(&tech, 5, 3, 1);
            config.db_process_node = GF14_PROCESS_NODE.to_string();
            let search = MazeSearch::new(&mut grid, &tech, &config, Some(&worker));
            let penalty = (200 * 8 * 20) as Cost;
            assert_eq!(
                search.est_cost(src, dst, dst, Dir::North),
                300 + 100 + 1 + penalty
            );
            // Without a late-iteration worker the gate stays closed.
            let search = MazeSearch::new(&mut grid, &tech, &config, None);
            assert_eq!(search.est_cost(src, dst, dst, Dir::North), 300 + 100 + 1);
        }
    }

    #[test]
    fn test_next_path_cost_bend_and_edge_flavors() {
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 3, 3, 1);
        let idx = MazeIdx::new(1, 1, 0);
        grid.set_grid_cost(idx, Dir::East);
        grid.set_drc_cost(idx, Dir::East);
        grid.set_marker_cost(idx, Dir::East);
        grid.set_shape_cost(idx, Dir::East);
        grid.set_blocked(idx, Dir::East);
        let mut config = zero_config();
        config.grid_cost = 2;
        config.gg_drc_cost = 8;
        config.gg_marker_cost = 32;
        config.shape_cost = 4;
        config.block_cost = 5;
        config.guide_cost = 3;
        let search = MazeSearch::new(&mut grid, &tech, &config, None);

        let mut curr = seed_cell(idx, 0);
        curr.path_cost = 10;
        curr.shift_add_buffer(Dir::North);
        // Bend (north -> east) + edge length + every flavor; the block
        // cost scales with the path width, not the edge length, and the
        // guide cost applies because no guide covers the edge.
        let expected = 10
            + 1
            + 100
            + 2 * 100
            + 8 * 100
            + 32 * 100
            + 4 * 100
            + 5 * 100 * 20
            + 3 * 100;
        assert_eq!(search.next_path_cost(&curr, Dir::East), expected);

        // Straight continuation drops the bend penalty.
        let mut straight = seed_cell(idx, 0);
        straight.path_cost = 10;
        straight.shift_add_buffer(Dir::East);
        assert_eq!(
            search.next_path_cost(&straight, Dir::East),
            expected - 1
        );
    }

    #[test]
    fn test_next_path_cost_guide_suppresses_guide_cost() {
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 3, 1, 1);
        let idx = MazeIdx::new(0, 0, 0);
        grid.set_guide(idx, Dir::East);
        let mut config = zero_config();
        config.guide_cost = 3;
        let search = MazeSearch::new(&mut grid, &tech, &config, None);
        let curr = seed_cell(idx, 0);
        assert_eq!(search.next_path_cost(&curr, Dir::East), 100);
    }

    #[test]
    fn test_next_path_cost_via2via_forbidden_cost_flips_late() {
        let mut tech = uniform_tech(2);
        // Previous via went up (enclosure query sees false), next via goes
        // up as well; the run since the last via is 150 along y only.
        tech.add_via2via_forbidden_len(0, false, false, false, 100, 200);
        let mut grid = full_grid(&tech, 2, 3, 2);
        let mut config = zero_config();
        config.gg_drc_cost = 8;
        config.gg_marker_cost = 32;

        let mut curr = seed_cell(MazeIdx::new(0, 2, 0), 0);
        curr.v_length_x = 0;
        curr.v_length_y = 150;
        curr.prev_via_up = true;
        curr.shift_add_buffer(Dir::Up);
        curr.shift_add_buffer(Dir::North);
        // Early iterations charge the DRC constant... (bend +1 applies:
        // north -> up).
        {
            let search = MazeSearch::new(&mut grid, &tech, &config, None);
            assert_eq!(search.next_path_cost(&curr, Dir::Up), 1 + 8 * 100 + 100);
        }
        // ...late iterations the marker constant.
        {
            let worker = DrWorker::new(3, 0);
            let search = MazeSearch::new(&mut grid, &tech, &config, Some(&worker));
            assert_eq!(search.next_path_cost(&curr, Dir::Up), 1 + 32 * 100 + 100);
        }
    }

    #[test]
    fn test_next_path_cost_via2turn_forbidden_cost_flips_opposite() {
        let mut tech = uniform_tech(1);
        // Turning off an eastward run 120 past an up-via.
        tech.add_via_forbidden_turn_len(0, false, true, 100, 200);
        let mut grid = full_grid(&tech, 3, 3, 1);
        let mut config = zero_config();
        config.gg_drc_cost = 8;
        config.gg_marker_cost = 32;

        let mut curr = seed_cell(MazeIdx::new(1, 1, 0), 0);
        curr.v_length_x = 120;
        curr.v_length_y = 0;
        curr.prev_via_up = true;
        curr.shift_add_buffer(Dir::East);
        // The early/late pair is the mirror image of the via-to-via case.
        {
            let search = MazeSearch::new(&mut grid, &tech, &config, None);
            assert_eq!(
                search.next_path_cost(&curr, Dir::North),
                1 + 32 * 100 + 100
            );
        }
        {
            let worker = DrWorker::new(3, 0);
            let search = MazeSearch::new(&mut grid, &tech, &config, Some(&worker));
            assert_eq!(search.next_path_cost(&curr, Dir::North), 1 + 8 * 100 + 100);
        }
    }

    #[test]
    fn test_next_path_cost_via_after_turn_uses_turn_length() {
        let mut tech = uniform_tech(2);
        tech.add_via_forbidden_turn_len(0, false, true, 40, 60);
        let mut grid = full_grid(&tech, 3, 3, 2);
        let mut config = zero_config();
        config.gg_marker_cost = 32;
        let search = MazeSearch::new(&mut grid, &tech, &config, None);

        let mut curr = seed_cell(MazeIdx::new(1, 1, 0), 0);
        curr.t_length = 50;
        curr.shift_add_buffer(Dir::East);
        assert_eq!(search.next_path_cost(&curr, Dir::Up), 1 + 32 * 100 + 100);

        // With no turn on record the check cannot apply.
        let mut no_turn = seed_cell(MazeIdx::new(1, 1, 0), 0);
        no_turn.t_length = COORD_INF;
        no_turn.shift_add_buffer(Dir::East);
        assert_eq!(search.next_path_cost(&no_turn, Dir::Up), 1 + 100);
    }

    #[test]
    fn test_get_tail_idx_round_trip() {
        let tech = uniform_tech(2);
        let mut grid = full_grid(&tech, 6, 6, 2);
        let config = zero_config();
        let search = MazeSearch::new(&mut grid, &tech, &config, None);

        let mut cell = seed_cell(MazeIdx::new(0, 0, 0), 0);
        let moves = [Dir::East, Dir::North, Dir::Up, Dir::North];
        let mut pos = MazeIdx::new(0, 0, 0);
        for dir in moves {
            pos = pos.stepped(dir);
            cell.shift_add_buffer(dir);
        }
        cell.idx = pos;
        // Stepping back through the full window lands on the start cell.
        assert_eq!(search.get_tail_idx(pos, &cell), MazeIdx::new(0, 0, 0));

        // With a partially filled buffer the empty slots do not move.
        let mut short = seed_cell(MazeIdx::new(2, 2, 0), 0);
        short.shift_add_buffer(Dir::East);
        assert_eq!(
            search.get_tail_idx(MazeIdx::new(3, 2, 0), &short),
            MazeIdx::new(2, 2, 0)
        );
    }

    #[test]
    fn test_commit_happens_buffer_size_behind_frontier() {
        init_tracing();
        let tech = uniform_tech(1);
        let mut grid = full_grid(&tech, 8, 1, 1);
        let config = zero_config();
        run_search(
            &mut grid,
            &tech,
            &config,
            MazeIdx::new(0, 0, 0),
            MazeIdx::new(7, 0, 0),
            Point::new(700, 0),
        )
        .unwrap();
        // Cells more than WAVEFRONT_BUFFER_SIZE behind the destination
        // were committed; the last window is only covered by the buffer.
        assert_eq!(grid.prev_astar_node_dir(MazeIdx::new(1, 0, 0)), Dir::East);
        assert_eq!(grid.prev_astar_node_dir(MazeIdx::new(2, 0, 0)), Dir::East);
        assert_eq!(grid.prev_astar_node_dir(MazeIdx::new(3, 0, 0)), Dir::East);
        assert_eq!(grid.prev_astar_node_dir(MazeIdx::new(0, 0, 0)), Dir::Unknown);
    }
}
