use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::Coord;

/// Preferred routing direction of a metal layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerDir {
    Horizontal,
    Vertical,
}

/// Constants of one routing layer, as extracted from the technology
/// database. Routing layers carry even layer numbers; the odd numbers in
/// between belong to the cut layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layer {
    pub layer_num: i64,
    pub dir: LayerDir,
    pub width: Coord,
    pub pitch: Coord,
    /// Minimum metal area rule, if the layer has one.
    pub min_area: Option<Coord>,
}

type Via2ViaKey = (usize, bool, bool, bool);
type ViaTurnKey = (usize, bool, bool);

/// Read-only technology rules consulted during a search: layer constants,
/// via enclosure areas, and the forbidden-length tables derived from the
/// via spacing rules. Lengths in the tables are inclusive ranges.
#[derive(Debug, Clone, Default)]
pub struct Tech {
    layers: Vec<Layer>,
    /// `(top, bottom)` half enclosure areas of the via between layers
    /// `z` and `z + 1`.
    half_via_enc_area: Vec<(Coord, Coord)>,
    via2via_forbidden: HashMap<Via2ViaKey, Vec<(Coord, Coord)>>,
    via2via_forbidden_strict: HashMap<Via2ViaKey, Vec<(Coord, Coord)>>,
    via_turn_forbidden: HashMap<ViaTurnKey, Vec<(Coord, Coord)>>,
}

impl Tech {
    pub fn new(layers: Vec<Layer>, half_via_enc_area: Vec<(Coord, Coord)>) -> Self {
        Self {
            layers,
            half_via_enc_area,
            ..Default::default()
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, z: usize) -> &Layer {
        &self.layers[z]
    }

    pub fn top_layer_num(&self) -> i64 {
        self.layers.last().map_or(0, |layer| layer.layer_num)
    }

    /// Half enclosure area of the via between layers `z` and `z + 1` on
    /// the top (`is_top`) or bottom metal.
    pub fn half_via_enc_area(&self, z: usize, is_top: bool) -> Coord {
        let (top, bottom) = self.half_via_enc_area[z];
        if is_top {
            top
        } else {
            bottom
        }
    }

    pub fn add_via2via_forbidden_len(
        &mut self,
        z: usize,
        prev_via_up: bool,
        curr_via_up: bool,
        along_x: bool,
        lo: Coord,
        hi: Coord,
    ) {
        self.via2via_forbidden
            .entry((z, prev_via_up, curr_via_up, along_x))
            .or_default()
            .push((lo, hi));
    }

    pub fn add_via2via_forbidden_len_strict(
        &mut self,
        z: usize,
        prev_via_up: bool,
        curr_via_up: bool,
        along_x: bool,
        lo: Coord,
        hi: Coord,
    ) {
        self.via2via_forbidden_strict
            .entry((z, prev_via_up, curr_via_up, along_x))
            .or_default()
            .push((lo, hi));
    }

    pub fn add_via_forbidden_turn_len(
        &mut self,
        z: usize,
        via_up: bool,
        along_x: bool,
        lo: Coord,
        hi: Coord,
    ) {
        self.via_turn_forbidden
            .entry((z, via_up, along_x))
            .or_default()
            .push((lo, hi));
    }

    /// Whether placing a via at layer `z` at planar distance `len` (along
    /// x or y) from the previous via violates a via spacing rule, given
    /// the enclosure orientations of the two vias.
    pub fn is_via2via_forbidden_len(
        &self,
        z: usize,
        prev_via_up: bool,
        curr_via_up: bool,
        along_x: bool,
        len: Coord,
        strict: bool,
    ) -> bool {
        let table = if strict {
            &self.via2via_forbidden_strict
        } else {
            &self.via2via_forbidden
        };
        table
            .get(&(z, prev_via_up, curr_via_up, along_x))
            .is_some_and(|ranges| ranges.iter().any(|&(lo, hi)| len >= lo && len <= hi))
    }

    /// Whether a turn at planar distance `len` from a via at layer `z`
    /// violates a via spacing rule.
    pub fn is_via_forbidden_turn_len(
        &self,
        z: usize,
        via_up: bool,
        along_x: bool,
        len: Coord,
    ) -> bool {
        self.via_turn_forbidden
            .get(&(z, via_up, along_x))
            .is_some_and(|ranges| ranges.iter().any(|&(lo, hi)| len >= lo && len <= hi))
    }
}
