use serde::{Deserialize, Serialize};

/// Database-unit scalar: coordinates, lengths, areas.
pub type Coord = i64;

/// Accumulated path / heuristic cost. 64 bits so a full-grid path times the
/// largest cost constant stays in range.
pub type Cost = u64;

/// Sentinel for "no via / no turn seen yet" in the wavefront history fields.
pub const COORD_INF: Coord = Coord::MAX;

/// Number of directions remembered per wavefront state.
pub const WAVEFRONT_BUFFER_SIZE: usize = 4;
/// Bits per direction in the back-trace buffer.
pub const DIR_BIT_SIZE: usize = 3;
/// Total bits of the back-trace buffer window.
pub const WAVEFRONT_BIT_SIZE: usize = WAVEFRONT_BUFFER_SIZE * DIR_BIT_SIZE;

pub(crate) const DIR_MASK: u32 = (1 << DIR_BIT_SIZE) - 1;
pub(crate) const WAVEFRONT_MASK: u32 = (1 << WAVEFRONT_BIT_SIZE) - 1;

/// One of the six grid directions, 3-bit encoded for the back-trace buffer
/// and the per-cell predecessor field. `Unknown` (0) doubles as "empty
/// buffer slot" and "no committed predecessor".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Dir {
    Unknown = 0,
    East = 1,
    South = 2,
    West = 3,
    North = 4,
    Up = 5,
    Down = 6,
}

impl Dir {
    /// Decodes the low 3 bits of `bits`. The unused value 7 decodes to
    /// `Unknown`.
    pub fn from_bits(bits: u8) -> Dir {
        match bits & DIR_MASK as u8 {
            1 => Dir::East,
            2 => Dir::South,
            3 => Dir::West,
            4 => Dir::North,
            5 => Dir::Up,
            6 => Dir::Down,
            _ => Dir::Unknown,
        }
    }

    pub fn reverse(self) -> Dir {
        match self {
            Dir::East => Dir::West,
            Dir::South => Dir::North,
            Dir::West => Dir::East,
            Dir::North => Dir::South,
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Unknown => Dir::Unknown,
        }
    }

    /// A layer-changing step.
    pub fn is_via(self) -> bool {
        matches!(self, Dir::Up | Dir::Down)
    }
}

/// A cell coordinate on the routing grid: `x`/`y` index tracks on layer `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MazeIdx {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl MazeIdx {
    pub fn new(x: usize, y: usize, z: usize) -> MazeIdx {
        MazeIdx { x, y, z }
    }

    /// The neighboring cell in direction `dir`. Callers guarantee the move
    /// stays on the grid; `Unknown` is a no-op.
    pub fn stepped(self, dir: Dir) -> MazeIdx {
        let MazeIdx { x, y, z } = self;
        match dir {
            Dir::East => MazeIdx::new(x + 1, y, z),
            Dir::South => MazeIdx::new(x, y - 1, z),
            Dir::West => MazeIdx::new(x - 1, y, z),
            Dir::North => MazeIdx::new(x, y + 1, z),
            Dir::Up => MazeIdx::new(x, y, z + 1),
            Dir::Down => MazeIdx::new(x, y, z - 1),
            Dir::Unknown => self,
        }
    }

    /// The neighboring cell against direction `dir` (undoes `stepped`).
    pub fn stepped_back(self, dir: Dir) -> MazeIdx {
        self.stepped(dir.reverse())
    }

    /// Bounds-checked step; `None` if the move leaves a grid of dimensions
    /// `dims`.
    pub fn try_stepped(self, dir: Dir, dims: (usize, usize, usize)) -> Option<MazeIdx> {
        let (xd, yd, zd) = dims;
        match dir {
            Dir::East => (self.x + 1 < xd).then(|| self.stepped(dir)),
            Dir::South => (self.y > 0).then(|| self.stepped(dir)),
            Dir::West => (self.x > 0).then(|| self.stepped(dir)),
            Dir::North => (self.y + 1 < yd).then(|| self.stepped(dir)),
            Dir::Up => (self.z + 1 < zd).then(|| self.stepped(dir)),
            Dir::Down => (self.z > 0).then(|| self.stepped(dir)),
            Dir::Unknown => Some(self),
        }
    }

    pub fn elementwise_min(self, other: MazeIdx) -> MazeIdx {
        MazeIdx::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn elementwise_max(self, other: MazeIdx) -> MazeIdx {
        MazeIdx::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }
}

/// A point in database units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub fn new(x: Coord, y: Coord) -> Point {
        Point { x, y }
    }
}

/// The routing target of one search: the set of grid cells through which
/// the next pin may be contacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub access_patterns: Vec<MazeIdx>,
}
