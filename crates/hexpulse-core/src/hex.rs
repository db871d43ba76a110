//! Hex coordinate system and world-space geometry.
//!
//! This module provides the coordinate types the board is built from:
//! - `HexCoord`: axial coordinate identifying a tile
//! - `Vec3`: world-space position of tiles, corners and collectibles
//! - Key helpers that merge floating-point corners into shared vertices
//!
//! Tiles sit on the XZ plane. Neighboring centers are `2 * size` apart along
//! the x axis, so `size` is the distance from a center to each flat side and
//! the corner radius is `2 * size / sqrt(3)`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Axial coordinate for hex grid.
///
/// In axial coordinates:
/// - `q` increases going east (+x)
/// - `r` increases going south-east (+z)
/// - The third coordinate `s` (not stored) satisfies: q + r + s = 0
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighboring hexes, starting east and turning clockwise in world space
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),
            HexCoord::new(self.q, self.r + 1),
            HexCoord::new(self.q - 1, self.r + 1),
            HexCoord::new(self.q - 1, self.r),
            HexCoord::new(self.q, self.r - 1),
            HexCoord::new(self.q + 1, self.r - 1),
        ]
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// All coordinates within `rings` steps of the origin, in generation order.
    ///
    /// Ordered by `q` ascending, then `r` ascending.
    pub fn spiral(rings: u32) -> Vec<HexCoord> {
        let n = rings as i32;
        let mut coords = Vec::new();
        for q in -n..=n {
            let r_min = (-n).max(-q - n);
            let r_max = n.min(-q + n);
            for r in r_min..=r_max {
                coords.push(HexCoord::new(q, r));
            }
        }
        coords
    }

    /// World-space center of this hex.
    pub fn to_world(&self, size: f64) -> Vec3 {
        let q = self.q as f64;
        let r = self.r as f64;
        Vec3::new(size * 2.0 * (q + r / 2.0), 0.0, size * 3.0_f64.sqrt() * r)
    }

    /// The hex containing a world-space position (height is ignored).
    pub fn from_world(position: Vec3, size: f64) -> Self {
        let sqrt3 = 3.0_f64.sqrt();
        let q = position.x / (2.0 * size) - position.z / (2.0 * size * sqrt3);
        let r = position.z / (size * sqrt3);
        Self::axial_round(q, r)
    }

    /// The six corner positions, at angles 30, 90, ..., 330 degrees.
    pub fn corners(&self, size: f64) -> [Vec3; 6] {
        let center = self.to_world(size);
        let radius = 2.0 * size / 3.0_f64.sqrt();
        std::array::from_fn(|i| {
            let angle = PI / 3.0 * i as f64 + PI / 6.0;
            Vec3::new(
                center.x + radius * angle.cos(),
                center.y,
                center.z + radius * angle.sin(),
            )
        })
    }

    /// Round fractional axial coordinates to nearest hex
    fn axial_round(q: f64, r: f64) -> Self {
        let s = -q - r;

        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();

        let q_diff = (rq - q).abs();
        let r_diff = (rr - r).abs();
        let s_diff = (rs - s).abs();

        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        }

        Self::new(rq as i32, rr as i32)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in all three axes
    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance on the ground plane, ignoring height
    pub fn planar_distance_to(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn midpoint(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }
}

/// Key of the vertex a corner position snaps to.
///
/// Corners closer than half a grid cell collapse onto the same key, which is
/// how the three tiles meeting at a corner end up sharing one vertex.
pub fn vertex_key(position: Vec3, grid: f64) -> String {
    let kx = (position.x / grid + 0.5).floor() as i64;
    let kz = (position.z / grid + 0.5).floor() as i64;
    format!("{}_{}", kx, kz)
}

/// Key of the edge between two vertices, independent of argument order.
pub fn edge_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}
