//! Game board representation including tiles, vertices, edges and ports.
//!
//! This module contains:
//! - Resource and terrain types
//! - Board generation from a ring count and a terrain frequency table
//! - The shared vertex/edge tables derived from tile corners
//! - Port placement on the coast
//! - Structure occupancy (towns, cities, roads) and spatial queries

use crate::config::GameConfig;
use crate::error::{BoardError, ValidationError};
use crate::hex::{edge_key, vertex_key, HexCoord, Vec3};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Player identifier, unique within a session
pub type PlayerId = u32;

/// Resource kinds.
///
/// Declaration order is the canonical order used wherever resources are
/// iterated, including weighted random draws.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Resource {
    Brick,
    Wood,
    Wheat,
    Ore,
    Wool,
}

impl Resource {
    /// All resource types, in canonical order
    pub const ALL: [Resource; 5] = [
        Resource::Brick,
        Resource::Wood,
        Resource::Wheat,
        Resource::Ore,
        Resource::Wool,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Brick => "Brick",
            Resource::Wood => "Wood",
            Resource::Wheat => "Wheat",
            Resource::Ore => "Ore",
            Resource::Wool => "Wool",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| ValidationError::InvalidResourceKind(s.to_string()))
    }
}

/// Terrain of a hex tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Forest,
    Fields,
    Pasture,
    Hills,
    Mountains,
    Desert,
}

impl Terrain {
    pub const ALL: [Terrain; 6] = [
        Terrain::Forest,
        Terrain::Fields,
        Terrain::Pasture,
        Terrain::Hills,
        Terrain::Mountains,
        Terrain::Desert,
    ];

    /// The resource this terrain produces, if any
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Forest => Some(Resource::Wood),
            Terrain::Fields => Some(Resource::Wheat),
            Terrain::Pasture => Some(Resource::Wool),
            Terrain::Hills => Some(Resource::Brick),
            Terrain::Mountains => Some(Resource::Ore),
            Terrain::Desert => None,
        }
    }

    /// Frequency table for the standard 19-tile board
    pub fn standard_frequencies() -> Vec<(Terrain, u32)> {
        vec![
            (Terrain::Forest, 4),
            (Terrain::Fields, 4),
            (Terrain::Pasture, 4),
            (Terrain::Hills, 3),
            (Terrain::Mountains, 3),
            (Terrain::Desert, 1),
        ]
    }
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub coord: HexCoord,
    pub terrain: Terrain,
    /// Dice total that triggers this tile (None for desert)
    pub number: Option<u8>,
    /// World-space center
    pub center: Vec3,
}

impl Tile {
    pub fn resource(&self) -> Option<Resource> {
        self.terrain.resource()
    }
}

/// A shared tile corner where towns and cities are built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub key: String,
    pub position: Vec3,
    /// Tiles meeting at this corner (1 to 3)
    pub tiles: Vec<HexCoord>,
    /// Keys of vertices one edge away
    pub neighbors: Vec<String>,
}

/// A tile side between two vertices where roads are built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub key: String,
    pub vertices: [String; 2],
    /// 1 on the coast, 2 inland
    pub tile_count: u8,
}

impl Edge {
    pub fn is_coastal(&self) -> bool {
        self.tile_count == 1
    }

    pub fn touches(&self, vertex: &str) -> bool {
        self.vertices.iter().any(|v| v == vertex)
    }
}

/// Port types for bank trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specialized(Resource),
}

impl PortKind {
    /// Ports in the standard configuration, in placement order
    pub fn standard_configuration() -> [PortKind; 9] {
        [
            PortKind::Specialized(Resource::Wood),
            PortKind::Specialized(Resource::Brick),
            PortKind::Specialized(Resource::Wheat),
            PortKind::Specialized(Resource::Ore),
            PortKind::Specialized(Resource::Wool),
            PortKind::Generic,
            PortKind::Generic,
            PortKind::Generic,
            PortKind::Generic,
        ]
    }

    /// The exchange rate for this port
    pub fn ratio(&self) -> u32 {
        match self {
            PortKind::Generic => 3,
            PortKind::Specialized(_) => 2,
        }
    }

    /// Display name such as "WoodPort" or "GenericPort"
    pub fn name(&self) -> String {
        match self {
            PortKind::Generic => "GenericPort".to_string(),
            PortKind::Specialized(resource) => format!("{}Port", resource),
        }
    }
}

/// A port bound to one coastal edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub kind: PortKind,
    pub edge: String,
    /// Positions of the edge's two vertices
    pub anchors: [Vec3; 2],
}

/// Result of a port placement run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPlacement {
    pub placed: usize,
    pub attempts: u32,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureKind {
    Town,
    City,
}

/// Occupant of a vertex.
///
/// A structure exists as soon as its foundation is placed; `built` flips
/// once all resources are deposited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub owner: PlayerId,
    pub kind: StructureKind,
    pub built: bool,
}

/// Occupant of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    pub owner: PlayerId,
    pub built: bool,
}

/// The complete game board
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub hex_size: f64,
    /// Tiles in generation order
    pub tiles: Vec<Tile>,
    pub vertices: BTreeMap<String, Vertex>,
    pub edges: BTreeMap<String, Edge>,
    pub ports: Vec<Port>,
    pub structures: BTreeMap<String, Structure>,
    pub roads: BTreeMap<String, Road>,
    #[serde(skip)]
    tile_index: HashMap<HexCoord, usize>,
}

impl Board {
    /// Generate a board from the configured ring count and terrain table.
    ///
    /// Fails fast on zero rings or an empty terrain table instead of
    /// producing an empty board. Incomplete port placement is not an error.
    pub fn generate<R: Rng>(config: &GameConfig, rng: &mut R) -> Result<Self, BoardError> {
        if config.rings == 0 {
            return Err(BoardError::NoRings);
        }
        let pool_size: u32 = config.terrain_frequencies.iter().map(|(_, n)| n).sum();
        if pool_size == 0 {
            return Err(BoardError::EmptyTerrainTable);
        }

        let mut terrain_pool: Vec<Terrain> = config
            .terrain_frequencies
            .iter()
            .flat_map(|&(terrain, count)| std::iter::repeat(terrain).take(count as usize))
            .collect();
        terrain_pool.shuffle(rng);

        let size = config.hex_size;
        let mut board = Board {
            hex_size: size,
            tiles: Vec::new(),
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            ports: Vec::new(),
            structures: BTreeMap::new(),
            roads: BTreeMap::new(),
            tile_index: HashMap::new(),
        };

        let mut edge_tiles: BTreeMap<String, ([String; 2], u8)> = BTreeMap::new();

        for (i, coord) in HexCoord::spiral(config.rings).into_iter().enumerate() {
            let terrain = terrain_pool.get(i).copied().unwrap_or(Terrain::Desert);
            board.tile_index.insert(coord, board.tiles.len());
            board.tiles.push(Tile {
                coord,
                terrain,
                number: None,
                center: coord.to_world(size),
            });

            let corners = coord.corners(size);
            let keys: Vec<String> = corners
                .iter()
                .map(|c| vertex_key(*c, config.snap_grid))
                .collect();

            for (corner, key) in corners.iter().zip(&keys) {
                let vertex = board.vertices.entry(key.clone()).or_insert_with(|| Vertex {
                    key: key.clone(),
                    position: *corner,
                    tiles: Vec::new(),
                    neighbors: Vec::new(),
                });
                if !vertex.tiles.contains(&coord) {
                    vertex.tiles.push(coord);
                }
            }

            for j in 0..6 {
                let a = &keys[j];
                let b = &keys[(j + 1) % 6];
                let entry = edge_tiles
                    .entry(edge_key(a, b))
                    .or_insert_with(|| (sorted_pair(a, b), 0));
                entry.1 += 1;
            }
        }

        for (key, (vertices, tile_count)) in edge_tiles {
            let [a, b] = &vertices;
            if let Some(v) = board.vertices.get_mut(a) {
                v.neighbors.push(b.clone());
            }
            if let Some(v) = board.vertices.get_mut(b) {
                v.neighbors.push(a.clone());
            }
            board.edges.insert(
                key.clone(),
                Edge {
                    key,
                    vertices,
                    tile_count,
                },
            );
        }

        board.assign_numbers(&config.dice_numbers, rng);
        let placement = board.create_ports(config.port_attempts, rng);

        info!(
            tiles = board.tiles.len(),
            vertices = board.vertices.len(),
            edges = board.edges.len(),
            ports = placement.placed,
            "Generated board"
        );

        Ok(board)
    }

    /// Shuffle the dice pool and hand numbers to producing tiles in order,
    /// wrapping around if there are more producing tiles than numbers.
    fn assign_numbers<R: Rng>(&mut self, pool: &[u8], rng: &mut R) {
        if pool.is_empty() {
            return;
        }
        let mut numbers = pool.to_vec();
        numbers.shuffle(rng);

        let mut next = 0;
        for tile in self.tiles.iter_mut() {
            if tile.terrain == Terrain::Desert {
                continue;
            }
            tile.number = Some(numbers[next % numbers.len()]);
            next += 1;
        }
    }

    /// Place the standard port configuration on coastal edges.
    ///
    /// Each attempt shuffles the coast and greedily takes edges whose
    /// vertices are not forbidden, then forbids the chosen vertices and their
    /// neighbors. Stops at the first complete layout; otherwise keeps the
    /// fullest partial layout found within `max_attempts`.
    pub fn create_ports<R: Rng>(&mut self, max_attempts: u32, rng: &mut R) -> PortPlacement {
        let kinds = PortKind::standard_configuration();
        let coastal: Vec<String> = self
            .edges
            .values()
            .filter(|e| e.is_coastal())
            .map(|e| e.key.clone())
            .collect();

        let mut best: Vec<Port> = Vec::new();
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            let mut candidates = coastal.clone();
            candidates.shuffle(rng);

            let mut forbidden: HashSet<&str> = HashSet::new();
            let mut placed: Vec<Port> = Vec::new();

            for key in &candidates {
                if placed.len() == kinds.len() {
                    break;
                }
                let Some(edge) = self.edges.get(key) else {
                    continue;
                };
                let [a, b] = &edge.vertices;
                if forbidden.contains(a.as_str()) || forbidden.contains(b.as_str()) {
                    continue;
                }
                let (Some(va), Some(vb)) = (self.vertices.get(a), self.vertices.get(b)) else {
                    continue;
                };
                if va.tiles.len() < 2 && vb.tiles.len() < 2 {
                    continue;
                }

                placed.push(Port {
                    kind: kinds[placed.len()],
                    edge: key.clone(),
                    anchors: [va.position, vb.position],
                });
                for v in [va, vb] {
                    forbidden.insert(v.key.as_str());
                    forbidden.extend(v.neighbors.iter().map(String::as_str));
                }
            }

            if placed.len() > best.len() {
                best = placed;
            }
            if best.len() == kinds.len() {
                break;
            }
        }

        let placement = PortPlacement {
            placed: best.len(),
            attempts,
            complete: best.len() == kinds.len(),
        };
        if placement.complete {
            debug!(attempts, "Placed all ports");
        } else {
            warn!(
                placed = best.len(),
                "Failed to place all {} ports after {} attempts",
                kinds.len(),
                attempts
            );
        }
        self.ports = best;
        placement
    }

    // ==================== Queries ====================

    pub fn tile(&self, coord: &HexCoord) -> Option<&Tile> {
        self.tile_index.get(coord).map(|&i| &self.tiles[i])
    }

    /// The tile under a world position, if it is on the board
    pub fn tile_at_position(&self, position: Vec3) -> Option<&Tile> {
        self.tile(&HexCoord::from_world(position, self.hex_size))
    }

    /// Tiles whose number matches a dice total, in generation order
    pub fn matching_tiles(&self, total: u8) -> Vec<&Tile> {
        self.tiles.iter().filter(|t| t.number == Some(total)).collect()
    }

    pub fn vertex(&self, key: &str) -> Option<&Vertex> {
        self.vertices.get(key)
    }

    pub fn edge(&self, key: &str) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// Nearest vertex to a position on the ground plane, with its distance
    pub fn find_nearest_vertex(&self, position: Vec3) -> Option<(&Vertex, f64)> {
        self.vertices
            .values()
            .map(|v| (v, v.position.planar_distance_to(&position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Vertices within `radius` of a position on the ground plane
    pub fn vertices_near(&self, position: Vec3, radius: f64) -> Vec<&Vertex> {
        self.vertices
            .values()
            .filter(|v| v.position.planar_distance_to(&position) <= radius)
            .collect()
    }

    /// Edges with one end at this vertex
    pub fn incident_edges<'a>(&'a self, vertex: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.vertex(vertex).into_iter().flat_map(move |v| {
            v.neighbors
                .iter()
                .filter_map(move |n| self.edges.get(&edge_key(vertex, n)))
        })
    }

    /// World-space midpoint of an edge
    pub fn edge_midpoint(&self, key: &str) -> Option<Vec3> {
        let edge = self.edge(key)?;
        let a = self.vertex(&edge.vertices[0])?;
        let b = self.vertex(&edge.vertices[1])?;
        Some(a.position.midpoint(&b.position))
    }

    /// Ports with a vertex within `radius` of a position
    pub fn ports_near(&self, position: Vec3, radius: f64) -> Vec<&Port> {
        self.ports
            .iter()
            .filter(|p| {
                p.anchors
                    .iter()
                    .any(|a| a.planar_distance_to(&position) <= radius)
            })
            .collect()
    }

    // ==================== Structures ====================

    pub fn structure_at(&self, vertex: &str) -> Option<&Structure> {
        self.structures.get(vertex)
    }

    pub fn road_at(&self, edge: &str) -> Option<&Road> {
        self.roads.get(edge)
    }

    /// Whether the player has a built town, city or road touching this vertex.
    ///
    /// Reserved spots still waiting for resources do not extend a network.
    pub fn player_touches_vertex(&self, vertex: &str, player: PlayerId) -> bool {
        if self
            .structure_at(vertex)
            .is_some_and(|s| s.owner == player && s.built)
        {
            return true;
        }
        self.incident_edges(vertex)
            .any(|e| self.road_at(&e.key).is_some_and(|r| r.owner == player && r.built))
    }

    /// Reserve a vertex for a town foundation
    pub fn reserve_town(&mut self, vertex: &str, owner: PlayerId) {
        self.structures.insert(
            vertex.to_string(),
            Structure {
                owner,
                kind: StructureKind::Town,
                built: false,
            },
        );
    }

    /// Reserve an edge for a road foundation
    pub fn reserve_road(&mut self, edge: &str, owner: PlayerId) {
        self.roads
            .insert(edge.to_string(), Road { owner, built: false });
    }

    pub fn complete_town(&mut self, vertex: &str) {
        if let Some(s) = self.structures.get_mut(vertex) {
            s.built = true;
        }
    }

    pub fn upgrade_to_city(&mut self, vertex: &str) {
        if let Some(s) = self.structures.get_mut(vertex) {
            s.kind = StructureKind::City;
            s.built = true;
        }
    }

    pub fn complete_road(&mut self, edge: &str) {
        if let Some(r) = self.roads.get_mut(edge) {
            r.built = true;
        }
    }

    /// Remove everything a player has placed
    pub fn clear_player(&mut self, player: PlayerId) {
        self.structures.retain(|_, s| s.owner != player);
        self.roads.retain(|_, r| r.owner != player);
    }

    /// Check that no two ports share or neighbor a vertex
    pub fn ports_respect_distance_rule(&self) -> bool {
        let mut claimed: BTreeSet<&str> = BTreeSet::new();
        for port in &self.ports {
            let Some(edge) = self.edge(&port.edge) else {
                return false;
            };
            for v in &edge.vertices {
                if claimed.contains(v.as_str()) {
                    return false;
                }
            }
            for v in &edge.vertices {
                claimed.insert(v.as_str());
                if let Some(vertex) = self.vertex(v) {
                    claimed.extend(vertex.neighbors.iter().map(String::as_str));
                }
            }
        }
        true
    }
}

fn sorted_pair(a: &str, b: &str) -> [String; 2] {
    if a <= b {
        [a.to_string(), b.to_string()]
    } else {
        [b.to_string(), a.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board(seed: u64) -> Board {
        Board::generate(&GameConfig::default(), &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_standard_board_counts() {
        let board = board(1);
        assert_eq!(board.tiles.len(), 19);
        assert_eq!(board.vertices.len(), 54);
        assert_eq!(board.edges.len(), 72);
        assert_eq!(board.edges.values().filter(|e| e.is_coastal()).count(), 30);
    }

    #[test]
    fn test_counts_follow_ring_formula() {
        for rings in 1..=4u32 {
            let config = GameConfig {
                rings,
                ..GameConfig::default()
            };
            let board = Board::generate(&config, &mut StdRng::seed_from_u64(3)).unwrap();
            let n = rings as usize;
            assert_eq!(board.tiles.len(), 3 * n * n + 3 * n + 1);
            assert_eq!(board.vertices.len(), 6 * (n + 1) * (n + 1));
            assert_eq!(board.edges.len(), 9 * n * n + 15 * n + 6);
        }
    }

    #[test]
    fn test_terrain_distribution() {
        let board = board(7);
        for (terrain, count) in Terrain::standard_frequencies() {
            let actual = board.tiles.iter().filter(|t| t.terrain == terrain).count();
            assert_eq!(actual, count as usize, "{:?}", terrain);
        }
    }

    #[test]
    fn test_extra_tiles_default_to_desert() {
        let config = GameConfig {
            rings: 3,
            ..GameConfig::default()
        };
        let board = Board::generate(&config, &mut StdRng::seed_from_u64(5)).unwrap();
        let deserts = board
            .tiles
            .iter()
            .filter(|t| t.terrain == Terrain::Desert)
            .count();
        // 37 tiles, 19 from the pool (one of them desert)
        assert_eq!(deserts, 37 - 19 + 1);
    }

    #[test]
    fn test_number_distribution() {
        let board = board(11);
        let mut numbers: Vec<u8> = board.tiles.iter().filter_map(|t| t.number).collect();
        numbers.sort();
        let mut expected = GameConfig::default().dice_numbers;
        expected.sort();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn test_desert_has_no_number() {
        let board = board(13);
        for tile in &board.tiles {
            assert_eq!(tile.number.is_none(), tile.terrain == Terrain::Desert);
            assert_ne!(tile.number, Some(7));
        }
    }

    #[test]
    fn test_numbers_wrap_on_larger_board() {
        let config = GameConfig {
            rings: 3,
            terrain_frequencies: vec![(Terrain::Forest, 37)],
            ..GameConfig::default()
        };
        let board = Board::generate(&config, &mut StdRng::seed_from_u64(2)).unwrap();
        assert!(board.tiles.iter().all(|t| t.number.is_some()));
    }

    #[test]
    fn test_zero_rings_fails() {
        let config = GameConfig {
            rings: 0,
            ..GameConfig::default()
        };
        let result = Board::generate(&config, &mut StdRng::seed_from_u64(0));
        assert_eq!(result.unwrap_err(), BoardError::NoRings);
    }

    #[test]
    fn test_empty_terrain_table_fails() {
        let config = GameConfig {
            terrain_frequencies: vec![(Terrain::Forest, 0)],
            ..GameConfig::default()
        };
        let result = Board::generate(&config, &mut StdRng::seed_from_u64(0));
        assert_eq!(result.unwrap_err(), BoardError::EmptyTerrainTable);
    }

    #[test]
    fn test_vertex_tiles_and_neighbors() {
        let board = board(17);
        for vertex in board.vertices.values() {
            assert!((1..=3).contains(&vertex.tiles.len()));
            assert!((2..=3).contains(&vertex.neighbors.len()));
            for n in &vertex.neighbors {
                let other = board.vertex(n).unwrap();
                assert!(other.neighbors.contains(&vertex.key), "asymmetric {}", n);
            }
        }
    }

    #[test]
    fn test_edges_are_unique_and_canonical() {
        let board = board(19);
        for (key, edge) in &board.edges {
            assert_eq!(key, &edge_key(&edge.vertices[0], &edge.vertices[1]));
            assert!(edge.vertices[0] < edge.vertices[1]);
            assert!((1..=2).contains(&edge.tile_count));
        }
    }

    #[test]
    fn test_ports_follow_distance_rule() {
        for seed in 0..10 {
            let board = board(seed);
            assert!(board.ports.len() <= 9);
            assert!(board.ports_respect_distance_rule(), "seed {}", seed);
            for port in &board.ports {
                assert!(board.edge(&port.edge).unwrap().is_coastal());
            }
        }
    }

    #[test]
    fn test_full_port_layout_is_reachable() {
        let complete = (0..10).any(|seed| board(seed).ports.len() == 9);
        assert!(complete);
    }

    #[test]
    fn test_specialized_ports_come_first() {
        let board = board(23);
        let specialized = board
            .ports
            .iter()
            .take(5)
            .filter(|p| matches!(p.kind, PortKind::Specialized(_)))
            .count();
        assert_eq!(specialized, board.ports.len().min(5));
    }

    #[test]
    fn test_port_ratios_and_names() {
        assert_eq!(PortKind::Generic.ratio(), 3);
        assert_eq!(PortKind::Specialized(Resource::Ore).ratio(), 2);
        assert_eq!(PortKind::Specialized(Resource::Wood).name(), "WoodPort");
        assert_eq!(PortKind::Generic.name(), "GenericPort");
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = board(42);
        let b = board(42);
        assert_eq!(a.tiles, b.tiles);
        assert_eq!(a.ports, b.ports);
    }

    #[test]
    fn test_find_nearest_vertex() {
        let board = board(29);
        let vertex = board.vertices.values().next().unwrap().clone();
        let point = Vec3::new(vertex.position.x + 3.0, 0.0, vertex.position.z);
        let (nearest, distance) = board.find_nearest_vertex(point).unwrap();
        assert_eq!(nearest.key, vertex.key);
        assert!((distance - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_tile_at_position() {
        let board = board(31);
        let tile = &board.tiles[5];
        let p = Vec3::new(tile.center.x + 10.0, 0.0, tile.center.z - 10.0);
        assert_eq!(board.tile_at_position(p).unwrap().coord, tile.coord);
        assert!(board.tile_at_position(Vec3::new(10_000.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_matching_tiles() {
        let board = board(37);
        let eights = board.matching_tiles(8);
        assert_eq!(eights.len(), 2);
        assert!(board.matching_tiles(7).is_empty());
    }

    #[test]
    fn test_incident_edges() {
        let board = board(41);
        for vertex in board.vertices.values() {
            let incident: Vec<&Edge> = board.incident_edges(&vertex.key).collect();
            assert_eq!(incident.len(), vertex.neighbors.len());
            assert!(incident.iter().all(|e| e.touches(&vertex.key)));
        }
    }

    #[test]
    fn test_vertices_near_tile_center() {
        let board = board(43);
        // Corners sit 2s/sqrt(3) from the center, about 46.2 for s = 40
        let center = board.tiles[0].center;
        assert_eq!(board.vertices_near(center, 47.0).len(), 6);
        assert!(board.vertices_near(center, 10.0).is_empty());
    }

    #[test]
    fn test_resource_parsing() {
        assert_eq!("Wood".parse::<Resource>().unwrap(), Resource::Wood);
        assert_eq!(
            "Lumber".parse::<Resource>().unwrap_err(),
            ValidationError::InvalidResourceKind("Lumber".to_string())
        );
    }
}
