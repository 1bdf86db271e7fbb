use crate::geom::{axis_deviation, rotate};
use crate::params::GridGraphParams;
use nalgebra::{Point2, Vector2};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Right,
    Left,
    Up,
    Down,
}

impl NeighborDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Right => Self::Left,
            Self::Left => Self::Right,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    fn step(self) -> (i32, i32) {
        match self {
            Self::Right => (1, 0),
            Self::Left => (-1, 0),
            Self::Up => (0, -1),
            Self::Down => (0, 1),
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Right => 0,
            Self::Left => 1,
            Self::Up => 2,
            Self::Down => 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    /// Lower is better.
    pub score: f32,
}

/// Classify a vector already expressed in the grid-aligned frame.
fn direction_quadrant(v: &Vector2<f32>) -> NeighborDirection {
    if v.x.abs() > v.y.abs() {
        if v.x >= 0.0 {
            NeighborDirection::Right
        } else {
            NeighborDirection::Left
        }
    } else if v.y >= 0.0 {
        NeighborDirection::Down
    } else {
        NeighborDirection::Up
    }
}

/// Indices and distances of the `k` nearest other points, closest first.
fn k_nearest(points: &[Point2<f32>], i: usize, k: usize) -> Vec<(usize, f32)> {
    let mut all: Vec<(usize, f32)> = points
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(j, p)| (j, (p - points[i]).norm()))
        .collect();
    all.sort_by(|a, b| a.1.total_cmp(&b.1));
    all.truncate(k);
    all
}

/// Median nearest-neighbour distance, a robust estimate of the square size in pixels.
pub fn estimate_spacing(points: &[Point2<f32>]) -> Option<f32> {
    if points.len() < 2 {
        return None;
    }
    let mut d: Vec<f32> = (0..points.len())
        .filter_map(|i| k_nearest(points, i, 1).first().map(|n| n.1))
        .collect();
    d.sort_by(|a, b| a.total_cmp(b));
    let m = d[d.len() / 2];
    (m > 0.0).then_some(m)
}

/// Edge vectors from every point to its nearest neighbour.
pub fn nearest_edges(points: &[Point2<f32>]) -> Vec<Vector2<f32>> {
    (0..points.len())
        .filter_map(|i| {
            k_nearest(points, i, 1)
                .first()
                .map(|&(j, _)| points[j] - points[i])
        })
        .collect()
}

fn candidate(
    from: &Point2<f32>,
    to: &Point2<f32>,
    index: usize,
    params: &GridGraphParams,
    spacing: f32,
    grid_angle: f32,
) -> Option<NodeNeighbor> {
    let v = to - from;
    let distance = v.norm();
    if distance < params.min_spacing_ratio * spacing || distance > params.max_spacing_ratio * spacing
    {
        return None;
    }

    let aligned = rotate(&v, -grid_angle);
    let deviation = axis_deviation(aligned.y.atan2(aligned.x));
    if deviation > params.direction_tolerance_deg.to_radians() {
        return None;
    }

    let spacing_error = (distance - spacing).abs() / spacing;
    Some(NodeNeighbor {
        direction: direction_quadrant(&aligned),
        index,
        distance,
        score: deviation + spacing_error,
    })
}

/// Keep at most one neighbour per direction, choosing the lowest-score candidate.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> Vec<NodeNeighbor> {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates {
        let slot = &mut best[candidate.direction.slot()];
        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.score < current.score
                    || (candidate.score == current.score && candidate.distance < current.distance)
            }
        };
        if replace {
            *slot = Some(candidate);
        }
    }

    best.into_iter().flatten().collect()
}

/// 4-connected neighbour graph over corner candidates.
pub struct GridGraph {
    pub neighbors: Vec<Vec<NodeNeighbor>>,
}

impl GridGraph {
    /// Build the graph in the frame rotated by `-grid_angle`.
    ///
    /// Only reciprocal links survive: if `a` sees `b` on its right, `b` must
    /// see `a` on its left.
    pub fn new(
        points: &[Point2<f32>],
        params: &GridGraphParams,
        spacing: f32,
        grid_angle: f32,
    ) -> Self {
        let one_sided: Vec<Vec<NodeNeighbor>> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let candidates = k_nearest(points, i, params.k_neighbors)
                    .into_iter()
                    .filter_map(|(j, _)| candidate(p, &points[j], j, params, spacing, grid_angle))
                    .collect();
                select_neighbors(candidates)
            })
            .collect();

        let neighbors = one_sided
            .iter()
            .enumerate()
            .map(|(i, list)| {
                list.iter()
                    .filter(|n| {
                        one_sided[n.index]
                            .iter()
                            .any(|back| back.index == i && back.direction == n.direction.opposite())
                    })
                    .cloned()
                    .collect()
            })
            .collect();

        Self { neighbors }
    }
}

pub fn connected_components(graph: &GridGraph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.neighbors.len()];
    let mut components = Vec::new();

    for start in 0..graph.neighbors.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);

            for neighbor in &graph.neighbors[node] {
                if !visited[neighbor.index] {
                    stack.push(neighbor.index);
                }
            }
        }

        components.push(component);
    }

    components
}

/// Integer grid coordinates of a component, found by BFS from its first node.
///
/// Returns `None` when two paths reach the same node with different
/// coordinates, or two nodes land on the same cell.
pub fn assign_grid_coordinates(
    graph: &GridGraph,
    component: &[usize],
) -> Option<Vec<(usize, i32, i32)>> {
    let start = *component.first()?;
    let mut coords: Vec<Option<(i32, i32)>> = vec![None; graph.neighbors.len()];
    let mut queue = VecDeque::new();
    coords[start] = Some((0, 0));
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        let (i, j) = coords[node]?;
        for neighbor in &graph.neighbors[node] {
            let (di, dj) = neighbor.direction.step();
            let expected = (i + di, j + dj);
            match coords[neighbor.index] {
                Some(existing) if existing != expected => return None,
                Some(_) => {}
                None => {
                    coords[neighbor.index] = Some(expected);
                    queue.push_back(neighbor.index);
                }
            }
        }
    }

    let mut out: Vec<(usize, i32, i32)> = component
        .iter()
        .filter_map(|&n| coords[n].map(|(i, j)| (n, i, j)))
        .collect();

    let mut cells: Vec<(i32, i32)> = out.iter().map(|&(_, i, j)| (i, j)).collect();
    cells.sort_unstable();
    cells.dedup();
    if cells.len() != out.len() {
        return None;
    }
    out.sort_by_key(|&(_, i, j)| (j, i));
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn grid(cols: usize, rows: usize, spacing: f32, angle: f32) -> Vec<Point2<f32>> {
        let mut pts = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let v = rotate(&Vector2::new(i as f32 * spacing, j as f32 * spacing), angle);
                pts.push(Point2::new(100.0 + v.x, 80.0 + v.y));
            }
        }
        pts
    }

    fn neighbor_map(neighbors: &[NodeNeighbor]) -> HashMap<NeighborDirection, &NodeNeighbor> {
        neighbors.iter().map(|n| (n.direction, n)).collect()
    }

    #[test]
    fn finds_axis_neighbors_in_regular_grid() {
        let spacing = 10.0;
        let cols = 3;
        let corners = grid(cols, 3, spacing, 0.0);
        let graph = GridGraph::new(&corners, &GridGraphParams::default(), spacing, 0.0);

        let idx = |i: usize, j: usize| j * cols + i;

        let center = neighbor_map(&graph.neighbors[idx(1, 1)]);
        assert_eq!(4, center.len());
        assert_eq!(idx(0, 1), center[&NeighborDirection::Left].index);
        assert_eq!(idx(2, 1), center[&NeighborDirection::Right].index);
        assert_eq!(idx(1, 0), center[&NeighborDirection::Up].index);
        assert_eq!(idx(1, 2), center[&NeighborDirection::Down].index);
        for n in center.values() {
            assert!((n.distance - spacing).abs() < 1e-4);
        }

        let top_left = neighbor_map(&graph.neighbors[idx(0, 0)]);
        assert_eq!(2, top_left.len());
        assert!(top_left.contains_key(&NeighborDirection::Right));
        assert!(top_left.contains_key(&NeighborDirection::Down));
    }

    #[test]
    fn rotated_grid_is_classified_in_grid_frame() {
        let spacing = 20.0;
        let angle = 0.6;
        let corners = grid(4, 3, spacing, angle);
        let graph = GridGraph::new(&corners, &GridGraphParams::default(), spacing, angle);
        let center = neighbor_map(&graph.neighbors[5]);
        assert_eq!(center[&NeighborDirection::Right].index, 6);
        assert_eq!(center[&NeighborDirection::Down].index, 9);
    }

    #[test]
    fn rejects_neighbors_outside_distance_window() {
        let corners = vec![Point2::new(0.0, 0.0), Point2::new(30.0, 0.0)];
        let graph = GridGraph::new(&corners, &GridGraphParams::default(), 10.0, 0.0);
        assert!(graph.neighbors[0].is_empty());
        assert!(graph.neighbors[1].is_empty());
    }

    #[test]
    fn diagonal_links_are_rejected() {
        let corners = vec![Point2::new(0.0, 0.0), Point2::new(10.0, 10.0)];
        let graph = GridGraph::new(&corners, &GridGraphParams::default(), 14.0, 0.0);
        assert!(graph.neighbors[0].is_empty());
    }

    #[test]
    fn keeps_best_candidate_per_direction() {
        let corners = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(12.0, 0.5),
            Point2::new(-10.0, 0.0),
        ];
        let graph = GridGraph::new(&corners, &GridGraphParams::default(), 10.0, 0.0);
        let map = neighbor_map(&graph.neighbors[0]);
        assert_eq!(2, map.len());
        assert_eq!(1, map[&NeighborDirection::Right].index);
        assert_eq!(3, map[&NeighborDirection::Left].index);
    }

    #[test]
    fn bfs_assigns_raster_coordinates() {
        let corners = grid(5, 4, 12.0, 0.1);
        let spacing = estimate_spacing(&corners).expect("spacing");
        assert!((spacing - 12.0).abs() < 1e-3);
        let graph = GridGraph::new(&corners, &GridGraphParams::default(), spacing, 0.1);
        let comps = connected_components(&graph);
        assert_eq!(comps.len(), 1);
        let coords = assign_grid_coordinates(&graph, &comps[0]).expect("consistent");
        assert_eq!(coords.len(), 20);
        let (min_i, min_j) = coords
            .iter()
            .fold((i32::MAX, i32::MAX), |(a, b), &(_, i, j)| (a.min(i), b.min(j)));
        for &(n, i, j) in &coords {
            assert_eq!(n, ((j - min_j) * 5 + (i - min_i)) as usize);
        }
    }
}
