use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
    fmt::Display,
    str::FromStr,
};

use log::debug;

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, comparable and not references (hence 'static)
pub trait NodeReference: Copy + Eq + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for per-node bookkeeping during a search
    type Storage<T: Default + Copy + Clone + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if the provided node exists and can be traversed
    fn is_free(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the free neighbors of the provided node, always in the same order
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference>;

    /// A lower bound on the number of steps between two nodes
    fn estimate(&self, from: Self::Reference, to: Self::Reference) -> usize;

    /// Create a storage for values of type T, one per node
    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T>;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    /// Check if the provided node has a slot in this storage
    fn is_valid(&self, node: Self::Reference) -> bool;
    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

/// The exploration strategy used to search the map
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Algorithm {
    Bfs,
    Dfs,
    #[value(name = "astar")]
    AStar,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Algorithm::Bfs => "bfs",
                Algorithm::Dfs => "dfs",
                Algorithm::AStar => "astar",
            }
        )
    }
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bfs" => Ok(Algorithm::Bfs),
            "dfs" => Ok(Algorithm::Dfs),
            "astar" => Ok(Algorithm::AStar),
            _ => Err(anyhow::anyhow!("Invalid algorithm: {}", s)),
        }
    }
}

/// The route found by a search together with the order in which nodes were explored
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct SearchResult<R> {
    /// Nodes from start to goal, empty when there is no route
    pub path: Vec<R>,
    /// Every node the search reached, in order, without duplicates
    pub visited: Vec<R>,
}

impl<R> SearchResult<R> {
    fn empty() -> Self {
        Self {
            path: Vec::new(),
            visited: Vec::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        !self.path.is_empty()
    }

    /// Path length in nodes
    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

/// Search the map with the chosen algorithm
pub fn find_path<M: MapTrait>(
    map: &M,
    start: M::Reference,
    goal: M::Reference,
    algorithm: Algorithm,
) -> SearchResult<M::Reference> {
    let result = match algorithm {
        Algorithm::Bfs => bfs(map, start, goal),
        Algorithm::Dfs => dfs(map, start, goal),
        Algorithm::AStar => astar(map, start, goal),
    };

    debug!(
        "{}: path of {} nodes, {} visited",
        algorithm,
        result.len(),
        result.visited.len()
    );

    result
}

/// Breadth-first search, the path found has the fewest possible steps
pub fn bfs<M: MapTrait>(
    map: &M,
    start: M::Reference,
    goal: M::Reference,
) -> SearchResult<M::Reference> {
    uninformed(map, start, goal, VecDeque::new())
}

/// Depth-first search, returns some route between start and goal if there is one
pub fn dfs<M: MapTrait>(
    map: &M,
    start: M::Reference,
    goal: M::Reference,
) -> SearchResult<M::Reference> {
    uninformed(map, start, goal, Vec::new())
}

/// The container of discovered nodes waiting to be expanded
trait Frontier<R> {
    fn put(&mut self, node: R);
    fn take(&mut self) -> Option<R>;
}

impl<R> Frontier<R> for VecDeque<R> {
    fn put(&mut self, node: R) {
        self.push_back(node);
    }

    fn take(&mut self) -> Option<R> {
        self.pop_front()
    }
}

impl<R> Frontier<R> for Vec<R> {
    fn put(&mut self, node: R) {
        self.push(node);
    }

    fn take(&mut self) -> Option<R> {
        self.pop()
    }
}

/// Shared loop of BFS and DFS, nodes are marked and recorded when they are discovered
fn uninformed<M: MapTrait, F: Frontier<M::Reference>>(
    map: &M,
    start: M::Reference,
    goal: M::Reference,
    mut frontier: F,
) -> SearchResult<M::Reference> {
    if !map.is_free(start) || !map.is_free(goal) {
        return SearchResult::empty();
    }

    let mut discovered: M::Storage<bool> = map.create_storage();
    let mut came_from: M::Storage<Option<M::Reference>> = map.create_storage();
    let mut visited = vec![start];

    *discovered.get_mut(start) = true;
    frontier.put(start);

    while let Some(node) = frontier.take() {
        if node == goal {
            break;
        }

        for next in map.neighbors_of(node) {
            if !discovered.get(next) {
                *discovered.get_mut(next) = true;
                *came_from.get_mut(next) = Some(node);
                visited.push(next);
                frontier.put(next);
            }
        }
    }

    SearchResult {
        path: reconstruct(&came_from, start, goal),
        visited,
    }
}

/// The objects that we store in the priority queue
#[derive(Debug)]
struct ToVisit<R> {
    /// total estimated cost, steps so far plus the estimate to the goal
    cost: usize,
    estimate: usize,
    /// insertion counter, earlier entries win ties
    order: usize,
    steps: usize,
    point: R,
}

impl<R> ToVisit<R> {
    fn key(&self) -> (usize, usize, usize) {
        (self.cost, self.estimate, self.order)
    }
}

impl<R> Ord for ToVisit<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key()).reverse() // reverse for BinaryHeap to be a min-heap
    }
}

impl<R> PartialOrd for ToVisit<R> {
    fn partial_cmp(&self, other: &ToVisit<R>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> PartialEq for ToVisit<R> {
    fn eq(&self, other: &ToVisit<R>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R> Eq for ToVisit<R> {}

/// A* search with unit step costs. `visited` lists the nodes in the order they were closed.
pub fn astar<M: MapTrait>(
    map: &M,
    start: M::Reference,
    goal: M::Reference,
) -> SearchResult<M::Reference> {
    if !map.is_free(start) || !map.is_free(goal) {
        return SearchResult::empty();
    }

    let mut came_from: M::Storage<Option<M::Reference>> = map.create_storage();
    let mut steps: M::Storage<Option<usize>> = map.create_storage();
    let mut closed: M::Storage<bool> = map.create_storage();
    let mut visited = Vec::new();

    let mut order = 0;
    let estimate = map.estimate(start, goal);
    *steps.get_mut(start) = Some(0);
    let mut visit_list = BinaryHeap::from([ToVisit {
        cost: estimate,
        estimate,
        order,
        steps: 0,
        point: start,
    }]);

    while let Some(visit) = visit_list.pop() {
        // stale entries of nodes that were already expanded with a lower cost
        if closed.get(visit.point) {
            continue;
        }
        *closed.get_mut(visit.point) = true;
        visited.push(visit.point);

        if visit.point == goal {
            break;
        }

        for point in map.neighbors_of(visit.point) {
            if closed.get(point) {
                continue;
            }

            let tentative = visit.steps + 1;
            if steps.get(point).map_or(true, |known| tentative < known) {
                *steps.get_mut(point) = Some(tentative);
                *came_from.get_mut(point) = Some(visit.point);

                order += 1;
                let estimate = map.estimate(point, goal);
                visit_list.push(ToVisit {
                    cost: tentative + estimate,
                    estimate,
                    order,
                    steps: tentative,
                    point,
                });
            }
        }
    }

    SearchResult {
        path: reconstruct(&came_from, start, goal),
        visited,
    }
}

/// Walk the predecessors back from the goal and return the route from start to goal.
/// Returns an empty route when the goal was never reached or lies outside the storage.
pub fn reconstruct<R, S>(came_from: &S, start: R, goal: R) -> Vec<R>
where
    R: NodeReference,
    S: MapStorage<Option<R>, Reference = R>,
{
    if !came_from.is_valid(start) || !came_from.is_valid(goal) {
        return Vec::new();
    }
    if goal != start && came_from.get(goal).is_none() {
        return Vec::new();
    }

    let mut path = vec![goal];
    let mut current = goal;

    while current != start {
        current = match came_from.get(current) {
            Some(from) => from,
            None => panic!("Backtracking lead to a node that was never reached"),
        };
        path.push(current);
    }

    path.reverse();
    path
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::grid::{Cell, CellStorage, OccupancyGrid};

    const ALGORITHMS: [Algorithm; 3] = [Algorithm::Bfs, Algorithm::Dfs, Algorithm::AStar];

    fn open_map() -> OccupancyGrid {
        OccupancyGrid::parse("0 0 3 3 1\n0 0 0\n0 0 0\n0 0 0\n", 0.0).unwrap()
    }

    fn create_basic_map() -> OccupancyGrid {
        let text = "0 0 5 5 1\n\
                    0 0 0 0 0\n\
                    1 1 1 1 0\n\
                    0 0 0 1 0\n\
                    0 1 0 0 0\n\
                    0 1 1 1 1\n";
        OccupancyGrid::parse(text, 0.0).unwrap()
    }

    fn create_split_map() -> OccupancyGrid {
        let text = "0 0 4 3 1\n\
                    0 0 1 0\n\
                    0 0 1 0\n\
                    0 0 1 0\n";
        OccupancyGrid::parse(text, 0.0).unwrap()
    }

    fn cells(pairs: &[(isize, isize)]) -> Vec<Cell> {
        pairs.iter().map(|&(row, col)| Cell::new(row, col)).collect()
    }

    fn free_cells(map: &OccupancyGrid) -> Vec<Cell> {
        (0..map.height() as isize)
            .flat_map(|row| (0..map.width() as isize).map(move |col| Cell::new(row, col)))
            .filter(|cell| map.is_free(*cell))
            .collect()
    }

    fn assert_connected(path: &[Cell]) {
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(&pair[1]), 1, "{:?}", path);
        }
    }

    fn assert_unique(visited: &[Cell]) {
        for (idx, cell) in visited.iter().enumerate() {
            assert!(!visited[idx + 1..].contains(cell), "{} visited twice", cell);
        }
    }

    #[test]
    fn test_bfs_open_map() {
        let map = open_map();
        let result = bfs(&map, Cell::new(0, 0), Cell::new(2, 2));

        assert_eq!(result.path, cells(&[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)]));
        assert_eq!(
            result.visited,
            cells(&[
                (0, 0),
                (1, 0),
                (0, 1),
                (2, 0),
                (1, 1),
                (0, 2),
                (2, 1),
                (1, 2),
                (2, 2)
            ])
        );
    }

    #[test]
    fn test_dfs_open_map() {
        let map = open_map();
        let result = dfs(&map, Cell::new(0, 0), Cell::new(2, 2));

        // the last neighbor pushed is expanded first
        assert_eq!(result.path, cells(&[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2)]));
        assert_eq!(
            result.visited,
            cells(&[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2), (1, 2), (2, 2)])
        );
    }

    #[test]
    fn test_astar_open_map() {
        let map = open_map();
        let result = astar(&map, Cell::new(0, 0), Cell::new(2, 2));

        // equal f everywhere, so the lower estimate and then the earlier insertion decide
        assert_eq!(result.path, cells(&[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)]));
        assert_eq!(result.visited, result.path);
    }

    #[test]
    fn test_basic_route() {
        let map = create_basic_map();
        let expected = cells(&[
            (0, 0),
            (0, 1),
            (0, 2),
            (0, 3),
            (0, 4),
            (1, 4),
            (2, 4),
            (3, 4),
            (3, 3),
            (3, 2),
            (2, 2),
            (2, 1),
            (2, 0),
        ]);

        for algorithm in ALGORITHMS {
            let result = find_path(&map, Cell::new(0, 0), Cell::new(2, 0), algorithm);
            assert_eq!(result.path, expected, "{}", algorithm);
            assert_unique(&result.visited);
        }
    }

    #[test]
    fn test_basic_no_route() {
        let map = create_split_map();

        for algorithm in ALGORITHMS {
            let result = find_path(&map, Cell::new(0, 0), Cell::new(0, 3), algorithm);
            assert!(!result.is_found(), "{}", algorithm);
            // the whole left component gets explored
            assert_eq!(result.visited.len(), 6, "{}", algorithm);
            assert_unique(&result.visited);
        }
    }

    #[test]
    fn test_start_is_goal() {
        let map = create_basic_map();
        let start = Cell::new(3, 0);

        for algorithm in ALGORITHMS {
            let result = find_path(&map, start, start, algorithm);
            assert_eq!(result.path, vec![start], "{}", algorithm);
            assert_eq!(result.visited, vec![start], "{}", algorithm);
        }
    }

    #[test]
    fn test_blocked_endpoints() {
        let map = create_basic_map();
        let free = Cell::new(0, 0);

        for blocked in [Cell::new(1, 0), Cell::new(-1, 0), Cell::new(0, 5)] {
            for algorithm in ALGORITHMS {
                let result = find_path(&map, free, blocked, algorithm);
                assert_eq!(result, SearchResult::empty(), "{}", algorithm);

                let result = find_path(&map, blocked, free, algorithm);
                assert_eq!(result, SearchResult::empty(), "{}", algorithm);
            }
        }
    }

    #[test]
    fn test_all_pairs() {
        let text = "0 0 6 5 1\n\
                    0 0 0 0 0 0\n\
                    0 1 1 0 1 0\n\
                    0 0 0 0 1 0\n\
                    1 1 0 1 1 0\n\
                    0 0 0 0 0 0\n";
        let map = OccupancyGrid::parse(text, 0.0).unwrap();
        let free = free_cells(&map);

        for &start in &free {
            for &goal in &free {
                let shortest = bfs(&map, start, goal);
                let informed = astar(&map, start, goal);
                let deep = dfs(&map, start, goal);

                // the map is connected, every pair has a route
                for result in [&shortest, &informed, &deep] {
                    assert_eq!(result.path.first(), Some(&start));
                    assert_eq!(result.path.last(), Some(&goal));
                    assert_connected(&result.path);
                    assert_unique(&result.visited);
                }

                assert_eq!(shortest.len(), informed.len(), "{} -> {}", start, goal);
                assert!(deep.len() >= shortest.len());
            }
        }
    }

    #[test]
    fn test_route_around_inflated_obstacle() {
        let text = "0 0 7 5 1\n\
                    0 0 0 0 0 0 0\n\
                    0 0 0 0 0 0 0\n\
                    0 0 0 1 0 0 0\n\
                    0 0 0 0 0 0 0\n\
                    0 0 0 0 0 0 0\n";
        let plain = OccupancyGrid::parse(text, 0.0).unwrap();
        let inflated = OccupancyGrid::parse(text, 1.0).unwrap();
        let (start, goal) = (Cell::new(2, 0), Cell::new(2, 6));

        assert_eq!(bfs(&plain, start, goal).len(), 9);
        // the 3x3 block forces a detour through row 0 or row 4
        let result = bfs(&inflated, start, goal);
        assert_eq!(result.len(), 11);
        assert!(result.path.iter().all(|cell| inflated.is_free(*cell)));
        assert_eq!(astar(&inflated, start, goal).len(), 11);
    }

    #[test]
    fn test_reconstruct_outside_storage() {
        let map = open_map();
        let came_from: CellStorage<Option<Cell>> = map.create_storage();

        assert!(reconstruct(&came_from, Cell::new(0, 0), Cell::new(-1, 0)).is_empty());
        assert!(reconstruct(&came_from, Cell::new(0, 0), Cell::new(0, 3)).is_empty());
        assert!(reconstruct(&came_from, Cell::new(3, 0), Cell::new(3, 0)).is_empty());
        assert_eq!(
            reconstruct(&came_from, Cell::new(1, 1), Cell::new(1, 1)),
            vec![Cell::new(1, 1)]
        );
    }

    #[test]
    fn test_algorithm_names() {
        for algorithm in ALGORITHMS {
            assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert_eq!("astar".parse::<Algorithm>().unwrap(), Algorithm::AStar);
        assert!("dijkstra".parse::<Algorithm>().is_err());
    }
}
