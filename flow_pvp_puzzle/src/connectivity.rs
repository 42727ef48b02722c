// Connectivity engine: turning paths into pipes and reading pipes back.
//
// Everything that writes more than one pipe cell at a time lives here, so
// this is the module that keeps `Connections` mutually consistent across
// neighbors (see `pipes.rs`). Operations:
//
// - `is_edge_pipe`: is this pipe cell a free end (topological degree <= 1)?
// - `trace_connected_chain`: walk a pipe along its connection flags, clearing
//   each cell as it is visited. Used to pick an unfinished pipe back up.
// - `derive_connections` / `commit_path`: materialize a finished drag.
// - `remove_pipe`: erase a whole pipe starting from any of its cells.
// - `is_board_complete`: the win condition.
//
// The chain walk and the removal both use explicit work lists (a `Vec` stack
// and a `VecDeque` queue) rather than recursion, so depth is bounded by the
// heap, not the call stack, on any board size.
//
// See also: `tracer.rs`, which decides *when* these run in response to
// pointer input, and `game.rs`, which ties both to one board.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::board::Board;
use crate::pipes::{Connections, Pipe, PipeStore};
use crate::types::{Cell, ColorId, Direction};

/// Same-colored neighbors joined to `cell` by flags set on *both* sides.
pub fn linked_neighbors(pipes: &PipeStore, cell: Cell) -> SmallVec<[Cell; 4]> {
    let Some(pipe) = pipes.get(cell) else {
        return SmallVec::new();
    };
    cell.neighbors(pipes.size())
        .into_iter()
        .filter(|&(dir, n)| {
            pipe.connections.get(dir)
                && pipes.get(n).is_some_and(|other| {
                    other.color == pipe.color && other.connections.get(dir.opposite())
                })
        })
        .map(|(_, n)| n)
        .collect()
}

/// True iff `cell` holds a pipe with at most one mutually linked neighbor of
/// its own color. A cell with no pipe is not an edge pipe.
pub fn is_edge_pipe(pipes: &PipeStore, cell: Cell) -> bool {
    pipes.has_pipe(cell) && linked_neighbors(pipes, cell).len() <= 1
}

/// Walk the pipe of `color` starting at `start`, following connection flags,
/// and clear every visited cell. Returns cells in visit order, so starting
/// from a free end yields the chain from that end to the other.
///
/// Returns an empty path if `start` does not hold a pipe of `color`.
pub fn trace_connected_chain(pipes: &mut PipeStore, start: Cell, color: ColorId) -> Vec<Cell> {
    let size = pipes.size();
    let mut visited = Vec::new();
    let mut stack = vec![start];

    while let Some(cell) = stack.pop() {
        if pipes.color_at(cell) != Some(color) {
            continue;
        }
        let Some(pipe) = pipes.clear(cell) else {
            continue;
        };
        visited.push(cell);
        // Reverse so the first flagged direction is explored first.
        let mut next: SmallVec<[Cell; 4]> = pipe
            .connections
            .directions()
            .filter_map(|dir| cell.step(dir, size))
            .collect();
        next.reverse();
        stack.extend(next);
    }
    visited
}

/// Connection flags for `path[index]` when `path` is committed in `color`.
///
/// Each cell connects to its predecessor and successor in the path. The first
/// cell additionally keeps any links it already had to same-colored pipes
/// outside the path, so a pipe that is being continued stays attached to
/// the part that was not re-traced.
pub fn derive_connections(
    index: usize,
    path: &[Cell],
    pipes: &PipeStore,
    color: ColorId,
) -> Connections {
    let mut connections = Connections::NONE;
    let Some(&cell) = path.get(index) else {
        return connections;
    };

    if index == 0 && pipes.color_at(cell) == Some(color) {
        for (dir, n) in cell.neighbors(pipes.size()) {
            if pipes.color_at(n) == Some(color) && !path.contains(&n) {
                connections.set(dir, true);
            }
        }
    }

    let prev = index.checked_sub(1).and_then(|i| path.get(i));
    let next = path.get(index + 1);
    for other in prev.into_iter().chain(next) {
        if let Some(dir) = cell.direction_to(*other) {
            connections.set(dir, true);
        }
    }
    connections
}

/// Write `path` into the store as a pipe of `color`, overwriting whatever the
/// path cells held, then fix up the neighbors so flags stay mutual: outside
/// pipes the path now links to are linked back, and outside pipes that
/// pointed at an overwritten cell lose that flag.
pub fn commit_path(pipes: &mut PipeStore, path: &[Cell], color: ColorId) {
    let derived: Vec<Connections> = (0..path.len())
        .map(|i| derive_connections(i, path, pipes, color))
        .collect();

    for (&cell, &connections) in path.iter().zip(&derived) {
        pipes.set(cell, Pipe { color, connections });
    }

    let on_path: FxHashSet<Cell> = path.iter().copied().collect();
    let size = pipes.size();
    for (&cell, connections) in path.iter().zip(derived) {
        for (dir, n) in cell.neighbors(size) {
            if on_path.contains(&n) {
                continue;
            }
            let Some(neighbor) = pipes.get_mut(n) else {
                continue;
            };
            let back = dir.opposite();
            if connections.get(dir) {
                if neighbor.color == color {
                    neighbor.connections.set(back, true);
                }
            } else if neighbor.connections.get(back) {
                neighbor.connections.set(back, false);
            }
        }
    }
}

/// Erase the whole pipe of `color` that contains `start`. Breadth-first over
/// connection flags; returns the cleared cells in removal order.
pub fn remove_pipe(pipes: &mut PipeStore, start: Cell, color: ColorId) -> Vec<Cell> {
    let size = pipes.size();
    let mut removed = Vec::new();
    let mut queue = VecDeque::from([start]);

    while let Some(cell) = queue.pop_front() {
        if pipes.color_at(cell) != Some(color) {
            continue;
        }
        let Some(pipe) = pipes.clear(cell) else {
            continue;
        };
        removed.push(cell);
        queue.extend(
            pipe.connections
                .directions()
                .filter_map(|dir| cell.step(dir, size)),
        );
    }
    removed
}

/// Win condition: every empty cell is covered by some pipe, and every
/// endpoint holds a pipe of its own color with at least one same-colored
/// pipe beside it.
pub fn is_board_complete(board: &Board, pipes: &PipeStore) -> bool {
    board.cells().all(|cell| match board.color_at(cell) {
        None => pipes.has_pipe(cell),
        Some(color) => is_endpoint_attached(pipes, cell, color),
    })
}

fn is_endpoint_attached(pipes: &PipeStore, cell: Cell, color: ColorId) -> bool {
    pipes.color_at(cell) == Some(color)
        && Direction::ALL.iter().any(|&dir| {
            cell.step(dir, pipes.size())
                .is_some_and(|n| pipes.color_at(n) == Some(color))
        })
}
