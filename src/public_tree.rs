//! Public game tree as a flat arena.
//!
//! Nodes live in one `Vec`; parents are integer indices and each node's
//! children occupy a contiguous index block, so traversal is index
//! arithmetic instead of pointer chasing. Construction is breadth-first,
//! which guarantees two properties the solvers rely on: children are
//! contiguous, and every parent index is strictly smaller than its
//! children's (bottom-up passes just iterate indices in reverse).

use std::ops::Range;

use crate::game::{Action, Game, PartialPublicState};

#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub state: PartialPublicState,
    pub parent: Option<usize>,
    pub children_begin: usize,
    pub children_end: usize,
}

impl Node {
    pub fn num_children(&self) -> usize {
        self.children_end - self.children_begin
    }

    pub fn children(&self) -> Range<usize> {
        self.children_begin..self.children_end
    }

    /// Leaf = no children: either a terminal state or a depth cutoff.
    pub fn is_leaf(&self) -> bool {
        self.num_children() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node_id: usize) -> &Node {
        &self.nodes[node_id]
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Child node ids paired with the action that produces each child.
    /// Children are stored in increasing action order, so the k-th child
    /// corresponds to the k-th feasible action.
    pub fn children_with_actions(
        &self,
        game: &Game,
        node_id: usize,
    ) -> impl Iterator<Item = (usize, Action)> {
        let node = &self.nodes[node_id];
        let first_action = game.action_range(&node.state).start;
        node.children()
            .enumerate()
            .map(move |(k, child)| (child, first_action + k))
    }

    /// Depth of a node, counted in edges from the root.
    pub fn depth(&self, node_id: usize) -> usize {
        let mut depth = 0;
        let mut current = node_id;
        while let Some(parent) = self.nodes[current].parent {
            depth += 1;
            current = parent;
        }
        depth
    }
}

/// Unroll the reachable public states from `root` into a tree, expanding
/// non-terminal nodes whose depth is below `max_depth`. Nodes at the depth
/// limit stay as pseudo-leaves.
pub fn unroll_tree(game: &Game, root: &PartialPublicState, max_depth: usize) -> Tree {
    let mut nodes = vec![Node {
        state: *root,
        parent: None,
        children_begin: 0,
        children_end: 0,
    }];
    let mut depths = vec![0usize];

    let mut next = 0;
    while next < nodes.len() {
        let state = nodes[next].state;
        let depth = depths[next];
        if depth < max_depth && !game.is_terminal(&state) {
            let children_begin = nodes.len();
            for action in game.action_range(&state) {
                nodes.push(Node {
                    state: game.act(&state, action),
                    parent: Some(next),
                    children_begin: 0,
                    children_end: 0,
                });
                depths.push(depth + 1);
            }
            nodes[next].children_begin = children_begin;
            nodes[next].children_end = nodes.len();
        }
        next += 1;
    }

    log::debug!(
        "unrolled tree: {} nodes from root {} (max_depth {})",
        nodes.len(),
        root,
        max_depth
    );
    Tree { nodes }
}

/// Unroll the complete tree: every leaf is a terminal state.
pub fn unroll_full_tree(game: &Game, public_hand: usize) -> Tree {
    // The bid can rise at most max_bid times, so max_bid + 2 covers the
    // deepest raise chain plus its closing call or fold.
    unroll_tree(game, &game.initial_state(public_hand), game.max_bid() + 2)
}
