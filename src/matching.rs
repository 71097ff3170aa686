//! Maximum bipartite matching (Hopcroft–Karp).
//!
//! Each phase layers the left side by BFS from every free left node, then
//! searches shortest augmenting paths along edges that step
//! exactly one layer deeper. The search keeps its path on an explicit stack,
//! so recursion depth does not grow with the input.

use std::collections::VecDeque;

/// Sentinel stored in the match arrays for unmatched nodes.
pub const UNMATCHED: i32 = -1;

const UNREACHED: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct BipartiteMatching {
    n_left: usize,
    n_right: usize,
    flow: usize,
    adj: Vec<Vec<u32>>,
    match_from_left: Vec<i32>,
    match_from_right: Vec<i32>,
    dist: Vec<u32>,
    // per-phase edge cursor of every left node
    cursor: Vec<usize>,
    stack: Vec<u32>,
}

impl BipartiteMatching {
    pub fn new(n_left: usize, n_right: usize) -> Self {
        assert!(
            i32::try_from(n_left).is_ok() && i32::try_from(n_right).is_ok(),
            "node counts must fit in i32"
        );
        Self {
            n_left,
            n_right,
            flow: 0,
            adj: vec![Vec::new(); n_left],
            match_from_left: vec![UNMATCHED; n_left],
            match_from_right: vec![UNMATCHED; n_right],
            dist: vec![UNREACHED; n_left],
            cursor: vec![0; n_left],
            stack: Vec::new(),
        }
    }

    /// Adds the edge `u -> v` (left `u`, right `v`). Parallel edges are allowed.
    pub fn add(&mut self, u: usize, v: usize) {
        assert!(u < self.n_left, "left node {u} out of range");
        assert!(v < self.n_right, "right node {v} out of range");
        self.adj[u].push(v as u32);
    }

    /// Runs phases until one finds no augmenting path and returns the size of
    /// the resulting maximum matching.
    pub fn get_max_matching(&mut self) -> usize {
        loop {
            if !self.bfs() {
                break;
            }
            self.cursor.fill(0);
            let mut augment = 0;
            for u in 0..self.n_left {
                if self.match_from_left[u] == UNMATCHED && self.augment_from(u as u32) {
                    augment += 1;
                }
            }
            if augment == 0 {
                break;
            }
            self.flow += augment;
        }
        self.flow
    }

    /// Right node matched to each left node, or [`UNMATCHED`].
    #[inline]
    pub fn match_from_left(&self) -> &[i32] {
        &self.match_from_left
    }

    /// Left node matched to each right node, or [`UNMATCHED`].
    #[inline]
    pub fn match_from_right(&self) -> &[i32] {
        &self.match_from_right
    }

    /// Matched `(left, right)` pairs in left order.
    pub fn get_edges(&self) -> Vec<(usize, usize)> {
        self.match_from_left
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != UNMATCHED)
            .map(|(u, &v)| (u, v as usize))
            .collect()
    }

    /// Layers left nodes by alternating distance from the free ones.
    /// Returns whether any free right node is reachable.
    fn bfs(&mut self) -> bool {
        let mut queue = VecDeque::with_capacity(self.n_left);
        for u in 0..self.n_left {
            if self.match_from_left[u] == UNMATCHED {
                self.dist[u] = 0;
                queue.push_back(u as u32);
            } else {
                self.dist[u] = UNREACHED;
            }
        }

        let mut reachable = false;
        while let Some(u) = queue.pop_front() {
            let next = self.dist[u as usize] + 1;
            for &v in &self.adj[u as usize] {
                let w = self.match_from_right[v as usize];
                if w == UNMATCHED {
                    reachable = true;
                } else if self.dist[w as usize] == UNREACHED {
                    self.dist[w as usize] = next;
                    queue.push_back(w as u32);
                }
            }
        }
        reachable
    }

    /// Searches an augmenting path from the free left node `root` and flips it.
    ///
    /// The stack holds the left nodes of the current alternating path; the
    /// edge each of them is trying is `adj[u][cursor[u]]`.
    fn augment_from(&mut self, root: u32) -> bool {
        if self.dist[root as usize] == UNREACHED {
            return false;
        }
        self.stack.clear();
        self.stack.push(root);

        while let Some(&u) = self.stack.last() {
            let u = u as usize;
            let edge = self.adj[u].get(self.cursor[u]).copied();
            let Some(v) = edge else {
                // Dead end: no path through `u` for the rest of this phase.
                self.dist[u] = UNREACHED;
                self.stack.pop();
                if let Some(&parent) = self.stack.last() {
                    self.cursor[parent as usize] += 1;
                }
                continue;
            };

            let w = self.match_from_right[v as usize];
            if w == UNMATCHED {
                self.flip_stack();
                return true;
            }
            if self.dist[w as usize] == self.dist[u] + 1 {
                self.stack.push(w as u32);
            } else {
                self.cursor[u] += 1;
            }
        }
        false
    }

    fn flip_stack(&mut self) {
        for &u in &self.stack {
            let u = u as usize;
            let v = self.adj[u][self.cursor[u]] as usize;
            self.match_from_left[u] = v as i32;
            self.match_from_right[v] = u as i32;
            self.cursor[u] += 1;
        }
    }
}
