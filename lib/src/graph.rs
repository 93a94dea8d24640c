//! Adjacency-list residual flow network with Dinic's max-flow.
//!
//! The seam solver only ever needs an undirected cut, so `add_edge` inserts
//! the forward and reverse arc with the same capacity. Arcs are stored in
//! consecutive pairs: `e ^ 1` is always the partner of `e`.

use std::collections::VecDeque;

/// Stand-in for an unbounded capacity. Large enough that no sum of seam
/// costs can compete with a single anchoring arc.
pub(crate) const INF_FLOW: i64 = 1 << 20;

const NIL: u32 = u32::MAX;

struct Arc {
    to: u32,
    next: u32,
    capacity: i64,
}

pub(crate) struct FlowGraph {
    head: Vec<u32>,
    depth: Vec<u32>,
    arcs: Vec<Arc>,
}

impl FlowGraph {
    pub fn new(nodes: usize) -> Self {
        Self {
            head: vec![NIL; nodes],
            depth: vec![0; nodes],
            arcs: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.head.len()
    }

    fn push_arc(&mut self, u: usize, v: usize, capacity: i64) {
        self.arcs.push(Arc {
            to: v as u32,
            next: self.head[u],
            capacity,
        });
        self.head[u] = (self.arcs.len() - 1) as u32;
    }

    /// Adds an undirected edge: both directions get capacity `w`.
    pub fn add_edge(&mut self, u: usize, v: usize, w: i64) {
        let needed = u.max(v) + 1;
        if needed > self.head.len() {
            self.head.resize(needed, NIL);
            self.depth.resize(needed, 0);
        }
        self.push_arc(u, v, w);
        self.push_arc(v, u, w);
    }

    fn bfs(&mut self, s: usize, t: usize) -> bool {
        for d in self.depth.iter_mut() {
            *d = 0;
        }
        self.depth[s] = 1;

        let mut queue = VecDeque::new();
        queue.push_back(s as u32);
        while let Some(u) = queue.pop_front() {
            let mut e = self.head[u as usize];
            while e != NIL {
                let arc = &self.arcs[e as usize];
                if self.depth[arc.to as usize] == 0 && arc.capacity > 0 {
                    self.depth[arc.to as usize] = self.depth[u as usize] + 1;
                    queue.push_back(arc.to);
                }
                e = arc.next;
            }
        }
        self.depth[t] > 0
    }

    fn dfs(&mut self, u: usize, t: usize, limit: i64) -> i64 {
        if u == t || limit == 0 {
            return limit;
        }

        let mut total = 0;
        let mut remaining = limit;
        let mut e = self.head[u];
        while e != NIL && remaining > 0 {
            let (to, capacity, next) = {
                let arc = &self.arcs[e as usize];
                (arc.to as usize, arc.capacity, arc.next)
            };
            if self.depth[to] == self.depth[u] + 1 {
                let flow = self.dfs(to, t, remaining.min(capacity));
                if flow > 0 {
                    self.arcs[e as usize].capacity -= flow;
                    self.arcs[(e ^ 1) as usize].capacity += flow;
                    total += flow;
                    remaining -= flow;
                }
            }
            e = next;
        }
        // A node that admits no more flow is dead for this level graph.
        if total == 0 {
            self.depth[u] = 0;
        }
        total
    }

    /// Dinic: repeat BFS layering and blocking flow until `t` is
    /// unreachable. Returns the total flow pushed.
    pub fn max_flow(&mut self, s: usize, t: usize) -> i64 {
        let mut flow = 0;
        while self.bfs(s, t) {
            loop {
                let pushed = self.dfs(s, t, INF_FLOW);
                if pushed == 0 {
                    break;
                }
                flow += pushed;
            }
        }
        flow
    }

    /// The set of nodes reachable from `s` over residual arcs, i.e. the
    /// source side of the cut once `max_flow` has run.
    pub fn source_side(&self, s: usize) -> Vec<bool> {
        let mut visited = vec![false; self.head.len()];
        let mut queue = VecDeque::new();
        visited[s] = true;
        queue.push_back(s as u32);
        while let Some(u) = queue.pop_front() {
            let mut e = self.head[u as usize];
            while e != NIL {
                let arc = &self.arcs[e as usize];
                if !visited[arc.to as usize] && arc.capacity > 0 {
                    visited[arc.to as usize] = true;
                    queue.push_back(arc.to);
                }
                e = arc.next;
            }
        }
        visited
    }

    /// Runs max-flow and returns, per node, whether it stays on the source
    /// side of the minimum cut.
    pub fn min_cut(&mut self, s: usize, t: usize) -> Vec<bool> {
        self.max_flow(s, t);
        self.source_side(s)
    }
}
