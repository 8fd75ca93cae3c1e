use std::collections::VecDeque;

use super::network::{ArcId, FlowNetwork, NodeId, Parent};

const INFINITE_DISTANCE: u32 = u32::MAX;

/// Incremental max-flow over a `FlowNetwork`, after Boykov and Kolmogorov,
/// "An Experimental Comparison of Min-Cut/Max-Flow Algorithms for Energy
/// Minimization in Vision".
///
/// Two search trees grow from the super-source and super-sink. Active
/// nodes expand their tree; when the trees touch, the connecting path is
/// augmented by its bottleneck capacity; nodes cut off by saturated arcs
/// become orphans and are re-adopted or freed. The timestamp/distance
/// bookkeeping keeps re-adoption acyclic and is load-bearing: every node
/// marked fresh this round carries its true distance to its root.
pub struct MaxFlowSolver<'a> {
    net: &'a mut FlowNetwork,
    /// Two-level active queue: the pass being drained, then the next pass.
    current_pass: VecDeque<NodeId>,
    next_pass: VecDeque<NodeId>,
    /// Orphans produced by augmentation, most recent first.
    orphans: VecDeque<NodeId>,
    /// Orphans induced while re-adopting, drained before the next
    /// augmentation orphan.
    batch: VecDeque<NodeId>,
    time: u32,
}

impl<'a> MaxFlowSolver<'a> {
    pub fn new(net: &'a mut FlowNetwork) -> Self {
        Self {
            net,
            current_pass: VecDeque::new(),
            next_pass: VecDeque::new(),
            orphans: VecDeque::new(),
            batch: VecDeque::new(),
            time: 0,
        }
    }

    /// Computes the maximum flow and returns it. The cut is readable
    /// through `FlowNetwork::segment_of` afterwards. May be called again
    /// after further terminal-weight changes; search state is rebuilt
    /// from the residual capacities each time.
    pub fn run(&mut self) -> f64 {
        self.init();

        let mut current: Option<NodeId> = None;
        loop {
            let mut i_opt = current.take();
            if let Some(i) = i_opt {
                self.net.nodes[i.0].active = false;
                if self.net.nodes[i.0].parent == Parent::Free {
                    i_opt = None;
                }
            }
            let i = match i_opt.or_else(|| self.next_active()) {
                Some(i) => i,
                None => break,
            };

            let meeting_arc = if !self.net.nodes[i.0].is_sink {
                self.grow_source_tree(i)
            } else {
                self.grow_sink_tree(i)
            };

            self.time += 1;

            if let Some(arc) = meeting_arc {
                // Keep the node current; it may find further meeting arcs.
                self.net.nodes[i.0].active = true;
                current = Some(i);

                self.augment(arc);
                self.adopt();
            }
        }

        log::debug!("max-flow computation finished, flow {}", self.net.flow);
        self.net.flow
    }

    /// Seeds the search trees: every node with spare source capacity roots
    /// a source subtree, every node with spare sink capacity a sink
    /// subtree; zero-capacity nodes start free.
    fn init(&mut self) {
        self.current_pass.clear();
        self.next_pass.clear();
        self.orphans.clear();
        self.batch.clear();
        self.time = 0;

        for index in 0..self.net.nodes.len() {
            let node = &mut self.net.nodes[index];
            node.active = false;
            node.timestamp = 0;
            if node.terminal_capacity > 0.0 {
                node.is_sink = false;
                node.parent = Parent::Terminal;
                node.distance = 1;
                self.set_active(NodeId(index));
            } else if node.terminal_capacity < 0.0 {
                node.is_sink = true;
                node.parent = Parent::Terminal;
                node.distance = 1;
                self.set_active(NodeId(index));
            } else {
                node.parent = Parent::Free;
            }
        }
    }

    fn set_active(&mut self, i: NodeId) {
        if !self.net.nodes[i.0].active {
            self.net.nodes[i.0].active = true;
            self.next_pass.push_back(i);
        }
    }

    fn next_active(&mut self) -> Option<NodeId> {
        loop {
            let i = match self.current_pass.pop_front() {
                Some(i) => i,
                None => {
                    std::mem::swap(&mut self.current_pass, &mut self.next_pass);
                    self.current_pass.pop_front()?
                }
            };
            self.net.nodes[i.0].active = false;
            // A queued node is only still active if it kept its parent.
            if self.net.nodes[i.0].parent != Parent::Free {
                return Some(i);
            }
        }
    }

    /// Scans the arcs of a source-tree node. Free neighbors with residual
    /// capacity are annexed; a sink-tree neighbor yields the meeting arc,
    /// oriented source to sink. Same-tree neighbors may be re-parented if
    /// this node offers a shorter path to the root.
    fn grow_source_tree(&mut self, i: NodeId) -> Option<ArcId> {
        let i_timestamp = self.net.nodes[i.0].timestamp;
        let i_distance = self.net.nodes[i.0].distance;

        let mut arc_opt = self.net.nodes[i.0].first;
        while let Some(arc) = arc_opt {
            if self.net.arcs[arc.0].residual > 0.0 {
                let j = self.net.arcs[arc.0].head;
                let sister = self.net.arcs[arc.0].sister;
                let node_j = &mut self.net.nodes[j.0];
                if node_j.parent == Parent::Free {
                    node_j.is_sink = false;
                    node_j.parent = Parent::Arc(sister);
                    node_j.timestamp = i_timestamp;
                    node_j.distance = i_distance + 1;
                    self.set_active(j);
                } else if node_j.is_sink {
                    return Some(arc);
                } else if node_j.timestamp <= i_timestamp && node_j.distance > i_distance {
                    // Shorter path to the source found through this node.
                    node_j.parent = Parent::Arc(sister);
                    node_j.timestamp = i_timestamp;
                    node_j.distance = i_distance + 1;
                }
            }
            arc_opt = self.net.arcs[arc.0].next;
        }
        None
    }

    /// Mirror of `grow_source_tree` using reverse-residual capacity. The
    /// meeting arc is returned sister-flipped so it always runs source to
    /// sink.
    fn grow_sink_tree(&mut self, i: NodeId) -> Option<ArcId> {
        let i_timestamp = self.net.nodes[i.0].timestamp;
        let i_distance = self.net.nodes[i.0].distance;

        let mut arc_opt = self.net.nodes[i.0].first;
        while let Some(arc) = arc_opt {
            let sister = self.net.arcs[arc.0].sister;
            if self.net.arcs[sister.0].residual > 0.0 {
                let j = self.net.arcs[arc.0].head;
                let node_j = &mut self.net.nodes[j.0];
                if node_j.parent == Parent::Free {
                    node_j.is_sink = true;
                    node_j.parent = Parent::Arc(sister);
                    node_j.timestamp = i_timestamp;
                    node_j.distance = i_distance + 1;
                    self.set_active(j);
                } else if !node_j.is_sink {
                    return Some(sister);
                } else if node_j.timestamp <= i_timestamp && node_j.distance > i_distance {
                    node_j.parent = Parent::Arc(sister);
                    node_j.timestamp = i_timestamp;
                    node_j.distance = i_distance + 1;
                }
            }
            arc_opt = self.net.arcs[arc.0].next;
        }
        None
    }

    fn parent_arc(&self, i: NodeId) -> Option<ArcId> {
        match self.net.nodes[i.0].parent {
            Parent::Arc(arc) => Some(arc),
            _ => None,
        }
    }

    /// Pushes the bottleneck capacity of the source-root .. meeting-arc ..
    /// sink-root path and orphans every node whose parent arc saturated.
    fn augment(&mut self, middle: ArcId) {
        let middle_sister = self.net.arcs[middle.0].sister;

        // Bottleneck over the source side.
        let mut bottleneck = self.net.arcs[middle.0].residual;
        let mut i = self.net.arcs[middle_sister.0].head;
        while let Some(arc) = self.parent_arc(i) {
            let sister = self.net.arcs[arc.0].sister;
            bottleneck = bottleneck.min(self.net.arcs[sister.0].residual);
            i = self.net.arcs[arc.0].head;
        }
        bottleneck = bottleneck.min(self.net.nodes[i.0].terminal_capacity);

        // Bottleneck over the sink side.
        let mut i = self.net.arcs[middle.0].head;
        while let Some(arc) = self.parent_arc(i) {
            bottleneck = bottleneck.min(self.net.arcs[arc.0].residual);
            i = self.net.arcs[arc.0].head;
        }
        bottleneck = bottleneck.min(-self.net.nodes[i.0].terminal_capacity);

        // Push the bottleneck through the meeting arc.
        self.net.arcs[middle_sister.0].residual += bottleneck;
        self.net.arcs[middle.0].residual -= bottleneck;

        // Source side: parent arcs point toward the path, their sisters
        // carry the flow.
        let mut i = self.net.arcs[middle_sister.0].head;
        while let Some(arc) = self.parent_arc(i) {
            let sister = self.net.arcs[arc.0].sister;
            self.net.arcs[arc.0].residual += bottleneck;
            self.net.arcs[sister.0].residual -= bottleneck;
            if self.net.arcs[sister.0].residual <= 0.0 {
                self.net.nodes[i.0].parent = Parent::Orphan;
                self.orphans.push_front(i);
            }
            i = self.net.arcs[arc.0].head;
        }
        self.net.nodes[i.0].terminal_capacity -= bottleneck;
        if self.net.nodes[i.0].terminal_capacity <= 0.0 {
            self.net.nodes[i.0].parent = Parent::Orphan;
            self.orphans.push_front(i);
        }

        // Sink side.
        let mut i = self.net.arcs[middle.0].head;
        while let Some(arc) = self.parent_arc(i) {
            let sister = self.net.arcs[arc.0].sister;
            self.net.arcs[sister.0].residual += bottleneck;
            self.net.arcs[arc.0].residual -= bottleneck;
            if self.net.arcs[arc.0].residual <= 0.0 {
                self.net.nodes[i.0].parent = Parent::Orphan;
                self.orphans.push_front(i);
            }
            i = self.net.arcs[arc.0].head;
        }
        // Sink roots hold negative terminal capacity; saturation is
        // reaching zero, at which point the root loses its terminal link.
        self.net.nodes[i.0].terminal_capacity += bottleneck;
        if self.net.nodes[i.0].terminal_capacity >= 0.0 {
            self.net.nodes[i.0].parent = Parent::Orphan;
            self.orphans.push_front(i);
        }

        self.net.flow += bottleneck;
    }

    /// Re-adopts or frees every orphan. Orphans induced while processing
    /// one augmentation orphan are handled before the next one.
    fn adopt(&mut self) {
        while let Some(first) = self.orphans.pop_front() {
            self.batch.push_back(first);
            while let Some(i) = self.batch.pop_front() {
                if self.net.nodes[i.0].is_sink {
                    self.process_sink_orphan(i);
                } else {
                    self.process_source_orphan(i);
                }
            }
        }
    }

    /// Distance from `j` to its tree root, walking parent links. Nodes
    /// already verified this round short-circuit through their cached
    /// distance; an `Orphan` ancestor means no root is reachable. Marks
    /// every node on a successful walk as verified.
    fn distance_to_root(&mut self, start: NodeId) -> u32 {
        let mut j = start;
        let mut d = 0;
        loop {
            if self.net.nodes[j.0].timestamp == self.time {
                d += self.net.nodes[j.0].distance;
                break;
            }
            let parent = self.net.nodes[j.0].parent;
            d += 1;
            match parent {
                Parent::Terminal => {
                    self.net.nodes[j.0].timestamp = self.time;
                    self.net.nodes[j.0].distance = 1;
                    break;
                }
                Parent::Orphan => return INFINITE_DISTANCE,
                Parent::Arc(arc) => j = self.net.arcs[arc.0].head,
                Parent::Free => unreachable!("tree ancestor without a parent"),
            }
        }

        // Cache the measured distances along the walked prefix.
        let mut j = start;
        let mut d_mark = d;
        while self.net.nodes[j.0].timestamp != self.time {
            self.net.nodes[j.0].timestamp = self.time;
            self.net.nodes[j.0].distance = d_mark;
            d_mark -= 1;
            j = match self.net.nodes[j.0].parent {
                Parent::Arc(arc) => self.net.arcs[arc.0].head,
                _ => break,
            };
        }
        d
    }

    /// Searches a source orphan's neighbors for a replacement parent no
    /// farther from the source than any alternative. Without one, the node
    /// goes free: its tree children become orphans themselves and
    /// neighbors that could push flow toward it are re-activated.
    fn process_source_orphan(&mut self, i: NodeId) {
        let mut min_arc: Option<ArcId> = None;
        let mut min_distance = INFINITE_DISTANCE;

        let mut arc_opt = self.net.nodes[i.0].first;
        while let Some(arc) = arc_opt {
            let sister = self.net.arcs[arc.0].sister;
            if self.net.arcs[sister.0].residual > 0.0 {
                let j = self.net.arcs[arc.0].head;
                if !self.net.nodes[j.0].is_sink && self.net.nodes[j.0].parent != Parent::Free {
                    let d = self.distance_to_root(j);
                    if d < min_distance {
                        min_arc = Some(arc);
                        min_distance = d;
                    }
                }
            }
            arc_opt = self.net.arcs[arc.0].next;
        }

        match min_arc {
            Some(arc) => {
                self.net.nodes[i.0].parent = Parent::Arc(arc);
                self.net.nodes[i.0].timestamp = self.time;
                self.net.nodes[i.0].distance = min_distance + 1;
            }
            None => {
                self.net.nodes[i.0].parent = Parent::Free;
                self.net.nodes[i.0].timestamp = 0;

                let mut arc_opt = self.net.nodes[i.0].first;
                while let Some(arc) = arc_opt {
                    let j = self.net.arcs[arc.0].head;
                    let parent = self.net.nodes[j.0].parent;
                    if !self.net.nodes[j.0].is_sink && parent != Parent::Free {
                        let sister = self.net.arcs[arc.0].sister;
                        if self.net.arcs[sister.0].residual > 0.0 {
                            self.set_active(j);
                        }
                        if let Parent::Arc(parent_arc) = parent {
                            if self.net.arcs[parent_arc.0].head == i {
                                self.net.nodes[j.0].parent = Parent::Orphan;
                                self.batch.push_back(j);
                            }
                        }
                    }
                    arc_opt = self.net.arcs[arc.0].next;
                }
            }
        }
    }

    /// Mirror of `process_source_orphan` for the sink tree.
    fn process_sink_orphan(&mut self, i: NodeId) {
        let mut min_arc: Option<ArcId> = None;
        let mut min_distance = INFINITE_DISTANCE;

        let mut arc_opt = self.net.nodes[i.0].first;
        while let Some(arc) = arc_opt {
            if self.net.arcs[arc.0].residual > 0.0 {
                let j = self.net.arcs[arc.0].head;
                if self.net.nodes[j.0].is_sink && self.net.nodes[j.0].parent != Parent::Free {
                    let d = self.distance_to_root(j);
                    if d < min_distance {
                        min_arc = Some(arc);
                        min_distance = d;
                    }
                }
            }
            arc_opt = self.net.arcs[arc.0].next;
        }

        match min_arc {
            Some(arc) => {
                self.net.nodes[i.0].parent = Parent::Arc(arc);
                self.net.nodes[i.0].timestamp = self.time;
                self.net.nodes[i.0].distance = min_distance + 1;
            }
            None => {
                self.net.nodes[i.0].parent = Parent::Free;
                self.net.nodes[i.0].timestamp = 0;

                let mut arc_opt = self.net.nodes[i.0].first;
                while let Some(arc) = arc_opt {
                    let j = self.net.arcs[arc.0].head;
                    let parent = self.net.nodes[j.0].parent;
                    if self.net.nodes[j.0].is_sink && parent != Parent::Free {
                        if self.net.arcs[arc.0].residual > 0.0 {
                            self.set_active(j);
                        }
                        if let Parent::Arc(parent_arc) = parent {
                            if self.net.arcs[parent_arc.0].head == i {
                                self.net.nodes[j.0].parent = Parent::Orphan;
                                self.batch.push_back(j);
                            }
                        }
                    }
                    arc_opt = self.net.arcs[arc.0].next;
                }
            }
        }
    }
}
