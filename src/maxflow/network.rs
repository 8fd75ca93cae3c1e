/// Index of a node in a `FlowNetwork`
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct NodeId(pub usize);

/// Index of a directed residual arc in a `FlowNetwork`
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ArcId(pub usize);

/// Parent link of a node in the solver's search trees. `Terminal` and
/// `Orphan` are the sentinel states; only `Arc` points at a real arc.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Parent {
    Free,
    Terminal,
    Orphan,
    Arc(ArcId),
}

/// Side of the minimum cut a node falls on once max-flow terminates
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Segment {
    Source,
    Sink,
}

pub(crate) struct Node {
    /// Head of the adjacency list, a singly-linked chain through `Arc::next`.
    pub first: Option<ArcId>,
    pub parent: Parent,
    /// Whether the node sits in the active queue or is the node currently
    /// being grown.
    pub active: bool,
    pub timestamp: u32,
    /// Cached distance to the tree root, valid while `timestamp` is fresh.
    pub distance: u32,
    /// Tree side; meaningful only while `parent` is not `Free`.
    pub is_sink: bool,
    /// Signed residual capacity toward the terminals: positive is spare
    /// capacity from the source, negative magnitude is spare capacity to
    /// the sink.
    pub terminal_capacity: f64,
}

impl Node {
    fn new() -> Self {
        Self {
            first: None,
            parent: Parent::Free,
            active: false,
            timestamp: 0,
            distance: 0,
            is_sink: false,
            terminal_capacity: 0.0,
        }
    }
}

pub(crate) struct Arc {
    pub head: NodeId,
    /// Next sibling arc of the arc's source node.
    pub next: Option<ArcId>,
    /// The paired reverse arc. Arcs only ever exist in sister pairs.
    pub sister: ArcId,
    pub residual: f64,
}

/// Directed flow network with paired residual arcs. Networks are built
/// fresh per expansion move; there is no edge removal.
#[derive(Default)]
pub struct FlowNetwork {
    pub(crate) nodes: Vec<Node>,
    pub(crate) arcs: Vec<Arc>,
    pub(crate) flow: f64,
}

impl FlowNetwork {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            arcs: Vec::with_capacity(nodes * 4),
            flow: 0.0,
        }
    }

    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new());
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flow accumulated so far, including the portion absorbed by
    /// `set_terminal_weights`.
    pub fn flow(&self) -> f64 {
        self.flow
    }

    /// Allocates a sister pair of arcs between two nodes. Capacities are
    /// independent per direction, supporting asymmetric costs.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, capacity: f64, reverse_capacity: f64) {
        let a = ArcId(self.arcs.len());
        let a_rev = ArcId(self.arcs.len() + 1);
        self.arcs.push(Arc {
            head: to,
            next: self.nodes[from.0].first,
            sister: a_rev,
            residual: capacity,
        });
        self.arcs.push(Arc {
            head: from,
            next: self.nodes[to.0].first,
            sister: a,
            residual: reverse_capacity,
        });
        self.nodes[from.0].first = Some(a);
        self.nodes[to.0].first = Some(a_rev);
    }

    /// Sets the capacities tying a node to the super-source and super-sink.
    /// The overlapping portion flows immediately; only the signed residual
    /// is stored.
    pub fn set_terminal_weights(&mut self, i: NodeId, source_capacity: f64, sink_capacity: f64) {
        self.flow += source_capacity.min(sink_capacity);
        self.nodes[i.0].terminal_capacity = source_capacity - sink_capacity;
    }

    /// Like `set_terminal_weights`, but folds in any terminal capacity the
    /// node already carries.
    pub fn add_terminal_weights(&mut self, i: NodeId, source_capacity: f64, sink_capacity: f64) {
        let delta = self.nodes[i.0].terminal_capacity;
        let (source_capacity, sink_capacity) = if delta > 0.0 {
            (source_capacity + delta, sink_capacity)
        } else {
            (source_capacity, sink_capacity - delta)
        };
        self.set_terminal_weights(i, source_capacity, sink_capacity);
    }

    /// Which side of the current cut the node lies on. Valid after a
    /// max-flow computation completed.
    pub fn segment_of(&self, i: NodeId) -> Segment {
        let node = &self.nodes[i.0];
        if node.parent != Parent::Free && !node.is_sink {
            Segment::Source
        } else {
            Segment::Sink
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_sister_paired() {
        let mut net = FlowNetwork::new();
        let a = net.add_node();
        let b = net.add_node();
        net.add_edge(a, b, 3.0, 1.0);

        assert_eq!(net.arcs.len(), 2);
        let forward = &net.arcs[0];
        let backward = &net.arcs[1];
        assert_eq!(forward.head, b);
        assert_eq!(backward.head, a);
        assert_eq!(forward.sister, ArcId(1));
        assert_eq!(backward.sister, ArcId(0));
        assert_eq!(forward.residual, 3.0);
        assert_eq!(backward.residual, 1.0);
        assert_eq!(net.nodes[a.0].first, Some(ArcId(0)));
        assert_eq!(net.nodes[b.0].first, Some(ArcId(1)));
    }

    #[test]
    fn adjacency_list_prepends() {
        let mut net = FlowNetwork::new();
        let a = net.add_node();
        let b = net.add_node();
        let c = net.add_node();
        net.add_edge(a, b, 1.0, 0.0);
        net.add_edge(a, c, 1.0, 0.0);

        // The newest edge heads the list.
        let first = net.nodes[a.0].first.unwrap();
        assert_eq!(net.arcs[first.0].head, c);
        let second = net.arcs[first.0].next.unwrap();
        assert_eq!(net.arcs[second.0].head, b);
        assert_eq!(net.arcs[second.0].next, None);
    }

    #[test]
    fn terminal_weights_absorb_overlap() {
        let mut net = FlowNetwork::new();
        let a = net.add_node();
        net.set_terminal_weights(a, 5.0, 3.0);
        assert_eq!(net.flow(), 3.0);
        assert_eq!(net.nodes[a.0].terminal_capacity, 2.0);

        net.add_terminal_weights(a, 0.0, 6.0);
        // Folds the +2 residual into the source side before re-setting.
        assert_eq!(net.flow(), 5.0);
        assert_eq!(net.nodes[a.0].terminal_capacity, -4.0);
    }

    #[test]
    fn unsolved_nodes_report_sink() {
        let mut net = FlowNetwork::new();
        let a = net.add_node();
        assert_eq!(net.segment_of(a), Segment::Sink);
    }
}
