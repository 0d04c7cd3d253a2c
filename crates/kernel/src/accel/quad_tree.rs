use crate::geometry::{Envelope2D, MultiPath, Point2d};

const DEFAULT_MAX_DEPTH: usize = 8;

#[derive(Debug, Clone)]
struct QuadNode {
    env: Envelope2D,
    depth: usize,
    children: Option<[usize; 4]>,
    items: Vec<usize>,
}

/// Region quad tree over item envelopes.
///
/// Each item is stored in the deepest node whose quadrant fully contains
/// its envelope; items straddling a split line stay in the parent.
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    items: Vec<(Envelope2D, usize)>,
    max_depth: usize,
}

impl QuadTree {
    pub fn new(extent: Envelope2D) -> Self {
        Self::with_max_depth(extent, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(extent: Envelope2D, max_depth: usize) -> Self {
        Self {
            nodes: vec![QuadNode {
                env: extent,
                depth: 0,
                children: None,
                items: Vec::new(),
            }],
            items: Vec::new(),
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extent(&self) -> Envelope2D {
        self.nodes[0].env
    }

    /// Store `data` under `env`. Items outside the extent live at the root.
    pub fn insert(&mut self, env: Envelope2D, data: usize) {
        let handle = self.items.len();
        self.items.push((env, data));
        let mut node = 0;
        loop {
            if self.nodes[node].depth >= self.max_depth {
                break;
            }
            let children = match self.nodes[node].children {
                Some(c) => c,
                None => self.split(node),
            };
            match children.iter().find(|&&c| self.nodes[c].env.contains(&env)) {
                Some(&c) => node = c,
                None => break,
            }
        }
        self.nodes[node].items.push(handle);
    }

    fn split(&mut self, node: usize) -> [usize; 4] {
        let env = self.nodes[node].env;
        let depth = self.nodes[node].depth + 1;
        let c = env.center();
        let quadrants = [
            Envelope2D::new(env.xmin, env.ymin, c.x, c.y),
            Envelope2D::new(c.x, env.ymin, env.xmax, c.y),
            Envelope2D::new(c.x, c.y, env.xmax, env.ymax),
            Envelope2D::new(env.xmin, c.y, c.x, env.ymax),
        ];
        let base = self.nodes.len();
        for q in quadrants {
            self.nodes.push(QuadNode {
                env: q,
                depth,
                children: None,
                items: Vec::new(),
            });
        }
        let children = [base, base + 1, base + 2, base + 3];
        self.nodes[node].children = Some(children);
        children
    }

    /// Data of every item whose envelope intersects `query`.
    pub fn query(&self, query: Envelope2D) -> QuadTreeQuery<'_> {
        QuadTreeQuery {
            tree: self,
            query,
            stack: vec![0],
            pending: Vec::new(),
        }
    }
}

/// Lazy iterator returned by [`QuadTree::query`].
pub struct QuadTreeQuery<'a> {
    tree: &'a QuadTree,
    query: Envelope2D,
    stack: Vec<usize>,
    pending: Vec<usize>,
}

impl Iterator for QuadTreeQuery<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if let Some(handle) = self.pending.pop() {
                let (env, data) = self.tree.items[handle];
                if env.intersects(&self.query) {
                    return Some(data);
                }
                continue;
            }
            let node = &self.tree.nodes[self.stack.pop()?];
            // The root also holds items outside the extent.
            if node.depth > 0 && !node.env.intersects(&self.query) {
                continue;
            }
            self.pending.extend(node.items.iter().copied());
            if let Some(children) = node.children {
                self.stack.extend(children);
            }
        }
    }
}

/// Quad tree over the segments of one polyline or polygon.
#[derive(Debug, Clone)]
pub struct SegmentQuadTree {
    tree: QuadTree,
    segments: Vec<(Point2d, Point2d)>,
}

impl SegmentQuadTree {
    pub fn from_multi_path(mp: &MultiPath, closed: bool) -> Self {
        let segments: Vec<(Point2d, Point2d)> = mp.segments(closed).collect();
        let mut tree = QuadTree::new(mp.envelope());
        for (i, (a, b)) in segments.iter().enumerate() {
            tree.insert(Envelope2D::from_segment(a, b), i);
        }
        Self { tree, segments }
    }

    pub fn segment(&self, i: usize) -> (Point2d, Point2d) {
        self.segments[i]
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segments whose envelope intersects `env`.
    pub fn segments_in(&self, env: Envelope2D) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        self.tree.query(env).map(move |i| self.segments[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_returns_intersecting_items() {
        let mut tree = QuadTree::new(Envelope2D::new(0.0, 0.0, 100.0, 100.0));
        for i in 0..10 {
            let x = i as f64 * 10.0;
            tree.insert(Envelope2D::new(x, x, x + 1.0, x + 1.0), i);
        }
        let mut hits: Vec<usize> = tree.query(Envelope2D::new(15.0, 15.0, 35.0, 35.0)).collect();
        hits.sort_unstable();
        assert_eq!(hits, vec![2, 3]);
        assert_eq!(tree.len(), 10);
    }

    #[test]
    fn test_items_outside_extent_are_found() {
        let mut tree = QuadTree::new(Envelope2D::new(0.0, 0.0, 1.0, 1.0));
        tree.insert(Envelope2D::new(5.0, 5.0, 6.0, 6.0), 7);
        let hits: Vec<usize> = tree.query(Envelope2D::new(5.5, 5.5, 5.6, 5.6)).collect();
        assert_eq!(hits, vec![7]);
    }

    #[test]
    fn test_segment_tree_matches_brute_force() {
        let coords: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / 40.0;
                (10.0 * a.cos(), 10.0 * a.sin())
            })
            .collect();
        let ring = MultiPath::from_coords(&[coords]);
        let tree = SegmentQuadTree::from_multi_path(&ring, true);
        let query = Envelope2D::new(5.0, -2.0, 12.0, 2.0);
        let expected = ring
            .segments(true)
            .filter(|(a, b)| Envelope2D::from_segment(a, b).intersects(&query))
            .count();
        assert_eq!(tree.segments_in(query).count(), expected);
        assert!(expected > 0);
    }
}
