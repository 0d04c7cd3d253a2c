//! Interior / boundary / exterior location of graph elements per operand.

use serde::{Deserialize, Serialize};

use super::topo_graph::TopoGraph;
use crate::geometry::GeometryType;

/// Location of a point set relative to one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Interior,
    Boundary,
    Exterior,
}

impl Location {
    /// Row or column of the relation matrix.
    pub fn index(self) -> usize {
        match self {
            Location::Interior => 0,
            Location::Boundary => 1,
            Location::Exterior => 2,
        }
    }
}

impl TopoGraph {
    pub fn face_location(&self, face: usize, operand: usize) -> Location {
        let bit = 1u64 << operand;
        match self.operand_type(operand) {
            GeometryType::Polygon | GeometryType::Envelope if self.faces()[face].inside & bit != 0 => {
                Location::Interior
            }
            _ => Location::Exterior,
        }
    }

    pub fn edge_location(&self, edge: usize, operand: usize) -> Location {
        let bit = 1u64 << operand;
        let e = &self.edges()[edge];
        match self.operand_type(operand) {
            GeometryType::Polygon | GeometryType::Envelope => {
                if e.polygon_parity & bit != 0 {
                    Location::Boundary
                } else {
                    self.face_location(self.left_face(edge), operand)
                }
            }
            GeometryType::Polyline if e.line_mask & bit != 0 => Location::Interior,
            _ => Location::Exterior,
        }
    }

    /// Polyline endpoints follow the mod-2 rule: a node ending an odd number
    /// of paths is boundary.
    pub fn node_location(&self, node: usize, operand: usize) -> Location {
        let bit = 1u64 << operand;
        match self.operand_type(operand) {
            GeometryType::Polygon | GeometryType::Envelope => {
                if self.node_polygon_boundary(node) & bit != 0 {
                    Location::Boundary
                } else {
                    self.face_location(self.node_face(node), operand)
                }
            }
            GeometryType::Polyline => {
                if self.nodes()[node].line_end_parity & bit != 0 {
                    Location::Boundary
                } else if self.node_line_mask(node) & bit != 0 {
                    Location::Interior
                } else {
                    Location::Exterior
                }
            }
            GeometryType::Point | GeometryType::MultiPoint => {
                if self.nodes()[node].point_mask & bit != 0 {
                    Location::Interior
                } else {
                    Location::Exterior
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::geometry::Geometry;
    use crate::noding::{node_edit_shape, NodingMode};
    use crate::topology::edit_shape::EditShape;

    #[test]
    fn test_line_through_square_locations() {
        let mut shape = EditShape::new();
        let sq = shape.add_geometry(&Geometry::polygon(&[vec![
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
        ]]));
        let line = shape.add_geometry(&Geometry::polyline(&[vec![(-1.0, 1.0), (3.0, 1.0)]]));
        node_edit_shape(&mut shape, 1e-9, NodingMode::AllIntersections, &KernelConfig::default(), None)
            .unwrap();
        let g = TopoGraph::build(&shape, &[sq, line], 1e-9).unwrap();

        let line_edges: Vec<usize> = (0..g.edges().len())
            .filter(|&e| g.edges()[e].line_mask != 0)
            .collect();
        assert_eq!(line_edges.len(), 3);
        let inside = line_edges
            .iter()
            .filter(|&&e| g.edge_location(e, 0) == Location::Interior)
            .count();
        assert_eq!(inside, 1);
        for n in 0..g.nodes().len() {
            if g.nodes()[n].line_end_parity != 0 {
                assert_eq!(g.node_location(n, 1), Location::Boundary);
                assert_eq!(g.node_location(n, 0), Location::Exterior);
            }
        }
    }
}
