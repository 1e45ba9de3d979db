//! Uniform mid-edge refinement.
//!
//! Every edge is split at its midpoint and every face becomes four: three
//! corner triangles plus a central one. Counts evolve as V <- V + E,
//! E <- 2E + 3F, F <- 4F, and the Euler characteristic is preserved.

use crate::geom::mesh::{DirectedEdge, Face, TriangularMesh, UndirectedEdge};
use crate::geom::point::midpoint;
use log::warn;

impl TriangularMesh {
    /// Four-way subdivision of every face.
    ///
    /// Split halves of old edge `e` land at indices `2e` and `2e + 1` in
    /// tail-to-head order, so directed edges of the parent faces map
    /// straight onto their halves. New faces inherit the parent
    /// orientation.
    pub fn refine(&mut self) {
        let old_edges = std::mem::take(&mut self.edges);
        let old_faces = std::mem::take(&mut self.faces);

        self.vertices.reserve(old_edges.len());
        self.edges.reserve(2 * old_edges.len() + 3 * old_faces.len());
        self.faces.reserve(4 * old_faces.len());

        // Each old edge produces one midpoint and two half edges.
        for pair in &old_edges {
            let a = self.vertices[pair.first];
            let b = self.vertices[pair.second];
            let mid = self.vertices.len();
            self.vertices.push(midpoint(&a, &b));
            self.edges.push(UndirectedEdge::new(pair.first, mid));
            self.edges.push(UndirectedEdge::new(mid, pair.second));
        }

        for face in &old_faces {
            // The two halves of each directed edge, in traversal order.
            let mut halves = [[DirectedEdge::new(0, true); 2]; 3];
            let mut mids = [0usize; 3];
            for (i, de) in face.edges.iter().enumerate() {
                let mut first = DirectedEdge::new(2 * de.edge, de.forward);
                let mut second = DirectedEdge::new(2 * de.edge + 1, de.forward);
                if !de.forward {
                    std::mem::swap(&mut first, &mut second);
                }
                mids[i] = first.head(&self.edges);
                halves[i] = [first, second];
            }

            // Three new interior edges connecting the midpoints.
            let e_a = self.edges.len();
            self.edges.push(UndirectedEdge::new(mids[0], mids[2]));
            let e_b = self.edges.len();
            self.edges.push(UndirectedEdge::new(mids[1], mids[0]));
            let e_c = self.edges.len();
            self.edges.push(UndirectedEdge::new(mids[2], mids[1]));

            // Corner triangles at A, B, C, then the central one.
            let [a1, a2] = halves[0];
            let [b1, b2] = halves[1];
            let [c1, c2] = halves[2];
            self.faces
                .push(Face::new(a1, DirectedEdge::new(e_a, true), c2));
            self.faces
                .push(Face::new(a2, b1, DirectedEdge::new(e_b, true)));
            self.faces
                .push(Face::new(DirectedEdge::new(e_c, true), b2, c1));
            self.faces.push(Face::new(
                DirectedEdge::new(e_a, false),
                DirectedEdge::new(e_b, false),
                DirectedEdge::new(e_c, false),
            ));
        }

        self.populate();
    }

    /// Refinement with `division - 1` inserted points per edge.
    ///
    /// Only the mid-edge case (`division == 2`) is supported; 0 and 1 are
    /// no-ops, and higher tesselation orders are declined with a warning.
    pub fn refine_division(&mut self, division: usize) {
        match division {
            0 | 1 => {}
            2 => self.refine(),
            _ => warn!("refinement with division {division} is not supported"),
        }
    }
}
