use crate::node_registry::DeterministicState;
use crate::Real;
use na::{Point3, Vector3};
use std::collections::HashMap;

/// An indexed triangle mesh.
///
/// Triangles are consistently wound: their normals (right-hand rule) point outwards.
/// The mesh is raw marching-cubes output, it is not cleaned or decimated.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Mesh {
    /// The vertex positions.
    pub vertices: Vec<Point3<Real>>,
    /// Triangles, as 0-based indices into `vertices`.
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// A mesh from its vertices and triangles.
    pub fn new(vertices: Vec<Point3<Real>>, triangles: Vec<[u32; 3]>) -> Self {
        debug_assert!(triangles
            .iter()
            .flatten()
            .all(|id| (*id as usize) < vertices.len()));
        Self {
            vertices,
            triangles,
        }
    }

    /// The empty mesh returned to pipelines that continue after a failed reconstruction.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Does this mesh have no triangle?
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// The three vertices of the `i`-th triangle.
    pub fn triangle(&self, i: usize) -> [Point3<Real>; 3] {
        self.triangles[i].map(|id| self.vertices[id as usize])
    }

    /// The non-normalized normal of the `i`-th triangle (twice its area).
    pub fn triangle_normal(&self, i: usize) -> Vector3<Real> {
        let [a, b, c] = self.triangle(i);
        (b - a).cross(&(c - a))
    }

    /// The barycenter of the `i`-th triangle.
    pub fn triangle_centroid(&self, i: usize) -> Point3<Real> {
        let [a, b, c] = self.triangle(i);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// The average of all the vertices, or the origin if there are none.
    pub fn centroid(&self) -> Point3<Real> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }

        let sum: Vector3<Real> = self.vertices.iter().map(|v| v.coords).sum();
        Point3::from(sum / self.vertices.len() as Real)
    }

    /// Number of directed edges without an opposite twin.
    ///
    /// Duplicated directed edges count as unmatched too.
    pub fn boundary_edge_count(&self) -> usize {
        let mut edges: HashMap<(u32, u32), usize, DeterministicState> =
            HashMap::with_capacity_and_hasher(self.triangles.len() * 3, DeterministicState);

        for [a, b, c] in &self.triangles {
            for edge in [(*a, *b), (*b, *c), (*c, *a)] {
                *edges.entry(edge).or_insert(0) += 1;
            }
        }

        edges
            .iter()
            .filter(|((a, b), count)| **count != 1 || edges.get(&(*b, *a)) != Some(&1))
            .map(|(_, count)| *count)
            .sum()
    }

    /// Is every edge of this mesh shared by exactly two consistently oriented triangles?
    pub fn is_closed(&self) -> bool {
        !self.is_empty() && self.boundary_edge_count() == 0
    }

    /// Unit per-vertex normals, weighted by the area of the adjacent triangles.
    ///
    /// Vertices without a non-degenerate adjacent triangle get a zero normal.
    pub fn vertex_normals(&self) -> Vec<Vector3<Real>> {
        let mut normals = vec![Vector3::zeros(); self.vertices.len()];

        for (i, tri) in self.triangles.iter().enumerate() {
            let normal = self.triangle_normal(i);
            for id in tri {
                normals[*id as usize] += normal;
            }
        }

        for n in &mut normals {
            *n = n.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        }

        normals
    }

    /// Applies `f` to every vertex, keeping the triangles.
    pub fn map_vertices(mut self, mut f: impl FnMut(&Point3<Real>) -> Point3<Real>) -> Self {
        for v in &mut self.vertices {
            *v = f(v);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tetrahedron() -> Mesh {
        Mesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    #[test]
    fn closed_tetrahedron_faces_outwards() {
        let mesh = tetrahedron();
        assert!(mesh.is_closed());

        let center = mesh.centroid();
        for i in 0..mesh.num_triangles() {
            let outward = mesh.triangle_centroid(i) - center;
            assert!(mesh.triangle_normal(i).dot(&outward) > 0.0);
        }
    }

    #[test]
    fn open_and_empty_meshes() {
        let mut mesh = tetrahedron();
        mesh.triangles.pop();
        assert!(!mesh.is_closed());
        assert_eq!(mesh.boundary_edge_count(), 3);

        let empty = Mesh::empty();
        assert!(empty.is_empty());
        assert!(!empty.is_closed());
        assert_eq!(empty.num_vertices(), 0);
        assert_eq!(empty.centroid(), Point3::origin());
    }

    #[test]
    fn vertex_normals_point_outwards() {
        let mesh = tetrahedron();
        let normals = mesh.vertex_normals();
        let center = mesh.centroid();

        assert_eq!(normals.len(), 4);
        for (v, n) in mesh.vertices.iter().zip(normals.iter()) {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1.0e-12);
            assert!(n.dot(&(v - center)) > 0.0);
        }

        // The corner at the origin sees three unit right triangles.
        let expected = -Vector3::repeat(1.0).normalize();
        assert_relative_eq!(normals[0], expected, epsilon = 1.0e-12);
    }

    #[test]
    fn isolated_vertices_have_zero_normals() {
        let mut mesh = tetrahedron();
        mesh.vertices.push(Point3::new(5.0, 5.0, 5.0));
        mesh.triangles.push([0, 0, 4]);

        assert_eq!(mesh.vertex_normals()[4], Vector3::zeros());
    }

    #[test]
    fn map_vertices_keeps_topology() {
        let mesh = tetrahedron();
        let triangles = mesh.triangles.clone();
        let moved = mesh.map_vertices(|v| v + Vector3::new(1.0, 2.0, 3.0));

        assert_eq!(moved.triangles, triangles);
        assert_relative_eq!(moved.vertices[1], Point3::new(2.0, 2.0, 3.0));
        assert_relative_eq!(moved.centroid(), Point3::new(1.25, 2.25, 3.25));
    }
}
