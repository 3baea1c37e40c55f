//! Mesh data structures and functionality

use crate::point::*;
use crate::scene::MaterialId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub uvs: Option<Vec<Uv>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            uvs: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            uvs: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Set per-vertex texture coordinates
    pub fn set_uvs(&mut self, uvs: Vec<Uv>) {
        if uvs.len() == self.vertices.len() {
            self.uvs = Some(uvs);
        }
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// A single face of a polygon mesh, as an ordered loop of vertex indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<usize>,
}

impl Polygon {
    pub fn new(vertices: Vec<usize>) -> Self {
        Self { vertices }
    }

    pub fn triangle(a: usize, b: usize, c: usize) -> Self {
        Self::new(vec![a, b, c])
    }

    pub fn quad(a: usize, b: usize, c: usize, d: usize) -> Self {
        Self::new(vec![a, b, c, d])
    }

    /// Number of corners
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Triangles produced by fan triangulation (`corners - 2`)
    pub fn triangle_count(&self) -> usize {
        self.vertices.len().saturating_sub(2)
    }

    /// Fan triangulation around the first corner
    pub fn fan_triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let first = self.vertices.first().copied().unwrap_or_default();
        self.vertices
            .windows(2)
            .skip(1)
            .map(move |w| [first, w[0], w[1]])
    }
}

/// Polygon mesh owned by a mesh object: geometry plus skinning and material references
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Point3f>,
    /// Per-vertex texture coordinates
    pub uvs: Option<Vec<Uv>>,
    pub polygons: Vec<Polygon>,
    /// Names of the skin weight groups; each names the bone it binds to
    pub vertex_groups: BTreeSet<String>,
    /// Material slots
    pub materials: Vec<MaterialId>,
}

impl MeshData {
    /// Create a mesh from positions and polygons, validating every index
    pub fn new(positions: Vec<Point3f>, polygons: Vec<Polygon>) -> Result<Self> {
        let mesh = Self {
            positions,
            polygons,
            ..Default::default()
        };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn with_uvs(mut self, uvs: Vec<Uv>) -> Result<Self> {
        if uvs.len() != self.positions.len() {
            return Err(Error::InvalidData(format!(
                "{} uvs for {} vertices",
                uvs.len(),
                self.positions.len()
            )));
        }
        self.uvs = Some(uvs);
        Ok(self)
    }

    pub fn with_vertex_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vertex_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.materials.push(material);
        self
    }

    /// Check that every polygon has at least three corners and in-range
    /// indices, and that UVs match the vertices one to one
    pub fn validate(&self) -> Result<()> {
        let nv = self.positions.len();
        if let Some(uvs) = &self.uvs {
            if uvs.len() != nv {
                return Err(Error::InvalidData(format!("{} uvs for {nv} vertices", uvs.len())));
            }
        }
        for (pi, polygon) in self.polygons.iter().enumerate() {
            if polygon.len() < 3 {
                return Err(Error::InvalidData(format!(
                    "polygon {pi} has {} corners",
                    polygon.len()
                )));
            }
            if let Some(&bad) = polygon.vertices.iter().find(|&&v| v >= nv) {
                return Err(Error::InvalidData(format!(
                    "polygon {pi} references vertex {bad} of {nv}"
                )));
            }
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Sum of `corners - 2` over all polygons
    pub fn triangle_count(&self) -> usize {
        self.polygons.iter().map(Polygon::triangle_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.polygons.is_empty()
    }

    /// Fan-triangulate every polygon
    pub fn to_triangle_mesh(&self) -> TriangleMesh {
        let faces = self
            .polygons
            .iter()
            .flat_map(|p| p.fan_triangles())
            .collect();
        TriangleMesh {
            vertices: self.positions.clone(),
            faces,
            uvs: self.uvs.clone(),
        }
    }
}
