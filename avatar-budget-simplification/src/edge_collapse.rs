//! Edge collapse simplification
//!
//! Iterative edge collapse over a half-edge mesh, ordered by quadric error
//! (QEM). Besides the simplified mesh, a collapse run reports where every
//! input vertex and face ended up so callers can rebuild their own polygon
//! structure around the faces that were never touched.

use crate::MeshSimplifier;
use avatar_budget_core::{uv_midpoint, Error, Point3f, Result, TriangleMesh, Uv};
use log::debug;
use nalgebra::{Matrix4, Vector4};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const INVALID: usize = usize::MAX;

/// Queue key of an edge, independent of direction
type EdgeKey = (usize, usize);

fn edge_key(a: usize, b: usize) -> EdgeKey {
    (a.min(b), a.max(b))
}

#[derive(Debug, Clone)]
struct HalfEdge {
    target: usize,
    twin: usize,
    next: usize,
    prev: usize,
    face: usize,
}

/// Half-edge mesh for topology-aware edge collapse operations.
struct HalfEdgeMesh {
    half_edges: Vec<HalfEdge>,
    /// One outgoing half-edge per vertex (INVALID if removed)
    vertex_edge: Vec<usize>,
    /// One half-edge per face (INVALID if removed)
    face_edge: Vec<usize>,
    active_face_count: usize,
    positions: Vec<Point3f>,
    uvs: Option<Vec<Uv>>,
    quadrics: Vec<Matrix4<f64>>,
    vertex_removed: Vec<bool>,
    /// Set on the surviving vertex of every collapse
    vertex_moved: Vec<bool>,
}

impl HalfEdgeMesh {
    fn from_triangle_mesh(mesh: &TriangleMesh) -> Self {
        let nv = mesh.vertices.len();
        let nf = mesh.faces.len();

        let mut half_edges = Vec::with_capacity(nf * 3);
        let mut vertex_edge = vec![INVALID; nv];
        let mut face_edge = Vec::with_capacity(nf);

        for (fi, face) in mesh.faces.iter().enumerate() {
            let base = fi * 3;
            for j in 0..3usize {
                half_edges.push(HalfEdge {
                    target: face[(j + 1) % 3],
                    twin: INVALID,
                    next: base + (j + 1) % 3,
                    prev: base + (j + 2) % 3,
                    face: fi,
                });
                if vertex_edge[face[j]] == INVALID {
                    vertex_edge[face[j]] = base + j;
                }
            }
            face_edge.push(base);
        }

        let mut edge_map: HashMap<(usize, usize), usize> = HashMap::with_capacity(nf * 3);
        for (he_idx, he) in half_edges.iter().enumerate() {
            let src = half_edges[he.prev].target;
            edge_map.insert((src, he.target), he_idx);
        }
        for he_idx in 0..half_edges.len() {
            if half_edges[he_idx].twin != INVALID {
                continue;
            }
            let src = half_edges[half_edges[he_idx].prev].target;
            let tgt = half_edges[he_idx].target;
            if let Some(&twin_idx) = edge_map.get(&(tgt, src)) {
                if twin_idx != he_idx && half_edges[twin_idx].twin == INVALID {
                    half_edges[he_idx].twin = twin_idx;
                    half_edges[twin_idx].twin = he_idx;
                }
            }
        }

        let mut hem = HalfEdgeMesh {
            half_edges,
            vertex_edge,
            face_edge,
            active_face_count: nf,
            positions: mesh.vertices.clone(),
            uvs: mesh.uvs.clone(),
            quadrics: vec![Matrix4::zeros(); nv],
            vertex_removed: vec![false; nv],
            vertex_moved: vec![false; nv],
        };
        hem.initialize_quadrics();
        hem
    }

    #[inline]
    fn source(&self, he: usize) -> usize {
        self.half_edges[self.half_edges[he].prev].target
    }

    fn is_alive(&self, v: usize) -> bool {
        !self.vertex_removed[v] && self.vertex_edge[v] != INVALID
    }

    fn compute_plane(v0: &Point3f, v1: &Point3f, v2: &Point3f) -> Vector4<f64> {
        let n = (v1 - v0).cross(&(v2 - v0)).normalize();
        if !n.iter().all(|x| x.is_finite()) {
            return Vector4::new(0.0, 0.0, 1.0, 0.0);
        }
        let d = -n.dot(&v0.coords);
        Vector4::new(n.x as f64, n.y as f64, n.z as f64, d as f64)
    }

    fn plane_to_quadric(p: &Vector4<f64>) -> Matrix4<f64> {
        p * p.transpose()
    }

    fn initialize_quadrics(&mut self) {
        for fi in 0..self.face_edge.len() {
            let he0 = self.face_edge[fi];
            if he0 == INVALID {
                continue;
            }
            let he1 = self.half_edges[he0].next;
            let v0 = self.source(he0);
            let v1 = self.half_edges[he0].target;
            let v2 = self.half_edges[he1].target;
            let plane =
                Self::compute_plane(&self.positions[v0], &self.positions[v1], &self.positions[v2]);
            let q = Self::plane_to_quadric(&plane);
            self.quadrics[v0] += q;
            self.quadrics[v1] += q;
            self.quadrics[v2] += q;
        }
    }

    /// All outgoing half-edges of a vertex, walking both directions on boundaries.
    fn outgoing_half_edges(&self, v: usize) -> Vec<usize> {
        let start = self.vertex_edge[v];
        if start == INVALID {
            return vec![];
        }

        let mut result = Vec::new();
        let mut current = start;

        // counterclockwise: current.prev.twin
        loop {
            result.push(current);
            let twin = self.half_edges[self.half_edges[current].prev].twin;
            if twin == INVALID {
                break;
            }
            current = twin;
            if current == start || result.len() > self.half_edges.len() {
                return result;
            }
        }

        // clockwise from start: twin.next
        let twin_of_start = self.half_edges[start].twin;
        if twin_of_start != INVALID {
            let mut current = self.half_edges[twin_of_start].next;
            while current != start && result.len() <= self.half_edges.len() {
                result.push(current);
                let twin = self.half_edges[current].twin;
                if twin == INVALID {
                    break;
                }
                current = self.half_edges[twin].next;
            }
        }

        result
    }

    fn neighbors(&self, v: usize) -> HashSet<usize> {
        self.outgoing_half_edges(v)
            .iter()
            .map(|&he| self.half_edges[he].target)
            .collect()
    }

    fn is_boundary_vertex(&self, v: usize) -> bool {
        self.outgoing_half_edges(v)
            .iter()
            .any(|&he| self.half_edges[he].twin == INVALID)
    }

    /// Link condition: the endpoints share exactly the apices of the faces
    /// around the edge (two inside, one on a boundary).
    fn check_link_condition(&self, v1: usize, v2: usize) -> bool {
        let Some(h) = self.find_half_edge(v1, v2) else {
            return false;
        };
        let common = self.neighbors(v1).intersection(&self.neighbors(v2)).count();
        let expected = if self.half_edges[h].twin == INVALID { 1 } else { 2 };
        common == expected
    }

    fn find_half_edge(&self, from: usize, to: usize) -> Option<usize> {
        self.outgoing_half_edges(from)
            .into_iter()
            .find(|&he| self.half_edges[he].target == to)
    }

    fn compute_collapse_cost(&self, v1: usize, v2: usize) -> (Point3f, f64) {
        let q = self.quadrics[v1] + self.quadrics[v2];
        let q3 = q.fixed_view::<3, 3>(0, 0);
        let q1 = q.fixed_view::<3, 1>(0, 3);

        let optimal = match q3.try_inverse() {
            Some(inv) => {
                let p = -inv * q1;
                Point3f::new(p[0] as f32, p[1] as f32, p[2] as f32)
            }
            None => Point3f::from((self.positions[v1].coords + self.positions[v2].coords) * 0.5),
        };

        let vh = Vector4::new(optimal.x as f64, optimal.y as f64, optimal.z as f64, 1.0);
        let cost = (vh.transpose() * q * vh)[0].max(0.0);
        (optimal, cost)
    }

    /// Linear scan fallback for a live outgoing half-edge of `v`.
    fn find_valid_outgoing(&self, v: usize) -> usize {
        (0..self.half_edges.len())
            .find(|&i| self.half_edges[i].face != INVALID && self.source(i) == v)
            .unwrap_or(INVALID)
    }

    fn repair_vertex_edge(&mut self, v: usize, preferred: usize) {
        if v == INVALID || self.vertex_edge[v] == INVALID {
            return;
        }
        if self.half_edges[self.vertex_edge[v]].face != INVALID {
            return;
        }
        self.vertex_edge[v] = if preferred != INVALID && self.half_edges[preferred].face != INVALID
        {
            preferred
        } else {
            self.find_valid_outgoing(v)
        };
    }

    fn remove_face(&mut self, he: usize) {
        let next = self.half_edges[he].next;
        let prev = self.half_edges[he].prev;
        let face = self.half_edges[he].face;
        let next_twin = self.half_edges[next].twin;
        let prev_twin = self.half_edges[prev].twin;

        if next_twin != INVALID {
            self.half_edges[next_twin].twin = prev_twin;
        }
        if prev_twin != INVALID {
            self.half_edges[prev_twin].twin = next_twin;
        }
        for e in [he, next, prev] {
            self.half_edges[e].face = INVALID;
        }
        self.face_edge[face] = INVALID;
        self.active_face_count -= 1;
    }

    /// Collapse edge (v1, v2), merging v2 into v1 at `new_pos`.
    fn collapse_edge(&mut self, v1: usize, v2: usize, new_pos: Point3f) -> bool {
        let Some(h) = self.find_half_edge(v1, v2) else {
            return false;
        };

        let h_twin = self.half_edges[h].twin;
        let h_next = self.half_edges[h].next;
        let h_next_twin = self.half_edges[h_next].twin;
        let h_prev_twin = self.half_edges[self.half_edges[h].prev].twin;
        let c = self.half_edges[h_next].target;

        let (ht_next_twin, d) = if h_twin != INVALID {
            let hn = self.half_edges[h_twin].next;
            (self.half_edges[hn].twin, self.half_edges[hn].target)
        } else {
            (INVALID, INVALID)
        };

        // gather before the faces around the edge disappear
        let v2_outgoing = self.outgoing_half_edges(v2);

        self.remove_face(h);
        if h_twin != INVALID {
            self.remove_face(h_twin);
        }

        for &he in &v2_outgoing {
            let prev = self.half_edges[he].prev;
            self.half_edges[prev].target = v1;

            let twin = self.half_edges[he].twin;
            if twin != INVALID && self.half_edges[twin].face != INVALID {
                self.half_edges[twin].target = v1;
            }
        }

        if self.half_edges[self.vertex_edge[v1]].face == INVALID {
            self.vertex_edge[v1] =
                if h_prev_twin != INVALID && self.half_edges[h_prev_twin].face != INVALID {
                    h_prev_twin
                } else {
                    self.find_valid_outgoing(v1)
                };
        }
        self.repair_vertex_edge(c, h_next_twin);
        if d != c {
            self.repair_vertex_edge(d, ht_next_twin);
        }

        self.vertex_edge[v2] = INVALID;
        self.vertex_removed[v2] = true;
        self.vertex_moved[v1] = true;

        let v2_quadric = self.quadrics[v2];
        self.positions[v1] = new_pos;
        self.quadrics[v1] += v2_quadric;

        if let Some(uvs) = self.uvs.as_mut() {
            uvs[v1] = uv_midpoint(uvs[v1], uvs[v2]);
        }

        true
    }

    fn into_outcome(self) -> CollapseOutcome {
        let mut vertex_map = vec![None; self.positions.len()];
        let mut new_positions = Vec::new();
        let mut new_uvs = self.uvs.as_ref().map(|_| Vec::new());

        for (i, slot) in vertex_map.iter_mut().enumerate() {
            if self.is_alive(i) {
                *slot = Some(new_positions.len());
                new_positions.push(self.positions[i]);
                if let (Some(out), Some(uvs)) = (new_uvs.as_mut(), self.uvs.as_ref()) {
                    out.push(uvs[i]);
                }
            }
        }

        let mut face_map = vec![None; self.face_edge.len()];
        let mut new_faces = Vec::new();
        for (fi, &he0) in self.face_edge.iter().enumerate() {
            if he0 == INVALID {
                continue;
            }
            let he1 = self.half_edges[he0].next;
            let corners = [
                self.source(he0),
                self.half_edges[he0].target,
                self.half_edges[he1].target,
            ];
            if let [Some(a), Some(b), Some(c)] = corners.map(|v| vertex_map[v]) {
                if a != b && b != c && c != a {
                    face_map[fi] = Some(new_faces.len());
                    new_faces.push([a, b, c]);
                }
            }
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(new_positions, new_faces);
        if let Some(uvs) = new_uvs {
            mesh.set_uvs(uvs);
        }
        CollapseOutcome {
            mesh,
            vertex_map,
            face_map,
            vertex_moved: self.vertex_moved,
        }
    }
}

/// Result of a collapse run with provenance for every input element
#[derive(Debug, Clone)]
pub struct CollapseOutcome {
    /// The simplified mesh
    pub mesh: TriangleMesh,
    /// Input vertex index to output vertex index, `None` if merged away
    pub vertex_map: Vec<Option<usize>>,
    /// Input face index to output face index, `None` if collapsed
    pub face_map: Vec<Option<usize>>,
    /// Input vertices that absorbed a neighbour and were repositioned
    pub vertex_moved: Vec<bool>,
}

impl CollapseOutcome {
    fn unchanged(mesh: &TriangleMesh) -> Self {
        Self {
            mesh: mesh.clone(),
            vertex_map: (0..mesh.vertex_count()).map(Some).collect(),
            face_map: (0..mesh.face_count()).map(Some).collect(),
            vertex_moved: vec![false; mesh.vertex_count()],
        }
    }
}

#[derive(Debug, Clone)]
struct EdgeCost {
    v1: usize,
    v2: usize,
    cost: f64,
}

impl PartialEq for EdgeCost {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}
impl Eq for EdgeCost {}

impl PartialOrd for EdgeCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap: cheapest collapse first
        other.cost.total_cmp(&self.cost)
    }
}

/// Edge collapse mesh simplifier using a half-edge mesh and quadric error metrics.
#[derive(Debug, Clone)]
pub struct EdgeCollapseSimplifier {
    /// Stop when the minimum collapse cost exceeds this threshold
    pub error_threshold: Option<f64>,
    /// Never collapse edges touching the mesh boundary
    pub preserve_boundary: bool,
    /// Extra cost added to boundary edges when they are not preserved
    pub boundary_weight: f64,
}

impl Default for EdgeCollapseSimplifier {
    fn default() -> Self {
        Self {
            error_threshold: None,
            preserve_boundary: true,
            boundary_weight: 100.0,
        }
    }
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(
        error_threshold: Option<f64>,
        preserve_boundary: bool,
        boundary_weight: f64,
    ) -> Self {
        Self {
            error_threshold,
            preserve_boundary,
            boundary_weight,
        }
    }

    /// Penalise boundary edges instead of freezing them. Open character
    /// meshes (clothing, hair cards) would otherwise stall far above target.
    pub fn penalize_boundary(weight: f64) -> Self {
        Self::with_params(None, false, weight)
    }

    /// Cost of collapsing the half-edge `from -> to`, `None` when the edge
    /// is frozen on the boundary
    fn edge_cost(&self, hem: &HalfEdgeMesh, from: usize, to: usize) -> Option<EdgeCost> {
        let on_boundary = hem.is_boundary_vertex(from) || hem.is_boundary_vertex(to);
        if self.preserve_boundary && on_boundary {
            return None;
        }
        let (_, mut cost) = hem.compute_collapse_cost(from, to);
        if on_boundary {
            cost += self.boundary_weight;
        }
        Some(EdgeCost {
            v1: from,
            v2: to,
            cost,
        })
    }

    /// Queue every live edge
    fn build_queue(&self, hem: &HalfEdgeMesh) -> PriorityQueue<EdgeKey, EdgeCost> {
        let mut queue = PriorityQueue::new();

        for vi in 0..hem.positions.len() {
            if !hem.is_alive(vi) {
                continue;
            }
            for he in hem.outgoing_half_edges(vi) {
                if hem.half_edges[he].face == INVALID {
                    continue;
                }
                let target = hem.half_edges[he].target;
                let key = edge_key(vi, target);
                if queue.get(&key).is_some() {
                    continue;
                }
                if let Some(cost) = self.edge_cost(hem, vi, target) {
                    queue.push(key, cost);
                }
            }
        }

        queue
    }

    /// Re-cost the edges around `v` after it absorbed a neighbour. Entries
    /// for the removed vertex go stale and are dropped when popped.
    fn requeue_around(
        &self,
        hem: &HalfEdgeMesh,
        v: usize,
        queue: &mut PriorityQueue<EdgeKey, EdgeCost>,
    ) {
        for he in hem.outgoing_half_edges(v) {
            if hem.half_edges[he].face == INVALID {
                continue;
            }
            let outgoing = (v, hem.half_edges[he].target);
            let incoming = (hem.source(hem.half_edges[he].prev), v);
            for (from, to) in [outgoing, incoming] {
                let key = edge_key(from, to);
                match self.edge_cost(hem, from, to) {
                    Some(cost) => {
                        queue.push(key, cost);
                    }
                    None => {
                        queue.remove(&key);
                    }
                }
            }
        }
    }

    /// Collapse edges until at most `keep_ratio` of the faces remain or no
    /// legal collapse is left.
    pub fn collapse(&self, mesh: &TriangleMesh, keep_ratio: f32) -> Result<CollapseOutcome> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if !(keep_ratio > 0.0 && keep_ratio <= 1.0) {
            return Err(Error::InvalidData(format!(
                "Keep ratio must be in (0, 1], got {keep_ratio}"
            )));
        }
        if keep_ratio == 1.0 {
            return Ok(CollapseOutcome::unchanged(mesh));
        }

        let target_faces = (keep_ratio as f64 * mesh.face_count() as f64).round() as usize;
        let mut hem = HalfEdgeMesh::from_triangle_mesh(mesh);
        let mut queue = self.build_queue(&hem);
        let mut collapse_count = 0usize;
        let mut last_rebuild = 0usize;

        while hem.active_face_count > target_faces {
            let Some((_, edge_cost)) = queue.pop() else {
                // edges rejected earlier may have become legal since
                if collapse_count == last_rebuild {
                    break;
                }
                last_rebuild = collapse_count;
                queue = self.build_queue(&hem);
                continue;
            };

            if let Some(threshold) = self.error_threshold {
                if edge_cost.cost > threshold {
                    break;
                }
            }

            let (v1, v2) = (edge_cost.v1, edge_cost.v2);
            if !hem.is_alive(v1) || !hem.is_alive(v2) || hem.find_half_edge(v1, v2).is_none() {
                continue;
            }
            if !hem.check_link_condition(v1, v2) {
                continue;
            }

            // cost may be stale since queuing
            let (pos, _) = hem.compute_collapse_cost(v1, v2);

            if hem.collapse_edge(v1, v2, pos) {
                collapse_count += 1;
                self.requeue_around(&hem, v1, &mut queue);
            }
        }

        debug!(
            "edge collapse: {} collapses, {} -> {} faces (target {})",
            collapse_count,
            mesh.face_count(),
            hem.active_face_count,
            target_faces
        );
        Ok(hem.into_outcome())
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, keep_ratio: f32) -> Result<TriangleMesh> {
        self.collapse(mesh, keep_ratio).map(|outcome| outcome.mesh)
    }
}
