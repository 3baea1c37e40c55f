//! Decimation planning and application
//!
//! A single scene-wide keep ratio is derived from the current and target
//! triangle counts and applied to every visible mesh independently.

use crate::edge_collapse::{CollapseOutcome, EdgeCollapseSimplifier};
use avatar_budget_core::{MeshData, ObjectId, Polygon, Result, Scene, SceneInventory};
use log::{debug, info};

/// Lowest keep ratio a plan may produce unless configured otherwise
pub const DEFAULT_MIN_RATIO: f32 = 0.01;

/// Cost added to boundary edges by the default decimator
pub const DEFAULT_BOUNDARY_WEIGHT: f64 = 100.0;

/// Fraction of triangles to keep so that `current` shrinks to `target`.
///
/// Returns exactly `1.0` when `current <= target`; otherwise
/// `target / current`, never below `floor`. A `floor` that is not a positive
/// number falls back to [`DEFAULT_MIN_RATIO`], so the result is always `> 0`.
pub fn plan_ratio(current: usize, target: usize, floor: f32) -> f32 {
    if current <= target {
        return 1.0;
    }
    let floor = if floor > 0.0 {
        floor.min(1.0)
    } else {
        DEFAULT_MIN_RATIO
    };
    ((target as f64 / current as f64) as f32).max(floor)
}

/// Reduces polygon meshes with edge collapse.
///
/// With `preserve_uvs` every output face is a triangle. Without it, polygons
/// that came through the collapse untouched keep their original corners.
#[derive(Debug, Clone)]
pub struct Decimator {
    pub simplifier: EdgeCollapseSimplifier,
    pub preserve_uvs: bool,
}

impl Default for Decimator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Decimator {
    pub fn new(preserve_uvs: bool) -> Self {
        Self {
            simplifier: EdgeCollapseSimplifier::penalize_boundary(DEFAULT_BOUNDARY_WEIGHT),
            preserve_uvs,
        }
    }

    pub fn with_simplifier(simplifier: EdgeCollapseSimplifier, preserve_uvs: bool) -> Self {
        Self {
            simplifier,
            preserve_uvs,
        }
    }

    /// Reduce `mesh` toward `ratio` of its triangles. Skin and material
    /// references are carried over unchanged.
    ///
    /// Fails with [`Error::InvalidData`](avatar_budget_core::Error) when the
    /// mesh has out-of-range indices or mismatched UVs.
    pub fn decimate(&self, mesh: &MeshData, ratio: f32) -> Result<MeshData> {
        mesh.validate()?;
        if ratio >= 1.0 || mesh.is_empty() {
            return Ok(mesh.clone());
        }

        let triangles = mesh.to_triangle_mesh();
        let outcome = self.simplifier.collapse(&triangles, ratio)?;
        let polygons = self.rebuild_polygons(mesh, &outcome);

        Ok(MeshData {
            positions: outcome.mesh.vertices,
            uvs: outcome.mesh.uvs,
            polygons,
            vertex_groups: mesh.vertex_groups.clone(),
            materials: mesh.materials.clone(),
        })
    }

    fn rebuild_polygons(&self, mesh: &MeshData, outcome: &CollapseOutcome) -> Vec<Polygon> {
        let mut polygons = Vec::with_capacity(outcome.mesh.face_count());
        let mut first_face = 0usize;

        for polygon in &mesh.polygons {
            let faces = first_face..first_face + polygon.triangle_count();
            first_face = faces.end;

            if !self.preserve_uvs && polygon.len() > 3 {
                if let Some(kept) = untouched_polygon(polygon, faces.clone(), outcome) {
                    polygons.push(kept);
                    continue;
                }
            }

            polygons.extend(
                faces
                    .filter_map(|fi| outcome.face_map[fi])
                    .map(|nf| {
                        let [a, b, c] = outcome.mesh.faces[nf];
                        Polygon::triangle(a, b, c)
                    }),
            );
        }

        polygons
    }
}

/// The polygon with remapped corners if none of its triangles or corners
/// took part in a collapse
fn untouched_polygon(
    polygon: &Polygon,
    faces: std::ops::Range<usize>,
    outcome: &CollapseOutcome,
) -> Option<Polygon> {
    if faces.clone().any(|fi| outcome.face_map[fi].is_none()) {
        return None;
    }
    polygon
        .vertices
        .iter()
        .map(|&v| {
            if outcome.vertex_moved[v] {
                None
            } else {
                outcome.vertex_map[v]
            }
        })
        .collect::<Option<Vec<_>>>()
        .map(Polygon::new)
}

/// Triangle totals of one decimation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimationPass {
    pub meshes: usize,
    pub triangles_before: usize,
    pub triangles_after: usize,
}

/// Apply `ratio` to every visible mesh in the scene.
///
/// Stops at the first mesh that fails; meshes already reduced stay reduced.
pub fn decimate_visible_meshes(
    scene: &mut Scene,
    ratio: f32,
    decimator: &Decimator,
) -> Result<DecimationPass> {
    let ids: Vec<ObjectId> = scene.visible_meshes().iter().map(|m| m.id).collect();
    decimate_objects(scene, &ids, ratio, decimator)
}

/// Apply `ratio` to the selected, visible meshes only
pub fn decimate_selected_meshes(
    scene: &mut Scene,
    ratio: f32,
    decimator: &Decimator,
) -> Result<DecimationPass> {
    let ids: Vec<ObjectId> = scene
        .objects()
        .filter(|(_, obj)| obj.selected && obj.is_visible() && obj.as_mesh().is_some())
        .map(|(id, _)| id)
        .collect();
    decimate_objects(scene, &ids, ratio, decimator)
}

fn decimate_objects(
    scene: &mut Scene,
    ids: &[ObjectId],
    ratio: f32,
    decimator: &Decimator,
) -> Result<DecimationPass> {
    let mut pass = DecimationPass {
        meshes: 0,
        triangles_before: 0,
        triangles_after: 0,
    };

    for &id in ids {
        let Some(mesh) = scene.mesh_mut(id) else {
            continue;
        };
        let before = mesh.triangle_count();
        let reduced = decimator.decimate(mesh, ratio)?;
        let after = reduced.triangle_count();
        *mesh = reduced;

        debug!("decimated mesh {id:?}: {before} -> {after} triangles");
        pass.meshes += 1;
        pass.triangles_before += before;
        pass.triangles_after += after;
    }

    info!(
        "decimated {} meshes at ratio {:.3}: {} -> {} triangles",
        pass.meshes, ratio, pass.triangles_before, pass.triangles_after
    );
    Ok(pass)
}
