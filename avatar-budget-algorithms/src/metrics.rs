//! Scene resource metrics and budget rating

use avatar_budget_core::{ImageId, MaterialId, MeshData, SceneInventory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How polygons are converted into a triangle total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriangleCounting {
    /// `corners - 2` per polygon, i.e. the triangles a renderer draws
    #[default]
    FanTriangulated,
    /// One per polygon regardless of corner count
    PolygonCount,
}

/// Options for [`compute_metrics_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsOptions {
    pub triangle_counting: TriangleCounting,
}

/// Resource totals of the visible part of a scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    pub triangles: usize,
    pub bones: usize,
    pub meshes: usize,
    pub materials: usize,
    pub texture_memory_bytes: u64,
}

impl fmt::Display for ResourceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tris, {} bones, {} meshes, {} materials, {:.1} MiB textures",
            self.triangles,
            self.bones,
            self.meshes,
            self.materials,
            self.texture_memory_bytes as f64 / MIB as f64
        )
    }
}

/// Triangle total of one mesh under `counting`
pub fn count_triangles(mesh: &MeshData, counting: TriangleCounting) -> usize {
    match counting {
        TriangleCounting::FanTriangulated => mesh.triangle_count(),
        TriangleCounting::PolygonCount => mesh.polygon_count(),
    }
}

/// Compute metrics with the default triangle counting convention
pub fn compute_metrics<S: SceneInventory + ?Sized>(inventory: &S) -> ResourceMetrics {
    compute_metrics_with(inventory, &MetricsOptions::default())
}

/// Compute metrics over visible meshes and armatures.
///
/// Materials and images are counted once each no matter how many slots
/// reference them; images are deduplicated by id, not by name.
pub fn compute_metrics_with<S: SceneInventory + ?Sized>(
    inventory: &S,
    options: &MetricsOptions,
) -> ResourceMetrics {
    let meshes = inventory.visible_meshes();

    let triangles = meshes
        .iter()
        .map(|m| count_triangles(m.data, options.triangle_counting))
        .sum();

    let materials: BTreeSet<MaterialId> = meshes
        .iter()
        .flat_map(|m| m.data.materials.iter().copied())
        .filter(|&id| inventory.material(id).is_some())
        .collect();

    let images: BTreeSet<ImageId> = materials
        .iter()
        .filter_map(|&id| inventory.material(id))
        .flat_map(|material| material.images.iter().copied())
        .collect();

    let texture_memory_bytes = images
        .iter()
        .filter_map(|&id| inventory.image(id))
        .map(|image| image.memory_bytes())
        .sum();

    let bones = inventory
        .armatures()
        .iter()
        .filter(|a| a.visible)
        .map(|a| a.data.len())
        .sum();

    ResourceMetrics {
        triangles,
        bones,
        meshes: meshes.len(),
        materials: materials.len(),
        texture_memory_bytes,
    }
}

const MIB: u64 = 1024 * 1024;

/// Rating of a single resource against its limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum BudgetRating {
    Good,
    Acceptable,
    Excessive,
}

impl BudgetRating {
    /// Status glyph for one-line summaries
    pub fn symbol(self) -> &'static str {
        match self {
            BudgetRating::Good => "✓",
            BudgetRating::Acceptable => "⚠",
            BudgetRating::Excessive => "✗",
        }
    }
}

/// Inclusive ceilings for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub good: u64,
    pub acceptable: u64,
}

impl Limit {
    pub const fn new(good: u64, acceptable: u64) -> Self {
        Self { good, acceptable }
    }

    pub fn rate(&self, value: u64) -> BudgetRating {
        if value <= self.good {
            BudgetRating::Good
        } else if value <= self.acceptable {
            BudgetRating::Acceptable
        } else {
            BudgetRating::Excessive
        }
    }
}

/// Per-resource limits of a target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformLimits {
    pub triangles: Limit,
    pub bones: Limit,
    pub materials: Limit,
    pub texture_memory_bytes: Limit,
}

impl Default for PlatformLimits {
    fn default() -> Self {
        Self::pc()
    }
}

impl PlatformLimits {
    /// Desktop limits
    pub fn pc() -> Self {
        Self {
            triangles: Limit::new(70_000, 100_000),
            bones: Limit::new(400, 500),
            materials: Limit::new(8, 16),
            texture_memory_bytes: Limit::new(40 * MIB, 75 * MIB),
        }
    }

    /// Standalone headset limits
    pub fn quest() -> Self {
        Self {
            triangles: Limit::new(10_000, 15_000),
            bones: Limit::new(90, 150),
            materials: Limit::new(2, 4),
            texture_memory_bytes: Limit::new(10 * MIB, 18 * MIB),
        }
    }
}

/// Ratings of every tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetReport {
    pub triangles: BudgetRating,
    pub bones: BudgetRating,
    pub materials: BudgetRating,
    pub texture_memory: BudgetRating,
}

impl BudgetReport {
    /// The worst individual rating
    pub fn overall(&self) -> BudgetRating {
        self.triangles
            .max(self.bones)
            .max(self.materials)
            .max(self.texture_memory)
    }
}

impl ResourceMetrics {
    pub fn rate(&self, limits: &PlatformLimits) -> BudgetReport {
        BudgetReport {
            triangles: limits.triangles.rate(self.triangles as u64),
            bones: limits.bones.rate(self.bones as u64),
            materials: limits.materials.rate(self.materials as u64),
            texture_memory: limits.texture_memory_bytes.rate(self.texture_memory_bytes),
        }
    }
}
