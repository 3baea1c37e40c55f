//! Host operation surface
//!
//! The [`Engine`] owns the scene and the bridge cache and exposes every
//! operation a host calls: analysis, the individual reduction steps, the
//! combined optimization pass and the selection bridge.

use crate::config::OptimizeConfig;
use crate::selection::{self, SelectionOutcome};
use avatar_budget_algorithms::{
    classify_bones_with, compute_metrics, compute_metrics_with, remove_bones, resize_textures,
    BoneAnalysisOptions, BudgetReport, MetricsOptions, ResourceMetrics,
};
use avatar_budget_core::{Error, Result, Scene, SceneInventory};
use avatar_budget_io::{default_bridge_path, BridgeCache, ExchangeDocument, BRIDGE_FILE};
use avatar_budget_simplification::{
    decimate_selected_meshes, decimate_visible_meshes, plan_ratio, DecimationPass, Decimator,
    DEFAULT_MIN_RATIO,
};
use log::{info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of a decimation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecimationOutcome {
    /// The scene was already at or under the target; nothing changed
    AlreadyWithinBudget { triangles: usize },
    Decimated {
        before: usize,
        after: usize,
        ratio: f32,
        meshes: usize,
    },
}

impl DecimationOutcome {
    pub fn before(&self) -> usize {
        match *self {
            DecimationOutcome::AlreadyWithinBudget { triangles } => triangles,
            DecimationOutcome::Decimated { before, .. } => before,
        }
    }

    pub fn after(&self) -> usize {
        match *self {
            DecimationOutcome::AlreadyWithinBudget { triangles } => triangles,
            DecimationOutcome::Decimated { after, .. } => after,
        }
    }
}

/// A step of [`Engine::optimize_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RemoveUnusedBones,
    Decimate,
    ResizeTextures,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::RemoveUnusedBones => "remove unused bones",
            Step::Decimate => "decimate",
            Step::ResizeTextures => "resize textures",
        };
        f.write_str(name)
    }
}

/// What a full optimization pass did
#[derive(Debug, Clone)]
pub struct OptimizeSummary {
    pub before: ResourceMetrics,
    pub after: ResourceMetrics,
    pub rating: BudgetReport,
    /// Steps that ran, in order
    pub steps: Vec<Step>,
    pub bones_removed: usize,
    pub decimation: Option<DecimationOutcome>,
    pub textures_resized: usize,
}

impl OptimizeSummary {
    pub fn ran(&self, step: Step) -> bool {
        self.steps.contains(&step)
    }
}

impl fmt::Display for OptimizeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "before: {}", self.before)?;
        writeln!(f, "after:  {}", self.after)?;
        for step in &self.steps {
            match step {
                Step::RemoveUnusedBones => {
                    writeln!(f, "  {step}: {} removed", self.bones_removed)?
                }
                Step::Decimate => match self.decimation {
                    Some(DecimationOutcome::Decimated { ratio, .. }) => {
                        writeln!(f, "  {step}: ratio {ratio:.3}")?
                    }
                    _ => writeln!(f, "  {step}: already within budget")?,
                },
                Step::ResizeTextures => {
                    writeln!(f, "  {step}: {} resized", self.textures_resized)?
                }
            }
        }
        write!(f, "rating: {:?}", self.rating.overall())
    }
}

/// The budget reduction engine
#[derive(Debug)]
pub struct Engine {
    scene: Scene,
    bridge: BridgeCache,
    bridge_path: PathBuf,
    metrics: MetricsOptions,
    bone_options: BoneAnalysisOptions,
    min_ratio: f32,
}

impl Engine {
    /// Engine over `scene` reading the bridge from its default location
    pub fn new(scene: Scene) -> Self {
        let bridge_path = default_bridge_path().unwrap_or_else(|| PathBuf::from(BRIDGE_FILE));
        Self::with_bridge_path(scene, bridge_path)
    }

    pub fn with_bridge_path(scene: Scene, bridge_path: impl Into<PathBuf>) -> Self {
        Self {
            scene,
            bridge: BridgeCache::new(),
            bridge_path: bridge_path.into(),
            metrics: MetricsOptions::default(),
            bone_options: BoneAnalysisOptions::default(),
            min_ratio: DEFAULT_MIN_RATIO,
        }
    }

    pub fn with_metrics_options(mut self, metrics: MetricsOptions) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_bone_options(mut self, bone_options: BoneAnalysisOptions) -> Self {
        self.bone_options = bone_options;
        self
    }

    pub fn with_min_ratio(mut self, min_ratio: f32) -> Self {
        self.min_ratio = min_ratio;
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn into_scene(self) -> Scene {
        self.scene
    }

    pub fn bridge_path(&self) -> &Path {
        &self.bridge_path
    }

    /// Current resource totals
    pub fn analyze(&self) -> ResourceMetrics {
        let metrics = compute_metrics_with(&self.scene, &self.metrics);
        info!("analysis: {metrics}");
        metrics
    }

    /// Decimate visible meshes so the scene total approaches `target_triangles`
    pub fn decimate(
        &mut self,
        target_triangles: usize,
        preserve_uvs: bool,
    ) -> Result<DecimationOutcome> {
        self.decimate_to(target_triangles, preserve_uvs, self.min_ratio)
    }

    fn decimate_to(
        &mut self,
        target_triangles: usize,
        preserve_uvs: bool,
        floor: f32,
    ) -> Result<DecimationOutcome> {
        if target_triangles == 0 {
            return Err(Error::InvalidConfig(
                "target triangle count must be positive".to_string(),
            ));
        }
        // targets are always compared against fan-triangulated totals
        let current = compute_metrics(&self.scene).triangles;
        let ratio = plan_ratio(current, target_triangles, floor);
        if ratio >= 1.0 {
            info!("already within budget: {current} <= {target_triangles} triangles");
            return Ok(DecimationOutcome::AlreadyWithinBudget { triangles: current });
        }
        self.apply_ratio(ratio, preserve_uvs)
    }

    /// Decimate every visible mesh by a fixed keep ratio between the
    /// minimum ratio and `1.0`
    pub fn decimate_with_ratio(
        &mut self,
        ratio: f32,
        preserve_uvs: bool,
    ) -> Result<DecimationOutcome> {
        self.check_ratio(ratio)?;
        self.apply_ratio(ratio, preserve_uvs)
    }

    /// Decimate only the selected visible meshes by a fixed keep ratio
    pub fn decimate_selected(
        &mut self,
        ratio: f32,
        preserve_uvs: bool,
    ) -> Result<DecimationOutcome> {
        self.check_ratio(ratio)?;
        let pass =
            decimate_selected_meshes(&mut self.scene, ratio, &Decimator::new(preserve_uvs))?;
        Ok(Self::decimated(pass, ratio))
    }

    fn check_ratio(&self, ratio: f32) -> Result<()> {
        let floor = self.min_ratio.max(f32::MIN_POSITIVE);
        if !(ratio >= floor && ratio <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "decimation ratio {ratio} outside [{floor}, 1]"
            )));
        }
        Ok(())
    }

    fn apply_ratio(&mut self, ratio: f32, preserve_uvs: bool) -> Result<DecimationOutcome> {
        let pass =
            decimate_visible_meshes(&mut self.scene, ratio, &Decimator::new(preserve_uvs))?;
        Ok(Self::decimated(pass, ratio))
    }

    fn decimated(pass: DecimationPass, ratio: f32) -> DecimationOutcome {
        DecimationOutcome::Decimated {
            before: pass.triangles_before,
            after: pass.triangles_after,
            ratio,
            meshes: pass.meshes,
        }
    }

    /// Delete bones of the active armature that no visible mesh needs
    pub fn remove_unused_bones(&mut self) -> Result<usize> {
        let (id, prunable) = {
            let armature = self.scene.active_armature().ok_or(Error::NoArmature)?;
            let classification = classify_bones_with(
                Some(armature.data),
                &self.scene.meshes(),
                &self.bone_options,
            );
            (armature.id, classification.prunable)
        };

        let armature = self.scene.armature_mut(id).ok_or(Error::NoArmature)?;
        let removed = remove_bones(armature, &prunable);
        info!("removed {removed} unused bones, {} remain", armature.len());
        Ok(removed)
    }

    /// Shrink every image whose larger side exceeds `max_dimension`
    pub fn resize_textures(&mut self, max_dimension: u32) -> Result<usize> {
        if max_dimension == 0 {
            return Err(Error::InvalidConfig(
                "max texture dimension must be positive".to_string(),
            ));
        }
        Ok(resize_textures(&mut self.scene, max_dimension))
    }

    /// Remove unused bones, decimate, resize textures and re-analyze, each
    /// step only when enabled in `config`.
    ///
    /// A missing armature skips the bone step. Any other failure stops the
    /// pass; earlier steps stay applied.
    pub fn optimize_all(&mut self, config: &OptimizeConfig) -> Result<OptimizeSummary> {
        config.validate()?;
        let before = compute_metrics_with(&self.scene, &config.metrics);
        let mut summary = OptimizeSummary {
            before,
            after: before,
            rating: before.rate(&config.limits),
            steps: Vec::new(),
            bones_removed: 0,
            decimation: None,
            textures_resized: 0,
        };

        if config.remove_unused_bones {
            let previous = std::mem::replace(&mut self.bone_options, config.bone_options);
            let removed = self.remove_unused_bones();
            self.bone_options = previous;
            match removed {
                Ok(count) => {
                    summary.bones_removed = count;
                    summary.steps.push(Step::RemoveUnusedBones);
                }
                Err(Error::NoArmature) => warn!("no armature found, skipping bone removal"),
                Err(err) => return Err(err),
            }
        }

        if config.decimate {
            let outcome =
                self.decimate_to(config.target_triangles, config.preserve_uvs, config.min_ratio)?;
            summary.decimation = Some(outcome);
            summary.steps.push(Step::Decimate);
        }

        if config.resize_textures {
            summary.textures_resized = self.resize_textures(config.max_texture_size)?;
            summary.steps.push(Step::ResizeTextures);
        }

        summary.after = compute_metrics_with(&self.scene, &config.metrics);
        summary.rating = summary.after.rate(&config.limits);
        info!(
            "optimization complete: {} -> {} triangles, {} -> {} bones",
            summary.before.triangles,
            summary.after.triangles,
            summary.before.bones,
            summary.after.bones
        );
        Ok(summary)
    }

    /// Load the bridge document, re-reading it when `force` is set or the
    /// file changed since the last load
    pub fn load_bridge(&mut self, force: bool) -> Option<Arc<ExchangeDocument>> {
        self.bridge.load(&self.bridge_path, force)
    }

    /// Whether the bridge file changed since it was last loaded
    pub fn bridge_has_changed(&self) -> bool {
        self.bridge.has_changed(&self.bridge_path)
    }

    /// `base` with the current bridge document's settings applied
    pub fn config_from_bridge(&mut self, base: &OptimizeConfig) -> OptimizeConfig {
        match self.load_bridge(false) {
            Some(doc) => base.with_overrides(&doc.overrides()),
            None => base.clone(),
        }
    }

    /// Apply the bridge keep/remove lists to the scene.
    ///
    /// Fails with [`Error::NoBridgeData`] and leaves the scene untouched when
    /// no document is available or it names no objects.
    pub fn apply_bridge_selection(&mut self) -> Result<SelectionOutcome> {
        let doc = self
            .load_bridge(false)
            .filter(|doc| doc.has_selection())
            .ok_or(Error::NoBridgeData)?;
        selection::apply_selection(&mut self.scene, &doc.keep_objects, &doc.remove_objects)
    }

    /// Delete objects named in the bridge remove list and every hidden
    /// object. Destructive; hosts should confirm first.
    pub fn delete_marked(&mut self) -> usize {
        let remove = self
            .load_bridge(false)
            .map(|doc| doc.remove_objects.clone())
            .unwrap_or_default();
        selection::delete_marked(&mut self.scene, &remove)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_budget_core::{Armature, ImageAsset, MeshData, Point3f, Polygon};

    fn grid(size: usize, groups: &[&str]) -> MeshData {
        let mut positions = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let z = ((x * 7 + y * 3) % 5) as f32 * 0.1;
                positions.push(Point3f::new(x as f32, y as f32, z));
            }
        }
        let mut polygons = Vec::new();
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let tl = y * size + x;
                polygons.push(Polygon::quad(tl, tl + size, tl + size + 1, tl + 1));
            }
        }
        MeshData::new(positions, polygons)
            .unwrap()
            .with_vertex_groups(groups.iter().copied())
    }

    fn engine() -> Engine {
        let mut scene = Scene::new();
        let armature = Armature::new()
            .with_bone("Hips", None)
            .and_then(|a| a.with_bone("Spine", Some("Hips")))
            .and_then(|a| a.with_bone("Tail", Some("Hips")))
            .unwrap();
        scene.add_armature("Armature", armature);
        scene.add_mesh("Body", grid(12, &["Spine"]));
        scene.add_image(ImageAsset::new("Albedo", 4096, 4096));
        Engine::with_bridge_path(scene, "does-not-exist/bridge.json")
    }

    #[test]
    fn test_decimate_within_budget() {
        let mut engine = engine();
        let outcome = engine.decimate(1_000_000, true).unwrap();
        assert_eq!(outcome, DecimationOutcome::AlreadyWithinBudget { triangles: 242 });
    }

    #[test]
    fn test_decimate_reduces() {
        let mut engine = engine();
        let outcome = engine.decimate(121, true).unwrap();
        assert_eq!(outcome.before(), 242);
        assert!(outcome.after() < 242);
        assert_eq!(engine.analyze().triangles, outcome.after());
    }

    #[test]
    fn test_decimate_rejects_bad_input() {
        let mut engine = engine();
        assert!(engine.decimate(0, true).is_err());
        assert!(engine.decimate_with_ratio(0.0, true).is_err());
        assert!(engine.decimate_with_ratio(1.5, true).is_err());
    }

    #[test]
    fn test_ratio_below_minimum_rejected() {
        let mut engine = engine();
        let result = engine.decimate_with_ratio(0.005, true);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert_eq!(engine.analyze().triangles, 242);

        let mut engine = engine.with_min_ratio(0.25);
        assert!(engine.decimate_selected(0.2, true).is_err());
        assert!(engine.decimate_with_ratio(0.25, true).is_ok());
    }

    #[test]
    fn test_remove_unused_bones() {
        let mut engine = engine();
        assert_eq!(engine.remove_unused_bones().unwrap(), 1);
        assert_eq!(engine.analyze().bones, 2);
        assert_eq!(engine.remove_unused_bones().unwrap(), 0);
    }

    #[test]
    fn test_remove_unused_bones_without_armature() {
        let mut engine = Engine::with_bridge_path(Scene::new(), "unused.json");
        assert!(matches!(engine.remove_unused_bones(), Err(Error::NoArmature)));
    }

    #[test]
    fn test_optimize_all_runs_steps_in_order() {
        let mut engine = engine();
        let config = OptimizeConfig {
            target_triangles: 100,
            ..OptimizeConfig::default()
        };
        let summary = engine.optimize_all(&config).unwrap();

        assert_eq!(
            summary.steps,
            vec![Step::RemoveUnusedBones, Step::Decimate, Step::ResizeTextures]
        );
        assert_eq!(summary.bones_removed, 1);
        assert_eq!(summary.textures_resized, 1);
        assert!(summary.after.triangles < summary.before.triangles);
        assert_eq!(summary.after, engine.analyze());
    }

    #[test]
    fn test_optimize_all_skips_disabled_steps() {
        let mut engine = Engine::with_bridge_path(Scene::new(), "unused.json");
        let config = OptimizeConfig {
            decimate: false,
            resize_textures: false,
            ..OptimizeConfig::default()
        };
        let summary = engine.optimize_all(&config).unwrap();
        assert!(summary.steps.is_empty());
        assert!(!summary.ran(Step::RemoveUnusedBones));
    }

    #[test]
    fn test_optimize_all_validates_config() {
        let mut engine = engine();
        let config = OptimizeConfig {
            max_texture_size: 1,
            ..OptimizeConfig::default()
        };
        assert!(matches!(engine.optimize_all(&config), Err(Error::InvalidConfig(_))));
        assert_eq!(engine.analyze().bones, 3);
    }

    #[test]
    fn test_missing_bridge() {
        let mut engine = engine();
        assert!(engine.load_bridge(false).is_none());
        assert!(!engine.bridge_has_changed());
        assert!(matches!(engine.apply_bridge_selection(), Err(Error::NoBridgeData)));
        let base = OptimizeConfig::default();
        assert_eq!(engine.config_from_bridge(&base), base);
    }
}
