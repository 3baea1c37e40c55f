//! Integration tests for avatar-budget-engine
//!
//! These tests drive the engine the way a host does: build a scene, run
//! operations through [`Engine`] and check the reported and actual state.

use approx::assert_relative_eq;
use avatar_budget_algorithms::{classify_bones, plan_resize, BudgetRating};
use avatar_budget_core::{
    Armature, Error, ImageAsset, Material, MeshData, Point3f, Polygon, Scene, SceneInventory,
};
use avatar_budget_engine::*;
use avatar_budget_io::ExchangeDocument;
use avatar_budget_simplification::plan_ratio;
use image::{Rgba, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

/// Wavy quad grid, `cols` x `rows` faces
fn grid(cols: usize, rows: usize, groups: &[&str]) -> MeshData {
    let mut positions = Vec::new();
    for y in 0..=rows {
        for x in 0..=cols {
            let z = (x as f32 * 0.7).sin() * (y as f32 * 0.9).cos() * 0.3;
            positions.push(Point3f::new(x as f32, y as f32, z));
        }
    }
    let stride = cols + 1;
    let mut polygons = Vec::with_capacity(cols * rows);
    for y in 0..rows {
        for x in 0..cols {
            let tl = y * stride + x;
            polygons.push(Polygon::quad(tl, tl + stride, tl + stride + 1, tl + 1));
        }
    }
    MeshData::new(positions, polygons)
        .unwrap()
        .with_vertex_groups(groups.iter().copied())
}

/// A small character: body and hair skinned to a humanoid rig, a hidden
/// prop, and two textures behind two materials
fn avatar() -> Scene {
    let mut scene = Scene::new();
    let rig = Armature::new()
        .with_bone("Hips", None)
        .and_then(|a| a.with_bone("Spine", Some("Hips")))
        .and_then(|a| a.with_bone("Chest", Some("Spine")))
        .and_then(|a| a.with_bone("Head", Some("Chest")))
        .and_then(|a| a.with_bone("HairRoot", Some("Head")))
        .and_then(|a| a.with_bone("LeftArm", Some("Chest")))
        .and_then(|a| a.with_bone("RightArm", Some("Chest")))
        .and_then(|a| a.with_bone("TailBase", Some("Hips")))
        .and_then(|a| a.with_bone("TailTip", Some("TailBase")))
        .unwrap();
    scene.add_armature("Armature", rig);

    let body_tex = scene.add_image(ImageAsset::from_pixels(
        "Body_Albedo",
        RgbaImage::from_pixel(256, 128, Rgba([180, 140, 120, 255])),
    ));
    let hair_tex = scene.add_image(ImageAsset::new("Hair_Albedo", 4096, 2048));
    let skin = scene.add_material(Material::new("Skin").with_image(body_tex));
    let hair = scene.add_material(Material::new("Hair").with_image(hair_tex));

    scene.add_mesh("Body", grid(30, 10, &["Spine", "LeftArm", "RightArm"]).with_material(skin));
    scene.add_mesh("Hair", grid(20, 10, &["HairRoot"]).with_material(hair));
    let prop = scene.add_mesh("Prop", grid(10, 5, &["TailTip"]).with_material(skin));
    scene.set_hidden(prop, true).unwrap();
    scene
}

fn bridge_engine(dir: &TempDir) -> Engine {
    Engine::with_bridge_path(avatar(), dir.path().join("bridge.json"))
}

fn write_bridge(path: &Path, keep: &[&str], remove: &[&str]) {
    ExchangeDocument {
        avatar_name: "Test Avatar".to_string(),
        timestamp: "2024-01-01T00:00:00".to_string(),
        keep_objects: keep.iter().map(|s| s.to_string()).collect(),
        remove_objects: remove.iter().map(|s| s.to_string()).collect(),
        ..ExchangeDocument::default()
    }
    .write_to(path)
    .unwrap();
}

#[test]
fn test_analyze_counts_visible_assets() {
    let engine = Engine::with_bridge_path(avatar(), "unused.json");
    let metrics = engine.analyze();

    assert_eq!(metrics.meshes, 2);
    assert_eq!(metrics.triangles, 1000);
    assert_eq!(metrics.bones, 9);
    assert_eq!(metrics.materials, 2);
    assert_eq!(metrics.texture_memory_bytes, (256 * 128 + 4096 * 2048) * 4);

    let report = metrics.rate(&OptimizeConfig::default().limits);
    assert_eq!(report.triangles, BudgetRating::Good);
}

#[test]
fn test_used_chain_is_kept() {
    let mut scene = Scene::new();
    let rig = Armature::new()
        .with_bone("Root", None)
        .and_then(|a| a.with_bone("Spine", Some("Root")))
        .and_then(|a| a.with_bone("Arm", Some("Spine")))
        .unwrap();
    scene.add_armature("Armature", rig);
    scene.add_mesh("Sleeve", grid(2, 2, &["Arm"]));

    let armature = scene.active_armature().map(|a| a.data);
    let result = classify_bones(armature, &scene.meshes());
    assert_eq!(result.keep.len(), 3);
    assert!(result.prunable.is_empty());
}

#[test]
fn test_remove_unused_bones_keeps_ancestors() {
    let mut engine = Engine::with_bridge_path(avatar(), "unused.json");
    // the hidden prop's TailTip does not count
    assert_eq!(engine.remove_unused_bones().unwrap(), 2);

    let rig = engine.scene().active_armature().unwrap();
    for bone in ["Hips", "Spine", "Chest", "Head", "HairRoot", "LeftArm", "RightArm"] {
        assert!(rig.data.contains(bone), "{bone} was removed");
    }
    assert!(!rig.data.contains("TailBase"));
}

#[test]
fn test_decimation_ratio_and_bound() {
    assert_relative_eq!(plan_ratio(100_000, 70_000, 0.01), 0.7, epsilon = 1e-6);

    let mut engine = Engine::with_bridge_path(avatar(), "unused.json");
    let outcome = engine.decimate(700, true).unwrap();
    match outcome {
        DecimationOutcome::Decimated {
            before,
            after,
            ratio,
            meshes,
        } => {
            assert_eq!(before, 1000);
            assert!(after <= before);
            assert!(after < before);
            assert_relative_eq!(ratio, 0.7, epsilon = 1e-6);
            assert_eq!(meshes, 2);
        }
        other => panic!("expected decimation, got {other:?}"),
    }

    let prop = engine.scene().find_object("Prop").unwrap();
    let prop_mesh = engine.scene().object(prop).and_then(|o| o.as_mesh()).unwrap();
    assert_eq!(prop_mesh.triangle_count(), 100);
}

#[test]
fn test_decimation_skipped_within_budget() {
    let mut engine = Engine::with_bridge_path(avatar(), "unused.json");
    let outcome = engine.decimate(1000, false).unwrap();
    assert_eq!(outcome, DecimationOutcome::AlreadyWithinBudget { triangles: 1000 });
    assert_eq!(engine.analyze().triangles, 1000);
}

#[test]
fn test_texture_resize_preserves_aspect_and_is_idempotent() {
    assert_eq!(plan_resize(4096, 2048, 2048), Some((2048, 1024)));

    let mut engine = Engine::with_bridge_path(avatar(), "unused.json");
    assert_eq!(engine.resize_textures(128).unwrap(), 2);
    assert_eq!(engine.resize_textures(128).unwrap(), 0);

    let scene = engine.scene();
    let sizes: Vec<(u32, u32)> = scene.images().map(|(_, img)| (img.width, img.height)).collect();
    assert_eq!(sizes, vec![(128, 64), (128, 64)]);

    let (_, body) = scene.images().next().unwrap();
    assert_eq!(body.pixels.as_ref().map(|p| p.dimensions()), Some((128, 64)));
}

#[test]
fn test_optimize_all() {
    let mut engine = Engine::with_bridge_path(avatar(), "unused.json");
    let config = OptimizeConfig {
        target_triangles: 500,
        max_texture_size: 1024,
        ..OptimizeConfig::default()
    };
    let summary = engine.optimize_all(&config).unwrap();

    assert!(summary.ran(Step::RemoveUnusedBones));
    assert!(summary.ran(Step::Decimate));
    assert!(summary.ran(Step::ResizeTextures));
    assert_eq!(summary.bones_removed, 2);
    assert_eq!(summary.textures_resized, 1);
    assert_eq!(summary.before.triangles, 1000);
    assert!(summary.after.triangles < 1000);
    assert_eq!(summary.after.bones, 7);
    assert!(summary.after.texture_memory_bytes < summary.before.texture_memory_bytes);
}

#[test]
fn test_bridge_absent() {
    let dir = TempDir::new().unwrap();
    let mut engine = bridge_engine(&dir);
    let hidden_before: Vec<bool> = engine.scene().objects().map(|(_, o)| o.hidden).collect();

    assert!(engine.load_bridge(false).is_none());
    let result = engine.apply_bridge_selection();
    assert!(matches!(result, Err(Error::NoBridgeData)));
    assert_eq!(result.unwrap_err().to_string(), "No bridge data loaded");

    let hidden_after: Vec<bool> = engine.scene().objects().map(|(_, o)| o.hidden).collect();
    assert_eq!(hidden_before, hidden_after);
}

#[test]
fn test_bridge_with_empty_lists() {
    let dir = TempDir::new().unwrap();
    let mut engine = bridge_engine(&dir);
    write_bridge(engine.bridge_path(), &[], &[]);

    assert!(engine.load_bridge(false).is_some());
    assert!(matches!(engine.apply_bridge_selection(), Err(Error::NoBridgeData)));
}

#[test]
fn test_bridge_selection_and_delete() {
    let dir = TempDir::new().unwrap();
    let mut engine = bridge_engine(&dir);
    engine.scene_mut().add_empty("Hair");
    write_bridge(engine.bridge_path(), &["Body", "Prop"], &["Hair"]);

    let doc = engine.load_bridge(false).unwrap();
    assert_eq!(doc.avatar_label(), "Test Avatar");

    let outcome = engine.apply_bridge_selection().unwrap();
    // "Hair" and its duplicate "Hair.001" both match
    assert_eq!(outcome, SelectionOutcome { kept: 2, marked_for_removal: 2 });

    let scene = engine.scene();
    let prop = scene.find_object("Prop").and_then(|id| scene.object(id)).unwrap();
    assert!(prop.selected && !prop.hidden);

    assert_eq!(engine.delete_marked(), 2);
    let names: Vec<&str> = engine.scene().objects().map(|(_, o)| o.name.as_str()).collect();
    assert_eq!(names, vec!["Armature", "Body", "Prop"]);
}

#[test]
fn test_bridge_settings_override_config() {
    let dir = TempDir::new().unwrap();
    let mut engine = bridge_engine(&dir);
    let path = engine.bridge_path().to_path_buf();

    let mut doc = ExchangeDocument {
        keep_objects: vec!["Body".to_string()],
        ..ExchangeDocument::default()
    };
    doc.settings.insert("targetTriangles".to_string(), 400.into());
    doc.settings.insert("resizeTextures".to_string(), false.into());
    doc.write_to(&path).unwrap();

    let config = engine.config_from_bridge(&OptimizeConfig::default());
    assert_eq!(config.target_triangles, 400);
    assert!(!config.resize_textures);

    let summary = engine.optimize_all(&config).unwrap();
    assert!(!summary.ran(Step::ResizeTextures));
}

#[test]
fn test_decimate_selected_after_bridge_selection() {
    let dir = TempDir::new().unwrap();
    let mut engine = bridge_engine(&dir);
    write_bridge(engine.bridge_path(), &["Body"], &[]);
    engine.apply_bridge_selection().unwrap();

    let outcome = engine.decimate_selected(0.5, true).unwrap();
    match outcome {
        DecimationOutcome::Decimated { before, after, meshes, .. } => {
            assert_eq!(meshes, 1);
            assert_eq!(before, 600);
            assert!(after < 600);
        }
        other => panic!("expected decimation, got {other:?}"),
    }

    let scene = engine.scene();
    let hair = scene.find_object("Hair").and_then(|id| scene.object(id)).unwrap();
    assert!(hair.is_visible() && !hair.selected);
    assert_eq!(hair.as_mesh().unwrap().triangle_count(), 400);
}
