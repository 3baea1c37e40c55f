//! Optimize a procedurally generated avatar
//!
//! Builds a character with a humanoid rig, a few skinned meshes and
//! oversized textures, prints its metrics and budget rating, then runs the
//! full optimization pass and prints what changed.

use anyhow::Context;
use avatar_budget::prelude::*;
use clap::Parser;
use image::{Rgba, RgbaImage};
use std::f32::consts::PI;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Bring a generated avatar under a resource budget")]
struct Args {
    /// Triangle target
    #[arg(long)]
    target: Option<usize>,

    /// Longest allowed texture side in pixels
    #[arg(long)]
    max_texture_size: Option<u32>,

    /// Keep untouched polygons as n-gons instead of triangulating everything
    #[arg(long)]
    keep_polygons: bool,

    /// Use standalone headset limits
    #[arg(long)]
    quest: bool,

    /// JSON file with an optimization config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bridge document whose selection and settings should be applied first
    #[arg(long)]
    bridge: Option<PathBuf>,

    /// Rings per body segment; higher means more triangles
    #[arg(long, default_value_t = 96)]
    density: usize,
}

/// Closed-side cylinder of quads around the Y axis
fn cylinder(radius: f32, height: f32, rings: usize, segments: usize, y0: f32) -> MeshData {
    let mut positions = Vec::with_capacity((rings + 1) * segments);
    let mut uvs = Vec::with_capacity((rings + 1) * segments);
    for r in 0..=rings {
        let v = r as f32 / rings as f32;
        let bulge = 1.0 + 0.15 * (v * PI * 3.0).sin();
        for s in 0..segments {
            let u = s as f32 / segments as f32;
            let angle = u * 2.0 * PI;
            positions.push(Point3f::new(
                angle.cos() * radius * bulge,
                y0 + v * height,
                angle.sin() * radius * bulge,
            ));
            uvs.push([u, v]);
        }
    }
    let mut polygons = Vec::with_capacity(rings * segments);
    for r in 0..rings {
        for s in 0..segments {
            let a = r * segments + s;
            let b = r * segments + (s + 1) % segments;
            polygons.push(Polygon::quad(a, b, b + segments, a + segments));
        }
    }
    MeshData {
        positions,
        uvs: Some(uvs),
        polygons,
        ..MeshData::default()
    }
}

fn build_rig() -> avatar_budget::Result<Armature> {
    let mut rig = Armature::new();
    rig.add_bone("Hips", None)?;
    rig.add_bone("Spine", Some("Hips"))?;
    rig.add_bone("Chest", Some("Spine"))?;
    rig.add_bone("Neck", Some("Chest"))?;
    rig.add_bone("Head", Some("Neck"))?;
    for side in ["Left", "Right"] {
        let shoulder = format!("{side}Shoulder");
        let arm = format!("{side}UpperArm");
        let forearm = format!("{side}LowerArm");
        let hand = format!("{side}Hand");
        rig.add_bone(shoulder.as_str(), Some("Chest"))?;
        rig.add_bone(arm.as_str(), Some(shoulder.as_str()))?;
        rig.add_bone(forearm.as_str(), Some(arm.as_str()))?;
        rig.add_bone(hand.as_str(), Some(forearm.as_str()))?;
        for finger in ["Thumb", "Index", "Middle", "Ring", "Little"] {
            let mut parent = hand.clone();
            for joint in 1..=3 {
                let name = format!("{side}{finger}{joint}");
                rig.add_bone(name.as_str(), Some(parent.as_str()))?;
                parent = name;
            }
        }
        let leg = format!("{side}UpperLeg");
        let shin = format!("{side}LowerLeg");
        rig.add_bone(leg.as_str(), Some("Hips"))?;
        rig.add_bone(shin.as_str(), Some(leg.as_str()))?;
        rig.add_bone(format!("{side}Foot"), Some(shin.as_str()))?;
    }
    let mut parent = "Hips".to_string();
    for i in 1..=8 {
        let name = format!("Tail{i}");
        rig.add_bone(name.as_str(), Some(parent.as_str()))?;
        parent = name;
    }
    Ok(rig)
}

fn build_avatar(density: usize) -> anyhow::Result<Scene> {
    let mut scene = Scene::new();
    scene.add_armature("Armature", build_rig()?);

    let skin_tex = scene.add_image(ImageAsset::from_pixels(
        "Body_Albedo",
        RgbaImage::from_fn(512, 512, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 160, 255])),
    ));
    let skin_normal = scene.add_image(ImageAsset::new("Body_Normal", 4096, 4096));
    let hair_tex = scene.add_image(ImageAsset::new("Hair_Albedo", 4096, 2048));
    let cloth_tex = scene.add_image(ImageAsset::new("Outfit_Albedo", 2048, 2048));

    let skin = scene.add_material(
        Material::new("Skin")
            .with_image(skin_tex)
            .with_image(skin_normal),
    );
    let hair = scene.add_material(Material::new("Hair").with_image(hair_tex));
    let cloth = scene.add_material(Material::new("Outfit").with_image(cloth_tex));

    let body = cylinder(0.25, 1.7, density, density, 0.0)
        .with_vertex_groups([
            "Hips", "Spine", "Chest", "Neck", "Head", "LeftUpperArm", "LeftLowerArm",
            "LeftHand", "RightUpperArm", "RightLowerArm", "RightHand", "LeftUpperLeg",
            "LeftLowerLeg", "LeftFoot", "RightUpperLeg", "RightLowerLeg", "RightFoot",
        ])
        .with_material(skin);
    scene.add_mesh("Body", body);

    let hair_mesh = cylinder(0.14, 0.3, density / 2, density, 1.5)
        .with_vertex_groups(["Head"])
        .with_material(hair);
    scene.add_mesh("Hair", hair_mesh);

    let outfit = cylinder(0.28, 0.9, density / 2, density, 0.5)
        .with_vertex_groups(["Spine", "Chest", "Hips"])
        .with_material(cloth);
    scene.add_mesh("Outfit", outfit);

    let tail = cylinder(0.05, 0.8, density / 4, 12, 0.4)
        .with_vertex_groups(["Tail1", "Tail2", "Tail3", "Tail4"])
        .with_material(hair);
    let tail = scene.add_mesh("Tail", tail);
    scene
        .set_hidden(tail, true)
        .context("hiding the tail")?;

    scene.add_mesh("Hat", cylinder(0.2, 0.1, 4, 24, 1.8).with_material(cloth));
    Ok(scene)
}

fn print_report(label: &str, metrics: &ResourceMetrics, limits: &PlatformLimits) {
    let report = metrics.rate(limits);
    println!("{label}: {metrics}");
    println!(
        "  triangles {}  bones {}  materials {}  textures {}  overall {:?}",
        report.triangles.symbol(),
        report.bones.symbol(),
        report.materials.symbol(),
        report.texture_memory.symbol(),
        report.overall()
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => OptimizeConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None if args.quest => OptimizeConfig::quest(),
        None => OptimizeConfig::default(),
    };
    if let Some(target) = args.target {
        config.target_triangles = target;
    }
    if let Some(size) = args.max_texture_size {
        config.max_texture_size = size;
    }
    if args.keep_polygons {
        config.preserve_uvs = false;
    }

    let scene = build_avatar(args.density.max(4))?;
    let mut engine = match &args.bridge {
        Some(path) => Engine::with_bridge_path(scene, path),
        None => Engine::new(scene),
    };

    print_report("before", &engine.analyze(), &config.limits);

    if args.bridge.is_some() {
        config = engine.config_from_bridge(&config);
        match engine.apply_bridge_selection() {
            Ok(outcome) => println!(
                "bridge: {} kept, {} marked for removal",
                outcome.kept, outcome.marked_for_removal
            ),
            Err(err) => log::warn!("bridge selection not applied: {err}"),
        }
    }

    let summary = engine.optimize_all(&config)?;
    println!("{summary}");
    print_report("after", &summary.after, &config.limits);
    Ok(())
}
