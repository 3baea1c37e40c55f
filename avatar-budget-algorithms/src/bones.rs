//! Bone usage analysis
//!
//! A bone is used when a visible mesh carries a vertex group of the same
//! name. Every ancestor of a used bone is kept as well, so the kept set is
//! closed under "parent of" and each kept chain reaches its root.

use avatar_budget_core::{Armature, MeshRef};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Options for [`classify_bones_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoneAnalysisOptions {
    /// Keep every parentless bone even when nothing below it is used
    pub preserve_roots: bool,
}

/// Partition of an armature's bones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoneClassification {
    pub keep: BTreeSet<String>,
    pub prunable: BTreeSet<String>,
}

impl BoneClassification {
    pub fn is_prunable(&self, bone: &str) -> bool {
        self.prunable.contains(bone)
    }
}

/// Classify bones with default options
pub fn classify_bones(armature: Option<&Armature>, meshes: &[MeshRef<'_>]) -> BoneClassification {
    classify_bones_with(armature, meshes, &BoneAnalysisOptions::default())
}

/// Split the bones of `armature` into those the visible `meshes` need and
/// those that can go. An absent armature yields two empty sets.
pub fn classify_bones_with(
    armature: Option<&Armature>,
    meshes: &[MeshRef<'_>],
    options: &BoneAnalysisOptions,
) -> BoneClassification {
    let Some(armature) = armature else {
        return BoneClassification::default();
    };

    let used: BTreeSet<&str> = meshes
        .iter()
        .filter(|m| m.visible)
        .flat_map(|m| m.data.vertex_groups.iter())
        .map(String::as_str)
        .filter(|name| armature.contains(name))
        .collect();

    let mut keep = BTreeSet::new();
    for &bone in &used {
        if !keep.insert(bone.to_string()) {
            continue;
        }
        for ancestor in armature.ancestors(bone) {
            // the rest of the chain was added by an earlier walk
            if !keep.insert(ancestor.to_string()) {
                break;
            }
        }
    }

    if options.preserve_roots {
        keep.extend(
            armature
                .bones()
                .iter()
                .filter(|b| b.is_root())
                .map(|b| b.name.clone()),
        );
    }

    let prunable: BTreeSet<String> = armature
        .names()
        .filter(|name| !keep.contains(*name))
        .map(str::to_string)
        .collect();

    debug!(
        "bone analysis: {} used, {} kept, {} prunable",
        used.len(),
        keep.len(),
        prunable.len()
    );

    BoneClassification { keep, prunable }
}

/// Delete the named bones from `armature`, returning how many were removed.
///
/// Names that are not present are skipped. Children of a removed bone move
/// up to its parent, so the surviving skeleton does not depend on order.
pub fn remove_bones<'a, I>(armature: &mut Armature, names: I) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    names
        .into_iter()
        .filter(|name| armature.remove_bone(name))
        .count()
}
