//! Applying a keep/remove object selection to a scene
//!
//! Objects match a list by exact name or by name with its numeric
//! duplication suffix stripped. Keep wins when both lists match.

use avatar_budget_core::{matches_name_list, Error, ObjectId, Result, Scene};
use log::{debug, info};

/// Counts from applying a selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub kept: usize,
    pub marked_for_removal: usize,
}

/// Select and unhide objects in `keep`, deselect and hide objects in
/// `remove`. Everything is deselected first.
///
/// Fails with [`Error::NoBridgeData`] without touching the scene when both
/// lists are empty.
pub fn apply_selection<S: AsRef<str>>(
    scene: &mut Scene,
    keep: &[S],
    remove: &[S],
) -> Result<SelectionOutcome> {
    if keep.is_empty() && remove.is_empty() {
        return Err(Error::NoBridgeData);
    }

    scene.deselect_all();
    let mut outcome = SelectionOutcome::default();

    for id in scene.object_ids() {
        let Some(obj) = scene.object_mut(id) else {
            continue;
        };
        if matches_name_list(&obj.name, keep) {
            obj.selected = true;
            obj.hidden = false;
            outcome.kept += 1;
        } else if matches_name_list(&obj.name, remove) {
            obj.selected = false;
            obj.hidden = true;
            outcome.marked_for_removal += 1;
            debug!("marked '{}' for removal", obj.name);
        }
    }

    info!(
        "applied selection: {} to keep, {} to remove",
        outcome.kept, outcome.marked_for_removal
    );
    Ok(outcome)
}

/// Delete every object named in `remove` or currently hidden, returning the
/// number deleted
pub fn delete_marked<S: AsRef<str>>(scene: &mut Scene, remove: &[S]) -> usize {
    let doomed: Vec<ObjectId> = scene
        .objects()
        .filter(|(_, obj)| obj.hidden || matches_name_list(&obj.name, remove))
        .map(|(id, _)| id)
        .collect();

    let deleted = doomed
        .into_iter()
        .filter_map(|id| scene.remove_object(id))
        .inspect(|obj| debug!("deleted '{}'", obj.name))
        .count();

    info!("deleted {deleted} objects");
    deleted
}
