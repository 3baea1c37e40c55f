//! Core traits for avatar-budget

use crate::{
    armature::Armature,
    mesh::MeshData,
    scene::{ImageAsset, ImageId, Material, MaterialId, ObjectId, Scene},
};

/// Borrowed view of a mesh object
#[derive(Debug, Clone, Copy)]
pub struct MeshRef<'a> {
    pub id: ObjectId,
    pub name: &'a str,
    pub visible: bool,
    pub data: &'a MeshData,
}

/// Borrowed view of an armature object
#[derive(Debug, Clone, Copy)]
pub struct ArmatureRef<'a> {
    pub id: ObjectId,
    pub name: &'a str,
    pub visible: bool,
    pub data: &'a Armature,
}

/// Read-only queries over a collection of scene assets
pub trait SceneInventory {
    /// Every mesh object, hidden ones included
    fn meshes(&self) -> Vec<MeshRef<'_>>;

    /// Every armature object, hidden ones included
    fn armatures(&self) -> Vec<ArmatureRef<'_>>;

    /// The armature that bone operations target
    fn active_armature(&self) -> Option<ArmatureRef<'_>>;

    fn material(&self, id: MaterialId) -> Option<&Material>;

    fn image(&self, id: ImageId) -> Option<&ImageAsset>;

    /// Meshes that count toward the budget
    fn visible_meshes(&self) -> Vec<MeshRef<'_>> {
        self.meshes().into_iter().filter(|m| m.visible).collect()
    }
}

impl SceneInventory for Scene {
    fn meshes(&self) -> Vec<MeshRef<'_>> {
        self.objects()
            .filter_map(|(id, obj)| {
                obj.as_mesh().map(|data| MeshRef {
                    id,
                    name: obj.name.as_str(),
                    visible: obj.is_visible(),
                    data,
                })
            })
            .collect()
    }

    fn armatures(&self) -> Vec<ArmatureRef<'_>> {
        self.objects()
            .filter_map(|(id, obj)| {
                obj.as_armature().map(|data| ArmatureRef {
                    id,
                    name: obj.name.as_str(),
                    visible: obj.is_visible(),
                    data,
                })
            })
            .collect()
    }

    fn active_armature(&self) -> Option<ArmatureRef<'_>> {
        let id = self.active_armature_id()?;
        self.armatures().into_iter().find(|a| a.id == id)
    }

    fn material(&self, id: MaterialId) -> Option<&Material> {
        Scene::material(self, id)
    }

    fn image(&self, id: ImageId) -> Option<&ImageAsset> {
        Scene::image(self, id)
    }
}
