//! Scene arena
//!
//! Objects, materials and images live in generational arenas and are
//! addressed by typed ids that stay valid until the record is removed.
//! Object iteration follows insertion order.

use crate::armature::Armature;
use crate::mesh::MeshData;
use crate::naming::unique_name;
use crate::{Error, Result};
use generational_arena::{Arena, Index};
use image::RgbaImage;

/// Stable handle to a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Index);

/// Stable handle to a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(Index);

/// Stable handle to an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(Index);

/// Payload of a scene object
#[derive(Debug, Clone)]
pub enum ObjectData {
    Mesh(MeshData),
    Armature(Armature),
    Empty,
}

impl ObjectData {
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectData::Mesh(_) => "mesh",
            ObjectData::Armature(_) => "armature",
            ObjectData::Empty => "empty",
        }
    }
}

/// A named, selectable and hideable scene object
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub hidden: bool,
    pub selected: bool,
    pub data: ObjectData,
}

impl SceneObject {
    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    pub fn as_mesh(&self) -> Option<&MeshData> {
        match &self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_armature(&self) -> Option<&Armature> {
        match &self.data {
            ObjectData::Armature(armature) => Some(armature),
            _ => None,
        }
    }
}

/// A material and the images it samples
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub images: Vec<ImageId>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: ImageId) -> Self {
        self.images.push(image);
        self
    }
}

/// A texture image. Pixel data is optional; dimensions are authoritative.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Option<RgbaImage>,
}

impl ImageAsset {
    /// Image known only by its dimensions
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            pixels: None,
        }
    }

    /// Image backed by RGBA pixel data
    pub fn from_pixels(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            width: pixels.width(),
            height: pixels.height(),
            pixels: Some(pixels),
        }
    }

    /// Estimated GPU memory as uncompressed RGBA8
    pub fn memory_bytes(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }
}

/// The scene asset inventory
#[derive(Debug, Default)]
pub struct Scene {
    objects: Arena<SceneObject>,
    order: Vec<ObjectId>,
    materials: Arena<Material>,
    images: Arena<ImageAsset>,
    active_armature: Option<ObjectId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object. A name already in use gets a numeric duplication suffix.
    pub fn add_object(&mut self, name: &str, data: ObjectData) -> ObjectId {
        let name = unique_name(name, |candidate| self.find_object(candidate).is_some());
        let id = ObjectId(self.objects.insert(SceneObject {
            name,
            hidden: false,
            selected: false,
            data,
        }));
        self.order.push(id);
        id
    }

    pub fn add_mesh(&mut self, name: &str, mesh: MeshData) -> ObjectId {
        self.add_object(name, ObjectData::Mesh(mesh))
    }

    pub fn add_armature(&mut self, name: &str, armature: Armature) -> ObjectId {
        self.add_object(name, ObjectData::Armature(armature))
    }

    pub fn add_empty(&mut self, name: &str) -> ObjectId {
        self.add_object(name, ObjectData::Empty)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        MaterialId(self.materials.insert(material))
    }

    pub fn add_image(&mut self, image: ImageAsset) -> ImageId {
        ImageId(self.images.insert(image))
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn object_count(&self) -> usize {
        self.order.len()
    }

    /// Objects in insertion order
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.order
            .iter()
            .filter_map(move |&id| self.objects.get(id.0).map(|obj| (id, obj)))
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.order.clone()
    }

    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects()
            .find(|(_, obj)| obj.name == name)
            .map(|(id, _)| id)
    }

    /// Remove an object from the scene, returning it
    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        let removed = self.objects.remove(id.0)?;
        self.order.retain(|&other| other != id);
        if self.active_armature == Some(id) {
            self.active_armature = None;
        }
        Some(removed)
    }

    pub fn set_hidden(&mut self, id: ObjectId, hidden: bool) -> Result<()> {
        self.object_mut(id)
            .map(|obj| obj.hidden = hidden)
            .ok_or_else(|| Error::UnknownObject(format!("{id:?}")))
    }

    pub fn set_selected(&mut self, id: ObjectId, selected: bool) -> Result<()> {
        self.object_mut(id)
            .map(|obj| obj.selected = selected)
            .ok_or_else(|| Error::UnknownObject(format!("{id:?}")))
    }

    pub fn deselect_all(&mut self) {
        for (_, obj) in self.objects.iter_mut() {
            obj.selected = false;
        }
    }

    pub fn mesh_mut(&mut self, id: ObjectId) -> Option<&mut MeshData> {
        match self.objects.get_mut(id.0).map(|obj| &mut obj.data) {
            Some(ObjectData::Mesh(mesh)) => Some(mesh),
            _ => None,
        }
    }

    pub fn armature_mut(&mut self, id: ObjectId) -> Option<&mut Armature> {
        match self.objects.get_mut(id.0).map(|obj| &mut obj.data) {
            Some(ObjectData::Armature(armature)) => Some(armature),
            _ => None,
        }
    }

    /// Make `id` the armature that bone operations target
    pub fn set_active_armature(&mut self, id: ObjectId) -> Result<()> {
        match self.object(id) {
            Some(obj) if obj.as_armature().is_some() => {
                self.active_armature = Some(id);
                Ok(())
            }
            Some(obj) => Err(Error::InvalidData(format!(
                "'{}' is a {}, not an armature",
                obj.name,
                obj.data.kind()
            ))),
            None => Err(Error::UnknownObject(format!("{id:?}"))),
        }
    }

    /// The explicitly activated armature, else the first visible one
    pub fn active_armature_id(&self) -> Option<ObjectId> {
        self.active_armature
            .filter(|&id| self.object(id).is_some())
            .or_else(|| {
                self.objects()
                    .find(|(_, obj)| obj.is_visible() && obj.as_armature().is_some())
                    .map(|(id, _)| id)
            })
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter().map(|(idx, m)| (MaterialId(idx), m))
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageAsset> {
        self.images.get(id.0)
    }

    pub fn image_mut(&mut self, id: ImageId) -> Option<&mut ImageAsset> {
        self.images.get_mut(id.0)
    }

    pub fn images(&self) -> impl Iterator<Item = (ImageId, &ImageAsset)> {
        self.images.iter().map(|(idx, img)| (ImageId(idx), img))
    }

    pub fn image_ids(&self) -> Vec<ImageId> {
        self.images().map(|(id, _)| id).collect()
    }
}
