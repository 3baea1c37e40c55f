//! Skeleton data structures
//!
//! Bones are addressed by name. A bone's parent must already exist when the
//! bone is added, which keeps the parent relation a forest.

use crate::{Error, Result};
use std::collections::HashMap;

/// A node of a skeleton
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<String>,
}

impl Bone {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// An ordered collection of bones forming one or more trees
#[derive(Debug, Clone, Default)]
pub struct Armature {
    bones: Vec<Bone>,
    index: HashMap<String, usize>,
}

impl Armature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone under `parent`, which must already be part of the armature
    pub fn add_bone(&mut self, name: impl Into<String>, parent: Option<&str>) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::InvalidData(format!("duplicate bone name '{name}'")));
        }
        if let Some(parent) = parent {
            if !self.index.contains_key(parent) {
                return Err(Error::InvalidData(format!(
                    "bone '{name}' references unknown parent '{parent}'"
                )));
            }
        }
        self.index.insert(name.clone(), self.bones.len());
        self.bones.push(Bone {
            name,
            parent: parent.map(str::to_string),
        });
        Ok(())
    }

    /// Builder form of [`Armature::add_bone`]
    pub fn with_bone(mut self, name: impl Into<String>, parent: Option<&str>) -> Result<Self> {
        self.add_bone(name, parent)?;
        Ok(self)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.index.get(name).map(|&i| &self.bones[i])
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.bone(name).and_then(|b| b.parent.as_deref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|b| b.name.as_str())
    }

    /// Direct children of `name`
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Bone> + 'a {
        self.bones
            .iter()
            .filter(move |b| b.parent.as_deref() == Some(name))
    }

    /// Parent chain of `name`, nearest first, not including `name` itself
    pub fn ancestors<'a>(&'a self, name: &str) -> Ancestors<'a> {
        Ancestors {
            armature: self,
            current: self.parent_of(name),
        }
    }

    /// Remove a bone, re-parenting its children to its own parent.
    ///
    /// Returns `false` if no bone of that name exists.
    pub fn remove_bone(&mut self, name: &str) -> bool {
        let Some(idx) = self.index.get(name).copied() else {
            return false;
        };
        let removed = self.bones.remove(idx);
        for bone in &mut self.bones {
            if bone.parent.as_deref() == Some(name) {
                bone.parent = removed.parent.clone();
            }
        }
        self.rebuild_index();
        true
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
    }
}

/// Iterator over the ancestors of a bone
pub struct Ancestors<'a> {
    armature: &'a Armature,
    current: Option<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.current?;
        self.current = self.armature.parent_of(name);
        Some(name)
    }
}
