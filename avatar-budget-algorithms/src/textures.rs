//! Texture rescaling to a maximum dimension

use avatar_budget_core::{ImageAsset, Scene};
use image::imageops::{self, FilterType};
use log::{debug, info, warn};

/// Target dimensions for an image that exceeds `max_dimension`.
///
/// `None` when both sides already fit. Otherwise the larger side becomes
/// `max_dimension` and the smaller side is scaled by the same factor,
/// rounded down and never below 1.
pub fn plan_resize(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }
    let max = max_dimension.max(1);
    let scale = |side: u32, larger: u32| -> u32 {
        let scaled = side as u64 * max as u64 / larger as u64;
        (scaled as u32).max(1)
    };
    if width >= height {
        Some((max, scale(height, width)))
    } else {
        Some((scale(width, height), max))
    }
}

/// Resize `image` in place, resampling its pixels when it has any
pub fn resize_image(image: &mut ImageAsset, width: u32, height: u32) {
    if let Some(pixels) = image.pixels.as_mut() {
        *pixels = imageops::resize(&*pixels, width, height, FilterType::Lanczos3);
    }
    image.width = width;
    image.height = height;
}

/// Shrink every image larger than `max_dimension`, returning how many
/// were resized. Images with a zero dimension are skipped.
pub fn resize_textures(scene: &mut Scene, max_dimension: u32) -> usize {
    let mut resized = 0;
    for id in scene.image_ids() {
        let Some(image) = scene.image_mut(id) else {
            continue;
        };
        if image.width == 0 || image.height == 0 {
            warn!("skipping image '{}' with no pixels", image.name);
            continue;
        }
        let Some((width, height)) = plan_resize(image.width, image.height, max_dimension) else {
            continue;
        };
        debug!(
            "resizing '{}' from {}x{} to {}x{}",
            image.name, image.width, image.height, width, height
        );
        resize_image(image, width, height);
        resized += 1;
    }
    info!("resized {resized} textures to at most {max_dimension}px");
    resized
}
