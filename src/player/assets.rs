use std::path::Path;

use crate::audio::{AudioClip, AudioLoader};
use crate::error::AssetError;
use crate::render::SourceImage;

/// Resolves a scene's asset handles into decoded media.
///
/// Both methods block; the player calls them on blocking tasks, image and
/// audio concurrently.
pub trait AssetLoader: Send + Sync + 'static {
    fn load_image(&self, path: &Path) -> Result<SourceImage, AssetError>;

    fn load_audio(&self, path: &Path) -> Result<AudioClip, AssetError>;
}

/// Decodes assets from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAssetLoader;

impl AssetLoader for FsAssetLoader {
    fn load_image(&self, path: &Path) -> Result<SourceImage, AssetError> {
        SourceImage::load(path)
    }

    fn load_audio(&self, path: &Path) -> Result<AudioClip, AssetError> {
        AudioLoader::load(path)
    }
}
