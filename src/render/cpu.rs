use tracing::debug;

use crate::pipeline::frame::Dimensions;
use crate::render::error::{RenderError, Result};
use crate::render::renderer::FrameTarget;

/// Frame target without a GPU: the texture is a byte buffer and drawing
/// copies it to a front buffer. Used when no adapter is wanted.
#[derive(Debug, Default)]
pub struct CpuTarget {
    texture: Option<Vec<u8>>,
    front: Vec<u8>,
    draws: u64,
}

impl CpuTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the last draw showed.
    pub fn front(&self) -> &[u8] {
        &self.front
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn is_allocated(&self) -> bool {
        self.texture.is_some()
    }
}

impl FrameTarget for CpuTarget {
    fn prepare(&mut self, extent: Dimensions) -> Result<()> {
        self.texture = Some(vec![0; extent.rgba_len()]);
        debug!(%extent, "cpu texture allocated");
        Ok(())
    }

    fn upload(&mut self, rgba: &[u8], _extent: Dimensions) -> Result<()> {
        let texture = self.texture.as_mut().ok_or(RenderError::NotReady)?;
        if texture.len() != rgba.len() {
            return Err(RenderError::Surface(format!(
                "upload of {} bytes into a {} byte texture",
                rgba.len(),
                texture.len()
            )));
        }
        texture.copy_from_slice(rgba);
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let texture = self.texture.as_ref().ok_or(RenderError::NotReady)?;
        self.front.clear();
        self.front.extend_from_slice(texture);
        self.draws += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.texture = None;
    }
}
