pub mod composite;

use crate::foundation::core::{Canvas, Rgb8};

/// One rendered frame: row-major premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, premultiplied alpha.
    pub data: Vec<u8>,
}

impl Frame {
    /// Fully transparent frame of canvas size.
    pub fn transparent(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0u8; canvas.pixel_count() * 4],
        }
    }

    /// Opaque solid-color frame of canvas size.
    pub fn solid(canvas: Canvas, color: Rgb8) -> Self {
        let px = color.to_rgba8();
        let mut data = vec![0u8; canvas.pixel_count() * 4];
        for chunk in data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_frame_is_opaque_everywhere() {
        let canvas = Canvas::new(4, 2).unwrap();
        let f = Frame::solid(canvas, Rgb8::new(10, 20, 30));
        assert_eq!(f.data.len(), 4 * 2 * 4);
        for px in f.data.chunks_exact(4) {
            assert_eq!(px, &[10, 20, 30, 255]);
        }
    }
}
