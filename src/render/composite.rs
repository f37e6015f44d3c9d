//! Premultiplied-alpha CPU compositing primitives.

use crate::render::Frame;

pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied RGBA8 pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Composite `src` over `frame` at pixel offset `(x, y)`, clipping to the
/// frame bounds. `src` is row-major premultiplied RGBA8 of `src_w * src_h`.
pub fn blit_over(frame: &mut Frame, src: &[u8], src_w: u32, src_h: u32, x: i64, y: i64) {
    debug_assert_eq!(src.len(), src_w as usize * src_h as usize * 4);

    let fw = i64::from(frame.width);
    let fh = i64::from(frame.height);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(src_w)).min(fw);
    let y1 = (y + i64::from(src_h)).min(fh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for fy in y0..y1 {
        let sy = (fy - y) as usize;
        let src_row = sy * src_w as usize * 4;
        let dst_row = fy as usize * frame.width as usize * 4;
        for fx in x0..x1 {
            let sx = (fx - x) as usize;
            let si = src_row + sx * 4;
            let di = dst_row + fx as usize * 4;

            let s = [src[si], src[si + 1], src[si + 2], src[si + 3]];
            if s[3] == 0 {
                continue;
            }
            let d = [
                frame.data[di],
                frame.data[di + 1],
                frame.data[di + 2],
                frame.data[di + 3],
            ];
            frame.data[di..di + 4].copy_from_slice(&over(d, s));
        }
    }
}

/// Fill a clipped axis-aligned rectangle with an opaque color.
pub fn fill_rect(frame: &mut Frame, x: i64, y: i64, w: u32, h: u32, rgba: PremulRgba8) {
    let fw = i64::from(frame.width);
    let fh = i64::from(frame.height);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(w)).min(fw);
    let y1 = (y + i64::from(h)).min(fh);

    for fy in y0..y1 {
        let row = fy as usize * frame.width as usize * 4;
        for fx in x0..x1 {
            let di = row + fx as usize * 4;
            frame.data[di..di + 4].copy_from_slice(&rgba);
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
