use crate::error::MockweaveResult;

pub type PremulRgba8 = [u8; 4];

/// How source pixels combine with pixels already in a surface.
///
/// All math operates on premultiplied RGBA8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    /// Source-over. The default drawing mode.
    Replace,
    /// Per-channel multiplication; darkens the destination where the source sits.
    Multiply,
    /// Inverse multiply; brightens the destination.
    Screen,
    /// Destination-in: keep the destination only where the source is opaque.
    MaskIn,
}

pub fn blend_px(mode: BlendMode, dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    match mode {
        BlendMode::Replace => source_over(dst, src),
        BlendMode::Multiply => multiply(dst, src),
        BlendMode::Screen => screen(dst, src),
        BlendMode::MaskIn => mask_in(dst, src),
    }
}

pub fn source_over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Premultiplied separable multiply blend:
/// `co = cs*cb + cs*(1-ab) + cb*(1-as)`, `ao = as + ab*(1-as)`.
///
/// A fully transparent source leaves the destination bit-exact, which is what
/// keeps masked-out regions identical to the background-only composite.
pub fn multiply(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = u16::from(src[3]);
    let da = u16::from(dst[3]);
    let inv_sa = 255u16 - sa;
    let inv_da = 255u16 - da;

    let mut out = [0u8; 4];
    for i in 0..3 {
        let sc = u16::from(src[i]);
        let dc = u16::from(dst[i]);
        let v = mul_div255(sc, dc) as u16 + mul_div255(sc, inv_da) as u16;
        out[i] = add_sat_u8(v.min(255) as u8, mul_div255(dc, inv_sa));
    }
    out[3] = add_sat_u8(src[3], mul_div255(da, inv_sa));
    out
}

/// Premultiplied screen blend: `co = cs + cb - cs*cb`, `ao = as + ab*(1-as)`.
pub fn screen(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = u16::from(src[3]);
    let da = u16::from(dst[3]);
    let inv_sa = 255u16 - sa;

    let mut out = [0u8; 4];
    for i in 0..3 {
        let sc = u16::from(src[i]);
        let dc = u16::from(dst[i]);
        let v = (sc + dc).saturating_sub(u16::from(mul_div255(sc, dc)));
        out[i] = v.min(255) as u8;
    }
    out[3] = add_sat_u8(src[3], mul_div255(da, inv_sa));
    out
}

/// Destination-in: every destination channel (alpha included) is scaled by the
/// source alpha. With premultiplied pixels this is the whole operation.
pub fn mask_in(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = u16::from(src[3]);
    if sa == 255 {
        return dst;
    }

    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = mul_div255(u16::from(dst[i]), sa);
    }
    out
}

pub fn blend_in_place(mode: BlendMode, dst: &mut [u8], src: &[u8]) -> MockweaveResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(crate::MockweaveError::validation(
            "blend_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = blend_px(mode, [d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAY: PremulRgba8 = [128, 128, 128, 255];
    const RED: PremulRgba8 = [255, 0, 0, 255];
    const CLEAR: PremulRgba8 = [0, 0, 0, 0];

    #[test]
    fn source_over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        assert_eq!(source_over(dst, CLEAR), dst);
    }

    #[test]
    fn source_over_opaque_replaces_dst() {
        assert_eq!(source_over(GRAY, RED), RED);
    }

    #[test]
    fn source_over_dst_transparent_returns_src() {
        let src = [100, 110, 120, 200];
        assert_eq!(source_over(CLEAR, src), src);
    }

    #[test]
    fn multiply_opaque_gray_by_red_darkens() {
        assert_eq!(multiply(GRAY, RED), [128, 0, 0, 255]);
    }

    #[test]
    fn multiply_transparent_src_is_exact_noop() {
        assert_eq!(multiply(GRAY, CLEAR), GRAY);
        let semi = [60, 10, 90, 120];
        assert_eq!(multiply(semi, CLEAR), semi);
    }

    #[test]
    fn multiply_by_white_is_noop_on_opaque_dst() {
        assert_eq!(multiply(GRAY, [255, 255, 255, 255]), GRAY);
    }

    #[test]
    fn screen_transparent_src_is_exact_noop() {
        assert_eq!(screen(GRAY, CLEAR), GRAY);
    }

    #[test]
    fn screen_by_white_saturates() {
        assert_eq!(screen(GRAY, [255, 255, 255, 255]), [255, 255, 255, 255]);
    }

    #[test]
    fn screen_by_black_is_noop_on_opaque_dst() {
        assert_eq!(screen(GRAY, [0, 0, 0, 255]), GRAY);
    }

    #[test]
    fn mask_in_opaque_keeps_dst() {
        assert_eq!(mask_in(RED, [0, 0, 0, 255]), RED);
    }

    #[test]
    fn mask_in_transparent_clears_dst() {
        assert_eq!(mask_in(RED, CLEAR), CLEAR);
    }

    #[test]
    fn mask_in_half_alpha_scales_all_channels() {
        let out = mask_in([200, 100, 50, 255], [0, 0, 0, 128]);
        assert_eq!(out, [100, 50, 25, 128]);
    }

    #[test]
    fn blend_in_place_rejects_mismatched_buffers() {
        let mut dst = vec![0u8; 8];
        let src = vec![0u8; 4];
        assert!(blend_in_place(BlendMode::Replace, &mut dst, &src).is_err());
    }

    #[test]
    fn blend_in_place_applies_per_pixel() {
        let mut dst = vec![128, 128, 128, 255, 128, 128, 128, 255];
        let src = vec![255, 0, 0, 255, 0, 0, 0, 0];
        blend_in_place(BlendMode::Multiply, &mut dst, &src).unwrap();
        assert_eq!(&dst[0..4], &[128, 0, 0, 255]);
        assert_eq!(&dst[4..8], &[128, 128, 128, 255]);
    }
}
