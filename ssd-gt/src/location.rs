//! Box-to-anchor location offsets.
//!
//! The offsets are laid out as `[dx, dy, dw, dh]` in ratio units:
//!
//! - `dx = (box.cx - anchor.cx) / anchor.w * 10`
//! - `dy = (box.cy - anchor.cy) / anchor.h * 10`
//! - `dw = ln(box.w / anchor.w) * 5`
//! - `dh = ln(box.h / anchor.h) * 5`
//!
//! The detection loss assumes exactly this parameterization.

use crate::common::*;

/// Multiplier of the center offsets.
pub const CENTER_SCALE: f64 = 10.0;

/// Multiplier of the log-scale size ratios.
pub const SIZE_SCALE: f64 = 5.0;

/// Encode a box relative to an anchor.
pub fn compute_location(bbox: &CyCxHW<f64>, anchor: &CyCxHW<f64>) -> Result<[f64; 4]> {
    ensure!(
        bbox.h() > 0.0 && bbox.w() > 0.0,
        "box {:?} must have positive height and width",
        bbox.cycxhw()
    );
    ensure!(
        anchor.h() > 0.0 && anchor.w() > 0.0,
        "anchor {:?} must have positive height and width",
        anchor.cycxhw()
    );

    let dx = (bbox.cx() - anchor.cx()) / anchor.w() * CENTER_SCALE;
    let dy = (bbox.cy() - anchor.cy()) / anchor.h() * CENTER_SCALE;
    let dw = (bbox.w() / anchor.w()).ln() * SIZE_SCALE;
    let dh = (bbox.h() / anchor.h()).ln() * SIZE_SCALE;

    Ok([dx, dy, dw, dh])
}

/// Recover the box that [compute_location] encoded against `anchor`.
pub fn decode_location(location: [f64; 4], anchor: &CyCxHW<f64>) -> Result<CyCxHW<f64>> {
    let [dx, dy, dw, dh] = location;
    let cx = dx / CENTER_SCALE * anchor.w() + anchor.cx();
    let cy = dy / CENTER_SCALE * anchor.h() + anchor.cy();
    let w = (dw / SIZE_SCALE).exp() * anchor.w();
    let h = (dh / SIZE_SCALE).exp() * anchor.h();
    CyCxHW::try_from_cycxhw([cy, cx, h, w])
}
