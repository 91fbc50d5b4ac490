//! Shading inputs derived from a finished drill map.
//!
//! The GPU pipeline that consumes these planes is external; this type only
//! flattens the per-pixel records into the layout it expects.

use super::{DrillMap, DrillResult};

/// Debug overlay colors, 0xAARRGGBB.
const OVERLAY_GLITCH: u32 = 0xffff0000;
const OVERLAY_AREA: u32 = 0xff00ff00;
const OVERLAY_PERIODIC: u32 = 0xff0000ff;
const OVERLAY_ATTRACTED: u32 = 0xffff00ff;
const OVERLAY_UNPROCESSED: u32 = 0xff000000;

pub struct ColorMap {
    pub width: usize,
    pub height: usize,

    /// Last executed iteration per pixel.
    pub iterations: Vec<u32>,
    /// Escape-time lognorm per pixel.
    pub lognorms: Vec<f32>,
    /// Smooth (fractional) iteration count for banding-free gradients;
    /// zero for pixels that did not escape.
    pub nitcnts: Vec<f32>,
    /// Result-category overlay, fully transparent when overlays are off or
    /// the pixel escaped normally.
    pub overlays: Vec<u32>,
    /// Normal-vector planes for relief shading.
    pub normal_re: Vec<f32>,
    pub normal_im: Vec<f32>,
}

impl ColorMap {
    pub fn compute(map: &DrillMap, overlays_enabled: bool) -> Self {
        let size = map.width * map.height;
        let mut result = Self {
            width: map.width,
            height: map.height,
            iterations: Vec::with_capacity(size),
            lognorms: Vec::with_capacity(size),
            nitcnts: Vec::with_capacity(size),
            overlays: Vec::with_capacity(size),
            normal_re: Vec::with_capacity(size),
            normal_im: Vec::with_capacity(size),
        };

        for y in 0..map.height {
            for x in 0..map.width {
                let entry = map.get(x, y);

                result.iterations.push(entry.last.max(0) as u32);
                result.lognorms.push(entry.lognorm);
                result.normal_re.push(entry.normal.re as f32);
                result.normal_im.push(entry.normal.im as f32);

                // Smooth count: n + 1 − log₂(ln|zₙ|), with lognorm = ln‖zₙ‖².
                let nitcnt = if entry.result == DrillResult::Escaped && entry.lognorm > 0.0 {
                    entry.last as f32 + 1.0 - (entry.lognorm / 2.0).log2()
                } else {
                    0.0
                };
                result.nitcnts.push(nitcnt);

                let overlay = if !overlays_enabled {
                    0
                } else {
                    match entry.result {
                        DrillResult::Escaped | DrillResult::MaxDepthReached => 0,
                        DrillResult::Glitch => OVERLAY_GLITCH,
                        DrillResult::InBulb | DrillResult::InCardioid => OVERLAY_AREA,
                        DrillResult::Periodic => OVERLAY_PERIODIC,
                        DrillResult::Attracted => OVERLAY_ATTRACTED,
                        DrillResult::Unprocessed => OVERLAY_UNPROCESSED,
                    }
                };
                result.overlays.push(overlay);
            }
        }

        result
    }

    /// Normal planes averaged over `factor × factor` blocks, for shading at
    /// a reduced resolution. The tail rows/columns of maps whose size is
    /// not a multiple of `factor` average over the pixels that exist.
    pub fn downsampled_normals(&self, factor: usize) -> (usize, usize, Vec<f32>, Vec<f32>) {
        assert!(factor >= 1);

        let out_w = self.width.div_ceil(factor);
        let out_h = self.height.div_ceil(factor);
        let mut re = Vec::with_capacity(out_w * out_h);
        let mut im = Vec::with_capacity(out_w * out_h);

        for by in 0..out_h {
            for bx in 0..out_w {
                let mut sum_re = 0.0f32;
                let mut sum_im = 0.0f32;
                let mut count = 0u32;

                for y in by * factor..((by + 1) * factor).min(self.height) {
                    for x in bx * factor..((bx + 1) * factor).min(self.width) {
                        sum_re += self.normal_re[y * self.width + x];
                        sum_im += self.normal_im[y * self.width + x];
                        count += 1;
                    }
                }

                re.push(sum_re / count as f32);
                im.push(sum_im / count as f32);
            }
        }

        (out_w, out_h, re, im)
    }
}
