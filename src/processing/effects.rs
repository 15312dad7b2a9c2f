//! Per-frame photo effects, applied on the CPU after the photo has been
//! fitted to its frame.

use image::{Rgba, RgbaImage, imageops};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    Grayscale,
    Sepia,
    Negative,
    Posterize,
    Pixelate,
    Scanlines,
    Halftone,
    Mirror,
    Vignette,
    Warhol,
}

impl EffectKind {
    pub const ALL: [EffectKind; 10] = [
        EffectKind::Grayscale,
        EffectKind::Sepia,
        EffectKind::Negative,
        EffectKind::Posterize,
        EffectKind::Pixelate,
        EffectKind::Scanlines,
        EffectKind::Halftone,
        EffectKind::Mirror,
        EffectKind::Vignette,
        EffectKind::Warhol,
    ];
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EffectKind::Grayscale => "grayscale",
            EffectKind::Sepia => "sepia",
            EffectKind::Negative => "negative",
            EffectKind::Posterize => "posterize",
            EffectKind::Pixelate => "pixelate",
            EffectKind::Scanlines => "scanlines",
            EffectKind::Halftone => "halftone",
            EffectKind::Mirror => "mirror",
            EffectKind::Vignette => "vignette",
            EffectKind::Warhol => "warhol",
        };
        f.write_str(name)
    }
}

/// Which effect, if any, a frame flagged for effects receives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EffectPolicy {
    #[default]
    Disabled,
    /// Any effect, uniformly.
    Random,
    /// One of the listed effects, uniformly.
    Restricted(Vec<EffectKind>),
}

impl EffectPolicy {
    pub fn from_config(enabled: bool, selected: &[EffectKind]) -> Self {
        match (enabled, selected) {
            (false, _) => EffectPolicy::Disabled,
            (true, []) => EffectPolicy::Random,
            (true, kinds) => EffectPolicy::Restricted(kinds.to_vec()),
        }
    }

    /// The effect for the next frame flagged for effects.
    pub fn pick(&self, rng: &mut impl Rng) -> Option<EffectKind> {
        match self {
            EffectPolicy::Disabled => None,
            EffectPolicy::Random => EffectKind::ALL.choose(rng).copied(),
            EffectPolicy::Restricted(kinds) => kinds.choose(rng).copied(),
        }
    }
}

pub fn apply_effect(image: &mut RgbaImage, effect: EffectKind) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }
    match effect {
        EffectKind::Grayscale => map_rgb(image, |[r, g, b]| {
            let l = luma([r, g, b]);
            [l, l, l]
        }),
        EffectKind::Sepia => map_rgb(image, sepia),
        EffectKind::Negative => map_rgb(image, |c| c.map(|v| 255 - v)),
        EffectKind::Posterize => map_rgb(image, |c| c.map(|v| (v / 64) * 85)),
        EffectKind::Pixelate => pixelate(image),
        EffectKind::Scanlines => scanlines(image),
        EffectKind::Halftone => halftone(image),
        EffectKind::Mirror => mirror(image),
        EffectKind::Vignette => vignette(image),
        EffectKind::Warhol => warhol(image),
    }
}

fn map_rgb(image: &mut RgbaImage, f: impl Fn([u8; 3]) -> [u8; 3]) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let [r, g, b] = f([r, g, b]);
        pixel.0 = [r, g, b, a];
    }
}

fn luma([r, g, b]: [u8; 3]) -> u8 {
    let l = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    l.round().clamp(0.0, 255.0) as u8
}

fn sepia([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    [
        r * 0.393 + g * 0.769 + b * 0.189,
        r * 0.349 + g * 0.686 + b * 0.168,
        r * 0.272 + g * 0.534 + b * 0.131,
    ]
    .map(|v| v.round().clamp(0.0, 255.0) as u8)
}

fn cell_size(image: &RgbaImage, divisions: u32, min: u32) -> u32 {
    (image.width().min(image.height()) / divisions).max(min)
}

fn pixelate(image: &mut RgbaImage) {
    let block = cell_size(image, 32, 2);
    let (width, height) = image.dimensions();
    for by in (0..height).step_by(block as usize) {
        for bx in (0..width).step_by(block as usize) {
            let (bw, bh) = (block.min(width - bx), block.min(height - by));
            let mut sum = [0u64; 4];
            for y in by..by + bh {
                for x in bx..bx + bw {
                    for (acc, v) in sum.iter_mut().zip(image.get_pixel(x, y).0) {
                        *acc += u64::from(v);
                    }
                }
            }
            let n = u64::from(bw * bh);
            let mean = Rgba(sum.map(|s| (s / n) as u8));
            for y in by..by + bh {
                for x in bx..bx + bw {
                    image.put_pixel(x, y, mean);
                }
            }
        }
    }
}

fn scanlines(image: &mut RgbaImage) {
    let line = cell_size(image, 120, 1);
    for (_, y, pixel) in image.enumerate_pixels_mut() {
        if (y / line) % 2 == 1 {
            for channel in &mut pixel.0[..3] {
                *channel = (f32::from(*channel) * 0.55) as u8;
            }
        }
    }
}

// Ink dots on white paper, sized by the darkness of each cell.
fn halftone(image: &mut RgbaImage) {
    let cell = cell_size(image, 48, 4);
    let (width, height) = image.dimensions();
    let half = cell as f32 / 2.0;
    for cy in (0..height).step_by(cell as usize) {
        for cx in (0..width).step_by(cell as usize) {
            let (cw, ch) = (cell.min(width - cx), cell.min(height - cy));
            let mut sum = 0u64;
            for y in cy..cy + ch {
                for x in cx..cx + cw {
                    let [r, g, b, _] = image.get_pixel(x, y).0;
                    sum += u64::from(luma([r, g, b]));
                }
            }
            let mean = sum as f32 / (cw * ch) as f32;
            let radius = (1.0 - mean / 255.0) * half * std::f32::consts::SQRT_2;
            for y in cy..cy + ch {
                for x in cx..cx + cw {
                    let dx = (x - cx) as f32 + 0.5 - half;
                    let dy = (y - cy) as f32 + 0.5 - half;
                    let ink = dx * dx + dy * dy <= radius * radius;
                    let v = if ink { 0 } else { 255 };
                    let alpha = image.get_pixel(x, y).0[3];
                    image.put_pixel(x, y, Rgba([v, v, v, alpha]));
                }
            }
        }
    }
}

// Left half reflected onto the right half.
fn mirror(image: &mut RgbaImage) {
    let (width, height) = image.dimensions();
    for y in 0..height {
        for x in width.div_ceil(2)..width {
            let source = *image.get_pixel(width - 1 - x, y);
            image.put_pixel(x, y, source);
        }
    }
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn vignette(image: &mut RgbaImage) {
    let (width, height) = image.dimensions();
    let cx = (width as f32 - 1.0) * 0.5;
    let cy = (height as f32 - 1.0) * 0.5;
    let reach = (cx * cx + cy * cy).sqrt().max(1.0);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let d = (dx * dx + dy * dy).sqrt() / reach;
        let factor = 1.0 - 0.7 * smoothstep((d - 0.5) / 0.5);
        for channel in &mut pixel.0[..3] {
            *channel = (f32::from(*channel) * factor).clamp(0.0, 255.0) as u8;
        }
    }
}

const WARHOL_PALETTES: [[[u8; 3]; 3]; 4] = [
    [[38, 20, 110], [230, 40, 120], [255, 220, 60]],
    [[10, 90, 60], [255, 120, 20], [120, 220, 255]],
    [[120, 0, 20], [40, 160, 230], [250, 250, 140]],
    [[30, 30, 30], [160, 60, 200], [120, 255, 120]],
];

// Four posterized copies in a 2x2 grid, each in its own palette.
fn warhol(image: &mut RgbaImage) {
    let (width, height) = image.dimensions();
    if width < 2 || height < 2 {
        return;
    }
    let (tw, th) = (width / 2, height / 2);
    let tile = imageops::resize(image, tw, th, imageops::FilterType::Triangle);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let (col, row) = ((x / tw).min(1), (y / th).min(1));
        let source = tile.get_pixel((x - col * tw).min(tw - 1), (y - row * th).min(th - 1));
        let [r, g, b, a] = source.0;
        let level = usize::from(luma([r, g, b]) / 86).min(2);
        let [r, g, b] = WARHOL_PALETTES[(row * 2 + col) as usize][level];
        pixel.0 = [r, g, b, a];
    }
}
