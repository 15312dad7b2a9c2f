use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::gpu::Color;
use crate::processing::effects::{EffectKind, EffectPolicy};
use crate::renderer::RendererSettings;
use crate::tasks::loader::LoaderSettings;
use crate::transitions::TransitionKind;
use crate::world::disposition::{Disposition, DispositionTemplate};
use crate::world::geometry::GridSize;
use crate::world::scheduler::KindPolicy;
use crate::world::{LayoutPolicy, WorldSettings};

fn builtin(entries: &[(u32, u32, u32, u32)]) -> DispositionTemplate {
    DispositionTemplate::new(
        entries
            .iter()
            .map(|&(x, y, w, h)| Disposition::new(x, y, w, h))
            .collect(),
    )
}

// 4 x 7 portrait grid
fn default_portrait() -> DispositionTemplate {
    builtin(&[
        (0, 0, 3, 2),
        (0, 2, 2, 2),
        (0, 4, 4, 3),
        (2, 2, 2, 2),
        (3, 0, 1, 1),
        (3, 1, 1, 1),
    ])
}

// 7 x 4 landscape grid
fn default_landscape() -> DispositionTemplate {
    builtin(&[
        (0, 0, 3, 4),
        (3, 0, 3, 2),
        (3, 2, 2, 2),
        (5, 2, 2, 2),
        (6, 0, 1, 1),
        (6, 1, 1, 1),
    ])
}

fn default_portrait_templates() -> Vec<DispositionTemplate> {
    vec![
        default_portrait(),
        builtin(&[(0, 0, 4, 3), (0, 3, 2, 2), (2, 3, 2, 2), (0, 5, 4, 2)]),
        builtin(&[
            (0, 0, 2, 3),
            (2, 0, 2, 3),
            (0, 3, 4, 1),
            (0, 4, 2, 3),
            (2, 4, 2, 3),
        ]),
    ]
}

fn default_landscape_templates() -> Vec<DispositionTemplate> {
    vec![
        default_landscape(),
        builtin(&[(0, 0, 4, 4), (4, 0, 3, 2), (4, 2, 3, 2)]),
        builtin(&[
            (0, 0, 2, 2),
            (0, 2, 2, 2),
            (2, 0, 3, 4),
            (5, 0, 2, 2),
            (5, 2, 2, 2),
        ]),
    ]
}

/// 8-bit RGB colour as written in YAML: `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RgbColor(pub [u8; 3]);

impl RgbColor {
    pub fn to_color(self) -> Color {
        let [r, g, b] = self.0;
        [
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Rows of the portrait grid; landscape uses them as columns.
    pub rows: u32,
    /// Columns of the portrait grid; landscape uses them as rows.
    pub cols: u32,
    pub portrait_disposition: DispositionTemplate,
    pub landscape_disposition: DispositionTemplate,
    /// Draw a template at random from the sets below on every rebuild.
    pub random_dispositions: bool,
    /// How often a random layout is replaced; zero keeps it until the next rebuild.
    #[serde(with = "humantime_serde")]
    pub random_dispositions_interval: Duration,
    pub portrait_templates: Vec<DispositionTemplate>,
    pub landscape_templates: Vec<DispositionTemplate>,
    /// Leave a small gap between neighbouring frames.
    pub frame_spacer: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rows: 7,
            cols: 4,
            portrait_disposition: default_portrait(),
            landscape_disposition: default_landscape(),
            random_dispositions: false,
            random_dispositions_interval: Duration::ZERO,
            portrait_templates: default_portrait_templates(),
            landscape_templates: default_landscape_templates(),
            frame_spacer: true,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<()> {
        ensure!(self.rows > 0, "layout.rows must be greater than zero");
        ensure!(self.cols > 0, "layout.cols must be greater than zero");
        let (cols, rows) = (self.cols, self.rows);
        self.portrait_disposition
            .validate(cols, rows)
            .context("invalid portrait-disposition")?;
        self.landscape_disposition
            .validate(rows, cols)
            .context("invalid landscape-disposition")?;
        if self.random_dispositions {
            ensure!(
                !self.portrait_templates.is_empty() && !self.landscape_templates.is_empty(),
                "random-dispositions needs at least one template per orientation"
            );
            for (i, template) in self.portrait_templates.iter().enumerate() {
                template
                    .validate(cols, rows)
                    .with_context(|| format!("invalid portrait-templates[{i}]"))?;
            }
            for (i, template) in self.landscape_templates.iter().enumerate() {
                template
                    .validate(rows, cols)
                    .with_context(|| format!("invalid landscape-templates[{i}]"))?;
            }
        }
        Ok(())
    }

    fn policy(&self) -> LayoutPolicy {
        if self.random_dispositions {
            LayoutPolicy::Random {
                portrait: self.portrait_templates.clone(),
                landscape: self.landscape_templates.clone(),
            }
        } else {
            LayoutPolicy::Fixed {
                portrait: self.portrait_disposition.clone(),
                landscape: self.landscape_disposition.clone(),
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct TransitionsConfig {
    /// Kinds to choose from; empty means any kind.
    pub types: Vec<TransitionKind>,
    /// Time between automatic transitions; zero disables them.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for TransitionsConfig {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Largest size a decoded photo is kept at before it is cropped to a frame.
    pub decode_width: u32,
    pub decode_height: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            decode_width: 1920,
            decode_height: 1080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EffectsConfig {
    /// Apply an effect to every photo shown in a frame flagged for effects.
    pub enabled: bool,
    /// Effects to choose from; empty means any effect.
    pub types: Vec<EffectKind>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Root directory to scan recursively for images.
    pub photo_library_path: PathBuf,
    pub layout: LayoutConfig,
    pub transitions: TransitionsConfig,
    /// Tapping a frame starts a transition on it.
    pub touch_transition: bool,
    pub background_color: RgbColor,
    /// Outline frames flagged for borders with this colour.
    pub border_color: Option<RgbColor>,
    pub effects: EffectsConfig,
    pub loader: LoaderConfig,
    /// Fixed seed for layout and transition choices.
    pub seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::new(),
            layout: LayoutConfig::default(),
            transitions: TransitionsConfig::default(),
            touch_transition: true,
            background_color: RgbColor([0x20, 0x20, 0x20]),
            border_color: None,
            effects: EffectsConfig::default(),
            loader: LoaderConfig::default(),
            seed: None,
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.photo_library_path.as_os_str().is_empty(),
            "photo-library-path must be set"
        );
        self.layout
            .validate()
            .context("invalid layout configuration")?;
        ensure!(
            self.loader.decode_width > 0 && self.loader.decode_height > 0,
            "loader decode size must be positive"
        );
        Ok(self)
    }

    pub fn world_settings(&self) -> WorldSettings {
        WorldSettings {
            grid: GridSize {
                cols: self.layout.cols,
                rows: self.layout.rows,
            },
            layout: self.layout.policy(),
            kinds: KindPolicy::from_selected(&self.transitions.types),
            frame_spacer: self.layout.frame_spacer,
        }
    }

    pub fn renderer_settings(&self) -> RendererSettings {
        RendererSettings {
            interval: self.transitions.interval,
            touch_transition: self.touch_transition,
            background: self.background_color.to_color(),
            border: self.border_color.map(RgbColor::to_color),
            relayout_interval: if self.layout.random_dispositions {
                self.layout.random_dispositions_interval
            } else {
                Duration::ZERO
            },
        }
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            max_decode: (self.loader.decode_width, self.loader.decode_height),
            effects: EffectPolicy::from_config(self.effects.enabled, &self.effects.types),
        }
    }
}
