//! Network presets and their anchor boxes.

use crate::common::*;

/// The supported network presets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ArgEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    Vgg300,
    Vgg512,
}

impl PresetKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vgg300 => "vgg300",
            Self::Vgg512 => "vgg512",
        }
    }

    pub fn preset(&self) -> Preset {
        match self {
            Self::Vgg300 => Preset {
                name: *self,
                image_size: HW::from_hw([300, 300]),
                maps: vec![
                    FeatureMap::new(38, 0.1, &[2.0, 0.5]),
                    FeatureMap::new(19, 0.2, &[2.0, 3.0, 0.5, 1.0 / 3.0]),
                    FeatureMap::new(10, 0.375, &[2.0, 3.0, 0.5, 1.0 / 3.0]),
                    FeatureMap::new(5, 0.55, &[2.0, 3.0, 0.5, 1.0 / 3.0]),
                    FeatureMap::new(3, 0.725, &[2.0, 0.5]),
                    FeatureMap::new(1, 0.9, &[2.0, 0.5]),
                ],
                extra_scale: 1.075,
                num_anchors: 8732,
            },
            Self::Vgg512 => Preset {
                name: *self,
                image_size: HW::from_hw([512, 512]),
                maps: vec![
                    FeatureMap::new(64, 0.07, &[2.0, 0.5]),
                    FeatureMap::new(32, 0.15, &[2.0, 3.0, 0.5, 1.0 / 3.0]),
                    FeatureMap::new(16, 0.3, &[2.0, 3.0, 0.5, 1.0 / 3.0]),
                    FeatureMap::new(8, 0.45, &[2.0, 3.0, 0.5, 1.0 / 3.0]),
                    FeatureMap::new(4, 0.6, &[2.0, 3.0, 0.5, 1.0 / 3.0]),
                    FeatureMap::new(2, 0.75, &[2.0, 0.5]),
                    FeatureMap::new(1, 0.9, &[2.0, 0.5]),
                ],
                extra_scale: 1.05,
                num_anchors: 24564,
            },
        }
    }
}

impl FromStr for PresetKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let kind = match name {
            "vgg300" => Self::Vgg300,
            "vgg512" => Self::Vgg512,
            _ => bail!(
                "unknown preset '{}', expect one of 'vgg300', 'vgg512'",
                name
            ),
        };
        Ok(kind)
    }
}

impl Display for PresetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A square feature map of the detector head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMap {
    /// Number of cells along each side.
    pub size: usize,
    /// Anchor scale relative to the input image.
    pub scale: f64,
    /// Aspect ratios in addition to the implicit 1:1.
    pub aspect_ratios: Vec<f64>,
}

impl FeatureMap {
    fn new(size: usize, scale: f64, aspect_ratios: &[f64]) -> Self {
        Self {
            size,
            scale,
            aspect_ratios: aspect_ratios.to_vec(),
        }
    }
}

/// Input resolution and anchor geometry of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: PresetKind,
    pub image_size: HW<usize>,
    pub maps: Vec<FeatureMap>,
    /// The scale of the virtual map following the last one.
    pub extra_scale: f64,
    pub num_anchors: usize,
}

/// An anchor box in ratio units of the input image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub rect: CyCxHW<f64>,
    /// Cell column within the feature map.
    pub col: usize,
    /// Cell row within the feature map.
    pub row: usize,
    pub scale: f64,
    /// Index of the feature map.
    pub map: usize,
}

pub fn get_preset_by_name(name: &str) -> Result<Preset> {
    let kind: PresetKind = name.parse()?;
    Ok(kind.preset())
}

/// Generate the anchors of a preset.
///
/// Anchors are ordered by feature map, then by box size, then by row and
/// column. The order is part of the target layout and must not change.
pub fn get_anchors_for_preset(preset: &Preset) -> Vec<Anchor> {
    let box_sizes: Vec<Vec<(f64, f64)>> = preset
        .maps
        .iter()
        .enumerate()
        .map(|(index, map)| {
            let scale = map.scale;
            let next_scale = preset
                .maps
                .get(index + 1)
                .map(|next| next.scale)
                .unwrap_or(preset.extra_scale);

            // (w, h) per aspect ratio, then the intermediate square
            let square = (scale * next_scale).sqrt();
            [1.0]
                .iter()
                .chain(&map.aspect_ratios)
                .map(|ratio| {
                    let ratio = ratio.sqrt();
                    (scale * ratio, scale / ratio)
                })
                .chain([(square, square)])
                .collect()
        })
        .collect();

    preset
        .maps
        .iter()
        .zip(box_sizes)
        .enumerate()
        .flat_map(|(map_index, (map, sizes))| {
            let fk = map.size;
            let scale = map.scale;

            sizes.into_iter().flat_map(move |(w, h)| {
                (0..fk).flat_map(move |row| {
                    let cy = (row as f64 + 0.5) / fk as f64;
                    (0..fk).map(move |col| {
                        let cx = (col as f64 + 0.5) / fk as f64;
                        Anchor {
                            rect: CyCxHW::from_cycxhw([cy, cx, h, w]),
                            col,
                            row,
                            scale,
                            map: map_index,
                        }
                    })
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn anchor_counts_match_presets() {
        for kind in [PresetKind::Vgg300, PresetKind::Vgg512] {
            let preset = kind.preset();
            let anchors = get_anchors_for_preset(&preset);
            assert_eq!(anchors.len(), preset.num_anchors);
        }
        assert_eq!(get_anchors_for_preset(&PresetKind::Vgg300.preset()).len(), 8732);
        assert_eq!(get_anchors_for_preset(&PresetKind::Vgg512.preset()).len(), 24564);
    }

    #[test]
    fn anchor_order_and_geometry() {
        let preset = get_preset_by_name("vgg300").unwrap();
        let anchors = get_anchors_for_preset(&preset);

        let first = &anchors[0];
        assert_eq!((first.map, first.row, first.col), (0, 0, 0));
        assert_abs_diff_eq!(first.rect.cx(), 0.5 / 38.0);
        assert_abs_diff_eq!(first.rect.w(), 0.1);
        assert_abs_diff_eq!(first.rect.h(), 0.1);

        // columns vary fastest
        assert_eq!((anchors[1].row, anchors[1].col), (0, 1));
        assert_eq!((anchors[38].row, anchors[38].col), (1, 0));

        // second box size of the first map has aspect ratio 2
        let wide = &anchors[38 * 38];
        assert_abs_diff_eq!(wide.rect.w(), 0.1 * 2f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(wide.rect.h(), 0.1 / 2f64.sqrt(), epsilon = 1e-12);

        // intermediate square closes the first map
        let square = &anchors[38 * 38 * 4 - 1];
        assert_eq!(square.map, 0);
        assert_abs_diff_eq!(square.rect.w(), (0.1f64 * 0.2).sqrt(), epsilon = 1e-12);

        // the last anchor uses the extra scale
        let last = anchors.last().unwrap();
        assert_eq!(last.map, 5);
        assert_abs_diff_eq!(last.rect.w(), (0.9f64 * 1.075).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(last.rect.cy(), 0.5);
    }

    #[test]
    fn unknown_preset_name() {
        assert!(get_preset_by_name("vgg1024").is_err());
        assert_eq!("vgg512".parse::<PresetKind>().unwrap(), PresetKind::Vgg512);
        assert_eq!(PresetKind::Vgg300.to_string(), "vgg300");
    }
}
