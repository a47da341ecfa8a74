//! Command line options and persisted metadata.

use crate::{common::*, dataset::DataSource, preset::Preset, PresetKind};
use clap::Parser;
use std::{fs::File, io::BufWriter};

#[derive(Debug, Clone, PartialEq, Parser, Serialize, Deserialize)]
#[clap(name = "process-dataset")]
/// Match dataset boxes against SSD anchors and save the training targets
pub struct Config {
    #[clap(long, default_value = "pascal_voc")]
    /// data source
    pub data_source: String,
    #[clap(long, default_value = "pascal-voc")]
    /// data directory
    pub data_dir: PathBuf,
    #[clap(long, default_value = "0.025", parse(try_from_str = parse_fraction))]
    /// fraction of the trainval data used for validation
    pub validation_fraction: R64,
    #[clap(long, default_value = "false", parse(try_from_str = str2bool))]
    /// draw the boxes onto copies of the images
    pub annotate: bool,
    #[clap(long, default_value = "true", parse(try_from_str = str2bool))]
    /// compute the ground truth target vectors
    pub compute_gt: bool,
    #[clap(long, arg_enum, default_value = "vgg300")]
    /// network preset
    pub preset: PresetKind,
}

/// Parse a yes/no style boolean.
pub fn str2bool(text: &str) -> Result<bool> {
    let value = match text.to_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => true,
        "no" | "false" | "f" | "n" | "0" => false,
        _ => bail!("boolean value expected, but get '{}'", text),
    };
    Ok(value)
}

pub fn parse_fraction(text: &str) -> Result<R64> {
    let value: f64 = text
        .parse()
        .with_context(|| format!("invalid number '{}'", text))?;
    ensure!(
        value.is_finite() && (0.0..=1.0).contains(&value),
        "fraction must be within [0, 1], but get {}",
        text
    );
    Ok(r64(value))
}

/// Metadata needed by the training stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrainingData {
    pub preset: Preset,
    pub num_classes: usize,
    pub colors: IndexMap<String, [u8; 3]>,
    pub lid2name: IndexMap<usize, String>,
    pub lname2id: IndexMap<String, usize>,
}

impl TrainingData {
    pub fn new(preset: Preset, source: &DataSource) -> Self {
        Self {
            preset,
            num_classes: source.num_classes(),
            colors: source.colors(),
            lid2name: source.lid2name(),
            lname2id: source.lname2id(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let data = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        Ok(data)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
