use super::{CsvSource, PascalVoc, Sample, PALETTE};
use crate::common::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Seed of the train/validation shuffle.
pub const SPLIT_SEED: u64 = 42;

type LoaderFn = fn() -> Box<dyn DatasetLoader>;

/// Registered data sources by name.
const DATA_SOURCES: &[(&str, LoaderFn)] = &[("pascal_voc", pascal_voc), ("csv", csv)];

fn pascal_voc() -> Box<dyn DatasetLoader> {
    Box::new(PascalVoc)
}

fn csv() -> Box<dyn DatasetLoader> {
    Box::new(CsvSource)
}

/// Reads the classes and samples of a dataset layout.
pub trait DatasetLoader: Debug {
    /// The class names in class id order.
    fn load_classes(&self, data_dir: &Path) -> Result<IndexSet<String>>;

    fn load_trainval(&self, data_dir: &Path, classes: &IndexSet<String>) -> Result<Vec<Sample>>;

    fn load_test(&self, data_dir: &Path, classes: &IndexSet<String>) -> Result<Vec<Sample>>;
}

/// A dataset split into training, validation and test samples.
#[derive(Debug)]
pub struct DataSource {
    name: String,
    loader: Box<dyn DatasetLoader>,
    classes: IndexSet<String>,
    train_samples: Vec<Sample>,
    valid_samples: Vec<Sample>,
    test_samples: Vec<Sample>,
}

/// Resolve a registered data source by name.
pub fn load_data_source(name: &str) -> Result<DataSource> {
    let (_, new_loader) = DATA_SOURCES
        .iter()
        .find(|(source_name, _)| *source_name == name)
        .ok_or_else(|| {
            let names = DATA_SOURCES.iter().map(|(known, _)| known).join(", ");
            format_err!(
                "data source '{}' is not available, expect one of {}",
                name,
                names
            )
        })?;

    Ok(DataSource {
        name: name.to_string(),
        loader: new_loader(),
        classes: IndexSet::new(),
        train_samples: vec![],
        valid_samples: vec![],
        test_samples: vec![],
    })
}

impl DataSource {
    /// Load the trainval samples and split off the validation set.
    pub fn load_trainval_data(
        &mut self,
        data_dir: impl AsRef<Path>,
        valid_fraction: f64,
    ) -> Result<()> {
        let data_dir = data_dir.as_ref();
        ensure!(
            (0.0..=1.0).contains(&valid_fraction),
            "validation fraction must be within [0, 1], but get {}",
            valid_fraction
        );
        self.ensure_classes(data_dir)?;

        let samples = self
            .loader
            .load_trainval(data_dir, &self.classes)
            .with_context(|| {
                format!(
                    "failed to load {} trainval data from '{}'",
                    self.name,
                    data_dir.display()
                )
            })?;
        let (train, valid) = split_samples(samples, valid_fraction);
        self.train_samples = train;
        self.valid_samples = valid;
        Ok(())
    }

    pub fn load_test_data(&mut self, data_dir: impl AsRef<Path>) -> Result<()> {
        let data_dir = data_dir.as_ref();
        self.ensure_classes(data_dir)?;
        self.test_samples = self
            .loader
            .load_test(data_dir, &self.classes)
            .with_context(|| {
                format!(
                    "failed to load {} test data from '{}'",
                    self.name,
                    data_dir.display()
                )
            })?;
        Ok(())
    }

    fn ensure_classes(&mut self, data_dir: &Path) -> Result<()> {
        ensure!(
            data_dir.is_dir(),
            "data directory '{}' does not exist",
            data_dir.display()
        );
        if self.classes.is_empty() {
            self.classes = self.loader.load_classes(data_dir)?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_train(&self) -> usize {
        self.train_samples.len()
    }

    pub fn num_valid(&self) -> usize {
        self.valid_samples.len()
    }

    pub fn num_test(&self) -> usize {
        self.test_samples.len()
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn train_samples(&self) -> &[Sample] {
        &self.train_samples
    }

    pub fn valid_samples(&self) -> &[Sample] {
        &self.valid_samples
    }

    pub fn test_samples(&self) -> &[Sample] {
        &self.test_samples
    }

    /// Outline color of each class name.
    pub fn colors(&self) -> IndexMap<String, [u8; 3]> {
        izip!(&self.classes, PALETTE.iter().cycle())
            .map(|(name, color)| (name.clone(), *color))
            .collect()
    }

    pub fn lid2name(&self) -> IndexMap<usize, String> {
        self.classes.iter().cloned().enumerate().collect()
    }

    pub fn lname2id(&self) -> IndexMap<String, usize> {
        self.classes
            .iter()
            .cloned()
            .enumerate()
            .map(|(id, name)| (name, id))
            .collect()
    }
}

/// Shuffle with a fixed seed and take the leading `floor(n * fraction)`
/// samples as the validation set.
pub fn split_samples(mut samples: Vec<Sample>, valid_fraction: f64) -> (Vec<Sample>, Vec<Sample>) {
    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    samples.shuffle(&mut rng);

    let num_valid = ((samples.len() as f64 * valid_fraction).floor() as usize).min(samples.len());
    let train = samples.split_off(num_valid);
    (train, samples)
}
