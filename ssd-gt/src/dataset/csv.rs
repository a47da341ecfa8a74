use super::{image_size, load_classes_file, DatasetLoader, Sample};
use crate::{common::*, dataset::Class};

/// A labeled image directory described by CSV files.
///
/// The data directory contains `classes.txt`, `trainval.csv`, an optional
/// `test.csv` and the `images` directory. Box geometry is given in pixels.
#[derive(Debug, Clone, Default)]
pub struct CsvSource;

impl DatasetLoader for CsvSource {
    fn load_classes(&self, data_dir: &Path) -> Result<IndexSet<String>> {
        load_classes_file(data_dir.join("classes.txt"))
    }

    fn load_trainval(&self, data_dir: &Path, classes: &IndexSet<String>) -> Result<Vec<Sample>> {
        load_csv_samples(
            data_dir.join("images"),
            data_dir.join("trainval.csv"),
            classes,
        )
    }

    fn load_test(&self, data_dir: &Path, classes: &IndexSet<String>) -> Result<Vec<Sample>> {
        let label_file = data_dir.join("test.csv");
        if !label_file.is_file() {
            warn!("'{}' does not exist, no test samples", label_file.display());
            return Ok(vec![]);
        }
        load_csv_samples(data_dir.join("images"), label_file, classes)
    }
}

/// One box of a CSV label file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct CsvRecord {
    pub image_file: PathBuf,
    pub class_name: String,
    pub cy: R64,
    pub cx: R64,
    pub h: R64,
    pub w: R64,
}

/// Parse the rows of a label file, resolving image files against `image_dir`.
pub fn load_csv_records(
    image_dir: impl AsRef<Path>,
    label_file: impl AsRef<Path>,
) -> Result<Vec<CsvRecord>> {
    let image_dir = image_dir.as_ref();
    let label_file = label_file.as_ref();

    let records: Vec<CsvRecord> = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .from_path(label_file)
        .with_context(|| format!("failed to open label file '{}'", label_file.display()))?
        .deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| format!("malformed label file '{}'", label_file.display()))?;

    // check existence of image files
    let records: Vec<_> = records
        .into_iter()
        .map(|record| {
            let image_file = image_dir.join(&record.image_file);
            ensure!(
                image_file.is_file(),
                "the image file '{}' does not exist",
                image_file.display()
            );
            Ok(CsvRecord {
                image_file,
                ..record
            })
        })
        .collect::<Result<_>>()?;

    Ok(records)
}

/// Group the rows of a label file into samples in first-seen image order.
pub fn load_csv_samples(
    image_dir: impl AsRef<Path>,
    label_file: impl AsRef<Path>,
    classes: &IndexSet<String>,
) -> Result<Vec<Sample>> {
    let records = load_csv_records(image_dir, label_file)?;

    let mut groups: IndexMap<PathBuf, Vec<CsvRecord>> = IndexMap::new();
    for record in records {
        groups
            .entry(record.image_file.clone())
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|(image_file, records)| {
            let size = image_size(&image_file)?;
            let boxes: Vec<_> = records
                .into_iter()
                .map(|record| -> Result<_> {
                    let CsvRecord {
                        class_name,
                        cy,
                        cx,
                        h,
                        w,
                        ..
                    } = record;
                    let id = classes
                        .get_index_of(&class_name)
                        .ok_or_else(|| format_err!("unknown class name '{}'", class_name))?;
                    let pixel = CyCxHW::try_from_cycxhw([
                        cy.raw(),
                        cx.raw(),
                        h.raw(),
                        w.raw(),
                    ])?;
                    let class = Class {
                        id,
                        name: class_name,
                    };
                    Sample::ratio_box(&size, &TLBR::from(&pixel), class)
                })
                .collect::<Result<_>>()
                .with_context(|| {
                    format!("malformed labels of '{}'", image_file.display())
                })?;

            Ok(Sample {
                path: image_file,
                size,
                boxes,
            })
        })
        .collect()
}
