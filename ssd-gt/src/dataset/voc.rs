use super::{DatasetLoader, Sample};
use crate::{common::*, dataset::Class};

/// The Pascal VOC classes in class id order.
pub const VOC_CLASSES: [&str; 20] = [
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

/// The Pascal VOC 2007+2012 layout.
///
/// Trainval samples are read from `trainval/VOCdevkit/VOC{2007,2012}` and
/// test samples from `test/VOCdevkit/VOC2007` under the data directory.
#[derive(Debug, Clone, Default)]
pub struct PascalVoc;

impl DatasetLoader for PascalVoc {
    fn load_classes(&self, _data_dir: &Path) -> Result<IndexSet<String>> {
        Ok(VOC_CLASSES.iter().map(|name| name.to_string()).collect())
    }

    fn load_trainval(&self, data_dir: &Path, classes: &IndexSet<String>) -> Result<Vec<Sample>> {
        let devkit = data_dir.join("trainval").join("VOCdevkit");
        let mut samples = vec![];
        for year in ["VOC2007", "VOC2012"] {
            let year_samples = load_voc_split(devkit.join(year), "trainval", classes)?;
            info!("loaded {} trainval samples from {}", year_samples.len(), year);
            samples.extend(year_samples);
        }
        Ok(samples)
    }

    fn load_test(&self, data_dir: &Path, classes: &IndexSet<String>) -> Result<Vec<Sample>> {
        let root = data_dir.join("test").join("VOCdevkit").join("VOC2007");
        load_voc_split(root, "test", classes)
    }
}

/// Load the samples listed in `ImageSets/Main/<list_name>.txt` of a VOC year directory.
pub fn load_voc_split(
    root: impl AsRef<Path>,
    list_name: &str,
    classes: &IndexSet<String>,
) -> Result<Vec<Sample>> {
    let root = root.as_ref();
    let list_file = root
        .join("ImageSets")
        .join("Main")
        .join(format!("{}.txt", list_name));
    let ids = fs::read_to_string(&list_file)
        .with_context(|| format!("failed to read image list '{}'", list_file.display()))?;

    let samples: Vec<_> = ids
        .lines()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| -> Result<_> {
            let annotation_file = root.join("Annotations").join(format!("{}.xml", id));
            let annotation = Annotation::open(&annotation_file)?;
            let image_file = root.join("JPEGImages").join(&annotation.filename);

            if !image_file.is_file() {
                warn!("skip '{}': image file does not exist", image_file.display());
                return Ok(None);
            }
            if annotation.objects.is_empty() {
                warn!("skip '{}': no objects", annotation_file.display());
                return Ok(None);
            }

            let sample = annotation
                .to_sample(image_file, classes)
                .with_context(|| {
                    format!("malformed annotation file '{}'", annotation_file.display())
                })?;
            Ok(Some(sample))
        })
        .filter_map(|result| result.transpose())
        .collect::<Result<_>>()?;

    Ok(samples)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Annotation {
    pub filename: String,
    pub size: Size,
    #[serde(rename = "object", default)]
    pub objects: Vec<Object>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Object {
    pub name: String,
    pub bndbox: BndBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BndBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Annotation {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read annotation file '{}'", path.display()))?;
        let annotation = serde_xml_rs::from_str(&content)
            .with_context(|| format!("failed to parse annotation file '{}'", path.display()))?;
        Ok(annotation)
    }

    pub fn to_sample(&self, path: PathBuf, classes: &IndexSet<String>) -> Result<Sample> {
        let size = HW::try_from_hw([self.size.height, self.size.width])?;
        let boxes: Vec<_> = self
            .objects
            .iter()
            .map(|obj| -> Result<_> {
                let id = classes
                    .get_index_of(&obj.name)
                    .ok_or_else(|| format_err!("unknown class name '{}'", obj.name))?;
                let BndBox {
                    xmin,
                    ymin,
                    xmax,
                    ymax,
                } = obj.bndbox;
                let pixel = TLBR::try_from_tlbr([ymin, xmin, ymax, xmax])?;
                let class = Class {
                    id,
                    name: obj.name.clone(),
                };
                Sample::ratio_box(&size, &pixel, class)
            })
            .collect::<Result<_>>()?;

        Ok(Sample { path, size, boxes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ANNOTATION: &str = r#"<annotation>
	<folder>VOC2007</folder>
	<filename>000001.jpg</filename>
	<size>
		<width>400</width>
		<height>200</height>
		<depth>3</depth>
	</size>
	<segmented>0</segmented>
	<object>
		<name>dog</name>
		<pose>Left</pose>
		<truncated>1</truncated>
		<difficult>0</difficult>
		<bndbox>
			<xmin>100</xmin>
			<ymin>50</ymin>
			<xmax>300</xmax>
			<ymax>150</ymax>
		</bndbox>
	</object>
	<object>
		<name>person</name>
		<pose>Left</pose>
		<truncated>1</truncated>
		<difficult>0</difficult>
		<bndbox>
			<xmin>0</xmin>
			<ymin>0</ymin>
			<xmax>40</xmax>
			<ymax>200</ymax>
		</bndbox>
	</object>
</annotation>"#;

    fn classes() -> IndexSet<String> {
        PascalVoc.load_classes(Path::new(".")).unwrap()
    }

    #[test]
    fn parse_annotation() {
        let annotation: Annotation = serde_xml_rs::from_str(ANNOTATION).unwrap();
        assert_eq!(annotation.filename, "000001.jpg");
        assert_eq!(annotation.objects.len(), 2);

        let sample = annotation
            .to_sample(PathBuf::from("000001.jpg"), &classes())
            .unwrap();
        assert_eq!(sample.size, HW::from_hw([200, 400]));

        let dog = &sample.boxes[0];
        assert_eq!(dog.class.id, 11);
        assert_abs_diff_eq!(dog.rect.cy(), 0.5);
        assert_abs_diff_eq!(dog.rect.w(), 0.5);

        let person = &sample.boxes[1];
        assert_eq!(person.class.id, 14);
        assert_abs_diff_eq!(person.rect.h(), 1.0);
        assert_abs_diff_eq!(person.rect.cx(), 0.05);
    }

    #[test]
    fn unknown_class_is_malformed() {
        let content = ANNOTATION.replace("<name>dog</name>", "<name>unicorn</name>");
        let annotation: Annotation = serde_xml_rs::from_str(&content).unwrap();
        assert!(annotation
            .to_sample(PathBuf::from("000001.jpg"), &classes())
            .is_err());
    }

    #[test]
    fn load_split_skips_missing_images() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("VOC2007");
        fs::create_dir_all(root.join("ImageSets").join("Main")).unwrap();
        fs::create_dir_all(root.join("Annotations")).unwrap();
        fs::create_dir_all(root.join("JPEGImages")).unwrap();

        fs::write(
            root.join("ImageSets").join("Main").join("test.txt"),
            "000001\n000002\n000003\n",
        )
        .unwrap();
        fs::write(root.join("Annotations").join("000001.xml"), ANNOTATION).unwrap();
        fs::write(
            root.join("Annotations").join("000002.xml"),
            ANNOTATION.replace("000001.jpg", "000002.jpg"),
        )
        .unwrap();
        let empty = ANNOTATION
            .replace("000001.jpg", "000003.jpg")
            .split("<object>")
            .next()
            .unwrap()
            .to_string()
            + "</annotation>";
        fs::write(root.join("Annotations").join("000003.xml"), empty).unwrap();

        // only the first and the third image exist
        fs::write(root.join("JPEGImages").join("000001.jpg"), b"").unwrap();
        fs::write(root.join("JPEGImages").join("000003.jpg"), b"").unwrap();

        let samples = load_voc_split(&root, "test", &classes()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].file_name().unwrap(), "000001.jpg");
    }
}
