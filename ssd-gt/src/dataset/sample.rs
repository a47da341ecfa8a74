use crate::common::*;
use std::ffi::OsStr;

/// An object class of a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Class {
    pub id: usize,
    pub name: String,
}

/// A ground-truth box in ratio units of its image.
pub type GtBox = Label<CyCxHW<f64>, Class>;

/// An image with its ground-truth boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub path: PathBuf,
    /// Image size in pixels.
    pub size: HW<usize>,
    pub boxes: Vec<GtBox>,
}

impl Sample {
    pub fn file_name(&self) -> Result<&str> {
        self.path
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| format_err!("invalid image path '{}'", self.path.display()))
    }

    /// The transform from ratio units to the pixels of this image.
    pub fn ratio_to_pixel(&self) -> Transform<f64> {
        let size: HW<f64> = self.size.clone().cast();
        Transform::from_sizes_exact(&HW::from_hw([1.0, 1.0]), &size)
    }

    /// Build a ground-truth box from its pixel geometry in an image of `size`.
    pub fn ratio_box(size: &HW<usize>, pixel: &TLBR<f64>, class: Class) -> Result<GtBox> {
        ensure!(
            size.h() > 0 && size.w() > 0,
            "image size {}x{} must be positive",
            size.w(),
            size.h()
        );
        let size: HW<f64> = size.clone().cast();
        let transform = Transform::from_sizes_exact(&size, &HW::from_hw([1.0, 1.0]));
        let rect = CyCxHW::from(&transform * pixel);
        Ok(Label { rect, class })
    }
}
