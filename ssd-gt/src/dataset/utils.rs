use crate::common::*;

/// Outline colors assigned to classes in class order.
pub const PALETTE: [[u8; 3]; 20] = [
    [0, 0, 0],
    [111, 74, 0],
    [81, 0, 81],
    [128, 64, 128],
    [244, 35, 232],
    [230, 150, 140],
    [70, 70, 70],
    [102, 102, 156],
    [190, 153, 153],
    [150, 120, 90],
    [153, 153, 153],
    [250, 170, 30],
    [220, 220, 0],
    [107, 142, 35],
    [152, 251, 152],
    [70, 130, 180],
    [220, 20, 60],
    [0, 0, 142],
    [0, 0, 230],
    [119, 11, 32],
];

pub fn load_classes_file(path: impl AsRef<Path>) -> Result<IndexSet<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read classes file '{}'", path.display()))?;
    let lines: Vec<_> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let classes: IndexSet<_> = lines.iter().cloned().map(ToOwned::to_owned).collect();
    ensure!(
        lines.len() == classes.len(),
        "duplicated class names found in '{}'",
        path.display()
    );
    ensure!(
        !classes.is_empty(),
        "no classes found in '{}'",
        path.display()
    );
    Ok(classes)
}

/// Read the pixel size of an image without decoding it.
pub fn image_size(path: impl AsRef<Path>) -> Result<HW<usize>> {
    let path = path.as_ref();
    let imagesize::ImageSize { height, width } = imagesize::size(path)
        .map_err(|err| format_err!("failed to read size of '{}': {:?}", path.display(), err))?;
    HW::try_from_hw([height, width])
}
