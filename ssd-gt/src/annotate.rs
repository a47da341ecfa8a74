//! Draw ground-truth boxes onto copies of the images.

use crate::{common::*, dataset::Sample, progress::split_progress};
use image::{Rgb, RgbImage};

/// Outline thickness in pixels.
pub const LINE_WIDTH: u32 = 2;

/// Render the boxes of each sample and save the copy to `<data_dir>/annotated/<split>/`.
pub fn annotate(
    data_dir: impl AsRef<Path>,
    samples: &[Sample],
    colors: &IndexMap<String, [u8; 3]>,
    split: &str,
) -> Result<()> {
    let result_dir = data_dir.as_ref().join("annotated").join(split);
    fs::create_dir_all(&result_dir)
        .with_context(|| format!("failed to create directory '{}'", result_dir.display()))?;
    info!("annotating {} {} samples", samples.len(), split);
    let pb = split_progress(samples.len(), split, "annotate")?;

    for sample in samples {
        let mut image = image::open(&sample.path)
            .with_context(|| format!("failed to open image '{}'", sample.path.display()))?
            .to_rgb8();
        let transform = sample.ratio_to_pixel();

        for bbox in &sample.boxes {
            let color = colors
                .get(&bbox.class.name)
                .ok_or_else(|| format_err!("no color for class '{}'", bbox.class.name))?;
            let pixel = &transform * bbox;
            draw_outline(&mut image, &pixel.rect, Rgb(*color), LINE_WIDTH);
        }

        let path = result_dir.join(sample.file_name()?);
        image
            .save(&path)
            .with_context(|| format!("failed to save '{}'", path.display()))?;
        debug!("saved annotated image to '{}'", path.display());
        pb.inc(1);
    }
    pb.finish();

    Ok(())
}

/// Draw a rectangle outline growing inwards from the box edges.
///
/// Edges beyond the image are clipped to its border.
pub fn draw_outline(image: &mut RgbImage, rect: &CyCxHW<f64>, color: Rgb<u8>, thickness: u32) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || thickness == 0 {
        return;
    }

    let clip = |value: f64, size: u32| value.round().clamp(0.0, (size - 1) as f64) as u32;
    let [t, l, b, r] = rect.tlbr();
    let (t, l, b, r) = (clip(t, height), clip(l, width), clip(b, height), clip(r, width));

    for y in t..=b {
        for x in l..=r {
            let on_edge = y < t + thickness
                || y + thickness > b
                || x < l + thickness
                || x + thickness > r;
            if on_edge {
                image.put_pixel(x, y, color);
            }
        }
    }
}
