//! Jaccard overlap between ground-truth boxes and anchors.

use crate::{common::*, preset::Anchor};

/// Anchors at or above this overlap are good matches of a box.
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Side length of the square canvas where overlaps are measured.
pub const CANVAS_SIZE: f64 = 1000.0;

/// The overlap of a box with one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Iou {
    /// The anchor index.
    pub index: usize,
    pub score: f64,
}

/// The overlap of a box with the whole anchor set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlap {
    /// The highest scoring anchor. The earliest anchor wins ties.
    pub best: Iou,
    /// Anchors scoring at least the threshold, in anchor order.
    pub good: Vec<Iou>,
}

/// Projects ratio geometry onto an integer pixel canvas.
#[derive(Debug, Clone)]
pub struct Canvas {
    transform: Transform<f64>,
}

impl Canvas {
    pub fn new(size: &HW<f64>) -> Self {
        let unit = HW::from_hw([1.0, 1.0]);
        Self {
            transform: Transform::from_sizes_exact(&unit, size),
        }
    }

    /// The fixed canvas used for matching, independent of the image size.
    pub fn reference() -> Self {
        Self::new(&HW::from_hw([CANVAS_SIZE, CANVAS_SIZE]))
    }

    /// Scale a box in ratio units and truncate its edges toward zero.
    pub fn project(&self, rect: &CyCxHW<f64>) -> Result<TLBR<i64>> {
        let scaled = TLBR::from(&self.transform * rect);
        let edges = scaled.tlbr();
        scaled
            .try_cast()
            .ok_or_else(|| format_err!("box edges {:?} do not fit on the canvas", edges))
    }

    pub fn project_anchors(&self, anchors: &[Anchor]) -> Result<Vec<TLBR<i64>>> {
        anchors
            .iter()
            .map(|anchor| self.project(&anchor.rect))
            .collect()
    }
}

/// Score a box against every anchor.
///
/// Both the box and the anchors are expected on the same pixel canvas. The
/// overlap counts boundary pixels as part of the rectangle.
pub fn compute_overlap(
    bbox: &TLBR<i64>,
    anchors: &[TLBR<i64>],
    threshold: f64,
) -> Result<Overlap> {
    ensure!(
        !anchors.is_empty(),
        "cannot compute overlap with an empty anchor set"
    );

    let scores: Vec<_> = anchors
        .iter()
        .enumerate()
        .map(|(index, anchor)| Iou {
            index,
            score: bbox.inclusive_iou_with(anchor),
        })
        .collect();

    let best = scores
        .iter()
        .copied()
        .reduce(|best, curr| if curr.score > best.score { curr } else { best })
        .ok_or_else(|| format_err!("no anchor scored"))?;
    let good: Vec<_> = scores
        .into_iter()
        .filter(|iou| iou.score >= threshold)
        .collect();

    Ok(Overlap { best, good })
}
