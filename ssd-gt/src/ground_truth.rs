//! Anchor matching and target vector encoding.

use crate::{
    common::*,
    dataset::{GtBox, Sample},
    location::compute_location,
    overlap::{compute_overlap, Canvas, Iou, Overlap, MATCH_THRESHOLD},
    preset::Anchor,
    progress::split_progress,
};
use ndarray_npy::write_npy;
use std::{fs::File, io::BufWriter};

/// Per-anchor training targets of one image.
///
/// Each row holds a one-hot class segment of `num_classes + 1` columns, the
/// last one being the background class, followed by four location offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetVector {
    num_classes: usize,
    data: Array2<f32>,
}

impl TargetVector {
    /// Create a vector where every anchor is background with zero offsets.
    pub fn new(num_anchors: usize, num_classes: usize) -> Self {
        let mut data = Array2::zeros((num_anchors, num_classes + 5));
        data.column_mut(num_classes).fill(1.0);
        Self { num_classes, data }
    }

    pub fn num_anchors(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Column index of the background class.
    pub fn background(&self) -> usize {
        self.num_classes
    }

    /// Set the class and the location offsets of an anchor.
    pub fn assign(&mut self, anchor: usize, class: usize, location: [f64; 4]) -> Result<()> {
        ensure!(
            class < self.num_classes,
            "class id {} is out of range, expect less than {}",
            class,
            self.num_classes
        );
        ensure!(
            anchor < self.num_anchors(),
            "anchor index {} is out of range, expect less than {}",
            anchor,
            self.num_anchors()
        );

        let num_classes = self.num_classes;
        let mut row = self.data.row_mut(anchor);
        row.slice_mut(s![..=num_classes]).fill(0.0);
        row[class] = 1.0;
        row.slice_mut(s![(num_classes + 1)..])
            .iter_mut()
            .zip(location)
            .for_each(|(dst, src)| *dst = src as f32);
        Ok(())
    }

    /// The active one-hot column of an anchor. Returns `None` for background.
    pub fn class_of(&self, anchor: usize) -> Option<usize> {
        let row = self.data.row(anchor);
        let class = row
            .slice(s![..=self.num_classes])
            .iter()
            .position(|&value| value == 1.0)?;
        (class != self.num_classes).then(|| class)
    }

    pub fn location(&self, anchor: usize) -> [f32; 4] {
        let row = self.data.row(anchor);
        let offsets = row.slice(s![(self.num_classes + 1)..]);
        [offsets[0], offsets[1], offsets[2], offsets[3]]
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }
}

/// The best score claimed on each anchor within one encoding pass.
#[derive(Debug, Clone, Default)]
pub struct MatchTable(HashMap<usize, f64>);

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, anchor: usize) -> Option<f64> {
        self.0.get(&anchor).copied()
    }

    /// Record the match unless the anchor already holds a score at least as high.
    pub fn claim(&mut self, iou: &Iou) -> bool {
        match self.0.get(&iou.index) {
            Some(&prev) if prev >= iou.score => false,
            _ => {
                self.0.insert(iou.index, iou.score);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An encoded sample and the path of its persisted target vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub sample: Sample,
    pub ground_truth: PathBuf,
}

/// Assign a box to the matched anchor if the match beats the earlier claim.
pub fn process_overlap(
    iou: &Iou,
    bbox: &GtBox,
    anchor: &Anchor,
    matches: &mut MatchTable,
    vector: &mut TargetVector,
) -> Result<()> {
    if !matches.claim(iou) {
        return Ok(());
    }
    let location = compute_location(&bbox.rect, &anchor.rect)?;
    vector.assign(iou.index, bbox.class.id, location)
}

/// Encode boxes with precomputed overlaps into a target vector.
///
/// Good matches are assigned first, then every box claims its best anchor.
/// The two passes resolve conflicts independently of each other.
pub fn encode_overlaps(
    boxes: &[GtBox],
    overlaps: &[Overlap],
    anchors: &[Anchor],
    num_classes: usize,
) -> Result<TargetVector> {
    ensure!(
        boxes.len() == overlaps.len(),
        "expect one overlap per box, but get {} boxes and {} overlaps",
        boxes.len(),
        overlaps.len()
    );

    let mut vector = TargetVector::new(anchors.len(), num_classes);
    let anchor_at = |index: usize| {
        anchors
            .get(index)
            .ok_or_else(|| format_err!("anchor index {} is out of range", index))
    };

    let mut good_matches = MatchTable::new();
    for (bbox, overlap) in izip!(boxes, overlaps) {
        for iou in &overlap.good {
            process_overlap(iou, bbox, anchor_at(iou.index)?, &mut good_matches, &mut vector)?;
        }
    }

    let mut best_matches = MatchTable::new();
    for (bbox, overlap) in izip!(boxes, overlaps) {
        let iou = &overlap.best;
        process_overlap(iou, bbox, anchor_at(iou.index)?, &mut best_matches, &mut vector)?;
    }

    Ok(vector)
}

/// Match the boxes of a sample against the anchors and encode the result.
///
/// `canvas_anchors` are the anchors projected onto the reference canvas.
pub fn encode_sample(
    sample: &Sample,
    anchors: &[Anchor],
    canvas_anchors: &[TLBR<i64>],
    num_classes: usize,
) -> Result<TargetVector> {
    let canvas = Canvas::reference();
    let overlaps: Vec<_> = sample
        .boxes
        .iter()
        .map(|bbox| {
            let rect = canvas.project(&bbox.rect)?;
            compute_overlap(&rect, canvas_anchors, MATCH_THRESHOLD)
        })
        .collect::<Result<_>>()?;

    encode_overlaps(&sample.boxes, &overlaps, anchors, num_classes)
}

/// Encode and persist the target vectors of a split.
///
/// Each vector is written to `<data_dir>/ground_truth/<split>/<file name>.npy`
/// and the entries are saved in input order to `<data_dir>/<split>-samples.json`.
pub fn compute_gt(
    data_dir: impl AsRef<Path>,
    samples: &[Sample],
    anchors: &[Anchor],
    num_classes: usize,
    split: &str,
) -> Result<Vec<SampleEntry>> {
    let data_dir = data_dir.as_ref();
    let gt_dir = data_dir.join("ground_truth").join(split);
    fs::create_dir_all(&gt_dir)
        .with_context(|| format!("failed to create directory '{}'", gt_dir.display()))?;

    info!("computing ground truth for {} {} samples", samples.len(), split);
    let canvas_anchors = Canvas::reference().project_anchors(anchors)?;
    let pb = split_progress(samples.len(), split, "ground truth")?;

    let entries: Vec<_> = samples
        .iter()
        .map(|sample| -> Result<_> {
            let vector = encode_sample(sample, anchors, &canvas_anchors, num_classes)
                .with_context(|| format!("failed to encode '{}'", sample.path.display()))?;
            let path = gt_dir.join(format!("{}.npy", sample.file_name()?));
            write_npy(&path, vector.as_array())
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            debug!("saved ground truth to '{}'", path.display());
            pb.inc(1);

            Ok(SampleEntry {
                sample: sample.clone(),
                ground_truth: path,
            })
        })
        .collect::<Result<_>>()?;
    pb.finish();

    let manifest = data_dir.join(format!("{}-samples.json", split));
    {
        let file = File::create(&manifest)
            .with_context(|| format!("failed to create '{}'", manifest.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &entries)?;
    }
    info!("saved {} sample list to '{}'", split, manifest.display());

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::Class, preset::PresetKind};
    use approx::assert_abs_diff_eq;

    const NUM_CLASSES: usize = 3;

    fn anchor(cycxhw: [f64; 4]) -> Anchor {
        Anchor {
            rect: CyCxHW::from_cycxhw(cycxhw),
            col: 0,
            row: 0,
            scale: cycxhw[2],
            map: 0,
        }
    }

    fn gt_box(cycxhw: [f64; 4], id: usize) -> GtBox {
        Label {
            rect: CyCxHW::from_cycxhw(cycxhw),
            class: Class {
                id,
                name: format!("class{}", id),
            },
        }
    }

    fn iou(index: usize, score: f64) -> Iou {
        Iou { index, score }
    }

    fn four_anchors() -> Vec<Anchor> {
        vec![
            anchor([0.2, 0.2, 0.2, 0.2]),
            anchor([0.5, 0.45, 0.3, 0.3]),
            anchor([0.5, 0.5, 0.3, 0.3]),
            anchor([0.5, 0.6, 0.3, 0.3]),
        ]
    }

    fn assert_one_hot(vector: &TargetVector) {
        let num_classes = vector.num_classes();
        vector.as_array().outer_iter().for_each(|row| {
            let sum: f32 = row.slice(s![..=num_classes]).sum();
            assert_abs_diff_eq!(sum, 1.0);
        });
    }

    #[test]
    fn new_vector_is_background() {
        let vector = TargetVector::new(5, NUM_CLASSES);
        assert_eq!(vector.as_array().dim(), (5, NUM_CLASSES + 5));
        assert_one_hot(&vector);
        (0..5).for_each(|anchor| {
            assert_eq!(vector.class_of(anchor), None);
            assert_eq!(vector.location(anchor), [0.0; 4]);
        });
    }

    #[test]
    fn assign_replaces_class() {
        let mut vector = TargetVector::new(2, NUM_CLASSES);
        vector.assign(1, 2, [1.0, 2.0, 3.0, 4.0]).unwrap();
        vector.assign(1, 0, [0.5, 0.5, 0.5, 0.5]).unwrap();
        assert_one_hot(&vector);
        assert_eq!(vector.class_of(1), Some(0));
        assert_eq!(vector.location(1), [0.5; 4]);
        assert!(vector.assign(0, NUM_CLASSES, [0.0; 4]).is_err());
        assert!(vector.assign(2, 0, [0.0; 4]).is_err());
    }

    #[test]
    fn match_table_keeps_first_claim_on_tie() {
        let mut table = MatchTable::new();
        assert!(table.claim(&iou(3, 0.7)));
        assert!(!table.claim(&iou(3, 0.7)));
        assert!(!table.claim(&iou(3, 0.6)));
        assert!(table.claim(&iou(3, 0.8)));
        assert_eq!(table.score(3), Some(0.8));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn good_and_best_matches() {
        let anchors = four_anchors();
        let boxes = vec![gt_box([0.5, 0.5, 0.3, 0.3], 1)];
        let overlaps = vec![Overlap {
            best: iou(2, 1.0),
            good: vec![iou(1, 0.6), iou(2, 1.0)],
        }];

        let vector = encode_overlaps(&boxes, &overlaps, &anchors, NUM_CLASSES).unwrap();
        assert_one_hot(&vector);

        assert_eq!(vector.class_of(0), None);
        assert_eq!(vector.class_of(1), Some(1));
        assert_eq!(vector.class_of(2), Some(1));
        assert_eq!(vector.class_of(3), None);

        assert_eq!(vector.location(2), [0.0; 4]);
        assert_eq!(vector.location(0), [0.0; 4]);
        let [dx, dy, dw, dh] = vector.location(1);
        assert_abs_diff_eq!(dx, 0.05 / 0.3 * 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(dy, 0.0);
        assert_abs_diff_eq!(dw, 0.0);
        assert_abs_diff_eq!(dh, 0.0);
    }

    #[test]
    fn encode_with_canvas_scores() {
        let anchors = vec![
            anchor([0.1, 0.1, 0.1, 0.1]),
            anchor([0.5, 0.425, 0.3, 0.3]),
            anchor([0.5, 0.5, 0.3, 0.3]),
            anchor([0.5, 0.65, 0.3, 0.3]),
        ];
        let canvas = Canvas::reference();
        let canvas_anchors = canvas.project_anchors(&anchors).unwrap();
        let boxes = vec![gt_box([0.5, 0.5, 0.3, 0.3], 2)];
        let rect = canvas.project(&boxes[0].rect).unwrap();

        let scores: Vec<_> = compute_overlap(&rect, &canvas_anchors, 0.0)
            .unwrap()
            .good
            .iter()
            .map(|iou| iou.score)
            .collect();
        assert_eq!(scores.len(), 4);
        assert_abs_diff_eq!(scores[0], 0.0);
        assert_abs_diff_eq!(scores[1], 0.6, epsilon = 0.01);
        assert_abs_diff_eq!(scores[2], 1.0);
        assert_abs_diff_eq!(scores[3], 1.0 / 3.0, epsilon = 0.01);

        let overlap = compute_overlap(&rect, &canvas_anchors, MATCH_THRESHOLD).unwrap();
        assert_eq!(overlap.best.index, 2);
        assert_eq!(
            overlap.good.iter().map(|iou| iou.index).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let vector = encode_overlaps(&boxes, &[overlap], &anchors, NUM_CLASSES).unwrap();
        assert_one_hot(&vector);
        assert_eq!(vector.class_of(0), None);
        assert_eq!(vector.class_of(1), Some(2));
        assert_eq!(vector.class_of(2), Some(2));
        assert_eq!(vector.class_of(3), None);

        assert_eq!(vector.location(2), [0.0; 4]);
        let [dx, dy, dw, dh] = vector.location(1);
        assert_abs_diff_eq!(dx, 2.5, epsilon = 1e-5);
        assert_abs_diff_eq!(dy, 0.0);
        assert_abs_diff_eq!(dw, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(dh, 0.0);
    }

    #[test]
    fn best_match_below_threshold() {
        let anchors = four_anchors();
        let boxes = vec![gt_box([0.25, 0.25, 0.1, 0.1], 2)];
        let overlaps = vec![Overlap {
            best: iou(0, 0.25),
            good: vec![],
        }];

        let vector = encode_overlaps(&boxes, &overlaps, &anchors, NUM_CLASSES).unwrap();
        assert_eq!(vector.class_of(0), Some(2));
        (1..4).for_each(|anchor| assert_eq!(vector.class_of(anchor), None));
    }

    #[test]
    fn higher_score_wins_and_ties_keep_first() {
        let anchors = four_anchors();
        let boxes = vec![
            gt_box([0.5, 0.5, 0.3, 0.3], 0),
            gt_box([0.5, 0.55, 0.3, 0.3], 1),
        ];
        let overlaps = vec![
            Overlap {
                best: iou(2, 0.9),
                good: vec![iou(1, 0.6), iou(2, 0.9)],
            },
            Overlap {
                best: iou(3, 0.9),
                good: vec![iou(1, 0.6), iou(2, 0.7), iou(3, 0.9)],
            },
        ];

        let vector = encode_overlaps(&boxes, &overlaps, &anchors, NUM_CLASSES).unwrap();
        assert_one_hot(&vector);
        assert_eq!(vector.class_of(1), Some(0));
        assert_eq!(vector.class_of(2), Some(0));
        assert_eq!(vector.class_of(3), Some(1));
    }

    #[test]
    fn best_pass_ignores_good_pass_scores() {
        let anchors = four_anchors();
        let boxes = vec![
            gt_box([0.5, 0.5, 0.3, 0.3], 0),
            gt_box([0.5, 0.55, 0.3, 0.3], 1),
        ];
        // anchor 2 is a strong good match of the first box and the best
        // match of the second box at a lower score
        let overlaps = vec![
            Overlap {
                best: iou(1, 0.95),
                good: vec![iou(1, 0.95), iou(2, 0.9)],
            },
            Overlap {
                best: iou(2, 0.4),
                good: vec![],
            },
        ];

        let vector = encode_overlaps(&boxes, &overlaps, &anchors, NUM_CLASSES).unwrap();
        assert_eq!(vector.class_of(1), Some(0));
        assert_eq!(vector.class_of(2), Some(1));
    }

    #[test]
    fn mismatched_overlaps() {
        let anchors = four_anchors();
        let boxes = vec![gt_box([0.5, 0.5, 0.3, 0.3], 0)];
        assert!(encode_overlaps(&boxes, &[], &anchors, NUM_CLASSES).is_err());
    }

    #[test]
    fn malformed_box_aborts() {
        let anchors = four_anchors();
        let boxes = vec![gt_box([0.5, 0.5, 0.0, 0.3], 0)];
        let overlaps = vec![Overlap {
            best: iou(2, 0.5),
            good: vec![],
        }];
        assert!(encode_overlaps(&boxes, &overlaps, &anchors, NUM_CLASSES).is_err());
    }

    #[test]
    fn encode_sample_on_preset_anchors() {
        let anchors = crate::preset::get_anchors_for_preset(&PresetKind::Vgg300.preset());
        let canvas_anchors = Canvas::reference().project_anchors(&anchors).unwrap();
        let target = anchors[100].rect.clone();
        let sample = Sample {
            path: PathBuf::from("a.jpg"),
            size: HW::from_hw([300, 300]),
            boxes: vec![Label {
                rect: target,
                class: Class {
                    id: 2,
                    name: "class2".into(),
                },
            }],
        };

        let vector = encode_sample(&sample, &anchors, &canvas_anchors, NUM_CLASSES).unwrap();
        assert_eq!(vector.num_anchors(), 8732);
        assert_one_hot(&vector);
        assert_eq!(vector.class_of(100), Some(2));
        assert_eq!(vector.location(100), [0.0; 4]);

        let positives = (0..vector.num_anchors())
            .filter(|&anchor| vector.class_of(anchor).is_some())
            .count();
        assert!(positives >= 1);
    }
}
