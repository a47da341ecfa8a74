//! Ground-truth preparation for SSD object detectors.
//!
//! Boxes of every image are matched against the anchors of a network preset
//! and encoded into a per-anchor target matrix that the detection loss is
//! trained against.

mod common;

pub mod annotate;
pub mod config;
pub mod dataset;
pub mod ground_truth;
pub mod location;
pub mod overlap;
pub mod pipeline;
pub mod preset;
pub mod progress;

pub use annotate::annotate;
pub use dataset::{load_data_source, DataSource, Sample};
pub use ground_truth::{compute_gt, process_overlap, MatchTable, SampleEntry, TargetVector};
pub use location::{compute_location, decode_location};
pub use overlap::{compute_overlap, Iou, Overlap};
pub use preset::{get_anchors_for_preset, get_preset_by_name, Anchor, Preset, PresetKind};
