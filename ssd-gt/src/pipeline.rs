//! The dataset processing pipeline.

use crate::{
    annotate::annotate,
    common::*,
    config::{Config, TrainingData},
    dataset::{load_data_source, DataSource},
    ground_truth::compute_gt,
    preset::get_anchors_for_preset,
};

/// Resolve the configured data source and load all of its splits.
pub fn load_source(config: &Config) -> Result<DataSource> {
    let Config {
        data_source,
        data_dir,
        validation_fraction,
        ..
    } = config;

    let mut source = load_data_source(data_source)?;
    source.load_trainval_data(data_dir, validation_fraction.raw())?;
    source.load_test_data(data_dir)?;

    info!("# training samples:   {}", source.num_train());
    info!("# validation samples: {}", source.num_valid());
    info!("# testing samples:    {}", source.num_test());
    info!("# classes:            {}", source.num_classes());

    Ok(source)
}

/// Annotate the images and compute the ground truth as configured.
pub fn process(config: &Config, source: &DataSource) -> Result<()> {
    let data_dir = &config.data_dir;

    if config.annotate {
        let colors = source.colors();
        annotate(data_dir, source.train_samples(), &colors, "train")?;
        annotate(data_dir, source.valid_samples(), &colors, "valid")?;
        annotate(data_dir, source.test_samples(), &colors, "test")?;
    }

    if config.compute_gt {
        let preset = config.preset.preset();
        let anchors = get_anchors_for_preset(&preset);
        info!("{} anchors for preset {}", anchors.len(), preset.name);

        let num_classes = source.num_classes();
        compute_gt(data_dir, source.train_samples(), &anchors, num_classes, "train")?;
        compute_gt(data_dir, source.valid_samples(), &anchors, num_classes, "valid")?;

        let path = data_dir.join("training-data.json");
        TrainingData::new(preset, source).save(&path)?;
        info!("saved training metadata to '{}'", path.display());
    }

    Ok(())
}
