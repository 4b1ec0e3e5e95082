//! Integration tests for the DCGAN training and sampling pipeline

use std::path::Path;

use image::{Rgb, RgbImage};
use tch::{Device, Kind, Tensor};

use dcgan_images::data::DatasetKind;
use dcgan_images::model::InterpolationMode;
use dcgan_images::pipeline::{self, GenerateOptions, InterpolateOptions, Resume};
use dcgan_images::utils::{find_latest_checkpoint, list_checkpoints, plot_losses, Config};
use dcgan_images::{TrainingMetrics, DCGAN};

/// Small network on 16x16 images so a CPU run takes seconds
fn tiny_config(dataset: DatasetKind, output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.data.dataset = dataset;
    config.data.image_size = 16;
    config.data.batch_size = 4;
    config.data.workers = 2;
    config.model.latent_dim = 8;
    config.model.gen_filters = 4;
    config.model.disc_filters = 4;
    config.training.epochs = 1;
    config.training.sample_every = 1;
    config.training.checkpoint_every = 1;
    config.training.output_dir = output_dir.to_path_buf();
    config.training.seed = Some(7);
    config
}

/// Write `count` solid-color PNGs of varying size below `root`
fn write_images(root: &Path, count: usize) {
    std::fs::create_dir_all(root.join("nested")).unwrap();
    for i in 0..count {
        let shade = (i * 255 / count.max(1)) as u8;
        let img = RgbImage::from_pixel(20 + i as u32, 24, Rgb([shade, 255 - shade, 64]));
        let dir = if i % 2 == 0 { root.to_path_buf() } else { root.join("nested") };
        img.save(dir.join(format!("img_{:02}.png", i))).unwrap();
    }
}

#[test]
fn test_dry_run_on_fake_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let config = tiny_config(DatasetKind::Fake, dir.path());

    let metrics = pipeline::train(&config, &Resume::default(), true).unwrap();

    assert_eq!(metrics.num_iterations(), 1);
    let step = metrics.iterations[0];
    assert!(step.is_finite());
    assert!((0.0..=1.0).contains(&step.d_real));

    for name in [
        "real_samples.png",
        "fake_samples_epoch_000.png",
        "netG_epoch_0.ot",
        "netD_epoch_0.ot",
        "generator_final.ot",
        "discriminator_final.ot",
        "training_metrics.csv",
        "config.json",
    ] {
        assert!(dir.path().join(name).exists(), "missing {}", name);
    }

    // 64 fixed-noise samples in rows of 8
    let fake = image::open(dir.path().join("fake_samples_epoch_000.png")).unwrap();
    assert_eq!((fake.width(), fake.height()), (8 * 18 + 2, 8 * 18 + 2));

    let saved = Config::load(dir.path().join("config.json")).unwrap();
    assert_eq!(saved.training.seed, Some(7));

    // One iteration is not a finished epoch
    assert!(!dir.path().join("checkpoints").exists());
}

#[test]
fn test_generate_from_run_without_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = tiny_config(DatasetKind::Fake, dir.path());
    config.data.image_size = 32;
    config.training.checkpoint_every = 0;

    pipeline::train(&config, &Resume::default(), true).unwrap();
    assert!(find_latest_checkpoint(&dir.path().join("checkpoints")).is_none());

    // The shape comes from the run's config.json, not the default config
    let model = pipeline::load_generator_model(dir.path(), &Config::default()).unwrap();
    assert_eq!(model.image_size(), 32);
    assert_eq!(model.latent_dim(), 8);
    assert_eq!(model.channels(), 3);

    let epoch_weights = dir.path().join("netG_epoch_0.ot");
    let from_file = pipeline::load_generator_model(&epoch_weights, &Config::default()).unwrap();
    assert_eq!(from_file.config(), model.config());

    let images = pipeline::generate_images(
        &from_file,
        &GenerateOptions {
            num_images: 4,
            nrow: 2,
            output: dir.path().join("generated.png"),
            individual_dir: None,
            seed: Some(1),
        },
    )
    .unwrap();
    assert_eq!(images.size(), vec![4, 3, 32, 32]);
}

#[test]
fn test_resume_from_weight_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = tiny_config(DatasetKind::Fake, dir.path());
    pipeline::train(&config, &Resume::default(), true).unwrap();

    let net_g = dir.path().join("generator_final.ot");
    let net_d = dir.path().join("discriminator_final.ot");
    let resume = Resume {
        checkpoint: None,
        net_g: Some(net_g.clone()),
        net_d: Some(net_d.clone()),
    };
    let (model, start_epoch, metrics) = pipeline::build_model(&config, &resume).unwrap();
    assert_eq!(start_epoch, 0);
    assert_eq!(metrics.num_iterations(), 0);

    let mut saved = DCGAN::new(config.network_config(), Device::Cpu).unwrap();
    saved.load(&net_g, &net_d).unwrap();

    // Loaded weights reproduce the saved networks before any step
    let noise = Tensor::randn([6, 8], (Kind::Float, Device::Cpu));
    let resumed_images = model.generate_from_noise(&noise);
    assert!(resumed_images.allclose(&saved.generate_from_noise(&noise), 1e-6, 1e-6, false));
    let sampler = pipeline::load_generator_model(dir.path(), &Config::default()).unwrap();
    assert!(resumed_images.allclose(&sampler.generate_from_noise(&noise), 1e-6, 1e-6, false));

    let images = Tensor::rand([6, 3, 16, 16], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
    assert!(model
        .discriminate(&images)
        .allclose(&saved.discriminate(&images), 1e-6, 1e-6, false));

    let (fresh, _, _) = pipeline::build_model(&config, &Resume::default()).unwrap();
    assert!(!fresh.generate_from_noise(&noise).allclose(&resumed_images, 1e-6, 1e-6, false));

    // Weights of another network shape are rejected
    let mut wider = config.clone();
    wider.model.latent_dim = 16;
    assert!(pipeline::build_model(&wider, &resume).is_err());

    let metrics = pipeline::train(&config, &resume, true).unwrap();
    assert_eq!(metrics.num_iterations(), 1);
}

#[test]
fn test_train_resume_generate_and_interpolate() {
    let data_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    write_images(data_dir.path(), 10);

    let mut config = tiny_config(DatasetKind::Folder, out_dir.path());
    config.data.dataroot = Some(data_dir.path().to_path_buf());

    // 10 images in batches of 4: three iterations per epoch
    let metrics = pipeline::train(&config, &Resume::default(), false).unwrap();
    assert_eq!(metrics.num_iterations(), 3);
    assert_eq!(metrics.num_epochs(), 1);
    assert!(metrics.iterations.iter().all(|s| s.is_finite()));

    let checkpoints_dir = out_dir.path().join("checkpoints");
    let checkpoint = find_latest_checkpoint(&checkpoints_dir).unwrap();
    assert_eq!(list_checkpoints(&checkpoints_dir)[0].1.epoch, 1);

    // Continue for one more epoch from the checkpoint
    config.training.epochs = 2;
    let resume = Resume {
        checkpoint: Some(checkpoint),
        ..Default::default()
    };
    let resumed = pipeline::train(&config, &resume, false).unwrap();
    assert_eq!(resumed.num_iterations(), 6);
    assert_eq!(resumed.num_epochs(), 2);
    assert_eq!(resumed.iterations[5].iteration, 5);
    assert!(out_dir.path().join("netG_epoch_1.ot").exists());
    assert_eq!(list_checkpoints(&checkpoints_dir).len(), 2);

    let csv = out_dir.path().join("training_metrics.csv");
    let loaded = TrainingMetrics::load_csv(&csv).unwrap();
    assert_eq!(loaded.num_iterations(), 6);
    let plot = out_dir.path().join("losses.png");
    plot_losses(&loaded, &plot).unwrap();
    assert!(plot.exists());

    // Sampling picks the network shape up from the checkpoint metadata
    let model = pipeline::load_generator_model(out_dir.path(), &Config::default()).unwrap();
    assert_eq!(model.image_size(), 16);

    let grid_path = out_dir.path().join("generated.png");
    let options = GenerateOptions {
        num_images: 10,
        nrow: 5,
        output: grid_path.clone(),
        individual_dir: Some(out_dir.path().join("individual")),
        seed: Some(3),
    };
    let images = pipeline::generate_images(&model, &options).unwrap();
    assert_eq!(images.size(), vec![10, 3, 16, 16]);
    let grid = image::open(&grid_path).unwrap();
    assert_eq!((grid.width(), grid.height()), (5 * 18 + 2, 2 * 18 + 2));
    assert!(out_dir.path().join("individual").join("sample_0009.png").exists());

    let interp_path = out_dir.path().join("interpolation.png");
    let options = InterpolateOptions {
        rows: 3,
        steps: 6,
        mode: InterpolationMode::Spherical,
        output: interp_path.clone(),
        seed: Some(11),
    };
    let walks = pipeline::interpolate_images(&model, &options).unwrap();
    assert_eq!(walks.size(), vec![18, 3, 16, 16]);
    let interp = image::open(&interp_path).unwrap();
    assert_eq!((interp.width(), interp.height()), (6 * 18 + 2, 3 * 18 + 2));
}

#[test]
fn test_train_rejects_missing_dataroot() {
    let out_dir = tempfile::tempdir().unwrap();
    let config = tiny_config(DatasetKind::Folder, out_dir.path());

    assert!(pipeline::train(&config, &Resume::default(), true).is_err());
}

#[test]
fn test_generate_rejects_unknown_model() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nothing_here.ot");

    assert!(pipeline::load_generator_model(&missing, &Config::default()).is_err());
}
