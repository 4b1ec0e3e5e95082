//! Image datasets for DCGAN training
//!
//! Supported sources:
//! - `folder` (aliases `imagenet`, `lfw`): any directory tree of image files
//! - `lsun`: LSUN scenes exported as image files, optionally filtered by class
//! - `cifar10`: CIFAR-10 binary batches
//! - `mnist`: MNIST idx files (single channel)
//! - `fake`: uniformly random images, useful for smoke tests

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tch::{Device, Kind, Tensor};
use tracing::{debug, info};

use crate::error::{DcganError, Result};
use super::transform::{normalize_tensor_batch, ImageTransform};

/// File extensions treated as images when scanning folders
const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "bmp", "gif", "webp", "tif", "tiff"];

/// Number of images in the `fake` dataset
pub const FAKE_DATASET_LEN: usize = 10_000;

/// Which dataset to train on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Folder,
    Imagenet,
    Lfw,
    Lsun,
    Cifar10,
    Mnist,
    Fake,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 7] = [
        DatasetKind::Folder,
        DatasetKind::Imagenet,
        DatasetKind::Lfw,
        DatasetKind::Lsun,
        DatasetKind::Cifar10,
        DatasetKind::Mnist,
        DatasetKind::Fake,
    ];

    /// Image channels produced by this dataset
    pub fn channels(&self) -> i64 {
        match self {
            DatasetKind::Mnist => 1,
            _ => 3,
        }
    }

    /// Whether a data root directory must be supplied
    pub fn requires_dataroot(&self) -> bool {
        !matches!(self, DatasetKind::Fake)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Folder => "folder",
            DatasetKind::Imagenet => "imagenet",
            DatasetKind::Lfw => "lfw",
            DatasetKind::Lsun => "lsun",
            DatasetKind::Cifar10 => "cifar10",
            DatasetKind::Mnist => "mnist",
            DatasetKind::Fake => "fake",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = DcganError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        DatasetKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| {
                let names: Vec<_> = DatasetKind::ALL.iter().map(|k| k.name()).collect();
                DcganError::Config(format!(
                    "unknown dataset '{}', expected one of: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A source of training images
///
/// Every batch comes back as a float tensor of shape
/// (batch, channels, image_size, image_size) with values in [-1, 1].
#[derive(Debug)]
pub enum ImageDataset {
    /// Image files decoded lazily per batch
    Files {
        paths: Vec<PathBuf>,
        transform: ImageTransform,
    },
    /// Images already in memory, shape (N, C, H, W), values in [0, 1]
    Tensors { images: Tensor, image_size: i64 },
    /// Uniform noise images generated on demand
    Fake {
        len: usize,
        channels: i64,
        image_size: i64,
    },
}

impl ImageDataset {
    /// Open a dataset of the given kind
    ///
    /// # Arguments
    ///
    /// * `kind` - Dataset kind
    /// * `dataroot` - Root directory (ignored for `fake`)
    /// * `image_size` - Side length every image is brought to
    /// * `classes` - LSUN categories to keep, e.g. `bedroom_train`
    pub fn open(
        kind: DatasetKind,
        dataroot: Option<&Path>,
        image_size: i64,
        classes: &[String],
    ) -> Result<Self> {
        let dataset = match kind {
            DatasetKind::Fake => Self::fake(FAKE_DATASET_LEN, kind.channels(), image_size),
            DatasetKind::Folder | DatasetKind::Imagenet | DatasetKind::Lfw => {
                Self::from_folder(require_root(kind, dataroot)?, image_size)?
            }
            DatasetKind::Lsun => Self::from_lsun(require_root(kind, dataroot)?, image_size, classes)?,
            DatasetKind::Cifar10 => {
                let root = require_root(kind, dataroot)?;
                let data = tch::vision::cifar::load_dir(root).map_err(|e| {
                    DcganError::Dataset(format!("failed to load CIFAR-10 from {}: {}", root.display(), e))
                })?;
                Self::from_tensor(data.train_images, image_size)?
            }
            DatasetKind::Mnist => {
                let root = require_root(kind, dataroot)?;
                let data = tch::vision::mnist::load_dir(root).map_err(|e| {
                    DcganError::Dataset(format!("failed to load MNIST from {}: {}", root.display(), e))
                })?;
                Self::from_tensor(data.train_images.view([-1, 1, 28, 28]), image_size)?
            }
        };

        info!("Opened {} dataset with {} images", kind, dataset.len());
        Ok(dataset)
    }

    /// Every image file below `root`, sorted by path
    pub fn from_folder(root: &Path, image_size: i64) -> Result<Self> {
        let mut paths = Vec::new();
        collect_image_files(root, &mut paths)?;
        paths.sort();

        if paths.is_empty() {
            return Err(DcganError::Dataset(format!(
                "no images found under {}",
                root.display()
            )));
        }

        Ok(Self::Files {
            paths,
            transform: ImageTransform::new(image_size as u32),
        })
    }

    /// LSUN scenes exported to `root/<class>/...`
    ///
    /// With an empty `classes` list every image under `root` is used.
    pub fn from_lsun(root: &Path, image_size: i64, classes: &[String]) -> Result<Self> {
        if classes.is_empty() {
            return Self::from_folder(root, image_size);
        }

        let mut paths = Vec::new();
        for class in classes {
            let dir = root.join(class);
            if !dir.is_dir() {
                return Err(DcganError::Dataset(format!(
                    "LSUN class directory {} not found",
                    dir.display()
                )));
            }
            let before = paths.len();
            collect_image_files(&dir, &mut paths)?;
            debug!("LSUN class {}: {} images", class, paths.len() - before);
        }
        paths.sort();

        if paths.is_empty() {
            return Err(DcganError::Dataset(format!(
                "no images found for LSUN classes {:?}",
                classes
            )));
        }

        Ok(Self::Files {
            paths,
            transform: ImageTransform::new(image_size as u32),
        })
    }

    /// Wrap an in-memory (N, C, H, W) tensor with values in [0, 1]
    pub fn from_tensor(images: Tensor, image_size: i64) -> Result<Self> {
        if images.dim() != 4 {
            return Err(DcganError::Dataset(format!(
                "expected a 4-D image tensor, got shape {:?}",
                images.size()
            )));
        }
        Ok(Self::Tensors {
            images: images.to_kind(Kind::Float),
            image_size,
        })
    }

    pub fn fake(len: usize, channels: i64, image_size: i64) -> Self {
        Self::Fake {
            len,
            channels,
            image_size,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Files { paths, .. } => paths.len(),
            Self::Tensors { images, .. } => images.size()[0] as usize,
            Self::Fake { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channels(&self) -> i64 {
        match self {
            Self::Files { .. } => 3,
            Self::Tensors { images, .. } => images.size()[1],
            Self::Fake { channels, .. } => *channels,
        }
    }

    pub fn image_size(&self) -> i64 {
        match self {
            Self::Files { transform, .. } => transform.image_size() as i64,
            Self::Tensors { image_size, .. } => *image_size,
            Self::Fake { image_size, .. } => *image_size,
        }
    }

    /// Assemble the images at `indices` into one CPU batch
    ///
    /// Files are decoded in parallel on `pool`.
    pub fn batch(&self, indices: &[usize], pool: &rayon::ThreadPool) -> Result<Tensor> {
        let n = indices.len() as i64;
        match self {
            Self::Files { paths, transform } => {
                let arrays = pool.install(|| {
                    indices
                        .par_iter()
                        .map(|&i| transform.load(&paths[i]))
                        .collect::<Result<Vec<_>>>()
                })?;

                let size = transform.image_size() as i64;
                let mut buffer = Vec::with_capacity((n * 3 * size * size) as usize);
                for array in &arrays {
                    buffer.extend(array.iter().copied());
                }
                Ok(Tensor::from_slice(&buffer).view([n, 3, size, size]))
            }
            Self::Tensors { images, image_size } => {
                let index: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
                let selected = images.index_select(0, &Tensor::from_slice(&index));
                Ok(normalize_tensor_batch(&selected, *image_size))
            }
            Self::Fake {
                channels,
                image_size,
                ..
            } => Ok(Tensor::rand(
                [n, *channels, *image_size, *image_size],
                (Kind::Float, Device::Cpu),
            ) * 2.0
                - 1.0),
        }
    }
}

/// The data root for `kind`, which must be present and exist
fn require_root(kind: DatasetKind, dataroot: Option<&Path>) -> Result<&Path> {
    let root = dataroot.ok_or_else(|| {
        DcganError::Config(format!("dataset '{}' requires a dataroot", kind))
    })?;
    if !root.exists() {
        return Err(DcganError::Dataset(format!(
            "dataroot {} does not exist",
            root.display()
        )));
    }
    Ok(root)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively collect image files below `dir`
fn collect_image_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_image_files(&path, out)?;
        } else if is_image_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    fn write_image(path: &Path, color: [u8; 3]) {
        RgbImage::from_pixel(40, 30, Rgb(color)).save(path).unwrap();
    }

    #[test]
    fn test_dataset_kind_parsing() {
        assert_eq!("folder".parse::<DatasetKind>().unwrap(), DatasetKind::Folder);
        assert_eq!("LSUN".parse::<DatasetKind>().unwrap(), DatasetKind::Lsun);
        assert_eq!("cifar10".parse::<DatasetKind>().unwrap(), DatasetKind::Cifar10);

        let err = "celeba".parse::<DatasetKind>().unwrap_err();
        assert!(err.to_string().contains("folder"));
    }

    #[test]
    fn test_channels() {
        assert_eq!(DatasetKind::Mnist.channels(), 1);
        assert_eq!(DatasetKind::Lsun.channels(), 3);
        assert!(!DatasetKind::Fake.requires_dataroot());
    }

    #[test]
    fn test_folder_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("faces");
        std::fs::create_dir_all(&nested).unwrap();
        write_image(&dir.path().join("a.png"), [255, 255, 255]);
        write_image(&nested.join("b.png"), [0, 0, 0]);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let dataset = ImageDataset::open(DatasetKind::Folder, Some(dir.path()), 16, &[]).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.channels(), 3);

        let batch = dataset.batch(&[0, 1], &pool()).unwrap();
        assert_eq!(batch.size(), vec![2, 3, 16, 16]);

        // Sorted order puts a.png (white) before faces/b.png (black)
        let white = batch.get(0).mean(Kind::Float).double_value(&[]);
        let black = batch.get(1).mean(Kind::Float).double_value(&[]);
        assert!((white - 1.0).abs() < 1e-2);
        assert!((black + 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_image_extensions() {
        assert!(is_image_file(Path::new("celeba/000001.jpg")));
        assert!(is_image_file(Path::new("scan.TIFF")));
        assert!(is_image_file(Path::new("bedroom/photo.JpEg")));
        assert!(!is_image_file(Path::new("list_attr.txt")));
        assert!(!is_image_file(Path::new("README")));
    }

    #[test]
    fn test_empty_folder_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageDataset::open(DatasetKind::Folder, Some(dir.path()), 64, &[]);
        assert!(matches!(result, Err(DcganError::Dataset(_))));
    }

    #[test]
    fn test_missing_dataroot() {
        let result = ImageDataset::open(DatasetKind::Lsun, None, 64, &[]);
        assert!(matches!(result, Err(DcganError::Config(_))));

        let result = ImageDataset::open(
            DatasetKind::Folder,
            Some(Path::new("/definitely/not/here")),
            64,
            &[],
        );
        assert!(matches!(result, Err(DcganError::Dataset(_))));
    }

    #[test]
    fn test_lsun_classes() {
        let dir = tempfile::tempdir().unwrap();
        for (class, count) in [("bedroom_train", 3), ("kitchen_train", 2)] {
            let class_dir = dir.path().join(class);
            std::fs::create_dir_all(&class_dir).unwrap();
            for i in 0..count {
                write_image(&class_dir.join(format!("{}.jpg", i)), [10, 20, 30]);
            }
        }

        let bedrooms = vec!["bedroom_train".to_string()];
        let dataset = ImageDataset::open(DatasetKind::Lsun, Some(dir.path()), 16, &bedrooms).unwrap();
        assert_eq!(dataset.len(), 3);

        let all = ImageDataset::open(DatasetKind::Lsun, Some(dir.path()), 16, &[]).unwrap();
        assert_eq!(all.len(), 5);

        let missing = vec!["church_outdoor_train".to_string()];
        assert!(ImageDataset::open(DatasetKind::Lsun, Some(dir.path()), 16, &missing).is_err());
    }

    #[test]
    fn test_corrupt_image_fails_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();

        let dataset = ImageDataset::from_folder(dir.path(), 16).unwrap();
        let result = dataset.batch(&[0], &pool());
        assert!(matches!(result, Err(DcganError::Image { .. })));
    }

    #[test]
    fn test_tensor_dataset() {
        let images = Tensor::rand([5, 1, 28, 28], (Kind::Float, Device::Cpu));
        let dataset = ImageDataset::from_tensor(images, 32).unwrap();
        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.channels(), 1);

        let batch = dataset.batch(&[4, 0, 2], &pool()).unwrap();
        assert_eq!(batch.size(), vec![3, 1, 32, 32]);

        assert!(ImageDataset::from_tensor(Tensor::rand([5, 28], (Kind::Float, Device::Cpu)), 32).is_err());
    }

    #[test]
    fn test_fake_dataset() {
        let dataset = ImageDataset::open(DatasetKind::Fake, None, 32, &[]).unwrap();
        assert_eq!(dataset.len(), FAKE_DATASET_LEN);

        let batch = dataset.batch(&[0, 1, 2, 3], &pool()).unwrap();
        assert_eq!(batch.size(), vec![4, 3, 32, 32]);
        assert!(batch.min().double_value(&[]) >= -1.0);
        assert!(batch.max().double_value(&[]) <= 1.0);
    }
}
