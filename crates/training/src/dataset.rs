//! Class-folder image dataset: `root/<class>/*.png|jpg|jpeg|bmp` with exactly
//! two classes, split per class into train/validation subsets.

use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vision_core::interfaces::{ClassifierError, SegmentationProvider};
use vision_core::preprocess::{apply_mask, resize_square, to_chw};

use crate::aug::AugmentConfig;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("expected exactly two class folders under {root}, found {found:?}")]
    ClassLayout { root: PathBuf, found: Vec<String> },
    #[error("positive class `{class}` not found under {root}")]
    MissingPositiveClass { class: String, root: PathBuf },
    #[error("class folder {path} contains no images")]
    EmptyClass { path: PathBuf },
    #[error("validation split {0} must be in [0, 1)")]
    InvalidSplit(f32),
    #[error("cannot load an empty batch")]
    EmptyBatch,
    #[error("failed to read tensor data: {0}")]
    TensorData(String),
    #[error(transparent)]
    Preprocess(#[from] ClassifierError),
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub root: PathBuf,
    /// Folder name mapped to label 1.0.
    pub positive_class: String,
    /// Fraction of each class held out for validation.
    pub validation_split: f32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dataset"),
            positive_class: "abnormal".to_string(),
            validation_split: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    pub path: PathBuf,
    /// 1.0 for the positive class, 0.0 otherwise.
    pub label: f32,
}

#[derive(Debug, Clone)]
pub struct ClassFolderDataset {
    /// Class folder names, sorted.
    pub classes: Vec<String>,
    pub train: Vec<LabeledImage>,
    pub validation: Vec<LabeledImage>,
}

impl ClassFolderDataset {
    /// Indexes the dataset. Files are sorted per class and the first
    /// `floor(n * validation_split)` of each class form the validation subset.
    pub fn load(cfg: &DatasetConfig) -> Result<Self, DatasetError> {
        if !(0.0..1.0).contains(&cfg.validation_split) {
            return Err(DatasetError::InvalidSplit(cfg.validation_split));
        }
        let mut classes = Vec::new();
        for entry in read_dir_sorted(&cfg.root)? {
            if entry.is_dir() {
                if let Some(name) = entry.file_name().and_then(|s| s.to_str()) {
                    classes.push(name.to_string());
                }
            }
        }
        if classes.len() != 2 {
            return Err(DatasetError::ClassLayout {
                root: cfg.root.clone(),
                found: classes,
            });
        }
        if !classes.iter().any(|c| c == &cfg.positive_class) {
            return Err(DatasetError::MissingPositiveClass {
                class: cfg.positive_class.clone(),
                root: cfg.root.clone(),
            });
        }

        let mut train = Vec::new();
        let mut validation = Vec::new();
        for class in &classes {
            let dir = cfg.root.join(class);
            let files: Vec<PathBuf> = read_dir_sorted(&dir)?
                .into_iter()
                .filter(|p| is_image(p))
                .collect();
            if files.is_empty() {
                return Err(DatasetError::EmptyClass { path: dir });
            }
            let label = if class == &cfg.positive_class { 1.0 } else { 0.0 };
            let holdout = (files.len() as f32 * cfg.validation_split).floor() as usize;
            for (i, path) in files.into_iter().enumerate() {
                let sample = LabeledImage { path, label };
                if i < holdout {
                    validation.push(sample);
                } else {
                    train.push(sample);
                }
            }
        }
        tracing::info!(
            root = %cfg.root.display(),
            ?classes,
            train = train.len(),
            validation = validation.len(),
            "indexed dataset"
        );
        Ok(Self {
            classes,
            train,
            validation,
        })
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        out.push(entry.map_err(io_err)?.path());
    }
    out.sort();
    Ok(out)
}

fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
}

fn decode(path: &Path) -> Result<RgbImage, DatasetError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| DatasetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Images `[batch, 3, side, side]` in 0..1 and labels `[batch, 1]`.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub labels: Tensor<B, 2>,
}

/// Turns labeled image paths into tensors: decode, optional background mask,
/// augmentation (training batches only), square resize, CHW normalization.
pub struct BatchLoader {
    input_size: u32,
    augment: Option<AugmentConfig>,
    segmenter: Option<Box<dyn SegmentationProvider>>,
    rng: StdRng,
}

impl BatchLoader {
    pub fn new(input_size: u32, seed: u64) -> Self {
        Self {
            input_size,
            augment: None,
            segmenter: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_augment(mut self, augment: AugmentConfig) -> Self {
        self.augment = Some(augment);
        self
    }

    pub fn with_segmenter(mut self, segmenter: Box<dyn SegmentationProvider>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Decodes, masks and (when `train`) augments one sample.
    pub fn prepare(&mut self, path: &Path, train: bool) -> Result<RgbImage, DatasetError> {
        let img = decode(path)?;
        self.finish(img, train)
    }

    fn finish(&mut self, mut img: RgbImage, train: bool) -> Result<RgbImage, DatasetError> {
        if let Some(segmenter) = self.segmenter.as_mut() {
            let mask = segmenter.segment(&img)?;
            img = apply_mask(&img, &mask)?;
        }
        if train {
            if let Some(augment) = &self.augment {
                img = augment.apply(img, &mut self.rng);
            }
        }
        Ok(resize_square(&img, self.input_size))
    }

    pub fn load<B: Backend>(
        &mut self,
        samples: &[LabeledImage],
        train: bool,
        device: &B::Device,
    ) -> Result<ImageBatch<B>, DatasetError> {
        if samples.is_empty() {
            return Err(DatasetError::EmptyBatch);
        }
        let side = self.input_size as usize;
        let mut image_buf = Vec::with_capacity(samples.len() * 3 * side * side);
        let mut label_buf = Vec::with_capacity(samples.len());
        // Decode in parallel; masking and augmentation stay sequential on the seeded rng.
        let decoded: Vec<Result<RgbImage, DatasetError>> =
            samples.par_iter().map(|s| decode(&s.path)).collect();
        for (sample, img) in samples.iter().zip(decoded) {
            let img = self.finish(img?, train)?;
            image_buf.extend(to_chw(&img));
            label_buf.push(sample.label);
        }
        let n = samples.len();
        let images =
            Tensor::<B, 4>::from_data(TensorData::new(image_buf, [n, 3, side, side]), device);
        let labels = Tensor::<B, 2>::from_data(TensorData::new(label_buf, [n, 1]), device);
        Ok(ImageBatch { images, labels })
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
