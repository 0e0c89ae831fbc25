use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage};
use tch::{CModule, Device, Kind, Tensor};
use tokenizers::Tokenizer;

use crate::core::scorer::Scorer;
use crate::error::{AppError, Result};

/// CLIP text context length
pub const MAX_TEXT_TOKENS: usize = 77;

/// Per-channel normalization used by every CLIP image processor.
const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

const END_OF_TEXT: &str = "<|endoftext|>";

/// In-process CLIP scorer running a TorchScript export of the model.
///
/// The model directory must contain `model.pt`, whose forward takes
/// `(input_ids, attention_mask, pixel_values)` and returns `logits_per_image`,
/// and the matching HuggingFace `tokenizer.json`.
#[derive(Clone)]
pub struct ClipScorer {
    inner: Arc<ClipInner>,
}

struct ClipInner {
    module: Mutex<CModule>,
    tokenizer: Tokenizer,
    device: Device,
    image_size: u32,
    pad_id: u32,
}

impl std::fmt::Debug for ClipScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipScorer")
            .field("device", &self.inner.device)
            .field("image_size", &self.inner.image_size)
            .finish()
    }
}

impl ClipScorer {
    /// Load the model and tokenizer from `model_dir`.
    pub fn load(model_dir: &Path, image_size: u32) -> Result<Self> {
        let model_path = model_dir.join("model.pt");
        let tokenizer_path = model_dir.join("tokenizer.json");

        for path in [&model_path, &tokenizer_path] {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "CLIP model file not found at {}",
                    path.display()
                )));
            }
        }

        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(&model_path, device)
            .context(format!("loading {}", model_path.display()))?;
        module.set_eval();

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("loading {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.token_to_id(END_OF_TEXT).unwrap_or(0);

        log::info!(
            "Loaded CLIP model from {} on {:?}",
            model_dir.display(),
            device
        );

        Ok(Self {
            inner: Arc::new(ClipInner {
                module: Mutex::new(module),
                tokenizer,
                device,
                image_size,
                pad_id,
            }),
        })
    }
}

impl ClipInner {
    fn logits(&self, image: &DynamicImage, labels: &[String]) -> anyhow::Result<Vec<f32>> {
        let (ids, mask) = self.tokenize(labels)?;
        let batch = labels.len() as i64;
        let seq = MAX_TEXT_TOKENS as i64;

        let input_ids = Tensor::of_slice(&ids)
            .reshape(&[batch, seq])
            .to_device(self.device);
        let attention_mask = Tensor::of_slice(&mask)
            .reshape(&[batch, seq])
            .to_device(self.device);

        let size = self.image_size as i64;
        let pixel_values = Tensor::of_slice(&pixel_values(image, self.image_size))
            .reshape(&[1, 3, size, size])
            .to_kind(Kind::Float)
            .to_device(self.device);

        let module = self
            .module
            .lock()
            .map_err(|_| anyhow!("CLIP module lock poisoned"))?;
        let output = tch::no_grad(|| module.forward_ts(&[input_ids, attention_mask, pixel_values]))?;

        // logits_per_image is [1, labels]
        let logits = output.to_kind(Kind::Float).to_device(Device::Cpu).flatten(0, -1);
        Ok(Vec::<f32>::try_from(logits)?)
    }

    /// Token ids and attention mask, each padded or truncated to the CLIP context length.
    fn tokenize(&self, labels: &[String]) -> anyhow::Result<(Vec<i64>, Vec<i64>)> {
        let encodings = self
            .tokenizer
            .encode_batch(labels.to_vec(), true)
            .map_err(|e| anyhow!("tokenization failed: {}", e))?;

        let rows: Vec<(&[u32], &[u32])> = encodings
            .iter()
            .map(|e| (e.get_ids(), e.get_attention_mask()))
            .collect();
        Ok(pack_tokens(&rows, self.pad_id))
    }
}

/// Lay out `(ids, attention_mask)` rows as flat `[rows, MAX_TEXT_TOKENS]` buffers.
///
/// Positions the tokenizer masked out (padding baked into `tokenizer.json`)
/// are replaced by `pad_id` and stay masked.
fn pack_tokens(rows: &[(&[u32], &[u32])], pad_id: u32) -> (Vec<i64>, Vec<i64>) {
    let mut ids = vec![pad_id as i64; rows.len() * MAX_TEXT_TOKENS];
    let mut mask = vec![0i64; rows.len() * MAX_TEXT_TOKENS];

    for (i, (token_ids, token_mask)) in rows.iter().enumerate() {
        let row = i * MAX_TEXT_TOKENS;
        for (j, (&id, &m)) in token_ids
            .iter()
            .zip(token_mask.iter())
            .take(MAX_TEXT_TOKENS)
            .enumerate()
        {
            if m != 0 {
                ids[row + j] = id as i64;
                mask[row + j] = 1;
            }
        }
        // Keep the end-of-text marker when truncating
        if token_ids.len() > MAX_TEXT_TOKENS {
            if let Some(&last) = token_ids.last() {
                ids[row + MAX_TEXT_TOKENS - 1] = last as i64;
            }
        }
    }

    (ids, mask)
}

/// CLIP image preprocessing: resize to fill `size`x`size` with a center crop,
/// scale to [0, 1], normalize per channel, and lay out planar CHW.
pub fn pixel_values(image: &DynamicImage, size: u32) -> Vec<f32> {
    let resized = image.resize_to_fill(size, size, FilterType::CatmullRom);
    let rgb = resized.to_rgb8();

    let plane = (size * size) as usize;
    let mut data = vec![0f32; plane * 3];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = (y * size + x) as usize;
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            data[c * plane + offset] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }
    data
}

#[async_trait]
impl Scorer for ClipScorer {
    fn name(&self) -> &str {
        "clip"
    }

    async fn score(&self, image: &DynamicImage, labels: &[String]) -> Result<Vec<f32>> {
        let inner = Arc::clone(&self.inner);
        let image = image.clone();
        let labels = labels.to_vec();

        tokio::task::spawn_blocking(move || inner.logits(&image, &labels))
            .await?
            .map_err(|e| AppError::Scoring(format!("{:#}", e)))
    }
}
