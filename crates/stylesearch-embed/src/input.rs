//! Model inputs: device choice and tokenized tensors.
use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;
use tracing::info;

/// Metal when built with the `metal` feature and a GPU is present, CPU otherwise.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!(device = "metal", "sentence encoder device");
                return device;
            }
            Err(e) => tracing::warn!(error = %e, "metal unavailable, falling back to cpu"),
        }
    }
    info!(device = "cpu", "sentence encoder device");
    Device::Cpu
}

/// Token ids and attention mask for one text, both shaped `[1, n]`.
pub struct EncodedInput {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
}

impl EncodedInput {
    /// Tokenize `text` with special tokens, truncated to `max_len` tokens.
    /// Single sequences are not padded.
    pub fn new(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<Self> {
        let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {e}"))?;
        let len = enc.get_ids().len().min(max_len);
        let ids = enc.get_ids()[..len].to_vec();
        let mask = enc.get_attention_mask()[..len].to_vec();
        Ok(Self {
            input_ids: Tensor::from_vec(ids, (1, len), device)?,
            attention_mask: Tensor::from_vec(mask, (1, len), device)?,
        })
    }

    pub fn token_type_ids(&self) -> Result<Tensor> { Ok(self.input_ids.zeros_like()?) }
}
