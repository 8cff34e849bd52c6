//! CLIP text encoder for prompt embeddings.
//!
//! Loads the CLIP text ONNX model and its tokenizer, encodes prompts to
//! vectors in the same space as the vision encoder.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::error::PipelineError;

/// CLIP pads with its end-of-text token.
const PAD_TOKEN: &str = "<|endoftext|>";

const TEXT_EMBEDS: &str = "text_embeds";

/// CLIP text encoder wrapper.
///
/// Uses the same `Mutex<Session>` pattern as the vision encoder.
pub struct ClipTextEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    /// Whether the export takes an `attention_mask` input.
    uses_attention_mask: bool,
}

impl ClipTextEncoder {
    /// Load the text encoder and tokenizer.
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        max_length: usize,
    ) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load text model {:?}: {e}", model_path),
            })?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| PipelineError::Model {
            message: format!("Failed to load tokenizer: {e}"),
        })?;

        let pad_id = tokenizer
            .token_to_id(PAD_TOKEN)
            .ok_or_else(|| PipelineError::Model {
                message: format!("Tokenizer has no {PAD_TOKEN} token"),
            })?;

        tokenizer
            .with_padding(Some(PaddingParams {
                strategy: PaddingStrategy::BatchLongest,
                pad_id,
                pad_token: PAD_TOKEN.to_string(),
                ..Default::default()
            }))
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to configure tokenizer: {e}"),
            })?;

        let uses_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        tracing::debug!(
            "Loaded CLIP text encoder (inputs: {:?}, outputs: {:?})",
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            uses_attention_mask,
        })
    }

    /// Encode a batch of prompts to L2-normalized embeddings, one per prompt.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = texts.len();
        if batch_size == 0 {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| PipelineError::Scoring {
                message: format!("Tokenization failed: {e}"),
            })?;

        // BatchLongest padding gives every encoding the same length.
        let seq_len = encodings.first().map(|e| e.len()).unwrap_or(0);
        let input_ids: Vec<i64> = encodings
            .iter()
            .flat_map(|e| e.get_ids().iter().map(|&id| i64::from(id)))
            .collect();
        let attention_mask: Vec<i64> = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().iter().map(|&m| i64::from(m)))
            .collect();

        if input_ids.len() != batch_size * seq_len {
            return Err(PipelineError::Scoring {
                message: "Tokenizer produced ragged encodings".to_string(),
            });
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let ids_value = Value::from_array((shape.clone(), input_ids)).map_err(|e| {
            PipelineError::Scoring {
                message: format!("Failed to create input_ids tensor: {e}"),
            }
        })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Scoring {
            message: format!("Text encoder lock poisoned: {e}"),
        })?;

        let outputs = if self.uses_attention_mask {
            let mask_value =
                Value::from_array((shape, attention_mask)).map_err(|e| PipelineError::Scoring {
                    message: format!("Failed to create attention_mask tensor: {e}"),
                })?;
            session.run(ort::inputs![
                "input_ids" => ids_value,
                "attention_mask" => mask_value,
            ])
        } else {
            session.run(ort::inputs!["input_ids" => ids_value])
        }
        .map_err(|e| PipelineError::Scoring {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        let embeds = outputs
            .iter()
            .find(|(name, _)| *name == TEXT_EMBEDS)
            .or_else(|| outputs.iter().next())
            .ok_or_else(|| PipelineError::Scoring {
                message: "Text encoder produced no outputs".to_string(),
            })?;

        let (_shape, data) =
            embeds
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Scoring {
                    message: format!("Failed to extract {} tensor: {e}", embeds.0),
                })?;

        if data.is_empty() || data.len() % batch_size != 0 {
            return Err(PipelineError::Scoring {
                message: format!(
                    "Text embeddings of length {} do not split into {batch_size} rows",
                    data.len()
                ),
            });
        }
        let dim = data.len() / batch_size;

        Ok(data.chunks(dim).map(crate::math::l2_normalize).collect())
    }
}
