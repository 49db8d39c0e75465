//! ONNX inference for the TDT encoder and joint decoder.

use super::TokenDuration;
use super::core::TdtModel;
use crate::error::{ModelError, Result};
use ndarray::prelude::*;
use ndarray_stats::QuantileExt;
use ort::inputs;
use ort::value::{Tensor, Value};

/// Predictor LSTM shape: (layers, batch, hidden).
const STATE_SHAPE: (usize, usize, usize) = (2, 1, 640);

/// Upper bound on tokens emitted without advancing a frame.
const MAX_SYMBOLS_PER_STEP: usize = 10;

fn missing(name: &str) -> ModelError {
    ModelError::MissingOutput {
        name: name.to_string(),
    }
}

impl TdtModel {
    /// Run the encoder over features shaped `(frames, n_mels)`.
    ///
    /// Returns encoder output shaped `(1, hidden, encoded_frames)` and the
    /// number of valid encoded frames.
    pub(super) fn encode(&mut self, features: Array2<f32>) -> Result<(Array3<f32>, usize)> {
        let length = Value::from_array(Array1::from_elem((1,), features.nrows() as i64))?;
        let signal = Value::from_array(features.reversed_axes().insert_axis(Axis(0)))?;

        let mut outputs = self.encoder.run(inputs!(
            "audio_signal" => signal,
            "length" => length,
        ))?;

        let encoded = outputs
            .remove("outputs")
            .ok_or_else(|| missing("outputs"))?
            .try_extract_array()?
            .to_owned()
            .into_dimensionality::<Ix3>()?;

        let lengths = outputs
            .remove("encoded_lengths")
            .ok_or_else(|| missing("encoded_lengths"))?
            .try_extract_array::<i64>()?
            .to_owned()
            .into_dimensionality::<Ix1>()?;

        let valid = (lengths.first().copied().unwrap_or(0).max(0) as usize)
            .min(encoded.len_of(Axis(2)));

        Ok((encoded, valid))
    }

    /// Greedy token-and-duration decoding with label looping.
    pub(super) fn greedy_decode(
        &mut self,
        encoded: &Array3<f32>,
        encoded_frames: usize,
    ) -> Result<Vec<TokenDuration>> {
        let blank_id = self.vocab.blank_id();

        let mut state_1 = Tensor::from_array(Array3::<f32>::zeros(STATE_SHAPE))?.into_dyn();
        let mut state_2 = Tensor::from_array(Array3::<f32>::zeros(STATE_SHAPE))?.into_dyn();

        let mut target = Tensor::from_array(Array2::from_elem((1, 1), blank_id as i32))?;
        let target_length = Tensor::from_array(Array1::from_elem((1,), 1_i32))?;

        let mut tokens = Vec::new();
        let mut frame_index = 0;

        while frame_index < encoded_frames {
            let frame = Tensor::from_array(
                encoded
                    .slice_axis(Axis(2), (frame_index..frame_index + 1).into())
                    .into_owned(),
            )?;

            let mut advanced = false;

            for _ in 0..MAX_SYMBOLS_PER_STEP {
                let mut outputs = self.decoder_joint.run(inputs!(
                    "encoder_outputs" => &frame,
                    "targets" => &target,
                    "target_length" => &target_length,
                    "input_states_1" => &state_1,
                    "input_states_2" => &state_2
                ))?;

                let logits: ArrayViewD<f32> = outputs["outputs"].try_extract_array()?;
                let logits = logits.flatten();

                // [piece_0 .. piece_n, blank, duration_0 .. duration_k]
                let token_id = logits.slice(s![..=blank_id]).argmax()?;
                let duration_idx = logits.slice(s![blank_id + 1..]).argmax()?;

                let skip = self.durations.get(duration_idx).copied().ok_or(
                    ModelError::DurationIndexOutOfBounds {
                        index: duration_idx,
                        max: self.durations.len().saturating_sub(1),
                    },
                )?;

                if token_id != blank_id {
                    state_1 = outputs
                        .remove("output_states_1")
                        .ok_or_else(|| missing("output_states_1"))?;
                    state_2 = outputs
                        .remove("output_states_2")
                        .ok_or_else(|| missing("output_states_2"))?;

                    tokens.push(TokenDuration::new(token_id, frame_index, skip));
                    target[[0, 0]] = token_id as i32;
                }

                tracing::trace!(frame_index, token_id, skip);

                if skip > 0 {
                    frame_index = encoded_frames.min(frame_index + skip);
                    advanced = true;
                    break;
                }
            }

            if !advanced {
                frame_index += 1;
            }
        }

        Ok(tokens)
    }
}
