/*
 * @file audio.rs
 * @brief Microphone capture and WAV encoding
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Audio capture and WAV helpers.
//!
//! This module records microphone input with CPAL, normalizes it to the
//! 16 kHz mono layout transcription services expect, and encodes WAV in memory.

use std::io::Cursor;

use anyhow::{Context, Result};
use hound::{WavSpec, WavWriter};

/// Sample rate sent to the transcription service (16kHz).
pub const SAMPLE_RATE: u32 = 16000;

/// Number of audio channels (mono).
const CHANNELS: u16 = 1;

/// Bits per sample for WAV encoding.
const BITS_PER_SAMPLE: u16 = 16;

/// Minimum RMS amplitude considered speech.
///
/// Values much above ~300 miss normal speaking levels on some microphones, so
/// we bias toward a lower threshold and let the transcriber reject noise.
const SILENCE_RMS_THRESHOLD: f32 = 150.0;

/// Records audio from the default input device for `duration`.
///
/// # Details
/// Captures at the device's native format, then down-mixes to mono and
/// resamples to [`SAMPLE_RATE`]. Blocks the calling thread for the whole
/// capture, so async callers should run it on a blocking thread.
///
/// # Returns
/// 16-bit PCM mono samples at [`SAMPLE_RATE`].
///
/// # Errors
/// Returns an error if no input device is available, the device reports an
/// unsupported sample format, or the stream cannot be created.
#[cfg(feature = "microphone")]
pub fn record_audio(duration: std::time::Duration) -> Result<Vec<i16>> {
    use cpal::traits::{DeviceTrait, StreamTrait};
    use std::sync::{Arc, Mutex};

    let device = capture::default_input_device()?;
    let supported = device
        .default_input_config()
        .context("Failed to query input format")?;
    let channels = supported.channels();
    let native_rate = supported.sample_rate().0;
    let samples = Arc::new(Mutex::new(Vec::new()));
    let stream = capture::build_input_stream(
        &device,
        &supported.config(),
        supported.sample_format(),
        samples.clone(),
    )?;
    stream.play().context("Failed to start input stream")?;
    std::thread::sleep(duration);
    drop(stream);
    let captured = samples
        .lock()
        .map(|guard| guard.clone())
        .map_err(|_| anyhow::anyhow!("Sample buffer poisoned"))?;
    let mono = downmix(&captured, channels);
    Ok(to_pcm16(&resample(&mono, native_rate, SAMPLE_RATE)))
}

#[cfg(feature = "microphone")]
mod capture {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use cpal::traits::{DeviceTrait, HostTrait};
    use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig, StreamError};

    pub(super) fn default_input_device() -> Result<Device> {
        cpal::default_host()
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No input device"))
    }

    pub(super) fn build_input_stream(
        device: &Device,
        config: &StreamConfig,
        format: SampleFormat,
        samples: Arc<Mutex<Vec<f32>>>,
    ) -> Result<Stream> {
        match format {
            SampleFormat::F32 => build_typed_stream::<f32>(device, config, samples),
            SampleFormat::I16 => build_typed_stream::<i16>(device, config, samples),
            SampleFormat::U16 => build_typed_stream::<u16>(device, config, samples),
            other => anyhow::bail!("Unsupported input sample format: {other}"),
        }
    }

    fn build_typed_stream<T>(
        device: &Device,
        config: &StreamConfig,
        samples: Arc<Mutex<Vec<f32>>>,
    ) -> Result<Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| push_samples(&samples, data),
                log_stream_error,
                None,
            )
            .map_err(|err| anyhow::anyhow!(err))
    }

    fn push_samples<T>(buffer: &Mutex<Vec<f32>>, data: &[T])
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        if let Ok(mut guard) = buffer.lock() {
            guard.extend(data.iter().map(|&sample| f32::from_sample(sample)));
        }
    }

    fn log_stream_error(error: StreamError) {
        tracing::warn!("Audio stream error: {}", error);
    }
}

/// Returns `true` when the RMS energy of `samples` suggests someone spoke.
pub fn contains_speech(samples: &[i16]) -> bool {
    if samples.is_empty() {
        return false;
    }
    let energy = samples
        .iter()
        .map(|sample| (*sample as f32).powi(2))
        .sum::<f32>()
        / samples.len() as f32;
    energy.sqrt() >= SILENCE_RMS_THRESHOLD
}

/// Encodes mono 16 kHz samples as an in-memory WAV file.
///
/// # Errors
/// Returns an error if the WAV writer fails.
pub fn encode_wav(samples: &[i16]) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut buffer, spec).context("Failed to start WAV")?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize().context("Failed to finish WAV")?;
    }
    Ok(buffer.into_inner())
}

/// Averages interleaved frames down to a single channel.
pub fn downmix(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linearly resamples `input` from `from_rate` to `to_rate`.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }
    let ratio = from_rate as f32 / to_rate as f32;
    let output_len = (input.len() as f32 / ratio) as usize;
    (0..output_len)
        .map(|i| sample_at_position(input, i as f32 * ratio))
        .collect()
}

fn sample_at_position(input: &[f32], pos: f32) -> f32 {
    let idx = pos as usize;
    if idx + 1 < input.len() {
        let frac = pos - idx as f32;
        input[idx] * (1.0 - frac) + input[idx + 1] * frac
    } else if idx < input.len() {
        input[idx]
    } else {
        0.0
    }
}

fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_speech_requires_energy() {
        assert!(!contains_speech(&[]));
        assert!(!contains_speech(&[0_i16; 1600]));
        assert!(contains_speech(&vec![i16::MAX / 2; 1600]));
    }

    #[test]
    fn encode_wav_produces_readable_file() {
        let samples = vec![0_i16, i16::MAX / 2, -i16::MAX / 2];
        let bytes = encode_wav(&samples).expect("encode wav");
        assert_eq!(&bytes[..4], b"RIFF");
        let reader = hound::WavReader::new(Cursor::new(bytes)).expect("read wav");
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.channels, 1);
        assert_eq!(reader.len(), 3);
    }

    #[test]
    fn downmix_averages_frames() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5, 0.0]);
        assert_eq!(downmix(&[0.25, 0.75], 1), vec![0.25, 0.75]);
    }

    #[test]
    fn resample_changes_length_by_ratio() {
        let input = vec![0.0_f32; 48_000];
        assert_eq!(resample(&input, 48_000, SAMPLE_RATE).len(), 16_000);
        assert_eq!(resample(&input, SAMPLE_RATE, SAMPLE_RATE).len(), 48_000);
    }

    #[test]
    fn resample_interpolates_between_samples() {
        let output = resample(&[0.0, 1.0, 0.0, 1.0], 2, 4);
        assert_eq!(output.len(), 8);
        assert!((output[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pcm_conversion_clamps() {
        let pcm = to_pcm16(&[0.0, 2.0, -2.0]);
        assert_eq!(pcm[0], 0);
        assert_eq!(pcm[1], i16::MAX);
        assert_eq!(pcm[2], -i16::MAX);
    }
}
