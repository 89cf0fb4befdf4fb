//! Microphone audio capture using cpal.
//!
//! Captures audio at the device's native sample rate and downsamples
//! to the configured mono rate (16kHz by default) for the endpointer.
//!
//! The cpal stream lives on its own capture thread for as long as the
//! microphone is open, so [`CpalMicrophone`] itself can be moved onto the
//! speech input thread.

use crate::config::SpeechConfig;
use crate::error::{AgentError, Result};
use crate::speech::Microphone;
use crate::speech::messages::AudioChunk;
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Chunks buffered between the audio callback and the reader.
const CHUNK_QUEUE: usize = 256;

/// How long `read_chunk` waits before handing back an empty chunk, so the
/// reader gets a chance to look at its stop flag in a silent room.
const READ_POLL: Duration = Duration::from_millis(200);

/// The running capture thread of an open microphone.
struct ActiveCapture {
    chunks: Receiver<AudioChunk>,
    /// Dropping this tells the capture thread to release the stream.
    release: Sender<()>,
    thread: JoinHandle<()>,
}

/// System microphone behind the [`Microphone`] trait.
pub struct CpalMicrophone {
    device_name: Option<String>,
    target_sample_rate: u32,
    active: Option<ActiveCapture>,
}

impl CpalMicrophone {
    /// Create a microphone for the configured (or default) input device.
    ///
    /// Nothing is opened until [`Microphone::open`].
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            device_name: config.input_device.clone(),
            target_sample_rate: config.input_sample_rate,
            active: None,
        }
    }

    /// List available input devices.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_input_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| AgentError::Audio(format!("cannot enumerate devices: {e}")))?;

        let mut names = Vec::new();
        for device in devices {
            if let Ok(desc) = device.description() {
                names.push(desc.name().to_owned());
            }
        }
        Ok(names)
    }
}

impl Microphone for CpalMicrophone {
    fn open(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }
        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(CHUNK_QUEUE);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let device_name = self.device_name.clone();
        let target_rate = self.target_sample_rate;

        let thread = std::thread::Builder::new()
            .name("hal-capture".into())
            .spawn(move || {
                match start_stream(device_name.as_deref(), target_rate, chunk_tx) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        // Blocks until the sender is dropped by `close`.
                        let _ = release_rx.recv();
                        drop(stream);
                        debug!("capture stream released");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.active = Some(ActiveCapture {
                    chunks: chunk_rx,
                    release: release_tx,
                    thread,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AgentError::Audio("capture thread exited during startup".into()))
            }
        }
    }

    fn read_chunk(&mut self) -> Result<Option<AudioChunk>> {
        let Some(active) = self.active.as_ref() else {
            return Err(AgentError::Audio("microphone is not open".into()));
        };
        match active.chunks.recv_timeout(READ_POLL) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(Some(AudioChunk {
                samples: Vec::new(),
                sample_rate: self.target_sample_rate,
                captured_at: Instant::now(),
            })),
            Err(RecvTimeoutError::Disconnected) => {
                Err(AgentError::Audio("audio input stream ended".into()))
            }
        }
    }

    fn close(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        drop(active.release);
        if active.thread.join().is_err() {
            warn!("capture thread panicked");
        }
        drop(active.chunks);
    }
}

impl Drop for CpalMicrophone {
    fn drop(&mut self) {
        self.close();
    }
}

/// Resolve the device, build the input stream and start it.
fn start_stream(
    device_name: Option<&str>,
    target_rate: u32,
    tx: Sender<AudioChunk>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();

    let device = if let Some(name) = device_name {
        host.input_devices()
            .map_err(|e| AgentError::Audio(format!("cannot enumerate devices: {e}")))?
            .find(|d| {
                d.description()
                    .ok()
                    .map(|desc| desc.name() == name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| AgentError::Audio(format!("input device '{name}' not found")))?
    } else {
        host.default_input_device()
            .ok_or_else(|| AgentError::Audio("no default input device".into()))?
    };

    let label = device
        .description()
        .map(|d| d.name().to_owned())
        .unwrap_or_else(|_| "<unknown>".into());

    // Use the device's default config for best compatibility
    let default_config = device
        .default_input_config()
        .map_err(|e| AgentError::Audio(format!("no default input config: {e}")))?;

    let native_rate = default_config.sample_rate();
    let native_channels = default_config.channels();

    let stream_config = StreamConfig {
        channels: native_channels,
        sample_rate: native_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono = if native_channels > 1 {
                    to_mono(data, native_channels)
                } else {
                    data.to_vec()
                };

                let samples = if native_rate != target_rate {
                    downsample(&mono, native_rate, target_rate)
                } else {
                    mono
                };

                let chunk = AudioChunk {
                    samples,
                    sample_rate: target_rate,
                    captured_at: Instant::now(),
                };
                // Never block the audio thread.
                if tx.try_send(chunk).is_err() {
                    debug!("audio queue full, dropping chunk");
                }
            },
            move |err| {
                error!("audio input stream error: {err}");
            },
            None,
        )
        .map_err(|e| AgentError::Audio(format!("failed to build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| AgentError::Audio(format!("failed to start input stream: {e}")))?;

    info!("microphone open: {label}, {native_rate}Hz x{native_channels} -> {target_rate}Hz mono");
    Ok(stream)
}

/// Convert interleaved multi-channel audio to mono by averaging channels.
fn to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    let ch = channels as usize;
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Simple linear-interpolation downsampler.
///
/// Speech energy sits below 8kHz, so no anti-alias filter is applied.
fn downsample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = src_rate as f64 / dst_rate as f64;
    let out_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] as f64 * (1.0 - frac) + samples[idx + 1] as f64 * frac
        } else {
            samples[idx.min(samples.len() - 1)] as f64
        };

        output.push(sample as f32);
    }

    output
}
