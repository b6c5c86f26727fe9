use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};

use super::{SampleChunk, CHUNK_SIZE};

/// Owns the input stream and frames incoming audio into fixed-size mono
/// chunks. The capture callback runs on the audio driver's thread; chunks
/// cross over to the processing thread through a channel.
pub struct AudioCapture {
    #[allow(dead_code)]
    stream: Stream,
    sample_rate: f32,
    receiver: Receiver<SampleChunk>,
}

impl AudioCapture {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("no input device available"))?;

        let config = device
            .default_input_config()
            .map_err(|e| anyhow!("failed to get default input config: {}", e))?;

        info!(
            "using audio device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );
        info!("audio config: {:?}", config);

        let sample_rate = config.sample_rate().0 as f32;
        let (sender, receiver) = crossbeam_channel::unbounded();

        let stream = Self::create_input_stream(&device, &config.into(), sender)?;
        stream.play()?;

        Ok(Self {
            stream,
            sample_rate,
            receiver,
        })
    }

    fn create_input_stream(
        device: &Device,
        config: &StreamConfig,
        sender: Sender<SampleChunk>,
    ) -> Result<Stream> {
        let channels = config.channels as usize;
        info!(
            "creating input stream with {} channels at {} Hz",
            channels, config.sample_rate.0
        );

        let mut pending: SampleChunk = Vec::with_capacity(CHUNK_SIZE);
        let stream = device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    let mixed = frame.iter().sum::<f32>() / channels as f32;
                    pending.push((mixed.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);

                    if pending.len() == CHUNK_SIZE {
                        let chunk = std::mem::replace(&mut pending, Vec::with_capacity(CHUNK_SIZE));
                        if sender.send(chunk).is_err() {
                            warn!("failed to send audio chunk");
                        }
                    }
                }
            },
            |err| {
                warn!("audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Receiver end of the chunk channel, for the processing thread.
    pub fn receiver(&self) -> Receiver<SampleChunk> {
        self.receiver.clone()
    }
}
