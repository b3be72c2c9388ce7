//! CPAL audio output.
//!
//! Opens an output stream and drives a [`Renderer`] from its data callback.
//! The device may ask for any number of frames per callback; the stream keeps
//! one rendered block around and hands it out frame by frame, so the
//! renderer always sees exactly one block per call.

use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, warn};

use crate::callback::{RenderSample, Renderer};
use crate::compat::{Arc, AtomicUsize, Ordering};
use crate::config::EngineConfig;
use crate::{Error, Result};

/// Block periods to wait for the first data callback of a new stream.
const FIRST_CALLBACK_BLOCKS: u32 = 8;

const MIN_FIRST_CALLBACK_WAIT: Duration = Duration::from_millis(100);

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` due to platform internals. This is safe because
/// `AudioOutput` is only accessed behind a `Mutex` in `Engine`.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

unsafe impl Send for StreamHandle {}

/// A running output stream.
pub struct AudioOutput {
    sample_rate: u32,
    channels: usize,
    block_size: usize,
    device_name: String,
    _stream: StreamHandle,
}

impl AudioOutput {
    /// Open the configured device and start rendering into it.
    pub(crate) fn open(config: &EngineConfig, renderer: Renderer) -> Result<Self> {
        let device = get_device(config.output_device_index)?;
        let device_name = device.name()?;
        let supported = select_config(&device, config.sample_rate)?;
        let sample_rate = supported.sample_rate().0;
        let format = supported.sample_format();
        let base_config: cpal::StreamConfig = supported.config();
        let first_callback_timeout =
            (config.block_period() * FIRST_CALLBACK_BLOCKS).max(MIN_FIRST_CALLBACK_WAIT);

        let start = |buffer_size: cpal::BufferSize| -> Result<(cpal::Stream, Option<usize>)> {
            let mut stream_config = base_config.clone();
            stream_config.buffer_size = buffer_size;
            let first_frames = Arc::new(AtomicUsize::new(0));
            let stream = match format {
                cpal::SampleFormat::I16 => {
                    build_stream::<i16>(&device, &stream_config, renderer.clone(), &first_frames)?
                }
                cpal::SampleFormat::F32 => {
                    build_stream::<f32>(&device, &stream_config, renderer.clone(), &first_frames)?
                }
                cpal::SampleFormat::U16 => {
                    build_stream::<u16>(&device, &stream_config, renderer.clone(), &first_frames)?
                }
                format => return Err(Error::UnsupportedSampleFormat(format!("{format:?}"))),
            };
            stream.play()?;
            let granted = wait_for_first_callback(&first_frames, first_callback_timeout);
            Ok((stream, granted))
        };

        let stream = match negotiate_block_size(config.block_size, |frames| {
            let frames = clamp_to_device(supported.buffer_size(), frames);
            start(cpal::BufferSize::Fixed(frames as u32))
        }) {
            Ok(stream) => stream,
            Err(e @ Error::HalvingCorrectionFailed { .. }) => {
                warn!("{}; letting the device pick its buffer size", e);
                start(cpal::BufferSize::Default)?.0
            }
            Err(e) => return Err(e),
        };

        debug!(
            "Opened '{}' at {} Hz, {} channels",
            device_name, sample_rate, base_config.channels
        );

        Ok(Self {
            sample_rate,
            channels: base_config.channels as usize,
            block_size: config.block_size,
            device_name,
            _stream: StreamHandle(stream),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// List available output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        cpal::default_host()
            .output_devices()?
            .enumerate()
            .map(|(i, d)| Ok(format!("{i}: {}", d.name()?)))
            .collect()
    }
}

fn get_device(index: Option<usize>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    match index {
        Some(i) => {
            let devices: Vec<_> = host.output_devices()?.collect();
            let count = devices.len();
            devices.into_iter().nth(i).ok_or_else(|| {
                Error::InvalidDevice(format!("Device index {i} out of range ({count} available)"))
            })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::InvalidDevice("No output device available".into())),
    }
}

fn format_rank(format: cpal::SampleFormat) -> Option<u8> {
    match format {
        cpal::SampleFormat::I16 => Some(0),
        cpal::SampleFormat::F32 => Some(1),
        cpal::SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Pick a stream config at `sample_rate`, or the device default if no
/// supported range contains it.
fn select_config(device: &cpal::Device, sample_rate: u32) -> Result<cpal::SupportedStreamConfig> {
    let rate = cpal::SampleRate(sample_rate);
    let mut ranges: Vec<_> = device
        .supported_output_configs()?
        .filter(|range| format_rank(range.sample_format()).is_some())
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .collect();
    ranges.sort_by_key(|range| (format_rank(range.sample_format()), range.channels()));

    if let Some(range) = ranges.into_iter().next() {
        return Ok(range.with_sample_rate(rate));
    }

    let fallback = device.default_output_config()?;
    warn!(
        "Device does not support {} Hz, using its default of {} Hz",
        sample_rate,
        fallback.sample_rate().0
    );
    Ok(fallback)
}

fn clamp_to_device(supported: &cpal::SupportedBufferSize, request: usize) -> usize {
    match *supported {
        cpal::SupportedBufferSize::Range { min, max } => {
            request.clamp(min as usize, max.max(min) as usize)
        }
        cpal::SupportedBufferSize::Unknown => request,
    }
}

/// Open a stream delivering `requested` frames per callback.
///
/// `open` starts a stream for a request and reports the callback size the
/// device actually uses, if one was observed. Some platforms deliver half
/// the requested size; for those the stream is reopened with twice the
/// request, which must then land exactly on `requested`. Any other size is
/// kept, since the output re-chunks callbacks into whole blocks anyway.
pub(crate) fn negotiate_block_size<S>(
    requested: usize,
    mut open: impl FnMut(usize) -> Result<(S, Option<usize>)>,
) -> Result<S> {
    let (stream, granted) = open(requested)?;
    if requested < 2 || granted != Some(requested / 2) {
        return Ok(stream);
    }

    warn!(
        "Device halved the block size to {} frames; reopening with {}",
        requested / 2,
        requested * 2
    );
    drop(stream);

    let (stream, corrected) = open(requested * 2)?;
    match corrected {
        Some(obtained) if obtained != requested => Err(Error::HalvingCorrectionFailed {
            requested,
            obtained,
        }),
        _ => Ok(stream),
    }
}

/// Frames per channel seen by the first data callback, once it has run.
fn wait_for_first_callback(first_frames: &AtomicUsize, timeout: Duration) -> Option<usize> {
    let deadline = Instant::now() + timeout;
    loop {
        match first_frames.load(Ordering::Acquire) {
            0 if Instant::now() >= deadline => return None,
            0 => thread::sleep(Duration::from_millis(1)),
            frames => return Some(frames),
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    renderer: Renderer,
    first_frames: &Arc<AtomicUsize>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + RenderSample,
{
    let channels = (config.channels as usize).max(1);
    let block_size = renderer.block_size();
    let stats = renderer.stats().clone();
    let first_frames = Arc::clone(first_frames);
    let mut first_seen = false;

    // Rendered block and how much of it has been handed to the device.
    let mut block = vec![T::SILENCE; block_size];
    let mut cursor = block_size;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if !first_seen {
                first_seen = true;
                first_frames.store(data.len() / channels, Ordering::Release);
            }

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                for frame in data.chunks_mut(channels) {
                    if cursor == block_size {
                        renderer.render(&mut block);
                        cursor = 0;
                    }
                    frame.fill(block[cursor]);
                    cursor += 1;
                }
            }));

            if result.is_err() {
                // Panic in callback - output silence
                data.fill(T::SILENCE);
                cursor = block_size;
            }
        },
        move |_err| {
            // Cannot log from callback
            stats.record_stream_error();
        },
        None,
    )?;

    Ok(stream)
}
