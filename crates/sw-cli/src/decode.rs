//! Audio decoding
//!
//! Uses symphonia for every container/codec enabled in the workspace
//! (WAV, AIFF, FLAC, MP3, OGG Vorbis, AAC/ALAC in MP4). Multi-channel input is
//! mixed down to mono.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, warn};
use sw_core::SampleBuffer;
use symphonia::core::audio::SampleBuffer as PacketBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode `path` into a mono buffer at the file's native sample rate
pub fn decode_mono(path: &Path) -> Result<SampleBuffer> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("unrecognised audio format: {}", path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("no audio track in {}", path.display()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("unknown sample rate in {}", path.display()))?;
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .context("unsupported codec")?;

    let mut interleaved: Vec<f64> = Vec::new();
    let mut packet_buffer: Option<PacketBuffer<f64>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => bail!("packet read error: {}", e),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => bail!("decode error: {}", e),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count();
        let too_small = packet_buffer
            .as_ref()
            .is_none_or(|b| b.capacity() < decoded.capacity() * channels);
        if too_small {
            packet_buffer = Some(PacketBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buffer) = packet_buffer.as_mut() {
            buffer.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buffer.samples());
        }
    }

    if channels == 0 {
        channels = 1;
    }
    debug!(
        "Decoded {}: {} frames, {} channel(s) @ {} Hz",
        path.display(),
        interleaved.len() / channels,
        channels,
        sample_rate
    );

    Ok(SampleBuffer::from_interleaved(&interleaved, channels, sample_rate)?)
}
