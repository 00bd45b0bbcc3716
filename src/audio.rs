//! # Audio Duration Probing
//!
//! Computes the duration of an uploaded audio file by probing its container
//! with symphonia. Probing is cheap for containers that declare their frame
//! count (wav, m4a); for streams that don't (typically mp3), the packet
//! timeline is walked without decoding.
//!
//! This is blocking work and is run on the blocking pool by the pipeline.

use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{AppError, AppResult};

/// Probe the file at `path` and return its duration in seconds (≥ 0).
pub fn probe_duration_seconds(path: &Path) -> AppResult<f64> {
    let file = File::open(path)
        .map_err(|e| AppError::Internal(format!("opening staged file {}: {e}", path.display())))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // The file extension helps the probe pick the right format reader.
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AppError::Internal(format!("unrecognized audio format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AppError::Internal("no audio track found".to_string()))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    // Fast path: the container declares its length.
    if let (Some(n_frames), Some(time_base)) = (params.n_frames, params.time_base) {
        let time = time_base.calc_time(n_frames);
        return Ok(time.seconds as f64 + time.frac);
    }
    if let (Some(n_frames), Some(sample_rate)) = (params.n_frames, params.sample_rate) {
        return Ok(n_frames as f64 / f64::from(sample_rate));
    }

    // Slow path: walk the packets and sum their durations.
    let time_base = params
        .time_base
        .ok_or_else(|| AppError::Internal("audio track has no time base".to_string()))?;

    let mut total_ts: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total_ts += packet.dur();
                }
            }
            // End of stream surfaces as an IO error.
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AppError::Internal(format!("reading audio packets: {e}")));
            }
        }
    }

    let time = time_base.calc_time(total_ts);
    Ok(time.seconds as f64 + time.frac)
}
