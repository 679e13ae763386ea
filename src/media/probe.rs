use std::path::Path;
use std::process::{Command, Stdio};

use crate::foundation::error::{WatermarkError, WmResult};

/// Metadata about the first video stream of a container, as reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct VideoSourceInfo {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) fps_num: u32,
    pub(crate) fps_den: u32,
    /// Source pixel format, e.g. `yuv420p`. Reused for the re-encode when present.
    pub(crate) pix_fmt: Option<String>,
    /// Source codec name, e.g. `h264`.
    pub(crate) codec_name: Option<String>,
    pub(crate) has_audio: bool,
    pub(crate) duration_sec: Option<f64>,
}

/// Probe `path` through `ffprobe`. Every failure is a decode failure.
pub(crate) fn probe_video(path: &Path) -> WmResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        codec_name: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        pix_fmt: Option<String>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
        #[serde(default)]
        side_data_list: Vec<ProbeSideData>,
        #[serde(default)]
        tags: std::collections::BTreeMap<String, String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeSideData {
        rotation: Option<f64>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| WatermarkError::decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(WatermarkError::decode(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| WatermarkError::decode(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| WatermarkError::decode("no video stream found"))?;
    let width = video
        .width
        .filter(|w| *w > 0)
        .ok_or_else(|| WatermarkError::decode("missing video width from ffprobe"))?;
    let height = video
        .height
        .filter(|h| *h > 0)
        .ok_or_else(|| WatermarkError::decode("missing video height from ffprobe"))?;

    // ffmpeg autorotates on decode, so frames arrive in display orientation.
    let rotation = video
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .or_else(|| video.tags.get("rotate").and_then(|r| r.trim().parse().ok()))
        .unwrap_or(0.0);
    let (width, height) = if is_quarter_turn(rotation) {
        (height, width)
    } else {
        (width, height)
    };

    // r_frame_rate is the timebase-derived rate and overshoots for variable-rate sources.
    let (fps_num, fps_den) = [video.avg_frame_rate.as_deref(), video.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_ff_ratio)
        .ok_or_else(|| WatermarkError::decode("missing video frame rate from ffprobe"))?;

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    let duration_sec = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(VideoSourceInfo {
        width,
        height,
        fps_num,
        fps_den,
        pix_fmt: video.pix_fmt.clone(),
        codec_name: video.codec_name.clone(),
        has_audio,
        duration_sec,
    })
}

fn is_quarter_turn(degrees: f64) -> bool {
    let d = degrees.round().rem_euclid(180.0);
    (d - 90.0).abs() < 1.0
}

/// Parse an ffmpeg rational like `30000/1001` or a plain integer. Zero parts yield `None`.
pub(crate) fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let (num, den) = match s.trim().split_once('/') {
        Some((n, d)) => (n.trim().parse().ok()?, d.trim().parse().ok()?),
        None => (s.trim().parse().ok()?, 1),
    };
    (num > 0 && den > 0).then_some((num, den))
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
