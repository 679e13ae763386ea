use std::io::{ErrorKind, Read, Write as _};
use std::path::Path;
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::Context as _;

use crate::effects::composite::blend_overlay_into_rgba8;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{WatermarkError, WmResult};
use crate::media::probe::{VideoSourceInfo, is_ffmpeg_on_path, is_ffprobe_on_path, probe_video};
use crate::model::artifact::EncodedMedia;
use crate::render::overlay::OverlayRaster;

/// Output container derived from the declared video MIME type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Container {
    pub(crate) ext: &'static str,
    /// Source codecs this container can carry; anything else is re-encoded with `fallback`.
    accepts: &'static [&'static str],
    fallback: &'static str,
    faststart: bool,
}

pub(crate) fn container_for_mime(mime: &str) -> Option<Container> {
    let c = match mime {
        "video/mp4" => Container {
            ext: "mp4",
            accepts: &["h264", "hevc", "av1"],
            fallback: "h264",
            faststart: true,
        },
        "video/quicktime" => Container {
            ext: "mov",
            accepts: &["h264", "hevc"],
            fallback: "h264",
            faststart: true,
        },
        "video/webm" => Container {
            ext: "webm",
            accepts: &["vp8", "vp9", "av1"],
            fallback: "vp9",
            faststart: false,
        },
        "video/x-matroska" => Container {
            ext: "mkv",
            accepts: &["h264", "hevc", "vp8", "vp9", "av1"],
            fallback: "h264",
            faststart: false,
        },
        _ => return None,
    };
    Some(c)
}

/// Source codec, ffmpeg encoder, quality arguments.
const ENCODERS: &[(&str, &str, &[&str])] = &[
    ("h264", "libx264", &["-crf", "18", "-preset", "medium"]),
    ("hevc", "libx265", &["-crf", "20", "-preset", "medium"]),
    ("vp9", "libvpx-vp9", &["-crf", "30", "-b:v", "0"]),
    ("vp8", "libvpx", &["-crf", "10", "-b:v", "4M"]),
    ("av1", "libaom-av1", &["-crf", "30", "-b:v", "0", "-cpu-used", "6"]),
];

fn encoder_for_codec(codec: &str) -> Option<(&'static str, &'static [&'static str])> {
    ENCODERS
        .iter()
        .find(|(c, _, _)| *c == codec)
        .map(|&(_, encoder, args)| (encoder, args))
}

/// Video encoding plan for one source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EncodePlan {
    pub(crate) encoder: &'static str,
    pub(crate) quality_args: &'static [&'static str],
    pub(crate) pix_fmt: String,
}

/// Keep the source codec family and pixel format when the container allows it.
pub(crate) fn plan_encode(container: &Container, src: &VideoSourceInfo) -> EncodePlan {
    let kept = src
        .codec_name
        .as_deref()
        .filter(|c| container.accepts.contains(c))
        .and_then(encoder_for_codec);

    match kept {
        Some((encoder, quality_args)) => EncodePlan {
            encoder,
            quality_args,
            pix_fmt: src
                .pix_fmt
                .clone()
                .unwrap_or_else(|| "yuv420p".to_string()),
        },
        None => {
            let (encoder, quality_args) = encoder_for_codec(container.fallback)
                .unwrap_or((ENCODERS[0].1, ENCODERS[0].2));
            EncodePlan {
                encoder,
                quality_args,
                pix_fmt: "yuv420p".to_string(),
            }
        }
    }
}

/// Kills the child on drop unless it was already reaped.
struct ChildGuard {
    name: &'static str,
    child: Option<Child>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl ChildGuard {
    fn spawn(name: &'static str, mut cmd: Command) -> WmResult<Self> {
        let mut child = cmd.stderr(Stdio::piped()).spawn().map_err(|e| {
            WatermarkError::composite(format!(
                "failed to spawn {name} (is it installed and on PATH?): {e}"
            ))
        })?;
        let stderr_drain = child.stderr.take().map(drain_stderr);
        Ok(Self {
            name,
            child: Some(child),
            stderr_drain,
        })
    }

    fn child_mut(&mut self) -> WmResult<&mut Child> {
        self.child
            .as_mut()
            .ok_or_else(|| WatermarkError::composite(format!("{} already finished", self.name)))
    }

    /// Wait for exit and turn a non-zero status into an error carrying stderr.
    fn finish(mut self) -> WmResult<()> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| WatermarkError::composite(format!("{} already finished", self.name)))?;
        let status = child.wait().map_err(|e| {
            WatermarkError::composite(format!("failed to wait for {}: {e}", self.name))
        })?;
        let stderr = self.take_stderr();
        if !status.success() {
            return Err(WatermarkError::composite(format!(
                "{} exited with status {status}: {}",
                self.name,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Kill the child and return whatever it wrote to stderr.
    fn abort(mut self) -> String {
        self.kill();
        self.take_stderr()
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn take_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
            _ => String::new(),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.child.is_some() {
            tracing::debug!(process = self.name, "killing unfinished ffmpeg process");
            self.kill();
        }
    }
}

fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut stderr_bytes = Vec::new();
        stderr.read_to_end(&mut stderr_bytes)?;
        Ok(stderr_bytes)
    })
}

/// Watermark every frame of `input`, keeping container, frame rate, audio and metadata.
///
/// `build_overlay` is called once with the display size of the video. Temp files live in a
/// private directory that is removed on return, including on error and cancellation.
#[tracing::instrument(skip_all, fields(mime = input.mime(), bytes = input.bytes().len()))]
pub(crate) fn watermark_video(
    input: &EncodedMedia,
    cancel: &CancelToken,
    opacity: f32,
    build_overlay: impl FnOnce(u32, u32) -> WmResult<OverlayRaster>,
) -> WmResult<EncodedMedia> {
    let container = container_for_mime(input.mime()).ok_or_else(|| {
        WatermarkError::decode(format!("unsupported video container '{}'", input.mime()))
    })?;
    if !is_ffmpeg_on_path() || !is_ffprobe_on_path() {
        return Err(WatermarkError::composite(
            "ffmpeg and ffprobe are required for video watermarking, but were not found on PATH",
        ));
    }
    cancel.check()?;

    let dir = tempfile::tempdir()
        .context("failed to create video scratch directory")
        .map_err(scratch_err)?;
    let in_path = dir.path().join(format!("input.{}", container.ext));
    let out_path = dir.path().join(format!("output.{}", container.ext));
    std::fs::write(&in_path, input.bytes())
        .with_context(|| format!("failed to write '{}'", in_path.display()))
        .map_err(scratch_err)?;

    let info = probe_video(&in_path)?;
    tracing::debug!(
        width = info.width,
        height = info.height,
        fps = %format!("{}/{}", info.fps_num, info.fps_den),
        codec = info.codec_name.as_deref().unwrap_or("?"),
        audio = info.has_audio,
        duration_sec = info.duration_sec.unwrap_or(0.0),
        "probed video"
    );
    let overlay = build_overlay(info.width, info.height)?;
    let plan = plan_encode(&container, &info);

    let frames = transcode_frames(&in_path, &out_path, &container, &info, &plan, |frame| {
        cancel.check()?;
        blend_overlay_into_rgba8(frame, info.width, info.height, &overlay, opacity)
    })?;
    tracing::debug!(frames, encoder = plan.encoder, "video re-encoded");

    let bytes = std::fs::read(&out_path)
        .with_context(|| format!("failed to read '{}'", out_path.display()))
        .map_err(scratch_err)?;
    Ok(EncodedMedia::new(bytes, input.mime()))
}

fn scratch_err(e: anyhow::Error) -> WatermarkError {
    WatermarkError::composite(format!("{e:#}"))
}

fn transcode_frames(
    in_path: &Path,
    out_path: &Path,
    container: &Container,
    info: &VideoSourceInfo,
    plan: &EncodePlan,
    mut per_frame: impl FnMut(&mut [u8]) -> WmResult<()>,
) -> WmResult<u64> {
    let mut decoder = ChildGuard::spawn("ffmpeg decoder", decoder_command(in_path))?;
    let mut encoder = ChildGuard::spawn(
        "ffmpeg encoder",
        encoder_command(in_path, out_path, container, info, plan),
    )?;

    let mut reader = decoder
        .child_mut()?
        .stdout
        .take()
        .ok_or_else(|| WatermarkError::composite("failed to open ffmpeg stdout (unexpected)"))?;
    let mut writer = encoder
        .child_mut()?
        .stdin
        .take()
        .ok_or_else(|| WatermarkError::composite("failed to open ffmpeg stdin (unexpected)"))?;

    let mut frame = vec![0u8; info.width as usize * info.height as usize * 4];
    let mut frames = 0u64;
    loop {
        match read_frame(&mut reader, &mut frame) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                let stderr = decoder.abort();
                return Err(WatermarkError::composite(format!(
                    "reading decoded frame {frames}: {e}: {}",
                    stderr.trim()
                )));
            }
        }
        per_frame(&mut frame)?;
        if let Err(e) = writer.write_all(&frame) {
            drop(writer);
            let stderr = encoder.abort();
            return Err(WatermarkError::composite(format!(
                "failed to write frame {frames} to ffmpeg stdin: {e}: {}",
                stderr.trim()
            )));
        }
        frames += 1;
    }
    drop(writer);
    drop(reader);

    let decoded = decoder.finish();
    if frames == 0 {
        let detail = decoded.err().map(|e| format!(": {e}")).unwrap_or_default();
        return Err(WatermarkError::decode(format!(
            "video contains no decodable frames{detail}"
        )));
    }
    decoded?;
    encoder.finish()?;
    Ok(frames)
}

/// Fill `buf` with the next frame. `Ok(false)` on a clean end of stream.
fn read_frame(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("truncated frame ({filled} of {} bytes)", buf.len()),
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn decoder_command(in_path: &Path) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-nostdin", "-v", "error", "-i"])
        .arg(in_path)
        .args([
            "-map",
            "0:v:0",
            "-fps_mode",
            "passthrough",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped());
    cmd
}

fn encoder_command(
    in_path: &Path,
    out_path: &Path,
    container: &Container,
    info: &VideoSourceInfo,
    plan: &EncodePlan,
) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.args([
        "-y",
        "-v",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", info.width, info.height),
        "-r",
        &format!("{}/{}", info.fps_num, info.fps_den),
        "-i",
        "pipe:0",
        "-i",
    ])
    .arg(in_path)
    .args([
        "-map",
        "0:v:0",
        "-map",
        "1:a?",
        "-map_metadata",
        "1",
        "-c:v",
        plan.encoder,
    ])
    .args(plan.quality_args)
    .args(["-pix_fmt", &plan.pix_fmt, "-c:a", "copy"]);
    if container.faststart {
        cmd.args(["-movflags", "+faststart"]);
    }
    cmd.arg(out_path).stdin(Stdio::piped()).stdout(Stdio::null());
    cmd
}

#[cfg(test)]
#[path = "../../tests/unit/media/video.rs"]
mod tests;
