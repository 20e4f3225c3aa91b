//! FFmpeg execution adapter
//!
//! Runs one encoder pass, or one stream-copy segmenting run, per call as an
//! external process. The child is killed when the run times out or the job
//! future is dropped.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Lines of diagnostic output kept in failure reports
const STDERR_TAIL_LINES: usize = 40;

/// Playlist or manifest the muxer writes beside the segments; the package
/// builder writes its own, so this one is removed
const SEGMENTER_SCRATCH: &str = "segmenter";

/// Captured result of one external tool run
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Why an external tool run did not succeed
#[derive(Debug)]
pub(crate) enum ToolFailure {
    Spawn(String),
    TimedOut(Duration),
    Exited { code: Option<i32>, stderr: String },
}

impl ToolFailure {
    pub(crate) fn exit_code(&self) -> Option<i32> {
        match self {
            ToolFailure::Exited { code, .. } => *code,
            _ => None,
        }
    }

    pub(crate) fn diagnostics(&self) -> String {
        match self {
            ToolFailure::Spawn(message) => message.clone(),
            ToolFailure::TimedOut(limit) => format!("timed out after {}s", limit.as_secs()),
            ToolFailure::Exited { stderr, .. } => stderr.clone(),
        }
    }
}

/// Run `program` to completion with a wall-clock limit
pub(crate) async fn run_tool(
    program: &Path,
    args: &[OsString],
    limit: Duration,
) -> Result<ToolOutput, ToolFailure> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command
        .spawn()
        .map_err(|e| ToolFailure::Spawn(format!("failed to start {}: {}", program.display(), e)))?;

    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ToolFailure::Spawn(format!("{} did not finish: {}", program.display(), e))),
        Err(_) => return Err(ToolFailure::TimedOut(limit)),
    };

    let stderr = stderr_tail(&output.stderr);
    if output.status.success() {
        Ok(ToolOutput {
            stdout: output.stdout,
            stderr,
        })
    } else {
        Err(ToolFailure::Exited {
            code: output.status.code(),
            stderr,
        })
    }
}

fn stderr_tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// FFmpeg-based encode adapter
pub struct FFmpegAdapter {
    ffmpeg: PathBuf,
    pass_timeout: Duration,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new(ffmpeg: impl Into<PathBuf>, pass_timeout: Duration) -> Result<Self, DomainError> {
        if pass_timeout.is_zero() {
            return Err(DomainError::ConfigInvalid("pass timeout must be positive".to_string()));
        }
        Ok(Self {
            ffmpeg: ffmpeg.into(),
            pass_timeout,
        })
    }

    /// A refinement pass updates its own copy of the previous statistics
    async fn seed_refinement_stats(stats_in: &Path, stats_out: &Path) -> Result<usize, DomainError> {
        let (Some(dir), Some(from), Some(to)) = (stats_in.parent(), stem(stats_in), stem(stats_out)) else {
            return Ok(0);
        };
        let mut copied = 0;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(rest) = name.strip_prefix(&from) else {
                continue;
            };
            if !(rest.starts_with('-') || rest.starts_with('.')) {
                continue;
            }
            tokio::fs::copy(entry.path(), dir.join(format!("{}{}", to, rest))).await?;
            copied += 1;
        }
        Ok(copied)
    }
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

/// Command-line arguments for one pass
pub fn build_args(invocation: &EncodeInvocation) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |value: &str| args.push(OsString::from(value));

    push("-hide_banner");
    push("-nostdin");
    push("-y");
    push("-i");
    args.push(invocation.input.clone().into_os_string());

    let rate = invocation.rate;
    let mut flag = |key: &str, value: String| {
        args.push(OsString::from(key));
        args.push(OsString::from(value));
    };

    if let Some(size) = invocation.scale {
        flag("-vf", format!("scale={}:{}", size.width, size.height));
    }
    if let Some(seconds) = invocation.keyframe_seconds {
        flag("-force_key_frames", format!("expr:gte(t,n_forced*{})", seconds));
    }
    flag("-c:v", invocation.codec.encoder_name().to_string());
    flag("-b:v", format!("{}k", rate.target_kbps));
    flag("-maxrate", format!("{}k", rate.max_kbps));
    flag("-bufsize", format!("{}k", rate.max_kbps * 2));
    match invocation.codec {
        Codec::H264 | Codec::Hevc => {
            flag("-preset", "medium".to_string());
            flag("-pix_fmt", "yuv420p".to_string());
        }
        Codec::Vp9 => {
            flag("-minrate", format!("{}k", rate.min_kbps));
            if let Some(crf) = rate.crf {
                flag("-crf", crf.to_string());
            }
            flag("-row-mt", "1".to_string());
            flag("-deadline", "good".to_string());
        }
        Codec::Av1 => {
            flag("-cpu-used", "4".to_string());
            flag("-row-mt", "1".to_string());
        }
        Codec::Theora => {}
    }

    // `-pass 3` sets both of ffmpeg's first- and second-pass flags: x264 and
    // x265 read the seeded copy of the previous log and rewrite it in place.
    // libaom checks the first-pass flag first, so for AV1 the refinement pass
    // regenerates statistics into the copy and the final pass reads those.
    let pass = match (&invocation.stats_in, &invocation.stats_out) {
        (None, None) => None,
        (None, Some(out)) => Some((1, out)),
        (Some(input), None) => Some((2, input)),
        (Some(_), Some(out)) => Some((3, out)),
    };
    if let Some((number, log)) = pass {
        flag("-pass", number.to_string());
        args.push(OsString::from("-passlogfile"));
        args.push(log.with_extension("").into_os_string());
    }

    match invocation.audio_bitrate_kbps {
        Some(kbps) => {
            args.push(OsString::from("-c:a"));
            args.push(OsString::from(invocation.container.audio_codec()));
            args.push(OsString::from("-b:a"));
            args.push(OsString::from(format!("{}k", kbps)));
        }
        None => args.push(OsString::from("-an")),
    }

    if let Some(projection) = invocation.spherical {
        args.push(OsString::from("-metadata"));
        args.push(OsString::from("spherical=1"));
        args.push(OsString::from("-metadata"));
        args.push(OsString::from(format!("projection={}", projection.as_str())));
    }

    match &invocation.output {
        PassOutput::Discard => {
            args.push(OsString::from("-f"));
            args.push(OsString::from("null"));
            args.push(OsString::from("-"));
        }
        PassOutput::File(path) => {
            if invocation.container == Container::Mp4 {
                args.push(OsString::from("-movflags"));
                args.push(OsString::from("+faststart"));
            }
            args.push(OsString::from("-f"));
            args.push(OsString::from(invocation.container.muxer()));
            args.push(path.clone().into_os_string());
        }
    }
    args
}

/// Stream-copy arguments splitting one rendition into an init segment and
/// numbered media segments. MP4 renditions go through the HLS muxer as
/// fragmented MP4 with audio; WebM goes through the DASH muxer, video only,
/// matching the video-only adaptation sets of the manifest.
pub fn segment_args(invocation: &SegmentInvocation) -> Vec<OsString> {
    let dir = &invocation.output_dir;
    let seconds = invocation.segment_duration.to_string();
    let mut args = os_args(&["-hide_banner", "-nostdin", "-y", "-i"]);
    args.push(invocation.rendition.clone().into_os_string());

    match invocation.container {
        Container::Webm => {
            let media = invocation.segment_pattern.replace("%05d", "$Number%05d$");
            args.extend(os_args(&["-map", "0:v:0", "-c", "copy", "-f", "dash"]));
            args.extend(os_args(&[
                "-seg_duration",
                seconds.as_str(),
                "-use_template",
                "1",
                "-use_timeline",
                "0",
                "-dash_segment_type",
                "webm",
            ]));
            args.extend(os_args(&[
                "-init_seg_name",
                invocation.init_name.as_str(),
                "-media_seg_name",
                media.as_str(),
            ]));
            args.push(dir.join(format!("{}.mpd", SEGMENTER_SCRATCH)).into_os_string());
        }
        _ => {
            args.extend(os_args(&["-map", "0:v:0", "-map", "0:a?", "-c", "copy", "-f", "hls"]));
            args.extend(os_args(&[
                "-hls_time",
                seconds.as_str(),
                "-hls_playlist_type",
                "vod",
                "-hls_segment_type",
                "fmp4",
                "-hls_fmp4_init_filename",
                invocation.init_name.as_str(),
                "-start_number",
                "1",
                "-hls_segment_filename",
            ]));
            args.push(dir.join(&invocation.segment_pattern).into_os_string());
            args.push(dir.join(format!("{}.m3u8", SEGMENTER_SCRATCH)).into_os_string());
        }
    }
    args
}

fn os_args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

#[async_trait]
impl SegmentPort for FFmpegAdapter {
    async fn segment(&self, invocation: &SegmentInvocation) -> Result<PassOutcome, DomainError> {
        let args = segment_args(invocation);
        info!(
            rendition = %invocation.rendition.display(),
            output = %invocation.output_dir.display(),
            "Segmenting rendition"
        );
        debug!(args = ?args, "ffmpeg arguments");

        let output = run_tool(&self.ffmpeg, &args, self.pass_timeout)
            .await
            .map_err(|failure| {
                DomainError::ManifestWrite(format!(
                    "segmenting {} failed: {}",
                    invocation.rendition.display(),
                    failure.diagnostics()
                ))
            })?;

        for ext in ["m3u8", "mpd"] {
            let scratch = invocation.output_dir.join(format!("{}.{}", SEGMENTER_SCRATCH, ext));
            if tokio::fs::remove_file(&scratch).await.is_ok() {
                debug!(path = %scratch.display(), "Removed segmenter playlist");
            }
        }
        Ok(PassOutcome { stderr: output.stderr })
    }
}

#[async_trait]
impl EncodePort for FFmpegAdapter {
    async fn run_pass(&self, invocation: &EncodeInvocation) -> Result<PassOutcome, DomainError> {
        if let (Some(stats_in), Some(stats_out)) = (&invocation.stats_in, &invocation.stats_out) {
            let copied = Self::seed_refinement_stats(stats_in, stats_out).await?;
            debug!(job_id = %invocation.job_id, copied, "Seeded refinement statistics");
        }

        let args = build_args(invocation);
        info!(
            job_id = %invocation.job_id,
            pass = invocation.pass_index,
            total = invocation.total_passes,
            codec = %invocation.codec,
            "Running encoder pass"
        );
        debug!(args = ?args, "ffmpeg arguments");

        match run_tool(&self.ffmpeg, &args, self.pass_timeout).await {
            Ok(output) => Ok(PassOutcome { stderr: output.stderr }),
            Err(failure) => Err(DomainError::PassExecutionFailed {
                format: invocation.format.as_str().to_string(),
                codec: invocation.codec.as_str().to_string(),
                pass_index: invocation.pass_index,
                total_passes: invocation.total_passes,
                exit_code: failure.exit_code(),
                stderr: failure.diagnostics(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(stats_in: Option<&str>, stats_out: Option<&str>, output: PassOutput) -> EncodeInvocation {
        let is_final = matches!(output, PassOutput::File(_));
        EncodeInvocation {
            job_id: "tour-mp4".to_string(),
            format: OutputFormat::Mp4,
            codec: Codec::H264,
            container: Container::Mp4,
            input: PathBuf::from("/in/tour.mp4"),
            output,
            pass_index: if is_final { 2 } else { 1 },
            total_passes: 2,
            stats_in: stats_in.map(PathBuf::from),
            stats_out: stats_out.map(PathBuf::from),
            rate: RateControl {
                target_kbps: 6250,
                min_kbps: 2500,
                max_kbps: 10000,
                crf: Some(23),
            },
            audio_bitrate_kbps: is_final.then_some(192),
            spherical: is_final.then_some(ProjectionType::Equirectangular),
            scale: None,
            keyframe_seconds: None,
        }
    }

    fn joined(args: &[OsString]) -> String {
        args.iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_analysis_pass_args() {
        let args = joined(&build_args(&invocation(None, Some("/w/job/pass_1.log"), PassOutput::Discard)));
        assert!(args.contains("-c:v libx264"));
        assert!(args.contains("-b:v 6250k"));
        assert!(args.contains("-pass 1 -passlogfile /w/job/pass_1"));
        assert!(args.contains("-an"));
        assert!(args.ends_with("-f null -"));
        assert!(!args.contains("spherical"));
    }

    #[test]
    fn test_final_pass_args() {
        let inv = invocation(
            Some("/w/job/pass_1.log"),
            None,
            PassOutput::File(PathBuf::from("/w/job/mp4.mp4")),
        );
        let args = joined(&build_args(&inv));
        assert!(args.contains("-pass 2 -passlogfile /w/job/pass_1"));
        assert!(args.contains("-c:a aac -b:a 192k"));
        assert!(args.contains("-metadata spherical=1 -metadata projection=equirectangular"));
        assert!(args.ends_with("-movflags +faststart -f mp4 /w/job/mp4.mp4"));
    }

    #[test]
    fn test_refinement_and_single_pass_flags() {
        let refine = joined(&build_args(&invocation(
            Some("/w/job/pass_1.log"),
            Some("/w/job/pass_2.log"),
            PassOutput::Discard,
        )));
        assert!(refine.contains("-pass 3 -passlogfile /w/job/pass_2"));
        assert!(refine.ends_with("-f null -"));

        let single = joined(&build_args(&invocation(None, None, PassOutput::File(PathBuf::from("/o.mp4")))));
        assert!(!single.contains("-pass"));
    }

    #[test]
    fn test_av1_three_pass_chain() {
        let rate = |inv: EncodeInvocation| EncodeInvocation {
            codec: Codec::Av1,
            total_passes: 3,
            ..inv
        };
        let analysis = rate(invocation(None, Some("/w/av1/pass_1.log"), PassOutput::Discard));
        let mut refine = rate(invocation(Some("/w/av1/pass_1.log"), Some("/w/av1/pass_2.log"), PassOutput::Discard));
        refine.pass_index = 2;
        let mut last = rate(invocation(Some("/w/av1/pass_2.log"), None, PassOutput::File(PathBuf::from("/w/av1/av1.mp4"))));
        last.pass_index = 3;

        let args: Vec<String> = [analysis, refine, last].iter().map(|inv| joined(&build_args(inv))).collect();
        assert!(args.iter().all(|a| a.contains("-c:v libaom-av1")));
        // each pass writes or reads its own log, the last reads the refined one
        assert!(args[0].contains("-pass 1 -passlogfile /w/av1/pass_1"));
        assert!(args[1].contains("-pass 3 -passlogfile /w/av1/pass_2"));
        assert!(args[2].contains("-pass 2 -passlogfile /w/av1/pass_2"));
        assert!(!args[2].contains("pass_1"));
    }

    #[test]
    fn test_tier_scale_and_keyframes() {
        let mut inv = invocation(None, Some("/w/job/pass_1.log"), PassOutput::Discard);
        inv.scale = Some(Resolution::new(1280, 640).unwrap());
        inv.keyframe_seconds = Some(6);
        let args = joined(&build_args(&inv));
        assert!(args.contains("-vf scale=1280:640 -force_key_frames expr:gte(t,n_forced*6) -c:v libx264"));

        let plain = joined(&build_args(&invocation(None, None, PassOutput::File(PathBuf::from("/o.mp4")))));
        assert!(!plain.contains("scale="));
        assert!(!plain.contains("force_key_frames"));
    }

    fn segment_invocation(container: Container) -> SegmentInvocation {
        let ext = if container == Container::Webm { "webm" } else { "m4s" };
        SegmentInvocation {
            rendition: PathBuf::from(format!("/r/960p_360_x.{}", container.extension())),
            container,
            output_dir: PathBuf::from("/out/960p_360_x"),
            init_name: format!("init.{}", if container == Container::Webm { "webm" } else { "mp4" }),
            segment_pattern: format!("segment_%05d.{}", ext),
            segment_duration: 6,
        }
    }

    #[test]
    fn test_fmp4_segment_args() {
        let args = joined(&segment_args(&segment_invocation(Container::Mp4)));
        assert!(args.starts_with("-hide_banner -nostdin -y -i /r/960p_360_x.mp4"));
        assert!(args.contains("-c copy -f hls -hls_time 6"));
        assert!(args.contains("-hls_segment_type fmp4 -hls_fmp4_init_filename init.mp4"));
        assert!(args.contains("-start_number 1 -hls_segment_filename /out/960p_360_x/segment_%05d.m4s"));
        assert!(args.ends_with("/out/960p_360_x/segmenter.m3u8"));
    }

    #[test]
    fn test_webm_segment_args() {
        let args = joined(&segment_args(&segment_invocation(Container::Webm)));
        assert!(args.contains("-map 0:v:0 -c copy -f dash -seg_duration 6"));
        assert!(!args.contains("0:a"));
        assert!(args.contains("-init_seg_name init.webm -media_seg_name segment_$Number%05d$.webm"));
        assert!(args.ends_with("/out/960p_360_x/segmenter.mpd"));
    }

    #[tokio::test]
    async fn test_seed_refinement_stats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pass_1-0.log"), "stats").unwrap();
        std::fs::write(dir.path().join("pass_1-0.log.mbtree"), "tree").unwrap();
        std::fs::write(dir.path().join("pass_10-0.log"), "other").unwrap();

        let copied = FFmpegAdapter::seed_refinement_stats(
            &dir.path().join("pass_1.log"),
            &dir.path().join("pass_2.log"),
        )
        .await
        .unwrap();
        assert_eq!(copied, 2);
        assert!(dir.path().join("pass_2-0.log").exists());
        assert!(dir.path().join("pass_2-0.log.mbtree").exists());
    }

    #[tokio::test]
    async fn test_missing_binary_is_pass_failure() {
        let adapter = FFmpegAdapter::new("/nonexistent/ffmpeg-binary", Duration::from_secs(5)).unwrap();
        let inv = invocation(None, None, PassOutput::File(PathBuf::from("/tmp/never.mp4")));
        let err = adapter.run_pass(&inv).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::PassExecutionFailed { exit_code: None, pass_index: 2, .. }
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(FFmpegAdapter::new("ffmpeg", Duration::ZERO).is_err());
    }
}
