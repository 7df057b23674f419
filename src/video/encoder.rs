use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{bail, Context};
use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use sha2::{Digest, Sha256};
use tokio::process::Command;

use super::{label_text, EncoderConfig, Frame, FrameLabeler};

/// Names a video after the hash of the time it was made, so links are hard
/// to guess.
pub fn video_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let digest = Sha256::digest(now.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
    format!("{}.mp4", hex::encode(digest))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub frames: usize,
}

/// Copies `frames` into `dir` as `frame-000000.jpg`, `frame-000001.jpg`, ...
/// drawing each capture time when a labeler is given. Frames that vanished or
/// cannot be decoded are skipped without leaving a gap in the numbering.
/// Returns the number of frames staged.
fn stage_frames(labeler: Option<&FrameLabeler>, frames: &[Frame], dir: &Path) -> usize {
    let mut staged = 0;

    for frame in frames {
        let dest = dir.join(format!("frame-{:06}.jpg", staged));

        let res = match labeler {
            Some(labeler) => {
                let text = label_text(&Local, frame.timestamp);
                labeler.label_file(&frame.path, &dest, &text)
            }
            None => std::fs::copy(&frame.path, &dest)
                .map(|_| ())
                .map_err(anyhow::Error::from),
        };

        match res {
            Ok(()) => staged += 1,
            Err(err) => {
                let gone = err
                    .downcast_ref::<io::Error>()
                    .map_or(false, |err| err.kind() == io::ErrorKind::NotFound);

                if gone {
                    warn!("{} disappeared before staging, skipping", frame.path.display());
                } else {
                    warn!("skipping {}: {:#}", frame.path.display(), err);
                }

                let _ = std::fs::remove_file(&dest);
            }
        }
    }

    staged
}

pub struct Encoder {
    config: EncoderConfig,
    framerate: u32,
}

impl Encoder {
    pub fn new(config: EncoderConfig, framerate: u32) -> Self {
        Encoder { config, framerate }
    }

    /// Arguments for one encoder run reading `frame-%06d.jpg` from
    /// `frames_dir`.
    pub fn args(&self, frames_dir: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-framerate".into(),
            self.framerate.to_string().into(),
            "-i".into(),
        ];

        args.push(frames_dir.join("frame-%06d.jpg").into_os_string());
        args.extend(
            vec![
                "-c:v".to_owned(),
                self.config.codec.clone(),
                "-r".to_owned(),
                self.config.output_rate.to_string(),
                "-pix_fmt".to_owned(),
                self.config.pixel_format.clone(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());

        args
    }

    /// Encodes `frames` in order into `output`. Blocks until the encoder
    /// exits.
    pub async fn encode(&self, frames: &[Frame], output: &Path) -> anyhow::Result<EncodedVideo> {
        if frames.is_empty() {
            bail!("no frames to encode");
        }

        let labeler = if self.config.label.enabled {
            let labeler = FrameLabeler::load(&self.config.label)
                .context("failed to load frame label font")?;
            Some(labeler)
        } else {
            None
        };

        // removed when dropped, whether or not encoding succeeds
        let staging = tempfile::Builder::new()
            .prefix("timelapse-frames")
            .tempdir()
            .context("failed to create frame staging directory")?;

        let staged = {
            let frames = frames.to_vec();
            let dir = staging.path().to_owned();

            tokio::task::spawn_blocking(move || stage_frames(labeler.as_ref(), &frames, &dir))
                .await
                .context("frame staging panicked")?
        };

        if staged == 0 {
            bail!("none of the {} selected frames could be staged", frames.len());
        }

        debug!(
            "staged {} of {} frames in {}",
            staged,
            frames.len(),
            staging.path().display()
        );

        let args = self.args(staging.path(), output);

        info!(
            "running {} {}",
            self.config.binary.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let status = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to run {}", self.config.binary.display()))?;

        if !status.success() {
            bail!("{} exited with {}", self.config.binary.display(), status);
        }

        if tokio::fs::metadata(output).await.is_err() {
            bail!(
                "{} exited successfully but did not write {}",
                self.config.binary.display(),
                output.display()
            );
        }

        Ok(EncodedVideo {
            path: output.to_owned(),
            frames: staged,
        })
    }
}
