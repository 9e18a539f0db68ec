use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::worker::WorkerError;

//keep downloads small; detection quality does not improve past 480p
const FORMAT_SELECTOR: &str = "best[height<=480]/best";

/// Download the video behind `url` into `dest_dir` with yt-dlp, returning the
/// path of the downloaded file. Partial files are cleaned up on failure.
pub fn download_video(url: &str, dest_dir: &Path, video_id: &str) -> Result<PathBuf, WorkerError> {
    let dest_path = dest_dir.join(format!("{video_id}.mp4"));

    let output = Command::new("yt-dlp")
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("-f")
        .arg(FORMAT_SELECTOR)
        .arg("-o")
        .arg(&dest_path)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => WorkerError::YtDlpNotFound,
            _ => WorkerError::Download {
                video_id: video_id.to_string(),
                reason: format!("{:?}", e.kind()),
            },
        })?;

    if !output.status.success() {
        remove_partial_files(&dest_path);

        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(WorkerError::Download {
            video_id: video_id.to_string(),
            reason: stderr.chars().take(500).collect(),
        });
    }

    //yt-dlp can exit zero without producing a file (e.g. empty playlists)
    if !dest_path.exists() {
        return Err(WorkerError::Download {
            video_id: video_id.to_string(),
            reason: "yt-dlp produced no output file".to_string(),
        });
    }

    Ok(dest_path)
}

//yt-dlp leaves "<name>.part" (and sometimes the bare target) behind when
//interrupted
fn remove_partial_files(dest_path: &Path) {
    let _remove_error = fs::remove_file(dest_path);

    let mut part_path = dest_path.as_os_str().to_owned();
    part_path.push(".part");
    let _remove_error = fs::remove_file(PathBuf::from(part_path));
}
