use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::worker::WorkerError;

/// One unit of work: a candidate video to check against the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    pub video_id: String,

    /// Explicit source URL. When absent the video_id is treated as a
    /// YouTube id.
    #[serde(default)]
    pub url: Option<String>,
}

impl VideoJob {
    pub fn source_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("https://www.youtube.com/watch?v={}", self.video_id),
        }
    }
}

/// A job this worker has exclusively claimed. The backing file sits in the
/// claimed directory until the job is completed or failed; if the worker dies
/// it stays there for manual requeueing.
#[derive(Debug)]
pub struct ClaimedJob {
    pub job: VideoJob,
    claimed_path: PathBuf,
}

/// Directory-based job queue. Jobs are JSON files dropped into `pending/`;
/// claiming is an atomic rename into `claimed/`, so multiple workers can
/// share one queue without coordination.
#[derive(Debug)]
pub struct JobQueue {
    pending_dir: PathBuf,
    claimed_dir: PathBuf,
    processed_dir: PathBuf,
    failed_dir: PathBuf,
}

impl JobQueue {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, WorkerError> {
        let root = root.as_ref();

        let queue = Self {
            pending_dir: root.join("pending"),
            claimed_dir: root.join("claimed"),
            processed_dir: root.join("processed"),
            failed_dir: root.join("failed"),
        };

        for dir in [
            &queue.pending_dir,
            &queue.claimed_dir,
            &queue.processed_dir,
            &queue.failed_dir,
        ] {
            fs::create_dir_all(dir).map_err(|e| WorkerError::job_queue(dir, e))?;
        }

        Ok(queue)
    }

    /// Claim the oldest pending job, if any.
    ///
    /// Jobs that cannot be parsed are moved to the failed directory and
    /// skipped; a racing claim by another worker is skipped silently.
    pub fn claim_pending(&self) -> Result<Option<ClaimedJob>, WorkerError> {
        for pending_path in self.pending_job_files()? {
            let Some(file_name) = pending_path.file_name() else {
                continue;
            };
            let claimed_path = self.claimed_dir.join(file_name);

            match fs::rename(&pending_path, &claimed_path) {
                Ok(()) => (),
                //another worker renamed it first
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(WorkerError::job_queue(&pending_path, e)),
            }

            match Self::parse_job(&claimed_path) {
                Ok(job) => {
                    return Ok(Some(ClaimedJob {
                        job,
                        claimed_path,
                    }))
                }
                Err(e) => {
                    warn!("skipping malformed job: {e}");
                    let failed_path = self.failed_dir.join(file_name);
                    fs::rename(&claimed_path, &failed_path)
                        .map_err(|e| WorkerError::job_queue(&claimed_path, e))?;
                }
            }
        }

        Ok(None)
    }

    /// Record the job as processed and drop the claim.
    pub fn complete(&self, claimed: &ClaimedJob, report_json: &str) -> Result<(), WorkerError> {
        self.finish(claimed, &self.processed_dir, report_json)
    }

    /// Record the job as failed and drop the claim.
    pub fn fail(&self, claimed: &ClaimedJob, report_json: &str) -> Result<(), WorkerError> {
        self.finish(claimed, &self.failed_dir, report_json)
    }

    fn finish(
        &self,
        claimed: &ClaimedJob,
        dest_dir: &Path,
        report_json: &str,
    ) -> Result<(), WorkerError> {
        let report_path = dest_dir.join(format!("{}.json", claimed.job.video_id));
        fs::write(&report_path, report_json)
            .map_err(|e| WorkerError::job_queue(&report_path, e))?;

        fs::remove_file(&claimed.claimed_path)
            .map_err(|e| WorkerError::job_queue(&claimed.claimed_path, e))?;

        Ok(())
    }

    //the pending job files in name order, oldest-id first by convention
    fn pending_job_files(&self) -> Result<Vec<PathBuf>, WorkerError> {
        let entries = fs::read_dir(&self.pending_dir)
            .map_err(|e| WorkerError::job_queue(&self.pending_dir, e))?;

        let mut job_files = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>();
        job_files.sort();

        Ok(job_files)
    }

    fn parse_job(path: &Path) -> Result<VideoJob, WorkerError> {
        let contents = fs::read_to_string(path).map_err(|e| WorkerError::JobParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| WorkerError::JobParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn enqueue(queue_root: &Path, file_name: &str, contents: &str) {
        let pending_dir = queue_root.join("pending");
        fs::create_dir_all(&pending_dir).unwrap();
        fs::write(pending_dir.join(file_name), contents).unwrap();
    }

    #[test]
    fn test_claim_moves_job_out_of_pending() {
        let tmp = tempfile::tempdir().unwrap();
        enqueue(tmp.path(), "job_1.json", r#"{"video_id": "abc123"}"#);

        let queue = JobQueue::open(tmp.path()).unwrap();
        let claimed = queue.claim_pending().unwrap().unwrap();

        assert_eq!(claimed.job.video_id, "abc123");
        assert_eq!(claimed.job.url, None);
        assert_eq!(
            claimed.job.source_url(),
            "https://www.youtube.com/watch?v=abc123"
        );

        //the job file must now be in claimed/, not pending/
        assert!(!tmp.path().join("pending/job_1.json").exists());
        assert!(tmp.path().join("claimed/job_1.json").exists());

        //and no further job is available
        assert!(queue.claim_pending().unwrap().is_none());
    }

    #[test]
    fn test_explicit_url_wins_over_video_id() {
        let tmp = tempfile::tempdir().unwrap();
        enqueue(
            tmp.path(),
            "job_1.json",
            r#"{"video_id": "abc123", "url": "https://example.com/clip.mp4"}"#,
        );

        let queue = JobQueue::open(tmp.path()).unwrap();
        let claimed = queue.claim_pending().unwrap().unwrap();
        assert_eq!(claimed.job.source_url(), "https://example.com/clip.mp4");
    }

    #[test]
    fn test_jobs_claimed_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        enqueue(tmp.path(), "job_2.json", r#"{"video_id": "second"}"#);
        enqueue(tmp.path(), "job_1.json", r#"{"video_id": "first"}"#);

        let queue = JobQueue::open(tmp.path()).unwrap();
        assert_eq!(queue.claim_pending().unwrap().unwrap().job.video_id, "first");
        assert_eq!(queue.claim_pending().unwrap().unwrap().job.video_id, "second");
    }

    #[test]
    fn test_malformed_job_is_moved_to_failed_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        enqueue(tmp.path(), "job_1.json", "this is not json");
        enqueue(tmp.path(), "job_2.json", r#"{"video_id": "ok"}"#);

        let queue = JobQueue::open(tmp.path()).unwrap();
        let claimed = queue.claim_pending().unwrap().unwrap();

        assert_eq!(claimed.job.video_id, "ok");
        assert!(tmp.path().join("failed/job_1.json").exists());
    }

    #[test]
    fn test_non_json_files_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        enqueue(tmp.path(), "notes.txt", "not a job");

        let queue = JobQueue::open(tmp.path()).unwrap();
        assert!(queue.claim_pending().unwrap().is_none());
        assert!(tmp.path().join("pending/notes.txt").exists());
    }

    #[test]
    fn test_complete_writes_report_and_releases_claim() {
        let tmp = tempfile::tempdir().unwrap();
        enqueue(tmp.path(), "job_1.json", r#"{"video_id": "abc123"}"#);

        let queue = JobQueue::open(tmp.path()).unwrap();
        let claimed = queue.claim_pending().unwrap().unwrap();
        queue.complete(&claimed, r#"{"copied": true}"#).unwrap();

        let report_path = tmp.path().join("processed/abc123.json");
        assert_eq!(
            fs::read_to_string(report_path).unwrap(),
            r#"{"copied": true}"#
        );
        assert!(!tmp.path().join("claimed/job_1.json").exists());
    }

    #[test]
    fn test_fail_writes_report_to_failed_dir() {
        let tmp = tempfile::tempdir().unwrap();
        enqueue(tmp.path(), "job_1.json", r#"{"video_id": "abc123"}"#);

        let queue = JobQueue::open(tmp.path()).unwrap();
        let claimed = queue.claim_pending().unwrap().unwrap();
        queue.fail(&claimed, r#"{"error": "download failed"}"#).unwrap();

        assert!(tmp.path().join("failed/abc123.json").exists());
        assert!(!tmp.path().join("claimed/job_1.json").exists());
    }
}
