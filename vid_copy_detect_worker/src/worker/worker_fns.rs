use std::{
    error::Error,
    fs,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use ffmpeg_frame_utils::{
    ffmpeg_and_ffprobe_are_callable, is_video_file, FfmpegError, FrameSamplerBuilder,
};
use vid_copy_detect_lib::{
    detect_reuse, DetectionProvider, MatchCfg, MatchThreshold, ReferenceCorpus, SimilarityCfg,
};

use crate::worker::{
    arg_parse,
    detector::CmdlineDetector,
    downloader,
    job_queue::{JobQueue, VideoJob},
    reference::build_reference_corpus,
    report::{FailureReport, VideoReport},
    ReportVerbosity, WorkerCfg, WorkerError, DETECT_FRAME_SIZE,
};

pub fn run_worker() -> i32 {
    let cfg = match arg_parse::parse_args() {
        Ok(cfg) => cfg,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            let () = eprintln!("{e}");
            return 2;
        }
    };

    configure_logs(cfg.verbosity);

    match run_worker_inner(&cfg) {
        Ok(()) => 0,
        Err(fatal_error) => {
            print_fatal_err(fatal_error, cfg.verbosity);
            1
        }
    }
}

fn run_worker_inner(cfg: &WorkerCfg) -> eyre::Result<()> {
    if !ffmpeg_and_ffprobe_are_callable() {
        return Err(eyre::Report::msg(
            "ffmpeg and ffprobe must be installed and visible on the command line",
        ));
    }

    //validate the comparison knobs before any expensive work
    let threshold = MatchThreshold::new(cfg.match_threshold)?;
    let similarity = SimilarityCfg::new(cfg.weight_threshold)?;
    if !(0.0..=1.0).contains(&cfg.copied_fraction) {
        return Err(eyre::Report::msg(format!(
            "copied fraction out of range: {}",
            cfg.copied_fraction
        )));
    }

    fs::create_dir_all(&cfg.scratch_dir).map_err(|e| WorkerError::Scratch {
        path: cfg.scratch_dir.clone(),
        source: e,
    })?;

    let mut detector = CmdlineDetector::new(&cfg.detector_cmd, &cfg.scratch_dir)?;

    info!(
        "building reference corpus from {}",
        cfg.reference_video.display()
    );
    let corpus = build_reference_corpus(&cfg.reference_video, cfg.frame_interval, &mut detector)?;
    info!("reference corpus ready: {} frames", corpus.len());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let queue = JobQueue::open(&cfg.queue_dir)?;

    loop {
        if stop.load(Ordering::SeqCst) {
            info!("shutdown requested, stopping");
            break;
        }

        let Some(claimed) = queue.claim_pending()? else {
            if cfg.once {
                info!("queue drained");
                break;
            }
            sleep_interruptibly(cfg.poll_secs, &stop);
            continue;
        };

        info!("processing video {}", claimed.job.video_id);
        match process_video(
            cfg,
            threshold,
            similarity,
            &mut detector,
            &corpus,
            &stop,
            &claimed.job,
        ) {
            Ok(report) => {
                info!(
                    "video {}: copied={} copy_percentage={:.2} segments={}",
                    report.video_id,
                    report.copied,
                    report.copy_percentage,
                    report.timestamps.len()
                );
                queue.complete(&claimed, &report.to_json()?)?;
            }

            //leave the claim in place so a later run picks the job up again
            Err(WorkerError::Aborted) => {
                info!(
                    "shutdown requested mid-job, leaving {} claimed",
                    claimed.job.video_id
                );
                break;
            }

            Err(e) => {
                warn!("video {} failed: {e}", claimed.job.video_id);
                let failure = FailureReport::new(&claimed.job.video_id, &e);
                queue.fail(&claimed, &failure.to_json()?)?;
            }
        }
    }

    Ok(())
}

/// Run the whole pipeline for one claimed job: download, sample frames, run
/// the detector, compare against the corpus. The job's scratch directory is
/// removed afterwards whatever the outcome.
fn process_video(
    cfg: &WorkerCfg,
    threshold: MatchThreshold,
    similarity: SimilarityCfg,
    detector: &mut CmdlineDetector,
    corpus: &ReferenceCorpus,
    stop: &AtomicBool,
    job: &VideoJob,
) -> Result<VideoReport, WorkerError> {
    let job_scratch = cfg.scratch_dir.join(&job.video_id);
    fs::create_dir_all(&job_scratch).map_err(|e| WorkerError::Scratch {
        path: job_scratch.clone(),
        source: e,
    })?;

    let result = process_video_inner(cfg, threshold, similarity, detector, corpus, stop, job, &job_scratch);

    //best-effort cleanup; a stale scratch dir only wastes disk space
    if let Err(e) = fs::remove_dir_all(&job_scratch) {
        warn!("failed to remove scratch dir {}: {e}", job_scratch.display());
    }

    result
}

#[allow(clippy::too_many_arguments)]
fn process_video_inner(
    cfg: &WorkerCfg,
    threshold: MatchThreshold,
    similarity: SimilarityCfg,
    detector: &mut CmdlineDetector,
    corpus: &ReferenceCorpus,
    stop: &AtomicBool,
    job: &VideoJob,
    job_scratch: &Path,
) -> Result<VideoReport, WorkerError> {
    check_abort(stop)?;
    let video_path = downloader::download_video(&job.source_url(), job_scratch, &job.video_id)?;

    if !is_video_file(&video_path)? {
        return Err(WorkerError::Download {
            video_id: job.video_id.clone(),
            reason: "downloaded file is not a playable video".to_string(),
        });
    }

    check_abort(stop)?;
    let (width, height) = DETECT_FRAME_SIZE;
    let (mut frames, info) = FrameSamplerBuilder::new(&video_path)
        .frame_interval(cfg.frame_interval)
        .target_size(width, height)
        .spawn()?;

    //frame indices count sampled frames, so timestamps need the sampled rate
    let sampled_fps = info.fps() / f64::from(cfg.frame_interval);
    let match_cfg = MatchCfg::new(sampled_fps)?
        .with_threshold(threshold)
        .with_similarity(similarity)
        .with_min_duration(cfg.min_duration_secs);

    let mut frame_results = Vec::new();
    for frame in frames.by_ref() {
        check_abort(stop)?;
        frame_results.push(detector.detect(&frame));
    }

    // A decode timeout leaves only a prefix of the video behind; a verdict
    // over that prefix would be fabricated, so fail the job instead.
    if frames.timed_out() {
        return Err(WorkerError::FrameExtraction(FfmpegError::DecodeTimeout));
    }

    if frame_results.is_empty() {
        return Err(WorkerError::NoFrames(video_path));
    }

    let reuse = detect_reuse(corpus, frame_results, &match_cfg)?;
    Ok(VideoReport::new(&job.video_id, &reuse, cfg.copied_fraction))
}

fn check_abort(stop: &AtomicBool) -> Result<(), WorkerError> {
    if stop.load(Ordering::SeqCst) {
        return Err(WorkerError::Aborted);
    }
    Ok(())
}

//sleep in one-second slices so shutdown stays responsive
fn sleep_interruptibly(secs: u64, stop: &AtomicBool) {
    for _ in 0..secs {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}

fn print_fatal_err(fatal_err: eyre::Report, verbosity: ReportVerbosity) {
    error!(target: "worker-errorlog", "{}", fatal_err);

    if verbosity == ReportVerbosity::Verbose {
        let mut source: Option<&(dyn Error + 'static)> = fatal_err.source();
        while let Some(e) = source {
            error!(target: "worker-errorlog", "    caused by: {}", e);
            source = e.source();
        }
    }
}

pub fn configure_logs(verbosity: ReportVerbosity) {
    use simplelog::*;

    let mut cfg = simplelog::ConfigBuilder::new();

    let min_loglevel = match verbosity {
        ReportVerbosity::Quiet => LevelFilter::Warn,
        ReportVerbosity::Default => LevelFilter::Info,
        ReportVerbosity::Verbose => LevelFilter::Trace,
    };

    TermLogger::init(
        min_loglevel,
        cfg.build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .expect("TermLogger failed to initialize");
}
