mod arg_parse;
mod detector;
mod downloader;
mod errors;
mod job_queue;
mod reference;
mod report;
mod worker_cfg;
mod worker_fns;

pub(crate) use errors::*;
pub(crate) use worker_cfg::*;

pub use worker_fns::run_worker;
