#![warn(clippy::cast_lossless)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]

#[macro_use]
extern crate log;

mod worker;

fn main() {
    let return_code = worker::run_worker();
    std::process::exit(return_code)
}
