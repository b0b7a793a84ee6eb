//! time-machine: replay a recorded dataset into a live process-data server.

use clap::Parser;
use tm_core::cli::{self, Cli};

fn main() {
    let code = cli::run(Cli::parse());
    std::process::exit(code.as_i32());
}
