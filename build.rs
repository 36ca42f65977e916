//! Renders the `volhook(8)` manual page from the clap definition.
//!
//! The hook is an administrative tool invoked by container runtimes, so the
//! page lands in section 8. It is written to `OUT_DIR/volhook.8` for
//! packaging to pick up.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

const MAN_SECTION: &str = "8";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    for watched in ["build.rs", "src/cli/mod.rs"] {
        writeln!(stdout, "cargo:rerun-if-changed={watched}")?;
    }

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR was not set"))?;

    let mut page = Vec::new();
    Man::new(cli::Cli::command())
        .section(MAN_SECTION)
        .render(&mut page)?;
    fs::write(out_dir.join(format!("volhook.{MAN_SECTION}")), page)?;

    Ok(())
}
