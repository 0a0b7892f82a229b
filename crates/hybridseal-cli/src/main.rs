//! hybridseal CLI
//!
//! Generates an RSA-wrapped ChaCha20 key set, then encrypts and decrypts the
//! configured files with it. Exit codes identify the failing error kind.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use hybridseal_cli::{Cli, execute, exit_code, exit_code_for, resolve_config};
use hybridseal_core::tracing_init::init_tracing;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli.overrides) {
        Ok(config) => config,
        Err(e) => {
            let _ = writeln!(io::stderr(), "Error: {e}");
            return ExitCode::from(exit_code(e.kind()));
        }
    };

    init_tracing(&config.logging.level, config.logging.json);
    info!(version = env!("CARGO_PKG_VERSION"), mode = ?cli.mode, "Starting hybridseal");

    let mut stdout = io::stdout().lock();
    match execute(cli.mode, &config, cli.overrides.passphrase, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = writeln!(io::stderr(), "Error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
