//! Entry point for the `shipit` binary.
//!
//! The main function stays minimal: it initializes logging and the tokio
//! runtime, delegates to the library, and maps errors to exit codes.

use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to initialize async runtime: {e}");
            process::exit(1);
        }
    };

    match runtime.block_on(shipit_cli_tools::run()) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e.render());
            process::exit(e.exit_code());
        }
    }
}
