use std::env;
use std::process::ExitCode;

use pyproject_metadata::StandardMetadata;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let path = env::args().nth(1).unwrap_or_else(|| "pyproject.toml".to_string());
    let metadata = match StandardMetadata::from_pyproject_path(&path) {
        Ok(metadata) => metadata,
        Err(e) => {
            eprintln!("{path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    match metadata.as_rfc822() {
        Ok(core) => {
            print!("{core}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{path}: {e}");
            ExitCode::FAILURE
        }
    }
}
