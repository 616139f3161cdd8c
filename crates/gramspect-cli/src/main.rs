mod cli;
mod lookup;
mod svg;
mod tools;
mod transport;

use std::process::ExitCode;

use gramspect_lib::{Engine, EngineConfig};

fn main() -> ExitCode {
    // Stderr carries logs; stdout is protocol-only.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let matches = cli::build_cli().get_matches();
    let config = match cli::load_config(matches.get_one::<String>("config")) {
        Ok(config) => config,
        Err(message) => {
            log::error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    run(config)
}

fn run(config: EngineConfig) -> ExitCode {
    let engine = Engine::new(config);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match transport::serve(&engine, stdin.lock(), stdout.lock()) {
        Ok(()) => {
            log::info!("clean shutdown");
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("transport failed: {error}");
            ExitCode::FAILURE
        }
    }
}
