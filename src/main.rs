use std::process::ExitCode;

use env_logger::Env;
use particle_bloom::Visualizer;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut visualizer = Visualizer::new();
    if let Some(dir) = std::env::args_os().nth(1) {
        visualizer = visualizer.with_shader_dir(dir);
    }

    match visualizer.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
