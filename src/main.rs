use clap::Parser;
use cloudctl::cli::LogLevel;
use cloudctl::Cli;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::MakeWriterExt;

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Unable to open log file {}: {}", log_path.display(), err);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudctl {} started with log level: {:?}", cloudctl::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudctl").join("cloudctl.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudctl").join("cloudctl.log");
    }
    PathBuf::from("cloudctl.log")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = setup_logging(cli.log_level);

    let code = cloudctl::run(cli).await;

    // Flush the log writer before exiting
    drop(log_guard);
    std::process::exit(code);
}
