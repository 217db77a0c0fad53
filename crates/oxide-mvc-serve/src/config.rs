//! Command-line and environment configuration.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context as _;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Token in the log file path replaced with the listening port.
pub const PORT_TOKEN: &str = "{{PORT}}";

/// Serve an oxide-mvc application over HTTP/1.
#[derive(Debug, Parser)]
#[command(name = "oxide-mvc-serve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log file. `{{PORT}}` is replaced with the port; logs go to stderr when unset.
    #[arg(short, long, env = "BASE_LOG_FILE")]
    pub log_file: Option<String>,

    /// Application environment name.
    #[arg(short, long, env = "APPLICATION_ENV", default_value = "dev")]
    pub environment: String,

    /// Prefix the application is mounted under, e.g. `/app`.
    #[arg(short, long, env = "SCRIPT_NAME")]
    pub mount_path: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolved log file path, if logging to a file.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(|path| PathBuf::from(path.replace(PORT_TOKEN, &self.port.to_string())))
    }

    /// `DEBUG` with `--verbose`, `INFO` otherwise.
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// Installs the global tracing subscriber.
    pub fn init_logging(&self) -> anyhow::Result<()> {
        let builder = FmtSubscriber::builder()
            .with_max_level(self.log_level())
            .with_target(false);

        match self.log_file_path() {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("cannot open log file {}", path.display()))?;
                let subscriber = builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .finish();
                tracing::subscriber::set_global_default(subscriber)?;
            }
            None => {
                let subscriber = builder
                    .without_time()
                    .with_writer(std::io::stderr)
                    .finish();
                tracing::subscriber::set_global_default(subscriber)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_port_substitution() {
        let cli = Cli::try_parse_from([
            "oxide-mvc-serve",
            "--port",
            "9001",
            "--log-file",
            "/var/log/app-{{PORT}}.log",
        ])
        .unwrap();
        assert_eq!(cli.port, 9001);
        assert_eq!(
            cli.log_file_path(),
            Some(PathBuf::from("/var/log/app-9001.log"))
        );
    }

    #[test]
    fn test_empty_log_file_means_stderr() {
        let cli = Cli::try_parse_from(["oxide-mvc-serve", "--log-file", ""]).unwrap();
        assert_eq!(cli.log_file_path(), None);
    }

    #[test]
    fn test_verbose_raises_level() {
        let cli = Cli::try_parse_from(["oxide-mvc-serve", "-v", "-m", "/app"]).unwrap();
        assert_eq!(cli.log_level(), Level::DEBUG);
        assert_eq!(cli.mount_path.as_deref(), Some("/app"));
    }
}
