//! Command-line interface definitions
//!
//! This module organizes CLI arguments by **functional usage** - each group
//! contains the options needed by a specific component or subsystem.

use crate::protocol::transport::{DEFAULT_MAX_REQUEST_FRAME_LENGTH, MAX_FRAME_LENGTH};
use crate::protocol::ServerMode;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Largest chunk accepted for client transfers, in KB
///
/// Half the default request frame limit, so a chunk and its envelope always
/// fit in one `write` request.
const MAX_CHUNK_SIZE_KB: usize = DEFAULT_MAX_REQUEST_FRAME_LENGTH / 2 / 1024;

/// RPC bridge serving an HDFS-style namespace through integer stream handles
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,

    /// What to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the namespace over RPC
    Serve(ServeArgs),
    /// List a directory (or describe a file) on a running server
    Ls(LsArgs),
    /// Print a file from a running server to stdout
    Cat(CatArgs),
    /// Upload a local file through a running server
    Put(PutArgs),
    /// Show block placement of a file on a running server
    Blocks(BlocksArgs),
}

// ============================================================================
// FUNCTIONAL GROUPS: Organized by what component consumes them
// ============================================================================

/// Filesystem endpoint configuration
///
/// Used by: `LocalFileSystem::new()`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Filesystem Options")]
pub struct FsConfig {
    /// Host of the filesystem endpoint; qualified paths must name it
    #[arg(long, default_value = "localhost")]
    pub fs_host: String,

    /// Port of the filesystem endpoint
    #[arg(long, default_value = "8020")]
    pub fs_port: u16,

    /// Local directory backing the namespace root
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    /// Block size in MB reported for files
    #[arg(long, default_value = "32")]
    pub block_size_mb: u64,
}

impl FsConfig {
    /// Get block size in bytes
    #[must_use]
    pub const fn block_size_bytes(&self) -> u64 {
        self.block_size_mb * 1024 * 1024
    }

    /// Validate filesystem configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The endpoint host is empty
    /// - The root does not exist or is not a directory
    /// - `block_size_mb` is 0 or greater than 1024
    pub fn validate(&self) -> Result<()> {
        if self.fs_host.trim().is_empty() {
            anyhow::bail!("Filesystem host must not be empty");
        }

        if !self.root.is_dir() {
            anyhow::bail!(
                "Namespace root must be an existing directory: {}",
                self.root.display()
            );
        }

        if self.block_size_mb == 0 || self.block_size_mb > 1024 {
            anyhow::bail!(
                "Block size must be between 1 and 1024 MB, got: {}",
                self.block_size_mb
            );
        }

        Ok(())
    }
}

/// Server configuration
///
/// Used by: `Server::bind()`, runtime construction in `main()`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Server Options")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on
    #[arg(short, long, default_value = "55555")]
    pub port: u16,

    /// Connection scheduling
    ///
    /// `simple` serves one connection at a time; `threaded` serves every
    /// connection concurrently.
    #[arg(long, default_value = "simple")]
    pub mode: ServerMode,

    /// Number of runtime worker threads (0 = auto-detect)
    #[arg(long, default_value = "0")]
    pub worker_threads: usize,

    /// Largest request frame accepted from a client, in MB
    #[arg(long, default_value = "8")]
    pub max_request_mb: usize,
}

impl ServerConfig {
    /// `bind:port`
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Get the actual worker thread count to use
    #[must_use]
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        }
    }

    /// Get the request frame limit in bytes
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_mb * 1024 * 1024
    }

    /// Validate server configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is empty, more than 1024 worker
    /// threads are requested, or the request frame limit is outside
    /// 1..=64 MB.
    pub fn validate(&self) -> Result<()> {
        if self.bind.trim().is_empty() {
            anyhow::bail!("Bind address must not be empty");
        }

        if self.max_request_mb == 0 || self.max_request_mb > MAX_FRAME_LENGTH / (1024 * 1024) {
            anyhow::bail!(
                "Request frame limit must be between 1 and {} MB, got: {}",
                MAX_FRAME_LENGTH / (1024 * 1024),
                self.max_request_mb
            );
        }

        if self.worker_threads > 1024 {
            anyhow::bail!(
                "Worker threads must be at most 1024, got: {}",
                self.worker_threads
            );
        }

        Ok(())
    }
}

/// Connection settings for the client subcommands
///
/// Used by: `Client::connect()`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Connection Options")]
pub struct ConnectConfig {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    pub server: String,

    /// Server port
    #[arg(short, long, default_value = "55555")]
    pub port: u16,

    /// Transfer chunk size in KB
    #[arg(long, default_value = "64")]
    pub chunk_size_kb: usize,
}

impl ConnectConfig {
    /// `server:port`
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    /// Get chunk size in bytes
    #[must_use]
    pub const fn chunk_size_bytes(&self) -> usize {
        self.chunk_size_kb * 1024
    }

    /// Validate connection settings
    ///
    /// # Errors
    ///
    /// Returns an error if the server host is empty or the chunk size is not
    /// between 1 KB and 4 MB.
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            anyhow::bail!("Server host must not be empty");
        }

        if self.chunk_size_kb == 0 || self.chunk_size_kb > MAX_CHUNK_SIZE_KB {
            anyhow::bail!(
                "Chunk size must be between 1 and {} KB, got: {}",
                MAX_CHUNK_SIZE_KB,
                self.chunk_size_kb
            );
        }

        Ok(())
    }
}

/// Output and logging configuration
///
/// Used by: `main()`, logging initialization
#[derive(clap::Args, Debug, Clone, Default)]
#[command(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl OutputConfig {
    /// Maximum level the log subscriber should emit
    #[must_use]
    pub const fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Validate output options
    ///
    /// # Errors
    ///
    /// Returns an error if both `--quiet` and `--verbose` are given.
    pub fn validate(&self) -> Result<()> {
        if self.quiet && self.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }
        Ok(())
    }
}

// ============================================================================
// SUBCOMMAND ARGUMENTS
// ============================================================================

/// Arguments of `serve`
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Filesystem endpoint configuration
    #[command(flatten)]
    pub fs: FsConfig,

    /// Listener configuration
    #[command(flatten)]
    pub server: ServerConfig,
}

/// Arguments of `ls`
#[derive(clap::Args, Debug, Clone)]
pub struct LsArgs {
    /// Connection settings
    #[command(flatten)]
    pub connect: ConnectConfig,

    /// Namespace path to list
    #[arg(value_name = "PATH", default_value = "/")]
    pub path: String,
}

/// Arguments of `cat`
#[derive(clap::Args, Debug, Clone)]
pub struct CatArgs {
    /// Connection settings
    #[command(flatten)]
    pub connect: ConnectConfig,

    /// Namespace path to print
    #[arg(value_name = "PATH")]
    pub path: String,
}

/// Arguments of `put`
#[derive(clap::Args, Debug, Clone)]
pub struct PutArgs {
    /// Connection settings
    #[command(flatten)]
    pub connect: ConnectConfig,

    /// Local file to upload
    #[arg(value_name = "LOCAL")]
    pub local: PathBuf,

    /// Namespace path to create
    #[arg(value_name = "PATH")]
    pub path: String,
}

/// Arguments of `blocks`
#[derive(clap::Args, Debug, Clone)]
pub struct BlocksArgs {
    /// Connection settings
    #[command(flatten)]
    pub connect: ConnectConfig,

    /// Namespace path to inspect
    #[arg(value_name = "PATH")]
    pub path: String,

    /// First byte of the range
    #[arg(long, default_value = "0")]
    pub start: i64,

    /// Length of the range (default: to the end of the file)
    #[arg(long)]
    pub length: Option<i64>,
}

// ============================================================================
// IMPLEMENTATION: Validation
// ============================================================================

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Both --quiet and --verbose options are used
    /// - Any option group of the chosen subcommand is invalid
    /// - `put` names a local file that does not exist
    /// - `blocks` is given a negative start or length
    pub fn validate(&self) -> Result<()> {
        self.output.validate()?;

        match &self.command {
            Command::Serve(serve) => {
                serve.fs.validate()?;
                serve.server.validate()?;
            }
            Command::Ls(LsArgs { connect, .. }) | Command::Cat(CatArgs { connect, .. }) => {
                connect.validate()?;
            }
            Command::Put(put) => {
                put.connect.validate()?;
                if !put.local.is_file() {
                    anyhow::bail!("Local file does not exist: {}", put.local.display());
                }
            }
            Command::Blocks(blocks) => {
                blocks.connect.validate()?;
                if blocks.start < 0 || blocks.length.is_some_and(|length| length < 0) {
                    anyhow::bail!("Block range start and length must not be negative");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("hdfs-bridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_serve_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_str().unwrap();
        let args = parse(&["serve", "--root", root]);

        let Command::Serve(serve) = &args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.fs.fs_host, "localhost");
        assert_eq!(serve.fs.fs_port, 8020);
        assert_eq!(serve.fs.block_size_bytes(), 32 * 1024 * 1024);
        assert_eq!(serve.server.listen_addr(), "0.0.0.0:55555");
        assert_eq!(serve.server.mode, ServerMode::Simple);
        assert!(serve.server.effective_worker_threads() >= 1);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_serve_threaded_mode() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_str().unwrap();
        let args = parse(&["serve", "--root", root, "--mode", "threaded", "-p", "9090"]);
        let Command::Serve(serve) = &args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.server.mode, ServerMode::Threaded);
        assert_eq!(serve.server.port, 9090);
    }

    #[test]
    fn test_validate_missing_root() {
        let args = parse(&["serve", "--root", "/nonexistent/root"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_block_size_bounds() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_str().unwrap();
        let args = parse(&["serve", "--root", root, "--block-size-mb", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_request_frame_limit() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_str().unwrap();

        let args = parse(&["serve", "--root", root]);
        let Command::Serve(serve) = &args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.server.max_request_bytes(), DEFAULT_MAX_REQUEST_FRAME_LENGTH);

        for bad in ["0", "65", "18446744073709551615"] {
            let args = parse(&["serve", "--root", root, "--max-request-mb", bad]);
            assert!(args.validate().is_err(), "{bad} MB accepted");
        }
        let args = parse(&["serve", "--root", root, "--max-request-mb", "64"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        let args = parse(&["-q", "-v", "ls"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let config = OutputConfig {
            verbose: 0,
            quiet: true,
        };
        assert_eq!(config.log_level(), tracing::Level::ERROR);
        let config = OutputConfig {
            verbose: 2,
            quiet: false,
        };
        assert_eq!(config.log_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_client_commands() {
        let args = parse(&["ls", "--server", "nn", "-p", "1234"]);
        let Command::Ls(ls) = &args.command else {
            panic!("expected ls");
        };
        assert_eq!(ls.path, "/");
        assert_eq!(ls.connect.server_addr(), "nn:1234");
        assert_eq!(ls.connect.chunk_size_bytes(), 64 * 1024);

        let args = parse(&["blocks", "/f", "--start=-1"]);
        assert!(args.validate().is_err());

        let args = parse(&["put", "/nonexistent/local", "/remote"]);
        assert!(args.validate().is_err());

        let args = parse(&["cat", "/f", "--chunk-size-kb", "0"]);
        assert!(args.validate().is_err());
    }
}
