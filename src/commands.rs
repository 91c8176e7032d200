//! Subcommand implementations
//!
//! `serve` runs the bridge; the other subcommands are thin clients of a running
//! server. Client helpers take an open [`Client`] so they work over any
//! transport.

use crate::backends::LocalFileSystem;
use crate::cli::{BlocksArgs, CatArgs, LsArgs, PutArgs, ServeArgs};
use crate::namespace::FsEndpoint;
use crate::protocol::transport::Transport;
use crate::protocol::{Client, FileStatus, Server};
use crate::service::BridgeService;
use crate::stats::StatsSnapshot;
use anyhow::{Context, Result};
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

/// Build the service from `args` and serve until `shutdown` completes
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn serve<S>(args: &ServeArgs, shutdown: S) -> Result<StatsSnapshot>
where
    S: Future<Output = ()>,
{
    let endpoint = FsEndpoint::new(args.fs.fs_host.clone(), args.fs.fs_port);
    let fs = LocalFileSystem::new(endpoint, &args.fs.root)
        .with_block_size(args.fs.block_size_bytes());
    let listen_addr = args.server.listen_addr();

    let server = Server::bind(&listen_addr, BridgeService::new(fs), args.server.mode)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?
        .with_max_request_frame(args.server.max_request_bytes());
    info!(
        "Listening on {}, namespace root {}",
        server.local_addr()?,
        args.fs.root.display()
    );
    Ok(server.run_until(shutdown).await)
}

/// `ls`: print the entries of a path
///
/// # Errors
///
/// Returns an error if the server cannot be reached or the path is missing.
pub async fn ls<W: Write>(args: &LsArgs, out: &mut W) -> Result<()> {
    let mut client = connect(&args.connect.server_addr()).await?;
    list(&mut client, &args.path, out).await
}

/// `cat`: stream a file to `out`
///
/// # Errors
///
/// Returns an error if the server cannot be reached or the file cannot be read.
pub async fn cat<W: Write>(args: &CatArgs, out: &mut W) -> Result<u64> {
    let mut client = connect(&args.connect.server_addr()).await?;
    download(&mut client, &args.path, args.connect.chunk_size_bytes(), out).await
}

/// `put`: upload a local file
///
/// # Errors
///
/// Returns an error if the local file cannot be read or the upload fails.
pub async fn put(args: &PutArgs) -> Result<u64> {
    let file = tokio::fs::File::open(&args.local)
        .await
        .with_context(|| format!("Failed to open {}", args.local.display()))?;
    let mut client = connect(&args.connect.server_addr()).await?;
    upload(&mut client, file, &args.path, args.connect.chunk_size_bytes()).await
}

/// `blocks`: print block placement of a file
///
/// # Errors
///
/// Returns an error if the server cannot be reached or the query fails.
pub async fn blocks<W: Write>(args: &BlocksArgs, out: &mut W) -> Result<()> {
    let mut client = connect(&args.connect.server_addr()).await?;
    let length = args.length.unwrap_or(i64::MAX);
    print_blocks(&mut client, &args.path, args.start, length, out).await
}

async fn connect(addr: &str) -> Result<Client> {
    Client::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {addr}"))
}

/// Print one line per entry of `path`
///
/// # Errors
///
/// Returns an error if the call fails, the path does not exist, or `out`
/// cannot be written.
pub async fn list<T: Transport, W: Write>(
    client: &mut Client<T>,
    path: &str,
    out: &mut W,
) -> Result<()> {
    let Some(statuses) = client.list_status(path).await? else {
        anyhow::bail!("{path}: No such file or directory");
    };
    for status in &statuses {
        writeln!(out, "{}", format_status(status))?;
    }
    Ok(())
}

/// Render a status as an `ls -l` style line
#[must_use]
pub fn format_status(status: &FileStatus) -> String {
    format!(
        "{}{} {:>3} {:<10} {:<10} {:>12} {:>14} {}",
        if status.is_dir { 'd' } else { '-' },
        status.permission,
        if status.is_dir {
            "-".to_string()
        } else {
            status.block_replication.to_string()
        },
        status.owner,
        status.group,
        status.length,
        status.modification_time,
        status.path
    )
}

/// Copy a remote file to `out` in `chunk_size` reads
///
/// Returns the number of bytes copied. The read handle is released even when
/// writing to `out` fails.
///
/// # Errors
///
/// Returns an error if opening or reading the remote file fails, or `out`
/// cannot be written.
pub async fn download<T: Transport, W: Write>(
    client: &mut Client<T>,
    path: &str,
    chunk_size: usize,
    out: &mut W,
) -> Result<u64> {
    let handle = client
        .open(path)
        .await
        .with_context(|| format!("Failed to open {path}"))?;
    let result = download_from(client, handle, chunk_size, out).await;
    client.close_read(handle).await?;
    result
}

async fn download_from<T: Transport, W: Write>(
    client: &mut Client<T>,
    handle: i64,
    chunk_size: usize,
    out: &mut W,
) -> Result<u64> {
    let size = i32::try_from(chunk_size).unwrap_or(i32::MAX);
    let mut offset: i64 = 0;
    loop {
        let data = client.read(handle, offset, size).await?;
        if data.is_empty() {
            break;
        }
        out.write_all(&data)?;
        offset += i64::try_from(data.len())?;
    }
    out.flush()?;
    debug!("Downloaded {} bytes through handle {}", offset, handle);
    Ok(offset.unsigned_abs())
}

/// Copy everything from `source` into a new remote file
///
/// Returns the number of bytes uploaded.
///
/// # Errors
///
/// Returns an error if reading `source` fails, the remote file cannot be
/// created, or the server drops the handle mid-upload.
pub async fn upload<T: Transport, R: AsyncRead + Unpin>(
    client: &mut Client<T>,
    mut source: R,
    path: &str,
    chunk_size: usize,
) -> Result<u64> {
    let handle = client
        .create(path)
        .await
        .with_context(|| format!("Failed to create {path}"))?;

    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        if !client.write(handle, &buffer[..n]).await? {
            anyhow::bail!("Write handle {handle} for {path} was closed during upload");
        }
        total += n as u64;
    }

    if !client.close_write(handle).await? {
        anyhow::bail!("Write handle {handle} for {path} was already closed");
    }
    debug!("Uploaded {} bytes through handle {}", total, handle);
    Ok(total)
}

/// Print one line per block overlapping `[start, start + length)`
///
/// # Errors
///
/// Returns an error if the call fails or `out` cannot be written.
pub async fn print_blocks<T: Transport, W: Write>(
    client: &mut Client<T>,
    path: &str,
    start: i64,
    length: i64,
    out: &mut W,
) -> Result<()> {
    for block in client.get_file_block_locations(path, start, length).await? {
        writeln!(
            out,
            "offset={} length={} hosts={} names={}",
            block.offset,
            block.length,
            block.hosts.join(","),
            block.names.join(",")
        )?;
    }
    Ok(())
}
