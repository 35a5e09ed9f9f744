//! SFTP Directory Listing Example
//!
//! This example demonstrates how to:
//! - Open the "sftp" subsystem through the system `ssh` binary
//! - Negotiate SFTP v3
//! - List a remote directory
//!
//! Usage:
//!   cargo run --example sftp_ls <[user@]host> [path]
//!
//! Example:
//!   RUST_LOG=filexfer_proto=debug cargo run --example sftp_ls admin@127.0.0.1 /var/log

use async_trait::async_trait;
use filexfer_platform::{IoStream, SubsystemOpener, XferError, XferResult};
use filexfer_proto::sftp::{SftpClient, SftpConfig};
use std::env;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing_subscriber::EnvFilter;

/// Opens subsystems with `ssh -s <host> <subsystem>`.
struct SshCommand {
    destination: String,
    child: Mutex<Option<Child>>,
}

#[async_trait]
impl SubsystemOpener for SshCommand {
    type Stream = IoStream<ChildStdout, ChildStdin>;

    async fn open_channel(&self, subsystem: &str) -> XferResult<Self::Stream> {
        let mut child = Command::new("ssh")
            .arg("-s")
            .arg(&self.destination)
            .arg(subsystem)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| XferError::ChannelClosed("ssh stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| XferError::ChannelClosed("ssh stdout unavailable".to_string()))?;

        if let Ok(mut slot) = self.child.lock() {
            *slot = Some(child);
        }
        Ok(IoStream::new(stdout, stdin))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <[user@]host> [path]", args[0]);
        eprintln!("Example: {} admin@127.0.0.1 /var/log", args[0]);
        std::process::exit(1);
    }

    let destination = args[1].clone();
    let path = args.get(2).map(String::as_str).unwrap_or(".");

    println!("Opening SFTP session to {}...", destination);

    let opener = SshCommand {
        destination,
        child: Mutex::new(None),
    };
    let mut sftp = SftpClient::connect(&opener, SftpConfig::default()).await?;

    println!("✓ Negotiated SFTP v{}", sftp.server_version().unwrap_or(0));
    for (name, data) in sftp.extensions() {
        println!("  Extension: {} ({})", name, data);
    }

    let resolved = sftp.canonicalize(path).await?;
    println!();
    println!("Listing {}:", resolved);

    for entry in sftp.read_dir(&resolved).await? {
        println!("  {}", entry.longname);
    }

    sftp.shutdown().await?;
    println!("✓ Session closed");

    Ok(())
}
