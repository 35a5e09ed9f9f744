//! OpenSSH interoperability tests.
//!
//! These tests drive a real OpenSSH `sftp-server` binary over its
//! stdin/stdout, which speaks the same framing it would over an SSH channel.
//!
//! # Running these tests
//!
//! These tests need an `sftp-server` binary and are marked as `#[ignore]`
//! by default. To run them:
//!
//! ```bash
//! # Override the binary location if needed
//! export SFTP_SERVER_PATH=/usr/lib/openssh/sftp-server
//! cargo test --test openssh_interop -- --ignored --nocapture
//! ```

use filexfer_platform::{IoStream, SubsystemOpener, XferError, XferResult};
use filexfer_proto::sftp::{FileAttributes, FileType, SftpClient, SftpConfig, StatusCode};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

const DEFAULT_SERVER_PATH: &str = "/usr/lib/openssh/sftp-server";

/// Opens the "sftp" subsystem by spawning a local `sftp-server`.
struct LocalSftpServer {
    program: String,
    children: Mutex<Vec<Child>>,
}

impl LocalSftpServer {
    fn from_env() -> Self {
        Self {
            program: std::env::var("SFTP_SERVER_PATH")
                .unwrap_or_else(|_| DEFAULT_SERVER_PATH.to_string()),
            children: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl SubsystemOpener for LocalSftpServer {
    type Stream = IoStream<ChildStdout, ChildStdin>;

    async fn open_channel(&self, subsystem: &str) -> XferResult<Self::Stream> {
        if subsystem != "sftp" {
            return Err(XferError::ChannelClosed(format!(
                "unknown subsystem {:?}",
                subsystem
            )));
        }

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| XferError::ChannelClosed("no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| XferError::ChannelClosed("no stdout".to_string()))?;

        self.children
            .lock()
            .map_err(|_| XferError::ChannelClosed("child registry poisoned".to_string()))?
            .push(child);
        Ok(IoStream::new(stdout, stdin))
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("filexfer-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// Test version negotiation with a real server.
#[tokio::test]
#[ignore]
async fn test_negotiate_with_sftp_server() -> Result<(), Box<dyn std::error::Error>> {
    let server = LocalSftpServer::from_env();
    let mut sftp = SftpClient::connect(&server, SftpConfig::default()).await?;

    println!("✓ Negotiated SFTP v{:?}", sftp.server_version());
    for (name, data) in sftp.extensions() {
        println!("  extension: {} = {}", name, data);
    }
    assert_eq!(sftp.server_version(), Some(3));

    sftp.shutdown().await?;
    Ok(())
}

/// Test the full set of file operations against a real server.
#[tokio::test]
#[ignore]
async fn test_file_operations_with_sftp_server() -> Result<(), Box<dyn std::error::Error>> {
    let server = LocalSftpServer::from_env();
    let mut sftp = SftpClient::connect(&server, SftpConfig::default()).await?;

    let root = scratch_dir("ops");
    let root_str = root.to_str().ok_or("non-utf8 temp dir")?.to_string();
    let file_t = format!("{}/file_t", root_str);
    let file_r = format!("{}/file_r", root_str);
    let link = format!("{}/pier", root_str);

    sftp.make_dir(&root_str, &FileAttributes::new().with_permissions(0o755))
        .await?;
    assert!(sftp.stat(&root_str).await?.is_dir());

    sftp.open_create(&file_t, &FileAttributes::new()).await?;
    sftp.write_file(&file_t, b"Taco").await?;
    assert_eq!(sftp.read_file(&file_t, 1024, 0).await?, b"Taco");

    sftp.set_stat(&file_t, &FileAttributes::new().with_size(1000))
        .await?;
    assert_eq!(sftp.stat(&file_t).await?.size(), Some(1000));

    sftp.symlink(&link, &file_t).await?;
    assert_eq!(sftp.read_link(&link).await?, file_t);
    assert_eq!(
        sftp.lstat(&link).await?.file_type(),
        Some(FileType::SymbolicLink)
    );

    let mut names = sftp.list_names(&root_str).await?;
    names.sort();
    assert_eq!(names, vec![".", "..", "file_t", "pier"]);

    sftp.rename(&file_t, &file_r).await?;
    let canonical = sftp.canonicalize(&format!("{}/./file_r", root_str)).await?;
    assert!(canonical.ends_with("/file_r"));

    // READ past the end of the file
    let err = sftp.read_file(&file_r, 16, 4096).await.unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::Eof));

    sftp.remove(&link).await?;
    sftp.remove(&file_r).await?;
    sftp.remove_dir(&root_str).await?;

    let err = sftp.stat(&root_str).await.unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::NoSuchFile));

    sftp.shutdown().await?;
    Ok(())
}
