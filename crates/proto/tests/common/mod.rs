//! In-process SFTP v3 server used by the integration tests.
//!
//! Serves a small in-memory tree over one half of a `tokio::io::duplex`
//! pipe and records the type of every request it receives.

#![allow(dead_code)]

use filexfer_platform::IoStream;
use filexfer_proto::sftp::message::Field;
use filexfer_proto::sftp::{FileAttributes, Packet, SftpMessageType, StatusCode};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream as PipeEnd};
use tokio::task::JoinHandle;

/// Routes client logs to the test harness; set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Home directory REALPATH resolves relative paths against.
pub const HOME: &str = "/home/sftp";

#[derive(Debug, Clone)]
pub enum Node {
    File(Vec<u8>),
    Dir,
    Link(String),
}

/// Knobs for misbehaving servers.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Version advertised in the VERSION reply
    pub version: u32,
    /// Entries per READDIR page
    pub page_size: usize,
    /// Status returned for every READ instead of data
    pub fail_read: Option<StatusCode>,
    /// Status returned for every WRITE instead of OK
    pub fail_write: Option<StatusCode>,
    /// Status returned for every CLOSE instead of OK
    pub fail_close: Option<StatusCode>,
    /// Stop answering after this many requests
    pub answer_limit: Option<usize>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            version: 3,
            page_size: 2,
            fail_read: None,
            fail_write: None,
            fail_close: None,
            answer_limit: None,
        }
    }
}

enum OpenHandle {
    File(String),
    Dir { entries: Vec<String>, cursor: usize },
}

/// Requests seen by the server, by message type.
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<SftpMessageType>>>);

impl RequestLog {
    pub fn types(&self) -> Vec<SftpMessageType> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, msg_type: SftpMessageType) -> usize {
        self.types().into_iter().filter(|t| *t == msg_type).count()
    }
}

pub struct FakeServer {
    tree: BTreeMap<String, Node>,
    handles: HashMap<Vec<u8>, OpenHandle>,
    next_handle: u32,
    options: ServerOptions,
    log: RequestLog,
}

impl FakeServer {
    pub fn new(options: ServerOptions) -> Self {
        let mut tree = BTreeMap::new();
        tree.insert(HOME.to_string(), Node::Dir);
        Self {
            tree,
            handles: HashMap::new(),
            next_handle: 0,
            options,
            log: RequestLog::default(),
        }
    }

    pub fn with_file(mut self, path: &str, data: &[u8]) -> Self {
        self.tree.insert(path.to_string(), Node::File(data.to_vec()));
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.tree.insert(path.to_string(), Node::Dir);
        self
    }

    /// Starts serving; returns the client end of the pipe.
    pub fn spawn(
        self,
    ) -> (
        IoStream<tokio::io::ReadHalf<PipeEnd>, tokio::io::WriteHalf<PipeEnd>>,
        RequestLog,
        JoinHandle<BTreeMap<String, Node>>,
    ) {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let log = self.log.clone();
        let task = tokio::spawn(self.serve(server_end));
        (IoStream::from_duplex(client_end), log, task)
    }

    async fn serve(mut self, mut pipe: PipeEnd) -> BTreeMap<String, Node> {
        let mut answered = 0usize;
        loop {
            let len = match pipe.read_u32().await {
                Ok(len) => len as usize,
                Err(_) => break,
            };
            let mut body = vec![0u8; len];
            if pipe.read_exact(&mut body).await.is_err() {
                break;
            }

            let msg_type = SftpMessageType::from_u8(body[0]).expect("known request type");
            self.log.0.lock().unwrap().push(msg_type);

            if let Some(limit) = self.options.answer_limit {
                if answered >= limit {
                    continue;
                }
            }
            answered += 1;

            let reply = self.handle(msg_type, &body[1..]);
            if pipe.write_all(&reply).await.is_err() {
                break;
            }
        }
        self.tree
    }

    fn handle(&mut self, msg_type: SftpMessageType, payload: &[u8]) -> Vec<u8> {
        if msg_type == SftpMessageType::Init {
            return Packet::new(SftpMessageType::Version)
                .push(Field::Uint32(self.options.version))
                .push(Field::text("limits@openssh.com"))
                .push(Field::text("1"))
                .to_bytes();
        }

        let mut req = Request::new(payload);
        let id = req.u32();

        match msg_type {
            SftpMessageType::Open => {
                let path = req.text();
                let pflags = req.u32();
                match self.tree.get(&path) {
                    Some(Node::File(_)) => self.open_handle(id, OpenHandle::File(path)),
                    Some(_) => status(id, StatusCode::Failure),
                    None if pflags & 0x08 != 0 => {
                        self.tree.insert(path.clone(), Node::File(Vec::new()));
                        self.open_handle(id, OpenHandle::File(path))
                    }
                    None => status(id, StatusCode::NoSuchFile),
                }
            }
            SftpMessageType::Close => {
                let handle = req.bytes();
                if self.handles.remove(&handle).is_none() {
                    return status(id, StatusCode::Failure);
                }
                match self.options.fail_close {
                    Some(code) => status(id, code),
                    None => status(id, StatusCode::Ok),
                }
            }
            SftpMessageType::Read => {
                let handle = req.bytes();
                let offset = req.u64() as usize;
                let len = req.u32() as usize;
                if let Some(code) = self.options.fail_read {
                    return status(id, code);
                }
                let data = match self.file_for(&handle) {
                    Some(data) => data,
                    None => return status(id, StatusCode::Failure),
                };
                if offset >= data.len() {
                    return status(id, StatusCode::Eof);
                }
                let end = data.len().min(offset + len);
                Packet::with_id(SftpMessageType::Data, id)
                    .push(Field::bytes(&data[offset..end]))
                    .to_bytes()
            }
            SftpMessageType::Write => {
                let handle = req.bytes();
                let offset = req.u64() as usize;
                let data = req.bytes();
                if let Some(code) = self.options.fail_write {
                    return status(id, code);
                }
                let path = match self.handles.get(&handle) {
                    Some(OpenHandle::File(path)) => path.clone(),
                    _ => return status(id, StatusCode::Failure),
                };
                if let Some(Node::File(contents)) = self.tree.get_mut(&path) {
                    if contents.len() < offset + data.len() {
                        contents.resize(offset + data.len(), 0);
                    }
                    contents[offset..offset + data.len()].copy_from_slice(&data);
                }
                status(id, StatusCode::Ok)
            }
            SftpMessageType::Stat | SftpMessageType::LStat => {
                let mut path = req.text();
                if msg_type == SftpMessageType::Stat {
                    if let Some(Node::Link(target)) = self.tree.get(&path) {
                        path = target.clone();
                    }
                }
                match self.tree.get(&path) {
                    Some(node) => Packet::with_id(SftpMessageType::Attrs, id)
                        .push(Field::Attrs(attrs_of(node)))
                        .to_bytes(),
                    None => status(id, StatusCode::NoSuchFile),
                }
            }
            SftpMessageType::SetStat => {
                let path = req.text();
                let attrs = req.attrs();
                match (self.tree.get_mut(&path), attrs.size()) {
                    (Some(Node::File(contents)), Some(size)) => {
                        contents.resize(size as usize, 0);
                        status(id, StatusCode::Ok)
                    }
                    (Some(_), _) => status(id, StatusCode::Ok),
                    (None, _) => status(id, StatusCode::NoSuchFile),
                }
            }
            SftpMessageType::OpenDir => {
                let path = req.text();
                match self.tree.get(&path) {
                    Some(Node::Dir) => {
                        let entries = self.children(&path);
                        self.open_handle(id, OpenHandle::Dir { entries, cursor: 0 })
                    }
                    Some(_) => status(id, StatusCode::Failure),
                    None => status(id, StatusCode::NoSuchFile),
                }
            }
            SftpMessageType::ReadDir => {
                let handle = req.bytes();
                let page_size = self.options.page_size;
                let page: Vec<String> = match self.handles.get_mut(&handle) {
                    Some(OpenHandle::Dir { entries, cursor }) => {
                        let page = entries.iter().skip(*cursor).take(page_size).cloned().collect();
                        *cursor += page_size;
                        page
                    }
                    _ => return status(id, StatusCode::Failure),
                };
                if page.is_empty() {
                    return status(id, StatusCode::Eof);
                }
                let mut reply = Packet::with_id(SftpMessageType::Name, id)
                    .push(Field::Uint32(page.len() as u32));
                for path in &page {
                    let name = path.rsplit('/').next().unwrap_or(path);
                    let attrs = self.tree.get(path).map(attrs_of).unwrap_or_default();
                    reply = reply
                        .push(Field::text(name))
                        .push(Field::text(&format!("-rw-r--r-- 1 sftp sftp 0 {}", name)))
                        .push(Field::Attrs(attrs));
                }
                reply.to_bytes()
            }
            SftpMessageType::Remove => {
                let path = req.text();
                match self.tree.get(&path) {
                    Some(Node::Dir) => status(id, StatusCode::Failure),
                    Some(_) => {
                        self.tree.remove(&path);
                        status(id, StatusCode::Ok)
                    }
                    None => status(id, StatusCode::NoSuchFile),
                }
            }
            SftpMessageType::MkDir => {
                let path = req.text();
                if self.tree.contains_key(&path) {
                    return status(id, StatusCode::Failure);
                }
                self.tree.insert(path, Node::Dir);
                status(id, StatusCode::Ok)
            }
            SftpMessageType::RmDir => {
                let path = req.text();
                match self.tree.get(&path) {
                    Some(Node::Dir) if self.children(&path).is_empty() => {
                        self.tree.remove(&path);
                        status(id, StatusCode::Ok)
                    }
                    Some(_) => status(id, StatusCode::Failure),
                    None => status(id, StatusCode::NoSuchFile),
                }
            }
            SftpMessageType::RealPath => {
                let path = req.text();
                name_reply(id, &canonical(&path))
            }
            SftpMessageType::Rename => {
                let old_path = req.text();
                let new_path = req.text();
                if self.tree.contains_key(&new_path) {
                    return status(id, StatusCode::Failure);
                }
                match self.tree.remove(&old_path) {
                    Some(node) => {
                        self.tree.insert(new_path, node);
                        status(id, StatusCode::Ok)
                    }
                    None => status(id, StatusCode::NoSuchFile),
                }
            }
            SftpMessageType::ReadLink => {
                let path = req.text();
                match self.tree.get(&path) {
                    Some(Node::Link(target)) => name_reply(id, target),
                    Some(_) => status(id, StatusCode::Failure),
                    None => status(id, StatusCode::NoSuchFile),
                }
            }
            SftpMessageType::Symlink => {
                // Target comes first on the wire
                let target = req.text();
                let link = req.text();
                if self.tree.contains_key(&link) {
                    return status(id, StatusCode::Failure);
                }
                self.tree.insert(link, Node::Link(target));
                status(id, StatusCode::Ok)
            }
            _ => status(id, StatusCode::OpUnsupported),
        }
    }

    fn open_handle(&mut self, id: u32, open: OpenHandle) -> Vec<u8> {
        self.next_handle += 1;
        // Binary handles, as OpenSSH issues them
        let handle = self.next_handle.to_be_bytes().to_vec();
        self.handles.insert(handle.clone(), open);
        Packet::with_id(SftpMessageType::Handle, id)
            .push(Field::bytes(&handle))
            .to_bytes()
    }

    fn file_for(&self, handle: &[u8]) -> Option<Vec<u8>> {
        match self.handles.get(handle) {
            Some(OpenHandle::File(path)) => match self.tree.get(path) {
                Some(Node::File(data)) => Some(data.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    fn children(&self, dir: &str) -> Vec<String> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.tree
            .keys()
            .filter(|path| {
                path.strip_prefix(&prefix)
                    .map(|rest| !rest.is_empty() && !rest.contains('/'))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

fn attrs_of(node: &Node) -> FileAttributes {
    match node {
        Node::File(data) => FileAttributes::new()
            .with_size(data.len() as u64)
            .with_permissions(0o100644),
        Node::Dir => FileAttributes::new().with_permissions(0o040755),
        Node::Link(_) => FileAttributes::new().with_permissions(0o120777),
    }
}

fn status(id: u32, code: StatusCode) -> Vec<u8> {
    Packet::with_id(SftpMessageType::Status, id)
        .push(Field::Uint32(code.as_u32()))
        .push(Field::text(code.message()))
        .push(Field::text("en"))
        .to_bytes()
}

fn name_reply(id: u32, name: &str) -> Vec<u8> {
    Packet::with_id(SftpMessageType::Name, id)
        .push(Field::Uint32(1))
        .push(Field::text(name))
        .push(Field::text(name))
        .push(Field::Attrs(FileAttributes::new()))
        .to_bytes()
}

fn canonical(path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", HOME, path)
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Cursor over a request payload. Panics on malformed input, which in
/// these tests means the client encoded something wrong.
struct Request<'a> {
    buf: &'a [u8],
}

impl<'a> Request<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn u32(&mut self) -> u32 {
        let (head, rest) = self.buf.split_at(4);
        self.buf = rest;
        u32::from_be_bytes([head[0], head[1], head[2], head[3]])
    }

    fn u64(&mut self) -> u64 {
        let hi = self.u32() as u64;
        let lo = self.u32() as u64;
        (hi << 32) | lo
    }

    fn bytes(&mut self) -> Vec<u8> {
        let len = self.u32() as usize;
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        head.to_vec()
    }

    fn text(&mut self) -> String {
        String::from_utf8(self.bytes()).expect("utf-8 path")
    }

    fn attrs(&mut self) -> FileAttributes {
        let (attrs, consumed) = FileAttributes::from_bytes(self.buf).expect("valid attrs");
        self.buf = &self.buf[consumed..];
        attrs
    }
}
