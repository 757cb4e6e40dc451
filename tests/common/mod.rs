//! Fake rTorrent SCGI listener untuk integration test

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrelay::{RelayConfig, RpcClient, ScgiClient};
use tempfile::TempDir;

/// Request SCGI yang diterima daemon palsu
#[derive(Debug)]
pub struct CapturedRequest {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Baca satu request netstring `<len>:<headers>,<body>`
pub fn read_scgi_request(stream: &mut TcpStream) -> CapturedRequest {
    let mut prefix = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).unwrap();
        if byte[0] == b':' {
            break;
        }
        prefix.push(byte[0]);
    }
    let block_len: usize = String::from_utf8(prefix).unwrap().parse().unwrap();

    let mut block = vec![0u8; block_len];
    stream.read_exact(&mut block).unwrap();
    stream.read_exact(&mut byte).unwrap();
    assert_eq!(byte[0], b',', "header block must be followed by a comma");

    let fields: Vec<String> = block
        .split(|&b| b == 0)
        .map(|f| String::from_utf8(f.to_vec()).unwrap())
        .collect();
    // Block diakhiri NUL, jadi elemen terakhir kosong
    assert_eq!(fields.last().map(String::as_str), Some(""));
    let headers: Vec<(String, String)> = fields[..fields.len() - 1]
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();

    let content_length: usize = headers
        .iter()
        .find(|(n, _)| n == "CONTENT_LENGTH")
        .map(|(_, v)| v.parse().unwrap())
        .unwrap();
    let mut body = vec![0u8; content_length];
    stream.read_exact(&mut body).unwrap();

    CapturedRequest { headers, body }
}

/// Response SCGI standar rTorrent
pub fn scgi_response(body: &str) -> Vec<u8> {
    format!(
        "Status: 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

pub struct FakeDaemon {
    pub addr: SocketAddr,
    handle: JoinHandle<CapturedRequest>,
}

impl FakeDaemon {
    /// Terima satu koneksi, baca request, balas dengan `response` mentah
    pub fn spawn(response: Vec<u8>) -> Self {
        Self::spawn_with_delay(response, Duration::ZERO)
    }

    /// Sama seperti `spawn`, tapi tunggu dulu sebelum membalas
    pub fn spawn_with_delay(response: Vec<u8>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_scgi_request(&mut stream);
            thread::sleep(delay);
            // Client mungkin sudah menyerah (timeout)
            let _ = stream.write_all(&response);
            request
        });
        Self { addr, handle }
    }

    pub fn request(self) -> CapturedRequest {
        self.handle.join().unwrap()
    }
}

/// Tulis `.rtorrent.rc` di temp dir
pub fn rc_file(addr: SocketAddr) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rtorrent.rc");
    std::fs::write(
        &path,
        format!("# test daemon\ndirectory.default.set = /tmp\nscgi_port = {addr}\n"),
    )
    .unwrap();
    (dir, path)
}

/// Client yang menunjuk ke daemon palsu
pub fn client_for(addr: SocketAddr, timeout_ms: u64) -> (TempDir, RpcClient<ScgiClient>) {
    let (dir, rc) = rc_file(addr);
    let config = RelayConfig {
        rtorrent_rc: rc,
        timeout_ms,
    };
    (dir, RpcClient::new(ScgiClient::new(config)))
}
