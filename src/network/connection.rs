//! Connection handling dengan buffered I/O dan deadline
//!
//! Socket non-blocking (mio) + satu `Poll` per connection. Setiap operasi
//! yang ketemu `WouldBlock` menunggu readiness sampai deadline call habis,
//! lalu gagal dengan `ErrorKind::TimedOut`.

use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::Instant;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};

/// Buffer size - response header rTorrent kecil, body dibaca bertahap
const READ_BUFFER_SIZE: usize = 64 * 1024; // 64KB
const STREAM_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 8;

/// Satu koneksi ke listener SCGI daemon
///
/// Tidak ada reuse: satu connection untuk satu request.
pub struct Connection {
    poll: Poll,
    events: Events,
    stream: TcpStream,
    deadline: Option<Instant>,
    read_buffer: Box<[u8]>,
    read_pos: usize,
    read_len: usize,
}

impl Connection {
    /// Connect non-blocking, tunggu sampai established atau deadline habis
    pub fn connect(addr: SocketAddr, deadline: Option<Instant>) -> io::Result<Self> {
        let poll = Poll::new()?;
        let mut stream = TcpStream::connect(addr)?;
        poll.registry().register(
            &mut stream,
            STREAM_TOKEN,
            Interest::READABLE | Interest::WRITABLE,
        )?;

        let mut conn = Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            stream,
            deadline,
            read_buffer: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            read_pos: 0,
            read_len: 0,
        };
        conn.wait_connected()?;

        // Request kecil, kirim segera
        conn.stream.set_nodelay(true)?;
        Ok(conn)
    }

    fn wait_connected(&mut self) -> io::Result<()> {
        loop {
            self.wait_ready()?;

            if let Some(err) = self.stream.take_error()? {
                return Err(err);
            }
            match self.stream.peer_addr() {
                Ok(_) => return Ok(()),
                Err(ref e) if e.kind() == io::ErrorKind::NotConnected => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Tunggu readiness event sampai deadline
    fn wait_ready(&mut self) -> io::Result<()> {
        let timeout = match self.deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(timed_out());
                }
                Some(deadline - now)
            }
            None => None,
        };

        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            // Signal: caller akan retry operasinya
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        }

        if self.events.is_empty() && timeout.is_some() {
            return Err(timed_out());
        }
        Ok(())
    }

    /// Tulis semua bytes, menunggu writable saat socket penuh
    pub fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.stream.write(data) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "Failed to write to socket",
                    ));
                }
                Ok(n) => data = &data[n..],
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => self.wait_ready()?,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read data ke internal buffer
    ///
    /// Returns jumlah bytes baru. EOF sebelum data cukup adalah error.
    fn fill_read_buffer(&mut self) -> io::Result<usize> {
        // Compact buffer jika perlu
        if self.read_pos > 0 {
            let remaining = self.read_len - self.read_pos;
            if remaining > 0 {
                self.read_buffer.copy_within(self.read_pos..self.read_len, 0);
            }
            self.read_len = remaining;
            self.read_pos = 0;
        }

        if self.read_len == self.read_buffer.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "response line exceeds read buffer",
            ));
        }

        loop {
            match self.stream.read(&mut self.read_buffer[self.read_len..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "Connection closed",
                    ));
                }
                Ok(n) => {
                    self.read_len += n;
                    return Ok(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => self.wait_ready()?,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Get readable data slice (zero-copy)
    #[inline(always)]
    fn readable(&self) -> &[u8] {
        &self.read_buffer[self.read_pos..self.read_len]
    }

    /// Consume n bytes dari read buffer
    #[inline(always)]
    fn consume(&mut self, n: usize) {
        self.read_pos += n.min(self.read_len - self.read_pos);
    }

    /// Baca satu baris, terminator (`\n` atau `\r\n`) dibuang
    pub fn read_line(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(offset) = self.readable().iter().position(|&b| b == b'\n') {
                let mut line = self.readable()[..offset].to_vec();
                self.consume(offset + 1);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(line);
            }
            self.fill_read_buffer()?;
        }
    }

    /// Baca tepat `len` bytes
    pub fn read_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(READ_BUFFER_SIZE));
        loop {
            let take = self.readable().len().min(len - out.len());
            out.extend_from_slice(&self.readable()[..take]);
            self.consume(take);

            if out.len() == len {
                return Ok(out);
            }
            self.fill_read_buffer()?;
        }
    }
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed")
}
