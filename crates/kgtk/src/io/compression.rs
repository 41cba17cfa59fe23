//! Transparent decompression of input files.
//!
//! Compression is sniffed from the file extension or forced explicitly.
//! All sources surface the same `BufRead` line interface; the parallel
//! gzip mode moves decompression onto a worker thread feeding a bounded
//! channel back to the single consuming reader loop.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{KgtkError, Result};

/// Supported compression formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionType {
    None,
    Gzip,
    Bzip2,
    Xz,
    Lz4,
}

impl CompressionType {
    /// Sniff the compression type from a file extension.
    pub fn from_path(path: &Path) -> CompressionType {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => CompressionType::Gzip,
            Some("bz2") => CompressionType::Bzip2,
            Some("xz") | Some("lzma") => CompressionType::Xz,
            Some("lz4") => CompressionType::Lz4,
            _ => CompressionType::None,
        }
    }

    /// Parse an explicit compression type name.
    pub fn from_name(name: &str) -> Result<CompressionType> {
        match name {
            "none" => Ok(CompressionType::None),
            "gz" | "gzip" => Ok(CompressionType::Gzip),
            "bz2" | "bzip2" => Ok(CompressionType::Bzip2),
            "xz" | "lzma" => Ok(CompressionType::Xz),
            "lz4" => Ok(CompressionType::Lz4),
            other => Err(KgtkError::UnsupportedCompression(other.to_string())),
        }
    }
}

/// Capacity of the worker-to-consumer handoff queue.
const CHANNEL_CAPACITY: usize = 16;

/// Size of the chunks the worker pushes through the channel.
const CHUNK_SIZE: usize = 64 * 1024;

/// Open a (possibly compressed) file as a buffered line source.
pub fn open_line_source(
    path: &Path,
    compression: Option<CompressionType>,
    parallel_gzip: bool,
) -> Result<Box<dyn BufRead + Send>> {
    let ctype = compression.unwrap_or_else(|| CompressionType::from_path(path));
    let file = File::open(path).map_err(|e| KgtkError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!(path = %path.display(), compression = ?ctype, "opening input");

    let source: Box<dyn BufRead + Send> = match ctype {
        CompressionType::None => Box::new(BufReader::new(file)),
        CompressionType::Gzip => {
            // MultiGzDecoder handles concatenated gzip members.
            let decoder = flate2::read::MultiGzDecoder::new(file);
            if parallel_gzip {
                Box::new(BufReader::new(spawn_decompressor(decoder)))
            } else {
                Box::new(BufReader::new(decoder))
            }
        }
        CompressionType::Bzip2 => Box::new(BufReader::new(bzip2::read::BzDecoder::new(file))),
        CompressionType::Xz => Box::new(BufReader::new(xz2::read::XzDecoder::new(file))),
        CompressionType::Lz4 => {
            let decoder = lz4_flex::frame::FrameDecoder::new(file);
            Box::new(BufReader::new(decoder))
        }
    };
    Ok(source)
}

/// Run a decompressor on its own thread, handing chunks to the consumer
/// through a bounded channel. Backpressure comes from the channel capacity.
fn spawn_decompressor<R: Read + Send + 'static>(mut decoder: R) -> ChannelReader {
    let (tx, rx): (SyncSender<io::Result<Vec<u8>>>, Receiver<io::Result<Vec<u8>>>) =
        mpsc::sync_channel(CHANNEL_CAPACITY);
    thread::spawn(move || {
        loop {
            let mut chunk = vec![0u8; CHUNK_SIZE];
            match decoder.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    chunk.truncate(n);
                    if tx.send(Ok(chunk)).is_err() {
                        break; // consumer dropped
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    ChannelReader {
        rx,
        buffer: Vec::new(),
        position: 0,
        done: false,
    }
}

/// `Read` adapter over the bounded channel from the decompression worker.
struct ChannelReader {
    rx: Receiver<io::Result<Vec<u8>>>,
    buffer: Vec<u8>,
    position: usize,
    done: bool,
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.buffer.len() {
            if self.done {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.buffer = chunk;
                    self.position = 0;
                }
                Ok(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                Err(_) => {
                    self.done = true;
                    return Ok(0);
                }
            }
        }
        let available = &self.buffer[self.position..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}
