//! Append-only event store: binary protobuf log.
//!
//! Storage format: length-prefixed protobuf frames.
//!   [4-byte LE length][protobuf bytes][4-byte LE length][protobuf bytes]...
//!
//! Rules:
//!   - Strict append only: no mutation, no deletion, no reordering
//!   - fsync after every append
//!   - Sequence strictly increasing from 1 (validated on append and load)
//!   - A torn or oversized frame is reported as corruption, never skipped

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use prost::Message;
use tracing::{debug, warn};

use crate::proto_types::ProtoEventEnvelope;

/// Upper bound on one encoded frame.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn write_frames(file: &mut File, events: &[ProtoEventEnvelope]) -> io::Result<()> {
    let mut writer = BufWriter::new(file);
    for event in events {
        let buf = event.encode_to_vec();
        let len = u32::try_from(buf.len())
            .ok()
            .filter(|len| *len as usize <= MAX_FRAME_LEN)
            .ok_or_else(|| invalid_data(format!("frame too large: {} bytes", buf.len())))?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&buf)?;
    }
    writer.flush()
}

/// Append-only event log backed by a binary file.
#[derive(Debug)]
pub struct EventStore {
    path: PathBuf,
    last_sequence: u64,
}

impl EventStore {
    /// Open or create an event log. Existing frames are read and
    /// validated to find the last sequence.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let last_sequence = if path.exists() {
            Self::read_all_from_file(path)?
                .last()
                .map(|e| e.sequence)
                .unwrap_or(0)
        } else {
            0
        };
        debug!(path = %path.display(), last_sequence, "event store opened");

        Ok(Self {
            path: path.to_path_buf(),
            last_sequence,
        })
    }

    /// Append one frame and fsync.
    pub fn append_event(&mut self, event: &ProtoEventEnvelope) -> io::Result<()> {
        self.append_all(std::slice::from_ref(event))
    }

    /// Append a batch with a single fsync. The whole batch is checked
    /// for sequence order before anything is written.
    pub fn append_all(&mut self, events: &[ProtoEventEnvelope]) -> io::Result<()> {
        let mut expected = self.last_sequence + 1;
        for event in events {
            if event.sequence != expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "sequence violation in event store: expected {}, got {}",
                        expected, event.sequence
                    ),
                ));
            }
            expected += 1;
        }
        if events.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let start = file.metadata()?.len();
        let written = write_frames(&mut file, events).and_then(|()| file.sync_all());
        if let Err(e) = written {
            // A failed batch leaves no partial tail behind.
            if let Err(trunc) = file.set_len(start) {
                warn!(error = %trunc, "could not truncate partial batch");
            }
            return Err(e);
        }

        self.last_sequence = expected - 1;
        debug!(count = events.len(), last_sequence = self.last_sequence, "frames appended");
        Ok(())
    }

    /// All frames in sequence order.
    pub fn load_all_events(&self) -> io::Result<Vec<ProtoEventEnvelope>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Self::read_all_from_file(&self.path)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all_from_file(path: &Path) -> io::Result<Vec<ProtoEventEnvelope>> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut events: Vec<ProtoEventEnvelope> = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut len_buf = [0u8; 4];
            let read = read_up_to(&mut reader, &mut len_buf)?;
            if read == 0 {
                break;
            }
            if read < len_buf.len() {
                return Err(invalid_data(format!("torn length prefix at offset {}", offset)));
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len == 0 || len > MAX_FRAME_LEN {
                return Err(invalid_data(format!(
                    "invalid frame length {} at offset {}",
                    len, offset
                )));
            }

            let mut frame = vec![0u8; len];
            reader
                .read_exact(&mut frame)
                .map_err(|e| invalid_data(format!("truncated frame at offset {}: {}", offset, e)))?;

            let event = ProtoEventEnvelope::decode(frame.as_slice())
                .map_err(|e| invalid_data(format!("protobuf decode error at offset {}: {}", offset, e)))?;

            let expected = events.last().map(|e| e.sequence + 1).unwrap_or(1);
            if event.sequence != expected {
                return Err(invalid_data(format!(
                    "sequence gap at offset {}: expected {}, got {}",
                    offset, expected, event.sequence
                )));
            }

            offset += 4 + len as u64;
            events.push(event);
        }

        Ok(events)
    }
}

/// Fill `buf` as far as the reader allows. Returns bytes read.
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
