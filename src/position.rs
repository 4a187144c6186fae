//! Tail-start positioning: locate the byte offset where a file's last N lines begin.
//!
//! The scan runs backward from end-of-file in fixed-size chunks, finding newline
//! boundaries with SIMD-optimized `memrchr`, so only the bytes between EOF and the
//! Nth-from-last newline are ever read. Reading from the returned offset to EOF
//! yields exactly the last N lines, byte-identical to the source.

use crate::error::{Result, TailfanError};
use memchr::memrchr;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Chunk size for the backward scan.
///
/// Large enough that typical tail requests finish in a single read, small
/// enough that the scan never drags in megabytes it does not need.
const SCAN_CHUNK: u64 = 8192;

/// Compute the byte offset at which the last `lines` lines of `path` begin.
///
/// # Arguments
/// * `path` - File to position in
/// * `lines` - Number of trailing lines the caller intends to read
///
/// # Returns
/// * Offset in `[0, file_size]`; reading from it to EOF yields the last
///   `lines` lines (the whole file when it holds that many or fewer)
/// * `lines == 0` returns the end-of-file offset: no trailing context
/// * `TailfanError::FileNotFound` when the file is absent, so reopen-mode
///   callers can substitute offset 0 and wait for creation
///
/// # Performance
/// * O(bytes between EOF and the boundary of the Nth-from-last line); the
///   file is never read in full when it is much larger than the tail
pub fn tail_offset(path: &Path, lines: u64) -> Result<u64> {
    let mut file = open_for_scan(path)?;
    let size = file
        .metadata()
        .map_err(|e| read_error(path, e))?
        .len();

    if size == 0 {
        return Ok(0);
    }
    if lines == 0 {
        return Ok(size);
    }

    // A trailing newline terminates the last line; it is not a boundary the
    // scan should count.
    let mut end = size;
    if read_byte_at(&mut file, size - 1).map_err(|e| read_error(path, e))? == b'\n' {
        end -= 1;
    }

    let mut remaining = lines;
    let mut buf = vec![0u8; SCAN_CHUNK as usize];

    while end > 0 {
        let start = end.saturating_sub(SCAN_CHUNK);
        let len = (end - start) as usize;
        file.seek(SeekFrom::Start(start))
            .map_err(|e| read_error(path, e))?;
        file.read_exact(&mut buf[..len])
            .map_err(|e| read_error(path, e))?;

        let mut upper = len;
        while let Some(pos) = memrchr(b'\n', &buf[..upper]) {
            remaining -= 1;
            if remaining == 0 {
                // Position immediately after the newline that closes the
                // line preceding the tail.
                return Ok(start + pos as u64 + 1);
            }
            upper = pos;
        }

        end = start;
    }

    // Reached the beginning of the file before passing enough boundaries:
    // the file holds `lines` lines or fewer, so the whole file is the tail.
    Ok(0)
}

fn open_for_scan(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TailfanError::file_not_found(path),
        _ => TailfanError::file_error(format!("Failed to open {}", path.display()), e),
    })
}

fn read_byte_at(file: &mut File, offset: u64) -> std::io::Result<u8> {
    let mut byte = [0u8; 1];
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn read_error(path: &Path, source: std::io::Error) -> TailfanError {
    TailfanError::file_error(format!("Failed to read {}", path.display()), source)
}
