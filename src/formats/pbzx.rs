//! PBZX streaming demuxer.
//!
//! PBZX wraps a CPIO archive in chunked framing: a 4-byte magic, an 8-byte
//! big-endian `main_flags`, then a sequence of `(chunk_flags, chunk_size,
//! payload)` chunks. Each payload is either a standalone XZ stream or raw
//! (already-decompressed) bytes. [`PbzxReader`] implements [`Read`] over the
//! decompressed logical stream so the CPIO reader in [`crate::formats::cpio`]
//! can stay generic over any byte source.

use std::fs::File;
use std::io::{Cursor, Read};

use crate::models::error::SdkFetchError;

const PBZX_MAGIC: &[u8; 4] = b"pbzx";
const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const CONTINUATION_BIT: u64 = 0x0100_0000;

/// Reads the decompressed logical byte stream out of a PBZX container.
pub struct PbzxReader {
    file: File,
    main_flags: u64,
    staging: Vec<u8>,
    staging_pos: usize,
    finished: bool,
    last_error: Option<SdkFetchError>,
}

impl PbzxReader {
    /// Open `path`, validate the PBZX magic, and return a reader positioned
    /// at the first chunk.
    pub fn open(mut file: File) -> Result<Self, SdkFetchError> {
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)
            .map_err(|e| SdkFetchError::PbzxFormat {
                reason: format!("failed to read magic: {e}"),
            })?;
        if &magic != PBZX_MAGIC {
            return Err(SdkFetchError::PbzxFormat {
                reason: "bad magic".to_string(),
            });
        }
        let mut flags_buf = [0u8; 8];
        file.read_exact(&mut flags_buf)
            .map_err(|e| SdkFetchError::PbzxFormat {
                reason: format!("failed to read main flags: {e}"),
            })?;
        Ok(Self {
            file,
            main_flags: u64::from_be_bytes(flags_buf),
            staging: Vec::new(),
            staging_pos: 0,
            finished: false,
            last_error: None,
        })
    }

    /// Take the last PBZX-specific error recorded by a failed [`Read::read`]
    /// call, if any. A caller consuming this reader through a generic `Read`
    /// sink (which can only see `io::Error`) should call this after a read
    /// error to recover the precise [`SdkFetchError`] variant.
    pub fn take_error(&mut self) -> Option<SdkFetchError> {
        self.last_error.take()
    }

    // Each iteration either returns or reads a full chunk header plus its
    // declared `chunk_size` payload before decoding, so a refill always
    // consumes real input before it can fail; `SdkFetchError::PbzxStall`
    // models a decoder that observes zero-byte progress mid-decode, which
    // this one-shot-per-chunk `lzma_rs::xz_decompress` call has no way to
    // report (it either decodes the whole chunk or errors out atomically).
    fn refill(&mut self) -> std::io::Result<()> {
        loop {
            if self.staging_pos < self.staging.len() {
                return Ok(());
            }
            if self.finished {
                return Ok(());
            }
            if self.main_flags & CONTINUATION_BIT == 0 {
                self.finished = true;
                return Ok(());
            }

            let mut header = [0u8; 16];
            if let Err(e) = self.file.read_exact(&mut header) {
                self.finished = true;
                self.last_error = Some(SdkFetchError::PbzxFormat {
                    reason: format!("short read of chunk header: {e}"),
                });
                return Err(std::io::Error::other("pbzx chunk header"));
            }
            let chunk_flags = u64::from_be_bytes(header[0..8].try_into().unwrap());
            let chunk_size = u64::from_be_bytes(header[8..16].try_into().unwrap());

            if chunk_flags == 0 && chunk_size == 0 {
                self.main_flags = 0;
                self.finished = true;
                return Ok(());
            }
            self.main_flags = chunk_flags;

            let mut payload = vec![0u8; chunk_size as usize];
            if let Err(e) = self.file.read_exact(&mut payload) {
                self.finished = true;
                self.last_error = Some(SdkFetchError::PbzxFormat {
                    reason: format!("short read of chunk payload: {e}"),
                });
                return Err(std::io::Error::other("pbzx chunk payload"));
            }

            let is_xz = payload.len() >= 6 && payload[..6] == XZ_MAGIC;
            self.staging.clear();
            if is_xz {
                let mut cursor = Cursor::new(&payload);
                if lzma_rs::xz_decompress(&mut cursor, &mut self.staging).is_err() {
                    self.finished = true;
                    self.last_error = Some(SdkFetchError::PbzxFormat {
                        reason: "failed to decompress XZ chunk".to_string(),
                    });
                    return Err(std::io::Error::other("pbzx xz decode"));
                }
            } else {
                self.staging.extend_from_slice(&payload);
            }
            self.staging_pos = 0;

            if self.staging.is_empty() {
                // Empty payload: keep pulling chunks rather than reporting EOF early.
                continue;
            }
            return Ok(());
        }
    }
}

impl Read for PbzxReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.refill()?;
        let available = &self.staging[self.staging_pos..];
        if available.is_empty() {
            return Ok(0);
        }
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.staging_pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read as _, Write};
    use tempfile::NamedTempFile;

    fn chunk(flags: u64, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn decodes_two_raw_chunks() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(PBZX_MAGIC);
        bytes.extend_from_slice(&CONTINUATION_BIT.to_be_bytes());
        bytes.extend_from_slice(&chunk(CONTINUATION_BIT, b"AAAA"));
        bytes.extend_from_slice(&chunk(0, b"BBBB"));

        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&bytes).unwrap();
        let file = File::open(f.path()).unwrap();

        let mut reader = PbzxReader::open(file).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"AAAABBBB");
    }

    #[test]
    fn decodes_xz_compressed_chunk_followed_by_raw_chunk() {
        // Matches the end-to-end "PBZX two-chunk" scenario: an XZ-flagged
        // chunk compressing "AAAA" followed by a raw chunk carrying "BBBB".
        let mut xz_payload = Vec::new();
        lzma_rs::xz_compress(&mut Cursor::new(b"AAAA".as_slice()), &mut xz_payload).unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(PBZX_MAGIC);
        bytes.extend_from_slice(&CONTINUATION_BIT.to_be_bytes());
        bytes.extend_from_slice(&chunk(CONTINUATION_BIT, &xz_payload));
        bytes.extend_from_slice(&chunk(0, b"BBBB"));

        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&bytes).unwrap();
        let file = File::open(f.path()).unwrap();

        let mut reader = PbzxReader::open(file).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"AAAABBBB");
    }

    #[test]
    fn stops_on_zero_zero_header() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(PBZX_MAGIC);
        bytes.extend_from_slice(&CONTINUATION_BIT.to_be_bytes());
        bytes.extend_from_slice(&chunk(CONTINUATION_BIT, b"AAAA"));
        bytes.extend_from_slice(&chunk(0, &[]));
        // Trailing junk after the terminator must never be read.
        bytes.extend_from_slice(b"should not appear");

        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&bytes).unwrap();
        let file = File::open(f.path()).unwrap();

        let mut reader = PbzxReader::open(file).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"AAAA");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"not pbzx at all").unwrap();
        let file = File::open(f.path()).unwrap();
        assert!(PbzxReader::open(file).is_err());
    }
}
