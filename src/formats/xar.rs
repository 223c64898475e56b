//! XAR archive reader.
//!
//! XAR (eXtensible ARchive) is the container format Apple installer packages
//! use: a fixed 28-byte header, a zlib-deflated XML table of contents, and a
//! heap of file payloads addressed by `(offset, size)` pairs relative to the
//! end of the compressed TOC.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;

use crate::formats::join_checked;
use crate::models::error::SdkFetchError;
use crate::models::request::Verbosity;

/// XAR magic number, "xar!" read as a big-endian u32.
const XAR_MAGIC: u32 = 0x7861_7221;

/// Reject implausibly large TOCs rather than allocating unbounded memory for one.
const MAX_TOC_COMPRESSED_SIZE: u64 = 100 * 1024 * 1024;

struct XarHeader {
    header_size: u16,
    toc_compressed: u64,
    toc_uncompressed: u64,
}

fn read_be_u16(f: &mut File) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    f.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_be_u32(f: &mut File) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    f.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_be_u64(f: &mut File) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    f.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

fn read_header(f: &mut File) -> Result<XarHeader, SdkFetchError> {
    let magic = read_be_u32(f).map_err(|e| SdkFetchError::XarFormat {
        reason: format!("failed to read header: {e}"),
    })?;
    if magic != XAR_MAGIC {
        return Err(SdkFetchError::XarFormat {
            reason: format!("bad magic: {magic:#010x}"),
        });
    }
    let header_size = read_be_u16(f).map_err(|e| SdkFetchError::XarFormat {
        reason: e.to_string(),
    })?;
    let _version = read_be_u16(f).map_err(|e| SdkFetchError::XarFormat {
        reason: e.to_string(),
    })?;
    let toc_compressed = read_be_u64(f).map_err(|e| SdkFetchError::XarFormat {
        reason: e.to_string(),
    })?;
    let toc_uncompressed = read_be_u64(f).map_err(|e| SdkFetchError::XarFormat {
        reason: e.to_string(),
    })?;

    if toc_compressed == 0 || toc_compressed > MAX_TOC_COMPRESSED_SIZE {
        return Err(SdkFetchError::XarFormat {
            reason: "invalid XAR TOC size".to_string(),
        });
    }

    Ok(XarHeader {
        header_size,
        toc_compressed,
        toc_uncompressed,
    })
}

/// Extract every `<file>` named in a XAR archive's TOC into `dst_dir`.
pub fn xar_extract(src_path: &Path, dst_dir: &Path, verbosity: Verbosity) -> Result<(), SdkFetchError> {
    let mut f = File::open(src_path).map_err(|_| SdkFetchError::InputMissing {
        path: src_path.to_path_buf(),
    })?;

    let header = read_header(&mut f)?;

    f.seek(SeekFrom::Start(header.header_size as u64))
        .map_err(|e| SdkFetchError::XarFormat {
            reason: e.to_string(),
        })?;

    let mut toc_compressed_buf = vec![0u8; header.toc_compressed as usize];
    f.read_exact(&mut toc_compressed_buf)
        .map_err(|e| SdkFetchError::XarFormat {
            reason: format!("short read of TOC: {e}"),
        })?;

    let mut toc_xml = String::new();
    ZlibDecoder::new(&toc_compressed_buf[..])
        .read_to_string(&mut toc_xml)
        .map_err(|e| SdkFetchError::XarFormat {
            reason: format!("failed to inflate TOC: {e}"),
        })?;
    if toc_xml.len() as u64 != header.toc_uncompressed {
        if verbosity.show_traces() {
            eprintln!(
                "xar: TOC uncompressed size mismatch (expected {}, got {})",
                header.toc_uncompressed,
                toc_xml.len()
            );
        }
    }

    let heap_start = header.header_size as u64 + header.toc_compressed;
    walk_toc(&toc_xml, &mut f, heap_start, dst_dir, verbosity)
}

/// Walk the TOC with a forward positional scan, tracking a path stack of
/// currently-open `<file>` names. Malformed XML is tolerated: the scan simply
/// advances to the next recognized token and gives up at end of string.
fn walk_toc(
    toc_xml: &str,
    heap: &mut File,
    heap_start: u64,
    dst_dir: &Path,
    verbosity: Verbosity,
) -> Result<(), SdkFetchError> {
    let mut path_stack: Vec<String> = Vec::new();
    let mut pos = 0usize;

    loop {
        let rest = &toc_xml[pos..];
        let next_file = rest.find("<file");
        let next_close = rest.find("</file>");

        match (next_file, next_close) {
            (Some(file_at), close_at) if close_at.is_none_or(|c| file_at < c) => {
                pos += file_at + 5;
                let rest = &toc_xml[pos..];
                let close_at = rest.find("</file>");
                let Some(name_at) = rest.find("<name>") else {
                    continue;
                };
                if close_at.is_some_and(|c| name_at >= c) {
                    continue;
                }

                let name_start = &rest[name_at + 6..];
                let Some(name_end) = name_start.find('<') else {
                    break;
                };
                let name = &name_start[..name_end];
                path_stack.push(name.to_string());

                let rel_path = path_stack.join("/");
                let abs_out_path = join_checked(dst_dir, &rel_path, |reason| {
                    SdkFetchError::XarFormat { reason }
                })?;
                if verbosity.show_traces() {
                    eprintln!("xar: found {rel_path}");
                }

                let data_at = rest.find("<data>");
                let inner_file_at = rest.find("<file");
                let has_data = match (data_at, close_at) {
                    (Some(d), Some(c)) if d < c => inner_file_at.is_none_or(|i| d < i),
                    _ => false,
                };

                if has_data {
                    let data_at = data_at.unwrap();
                    let data_rest = &rest[data_at..];
                    let off_at = data_rest.find("<offset>");
                    let sz_at = data_rest.find("<size>");
                    if let (Some(off_at), Some(sz_at)) = (off_at, sz_at) {
                        let offset = parse_decimal(&data_rest[off_at + 8..]);
                        let size = parse_decimal(&data_rest[sz_at + 6..]);
                        extract_heap_slice(heap, heap_start + offset, size, &abs_out_path)?;
                    }
                } else {
                    std::fs::create_dir_all(&abs_out_path)?;
                }

                pos += name_at + 6 + name_end;
            }
            (_, Some(close_at)) => {
                if !path_stack.is_empty() {
                    path_stack.pop();
                }
                pos += close_at + 7;
            }
            _ => break,
        }
    }

    Ok(())
}

fn parse_decimal(s: &str) -> u64 {
    s.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, b| acc * 10 + (b - b'0') as u64)
}

fn extract_heap_slice(
    heap: &mut File,
    abs_offset: u64,
    size: u64,
    dst: &Path,
) -> Result<(), SdkFetchError> {
    heap.seek(SeekFrom::Start(abs_offset))
        .map_err(|e| SdkFetchError::XarFormat {
            reason: e.to_string(),
        })?;
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = std::fs::File::create(dst)?;
    let mut remaining = size;
    let mut buf = [0u8; 64 * 1024];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        heap.read_exact(&mut buf[..want])
            .map_err(|e| SdkFetchError::XarFormat {
                reason: format!("short read of heap data: {e}"),
            })?;
        out.write_all(&buf[..want])?;
        remaining -= want as u64;
    }
    Ok(())
}
