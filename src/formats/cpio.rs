//! CPIO entry decoder.
//!
//! Accepts both the `newc` (hex, magic `070701`) and `odc` (octal, magic
//! `070707`) header variants. Generic over any [`Read`] source so tests can
//! exercise it against synthetic in-memory streams without routing through
//! the PBZX/XZ machinery in [`crate::formats::pbzx`].

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::formats::join_checked;
use crate::models::error::SdkFetchError;
use crate::models::request::Verbosity;

const NEWC_MAGIC: &[u8; 6] = b"070701";
const ODC_MAGIC: &[u8; 6] = b"070707";

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;

/// Drain `src` and materialize every entry under `dst_root`, stopping at the
/// `TRAILER!!!` entry.
pub fn cpio_extract<R: Read>(
    src: &mut R,
    dst_root: &Path,
    verbosity: Verbosity,
) -> Result<(), SdkFetchError> {
    loop {
        let Some((name, kind, align, filesize)) = read_header(src)? else {
            return Ok(());
        };

        if name == "TRAILER!!!" {
            return Ok(());
        }

        if verbosity.show_traces() {
            eprintln!("cpio: extracting {name}");
        }

        let out_path = join_checked(dst_root, &name, |reason| SdkFetchError::CpioFormat {
            reason,
        })?;

        match kind {
            EntryKind::Directory => {
                fs::create_dir_all(&out_path)?;
            }
            EntryKind::Symlink(mode) => {
                let mut target = vec![0u8; filesize as usize];
                read_exact_counted(src, &mut target)?;
                let target = String::from_utf8_lossy(&target).into_owned();
                create_symlink(dst_root, &out_path, &target)?;
                let _ = mode;
            }
            EntryKind::Regular(mode) => {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = fs::File::create(&out_path)?;
                copy_n(src, &mut out, filesize)?;
                apply_mode(&out_path, mode);
            }
            EntryKind::Other => {
                skip_n(src, filesize)?;
            }
        }

        let data_pad = pad_len(align, filesize);
        if data_pad > 0 {
            skip_n(src, data_pad as u64)?;
        }
    }
}

enum EntryKind {
    Directory,
    Symlink(u32),
    Regular(u32),
    Other,
}

/// Resynchronize to a header magic, then parse it. Returns `Ok(None)` at a
/// clean end of stream (source exhausted before any header byte arrived).
fn read_header<R: Read>(
    src: &mut R,
) -> Result<Option<(String, EntryKind, u32, u64)>, SdkFetchError> {
    let mut magic = [0u8; 6];
    loop {
        if !read_one(src, &mut magic[0..1])? {
            return Ok(None);
        }
        if magic[0] != b'0' {
            continue;
        }
        if !read_exact_opt(src, &mut magic[1..6])? {
            return Ok(None);
        }
        if &magic == NEWC_MAGIC || &magic == ODC_MAGIC {
            break;
        }
    }

    let is_newc = &magic == NEWC_MAGIC;

    let (mode, filesize, namesize, header_len, align): (u32, u64, u32, u32, u32) = if is_newc {
        let mut rest = [0u8; 104];
        read_exact_counted(src, &mut rest)?;
        let mode = parse_hex(&rest[8..], 8)?;
        let filesize = parse_hex(&rest[48..], 8)? as u64;
        let namesize = parse_hex(&rest[88..], 8)?;
        (mode, filesize, namesize, 110, 4)
    } else {
        let mut rest = [0u8; 70];
        read_exact_counted(src, &mut rest)?;
        let mode = parse_octal(&rest[12..18])?;
        let namesize = parse_octal(&rest[53..59])?;
        let filesize = parse_octal(&rest[59..70])? as u64;
        (mode, filesize, namesize, 76, 1)
    };

    let mut name_buf = vec![0u8; namesize as usize];
    read_exact_counted(src, &mut name_buf)?;
    let name = String::from_utf8_lossy(&name_buf)
        .trim_end_matches('\0')
        .to_string();

    let header_pad = pad_len(align, (header_len + namesize) as u64);
    if header_pad > 0 {
        skip_n(src, header_pad as u64)?;
    }

    let kind = match mode & S_IFMT {
        S_IFDIR => EntryKind::Directory,
        S_IFLNK => EntryKind::Symlink(mode),
        S_IFREG => EntryKind::Regular(mode),
        _ => EntryKind::Other,
    };

    Ok(Some((name, kind, align, filesize)))
}

fn pad_len(align: u32, len: u64) -> u32 {
    let align = align as u64;
    if align <= 1 {
        return 0;
    }
    (((align - (len % align)) % align) as u32).min(u32::MAX)
}

fn parse_hex(buf: &[u8], len: usize) -> Result<u32, SdkFetchError> {
    let text = std::str::from_utf8(&buf[..len]).map_err(|_| SdkFetchError::CpioFormat {
        reason: "non-utf8 hex field in cpio header".to_string(),
    })?;
    u32::from_str_radix(text, 16).map_err(|_| SdkFetchError::CpioFormat {
        reason: format!("invalid hex field: {text}"),
    })
}

fn parse_octal(buf: &[u8]) -> Result<u32, SdkFetchError> {
    let text = std::str::from_utf8(buf)
        .map_err(|_| SdkFetchError::CpioFormat {
            reason: "non-utf8 octal field in cpio header".to_string(),
        })?
        .trim();
    u32::from_str_radix(text, 8).map_err(|_| SdkFetchError::CpioFormat {
        reason: format!("invalid octal field: {text}"),
    })
}

/// Read exactly one byte, returning `Ok(false)` at a clean EOF (zero bytes
/// read before anything else).
fn read_one<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<bool, SdkFetchError> {
    read_exact_opt(src, buf)
}

fn read_exact_opt<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<bool, SdkFetchError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = src
            .read(&mut buf[filled..])
            .map_err(|e| SdkFetchError::CpioFormat {
                reason: format!("read error: {e}"),
            })?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(SdkFetchError::CpioFormat {
                reason: "unexpected end of stream mid-field".to_string(),
            });
        }
        filled += n;
    }
    Ok(true)
}

fn read_exact_counted<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<(), SdkFetchError> {
    if !read_exact_opt(src, buf)? {
        return Err(SdkFetchError::CpioFormat {
            reason: "unexpected end of stream".to_string(),
        });
    }
    Ok(())
}

fn copy_n<R: Read, W: std::io::Write>(
    src: &mut R,
    dst: &mut W,
    mut len: u64,
) -> Result<(), SdkFetchError> {
    let mut buf = [0u8; 64 * 1024];
    while len > 0 {
        let want = len.min(buf.len() as u64) as usize;
        read_exact_counted(src, &mut buf[..want])?;
        dst.write_all(&buf[..want])
            .map_err(|e| SdkFetchError::Io(e))?;
        len -= want as u64;
    }
    Ok(())
}

fn skip_n<R: Read>(src: &mut R, mut len: u64) -> Result<(), SdkFetchError> {
    let mut buf = [0u8; 8192];
    while len > 0 {
        let want = len.min(buf.len() as u64) as usize;
        read_exact_counted(src, &mut buf[..want])?;
        len -= want as u64;
    }
    Ok(())
}

#[cfg(not(unix))]
fn create_symlink(dst_root: &Path, out_path: &Path, target: &str) -> Result<(), SdkFetchError> {
    // Platforms without symlink support copy the pointed-to file instead; a
    // forward reference that hasn't been written yet is skipped best-effort.
    if let Ok(target_path) = join_checked(dst_root, target, |reason| SdkFetchError::CpioFormat {
        reason,
    }) {
        if target_path.is_file() {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&target_path, out_path)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn create_symlink(_dst_root: &Path, out_path: &Path, target: &str) -> Result<(), SdkFetchError> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let _ = fs::remove_file(out_path);
    std::os::unix::fs::symlink(target, out_path)?;
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777));
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) {}
