//! End-to-end coverage of the extraction pipeline's library surface.
//!
//! The DMG stage shells out to a real `7z` binary and can't be driven without
//! one installed plus a genuine Apple disk image, so these tests start one
//! stage downstream: they build a XAR fixture directly (as stage 1 would hand
//! to stage 2) and drive every remaining stage through the crate's public
//! API.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use macsdk_fetch::formats::cpio::cpio_extract;
use macsdk_fetch::formats::pbzx::PbzxReader;
use macsdk_fetch::formats::xar::xar_extract;
use macsdk_fetch::sdk::discovery::{find_sdk, sdk_settings};
use macsdk_fetch::sdk::finalize::finalize_sdks;
use macsdk_fetch::{DeploymentTarget, SdkFetchError, Verbosity};
use tempfile::TempDir;

const XAR_MAGIC: u32 = 0x7861_7221;

fn build_xar(toc_xml: &str, heap: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(toc_xml.as_bytes()).unwrap();
    let toc_compressed = encoder.finish().unwrap();

    let mut out = Vec::new();
    out.extend_from_slice(&XAR_MAGIC.to_be_bytes());
    out.extend_from_slice(&28u16.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(toc_compressed.len() as u64).to_be_bytes());
    out.extend_from_slice(&(toc_xml.len() as u64).to_be_bytes());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&toc_compressed);
    out.extend_from_slice(heap);
    out
}

fn cpio_newc_entry(buf: &mut Vec<u8>, name: &str, mode: u32, data: &[u8]) {
    let namesize = (name.len() + 1) as u32;
    buf.extend_from_slice(
        format!(
            "070701{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}",
            0,
            mode,
            0,
            0,
            1,
            0,
            data.len(),
            0,
            0,
            0,
            0,
            namesize,
            0
        )
        .as_bytes(),
    );
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
    let header_len = 110u64;
    let pad = (4 - ((header_len + namesize as u64) % 4)) % 4;
    buf.extend(std::iter::repeat(0u8).take(pad as usize));
    buf.extend_from_slice(data);
    let data_pad = (4 - (data.len() as u64 % 4)) % 4;
    buf.extend(std::iter::repeat(0u8).take(data_pad as usize));
}

fn cpio_trailer(buf: &mut Vec<u8>) {
    cpio_newc_entry(buf, "TRAILER!!!", 0, &[]);
}

fn build_pbzx(cpio: &[u8]) -> Vec<u8> {
    let mut pbzx = Vec::new();
    pbzx.extend_from_slice(b"pbzx");
    pbzx.extend_from_slice(&0x0100_0000u64.to_be_bytes());
    pbzx.extend_from_slice(&0u64.to_be_bytes());
    pbzx.extend_from_slice(&(cpio.len() as u64).to_be_bytes());
    pbzx.extend_from_slice(cpio);
    pbzx
}

/// End-to-end scenario 5: a fixture PKG (XAR) wrapping a fixture Payload
/// (PBZX of CPIO) that ships an SDK with `SDKSettings.json`, driven through
/// stage 2 (XAR) -> stage 3/4 (PBZX/CPIO) -> stage 5 (finalizer) -> discovery.
#[test]
fn full_pipeline_installs_and_discovers_sdk() {
    let settings_json = br#"{"SupportedTargets":{"macosx":{"DefaultDeploymentTarget":"14.0","MinimumDeploymentTarget":"10.13"}}}"#;

    let mut cpio = Vec::new();
    cpio_newc_entry(
        &mut cpio,
        "Library/Developer/CommandLineTools/SDKs/MacOSX14.sdk/SDKSettings.json",
        0o100644,
        settings_json,
    );
    cpio_trailer(&mut cpio);
    let pbzx = build_pbzx(&cpio);

    let toc = r#"<xar><toc><file id="1"><name>Core.pkg</name><file id="2"><name>Payload</name><data><offset>0</offset><size>PAYLOAD_SIZE</size></data></file></file></toc></xar>"#
        .replace("PAYLOAD_SIZE", &pbzx.len().to_string());
    let xar_bytes = build_xar(&toc, &pbzx);

    let tmp = TempDir::new().unwrap();
    let pkg_path = tmp.path().join("Core.pkg");
    std::fs::write(&pkg_path, &xar_bytes).unwrap();

    let pkg_data_dir = tmp.path().join("pkg_data");
    std::fs::create_dir_all(&pkg_data_dir).unwrap();
    xar_extract(&pkg_path, &pkg_data_dir, Verbosity::Quiet).unwrap();

    let payload_path = pkg_data_dir.join("Core.pkg/Payload");
    assert!(payload_path.is_file());

    let out_dir = tmp.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    let file = std::fs::File::open(&payload_path).unwrap();
    let mut reader = PbzxReader::open(file).unwrap();
    cpio_extract(&mut reader, &out_dir, Verbosity::Quiet).unwrap();

    let cache_dir = tmp.path().join("cache");
    unsafe {
        std::env::set_var("XDG_CACHE_HOME", &cache_dir);
    }

    let installed = finalize_sdks(&out_dir, Verbosity::Quiet).unwrap();
    assert_eq!(installed.len(), 1);
    assert!(installed[0].ends_with("MacOSX14.sdk"));
    assert!(installed[0].join("SDKSettings.json").exists());

    let discovered = find_sdk().expect("finalized sdk should be discoverable");
    assert_eq!(discovered, installed[0]);

    let settings = sdk_settings(&discovered).unwrap();
    assert_eq!(
        settings.default_deployment_target,
        DeploymentTarget { major: 14, minor: 0 }
    );
    assert_eq!(
        settings.minimum_deployment_target,
        DeploymentTarget {
            major: 10,
            minor: 13
        }
    );
}

/// End-to-end scenario 6: a XAR whose header declares an implausible TOC
/// size must fail fast with `XarFormat` and must not create any output.
#[test]
fn corrupt_toc_size_is_rejected_before_writing_anything() {
    let tmp = TempDir::new().unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&XAR_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&28u16.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&(1u64 << 40).to_be_bytes());
    bytes.extend_from_slice(&0u64.to_be_bytes());
    bytes.extend_from_slice(&1u32.to_be_bytes());
    let src = tmp.path().join("corrupt.pkg");
    std::fs::write(&src, &bytes).unwrap();

    let dst = tmp.path().join("out");
    std::fs::create_dir_all(&dst).unwrap();

    let err = xar_extract(&src, &dst, Verbosity::Quiet).unwrap_err();
    assert!(matches!(err, SdkFetchError::XarFormat { .. }));
    assert_eq!(std::fs::read_dir(&dst).unwrap().count(), 0);
}
