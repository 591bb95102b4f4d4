//! Built-in package descriptors.

use std::collections::BTreeMap;

use pio_repack_core::{DescriptorError, PackageDescriptor, PlatformKey};

const WCHISP_RELEASES: &str = "https://github.com/ch32-rs/wchisp/releases/download/nightly";

const WCHISP_MANIFEST: &str = r#"{
  "name": "tool-wchisp",
  "version": "0.23.230228",
  "description": "WCH ISP Tool in Rust",
  "keywords": [
    "tools",
    "uploader",
    "risc-v"
  ],
  "homepage": "https://ch32-rs.github.io/wchisp/",
  "license": "GPL-2.0-only",
  "system": [
    "windows_x86",
    "windows_amd64"
  ],
  "repository": {
    "type": "git",
    "url": "https://github.com/ch32-rs/wchisp"
  }
}"#;

/// `tool-wchisp`: the WCH ISP flashing tool, from its nightly releases.
///
/// There are no Windows x86/ARM or Linux i686/ARMv7/ARMv6 builds upstream.
///
/// # Errors
///
/// Only fails if the constants above are edited into an invalid state.
pub fn wchisp() -> Result<PackageDescriptor, DescriptorError> {
    let urls = [
        ("windows_amd64", "wchisp-win-x64.zip"),
        ("linux_x86_64", "wchisp-linux-x64.tar.gz"),
        ("linux_aarch64", "wchisp-linux-aarch64.tar.gz"),
        ("darwin_x86_64", "wchisp-macos-x64.tar.gz"),
        ("darwin_arm64", "wchisp-macos-arm64.tar.gz"),
    ];
    let commands = [
        ("linux_x86_64", "chmod +x wchisp"),
        ("linux_aarch64", "chmod +x wchisp"),
        ("darwin_x86_64", "chmod +x wchisp"),
        ("darwin_arm64", "chmod +x wchisp && rm -rf wchisp-macos-arm64"),
    ];

    let download_urls = urls
        .into_iter()
        .map(|(k, file)| Ok((platform(k)?, format!("{WCHISP_RELEASES}/{file}"))))
        .collect::<Result<BTreeMap<_, _>, DescriptorError>>()?;
    let extra_commands = commands
        .into_iter()
        .map(|(k, cmd)| Ok((platform(k)?, cmd.to_string())))
        .collect::<Result<BTreeMap<_, _>, DescriptorError>>()?;

    PackageDescriptor::new("tool-wchisp", download_urls, WCHISP_MANIFEST, extra_commands)
}

fn platform(key: &str) -> Result<PlatformKey, DescriptorError> {
    PlatformKey::new(key).map_err(DescriptorError::InvalidPlatform)
}
