use crate::facts::PlatformFacts;
use crate::prelude::*;
use crate::probe::MacVersionProbe;

fn parse_macos_version(version_str: &str) -> Result<(u32, u32)> {
    let version_str = version_str.trim().trim_end_matches('\0');
    let pieces: Vec<&str> = version_str.split('.').collect();
    let parse = |piece: Option<&&str>| -> Result<u32> {
        match piece {
            None => Ok(0),
            Some(piece) => Ok(piece.parse::<u32>().map_err(|_| {
                IdentifyError::VersionProbeFailure {
                    detail: format!("unparseable macOS version {:?}", version_str),
                }
            })?),
        }
    };
    if version_str.is_empty() {
        Err(IdentifyError::VersionProbeFailure {
            detail: "empty macOS version".into(),
        })?
    }
    Ok((parse(pieces.first())?, parse(pieces.get(1))?))
}

/// Python built against an old SDK sees macOS 11+ as "10.16"; in that case we have
/// to go ask for the real version.
pub fn macos_version(facts: &PlatformFacts, probe: &dyn MacVersionProbe) -> Result<(u32, u32)> {
    let reported = facts.os_release.as_deref().unwrap_or_default();
    let version = parse_macos_version(reported)?;
    if version != (10, 16) {
        return Ok(version);
    }
    debug!("macOS reports 10.16 compatibility version; asking for the real one");
    let real = probe
        .true_macos_version()
        .map_err(|err| IdentifyError::VersionProbeFailure {
            detail: format!("{err:#}"),
        })?;
    parse_macos_version(&real)
}

fn mac_arch(arch: &str, is_32bit: bool) -> &str {
    if !is_32bit {
        arch
    } else if arch.starts_with("ppc") {
        "ppc"
    } else {
        "i386"
    }
}

/// Which binary formats contain code for `cpu_arch` and can run on the given macOS
/// version, most specific first.
pub fn mac_binary_formats(version: (u32, u32), cpu_arch: &str) -> Vec<&str> {
    let mut formats = vec![cpu_arch];
    match cpu_arch {
        "x86_64" => {
            if version < (10, 4) {
                return vec![];
            }
            formats.extend(["intel", "fat64", "fat32"]);
        }
        "i386" => {
            if version < (10, 4) {
                return vec![];
            }
            formats.extend(["intel", "fat32", "fat"]);
        }
        "ppc64" => {
            // XX: should 32-bit ppc formats count for ppc64 through 10.2?
            if version > (10, 5) || version < (10, 4) {
                return vec![];
            }
            formats.push("fat64");
        }
        "ppc" => {
            if version > (10, 6) {
                return vec![];
            }
            formats.extend(["fat32", "fat"]);
        }
        _ => (),
    }
    if matches!(cpu_arch, "arm64" | "x86_64") {
        formats.push("universal2");
    }
    if matches!(cpu_arch, "x86_64" | "i386" | "ppc64" | "ppc" | "intel") {
        formats.push("universal");
    }
    formats
}

fn push_version_tags(tags: &mut Vec<String>, version: (u32, u32), formats: &[&str]) {
    for format in formats {
        tags.push(format!("macosx_{}_{}_{}", version.0, version.1, format));
    }
}

pub fn macos_platform_tags(
    facts: &PlatformFacts,
    probe: &dyn MacVersionProbe,
) -> Result<Vec<String>> {
    let version = macos_version(facts, probe)?;
    let machine = facts.machine()?;
    let arch = mac_arch(&machine, facts.is_32bit_interpreter);
    debug!("macOS {}.{} on {}", version.0, version.1, arch);

    let mut tags = Vec::new();
    if (10, 0) <= version && version < (11, 0) {
        // Prior to macOS 11, each yearly release bumped the "minor" version number.
        // The major version was always 10.
        for minor in (0..=version.1).rev() {
            push_version_tags(&mut tags, (10, minor), &mac_binary_formats((10, minor), arch));
        }
    }

    if version >= (11, 0) {
        // Starting with macOS 11, each yearly release bumps the major version number.
        // The minor versions are now the midyear updates.
        for major in (11..=version.0).rev() {
            push_version_tags(&mut tags, (major, 0), &mac_binary_formats((major, 0), arch));
        }

        // x86_64 binaries built for older releases still run. arm64 support arrived
        // in 11.0, so there aren't any older arm64 binaries -- except that a
        // universal2 binary can target an older release for its x86_64 half.
        for minor in (4..=16).rev() {
            if arch == "x86_64" {
                push_version_tags(&mut tags, (10, minor), &mac_binary_formats((10, minor), arch));
            } else {
                push_version_tags(&mut tags, (10, minor), &["universal2"]);
            }
        }
    }
    Ok(tags)
}
