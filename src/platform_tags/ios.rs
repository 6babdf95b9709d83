use crate::facts::PlatformFacts;
use crate::prelude::*;

/// 12.0 is the first iOS release known to have enough features to support CPython.
const MIN_IOS_MAJOR: u32 = 12;

fn ios_version(release: &str) -> Result<(u32, u32)> {
    let mut pieces = release.trim().split('.');
    let mut next = || -> Result<u32> {
        let piece = pieces.next().unwrap_or("0");
        Ok(piece.parse::<u32>().map_err(|_| IdentifyError::VersionProbeFailure {
            detail: format!("unparseable iOS version {:?}", release),
        })?)
    };
    let major = next()?;
    let minor = next()?;
    Ok((major, minor))
}

/// Every iOS major.minor from the running one down to 12.0. Minor versions are
/// assumed to go up to X.9 for older majors; the highest so far has been 8 (14.8 and
/// 15.8), and the odd candidate that never matches is harmless.
pub fn ios_platform_tags(facts: &PlatformFacts) -> Result<Vec<String>> {
    let release = facts.os_release.as_deref().unwrap_or_default();
    let (major, minor) = ios_version(release)?;
    let multiarch = match &facts.multiarch {
        Some(multiarch) if !multiarch.is_empty() => multiarch.replace('-', "_"),
        _ => Err(IdentifyError::UnsupportedArch {
            arch: facts.machine.clone(),
        })?,
    };
    debug!("iOS {major}.{minor} ({multiarch})");

    let mut tags = Vec::new();
    if major < MIN_IOS_MAJOR {
        return Ok(tags);
    }
    tags.push(format!("ios_{major}_{minor}_{multiarch}"));
    for minor in (0..minor).rev() {
        tags.push(format!("ios_{major}_{minor}_{multiarch}"));
    }
    for major in (MIN_IOS_MAJOR..major).rev() {
        for minor in (0..=9).rev() {
            tags.push(format!("ios_{major}_{minor}_{multiarch}"));
        }
    }
    Ok(tags)
}
