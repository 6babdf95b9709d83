use crate::facts::PlatformFacts;
use crate::prelude::*;

/// 16 is the minimum API level known to have enough features to support CPython
/// without major patching.
const MIN_API_LEVEL: u32 = 16;

pub fn android_platform_tags(facts: &PlatformFacts) -> Result<Vec<String>> {
    let api_level = facts
        .android_api_level
        .ok_or_else(|| IdentifyError::VersionProbeFailure {
            detail: "no Android API level reported".into(),
        })?;
    // e.g. "android-24-arm64_v8a" -> "arm64_v8a"
    let abi = facts
        .sysconfig_platform
        .rsplit('-')
        .next()
        .map(normalize_string)
        .unwrap_or_default();
    if abi.is_empty() {
        Err(IdentifyError::UnsupportedArch {
            arch: facts.sysconfig_platform.clone(),
        })?
    }
    debug!("Android API level {api_level} ({abi})");

    Ok((MIN_API_LEVEL..=api_level)
        .rev()
        .map(|level| format!("android_{level}_{abi}"))
        .collect())
}
