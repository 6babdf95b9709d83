//! Utilities to figure out which platform tags (like "manylinux_2_17_x86_64" or
//! "win_amd64") a given interpreter can load binaries for.
//!
//! Unlike asking "what can this machine run", the answer here is about one specific
//! interpreter: a 32-bit interpreter on a 64-bit kernel only loads 32-bit wheels,
//! a Python built against an old macOS SDK sees a masked OS version, and so on. So
//! every enumerator works from the facts reported by (or about) that interpreter.
//!
//! Each enumerator returns the full list in priority order, best first.

mod android;
mod ios;
mod linux;
mod macos;

pub use android::android_platform_tags;
pub use ios::ios_platform_tags;
pub use linux::{
    linux_platform_tags, manylinux_platform_tags, musllinux_platform_tags, GlibcMinorCeilings,
    GlibcVersion, LegacyManylinuxFlags, LinuxContext, LinuxRuntimeFacts, ManylinuxHookAnswer,
    ManylinuxHookTable, ManylinuxModule, ManylinuxPolicy, NoManylinuxPolicy,
};
pub use macos::{mac_binary_formats, macos_platform_tags, macos_version};

use crate::facts::{OsFamily, PlatformFacts};
use crate::prelude::*;
use crate::probe::MacVersionProbe;

/// Windows and everything we don't have special rules for: the sysconfig platform
/// is the one and only tag.
pub fn generic_platform_tags(facts: &PlatformFacts) -> Vec<String> {
    vec![facts.normalized_sysconfig_platform()]
}

/// The collaborators the per-OS enumerators may need.
pub struct PlatformContext<'a> {
    pub linux: Option<LinuxContext<'a>>,
    pub mac_version_probe: &'a dyn MacVersionProbe,
}

pub fn platform_tags(facts: &PlatformFacts, ctx: &PlatformContext) -> Result<Vec<String>> {
    let tags = match &facts.os_family {
        OsFamily::Android => android_platform_tags(facts)?,
        OsFamily::IOS => ios_platform_tags(facts)?,
        OsFamily::MacOS => macos_platform_tags(facts, ctx.mac_version_probe)?,
        OsFamily::Linux => match &ctx.linux {
            Some(linux) => linux_platform_tags(facts, linux)?,
            None => bail!("Linux platforms need C runtime facts (manylinux or musllinux)"),
        },
        OsFamily::Windows | OsFamily::Generic(_) => generic_platform_tags(facts),
    };
    trace!("platform tags for {}: {:?}", facts.os_family, tags);
    Ok(tags)
}
