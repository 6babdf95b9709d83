use crate::facts::PlatformFacts;
use crate::prelude::*;

/// What the external C runtime probe found out about the host.
///
/// Serialized the same way the boot tooling passes it on the command line:
///
///   {"manylinux": {"glibc": {"major": 2, "minor": 28}, "armhf": false, "i686": true}}
///   {"musllinux": {"major": 1, "minor": 2}}
///
/// A `null` glibc means "ask the interpreter's own libc".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinuxRuntimeFacts {
    Manylinux {
        glibc: Option<GlibcVersion>,
        #[serde(default)]
        armhf: bool,
        #[serde(default)]
        i686: bool,
    },
    Musllinux {
        major: u32,
        minor: u32,
    },
}

impl TryFrom<&str> for LinuxRuntimeFacts {
    type Error = eyre::Report;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(value)
            .wrap_err_with(|| format!("invalid linux runtime info {:?}", value))
    }
}

try_from_str_boilerplate!(LinuxRuntimeFacts);

/// A glibc version. Signed, because "unknown" is spelled (-1, -1): that's older
/// than anything real, so it rules out every manylinux tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GlibcVersion {
    pub major: i32,
    pub minor: i32,
}

impl GlibcVersion {
    pub const UNKNOWN: GlibcVersion = GlibcVersion {
        major: -1,
        minor: -1,
    };

    pub fn new(major: i32, minor: i32) -> GlibcVersion {
        GlibcVersion { major, minor }
    }

    /// We use a regexp instead of splitting on dots because we want to discard any
    /// random junk that might come after the minor version -- this might happen in
    /// patched/forked versions of glibc (e.g. Linaro's version of glibc uses version
    /// strings like "2.20-2014.11").
    pub fn parse(version_str: &str) -> GlibcVersion {
        static GLIBC_VERSION_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^([0-9]+)\.([0-9]+)").unwrap());

        let parsed = GLIBC_VERSION_RE.captures(version_str).and_then(|captures| {
            Some(GlibcVersion::new(
                captures[1].parse().ok()?,
                captures[2].parse().ok()?,
            ))
        });
        match parsed {
            Some(version) => version,
            None => {
                warn!("unexpected glibc version string {:?}", version_str);
                GlibcVersion::UNKNOWN
            }
        }
    }
}

impl Display for GlibcVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Hook for distributors to veto (or bless) particular manylinux versions, like
/// the `_manylinux` module from PEP 600.
pub trait ManylinuxPolicy {
    /// `None` means "no opinion", which counts as compatible.
    fn manylinux_compatible(&self, major: i32, minor: i32, arch: &str) -> Option<bool>;
}

/// No override installed: trust the glibc version.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoManylinuxPolicy;

impl ManylinuxPolicy for NoManylinuxPolicy {
    fn manylinux_compatible(&self, _major: i32, _minor: i32, _arch: &str) -> Option<bool> {
        None
    }
}

/// The pre-PEP 600 `_manylinux` flags, one per legacy manylinux standard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyManylinuxFlags {
    pub manylinux1_compatible: Option<bool>,
    pub manylinux2010_compatible: Option<bool>,
    pub manylinux2014_compatible: Option<bool>,
}

impl ManylinuxPolicy for LegacyManylinuxFlags {
    fn manylinux_compatible(&self, major: i32, minor: i32, _arch: &str) -> Option<bool> {
        match (major, minor) {
            (2, 5) => self.manylinux1_compatible,
            (2, 12) => self.manylinux2010_compatible,
            (2, 17) => self.manylinux2014_compatible,
            _ => None,
        }
    }
}

/// One answer from `_manylinux.manylinux_compatible(major, minor, arch)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManylinuxHookAnswer {
    pub major: i32,
    pub minor: i32,
    pub arch: String,
    pub compatible: Option<bool>,
}

/// The PEP 600 hook can't be called from here, so the facts script calls it for
/// every version we might ask about and we look the answers up afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManylinuxHookTable {
    answers: Vec<ManylinuxHookAnswer>,
}

impl ManylinuxHookTable {
    pub fn new(answers: Vec<ManylinuxHookAnswer>) -> ManylinuxHookTable {
        ManylinuxHookTable { answers }
    }
}

impl ManylinuxPolicy for ManylinuxHookTable {
    fn manylinux_compatible(&self, major: i32, minor: i32, arch: &str) -> Option<bool> {
        self.answers
            .iter()
            .find(|a| a.major == major && a.minor == minor && a.arch == arch)
            .and_then(|a| a.compatible)
    }
}

/// What an importable `_manylinux` module told us. When it has the PEP 600
/// `manylinux_compatible` hook, the legacy flags are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManylinuxModule {
    #[serde(flatten)]
    pub legacy: LegacyManylinuxFlags,
    pub manylinux_compatible: Option<ManylinuxHookTable>,
}

impl ManylinuxPolicy for ManylinuxModule {
    fn manylinux_compatible(&self, major: i32, minor: i32, arch: &str) -> Option<bool> {
        match &self.manylinux_compatible {
            Some(hook) => hook.manylinux_compatible(major, minor, arch),
            None => self.legacy.manylinux_compatible(major, minor, arch),
        }
    }
}

/// If glibc ever changes its major version, we need to know what the last minor
/// version was, so we can build the complete list of all versions. Until that
/// happens, every major gets the same guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlibcMinorCeilings {
    known: BTreeMap<i32, i32>,
    default: i32,
}

impl Default for GlibcMinorCeilings {
    fn default() -> Self {
        GlibcMinorCeilings {
            known: BTreeMap::new(),
            default: 50,
        }
    }
}

impl GlibcMinorCeilings {
    pub fn with_ceiling(mut self, major: i32, last_minor: i32) -> Self {
        self.known.insert(major, last_minor);
        self
    }

    pub fn last_minor(&self, major: i32) -> i32 {
        self.known.get(&major).copied().unwrap_or(self.default)
    }
}

/// Everything the Linux enumerator needs besides the platform facts.
pub struct LinuxContext<'a> {
    pub runtime: &'a LinuxRuntimeFacts,
    pub policy: &'a dyn ManylinuxPolicy,
    pub ceilings: &'a GlibcMinorCeilings,
}

// CentOS 7 w/ glibc 2.17 (PEP 599), CentOS 6 w/ glibc 2.12 (PEP 571), CentOS 5 w/
// glibc 2.5 (PEP 513)
fn legacy_manylinux_alias(version: (i32, i32)) -> Option<&'static str> {
    match version {
        (2, 17) => Some("manylinux2014"),
        (2, 12) => Some("manylinux2010"),
        (2, 5) => Some("manylinux1"),
        _ => None,
    }
}

fn is_glibc_version_compatible(
    policy: &dyn ManylinuxPolicy,
    arch: &str,
    sys_glibc: GlibcVersion,
    version: GlibcVersion,
) -> bool {
    if sys_glibc < version {
        return false;
    }
    policy
        .manylinux_compatible(version.major, version.minor, arch)
        .unwrap_or(true)
}

fn have_compatible_abi(arches: &[String], armhf: bool, i686: bool) -> bool {
    const ALLOWED_ARCHES: &[&str] = &[
        "x86_64",
        "aarch64",
        "ppc64",
        "ppc64le",
        "s390x",
        "loongarch64",
        "riscv64",
    ];
    if arches.iter().any(|a| a == "armv7l") {
        return armhf;
    }
    if arches.iter().any(|a| a == "i686") {
        return i686;
    }
    arches.iter().any(|a| ALLOWED_ARCHES.contains(&a.as_str()))
}

/// All the manylinux tags supported by `current_glibc`, newest first, per arch.
pub fn manylinux_platform_tags(
    current_glibc: GlibcVersion,
    armhf: bool,
    i686: bool,
    arches: &[String],
    policy: &dyn ManylinuxPolicy,
    ceilings: &GlibcMinorCeilings,
) -> Vec<String> {
    let mut tags = Vec::new();
    if !have_compatible_abi(arches, armhf, i686) {
        return tags;
    }

    // Oldest glibc to be supported regardless of architecture is 2.17; on x86 it's
    // 2.5.
    let too_old_glibc2 = if arches.iter().any(|a| a == "x86_64" || a == "i686") {
        GlibcVersion::new(2, 4)
    } else {
        GlibcVersion::new(2, 16)
    };

    // We can assume compatibility across glibc major versions
    // (https://sourceware.org/bugzilla/show_bug.cgi?id=24636), so build a list of
    // the newest version for every major from current_glibc down to 2.
    let mut glibc_max_list = vec![current_glibc];
    for glibc_major in (2..current_glibc.major).rev() {
        glibc_max_list.push(GlibcVersion::new(
            glibc_major,
            ceilings.last_minor(glibc_major),
        ));
    }

    for arch in arches {
        for glibc_max in &glibc_max_list {
            // For other glibc major versions the oldest supported is (x, 0).
            let min_minor = if glibc_max.major == too_old_glibc2.major {
                too_old_glibc2.minor + 1
            } else {
                0
            };
            for glibc_minor in (min_minor..=glibc_max.minor).rev() {
                let version = GlibcVersion::new(glibc_max.major, glibc_minor);
                if !is_glibc_version_compatible(policy, arch, current_glibc, version) {
                    continue;
                }
                tags.push(format!(
                    "manylinux_{}_{}_{}",
                    version.major, version.minor, arch
                ));
                if let Some(legacy) = legacy_manylinux_alias((version.major, version.minor)) {
                    tags.push(format!("{legacy}_{arch}"));
                }
            }
        }
    }
    tags
}

pub fn musllinux_platform_tags(major: u32, minor: u32, arches: &[String]) -> Vec<String> {
    arches
        .iter()
        .flat_map(|arch| {
            (0..=minor)
                .rev()
                .map(move |minor| format!("musllinux_{major}_{minor}_{arch}"))
        })
        .collect()
}

pub fn linux_platform_tags(facts: &PlatformFacts, ctx: &LinuxContext) -> Result<Vec<String>> {
    let mut linux = facts.normalized_sysconfig_platform();
    if !linux.starts_with("linux_") {
        // shouldn't happen, but the sysconfig platform is always a safe answer
        warn!("unexpected sysconfig platform {:?} on Linux", facts.sysconfig_platform);
        return Ok(vec![linux]);
    }

    if facts.is_32bit_interpreter {
        if linux == "linux_x86_64" {
            linux = "linux_i686".into();
        } else if linux == "linux_aarch64" {
            linux = "linux_armv8l".into();
        }
    }

    let arch = &linux["linux_".len()..];
    if arch.is_empty() {
        Err(IdentifyError::UnsupportedArch {
            arch: facts.sysconfig_platform.clone(),
        })?
    }
    let arches: Vec<String> = match arch {
        "armv8l" => vec!["armv8l".into(), "armv7l".into()],
        _ => vec![arch.to_owned()],
    };

    let mut tags = match ctx.runtime {
        LinuxRuntimeFacts::Manylinux { glibc, armhf, i686 } => {
            let current_glibc = match glibc {
                Some(glibc) => *glibc,
                None => match &facts.glibc_version {
                    Some(version_str) => GlibcVersion::parse(version_str),
                    None => GlibcVersion::UNKNOWN,
                },
            };
            debug!("glibc {current_glibc} on {arches:?}");
            manylinux_platform_tags(
                current_glibc,
                *armhf,
                *i686,
                &arches,
                ctx.policy,
                ctx.ceilings,
            )
        }
        LinuxRuntimeFacts::Musllinux { major, minor } => {
            debug!("musl {major}.{minor} on {arches:?}");
            musllinux_platform_tags(*major, *minor, &arches)
        }
    };

    tags.extend(arches.iter().map(|arch| format!("linux_{arch}")));
    Ok(tags)
}
