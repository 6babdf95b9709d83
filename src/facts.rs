//! Raw facts about an interpreter and the OS it runs on.
//!
//! Everything here is plain data: it's gathered once (usually by running the
//! target interpreter, see `crate::probe`), and then the tag computations are pure
//! functions of it. It round-trips through JSON so that facts collected on one
//! machine can be resolved somewhere else.

use crate::platform_tags::ManylinuxModule;
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFacts {
    pub interpreter: InterpreterFacts,
    pub platform: PlatformFacts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterFacts {
    /// `sys.implementation.name`, e.g. "cpython"
    pub implementation_name: String,
    /// `sys.version_info`
    pub version: PythonVersion,
    /// `sys.implementation.version`; missing on ancient interpreters
    #[serde(default)]
    pub implementation_version: Option<PythonVersion>,
    pub path: PathBuf,
    pub realpath: PathBuf,
    pub prefix: PathBuf,
    #[serde(default)]
    pub base_prefix: Option<PathBuf>,
    #[serde(default)]
    pub config: BuildConfig,
    #[serde(default)]
    pub marker: MarkerFacts,
}

impl InterpreterFacts {
    pub fn identity(&self) -> InterpreterIdentity {
        InterpreterIdentity {
            name: InterpreterName::from_implementation(&self.implementation_name),
            version: self.version.clone(),
            py_version_nodot: self.config.py_version_nodot.clone(),
        }
    }
}

/// The sysconfig variables and build flags that decide which ABIs an interpreter
/// can load. `None` means "the interpreter didn't say".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub py_version_nodot: Option<String>,
    /// `Py_DEBUG`
    pub py_debug: Option<bool>,
    /// `hasattr(sys, "gettotalrefcount")`
    pub has_refcount: bool,
    /// `importlib.machinery.EXTENSION_SUFFIXES`
    pub extension_suffixes: Vec<String>,
    /// `Py_GIL_DISABLED`
    pub gil_disabled: bool,
    /// `WITH_PYMALLOC`
    pub with_pymalloc: Option<bool>,
    /// `Py_UNICODE_SIZE`
    pub unicode_size: Option<u32>,
    /// `sys.maxunicode`
    pub max_unicode: Option<u32>,
    /// `EXT_SUFFIX` (or the legacy `SO`)
    pub ext_suffix: Option<String>,
    /// `PYTHONFRAMEWORK`
    pub python_framework: Option<String>,
}

/// Raw inputs for the PEP 508 marker environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerFacts {
    pub os_name: String,
    pub sys_platform: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub enum OsFamily {
    Linux,
    MacOS,
    Windows,
    IOS,
    Android,
    /// Anything else; the name is `platform.system().lower()`
    Generic(String),
}

impl TryFrom<&str> for OsFamily {
    type Error = eyre::Report;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lowered = value.trim().to_ascii_lowercase();
        Ok(match lowered.as_str() {
            "" => Err(IdentifyError::UnsupportedOs {
                os: value.to_owned(),
            })?,
            "linux" => OsFamily::Linux,
            "darwin" | "macos" => OsFamily::MacOS,
            "windows" => OsFamily::Windows,
            "ios" => OsFamily::IOS,
            "android" => OsFamily::Android,
            _ => OsFamily::Generic(lowered),
        })
    }
}

try_from_str_boilerplate!(OsFamily);

impl Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsFamily::Linux => write!(f, "linux"),
            OsFamily::MacOS => write!(f, "darwin"),
            OsFamily::Windows => write!(f, "windows"),
            OsFamily::IOS => write!(f, "ios"),
            OsFamily::Android => write!(f, "android"),
            OsFamily::Generic(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFacts {
    pub os_family: OsFamily,
    /// `platform.machine()` (on macOS, the cpu arch from `platform.mac_ver()`)
    pub machine: String,
    #[serde(default)]
    pub is_32bit_interpreter: bool,
    /// `sysconfig.get_platform()`, e.g. "linux-x86_64" or "macosx-11.0-arm64"
    pub sysconfig_platform: String,
    /// The OS release as reported to the interpreter: `platform.mac_ver()[0]` on
    /// macOS, `platform.ios_ver().release` on iOS
    #[serde(default)]
    pub os_release: Option<String>,
    #[serde(default)]
    pub android_api_level: Option<u32>,
    /// `sys.implementation._multiarch`, needed on iOS
    #[serde(default)]
    pub multiarch: Option<String>,
    /// `os.confstr("CS_GNU_LIBC_VERSION")` minus the "glibc " prefix, if any
    #[serde(default)]
    pub glibc_version: Option<String>,
    /// What an importable `_manylinux` module says
    #[serde(default)]
    pub manylinux_module: Option<ManylinuxModule>,
}

impl PlatformFacts {
    pub fn new(os_family: OsFamily, machine: &str, sysconfig_platform: &str) -> PlatformFacts {
        PlatformFacts {
            os_family,
            machine: machine.into(),
            is_32bit_interpreter: false,
            sysconfig_platform: sysconfig_platform.into(),
            os_release: None,
            android_api_level: None,
            multiarch: None,
            glibc_version: None,
            manylinux_module: None,
        }
    }

    /// The machine name with dots, dashes and spaces turned into underscores.
    pub fn machine(&self) -> Result<String> {
        let machine = self.machine.trim();
        if machine.is_empty() {
            Err(IdentifyError::UnsupportedArch {
                arch: self.machine.clone(),
            })?
        }
        Ok(normalize_string(machine))
    }

    pub fn normalized_sysconfig_platform(&self) -> String {
        normalize_string(&self.sysconfig_platform)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_os_family() {
        assert_eq!("Linux".parse::<OsFamily>().unwrap(), OsFamily::Linux);
        assert_eq!("darwin".parse::<OsFamily>().unwrap(), OsFamily::MacOS);
        assert_eq!("iOS".parse::<OsFamily>().unwrap(), OsFamily::IOS);
        assert_eq!(
            "FreeBSD".parse::<OsFamily>().unwrap(),
            OsFamily::Generic("freebsd".into())
        );

        let err = "".parse::<OsFamily>().unwrap_err();
        assert_eq!(
            err.downcast_ref::<IdentifyError>(),
            Some(&IdentifyError::UnsupportedOs { os: "".into() })
        );
    }

    #[test]
    fn test_machine_validation() {
        let facts = PlatformFacts::new(OsFamily::Linux, "", "linux-x86_64");
        let err = facts.machine().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IdentifyError>(),
            Some(IdentifyError::UnsupportedArch { .. })
        ));

        let facts = PlatformFacts::new(OsFamily::Generic("sunos".into()), "i86pc", "solaris-2.11-i86pc");
        assert_eq!(facts.machine().unwrap(), "i86pc");
        assert_eq!(facts.normalized_sysconfig_platform(), "solaris_2_11_i86pc");
    }

    #[test]
    fn test_facts_from_json() {
        let facts: EnvironmentFacts = serde_json::from_str(indoc! {r#"
            {
              "interpreter": {
                "implementation_name": "cpython",
                "version": {"major": 3, "minor": 9, "micro": 7, "releaselevel": "final", "serial": 0},
                "path": "/usr/bin/python3",
                "realpath": "/usr/bin/python3.9",
                "prefix": "/usr",
                "config": {"py_debug": false, "ext_suffix": ".cpython-39-x86_64-linux-gnu.so"}
              },
              "platform": {
                "os_family": "linux",
                "machine": "x86_64",
                "sysconfig_platform": "linux-x86_64",
                "glibc_version": "2.28"
              }
            }
        "#})
        .unwrap();
        assert_eq!(facts.platform.os_family, OsFamily::Linux);
        assert!(!facts.platform.is_32bit_interpreter);
        assert_eq!(facts.interpreter.base_prefix, None);
        assert_eq!(facts.interpreter.config.py_debug, Some(false));
        assert_eq!(facts.interpreter.config.with_pymalloc, None);
        assert!(facts.interpreter.identity().is_cpython());
    }
}
