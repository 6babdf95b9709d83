//! Working out which ABI tags an interpreter's extension modules use.

use crate::facts::{BuildConfig, OsFamily};
use crate::prelude::*;

/// The ABIs an interpreter can load, best first. `abi3` and `none` aren't in
/// `abis`; the assembler adds them itself, `abi3` only when `abi3` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiTags {
    pub abis: Vec<String>,
    pub abi3: bool,
}

impl AbiTags {
    pub fn for_interpreter(
        identity: &InterpreterIdentity,
        config: &BuildConfig,
        os_family: &OsFamily,
    ) -> Result<AbiTags> {
        let mut abis = if identity.is_cpython() {
            cpython_abis(identity.version.major_minor(), config)
        } else {
            generic_abis(identity.version.major_minor(), config, os_family)?
        };
        abis.retain(|abi| abi != "abi3" && abi != "none");
        let abi3 = identity.is_cpython()
            && abi3_applies(identity.version.major_minor(), is_threaded_cpython(&abis));
        Ok(AbiTags { abis, abi3 })
    }
}

fn is_debug_build(config: &BuildConfig) -> bool {
    match config.py_debug {
        Some(debug) => debug,
        // Windows doesn't set Py_DEBUG, so checking for support of debug-compiled
        // extension modules is the best we can do.
        None => {
            config.has_refcount
                || config.extension_suffixes.iter().any(|s| s == "_d.pyd")
        }
    }
}

/// `cp<MAJORMINOR>[t][d][m][u]`, plus the plain non-debug ABI for pre-3.8 debug
/// builds.
pub fn cpython_abis(py_version: (u32, u32), config: &BuildConfig) -> Vec<String> {
    let version = version_nodot(py_version.0, py_version.1);
    let debug = is_debug_build(config);
    let threading = py_version >= (3, 13) && config.gil_disabled;
    let mut pymalloc = false;
    let mut ucs4 = false;
    if py_version < (3, 8) {
        pymalloc = config.with_pymalloc.unwrap_or(true);
        if py_version < (3, 3) {
            ucs4 = match config.unicode_size {
                Some(size) => size == 4,
                None => config.max_unicode == Some(0x10FFFF),
            };
        }
    }

    let flags = |debug: bool| {
        let mut abi = format!("cp{version}");
        for (set, flag) in [(threading, 't'), (debug, 'd'), (pymalloc, 'm'), (ucs4, 'u')] {
            if set {
                abi.push(flag);
            }
        }
        abi
    };

    let mut abis = Vec::new();
    if debug && py_version < (3, 8) {
        // Debug builds can load ordinary extension modules too. This deliberately
        // differs from `packaging.tags`, which gives [cp37dm] here and
        // [cp311d, cp311] from 3.8 on; we give [cp37m, cp37dm] and [cp311d].
        // test_cpython_abis_debug pins it.
        abis.push(flags(false));
    }
    abis.push(flags(debug));
    abis
}

/// Derive the ABI tag from `EXT_SUFFIX`, for interpreters that aren't CPython.
///
/// - linux:   '.cpython-310-x86_64-linux-gnu.so' => cp310
/// - mac:     '.cpython-310-darwin.so'           => cp310
/// - win:     '.cp310-win_amd64.pyd'             => cp310
/// - pypy:    '.pypy38-pp73-x86_64-linux-gnu.so' => pypy38_pp73
/// - graalpy: '.graalpy-38-native-x86_64-darwin.dylib' => graalpy_38_native
pub fn generic_abis(
    py_version: (u32, u32),
    config: &BuildConfig,
    os_family: &OsFamily,
) -> Result<Vec<String>> {
    let malformed = || IdentifyError::MalformedAbiSuffix {
        suffix: config.ext_suffix.clone().unwrap_or_default(),
    };
    let ext_suffix = match &config.ext_suffix {
        Some(s) if s.starts_with('.') => s,
        _ => Err(malformed())?,
    };
    let parts: Vec<&str> = ext_suffix.split('.').collect();
    if parts.len() < 3 {
        // CPython 3.7 and earlier just used ".pyd" on Windows
        if *os_family == OsFamily::Windows {
            return Ok(cpython_abis(py_version, config));
        }
        Err(malformed())?
    }
    let soabi = parts[1];
    let segments: Vec<&str> = soabi.split('-').collect();
    let abi = if soabi.starts_with("cpython") {
        match segments.get(1) {
            Some(version) if !version.is_empty() => format!("cp{version}"),
            _ => Err(malformed())?,
        }
    } else if soabi.starts_with("cp") {
        segments[0].to_owned()
    } else if soabi.starts_with("pypy") {
        segments.iter().take(2).copied().collect::<Vec<_>>().join("-")
    } else if soabi.starts_with("graalpy") {
        segments.iter().take(3).copied().collect::<Vec<_>>().join("-")
    } else if !soabi.is_empty() {
        // pyston, ironpython, others?
        soabi.to_owned()
    } else {
        return Ok(vec![]);
    };
    Ok(vec![normalize_string(&abi)])
}

/// Threaded (`--disable-gil`) builds have a "t" in their abiflags.
pub fn is_threaded_cpython(abis: &[String]) -> bool {
    static CPYTHON_ABI: Lazy<Regex> = Lazy::new(|| Regex::new(r"^cp[0-9]+(.*)").unwrap());

    abis.first()
        .and_then(|abi| CPYTHON_ABI.captures(abi))
        .map(|captures| captures[1].contains('t'))
        .unwrap_or(false)
}

/// PEP 384 was first implemented in Python 3.2. Threaded builds don't support
/// abi3.
pub fn abi3_applies(py_version: (u32, u32), threading: bool) -> bool {
    py_version >= (3, 2) && !threading
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> BuildConfig {
        BuildConfig {
            py_debug: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn test_cpython_abis_modern() {
        assert_eq!(cpython_abis((3, 9), &config()), vec!["cp39"]);
        assert_eq!(cpython_abis((3, 12), &config()), vec!["cp312"]);

        let free_threaded = BuildConfig {
            gil_disabled: true,
            ..config()
        };
        assert_eq!(cpython_abis((3, 13), &free_threaded), vec!["cp313t"]);
        // Py_GIL_DISABLED means nothing before 3.13
        assert_eq!(cpython_abis((3, 12), &free_threaded), vec!["cp312"]);
    }

    #[test]
    fn test_cpython_abis_debug() {
        let debug = BuildConfig {
            py_debug: Some(true),
            ..Default::default()
        };
        assert_eq!(cpython_abis((3, 11), &debug), vec!["cp311d"]);
        assert_eq!(cpython_abis((3, 7), &debug), vec!["cp37m", "cp37dm"]);

        let threaded_debug = BuildConfig {
            gil_disabled: true,
            ..debug.clone()
        };
        assert_eq!(cpython_abis((3, 13), &threaded_debug), vec!["cp313td"]);

        // No Py_DEBUG, but the interpreter can load _d.pyd files
        let windows_debug = BuildConfig {
            extension_suffixes: vec!["_d.pyd".into(), ".pyd".into()],
            ..Default::default()
        };
        assert_eq!(cpython_abis((3, 10), &windows_debug), vec!["cp310d"]);

        let refcount = BuildConfig {
            has_refcount: true,
            ..Default::default()
        };
        assert_eq!(cpython_abis((3, 10), &refcount), vec!["cp310d"]);
        // an explicit Py_DEBUG=0 wins
        let refcount = BuildConfig {
            py_debug: Some(false),
            ..refcount
        };
        assert_eq!(cpython_abis((3, 10), &refcount), vec!["cp310"]);
    }

    #[test]
    fn test_cpython_abis_legacy_flags() {
        assert_eq!(cpython_abis((3, 7), &config()), vec!["cp37m"]);
        let no_pymalloc = BuildConfig {
            with_pymalloc: Some(false),
            ..config()
        };
        assert_eq!(cpython_abis((3, 6), &no_pymalloc), vec!["cp36"]);

        let wide = BuildConfig {
            unicode_size: Some(4),
            ..config()
        };
        assert_eq!(cpython_abis((2, 7), &wide), vec!["cp27mu"]);
        // ucs4 only matters before 3.3
        assert_eq!(cpython_abis((3, 3), &wide), vec!["cp33m"]);

        let narrow = BuildConfig {
            max_unicode: Some(0xFFFF),
            ..config()
        };
        assert_eq!(cpython_abis((2, 7), &narrow), vec!["cp27m"]);
        let wide_by_maxunicode = BuildConfig {
            max_unicode: Some(0x10FFFF),
            ..config()
        };
        assert_eq!(cpython_abis((2, 7), &wide_by_maxunicode), vec!["cp27mu"]);
    }

    fn generic(suffix: Option<&str>, os: OsFamily) -> Result<Vec<String>> {
        let config = BuildConfig {
            ext_suffix: suffix.map(|s| s.to_owned()),
            ..config()
        };
        generic_abis((3, 10), &config, &os)
    }

    #[test]
    fn test_generic_abis() {
        assert_eq!(
            generic(Some(".cpython-310-x86_64-linux-gnu.so"), OsFamily::Linux).unwrap(),
            vec!["cp310"]
        );
        assert_eq!(
            generic(Some(".cpython-310-darwin.so"), OsFamily::MacOS).unwrap(),
            vec!["cp310"]
        );
        assert_eq!(
            generic(Some(".cp310-win_amd64.pyd"), OsFamily::Windows).unwrap(),
            vec!["cp310"]
        );
        assert_eq!(
            generic(Some(".pypy38-pp73-x86_64-linux-gnu.so"), OsFamily::Linux).unwrap(),
            vec!["pypy38_pp73"]
        );
        assert_eq!(
            generic(Some(".graalpy-38-native-x86_64-darwin.dylib"), OsFamily::MacOS)
                .unwrap(),
            vec!["graalpy_38_native"]
        );
        assert_eq!(
            generic(Some(".pyston-23-x86_64-linux-gnu.so"), OsFamily::Linux).unwrap(),
            vec!["pyston_23_x86_64_linux_gnu"]
        );
        assert_eq!(
            generic(Some("..so"), OsFamily::Linux).unwrap(),
            Vec::<String>::new()
        );
        // old Windows CPythons fall back to the CPython rules
        assert_eq!(
            generic(Some(".pyd"), OsFamily::Windows).unwrap(),
            vec!["cp310"]
        );
    }

    #[test]
    fn test_generic_abis_malformed() {
        for (suffix, os) in [
            (None, OsFamily::Linux),
            (Some("cpython-310-x86_64-linux-gnu.so"), OsFamily::Linux),
            (Some(".so"), OsFamily::Linux),
            (Some(".cpython.so"), OsFamily::Linux),
        ] {
            let err = generic(suffix, os).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<IdentifyError>(),
                    Some(IdentifyError::MalformedAbiSuffix { .. })
                ),
                "{suffix:?}"
            );
        }
    }

    #[test]
    fn test_abi3_eligibility() {
        assert!(abi3_applies((3, 2), false));
        assert!(abi3_applies((3, 11), false));
        assert!(!abi3_applies((3, 13), true));
        assert!(!abi3_applies((3, 1), false));
        assert!(!abi3_applies((2, 7), false));

        assert!(is_threaded_cpython(&["cp313t".into()]));
        assert!(!is_threaded_cpython(&["cp313".into()]));
        assert!(!is_threaded_cpython(&["pypy38_pp73".into()]));
        assert!(!is_threaded_cpython(&[]));
    }

    #[test]
    fn test_abi_tags_for_interpreter() {
        let cpython = InterpreterIdentity {
            name: InterpreterName::CPython,
            version: PythonVersion::new(3, 13, 1),
            py_version_nodot: None,
        };
        let threaded = BuildConfig {
            gil_disabled: true,
            ..config()
        };
        let tags = AbiTags::for_interpreter(&cpython, &threaded, &OsFamily::Linux).unwrap();
        assert_eq!(tags.abis, vec!["cp313t"]);
        assert!(!tags.abi3);

        let tags = AbiTags::for_interpreter(&cpython, &config(), &OsFamily::Linux).unwrap();
        assert_eq!(tags.abis, vec!["cp313"]);
        assert!(tags.abi3);

        let pypy = InterpreterIdentity {
            name: InterpreterName::PyPy,
            version: PythonVersion::new(3, 10, 14),
            py_version_nodot: Some("310".into()),
        };
        let pypy_config = BuildConfig {
            ext_suffix: Some(".pypy310-pp73-x86_64-linux-gnu.so".into()),
            ..config()
        };
        let tags = AbiTags::for_interpreter(&pypy, &pypy_config, &OsFamily::Linux).unwrap();
        assert_eq!(tags.abis, vec!["pypy310_pp73"]);
        assert!(!tags.abi3);
    }
}
