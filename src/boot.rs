//! The boundary to the native boot library that actually execs a PEX.
//!
//! What happens on the other side is opaque to us: we hand over the interpreter, the
//! PEX file, an environment and an argv, and get back an exit code.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

use crate::prelude::*;

/// Returned by the boot library when booting itself failed, as opposed to the
/// booted program exiting with some code of its own.
pub const BOOT_ERROR_CODE: i32 = 75;

pub trait Boot {
    fn boot(&self, python_exe: &CStr, pex_file: &CStr, environ: &[CString], argv: &[CString])
        -> i32;
}

/// `environ` and `argv` are NULL-terminated arrays of NUL-terminated strings.
pub type BootFn = unsafe extern "C" fn(
    python_exe: *const c_char,
    pex_file: *const c_char,
    environ: *const *const c_char,
    argv: *const *const c_char,
) -> c_int;

/// A `boot` entry point resolved out of the native library.
pub struct NativeBoot {
    entry: BootFn,
}

impl NativeBoot {
    /// # Safety
    ///
    /// `entry` must point at the native library's `boot` function, and the library
    /// must stay loaded for as long as this value lives.
    pub unsafe fn new(entry: BootFn) -> NativeBoot {
        NativeBoot { entry }
    }
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

impl Boot for NativeBoot {
    fn boot(
        &self,
        python_exe: &CStr,
        pex_file: &CStr,
        environ: &[CString],
        argv: &[CString],
    ) -> i32 {
        let environ = null_terminated(environ);
        let argv = null_terminated(argv);
        // all the pointers borrow from values that outlive the call
        unsafe {
            (self.entry)(
                python_exe.as_ptr(),
                pex_file.as_ptr(),
                environ.as_ptr(),
                argv.as_ptr(),
            )
        }
    }
}

fn to_cstring(value: &str) -> Result<CString> {
    CString::new(value).wrap_err_with(|| format!("{:?} contains a NUL byte", value))
}

/// Everything needed for one boot call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootRequest {
    pub python: String,
    pub pex: String,
    pub python_args: Vec<String>,
    pub args: Vec<String>,
    /// Used as-is when neither `python_args` nor `args` is given.
    pub default_argv: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl BootRequest {
    /// Boot `pex` with `python`, passing along this process's argv and environment.
    pub fn new(python: &str, pex: &str) -> BootRequest {
        BootRequest {
            python: python.into(),
            pex: pex.into(),
            python_args: Vec::new(),
            args: Vec::new(),
            default_argv: std::env::args().collect(),
            env: std::env::vars().collect(),
        }
    }

    pub fn with_python_args<I: IntoIterator<Item = String>>(mut self, python_args: I) -> Self {
        self.python_args = python_args.into_iter().collect();
        self
    }

    pub fn with_args<I: IntoIterator<Item = String>>(mut self, args: I) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    pub fn with_env<I: IntoIterator<Item = (String, String)>>(mut self, env: I) -> Self {
        self.env = env.into_iter().collect();
        self
    }

    /// `python [python_args..] pex [args..]`
    pub fn argv(&self) -> Result<Vec<CString>> {
        if self.python_args.is_empty() && self.args.is_empty() {
            return self.default_argv.iter().map(|a| to_cstring(a)).collect();
        }
        std::iter::once(&self.python)
            .chain(&self.python_args)
            .chain(std::iter::once(&self.pex))
            .chain(&self.args)
            .map(|a| to_cstring(a))
            .collect()
    }

    /// `NAME=VALUE` strings.
    pub fn environ(&self) -> Result<Vec<CString>> {
        self.env
            .iter()
            .map(|(name, value)| to_cstring(&format!("{name}={value}")))
            .collect()
    }

    pub fn run(&self, boot: &dyn Boot) -> Result<i32> {
        context!("booting {} with {}", self.pex, self.python);
        let python_exe = to_cstring(&self.python)?;
        let pex_file = to_cstring(&self.pex)?;
        let code = boot.boot(&python_exe, &pex_file, &self.environ()?, &self.argv()?);
        if code == BOOT_ERROR_CODE {
            warn!("the boot library reported an internal error");
        }
        Ok(code)
    }
}

/// Which prebuilt boot library fits a given machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTarget {
    os: NativeOs,
    arch: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NativeOs {
    Linux,
    MacOS,
    Windows,
}

impl NativeTarget {
    /// `system` and `machine` as reported by `platform.system()` and
    /// `platform.machine()`.
    pub fn new(system: &str, machine: &str) -> Result<NativeTarget> {
        let os = match system.to_ascii_lowercase().as_str() {
            "linux" => NativeOs::Linux,
            "darwin" => NativeOs::MacOS,
            "windows" => NativeOs::Windows,
            _ => Err(IdentifyError::UnsupportedOs {
                os: system.to_owned(),
            })?,
        };
        let arch = match machine.to_ascii_lowercase().as_str() {
            "aarch64" | "arm64" => "aarch64",
            "armv7l" | "armv8l" => "arm",
            "ppc64le" => "powerpc64le",
            "amd64" | "x86_64" => "x86_64",
            _ => Err(IdentifyError::UnsupportedArch {
                arch: machine.to_owned(),
            })?,
        };
        Ok(NativeTarget { os, arch })
    }

    pub fn os_name(&self) -> &'static str {
        match self.os {
            NativeOs::Linux => "linux",
            NativeOs::MacOS => "macos",
            NativeOs::Windows => "windows",
        }
    }

    pub fn library_file_name(&self, name: &str) -> String {
        match self.os {
            NativeOs::Linux => format!("lib{name}.so"),
            NativeOs::MacOS => format!("lib{name}.dylib"),
            NativeOs::Windows => format!("{name}.dll"),
        }
    }

    /// e.g. "x86_64-linux"
    pub fn platform_id(&self) -> String {
        format!("{}-{}", self.arch, self.os_name())
    }

    /// Where the library lives inside a PEX: the per-platform build first, then the
    /// one built for the local machine during development.
    pub fn library_resource_paths(&self, name: &str) -> [PathBuf; 2] {
        let file_name = self.library_file_name(name);
        [
            ["lib", self.platform_id().as_str(), file_name.as_str()].iter().collect(),
            ["lib", "native", file_name.as_str()].iter().collect(),
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::RecordingBoot;

    fn strings(cstrings: &[CString]) -> Vec<&str> {
        cstrings.iter().map(|c| c.to_str().unwrap()).collect()
    }

    #[test]
    fn test_argv() {
        let request = BootRequest::new("/usr/bin/python3", "app.pex")
            .with_python_args(["-I".to_string()])
            .with_args(["--flag".to_string(), "value".to_string()]);
        assert_eq!(
            strings(&request.argv().unwrap()),
            vec!["/usr/bin/python3", "-I", "app.pex", "--flag", "value"]
        );

        let only_args = BootRequest::new("python", "app.pex").with_args(["x".to_string()]);
        assert_eq!(strings(&only_args.argv().unwrap()), vec!["python", "app.pex", "x"]);

        let mut passthrough = BootRequest::new("python", "app.pex");
        passthrough.default_argv = vec!["app.pex".into(), "serve".into()];
        assert_eq!(strings(&passthrough.argv().unwrap()), vec!["app.pex", "serve"]);
    }

    #[test]
    fn test_environ() {
        let request = BootRequest::new("python", "app.pex").with_env([
            ("PATH".to_string(), "/bin:/usr/bin".to_string()),
            ("EMPTY".to_string(), String::new()),
        ]);
        assert_eq!(
            strings(&request.environ().unwrap()),
            vec!["PATH=/bin:/usr/bin", "EMPTY="]
        );

        let bad = BootRequest::new("python", "app.pex")
            .with_env([("BAD".to_string(), "a\0b".to_string())]);
        assert!(bad.environ().is_err());
    }

    #[test]
    fn test_run() {
        let boot = RecordingBoot::new(3);
        let request = BootRequest::new("/usr/bin/python3", "app.pex")
            .with_args(["hello".to_string()])
            .with_env([("A".to_string(), "1".to_string())]);
        assert_eq!(request.run(&boot).unwrap(), 3);

        let calls = boot.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].python_exe, "/usr/bin/python3");
        assert_eq!(calls[0].pex_file, "app.pex");
        assert_eq!(calls[0].environ, vec!["A=1"]);
        assert_eq!(calls[0].argv, vec!["/usr/bin/python3", "app.pex", "hello"]);

        let failing = RecordingBoot::new(BOOT_ERROR_CODE);
        assert_eq!(request.run(&failing).unwrap(), BOOT_ERROR_CODE);

        let bad = BootRequest::new("/usr/bin/python\03", "app.pex");
        assert!(bad.run(&boot).is_err());
        assert_eq!(boot.calls().len(), 1);
    }

    unsafe extern "C" fn count_argv(
        _python_exe: *const c_char,
        _pex_file: *const c_char,
        _environ: *const *const c_char,
        argv: *const *const c_char,
    ) -> c_int {
        let mut n = 0;
        while !(*argv.offset(n)).is_null() {
            n += 1;
        }
        n as c_int
    }

    #[test]
    fn test_native_boot() {
        let boot = unsafe { NativeBoot::new(count_argv) };
        let request = BootRequest::new("python", "app.pex")
            .with_args(["a".to_string(), "b".to_string()])
            .with_env(Vec::new());
        assert_eq!(request.run(&boot).unwrap(), 4);
    }

    #[test]
    fn test_native_target() {
        let target = NativeTarget::new("Linux", "x86_64").unwrap();
        assert_eq!(target.platform_id(), "x86_64-linux");
        assert_eq!(target.library_file_name("pexcz"), "libpexcz.so");

        let target = NativeTarget::new("Darwin", "arm64").unwrap();
        assert_eq!(target.platform_id(), "aarch64-macos");
        assert_eq!(target.library_file_name("pexcz"), "libpexcz.dylib");
        assert_eq!(
            target.library_resource_paths("pexcz"),
            [
                PathBuf::from("lib/aarch64-macos/libpexcz.dylib"),
                PathBuf::from("lib/native/libpexcz.dylib"),
            ]
        );

        let target = NativeTarget::new("Windows", "AMD64").unwrap();
        assert_eq!(target.platform_id(), "x86_64-windows");
        assert_eq!(target.library_file_name("pexcz"), "pexcz.dll");

        assert_eq!(
            NativeTarget::new("linux", "armv8l").unwrap().platform_id(),
            "arm-linux"
        );
        assert_eq!(
            NativeTarget::new("linux", "ppc64le").unwrap().platform_id(),
            "powerpc64le-linux"
        );
    }

    #[test]
    fn test_native_target_unsupported() {
        let err = NativeTarget::new("FreeBSD", "x86_64").unwrap_err();
        assert_eq!(
            err.downcast_ref::<IdentifyError>(),
            Some(&IdentifyError::UnsupportedOs { os: "FreeBSD".into() })
        );
        let err = NativeTarget::new("linux", "s390x").unwrap_err();
        assert_eq!(
            err.downcast_ref::<IdentifyError>(),
            Some(&IdentifyError::UnsupportedArch { arch: "s390x".into() })
        );
    }
}
