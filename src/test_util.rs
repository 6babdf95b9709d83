use std::cell::{Cell, RefCell};
use std::ffi::{CStr, CString};
use std::rc::Rc;

use crate::boot::Boot;
use crate::facts::{BuildConfig, InterpreterFacts, MarkerFacts};
use crate::prelude::*;
use crate::probe::MacVersionProbe;

pub fn from_commented_json<T>(input: &str) -> T
where
    T: serde::de::DeserializeOwned,
{
    static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"#.*").unwrap());

    let replaced = COMMENT.replace_all(input, "");
    serde_json::from_str(&replaced).unwrap()
}

/// Answers with a fixed version string and counts how often it was asked.
pub struct CountingMacVersionProbe {
    version: String,
    calls: Rc<Cell<usize>>,
}

impl CountingMacVersionProbe {
    pub fn new(version: &str) -> CountingMacVersionProbe {
        CountingMacVersionProbe {
            version: version.into(),
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Stays readable after the probe itself has been handed off.
    pub fn counter(&self) -> Rc<Cell<usize>> {
        self.calls.clone()
    }
}

impl MacVersionProbe for CountingMacVersionProbe {
    fn true_macos_version(&self) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.version.clone())
    }
}

pub struct FailingMacVersionProbe;

impl MacVersionProbe for FailingMacVersionProbe {
    fn true_macos_version(&self) -> Result<String> {
        bail!("sw_vers exploded")
    }
}

/// A plain release build of CPython living in /usr.
pub fn cpython_facts(major: u32, minor: u32, micro: u32) -> InterpreterFacts {
    let version = PythonVersion::new(major, minor, micro);
    InterpreterFacts {
        implementation_name: "cpython".into(),
        version: version.clone(),
        implementation_version: Some(version),
        path: "/usr/bin/python3".into(),
        realpath: format!("/usr/bin/python{major}.{minor}").into(),
        prefix: "/usr".into(),
        base_prefix: Some("/usr".into()),
        config: BuildConfig {
            py_version_nodot: Some(version_nodot(major, minor)),
            py_debug: Some(false),
            ext_suffix: Some(format!(".cpython-{}-x86_64-linux-gnu.so", version_nodot(major, minor))),
            ..Default::default()
        },
        marker: MarkerFacts {
            os_name: "posix".into(),
            sys_platform: "linux".into(),
            platform_machine: "x86_64".into(),
            platform_python_implementation: "CPython".into(),
            platform_release: "6.1.0".into(),
            platform_system: "Linux".into(),
            platform_version: "#1 SMP PREEMPT_DYNAMIC".into(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootCall {
    pub python_exe: String,
    pub pex_file: String,
    pub environ: Vec<String>,
    pub argv: Vec<String>,
}

/// Remembers every boot call and answers with a fixed exit code.
pub struct RecordingBoot {
    exit_code: i32,
    calls: RefCell<Vec<BootCall>>,
}

impl RecordingBoot {
    pub fn new(exit_code: i32) -> RecordingBoot {
        RecordingBoot {
            exit_code,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<BootCall> {
        self.calls.borrow().clone()
    }
}

fn lossy(strings: &[CString]) -> Vec<String> {
    strings
        .iter()
        .map(|s| s.to_string_lossy().into_owned())
        .collect()
}

impl Boot for RecordingBoot {
    fn boot(
        &self,
        python_exe: &CStr,
        pex_file: &CStr,
        environ: &[CString],
        argv: &[CString],
    ) -> i32 {
        self.calls.borrow_mut().push(BootCall {
            python_exe: python_exe.to_string_lossy().into_owned(),
            pex_file: pex_file.to_string_lossy().into_owned(),
            environ: lossy(environ),
            argv: lossy(argv),
        });
        self.exit_code
    }
}
