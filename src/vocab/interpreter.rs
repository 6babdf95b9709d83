use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseLevel {
    Alpha,
    Beta,
    Candidate,
    Final,
}

impl ReleaseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseLevel::Alpha => "alpha",
            ReleaseLevel::Beta => "beta",
            ReleaseLevel::Candidate => "candidate",
            ReleaseLevel::Final => "final",
        }
    }
}

/// The equivalent of `sys.version_info`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub releaselevel: ReleaseLevel,
    pub serial: u32,
}

impl PythonVersion {
    pub fn new(major: u32, minor: u32, micro: u32) -> PythonVersion {
        PythonVersion {
            major,
            minor,
            micro,
            releaselevel: ReleaseLevel::Final,
            serial: 0,
        }
    }

    pub fn major_minor(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    /// What `platform.python_version()` reports, e.g. "3.9.7" or "3.13.0rc1".
    pub fn full_version(&self) -> String {
        let base = format!("{}.{}.{}", self.major, self.minor, self.micro);
        match self.releaselevel {
            ReleaseLevel::Final => base,
            ReleaseLevel::Alpha => format!("{base}a{}", self.serial),
            ReleaseLevel::Beta => format!("{base}b{}", self.serial),
            ReleaseLevel::Candidate => format!("{base}rc{}", self.serial),
        }
    }
}

/// Interpreter implementations, by `sys.implementation.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterpreterName {
    Python,
    CPython,
    PyPy,
    IronPython,
    Jython,
    Other(String),
}

impl InterpreterName {
    pub fn from_implementation(name: &str) -> InterpreterName {
        match name.to_ascii_lowercase().as_str() {
            "python" => InterpreterName::Python,
            "cpython" => InterpreterName::CPython,
            "pypy" => InterpreterName::PyPy,
            "ironpython" => InterpreterName::IronPython,
            "jython" => InterpreterName::Jython,
            other => InterpreterName::Other(other.to_owned()),
        }
    }

    /// The abbreviation used in interpreter tags. Implementations without a
    /// reserved two-letter abbreviation use their full name.
    pub fn short_name(&self) -> &str {
        match self {
            InterpreterName::Python => "py",
            InterpreterName::CPython => "cp",
            InterpreterName::PyPy => "pp",
            InterpreterName::IronPython => "ip",
            InterpreterName::Jython => "jy",
            InterpreterName::Other(name) => name,
        }
    }
}

/// Who we are: computed once from the interpreter facts, then read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterIdentity {
    pub name: InterpreterName,
    pub version: PythonVersion,
    /// sysconfig's `py_version_nodot`, when the interpreter reports one
    pub py_version_nodot: Option<String>,
}

impl InterpreterIdentity {
    pub fn is_cpython(&self) -> bool {
        self.name == InterpreterName::CPython
    }

    /// The version part of the interpreter tag: "39" for 3.9, unless sysconfig
    /// says otherwise.
    pub fn interpreter_version(&self) -> String {
        match &self.py_version_nodot {
            Some(v) if !v.is_empty() => v.clone(),
            _ => version_nodot(self.version.major, self.version.minor),
        }
    }

    /// The short interpreter tag accepted with `none-any`, e.g. "pp3" or "cp39".
    pub fn short_interpreter(&self) -> Option<String> {
        match self.name {
            InterpreterName::PyPy if self.version.major == 3 => Some("pp3".into()),
            InterpreterName::CPython => Some(format!("cp{}", self.interpreter_version())),
            _ => None,
        }
    }
}
