//! Read-only probes that ask a real interpreter about itself.

use std::process::{Command, Output};

use crate::facts::EnvironmentFacts;
use crate::prelude::*;

const IDENTIFY_FACTS_SCRIPT: &str = include_str!("data-files/identify_facts.py");

/// Re-asks macOS for its real version, bypassing the "10.16" compatibility shim
/// that Pythons built against old SDKs see.
pub trait MacVersionProbe {
    fn true_macos_version(&self) -> Result<String>;
}

fn run_python(python: &Path, code: &str, command: &mut Command) -> Result<Output> {
    let output = command
        .arg("-sS")
        .arg("-c")
        .arg(code)
        .output()
        .wrap_err_with(|| format!("failed to run {}", python.display()))?;
    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            python.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output)
}

#[derive(Debug, Clone)]
pub struct SubprocessMacVersionProbe {
    python: PathBuf,
}

impl SubprocessMacVersionProbe {
    pub fn new(python: &Path) -> SubprocessMacVersionProbe {
        SubprocessMacVersionProbe {
            python: python.to_owned(),
        }
    }
}

impl MacVersionProbe for SubprocessMacVersionProbe {
    fn true_macos_version(&self) -> Result<String> {
        // With SYSTEM_VERSION_COMPAT=0 the OS stops pretending to be 10.16. The child
        // gets nothing else from our environment.
        let mut command = Command::new(&self.python);
        command.env_clear().env("SYSTEM_VERSION_COMPAT", "0");
        let output = run_python(
            &self.python,
            "import platform; print(platform.mac_ver()[0])",
            &mut command,
        )?;
        let version = String::from_utf8(output.stdout)
            .wrap_err("macOS version isn't valid UTF-8")?;
        Ok(version.trim().to_owned())
    }
}

/// Collects `EnvironmentFacts` by running a small script inside the interpreter.
#[derive(Debug, Clone)]
pub struct InterpreterProbe {
    python: PathBuf,
}

impl InterpreterProbe {
    pub fn new(python: &Path) -> InterpreterProbe {
        InterpreterProbe {
            python: python.to_owned(),
        }
    }

    pub fn facts(&self) -> Result<EnvironmentFacts> {
        context!("probing {}", self.python.display());
        let output = run_python(
            &self.python,
            IDENTIFY_FACTS_SCRIPT,
            &mut Command::new(&self.python),
        )?;
        trace!("raw facts: {}", String::from_utf8_lossy(&output.stdout));
        parse_facts(&output.stdout)
    }
}

pub fn parse_facts(raw: &[u8]) -> Result<EnvironmentFacts> {
    serde_json::from_slice(raw).wrap_err("interpreter reported malformed facts")
}
