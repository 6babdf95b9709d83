//! Resolving an environment into its identification document.

use crate::abi::AbiTags;
use crate::facts::{EnvironmentFacts, InterpreterFacts, PlatformFacts};
use crate::platform_tags::{
    platform_tags, GlibcMinorCeilings, LinuxContext, LinuxRuntimeFacts, ManylinuxPolicy,
    NoManylinuxPolicy, PlatformContext,
};
use crate::prelude::*;
use crate::probe::{MacVersionProbe, SubprocessMacVersionProbe};
use crate::supported_tags::supported_tags;

/// The JSON document describing an interpreter. Field names are a stable external
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationDocument {
    pub path: PathBuf,
    pub realpath: PathBuf,
    pub prefix: PathBuf,
    pub base_prefix: Option<PathBuf>,
    pub version: PythonVersion,
    pub marker_env: MarkerEnvironment,
    pub macos_framework_build: bool,
    pub supported_tags: Vec<String>,
}

/// https://packaging.python.org/en/latest/specifications/dependency-specifiers/#environment-markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerEnvironment {
    pub os_name: String,
    pub sys_platform: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub python_version: String,
    pub python_full_version: String,
    pub implementation_name: String,
    pub implementation_version: String,
}

fn implementation_version(version: Option<&PythonVersion>) -> String {
    match version {
        None => "0".into(),
        Some(v) => {
            let mut s = format!("{}.{}.{}", v.major, v.minor, v.micro);
            if v.releaselevel != ReleaseLevel::Final {
                // "alpha" -> "a1", "candidate" -> "c1"
                s.push_str(&v.releaselevel.as_str()[..1]);
                s.push_str(&v.serial.to_string());
            }
            s
        }
    }
}

impl MarkerEnvironment {
    pub fn new(interpreter: &InterpreterFacts) -> MarkerEnvironment {
        let marker = &interpreter.marker;
        let version = &interpreter.version;
        let (implementation_name, implementation_version) =
            match &interpreter.implementation_version {
                Some(v) => (
                    interpreter.implementation_name.clone(),
                    implementation_version(Some(v)),
                ),
                None => (String::new(), implementation_version(None)),
            };
        MarkerEnvironment {
            os_name: marker.os_name.clone(),
            sys_platform: marker.sys_platform.clone(),
            platform_machine: marker.platform_machine.clone(),
            platform_python_implementation: marker.platform_python_implementation.clone(),
            platform_release: marker.platform_release.clone(),
            platform_system: marker.platform_system.clone(),
            platform_version: marker.platform_version.clone(),
            python_version: format!("{}.{}", version.major, version.minor),
            python_full_version: version.full_version(),
            implementation_name,
            implementation_version,
        }
    }
}

/// Resolves facts into supported tags and identification documents.
///
/// The defaults do what you want for a live interpreter; the `with_*` methods swap
/// in other collaborators (mostly useful for tests and cross-resolution).
pub struct Resolver {
    mac_version_probe: Option<Box<dyn MacVersionProbe>>,
    manylinux_policy: Option<Box<dyn ManylinuxPolicy>>,
    glibc_ceilings: GlibcMinorCeilings,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new()
    }
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            mac_version_probe: None,
            manylinux_policy: None,
            glibc_ceilings: GlibcMinorCeilings::default(),
        }
    }

    /// By default the interpreter being identified is re-run to find the true macOS
    /// version.
    pub fn with_mac_version_probe<P: MacVersionProbe + 'static>(mut self, probe: P) -> Self {
        self.mac_version_probe = Some(Box::new(probe));
        self
    }

    /// By default, whatever the `_manylinux` module captured in the platform facts
    /// says (if there was one).
    pub fn with_manylinux_policy<P: ManylinuxPolicy + 'static>(mut self, policy: P) -> Self {
        self.manylinux_policy = Some(Box::new(policy));
        self
    }

    pub fn with_glibc_ceilings(mut self, ceilings: GlibcMinorCeilings) -> Self {
        self.glibc_ceilings = ceilings;
        self
    }

    pub fn supported_tags(
        &self,
        interpreter: &InterpreterFacts,
        platform: &PlatformFacts,
        linux: Option<&LinuxRuntimeFacts>,
    ) -> Result<TagSequence> {
        context!("resolving tags for {}", interpreter.path.display());
        platform.machine()?;
        let identity = interpreter.identity();
        debug!(
            "{} {} on {}",
            interpreter.implementation_name,
            identity.version.full_version(),
            platform.os_family
        );

        let subprocess_probe;
        let mac_version_probe: &dyn MacVersionProbe = match &self.mac_version_probe {
            Some(probe) => probe.as_ref(),
            None => {
                subprocess_probe = SubprocessMacVersionProbe::new(&interpreter.path);
                &subprocess_probe
            }
        };
        let policy: &dyn ManylinuxPolicy =
            match (&self.manylinux_policy, &platform.manylinux_module) {
                (Some(policy), _) => policy.as_ref(),
                (None, Some(module)) => module,
                (None, None) => &NoManylinuxPolicy,
            };
        let ctx = PlatformContext {
            linux: linux.map(|runtime| LinuxContext {
                runtime,
                policy,
                ceilings: &self.glibc_ceilings,
            }),
            mac_version_probe,
        };

        let platforms = platform_tags(platform, &ctx)?;
        let abis = AbiTags::for_interpreter(&identity, &interpreter.config, &platform.os_family)?;
        debug!("ABIs {:?} (abi3: {})", abis.abis, abis.abi3);
        Ok(supported_tags(&identity, &abis, &platforms))
    }

    pub fn resolve(
        &self,
        interpreter: &InterpreterFacts,
        platform: &PlatformFacts,
        linux: Option<&LinuxRuntimeFacts>,
    ) -> Result<IdentificationDocument> {
        let tags = self.supported_tags(interpreter, platform, linux)?;
        Ok(IdentificationDocument {
            path: interpreter.path.clone(),
            realpath: interpreter.realpath.clone(),
            prefix: interpreter.prefix.clone(),
            base_prefix: interpreter.base_prefix.clone(),
            version: interpreter.version.clone(),
            marker_env: MarkerEnvironment::new(interpreter),
            macos_framework_build: interpreter
                .config
                .python_framework
                .as_deref()
                .map_or(false, |framework| !framework.is_empty()),
            supported_tags: tags.to_strings(),
        })
    }

    pub fn resolve_facts(
        &self,
        facts: &EnvironmentFacts,
        linux: Option<&LinuxRuntimeFacts>,
    ) -> Result<IdentificationDocument> {
        self.resolve(&facts.interpreter, &facts.platform, linux)
    }
}
