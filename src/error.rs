use thiserror::Error;

/// The ways resolving an environment can fail outright. Anything else that goes
/// wrong is reported as a plain `eyre::Report`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifyError {
    #[error("unsupported OS: {os:?}")]
    UnsupportedOs { os: String },
    #[error("unsupported chip architecture: {arch:?}")]
    UnsupportedArch { arch: String },
    #[error("invalid extension module suffix (sysconfig EXT_SUFFIX): {suffix:?}")]
    MalformedAbiSuffix { suffix: String },
    #[error("could not determine OS version: {detail}")]
    VersionProbeFailure { detail: String },
}
