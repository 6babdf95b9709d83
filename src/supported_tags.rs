//! Putting interpreter, ABI and platform tags together into the final ordered list.

use crate::abi::AbiTags;
use crate::prelude::*;

/// The tags for a CPython interpreter:
///
/// - cp<python_version>-<abi>-<platform>
/// - cp<python_version>-abi3-<platform>
/// - cp<python_version>-none-<platform>
/// - cp<less than python_version>-abi3-<platform>  (older versions down to 3.2)
pub fn cpython_tags(
    identity: &InterpreterIdentity,
    abis: &AbiTags,
    platforms: &[String],
    out: &mut TagSequence,
) {
    let (major, minor) = identity.version.major_minor();
    let interpreter = format!("cp{}", version_nodot(major, minor));

    for abi in &abis.abis {
        for platform in platforms {
            out.push(Tag::new(&interpreter, abi, platform));
        }
    }
    if abis.abi3 {
        for platform in platforms {
            out.push(Tag::new(&interpreter, "abi3", platform));
        }
    }
    for platform in platforms {
        out.push(Tag::new(&interpreter, "none", platform));
    }
    if abis.abi3 {
        for older_minor in (2..minor).rev() {
            let interpreter = format!("cp{}", version_nodot(major, older_minor));
            for platform in platforms {
                out.push(Tag::new(&interpreter, "abi3", platform));
            }
        }
    }
}

/// The tags for any other interpreter: <interpreter>-<abi>-<platform>, with "none"
/// added as the last ABI if it wasn't already there.
pub fn generic_tags(
    identity: &InterpreterIdentity,
    abis: &AbiTags,
    platforms: &[String],
    out: &mut TagSequence,
) {
    let interpreter = format!(
        "{}{}",
        identity.name.short_name(),
        identity.interpreter_version()
    );
    let none = "none".to_owned();
    for abi in abis.abis.iter().chain(std::iter::once(&none)) {
        for platform in platforms {
            out.push(Tag::new(&interpreter, abi, platform));
        }
    }
}

/// py39, py3, py38, py37, ..., py30
fn py_interpreter_range(major: u32, minor: u32) -> Vec<String> {
    let mut versions = vec![format!("py{}", version_nodot(major, minor)), format!("py{major}")];
    versions.extend(
        (0..minor)
            .rev()
            .map(|older| format!("py{}", version_nodot(major, older))),
    );
    versions
}

/// The interpreter-agnostic tags that any Python of this version can use:
///
/// - py*-none-<platform>
/// - <short interpreter>-none-any  (if there is one)
/// - py*-none-any
pub fn compatible_tags(
    identity: &InterpreterIdentity,
    platforms: &[String],
    out: &mut TagSequence,
) {
    let (major, minor) = identity.version.major_minor();
    let versions = py_interpreter_range(major, minor);
    for version in &versions {
        for platform in platforms {
            out.push(Tag::new(version, "none", platform));
        }
    }
    if let Some(interpreter) = identity.short_interpreter() {
        out.push(Tag::new(interpreter, "none", "any"));
    }
    for version in &versions {
        out.push(Tag::new(version, "none", "any"));
    }
}

/// Every tag the interpreter supports, best first, without duplicates.
pub fn supported_tags(
    identity: &InterpreterIdentity,
    abis: &AbiTags,
    platforms: &[String],
) -> TagSequence {
    let mut tags = TagSequence::new();
    if identity.is_cpython() {
        cpython_tags(identity, abis, platforms, &mut tags);
    } else {
        generic_tags(identity, abis, platforms, &mut tags);
    }
    compatible_tags(identity, platforms, &mut tags);
    debug!("{} supported tags", tags.len());
    tags
}
