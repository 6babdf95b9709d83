use std::io::Write;

use clap::Parser;
use eyre::{bail, Result, WrapErr};
use pexcz_identify::facts::OsFamily;
use pexcz_identify::output::{self, OutputArgs};
use pexcz_identify::platform_tags::GlibcMinorCeilings;
use pexcz_identify::probe::{parse_facts, InterpreterProbe};
use pexcz_identify::{EnvironmentFacts, LinuxRuntimeFacts, Resolver};
use std::path::PathBuf;
use tracing::debug;

/// Work out a Python interpreter's marker environment and every wheel tag it can
/// install, and write them out as JSON.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Where to write the JSON document [default: stdout]
    #[arg(value_name = "OUTPUT_PATH")]
    output_path: Option<PathBuf>,

    /// Probe this interpreter
    #[arg(long, value_name = "PATH", conflicts_with = "facts", required_unless_present = "facts")]
    python: Option<PathBuf>,

    /// Read previously collected facts from this JSON file instead of probing
    #[arg(long, value_name = "FILE")]
    facts: Option<PathBuf>,

    /// C runtime facts, required for Linux interpreters,
    /// e.g. '{"musllinux": {"major": 1, "minor": 2}}'
    #[arg(long, value_name = "JSON")]
    linux_info: Option<LinuxRuntimeFacts>,

    /// The last minor version of an old glibc major (can be repeated)
    #[arg(long = "glibc-ceiling", value_name = "MAJOR=MINOR", value_parser = parse_ceiling)]
    glibc_ceilings: Vec<(i32, i32)>,

    #[command(flatten)]
    output_args: OutputArgs,
}

fn parse_ceiling(value: &str) -> Result<(i32, i32)> {
    let Some((major, minor)) = value.split_once('=') else {
        bail!("expected MAJOR=MINOR, not {value:?}");
    };
    Ok((
        major.trim().parse().wrap_err("bad glibc major version")?,
        minor.trim().parse().wrap_err("bad glibc minor version")?,
    ))
}

fn load_facts(cli: &Cli) -> Result<EnvironmentFacts> {
    if let Some(path) = &cli.facts {
        let raw = std::fs::read(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        return parse_facts(&raw);
    }
    match &cli.python {
        Some(python) => InterpreterProbe::new(python).facts(),
        None => bail!("one of --python or --facts is required"),
    }
}

/// Linux tags depend on which C runtime the interpreter is linked against, and the
/// facts alone can't say (e.g. armhf, or an i686 userland on an x86_64 kernel).
fn linux_runtime_facts(
    linux_info: Option<&LinuxRuntimeFacts>,
    facts: &EnvironmentFacts,
) -> Result<Option<LinuxRuntimeFacts>> {
    match (linux_info, &facts.platform.os_family) {
        (None, OsFamily::Linux) => bail!(
            "--linux-info is required for the Linux interpreter at {}",
            facts.interpreter.path.display()
        ),
        (info, _) => Ok(info.cloned()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    output::init(&cli.output_args)?;

    let facts = load_facts(&cli)?;
    let linux_info = linux_runtime_facts(cli.linux_info.as_ref(), &facts)?;

    let ceilings = cli
        .glibc_ceilings
        .iter()
        .fold(GlibcMinorCeilings::default(), |ceilings, (major, minor)| {
            ceilings.with_ceiling(*major, *minor)
        });
    let resolver = Resolver::new().with_glibc_ceilings(ceilings);
    let document = resolver.resolve_facts(&facts, linux_info.as_ref())?;
    debug!(
        "{} supports {} tags",
        document.path.display(),
        document.supported_tags.len()
    );

    let mut json = serde_json::to_string_pretty(&document)?;
    json.push('\n');
    match &cli.output_path {
        Some(path) => std::fs::write(path, json)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout().lock().write_all(json.as_bytes())?,
    }
    Ok(())
}
