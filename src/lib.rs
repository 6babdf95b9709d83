//! Identify a Python interpreter: its marker environment, and the full ordered list
//! of wheel tags it can install, best first.

pub mod output;
pub mod util;

pub mod abi;
pub mod boot;
pub mod error;
pub mod facts;
pub mod identify;
pub mod platform_tags;
pub mod prelude;
pub mod probe;
pub mod supported_tags;
pub mod vocab;

#[cfg(test)]
mod test_util;

pub use error::IdentifyError;
pub use facts::EnvironmentFacts;
pub use identify::{IdentificationDocument, Resolver};
pub use platform_tags::LinuxRuntimeFacts;
pub use vocab::{Tag, TagSequence};
