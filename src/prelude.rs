pub use std::collections::{BTreeMap, HashMap};
pub use std::convert::{TryFrom, TryInto};
pub use std::fmt::Display;
pub use std::path::{Path, PathBuf};
pub use std::str::FromStr;

pub use eyre::{bail, eyre, Result, WrapErr};
pub use once_cell::sync::Lazy;
pub use regex::Regex;
pub use serde::{Deserialize, Serialize};
pub use serde_with::{DeserializeFromStr, SerializeDisplay};
pub use tracing::{debug, trace, warn};

pub use crate::context;
pub use crate::error::IdentifyError;
pub use crate::try_from_str_boilerplate;
pub use crate::util::{normalize_string, version_nodot};
pub use crate::vocab::*;
