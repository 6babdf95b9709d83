mod interpreter;
mod tag;

// All this stuff is also re-exported from crate::prelude::*

pub use self::interpreter::{
    InterpreterIdentity, InterpreterName, PythonVersion, ReleaseLevel,
};
pub use self::tag::{Tag, TagSequence};
