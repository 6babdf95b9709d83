use crate::prelude::*;
use indexmap::IndexSet;

/// One `interpreter-abi-platform` triple, e.g. `cp39-cp39-manylinux_2_17_x86_64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct Tag {
    pub interpreter: String,
    pub abi: String,
    pub platform: String,
}

impl Tag {
    pub fn new<I, A, P>(interpreter: I, abi: A, platform: P) -> Tag
    where
        I: Into<String>,
        A: Into<String>,
        P: Into<String>,
    {
        Tag {
            interpreter: interpreter.into(),
            abi: abi.into(),
            platform: platform.into(),
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.interpreter, self.abi, self.platform)
    }
}

impl TryFrom<&str> for Tag {
    type Error = eyre::Report;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pieces: Vec<&str> = value.split('-').collect();
        match pieces.as_slice() {
            [interpreter, abi, platform]
                if !interpreter.is_empty() && !abi.is_empty() && !platform.is_empty() =>
            {
                Ok(Tag::new(*interpreter, *abi, *platform))
            }
            _ => bail!("expected a tag like 'py3-none-any', not {:?}", value),
        }
    }
}

try_from_str_boilerplate!(Tag);

/// Tags in priority order (best match first), each at most once.
///
/// Pushing a tag that's already present is a no-op: the first occurrence keeps its
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSequence {
    tags: IndexSet<Tag>,
}

impl TagSequence {
    pub fn new() -> TagSequence {
        Default::default()
    }

    /// Returns false if the tag was already in the sequence.
    pub fn push(&mut self, tag: Tag) -> bool {
        self.tags.insert(tag)
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, Tag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|t| t.to_string()).collect()
    }
}
