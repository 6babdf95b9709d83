/// Work around an annoyance in Rust's standard traits -- if you define
/// TryFrom<&str>, then you probably also want TryFrom<String> and FromStr,
/// and the implementation is trivial in terms of TryFrom<&str>. So this macro
/// just generates the boilerplate for you.
#[macro_export]
macro_rules! try_from_str_boilerplate {
    ($name:ident) => {
        impl std::convert::TryFrom<String> for $name {
            type Error = eyre::Report;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                (&*s).try_into()
            }
        }

        impl std::str::FromStr for $name {
            type Err = eyre::Report;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.try_into()
            }
        }
    };
}

/// Platform strings like "macosx-10.9-x86_64" or "linux-x86_64" become tag
/// fragments like "macosx_10_9_x86_64". Case is left alone.
pub fn normalize_string(s: &str) -> String {
    s.replace(['.', '-', ' '], "_")
}

/// (3, 9) -> "39"
pub fn version_nodot(major: u32, minor: u32) -> String {
    format!("{major}{minor}")
}
