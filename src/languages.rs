//! Supported languages, their runner images, and their language standards.

use std::fmt;

/// A language this engine can compile and execute submissions for.
///
/// `Python` carries an optional version tag (e.g. `Some("3.11")` for the
/// `python-3.11` wire tag) so a deployment can pin multiple Python runner
/// images side by side; `None` means "whatever the default Python image is".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    /// C, compiled with the standard given in the submission's config.
    C,
    /// C++, compiled with the standard given in the submission's config.
    Cpp,
    /// Python, interpreted directly (no compile stage).
    Python(Option<String>),
}

impl Language {
    /// Parse a language tag as accepted in a [`crate::submission::Submission`],
    /// e.g. `"c"`, `"cpp"`, `"python"`, or `"python-3.11"`.
    pub fn parse(tag: &str) -> Option<Self> {
        let lower = tag.to_ascii_lowercase();
        match lower.as_str() {
            "c" => Some(Language::C),
            "cpp" | "c++" => Some(Language::Cpp),
            "python" | "py" => Some(Language::Python(None)),
            _ => lower
                .strip_prefix("python-")
                .filter(|v| !v.is_empty())
                .map(|v| Language::Python(Some(v.to_string()))),
        }
    }

    /// Whether submissions in this language go through a compile stage.
    pub fn is_compiled(&self) -> bool {
        matches!(self, Language::C | Language::Cpp)
    }

    /// The filename user code is staged under inside the sandbox.
    pub fn source_filename(&self) -> &'static str {
        match self {
            Language::C => "user.c",
            Language::Cpp => "user.cpp",
            Language::Python(_) => "user.py",
        }
    }

    /// The runner image identifier for this language.
    ///
    /// Image names are opaque to the engine and configurable via
    /// [`crate::sandbox::config::LanguageImages`]; this is only the
    /// built-in default for the bare (version-unpinned) image.
    pub fn default_image(&self) -> &'static str {
        match self {
            Language::C => "tsukisama9292/judger-runner:c",
            Language::Cpp => "tsukisama9292/judger-runner:c_plus_plus",
            Language::Python(_) => "tsukisama9292/judger-runner:python",
        }
    }

    /// The set of language standards this language's runner advertises.
    pub fn standards(&self) -> &'static [&'static str] {
        match self {
            Language::C => &["c89", "c99", "c11", "c17", "c23"],
            Language::Cpp => &[
                "cpp98", "cpp03", "cpp11", "cpp14", "cpp17", "cpp20", "cpp23",
            ],
            Language::Python(_) => &[],
        }
    }

    /// The default language standard used when a submission doesn't specify one.
    pub fn default_standard(&self) -> Option<&'static str> {
        match self {
            Language::C => Some("c11"),
            Language::Cpp => Some("cpp17"),
            Language::Python(_) => None,
        }
    }

    /// Check whether `standard` is one this language's runner advertises.
    pub fn supports_standard(&self, standard: &str) -> bool {
        self.standards().iter().any(|s| *s == standard)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::C => f.write_str("c"),
            Language::Cpp => f.write_str("cpp"),
            Language::Python(None) => f.write_str("python"),
            Language::Python(Some(version)) => write!(f, "python-{version}"),
        }
    }
}
