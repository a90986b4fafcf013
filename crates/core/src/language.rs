use std::fmt;
use std::path::Path;

/// File-type index. The discriminant is the compact integer key used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    NonText = 0,
    Text = 1,
    C = 2,
    Java = 3,
    ShellScript = 4,
    Python = 5,
    Perl = 6,
    Php = 7,
    Ruby = 8,
    Yaml = 9,
    Scala = 10,
    Ipynb = 11,
    JavaScript = 12,
    Json = 13,
    Kotlin = 14,
    Xml = 15,
    Gradle = 16,
    Gemfile = 17,
    RequirementsTxt = 18,
    TypeScript = 19,
    Cpp = 20,
    CSharp = 21,
    Vue = 22,
    React = 23,
    Bash = 24,
    Markdown = 25,
    Go = 26,
    Html = 27,
    Css = 28,
    FSharp = 29,
    Regex = 30,
    Conf = 31,
    Svelte = 32,
    Tsx = 33,
    Sql = 34,
    Swift = 35,
    Rust = 36,
    Solidity = 37,
    VisualBasic = 38,
}

const ALL_LANGUAGES: [Language; 39] = [
    Language::NonText,
    Language::Text,
    Language::C,
    Language::Java,
    Language::ShellScript,
    Language::Python,
    Language::Perl,
    Language::Php,
    Language::Ruby,
    Language::Yaml,
    Language::Scala,
    Language::Ipynb,
    Language::JavaScript,
    Language::Json,
    Language::Kotlin,
    Language::Xml,
    Language::Gradle,
    Language::Gemfile,
    Language::RequirementsTxt,
    Language::TypeScript,
    Language::Cpp,
    Language::CSharp,
    Language::Vue,
    Language::React,
    Language::Bash,
    Language::Markdown,
    Language::Go,
    Language::Html,
    Language::Css,
    Language::FSharp,
    Language::Regex,
    Language::Conf,
    Language::Svelte,
    Language::Tsx,
    Language::Sql,
    Language::Swift,
    Language::Rust,
    Language::Solidity,
    Language::VisualBasic,
];

/// Language/file-type identifiers and their canonical extension (no leading dot).
const EXTENSION_SYNONYMS: &[(&str, &str)] = &[
    ("bash", "sh"),
    ("c", "c"),
    ("csharp", "cs"),
    ("cpp", "cpp"),
    ("css", "css"),
    ("elixir", "exs"),
    ("fsharp", "fs"),
    ("gitignore", "gitignore"),
    ("go", "go"),
    ("html", "html"),
    ("ipynb", "ipynb"),
    ("java", "java"),
    ("javascript", "js"),
    ("jsx", "jsx"),
    ("json", "json"),
    ("kotlin", "kt"),
    ("liquid", "liquid"),
    ("markdown", "md"),
    ("cjs", "js"),
    ("mjs", "js"),
    ("perl", "pl"),
    ("php", "php"),
    ("python", "py"),
    ("react", "jsx"),
    ("rust", "rs"),
    ("scala", "scala"),
    ("sh", "sh"),
    ("svelte", "svelte"),
    ("swift", "swift"),
    ("solidity", "sol"),
    ("sql", "sql"),
    ("tsx", "tsx"),
    ("typescript", "ts"),
    ("vue", "vue"),
    ("xml", "xml"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("gradle", "gradle"),
    ("regex", "regex"),
    ("nginx", "conf"),
];

/// File extension (lowercase) to the language whose comment rules apply.
const EXTENSION_LANGUAGES: &[(&str, Language)] = &[
    ("c", Language::C),
    ("h", Language::C),
    ("cpp", Language::C),
    ("java", Language::Java),
    ("cs", Language::Java),
    ("sh", Language::ShellScript),
    ("pl", Language::Perl),
    ("py", Language::Python),
    ("php", Language::Php),
    ("rb", Language::Ruby),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("ts", Language::JavaScript),
    ("vue", Language::JavaScript),
    ("svelte", Language::JavaScript),
    ("scala", Language::Scala),
    ("yaml", Language::Yaml),
    ("yml", Language::Yaml),
    ("ipynb", Language::Ipynb),
    ("json", Language::Json),
    ("kt", Language::Kotlin),
    ("gradle", Language::Gradle),
    ("gemfile", Language::Gemfile),
    ("xml", Language::Xml),
    ("md", Language::Markdown),
    ("go", Language::Go),
    ("css", Language::Css),
    ("html", Language::Html),
    ("fs", Language::FSharp),
    ("regex", Language::Regex),
    ("conf", Language::Conf),
    ("swift", Language::Swift),
    ("rs", Language::Rust),
    ("sql", Language::Sql),
    ("tsx", Language::Tsx),
    ("sol", Language::Solidity),
    ("vb", Language::VisualBasic),
];

const REQUIREMENTS_FILES: &[&str] = &["requirements.txt", "requirement.txt"];

impl Language {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        ALL_LANGUAGES.get(usize::from(index)).copied()
    }

    pub fn all() -> &'static [Language] {
        &ALL_LANGUAGES
    }

    /// Detects the language from a file name. Unknown extensions map to `Text`.
    pub fn from_path(path: &Path) -> Self {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Self::Text;
        };
        let lower = name.to_ascii_lowercase();
        if REQUIREMENTS_FILES.contains(&lower.as_str()) {
            return Self::RequirementsTxt;
        }
        let ext = lower.rsplit('.').next().unwrap_or(lower.as_str());
        EXTENSION_LANGUAGES
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, language)| *language)
            .unwrap_or(Self::Text)
    }

    /// Parses a language identifier as given on the command line
    /// (`python`, `py`, `javascript`, `5`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Ok(index) = key.parse::<u8>() {
            return Self::from_index(index);
        }
        if let Some(language) = ALL_LANGUAGES.iter().find(|l| l.name() == key) {
            return Some(*language);
        }
        let ext = extension_for(&key).unwrap_or(key.trim_start_matches('.'));
        let probe = format!("file.{ext}");
        match Self::from_path(Path::new(&probe)) {
            Self::Text if ext != "txt" => None,
            language => Some(language),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NonText => "nontext",
            Self::Text => "text",
            Self::C => "c",
            Self::Java => "java",
            Self::ShellScript => "shell",
            Self::Python => "python",
            Self::Perl => "perl",
            Self::Php => "php",
            Self::Ruby => "ruby",
            Self::Yaml => "yaml",
            Self::Scala => "scala",
            Self::Ipynb => "ipynb",
            Self::JavaScript => "javascript",
            Self::Json => "json",
            Self::Kotlin => "kotlin",
            Self::Xml => "xml",
            Self::Gradle => "gradle",
            Self::Gemfile => "gemfile",
            Self::RequirementsTxt => "requirements",
            Self::TypeScript => "typescript",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Vue => "vue",
            Self::React => "react",
            Self::Bash => "bash",
            Self::Markdown => "markdown",
            Self::Go => "go",
            Self::Html => "html",
            Self::Css => "css",
            Self::FSharp => "fsharp",
            Self::Regex => "regex",
            Self::Conf => "conf",
            Self::Svelte => "svelte",
            Self::Tsx => "tsx",
            Self::Sql => "sql",
            Self::Swift => "swift",
            Self::Rust => "rust",
            Self::Solidity => "solidity",
            Self::VisualBasic => "vb",
        }
    }

    /// `Text` and `NonText` carry no comment rules and cannot be classified.
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Text | Self::NonText)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical extension for a language identifier, a file name, or a dotted extension.
pub fn extension_for(name: &str) -> Option<&'static str> {
    let mut key = name.trim().to_ascii_lowercase();
    if key.is_empty() {
        return None;
    }
    if !key.starts_with('.')
        && let Some((_, ext)) = key.rsplit_once('.')
    {
        key = ext.to_string();
    }
    let key = key.trim_start_matches('.');
    EXTENSION_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, ext)| *ext)
}

/// How comments look in one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line: &'static [&'static str],
    pub block: &'static [(&'static str, &'static str)],
    /// String delimiters; comment markers inside strings are kept.
    pub quotes: &'static [u8],
    /// Bytes removed outright (brace-only noise in C-like languages).
    pub drop_bytes: &'static [u8],
    pub strip_quote_chars: bool,
    pub notebook: bool,
}

impl CommentSyntax {
    pub const NONE: CommentSyntax = CommentSyntax {
        line: &[],
        block: &[],
        quotes: &[],
        drop_bytes: &[],
        strip_quote_chars: false,
        notebook: false,
    };

    pub fn is_none(&self) -> bool {
        self.line.is_empty()
            && self.block.is_empty()
            && self.drop_bytes.is_empty()
            && !self.strip_quote_chars
            && !self.notebook
    }
}

const C_BLOCK: &[(&str, &str)] = &[("/*", "*/")];
const SLASH_LINE: &[&str] = &["//"];
const HASH_LINE: &[&str] = &["#"];
const BOTH_QUOTES: &[u8] = b"\"'";
const DOUBLE_QUOTE: &[u8] = b"\"";
const BRACES: &[u8] = b"{}";

const C_FAMILY: CommentSyntax = CommentSyntax {
    line: SLASH_LINE,
    block: C_BLOCK,
    quotes: BOTH_QUOTES,
    drop_bytes: &[],
    strip_quote_chars: false,
    notebook: false,
};

const BRACE_C_FAMILY: CommentSyntax = CommentSyntax {
    drop_bytes: BRACES,
    ..C_FAMILY
};

const PYTHON: CommentSyntax = CommentSyntax {
    line: HASH_LINE,
    block: &[("\"\"\"", "\"\"\""), ("'''", "'''")],
    quotes: BOTH_QUOTES,
    drop_bytes: &[],
    strip_quote_chars: false,
    notebook: false,
};

const SHELL: CommentSyntax = CommentSyntax {
    line: HASH_LINE,
    block: &[],
    quotes: BOTH_QUOTES,
    drop_bytes: &[],
    strip_quote_chars: false,
    notebook: false,
};

const MARKUP: CommentSyntax = CommentSyntax {
    line: &[],
    block: &[("<!--", "-->")],
    quotes: &[],
    drop_bytes: &[],
    strip_quote_chars: false,
    notebook: false,
};

/// Comment rules for `language`. Languages without rules strip nothing.
pub fn comment_syntax(language: Language) -> CommentSyntax {
    match language {
        Language::C
        | Language::Java
        | Language::Scala
        | Language::Kotlin
        | Language::Gradle
        | Language::Cpp
        | Language::CSharp
        | Language::Go
        | Language::Css
        | Language::Swift
        | Language::Solidity
        | Language::FSharp => C_FAMILY,
        Language::JavaScript
        | Language::TypeScript
        | Language::Vue
        | Language::React
        | Language::Svelte
        | Language::Tsx => BRACE_C_FAMILY,
        Language::Rust => CommentSyntax {
            quotes: DOUBLE_QUOTE,
            ..C_FAMILY
        },
        Language::Perl => CommentSyntax {
            drop_bytes: BRACES,
            ..SHELL
        },
        Language::Php => CommentSyntax {
            line: &["#", "//"],
            block: C_BLOCK,
            quotes: BOTH_QUOTES,
            drop_bytes: BRACES,
            strip_quote_chars: false,
            notebook: false,
        },
        Language::Python | Language::Conf | Language::RequirementsTxt => PYTHON,
        Language::Ipynb => CommentSyntax {
            notebook: true,
            ..PYTHON
        },
        Language::ShellScript | Language::Bash => SHELL,
        Language::Ruby | Language::Gemfile => CommentSyntax {
            block: &[("=begin", "=end")],
            ..SHELL
        },
        Language::Yaml => CommentSyntax {
            quotes: DOUBLE_QUOTE,
            strip_quote_chars: true,
            ..SHELL
        },
        Language::Sql => CommentSyntax {
            line: &["--"],
            block: C_BLOCK,
            quotes: b"'",
            drop_bytes: &[],
            strip_quote_chars: false,
            notebook: false,
        },
        Language::VisualBasic => CommentSyntax {
            line: &["'"],
            block: &[],
            quotes: DOUBLE_QUOTE,
            drop_bytes: &[],
            strip_quote_chars: false,
            notebook: false,
        },
        Language::Xml | Language::Markdown | Language::Html => MARKUP,
        Language::Json | Language::Regex | Language::Text | Language::NonText => {
            CommentSyntax::NONE
        }
    }
}
