//! Languages without a linked grammar.
//!
//! These take part in language detection and in the import graph only.

use crate::grammar::{ImportPattern, LanguageProfile};

static RUBY_IMPORTS: &[ImportPattern] = &[ImportPattern::any(
    r#"^\s*(?:require|require_relative|load)\s*\(?\s*['"]([^'"]+)['"]"#,
)];

static SHELL_IMPORTS: &[ImportPattern] = &[ImportPattern::any(
    r#"^\s*(?:source|\.)\s+['"]?([^\s'";|&]+)"#,
)];

static MAKEFILE_IMPORTS: &[ImportPattern] = &[ImportPattern::any(r"^\s*-?s?include\s+(\S+)")];

static DOCKERFILE_IMPORTS: &[ImportPattern] = &[ImportPattern::any(
    r"(?i)^\s*FROM\s+(?:--platform=\S+\s+)?(\S+)",
)];

static CMAKE_IMPORTS: &[ImportPattern] = &[
    ImportPattern::any(r"(?i)^\s*include\s*\(\s*([^\s)]+)"),
    ImportPattern::any(r"(?i)^\s*add_subdirectory\s*\(\s*([^\s)]+)"),
];

pub fn ruby() -> LanguageProfile {
    LanguageProfile {
        extensions: &["rb", "rake", "gemspec"],
        filenames: &["Rakefile", "Gemfile", "Guardfile"],
        interpreters: &["ruby"],
        import_patterns: RUBY_IMPORTS,
        ..LanguageProfile::base("ruby")
    }
}

pub fn shell() -> LanguageProfile {
    LanguageProfile {
        extensions: &["sh", "bash", "zsh"],
        filenames: &[".bashrc", ".zshrc", ".profile"],
        interpreters: &["sh", "bash", "zsh", "dash", "ksh"],
        import_patterns: SHELL_IMPORTS,
        ..LanguageProfile::base("shell")
    }
}

pub fn makefile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["mk", "mak"],
        filenames: &["Makefile", "makefile", "GNUmakefile"],
        interpreters: &["make"],
        import_patterns: MAKEFILE_IMPORTS,
        ..LanguageProfile::base("makefile")
    }
}

pub fn dockerfile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["dockerfile"],
        filenames: &["Dockerfile", "Containerfile"],
        import_patterns: DOCKERFILE_IMPORTS,
        ..LanguageProfile::base("dockerfile")
    }
}

pub fn cmake() -> LanguageProfile {
    LanguageProfile {
        extensions: &["cmake"],
        filenames: &["CMakeLists.txt"],
        import_patterns: CMAKE_IMPORTS,
        ..LanguageProfile::base("cmake")
    }
}
