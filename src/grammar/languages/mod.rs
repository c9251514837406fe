//! Built-in language profiles.
//!
//! # Adding a New Language
//!
//! Write a `profile()` function returning a [`LanguageProfile`] with the
//! grammar loader, tag/reference queries and complexity tables, then list it
//! in [`builtin_profiles`]. Languages linked in at runtime go through
//! [`GrammarRegistry::register`](crate::grammar::GrammarRegistry::register).

use super::LanguageProfile;

pub mod c;
pub mod cpp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod plain;
pub mod python;
pub mod rust_lang;
pub mod scala;
pub mod swift;
pub mod typescript;

/// Every language compiled into the binary.
pub fn builtin_profiles() -> Vec<LanguageProfile> {
    vec![
        go::profile(),
        python::profile(),
        rust_lang::profile(),
        javascript::profile(),
        typescript::profile(),
        typescript::tsx_profile(),
        java::profile(),
        c::profile(),
        cpp::profile(),
        scala::profile(),
        swift::profile(),
        plain::ruby(),
        plain::shell(),
        plain::makefile(),
        plain::dockerfile(),
        plain::cmake(),
    ]
}
