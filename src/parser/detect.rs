//! Shebang sniffing for files without a recognised extension.

/// Read the interpreter named by a `#!` first line.
///
/// Handles `#!/path/interp args` and `#!/usr/bin/env [-S] [VAR=x] interp args`.
/// The returned name keeps any version suffix (e.g. `python3.11`).
pub fn detect_shebang(content: &[u8]) -> Option<String> {
    let first_line = content.split(|&b| b == b'\n').next()?;
    let line = std::str::from_utf8(first_line).ok()?.trim_end_matches('\r');
    let rest = line.strip_prefix("#!")?.trim();

    let mut parts = rest.split_whitespace();
    let program = basename(parts.next()?);

    let interpreter = if program == "env" {
        basename(parts.find(|p| !p.starts_with('-') && !p.contains('='))?)
    } else {
        program
    };

    if interpreter.is_empty() {
        None
    } else {
        Some(interpreter.to_string())
    }
}

/// Candidate interpreter names, most specific first.
///
/// Trailing version digits are stripped one run at a time:
/// `python3.11` yields `python3.11`, `python3`, `python`.
pub fn interpreter_candidates(interpreter: &str) -> Vec<String> {
    let mut candidates = vec![interpreter.to_string()];
    let mut current = interpreter;

    loop {
        let without_digits = current.trim_end_matches(|c: char| c.is_ascii_digit());
        if without_digits.len() == current.len() {
            break;
        }
        let next = without_digits.trim_end_matches(['.', '-']);
        if next.is_empty() {
            break;
        }
        candidates.push(next.to_string());
        current = next;
    }

    candidates
}

fn basename(program: &str) -> &str {
    program.rsplit('/').next().unwrap_or(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_interpreter() {
        assert_eq!(detect_shebang(b"#!/bin/bash\necho hi\n"), Some("bash".to_string()));
        assert_eq!(detect_shebang(b"#!/usr/local/bin/ruby -w\n"), Some("ruby".to_string()));
    }

    #[test]
    fn test_env_interpreter() {
        assert_eq!(
            detect_shebang(b"#!/usr/bin/env python3\nprint(1)\n"),
            Some("python3".to_string())
        );
        assert_eq!(
            detect_shebang(b"#!/usr/bin/env -S node --experimental-modules\n"),
            Some("node".to_string())
        );
        assert_eq!(
            detect_shebang(b"#!/usr/bin/env LANG=C bash\r\n"),
            Some("bash".to_string())
        );
    }

    #[test]
    fn test_no_shebang() {
        assert_eq!(detect_shebang(b"print('hello')\n"), None);
        assert_eq!(detect_shebang(b""), None);
        assert_eq!(detect_shebang(b"#!\n"), None);
        assert_eq!(detect_shebang(b"#!/usr/bin/env\n"), None);
    }

    #[test]
    fn test_version_stripping() {
        assert_eq!(
            interpreter_candidates("python3.11"),
            vec!["python3.11", "python3", "python"]
        );
        assert_eq!(interpreter_candidates("python3"), vec!["python3", "python"]);
        assert_eq!(interpreter_candidates("bash"), vec!["bash"]);
        assert_eq!(interpreter_candidates("42"), vec!["42"]);
    }
}
