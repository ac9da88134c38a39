//! Splitting of command lines into argument vectors and pipeline stages.
//!
//! There is no quoting: a `|` anywhere in a line separates pipeline stages, even
//! inside what looks like a literal argument.

use crate::env::Environment;

/// Leading character of a variable reference.
pub const SIGIL: char = '$';

/// Pipeline stage separator.
pub const PIPE: char = '|';

const SEPARATORS: &[char] = &[' ', '\t', '\n'];

/// Split `line` into arguments and substitute variable references.
///
/// A line holding only whitespace yields an empty vector.
pub fn parse_command(line: &str, env: &Environment) -> Vec<String> {
    let mut argv = split_words(line);
    substitute(&mut argv, env);
    argv
}

/// Split `line` on whitespace, dropping empty tokens.
pub fn split_words(line: &str) -> Vec<String> {
    line.split(SEPARATORS)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace every `$name` token with the value bound to `name`.
///
/// Exported variables shadow locals. Tokens naming an unbound variable are
/// removed and the following tokens shift left. Substituted values are not
/// scanned again.
pub fn substitute(argv: &mut Vec<String>, env: &Environment) {
    let mut i = 0;
    while i < argv.len() {
        let Some(name) = argv[i].strip_prefix(SIGIL) else {
            i += 1;
            continue;
        };
        match env.lookup(name) {
            Some(value) => {
                tracing::trace!(name, value, "substituted variable");
                argv[i] = value.to_string();
                i += 1;
            }
            None => {
                tracing::trace!(name, "dropped unbound variable");
                argv.remove(i);
            }
        }
    }
}

/// Split a pipeline into raw stage strings, dropping empty segments.
pub fn parse_pipeline_stages(line: &str) -> Vec<&str> {
    line.split(PIPE).filter(|stage| !stage.is_empty()).collect()
}

/// True iff the line contains a pipe character anywhere.
pub fn is_pipeline(line: &str) -> bool {
    line.contains(PIPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn env() -> Environment {
        Environment::empty(&Config::default())
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert!(parse_command("", &env()).is_empty());
        assert!(parse_command("  \t \n", &env()).is_empty());
    }

    #[test]
    fn test_split_drops_empty_tokens() {
        let argv = parse_command("  ls\t -la   /tmp\n", &env());
        assert_eq!(argv, vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn test_exported_shadows_local() {
        let mut env = env();
        env.set_var("FOO", "env1");
        env.locals.set("FOO", "local1").unwrap();

        assert_eq!(parse_command("echo $FOO\n", &env), vec!["echo", "env1"]);
    }

    #[test]
    fn test_local_substitution() {
        let mut env = env();
        env.locals.set("BAR", "local2").unwrap();

        assert_eq!(parse_command("echo $BAR", &env), vec!["echo", "local2"]);
    }

    #[test]
    fn test_unbound_token_removed() {
        let mut env = env();
        env.locals.set("X", "x").unwrap();

        let argv = parse_command("echo a $BAZ $BAZ $X b", &env);
        assert_eq!(argv, vec!["echo", "a", "x", "b"]);
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        let mut env = env();
        env.locals.set("A", "$B").unwrap();
        env.locals.set("B", "nested").unwrap();

        assert_eq!(parse_command("echo $A", &env), vec!["echo", "$B"]);
    }

    #[test]
    fn test_sigil_only_inside_token_is_literal() {
        let mut env = env();
        env.locals.set("X", "1").unwrap();

        assert_eq!(parse_command("echo a$X", &env), vec!["echo", "a$X"]);
    }

    #[test]
    fn test_pipeline_stages() {
        assert!(is_pipeline("ls | wc"));
        assert!(!is_pipeline("ls -l"));

        let stages = parse_pipeline_stages("echo hello | tr a-z A-Z||wc\n");
        assert_eq!(stages, vec!["echo hello ", " tr a-z A-Z", "wc\n"]);
    }
}
