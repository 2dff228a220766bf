//! Command validation against the security policy
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. Command name against the command allow-list
//! 2. Each argument, left to right:
//!    - flags (leading `-`) against the flag allow-list, never path-resolved
//!    - path-like arguments through the path guard, replaced by their
//!      canonical form
//!    - anything else passes through untouched

use crate::errors::SecurityError;
use crate::policy::SecurityPolicy;
use crate::tools::security::PathGuard;
use crate::tools::types::{ParsedCommand, ValidatedCommand};
use std::path::Path;

/// Whether an argument is treated as a path
///
/// Contains a `/` or `\`, is absolute for the host OS, or is exactly `.`.
/// A bare `..` or `file.txt` is not path-like.
pub fn is_path_like(argument: &str) -> bool {
    argument.contains('/')
        || argument.contains('\\')
        || Path::new(argument).is_absolute()
        || argument == "."
}

/// Validate a parsed command, producing the argv to execute
pub fn validate(
    parsed: &ParsedCommand,
    policy: &SecurityPolicy,
    guard: &PathGuard,
) -> Result<ValidatedCommand, SecurityError> {
    if !policy.allowed_commands.permits(&parsed.command) {
        return Err(SecurityError::CommandNotAllowed(parsed.command.clone()));
    }

    let arguments = parsed
        .arguments
        .iter()
        .map(|argument| validate_argument(argument, policy, guard))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedCommand::new(parsed.command.clone(), arguments))
}

fn validate_argument(
    argument: &str,
    policy: &SecurityPolicy,
    guard: &PathGuard,
) -> Result<String, SecurityError> {
    if argument.starts_with('-') {
        if !policy.allowed_flags.permits(argument) {
            return Err(SecurityError::FlagNotAllowed(argument.to_string()));
        }
        return Ok(argument.to_string());
    }

    if is_path_like(argument) {
        let canonical = guard.resolve(argument)?;
        return Ok(canonical.to_string_lossy().into_owned());
    }

    Ok(argument.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AllowList;
    use crate::tools::parser::parse;
    use quickcheck_macros::quickcheck;
    use std::fs;

    fn sandbox() -> (PathGuard, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "notes").unwrap();
        let guard = PathGuard::new(temp_dir.path()).unwrap();
        (guard, temp_dir)
    }

    fn ls_policy() -> SecurityPolicy {
        SecurityPolicy::new(AllowList::parse("ls,cat,grep"), AllowList::parse("-l,-a"))
    }

    fn check(raw: &str, policy: &SecurityPolicy, guard: &PathGuard) -> Result<ValidatedCommand, SecurityError> {
        validate(&parse(raw).unwrap(), policy, guard)
    }

    #[test]
    fn test_path_like_heuristic() {
        assert!(is_path_like("./docs"));
        assert!(is_path_like("docs/"));
        assert!(is_path_like("/etc/passwd"));
        assert!(is_path_like(r"dir\file"));
        assert!(is_path_like("."));

        assert!(!is_path_like(".."));
        assert!(!is_path_like("notes.txt"));
        assert!(!is_path_like("keyword"));
    }

    #[test]
    fn test_listing_scenario() {
        let (guard, _temp) = sandbox();
        let validated = check("ls -l ./docs", &ls_policy(), &guard).unwrap();

        let expected_docs = guard.root().join("docs").to_string_lossy().into_owned();
        assert_eq!(validated.argv(), vec!["ls".to_string(), "-l".to_string(), expected_docs]);
    }

    #[test]
    fn test_command_not_allowed() {
        let (guard, _temp) = sandbox();
        let result = check("rm notes.txt", &ls_policy(), &guard);
        assert_eq!(result, Err(SecurityError::CommandNotAllowed("rm".to_string())));
    }

    #[test]
    fn test_unrestricted_commands_pass_name_check() {
        let (guard, _temp) = sandbox();
        let policy = SecurityPolicy::new(AllowList::Unrestricted, AllowList::parse("-l"));
        assert!(check("anything-at-all", &policy, &guard).is_ok());
    }

    #[test]
    fn test_flag_not_allowed() {
        let (guard, _temp) = sandbox();
        let result = check("ls -rf", &ls_policy(), &guard);
        assert_eq!(result, Err(SecurityError::FlagNotAllowed("-rf".to_string())));
    }

    #[test]
    fn test_flags_are_never_path_resolved() {
        let (guard, _temp) = sandbox();
        let policy = SecurityPolicy::new(AllowList::parse("ls"), AllowList::Unrestricted);

        let validated = check("ls --color=/nonexistent/path", &policy, &guard).unwrap();
        assert_eq!(validated.arguments(), &["--color=/nonexistent/path".to_string()]);
    }

    #[test]
    fn test_parent_escape_rejected() {
        let (guard, _temp) = sandbox();
        let result = check("cat ../", &ls_policy(), &guard);
        assert!(matches!(result, Err(SecurityError::PathEscape { .. })));
    }

    #[test]
    fn test_absolute_escape_rejected() {
        let (guard, _temp) = sandbox();
        let result = check("cat /", &ls_policy(), &guard);
        assert!(matches!(result, Err(SecurityError::PathEscape { .. })));
    }

    #[test]
    fn test_missing_path_is_invalid() {
        let (guard, _temp) = sandbox();
        let result = check("cat ./missing.txt", &ls_policy(), &guard);
        assert!(matches!(result, Err(SecurityError::InvalidPath { .. })));
    }

    #[test]
    fn test_command_check_precedes_argument_checks() {
        let (guard, _temp) = sandbox();
        let result = check("rm -rf ../", &ls_policy(), &guard);
        assert!(matches!(result, Err(SecurityError::CommandNotAllowed(_))));
    }

    #[test]
    fn test_first_failing_argument_wins() {
        let (guard, _temp) = sandbox();
        let result = check("ls ../ -z", &ls_policy(), &guard);
        assert!(matches!(result, Err(SecurityError::PathEscape { .. })));

        let result = check("ls -z ../", &ls_policy(), &guard);
        assert!(matches!(result, Err(SecurityError::FlagNotAllowed(_))));
    }

    #[test]
    fn test_dot_resolves_to_root() {
        let (guard, _temp) = sandbox();
        let validated = check("ls .", &ls_policy(), &guard).unwrap();
        assert_eq!(
            validated.arguments(),
            &[guard.root().to_string_lossy().into_owned()]
        );
    }

    #[test]
    fn test_plain_values_pass_through_in_order() {
        let (guard, _temp) = sandbox();
        let validated = check("grep keyword notes.txt -l", &ls_policy(), &guard).unwrap();
        assert_eq!(validated.arguments(), &["keyword", "notes.txt", "-l"]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let (guard, _temp) = sandbox();
        let policy = ls_policy();

        let first = check("ls -a ./docs .", &policy, &guard);
        let second = check("ls -a ./docs .", &policy, &guard);
        assert_eq!(first, second);

        let first = check("cat ../", &policy, &guard);
        let second = check("cat ../", &policy, &guard);
        assert_eq!(first, second);
    }

    #[quickcheck]
    fn prop_plain_arguments_unchanged(words: Vec<String>) -> bool {
        let (guard, _temp) = sandbox();
        let policy = SecurityPolicy::new(AllowList::parse("grep"), AllowList::parse("-l"));

        let arguments: Vec<String> = words
            .into_iter()
            .map(|w| w.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
            .filter(|w| !w.is_empty())
            .collect();
        let parsed = ParsedCommand::new("grep", arguments.clone());

        match validate(&parsed, &policy, &guard) {
            Ok(validated) => validated.arguments() == arguments.as_slice(),
            Err(_) => false,
        }
    }
}
