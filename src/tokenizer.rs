//! Delimiter-set splitting used for arguments, pipelines and redirections.

/// Characters treated as whitespace when tokenizing a pipeline stage.
pub const WHITESPACES: &str = " \t";

/// Splits `text` at every run of characters contained in `delimiters`.
///
/// Each fragment is trimmed of [`WHITESPACES`]; fragments that end up empty are
/// dropped, so leading, trailing and adjacent delimiters never produce empty tokens.
///
/// ```
/// use pipesh::tokenizer::split;
/// assert_eq!(split("ls -l | wc", "|"), vec!["ls -l", "wc"]);
/// assert!(split("", " ").is_empty());
/// ```
pub fn split(text: &str, delimiters: &str) -> Vec<String> {
    text.split(|c: char| delimiters.contains(c))
        .map(trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Splits a stage into its command name and arguments.
pub fn split_whitespace(text: &str) -> Vec<String> {
    split(text, WHITESPACES)
}

/// Strips [`WHITESPACES`] from both ends of `text`.
pub fn trim(text: &str) -> &str {
    text.trim_matches(|c: char| WHITESPACES.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(split("", " ").is_empty());
        assert!(split("", "|").is_empty());
        assert!(split_whitespace("").is_empty());
    }

    #[test]
    fn surrounding_and_repeated_delimiters_are_dropped() {
        assert_eq!(split("  a  b ", " "), vec!["a", "b"]);
        assert_eq!(split("a|b||c", "|"), vec!["a", "b", "c"]);
        assert_eq!(split("|a|", "|"), vec!["a"]);
    }

    #[test]
    fn fragments_are_trimmed() {
        assert_eq!(
            split("echo hi |  tail -n 1\t", "|"),
            vec!["echo hi", "tail -n 1"]
        );
    }

    #[test]
    fn whitespace_only_fragments_vanish() {
        assert_eq!(split("a |   | b", "|"), vec!["a", "b"]);
        assert!(split(" \t ", "|").is_empty());
    }

    #[test]
    fn splitting_a_trimmed_token_is_idempotent() {
        let once = split("token", " ");
        assert_eq!(once, vec!["token"]);
        assert_eq!(split(&once[0], " "), once);
    }

    #[test]
    fn any_delimiter_from_the_set_splits() {
        assert_eq!(split_whitespace("tail\t-n 2\t\tfile"), vec!["tail", "-n", "2", "file"]);
        assert_eq!(split("a>b|c", "|>"), vec!["a", "b", "c"]);
    }
}
