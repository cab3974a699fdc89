//! Template language
//!
//! Schema authors write compact templates such as `<text>.jpg` or
//! `[$<#>]<boolean>`; these compile to regular expressions and back.
//!
//! | template      | regex                |
//! |---------------|----------------------|
//! | `.`           | `\.`                 |
//! | `<text>`      | `.*`                 |
//! | `<boolean>`   | `(true\|false)`      |
//! | `<Boolean>`   | `(true\|false\|null)`|
//! | `<imagefile>` | `.*\.jpg`            |
//! | `<#>`         | `(\d)*`              |
//! | `$`           | `\$`                 |
//! | `[X]`         | `(X)?`               |
//!
//! `<imagefile>` only knows the `.jpg` extension. Round trips are only
//! guaranteed for output of the converter itself, not hand-written regexes.
//!
//! The path placeholders pass through untouched and are substituted during
//! verification.

/// Replaced by the document's file name (stem plus extension)
pub const FILE_NAME: &str = "<filename>";
/// Replaced by the document's file stem
pub const FILE_TITLE: &str = "<filetitle>";
/// Replaced by the document's file extension
pub const FILE_EXTENSION: &str = "<fileextension>";

const TO_REGEX: &[(&str, &str)] = &[
    ("<imagefile>", r".*\.jpg"),
    ("<Boolean>", "(true|false|null)"),
    ("<boolean>", "(true|false)"),
    ("<text>", ".*"),
    ("<#>", r"(\d)*"),
    (".", r"\."),
    ("$", r"\$"),
    ("[", "("),
    ("]", ")?"),
];

// Longer regex fragments come first: `.*\.jpg` contains `.*`.
const TO_TEMPLATE: &[(&str, &str)] = &[
    ("(true|false|null)", "<Boolean>"),
    ("(true|false)", "<boolean>"),
    (r".*\.jpg", "<imagefile>"),
    (".*", "<text>"),
    (r"(\d)*", "<#>"),
    (r"\.", "."),
    (r"\$", "$"),
    (")?", "]"),
    ("(", "["),
];

/// Compile a template into a regular expression
pub fn template_to_regex(template: &str) -> String {
    substitute(template, TO_REGEX)
}

/// Turn a converter-produced regular expression back into its template
pub fn regex_to_template(regex: &str) -> String {
    substitute(regex, TO_TEMPLATE)
}

/// Does this pattern still carry a path placeholder?
pub fn has_path_placeholder(pattern: &str) -> bool {
    [FILE_NAME, FILE_TITLE, FILE_EXTENSION]
        .iter()
        .any(|p| pattern.contains(p))
}

/// Replace the path placeholders with the escaped parts of `file_name`
pub fn substitute_path(pattern: &str, file_name: &str) -> String {
    let (title, extension) = match file_name.rsplit_once('.') {
        Some((title, extension)) if !title.is_empty() => (title, extension),
        _ => (file_name, ""),
    };
    pattern
        .replace(FILE_NAME, &regex::escape(file_name))
        .replace(FILE_TITLE, &regex::escape(title))
        .replace(FILE_EXTENSION, &regex::escape(extension))
}

/// Single left-to-right pass; at each position the first matching rule wins.
fn substitute(input: &str, rules: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(input.len() * 2);
    let mut rest = input;
    'scan: while !rest.is_empty() {
        for (from, to) in rules {
            if let Some(after) = rest.strip_prefix(from) {
                output.push_str(to);
                rest = after;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            output.push(c);
        }
        rest = chars.as_str();
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tokens() {
        assert_eq!(template_to_regex("a.b"), r"a\.b");
        assert_eq!(template_to_regex("<text>"), ".*");
        assert_eq!(template_to_regex("<boolean>"), "(true|false)");
        assert_eq!(template_to_regex("<Boolean>"), "(true|false|null)");
        assert_eq!(template_to_regex("<imagefile>"), r".*\.jpg");
        assert_eq!(template_to_regex("<#>"), r"(\d)*");
        assert_eq!(template_to_regex("$"), r"\$");
        assert_eq!(template_to_regex("[x]"), "(x)?");
    }

    #[test]
    fn test_combined_round_trip() {
        let template = "[<imagefile>][$<#>,<#>,<#>,<#>]<boolean><Boolean>";
        let regex = r"(.*\.jpg)?(\$(\d)*,(\d)*,(\d)*,(\d)*)?(true|false)(true|false|null)";

        assert_eq!(template_to_regex(template), regex);
        assert_eq!(regex_to_template(regex), template);
        assert_eq!(template_to_regex(&regex_to_template(regex)), regex);
    }

    #[test]
    fn test_imagefile_restored_before_text() {
        assert_eq!(regex_to_template(r".*\.jpg"), "<imagefile>");
        assert_eq!(regex_to_template(r".*\.png"), "<text>.png");
    }

    #[test]
    fn test_every_token_pair_round_trips() {
        let tokens = ["<text>", "<boolean>", "<Boolean>", "<imagefile>", "<#>", ".", "$", "[a]", "name"];
        for first in tokens {
            for second in tokens {
                let template = format!("{}{}", first, second);
                let regex = template_to_regex(&template);
                assert_eq!(regex_to_template(&regex), template, "template {}", template);
            }
        }
    }

    #[test]
    fn test_placeholders_pass_through() {
        let template = "<filetitle>.<fileextension>";
        let regex = template_to_regex(template);
        assert_eq!(regex, r"<filetitle>\.<fileextension>");
        assert!(has_path_placeholder(&regex));
        assert_eq!(regex_to_template(&regex), template);
    }

    #[test]
    fn test_substitute_path() {
        let regex = template_to_regex("<filetitle>.<fileextension>");
        assert_eq!(substitute_path(&regex, "notes.cfg"), r"notes\.cfg");
        assert_eq!(substitute_path(FILE_NAME, "a.b.c"), r"a\.b\.c");
        assert_eq!(substitute_path(FILE_EXTENSION, "README"), "");
    }
}
