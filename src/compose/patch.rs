use regex::Regex;
use std::sync::LazyLock;

static COMMENT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)# Enabled the\b.*$").expect("valid regex"));

/// `- 'TMOD_ENABLEDMODS=1,2'` inside an `environment:` list. The last group
/// is trailing whitespace and an optional comment.
static LIST_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*-\s+)(['"]?)TMOD_ENABLEDMODS=[^'"\s]*(['"]?)(\s*|\s+#.*)$"#)
        .expect("valid regex")
});

/// `TMOD_ENABLEDMODS: 1,2` inside an `environment:` mapping.
static MAP_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)TMOD_ENABLEDMODS:(\s*)((?:[^\s#].*?)?)(\s*|\s+#.*)$").expect("valid regex")
});

/// Result of [`patch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub text: String,
    /// Comment marker lines rewritten.
    pub comment_lines: usize,
    /// `TMOD_ENABLEDMODS` lines rewritten.
    pub assignment_lines: usize,
}

impl Patched {
    pub fn is_identical_to(&self, original: &str) -> bool {
        self.text == original
    }
}

/// Rewrite the managed lines of a compose document.
///
/// `# Enabled the ...` comments get the enabled mod names and
/// `TMOD_ENABLEDMODS` assignments get the Workshop ids. Every other byte,
/// including indentation, quoting and line terminators, is kept.
pub fn patch(document: &str, enabled_local_names: &[String], enabled_external_ids: &[String]) -> Patched {
    let names = enabled_local_names.join(", ");
    let ids = enabled_external_ids.join(",");

    let mut text = String::with_capacity(document.len());
    let mut comment_lines = 0;
    let mut assignment_lines = 0;

    for line in document.split_inclusive('\n') {
        let (content, terminator) = split_terminator(line);

        if let Some(caps) = COMMENT_MARKER.captures(content) {
            comment_lines += 1;
            text.push_str(&caps[1]);
            text.push_str("# Enabled the");
            if !names.is_empty() {
                text.push(' ');
                text.push_str(&names);
            }
        } else if let Some(caps) = LIST_ASSIGNMENT.captures(content) {
            assignment_lines += 1;
            text.push_str(&format!(
                "{}{}TMOD_ENABLEDMODS={}{}{}",
                &caps[1], &caps[2], ids, &caps[3], &caps[4]
            ));
        } else if let Some(caps) = MAP_ASSIGNMENT.captures(content) {
            assignment_lines += 1;
            let separator = if caps[2].is_empty() { " " } else { &caps[2] };
            text.push_str(&format!(
                "{}TMOD_ENABLEDMODS:{}{}{}",
                &caps[1],
                separator,
                map_value(&caps[3], &ids),
                &caps[4]
            ));
        } else {
            text.push_str(content);
        }
        text.push_str(terminator);
    }

    Patched {
        text,
        comment_lines,
        assignment_lines,
    }
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// New mapping value, quoted the way `old` was. An empty unquoted value is
/// written as `""` so it stays a string.
fn map_value(old: &str, ids: &str) -> String {
    let quote = ['"', '\'']
        .into_iter()
        .find(|q| old.len() >= 2 && old.starts_with(*q) && old.ends_with(*q));
    match quote {
        Some(q) => format!("{q}{ids}{q}"),
        None if ids.is_empty() => "\"\"".to_string(),
        None => ids.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPOSE: &str = "\
services:
  tmodloader:
    image: jacobsmile/tmodloader1.4:latest
    container_name: tmod
    environment:
      # Enabled the CalamityMod, BossChecklist
      - 'TMOD_ENABLEDMODS=2824688072,2563309347'
      - \"TMOD_SHUTDOWN_MESSAGE=Goodbye\"
      - TMOD_AUTODOWNLOAD=2824688072,2563309347
    volumes:
      - ./data:/data
";

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_patch_list_form() {
        let patched = patch(
            COMPOSE,
            &strings(&["MagicStorage", "CalamityMod"]),
            &strings(&["2816941454", "2824688072"]),
        );

        assert_eq!(patched.comment_lines, 1);
        assert_eq!(patched.assignment_lines, 1);
        let expected = COMPOSE
            .replace(
                "# Enabled the CalamityMod, BossChecklist",
                "# Enabled the MagicStorage, CalamityMod",
            )
            .replace(
                "'TMOD_ENABLEDMODS=2824688072,2563309347'",
                "'TMOD_ENABLEDMODS=2816941454,2824688072'",
            );
        assert_eq!(patched.text, expected);
    }

    #[test]
    fn test_patch_preserves_line_count_and_is_idempotent() {
        let names = strings(&["A"]);
        let ids = strings(&["1"]);

        let once = patch(COMPOSE, &names, &ids);
        let twice = patch(&once.text, &names, &ids);

        assert_eq!(once.text.lines().count(), COMPOSE.lines().count());
        assert_eq!(once.text, twice.text);
        assert!(twice.is_identical_to(&once.text));
    }

    #[test]
    fn test_patch_keeps_crlf_and_missing_final_newline() {
        let doc = "environment:\r\n  # Enabled the X\r\n  - TMOD_ENABLEDMODS=9";
        let patched = patch(doc, &strings(&["Y"]), &strings(&["1", "2"]));

        assert_eq!(
            patched.text,
            "environment:\r\n  # Enabled the Y\r\n  - TMOD_ENABLEDMODS=1,2"
        );
    }

    #[test]
    fn test_patch_mapping_form() {
        let doc = "    environment:\n      TMOD_ENABLEDMODS: \"1,2\"\n      TMOD_PORT: 7777\n";
        let patched = patch(doc, &[], &strings(&["3"]));

        assert_eq!(patched.assignment_lines, 1);
        assert_eq!(
            patched.text,
            "    environment:\n      TMOD_ENABLEDMODS: \"3\"\n      TMOD_PORT: 7777\n"
        );
    }

    #[test]
    fn test_patch_mapping_form_empty_value() {
        let doc = "TMOD_ENABLEDMODS:\n";
        let patched = patch(doc, &[], &[]);
        assert_eq!(patched.text, "TMOD_ENABLEDMODS: \"\"\n");
        assert_eq!(patch(&patched.text, &[], &[]).text, patched.text);
    }

    #[test]
    fn test_patch_keeps_trailing_comments() {
        let doc = "      - TMOD_ENABLEDMODS=1,2  # keep me\n      TMOD_ENABLEDMODS: '1' # note\n";
        let patched = patch(doc, &[], &strings(&["9"]));

        assert_eq!(patched.assignment_lines, 2);
        assert_eq!(
            patched.text,
            "      - TMOD_ENABLEDMODS=9  # keep me\n      TMOD_ENABLEDMODS: '9' # note\n"
        );
        assert_eq!(patch(&patched.text, &[], &strings(&["9"])).text, patched.text);
    }

    #[test]
    fn test_patch_mapping_empty_value_with_comment() {
        let patched = patch("TMOD_ENABLEDMODS: # filled in by tmodman\n", &[], &strings(&["4"]));
        assert_eq!(patched.text, "TMOD_ENABLEDMODS: 4 # filled in by tmodman\n");
    }

    #[test]
    fn test_patch_list_item_with_extra_spacing() {
        let patched = patch("  -  'TMOD_ENABLEDMODS=1'\n", &[], &strings(&["2"]));
        assert_eq!(patched.assignment_lines, 1);
        assert_eq!(patched.text, "  -  'TMOD_ENABLEDMODS=2'\n");
    }

    #[test]
    fn test_patch_ignores_lookalike_lines() {
        let doc = "\
      # Enabled these manually: foo
      - TMOD_AUTODOWNLOAD=TMOD_ENABLEDMODS=1
      - 'OTHER_TMOD_ENABLEDMODS=1'
      command: echo TMOD_ENABLEDMODS=1
";
        let patched = patch(doc, &strings(&["A"]), &strings(&["2"]));

        assert_eq!(patched.text, doc);
        assert_eq!(patched.comment_lines, 0);
        assert_eq!(patched.assignment_lines, 0);
    }

    #[test]
    fn test_patch_empty_selection() {
        let patched = patch(COMPOSE, &[], &[]);
        assert!(patched.text.contains("      # Enabled the\n"));
        assert!(patched.text.contains("      - 'TMOD_ENABLEDMODS='\n"));
    }
}
