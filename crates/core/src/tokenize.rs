use log::debug;
use serde_json::Value;

use crate::language::{CommentSyntax, Language, comment_syntax};

/// Lowercased, comment-free, whitespace-separated tokens of `text`.
///
/// Total: unknown languages strip nothing and malformed notebooks are read as plain text.
pub fn normalize(text: &str, language: Language) -> Vec<String> {
    let syntax = comment_syntax(language);
    let code = if syntax.notebook {
        notebook_code(text).unwrap_or_else(|| {
            debug!("notebook JSON not parsable, normalizing raw text");
            text.to_string()
        })
    } else {
        text.to_string()
    };

    let stripped = strip_comments(&code, &syntax);
    let stripped = if syntax.strip_quote_chars {
        stripped.replace(['"', '\''], "")
    } else {
        stripped
    };

    stripped
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Removes comments, keeping line breaks that block comments spanned.
pub(crate) fn strip_comments(text: &str, syntax: &CommentSyntax) -> String {
    if syntax.line.is_empty() && syntax.block.is_empty() && syntax.drop_bytes.is_empty() {
        return text.to_string();
    }

    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;

    'outer: while i < bytes.len() {
        let rest = &bytes[i..];

        for (open, close) in syntax.block {
            if !rest.starts_with(open.as_bytes()) {
                continue;
            }
            let body = i + open.len();
            let end = match find(&bytes[body..], close.as_bytes()) {
                Some(pos) => body + pos + close.len(),
                None => bytes.len(),
            };
            let newlines = bytes[i..end].iter().filter(|&&b| b == b'\n').count();
            out.extend(std::iter::repeat_n(b'\n', newlines));
            i = end;
            continue 'outer;
        }

        for marker in syntax.line {
            if rest.starts_with(marker.as_bytes()) {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue 'outer;
            }
        }

        let b = bytes[i];
        if syntax.quotes.contains(&b) {
            let quote = b;
            out.push(b);
            i += 1;
            while i < bytes.len() {
                let c = bytes[i];
                if c == b'\n' {
                    break;
                }
                if c == b'\\' && i + 1 < bytes.len() && bytes[i + 1] != b'\n' {
                    out.extend_from_slice(&bytes[i..i + 2]);
                    i += 2;
                    continue;
                }
                out.push(c);
                i += 1;
                if c == quote {
                    break;
                }
            }
            continue;
        }

        if syntax.drop_bytes.contains(&b) {
            i += 1;
            continue;
        }

        out.push(b);
        i += 1;
    }

    // Cuts only happen at ASCII marker boundaries, so this never substitutes.
    String::from_utf8_lossy(&out).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Concatenated cell sources of a Jupyter notebook.
fn notebook_code(text: &str) -> Option<String> {
    let doc: Value = serde_json::from_str(text).ok()?;
    let cells = doc.get("cells")?.as_array()?;
    let mut code = String::new();
    for cell in cells {
        match cell.get("source") {
            Some(Value::String(source)) => code.push_str(source),
            Some(Value::Array(lines)) => {
                for line in lines.iter().filter_map(Value::as_str) {
                    code.push_str(line);
                }
            }
            _ => continue,
        }
        code.push('\n');
    }
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(text: &str, language: Language) -> String {
        normalize(text, language).join(" ")
    }

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(
            normalize("  HELLO \t  World\n\nAgain  ", Language::Java),
            vec!["hello", "world", "again"]
        );
        assert!(normalize("", Language::Java).is_empty());
        assert!(normalize(" \n\t ", Language::Python).is_empty());
    }

    #[test]
    fn strips_c_family_comments() {
        assert_eq!(
            joined("int x = 1; // trailing\n/* block\n spans */ int y;", Language::Java),
            "int x = 1; int y;"
        );
    }

    #[test]
    fn keeps_comment_markers_inside_strings() {
        assert_eq!(
            joined(r#"url = "http://example.com"; // note"#, Language::Go),
            r#"url = "http://example.com";"#
        );
        assert_eq!(
            joined(r#"s = "a \" // b" # c"#, Language::Python),
            r#"s = "a \" // b""#
        );
    }

    #[test]
    fn strips_python_docstrings_and_hash_comments() {
        let src = "def f():\n    \"\"\"Doc\n    string\"\"\"\n    return 1  # one\n";
        assert_eq!(joined(src, Language::Python), "def f(): return 1");
    }

    #[test]
    fn javascript_drops_braces() {
        assert_eq!(
            joined("function f() {\n  return 1;\n}", Language::JavaScript),
            "function f() return 1;"
        );
    }

    #[test]
    fn sql_and_markup_rules() {
        assert_eq!(joined("SELECT 1 -- one\nFROM t", Language::Sql), "select 1 from t");
        assert_eq!(
            joined("<p>keep</p><!-- drop\nme -->", Language::Html),
            "<p>keep</p>"
        );
    }

    #[test]
    fn yaml_strips_quote_characters() {
        assert_eq!(
            joined("name: \"Build\" # ci\nrun: 'make'", Language::Yaml),
            "name: build run: make"
        );
    }

    #[test]
    fn unknown_language_strips_nothing() {
        assert_eq!(joined("a // b # c", Language::Text), "a // b # c");
        assert_eq!(joined("{\"a\": 1}", Language::Json), "{\"a\": 1}");
    }

    #[test]
    fn notebook_cells_are_concatenated() {
        let nb = r##"{"cells":[{"source":["import os\n","# note\n","x = 1"]},{"source":"Y = 2"}]}"##;
        assert_eq!(joined(nb, Language::Ipynb), "import os x = 1 y = 2");
    }

    #[test]
    fn broken_notebook_falls_back_to_raw_text() {
        assert_eq!(joined("not json # c", Language::Ipynb), "not json");
    }

    #[test]
    fn unterminated_block_comment_runs_to_end() {
        assert_eq!(joined("a /* never closed\nb", Language::C), "a");
    }

    #[test]
    fn multibyte_text_survives_stripping() {
        assert_eq!(joined("café // naïve", Language::Rust), "café");
    }
}
