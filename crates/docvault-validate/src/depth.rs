//! Nesting-depth scan run before a document is handed to the parser.
//!
//! The scan only counts tags. Comments, CDATA sections, processing
//! instructions and declarations are skipped, and quoted attribute values
//! may contain `<`, `>` and `/`. Well-formedness is left to the parser.

/// Whether `bytes` opens more than `limit` elements inside one another.
pub(crate) fn exceeds(bytes: &[u8], limit: usize) -> bool {
    let mut depth = 0usize;
    let mut i = 0;
    while let Some(start) = find(bytes, i, b"<") {
        let rest = &bytes[start..];
        i = if rest.starts_with(b"<!--") {
            skip_past(bytes, start + 4, b"-->")
        } else if rest.starts_with(b"<![CDATA[") {
            skip_past(bytes, start + 9, b"]]>")
        } else if rest.starts_with(b"<?") {
            skip_past(bytes, start + 2, b"?>")
        } else if rest.starts_with(b"<!") {
            skip_declaration(bytes, start + 2)
        } else if rest.starts_with(b"</") {
            depth = depth.saturating_sub(1);
            skip_past(bytes, start + 2, b">")
        } else {
            let (end, self_closing) = scan_tag(bytes, start + 1);
            if !self_closing {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            end
        };
    }
    false
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn skip_past(bytes: &[u8], from: usize, terminator: &[u8]) -> usize {
    find(bytes, from, terminator).map_or(bytes.len(), |at| at + terminator.len())
}

/// End of a start tag, and whether it closes itself.
fn scan_tag(bytes: &[u8], from: usize) -> (usize, bool) {
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return (i + 1, i > from && bytes[i - 1] == b'/'),
                _ => {}
            },
        }
    }
    (bytes.len(), false)
}

/// `<!DOCTYPE ...>`, including an internal subset in brackets.
fn skip_declaration(bytes: &[u8], from: usize) -> usize {
    let mut quote = None;
    let mut brackets = 0usize;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'[' => brackets += 1,
                b']' => brackets = brackets.saturating_sub(1),
                b'<' if bytes[i..].starts_with(b"<!--") => {
                    i = skip_past(bytes, i + 4, b"-->");
                    continue;
                }
                b'>' if brackets == 0 => return i + 1,
                _ => {}
            },
        }
        i += 1;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(depth: usize) -> String {
        format!("{}{}", "<n>".repeat(depth), "</n>".repeat(depth))
    }

    #[test]
    fn counts_open_elements() {
        assert!(!exceeds(nested(3).as_bytes(), 3));
        assert!(exceeds(nested(4).as_bytes(), 3));
        assert!(!exceeds(b"<a><b/><b/><b/><b/></a>", 2));
    }

    #[test]
    fn siblings_do_not_add_up() {
        let flat = format!("<r>{}</r>", nested(2).repeat(50));
        assert!(!exceeds(flat.as_bytes(), 3));
    }

    #[test]
    fn markup_inside_text_constructs_is_ignored() {
        let doc = r#"<?xml version="1.0"?>
<!DOCTYPE r [
  <!ENTITY x "<a><b><c>">
  <!-- <a><b><c> -->
]>
<r note="<a><b/>" other='>'>
  <!-- <a><b><c><d> -->
  <![CDATA[<a><b><c><d>]]>
  <?pi <a><b><c>?>
</r>"#;
        assert!(!exceeds(doc.as_bytes(), 1));
    }

    #[test]
    fn truncated_input_terminates() {
        assert!(!exceeds(b"<a><b", 5));
        assert!(!exceeds(b"<!-- never closed <a><b>", 1));
        assert!(exceeds(b"<a><b><c attr=\"unterminated", 1));
    }
}
