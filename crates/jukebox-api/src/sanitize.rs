//! Text cleanup for user-submitted form fields.

/// Remove markup and surrounding whitespace from a form field.
pub fn clean_text(input: &str) -> String {
    strip_tags(input).trim().to_string()
}

/// Remove HTML/XML tags, comments and processing instructions.
///
/// A `<` opens a tag unless whitespace follows it, so `a < b` survives
/// while `<3` and `1<2` lose everything from the `<` on. Quoted attribute
/// values may contain `>`. An unterminated tag, including a trailing bare
/// `<`, swallows the rest of the input.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if !opens_tag(after) {
            out.push('<');
            rest = after;
            continue;
        }

        rest = match after.strip_prefix("!--") {
            Some(comment) => comment.find("-->").map_or("", |end| &comment[end + 3..]),
            None => skip_tag(after),
        };
    }

    out.push_str(rest);
    out
}

fn opens_tag(s: &str) -> bool {
    s.chars().next().is_none_or(|c| !c.is_whitespace())
}

/// Returns the text following the closing `>` of the tag body `s`.
fn skip_tag(s: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return &s[i + 1..],
            None => {}
        }
    }
    ""
}

/// Escape text for inclusion in HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
