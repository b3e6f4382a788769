use crate::error::PageError;

const STYLE: &str = r#"        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
        }"#;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Page title from a topic: `blog/my-first-post` becomes `Blog - My First Post`.
pub fn title_for(topic: &str) -> String {
    let spaced = topic.replace('-', " ").replace('/', " - ");

    // capitalize the first letter of every alphabetic run, lowercase the rest
    let mut title = String::with_capacity(spaced.len());
    let mut in_word = false;
    for c in spaced.chars() {
        if c.is_alphabetic() {
            if in_word {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            title.push(c);
            in_word = false;
        }
    }
    title
}

/// Full HTML document around a generated fragment. The fragment goes in as-is.
pub fn page_document(title: &str, fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"utf-8\">\n    <title>{}</title>\n    <style>\n{}\n    </style>\n</head>\n<body>\n    {}\n</body>\n</html>\n",
        escape_html(title),
        STYLE,
        fragment
    )
}

// Shown in place of generated content when generation fails
pub fn error_fragment(err: &PageError) -> String {
    format!(
        "<h1>Error</h1><p>Failed to generate content: {}</p>",
        escape_html(&err.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_nested_topic() {
        assert_eq!(title_for("blog/my-first-post"), "Blog - My First Post");
        assert_eq!(title_for("home"), "Home");
        assert_eq!(title_for("ABOUT-us"), "About Us");
    }

    #[test]
    fn document_escapes_title_but_not_fragment() {
        let doc = page_document("<script>", "<h1>Hello</h1>");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>&lt;script&gt;</title>"));
        assert!(doc.contains("<h1>Hello</h1>"));
    }

    #[test]
    fn error_fragment_escapes_message() {
        let err = PageError::UpstreamMalformed("<b>bad</b>".into());
        let html = error_fragment(&err);
        assert!(html.starts_with("<h1>Error</h1>"));
        assert!(html.contains("&lt;b&gt;bad&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }
}
