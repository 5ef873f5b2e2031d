use tracing::warn;

pub const HEAD_CLOSE: &str = "</head>";

/// The page being assembled, split at the first `</head>`.
///
/// `body_markup` starts with `</head>` when the markup has a head at all;
/// otherwise `head_markup` is empty and stylesheet injection is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDocument {
    pub head_markup: String,
    pub body_markup: String,
    /// Stylesheets linked so far, in link order.
    pub stylesheet_hrefs: Vec<String>,
}

impl PageDocument {
    /// Append rendered markup to the trimmed page shell.
    pub fn assemble(shell: &str, markup: &str) -> Self {
        let html = format!("{}{}", shell.trim(), markup);
        match html.find(HEAD_CLOSE) {
            Some(pos) => {
                let (head, body) = html.split_at(pos);
                Self {
                    head_markup: head.to_string(),
                    body_markup: body.to_string(),
                    stylesheet_hrefs: Vec::new(),
                }
            }
            None => Self {
                head_markup: String::new(),
                body_markup: html,
                stylesheet_hrefs: Vec::new(),
            },
        }
    }

    pub fn has_head(&self) -> bool {
        self.body_markup.starts_with(HEAD_CLOSE)
    }

    /// Link each stylesheet right before `</head>`, keeping the given order.
    ///
    /// Returns how many links were added.
    pub fn inject_stylesheets(&mut self, hrefs: &[String]) -> usize {
        if hrefs.is_empty() {
            return 0;
        }
        if !self.has_head() {
            warn!(count = hrefs.len(), "no </head> in page markup, stylesheets not linked");
            return 0;
        }
        for href in hrefs {
            self.head_markup.push_str(&stylesheet_link(href));
            self.stylesheet_hrefs.push(href.clone());
        }
        hrefs.len()
    }

    pub fn into_html(self) -> String {
        self.head_markup + &self.body_markup
    }
}

fn stylesheet_link(href: &str) -> String {
    format!("<link href=\"{}\" rel=\"stylesheet\" />", escape_attr(href))
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrefs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assemble_appends_to_trimmed_shell() {
        let doc = PageDocument::assemble(
            "\n  <!DOCTYPE html>\n",
            "<html><head><title>x</title></head><body>hi</body></html>",
        );
        assert_eq!(doc.head_markup, "<!DOCTYPE html><html><head><title>x</title>");
        assert!(doc.body_markup.starts_with("</head><body>"));
        assert!(doc.has_head());
    }

    #[test]
    fn test_inject_keeps_order() {
        let mut doc = PageDocument::assemble("<!DOCTYPE html>", "<html><head></head><body></body></html>");
        let added = doc.inject_stylesheets(&hrefs(&["/b.css", "/a.css"]));
        assert_eq!(added, 2);
        assert_eq!(doc.stylesheet_hrefs, hrefs(&["/b.css", "/a.css"]));
        assert_eq!(
            doc.into_html(),
            "<!DOCTYPE html><html><head><link href=\"/b.css\" rel=\"stylesheet\" />\
             <link href=\"/a.css\" rel=\"stylesheet\" /></head><body></body></html>"
        );
    }

    #[test]
    fn test_only_first_head_close_is_used() {
        let mut doc = PageDocument::assemble("", "<head></head><pre>&lt;/head&gt;</head></pre>");
        doc.inject_stylesheets(&hrefs(&["/s.css"]));
        let html = doc.into_html();
        assert!(html.starts_with("<head><link href=\"/s.css\" rel=\"stylesheet\" /></head>"));
        assert_eq!(html.matches("<link").count(), 1);
    }

    #[test]
    fn test_inject_without_head_is_noop() {
        let mut doc = PageDocument::assemble("", "<div>fragment</div>");
        assert!(!doc.has_head());
        assert_eq!(doc.inject_stylesheets(&hrefs(&["/a.css"])), 0);
        assert_eq!(doc.into_html(), "<div>fragment</div>");
    }

    #[test]
    fn test_href_is_escaped() {
        let mut doc = PageDocument::assemble("", "<head></head>");
        doc.inject_stylesheets(&hrefs(&["/a.css?v=1&x=\"2\""]));
        assert!(doc.into_html().contains("href=\"/a.css?v=1&amp;x=&quot;2&quot;\""));
    }
}
