//! String helpers available on every `str`

use std::sync::OnceLock;

use regex::Regex;

static HTML_TAG: OnceLock<Regex> = OnceLock::new();

fn html_tag() -> &'static Regex {
    HTML_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("HTML tag pattern is valid"))
}

pub trait StringExt {
    /// Characters in reverse order. Combining sequences are not kept together.
    fn reverse(&self) -> String;

    /// First character upper-cased, the rest unchanged
    fn capitalize_first_letter(&self) -> String;

    /// Drop everything that looks like `<...>`.
    ///
    /// Single pass: text exposed by a removal is not scanned again, so
    /// `"<<b>>"` becomes `">"`.
    fn remove_html_tags(&self) -> String;
}

impl StringExt for str {
    fn reverse(&self) -> String {
        self.chars().rev().collect()
    }

    fn capitalize_first_letter(&self) -> String {
        let mut chars = self.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn remove_html_tags(&self) -> String {
        html_tag().replace_all(self, "").into_owned()
    }
}
