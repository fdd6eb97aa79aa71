//! Alternate template syntax support.
//!
//! An indentation-based dialect (pug) is rendered to markup by an external
//! renderer, the markup is parsed and transformed as usual, and every
//! source range computed against the rendered markup is re-resolved
//! against the dialect text through a [`PositionMapper`].

use memchr::memmem;

/// Renders alternate-syntax template text to markup.
pub trait AltSyntaxRenderer: Send + Sync {
    /// Dialect this renderer handles (`pug`).
    fn lang(&self) -> &str;

    /// Render `source`; `None` when the text does not render.
    fn render(&self, source: &str) -> Option<String>;
}

/// Resolves rendered-markup offsets back to alternate-syntax offsets.
pub trait PositionMapper {
    /// Offset in the alternate syntax of the fragment `search` that sits at
    /// `rendered_offset` in the rendered markup.
    fn map(&self, search: &str, rendered_offset: u32) -> Option<u32>;
}

/// Maps the n-th occurrence of a fragment in the rendered markup to the
/// n-th occurrence of the same fragment in the alternate syntax.
#[derive(Debug, Clone)]
pub struct OccurrenceMapper<'a> {
    alt: &'a str,
    rendered: &'a str,
}

impl<'a> OccurrenceMapper<'a> {
    pub fn new(alt: &'a str, rendered: &'a str) -> Self {
        Self { alt, rendered }
    }
}

impl PositionMapper for OccurrenceMapper<'_> {
    fn map(&self, search: &str, rendered_offset: u32) -> Option<u32> {
        if search.is_empty() {
            return None;
        }
        let offset = rendered_offset as usize;
        if !self.rendered.get(offset..)?.starts_with(search) {
            return None;
        }
        let finder = memmem::Finder::new(search.as_bytes());
        let nth = finder
            .find_iter(&self.rendered.as_bytes()[..offset])
            .count();
        finder
            .find_iter(self.alt.as_bytes())
            .nth(nth)
            .map(|i| i as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_nth_occurrence() {
        let pug = "div\n  p {{ msg }}\n  p {{ msg }}";
        let html = "<div><p>{{ msg }}</p><p>{{ msg }}</p></div>";
        let mapper = OccurrenceMapper::new(pug, html);

        let first = html.find("msg").unwrap() as u32;
        let second = html.rfind("msg").unwrap() as u32;
        assert_eq!(mapper.map("msg", first), Some(pug.find("msg").unwrap() as u32));
        assert_eq!(mapper.map("msg", second), Some(pug.rfind("msg").unwrap() as u32));
    }

    #[test]
    fn test_unresolvable() {
        let mapper = OccurrenceMapper::new("div", "<div><span></span></div>");
        // Not at the rendered offset
        assert_eq!(mapper.map("span", 0), None);
        // Present in markup only
        assert_eq!(mapper.map("span", 6), None);
        assert_eq!(mapper.map("", 0), None);
    }
}
