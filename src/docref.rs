//! Document references: an explicit id or a shareable link.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

static RAW_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{10,}$").expect("raw id pattern is valid"));

static FILE_PATH_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)").expect("link pattern is valid"));

/// How a caller pointed at a document. An explicit id wins over a link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: Option<String>,
    pub link: Option<String>,
}

impl DocumentRef {
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            link: None,
        }
    }

    pub fn from_link(link: impl Into<String>) -> Self {
        Self {
            id: None,
            link: Some(link.into()),
        }
    }

    /// Interpret a command-line argument: anything with a URL scheme is a
    /// link, everything else an id.
    pub fn from_arg(arg: &str) -> Self {
        if arg.contains("://") {
            Self::from_link(arg)
        } else {
            Self::from_id(arg)
        }
    }

    /// The referenced document id, if one can be derived.
    ///
    /// The id is used verbatim; a link yields the segment after `/file/d/`,
    /// else its `id` query parameter. A "link" that is itself a bare raw id
    /// (pasted instead of a URL) is used as is.
    pub fn document_id(&self) -> Option<String> {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return Some(id.to_string());
        }
        self.link.as_deref().and_then(id_from_link)
    }
}

fn id_from_link(link: &str) -> Option<String> {
    let link = link.trim();
    if looks_like_raw_id(link) {
        return Some(link.to_string());
    }
    if let Some(caps) = FILE_PATH_ID_RE.captures(link) {
        return Some(caps[1].to_string());
    }
    let url = Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// True for strings shaped like an opaque document id.
pub fn looks_like_raw_id(input: &str) -> bool {
    RAW_ID_RE.is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_id_verbatim() {
        let r = DocumentRef::from_id("docs/handbook.pdf");
        assert_eq!(r.document_id().as_deref(), Some("docs/handbook.pdf"));
    }

    #[test]
    fn test_id_wins_over_link() {
        let r = DocumentRef {
            id: Some("explicit".to_string()),
            link: Some("https://host/file/d/fromlink/view".to_string()),
        };
        assert_eq!(r.document_id().as_deref(), Some("explicit"));
    }

    #[test]
    fn test_file_d_link() {
        let r = DocumentRef::from_link("https://drive.example.com/file/d/1AbC_def-23/view?usp=sharing");
        assert_eq!(r.document_id().as_deref(), Some("1AbC_def-23"));
    }

    #[test]
    fn test_query_id_link() {
        let r = DocumentRef::from_link("https://drive.example.com/open?id=XYZ123abc&authuser=0");
        assert_eq!(r.document_id().as_deref(), Some("XYZ123abc"));
        let r = DocumentRef::from_link("https://host/view?id=docs%2Fguide.md");
        assert_eq!(r.document_id().as_deref(), Some("docs/guide.md"));
    }

    #[test]
    fn test_unparseable_link_has_no_id() {
        assert_eq!(DocumentRef::from_link("not a url").document_id(), None);
        assert_eq!(DocumentRef::from_link("https://host/path").document_id(), None);
        assert_eq!(DocumentRef::default().document_id(), None);
    }

    #[test]
    fn test_raw_id_pasted_as_link() {
        let r = DocumentRef::from_link(" 1AbC_def-23xyz ");
        assert_eq!(r.document_id().as_deref(), Some("1AbC_def-23xyz"));
        assert_eq!(DocumentRef::from_link("short").document_id(), None);
    }

    #[test]
    fn test_from_arg() {
        assert_eq!(DocumentRef::from_arg("notes.md"), DocumentRef::from_id("notes.md"));
        assert_eq!(
            DocumentRef::from_arg("https://host/?id=a"),
            DocumentRef::from_link("https://host/?id=a")
        );
    }

    #[test]
    fn test_looks_like_raw_id() {
        assert!(looks_like_raw_id("1AbC_def-23xyz"));
        assert!(!looks_like_raw_id("short"));
        assert!(!looks_like_raw_id("has space in it"));
        assert!(!looks_like_raw_id("https://host/file/d/abc"));
    }
}
