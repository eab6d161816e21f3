//! Challenge - 解いてほしい対象（ページ URL + site key）

use serde::{Deserialize, Serialize};

/// One challenge to solve: the target page and the widget site key.
///
/// `action` / `cdata` are optional widget parameters forwarded to the worker as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub website_url: String,
    pub website_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdata: Option<String>,
}

impl Challenge {
    pub fn new(website_url: impl Into<String>, website_key: impl Into<String>) -> Self {
        Self {
            website_url: website_url.into(),
            website_key: website_key.into(),
            action: None,
            cdata: None,
        }
    }

    /// Build from optional request fields. Blank values count as missing.
    pub fn from_fields(website_url: Option<String>, website_key: Option<String>) -> Option<Self> {
        let url = non_blank(website_url)?;
        let key = non_blank(website_key)?;
        Some(Self::new(url, key))
    }

    pub fn with_action(mut self, action: Option<String>) -> Self {
        self.action = non_blank(action);
        self
    }

    pub fn with_cdata(mut self, cdata: Option<String>) -> Self {
        self.cdata = non_blank(cdata);
        self
    }
}

/// `None` と空文字（空白のみ）を同一視する
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn from_fields_accepts_complete_input() {
        let c = Challenge::from_fields(
            Some("https://example.com".into()),
            Some("0xTESTKEY".into()),
        )
        .unwrap();
        assert_eq!(c.website_url, "https://example.com");
        assert_eq!(c.website_key, "0xTESTKEY");
        assert!(c.action.is_none());
    }

    #[rstest]
    #[case::missing_url(None, Some("0xKEY"))]
    #[case::missing_key(Some("https://example.com"), None)]
    #[case::blank_url(Some("  "), Some("0xKEY"))]
    #[case::empty_key(Some("https://example.com"), Some(""))]
    fn from_fields_rejects_incomplete_input(#[case] url: Option<&str>, #[case] key: Option<&str>) {
        let c = Challenge::from_fields(url.map(String::from), key.map(String::from));
        assert!(c.is_none());
    }

    #[test]
    fn optional_params_drop_blank_values() {
        let c = Challenge::new("https://example.com", "0xKEY")
            .with_action(Some("login".into()))
            .with_cdata(Some("".into()));
        assert_eq!(c.action.as_deref(), Some("login"));
        assert!(c.cdata.is_none());
    }
}
