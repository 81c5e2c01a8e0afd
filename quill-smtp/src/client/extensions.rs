//! Service extensions advertised in the EHLO reply.

use super::response::Response;

/// What the server said it supports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    starttls: bool,
    auth: Vec<String>,
    size: Option<usize>,
    keywords: Vec<String>,
}

impl Extensions {
    /// Read the extensions from a successful EHLO reply.
    ///
    /// The first line is the server's greeting and is skipped. Both
    /// `AUTH PLAIN LOGIN` and the older `AUTH=PLAIN LOGIN` forms are understood.
    #[must_use]
    pub fn from_ehlo(response: &Response) -> Self {
        let mut extensions = Self::default();

        for line in response.lines.iter().skip(1) {
            let (keyword, params) = line.split_once([' ', '=']).unwrap_or((line.as_str(), ""));
            let keyword = keyword.to_ascii_uppercase();

            match keyword.as_str() {
                "STARTTLS" => extensions.starttls = true,
                "AUTH" => {
                    for mechanism in params.split_whitespace() {
                        let mechanism = mechanism.to_ascii_uppercase();
                        if !extensions.auth.contains(&mechanism) {
                            extensions.auth.push(mechanism);
                        }
                    }
                }
                "SIZE" => extensions.size = params.trim().parse().ok().filter(|&size| size > 0),
                _ => {}
            }

            extensions.keywords.push(keyword);
        }

        extensions
    }

    #[must_use]
    pub const fn supports_starttls(&self) -> bool {
        self.starttls
    }

    /// Advertised SASL mechanisms, upper case, in the server's order.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[String] {
        &self.auth
    }

    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.auth.iter().any(|offered| offered.eq_ignore_ascii_case(mechanism))
    }

    /// Maximum message size, if the server declared one.
    #[must_use]
    pub const fn max_size(&self) -> Option<usize> {
        self.size
    }

    #[must_use]
    pub fn has(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|known| known.eq_ignore_ascii_case(keyword))
    }
}
