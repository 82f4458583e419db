use std::fmt;

/// Which indicators to compute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IndicatorRequest {
    #[default]
    All,
    Named(Vec<String>),
}

impl IndicatorRequest {
    /// Builds a request from user input. Items may be comma separated; the
    /// literal `all` anywhere selects the full catalogue.
    pub fn parse<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = Vec::new();
        for item in items {
            for name in item.as_ref().split(',') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                if name.eq_ignore_ascii_case("all") {
                    return IndicatorRequest::All;
                }
                names.push(name.to_string());
            }
        }
        IndicatorRequest::Named(names)
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IndicatorRequest::Named(names.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for IndicatorRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorRequest::All => f.write_str("all"),
            IndicatorRequest::Named(names) => f.write_str(&names.join(",")),
        }
    }
}
