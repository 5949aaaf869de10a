use std::fmt;
use std::path::{Path, PathBuf};

/// Query parameters that select the image results page.
const IMAGE_SEARCH_PARAMS: &str = "source=lnms&tbm=isch";

/// One unit of search work: a main keyword combined with a supplemented keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeywordPair {
    pub main: String,
    pub supplemented: String,
}

impl KeywordPair {
    pub fn new(main: impl Into<String>, supplemented: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            supplemented: supplemented.into(),
        }
    }

    /// Every main keyword joined with every supplemented keyword, main-major.
    pub fn cross(main_keywords: &[String], supplemented_keywords: &[String]) -> Vec<Self> {
        main_keywords
            .iter()
            .flat_map(|main| {
                supplemented_keywords
                    .iter()
                    .map(move |supplemented| Self::new(main.clone(), supplemented.clone()))
            })
            .collect()
    }

    /// The search string sent to the provider, with spaces encoded as `%20`.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.main, self.supplemented).replace(' ', "%20")
    }

    /// `<download_dir>/<main>/<supplemented>`
    pub fn output_dir(&self, download_dir: &Path) -> PathBuf {
        download_dir.join(&self.main).join(&self.supplemented)
    }
}

impl fmt::Display for KeywordPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main, self.supplemented)
    }
}

/// Builds image search URLs against a configurable endpoint.
#[derive(Debug, Clone)]
pub struct SearchUrlBuilder {
    endpoint: String,
}

impl SearchUrlBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn search_url(&self, pair: &KeywordPair) -> String {
        format!(
            "{}?q={}&{}",
            self.endpoint,
            pair.search_query(),
            IMAGE_SEARCH_PARAMS
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let builder = SearchUrlBuilder::new("https://www.google.com/search");
        let pair = KeywordPair::new("swimmer", "butterfly");

        assert_eq!(
            builder.search_url(&pair),
            "https://www.google.com/search?q=swimmer%20butterfly&source=lnms&tbm=isch"
        );
    }

    #[test]
    fn test_spaces_inside_keywords_are_encoded() {
        let pair = KeywordPair::new("open water", "front crawl");
        assert_eq!(pair.search_query(), "open%20water%20front%20crawl");
    }

    #[test]
    fn test_output_dir() {
        let pair = KeywordPair::new("swimmer", "butterfly");
        assert_eq!(
            pair.output_dir(Path::new("./google_image")),
            Path::new("./google_image").join("swimmer").join("butterfly")
        );
    }

    #[test]
    fn test_cross_product_order() {
        let main = vec!["swimmer".to_string(), "diver".to_string()];
        let supplemented = vec!["butterfly".to_string(), "freestyle".to_string()];

        let pairs = KeywordPair::cross(&main, &supplemented);
        assert_eq!(
            pairs,
            vec![
                KeywordPair::new("swimmer", "butterfly"),
                KeywordPair::new("swimmer", "freestyle"),
                KeywordPair::new("diver", "butterfly"),
                KeywordPair::new("diver", "freestyle"),
            ]
        );
        assert!(KeywordPair::cross(&main, &[]).is_empty());
    }
}
