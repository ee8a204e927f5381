use serde::Deserialize;

/// Main configuration structure for Pagechain
///
/// Every section has complete defaults, so an empty TOML document (or no
/// file at all) yields a working configuration for the default site.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub fetch: FetchConfig,
    pub crawl: CrawlConfig,
    pub noise: NoiseConfig,
    pub content: ContentConfig,
    pub footnotes: FootnoteConfig,
    pub output: OutputConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the identifying client string: `Name/Version (+ContactURL)`
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Pagechain".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/pagechain/pagechain".to_string(),
        }
    }
}

/// Which transport produces page bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMode {
    /// Plain HTTP GET
    Http,
    /// External headless renderer command
    Render,
}

/// What to do with a non-retryable 3xx/4xx response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientErrorPolicy {
    /// Hand the body to the pipeline unchanged
    KeepBody,
    /// Treat the response as fatal for the URL
    Abort,
}

/// Fetching and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    pub mode: FetchMode,

    /// Overall request timeout (seconds)
    pub timeout_secs: u64,

    /// Total number of requests issued for one URL before giving up
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    pub initial_backoff_ms: u64,

    /// Factor applied to the delay after every retry
    pub backoff_multiplier: f64,

    /// Case-insensitive body substrings that mark an upstream failure page
    pub failure_signatures: Vec<String>,

    /// Bodies shorter than this many characters are treated as truncated
    pub min_body_len: usize,

    /// argv of the renderer used in `render` mode; `{url}` is substituted
    pub render_command: Vec<String>,

    pub on_client_error: ClientErrorPolicy,

    /// `Accept-Language` sent with every HTTP request; empty sends none
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Http,
            timeout_secs: 25,
            max_attempts: 5,
            initial_backoff_ms: 2000,
            backoff_multiplier: 2.0,
            failure_signatures: vec![
                "max_user_connections".to_string(),
                "too many connections".to_string(),
                "could not connect to database".to_string(),
                "error establishing a database connection".to_string(),
                "mysqli_connect".to_string(),
                "mysql_connect".to_string(),
                "sqlstate[".to_string(),
                "database error".to_string(),
                "service temporarily unavailable".to_string(),
            ],
            min_body_len: 100,
            render_command: vec![
                "chromium".to_string(),
                "--headless".to_string(),
                "--disable-gpu".to_string(),
                "--no-sandbox".to_string(),
                "--dump-dom".to_string(),
                "{url}".to_string(),
            ],
            on_client_error: ClientErrorPolicy::KeepBody,
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Polite delay between successful fetches (milliseconds)
    pub page_delay_ms: u64,

    /// Stop after this many pages have been written
    pub max_pages: Option<u32>,

    /// CSS selector for the "next page" link
    pub next_link_selector: String,

    /// Check robots.txt for the seed URL before crawling
    pub respect_robots: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: 800,
            max_pages: None,
            next_link_selector: "a.nav_right".to_string(),
            respect_robots: true,
        }
    }
}

/// Noise classifier thresholds and vocabularies
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NoiseConfig {
    /// Regexes (case-insensitive) for the top "<section> N / <subsection> M" banner
    pub banner_heading_patterns: Vec<String>,

    /// Image src substring identifying the site header `h1`
    pub banner_image_marker: String,

    /// href substrings of known cross-reference sections
    pub nav_table_link_prefixes: Vec<String>,

    /// Minimum link count before a container is considered a link index
    pub min_links: usize,

    /// Links with shorter visible text count as "short"
    pub short_link_chars: usize,

    /// Fraction of short links that marks a link index
    pub short_link_ratio: f64,

    /// Absolute floor for the short-link count
    pub min_short_links: usize,

    /// Fraction of internal links required
    pub internal_link_ratio: f64,

    /// Absolute floor for the internal-link count
    pub min_internal_links: usize,

    /// href prefixes that mark a link as internal
    pub internal_link_prefixes: Vec<String>,

    /// Locale navigation keywords counted in element text
    pub nav_keywords: Vec<String>,

    /// Keyword occurrences that mark an element as navigation
    pub min_keyword_hits: usize,

    /// Tags removed outright before classification
    pub strip_tags: Vec<String>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            banner_heading_patterns: vec![
                r"kalash\s*\d+\s*/\s*vishram\s*\d+".to_string(),
                r"કળશ\s*\d+\s*/\s*વિશ્રામ\s*\d+".to_string(),
            ],
            banner_image_marker: "harililamrut-header".to_string(),
            nav_table_link_prefixes: vec![
                "/vachanamrut/".to_string(),
                "/vato/".to_string(),
                "/kirtan/".to_string(),
                "/kavya/".to_string(),
                "/aksharamrutam/".to_string(),
                "/chintamani/".to_string(),
            ],
            min_links: 12,
            short_link_chars: 40,
            short_link_ratio: 0.8,
            min_short_links: 10,
            internal_link_ratio: 0.5,
            min_internal_links: 5,
            internal_link_prefixes: vec!["index.php".to_string(), "/".to_string()],
            nav_keywords: vec![
                "વિશ્રામ".to_string(),
                "કળશ".to_string(),
                "Kalash".to_string(),
                "Vishram".to_string(),
            ],
            min_keyword_hits: 6,
            strip_tags: [
                "script", "style", "noscript", "iframe", "form", "input", "button", "svg", "title",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        }
    }
}

/// Content selector configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContentConfig {
    /// id/class substrings that suggest an article body
    pub content_keywords: Vec<String>,

    /// Structural chrome tags stripped from the chosen subtree
    pub chrome_tags: Vec<String>,

    /// class substrings stripped from the chosen subtree
    pub chrome_class_markers: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            content_keywords: [
                "content", "main", "page", "article", "container", "wrapper", "post", "entry",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            chrome_tags: ["nav", "header", "footer", "aside"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            chrome_class_markers: vec!["sidebar".to_string(), "nav".to_string()],
        }
    }
}

/// Footnote extraction and reference resolution configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FootnoteConfig {
    /// Exact id of the footnote container
    pub container_id: String,

    /// class substring of the footnote container (fallback)
    pub container_class: String,

    /// class substrings of back-reference links inside entries
    pub back_link_class_markers: Vec<String>,

    /// Regex (case-insensitive) over a link's class marking a footnote reference
    pub reference_class_pattern: String,

    /// Longest visible text of a numeric reference link
    pub max_ref_text_chars: usize,

    /// Longest number rewritten inside a bare superscript
    pub max_sup_digits: usize,

    /// Heading of the rendered footnotes section
    pub heading: String,
}

impl Default for FootnoteConfig {
    fn default() -> Self {
        Self {
            container_id: "footnotes".to_string(),
            container_class: "footnotes".to_string(),
            back_link_class_markers: vec!["back".to_string(), "fnref".to_string()],
            reference_class_pattern: "fnref|footnote".to_string(),
            max_ref_text_chars: 6,
            max_sup_digits: 4,
            heading: "Footnotes".to_string(),
        }
    }
}

/// Where rendered footnotes are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FootnotePlacement {
    /// Each page block ends with its own footnotes section
    PerPage,
    /// One combined section is appended when the crawl stops
    EndOfDocument,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the aggregated text document
    pub path: String,

    /// Path to the progress record (defaults to `<path>.progress.json`)
    pub progress_path: Option<String>,

    /// Query parameters that identify a page, in label order
    pub label_params: Vec<String>,

    /// Text placed before the derived page label
    pub label_prefix: Option<String>,

    pub footnotes_placement: FootnotePlacement,
}

impl OutputConfig {
    /// Returns the effective progress record path
    pub fn progress_path(&self) -> String {
        self.progress_path
            .clone()
            .unwrap_or_else(|| format!("{}.progress.json", self.path))
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "pagechain.md".to_string(),
            progress_path: None,
            label_params: vec!["kalash".to_string(), "vishram".to_string()],
            label_prefix: None,
            footnotes_placement: FootnotePlacement::PerPage,
        }
    }
}
