use regex::Regex;
use std::sync::LazyLock;

/// Packages shipped together by the `common-tools` bundle.
const COMMON_TOOLS_PACKAGES: &[&str] = &[
    "ddgs",
    "duckduckgo_search",
    "yfinance",
    "exa_py",
    "newspaper4k",
    "lxml_html_clean",
    "sqlalchemy",
    "duckdb",
];

const COMMON_TOOLS_HINT: &str = "pip install agentos-serve[common-tools]";

/// Package name (as it appears in a failure) -> runtime extra.
const PACKAGE_TO_EXTRA: &[(&str, &str)] = &[
    // Model providers
    ("openai", "openai"),
    ("anthropic", "anthropic"),
    ("google.genai", "google"),
    ("google_genai", "google"),
    ("groq", "groq"),
    ("mistralai", "mistral"),
    ("cohere", "cohere"),
    ("ollama", "ollama"),
    // Individual tool extras
    ("mcp", "mcp"),
    ("fal_client", "fal"),
    ("firecrawl", "firecrawl"),
    ("PyGithub", "github"),
    ("crawl4ai", "crawl4ai"),
];

static NO_MODULE_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)no module named '([^']+)'").expect("static pattern is valid")
});

/// 根據載入失敗訊息推測缺少的套件，回傳安裝建議
pub fn install_hint(message: &str) -> Option<String> {
    if COMMON_TOOLS_PACKAGES.iter().any(|pkg| message.contains(pkg)) {
        return Some(COMMON_TOOLS_HINT.to_string());
    }

    if let Some((_, extra)) = PACKAGE_TO_EXTRA.iter().find(|(pkg, _)| message.contains(pkg)) {
        return Some(format!("pip install agno[{}]", extra));
    }

    let caps = NO_MODULE_NAMED.captures(message)?;
    let module = caps[1].split('.').next().unwrap_or_default();
    if module.is_empty() {
        return None;
    }
    Some(format!("pip install {}", module))
}
