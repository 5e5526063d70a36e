//! Screenshot request configuration.
//!
//! The screenshot endpoint is a trimmed-down scrape: it always renders the
//! page in a browser and returns binary image data instead of a scrape
//! envelope. Options are enumerated, so rendering parameters cannot fail.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Image encoding for the captured screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotFormat {
    Jpg,
    Png,
    Webp,
    Gif,
}

impl ScreenshotFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenshotFormat::Jpg => "jpg",
            ScreenshotFormat::Png => "png",
            ScreenshotFormat::Webp => "webp",
            ScreenshotFormat::Gif => "gif",
        }
    }
}

/// Browser behavior toggles applied while capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotOption {
    LoadImages,
    DarkMode,
    BlockBanners,
    PrintMediaFormat,
}

impl ScreenshotOption {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenshotOption::LoadImages => "load_images",
            ScreenshotOption::DarkMode => "dark_mode",
            ScreenshotOption::BlockBanners => "block_banners",
            ScreenshotOption::PrintMediaFormat => "print_media_format",
        }
    }
}

/// One screenshot job: the target URL plus capture options.
#[derive(Debug, Clone)]
pub struct ScreenshotConfig {
    url: String,
    format: Option<ScreenshotFormat>,
    capture: Option<String>,
    resolution: Option<String>,
    country: Option<String>,
    timeout: Option<u64>,
    rendering_wait: Option<u64>,
    wait_for_selector: Option<String>,
    options: Vec<ScreenshotOption>,
    auto_scroll: Option<bool>,
    js: Option<String>,
    cache: bool,
    cache_ttl: Option<u64>,
    cache_clear: bool,
}

impl ScreenshotConfig {
    /// A full-page screenshot of `url` in the API's default format.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            capture: None,
            resolution: None,
            country: None,
            timeout: None,
            rendering_wait: None,
            wait_for_selector: None,
            options: Vec::new(),
            auto_scroll: None,
            js: None,
            cache: false,
            cache_ttl: None,
            cache_clear: false,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn with_format(mut self, format: ScreenshotFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Area to capture, `"fullpage"` or a CSS selector.
    #[must_use]
    pub fn with_capture(mut self, capture: impl Into<String>) -> Self {
        self.capture = Some(capture.into());
        self
    }

    /// Viewport resolution, e.g. `"1920x1080"`.
    #[must_use]
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// API-side timeout for the whole job, in milliseconds.
    #[must_use]
    pub fn with_timeout(mut self, milliseconds: u64) -> Self {
        self.timeout = Some(milliseconds);
        self
    }

    /// Milliseconds to wait after the page load before capturing.
    #[must_use]
    pub fn with_rendering_wait(mut self, milliseconds: u64) -> Self {
        self.rendering_wait = Some(milliseconds);
        self
    }

    /// CSS selector the browser waits for before capturing.
    #[must_use]
    pub fn with_wait_for_selector(mut self, selector: impl Into<String>) -> Self {
        self.wait_for_selector = Some(selector.into());
        self
    }

    /// Capture toggle such as [`ScreenshotOption::DarkMode`]. Repeatable.
    #[must_use]
    pub fn with_option(mut self, option: ScreenshotOption) -> Self {
        self.options.push(option);
        self
    }

    #[must_use]
    pub fn with_auto_scroll(mut self, auto_scroll: bool) -> Self {
        self.auto_scroll = Some(auto_scroll);
        self
    }

    /// JavaScript executed in the page before capturing.
    #[must_use]
    pub fn with_js(mut self, js: impl Into<String>) -> Self {
        self.js = Some(js.into());
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Cache entry lifetime in seconds.
    #[must_use]
    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_cache_clear(mut self, cache_clear: bool) -> Self {
        self.cache_clear = cache_clear;
        self
    }

    /// Render this config as screenshot endpoint query parameters.
    #[must_use]
    pub fn to_api_params(&self, key: &str) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("key".to_string(), key.to_string());
        params.insert("url".to_string(), self.url.clone());
        if let Some(format) = self.format {
            params.insert("format".to_string(), format.as_str().to_string());
        }
        if let Some(capture) = &self.capture {
            params.insert("capture".to_string(), capture.clone());
        }
        if let Some(resolution) = &self.resolution {
            params.insert("resolution".to_string(), resolution.clone());
        }
        if let Some(country) = &self.country {
            params.insert("country".to_string(), country.clone());
        }
        if let Some(timeout) = self.timeout {
            params.insert("timeout".to_string(), timeout.to_string());
        }
        if let Some(wait) = self.rendering_wait {
            params.insert("rendering_wait".to_string(), wait.to_string());
        }
        if let Some(selector) = &self.wait_for_selector {
            params.insert("wait_for_selector".to_string(), selector.clone());
        }
        if !self.options.is_empty() {
            let rendered = self
                .options
                .iter()
                .map(|option| option.as_str())
                .collect::<Vec<_>>()
                .join(",");
            params.insert("options".to_string(), rendered);
        }
        if self.auto_scroll == Some(true) {
            params.insert("auto_scroll".to_string(), "true".to_string());
        }
        if let Some(js) = &self.js {
            params.insert("js".to_string(), URL_SAFE_NO_PAD.encode(js));
        }
        if self.cache {
            params.insert("cache".to_string(), "true".to_string());
            if let Some(ttl) = self.cache_ttl {
                params.insert("cache_ttl".to_string(), ttl.to_string());
            }
            if self.cache_clear {
                params.insert("cache_clear".to_string(), "true".to_string());
            }
        } else {
            if self.cache_ttl.is_some() {
                tracing::warn!(param = "cache_ttl", "option ignored, requires cache");
            }
            if self.cache_clear {
                tracing::warn!(param = "cache_clear", "option ignored, requires cache");
            }
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "1234";

    #[test]
    fn minimal_config_renders_key_and_url_only() {
        let params = ScreenshotConfig::new("https://web-scraping.dev/products").to_api_params(KEY);
        assert_eq!(params.len(), 2);
        assert_eq!(params["key"], "1234");
        assert_eq!(params["url"], "https://web-scraping.dev/products");
    }

    #[test]
    fn capture_options_render() {
        let params = ScreenshotConfig::new("https://web-scraping.dev/products")
            .with_format(ScreenshotFormat::Png)
            .with_capture("fullpage")
            .with_resolution("1920x1080")
            .with_rendering_wait(500)
            .with_wait_for_selector(".products")
            .to_api_params(KEY);
        assert_eq!(params["format"], "png");
        assert_eq!(params["capture"], "fullpage");
        assert_eq!(params["resolution"], "1920x1080");
        assert_eq!(params["rendering_wait"], "500");
        assert_eq!(params["wait_for_selector"], ".products");
    }

    #[test]
    fn toggles_join_with_commas() {
        let params = ScreenshotConfig::new("https://web-scraping.dev/products")
            .with_option(ScreenshotOption::LoadImages)
            .with_option(ScreenshotOption::DarkMode)
            .to_api_params(KEY);
        assert_eq!(params["options"], "load_images,dark_mode");
    }

    #[test]
    fn auto_scroll_renders_only_when_enabled() {
        let off = ScreenshotConfig::new("https://web-scraping.dev/products")
            .with_auto_scroll(false)
            .to_api_params(KEY);
        assert!(!off.contains_key("auto_scroll"));

        let on = ScreenshotConfig::new("https://web-scraping.dev/products")
            .with_auto_scroll(true)
            .to_api_params(KEY);
        assert_eq!(on["auto_scroll"], "true");
    }

    #[test]
    fn js_is_urlsafe_base64_of_the_script() {
        let script = "window.scrollTo(0, document.body.scrollHeight)";
        let params = ScreenshotConfig::new("https://web-scraping.dev/products")
            .with_js(script)
            .to_api_params(KEY);
        let decoded = URL_SAFE_NO_PAD.decode(&params["js"]).unwrap();
        assert_eq!(decoded, script.as_bytes());
    }

    #[test]
    fn cache_options_require_cache() {
        let without = ScreenshotConfig::new("https://web-scraping.dev/products")
            .with_cache_ttl(3600)
            .with_cache_clear(true)
            .to_api_params(KEY);
        assert!(!without.contains_key("cache"));
        assert!(!without.contains_key("cache_ttl"));
        assert!(!without.contains_key("cache_clear"));

        let with = ScreenshotConfig::new("https://web-scraping.dev/products")
            .with_cache(true)
            .with_cache_ttl(3600)
            .with_cache_clear(true)
            .to_api_params(KEY);
        assert_eq!(with["cache"], "true");
        assert_eq!(with["cache_ttl"], "3600");
        assert_eq!(with["cache_clear"], "true");
    }
}
