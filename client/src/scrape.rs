//! Scrape request configuration.
//!
//! [`ScrapeConfig`] collects every option the scrape endpoint accepts and
//! renders them as query parameters with [`ScrapeConfig::to_api_params`].
//! Rendering is deterministic: the same config always produces the same
//! parameter map, and rendering never mutates the config.
//!
//! Options gated on a feature flag (browser rendering, caching, sessions)
//! are dropped with a warning when the flag is off, mirroring the API's
//! own behavior instead of failing the whole request.
//!
//! ```ignore
//! let config = ScrapeConfig::new("https://web-scraping.dev/products")
//!     .with_asp(true)
//!     .with_country("us")
//!     .with_render_js(true)
//!     .with_wait_for_selector(".products");
//! let result = client.scrape(config).await?;
//! ```

use std::collections::{BTreeMap, BTreeSet};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Method;
use serde_json::Value;

use crate::error::ScrapeConfigError;

/// Shared datacenter proxy pool name.
pub const PUBLIC_DATACENTER_POOL: &str = "public_datacenter_pool";
/// Shared residential proxy pool name.
pub const PUBLIC_RESIDENTIAL_POOL: &str = "public_residential_pool";

/// Server-side content conversion applied to the scraped page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Json,
    Text,
    Markdown,
    CleanHtml,
    Raw,
}

impl ContentFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentFormat::Json => "json",
            ContentFormat::Text => "text",
            ContentFormat::Markdown => "markdown",
            ContentFormat::CleanHtml => "clean_html",
            ContentFormat::Raw => "raw",
        }
    }
}

/// Capture behavior applied to the screenshots taken during a scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotFlag {
    LoadImages,
    DarkMode,
    BlockBanners,
    HighQuality,
    PrintMediaFormat,
}

impl ScreenshotFlag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenshotFlag::LoadImages => "load_images",
            ScreenshotFlag::DarkMode => "dark_mode",
            ScreenshotFlag::BlockBanners => "block_banners",
            ScreenshotFlag::HighQuality => "high_quality",
            ScreenshotFlag::PrintMediaFormat => "print_media_format",
        }
    }
}

/// One scrape job: the target URL plus every API option.
///
/// Header and cookie names are lowercased on insert so duplicates that
/// differ only in case collapse to one entry.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    url: String,
    method: Method,
    retry: bool,
    country: Option<String>,
    render_js: bool,
    cache: bool,
    cache_clear: bool,
    cache_ttl: Option<u64>,
    ssl: bool,
    dns: bool,
    asp: bool,
    debug: bool,
    proxy_pool: Option<String>,
    session: Option<String>,
    session_sticky_proxy: bool,
    tags: BTreeSet<String>,
    correlation_id: Option<String>,
    cookies: BTreeMap<String, String>,
    body: Option<String>,
    data: Option<Value>,
    headers: BTreeMap<String, String>,
    js: Option<String>,
    js_scenario: Option<Value>,
    rendering_wait: Option<u64>,
    wait_for_selector: Option<String>,
    screenshots: BTreeMap<String, String>,
    screenshot_flags: Vec<ScreenshotFlag>,
    auto_scroll: Option<bool>,
    webhook: Option<String>,
    timeout: Option<u64>,
    format: Option<ContentFormat>,
    format_options: Vec<String>,
    lang: Vec<String>,
    os: Option<String>,
}

impl ScrapeConfig {
    /// A GET scrape of `url` with API-side retries enabled and every other
    /// option off.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            retry: true,
            country: None,
            render_js: false,
            cache: false,
            cache_clear: false,
            cache_ttl: None,
            ssl: false,
            dns: false,
            asp: false,
            debug: false,
            proxy_pool: None,
            session: None,
            session_sticky_proxy: false,
            tags: BTreeSet::new(),
            correlation_id: None,
            cookies: BTreeMap::new(),
            body: None,
            data: None,
            headers: BTreeMap::new(),
            js: None,
            js_scenario: None,
            rendering_wait: None,
            wait_for_selector: None,
            screenshots: BTreeMap::new(),
            screenshot_flags: Vec::new(),
            auto_scroll: None,
            webhook: None,
            timeout: None,
            format: None,
            format_options: Vec::new(),
            lang: Vec::new(),
            os: None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// API-side retries for this job. On by default.
    #[must_use]
    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    /// Proxy geolocation, e.g. `"us"` or a weighted spread like
    /// `"us:1,ca:5,mx:3,-gb"`. Passed to the API verbatim.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Render the page in a headless browser before returning content.
    #[must_use]
    pub fn with_render_js(mut self, render_js: bool) -> Self {
        self.render_js = render_js;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_cache_clear(mut self, cache_clear: bool) -> Self {
        self.cache_clear = cache_clear;
        self
    }

    /// Cache entry lifetime in seconds.
    #[must_use]
    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    #[must_use]
    pub fn with_dns(mut self, dns: bool) -> Self {
        self.dns = dns;
        self
    }

    /// Anti-scraping-protection bypass.
    #[must_use]
    pub fn with_asp(mut self, asp: bool) -> Self {
        self.asp = asp;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Proxy pool to draw from, e.g. [`PUBLIC_RESIDENTIAL_POOL`].
    #[must_use]
    pub fn with_proxy_pool(mut self, pool: impl Into<String>) -> Self {
        self.proxy_pool = Some(pool.into());
        self
    }

    /// Session name. Jobs sharing a session reuse cookies and, with
    /// [`with_session_sticky_proxy`](Self::with_session_sticky_proxy), the
    /// same proxy.
    #[must_use]
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    #[must_use]
    pub fn with_session_sticky_proxy(mut self, sticky: bool) -> Self {
        self.session_sticky_proxy = sticky;
        self
    }

    /// Tag the job for dashboard filtering. Repeatable.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Cookie sent to the target. Merged into the `cookie` header when
    /// parameters are rendered. Repeatable; names are lowercased.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Raw request body. Mutually exclusive with [`with_data`](Self::with_data).
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Structured request body, encoded according to the `content-type`
    /// header (form-urlencoded by default). Mutually exclusive with
    /// [`with_body`](Self::with_body).
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Header sent to the target. Repeatable; names are lowercased.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// JavaScript to execute in the rendered page. Requires
    /// [`with_render_js`](Self::with_render_js).
    #[must_use]
    pub fn with_js(mut self, js: impl Into<String>) -> Self {
        self.js = Some(js.into());
        self
    }

    /// Declarative browser scenario (waits, clicks, scripts) executed in
    /// order. Requires [`with_render_js`](Self::with_render_js).
    #[must_use]
    pub fn with_js_scenario(mut self, scenario: Value) -> Self {
        self.js_scenario = Some(scenario);
        self
    }

    /// Milliseconds to wait after the page load before capturing content.
    #[must_use]
    pub fn with_rendering_wait(mut self, milliseconds: u64) -> Self {
        self.rendering_wait = Some(milliseconds);
        self
    }

    /// CSS selector the browser waits for before capturing content.
    #[must_use]
    pub fn with_wait_for_selector(mut self, selector: impl Into<String>) -> Self {
        self.wait_for_selector = Some(selector.into());
        self
    }

    /// Named screenshot of `target`, either `"fullpage"` or a CSS selector.
    /// Repeatable.
    #[must_use]
    pub fn with_screenshot(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.screenshots.insert(name.into(), target.into());
        self
    }

    /// Capture flag applied to this job's screenshots. Repeatable; order is
    /// preserved.
    #[must_use]
    pub fn with_screenshot_flag(mut self, flag: ScreenshotFlag) -> Self {
        self.screenshot_flags.push(flag);
        self
    }

    #[must_use]
    pub fn with_auto_scroll(mut self, auto_scroll: bool) -> Self {
        self.auto_scroll = Some(auto_scroll);
        self
    }

    /// Deliver the result to a webhook registered under this name instead
    /// of the response body.
    #[must_use]
    pub fn with_webhook(mut self, webhook: impl Into<String>) -> Self {
        self.webhook = Some(webhook.into());
        self
    }

    /// API-side timeout for the whole job, in milliseconds.
    #[must_use]
    pub fn with_timeout(mut self, milliseconds: u64) -> Self {
        self.timeout = Some(milliseconds);
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: ContentFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Modifier appended to the format, e.g. `"no_links"`. Repeatable.
    #[must_use]
    pub fn with_format_option(mut self, option: impl Into<String>) -> Self {
        self.format_options.push(option.into());
        self
    }

    /// Preferred content language. Repeatable; order is preserved.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang.push(lang.into());
        self
    }

    /// Operating system the browser fingerprint should claim.
    #[must_use]
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    /// Resolve the outbound headers and body.
    ///
    /// `data` is converted to a body here: form-urlencoded when no
    /// `content-type` header is set, otherwise according to that header.
    /// A plain `body` gets a `text/plain` content type only when none was
    /// set. Fails when both `body` and `data` are present or the declared
    /// content type cannot encode structured data.
    pub(crate) fn prepared_headers_and_body(
        &self,
    ) -> Result<(BTreeMap<String, String>, Option<String>), ScrapeConfigError> {
        if self.body.is_some() && self.data.is_some() {
            return Err(ScrapeConfigError::new(
                "body and data are mutually exclusive, set only one of them",
            ));
        }
        let mut headers = self.headers.clone();
        let mut body = self.body.clone();

        let writes_body = self.method == Method::POST
            || self.method == Method::PUT
            || self.method == Method::PATCH;
        if writes_body {
            if let Some(data) = &self.data {
                match headers.get("content-type").map(String::as_str) {
                    None => {
                        headers.insert(
                            "content-type".to_string(),
                            "application/x-www-form-urlencoded".to_string(),
                        );
                        body = Some(form_encode(data));
                    }
                    Some(content_type) if content_type.contains("application/json") => {
                        let encoded = serde_json::to_string(data).map_err(|error| {
                            ScrapeConfigError::new(format!(
                                "cannot serialize data as JSON: {error}"
                            ))
                        })?;
                        body = Some(encoded);
                    }
                    Some(content_type)
                        if content_type.contains("application/x-www-form-urlencoded") =>
                    {
                        body = Some(form_encode(data));
                    }
                    Some(content_type) => {
                        return Err(ScrapeConfigError::new(format!(
                            "content-type \"{content_type}\" cannot encode the data option, \
                             use application/json or application/x-www-form-urlencoded"
                        )));
                    }
                }
            } else if body.is_some() && !headers.contains_key("content-type") {
                headers.insert("content-type".to_string(), "text/plain".to_string());
            }
        }

        Ok((headers, body))
    }

    /// Render this config as scrape endpoint query parameters.
    ///
    /// Options that need a disabled feature flag are dropped with a
    /// warning rather than failing the request. The output is sorted and
    /// stable, so equal configs always render equal maps.
    pub fn to_api_params(&self, key: &str) -> Result<BTreeMap<String, String>, ScrapeConfigError> {
        let (mut headers, _) = self.prepared_headers_and_body()?;

        let mut params = BTreeMap::new();
        params.insert("key".to_string(), key.to_string());
        params.insert("url".to_string(), self.url.clone());
        if let Some(country) = &self.country {
            params.insert("country".to_string(), country.clone());
        }

        if !self.cookies.is_empty() {
            let rendered = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            match headers.get_mut("cookie") {
                Some(existing) => {
                    if !existing.ends_with(';') {
                        existing.push(';');
                    }
                    existing.push(' ');
                    existing.push_str(&rendered);
                }
                None => {
                    headers.insert("cookie".to_string(), rendered);
                }
            }
        }
        for (name, value) in &headers {
            params.insert(format!("headers[{name}]"), value.clone());
        }

        if let Some(webhook) = &self.webhook {
            params.insert("webhook_name".to_string(), webhook.clone());
        }
        if let Some(timeout) = self.timeout {
            params.insert("timeout".to_string(), timeout.to_string());
        }

        if self.render_js {
            params.insert("render_js".to_string(), "true".to_string());
            if let Some(selector) = &self.wait_for_selector {
                params.insert("wait_for_selector".to_string(), selector.clone());
            }
            if let Some(js) = &self.js {
                params.insert("js".to_string(), URL_SAFE_NO_PAD.encode(js));
            }
            if let Some(scenario) = &self.js_scenario {
                let encoded = serde_json::to_string(scenario).map_err(|error| {
                    ScrapeConfigError::new(format!("cannot serialize js_scenario: {error}"))
                })?;
                params.insert("js_scenario".to_string(), URL_SAFE_NO_PAD.encode(encoded));
            }
            if let Some(wait) = self.rendering_wait {
                params.insert("rendering_wait".to_string(), wait.to_string());
            }
            for (name, target) in &self.screenshots {
                params.insert(format!("screenshots[{name}]"), target.clone());
            }
            if !self.screenshot_flags.is_empty() {
                let flags = self
                    .screenshot_flags
                    .iter()
                    .map(|flag| flag.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                params.insert("screenshot_flags".to_string(), flags);
            }
            if let Some(auto_scroll) = self.auto_scroll {
                params.insert("auto_scroll".to_string(), auto_scroll.to_string());
            }
        } else {
            let ignored = [
                ("wait_for_selector", self.wait_for_selector.is_some()),
                ("screenshots", !self.screenshots.is_empty()),
                ("screenshot_flags", !self.screenshot_flags.is_empty()),
                ("js_scenario", self.js_scenario.is_some()),
                ("js", self.js.is_some()),
                ("rendering_wait", self.rendering_wait.is_some()),
            ];
            for (name, set) in ignored {
                if set {
                    tracing::warn!(param = name, "option ignored, requires render_js");
                }
            }
        }

        if self.asp {
            params.insert("asp".to_string(), "true".to_string());
        }
        if !self.retry {
            params.insert("retry".to_string(), "false".to_string());
        }

        if self.cache {
            params.insert("cache".to_string(), "true".to_string());
            if self.cache_clear {
                params.insert("cache_clear".to_string(), "true".to_string());
            }
            if let Some(ttl) = self.cache_ttl {
                params.insert("cache_ttl".to_string(), ttl.to_string());
            }
        } else {
            if self.cache_clear {
                tracing::warn!(param = "cache_clear", "option ignored, requires cache");
            }
            if self.cache_ttl.is_some() {
                tracing::warn!(param = "cache_ttl", "option ignored, requires cache");
            }
        }

        if self.dns {
            params.insert("dns".to_string(), "true".to_string());
        }
        if self.ssl {
            params.insert("ssl".to_string(), "true".to_string());
        }
        if !self.tags.is_empty() {
            let tags = self.tags.iter().cloned().collect::<Vec<_>>().join(",");
            params.insert("tags".to_string(), tags);
        }
        if let Some(correlation_id) = &self.correlation_id {
            params.insert("correlation_id".to_string(), correlation_id.clone());
        }

        if let Some(session) = &self.session {
            params.insert("session".to_string(), session.clone());
            if self.session_sticky_proxy {
                params.insert("session_sticky_proxy".to_string(), "true".to_string());
            }
        } else if self.session_sticky_proxy {
            tracing::warn!(
                param = "session_sticky_proxy",
                "option ignored, requires session"
            );
        }

        if self.debug {
            params.insert("debug".to_string(), "true".to_string());
        }
        if let Some(pool) = &self.proxy_pool {
            params.insert("proxy_pool".to_string(), pool.clone());
        }
        if let Some(format) = self.format {
            let mut rendered = format.as_str().to_string();
            if !self.format_options.is_empty() {
                rendered.push(':');
                rendered.push_str(&self.format_options.join(","));
            }
            params.insert("format".to_string(), rendered);
        }
        if !self.lang.is_empty() {
            params.insert("lang".to_string(), self.lang.join(","));
        }
        if let Some(os) = &self.os {
            params.insert("os".to_string(), os.clone());
        }

        Ok(params)
    }
}

/// Encode a JSON object as `application/x-www-form-urlencoded`.
///
/// Non-string values keep their JSON rendering, so numbers and booleans
/// encode without quotes.
fn form_encode(data: &Value) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    if let Some(map) = data.as_object() {
        for (key, value) in map {
            serializer.append_pair(key, &json_value_as_string(value));
        }
    }
    serializer.finish()
}

fn json_value_as_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
