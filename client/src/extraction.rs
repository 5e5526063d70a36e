//! Extraction request configuration.
//!
//! Extraction posts a document the caller already has and asks the API to
//! pull structured data out of it, using a saved template, an inline
//! template, or an LLM prompt. The document travels as the request body;
//! everything else is a query parameter.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::error::ExtractionConfigError;

/// Compression applied to the posted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Zstd,
    Deflate,
}

impl CompressionFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionFormat::Gzip => "gzip",
            CompressionFormat::Zstd => "zstd",
            CompressionFormat::Deflate => "deflate",
        }
    }
}

/// One extraction job: the document, its content type, and the extraction
/// strategy.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    body: Vec<u8>,
    content_type: String,
    url: Option<String>,
    charset: Option<String>,
    template: Option<String>,
    ephemeral_template: Option<Value>,
    extraction_prompt: Option<String>,
    extraction_model: Option<String>,
    is_document_compressed: Option<bool>,
    document_compression_format: Option<CompressionFormat>,
    webhook: Option<String>,
}

impl ExtractionConfig {
    #[must_use]
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            url: None,
            charset: None,
            template: None,
            ephemeral_template: None,
            extraction_prompt: None,
            extraction_model: None,
            is_document_compressed: None,
            document_compression_format: None,
            webhook: None,
        }
    }

    /// The document posted to the endpoint.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Content type of the posted document, e.g. `"text/html"`.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// URL the document came from. Improves relative link resolution.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Saved extraction template name. Mutually exclusive with
    /// [`with_ephemeral_template`](Self::with_ephemeral_template).
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Inline extraction template declared for this job only. Mutually
    /// exclusive with [`with_template`](Self::with_template).
    #[must_use]
    pub fn with_ephemeral_template(mut self, template: Value) -> Self {
        self.ephemeral_template = Some(template);
        self
    }

    /// Free-form instruction for LLM extraction.
    #[must_use]
    pub fn with_extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.extraction_prompt = Some(prompt.into());
        self
    }

    /// Model backing LLM extraction.
    #[must_use]
    pub fn with_extraction_model(mut self, model: impl Into<String>) -> Self {
        self.extraction_model = Some(model.into());
        self
    }

    /// Whether the posted document is already compressed.
    #[must_use]
    pub fn with_is_document_compressed(mut self, compressed: bool) -> Self {
        self.is_document_compressed = Some(compressed);
        self
    }

    #[must_use]
    pub fn with_document_compression_format(mut self, format: CompressionFormat) -> Self {
        self.document_compression_format = Some(format);
        self
    }

    /// Deliver the result to a webhook registered under this name.
    #[must_use]
    pub fn with_webhook(mut self, webhook: impl Into<String>) -> Self {
        self.webhook = Some(webhook.into());
        self
    }

    /// Render this config as extraction endpoint query parameters.
    ///
    /// The document itself is not a parameter; send it as the request
    /// body. Compression options only validate here, the API reads the
    /// actual encoding from the document.
    pub fn to_api_params(&self, key: &str) -> Result<BTreeMap<String, String>, ExtractionConfigError> {
        let mut params = BTreeMap::new();
        params.insert("key".to_string(), key.to_string());
        params.insert("content_type".to_string(), self.content_type.clone());

        if let Some(url) = &self.url {
            params.insert("url".to_string(), url.clone());
        }
        if let Some(charset) = &self.charset {
            params.insert("charset".to_string(), charset.clone());
        }

        if self.template.is_some() && self.ephemeral_template.is_some() {
            return Err(ExtractionConfigError::new(
                "template and ephemeral_template are mutually exclusive, set only one of them",
            ));
        }
        if let Some(template) = &self.template {
            params.insert("extraction_template".to_string(), template.clone());
        }
        if let Some(template) = &self.ephemeral_template {
            let encoded = serde_json::to_string(template).map_err(|error| {
                ExtractionConfigError::new(format!("cannot serialize ephemeral_template: {error}"))
            })?;
            params.insert(
                "extraction_template".to_string(),
                format!("ephemeral:{}", URL_SAFE_NO_PAD.encode(encoded)),
            );
        }

        if let Some(prompt) = &self.extraction_prompt {
            params.insert("extraction_prompt".to_string(), prompt.clone());
        }
        if let Some(model) = &self.extraction_model {
            params.insert("extraction_model".to_string(), model.clone());
        }

        if let Some(format) = self.document_compression_format {
            match self.is_document_compressed {
                None => {
                    return Err(ExtractionConfigError::new(
                        "document_compression_format requires is_document_compressed \
                         to state whether the document is already compressed",
                    ));
                }
                Some(false) => {
                    return Err(ExtractionConfigError::new(format!(
                        "automatic {} compression is not supported, \
                         compress the document before passing it",
                        format.as_str()
                    )));
                }
                Some(true) => {}
            }
        }

        if let Some(webhook) = &self.webhook {
            params.insert("webhook_name".to_string(), webhook.clone());
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "1234";

    const PRODUCT_HTML: &str = "<html><body><h1>Product</h1></body></html>";

    #[test]
    fn minimal_config_renders_key_and_content_type_only() {
        let params = ExtractionConfig::new(PRODUCT_HTML, "text/html")
            .to_api_params(KEY)
            .unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["key"], "1234");
        assert_eq!(params["content_type"], "text/html");
        assert!(!params.contains_key("body"));
    }

    #[test]
    fn saved_template_renders_by_name() {
        let params = ExtractionConfig::new(PRODUCT_HTML, "text/html")
            .with_template("product_listing")
            .to_api_params(KEY)
            .unwrap();
        assert_eq!(params["extraction_template"], "product_listing");
    }

    #[test]
    fn ephemeral_template_renders_as_prefixed_base64() {
        let template = json!({ "source": "html", "selectors": [] });
        let params = ExtractionConfig::new(PRODUCT_HTML, "text/html")
            .with_ephemeral_template(template.clone())
            .to_api_params(KEY)
            .unwrap();
        let rendered = &params["extraction_template"];
        let encoded = rendered
            .strip_prefix("ephemeral:")
            .expect("inline templates carry the ephemeral prefix");
        let decoded: Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, template);
    }

    #[test]
    fn saved_and_ephemeral_templates_are_mutually_exclusive() {
        let error = ExtractionConfig::new(PRODUCT_HTML, "text/html")
            .with_template("product_listing")
            .with_ephemeral_template(json!({ "selectors": [] }))
            .to_api_params(KEY)
            .unwrap_err();
        assert!(error.message().contains("mutually exclusive"));
    }

    #[test]
    fn compression_format_requires_the_compressed_flag() {
        let error = ExtractionConfig::new(PRODUCT_HTML, "text/html")
            .with_document_compression_format(CompressionFormat::Gzip)
            .to_api_params(KEY)
            .unwrap_err();
        assert!(error.message().contains("is_document_compressed"));
    }

    #[test]
    fn uncompressed_documents_cannot_declare_a_format() {
        let error = ExtractionConfig::new(PRODUCT_HTML, "text/html")
            .with_document_compression_format(CompressionFormat::Zstd)
            .with_is_document_compressed(false)
            .to_api_params(KEY)
            .unwrap_err();
        assert!(error.message().contains("zstd"));
    }

    #[test]
    fn compressed_documents_validate_without_extra_params() {
        let params = ExtractionConfig::new(&b"\x1f\x8bderived"[..], "text/html")
            .with_document_compression_format(CompressionFormat::Gzip)
            .with_is_document_compressed(true)
            .to_api_params(KEY)
            .unwrap();
        assert!(!params.contains_key("document_compression_format"));
        assert!(!params.contains_key("is_document_compressed"));
    }

    #[test]
    fn optional_fields_render() {
        let params = ExtractionConfig::new(PRODUCT_HTML, "text/html")
            .with_url("https://web-scraping.dev/products?page=2")
            .with_charset("utf-8")
            .with_extraction_prompt("list the product names")
            .with_extraction_model("product-parser")
            .with_webhook("my-hook")
            .to_api_params(KEY)
            .unwrap();
        assert_eq!(params["url"], "https://web-scraping.dev/products?page=2");
        assert_eq!(params["charset"], "utf-8");
        assert_eq!(params["extraction_prompt"], "list the product names");
        assert_eq!(params["extraction_model"], "product-parser");
        assert_eq!(params["webhook_name"], "my-hook");
    }
}
