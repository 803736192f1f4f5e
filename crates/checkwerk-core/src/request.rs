// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Check requests and their immutable builders.
//
// Request construction is pure: nothing here touches the network.  Reading
// document bytes from disk is a separate step (`ContentSource::from_file`).

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CheckwerkError, Result};
use crate::types::{ContentEncoding, ReportType};

/// Content format for plain text.
pub const CONTENT_FORMAT_TEXT: &str = "TEXT";

/// Let the platform infer the format from the content reference.
pub const CONTENT_FORMAT_AUTO: &str = "AUTO";

/// Purpose of a check, used by the platform for analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckType {
    Batch,
    Interactive,
    Baseline,
    Automated,
}

/// Options sent along with a check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_profile_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub report_types: Vec<ReportType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_type: Option<CheckType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

impl CheckOptions {
    pub fn builder() -> CheckOptionsBuilder {
        CheckOptionsBuilder::default()
    }
}

/// Builder for [`CheckOptions`].  Each `with_*` call consumes and returns
/// the builder.
#[derive(Debug, Clone, Default)]
pub struct CheckOptionsBuilder {
    options: CheckOptions,
}

impl CheckOptionsBuilder {
    pub fn with_guidance_profile_id(mut self, id: impl Into<String>) -> Self {
        self.options.guidance_profile_id = Some(id.into());
        self
    }

    pub fn with_content_format(mut self, format: impl Into<String>) -> Self {
        self.options.content_format = Some(format.into());
        self
    }

    pub fn with_report_types(mut self, report_types: impl IntoIterator<Item = ReportType>) -> Self {
        self.options.report_types = report_types.into_iter().collect();
        self
    }

    pub fn with_check_type(mut self, check_type: CheckType) -> Self {
        self.options.check_type = Some(check_type);
        self
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.options.batch_id = Some(batch_id.into());
        self
    }

    pub fn build(self) -> CheckOptions {
        self.options
    }
}

/// An immutable, ready-to-submit check request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    content: String,
    content_encoding: ContentEncoding,
    content_reference: Option<String>,
    check_options: CheckOptions,
}

impl CheckRequest {
    /// Start building a request around already-encoded document content.
    pub fn of_document_content(content: impl Into<String>) -> CheckRequestBuilder {
        CheckRequestBuilder {
            content: content.into(),
            content_encoding: ContentEncoding::None,
            content_reference: None,
            check_options: CheckOptions::default(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_encoding(&self) -> ContentEncoding {
        self.content_encoding
    }

    pub fn content_reference(&self) -> Option<&str> {
        self.content_reference.as_deref()
    }

    pub fn check_options(&self) -> &CheckOptions {
        &self.check_options
    }
}

/// Builder for [`CheckRequest`].
#[derive(Debug, Clone)]
pub struct CheckRequestBuilder {
    content: String,
    content_encoding: ContentEncoding,
    content_reference: Option<String>,
    check_options: CheckOptions,
}

impl CheckRequestBuilder {
    pub fn with_content_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.content_encoding = encoding;
        self
    }

    /// Reference (usually a file name) the platform can infer the content
    /// format from.
    pub fn with_content_reference(mut self, reference: impl Into<String>) -> Self {
        self.content_reference = Some(reference.into());
        self
    }

    pub fn with_check_options(mut self, options: CheckOptions) -> Self {
        self.check_options = options;
        self
    }

    /// Finish the request.
    ///
    /// Without a content reference the platform cannot infer how to parse
    /// the payload, so a content format is then required.
    pub fn build(self) -> Result<CheckRequest> {
        let has_format = self
            .check_options
            .content_format
            .as_deref()
            .is_some_and(|f| !f.trim().is_empty());
        let has_reference = self
            .content_reference
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());

        if !has_format && !has_reference {
            return Err(CheckwerkError::InvalidRequest(
                "a content format is required when no content reference is given".into(),
            ));
        }

        Ok(CheckRequest {
            content: self.content,
            content_encoding: self.content_encoding,
            content_reference: self.content_reference,
            check_options: self.check_options,
        })
    }
}

/// Where the document content of a check comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Literal text with an explicit content format (e.g. `TEXT`).
    Text { text: String, format: String },
    /// Raw document bytes; the format is inferred from `reference`.
    Bytes { bytes: Vec<u8>, reference: String },
}

impl ContentSource {
    pub fn text(text: impl Into<String>, format: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            format: format.into(),
        }
    }

    pub fn bytes(bytes: Vec<u8>, reference: impl Into<String>) -> Self {
        Self::Bytes {
            bytes,
            reference: reference.into(),
        }
    }

    /// Read a document from disk, using its file name as the reference.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let reference = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CheckwerkError::InvalidRequest(format!(
                    "'{}' has no file name to use as content reference",
                    path.display()
                ))
            })?;
        debug!(reference = %reference, size = bytes.len(), "read document from disk");
        Ok(Self::Bytes { bytes, reference })
    }
}

/// Combine a content source with check options into a request.
///
/// Text is kept verbatim and its format overrides any format in
/// `options`.  Bytes are base64-encoded and carry their reference; an
/// explicit format in `options` (such as `AUTO`) is kept as given.
pub fn build_request(source: ContentSource, options: CheckOptions) -> Result<CheckRequest> {
    match source {
        ContentSource::Text { text, format } => {
            let options = CheckOptions {
                content_format: Some(format),
                ..options
            };
            CheckRequest::of_document_content(text)
                .with_check_options(options)
                .build()
        }
        ContentSource::Bytes { bytes, reference } => {
            CheckRequest::of_document_content(STANDARD.encode(&bytes))
                .with_content_encoding(ContentEncoding::Base64)
                .with_content_reference(reference)
                .with_check_options(options)
                .build()
        }
    }
}
