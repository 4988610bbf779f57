//! Owned description of a multipart body, built from a draft and only turned
//! into a `reqwest` form when it is sent.

use std::path::PathBuf;

use futures::future::try_join_all;
use reqwest::multipart::{Form, Part};

use crate::{error::ClientError, forms::attachments::Attachment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime_type: String,
        path: PathBuf,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartUpload {
    parts: Vec<FormPart>,
}

impl MultipartUpload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.parts.push(FormPart::Text {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn flag(&mut self, name: &str, value: bool) -> &mut Self {
        self.text(name, if value { "true" } else { "false" })
    }

    pub fn repeated<I, S>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.text(name, value);
        }
        self
    }

    /// Adds a binary part for `attachment`, generating `<prefix>_<uuid>.jpg`
    /// when the attachment has no file name of its own.
    pub fn file(&mut self, name: &str, attachment: &Attachment, prefix: &str) -> &mut Self {
        self.parts.push(FormPart::File {
            name: name.to_string(),
            file_name: attachment.upload_name(prefix),
            mime_type: attachment.upload_mime().to_string(),
            path: attachment.path.clone(),
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Every text value sent under `name`, in order.
    pub fn text_values(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.text_values(name).into_iter().next()
    }

    pub fn file_count(&self, name: &str) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, FormPart::File { name: n, .. } if n == name))
            .count()
    }

    /// Reads every attachment from disk concurrently; a single unreadable
    /// file fails the whole upload before anything is sent. Part order is
    /// preserved.
    pub async fn into_form(self) -> Result<Form, ClientError> {
        let parts = try_join_all(self.parts.into_iter().map(load_part)).await?;
        Ok(parts
            .into_iter()
            .fold(Form::new(), |form, (name, part)| form.part(name, part)))
    }
}

async fn load_part(part: FormPart) -> Result<(String, Part), ClientError> {
    match part {
        FormPart::Text { name, value } => Ok((name, Part::text(value))),
        FormPart::File {
            name,
            file_name,
            mime_type,
            path,
        } => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| ClientError::Io {
                    path: path.clone(),
                    source,
                })?;
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(&mime_type)
                .map_err(|e| ClientError::InvalidAttachment {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            Ok((name, part))
        }
    }
}
