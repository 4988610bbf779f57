use std::path::{Path, PathBuf};

use super::FormError;

/// Selection limit shared by every photo picker.
pub const MAX_ATTACHMENTS: usize = 5;

const DEFAULT_MIME: &str = "image/jpeg";

/// A local image picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl Attachment {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            path: path.to_path_buf(),
            mime_type: mime_guess::from_path(path)
                .first()
                .map(|mime| mime.essence_str().to_string()),
            file_name: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string),
        }
    }

    pub fn upload_name(&self, prefix: &str) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("{prefix}_{}.jpg", uuid::Uuid::new_v4().simple()))
    }

    pub fn upload_mime(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Photo {
    /// Already stored by the service; only its URL is known.
    Remote(String),
    Local(Attachment),
}

/// Ordered photo selection. Stored photos are all kept, even past
/// [`MAX_ATTACHMENTS`]; new ones are only accepted below the cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments {
    items: Vec<Photo>,
}

impl Attachments {
    pub fn from_remote(urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            items: urls
                .into_iter()
                .map(Photo::Remote)
                .collect(),
        }
    }

    pub fn add(&mut self, attachment: Attachment) -> Result<(), FormError> {
        if self.items.len() >= MAX_ATTACHMENTS {
            return Err(FormError::AttachmentLimit {
                max: MAX_ATTACHMENTS,
            });
        }
        self.items.push(Photo::Local(attachment));
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Photo, FormError> {
        if index >= self.items.len() {
            return Err(FormError::AttachmentIndex {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remaining(&self) -> usize {
        MAX_ATTACHMENTS.saturating_sub(self.items.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Photo> {
        self.items.iter()
    }

    pub fn local(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter().filter_map(|photo| match photo {
            Photo::Local(attachment) => Some(attachment),
            Photo::Remote(_) => None,
        })
    }

    pub fn remote(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|photo| match photo {
            Photo::Remote(url) => Some(url.as_str()),
            Photo::Local(_) => None,
        })
    }
}
