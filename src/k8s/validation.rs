// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Validation functions for WebSite fields.
//!
//! Rejects names the cluster would refuse for the derived children and image
//! references carrying shell metacharacters.

use std::sync::OnceLock;

use regex::Regex;

use super::manifests::{child_name, ChildKind};
use super::types::WebSite;

/// Maximum allowed length for string fields.
pub const MAX_FIELD_LENGTH: usize = 256;

/// Maximum length of a DNS-1123 label (namespaces, service names).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a DNS-1123 subdomain (most object names).
pub const MAX_SUBDOMAIN_LENGTH: usize = 253;

/// Validation error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Image reference is invalid.
    InvalidImage(String),
    /// Name is not a valid DNS-1123 label or subdomain.
    InvalidName { field: String, value: String },
    /// Field exceeds maximum length.
    MaxLengthExceeded { field: String, max: usize },
    /// Field is empty but required.
    EmptyField(String),
    /// Kind name not recognised.
    UnknownKind(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidImage(img) => write!(f, "Invalid image reference: {}", img),
            Self::InvalidName { field, value } => {
                write!(f, "Field '{}' is not a valid DNS-1123 name: {:?}", field, value)
            }
            Self::MaxLengthExceeded { field, max } => {
                write!(f, "Field '{}' exceeds maximum length of {}", field, max)
            }
            Self::EmptyField(field) => write!(f, "Field '{}' cannot be empty", field),
            Self::UnknownKind(kind) => write!(f, "Unknown resource kind: {}", kind),
        }
    }
}

impl std::error::Error for ValidationError {}

fn dns_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("DNS label pattern"))
}

/// Validate a DNS-1123 label (lowercase alphanumerics and dashes).
pub fn validate_label(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field_name.to_string()));
    }

    if value.len() > MAX_LABEL_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: field_name.to_string(),
            max: MAX_LABEL_LENGTH,
        });
    }

    if !dns_label().is_match(value) {
        return Err(ValidationError::InvalidName {
            field: field_name.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}

/// Validate a DNS-1123 subdomain (dot-separated labels).
pub fn validate_subdomain(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field_name.to_string()));
    }

    if value.len() > MAX_SUBDOMAIN_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: field_name.to_string(),
            max: MAX_SUBDOMAIN_LENGTH,
        });
    }

    let valid = value
        .split('.')
        .all(|part| part.len() <= MAX_LABEL_LENGTH && dns_label().is_match(part));
    if !valid {
        return Err(ValidationError::InvalidName {
            field: field_name.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}

/// Validate a container image reference.
///
/// Rejects shell metacharacters, whitespace and invalid name formats.
pub fn validate_image(image: &str) -> Result<(), ValidationError> {
    if image.is_empty() {
        return Err(ValidationError::EmptyField("imageName".to_string()));
    }

    if image.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: "imageName".to_string(),
            max: MAX_FIELD_LENGTH,
        });
    }

    let forbidden_chars = [
        ';', '&', '|', '`', '$', '(', ')', '{', '}', '<', '>', '\n', '\r', '\0', ' ', '\t',
    ];
    for ch in forbidden_chars {
        if image.contains(ch) {
            return Err(ValidationError::InvalidImage(format!(
                "contains forbidden character: {:?}",
                ch
            )));
        }
    }

    let name_part = image.rsplit_once(':').map_or(image, |(name, _)| name);

    if name_part.is_empty() || name_part.starts_with('-') || name_part.starts_with('.') {
        return Err(ValidationError::InvalidImage(
            "name cannot be empty or start with dash or dot".to_string(),
        ));
    }

    Ok(())
}

/// Validate a WebSite before any child is derived from it.
///
/// The service name derived from the WebSite name must itself fit in a
/// DNS-1123 label, which bounds the parent name below the plain label limit.
pub fn validate_site(site: &WebSite) -> Result<(), ValidationError> {
    validate_label(&site.metadata.namespace, "metadata.namespace")?;
    validate_label(&site.metadata.name, "metadata.name")?;

    validate_subdomain(
        &child_name(&site.metadata.name, ChildKind::Deployment),
        "metadata.name",
    )?;
    let service_name = child_name(&site.metadata.name, ChildKind::Service);
    if service_name.len() > MAX_LABEL_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: "metadata.name".to_string(),
            max: MAX_LABEL_LENGTH - (service_name.len() - site.metadata.name.len()),
        });
    }

    validate_image(&site.spec.image_name)
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
