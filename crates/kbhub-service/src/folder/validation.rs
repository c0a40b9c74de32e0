//! Input validation for folder and source operations.

use std::collections::HashSet;

use kbhub_core::error::AppError;
use kbhub_core::result::AppResult;

/// Maximum folder name length in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum icon identifier length in characters.
pub const MAX_ICON_LENGTH: usize = 64;

/// Characters that are rejected in folder names.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Trim surrounding whitespace from a name.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

/// Validate a folder name and return its normalized form.
pub fn validate_folder_name(name: &str) -> AppResult<String> {
    let name = normalize_name(name);

    if name.is_empty() {
        return Err(AppError::validation("Folder name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "Folder name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    if let Some(c) = name.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(AppError::validation(format!(
            "Folder name cannot contain '{c}'"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AppError::validation(
            "Folder name cannot contain control characters",
        ));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!(
            "'{name}' is not a valid folder name"
        )));
    }

    Ok(name)
}

/// Validate a `#RRGGBB` colour.
pub fn validate_color(color: &str) -> AppResult<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid color '{color}': expected a hex code like #00ff41"
        )))
    }
}

/// Validate an icon identifier and return it trimmed.
pub fn validate_icon(icon: &str) -> AppResult<String> {
    let icon = icon.trim();
    if icon.is_empty() {
        return Err(AppError::validation("Icon cannot be blank"));
    }
    if icon.chars().count() > MAX_ICON_LENGTH {
        return Err(AppError::validation(format!(
            "Icon cannot exceed {MAX_ICON_LENGTH} characters"
        )));
    }
    Ok(icon.to_string())
}

/// Validate folder metadata: it must be a JSON object.
pub fn validate_metadata(metadata: &serde_json::Value) -> AppResult<()> {
    if metadata.is_object() {
        Ok(())
    } else {
        Err(AppError::validation("Folder metadata must be a JSON object"))
    }
}

/// Validate a list of source IDs, removing duplicates while keeping order.
pub fn validate_source_ids(ids: &[String]) -> AppResult<Vec<String>> {
    if ids.is_empty() {
        return Err(AppError::validation("At least one source ID is required"));
    }

    let mut seen = HashSet::with_capacity(ids.len());
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::validation("Source IDs cannot be blank"));
        }
        if seen.insert(id) {
            unique.push(id.to_string());
        }
    }
    Ok(unique)
}
