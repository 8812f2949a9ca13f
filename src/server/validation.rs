use crate::server::response::ApiError;

const MAX_EXTENSION_ID_LEN: usize = 64;
const MAX_FILENAME_LEN: usize = 255;

fn is_valid_name_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_name(
    name: &str,
    entity: &str,
    max_len: usize,
    allow_period: bool,
) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{entity} cannot be empty"));
    }
    if name.len() > max_len {
        return Err(format!("{entity} cannot exceed {max_len} characters"));
    }
    if !name.chars().all(|c| is_valid_name_char(c, allow_period)) {
        let mut allowed = "alphanumeric characters, hyphens, and underscores".to_string();
        if allow_period {
            allowed.push_str(", and periods");
        }
        return Err(format!("{entity} can only contain {allowed}"));
    }
    Ok(())
}

pub fn validate_extension_id(id: &str) -> Result<(), ApiError> {
    validate_name(id, "Extension id", MAX_EXTENSION_ID_LEN, true).map_err(ApiError::bad_request)
}

/// Filenames are flat: they name schema files within an extension, never paths.
pub fn validate_filename(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Filename", MAX_FILENAME_LEN, true).map_err(ApiError::bad_request)
}
