//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum accepted length for a lobby id.
const LOBBY_ID_MAX_LEN: usize = 32;
/// Maximum accepted length for a player identity token.
const PLAYER_ID_MAX_LEN: usize = 64;
/// Maximum accepted length for a display name.
const PLAYER_NAME_MAX_LEN: usize = 32;

/// Validates that a lobby id is 1-32 lowercase alphanumeric characters or
/// dashes (lobby ids double as broadcast room names and URL segments).
pub fn validate_lobby_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > LOBBY_ID_MAX_LEN {
        let mut err = ValidationError::new("lobby_id_length");
        err.message =
            Some(format!("lobby id must be 1-{} characters (got {})", LOBBY_ID_MAX_LEN, id.len()).into());
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        let mut err = ValidationError::new("lobby_id_format");
        err.message =
            Some("lobby id must contain only lowercase letters, digits, and dashes".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a client-supplied player identity token: opaque, but bounded
/// and free of whitespace so it can key maps and appear in logs.
pub fn validate_player_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > PLAYER_ID_MAX_LEN {
        let mut err = ValidationError::new("player_id_length");
        err.message = Some(
            format!("player id must be 1-{} characters (got {})", PLAYER_ID_MAX_LEN, id.len())
                .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("player_id_format");
        err.message = Some("player id must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a display name: non-blank after trimming, bounded length.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > PLAYER_NAME_MAX_LEN {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("player name must be 1-{} non-blank characters", PLAYER_NAME_MAX_LEN).into(),
        );
        return Err(err);
    }
    Ok(())
}
