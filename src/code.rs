// code.rs
use rand::Rng;

use crate::error::{AppError, AppResult};

pub const CODE_LENGTH: usize = 8;
const CODE_SPACE: u32 = 100_000_000;

/// Uniformly random 8-digit code, leading zeros kept.
pub fn generate_code() -> String {
    generate_code_with(&mut rand::rng())
}

pub fn generate_code_with<R: Rng>(rng: &mut R) -> String {
    let value = rng.random_range(0..CODE_SPACE);
    format!("{value:0width$}", width = CODE_LENGTH)
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// Trims surrounding whitespace; anything other than 8 digits is rejected.
pub fn normalize_code(raw: &str) -> AppResult<String> {
    let code = raw.trim();
    if is_valid_code(code) {
        Ok(code.to_string())
    } else {
        Err(code_format_error())
    }
}

/// Drops every whitespace character, so "1234 5678" is accepted.
pub fn normalize_spaced_code(raw: &str) -> AppResult<String> {
    let code: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if is_valid_code(&code) {
        Ok(code)
    } else {
        Err(code_format_error())
    }
}

fn code_format_error() -> AppError {
    AppError::bad_request("code must be exactly 8 digits")
}
