use lazy_static::lazy_static;
use regex::Regex;

use super::dto::AuthResponse;
use super::jwt::JwtKeys;
use super::repo_types::User;

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Sign a fresh access/refresh pair for `user`.
pub(crate) fn issue_tokens(keys: &JwtKeys, user: User) -> anyhow::Result<AuthResponse> {
    let access_token = keys.sign_access(&user)?;
    let refresh_token = keys.sign_refresh(&user)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}
