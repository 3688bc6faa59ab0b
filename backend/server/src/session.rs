//! # Session Gate
//!
//! Sign-in is a display name kept in a cookie. No password and no uniqueness check.
//!
//! ## Cookies
//! - `session`: the display name, lasts for the browser session, cleared on logout
//! - `flash`: one confirmation message, shown by the next rendered page then cleared
//!
//! Both are `base64url(value).hex(HMAC-SHA256(SECRET, base64url(value)))`. A cookie whose
//! signature does not verify is treated as absent.
use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::state::State;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

type HmacSha256 = Hmac<Sha256>;

/// HMAC accepts keys of any length.
fn mac(secret: &str, payload: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload.as_bytes());

    Some(mac)
}

pub fn sign(secret: &str, value: &str) -> String {
    let payload = URL_SAFE_NO_PAD.encode(value);
    let signature = mac(secret, &payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();

    format!("{payload}.{signature}")
}

pub fn verify(secret: &str, signed: &str) -> Option<String> {
    let (payload, signature) = signed.split_once('.')?;
    let signature = hex::decode(signature).ok()?;

    if mac(secret, payload)?.verify_slice(&signature).is_err() {
        debug!("Rejected cookie with a bad signature");
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    String::from_utf8(bytes).ok()
}

pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub fn set_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Cookie changes to attach to a response.
#[derive(Debug, Default)]
pub struct CookieUpdates(Vec<String>);

impl CookieUpdates {
    pub fn set(mut self, secret: &str, name: &str, value: &str) -> Self {
        self.0.push(set_cookie(name, &sign(secret, value)));
        self
    }

    pub fn clear(mut self, name: &str) -> Self {
        self.0.push(clear_cookie(name));
        self
    }

    pub fn apply(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();

        for cookie in self.0 {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }

        response
    }
}

/// Session contents of the current request, signed in or not.
#[derive(Debug, Default)]
pub struct Session {
    pub username: Option<String>,
    pub flash: Option<String>,
}

impl Session {
    pub fn from_headers(secret: &str, headers: &HeaderMap) -> Self {
        let signed = |name: &str| read_cookie(headers, name).and_then(|raw| verify(secret, raw));

        Self {
            username: signed(SESSION_COOKIE).filter(|name| !name.is_empty()),
            flash: signed(FLASH_COOKIE),
        }
    }

    /// Clears a pending flash once it has been rendered.
    pub fn consume_flash(&self) -> CookieUpdates {
        match self.flash {
            Some(_) => CookieUpdates::default().clear(FLASH_COOKIE),
            None => CookieUpdates::default(),
        }
    }
}

impl FromRequestParts<Arc<State>> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Session::from_headers(&state.config.secret, &parts.headers))
    }
}

/// A session with a display name. Requests without one are sent to the sign-in page.
#[derive(Debug)]
pub struct SignedIn {
    pub username: String,
    pub session: Session,
}

impl FromRequestParts<Arc<State>> for SignedIn {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_headers(&state.config.secret, &parts.headers);

        match session.username.clone() {
            Some(username) => Ok(SignedIn { username, session }),
            None => Err(Redirect::to("/")),
        }
    }
}
