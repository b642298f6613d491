//! Field validators shared by request bodies and entities.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex_lite::Regex;
use url::Url;
use validator::ValidationError;

static MATRICOLA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("valid matricola regex"));
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("valid ipv4 regex")
});
static IPV6: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[?[0-9a-fA-F:]+\]?$").expect("valid ipv6 regex")
});
static FQDN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}$").expect("valid fqdn regex")
});

const HTTPS: &str = "https";
const LOCALHOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

pub const MIN_POINTS: i32 = 1;
pub const MAX_POINTS: i32 = 5;

/// Reasons a group link is rejected, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("URL must use HTTPS.")]
    Scheme,
    #[error("URL must contain a valid hostname.")]
    MissingHost,
    #[error("Localhost URLs are not allowed.")]
    Localhost,
    #[error("IP addresses are not allowed, only hostnames.")]
    IpAddress,
    #[error("Invalid hostname format.")]
    Format,
}

/// Check that `value` is an HTTPS URL pointing to a public hostname.
///
/// The host is read from the raw authority text, without URL normalization.
pub fn check_https_hostname(value: &str) -> Result<(), LinkError> {
    let (scheme, rest) = value.split_once(':').ok_or(LinkError::Scheme)?;
    if !scheme.eq_ignore_ascii_case(HTTPS) {
        return Err(LinkError::Scheme);
    }

    let hostname = rest.strip_prefix("//").map(authority_host).unwrap_or_default();
    if hostname.is_empty() {
        return Err(LinkError::MissingHost);
    }

    if LOCALHOSTS
        .iter()
        .any(|local| hostname.eq_ignore_ascii_case(local))
    {
        return Err(LinkError::Localhost);
    }

    if IPV4.is_match(hostname) || IPV6.is_match(hostname) {
        return Err(LinkError::IpAddress);
    }

    if !FQDN.is_match(hostname) || Url::parse(value).is_err() {
        return Err(LinkError::Format);
    }

    Ok(())
}

/// Host part of the authority following `//`, without userinfo, port or
/// IPv6 brackets.
fn authority_host(rest: &str) -> &str {
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    match host.strip_prefix('[') {
        Some(bracketed) => bracketed
            .split_once(']')
            .map_or(bracketed, |(host, _)| host),
        None => host.split_once(':').map_or(host, |(host, _)| host),
    }
}

/// `validator` adapter for [`check_https_hostname`].
pub fn validate_https_hostname(value: &str) -> Result<(), ValidationError> {
    check_https_hostname(value).map_err(|err| {
        ValidationError::new("invalid").with_message(Cow::from(err.to_string()))
    })
}

/// Rejects empty strings with a `min_length` code.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        let mut err = ValidationError::new("min_length")
            .with_message(Cow::from("This field may not be blank."));
        err.add_param(Cow::from("min"), &1);
        Err(err)
    } else {
        Ok(())
    }
}

/// Matricola must be exactly 6 numeric digits.
pub fn validate_matricola(value: &str) -> Result<(), ValidationError> {
    if MATRICOLA.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid").with_message(Cow::from(
            "Matricola must be exactly 6 numeric digits.",
        )))
    }
}

/// Goal points are bound between [`MIN_POINTS`] and [`MAX_POINTS`].
pub fn validate_points(points: i32) -> Result<(), ValidationError> {
    if points < MIN_POINTS {
        let mut err = ValidationError::new("min_value").with_message(
            Cow::from(format!(
                "Ensure this value is greater than or equal to {MIN_POINTS}."
            )),
        );
        err.add_param(Cow::from("min"), &MIN_POINTS);
        Err(err)
    } else if points > MAX_POINTS {
        let mut err = ValidationError::new("max_value").with_message(
            Cow::from(format!(
                "Ensure this value is less than or equal to {MAX_POINTS}."
            )),
        );
        err.add_param(Cow::from("max"), &MAX_POINTS);
        Err(err)
    } else {
        Ok(())
    }
}
