//! Vérification HTTP (HEAD) d'une ressource média
//!
//! Seul l'échec de la requête est une erreur. Les en-têtes manquants ou
//! inattendus sont des avertissements indépendants les uns des autres.

use crate::errors::ControlPointError;
use std::fmt;
use tracing::debug;
use ureq::Agent;
use ureq::http::HeaderMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceWarning {
    HeaderAbsent(&'static str),
    HeaderUnexpected {
        header: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl fmt::Display for ResourceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceWarning::HeaderAbsent(header) => write!(f, "{} header is missing", header),
            ResourceWarning::HeaderUnexpected {
                header,
                value,
                expected,
            } => write!(f, "{} header is '{}' (expected {})", header, value, expected),
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Contrôle des en-têtes d'une réponse HEAD
pub fn evaluate_headers(headers: &HeaderMap) -> Vec<ResourceWarning> {
    let mut warnings = Vec::new();

    match header_value(headers, "accept-ranges") {
        None => warnings.push(ResourceWarning::HeaderAbsent("Accept-Ranges")),
        Some(value) if !value.to_ascii_lowercase().contains("bytes") => {
            warnings.push(ResourceWarning::HeaderUnexpected {
                header: "Accept-Ranges",
                value: value.to_string(),
                expected: "bytes",
            })
        }
        Some(_) => {}
    }

    if header_value(headers, "content-length").is_none() {
        warnings.push(ResourceWarning::HeaderAbsent("Content-Length"));
    }

    match header_value(headers, "content-type") {
        None => warnings.push(ResourceWarning::HeaderAbsent("Content-Type")),
        Some(value) => {
            let lower = value.to_ascii_lowercase();
            if !lower.starts_with("audio/") && !lower.starts_with("video/") {
                warnings.push(ResourceWarning::HeaderUnexpected {
                    header: "Content-Type",
                    value: value.to_string(),
                    expected: "audio/* or video/*",
                });
            }
        }
    }

    warnings
}

/// HEAD sur la ressource puis contrôle de ses en-têtes
pub fn check_resource(agent: &Agent, url: &str) -> Result<Vec<ResourceWarning>, ControlPointError> {
    debug!("HEAD {}", url);
    let response = agent
        .head(url)
        .call()
        .map_err(|e| ControlPointError::transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ControlPointError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            detail: String::new(),
        });
    }

    Ok(evaluate_headers(response.headers()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ureq::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_streamable_audio() {
        let map = headers(&[
            ("accept-ranges", "bytes"),
            ("content-length", "1024"),
            ("content-type", "audio/mpeg"),
        ]);
        assert!(evaluate_headers(&map).is_empty());
    }

    #[test]
    fn test_missing_headers() {
        let warnings = evaluate_headers(&HeaderMap::new());
        assert_eq!(
            warnings,
            vec![
                ResourceWarning::HeaderAbsent("Accept-Ranges"),
                ResourceWarning::HeaderAbsent("Content-Length"),
                ResourceWarning::HeaderAbsent("Content-Type"),
            ]
        );
    }

    #[test]
    fn test_unexpected_values() {
        let map = headers(&[
            ("accept-ranges", "none"),
            ("content-length", "12"),
            ("content-type", "text/html"),
        ]);
        let warnings = evaluate_headers(&map);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].to_string().contains("Accept-Ranges header is 'none'"));
        assert!(warnings[1].to_string().contains("text/html"));
    }
}
