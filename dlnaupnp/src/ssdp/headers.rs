//! Analyse des datagrammes SSDP reçus
//!
//! Les en-têtes sont des paires `NOM: valeur` séparées par CRLF (ou LF),
//! découpées sur le premier `:`. Les noms sont insensibles à la casse.

use std::fmt;
use tracing::trace;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SsdpParseError {
    #[error("Empty SSDP datagram")]
    Empty,

    #[error("Missing mandatory SSDP header {0}")]
    MissingHeader(&'static str),

    #[error("Unexpected SSDP start line: {0}")]
    UnexpectedStartLine(String),
}

/// En-têtes d'un datagramme SSDP, dans l'ordre de réception
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsdpHeaders {
    entries: Vec<(String, String)>,
}

impl SsdpHeaders {
    /// Lit les en-têtes jusqu'à la première ligne vide
    pub fn parse_lines<'a, I>(lines: I) -> Self
    where
        I: Iterator<Item = &'a str>,
    {
        let mut entries = Vec::new();
        for line in lines {
            let line = line.trim();

            if line.is_empty() {
                break;
            }

            match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    entries.push((name.trim().to_ascii_uppercase(), value.trim().to_string()));
                }
                _ => trace!("Skipping malformed SSDP header line: '{}'", line),
            }
        }
        Self { entries }
    }

    /// Valeur du premier en-tête portant ce nom (insensible à la casse)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Valeur non vide d'un en-tête obligatoire
    pub fn require(&self, name: &'static str) -> Result<&str, SsdpParseError> {
        match self.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(SsdpParseError::MissingHeader(name)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `max-age` extrait de CACHE-CONTROL, s'il est lisible
    pub fn max_age(&self) -> Option<u64> {
        let value = self.get("CACHE-CONTROL")?;
        let lower = value.to_ascii_lowercase();
        let idx = lower.find("max-age")?;
        let after_eq = lower[idx + "max-age".len()..]
            .trim_start()
            .trim_start_matches('=')
            .trim_start();
        let digits: String = after_eq
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// Nature d'un datagramme SSDP d'après sa première ligne
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Notify,
    MSearch,
    Response(u16),
    Unknown(String),
}

impl StartLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let upper = line.to_ascii_uppercase();

        if upper.starts_with("NOTIFY ") {
            StartLine::Notify
        } else if upper.starts_with("M-SEARCH ") {
            StartLine::MSearch
        } else if upper.starts_with("HTTP/") {
            match line.split_whitespace().nth(1).and_then(|s| s.parse().ok()) {
                Some(status) => StartLine::Response(status),
                None => StartLine::Unknown(line.to_string()),
            }
        } else {
            StartLine::Unknown(line.to_string())
        }
    }
}

impl fmt::Display for StartLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartLine::Notify => write!(f, "NOTIFY"),
            StartLine::MSearch => write!(f, "M-SEARCH"),
            StartLine::Response(status) => write!(f, "HTTP {}", status),
            StartLine::Unknown(line) => write!(f, "{}", line),
        }
    }
}

/// Datagramme SSDP décodé
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpMessage {
    pub start_line: StartLine,
    pub headers: SsdpHeaders,
}

impl SsdpMessage {
    pub fn parse(data: &str) -> Result<Self, SsdpParseError> {
        let mut lines = data.lines();
        let first_line = lines
            .by_ref()
            .find(|l| !l.trim().is_empty())
            .ok_or(SsdpParseError::Empty)?;

        Ok(Self {
            start_line: StartLine::parse(first_line),
            headers: SsdpHeaders::parse_lines(lines),
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SsdpParseError> {
        Self::parse(&String::from_utf8_lossy(data))
    }
}

/// Réponse à un M-SEARCH (`HTTP/1.1 200 OK`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReply {
    pub server: String,
    pub st: String,
    pub location: String,
    pub usn: Option<String>,
    pub max_age: Option<u64>,
}

impl SearchReply {
    /// SERVER, ST et LOCATION sont obligatoires ; USN et CACHE-CONTROL optionnels
    pub fn from_headers(headers: &SsdpHeaders) -> Result<Self, SsdpParseError> {
        Ok(Self {
            server: headers.require("SERVER")?.to_string(),
            st: headers.require("ST")?.to_string(),
            location: headers.require("LOCATION")?.to_string(),
            usn: headers
                .get("USN")
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            max_age: headers.max_age(),
        })
    }

    /// Décode un datagramme complet ; seul un statut 200 est accepté
    pub fn parse(data: &[u8]) -> Result<Self, SsdpParseError> {
        let message = SsdpMessage::from_bytes(data)?;
        match message.start_line {
            StartLine::Response(200) => Self::from_headers(&message.headers),
            other => Err(SsdpParseError::UnexpectedStartLine(other.to_string())),
        }
    }
}
