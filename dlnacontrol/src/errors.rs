use dlnaupnp::ssdp::SsdpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlPointError {
    #[error("HTTP request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} answered HTTP status {status}{detail}")]
    HttpStatus {
        url: String,
        status: u16,
        /// Suffixe lisible (ex: ": UPnP error 701: No such object")
        detail: String,
    },

    #[error("Malformed {what}: {message}")]
    MalformedMessage { what: String, message: String },

    #[error("there should be one {0} service (missing from device description)")]
    MissingService(String),

    #[error("there should be one {0} service (declared more than once)")]
    DuplicateService(String),

    #[error("Missing {field} on {service}")]
    MissingServiceUrl {
        service: String,
        field: &'static str,
    },

    #[error("Missing {element} element in {action} response{detail}")]
    MissingElement {
        action: String,
        element: String,
        detail: String,
    },

    #[error("{action} returned an empty {element}")]
    EmptyValue { action: String, element: String },

    #[error("unable to find a downloadable item (path: /{})", .path.join("/"))]
    NotFound { path: Vec<String> },

    #[error("browse depth limit {max_depth} reached (path: /{})", .path.join("/"))]
    DepthExceeded { path: Vec<String>, max_depth: usize },

    #[error("SSDP discovery failed: {0}")]
    Ssdp(#[from] SsdpError),
}

impl ControlPointError {
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        ControlPointError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn malformed(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ControlPointError::MalformedMessage {
            what: what.into(),
            message: err.to_string(),
        }
    }

    pub fn missing_element(action: &str, element: &str) -> Self {
        ControlPointError::MissingElement {
            action: action.to_string(),
            element: element.to_string(),
            detail: String::new(),
        }
    }

    /// Le navigateur est allé au bout sans trouver de contenu vérifiable :
    /// le serveur répond correctement, ce n'est pas un défaut de protocole.
    pub fn is_content_warning(&self) -> bool {
        matches!(
            self,
            ControlPointError::NotFound { .. } | ControlPointError::DepthExceeded { .. }
        )
    }
}
