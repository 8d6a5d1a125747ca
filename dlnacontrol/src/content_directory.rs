//! Navigation dans un ContentDirectory
//!
//! Un seul niveau est matérialisé par requête `Browse`. La descente vers le
//! premier item lisible est une boucle explicite bornée par une profondeur
//! maximale : un serveur qui renverrait indéfiniment un container unique
//! ne peut pas la faire tourner sans fin.

use crate::errors::ControlPointError;
use crate::soap_client::{extract_child_text_allow_empty, find_action_response, invoke};
use dlnadidl::{DidlNode, parse_nodes};
use dlnaupnp::ssdp::CONTENT_DIRECTORY;
use tracing::{debug, info};
use ureq::Agent;
use url::Url;

/// Identifiant du container racine
pub const ROOT_OBJECT_ID: &str = "0";

/// Nombre d'enfants demandés par `Browse`
pub const DEFAULT_REQUESTED_COUNT: u32 = 8;

/// Profondeur maximale de descente
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Ce qu'un niveau de l'arbre propose au navigateur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseLevel {
    /// Premier item ayant une ressource
    Item { title: String, resource_url: String },
    /// Premier container, à défaut d'item
    Container { id: String, title: String },
    Empty,
}

impl BrowseLevel {
    pub fn classify(nodes: Vec<DidlNode>) -> Self {
        let mut first_container = None;

        for node in nodes {
            match node {
                DidlNode::Item {
                    title,
                    resource_url: Some(resource_url),
                    ..
                } => return BrowseLevel::Item { title, resource_url },
                DidlNode::Item { id, .. } => {
                    debug!("Skipping item {} without resource", id);
                }
                DidlNode::Container { id, title } => {
                    if first_container.is_none() {
                        first_container = Some(BrowseLevel::Container { id, title });
                    }
                }
            }
        }

        first_container.unwrap_or(BrowseLevel::Empty)
    }
}

/// Item lisible trouvé par le navigateur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playable {
    /// Titres traversés, item compris
    pub path: Vec<String>,
    /// URL absolue de la ressource
    pub resource_url: String,
}

#[derive(Debug, Clone)]
pub struct ContentDirectoryClient {
    agent: Agent,
    pub control_url: String,
    pub service_type: String,
    requested_count: u32,
    max_depth: usize,
}

impl ContentDirectoryClient {
    pub fn new(agent: Agent, control_url: impl Into<String>) -> Self {
        Self {
            agent,
            control_url: control_url.into(),
            service_type: CONTENT_DIRECTORY.to_string(),
            requested_count: DEFAULT_REQUESTED_COUNT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_requested_count(mut self, requested_count: u32) -> Self {
        self.requested_count = requested_count;
        self
    }

    /// Browse(BrowseDirectChildren) d'un container
    pub fn browse_children(&self, object_id: &str) -> Result<Vec<DidlNode>, ControlPointError> {
        const ACTION: &str = "Browse";

        let requested_count = self.requested_count.to_string();
        let args = [
            ("ObjectID", object_id),
            ("BrowseFlag", "BrowseDirectChildren"),
            ("Filter", "*"),
            ("StartingIndex", "0"),
            ("RequestedCount", requested_count.as_str()),
            ("SortCriteria", ""),
        ];

        let body = invoke(&self.agent, &self.control_url, &self.service_type, ACTION, &args)?;
        let response = find_action_response(&body, ACTION)?;
        let didl = extract_child_text_allow_empty(response, ACTION, "Result")?;

        let nodes = parse_nodes(&didl)
            .map_err(|e| ControlPointError::malformed("DIDL-Lite Result", e))?;
        debug!("Browse({}) returned {} nodes", object_id, nodes.len());
        Ok(nodes)
    }

    /// Descend depuis la racine jusqu'au premier item lisible
    pub fn find_first_playable(&self) -> Result<Playable, ControlPointError> {
        let root_level = self.browse_children(ROOT_OBJECT_ID)?;
        self.find_playable_from(root_level)
    }

    /// Même descente, à partir d'un niveau racine déjà obtenu
    pub fn find_playable_from(
        &self,
        root_level: Vec<DidlNode>,
    ) -> Result<Playable, ControlPointError> {
        let mut path = Vec::new();
        let mut level = root_level;
        let mut depth = 0;

        loop {
            match BrowseLevel::classify(level) {
                BrowseLevel::Item {
                    title,
                    resource_url,
                } => {
                    path.push(title);
                    let resource_url = self.resolve_resource(&resource_url)?;
                    info!("Found playable item /{} @ {}", path.join("/"), resource_url);
                    return Ok(Playable { path, resource_url });
                }
                BrowseLevel::Container { id, title } => {
                    path.push(title);
                    if depth >= self.max_depth {
                        return Err(ControlPointError::DepthExceeded {
                            path,
                            max_depth: self.max_depth,
                        });
                    }
                    depth += 1;
                    level = self.browse_children(&id)?;
                }
                BrowseLevel::Empty => return Err(ControlPointError::NotFound { path }),
            }
        }
    }

    /// Les URLs relatives sont résolues contre l'URL de contrôle
    fn resolve_resource(&self, resource_url: &str) -> Result<String, ControlPointError> {
        let base = Url::parse(&self.control_url)
            .map_err(|e| ControlPointError::malformed("control URL", e))?;
        base.join(resource_url)
            .map(|u| u.to_string())
            .map_err(|e| {
                ControlPointError::malformed(format!("resource URL '{}'", resource_url), e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, url: Option<&str>) -> DidlNode {
        DidlNode::Item {
            id: id.to_string(),
            title: format!("item {}", id),
            resource_url: url.map(str::to_string),
        }
    }

    fn container(id: &str) -> DidlNode {
        DidlNode::Container {
            id: id.to_string(),
            title: format!("folder {}", id),
        }
    }

    fn client() -> ContentDirectoryClient {
        let agent = crate::build_agent(crate::DEFAULT_HTTP_TIMEOUT);
        ContentDirectoryClient::new(agent, "http://10.0.0.2/ctl/cd")
    }

    #[test]
    fn test_items_win_over_containers() {
        let level =
            BrowseLevel::classify(vec![container("1"), item("2", Some("http://h/a.mp3"))]);
        assert_eq!(
            level,
            BrowseLevel::Item {
                title: "item 2".to_string(),
                resource_url: "http://h/a.mp3".to_string()
            }
        );
    }

    #[test]
    fn test_items_without_resource_are_skipped() {
        let level = BrowseLevel::classify(vec![
            item("1", None),
            item("2", Some("b.mp3")),
            container("3"),
        ]);
        assert!(matches!(level, BrowseLevel::Item { title, .. } if title == "item 2"));

        let level = BrowseLevel::classify(vec![item("1", None), container("3"), container("4")]);
        assert!(matches!(level, BrowseLevel::Container { id, .. } if id == "3"));
    }

    #[test]
    fn test_empty_level() {
        assert_eq!(BrowseLevel::classify(Vec::new()), BrowseLevel::Empty);
        assert_eq!(BrowseLevel::classify(vec![item("1", None)]), BrowseLevel::Empty);
    }

    #[test]
    fn test_find_on_preloaded_levels() {
        let client = client();

        let err = client.find_playable_from(Vec::new()).unwrap_err();
        assert!(matches!(err, ControlPointError::NotFound { path } if path.is_empty()));

        let playable = client
            .find_playable_from(vec![item("1", Some("media/track.mp3"))])
            .unwrap();
        assert_eq!(playable.path, vec!["item 1".to_string()]);
        assert_eq!(playable.resource_url, "http://10.0.0.2/ctl/media/track.mp3");
    }

    #[test]
    fn test_zero_depth_refuses_to_descend() {
        let client = client().with_max_depth(0);
        let err = client.find_playable_from(vec![container("1")]).unwrap_err();
        assert!(matches!(
            err,
            ControlPointError::DepthExceeded { path, max_depth: 0 } if path == vec!["folder 1".to_string()]
        ));
    }
}
