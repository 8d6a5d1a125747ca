//! # dlnadidl - lecture des réponses DIDL-Lite
//!
//! Une réponse `Browse` de ContentDirectory transporte un fragment DIDL-Lite
//! (échappé dans l'élément `Result`). Ce crate le désérialise avec
//! `quick-xml`/`serde` et le réduit à une liste plate de [`DidlNode`] :
//! un seul niveau de l'arbre est matérialisé par aller-retour réseau.
//!
//! Le parsing est tolérant : les serveurs laxistes omettent souvent les
//! préfixes `dc:`/`upnp:`, l'attribut `parentID` ou la classe UPnP.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DidlError {
    #[error("Invalid DIDL-Lite document: {0}")]
    Xml(#[from] quick_xml::de::DeError),
}

/// Racine d'un document DIDL-Lite
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DIDLLite {
    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID", default)]
    pub parent_id: Option<String>,

    #[serde(rename = "@childCount", default)]
    pub child_count: Option<String>,

    #[serde(rename = "dc:title", alias = "title", default)]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class", default)]
    pub class: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID", default)]
    pub parent_id: Option<String>,

    #[serde(rename = "dc:title", alias = "title", default)]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class", default)]
    pub class: Option<String>,

    #[serde(rename = "res", default)]
    pub resources: Vec<Resource>,
}

/// Ressource média d'un item
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    #[serde(rename = "@protocolInfo", default)]
    pub protocol_info: Option<String>,

    #[serde(rename = "@size", default)]
    pub size: Option<String>,

    #[serde(rename = "@duration", default)]
    pub duration: Option<String>,

    #[serde(rename = "$text", default)]
    pub url: String,
}

/// Un enfant d'un container, tel que vu par le navigateur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DidlNode {
    Container {
        id: String,
        title: String,
    },
    Item {
        id: String,
        title: String,
        /// URL de la première ressource non vide, telle que publiée par le serveur
        resource_url: Option<String>,
    },
}

impl DidlNode {
    pub fn title(&self) -> &str {
        match self {
            DidlNode::Container { title, .. } | DidlNode::Item { title, .. } => title,
        }
    }
}

impl DIDLLite {
    /// Désérialise un fragment DIDL-Lite
    pub fn parse(input: &str) -> Result<Self, DidlError> {
        if input.trim().is_empty() {
            return Ok(DIDLLite::default());
        }
        Ok(quick_xml::de::from_str(input)?)
    }

    /// Containers puis items, chacun dans l'ordre du document
    pub fn nodes(&self) -> Vec<DidlNode> {
        let containers = self.containers.iter().map(|c| DidlNode::Container {
            id: c.id.clone(),
            title: c.title.trim().to_string(),
        });

        let items = self.items.iter().map(|i| DidlNode::Item {
            id: i.id.clone(),
            title: i.title.trim().to_string(),
            resource_url: i.primary_url().map(str::to_string),
        });

        containers.chain(items).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.items.is_empty()
    }
}

impl Item {
    /// URL de la première ressource non vide
    pub fn primary_url(&self) -> Option<&str> {
        self.resources
            .iter()
            .map(|r| r.url.trim())
            .find(|url| !url.is_empty())
    }
}

/// Parse un fragment DIDL-Lite et retourne ses nœuds de premier niveau
pub fn parse_nodes(input: &str) -> Result<Vec<DidlNode>, DidlError> {
    Ok(DIDLLite::parse(input)?.nodes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_with_resource() {
        let xml = r#"
        <DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/"
                   xmlns:dc="http://purl.org/dc/elements/1.1/"
                   xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/">
            <item id="0$1" parentID="0" restricted="1">
                <dc:title>Track &amp; Field</dc:title>
                <upnp:class>object.item.audioItem.musicTrack</upnp:class>
                <res protocolInfo="http-get:*:audio/mpeg:*" size="1024">http://192.168.1.10/media/track.mp3</res>
            </item>
        </DIDL-Lite>
        "#;

        let nodes = parse_nodes(xml).unwrap();
        assert_eq!(
            nodes,
            vec![DidlNode::Item {
                id: "0$1".to_string(),
                title: "Track & Field".to_string(),
                resource_url: Some("http://192.168.1.10/media/track.mp3".to_string()),
            }]
        );
    }

    #[test]
    fn test_parse_lax_document() {
        // Pas de préfixes, pas de parentID, pas de classe
        let xml = r#"
        <DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">
            <container id="1"><title>Music</title></container>
            <item id="2"><title>No resource</title></item>
            <container id="3"><title>Video</title></container>
        </DIDL-Lite>
        "#;

        let didl = DIDLLite::parse(xml).unwrap();
        assert_eq!(didl.containers.len(), 2);
        assert_eq!(didl.items.len(), 1);

        let nodes = didl.nodes();
        assert_eq!(nodes[0].title(), "Music");
        assert_eq!(nodes[1].title(), "Video");
        assert_eq!(
            nodes[2],
            DidlNode::Item {
                id: "2".to_string(),
                title: "No resource".to_string(),
                resource_url: None,
            }
        );
    }

    #[test]
    fn test_empty_document() {
        let xml = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/"></DIDL-Lite>"#;
        assert!(DIDLLite::parse(xml).unwrap().is_empty());
        assert!(parse_nodes("  ").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_document() {
        assert!(parse_nodes("<DIDL-Lite><item id=\"1\">").is_err());
    }
}
