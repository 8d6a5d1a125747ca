//! Structures de l'enveloppe SOAP

use xmltree::Element;

/// Enveloppe SOAP complète
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    /// En-tête SOAP optionnel
    pub header: Option<SoapHeader>,

    /// Corps SOAP contenant la réponse ou le fault
    pub body: SoapBody,
}

/// En-tête SOAP
#[derive(Debug, Clone)]
pub struct SoapHeader {
    pub content: Element,
}

/// Corps SOAP
#[derive(Debug, Clone)]
pub struct SoapBody {
    /// Élément `Body` lui-même
    pub content: Element,
}

impl SoapBody {
    /// Premier élément enfant du Body (réponse d'action ou `Fault`)
    pub fn first_element(&self) -> Option<&Element> {
        self.content.children.iter().find_map(|n| n.as_element())
    }

    /// Élément enfant dont le nom local est `name`
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.content
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .find(|e| local_name(&e.name) == name)
    }
}

/// Nom sans préfixe (`u:BrowseResponse` -> `BrowseResponse`)
pub(crate) fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
