/// Identité du media server annoncé, construite une fois au démarrage.
///
/// Elle est passée explicitement à l'annonceur et au validateur ; aucune
/// variable globale ne la porte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// UUID du device (sans le préfixe "uuid:")
    pub uuid: String,

    /// Identifiant du serveur (ex: "Linux/6.1 UPnP/1.0 PHPDLNA/1.0")
    pub server_id: String,

    /// URL de la description du device
    pub location_url: String,

    /// Durée de validité des annonces (CACHE-CONTROL max-age)
    pub cache_seconds: u64,
}

impl DeviceIdentity {
    pub fn new(
        uuid: impl Into<String>,
        server_id: impl Into<String>,
        location_url: impl Into<String>,
        cache_seconds: u64,
    ) -> Self {
        let uuid = uuid.into();
        let uuid = match uuid.trim().strip_prefix("uuid:") {
            Some(stripped) => stripped.to_string(),
            None => uuid.trim().to_string(),
        };

        Self {
            uuid,
            server_id: server_id.into(),
            location_url: location_url.into(),
            cache_seconds,
        }
    }

    /// USN du root device : `uuid:<uuid>`
    pub fn root_usn(&self) -> String {
        format!("uuid:{}", self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_prefix_is_stripped() {
        let identity = DeviceIdentity::new(
            "uuid:4d696e69-444c-164e-9d41-b827eb54e3c8",
            "Linux/6.1 UPnP/1.0 PHPDLNA/1.0",
            "http://192.168.1.10/dlna/rootDesc.xml",
            43200,
        );
        assert_eq!(identity.uuid, "4d696e69-444c-164e-9d41-b827eb54e3c8");
        assert_eq!(
            identity.root_usn(),
            "uuid:4d696e69-444c-164e-9d41-b827eb54e3c8"
        );
    }
}
