//! Provider collaborator seam.
//!
//! Concrete providers map their SDK types into [`ProviderInstance`] and
//! [`ProviderVolume`]; the region poller turns those into domain records.

/// An instance as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderInstance {
    pub instance_id: Option<String>,
    pub state: Option<String>,
    pub instance_type: Option<String>,
}

/// A volume as reported by the provider, with every attachment it lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderVolume {
    pub volume_id: Option<String>,
    pub state: Option<String>,
    pub size_gb: Option<i32>,
    pub volume_type: Option<String>,
    pub attached_instance_ids: Vec<String>,
}

/// Inventory calls against one region.
pub trait Ec2Api: Send + Sync {
    fn list_instances(&self) -> anyhow::Result<Vec<ProviderInstance>>;
    fn list_volumes(&self) -> anyhow::Result<Vec<ProviderVolume>>;
}

/// Opens an [`Ec2Api`] for a region. Credentials are bound at construction.
pub trait RegionConnector: Send + Sync {
    fn connect(&self, region: &str) -> anyhow::Result<Box<dyn Ec2Api>>;
}
