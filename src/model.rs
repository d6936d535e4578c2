//! Domain records cached per partition and joined by the report.

use serde::{Deserialize, Serialize};

/// An EC2 instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ec2Instance {
    pub id: String,
    pub state: String,
    #[serde(rename = "type")]
    pub instance_type: String,
}

impl Ec2Instance {
    pub fn new(id: &str, state: &str, instance_type: &str) -> Self {
        Self {
            id: id.to_string(),
            state: state.to_string(),
            instance_type: instance_type.to_string(),
        }
    }
}

/// An EBS volume. `size` is in GB; `instance_id` is empty when unattached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EbsVolume {
    pub id: String,
    pub status: String,
    pub size: f64,
    #[serde(rename = "type")]
    pub volume_type: String,
    #[serde(default)]
    pub instance_id: String,
}

impl EbsVolume {
    pub fn new(id: &str, status: &str, size: f64, volume_type: &str, instance_id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: status.to_string(),
            size,
            volume_type: volume_type.to_string(),
            instance_id: instance_id.to_string(),
        }
    }

    /// A volume with no attached instance.
    pub fn is_rogue(&self) -> bool {
        self.instance_id.is_empty()
    }
}

/// Everything gathered in one run, concatenated in region order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inventory {
    pub instances: Vec<Ec2Instance>,
    pub volumes: Vec<EbsVolume>,
}
