use crate::core::cache::SnapshotCache;
use crate::core::error::VolumapperError;
use crate::core::store::{DataSourceKind, Partition};
use crate::model::{Ec2Instance, EbsVolume};
use crate::pollers::provider::{Ec2Api, ProviderInstance, ProviderVolume};
use std::time::Duration;
use tracing::debug;

/// Per-run knobs shared by every region poller.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub force: bool,
    pub include_rogue_volumes: bool,
    pub instances_budget: Duration,
    pub volumes_budget: Duration,
}

/// Polls one region's instances and volumes through the snapshot cache.
pub struct RegionPoller {
    region: String,
    api: Box<dyn Ec2Api>,
    cache: SnapshotCache,
    settings: PollSettings,
    instances: Partition,
    volumes: Partition,
}

impl RegionPoller {
    /// Binds `api` to the region and makes sure both partitions exist.
    pub fn new(
        identity: &str,
        region: &str,
        api: Box<dyn Ec2Api>,
        cache: SnapshotCache,
        settings: PollSettings,
    ) -> Result<Self, VolumapperError> {
        let instances = Partition::for_kind(identity, region, DataSourceKind::Instances)?;
        let volumes = Partition::for_kind(identity, region, DataSourceKind::Volumes)?;
        cache.store().ensure_partition(&instances)?;
        cache.store().ensure_partition(&volumes)?;

        Ok(Self {
            region: region.to_string(),
            api,
            cache,
            settings,
            instances,
            volumes,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn get_instances(&self) -> Result<Vec<Ec2Instance>, VolumapperError> {
        self.cache.fetch_or_reuse(
            &self.instances,
            self.settings.instances_budget,
            self.settings.force,
            || {
                debug!(region = %self.region, "polling API for all instances");
                let raw = self.api.list_instances()?;
                Ok::<_, anyhow::Error>(raw.iter().map(to_instance).collect())
            },
        )
    }

    /// Volumes are cached unfiltered; rogue volumes are dropped afterwards
    /// unless `include_rogue_volumes` is set.
    pub fn get_volumes(&self) -> Result<Vec<EbsVolume>, VolumapperError> {
        let volumes = self.cache.fetch_or_reuse(
            &self.volumes,
            self.settings.volumes_budget,
            self.settings.force,
            || {
                debug!(region = %self.region, "polling API for all volumes");
                let raw = self.api.list_volumes()?;
                Ok::<_, anyhow::Error>(raw.iter().map(to_volume).collect())
            },
        )?;

        if self.settings.include_rogue_volumes {
            Ok(volumes)
        } else {
            Ok(volumes.into_iter().filter(|v| !v.is_rogue()).collect())
        }
    }
}

fn to_instance(raw: &ProviderInstance) -> Ec2Instance {
    Ec2Instance {
        id: raw.instance_id.clone().unwrap_or_default(),
        state: raw.state.clone().unwrap_or_default(),
        instance_type: raw.instance_type.clone().unwrap_or_default(),
    }
}

fn to_volume(raw: &ProviderVolume) -> EbsVolume {
    let instance_id = raw
        .attached_instance_ids
        .iter()
        .find(|id| !id.is_empty())
        .cloned()
        .unwrap_or_default();
    EbsVolume {
        id: raw.volume_id.clone().unwrap_or_default(),
        status: raw.state.clone().unwrap_or_default(),
        size: f64::from(raw.size_gb.unwrap_or(0)),
        volume_type: raw.volume_type.clone().unwrap_or_default(),
        instance_id,
    }
}
