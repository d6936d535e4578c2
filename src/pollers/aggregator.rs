use crate::core::cache::SnapshotCache;
use crate::core::error::VolumapperError;
use crate::model::{Ec2Instance, EbsVolume, Inventory};
use crate::pollers::provider::RegionConnector;
use crate::pollers::region::{PollSettings, RegionPoller};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Regions polled when none are configured.
pub const ALL_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "sa-east-1",
];

/// Drop repeated regions, keeping the first occurrence.
pub fn dedup_regions(regions: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(regions.len());
    for region in regions {
        if !out.contains(region) {
            out.push(region.clone());
        }
    }
    out
}

/// Fans region pollers out over a region set and concatenates what they
/// return, in region order.
pub struct Aggregator {
    identity: String,
    regions: Vec<String>,
    connector: Arc<dyn RegionConnector>,
    cache: SnapshotCache,
    settings: PollSettings,
    parallel: bool,
}

impl Aggregator {
    /// An empty `regions` list selects [`ALL_REGIONS`].
    pub fn new(
        identity: &str,
        regions: &[String],
        connector: Arc<dyn RegionConnector>,
        cache: SnapshotCache,
        settings: PollSettings,
    ) -> Self {
        let regions = if regions.is_empty() {
            ALL_REGIONS.iter().map(|r| r.to_string()).collect()
        } else {
            dedup_regions(regions)
        };
        Self {
            identity: identity.to_string(),
            regions,
            connector,
            cache,
            settings,
            parallel: true,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn run(&self) -> Result<Inventory, VolumapperError> {
        info!(regions = self.regions.len(), parallel = self.parallel, "running region pollers");

        let per_region: Vec<(Vec<Ec2Instance>, Vec<EbsVolume>)> = if self.parallel {
            self.regions
                .par_iter()
                .map(|region| self.poll_region(region))
                .collect::<Result<_, _>>()?
        } else {
            self.regions
                .iter()
                .map(|region| self.poll_region(region))
                .collect::<Result<_, _>>()?
        };

        let mut inventory = Inventory::default();
        for (instances, volumes) in per_region {
            inventory.instances.extend(instances);
            inventory.volumes.extend(volumes);
        }
        Ok(inventory)
    }

    fn poll_region(
        &self,
        region: &str,
    ) -> Result<(Vec<Ec2Instance>, Vec<EbsVolume>), VolumapperError> {
        info!(region, "obtaining instance & volume data");

        debug!(region, "establishing connection");
        let api = match self.connector.connect(region) {
            Ok(api) => api,
            Err(e) => {
                error!(region, error = %format!("{:#}", e), "could not connect to region");
                return Ok((Vec::new(), Vec::new()));
            }
        };

        let poller = RegionPoller::new(
            &self.identity,
            region,
            api,
            self.cache.clone(),
            self.settings.clone(),
        )?;
        let instances = poller.get_instances()?;
        let volumes = poller.get_volumes()?;
        Ok((instances, volumes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::SnapshotStore;
    use crate::pollers::provider::{Ec2Api, ProviderInstance, ProviderVolume};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Every region reports one instance and one attached volume named after it.
    struct FakeConnector {
        unreachable: Vec<String>,
        connected: Mutex<Vec<String>>,
    }

    struct FakeRegion {
        region: String,
    }

    impl Ec2Api for FakeRegion {
        fn list_instances(&self) -> anyhow::Result<Vec<ProviderInstance>> {
            Ok(vec![ProviderInstance {
                instance_id: Some(format!("i-{}", self.region)),
                state: Some("running".into()),
                instance_type: Some("t3.small".into()),
            }])
        }

        fn list_volumes(&self) -> anyhow::Result<Vec<ProviderVolume>> {
            Ok(vec![ProviderVolume {
                volume_id: Some(format!("vol-{}", self.region)),
                state: Some("in-use".into()),
                size_gb: Some(20),
                volume_type: Some("gp3".into()),
                attached_instance_ids: vec![format!("i-{}", self.region)],
            }])
        }
    }

    impl RegionConnector for FakeConnector {
        fn connect(&self, region: &str) -> anyhow::Result<Box<dyn Ec2Api>> {
            self.connected.lock().unwrap().push(region.to_string());
            if self.unreachable.iter().any(|r| r == region) {
                anyhow::bail!("no route to {}", region);
            }
            Ok(Box::new(FakeRegion {
                region: region.to_string(),
            }))
        }
    }

    fn connector(unreachable: &[&str]) -> Arc<FakeConnector> {
        Arc::new(FakeConnector {
            unreachable: unreachable.iter().map(|s| s.to_string()).collect(),
            connected: Mutex::new(Vec::new()),
        })
    }

    fn settings() -> PollSettings {
        PollSettings {
            force: false,
            include_rogue_volumes: false,
            instances_budget: Duration::from_secs(86_400),
            volumes_budget: Duration::from_secs(86_400),
        }
    }

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_regions_keeps_first() {
        assert_eq!(
            dedup_regions(&regions(&["eu-west-1", "us-east-1", "eu-west-1"])),
            regions(&["eu-west-1", "us-east-1"])
        );
    }

    #[test]
    fn test_default_region_set() {
        let tmp = tempdir().unwrap();
        let cache = SnapshotCache::new(Arc::new(SnapshotStore::new(tmp.path())));
        let agg = Aggregator::new("KEY", &[], connector(&[]), cache, settings());
        assert_eq!(agg.regions().len(), ALL_REGIONS.len());
        assert_eq!(agg.regions()[0], "us-east-1");
    }

    #[test]
    fn test_results_concatenate_in_region_order() {
        let tmp = tempdir().unwrap();
        let cache = SnapshotCache::new(Arc::new(SnapshotStore::new(tmp.path())));
        let names = regions(&["sa-east-1", "us-west-2", "eu-central-1", "us-west-2"]);

        for parallel in [true, false] {
            let agg = Aggregator::new("KEY", &names, connector(&[]), cache.clone(), settings())
                .parallel(parallel);
            let inventory = agg.run().unwrap();
            let ids: Vec<&str> = inventory.instances.iter().map(|i| i.id.as_str()).collect();
            assert_eq!(ids, vec!["i-sa-east-1", "i-us-west-2", "i-eu-central-1"]);
            let vols: Vec<&str> = inventory.volumes.iter().map(|v| v.id.as_str()).collect();
            assert_eq!(vols, vec!["vol-sa-east-1", "vol-us-west-2", "vol-eu-central-1"]);
        }
    }

    #[test]
    fn test_unreachable_region_contributes_nothing() {
        let tmp = tempdir().unwrap();
        let cache = SnapshotCache::new(Arc::new(SnapshotStore::new(tmp.path())));
        let conn = connector(&["us-west-1"]);
        let agg = Aggregator::new(
            "KEY",
            &regions(&["us-east-1", "us-west-1"]),
            conn.clone(),
            cache,
            settings(),
        )
        .parallel(false);

        let inventory = agg.run().unwrap();
        assert_eq!(inventory.instances.len(), 1);
        assert_eq!(inventory.volumes.len(), 1);
        assert_eq!(
            *conn.connected.lock().unwrap(),
            regions(&["us-east-1", "us-west-1"])
        );
        assert!(!tmp.path().join("KEY/us-west-1").exists());
    }
}
