use std::cell::Cell;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use volumapper::core::cache::SnapshotCache;
use volumapper::core::store::{DataSourceKind, Partition, Snapshot, SnapshotStore};
use volumapper::core::time::{Clock, FixedClock};
use volumapper::model::{Ec2Instance, EbsVolume};
use volumapper::pollers::aggregator::Aggregator;
use volumapper::pollers::provider::{Ec2Api, ProviderInstance, ProviderVolume, RegionConnector};
use volumapper::pollers::region::PollSettings;
use volumapper::report;

const DAY: Duration = Duration::from_secs(86_400);

#[test]
fn test_refresh_reuse_force_scenario() {
    let tmp = tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(1_463_965_087));
    let cache = SnapshotCache::with_clock(
        Arc::new(SnapshotStore::new(tmp.path())),
        clock.clone() as Arc<dyn Clock>,
    );
    let partition =
        Partition::for_kind("ACCESS123", "us-east-1", DataSourceKind::Instances).unwrap();
    let fetches = Cell::new(0);
    let fetch = || {
        fetches.set(fetches.get() + 1);
        Ok::<_, String>(vec![Ec2Instance::new("i-1", "running", "t2.micro")])
    };

    // 1. no prior data: refresh and capture at T0
    let t0 = clock.now();
    let first = cache.fetch_or_reuse(&partition, DAY, false, fetch).unwrap();
    assert_eq!(first, vec![Ec2Instance::new("i-1", "running", "t2.micro")]);
    assert!(
        tmp.path()
            .join(format!("ACCESS123/us-east-1/instances/{}.json", t0))
            .is_file()
    );

    // 2. ten seconds later: replay, no remote call
    clock.advance(10);
    let second = cache.fetch_or_reuse(&partition, DAY, false, fetch).unwrap();
    assert_eq!(second, first);
    assert_eq!(fetches.get(), 1);

    // 3. forced: new capture at T1 > T0
    let third = cache.fetch_or_reuse(&partition, DAY, true, fetch).unwrap();
    assert_eq!(third, first);
    assert_eq!(fetches.get(), 2);
    let t1 = cache.store().latest_instant(&partition).unwrap().unwrap();
    assert_eq!(t1, t0 + 10);
    assert_eq!(cache.store().instants(&partition).unwrap(), vec![t0, t1]);

    // maintenance leaves only T1 behind
    let removed = cache.store().prune_all().unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(cache.store().instants(&partition).unwrap(), vec![t1]);
}

#[test]
fn test_snapshot_file_is_plain_json_array() {
    let tmp = tempdir().unwrap();
    let store = SnapshotStore::new(tmp.path());
    let partition = Partition::for_kind("KEY", "eu-west-1", DataSourceKind::Volumes).unwrap();
    let volumes = vec![EbsVolume::new("vol-1", "in-use", 8.0, "gp2", "i-1")];
    let path = store.write(&partition, &Snapshot::new(5, volumes)).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(
        raw,
        serde_json::json!([{
            "id": "vol-1",
            "status": "in-use",
            "size": 8.0,
            "type": "gp2",
            "instance_id": "i-1"
        }])
    );
}

struct StaticRegion;

impl Ec2Api for StaticRegion {
    fn list_instances(&self) -> anyhow::Result<Vec<ProviderInstance>> {
        Ok(vec![ProviderInstance {
            instance_id: Some("i-1".into()),
            state: Some("running".into()),
            instance_type: Some("t2.micro".into()),
        }])
    }

    fn list_volumes(&self) -> anyhow::Result<Vec<ProviderVolume>> {
        Ok(vec![
            ProviderVolume {
                volume_id: Some("vol-1".into()),
                state: Some("in-use".into()),
                size_gb: Some(8),
                volume_type: Some("gp2".into()),
                attached_instance_ids: vec!["i-1".into()],
            },
            ProviderVolume {
                volume_id: Some("vol-2".into()),
                state: Some("in-use".into()),
                size_gb: Some(16),
                volume_type: Some("gp2".into()),
                attached_instance_ids: vec!["i-404".into()],
            },
        ])
    }
}

struct OneGoodRegion;

impl RegionConnector for OneGoodRegion {
    fn connect(&self, region: &str) -> anyhow::Result<Box<dyn Ec2Api>> {
        if region == "us-east-1" {
            Ok(Box::new(StaticRegion))
        } else {
            anyhow::bail!("AuthFailure in {}", region)
        }
    }
}

#[test]
fn test_report_renders_with_degraded_regions() {
    let tmp = tempdir().unwrap();
    let cache = SnapshotCache::new(Arc::new(SnapshotStore::new(tmp.path())));
    let settings = PollSettings {
        force: false,
        include_rogue_volumes: false,
        instances_budget: DAY,
        volumes_budget: DAY,
    };
    let regions = vec!["us-east-1".to_string(), "ap-southeast-2".to_string()];
    let inventory = Aggregator::new(
        "ACCESS123",
        &regions,
        Arc::new(OneGoodRegion),
        cache,
        settings,
    )
    .run()
    .unwrap();

    let rows = report::build_rows(&inventory.volumes, &inventory.instances);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].instance_id, "i-1");
    assert_eq!(rows[0].instance_type, "t2.micro");
    assert_eq!(rows[0].instance_state, "running");
    assert_eq!(rows[1].volume_id, "vol-2");
    assert_eq!(rows[1].instance_id, report::MISSING_TEXT);
    assert_eq!(rows[1].instance_type, report::MISSING_TEXT);
    assert_eq!(rows[1].instance_state, report::MISSING_TEXT);

    let table = report::render_table(&rows);
    assert!(table.contains("NOT FOUND"));
    assert!(table.contains("16.0GB"));
}
