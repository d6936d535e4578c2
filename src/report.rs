//! Volume → instance report.

use crate::model::{Ec2Instance, EbsVolume};
use serde::Serialize;
use std::collections::HashMap;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Rendered in every instance column when a volume points at an unknown instance.
pub const MISSING_TEXT: &str = "NOT FOUND";

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ReportRow {
    #[tabled(rename = "Instance ID")]
    pub instance_id: String,
    #[tabled(rename = "Instance Type")]
    pub instance_type: String,
    #[tabled(rename = "Instance State")]
    pub instance_state: String,
    #[tabled(rename = "Volume ID")]
    pub volume_id: String,
    #[tabled(rename = "Volume Status")]
    pub volume_status: String,
    #[tabled(rename = "Volume Size")]
    pub volume_size: String,
}

/// One row per volume, in volume order.
pub fn build_rows(volumes: &[EbsVolume], instances: &[Ec2Instance]) -> Vec<ReportRow> {
    let by_id: HashMap<&str, &Ec2Instance> =
        instances.iter().map(|i| (i.id.as_str(), i)).collect();

    volumes
        .iter()
        .map(|volume| {
            let (instance_id, instance_type, instance_state) =
                match by_id.get(volume.instance_id.as_str()) {
                    Some(instance) => (
                        instance.id.clone(),
                        instance.instance_type.clone(),
                        instance.state.clone(),
                    ),
                    None => (
                        MISSING_TEXT.to_string(),
                        MISSING_TEXT.to_string(),
                        MISSING_TEXT.to_string(),
                    ),
                };
            ReportRow {
                instance_id,
                instance_type,
                instance_state,
                volume_id: volume.id.clone(),
                volume_status: volume.status.clone(),
                volume_size: format!("{:.1}GB", volume.size),
            }
        })
        .collect()
}

pub fn render_table(rows: &[ReportRow]) -> String {
    let mut table = Table::new(rows);
    table.with(Style::psql());
    table.to_string()
}

pub fn render_json(rows: &[ReportRow]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instances() -> Vec<Ec2Instance> {
        vec![
            Ec2Instance::new("i-1", "running", "t2.micro"),
            Ec2Instance::new("i-2", "stopped", "m5.large"),
        ]
    }

    #[test]
    fn test_join_found_instance() {
        let volumes = vec![EbsVolume::new("vol-1", "in-use", 8.0, "gp2", "i-1")];
        let rows = build_rows(&volumes, &instances());
        assert_eq!(
            rows,
            vec![ReportRow {
                instance_id: "i-1".into(),
                instance_type: "t2.micro".into(),
                instance_state: "running".into(),
                volume_id: "vol-1".into(),
                volume_status: "in-use".into(),
                volume_size: "8.0GB".into(),
            }]
        );
    }

    #[test]
    fn test_join_missing_instance_marks_not_found() {
        let volumes = vec![
            EbsVolume::new("vol-1", "in-use", 8.0, "gp2", "i-1"),
            EbsVolume::new("vol-2", "in-use", 500.0, "st1", "i-404"),
            EbsVolume::new("vol-3", "available", 1.0, "gp3", ""),
        ];
        let rows = build_rows(&volumes, &instances());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].instance_state, "running");
        for row in &rows[1..] {
            assert_eq!(row.instance_id, MISSING_TEXT);
            assert_eq!(row.instance_type, MISSING_TEXT);
            assert_eq!(row.instance_state, MISSING_TEXT);
        }
        assert_eq!(rows[1].volume_id, "vol-2");
        assert_eq!(rows[1].volume_size, "500.0GB");
    }

    #[test]
    fn test_render_table_has_headers_and_rows() {
        let volumes = vec![EbsVolume::new("vol-2", "in-use", 10.0, "gp2", "i-404")];
        let rendered = render_table(&build_rows(&volumes, &instances()));
        for header in [
            "Instance ID",
            "Instance Type",
            "Instance State",
            "Volume ID",
            "Volume Status",
            "Volume Size",
        ] {
            assert!(rendered.contains(header), "missing header {}", header);
        }
        assert!(rendered.contains("NOT FOUND"));
        assert!(rendered.contains("10.0GB"));
    }

    #[test]
    fn test_render_json() {
        let volumes = vec![EbsVolume::new("vol-1", "in-use", 8.0, "gp2", "i-1")];
        let json = render_json(&build_rows(&volumes, &instances())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["instance_type"], "t2.micro");
        assert_eq!(value[0]["volume_size"], "8.0GB");
    }
}
