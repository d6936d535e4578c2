//! AWS EC2 provider backed by `aws-sdk-ec2`.
//!
//! The SDK is async; the rest of the crate is not. One multi-thread runtime
//! is shared by every region client and each call blocks on it.

use crate::core::error::VolumapperError;
use crate::pollers::credentials::AwsCredentials;
use crate::pollers::provider::{Ec2Api, ProviderInstance, ProviderVolume, RegionConnector};
use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::config::Credentials;
use aws_sdk_ec2::error::DisplayErrorContext;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

pub struct AwsConnector {
    credentials: AwsCredentials,
    endpoint_url: Option<String>,
    runtime: Arc<Runtime>,
}

impl AwsConnector {
    pub fn new(
        credentials: AwsCredentials,
        endpoint_url: Option<String>,
    ) -> Result<Self, VolumapperError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(VolumapperError::IoError)?;
        Ok(Self {
            credentials,
            endpoint_url,
            runtime: Arc::new(runtime),
        })
    }
}

impl RegionConnector for AwsConnector {
    fn connect(&self, region: &str) -> anyhow::Result<Box<dyn Ec2Api>> {
        let credentials = Credentials::new(
            &self.credentials.access_key_id,
            self.credentials.secret_access_key(),
            None,
            None,
            "volumapper",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let config = self.runtime.block_on(loader.load());
        debug!(region, "connected to EC2");

        Ok(Box::new(AwsRegionClient {
            region: region.to_string(),
            client: Client::new(&config),
            runtime: Arc::clone(&self.runtime),
        }))
    }
}

struct AwsRegionClient {
    region: String,
    client: Client,
    runtime: Arc<Runtime>,
}

impl Ec2Api for AwsRegionClient {
    fn list_instances(&self) -> anyhow::Result<Vec<ProviderInstance>> {
        self.runtime.block_on(async {
            let mut out = Vec::new();
            let mut pages = self.client.describe_instances().into_paginator().send();
            while let Some(page) = pages.next().await {
                let page = page
                    .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))
                    .with_context(|| format!("DescribeInstances in {}", self.region))?;
                for reservation in page.reservations() {
                    for instance in reservation.instances() {
                        out.push(ProviderInstance {
                            instance_id: instance.instance_id().map(str::to_string),
                            state: instance
                                .state()
                                .and_then(|s| s.name())
                                .map(|n| n.as_str().to_string()),
                            instance_type: instance.instance_type().map(|t| t.as_str().to_string()),
                        });
                    }
                }
            }
            Ok::<_, anyhow::Error>(out)
        })
    }

    fn list_volumes(&self) -> anyhow::Result<Vec<ProviderVolume>> {
        self.runtime.block_on(async {
            let mut out = Vec::new();
            let mut pages = self.client.describe_volumes().into_paginator().send();
            while let Some(page) = pages.next().await {
                let page = page
                    .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))
                    .with_context(|| format!("DescribeVolumes in {}", self.region))?;
                for volume in page.volumes() {
                    out.push(ProviderVolume {
                        volume_id: volume.volume_id().map(str::to_string),
                        state: volume.state().map(|s| s.as_str().to_string()),
                        size_gb: volume.size(),
                        volume_type: volume.volume_type().map(|t| t.as_str().to_string()),
                        attached_instance_ids: volume
                            .attachments()
                            .iter()
                            .filter_map(|a| a.instance_id().map(str::to_string))
                            .collect(),
                    });
                }
            }
            Ok::<_, anyhow::Error>(out)
        })
    }
}
