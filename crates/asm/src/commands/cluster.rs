//! Cluster subcommand handlers.

use tracing::info;

use asm_core::ManifestDirEngine;
use asm_core::cluster::{
    EsxHostFacts, StaticInventory, VdsEvictionOptions, VsanEviction, build_vds_eviction,
    build_vsan_eviction, evict_host, evict_vsan,
};

use crate::cli::{ClusterArgs, ClusterCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Stage};

use super::util;

pub async fn handle(args: ClusterArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let planner = config::planner_config(cfg)?;

    match args.command {
        ClusterCommand::EvictVds {
            host_facts,
            inventory,
            template_backup_nic,
            target,
        } => {
            let host: EsxHostFacts = util::read_json("host facts file", &host_facts)?;
            let inventory: StaticInventory = match inventory {
                Some(path) => util::read_json("inventory file", &path)?,
                None => StaticInventory::new(),
            };

            if let Some(dir) = target.out_dir {
                let engine = ManifestDirEngine::new(dir);
                let report = evict_host(
                    &engine,
                    &target.vcenter,
                    &host,
                    &inventory,
                    &planner,
                    template_backup_nic.as_deref(),
                    None,
                )
                .await;
                info!(host = %host.hostname, steps = report.outcomes().len(), "wrote VDS eviction");
                return Ok(report.into_result()?);
            }

            let options = VdsEvictionOptions {
                ordering: planner.ordering,
                template_backup_nic,
            };
            let manifest = build_vds_eviction(&host, &inventory, &options)?.to_manifest()?;
            let stages = [Stage {
                stage: "evict-vds".into(),
                target: target.vcenter,
                resources: manifest,
            }];
            let out = output::render_stages(config::output_format(global, cfg), &stages)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClusterCommand::EvictVsan {
            cluster,
            datacenter,
            hosts,
            host,
            target,
        } => {
            let request = VsanEviction {
                cluster,
                datacenter,
                hosts,
                evict_host: host,
            };

            if let Some(dir) = target.out_dir {
                let engine = ManifestDirEngine::new(dir);
                evict_vsan(&engine, &target.vcenter, &request, &planner).await?;
                return Ok(());
            }

            let manifest = build_vsan_eviction(&request, planner.ordering)?.to_manifest()?;
            let stages = [Stage {
                stage: "evict-vsan".into(),
                target: target.vcenter,
                resources: manifest,
            }];
            let out = output::render_stages(config::output_format(global, cfg), &stages)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
