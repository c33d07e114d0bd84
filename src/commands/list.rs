use anyhow::{Context, Result};
use log::debug;

use crate::{
    session::{DecisionSession, PackageView},
    workshop::MetadataSource,
};

use super::config::Config;

/// Print the installed mods with their state and dependencies.
#[tracing::instrument(skip(config))]
pub async fn list<M: MetadataSource>(config: Config<M>, json: bool) -> Result<()> {
    let session = DecisionSession::open(config.shell.as_ref(), &config.resolver, config.session)
        .await
        .context("Failed to load the server's mod state")?;

    let packages = session.list_packages();
    debug!("Listing {} mod(s)", packages.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
    } else {
        print!("{}", render(&packages));
    }
    Ok(())
}

fn render(packages: &[PackageView<'_>]) -> String {
    let width = packages
        .iter()
        .map(|p| p.record.local_name.len())
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    for package in packages {
        let record = package.record;
        out.push_str(&format!(
            "[{}] {:<width$}  {} ({})\n",
            if package.enabled { "x" } else { " " },
            record.local_name,
            record.label(),
            record.external_id,
        ));
        if !record.dependencies().is_empty() {
            out.push_str(&format!(
                "    {:<width$}  requires: {}\n",
                "",
                record.dependencies().join(", "),
            ));
        }
    }
    out
}
