use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    prompt::Prompt,
    remote::RemoteShell,
    selection::{ToggleEffect, ToggleRequest},
    session::DecisionSession,
    workshop::MetadataSource,
};

use super::config::Config;

/// Enable mods, asking before pulling in their dependencies.
#[tracing::instrument(skip(config, prompt))]
pub async fn enable<M: MetadataSource, P: Prompt>(
    config: Config<M>,
    names: &[String],
    prompt: &P,
    dry_run: bool,
) -> Result<()> {
    let mut session = DecisionSession::open(config.shell.as_ref(), &config.resolver, config.session)
        .await
        .context("Failed to load the server's mod state")?;

    for line in apply(&mut session, names, true, prompt)? {
        println!("{}", line);
    }
    finish(&mut session, dry_run).await
}

/// Disable mods. Their dependencies are left alone.
#[tracing::instrument(skip(config))]
pub async fn disable<M: MetadataSource>(config: Config<M>, names: &[String], dry_run: bool) -> Result<()> {
    let mut session = DecisionSession::open(config.shell.as_ref(), &config.resolver, config.session)
        .await
        .context("Failed to load the server's mod state")?;

    // disabling never asks for confirmation
    for line in apply(&mut session, names, false, &crate::prompt::AssumeYes)? {
        println!("{}", line);
    }
    finish(&mut session, dry_run).await
}

/// Send one toggle per name and return what happened, one line each.
pub(crate) fn apply<S: RemoteShell + ?Sized, P: Prompt>(
    session: &mut DecisionSession<'_, S>,
    names: &[String],
    enable: bool,
    prompt: &P,
) -> Result<Vec<String>> {
    let mut report = Vec::new();
    for name in names {
        let local_name = session
            .lookup(name)
            .ok_or_else(|| anyhow!("No installed mod is called {:?}", name))?
            .to_string();
        let request = ToggleRequest {
            local_name,
            enable,
        };

        let mut effect = session.request_toggle(request)?;
        if let ToggleEffect::ConfirmRequired {
            package,
            dependencies,
            missing,
        } = &effect
        {
            let mut question = format!(
                "{} requires {}. Enable them too?",
                package,
                dependencies.join(", ")
            );
            if !missing.is_empty() {
                question.push_str(&format!(" (not installed: {})", missing.join(", ")));
            }
            let accept = prompt.confirm(&question)?;
            effect = session.confirm_cascade(accept)?;
        }
        report.push(describe(&effect));
    }
    Ok(report)
}

async fn finish<S: RemoteShell + ?Sized>(session: &mut DecisionSession<'_, S>, dry_run: bool) -> Result<()> {
    if dry_run {
        print!("{}", session.preview().text);
        return Ok(());
    }

    let path = session.compose_path().to_string();
    if session
        .commit_final()
        .await
        .with_context(|| format!("Failed to update {}", path))?
    {
        info!("Restart the server for the change to take effect");
        println!("Updated {}", path);
    } else {
        println!("No changes to {}", path);
    }
    Ok(())
}

fn describe(effect: &ToggleEffect) -> String {
    match effect {
        ToggleEffect::Unchanged { package } => format!("{} is already in that state", package),
        ToggleEffect::ConfirmRequired { package, .. } => {
            format!("{} is waiting for confirmation", package)
        }
        ToggleEffect::Enabled { package, cascaded } if cascaded.is_empty() => {
            format!("Enabled {}", package)
        }
        ToggleEffect::Enabled { package, cascaded } => {
            format!("Enabled {} (with {})", package, cascaded.join(", "))
        }
        ToggleEffect::Disabled { package } => format!("Disabled {}", package),
        ToggleEffect::RolledBack { package } => format!("Left {} disabled", package),
    }
}
