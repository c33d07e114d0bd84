use anyhow::{Result, bail};
use log::debug;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    http::HttpClient,
    metadata::MetadataResolver,
    remote::{LocalShell, RemoteShell, SshShell, SshTarget},
    session::SessionOptions,
    workshop::{MetadataSource, SteamWorkshop},
};

/// Everything the command line decided, before any connection is made.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity: Option<PathBuf>,
    /// Run commands on this machine instead of over SSH.
    pub local: bool,
    pub workshop_url: Option<String>,
    pub fetch_timeout: Duration,
    pub command_timeout: Duration,
    pub session: SessionOptions,
}

pub struct Config<M: MetadataSource> {
    pub shell: Box<dyn RemoteShell>,
    pub resolver: MetadataResolver<M>,
    pub session: SessionOptions,
}

impl Config<SteamWorkshop> {
    pub fn new(settings: Settings) -> Result<Self> {
        let shell: Box<dyn RemoteShell> = match (settings.local, settings.host) {
            (true, _) => Box::new(LocalShell::new(settings.command_timeout)),
            (false, Some(host)) => Box::new(SshShell::new(
                SshTarget {
                    host,
                    user: settings.user,
                    port: settings.port,
                    identity: settings.identity,
                },
                settings.command_timeout,
            )),
            (false, None) => bail!("No server given; pass --host (or TMODMAN_HOST) or --local"),
        };
        debug!("Managing mods on {}", shell.describe());

        let client = Client::builder()
            .user_agent(concat!("tmodman/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.fetch_timeout)
            .build()?;
        let workshop = SteamWorkshop::new(HttpClient::new(client), settings.workshop_url);
        debug!("Workshop pages from {}", workshop.base_url());

        Ok(Self {
            shell,
            resolver: MetadataResolver::new(workshop, settings.fetch_timeout),
            session: settings.session,
        })
    }
}
