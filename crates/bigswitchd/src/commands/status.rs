//! `bigswitchd status` — one-shot view of dev/prod for every configured service.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::warn;

use bigswitch_core::Artifacts;
use bigswitch_release::ReleaseClient;

pub async fn run(path: &Path) -> Result<()> {
    let config = super::load_config(path)?;
    let client = ReleaseClient::from_config(
        &config.release_manager,
        config.release_manager.request_timeout()?,
    )
    .context("building release manager client")?;

    let mut failed = 0;
    for service in &config.services {
        match client.get_artifacts(&service.name, service.namespace()).await {
            Ok(artifacts) => println!("{}", render(&artifacts)),
            Err(e) => {
                warn!(service = %service.name, error = %e, "status request failed");
                println!("{:<24} error: {e}", service.name);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} services could not be queried", config.services.len());
    }
    Ok(())
}

fn render(a: &Artifacts) -> String {
    let verdict = if a.is_prod_behind() { "BEHIND" } else { "in sync" };
    format!("{:<24} dev={}  prod={}  {verdict}", a.service, a.dev, a.prod)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigswitch_core::Artifact;

    #[test]
    fn render_marks_stale_prod() {
        let a = Artifacts {
            service: "payments".into(),
            dev: Artifact::new("v2", 200),
            prod: Artifact::new("v1", 100),
        };
        let line = render(&a);
        assert!(line.starts_with("payments"));
        assert!(line.contains("dev=v2@200"));
        assert!(line.contains("prod=v1@100"));
        assert!(line.ends_with("BEHIND"));
    }

    #[test]
    fn render_in_sync() {
        let a = Artifacts {
            service: "payments".into(),
            dev: Artifact::new("v2", 200),
            prod: Artifact::new("v2", 200),
        };
        assert!(render(&a).ends_with("in sync"));
    }
}
