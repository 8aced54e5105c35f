//! `POST /release` — promote a dev artifact to prod.

use http::Method;
use serde::Serialize;
use tracing::info;

use bigswitch_confirm::Promoter;
use bigswitch_core::ReleaseResult;

use crate::client::ReleaseClient;

const COMMITTER_NAME: &str = "Surveyor deployer";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseRequest<'a> {
    service: &'a str,
    environment: &'a str,
    artifact_id: &'a str,
    committer_name: &'a str,
    committer_email: &'a str,
    intent: Intent,
}

#[derive(Debug, Serialize)]
struct Intent {
    #[serde(rename = "type")]
    kind: &'static str,
    promote: PromoteIntent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PromoteIntent {
    from_environment: &'static str,
}

impl ReleaseClient {
    /// Ask the release manager to deploy `artifact_id` to prod.
    pub async fn promote_artifact(&self, service: &str, artifact_id: &str) -> ReleaseResult<()> {
        let body = release_request_body(service, artifact_id, self.caller())?;
        self.send(Method::POST, &self.path("release"), Some(body)).await?;
        info!(%service, artifact = %artifact_id, "release manager accepted promotion");
        Ok(())
    }
}

impl Promoter for ReleaseClient {
    async fn promote(&self, service: &str, artifact: &str) -> ReleaseResult<()> {
        self.promote_artifact(service, artifact).await
    }
}

fn release_request_body(service: &str, artifact_id: &str, caller: &str) -> ReleaseResult<Vec<u8>> {
    let req = ReleaseRequest {
        service,
        environment: "prod",
        artifact_id,
        committer_name: COMMITTER_NAME,
        committer_email: caller,
        intent: Intent {
            kind: "Promote",
            promote: PromoteIntent {
                from_environment: "dev",
            },
        },
    };
    Ok(serde_json::to_vec(&req)?)
}
