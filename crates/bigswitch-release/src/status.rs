//! `GET /status` — current dev and prod artifacts of a service.

use http::Method;
use serde::Deserialize;
use tracing::debug;

use bigswitch_core::{Artifact, Artifacts, ReleaseResult};
use bigswitch_watch::StatusSource;

use crate::client::ReleaseClient;

#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    environments: Vec<EnvironmentStatus>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentStatus {
    name: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    date: i64,
}

impl ReleaseClient {
    /// Fetch the artifacts deployed to `dev` and `prod` for `service`.
    pub async fn get_artifacts(
        &self,
        service: &str,
        namespace: Option<&str>,
    ) -> ReleaseResult<Artifacts> {
        let path = format!("{}?{}", self.path("status"), status_query(service, namespace));

        let body = self.send(Method::GET, &path, None).await?;
        let artifacts = parse_status(service, &body)?;
        debug!(%service, dev = %artifacts.dev, prod = %artifacts.prod, "fetched artifacts");
        Ok(artifacts)
    }
}

impl StatusSource for ReleaseClient {
    async fn artifacts(&self, service: &str, namespace: Option<&str>) -> ReleaseResult<Artifacts> {
        self.get_artifacts(service, namespace).await
    }
}

fn status_query(service: &str, namespace: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("service", service);
    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        query.append_pair("namespace", ns);
    }
    query.finish()
}

fn parse_status(service: &str, body: &[u8]) -> ReleaseResult<Artifacts> {
    let payload: StatusPayload = serde_json::from_slice(body)?;

    let mut artifacts = Artifacts {
        service: service.to_string(),
        ..Default::default()
    };
    for env in payload.environments {
        let artifact = Artifact::new(env.tag, env.date);
        match env.name.as_str() {
            "dev" => artifacts.dev = artifact,
            "prod" => artifacts.prod = artifact,
            _ => {}
        }
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigswitch_core::ReleaseError;

    #[test]
    fn query_encodes_values() {
        assert_eq!(status_query("some-service_1.0", None), "service=some-service_1.0");
        assert_eq!(
            status_query("a b&c=d/é", Some("prod")),
            "service=a+b%26c%3Dd%2F%C3%A9&namespace=prod"
        );
        assert_eq!(status_query("svc", Some("")), "service=svc");
    }

    const STATUS: &str = r#"{
  "defaultNamespaces": true,
  "environments": [
    {
      "name": "dev",
      "tag": "master-04169c5a19-a9c84eb8ff",
      "committer": "GitHub",
      "author": "Awesome dev 1",
      "date": 1674119917135
    },
    {
      "name": "staging",
      "tag": "ignored",
      "date": 1
    },
    {
      "name": "prod",
      "tag": "master-6831b4ba23-5876ec33b0",
      "committer": "GitHub",
      "date": 1674119916510
    }
  ]
}"#;

    #[test]
    fn parses_dev_and_prod() {
        let a = parse_status("some-service", STATUS.as_bytes()).unwrap();
        assert_eq!(a.service, "some-service");
        assert_eq!(a.dev, Artifact::new("master-04169c5a19-a9c84eb8ff", 1674119917135));
        assert_eq!(a.prod, Artifact::new("master-6831b4ba23-5876ec33b0", 1674119916510));
        assert!(a.is_prod_behind());
    }

    #[test]
    fn missing_prod_is_empty() {
        let body = r#"{"environments":[{"name":"dev","tag":"b","date":100}]}"#;
        let a = parse_status("svc", body.as_bytes()).unwrap();
        assert!(a.prod.is_empty());
        assert!(!a.is_prod_behind());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = parse_status("svc", b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, ReleaseError::Decode(_)));
    }
}
