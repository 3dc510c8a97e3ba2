//! GitLab generic packages registry

use super::http::{HttpClient, HttpRequest};
use super::{PackageRef, PackageRegistry, UploadReceipt};
use crate::error::CartwheelResult;
use crate::ui::TransferProgress;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const PAGE_SIZE: usize = 100;

/// Packages of one GitLab project, addressed through the v4 REST API
pub struct GitLabRegistry {
    http: HttpClient,
    api_url: String,
    project_id: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageSummary {
    name: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct Acknowledgement {
    message: Option<String>,
}

impl GitLabRegistry {
    /// `api_url` is the API root, e.g. `https://gitlab.example.com/api/v4`
    pub fn new(
        http: HttpClient,
        api_url: impl Into<String>,
        project_id: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            token,
        }
    }

    fn packages_url(&self) -> String {
        format!("{}/projects/{}/packages", self.api_url, self.project_id)
    }

    fn file_url(&self, package: &PackageRef) -> String {
        format!(
            "{}/generic/{}/{}/{}",
            self.packages_url(),
            package.name,
            package.version,
            package.file_name
        )
    }

    fn request(&self, url: String) -> HttpRequest {
        let request = HttpRequest::new(url);
        match self.token {
            Some(ref token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }
}

#[async_trait]
impl PackageRegistry for GitLabRegistry {
    async fn list_versions(&self, name: &str) -> CartwheelResult<Vec<String>> {
        let mut versions = Vec::new();
        let mut page = 1usize;
        loop {
            let request = self
                .request(self.packages_url())
                .query("package_name", name)
                .query("per_page", &PAGE_SIZE.to_string())
                .query("page", &page.to_string());
            let body = self.http.get_text(request).await?;
            let packages: Vec<PackageSummary> = serde_json::from_str(&body)?;
            let count = packages.len();

            // package_name is a fuzzy filter on the server side
            versions.extend(
                packages
                    .into_iter()
                    .filter(|p| p.name == name)
                    .map(|p| p.version),
            );

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        debug!("Registry lists {} version(s) of {}", versions.len(), name);
        Ok(versions)
    }

    async fn download(
        &self,
        package: &PackageRef,
        destination: &Path,
        progress: TransferProgress,
    ) -> CartwheelResult<u64> {
        let request = self.request(self.file_url(package));
        self.http.download(request, destination, progress).await
    }

    async fn upload(
        &self,
        package: &PackageRef,
        file: &Path,
        progress: TransferProgress,
    ) -> CartwheelResult<UploadReceipt> {
        let request = self.request(self.file_url(package));
        let (status, body) = self.http.put_file(request, file, progress).await?;
        let message = serde_json::from_str::<Acknowledgement>(&body)
            .ok()
            .and_then(|ack| ack.message)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            });
        debug!("Upload of {} {} answered {}", package.name, package.version, status);
        Ok(UploadReceipt { status, message })
    }
}
