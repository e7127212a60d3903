use super::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const API_KEY_HEADER: &str = "X-Prodia-Key";

/// Job-based image API client: submit a job, then poll until it settles
pub struct HttpArtifactProducer {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
    poll_interval: Duration,
}

impl HttpArtifactProducer {
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Duration,
        poll_interval: Duration,
    ) -> ArtifactResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ArtifactError::ConfigError(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key,
            client,
            timeout,
            poll_interval,
        })
    }

    async fn submit_job(&self, request: &GenerateRequest) -> ArtifactResult<JobResponse> {
        let url = format!("{}/v1/sd/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&JobRequest::from(request))
            .send()
            .await
            .map_err(|e| ArtifactError::ApiError(format!("Failed to submit job: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ArtifactError::ApiError(format!(
                "Job submission returned {}: {}",
                status, body
            )));
        }

        response
            .json::<JobResponse>()
            .await
            .map_err(|e| ArtifactError::ParseError(format!("Invalid job response: {}", e)))
    }

    async fn fetch_job(&self, job_id: &str) -> ArtifactResult<JobResponse> {
        let url = format!("{}/v1/job/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ArtifactError::ApiError(format!("Failed to poll job: {}", e)))?;

        if !response.status().is_success() {
            return Err(ArtifactError::ApiError(format!(
                "Job poll returned {}",
                response.status()
            )));
        }

        response
            .json::<JobResponse>()
            .await
            .map_err(|e| ArtifactError::ParseError(format!("Invalid job response: {}", e)))
    }

    /// Poll until the job succeeds, fails, or the overall timeout runs out
    async fn wait_for(&self, mut job: JobResponse, start: Instant) -> ArtifactResult<Artifact> {
        loop {
            match job.status {
                JobStatus::Succeeded => {
                    let url = job.image_url.ok_or_else(|| {
                        ArtifactError::ParseError("Succeeded job has no imageUrl".to_string())
                    })?;
                    return Ok(Artifact {
                        url,
                        job_id: Some(job.job),
                    });
                }
                JobStatus::Failed => return Err(ArtifactError::JobFailed(job.job)),
                JobStatus::Queued | JobStatus::Generating => {}
            }

            if start.elapsed() >= self.timeout {
                return Err(ArtifactError::Timeout(self.timeout));
            }

            tokio::time::sleep(self.poll_interval).await;
            job = self.fetch_job(&job.job).await?;
        }
    }
}

#[derive(Debug, Serialize)]
struct JobRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cfg_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampler: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<AspectRatio>,
}

impl<'a> From<&'a GenerateRequest> for JobRequest<'a> {
    fn from(request: &'a GenerateRequest) -> Self {
        Self {
            prompt: &request.prompt,
            negative_prompt: request.negative_prompt.as_deref(),
            model: request.model.as_deref(),
            steps: request.steps,
            cfg_scale: request.cfg_scale,
            seed: request.seed,
            upscale: request.upscale,
            sampler: request.sampler.as_deref(),
            aspect_ratio: request.aspect_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum JobStatus {
    Queued,
    Generating,
    Succeeded,
    Failed,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    job: String,
    status: JobStatus,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

#[async_trait]
impl ArtifactProducer for HttpArtifactProducer {
    async fn generate(&self, request: GenerateRequest) -> ArtifactResult<Artifact> {
        request.validate()?;
        let start = Instant::now();

        let job = self.submit_job(&request).await?;
        tracing::debug!("Submitted generation job {}", job.job);

        let artifact = self.wait_for(job, start).await?;
        tracing::info!(
            "Generation job {:?} finished in {}ms",
            artifact.job_id,
            start.elapsed().as_millis()
        );
        Ok(artifact)
    }

    async fn list_models(&self) -> ArtifactResult<Vec<String>> {
        let url = format!("{}/v1/sd/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ArtifactError::ApiError(format!("Failed to list models: {}", e)))?;

        if !response.status().is_success() {
            return Err(ArtifactError::ApiError(format!(
                "Model list returned {}",
                response.status()
            )));
        }

        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| ArtifactError::ParseError(format!("Invalid model list: {}", e)))
    }

    fn name(&self) -> &str {
        "prodia"
    }
}
