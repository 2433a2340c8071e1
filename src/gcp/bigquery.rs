//! BigQuery load-job client (REST v2, multipart upload).
//!
//! A job is inserted with its configuration and NDJSON rows in one `multipart/related` request,
//! then polled with `jobs.get` until its state is `DONE`.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TransferError, TransferResult};
use crate::warehouse::{
    CompletedJob, LoadJob, SchemaField, SourceFormat, WarehouseClient, WriteDisposition,
};

use super::config::GcpConfig;

const BOUNDARY: &str = "warehouse_ingest_load_job_boundary";

#[derive(Debug, Clone)]
pub struct BigQueryClient {
    http: Client,
    endpoint: Url,
    project_id: String,
    access_token: String,
    poll_interval: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobInsert<'a> {
    configuration: JobConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobConfiguration<'a> {
    load: LoadConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadConfiguration<'a> {
    destination_table: TableReference<'a>,
    schema: TableSchema<'a>,
    write_disposition: WriteDisposition,
    source_format: SourceFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TableSchema<'a> {
    fields: &'a [SchemaField],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    #[serde(default)]
    status: JobStatus,
    #[serde(default)]
    statistics: Option<JobStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct JobStatistics {
    #[serde(default)]
    load: Option<LoadStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadStatistics {
    #[serde(default)]
    output_rows: Option<String>,
}

impl BigQueryClient {
    pub fn new(config: &GcpConfig) -> TransferResult<Self> {
        let endpoint = Url::parse(&config.bigquery_endpoint).map_err(|e| TransferError::Config {
            message: format!("invalid bigquery endpoint '{}': {e}", config.bigquery_endpoint),
        })?;
        Ok(Self {
            http: Client::builder().build()?,
            endpoint,
            project_id: config.project_id.clone(),
            access_token: config.access_token.clone(),
            poll_interval: config.poll_interval,
        })
    }

    fn url(&self, segments: &[&str]) -> TransferResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TransferError::Config {
                message: format!("bigquery endpoint '{}' cannot be a base url", self.endpoint),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn insert(&self, job: &LoadJob) -> TransferResult<Job> {
        let config = JobInsert {
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    destination_table: TableReference {
                        project_id: &self.project_id,
                        dataset_id: &job.destination.dataset,
                        table_id: &job.destination.table,
                    },
                    schema: TableSchema { fields: &job.schema },
                    write_disposition: job.write_disposition,
                    source_format: job.source_format,
                },
            },
        };
        let body = multipart_body(&serde_json::to_vec(&config)?, &job.to_ndjson()?);

        let mut url = self.url(&["upload", "bigquery", "v2", "projects", self.project_id.as_str(), "jobs"])?;
        url.query_pairs_mut().append_pair("uploadType", "multipart");

        let request = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(body);
        parse_job(send(request, None)?, None)
    }

    fn get(&self, reference: &JobReference) -> TransferResult<Job> {
        let mut url = self.url(&[
            "bigquery",
            "v2",
            "projects",
            self.project_id.as_str(),
            "jobs",
            reference.job_id.as_str(),
        ])?;
        if let Some(location) = &reference.location {
            url.query_pairs_mut().append_pair("location", location);
        }
        let request = self.http.get(url).bearer_auth(&self.access_token);
        let job_id = Some(reference.job_id.as_str());
        parse_job(send(request, job_id)?, job_id)
    }
}

impl WarehouseClient for BigQueryClient {
    fn run_load_job(&self, job: &LoadJob) -> TransferResult<CompletedJob> {
        let mut current = self.insert(job)?;
        debug!(job_id = %current.job_reference.job_id, destination = %job.destination, "inserted load job");

        while current.status.state != "DONE" {
            thread::sleep(self.poll_interval);
            current = self.get(&current.job_reference)?;
        }

        let job_id = current.job_reference.job_id;
        if let Some(err) = current.status.error_result {
            let details: Vec<String> = current
                .status
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.reason, e.message))
                .collect();
            let mut message = format!("{}: {}", err.reason, err.message);
            if !details.is_empty() {
                message.push_str(&format!(" [{}]", details.join("; ")));
            }
            return Err(TransferError::LoadJob {
                job_id: Some(job_id),
                message,
            });
        }

        let output_rows = current
            .statistics
            .and_then(|s| s.load)
            .and_then(|l| l.output_rows)
            .and_then(|n| n.parse().ok())
            .unwrap_or(job.rows.len() as u64);
        Ok(CompletedJob { job_id, output_rows })
    }
}

fn load_job_error(job_id: Option<&str>, message: String) -> TransferError {
    TransferError::LoadJob {
        job_id: job_id.map(str::to_owned),
        message,
    }
}

// Transport failures belong to the load-job step, not to staging.
fn send(request: RequestBuilder, job_id: Option<&str>) -> TransferResult<Response> {
    request
        .send()
        .map_err(|e| load_job_error(job_id, format!("request failed: {e}")))
}

fn parse_job(response: Response, job_id: Option<&str>) -> TransferResult<Job> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .map_err(|e| load_job_error(job_id, format!("unreadable job response: {e}")));
    }
    let body = response.text().unwrap_or_default();
    Err(load_job_error(job_id, format!("http {status}: {body}")))
}

fn multipart_body(config_json: &[u8], ndjson: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(config_json.len() + ndjson.len() + 256);
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(config_json);
    body.extend_from_slice(
        format!("\r\n--{BOUNDARY}\r\nContent-Type: application/octet-stream\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(ndjson);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{FieldMode, WarehouseType};

    #[test]
    fn load_configuration_uses_rest_field_names() {
        let fields = vec![SchemaField::new("a", WarehouseType::Integer, FieldMode::Nullable)];
        let config = JobInsert {
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    destination_table: TableReference {
                        project_id: "p",
                        dataset_id: "d",
                        table_id: "t",
                    },
                    schema: TableSchema { fields: &fields },
                    write_disposition: WriteDisposition::Append,
                    source_format: SourceFormat::NewlineDelimitedJson,
                },
            },
        };
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            serde_json::json!({
                "configuration": {"load": {
                    "destinationTable": {"projectId": "p", "datasetId": "d", "tableId": "t"},
                    "schema": {"fields": [{"name": "a", "type": "INTEGER", "mode": "NULLABLE"}]},
                    "writeDisposition": "WRITE_APPEND",
                    "sourceFormat": "NEWLINE_DELIMITED_JSON"
                }}
            })
        );
    }

    #[test]
    fn job_status_parses_error_result() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "jobReference": {"jobId": "j1", "location": "US"},
            "status": {"state": "DONE", "errorResult": {"reason": "invalid", "message": "bad row"}}
        }))
        .unwrap();
        assert_eq!(job.status.state, "DONE");
        assert_eq!(job.status.error_result.unwrap().message, "bad row");
    }

    #[test]
    fn unreachable_endpoint_fails_the_load_job_step() {
        let mut config = GcpConfig::new("p", "t");
        config.bigquery_endpoint = "http://127.0.0.1:1".to_string();
        let client = BigQueryClient::new(&config).unwrap();
        let job = LoadJob {
            destination: crate::warehouse::TableRef::new("d", "t"),
            schema: Vec::new(),
            write_disposition: WriteDisposition::Append,
            source_format: SourceFormat::NewlineDelimitedJson,
            rows: Vec::new(),
        };

        let err = client.run_load_job(&job).unwrap_err();
        assert!(matches!(err, TransferError::LoadJob { job_id: None, .. }));
        assert_eq!(err.stage(), crate::error::TransferStage::LoadJob);
    }

    #[test]
    fn multipart_body_frames_both_parts() {
        let body = String::from_utf8(multipart_body(b"{}", b"{\"a\":1}\n")).unwrap();
        assert!(body.starts_with(&format!("--{BOUNDARY}\r\n")));
        assert!(body.contains("{\"a\":1}\n"));
        assert!(body.ends_with(&format!("--{BOUNDARY}--\r\n")));
    }
}
