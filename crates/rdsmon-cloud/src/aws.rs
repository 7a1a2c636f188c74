use crate::error::{Result, SourceError};
use crate::{IdentitySource, MetricSource};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use rdsmon_common::types::InstanceSnapshot;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const RDS_VERSION: &str = "2014-10-31";
const MONITORING_VERSION: &str = "2010-08-01";
const STS_VERSION: &str = "2011-06-15";
const IAM_VERSION: &str = "2010-05-08";

/// RDS/CloudWatch-backed [`MetricSource`] and [`IdentitySource`] for one
/// account and region.
///
/// Calls the AWS Query APIs directly with SigV4-signed POSTs; the
/// `Accept: application/json` header switches the Query protocol from
/// XML to JSON so responses can be picked apart with `serde_json`.
pub struct AwsSource {
    client: Client,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    lookback_min: u64,
    period_sec: u64,
}

impl AwsSource {
    /// Build a source from the standard AWS credential environment
    /// variables. Fails when `AWS_ACCESS_KEY_ID` or
    /// `AWS_SECRET_ACCESS_KEY` is absent.
    pub fn from_env(region: &str, lookback_min: u64, period_sec: u64) -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| SourceError::MissingCredentials("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| SourceError::MissingCredentials("AWS_SECRET_ACCESS_KEY"))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        let client = Client::builder()
            .use_rustls_tls()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            region: region.to_string(),
            access_key_id,
            secret_access_key,
            session_token,
            lookback_min,
            period_sec,
        })
    }

    /// AWS Signature Version 4 for a POST to `/` with the given
    /// form-encoded payload.
    fn sign_v4(
        &self,
        service: &str,
        host: &str,
        region: &str,
        payload: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        // Step 1: canonical request
        let canonical_headers = format!(
            "content-type:application/x-www-form-urlencoded; charset=utf-8\nhost:{host}\nx-amz-date:{amz_date}\n"
        );
        let signed_headers = "content-type;host;x-amz-date";
        let hashed_payload = format!("{:x}", Sha256::digest(payload.as_bytes()));
        let canonical_request = format!(
            "POST\n/\n\n{canonical_headers}\n{signed_headers}\n{hashed_payload}"
        );
        let hashed_canonical_request = format!("{:x}", Sha256::digest(canonical_request.as_bytes()));

        // Step 2: string to sign
        let credential_scope = format!("{date}/{region}/{service}/aws4_request");
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{hashed_canonical_request}"
        );

        // Step 3: derive the signing key and sign
        let secret_date = hmac_sha256(
            format!("AWS4{}", self.secret_access_key).as_bytes(),
            date.as_bytes(),
        )?;
        let secret_region = hmac_sha256(&secret_date, region.as_bytes())?;
        let secret_service = hmac_sha256(&secret_region, service.as_bytes())?;
        let secret_signing = hmac_sha256(&secret_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes())?);

        // Step 4: authorization header
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key_id
        );

        Ok((authorization, amz_date))
    }

    /// Call an AWS Query API action and return the parsed JSON body.
    async fn call_api(
        &self,
        service: &'static str,
        host: &str,
        region: &str,
        action: &str,
        version: &str,
        params: &[(&str, String)],
    ) -> Result<Value> {
        let mut body = format!("Action={action}&Version={version}");
        for (key, value) in params {
            body.push('&');
            body.push_str(key);
            body.push('=');
            body.push_str(&urlencoding::encode(value));
        }

        let now = Utc::now();
        let (authorization, amz_date) = self.sign_v4(service, host, region, &body, now)?;

        let mut request = self
            .client
            .post(format!("https://{host}/"))
            .header(
                "Content-Type",
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .header("Host", host.to_string())
            .header("X-Amz-Date", amz_date)
            .header("Authorization", authorization)
            .header("Accept", "application/json")
            .body(body);

        // The session token is allowed to travel unsigned; it is added
        // after the signature is calculated.
        if let Some(token) = &self.session_token {
            request = request.header("X-Amz-Security-Token", token.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::HttpError {
                service,
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn call_rds(&self, action: &str, params: &[(&str, String)]) -> Result<Value> {
        let host = format!("rds.{}.amazonaws.com", self.region);
        self.call_api("rds", &host, &self.region, action, RDS_VERSION, params)
            .await
    }

    async fn call_cloudwatch(&self, action: &str, params: &[(&str, String)]) -> Result<Value> {
        let host = format!("monitoring.{}.amazonaws.com", self.region);
        self.call_api(
            "monitoring",
            &host,
            &self.region,
            action,
            MONITORING_VERSION,
            params,
        )
        .await
    }

    /// Latest average of one CloudWatch metric over the lookback
    /// window. Best-effort: any failure is logged and becomes `None`.
    async fn latest_metric(&self, metric_name: &str, instance_id: &str) -> Option<f64> {
        let end = Utc::now();
        let start = lookback_start(end, self.lookback_min);
        let params = [
            ("Namespace", "AWS/RDS".to_string()),
            ("MetricName", metric_name.to_string()),
            (
                "Dimensions.member.1.Name",
                "DBInstanceIdentifier".to_string(),
            ),
            ("Dimensions.member.1.Value", instance_id.to_string()),
            (
                "StartTime",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("EndTime", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("Period", self.period_sec.to_string()),
            ("Statistics.member.1", "Average".to_string()),
        ];

        match self.call_cloudwatch("GetMetricStatistics", &params).await {
            Ok(response) => latest_average(&response),
            Err(e) => {
                tracing::warn!(
                    instance_id,
                    metric = metric_name,
                    error = %e,
                    "metric fetch failed, treating as no data"
                );
                None
            }
        }
    }

    /// Value of the `Name` tag, best-effort.
    async fn name_tag(&self, arn: &str) -> Option<String> {
        let params = [("ResourceName", arn.to_string())];
        let response = match self.call_rds("ListTagsForResource", &params).await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(arn, error = %e, "tag lookup failed");
                return None;
            }
        };
        response
            .pointer("/ListTagsForResourceResponse/ListTagsForResourceResult/TagList")?
            .as_array()?
            .iter()
            .find(|tag| tag.get("Key").and_then(Value::as_str) == Some("Name"))
            .and_then(|tag| tag.get("Value").and_then(Value::as_str))
            .map(str::to_string)
    }

    /// Pending maintenance actions for one instance, best-effort.
    /// Returns (has_pending, action names).
    async fn pending_maintenance(&self, arn: &str) -> (bool, Vec<String>) {
        let params = [("ResourceIdentifier", arn.to_string())];
        let response = match self
            .call_rds("DescribePendingMaintenanceActions", &params)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(arn, error = %e, "pending maintenance lookup failed");
                return (false, Vec::new());
            }
        };

        let mut names: Vec<String> = response
            .pointer("/DescribePendingMaintenanceActionsResponse/DescribePendingMaintenanceActionsResult/PendingMaintenanceActions")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|item| item.get("PendingMaintenanceActionDetails")?.as_array())
            .flatten()
            .filter_map(|detail| detail.get("Action")?.as_str())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        (!names.is_empty(), names)
    }

    /// Describe every instance in the region, following pagination.
    async fn describe_db_instances(&self) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = Vec::new();
            if let Some(m) = &marker {
                params.push(("Marker", m.clone()));
            }
            let response = self.call_rds("DescribeDBInstances", &params).await?;
            let result = response
                .pointer("/DescribeDBInstancesResponse/DescribeDBInstancesResult")
                .ok_or_else(|| SourceError::Malformed {
                    service: "rds",
                    detail: "missing DescribeDBInstancesResult".to_string(),
                })?;

            if let Some(instances) = result.get("DBInstances").and_then(Value::as_array) {
                out.extend(instances.iter().cloned());
            }

            marker = result
                .get("Marker")
                .and_then(Value::as_str)
                .map(str::to_string);
            if marker.is_none() {
                break;
            }
        }

        Ok(out)
    }

    async fn snapshot_for(&self, db: &Value) -> Option<InstanceSnapshot> {
        let desc = parse_db_instance(db)?;

        let (name_tag, (pending_maintenance, pending_actions)) = match &desc.arn {
            Some(arn) => (self.name_tag(arn).await, self.pending_maintenance(arn).await),
            None => (None, (false, Vec::new())),
        };

        let cpu_pct = self.latest_metric("CPUUtilization", &desc.instance_id).await;
        let free_bytes = self
            .latest_metric("FreeStorageSpace", &desc.instance_id)
            .await;
        let read_latency_ms = self
            .latest_metric("ReadLatency", &desc.instance_id)
            .await
            .map(|secs| secs * 1000.0);
        let write_latency_ms = self
            .latest_metric("WriteLatency", &desc.instance_id)
            .await
            .map(|secs| secs * 1000.0);
        let active_connections = self
            .latest_metric("DatabaseConnections", &desc.instance_id)
            .await;

        let autoscaling_enabled = desc.autoscaling_enabled();

        Some(InstanceSnapshot {
            instance_id: desc.instance_id,
            name_tag,
            engine: desc.engine,
            publicly_accessible: desc.publicly_accessible,
            encrypted: desc.encrypted,
            multi_az: desc.multi_az,
            autoscaling_enabled,
            pending_maintenance,
            pending_actions,
            backup_retention_days: desc.backup_retention_days,
            cpu_pct,
            free_storage_pct: free_bytes.and_then(|b| free_storage_pct(b, desc.allocated_gb)),
            read_latency_ms,
            write_latency_ms,
            active_connections,
        })
    }
}

#[async_trait]
impl MetricSource for AwsSource {
    async fn list_instances(&self) -> Result<Vec<InstanceSnapshot>> {
        let described = self.describe_db_instances().await.map_err(|e| match e {
            err @ SourceError::HttpError { .. } | err @ SourceError::Network(_) => {
                SourceError::Unavailable(err.to_string())
            }
            other => other,
        })?;

        tracing::info!(
            count = described.len(),
            region = %self.region,
            "discovered database instances"
        );

        let mut snapshots = Vec::with_capacity(described.len());
        for db in &described {
            match self.snapshot_for(db).await {
                Some(snapshot) => snapshots.push(snapshot),
                None => tracing::warn!("skipping instance with no identifier in API response"),
            }
        }
        Ok(snapshots)
    }
}

#[async_trait]
impl IdentitySource for AwsSource {
    async fn resolve_account_label(&self) -> Option<String> {
        // Prefer the IAM account alias, fall back to the bare account id.
        let alias = self
            .call_api("iam", "iam.amazonaws.com", "us-east-1", "ListAccountAliases", IAM_VERSION, &[])
            .await
            .ok()
            .and_then(|r| {
                r.pointer("/ListAccountAliasesResponse/ListAccountAliasesResult/AccountAliases/0")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        if alias.is_some() {
            return alias;
        }

        match self
            .call_api("sts", "sts.amazonaws.com", "us-east-1", "GetCallerIdentity", STS_VERSION, &[])
            .await
        {
            Ok(response) => response
                .pointer("/GetCallerIdentityResponse/GetCallerIdentityResult/Account")
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                tracing::warn!(error = %e, "account identity lookup failed");
                None
            }
        }
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| SourceError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// The subset of a `DescribeDBInstances` entry the auditor cares about.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DbDescription {
    pub instance_id: String,
    pub engine: String,
    pub arn: Option<String>,
    pub publicly_accessible: bool,
    pub encrypted: bool,
    pub multi_az: bool,
    pub allocated_gb: Option<f64>,
    pub max_allocated_gb: Option<f64>,
    pub backup_retention_days: Option<u32>,
}

impl DbDescription {
    /// Storage autoscaling is on when the allocation ceiling sits above
    /// the current allocation.
    pub fn autoscaling_enabled(&self) -> bool {
        match (self.allocated_gb, self.max_allocated_gb) {
            (Some(alloc), Some(max)) => max > alloc,
            _ => false,
        }
    }
}

pub(crate) fn parse_db_instance(db: &Value) -> Option<DbDescription> {
    let instance_id = db.get("DBInstanceIdentifier")?.as_str()?.to_string();
    Some(DbDescription {
        instance_id,
        engine: db
            .get("Engine")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_lowercase(),
        arn: db
            .get("DBInstanceArn")
            .and_then(Value::as_str)
            .map(str::to_string),
        publicly_accessible: db
            .get("PubliclyAccessible")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        encrypted: db
            .get("StorageEncrypted")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        multi_az: db.get("MultiAZ").and_then(Value::as_bool).unwrap_or(false),
        allocated_gb: db.get("AllocatedStorage").and_then(Value::as_f64),
        max_allocated_gb: db.get("MaxAllocatedStorage").and_then(Value::as_f64),
        backup_retention_days: db
            .get("BackupRetentionPeriod")
            .and_then(Value::as_u64)
            .and_then(|d| u32::try_from(d).ok()),
    })
}

/// Free storage as a percentage of the allocated size.
pub(crate) fn free_storage_pct(free_bytes: f64, allocated_gb: Option<f64>) -> Option<f64> {
    let allocated_gb = allocated_gb.filter(|gb| *gb > 0.0)?;
    let total_bytes = allocated_gb * 1024.0 * 1024.0 * 1024.0;
    Some(free_bytes / total_bytes * 100.0)
}

/// Pick the newest datapoint's `Average` out of a
/// `GetMetricStatistics` response. Datapoints arrive unordered;
/// timestamps may be epoch numbers or RFC 3339 strings depending on
/// the serialization.
pub(crate) fn latest_average(response: &Value) -> Option<f64> {
    let datapoints = response
        .pointer("/GetMetricStatisticsResponse/GetMetricStatisticsResult/Datapoints")?
        .as_array()?;

    datapoints
        .iter()
        .filter_map(|dp| Some((datapoint_epoch(dp.get("Timestamp")?)?, dp)))
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .and_then(|(_, dp)| dp.get("Average")?.as_f64())
}

/// Start of the metric query window. A lookback too large to represent
/// as a time delta widens the window to the epoch instead of panicking.
pub(crate) fn lookback_start(end: DateTime<Utc>, minutes: u64) -> DateTime<Utc> {
    i64::try_from(minutes)
        .ok()
        .and_then(chrono::Duration::try_minutes)
        .and_then(|delta| end.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn datapoint_epoch(timestamp: &Value) -> Option<f64> {
    if let Some(epoch) = timestamp.as_f64() {
        return Some(epoch);
    }
    let raw = timestamp.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn parses_db_instance_fields() {
        let db = json!({
            "DBInstanceIdentifier": "orders-db",
            "Engine": "Postgres",
            "DBInstanceArn": "arn:aws:rds:us-east-1:123456789012:db:orders-db",
            "PubliclyAccessible": true,
            "StorageEncrypted": false,
            "MultiAZ": true,
            "AllocatedStorage": 100,
            "MaxAllocatedStorage": 500,
            "BackupRetentionPeriod": 7
        });

        let desc = parse_db_instance(&db).unwrap();
        assert_eq!(desc.instance_id, "orders-db");
        assert_eq!(desc.engine, "postgres");
        assert!(desc.publicly_accessible);
        assert!(!desc.encrypted);
        assert!(desc.multi_az);
        assert!(desc.autoscaling_enabled());
        assert_eq!(desc.backup_retention_days, Some(7));
    }

    #[test]
    fn missing_identifier_is_rejected() {
        assert!(parse_db_instance(&json!({"Engine": "mysql"})).is_none());
    }

    #[test]
    fn autoscaling_requires_headroom() {
        let db = json!({
            "DBInstanceIdentifier": "db",
            "AllocatedStorage": 100,
            "MaxAllocatedStorage": 100
        });
        assert!(!parse_db_instance(&db).unwrap().autoscaling_enabled());

        // No ceiling configured at all
        let db = json!({"DBInstanceIdentifier": "db", "AllocatedStorage": 100});
        assert!(!parse_db_instance(&db).unwrap().autoscaling_enabled());
    }

    #[test]
    fn free_storage_percentage_math() {
        // 50 GiB free of 100 GiB allocated
        let free = 50.0 * 1024.0 * 1024.0 * 1024.0;
        let pct = free_storage_pct(free, Some(100.0)).unwrap();
        assert!((pct - 50.0).abs() < 1e-9);

        assert!(free_storage_pct(free, None).is_none());
        assert!(free_storage_pct(free, Some(0.0)).is_none());
    }

    #[test]
    fn lookback_window_start_subtracts_minutes() {
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let start = lookback_start(end, 15);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 45, 0).unwrap());
    }

    #[test]
    fn oversized_lookback_widens_to_epoch_instead_of_panicking() {
        let end = Utc::now();
        assert_eq!(lookback_start(end, u64::MAX), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(
            lookback_start(end, i64::MAX as u64),
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[test]
    fn latest_average_picks_newest_datapoint() {
        let response = json!({
            "GetMetricStatisticsResponse": {
                "GetMetricStatisticsResult": {
                    "Datapoints": [
                        {"Timestamp": 1700000000.0, "Average": 10.0},
                        {"Timestamp": 1700000600.0, "Average": 42.0},
                        {"Timestamp": 1700000300.0, "Average": 20.0}
                    ]
                }
            }
        });
        assert_eq!(latest_average(&response), Some(42.0));
    }

    #[test]
    fn latest_average_handles_string_timestamps_and_empty_sets() {
        let response = json!({
            "GetMetricStatisticsResponse": {
                "GetMetricStatisticsResult": {
                    "Datapoints": [
                        {"Timestamp": "2024-01-01T00:00:00Z", "Average": 1.0},
                        {"Timestamp": "2024-01-01T00:10:00Z", "Average": 2.0}
                    ]
                }
            }
        });
        assert_eq!(latest_average(&response), Some(2.0));

        let empty = json!({
            "GetMetricStatisticsResponse": {
                "GetMetricStatisticsResult": {"Datapoints": []}
            }
        });
        assert_eq!(latest_average(&empty), None);
    }
}
