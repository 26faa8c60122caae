//! Normalization of provider-shaped records into [`ResourceRecord`]s.
//!
//! `normalize` is a pure function of its input: it performs no I/O and
//! never fails the whole batch because of a single bad record. Per-record
//! validation failures are isolated into the returned error list and the
//! valid subset is kept.

use crate::record::{
    CloudProvider, RawResourceRecord, ResourceId, ResourceRecord, ResourceStatus, Severity,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Per-record normalization failure. Non-fatal: collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationError {
    #[error("record [{index}] is missing required field '{field}'")]
    MissingField { index: usize, field: String },

    #[error("record [{index}] has no provider and no batch default was given")]
    MissingProvider { index: usize },

    #[error("record '{native_id}' has a malformed {field} timestamp: '{value}'")]
    MalformedTimestamp {
        native_id: String,
        field: String,
        value: String,
    },

    #[error("duplicate resource id '{id}' in scan batch, record dropped")]
    DuplicateId { id: String },
}

/// Normalize a batch of provider-shaped records.
///
/// `scan_time` anchors `age_days` derivation so every record in a scan
/// shares one clock. `default_provider` is the provider the batch was
/// collected from; a record may override it with its own `provider` field.
///
/// Coercions rather than errors:
/// - negative or non-finite monthly cost clamps to 0 (warned)
/// - `created_at` later than `scan_time` clamps `age_days` to 0
/// - unknown status strings map to `in_use`
pub fn normalize(
    raw: &[RawResourceRecord],
    scan_time: DateTime<Utc>,
    default_provider: Option<&CloudProvider>,
) -> (Vec<ResourceRecord>, Vec<NormalizationError>) {
    let mut records = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();
    let mut seen: BTreeSet<ResourceId> = BTreeSet::new();

    for (index, entry) in raw.iter().enumerate() {
        match normalize_one(index, entry, scan_time, default_provider) {
            Ok(record) => {
                if seen.contains(&record.id) {
                    errors.push(NormalizationError::DuplicateId {
                        id: record.id.to_string(),
                    });
                    continue;
                }
                seen.insert(record.id.clone());
                records.push(record);
            }
            Err(err) => errors.push(err),
        }
    }

    (records, errors)
}

fn normalize_one(
    index: usize,
    raw: &RawResourceRecord,
    scan_time: DateTime<Utc>,
    default_provider: Option<&CloudProvider>,
) -> Result<ResourceRecord, NormalizationError> {
    let native_id = required(index, "native_id", raw.native_id.as_deref())?;
    let resource_type = required(index, "resource_type", raw.resource_type.as_deref())?;

    let provider = match raw.provider.as_deref() {
        Some(p) if !p.is_empty() => p.parse().expect("provider parsing is infallible"),
        _ => default_provider
            .cloned()
            .ok_or(NormalizationError::MissingProvider { index })?,
    };

    let created_at = parse_timestamp(native_id, "created_at", raw.created_at.as_deref())?;
    let last_used_at = parse_timestamp(native_id, "last_used_at", raw.last_used_at.as_deref())?;

    let age_days = created_at
        .map(|created| (scan_time - created).num_days().max(0) as u32)
        .unwrap_or(0);

    let cost = raw.estimated_monthly_cost.unwrap_or(0.0);
    let estimated_monthly_cost = if !cost.is_finite() || cost < 0.0 {
        tracing::warn!(
            native_id,
            cost,
            "Invalid estimated monthly cost, clamping to 0"
        );
        0.0
    } else {
        cost
    };

    let status = raw
        .status
        .as_deref()
        .map(ResourceStatus::parse_lenient)
        .unwrap_or_default();

    let depends_on = raw
        .depends_on
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| parse_dependency_ref(s, &provider))
        .collect();

    Ok(ResourceRecord {
        id: ResourceId::new(provider.clone(), native_id),
        provider,
        resource_type: resource_type.to_string(),
        name: raw.name.clone().unwrap_or_else(|| native_id.to_string()),
        region: raw.region.clone().unwrap_or_default(),
        tags: raw.tags.clone(),
        created_at,
        last_used_at,
        age_days,
        estimated_monthly_cost,
        size_gb: raw.size_gb.unwrap_or(0.0),
        status,
        severity: Severity::from_monthly_cost(estimated_monthly_cost),
        depends_on,
        raw_metadata: raw.metadata.clone(),
    })
}

fn required<'a>(
    index: usize,
    field: &str,
    value: Option<&'a str>,
) -> Result<&'a str, NormalizationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(NormalizationError::MissingField {
            index,
            field: field.to_string(),
        }),
    }
}

fn parse_timestamp(
    native_id: &str,
    field: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, NormalizationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(value)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| NormalizationError::MalformedTimestamp {
            native_id: native_id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Parse a raw `depends_on` entry.
///
/// A `provider:` prefix naming a built-in provider marks a cross-provider
/// reference; anything else (including ARN-style ids containing `:`) is a
/// native id within the record's own provider.
fn parse_dependency_ref(s: &str, own_provider: &CloudProvider) -> ResourceId {
    if let Some((prefix, rest)) = s.split_once(':') {
        if CloudProvider::is_known(prefix) && !rest.is_empty() {
            return ResourceId::new(
                prefix.parse().expect("provider parsing is infallible"),
                rest,
            );
        }
    }
    ResourceId::new(own_provider.clone(), s)
}
