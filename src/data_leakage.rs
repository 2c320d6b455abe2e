//! Train/test integrity audit: split overlap, temporal ordering and feature
//! contamination.
//!
//! [`LeakageDetector::analyze`] runs three independent checks over a table of
//! [`Record`]s and a proposed split:
//!
//! 1. **Split integrity**: rows present in both splits (`SPLIT_OVERLAP`, high)
//!    and rows repeated within one split (`SPLIT_DUPLICATES`, medium).
//! 2. **Temporal ordering**: training rows later than the earliest test row,
//!    globally (`TEMPORAL_GLOBAL`) and per entity (`TEMPORAL_PER_ENTITY`).
//! 3. **Feature contamination**: leak-suggestive feature names, the target
//!    listed as a feature, features equal to the target on nearly every row,
//!    and features almost perfectly correlated with the target on the
//!    training rows.
//!
//! Every issue is logged before `analyze` returns. In strict mode a report with
//! at least one high-severity issue becomes [`ValidationError::LeakageDetected`].

use crate::correlation::pearson_correlation;
use crate::errors::{validate_fraction, ValidationError, ValidationResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of sample indices or offenders kept in issue details.
const MAX_DETAIL_SAMPLES: usize = 25;

/// Minimum number of numeric training pairs for the correlation check.
const MIN_CORRELATION_PAIRS: usize = 3;

// ============================================================================
// RECORD MODEL
// ============================================================================

/// One cell of a tabular record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldValue {
    /// Explicit missing value
    Null,
    /// Boolean
    Bool(bool),
    /// Number; also read as epoch milliseconds by the temporal checks
    Number(f64),
    /// Free text; parsed as a date when used as a time column
    Text(String),
    /// Point in time
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Finite numeric value, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    /// Milliseconds since the Unix epoch.
    ///
    /// Accepts timestamps, finite numbers, and text in RFC 3339,
    /// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff]` or `YYYY-MM-DD HH:MM:SS[.fff]`
    /// form. Text without an offset is read as UTC.
    pub fn as_epoch_millis(&self) -> Option<f64> {
        match self {
            FieldValue::Timestamp(t) => Some(t.timestamp_millis() as f64),
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            FieldValue::Text(s) => parse_timestamp(s).map(|t| t.timestamp_millis() as f64),
            _ => None,
        }
    }

    /// Whether this is [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Grouping key for the per-entity check; `None` for null or empty values.
    fn entity_key(&self) -> Option<String> {
        let key = match self {
            FieldValue::Null => return None,
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(v) => v.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Timestamp(t) => t.to_rfc3339(),
        };
        (!key.is_empty()).then_some(key)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

/// One row of a tabular dataset, keyed by column name.
pub type Record = BTreeMap<String, FieldValue>;

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

fn format_epoch_millis(millis: f64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{}ms", millis))
}

/// Field of row `row`, treating missing rows, missing keys and nulls alike.
fn field<'a>(records: &'a [Record], row: usize, key: &str) -> Option<&'a FieldValue> {
    records
        .get(row)
        .and_then(|r| r.get(key))
        .filter(|v| !v.is_null())
}

// ============================================================================
// ISSUES AND REPORT
// ============================================================================

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    /// Informational
    Low,
    /// Likely problem worth reviewing
    Medium,
    /// Invalidates the evaluation; aborts strict mode
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        })
    }
}

/// Category of a leakage finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LeakageKind {
    /// A row is in both the training and the test split
    SplitOverlap,
    /// A row is repeated within one split
    SplitDuplicates,
    /// Training data extends past the earliest test timestamp
    TemporalGlobal,
    /// Same as `TemporalGlobal`, within a single entity
    TemporalPerEntity,
    /// The target column is listed as a feature
    TargetInFeatures,
    /// A feature name suggests future or label information
    FutureNamedFeature,
    /// A feature is almost perfectly correlated with the target
    HighCorrelationFeature,
    /// A feature equals the target on nearly every row
    NearIdentityFeature,
}

impl fmt::Display for LeakageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LeakageKind::SplitOverlap => "SPLIT_OVERLAP",
            LeakageKind::SplitDuplicates => "SPLIT_DUPLICATES",
            LeakageKind::TemporalGlobal => "TEMPORAL_GLOBAL",
            LeakageKind::TemporalPerEntity => "TEMPORAL_PER_ENTITY",
            LeakageKind::TargetInFeatures => "TARGET_IN_FEATURES",
            LeakageKind::FutureNamedFeature => "FUTURE_NAMED_FEATURE",
            LeakageKind::HighCorrelationFeature => "HIGH_CORRELATION_FEATURE",
            LeakageKind::NearIdentityFeature => "NEAR_IDENTITY_FEATURE",
        })
    }
}

/// Which side of the split a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SplitSide {
    /// Training split
    Train,
    /// Test split
    Test,
}

/// An entity whose training data runs past its first test row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityOffender {
    /// Entity identifier
    pub entity: String,
    /// Latest training timestamp (epoch ms)
    pub max_train: f64,
    /// Earliest test timestamp (epoch ms)
    pub min_test: f64,
}

/// Structured evidence attached to an issue.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LeakageDetails {
    /// Rows shared by both splits
    Overlap {
        /// Number of distinct shared rows
        overlap_count: usize,
        /// First shared rows, at most 25
        sample_indices: Vec<usize>,
    },
    /// Repeated rows within one split
    Duplicates {
        /// Number of surplus entries
        duplicate_count: usize,
        /// Affected split
        split: SplitSide,
    },
    /// Global chronology violation (epoch ms)
    Chronology {
        /// Latest training timestamp
        max_train: f64,
        /// Earliest test timestamp
        min_test: f64,
    },
    /// Per-entity chronology violations
    EntityChronology {
        /// Number of offending entities
        offender_count: usize,
        /// First offenders, at most 25
        offenders: Vec<EntityOffender>,
    },
    /// Feature flagged by its name
    FeatureName {
        /// Feature key
        feature: String,
    },
    /// Target listed among the features
    TargetKey {
        /// Target key
        target_key: String,
    },
    /// Feature equal to the target on most rows
    Identity {
        /// Feature key
        feature: String,
        /// Fraction of comparable rows where feature == target
        fraction_equal: f64,
    },
    /// Feature strongly correlated with the target
    Correlation {
        /// Feature key
        feature: String,
        /// |Pearson r| on the training rows
        correlation: f64,
    },
}

/// A single finding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeakageIssue {
    /// Category
    pub kind: LeakageKind,
    /// Severity
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Structured evidence
    pub details: LeakageDetails,
}

impl LeakageIssue {
    /// `SEVERITY KIND: message`
    pub fn summary_line(&self) -> String {
        format!("{} {}: {}", self.severity, self.kind, self.message)
    }
}

/// Outcome of [`LeakageDetector::analyze`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeakageReport {
    /// Findings in detection order
    pub issues: Vec<LeakageIssue>,
    /// Whether any finding is high severity
    pub has_high_risk: bool,
    /// One summary line per finding
    pub summary: Vec<String>,
}

impl LeakageReport {
    fn from_issues(issues: Vec<LeakageIssue>) -> Self {
        let summary = issues.iter().map(LeakageIssue::summary_line).collect();
        let has_high_risk = issues.iter().any(|i| i.severity == Severity::High);
        Self {
            issues,
            has_high_risk,
            summary,
        }
    }

    /// Findings of one category.
    pub fn issues_of(&self, kind: LeakageKind) -> Vec<&LeakageIssue> {
        self.issues.iter().filter(|i| i.kind == kind).collect()
    }

    /// Highest severity found, `None` for a clean report.
    pub fn max_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }

    /// Whether nothing was found.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Whether high-severity findings abort the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StrictnessMode {
    /// Return an error when any high-severity issue is found
    Strict,
    /// Always return the report
    #[default]
    Permissive,
}

/// Detection thresholds, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeakageThresholds {
    /// |r| at or above which a feature is flagged
    pub high_correlation: f64,
    /// Fraction of equal rows at or above which a feature is flagged
    pub near_identity_fraction: f64,
}

impl Default for LeakageThresholds {
    fn default() -> Self {
        Self {
            high_correlation: 0.95,
            near_identity_fraction: 0.98,
        }
    }
}

/// Column names for the temporal checks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TemporalConfig {
    /// Column holding each row's timestamp
    pub time_column: String,
    /// Column identifying the entity a row belongs to
    pub entity_column: Option<String>,
    /// Downgrade chronology violations from high to medium
    pub allow_train_after_test: bool,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            time_column: "timestamp".to_string(),
            entity_column: None,
            allow_train_after_test: false,
        }
    }
}

/// Feature-name tokens that suggest label or future information.
///
/// A name matches when its lowercase form contains any `substrings` entry or
/// equals any `whole_names` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeakNamePatterns {
    /// Tokens matched anywhere in the name
    pub substrings: Vec<String>,
    /// Tokens matched against the whole name
    pub whole_names: Vec<String>,
}

impl Default for LeakNamePatterns {
    fn default() -> Self {
        let substrings = [
            "target",
            "label",
            "outcome",
            "groundtruth",
            "ground_truth",
            "true_",
            "future",
            "t+1",
            "t+2",
            "next",
            "leak",
            "post",
            "after_event",
        ];
        Self {
            substrings: substrings.iter().map(|s| s.to_string()).collect(),
            whole_names: vec!["y".to_string()],
        }
    }
}

impl LeakNamePatterns {
    /// Whether `name` looks like a leaking column.
    pub fn matches(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.substrings
            .iter()
            .any(|p| lowered.contains(&p.to_lowercase()))
            || self
                .whole_names
                .iter()
                .any(|p| lowered == p.to_lowercase())
    }
}

/// Configuration of a [`LeakageDetector`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeakageDetectorConfig {
    /// Strict or permissive
    pub mode: StrictnessMode,
    /// Detection thresholds
    pub thresholds: LeakageThresholds,
    /// Temporal column names
    pub temporal: TemporalConfig,
    /// Leak-suggestive name tokens
    pub leak_name_patterns: LeakNamePatterns,
}

impl LeakageDetectorConfig {
    /// Defaults with strict mode.
    pub fn strict() -> Self {
        Self {
            mode: StrictnessMode::Strict,
            ..Self::default()
        }
    }

    /// Defaults with permissive mode.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Uses `column` to group rows in the per-entity temporal check.
    pub fn with_entity_column(mut self, column: impl Into<String>) -> Self {
        self.temporal.entity_column = Some(column.into());
        self
    }

    /// Reads row timestamps from `column`.
    pub fn with_time_column(mut self, column: impl Into<String>) -> Self {
        self.temporal.time_column = column.into();
        self
    }
}

/// Split and column selection for one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalyzeOptions {
    /// Row indices of the training split
    pub train_index: Vec<usize>,
    /// Row indices of the test split
    pub test_index: Vec<usize>,
    /// Target column; without it only name heuristics run on features
    pub target_key: Option<String>,
    /// Features to check; empty means every key of the first record but the target
    pub feature_keys: Vec<String>,
}

impl AnalyzeOptions {
    /// Options for a split, without target or explicit features.
    pub fn new(train_index: Vec<usize>, test_index: Vec<usize>) -> Self {
        Self {
            train_index,
            test_index,
            ..Self::default()
        }
    }

    /// Sets the target column.
    pub fn with_target(mut self, key: impl Into<String>) -> Self {
        self.target_key = Some(key.into());
        self
    }

    /// Restricts the feature checks to `keys`.
    pub fn with_features<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

// ============================================================================
// DETECTOR
// ============================================================================

/// Stateless leakage auditor; holds configuration only.
///
/// # Example
/// ```rust
/// use robust_validation::data_leakage::{AnalyzeOptions, LeakageDetector, LeakageKind, Record};
///
/// let records: Vec<Record> = vec![Record::new(); 5];
/// let report = LeakageDetector::default()
///     .analyze(&records, &AnalyzeOptions::new(vec![0, 1, 2], vec![2, 3, 4]))
///     .unwrap();
///
/// assert!(report.has_high_risk);
/// assert_eq!(report.issues[0].kind, LeakageKind::SplitOverlap);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LeakageDetector {
    config: LeakageDetectorConfig,
}

impl LeakageDetector {
    /// Detector with `config`.
    ///
    /// # Errors
    /// `InvalidParameter` when a threshold lies outside `[0, 1]`.
    pub fn new(config: LeakageDetectorConfig) -> ValidationResult<Self> {
        validate_fraction(config.thresholds.high_correlation, "high_correlation")?;
        validate_fraction(
            config.thresholds.near_identity_fraction,
            "near_identity_fraction",
        )?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &LeakageDetectorConfig {
        &self.config
    }

    /// Runs every check, logs each finding and applies the strictness mode.
    ///
    /// # Errors
    /// `LeakageDetected` in strict mode when any finding is high severity. The
    /// error carries every finding, not only the high-severity ones.
    pub fn analyze(
        &self,
        records: &[Record],
        options: &AnalyzeOptions,
    ) -> ValidationResult<LeakageReport> {
        let mut issues = self.validate_train_test_split(&options.train_index, &options.test_index);
        issues.extend(self.detect_temporal_leakage(
            records,
            &options.train_index,
            &options.test_index,
        ));
        issues.extend(self.check_feature_contamination(
            records,
            &options.train_index,
            &options.test_index,
            options.target_key.as_deref(),
            &options.feature_keys,
        ));

        for issue in &issues {
            match issue.severity {
                Severity::High => warn!(
                    "High-risk leakage detected: {} {:?}",
                    issue.kind, issue.details
                ),
                Severity::Medium => info!(
                    "Potential leakage risk: {} {:?}",
                    issue.kind, issue.details
                ),
                Severity::Low => debug!(
                    "Informational leakage note: {} {:?}",
                    issue.kind, issue.details
                ),
            }
        }

        let report = LeakageReport::from_issues(issues);

        if self.config.mode == StrictnessMode::Strict && report.has_high_risk {
            error!(
                "Strict mode abort due to leakage:\n- {}",
                report.summary.join("\n- ")
            );
            return Err(ValidationError::LeakageDetected {
                summary: report.summary,
                issues: report.issues,
            });
        }

        Ok(report)
    }

    /// Flags rows present in both splits and rows repeated within a split.
    pub fn validate_train_test_split(&self, train: &[usize], test: &[usize]) -> Vec<LeakageIssue> {
        let mut issues = Vec::new();

        let train_unique = unique_in_order(train);
        let test_unique = unique_in_order(test);
        let test_set: HashSet<usize> = test_unique.iter().copied().collect();

        let overlap: Vec<usize> = train_unique
            .iter()
            .copied()
            .filter(|i| test_set.contains(i))
            .collect();

        if !overlap.is_empty() {
            issues.push(LeakageIssue {
                kind: LeakageKind::SplitOverlap,
                severity: Severity::High,
                message: format!(
                    "Train/Test overlap detected for {} samples. Splits must be disjoint.",
                    overlap.len()
                ),
                details: LeakageDetails::Overlap {
                    overlap_count: overlap.len(),
                    sample_indices: overlap.iter().copied().take(MAX_DETAIL_SAMPLES).collect(),
                },
            });
        }

        for (side, total, distinct) in [
            (SplitSide::Train, train.len(), train_unique.len()),
            (SplitSide::Test, test.len(), test_unique.len()),
        ] {
            let duplicate_count = total - distinct;
            if duplicate_count > 0 {
                let name = match side {
                    SplitSide::Train => "train",
                    SplitSide::Test => "test",
                };
                issues.push(LeakageIssue {
                    kind: LeakageKind::SplitDuplicates,
                    severity: Severity::Medium,
                    message: format!("Duplicate entries in {} split ({}).", name, duplicate_count),
                    details: LeakageDetails::Duplicates {
                        duplicate_count,
                        split: side,
                    },
                });
            }
        }

        issues
    }

    /// Flags training rows dated after the earliest test row, globally and
    /// per entity when an entity column is configured.
    ///
    /// Rows without a parsable timestamp are ignored.
    pub fn detect_temporal_leakage(
        &self,
        records: &[Record],
        train: &[usize],
        test: &[usize],
    ) -> Vec<LeakageIssue> {
        let mut issues = Vec::new();
        let temporal = &self.config.temporal;
        let severity = if temporal.allow_train_after_test {
            Severity::Medium
        } else {
            Severity::High
        };

        let time_of = |row: usize| {
            field(records, row, &temporal.time_column).and_then(FieldValue::as_epoch_millis)
        };

        let max_train = train.iter().filter_map(|&i| time_of(i)).reduce(f64::max);
        let min_test = test.iter().filter_map(|&i| time_of(i)).reduce(f64::min);

        if let (Some(max_train), Some(min_test)) = (max_train, min_test) {
            if max_train > min_test {
                issues.push(LeakageIssue {
                    kind: LeakageKind::TemporalGlobal,
                    severity,
                    message: format!(
                        "Temporal leakage: training data extends ({}) beyond earliest test timestamp ({}).",
                        format_epoch_millis(max_train),
                        format_epoch_millis(min_test)
                    ),
                    details: LeakageDetails::Chronology {
                        max_train,
                        min_test,
                    },
                });
            }
        }

        let Some(entity_column) = temporal.entity_column.as_deref() else {
            return issues;
        };

        let entity_times = |rows: &[usize], combine: fn(f64, f64) -> f64| {
            let mut per_entity: BTreeMap<String, f64> = BTreeMap::new();
            for &row in rows {
                let entity = field(records, row, entity_column).and_then(FieldValue::entity_key);
                if let (Some(entity), Some(t)) = (entity, time_of(row)) {
                    per_entity
                        .entry(entity)
                        .and_modify(|current| *current = combine(*current, t))
                        .or_insert(t);
                }
            }
            per_entity
        };

        let train_latest = entity_times(train, f64::max);
        let test_earliest = entity_times(test, f64::min);

        let offenders: Vec<EntityOffender> = train_latest
            .iter()
            .filter_map(|(entity, &max_train)| {
                let &min_test = test_earliest.get(entity)?;
                (max_train > min_test).then(|| EntityOffender {
                    entity: entity.clone(),
                    max_train,
                    min_test,
                })
            })
            .collect();

        if !offenders.is_empty() {
            issues.push(LeakageIssue {
                kind: LeakageKind::TemporalPerEntity,
                severity,
                message: format!(
                    "Temporal leakage per-entity: {} entity(ies) have training data after their test start.",
                    offenders.len()
                ),
                details: LeakageDetails::EntityChronology {
                    offender_count: offenders.len(),
                    offenders: offenders.into_iter().take(MAX_DETAIL_SAMPLES).collect(),
                },
            });
        }

        issues
    }

    /// Flags features that leak the target.
    ///
    /// Name heuristics always run. With a target key the check also flags the
    /// target listed as a feature, features equal to the target on at least
    /// `near_identity_fraction` of the comparable rows (all rows, any value
    /// type), and numeric features whose |Pearson r| with the target on the
    /// training rows reaches `high_correlation` (at least three numeric pairs
    /// required). The correlation finding is high severity when the name also
    /// matches a leak pattern, medium otherwise.
    ///
    /// The test split is not consulted; it is accepted for symmetry with the
    /// other checks.
    pub fn check_feature_contamination(
        &self,
        records: &[Record],
        train: &[usize],
        _test: &[usize],
        target_key: Option<&str>,
        feature_keys: &[String],
    ) -> Vec<LeakageIssue> {
        let mut issues = Vec::new();
        let patterns = &self.config.leak_name_patterns;
        let features = pick_feature_keys(records, target_key, feature_keys);

        for feature in &features {
            if patterns.matches(feature) {
                issues.push(LeakageIssue {
                    kind: LeakageKind::FutureNamedFeature,
                    severity: Severity::High,
                    message: format!(
                        "Feature \"{}\" name suggests potential leakage (future/label-related).",
                        feature
                    ),
                    details: LeakageDetails::FeatureName {
                        feature: feature.clone(),
                    },
                });
            }
        }

        let Some(target_key) = target_key else {
            return issues;
        };

        if features.iter().any(|f| f == target_key) {
            issues.push(LeakageIssue {
                kind: LeakageKind::TargetInFeatures,
                severity: Severity::High,
                message: format!("Target key \"{}\" is present among features.", target_key),
                details: LeakageDetails::TargetKey {
                    target_key: target_key.to_string(),
                },
            });
        }

        let train_rows: BTreeSet<usize> = train.iter().copied().filter(|&i| i < records.len()).collect();

        for feature in features.iter().filter(|f| f.as_str() != target_key) {
            let fraction = fraction_equal(records, feature, target_key);
            if fraction >= self.config.thresholds.near_identity_fraction {
                issues.push(LeakageIssue {
                    kind: LeakageKind::NearIdentityFeature,
                    severity: Severity::High,
                    message: format!(
                        "Feature \"{}\" matches target in ~{}% of rows.",
                        feature,
                        (fraction * 100.0).round()
                    ),
                    details: LeakageDetails::Identity {
                        feature: feature.clone(),
                        fraction_equal: fraction,
                    },
                });
            }

            let (xs, ys): (Vec<f64>, Vec<f64>) = train_rows
                .iter()
                .filter_map(|&row| {
                    let x = field(records, row, feature)?.as_number()?;
                    let y = field(records, row, target_key)?.as_number()?;
                    Some((x, y))
                })
                .unzip();

            if xs.len() >= MIN_CORRELATION_PAIRS {
                let r = pearson_correlation(&xs, &ys).abs();
                if r.is_finite() && r >= self.config.thresholds.high_correlation {
                    issues.push(LeakageIssue {
                        kind: LeakageKind::HighCorrelationFeature,
                        severity: if patterns.matches(feature) {
                            Severity::High
                        } else {
                            Severity::Medium
                        },
                        message: format!(
                            "Feature \"{}\" has very high correlation with target on training data (|r|={:.3}).",
                            feature, r
                        ),
                        details: LeakageDetails::Correlation {
                            feature: feature.clone(),
                            correlation: r,
                        },
                    });
                }
            }
        }

        issues
    }
}

fn unique_in_order(indices: &[usize]) -> Vec<usize> {
    let mut seen = HashSet::with_capacity(indices.len());
    indices.iter().copied().filter(|i| seen.insert(*i)).collect()
}

/// Explicit keys when given, else every key of the first record but the target.
fn pick_feature_keys(records: &[Record], target_key: Option<&str>, provided: &[String]) -> Vec<String> {
    if !provided.is_empty() {
        return provided.to_vec();
    }
    records
        .first()
        .map(|first| {
            first
                .keys()
                .filter(|k| Some(k.as_str()) != target_key)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Fraction of rows where both values are present and equal.
fn fraction_equal(records: &[Record], feature: &str, target: &str) -> f64 {
    let mut compared = 0usize;
    let mut equal = 0usize;
    for row in 0..records.len() {
        if let (Some(x), Some(y)) = (field(records, row, feature), field(records, row, target)) {
            compared += 1;
            if x == y {
                equal += 1;
            }
        }
    }
    if compared == 0 {
        0.0
    } else {
        equal as f64 / compared as f64
    }
}
