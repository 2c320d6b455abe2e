//! Integration tests for leakage auditing of realistic train/test splits
//!
//! Each scenario builds a small student-performance table, introduces one kind
//! of leakage, and checks that the detector reports it with the expected
//! severity in both permissive and strict mode.

use chrono::{Duration, TimeZone, Utc};
use robust_validation::{
    AnalyzeOptions, FieldValue, LeakageDetails, LeakageDetector, LeakageDetectorConfig,
    LeakageKind, Record, Severity, ValidationError,
};

/// `n` weekly rows cycling through three students, with a score that is a
/// noisy function of hours studied.
fn student_table(n: usize) -> Vec<Record> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let hours = ((i * 7) % 11) as f64;
            let score = 50.0 + 3.0 * hours + ((i * 13) % 5) as f64 * 4.0;
            let mut record = Record::new();
            record.insert("student".to_string(), format!("s{}", i % 3).into());
            record.insert(
                "timestamp".to_string(),
                FieldValue::from(start + Duration::weeks(i as i64)),
            );
            record.insert("hours".to_string(), hours.into());
            record.insert("attendance".to_string(), ((i % 4) as f64 * 0.1 + 0.6).into());
            record.insert("score".to_string(), score.into());
            record
        })
        .collect()
}

fn chronological_split(n: usize, train: usize) -> AnalyzeOptions {
    AnalyzeOptions::new((0..train).collect(), (train..n).collect()).with_target("score")
}

#[test]
fn test_clean_chronological_split() {
    let records = student_table(30);
    let report = LeakageDetector::new(
        LeakageDetectorConfig::strict().with_entity_column("student"),
    )
    .unwrap()
    .analyze(&records, &chronological_split(30, 24))
    .unwrap();

    assert!(report.is_clean(), "unexpected issues: {:?}", report.summary);
    assert!(!report.has_high_risk);
}

#[test]
fn test_shuffled_split_leaks_time() {
    let records = student_table(30);
    let train: Vec<usize> = (0..30).filter(|i| i % 5 != 0).collect();
    let test: Vec<usize> = (0..30).filter(|i| i % 5 == 0).collect();
    let options = AnalyzeOptions::new(train, test).with_target("score");

    let detector = LeakageDetector::new(
        LeakageDetectorConfig::permissive().with_entity_column("student"),
    )
    .unwrap();
    let report = detector.analyze(&records, &options).unwrap();

    let global = report.issues_of(LeakageKind::TemporalGlobal);
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].severity, Severity::High);

    let per_entity = report.issues_of(LeakageKind::TemporalPerEntity);
    assert_eq!(per_entity.len(), 1);
    match &per_entity[0].details {
        LeakageDetails::EntityChronology {
            offender_count,
            offenders,
        } => {
            assert_eq!(*offender_count, 3);
            assert!(offenders.iter().all(|o| o.max_train > o.min_test));
        }
        other => panic!("Expected entity chronology, got {:?}", other),
    }
    assert!(report.has_high_risk);
}

#[test]
fn test_copied_target_column_is_caught() {
    let mut records = student_table(40);
    for record in records.iter_mut() {
        let score = record["score"].clone();
        record.insert("final_grade".to_string(), score);
    }

    let report = LeakageDetector::default()
        .analyze(&records, &chronological_split(40, 30))
        .unwrap();

    let identity = report.issues_of(LeakageKind::NearIdentityFeature);
    assert_eq!(identity.len(), 1);
    assert!(identity[0].message.contains("~100%"));

    let correlated = report.issues_of(LeakageKind::HighCorrelationFeature);
    assert_eq!(correlated.len(), 1);
    assert_eq!(correlated[0].severity, Severity::Medium);
    assert_eq!(report.max_severity(), Some(Severity::High));
}

#[test]
fn test_future_named_feature_in_strict_mode() {
    let mut records = student_table(20);
    for (i, record) in records.iter_mut().enumerate() {
        record.insert("next_week_hours".to_string(), FieldValue::from(((i * 3) % 7) as f64));
    }

    let detector = LeakageDetector::new(LeakageDetectorConfig::strict()).unwrap();
    match detector.analyze(&records, &chronological_split(20, 15)) {
        Err(ValidationError::LeakageDetected { summary, issues }) => {
            assert!(issues
                .iter()
                .any(|i| i.kind == LeakageKind::FutureNamedFeature));
            assert!(summary
                .iter()
                .any(|line| line.starts_with("HIGH FUTURE_NAMED_FEATURE")));
            let message = ValidationError::LeakageDetected { summary, issues }.to_string();
            assert!(message.contains("next_week_hours"));
        }
        other => panic!("Expected LeakageDetected, got {:?}", other.map(|r| r.summary)),
    }
}

#[test]
fn test_overlapping_split_is_blocked_in_strict_mode() {
    let records = student_table(12);
    let options = AnalyzeOptions::new(vec![0, 1, 2, 3, 4, 5, 6, 7, 8], vec![8, 9, 10, 11]);

    let permissive = LeakageDetector::default().analyze(&records, &options).unwrap();
    let overlap = permissive.issues_of(LeakageKind::SplitOverlap);
    assert_eq!(overlap.len(), 1);
    assert_eq!(
        overlap[0].details,
        LeakageDetails::Overlap {
            overlap_count: 1,
            sample_indices: vec![8]
        }
    );

    let strict = LeakageDetector::new(LeakageDetectorConfig::strict()).unwrap();
    assert!(matches!(
        strict.analyze(&records, &options),
        Err(ValidationError::LeakageDetected { .. })
    ));
}

#[test]
fn test_explicit_feature_list_limits_checks() {
    let mut records = student_table(20);
    for record in records.iter_mut() {
        let score = record["score"].clone();
        record.insert("label_copy".to_string(), score);
    }

    let options = chronological_split(20, 15).with_features(["hours", "attendance"]);
    let report = LeakageDetector::default().analyze(&records, &options).unwrap();
    assert!(report.is_clean(), "unexpected issues: {:?}", report.summary);
}
