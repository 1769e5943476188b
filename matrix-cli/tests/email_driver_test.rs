//! Driver-level tests for `email::process_email`, in the style of
//! `backend/tests/e2e/auth_tests.rs`: an embedded in-memory store per
//! test plus a hand-built request (here, a raw RFC 822 message) rather
//! than mocked collaborators.
//!
//! Run with `--features test-utils` so `matrix_cli::db::PersistenceGateway`
//! exposes its seeding/read-back helpers and `ObjectStore` gets its
//! in-memory stand-in, matching `backend`'s own `test-utils` convention.
//!
//! These exercise the driver's control flow (supplier lookup, format
//! resolution, archival-before-parse ordering, per-file error
//! aggregation) rather than any one supplier's spreadsheet layout: the
//! exact byte-level layout of a real matrix file is out of scope here,
//! as it is in spec.md itself.

use matrix_cli::config::{Config, DbConfig, LockConfig, MonitoringConfig, ObjectStoreConfig, SubprocessConfig};
use matrix_cli::db::PersistenceGateway;
use matrix_cli::email::process_email;
use matrix_cli::error::PipelineError;
use matrix_cli::metrics::MetricsSink;
use matrix_cli::object_store::test_utils::InMemoryObjectStore;
use matrix_core::model::{MatrixFormat, Supplier};

fn test_config() -> Config {
    Config {
        db: DbConfig {
            primary_uri: "mem://".into(),
            primary_namespace: "matrix".into(),
            primary_database: "ingest".into(),
            external_uri: "mem://".into(),
        },
        object_store: ObjectStoreConfig {
            bucket: "matrix-files".into(),
            region: "us-east-1".into(),
            endpoint: None,
        },
        monitoring: MonitoringConfig {
            statsd_host: "127.0.0.1".into(),
            statsd_port: 1,
        },
        subprocess: SubprocessConfig {
            office_converter_path: "/usr/bin/soffice".into(),
            pdf_tabulizer_jar_path: "/opt/matrix/tabula.jar".into(),
        },
        lock: LockConfig {
            path: "/tmp/unused.lock".into(),
        },
    }
}

/// Builds a minimal multipart/mixed RFC 822 message with one attachment
/// per `(filename, body)` pair. Bodies are plain ASCII and carried with
/// no transfer encoding, which mailparse passes through unchanged.
fn build_email(delivered_to: &str, subject: &str, attachments: &[(&str, &str)]) -> Vec<u8> {
    const BOUNDARY: &str = "MATRIXTESTBOUNDARY";
    let mut msg = format!(
        "From: sender@example.com\r\n\
         Delivered-To: {delivered_to}\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"{BOUNDARY}\"\r\n\r\n"
    );
    for (name, body) in attachments {
        msg.push_str(&format!(
            "--{BOUNDARY}\r\n\
             Content-Type: application/octet-stream\r\n\
             Content-Disposition: attachment; filename=\"{name}\"\r\n\r\n\
             {body}\r\n"
        ));
    }
    msg.push_str(&format!("--{BOUNDARY}--\r\n"));
    msg.into_bytes()
}

fn build_plain_email(delivered_to: &str, subject: &str, body: &str) -> Vec<u8> {
    format!(
        "From: sender@example.com\r\n\
         Delivered-To: {delivered_to}\r\n\
         Subject: {subject}\r\n\r\n\
         {body}\r\n"
    )
    .into_bytes()
}

#[tokio::test]
async fn unmatched_recipient_is_rejected_before_any_upload() {
    let db = PersistenceGateway::connect(&DbConfig {
        primary_uri: "mem://".into(),
        primary_namespace: "matrix".into(),
        primary_database: "ingest".into(),
        external_uri: "mem://".into(),
    })
    .await
    .unwrap();
    let object_store = InMemoryObjectStore::new();
    let metrics = MetricsSink::new("127.0.0.1", 1);
    let config = test_config();

    let raw = build_plain_email("nobody@ourdomain.com", "Prices", "hello");
    let err = process_email(&raw, &db, &object_store, &metrics, &config).await.unwrap_err();

    assert!(matches!(err, PipelineError::UnknownSupplier(_)));
    assert!(object_store.uploaded_keys().is_empty());
}

#[tokio::test]
async fn files_matching_no_format_yield_no_files_error() {
    let db = PersistenceGateway::connect(&DbConfig {
        primary_uri: "mem://".into(),
        primary_namespace: "matrix".into(),
        primary_database: "ingest".into(),
        external_uri: "mem://".into(),
    })
    .await
    .unwrap();
    db.seed_supplier(&Supplier {
        id: "aep-ohio".into(),
        name: "AEP Ohio".into(),
        email_recipient: Some("aep@ourdomain.com".into()),
        formats: vec![MatrixFormat {
            id: 6,
            supplier_id: "aep-ohio".into(),
            name: "AEP matrix".into(),
            attachment_pattern: Some(r"^priceA\.xlsx$".into()),
            match_body: false,
        }],
    })
    .await
    .unwrap();

    let object_store = InMemoryObjectStore::new();
    let metrics = MetricsSink::new("127.0.0.1", 1);
    let config = test_config();

    let raw = build_email("aep@ourdomain.com", "AEP Prices", &[("noise.pdf", "not a matrix file")]);
    let err = process_email(&raw, &db, &object_store, &metrics, &config).await.unwrap_err();

    assert!(matches!(err, PipelineError::NoFiles));
    // an unknown-format file is never archived
    assert!(object_store.uploaded_keys().is_empty());
}

#[tokio::test]
async fn per_file_failures_are_archived_and_aggregated() {
    let db = PersistenceGateway::connect(&DbConfig {
        primary_uri: "mem://".into(),
        primary_namespace: "matrix".into(),
        primary_database: "ingest".into(),
        external_uri: "mem://".into(),
    })
    .await
    .unwrap();
    db.seed_supplier(&Supplier {
        id: "volunteer-energy".into(),
        name: "Volunteer Energy".into(),
        email_recipient: Some("volunteer@ourdomain.com".into()),
        formats: vec![
            MatrixFormat {
                id: 901,
                supplier_id: "volunteer-energy".into(),
                name: "unregistered format a".into(),
                attachment_pattern: Some(r"^a\.dat$".into()),
                match_body: false,
            },
            MatrixFormat {
                id: 902,
                supplier_id: "volunteer-energy".into(),
                name: "unregistered format b".into(),
                attachment_pattern: Some(r"^b\.dat$".into()),
                match_body: false,
            },
        ],
    })
    .await
    .unwrap();

    let object_store = InMemoryObjectStore::new();
    let metrics = MetricsSink::new("127.0.0.1", 1);
    let config = test_config();

    let raw = build_email(
        "volunteer@ourdomain.com",
        "Volunteer Prices",
        &[("a.dat", "payload a"), ("b.dat", "payload b")],
    );
    let err = process_email(&raw, &db, &object_store, &metrics, &config).await.unwrap_err();

    let message = err.to_string();
    assert!(matches!(err, PipelineError::MultipleErrors(_)));
    assert!(message.contains("2 file(s) failed"));

    // both files are archived before their format's parser is resolved,
    // even though neither format has a registered parser
    assert_eq!(object_store.uploaded_keys(), vec!["a.dat".to_string(), "b.dat".to_string()]);

    // neither file's (nonexistent) transaction left anything committed
    assert!(db.all_quotes().await.unwrap().is_empty());
}

#[tokio::test]
async fn ambiguous_format_match_is_rejected_for_the_whole_email() {
    let db = PersistenceGateway::connect(&DbConfig {
        primary_uri: "mem://".into(),
        primary_namespace: "matrix".into(),
        primary_database: "ingest".into(),
        external_uri: "mem://".into(),
    })
    .await
    .unwrap();
    db.seed_supplier(&Supplier {
        id: "duke-energy".into(),
        name: "Duke Energy".into(),
        email_recipient: Some("duke@ourdomain.com".into()),
        formats: vec![
            MatrixFormat {
                id: 910,
                supplier_id: "duke-energy".into(),
                name: "wildcard a".into(),
                attachment_pattern: None,
                match_body: false,
            },
            MatrixFormat {
                id: 911,
                supplier_id: "duke-energy".into(),
                name: "wildcard b".into(),
                attachment_pattern: None,
                match_body: false,
            },
        ],
    })
    .await
    .unwrap();

    let object_store = InMemoryObjectStore::new();
    let metrics = MetricsSink::new("127.0.0.1", 1);
    let config = test_config();

    let raw = build_email("duke@ourdomain.com", "Duke Prices", &[("anything.xlsx", "payload")]);
    let err = process_email(&raw, &db, &object_store, &metrics, &config).await.unwrap_err();

    // an ambiguous format match is treated the same as no match: the
    // file is skipped rather than archived, and with no other files the
    // email as a whole has nothing to show for itself
    assert!(matches!(err, PipelineError::NoFiles));
    assert!(object_store.uploaded_keys().is_empty());
}
