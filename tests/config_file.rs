use knockstream::config::{Config, OutputFormat};
use knockstream::error::KnockstreamError;
use knockstream::ingest::{AudioReduction, InertialReduction};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn full_config_file_round_trips_through_load() {
    let file = write_config(
        r#"
[producer]
ring_slots = 4
slot_samples = 32
batch_size = 500
send_buffer_bytes = 14000
audio_reduction = "average_magnitude"
inertial_reduction = "mean_of_axes"
inertial_rate_hz = 100

[transport]
endpoint = "192.168.4.1:8765"
reconnect_interval_ms = 1000

[consumer]
window_size = 50
listen = "127.0.0.1:9000"
output = "json"

[classifier]
ptp_threshold = 1.5

[detector]
label = "knock"
threshold = 0.9
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.producer.ring_slots, 4);
    assert_eq!(config.producer.slot_samples, 32);
    assert_eq!(config.producer.batch_size, 500);
    assert_eq!(config.producer.audio_reduction, AudioReduction::AverageMagnitude);
    assert_eq!(config.producer.inertial_reduction, InertialReduction::MeanOfAxes);
    assert_eq!(config.transport.endpoint, "192.168.4.1:8765");
    assert_eq!(config.consumer.window_size, 50);
    assert_eq!(config.consumer.output, OutputFormat::Json);
    assert_eq!(config.classifier.ptp_threshold, 1.5);
    assert_eq!(config.detector.threshold, 0.9);

    let reloaded = write_config(&config.to_toml().unwrap());
    assert_eq!(Config::load(reloaded.path()).unwrap(), config);
}

#[test]
fn partial_file_keeps_defaults_for_missing_sections() {
    let file = write_config("[consumer]\nwindow_size = 64\n");
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.consumer.window_size, 64);
    assert_eq!(config.producer, Config::default().producer);
    assert_eq!(config.transport, Config::default().transport);
}

#[test]
fn missing_file_falls_back_to_defaults_only_when_optional() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        Config::load(&path),
        Err(KnockstreamError::ConfigFileNotFound { .. })
    ));
    assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
}

#[test]
fn invalid_toml_is_an_error_not_a_default() {
    let file = write_config("[consumer\nwindow_size = ");
    assert!(matches!(
        Config::load_or_default(file.path()),
        Err(KnockstreamError::Config(_))
    ));
}

#[test]
fn out_of_range_values_are_rejected() {
    let file = write_config("[detector]\nthreshold = 1.5\n");
    match Config::load(file.path()) {
        Err(KnockstreamError::ConfigInvalidValue { key, .. }) => {
            assert_eq!(key, "detector.threshold");
        }
        other => panic!("Expected ConfigInvalidValue, got {:?}", other),
    }

    let file = write_config("[producer]\nsend_buffer_bytes = 8\n");
    assert!(matches!(
        Config::load(file.path()),
        Err(KnockstreamError::ConfigInvalidValue { .. })
    ));
}
