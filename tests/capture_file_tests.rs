// Tests for the WAV file capture backend

use lingua_live::audio::{CaptureBackend, CaptureConfig, FileBackend};
use std::path::Path;
use std::time::Duration;

fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn small_frame_config() -> CaptureConfig {
    CaptureConfig {
        frame_samples: 1600, // 100ms at 16kHz
        ..CaptureConfig::default()
    }
}

#[tokio::test]
async fn test_delivers_fixed_size_frames_until_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speech.wav");
    write_wav(&path, 1, &vec![1000i16; 3200]);

    let mut backend = FileBackend::open(&path, small_frame_config()).unwrap();
    let mut rx = backend.start().await.unwrap();

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 2);
    for frame in &frames {
        assert_eq!(frame.samples.len(), 1600);
        assert_eq!(frame.sample_rate, 16000);
        assert_eq!(frame.channels, 1);
    }
    assert_eq!(frames[0].timestamp_ms, 0);
    assert_eq!(frames[1].timestamp_ms, 100);
    assert!(!backend.is_capturing());
}

#[tokio::test]
async fn test_stereo_input_folds_to_mono() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    // Interleaved L=100, R=300 -> mono average 200
    let samples: Vec<i16> = [100i16, 300].repeat(1600);
    write_wav(&path, 2, &samples);

    let mut backend = FileBackend::open(&path, small_frame_config()).unwrap();
    let mut rx = backend.start().await.unwrap();

    let frame = rx.recv().await.expect("no frame delivered");
    let expected = 200.0 / 32768.0;
    assert!((frame.samples[0] - expected).abs() < 1e-6);
}

#[tokio::test]
async fn test_stop_ends_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.wav");
    write_wav(&path, 1, &vec![0i16; 160_000]); // 10s of audio

    let mut backend = FileBackend::open(&path, small_frame_config()).unwrap();
    let mut rx = backend.start().await.unwrap();

    let first = rx.recv().await;
    assert!(first.is_some());

    backend.stop().await.unwrap();
    backend.stop().await.unwrap(); // idempotent

    // Delivery ceases within one frame cadence
    let rest = tokio::time::timeout(Duration::from_secs(2), async {
        let mut count = 0;
        while rx.recv().await.is_some() {
            count += 1;
        }
        count
    })
    .await
    .expect("channel never closed");

    assert!(rest <= 2, "expected delivery to stop quickly, got {} frames", rest);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = FileBackend::open("does-not-exist.wav", CaptureConfig::default());
    assert!(result.is_err());
}

#[tokio::test]
async fn test_factory_builds_file_backend() {
    use lingua_live::audio::{CaptureBackendFactory, CaptureSource};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("factory.wav");
    write_wav(&path, 1, &vec![0i16; 1600]);

    let mut backend = CaptureBackendFactory::create(
        CaptureSource::File(path.to_string_lossy().into_owned()),
        small_frame_config(),
    )
    .unwrap();

    assert_eq!(backend.name(), "wav-file");

    let mut rx = backend.start().await.unwrap();
    assert!(rx.recv().await.is_some());
}
