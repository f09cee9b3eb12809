//! End-to-end scenarios: datagram in, canonical frames out

use bytes::Bytes;
use vita_audio::constants::{OPUS_FRAME_SAMPLES, SAMPLE_RATE};
use vita_audio::network::vita::encode;
use vita_audio::streams::RouteOutcome;
use vita_audio::{ClassCode, StreamRegistry};

const DAX_STREAM: u32 = 0x0400_0008;
const OPUS_STREAM: u32 = 0x4A00_0000;

fn raw_pcm_datagram(seq: u8, first: usize, frames: usize) -> Bytes {
    let mut payload = Vec::with_capacity(frames * 8);
    for i in first..first + frames {
        let v = i as f32 / 1000.0;
        payload.extend_from_slice(&v.to_be_bytes());
        payload.extend_from_slice(&(-v).to_be_bytes());
    }
    Bytes::from(encode(DAX_STREAM, ClassCode::DaxAudio, seq, &payload))
}

fn opus_packets(count: usize) -> Vec<Vec<u8>> {
    let mut encoder =
        opus::Encoder::new(SAMPLE_RATE, opus::Channels::Stereo, opus::Application::Audio).unwrap();
    (0..count)
        .map(|n| {
            let samples: Vec<f32> = (0..OPUS_FRAME_SAMPLES)
                .flat_map(|i| {
                    let t = (n * OPUS_FRAME_SAMPLES + i) as f32 / SAMPLE_RATE as f32;
                    let v = (t * 1000.0 * 2.0 * std::f32::consts::PI).sin() * 0.4;
                    [v, v]
                })
                .collect();
            encoder.encode_vec_float(&samples, 4000).unwrap()
        })
        .collect()
}

#[test]
fn three_raw_packets_then_partial_read() {
    let registry = StreamRegistry::default();
    for seq in 0..3u8 {
        let outcome = registry.ingest(raw_pcm_datagram(seq, seq as usize * 128, 128));
        assert_eq!(outcome, RouteOutcome::Enqueued { frames: 128 });
    }

    let mut output = registry.take_output(DAX_STREAM).unwrap();
    let mut left = vec![0.0f32; 256];
    let mut right = vec![0.0f32; 256];
    assert_eq!(output.read(&mut left, &mut right), 256);

    for i in 0..256 {
        let v = i as f32 / 1000.0;
        assert_eq!(left[i], v, "left frame {}", i);
        assert_eq!(right[i], -v, "right frame {}", i);
    }
    assert_eq!(output.available(), 128);
}

#[test]
fn reduced_bandwidth_stream_is_dual_mono() {
    let registry = StreamRegistry::default();
    let payload: Vec<u8> = (0..128i16)
        .flat_map(|i| (i * 200 - 12_800).to_be_bytes())
        .collect();
    let datagram = Bytes::from(encode(0x0400_0010, ClassCode::DaxReducedBw, 0, &payload));
    assert_eq!(
        registry.ingest(datagram),
        RouteOutcome::Enqueued { frames: 128 }
    );

    let mut output = registry.take_output(0x0400_0010).unwrap();
    let mut left = vec![0.0f32; 128];
    let mut right = vec![0.0f32; 128];
    assert_eq!(output.read(&mut left, &mut right), 128);
    assert_eq!(left, right);
    assert_eq!(left[0], -12_800.0 / 32_767.0);
}

#[test]
fn opus_loss_then_valid_packet_enqueues_two_frames() {
    let registry = StreamRegistry::default();
    let packets = opus_packets(2);

    // prime the decoder so the concealment has history to extend
    let first = Bytes::from(encode(OPUS_STREAM, ClassCode::Opus, 0, &packets[0]));
    assert_eq!(
        registry.ingest(first),
        RouteOutcome::Enqueued {
            frames: OPUS_FRAME_SAMPLES
        }
    );

    let lost = Bytes::from(encode(OPUS_STREAM, ClassCode::Opus, 1, &[]));
    assert_eq!(
        registry.ingest(lost),
        RouteOutcome::Enqueued {
            frames: OPUS_FRAME_SAMPLES
        }
    );

    let valid = Bytes::from(encode(OPUS_STREAM, ClassCode::Opus, 2, &packets[1]));
    assert_eq!(
        registry.ingest(valid),
        RouteOutcome::Enqueued {
            frames: OPUS_FRAME_SAMPLES
        }
    );

    let stats = registry.stream_stats(OPUS_STREAM).unwrap();
    assert_eq!(stats.frames_enqueued, 3 * OPUS_FRAME_SAMPLES as u64);
    assert_eq!(stats.decode_failures, 0);
    assert_eq!(stats.lost_packets, 0);
}

#[test]
fn opus_loss_marker_as_first_packet() {
    let registry = StreamRegistry::default();
    let packets = opus_packets(1);

    let lost = Bytes::from(encode(OPUS_STREAM, ClassCode::Opus, 0, &[]));
    let valid = Bytes::from(encode(OPUS_STREAM, ClassCode::Opus, 1, &packets[0]));
    assert!(matches!(registry.ingest(lost), RouteOutcome::Enqueued { .. }));
    assert!(matches!(registry.ingest(valid), RouteOutcome::Enqueued { .. }));

    assert_eq!(
        registry.ring_stats(OPUS_STREAM).unwrap().buffered,
        2 * OPUS_FRAME_SAMPLES
    );
}

#[test]
fn opus_garbage_is_dropped_and_stream_survives() {
    let registry = StreamRegistry::default();
    let packets = opus_packets(1);

    let garbage = Bytes::from(encode(OPUS_STREAM, ClassCode::Opus, 0, &[0x03, 0xFF]));
    assert_eq!(registry.ingest(garbage), RouteOutcome::DecodeFailed);
    assert_eq!(registry.ring_stats(OPUS_STREAM).unwrap().buffered, 0);

    let valid = Bytes::from(encode(OPUS_STREAM, ClassCode::Opus, 1, &packets[0]));
    assert!(matches!(registry.ingest(valid), RouteOutcome::Enqueued { .. }));
    assert_eq!(registry.stream_stats(OPUS_STREAM).unwrap().decode_failures, 1);
}

#[test]
fn stop_then_start_same_stream_plays_nothing_stale() {
    let registry = StreamRegistry::default();
    registry.stream_started(DAX_STREAM, ClassCode::DaxAudio).unwrap();
    registry.ingest(raw_pcm_datagram(0, 0, 128));
    registry.ingest(raw_pcm_datagram(1, 128, 128));

    registry.stream_stopped(DAX_STREAM).unwrap();
    registry.stream_started(DAX_STREAM, ClassCode::DaxAudio).unwrap();

    let mut output = registry.take_output(DAX_STREAM).unwrap();
    let mut left = vec![1.0f32; 256];
    let mut right = vec![1.0f32; 256];
    assert_eq!(output.read(&mut left, &mut right), 0);
    assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));

    // new session audio flows normally
    registry.ingest(raw_pcm_datagram(0, 500, 128));
    assert_eq!(output.read(&mut left, &mut right), 128);
    assert_eq!(left[0], 0.5);
}

#[test]
fn silent_stream_reads_silence() {
    let registry = StreamRegistry::default();
    registry.stream_started(DAX_STREAM, ClassCode::DaxAudio).unwrap();
    let mut output = registry.take_output(DAX_STREAM).unwrap();

    let mut interleaved = vec![0.3f32; 512];
    for _ in 0..10 {
        assert_eq!(output.read_interleaved(&mut interleaved), 0);
        assert!(interleaved.iter().all(|&s| s == 0.0));
    }
    assert_eq!(output.stats().underruns, 10);
}

#[test]
fn independent_streams_do_not_interfere() {
    let registry = StreamRegistry::default();
    registry.ingest(raw_pcm_datagram(0, 0, 128));

    let reduced: Vec<u8> = (0..64).flat_map(|_| 1000i16.to_be_bytes()).collect();
    registry.ingest(Bytes::from(encode(0x0400_0020, ClassCode::DaxReducedBw, 0, &reduced)));

    assert_eq!(registry.ring_stats(DAX_STREAM).unwrap().buffered, 128);
    assert_eq!(registry.ring_stats(0x0400_0020).unwrap().buffered, 64);
    assert_eq!(registry.stats().active_streams, 2);
}
