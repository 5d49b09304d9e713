// Wire-format tests for the live endpoint messages

use base64::Engine;
use lingua_live::audio::encode_frame;
use lingua_live::live::messages::{parse_server_message, RealtimeInputMessage, SetupMessage};
use lingua_live::live::{ServerEvent, Speaker};

#[test]
fn test_setup_serialization() {
    let setup = SetupMessage::new("gemini-live-test", "Speak only French.");
    let json = serde_json::to_string(&setup).unwrap();

    assert!(json.contains("\"model\":\"models/gemini-live-test\""));
    assert!(json.contains("\"responseModalities\":[\"AUDIO\"]"));
    assert!(json.contains("\"inputAudioTranscription\":{}"));
    assert!(json.contains("\"outputAudioTranscription\":{}"));
    assert!(json.contains("Speak only French."));
}

#[test]
fn test_realtime_input_serialization() {
    let chunk = encode_frame(&[0.0; 8], 16000);
    let message = RealtimeInputMessage::new(chunk);
    let json = serde_json::to_string(&message).unwrap();

    assert!(json.contains("\"realtimeInput\""));
    assert!(json.contains("\"mediaChunks\""));
    assert!(json.contains("\"mimeType\":\"audio/pcm;rate=16000\""));
    assert!(json.contains("\"data\":"));
}

#[test]
fn test_setup_complete_maps_to_opened() {
    let events = parse_server_message(r#"{"setupComplete":{}}"#).unwrap();
    assert_eq!(events, vec![ServerEvent::Opened]);
}

#[test]
fn test_input_transcription_is_a_user_fragment() {
    let events = parse_server_message(
        r#"{"serverContent":{"inputTranscription":{"text":"Je voudrais"}}}"#,
    )
    .unwrap();

    assert_eq!(
        events,
        vec![ServerEvent::TranscriptFragment {
            speaker: Speaker::User,
            text: "Je voudrais".to_string(),
        }]
    );
}

#[test]
fn test_output_transcription_is_an_assistant_fragment() {
    let events =
        parse_server_message(r#"{"serverContent":{"outputTranscription":{"text":"Bien sûr"}}}"#)
            .unwrap();

    assert_eq!(
        events,
        vec![ServerEvent::TranscriptFragment {
            speaker: Speaker::Assistant,
            text: "Bien sûr".to_string(),
        }]
    );
}

#[test]
fn test_combined_envelope_preserves_handling_order() {
    let audio = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]);
    let json = format!(
        r#"{{"serverContent":{{
            "outputTranscription":{{"text":"Voilà"}},
            "turnComplete":true,
            "modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{audio}"}}}}]}},
            "interrupted":true
        }}}}"#
    );

    let events = parse_server_message(&json).unwrap();

    assert_eq!(
        events,
        vec![
            ServerEvent::TranscriptFragment {
                speaker: Speaker::Assistant,
                text: "Voilà".to_string(),
            },
            ServerEvent::TurnComplete,
            ServerEvent::AudioChunk {
                data: vec![1, 2, 3, 4],
            },
            ServerEvent::Interrupted,
        ]
    );
}

#[test]
fn test_audio_payload_is_base64_decoded() {
    let pcm: Vec<u8> = (0u8..16).collect();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&pcm);
    let json = format!(
        r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"data":"{encoded}"}}}}]}}}}}}"#
    );

    let events = parse_server_message(&json).unwrap();
    assert_eq!(events, vec![ServerEvent::AudioChunk { data: pcm }]);
}

#[test]
fn test_empty_server_content_produces_no_events() {
    let events = parse_server_message(r#"{"serverContent":{}}"#).unwrap();
    assert!(events.is_empty());

    let events = parse_server_message(r#"{}"#).unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_malformed_message_is_an_error() {
    assert!(parse_server_message("not json").is_err());
    assert!(parse_server_message(r#"{"serverContent":[]}"#).is_err());
}

#[test]
fn test_invalid_base64_audio_is_an_error() {
    let json = r#"{"serverContent":{"modelTurn":{"parts":[{"inlineData":{"data":"!!!"}}]}}}"#;
    assert!(parse_server_message(json).is_err());
}
