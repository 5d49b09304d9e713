use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::live::Speaker;

/// One finalized utterance, immutable once emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of the in-progress, not-yet-finalized text per speaker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveTranscription {
    pub user: String,
    pub assistant: String,
}

/// Accumulates streamed transcript fragments into finalized turns
///
/// Fragments grow two per-speaker buffers; a turn-complete signal drains
/// both into at most two Turn records and resets the buffers. Buffers never
/// shrink except on that reset.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    user: String,
    assistant: String,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the updated live snapshot
    pub fn on_fragment(&mut self, speaker: Speaker, text: &str) -> LiveTranscription {
        match speaker {
            Speaker::User => self.user.push_str(text),
            Speaker::Assistant => self.assistant.push_str(text),
        }
        self.live()
    }

    /// Finalize the current exchange
    ///
    /// Emits one Turn per non-empty (post-trim) buffer, user before
    /// assistant, then resets both. All-whitespace buffers are dropped
    /// rather than recorded as empty messages.
    pub fn on_turn_complete(&mut self) -> Vec<Turn> {
        let mut turns = Vec::new();

        for (speaker, buffer) in [
            (Speaker::User, std::mem::take(&mut self.user)),
            (Speaker::Assistant, std::mem::take(&mut self.assistant)),
        ] {
            let text = buffer.trim();
            if !text.is_empty() {
                turns.push(Turn {
                    id: Uuid::new_v4(),
                    speaker,
                    text: text.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        turns
    }

    /// Clear both buffers without emitting anything
    pub fn reset(&mut self) {
        self.user.clear();
        self.assistant.clear();
    }

    pub fn live(&self) -> LiveTranscription {
        LiveTranscription {
            user: self.user.clone(),
            assistant: self.assistant.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_accumulate_per_speaker() {
        let mut assembler = TranscriptAssembler::new();

        let live = assembler.on_fragment(Speaker::User, "Je");
        assert_eq!(live.user, "Je");
        assert_eq!(live.assistant, "");

        let live = assembler.on_fragment(Speaker::User, " voudrais");
        assert_eq!(live.user, "Je voudrais");

        let live = assembler.on_fragment(Speaker::Assistant, "Bien sûr");
        assert_eq!(live.user, "Je voudrais");
        assert_eq!(live.assistant, "Bien sûr");
    }

    #[test]
    fn test_turn_complete_emits_user_before_assistant() {
        let mut assembler = TranscriptAssembler::new();
        assembler.on_fragment(Speaker::Assistant, "Bonjour !");
        assembler.on_fragment(Speaker::User, "Je voudrais un café");

        let turns = assembler.on_turn_complete();

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, Speaker::User);
        assert_eq!(turns[0].text, "Je voudrais un café");
        assert_eq!(turns[1].speaker, Speaker::Assistant);
        assert_eq!(turns[1].text, "Bonjour !");
        assert_ne!(turns[0].id, turns[1].id);
    }

    #[test]
    fn test_turn_complete_resets_buffers() {
        let mut assembler = TranscriptAssembler::new();
        assembler.on_fragment(Speaker::User, "hello");
        assembler.on_turn_complete();

        assert_eq!(assembler.live(), LiveTranscription::default());
        assert!(assembler.on_turn_complete().is_empty());
    }

    #[test]
    fn test_whitespace_only_buffer_is_dropped() {
        let mut assembler = TranscriptAssembler::new();
        assembler.on_fragment(Speaker::User, "   \n ");
        assembler.on_fragment(Speaker::Assistant, "Réponse");

        let turns = assembler.on_turn_complete();

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker, Speaker::Assistant);
        assert_eq!(turns[0].text, "Réponse");
    }

    #[test]
    fn test_empty_turn_emits_nothing() {
        let mut assembler = TranscriptAssembler::new();
        assert!(assembler.on_turn_complete().is_empty());
    }

    #[test]
    fn test_reset_discards_pending_fragments() {
        let mut assembler = TranscriptAssembler::new();
        assembler.on_fragment(Speaker::User, "stale");
        assembler.reset();

        assert!(assembler.on_turn_complete().is_empty());
    }
}
