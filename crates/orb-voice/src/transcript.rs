//! Conversation transcript reducer.
//!
//! Folds the two interleaved streams of the control protocol (user
//! speech-to-text status updates and assistant transcript deltas) into one
//! ordered log. User entries are addressed by the id of the single open
//! user entry; assistant deltas only ever extend the most recent entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::protocol::ServerEvent;

/// Text shown on a user entry while its audio is being transcribed.
pub const PROCESSING_PLACEHOLDER: &str = "Processing speech...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Speaking,
    Processing,
    Final,
    None,
}

/// One line of the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_final: bool,
    pub activity_status: ActivityStatus,
}

/// Whether a consuming UI should render `entry`.
///
/// Assistant entries always show. User entries show while speaking or
/// processing, or once final with non-empty text.
pub fn should_display(entry: &ConversationEntry) -> bool {
    match entry.role {
        Role::Assistant => true,
        Role::User => {
            matches!(
                entry.activity_status,
                ActivityStatus::Speaking | ActivityStatus::Processing
            ) || (entry.is_final && !entry.text.trim().is_empty())
        }
    }
}

/// Ordered conversation log built from protocol events.
pub struct TranscriptStore {
    entries: Vec<ConversationEntry>,
    /// The user entry currently being extended, if any.
    open_user_id: Option<String>,
    clock: Arc<dyn Clock>,
}

impl TranscriptStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Vec::new(),
            open_user_id: None,
            clock,
        }
    }

    /// Apply one protocol event. Returns `true` if the log changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::SpeechStarted => {
                if self.open_user_entry().is_some() {
                    self.update_open_user(|e| e.activity_status = ActivityStatus::Speaking)
                } else {
                    let entry = self.new_entry(Role::User, String::new(), ActivityStatus::Speaking);
                    self.open_user_id = Some(entry.id.clone());
                    self.entries.push(entry);
                    true
                }
            }
            // Audio capture stopping is not a transcript; stay in `speaking`.
            ServerEvent::SpeechStopped => {
                self.update_open_user(|e| e.activity_status = ActivityStatus::Speaking)
            }
            ServerEvent::AudioCommitted { .. } => self.update_open_user(|e| {
                e.text = PROCESSING_PLACEHOLDER.to_string();
                e.activity_status = ActivityStatus::Processing;
            }),
            ServerEvent::UserTranscriptPartial { transcript, text } => {
                let partial = ServerEvent::partial_text(transcript, text);
                self.update_open_user(|e| {
                    e.text = partial;
                    e.activity_status = ActivityStatus::Speaking;
                })
            }
            ServerEvent::UserTranscriptCompleted { transcript } => {
                let changed = self.update_open_user(|e| {
                    e.text = transcript.clone();
                    e.is_final = true;
                    e.activity_status = ActivityStatus::Final;
                });
                self.open_user_id = None;
                changed
            }
            ServerEvent::AssistantTranscriptDelta { delta } => {
                self.append_assistant_delta(delta);
                true
            }
            ServerEvent::AssistantTranscriptDone => self.finish_assistant(),
            ServerEvent::FunctionCallArgumentsDone { .. } | ServerEvent::Unknown => false,
        }
    }

    fn append_assistant_delta(&mut self, delta: &str) {
        if let Some(last) = self.entries.last_mut() {
            if last.role == Role::Assistant && !last.is_final {
                last.text.push_str(delta);
                return;
            }
        }
        // A user entry slipped in after an unfinished assistant entry; close
        // the older one so only one assistant entry is ever open.
        if let Some(stale) = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.role == Role::Assistant && !e.is_final)
        {
            stale.is_final = true;
            stale.activity_status = ActivityStatus::Final;
        }
        let entry = self.new_entry(Role::Assistant, delta.to_string(), ActivityStatus::None);
        self.entries.push(entry);
    }

    fn finish_assistant(&mut self) -> bool {
        match self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.role == Role::Assistant)
        {
            Some(entry) if !entry.is_final => {
                entry.is_final = true;
                entry.activity_status = ActivityStatus::Final;
                true
            }
            _ => false,
        }
    }

    fn new_entry(&self, role: Role, text: String, status: ActivityStatus) -> ConversationEntry {
        ConversationEntry {
            id: orb_common::new_id(),
            role,
            text,
            timestamp: self.clock.now(),
            is_final: false,
            activity_status: status,
        }
    }

    fn open_user_entry(&self) -> Option<&ConversationEntry> {
        let id = self.open_user_id.as_deref()?;
        self.entries.iter().find(|e| e.id == id)
    }

    /// Mutate the open user entry. Final entries are never touched.
    fn update_open_user(&mut self, f: impl FnOnce(&mut ConversationEntry)) -> bool {
        let Some(id) = self.open_user_id.as_deref() else {
            return false;
        };
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) if !entry.is_final => {
                f(entry);
                true
            }
            _ => false,
        }
    }

    /// All entries in insertion order, including hidden placeholders.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Entries a UI should render.
    pub fn visible(&self) -> Vec<ConversationEntry> {
        self.entries
            .iter()
            .filter(|e| should_display(e))
            .cloned()
            .collect()
    }

    pub fn open_user_id(&self) -> Option<&str> {
        self.open_user_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and the open-entry pointer.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.open_user_id = None;
    }
}
