use std::collections::VecDeque;

use thoth_scheduler::JobHandle;

use crate::meeting::{Meeting, MeetingId};

/// A pending meeting together with the handle of its armed activation job.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub meeting: Meeting,
    pub activation: Option<JobHandle>,
}

/// Pending meetings in insertion order (FIFO).
///
/// Ordering is by when a meeting was added, never by its start time: the
/// head is always the earliest-added meeting still waiting. When a later-added
/// meeting's job fires first, it takes over the head's start; if that start
/// is already past its own end it activates and then closes on the next tick.
#[derive(Debug, Default)]
pub struct MeetingQueue {
    entries: VecDeque<QueueEntry>,
}

impl MeetingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, meeting: Meeting, activation: Option<JobHandle>) {
        self.entries.push_back(QueueEntry {
            meeting,
            activation,
        });
    }

    pub fn peek_next(&self) -> Option<&Meeting> {
        self.entries.front().map(|e| &e.meeting)
    }

    /// Remove the head for activation.
    pub fn pop_next(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Remove the head without activating it. The caller disarms its job.
    pub fn cancel_next(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    pub fn list_all(&self) -> impl Iterator<Item = &Meeting> {
        self.entries.iter().map(|e| &e.meeting)
    }

    pub fn entry(&self, id: &MeetingId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.meeting.id == *id)
    }

    /// Replace the activation handle tracked for `id`. Returns `false` if `id` is not queued.
    pub fn set_activation(&mut self, id: &MeetingId, activation: Option<JobHandle>) -> bool {
        match self.entries.iter_mut().find(|e| e.meeting.id == *id) {
            Some(entry) => {
                entry.activation = activation;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &MeetingId) -> bool {
        self.entry(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
