use crate::events::SceneEvent;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioCue {
    pub sound: &'static str,
    pub volume: f32,
}

/// Fire-and-forget sound triggers derived from scene events. The host drains and plays
/// them; nothing flows back into the core.
pub struct AudioCues {
    enabled: bool,
    capacity: usize,
    pop_volume: f32,
    pending: VecDeque<AudioCue>,
}

impl AudioCues {
    pub fn new(capacity: usize, pop_volume: f32) -> Self {
        Self { enabled: true, capacity: capacity.max(1), pop_volume, pending: VecDeque::new() }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.pending.clear();
        }
    }

    pub fn handle_event(&mut self, event: &SceneEvent) {
        if !self.enabled {
            return;
        }
        let cue = match event {
            SceneEvent::EntityPopped { .. } => Some(AudioCue { sound: "pop", volume: self.pop_volume }),
            _ => None,
        };
        if let Some(cue) = cue {
            self.push_cue(cue);
        }
    }

    pub fn take_cues(&mut self) -> Vec<AudioCue> {
        self.pending.drain(..).collect()
    }

    fn push_cue(&mut self, cue: AudioCue) {
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(cue);
    }
}
