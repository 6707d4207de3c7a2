//! Stand-ins for the hardware a lab session is wired to: the walking
//! guide, the feedback display and the participant's two buttons.

use rand::Rng;
use rand::rngs::StdRng;
use stride_core::ResponseAction;
use stride_experiment::{
    FeedbackDisplay, FeedbackState, InputState, ResponseMapping, TrialEvent, WalkingGuide,
};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct LoggingGuide {
    moving: bool,
}

impl WalkingGuide for LoggingGuide {
    fn begin_motion(&mut self) {
        self.moving = true;
        info!("guide: walk");
    }

    fn is_stationary_capable(&self) -> bool {
        true
    }

    fn prepare_next_trial(&mut self) {
        if self.moving {
            debug!("guide: back to start position");
        }
        self.moving = false;
    }
}

#[derive(Debug, Default)]
pub struct LoggingFeedback;

impl FeedbackDisplay for LoggingFeedback {
    fn show(&mut self, state: FeedbackState) {
        match state {
            FeedbackState::Hidden => debug!("feedback hidden"),
            other => info!(feedback = ?other, "feedback shown"),
        }
    }
}

/// Presses both buttons to start each trial and answers presentations
/// after a reaction time, more reliably the larger the duration difference.
pub struct SimulatedParticipant {
    rng: StdRng,
    miss_rate: f32,
    pending: Option<(u64, ResponseAction)>,
}

impl SimulatedParticipant {
    pub fn new(rng: StdRng, miss_rate: f32) -> Self {
        Self {
            rng,
            miss_rate: miss_rate.clamp(0.0, 1.0),
            pending: None,
        }
    }

    pub fn observe(&mut self, events: &[TrialEvent], now_ns: u64, mapping: ResponseMapping) {
        for event in events {
            match event {
                TrialEvent::StimulusPresented { event, .. } => {
                    if self.rng.random::<f32>() < self.miss_rate {
                        self.pending = None;
                        continue;
                    }
                    let diff = (event.comparison_duration_ms() - event.standard_duration_ms()).abs();
                    let p_correct = 0.5 + 0.45 * (1.0 - (-diff / 40.0).exp());
                    let longer = event.comparison_type().is_longer();
                    let judged_longer = if self.rng.random::<f32>() < p_correct {
                        longer
                    } else {
                        !longer
                    };
                    let rt_ns = self.rng.random_range(300_000_000..600_000_000u64);
                    self.pending = Some((now_ns + rt_ns, mapping.button_for(judged_longer)));
                }
                TrialEvent::TrialComplete { .. } | TrialEvent::TrialAborted { .. } => {
                    self.pending = None;
                }
                _ => {}
            }
        }
    }

    /// Buttons held at `now_ns`. Each press lasts a single step.
    pub fn poll(&mut self, now_ns: u64, idle: bool) -> InputState {
        if idle {
            return InputState::BOTH;
        }
        match self.pending {
            Some((at, action)) if now_ns >= at => {
                self.pending = None;
                action.into()
            }
            _ => InputState::NONE,
        }
    }
}
