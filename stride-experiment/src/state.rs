use rand::Rng;
use stride_core::{
    AuditoryParameters, Condition, ResponseAction, StimulusEvent, TrialContext, TrialError,
    TrialPhase, TrialRecord,
};
use stride_timing::Timer;
use tracing::{debug, info, warn};

use crate::config::ExperimentConfig;
use crate::design::BlockDesign;
use crate::error::{ExperimentError, Result};
use crate::ports::{Collaborators, FeedbackState, InputState};
use crate::scorer::{self, ResponseMapping, ScoredResponse};
use crate::stimulus::StimulusPreparer;

#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    TrialStarted { trial: usize, condition: Condition },
    StandardTone { repetition: usize },
    WalkingStarted,
    StimulusPresented { window: usize, event: StimulusEvent },
    CatchSlot { slot: usize },
    ResponseScored { window: usize, correct: bool, responded_longer: bool },
    ResponseMissed { window: usize },
    TrialAborted { trial: usize },
    TrialComplete { trial: usize },
}

/// Decides, per scheduled onset, whether a tone is played or the slot is
/// left silent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchPolicy {
    presentation_probability: f32,
}

impl CatchPolicy {
    pub fn new(catch_probability: f32) -> Self {
        Self {
            presentation_probability: 1.0 - catch_probability.clamp(0.0, 1.0),
        }
    }

    pub fn should_present<R: Rng>(&self, rng: &mut R) -> bool {
        rng.random::<f32>() < self.presentation_probability
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Sounding,
    AwaitingResponse,
}

fn secs_to_ns(secs: f32) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs as f64 * 1e9).round() as u64
    } else {
        0
    }
}

/// Cooperative scheduler for one trial at a time.
///
/// Nothing here blocks. Every suspension is a wake-up time; the host calls
/// [`update`](Self::update) once per step with the sampled buttons and the
/// machine runs every transition that has come due. Stimulus preparation
/// and response scoring therefore never interleave within a step, and the
/// scorer only ever reads the snapshot published at presentation.
pub struct TrialStateMachine<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub config: ExperimentConfig,
    pub timer: T,
    rng: R,
    design: BlockDesign,
    mapping: ResponseMapping,
    preparer: StimulusPreparer,
    catch_policy: CatchPolicy,
    ports: Collaborators,

    phase: TrialPhase,
    trial_count: usize,
    trial_start_ns: u64,
    wake_at_ns: u64,
    onsets: Vec<f32>,
    next_onset: usize,
    standard_played: usize,
    stage: Stage,
    record: Option<TrialRecord>,
    snapshot: Option<StimulusEvent>,
    feedback_hide_at_ns: Option<u64>,
    last_input: InputState,
    aborted: bool,
    events: Vec<TrialEvent>,
}

impl<T, R> TrialStateMachine<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    /// Generates the block design and the response mapping from `rng`.
    pub fn new(config: ExperimentConfig, timer: T, mut rng: R, ports: Collaborators) -> Self {
        let config = config.sanitized();
        let design = BlockDesign::generate(&config.design, &mut rng);
        let mapping = ResponseMapping::assign(&mut rng);
        Self::with_design(config, design, mapping, timer, rng, ports)
    }

    pub fn with_design(
        config: ExperimentConfig,
        design: BlockDesign,
        mapping: ResponseMapping,
        timer: T,
        mut rng: R,
        ports: Collaborators,
    ) -> Self {
        let mut preparer = StimulusPreparer::new(&config.audio);
        preparer.prepare_next(&mut rng);
        info!(
            trials = design.len(),
            mapping = mapping.describe(),
            standard_ms = config.audio.standard_duration_ms,
            "session ready"
        );
        Self {
            catch_policy: CatchPolicy::new(config.timing.catch_probability),
            config,
            timer,
            rng,
            design,
            mapping,
            preparer,
            ports,
            phase: TrialPhase::Idle,
            trial_count: 0,
            trial_start_ns: 0,
            wake_at_ns: 0,
            onsets: Vec::new(),
            next_onset: 0,
            standard_played: 0,
            stage: Stage::Sounding,
            record: None,
            snapshot: None,
            feedback_hide_at_ns: None,
            last_input: InputState::NONE,
            aborted: false,
            events: Vec::new(),
        }
    }

    fn trial_time_at(&self, now: u64) -> f32 {
        if self.phase.is_in_progress() {
            (now.saturating_sub(self.trial_start_ns) as f64 / 1e9) as f32
        } else {
            0.0
        }
    }

    /// Seconds since the running trial started; 0 when idle.
    pub fn trial_time(&self) -> f32 {
        self.trial_time_at(self.timer.now())
    }

    /// Begins the next trial in the design.
    ///
    /// A trial without an onset schedule cannot be timed, so it is skipped:
    /// counted as aborted, with the machine left idle.
    pub fn start_trial(&mut self) -> Result<()> {
        let trial = self.trial_count;
        if self.phase.is_in_progress() {
            return Err(ExperimentError::TrialInProgress { trial });
        }
        let row = *self
            .design
            .get(trial)
            .ok_or(ExperimentError::DesignExhausted {
                trial,
                len: self.design.len(),
            })?;
        let Some(onsets) = self.ports.schedule.onsets(trial).map(<[f32]>::to_vec) else {
            warn!(trial, "no onset schedule, skipping trial");
            self.trial_count += 1;
            self.events.push(TrialEvent::TrialAborted { trial });
            return Err(ExperimentError::MissingSchedule { trial });
        };

        let is_stationary = row.condition.is_stationary();
        if is_stationary && !self.ports.guide.is_stationary_capable() {
            warn!(trial, "walking guide cannot hold a stationary position");
        }
        self.ports.feedback.show(FeedbackState::Hidden);
        self.feedback_hide_at_ns = None;

        self.record = Some(TrialRecord::new(TrialContext {
            trial_number: trial,
            block_id: row.block,
            trial_in_block: row.trial_in_block,
            condition: row.condition,
            is_stationary,
        }));
        self.snapshot = None;
        self.next_onset = 0;
        self.standard_played = 0;
        self.aborted = false;

        let now = self.timer.now();
        self.trial_start_ns = now;
        self.phase = TrialPhase::PreTrialWait;
        self.wake_at_ns = now + secs_to_ns(self.config.timing.pre_trial_sec);

        info!(
            trial = trial + 1,
            of = self.design.len(),
            block = row.block,
            condition = ?row.condition,
            onsets = ?onsets,
            "trial started"
        );
        self.onsets = onsets;
        self.events.push(TrialEvent::TrialStarted {
            trial,
            condition: row.condition,
        });
        Ok(())
    }

    /// Runs one scheduler step: polls `input`, then performs every phase
    /// transition that has come due. Returns the events of this step.
    pub fn update(&mut self, input: InputState) -> Vec<TrialEvent> {
        let now = self.timer.now();

        if self.feedback_hide_at_ns.is_some_and(|at| now >= at) {
            self.ports.feedback.show(FeedbackState::Hidden);
            self.feedback_hide_at_ns = None;
        }

        if self.phase.is_in_progress() {
            self.poll_response(now, input);
        } else if input.both() && !self.is_session_complete() {
            if !self.ports.guide.is_ready() {
                debug!("start signal ignored, walking guide not ready");
            } else if let Err(err) = self.start_trial() {
                warn!(%err, "trial not started");
            }
        }
        self.last_input = input;

        while self.phase.is_in_progress() && now >= self.wake_at_ns {
            self.step(now);
        }

        std::mem::take(&mut self.events)
    }

    fn poll_response(&mut self, now: u64, input: InputState) {
        let pressed = InputState {
            left: input.left && !self.last_input.left,
            right: input.right && !self.last_input.right,
        };
        if !pressed.either() {
            return;
        }
        let t = self.trial_time_at(now);
        if t < self.config.timing.response_lockout_sec {
            return;
        }
        if let Some(record) = &mut self.record {
            record.note_click(t);
        }
        let Some(action) = pressed.action() else {
            debug!("both buttons pressed together, not scored");
            return;
        };
        if let Err(err) = self.record_response(action) {
            debug!(%err, "press not scored");
        }
    }

    /// Scores `action` against the snapshot of the open window. Only the
    /// first response per window counts; later ones are rejected.
    pub fn record_response(&mut self, action: ResponseAction) -> Result<ScoredResponse> {
        let now = self.timer.now();
        if !self.phase.accepts_response() || self.window_expired(now) {
            return Err(TrialError::NoOpenWindow.into());
        }
        let t = self.trial_time_at(now);
        let snapshot = self.snapshot.ok_or(ExperimentError::NoSnapshot)?;
        let record = self.record.as_mut().ok_or(TrialError::NoOpenWindow)?;

        let scored = scorer::score(&snapshot, self.mapping, action, t, record)?;
        let window = record.window_index();
        let condition = record.context.condition;
        if let Err(err) = self.ports.sink.persist(record, &snapshot) {
            warn!(%err, window, "failed to persist response");
        }

        info!(
            window,
            correct = scored.correct,
            rt = t - snapshot.onset_time(),
            "response"
        );
        self.events.push(TrialEvent::ResponseScored {
            window,
            correct: scored.correct,
            responded_longer: scored.responded_longer,
        });
        self.after_response(condition, scored.correct, now);
        Ok(scored)
    }

    fn after_response(&mut self, condition: Condition, correct: bool, now: u64) {
        if self.trial_count < self.config.design.standing_still_trials {
            debug!("practice trial, regenerating without adapting");
            self.ports.feedback.show(if correct {
                FeedbackState::Correct
            } else {
                FeedbackState::Incorrect
            });
            self.feedback_hide_at_ns = Some(now + secs_to_ns(self.config.timing.feedback_sec));
        } else if let Some(label) = condition.controller_label() {
            let delta = self.ports.controller.process_response(label, correct);
            debug!(condition = label, correct, delta_ms = delta, "controller updated");
            self.preparer.set_delta(delta);
        }
        self.preparer.prepare_next(&mut self.rng);
    }

    /// Forces the running trial to end now. An open window is released
    /// without crediting or persisting a response.
    pub fn abort_trial(&mut self) {
        if !self.phase.is_in_progress() {
            return;
        }
        if let Some(record) = &mut self.record {
            record.close_window();
        }
        warn!(trial = self.trial_count, phase = ?self.phase, "trial aborted");
        self.aborted = true;
        self.phase = TrialPhase::TrialEnd;
        self.wake_at_ns = self.timer.now();
    }

    /// True once the open window's deadline has passed, even if the step
    /// that closes it has not run yet.
    fn window_expired(&self, now: u64) -> bool {
        let closes_at = match self.stage {
            Stage::Sounding => {
                self.wake_at_ns + secs_to_ns(self.config.timing.response_window_sec)
            }
            Stage::AwaitingResponse => self.wake_at_ns,
        };
        now >= closes_at
    }

    fn step(&mut self, now: u64) {
        match self.phase {
            TrialPhase::Idle => {}
            TrialPhase::PreTrialWait => {
                self.phase = TrialPhase::StandardSequence;
                self.play_standard(now);
            }
            TrialPhase::StandardSequence => self.play_standard(now),
            TrialPhase::ComparisonSchedule => self.fire_onset(now),
            TrialPhase::ResponseWindow => match self.stage {
                Stage::Sounding => {
                    self.stage = Stage::AwaitingResponse;
                    self.wake_at_ns += secs_to_ns(self.config.timing.response_window_sec);
                }
                Stage::AwaitingResponse => self.close_window(now),
            },
            TrialPhase::CatchSlot => self.schedule_next_onset(now),
            TrialPhase::TrialEnd => self.pack_down(),
        }
    }

    fn play_standard(&mut self, now: u64) {
        if self.standard_played >= self.preparer.standard_repetitions() {
            self.finish_standard(now);
            return;
        }
        self.ports.audio.play(self.preparer.standard_buffer());
        self.standard_played += 1;
        self.events.push(TrialEvent::StandardTone {
            repetition: self.standard_played,
        });
        self.wake_at_ns = now + secs_to_ns(self.preparer.standard_interval_sec());
    }

    fn finish_standard(&mut self, now: u64) {
        debug!(
            repetitions = self.standard_played,
            "standard sequence complete"
        );
        let stationary = self.record.as_ref().is_some_and(|r| r.context.is_stationary);
        if !stationary {
            self.ports.guide.begin_motion();
            self.events.push(TrialEvent::WalkingStarted);
        }
        self.schedule_next_onset(now);
    }

    /// The first onset is waited for as given; later onsets are waited for
    /// relative to the trial clock so earlier drift is absorbed.
    fn schedule_next_onset(&mut self, now: u64) {
        let k = self.next_onset;
        match self.onsets.get(k) {
            Some(&onset) => {
                let wait = if k == 0 {
                    onset
                } else {
                    onset - self.trial_time_at(now)
                };
                self.phase = TrialPhase::ComparisonSchedule;
                self.wake_at_ns = now + secs_to_ns(wait);
            }
            None => {
                debug!(onsets = self.onsets.len(), "schedule exhausted");
                self.phase = TrialPhase::TrialEnd;
                self.wake_at_ns =
                    self.trial_start_ns + secs_to_ns(self.config.timing.trial_duration_sec);
            }
        }
    }

    fn fire_onset(&mut self, now: u64) {
        let k = self.next_onset;
        self.next_onset += 1;
        if self.catch_policy.should_present(&mut self.rng) {
            self.present(k, now);
        } else {
            let nominal = self.preparer.parameters().comparison_duration_ms / 1000.0;
            debug!(slot = k + 1, "catch slot");
            self.phase = TrialPhase::CatchSlot;
            self.wake_at_ns =
                now + secs_to_ns(nominal + self.config.timing.response_window_sec);
            self.events.push(TrialEvent::CatchSlot { slot: k + 1 });
        }
    }

    fn present(&mut self, k: usize, now: u64) {
        let t = self.trial_time_at(now);
        match self.preparer.comparison_buffer() {
            Some(buffer) => self.ports.audio.play(buffer),
            None => warn!(slot = k + 1, "no comparison buffer, presenting silently"),
        }

        let window = k + 1;
        if let Some(record) = &mut self.record {
            record.open_window(window);
        }
        let event = self.preparer.snapshot(t);
        self.snapshot = Some(event);
        self.stage = Stage::Sounding;
        self.phase = TrialPhase::ResponseWindow;
        self.wake_at_ns = now + secs_to_ns(event.comparison_duration_sec());

        info!(
            window,
            onset = t,
            comparison_ms = event.comparison_duration_ms(),
            longer = event.comparison_type().is_longer(),
            "comparison presented"
        );
        self.events.push(TrialEvent::StimulusPresented { window, event });
    }

    fn close_window(&mut self, now: u64) {
        let mut missed = None;
        if let Some(record) = &mut self.record {
            if !record.has_responded() {
                let window = record.window_index();
                if let Some(snapshot) = &self.snapshot {
                    if let Err(err) = self.ports.sink.persist(record, snapshot) {
                        warn!(%err, window, "failed to persist miss");
                    }
                }
                missed = Some(window);
            }
            record.close_window();
        }
        if let Some(window) = missed {
            info!(window, "no response");
            self.events.push(TrialEvent::ResponseMissed { window });
            self.preparer.prepare_next(&mut self.rng);
        }
        self.schedule_next_onset(now);
    }

    fn pack_down(&mut self) {
        let trial = self.trial_count;
        if let Some(record) = &mut self.record {
            record.close_window();
        }
        self.ports.audio.stop_all();
        self.ports.guide.prepare_next_trial();
        self.phase = TrialPhase::Idle;
        self.trial_count += 1;
        if self.aborted {
            self.events.push(TrialEvent::TrialAborted { trial });
        } else {
            info!(trial = trial + 1, "trial complete");
            self.events.push(TrialEvent::TrialComplete { trial });
        }
    }

    /// Runs the stimulus preparation step now. The scheduler already does
    /// this after every scored or missed presentation.
    pub fn prepare_next(&mut self) -> &AuditoryParameters {
        self.preparer.prepare_next(&mut self.rng)
    }

    pub fn current_phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn is_trial_in_progress(&self) -> bool {
        self.phase.is_in_progress()
    }

    pub fn latest_snapshot(&self) -> Option<StimulusEvent> {
        self.snapshot
    }

    /// Record of the running trial, or of the last one once idle.
    pub fn record(&self) -> Option<&TrialRecord> {
        self.record.as_ref()
    }

    pub fn parameters(&self) -> &AuditoryParameters {
        self.preparer.parameters()
    }

    pub fn mapping(&self) -> ResponseMapping {
        self.mapping
    }

    pub fn design(&self) -> &BlockDesign {
        &self.design
    }

    pub fn trial_count(&self) -> usize {
        self.trial_count
    }

    pub fn is_session_complete(&self) -> bool {
        self.trial_count >= self.design.len()
    }
}
