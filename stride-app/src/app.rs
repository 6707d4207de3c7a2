use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stride_audio::NullOutput;
use stride_experiment::{
    Collaborators, ExperimentConfig, FixedDeltaController, JitteredScheduleGenerator,
    JsonLinesSink, SessionSummary, TrialStateMachine,
};
use stride_timing::Timer;
use tracing::info;

use crate::adapters::{LoggingFeedback, LoggingGuide, SimulatedParticipant};
use crate::cli::Args;

pub struct App<T: Timer<Timestamp = u64>> {
    machine: TrialStateMachine<T, StdRng>,
    participant: SimulatedParticipant,
    summary: SessionSummary,
    step: Duration,
    trial_limit: usize,
    output: String,
}

impl<T: Timer<Timestamp = u64>> App<T> {
    pub fn new(args: &Args, timer: T) -> Result<Self> {
        let config = ExperimentConfig::load_or_default(&args.config);
        let seed = args.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let trials = config.design.total_trials();
        let schedule =
            JitteredScheduleGenerator::new(&config.timing, &config.audio).generate(trials, &mut rng);
        let participant =
            SimulatedParticipant::new(StdRng::seed_from_u64(rng.random()), args.miss_rate);

        let file = File::create(&args.output)
            .with_context(|| format!("cannot create output file {}", args.output))?;
        let ports = Collaborators {
            schedule: Box::new(schedule),
            controller: Box::new(FixedDeltaController {
                delta_ms: config.audio.initial_delta_ms(),
            }),
            guide: Box::new(LoggingGuide::default()),
            feedback: Box::new(LoggingFeedback),
            sink: Box::new(JsonLinesSink::new(BufWriter::new(file))),
            audio: Box::new(NullOutput),
        };

        let machine = TrialStateMachine::new(config, timer, rng, ports);
        let trial_limit = args
            .trials
            .unwrap_or(usize::MAX)
            .min(machine.design().len());
        info!(seed, trials = trial_limit, "session configured");

        Ok(Self {
            machine,
            participant,
            summary: SessionSummary::new(),
            step: Duration::from_millis(args.step_ms.max(1)),
            trial_limit,
            output: args.output.clone(),
        })
    }

    pub fn run(mut self) -> Result<()> {
        println!("=== STRIDE DURATION DISCRIMINATION ===");
        println!("Platform: {}", std::env::consts::OS);
        let [longer, shorter] = self.machine.mapping().instruction_labels();
        println!("Response mapping: {}", self.machine.mapping().describe());
        println!("  longer: {longer}, shorter: {shorter}");
        println!("Trials: {}\n", self.trial_limit);

        while self.machine.trial_count() < self.trial_limit {
            let frame_start = self.machine.timer.now();
            let idle = !self.machine.is_trial_in_progress();
            let input = self.participant.poll(frame_start, idle);

            let events = self.machine.update(input);
            self.participant
                .observe(&events, self.machine.timer.now(), self.machine.mapping());
            self.summary.observe_all(&events);

            self.machine.timer.sleep(self.step);
            let elapsed = self.machine.timer.elapsed(frame_start);
            self.machine.timer.record_frame(elapsed);
        }

        self.summary.log();
        let stats = self.machine.timer.calibration_stats();
        println!("Session complete: {} trials", self.summary.trials_completed);
        println!(
            "Step timing: mean {:.3} ms, jitter {:.3} ms, min {:.3} ms, max {:.3} ms",
            stats.average_frame_time_ns / 1e6,
            stats.jitter_ns / 1e6,
            stats.min_frame_time_ns / 1e6,
            stats.max_frame_time_ns / 1e6,
        );
        println!("Events saved to {}", self.output);
        Ok(())
    }
}
