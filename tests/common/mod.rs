#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use stormfront::chance::ScriptedChance;
use stormfront::motion::MotionSetting;
use stormfront::observability::EventEmitter;
use stormfront::sequence::EntranceSequence;
use stormfront::stage::Stage;

/// In-memory JSONL sink shared between an emitter and the test.
#[derive(Clone, Default)]
pub struct EventCapture(Arc<Mutex<Vec<u8>>>);

impl Write for EventCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl EventCapture {
    pub fn emitter(&self) -> Arc<EventEmitter> {
        Arc::new(EventEmitter::new(Box::new(self.clone())))
    }

    pub fn events(&self) -> Vec<Value> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(|l| serde_json::from_str(l).expect("event line should be JSON"))
            .collect()
    }

    pub fn types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e["type"].as_str().unwrap().to_string())
            .collect()
    }

    pub fn of_type(&self, ty: &str) -> Vec<Value> {
        self.events().into_iter().filter(|e| e["type"] == ty).collect()
    }
}

/// Sequence over `stage` with a constant chance sample (0.99 means "never
/// roll the optional branch").
pub fn sequence(
    stage: &Arc<Stage>,
    motion: Arc<MotionSetting>,
    capture: &EventCapture,
) -> EntranceSequence {
    EntranceSequence::new(
        Arc::clone(stage),
        motion,
        Arc::new(ScriptedChance::constant(0.99)),
    )
    .with_events(capture.emitter())
}

/// Runs the compiled binary to completion.
pub fn stormfront(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stormfront"))
        .args(args)
        .env_remove("STORMFRONT_CONFIG")
        .env_remove("STORMFRONT_SEED")
        .env_remove("STORMFRONT_EVENTS")
        .env_remove("STORMFRONT_LOG_LEVEL")
        .output()
        .expect("failed to run stormfront")
}
