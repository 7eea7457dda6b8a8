//! Key bindings that turn input into action triggers.
//!
//! Add-ons create bindings through the `BindInput` / `UnbindInput` handlers.
//! The host feeds key state in once per tick with [`InputBindings::poll`] and
//! passes whatever fired to [`Engine::trigger_action`]. Reading devices is
//! the host's job; this module only sees an [`InputState`].

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use loopmod_types::ParameterValue;
use thiserror::Error;

use crate::diagnostics::HandlerError;
use crate::engine::Engine;
use crate::handlers::{optional, required_str};
use crate::registry::Handler;

pub const BIND_INPUT: &str = "BindInput";
pub const UNBIND_INPUT: &str = "UnbindInput";

/// When a key binding fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyTrigger {
    /// The tick the key goes down
    #[default]
    Down,
    /// The tick the key comes up
    Up,
    /// After the hold delay, then every repeat interval while held
    Held,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key trigger '{0}'")]
pub struct UnknownTrigger(String);

impl FromStr for KeyTrigger {
    type Err = UnknownTrigger;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "down" => Ok(Self::Down),
            "up" => Ok(Self::Up),
            "held" => Ok(Self::Held),
            _ => Err(UnknownTrigger(s.to_string())),
        }
    }
}

/// Key state for the current tick. Key names are compared case-insensitively.
pub trait InputState {
    /// Currently held
    fn is_down(&self, key: &str) -> bool;
    /// Went down this tick
    fn pressed(&self, key: &str) -> bool;
    /// Came up this tick
    fn released(&self, key: &str) -> bool;
}

/// An [`InputState`] built from press/release notifications.
#[derive(Debug, Clone, Default)]
pub struct KeyboardSnapshot {
    down: HashSet<String>,
    pressed: HashSet<String>,
    released: HashSet<String>,
}

impl KeyboardSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: &str) {
        let key = normalize_key(key);
        if self.down.insert(key.clone()) {
            self.pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: &str) {
        let key = normalize_key(key);
        if self.down.remove(&key) {
            self.released.insert(key);
        }
    }

    /// Forget this tick's edges; held keys stay held.
    pub fn end_tick(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}

impl InputState for KeyboardSnapshot {
    fn is_down(&self, key: &str) -> bool {
        self.down.contains(&normalize_key(key))
    }

    fn pressed(&self, key: &str) -> bool {
        self.pressed.contains(&normalize_key(key))
    }

    fn released(&self, key: &str) -> bool {
        self.released.contains(&normalize_key(key))
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub id: String,
    pub action_id: String,
    pub key: String,
    pub trigger: KeyTrigger,
    pub hold_delay: Duration,
    pub repeat_interval: Duration,
    pub payload: Option<ParameterValue>,
    /// Held bindings only: `None` once a zero-interval binding has fired
    next_fire: Option<Duration>,
}

impl InputBinding {
    pub fn new(id: impl Into<String>, action_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action_id: action_id.into(),
            key: key.into(),
            trigger: KeyTrigger::Down,
            hold_delay: Duration::ZERO,
            repeat_interval: Duration::ZERO,
            payload: None,
            next_fire: Some(Duration::ZERO),
        }
    }

    pub fn with_trigger(mut self, trigger: KeyTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_hold(mut self, hold_delay: Duration, repeat_interval: Duration) -> Self {
        self.hold_delay = hold_delay;
        self.repeat_interval = repeat_interval;
        self
    }

    pub fn with_payload(mut self, payload: ParameterValue) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Parse `BindInput` arguments.
    pub fn from_args(args: &ParameterValue) -> Result<Self, HandlerError> {
        let action_id = match args.non_empty_str("actionId") {
            Some(id) => id,
            None => {
                let legacy = required_str(args, "eventName")
                    .map_err(|_| HandlerError::missing("actionId"))?;
                tracing::warn!("BindInput received deprecated 'eventName', use 'actionId' instead");
                legacy
            }
        };
        let id = args.non_empty_str("id").unwrap_or_else(|| action_id.clone());
        let key = required_str(args, "key")?;

        let trigger = match optional(args, "trigger") {
            Some(value) => value
                .as_str_lossy()
                .parse()
                .map_err(|e: UnknownTrigger| HandlerError::invalid("trigger", e.to_string()))?,
            None => KeyTrigger::Down,
        };

        let seconds = |name: &str| {
            let secs = optional(args, name).map(ParameterValue::as_f64).unwrap_or(0.0);
            if secs.is_finite() && secs > 0.0 {
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            } else {
                Duration::ZERO
            }
        };

        Ok(Self {
            trigger,
            hold_delay: seconds("holdDelay"),
            repeat_interval: seconds("repeatInterval"),
            payload: optional(args, "payload").cloned(),
            ..Self::new(id, action_id, key)
        })
    }

    fn evaluate(&mut self, input: &impl InputState, now: Duration) -> bool {
        match self.trigger {
            KeyTrigger::Down => input.pressed(&self.key),
            KeyTrigger::Up => input.released(&self.key),
            KeyTrigger::Held => {
                if input.pressed(&self.key) {
                    self.next_fire = Some(now.saturating_add(self.hold_delay));
                }
                if !input.is_down(&self.key) {
                    if input.released(&self.key) {
                        self.next_fire = Some(Duration::ZERO);
                    }
                    return false;
                }
                match self.next_fire {
                    Some(next) if now >= next => {
                        self.next_fire = (!self.repeat_interval.is_zero())
                            .then(|| now.saturating_add(self.repeat_interval));
                        true
                    }
                    _ => false,
                }
            }
        }
    }
}

/// A binding that fired during [`InputBindings::poll`].
#[derive(Debug, Clone, PartialEq)]
pub struct FiredBinding {
    pub binding_id: String,
    pub action_id: String,
    pub payload: Option<ParameterValue>,
}

/// Bindings by id, in the order they were first bound.
#[derive(Debug, Clone, Default)]
pub struct InputBindings {
    bindings: Vec<InputBinding>,
}

pub type SharedInputBindings = Arc<Mutex<InputBindings>>;

impl InputBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedInputBindings {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Add a binding, replacing one with the same id. Returns the replaced one.
    pub fn bind(&mut self, binding: InputBinding) -> Option<InputBinding> {
        tracing::info!(
            id = %binding.id,
            action_id = %binding.action_id,
            key = %binding.key,
            trigger = ?binding.trigger,
            "Input bound"
        );
        match self.bindings.iter_mut().find(|b| b.id == binding.id) {
            Some(existing) => Some(std::mem::replace(existing, binding)),
            None => {
                self.bindings.push(binding);
                None
            }
        }
    }

    pub fn unbind(&mut self, id: &str) -> Option<InputBinding> {
        let index = self.bindings.iter().position(|b| b.id == id)?;
        Some(self.bindings.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&InputBinding> {
        self.bindings.iter().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Evaluate every binding against this tick's input.
    pub fn poll(&mut self, input: &impl InputState, now: Duration) -> Vec<FiredBinding> {
        self.bindings
            .iter_mut()
            .filter_map(|binding| {
                binding.evaluate(input, now).then(|| FiredBinding {
                    binding_id: binding.id.clone(),
                    action_id: binding.action_id.clone(),
                    payload: binding.payload.clone(),
                })
            })
            .collect()
    }

    /// `BindInput` and `UnbindInput` handlers operating on `shared`.
    pub fn handlers(shared: &SharedInputBindings) -> Vec<(&'static str, Handler<Engine>)> {
        let bind_target = Arc::clone(shared);
        let unbind_target = Arc::clone(shared);

        let bind: Handler<Engine> = Arc::new(move |_: &mut Engine, args: &ParameterValue| -> Result<(), HandlerError> {
            let binding = InputBinding::from_args(args)?;
            lock(&bind_target)?.bind(binding);
            Ok(())
        });
        let unbind: Handler<Engine> = Arc::new(move |_: &mut Engine, args: &ParameterValue| -> Result<(), HandlerError> {
            let id = required_str(args, "id")?;
            match lock(&unbind_target)?.unbind(&id) {
                Some(_) => tracing::info!(id = %id, "Input unbound"),
                None => tracing::warn!(id = %id, "No input binding to remove"),
            }
            Ok(())
        });

        vec![(BIND_INPUT, bind), (UNBIND_INPUT, unbind)]
    }
}

fn lock(shared: &SharedInputBindings) -> Result<std::sync::MutexGuard<'_, InputBindings>, HandlerError> {
    shared
        .lock()
        .map_err(|_| HandlerError::Host("input bindings lock poisoned".to_string()))
}
