//! Stand-ins for game-side handlers.
//!
//! A real host would move the player or draw on screen; here the requested
//! effect is validated, logged and echoed to the output.

use std::sync::Arc;

use loopmod_core::handlers::{optional, required_str};
use loopmod_core::{DispatchContext, Engine, Handler, HandlerError, ParameterValue};

pub const TELEPORT_PLAYER: &str = "TeleportPlayer";
pub const DRAW_TEXT: &str = "DrawText";
pub const SHOW_IMAGE: &str = "ShowImage";

pub fn host_handlers() -> Vec<(&'static str, Handler<Engine>)> {
    vec![
        (TELEPORT_PLAYER, Arc::new(teleport_player) as Handler<Engine>),
        (DRAW_TEXT, Arc::new(draw_text) as Handler<Engine>),
        (SHOW_IMAGE, Arc::new(show_image) as Handler<Engine>),
    ]
}

/// Names of [`host_handlers`].
pub fn host_handler_names() -> [&'static str; 3] {
    [TELEPORT_PLAYER, DRAW_TEXT, SHOW_IMAGE]
}

fn number(args: &ParameterValue, name: &str, default: f32) -> f32 {
    optional(args, name).map(ParameterValue::as_f32).unwrap_or(default)
}

fn teleport_player(engine: &mut Engine, args: &ParameterValue) -> Result<(), HandlerError> {
    let [x, y, z] = ["x", "y", "z"].map(|axis| optional(args, axis).map(ParameterValue::as_f32));
    let (Some(x), Some(y), Some(z)) = (x, y, z) else {
        return Err(HandlerError::missing("x/y/z"));
    };

    tracing::info!(x, y, z, "Teleport player");
    engine.append_output(&format!("[teleport] player -> ({x}, {y}, {z})"));
    Ok(())
}

fn draw_text(engine: &mut Engine, args: &ParameterValue) -> Result<(), HandlerError> {
    let text = required_str(args, "text")?;
    let id = args.non_empty_str("id").unwrap_or_else(|| "text".to_string());
    let x = number(args, "x", 0.5);
    let y = number(args, "y", 0.5);
    let duration = number(args, "duration", 0.0).max(0.0);

    tracing::info!(id = %id, x, y, duration, "Draw text");
    engine.append_output(&format!("[text:{id}] {text}"));
    Ok(())
}

fn show_image(engine: &mut Engine, args: &ParameterValue) -> Result<(), HandlerError> {
    let url = required_str(args, "url")?;
    let id = args.non_empty_str("id").unwrap_or_else(|| "image".to_string());
    let width = number(args, "width", 256.0).max(0.0);
    let height = number(args, "height", 256.0).max(0.0);

    tracing::info!(id = %id, url = %url, width, height, "Show image");
    engine.append_output(&format!("[image:{id}] {url} ({width}x{height})"));
    Ok(())
}
