// Drawings and labels.
//
// Drawing commands go to everyone, the sender included, because the client
// does not apply its own strokes until the server echoes them back. Undo is
// a plain removal: each client keeps its own undo stack and nothing
// reconciles those stacks across clients.

use std::collections::BTreeMap;

use tabletop_model::{Drawable, DrawnElement, Guid, Label, Layer, Pen};
use tabletop_protocol::{Command, CommandKind, ProtocolError};
use tracing::debug;

use crate::authority::{Authority, Handler};
use crate::context::CallContext;

pub(super) fn register(table: &mut BTreeMap<CommandKind, Handler>) {
    table.insert(CommandKind::Draw, draw);
    table.insert(CommandKind::UpdateDrawing, update_drawing);
    table.insert(CommandKind::UndoDraw, undo_draw);
    table.insert(CommandKind::ClearAllDrawings, clear_all_drawings);
    table.insert(CommandKind::PutLabel, put_label);
    table.insert(CommandKind::RemoveLabel, remove_label);
}

fn draw(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let pen: &Pen = cmd.get(1)?;
    let drawable: &Drawable = cmd.get(2)?;
    auth.with_zone(zone_id, |zone| {
        zone.add_drawable(DrawnElement {
            drawable: drawable.clone(),
            pen: pen.clone(),
        });
    });
    ctx.forward_to_all(cmd);
    Ok(())
}

fn update_drawing(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let pen: &Pen = cmd.get(1)?;
    let element: &DrawnElement = cmd.get(2)?;
    let updated = auth.with_zone(zone_id, |zone| {
        zone.update_drawable(element.drawable.clone(), pen.clone())
    });
    if updated == Some(false) {
        debug!("drawing {} not in zone {zone_id}", element.id());
    }
    ctx.forward_to_all(cmd);
    Ok(())
}

fn undo_draw(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let drawable_id: Guid = cmd.get(1)?;
    auth.with_zone(zone_id, |zone| zone.remove_drawable(drawable_id));
    ctx.forward_to_all(cmd);
    Ok(())
}

fn clear_all_drawings(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let layer: Layer = cmd.get(1)?;
    auth.with_zone(zone_id, |zone| zone.clear_drawables(layer));
    ctx.forward_to_all(cmd);
    Ok(())
}

fn put_label(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let label: &Label = cmd.get(1)?;
    if auth.with_zone(zone_id, |zone| zone.put_label(label.clone())).is_some() {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

fn remove_label(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let label_id: Guid = cmd.get(1)?;
    auth.with_zone(zone_id, |zone| zone.remove_label(label_id));
    ctx.forward_to_all(cmd);
    Ok(())
}
