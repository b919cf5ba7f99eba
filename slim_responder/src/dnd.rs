// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag-and-drop bookkeeping.
//!
//! Runs once per targeted drag event, keyed off the origin element and
//! independent of which handlers fire.

use slim_dom::Document;

use crate::attrs::AttributeNames;
use crate::types::{DataTransfer, Event};

/// Media type of the drag payload.
pub const DRAG_MEDIA_TYPE: &str = "application/json";

/// Apply the origin element's drag declarations to `event` and the document.
///
/// - `dragstart` attaches the drag JSON payload and the allowed effect.
/// - `dragover` on an element declaring a drop effect claims the event,
///   records the effect, and adds the drop class.
/// - `dragleave` and `drop` remove the drop class.
pub fn apply_drag_bookkeeping(doc: &mut Document, names: &AttributeNames, event: &mut Event) {
    let Some(origin) = event.origin() else {
        return;
    };
    if !doc.is_element(origin) {
        return;
    }
    let drop_class = names.value(doc, origin, &names.drop_class).map(str::to_owned);

    match event.name.as_str() {
        "dragstart" => {
            let json = names.value(doc, origin, &names.drag_json);
            let effect = names.value(doc, origin, &names.drag_effect);
            if json.is_none() && effect.is_none() {
                return;
            }
            let transfer = event.data_transfer.get_or_insert_with(DataTransfer::new);
            if let Some(json) = json {
                transfer.set_data(DRAG_MEDIA_TYPE, json);
            }
            if let Some(effect) = effect {
                transfer.effect_allowed = Some(effect.to_owned());
            }
        }
        "dragover" => {
            let Some(effect) = names.value(doc, origin, &names.drop_effect) else {
                return;
            };
            let effect = effect.to_owned();
            event.prevent_default();
            event
                .data_transfer
                .get_or_insert_with(DataTransfer::new)
                .drop_effect = Some(effect);
            if let Some(class) = drop_class
                && let Err(err) = doc.add_class(origin, &class)
            {
                tracing::warn!(error = %err, "failed to add drop class");
            }
        }
        "dragleave" | "drop" => {
            if let Some(class) = drop_class
                && let Err(err) = doc.remove_class(origin, &class)
            {
                tracing::warn!(error = %err, "failed to remove drop class");
            }
        }
        _ => {}
    }
}
