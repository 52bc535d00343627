//! Initialization of the text user interface

use super::{table, State};
use cursive::{
    event::{Event, Key},
    view::Nameable,
    views::Dialog,
    Cursive, CursiveRunnable,
};

/// Perform basic cursive setup
pub fn setup_cursive(state: State) -> CursiveRunnable {
    // Initialize cursive
    let mut cursive = cursive::default();

    // Set up user state
    cursive.set_user_data(state);

    // Esc always exits the current layer if there's another underneath
    cursive.set_global_callback(Key::Esc, exit_current_layer);

    // U switches between percentages and raw weights
    cursive.set_global_callback('u', table::switch_weight_display);

    // [ and ] shrink and grow the frame description drawer
    cursive.set_global_callback('[', |cursive| table::resize_drawer(cursive, -1.0));
    cursive.set_global_callback(']', |cursive| table::resize_drawer(cursive, 1.0));

    // We do not allow dialogs spawned by global keyboard shortcuts to stack on
    // top of each other as this is jarring and has no known use case.
    fn set_global_dialog_callback(
        cursive: &mut Cursive,
        event: impl Into<Event>,
        mut dialog_factory: impl 'static + FnMut(&mut Cursive) -> Option<Dialog> + Send + Sync,
    ) {
        cursive.set_global_callback(event, move |cursive| {
            const GLOBAL_DIALOG_NAME: &str = "<global dialog>";
            if cursive
                .screen_mut()
                .find_layer_from_name(GLOBAL_DIALOG_NAME)
                .is_none()
            {
                if let Some(dialog) = dialog_factory(cursive) {
                    cursive.add_layer(dialog.with_name(GLOBAL_DIALOG_NAME));
                }
            }
        });
    }

    // Q and Ctrl+C quit, after confirming that this is wanted
    fn quit_dialog(_: &mut Cursive) -> Option<Dialog> {
        Some(
            Dialog::text("Ready to quit?")
                .button("Yes", Cursive::quit)
                .dismiss_button("No"),
        )
    }
    set_global_dialog_callback(&mut cursive, 'q', quit_dialog);
    set_global_dialog_callback(&mut cursive, Event::CtrlChar('c'), quit_dialog);

    // Set up help text
    set_global_dialog_callback(&mut cursive, 'h', super::help_dialog);

    // Bubble up TUI state
    cursive
}

/// Exit the current cursive layer if there's another one underneath
///
/// If that layer was the context menu, this counts as a click outside of it.
fn exit_current_layer(cursive: &mut Cursive) {
    if cursive.screen().len() > 1 {
        let menu_was_shown = table::context_menu_shown(cursive);
        cursive.pop_layer();
        if menu_was_shown && !table::context_menu_shown(cursive) {
            super::with_state(cursive, |state| state.table.on_overlay_click());
        }
    }
}
