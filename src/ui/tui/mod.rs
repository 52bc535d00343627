//! Interactive textual user interface

mod init;
mod table;

use crate::{import::ImportError, CliArgs};
use cursive::{views::Dialog, Cursive};
use frame_stack::{resize::DrawerResize, row::RowLayout, FrameStackTable};
use log::{error, LevelFilter};
use std::{
    fmt::Write,
    panic::{self, AssertUnwindSafe, PanicInfo},
};
use syslog::Facility;

/// Smallest height of the frame description drawer, in terminal lines
const MIN_DRAWER_HEIGHT: f64 = 2.0;

/// Run the analysis using the textual user interface
pub fn run(args: CliArgs) -> Result<(), ImportError> {
    // Set up logging using syslog
    syslog::init(Facility::LOG_USER, LevelFilter::Info, None).expect("Failed to initialize syslog");

    // Warn that logs will be emitted on syslog
    eprintln!("Since stderr is not usable inside of a TUI, logs will be emitted on syslog...");

    // Load the profile before taking over the terminal, so that import errors
    // remain readable
    eprintln!("Processing input data...");
    let tree = super::load_tree(&args)?;
    let flat = super::flatten(tree, &args, false);

    // Check terminal dimensions
    let (terminal_width, terminal_height) =
        termion::terminal_size().expect("Could not read terminal configuration");
    let terminal_width = terminal_width.min(args.max_cols);
    let terminal_height = f64::from(terminal_height);

    // Set up the text user interface
    let mut cursive = init::setup_cursive(State {
        table: FrameStackTable::new(flat, RowLayout::default(), args.unit),
        weight_display: WeightDisplay::default(),
        drawer: DrawerResize::new(
            terminal_height / 4.0,
            MIN_DRAWER_HEIGHT,
            (terminal_height / 2.0).max(MIN_DRAWER_HEIGHT),
        ),
        name_width: 0,
        zoom_report: None,
    });

    // Register a panic hook that logs as much info as possible
    let default_panic_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info: &PanicInfo| {
        // Spell out what happened, and hopefully where
        let mut message = String::from("The TUI crashed due to a panic");
        if let Some(location) = panic_info.location() {
            write!(
                &mut message,
                " at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            )
            .expect("Write to String can't fail");
        }

        // If the panic payload is a message (common case), extract it
        let payload = panic_info.payload();
        let payload_str = payload
            .downcast_ref::<String>()
            .map(|s: &String| -> &str { s })
            .or_else(|| payload.downcast_ref::<&'static str>().copied());

        // Log what we know
        if let Some(payload_str) = payload_str {
            error!("{message} with payload: {payload_str}");
        } else {
            error!("{message}");
        }

        // Leave the rest up to the default panic hook
        default_panic_hook(panic_info);
    }));

    // Set up the last-chance panic handler and run
    let res = panic::catch_unwind(AssertUnwindSafe(move || {
        table::show_profile(&mut cursive, terminal_width);
        cursive.run();
    }));

    // Last-chance panic handler. This runs after the cursive handle is dropped,
    // so hopefully the terminal should be in a correct state and the user
    // should see the message...
    if let Err(e) = res {
        eprintln!(
            "===\n\
             The TUI crashed due to an unhandled panic.\n\
             The system logs may contain more information about what happened."
        );
        panic::resume_unwind(e);
    }
    Ok(())
}

/// General UI state available via cursive's user data mechanism
pub struct State {
    /// Frame stack table controller
    table: FrameStackTable,

    /// What the weight columns currently display
    weight_display: WeightDisplay,

    /// Height of the frame description drawer
    drawer: DrawerResize,

    /// Width of the frame name column, in terminal columns
    name_width: usize,

    /// Latest flamegraph zoom request, if any
    zoom_report: Option<String>,
}

/// What the weight columns display
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum WeightDisplay {
    /// Percentage of the whole profile's weight
    #[default]
    Percentage,

    /// Raw weight, in the profile's unit
    Value,
}
//
impl WeightDisplay {
    /// The other display
    fn switched(self) -> Self {
        match self {
            Self::Percentage => Self::Value,
            Self::Value => Self::Percentage,
        }
    }
}

/// Run a closure on the UI state
fn with_state<R>(cursive: &mut Cursive, f: impl FnOnce(&mut State) -> R) -> R {
    cursive
        .with_user_data(f)
        .expect("Failed to access UI state")
}

/// Help dialog
fn help_dialog(_cursive: &mut Cursive) -> Option<Dialog> {
    Some(Dialog::info(
        "Total is the weight of a frame including its callees\n\
        Self is the weight of the frame alone\n\
        Frame is the function, with ▸ marking frames that can be expanded\n\
        and ⚙ marking system frames\n\
        \n\
        Available commands:\n\
        - Up/Down selects a frame\n\
        - Return expands or collapses a frame\n\
        - Right/Left expands or collapses, then moves to the child/parent\n\
        - E expands or collapses a frame's whole subtree\n\
        - M opens the frame's context menu\n\
        - Up from the first row + Left/Right + Return adjusts sort\n\
        - U switches between percentages and raw weights\n\
        - [ and ] resize the frame description\n\
        - Esc exits dialogs and menus\n\
        - Q quits this program\n\
        \n\
        Logs go to syslog to avoid display corruption",
    ))
}
