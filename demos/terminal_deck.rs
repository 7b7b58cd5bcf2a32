//! Terminal demo of the navigation engine.
//!
//! Keys: `1`-`7` switch primary pages, `:` opens a path prompt (try
//! `/notes/hello` or `/users/alice`), Left/Backspace and Right act as the
//! browser's back and forward buttons, Esc pops, `x` clears the stack, `m`
//! opens a modal that swallows the next back press, `d` cycles layouts, `q`
//! quits. Run it narrower than 80 columns to see the small-viewport layout.
//!
//! Pass an address to start from a deep link:
//! `cargo run --example terminal_deck -- /npub1example`.

use std::env;

use navdeck::logging::FileSink;
use navdeck::{
    CliDriver, LayoutMode, LayoutPreferences, Logger, MemoryHistory, Navigator, NavigatorConfig,
    PinnedColumn, PrimaryPageDefinition, PrimaryPageName, PrimaryPageRegistry, RouteTable,
    TextView,
};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = env::args().nth(1).unwrap_or_else(|| "/".to_string());

    let mut config = NavigatorConfig::default().with_max_stack_size(3);
    if let Ok(path) = env::var("NAVDECK_LOG") {
        config = config.with_logger(Logger::new(FileSink::new(path, 1024 * 1024)?));
        config.enable_metrics();
    }

    let pages = PrimaryPageName::ALL.into_iter().map(|name| {
        PrimaryPageDefinition::new(name, move |props| {
            let body = match props {
                Some(props) => format!("{name} page\n\nprops: {props}"),
                None => format!("{name} page"),
            };
            TextView::resolved(name.as_str(), body)
        })
    });
    let primary = PrimaryPageRegistry::new(pages, PrimaryPageName::Home)?;

    let routes = RouteTable::new()
        .route("/notes/", |path| {
            TextView::resolved(path, "A note. Press : to open another one.")
        })
        .route("/users/", |path| TextView::resolved(path, "A profile."))
        .route("/settings", |path| TextView::resolved(path, "Settings."));

    let navigator = Navigator::new(config, primary, MemoryHistory::new(start), routes);
    let pinned = vec![PinnedColumn {
        id: "pinned-1".to_string(),
        kind: "notifications".to_string(),
        props: json!({}),
    }];

    CliDriver::new(navigator)
        .with_pinned(pinned)
        .with_preferences(LayoutPreferences {
            mode: LayoutMode::Standard,
            deck: false,
        })
        .run()?;
    Ok(())
}
