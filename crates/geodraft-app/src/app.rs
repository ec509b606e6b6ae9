//! Console application shell: configuration, the input loop and dispatch.

use crate::commands::{self, Command, PointerAction};
use crate::console::ConsoleView;
use geodraft_core::projection::from_lon_lat;
use geodraft_core::{
    BUILDINGS, CategoryFilter, HttpTransport, PARCELS, SyncError, ToolConfig, Workspace, parse_css_color,
};
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Environment variable with the feature store's base URL.
pub const STORE_URL_VAR: &str = "GEODRAFT_STORE_URL";
/// Environment variable with the initial drawing category.
pub const CATEGORY_VAR: &str = "GEODRAFT_CATEGORY";
/// Environment variable with the initial category filter (`a,b` or `all`).
pub const SHOW_VAR: &str = "GEODRAFT_SHOW";
/// Environment variable with the map resolution in meters per pixel.
pub const RESOLUTION_VAR: &str = "GEODRAFT_RESOLUTION";
/// Environment variable that turns on printing of tool and redraw events.
pub const VERBOSE_VAR: &str = "GEODRAFT_VERBOSE";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Feature store: {0}")]
    Store(#[from] SyncError),
    #[error("Console I/O: {0}")]
    Io(#[from] io::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub store_url: String,
    pub category: String,
    pub filter: CategoryFilter,
    /// Meters per pixel, scaling the tools' pixel tolerances.
    pub resolution: f64,
    pub tools: ToolConfig,
    /// Print every interaction, overlay and redraw event.
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: "http://127.0.0.1:8090".to_string(),
            category: BUILDINGS.to_string(),
            filter: CategoryFilter::Only([BUILDINGS.to_string(), PARCELS.to_string()].into()),
            resolution: 1.0,
            tools: ToolConfig::default(),
            verbose: false,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the `GEODRAFT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from a variable lookup. Unusable values are logged and ignored.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = var(STORE_URL_VAR) {
            config.store_url = url;
        }
        if let Some(category) = var(CATEGORY_VAR).filter(|c| !c.trim().is_empty()) {
            config.category = category.trim().to_string();
        }
        if let Some(show) = var(SHOW_VAR) {
            config.filter = match commands::parse_categories(&show) {
                Some(categories) => CategoryFilter::Only(categories),
                None => CategoryFilter::All,
            };
        }
        if let Some(resolution) = var(RESOLUTION_VAR) {
            match resolution.parse::<f64>() {
                Ok(r) if r.is_finite() && r > 0.0 => config.resolution = r,
                _ => log::warn!("Ignoring {}={:?}, expected a positive number", RESOLUTION_VAR, resolution),
            }
        }
        if let Some(verbose) = var(VERBOSE_VAR) {
            match verbose.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.verbose = true,
                "0" | "false" | "no" | "off" | "" => config.verbose = false,
                _ => log::warn!("Ignoring {}={:?}, expected true or false", VERBOSE_VAR, verbose),
            }
        }
        config
    }
}

/// The console digitizer.
pub struct App {
    workspace: Workspace<ConsoleView, HttpTransport>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let transport = HttpTransport::new(&config.store_url)?;
        log::info!("Feature store at {}", transport.base());
        let mut view = ConsoleView::new(config.resolution);
        view.verbose = config.verbose;
        let workspace = Workspace::new(view, transport, config.tools)
            .with_category(config.category)
            .with_filter(config.filter);
        Ok(Self { workspace })
    }

    /// Read commands from stdin until `quit` or end of input.
    pub fn run(config: AppConfig) -> Result<(), AppError> {
        let mut app = Self::new(config)?;
        app.start();
        println!("GeoDraft ready. Type 'help' for commands.");

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("[{}] > ", app.workspace.mode());
            io::stdout().flush()?;
            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;

            // Results that arrived while waiting for input.
            app.workspace.poll();
            match commands::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => app.execute(command),
                Ok(None) => {}
                Err(e) => println!("{}", e),
            }
            app.workspace.poll();
        }

        app.workspace.poll();
        if app.workspace.has_pending() {
            log::warn!("Exiting with store requests still pending");
        }
        Ok(())
    }

    /// Enable the tools and start loading features. Returns without waiting
    /// for the store; results are applied by later polls.
    pub fn start(&mut self) {
        self.workspace.initialize();
        self.workspace.poll();
    }

    pub fn execute(&mut self, command: Command) {
        let ws = &mut self.workspace;
        match command {
            Command::Draw => ws.activate_drawing(),
            Command::Edit => ws.activate_editing(),
            Command::Ruler => ws.activate_measure_length(),
            Command::Area => ws.activate_measure_area(),
            Command::Pointer { action, lon, lat } => {
                let at = from_lon_lat(lon, lat);
                match action {
                    PointerAction::Move => {
                        ws.pointer_move(at);
                    }
                    PointerAction::Click => ws.click(at),
                    PointerAction::DoubleClick => ws.double_click(at),
                    PointerAction::AltClick => {
                        if !ws.alt_click(at) {
                            println!("No vertex to remove there");
                        }
                    }
                    PointerAction::Down => {
                        if !ws.pointer_down(at) {
                            println!("Nothing to grab there");
                        }
                    }
                    PointerAction::Drag => {
                        ws.pointer_drag(at);
                    }
                }
            }
            Command::Up => ws.pointer_up(),
            Command::Escape => ws.escape(),
            Command::Deselect => ws.deselect(),
            Command::Delete => ws.delete_selected(),
            Command::Save => ws.save(),
            Command::Category(category) => ws.set_category(category),
            Command::Show(Some(categories)) => ws.set_category_filter(categories),
            Command::Show(None) => ws.show_all(),
            Command::Reload => ws.reload(),
            Command::Clear => ws.clear_measurements(),
            Command::List => self.print_features(),
            Command::Status => self.print_status(),
            Command::Wait => {
                let applied = ws.wait();
                println!("{} store responses applied", applied);
            }
            Command::Help => commands::print_help(),
            Command::Quit => {}
        }
    }

    fn print_features(&self) {
        let features = self.workspace.features();
        if features.is_empty() {
            println!("No features");
            return;
        }
        for feature in features.iter() {
            let id = feature
                .id
                .as_ref()
                .map_or_else(|| "new".to_string(), ToString::to_string);
            let style = feature.style();
            let stroke = style.stroke.to_rgba8();
            let mut flags = Vec::new();
            if feature.is_selected() {
                flags.push("selected");
            }
            if feature.is_inner() {
                flags.push("inner");
            }
            if parse_css_color(feature.color()).is_none() {
                flags.push("unknown color");
            }
            println!(
                "  {:>8} {:10} {:8} {:?} {} vertices, stroke #{:02x}{:02x}{:02x} {}",
                id,
                feature.layer_type,
                feature.color(),
                feature.geometry.kind(),
                feature.geometry.vertex_count(0),
                stroke.r,
                stroke.g,
                stroke.b,
                flags.join(", ")
            );
        }
    }

    fn print_status(&self) {
        let ws = &self.workspace;
        println!("  mode:         {}", ws.mode());
        let tools: Vec<String> = ws.view().interactions().iter().map(|i| format!("{:?}", i)).collect();
        println!("  tools:        {}", if tools.is_empty() { "none".to_string() } else { tools.join(", ") });
        println!("  category:     {}", ws.category());
        let filter = match ws.filter() {
            CategoryFilter::All => "all".to_string(),
            CategoryFilter::Only(categories) => show_list(categories),
        };
        println!("  showing:      {}", filter);
        println!("  features:     {} ({} unsaved)", ws.features().len(), ws.features().unsaved().count());
        println!("  measurements: {}", ws.measurements().len());
        if let Some(selected) = ws.features().selected() {
            let inner = ws.features().iter().filter(|f| f.is_inner()).count();
            println!("  selected:     {} ({} inner)", selected.key(), inner);
        }
        if ws.has_pending() {
            println!("  store requests pending");
        }
    }
}

fn show_list(categories: &BTreeSet<String>) -> String {
    if categories.is_empty() {
        "nothing".to_string()
    } else {
        categories.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}
