//! Console command parsing and help.

use std::collections::BTreeSet;
use thiserror::Error;

/// Pointer actions that take a map position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Move,
    Click,
    DoubleClick,
    AltClick,
    Down,
    Drag,
}

/// A parsed console command. Positions are longitude/latitude in degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Draw,
    Edit,
    Ruler,
    Area,
    Pointer { action: PointerAction, lon: f64, lat: f64 },
    Up,
    Escape,
    Deselect,
    Delete,
    Save,
    Category(String),
    /// `None` shows every category.
    Show(Option<BTreeSet<String>>),
    Reload,
    Clear,
    List,
    Status,
    Wait,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),
    #[error("'{command}' expects {expected}")]
    Usage { command: String, expected: &'static str },
    #[error("Invalid coordinate: {0}")]
    Coordinate(String),
}

fn pointer_action(word: &str) -> Option<PointerAction> {
    Some(match word {
        "move" => PointerAction::Move,
        "click" => PointerAction::Click,
        "dblclick" => PointerAction::DoubleClick,
        "altclick" => PointerAction::AltClick,
        "down" => PointerAction::Down,
        "drag" => PointerAction::Drag,
        _ => return None,
    })
}

fn coordinate(text: &str) -> Result<f64, CommandError> {
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::Coordinate(text.to_string()))
}

/// Parse a comma-separated category list. `all` (or `*`) means no filter.
pub fn parse_categories(list: &str) -> Option<BTreeSet<String>> {
    let list = list.trim();
    if list.eq_ignore_ascii_case("all") || list == "*" {
        return None;
    }
    Some(
        list.split(',')
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let usage = |expected| CommandError::Usage {
        command: name.to_string(),
        expected,
    };

    if let Some(action) = pointer_action(name) {
        let [lon, lat] = rest.as_slice() else {
            return Err(usage("<lon> <lat>"));
        };
        return Ok(Some(Command::Pointer {
            action,
            lon: coordinate(lon)?,
            lat: coordinate(lat)?,
        }));
    }

    let command = match name {
        "draw" => Command::Draw,
        "edit" => Command::Edit,
        "ruler" => Command::Ruler,
        "area" => Command::Area,
        "up" => Command::Up,
        "escape" | "esc" => Command::Escape,
        "deselect" => Command::Deselect,
        "delete" => Command::Delete,
        "save" => Command::Save,
        "category" => {
            if rest.is_empty() {
                return Err(usage("a category name"));
            }
            Command::Category(rest.join(" "))
        }
        "show" => Command::Show(parse_categories(&rest.join(" "))),
        "reload" => Command::Reload,
        "clear" => Command::Clear,
        "list" => Command::List,
        "status" => Command::Status,
        "wait" => Command::Wait,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Print the command reference.
pub fn print_help() {
    const HELP: &[(&str, &str)] = &[
        ("draw", "Toggle polygon drawing"),
        ("edit", "Toggle selection and vertex editing"),
        ("ruler", "Toggle length measurement"),
        ("area", "Toggle area measurement"),
        ("move <lon> <lat>", "Move the pointer"),
        ("click <lon> <lat>", "Click (place vertex / select)"),
        ("dblclick <lon> <lat>", "Double click (finish sketch)"),
        ("altclick <lon> <lat>", "Remove the vertex under the pointer"),
        ("down <lon> <lat>", "Press on a vertex or edge"),
        ("drag <lon> <lat>", "Drag the grabbed vertex"),
        ("up", "Release the grabbed vertex"),
        ("escape", "Abort the current gesture"),
        ("deselect", "Clear the selection"),
        ("delete", "Delete the selected feature"),
        ("save", "Save new features"),
        ("category <name>", "Category for new drawings"),
        ("show <a,b|all>", "Load only these categories"),
        ("reload", "Reload features from the store"),
        ("clear", "Clear measurements"),
        ("list", "List features in the working set"),
        ("status", "Show mode, category and selection"),
        ("wait", "Wait for pending store requests"),
        ("quit", "Exit"),
    ];
    println!("\n=== Commands ===");
    for (usage, description) in HELP {
        println!("  {:24} {}", usage, description);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pointer_commands() {
        assert_eq!(
            parse("click 30.5 50.45").unwrap(),
            Some(Command::Pointer {
                action: PointerAction::Click,
                lon: 30.5,
                lat: 50.45,
            })
        );
        assert!(matches!(
            parse("dblclick -1 2").unwrap(),
            Some(Command::Pointer {
                action: PointerAction::DoubleClick,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("click 1"), Err(CommandError::Usage { .. })));
        assert_eq!(parse("drag 1 north"), Err(CommandError::Coordinate("north".to_string())));
        assert_eq!(parse("move NaN 1"), Err(CommandError::Coordinate("NaN".to_string())));
        assert_eq!(parse("fly"), Err(CommandError::Unknown("fly".to_string())));
        assert!(matches!(parse("category"), Err(CommandError::Usage { .. })));
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_show() {
        let expected: BTreeSet<String> = ["Buildings".to_string(), "Parcels".to_string()].into();
        assert_eq!(parse("show Parcels, Buildings").unwrap(), Some(Command::Show(Some(expected))));
        assert_eq!(parse("show all").unwrap(), Some(Command::Show(None)));
        // An empty list is a filter that matches nothing.
        assert_eq!(parse("show").unwrap(), Some(Command::Show(Some(BTreeSet::new()))));
    }

    #[test]
    fn test_parse_category_with_spaces() {
        assert_eq!(
            parse("category Green Zones").unwrap(),
            Some(Command::Category("Green Zones".to_string()))
        );
    }
}
