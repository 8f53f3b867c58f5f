//! Headless mode for the character sheet.
//!
//! This module provides a simple text-based interface over a [`Session`].
//! Each input line is one command; replies are prefixed with a tag such as
//! `[STATUS]`, `[SAVED]` or `[ERROR]` so scripts can follow along. List
//! positions are 1-based on the command line.

use sheet_core::{
    Character, CharacterClass, CounterRef, Direction, FeatureEdit, FeatureRecharge, ItemRecharge,
    ListKind, RestType, Session, SessionError, StoreConfig,
};
use std::io::{self, BufRead, Write};

const HELP: &[&str] = &[
    "  list                               - List stored characters",
    "  create <name>                      - Create and open a character",
    "  load <name>                        - Open a stored character",
    "  save                               - Save the open character",
    "  discard                            - Close without saving",
    "  delete <name>                      - Delete a stored character",
    "  status                             - Show the open character",
    "  use <counter> [n]                  - Spend n uses (default 1)",
    "  regain <counter> [n]               - Get n uses back (default 1)",
    "      counters: feature <i>, item <i>, slot <level>, hd",
    "  rest short|long                    - Take a rest",
    "  name|race <text>                   - Change name or race",
    "  class <class>                      - Change class",
    "  level <1-20>                       - Change level",
    "  hp max|current|temp <value>        - Change hit points",
    "  slots <level> <0-4>                - Change spell slots for a level",
    "  spells on|off|toggle               - Show or hide spell slots",
    "  feature add <max|pb> short|long <name>",
    "  feature max|rename|recharge|link <i> <value>",
    "  item add <max> short|long|never <name>",
    "  feature|item remove|up|down <i>    - Edit the lists",
    "  quit                               - Exit",
];

/// Which hit point value a command changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpField {
    Max,
    Current,
    Temporary,
}

/// One parsed input line.
#[derive(Debug, Clone)]
pub enum Command {
    Help,
    Quit,
    List,
    Status,
    Create(String),
    Load(String),
    Save,
    Discard,
    Delete(String),
    Adjust { counter: CounterRef, delta: i32 },
    Rest(RestType),
    Name(String),
    Race(String),
    Class(CharacterClass),
    Level(u32),
    Hp { field: HpField, value: i32 },
    Slots { level: u8, max: u32 },
    /// `None` flips the current state.
    Spells(Option<bool>),
    AddFeature {
        name: String,
        max: u32,
        recharge: FeatureRecharge,
        linked: bool,
    },
    EditFeature { index: usize, edit: FeatureEdit },
    AddItem {
        name: String,
        max: u32,
        recharge: ItemRecharge,
    },
    Remove(ListKind, usize),
    Move(ListKind, usize, Direction),
}

/// Run the sheet in headless mode until `quit` or end of input.
pub async fn run_headless(config: StoreConfig) -> io::Result<()> {
    let session = Session::from_config(&config).await;

    println!("=== Character Sheet Headless Mode ===");
    if session.repository().is_connected() {
        println!("Characters: {}", session.repository().len());
    } else {
        println!("No table file configured: changes will not be saved.");
    }
    println!("Type `help` for commands.");
    println!();

    let mut headless = Headless::new(session);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let flow = match parse_command(line) {
            Ok(command) => headless.handle(command).await,
            Err(usage) => {
                println!("[ERROR] {usage}");
                Flow::Continue
            }
        };
        stdout.flush()?;

        if flow == Flow::Quit {
            println!("Goodbye!");
            break;
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// The interpreter state around a session.
struct Headless {
    session: Session,
    /// Set after a `quit` was refused because of unsaved changes.
    quit_requested: bool,
}

impl Headless {
    fn new(session: Session) -> Self {
        Self {
            session,
            quit_requested: false,
        }
    }

    async fn handle(&mut self, command: Command) -> Flow {
        tracing::debug!(?command, "handling command");
        let confirming = std::mem::take(&mut self.quit_requested);

        if matches!(command, Command::Quit) {
            if self.session.is_dirty() && !confirming {
                println!("[WARN] Unsaved changes. Type quit again to leave without saving.");
                self.quit_requested = true;
                return Flow::Continue;
            }
            return Flow::Quit;
        }

        if let Err(e) = self.execute(command).await {
            println!("[ERROR] {e}");
        }
        Flow::Continue
    }

    async fn execute(&mut self, command: Command) -> Result<(), SessionError> {
        let session = &mut self.session;
        match command {
            Command::Help => {
                println!("[HELP]");
                for line in HELP {
                    println!("{line}");
                }
            }
            Command::Quit => {}
            Command::List => {
                println!("[LIST]");
                for character in session.characters() {
                    println!("  {}", character.summary());
                }
            }
            Command::Status => match session.character() {
                Some(character) => print_sheet(character, session.is_dirty()),
                None => println!("[STATUS] No character loaded"),
            },
            Command::Create(name) => {
                if warn_unsaved(session) {
                    return Ok(());
                }
                match session.create(&name).await {
                    Ok(character) => println!("[CREATED] {}", character.summary()),
                    // The character exists in memory, only the write failed
                    Err(SessionError::Repository(sheet_core::RepositoryError::Backend(e))) => {
                        println!("[CREATED] {name} (not saved: {e})");
                    }
                    Err(e) => return Err(e),
                }
            }
            Command::Load(name) => {
                if warn_unsaved(session) {
                    return Ok(());
                }
                let character = session.load(&name)?;
                println!("[LOADED] {}", character.summary());
            }
            Command::Save => {
                session.save().await?;
                let name = session.character().map(|c| c.name().to_string());
                println!("[SAVED] {}", name.unwrap_or_default());
            }
            Command::Discard => match session.discard() {
                Some(character) => println!("[DISCARDED] {}", character.name()),
                None => println!("[DISCARDED] Nothing was loaded"),
            },
            Command::Delete(name) => {
                if session.delete(&name).await? {
                    println!("[DELETED] {name}");
                } else {
                    println!("[ERROR] No character named \"{name}\"");
                }
            }
            Command::Adjust { counter, delta } => {
                if session.adjust(counter, delta)? {
                    println!("[OK]");
                } else {
                    println!("[IGNORED] Out of range");
                }
            }
            Command::Rest(rest) => {
                let report = session.rest(rest)?;
                println!(
                    "[REST] {}: {} features and {} items restored",
                    report.rest, report.features_restored, report.items_restored
                );
            }
            Command::Name(name) => {
                session.set_name(&name)?;
                println!("[OK]");
            }
            Command::Race(race) => {
                session.set_race(&race)?;
                println!("[OK]");
            }
            Command::Class(class) => {
                session.set_class(class)?;
                println!("[OK] {class} ({})", class.hit_die());
            }
            Command::Level(level) => {
                session.set_level(level)?;
                println!("[OK]");
            }
            Command::Hp { field, value } => {
                match field {
                    HpField::Max => session.set_hp_max(value)?,
                    HpField::Current => session.set_hp_current(value)?,
                    HpField::Temporary => session.set_hp_temporary(value)?,
                }
                println!("[OK]");
            }
            Command::Slots { level, max } => {
                session.set_spell_slot_max(level, max)?;
                println!("[OK]");
            }
            Command::Spells(state) => {
                let active = match state {
                    Some(active) => {
                        session.set_spells_active(active)?;
                        active
                    }
                    None => session.toggle_spells_active()?,
                };
                println!("[OK] Spells {}", if active { "on" } else { "off" });
            }
            Command::AddFeature {
                name,
                max,
                recharge,
                linked,
            } => {
                session.add_feature(&name, max, recharge, linked)?;
                println!("[OK]");
            }
            Command::EditFeature { index, edit } => {
                session.edit_feature(index, edit)?;
                println!("[OK]");
            }
            Command::AddItem {
                name,
                max,
                recharge,
            } => {
                session.add_item(&name, max, recharge)?;
                println!("[OK]");
            }
            Command::Remove(ListKind::Features, index) => {
                let feature = session.remove_feature(index)?;
                println!("[REMOVED] {}", feature.name);
            }
            Command::Remove(ListKind::Items, index) => {
                let item = session.remove_item(index)?;
                println!("[REMOVED] {}", item.name);
            }
            Command::Move(list, index, direction) => {
                if session.reorder(list, index, direction)? {
                    println!("[OK]");
                } else {
                    println!("[IGNORED] Already at the end of the {list} list");
                }
            }
        }
        Ok(())
    }
}

/// Print a warning and return `true` when switching characters would lose
/// unsaved changes.
fn warn_unsaved(session: &Session) -> bool {
    if session.is_dirty() {
        println!("[WARN] Unsaved changes. Save or discard them first.");
        true
    } else {
        false
    }
}

fn print_sheet(character: &Character, dirty: bool) {
    let hp = &character.hit_points;
    println!(
        "[STATUS] {} ({}){}",
        character.summary(),
        character.identity.race,
        if dirty { " *unsaved*" } else { "" }
    );
    println!("  HP: {}/{} (+{} temp)", hp.current, hp.maximum, hp.temporary);
    println!(
        "  Hit dice: {}/{} {}",
        character.hit_dice_remaining(),
        character.level(),
        character.hit_die()
    );
    println!("  Proficiency: +{}", character.proficiency_bonus());

    if !character.features.is_empty() {
        println!("  Features:");
        for (i, feature) in character.features.iter().enumerate() {
            let linked = if feature.linked_to_proficiency { ", PB" } else { "" };
            println!(
                "    {}. {} {} ({}{linked})",
                i + 1,
                feature.name,
                feature.uses,
                feature.recharge
            );
        }
    }
    if !character.items.is_empty() {
        println!("  Items:");
        for (i, item) in character.items.iter().enumerate() {
            println!("    {}. {} {} ({})", i + 1, item.name, item.charges, item.recharge);
        }
    }
    if character.spells_active {
        let slots: Vec<String> = character
            .spell_slots
            .iter()
            .filter(|(_, slot)| slot.max() > 0)
            .map(|(level, slot)| format!("{level}: {slot}"))
            .collect();
        println!("  Spell slots: {}", slots.join("  "));
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse one input line. The error is a message for the user.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = words.split_first() else {
        return Err("Empty command".to_string());
    };

    match head.to_lowercase().as_str() {
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "list" => Ok(Command::List),
        "status" => Ok(Command::Status),
        "save" => Ok(Command::Save),
        "discard" => Ok(Command::Discard),
        "create" => text(rest, "create <name>").map(Command::Create),
        "load" => text(rest, "load <name>").map(Command::Load),
        "delete" => text(rest, "delete <name>").map(Command::Delete),
        "name" => text(rest, "name <text>").map(Command::Name),
        "race" => Ok(Command::Race(rest.join(" "))),
        "use" => parse_adjust(rest, -1),
        "regain" => parse_adjust(rest, 1),
        "rest" => match rest.first().copied() {
            Some("short") => Ok(Command::Rest(RestType::Short)),
            Some("long") => Ok(Command::Rest(RestType::Long)),
            _ => Err("Usage: rest short|long".to_string()),
        },
        "class" => {
            let usage = || {
                let names: Vec<_> = CharacterClass::all().iter().map(|c| c.name()).collect();
                format!("Usage: class <{}>", names.join("|"))
            };
            let name = text(rest, "class <class>")?;
            CharacterClass::parse(&name)
                .map(Command::Class)
                .ok_or_else(usage)
        }
        "level" => number(rest.first(), "level <1-20>").map(Command::Level),
        "hp" => {
            let usage = "hp max|current|temp <value>";
            let field = match rest.first().copied() {
                Some("max") => HpField::Max,
                Some("current") => HpField::Current,
                Some("temp") => HpField::Temporary,
                _ => return Err(format!("Usage: {usage}")),
            };
            let value = number(rest.get(1), usage)?;
            Ok(Command::Hp { field, value })
        }
        "slots" => {
            let usage = "slots <level> <0-4>";
            Ok(Command::Slots {
                level: number(rest.first(), usage)?,
                max: number(rest.get(1), usage)?,
            })
        }
        "spells" => match rest.first().copied() {
            Some("on") => Ok(Command::Spells(Some(true))),
            Some("off") => Ok(Command::Spells(Some(false))),
            Some("toggle") | None => Ok(Command::Spells(None)),
            _ => Err("Usage: spells on|off|toggle".to_string()),
        },
        "feature" => parse_list_command(ListKind::Features, rest),
        "item" => parse_list_command(ListKind::Items, rest),
        other => Err(format!("Unknown command `{other}`. Type help for help.")),
    }
}

fn parse_adjust(words: &[&str], sign: i32) -> Result<Command, String> {
    let usage = "use|regain feature <i>|item <i>|slot <level>|hd [n]";
    let (counter, rest) = match words {
        ["hd", rest @ ..] => (CounterRef::HitDice, rest),
        ["feature", i, rest @ ..] => (CounterRef::Feature(position(Some(i), usage)?), rest),
        ["item", i, rest @ ..] => (CounterRef::Item(position(Some(i), usage)?), rest),
        ["slot", level, rest @ ..] => (CounterRef::SpellSlot(number(Some(level), usage)?), rest),
        _ => return Err(format!("Usage: {usage}")),
    };
    let count: u32 = match rest.first() {
        Some(n) => number(Some(n), usage)?,
        None => 1,
    };
    let delta = i32::try_from(count)
        .ok()
        .and_then(|count| if sign < 0 { count.checked_neg() } else { Some(count) })
        .ok_or_else(|| format!("Usage: {usage}"))?;
    Ok(Command::Adjust { counter, delta })
}

fn parse_list_command(list: ListKind, words: &[&str]) -> Result<Command, String> {
    let usage = match list {
        ListKind::Features => "feature add|remove|up|down|max|rename|recharge|link ...",
        ListKind::Items => "item add|remove|up|down ...",
    };
    let Some((&action, rest)) = words.split_first() else {
        return Err(format!("Usage: {usage}"));
    };

    match (action, list) {
        ("add", ListKind::Features) => {
            let usage = "feature add <max|pb> short|long <name>";
            let (max, linked) = match rest.first().copied() {
                Some("pb") => (0, true),
                first => (number(first.as_ref(), usage)?, false),
            };
            let recharge = match rest.get(1).copied() {
                Some("short") => FeatureRecharge::ShortRest,
                Some("long") => FeatureRecharge::LongRest,
                _ => return Err(format!("Usage: {usage}")),
            };
            Ok(Command::AddFeature {
                name: text(rest.get(2..).unwrap_or_default(), usage)?,
                max,
                recharge,
                linked,
            })
        }
        ("add", ListKind::Items) => {
            let usage = "item add <max> short|long|never <name>";
            let max = number(rest.first(), usage)?;
            let recharge = match rest.get(1).copied() {
                Some("short") => ItemRecharge::ShortRest,
                Some("long") => ItemRecharge::LongRest,
                Some("never") => ItemRecharge::Never,
                _ => return Err(format!("Usage: {usage}")),
            };
            Ok(Command::AddItem {
                name: text(rest.get(2..).unwrap_or_default(), usage)?,
                max,
                recharge,
            })
        }
        ("remove", _) => Ok(Command::Remove(list, position(rest.first(), usage)?)),
        ("up", _) => Ok(Command::Move(list, position(rest.first(), usage)?, Direction::Up)),
        ("down", _) => Ok(Command::Move(list, position(rest.first(), usage)?, Direction::Down)),
        ("max" | "rename" | "recharge" | "link", ListKind::Features) => {
            let index = position(rest.first(), usage)?;
            let value = rest.get(1..).unwrap_or_default();
            let edit = match action {
                "max" => FeatureEdit {
                    max: Some(number(value.first(), "feature max <i> <1-50>")?),
                    ..Default::default()
                },
                "rename" => FeatureEdit {
                    name: Some(text(value, "feature rename <i> <name>")?),
                    ..Default::default()
                },
                "recharge" => FeatureEdit {
                    recharge: Some(match value.first().copied() {
                        Some("short") => FeatureRecharge::ShortRest,
                        Some("long") => FeatureRecharge::LongRest,
                        _ => return Err("Usage: feature recharge <i> short|long".to_string()),
                    }),
                    ..Default::default()
                },
                _ => FeatureEdit {
                    linked_to_proficiency: Some(match value.first().copied() {
                        Some("on") => true,
                        Some("off") => false,
                        _ => return Err("Usage: feature link <i> on|off".to_string()),
                    }),
                    ..Default::default()
                },
            };
            Ok(Command::EditFeature { index, edit })
        }
        _ => Err(format!("Usage: {usage}")),
    }
}

/// The remaining words as one non-empty string.
fn text(words: &[&str], usage: &str) -> Result<String, String> {
    if words.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(words.join(" "))
    }
}

fn number<T: std::str::FromStr>(word: Option<&&str>, usage: &str) -> Result<T, String> {
    word.and_then(|w| w.parse().ok())
        .ok_or_else(|| format!("Usage: {usage}"))
}

/// A 1-based list position turned into an index.
fn position(word: Option<&&str>, usage: &str) -> Result<usize, String> {
    match number::<usize>(word, usage)? {
        0 => Err("Positions start at 1".to_string()),
        n => Ok(n - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adjust() {
        assert!(matches!(
            parse_command("use hd"),
            Ok(Command::Adjust { counter: CounterRef::HitDice, delta: -1 })
        ));
        assert!(matches!(
            parse_command("use feature 2 3"),
            Ok(Command::Adjust { counter: CounterRef::Feature(1), delta: -3 })
        ));
        assert!(matches!(
            parse_command("regain slot 3"),
            Ok(Command::Adjust { counter: CounterRef::SpellSlot(3), delta: 1 })
        ));
        assert!(parse_command("use item 0").is_err());
        // Counts are unsigned and must fit the delta
        assert!(parse_command("use hd -3").is_err());
        assert!(parse_command("use hd -2147483648").is_err());
        assert!(parse_command("regain hd 2147483648").is_err());
        assert!(matches!(
            parse_command("use hd 2147483647"),
            Ok(Command::Adjust { delta: -2147483647, .. })
        ));
        assert!(parse_command("use spell 1").is_err());
    }

    #[test]
    fn test_parse_names_keep_spaces() {
        match parse_command("create Thorin Oakenshield") {
            Ok(Command::Create(name)) => assert_eq!(name, "Thorin Oakenshield"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_command("create").is_err());
    }

    #[test]
    fn test_parse_class() {
        assert!(matches!(
            parse_command("class wizard"),
            Ok(Command::Class(CharacterClass::Wizard))
        ));
        assert!(matches!(
            parse_command("class Magicien"),
            Ok(Command::Class(CharacterClass::Wizard))
        ));
        assert!(matches!(
            parse_command("class artificer"),
            Ok(Command::Class(CharacterClass::Artificer))
        ));
        assert!(parse_command("class bricoleur").is_err());
    }

    #[test]
    fn test_parse_feature_commands() {
        match parse_command("feature add pb long Channel Divinity") {
            Ok(Command::AddFeature {
                name,
                recharge,
                linked,
                ..
            }) => {
                assert_eq!(name, "Channel Divinity");
                assert_eq!(recharge, FeatureRecharge::LongRest);
                assert!(linked);
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse_command("feature max 1 4") {
            Ok(Command::EditFeature { index, edit }) => {
                assert_eq!(index, 0);
                assert_eq!(edit.max, Some(4));
                assert!(edit.name.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_command("feature down 2"),
            Ok(Command::Move(ListKind::Features, 1, Direction::Down))
        ));
        assert!(parse_command("feature add 2 daily Rage").is_err());
    }

    #[test]
    fn test_parse_items() {
        assert!(matches!(
            parse_command("item add 3 never Holy Water"),
            Ok(Command::AddItem { max: 3, recharge: ItemRecharge::Never, .. })
        ));
        assert!(matches!(
            parse_command("item remove 1"),
            Ok(Command::Remove(ListKind::Items, 0))
        ));
        // Only features have edit actions
        assert!(parse_command("item max 1 3").is_err());
    }

    #[test]
    fn test_parse_misc() {
        assert!(matches!(
            parse_command("hp temp 5"),
            Ok(Command::Hp { field: HpField::Temporary, value: 5 })
        ));
        assert!(matches!(parse_command("hp current -3"), Ok(Command::Hp { value: -3, .. })));
        assert!(matches!(parse_command("spells"), Ok(Command::Spells(None))));
        assert!(matches!(
            parse_command("rest long"),
            Ok(Command::Rest(RestType::Long))
        ));
        assert!(parse_command("rest forever").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[tokio::test]
    async fn test_quit_with_unsaved_changes_needs_confirmation() {
        let mut headless = Headless::new(Session::new(sheet_core::Repository::in_memory()));
        let _ = headless.session.create("Draft").await;
        assert!(headless.session.is_dirty());

        assert_eq!(headless.handle(Command::Quit).await, Flow::Continue);
        assert_eq!(headless.handle(Command::Quit).await, Flow::Quit);
    }

    #[tokio::test]
    async fn test_create_refused_while_dirty() {
        let mut headless = Headless::new(Session::new(sheet_core::Repository::in_memory()));
        let _ = headless.session.create("First").await;
        headless.handle(Command::Create("Second".to_string())).await;

        assert_eq!(headless.session.character().unwrap().name(), "First");
        assert_eq!(headless.session.repository().len(), 1);
    }
}
